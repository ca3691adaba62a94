use thiserror::Error;
use uad_link::LinkError;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown register: {0}")]
    UnknownRegister(String),
    #[error("register {register} has no field {field}")]
    UnknownField {
        register: &'static str,
        field: String,
    },
    #[error("no snapshot of {0}; read it before writing it back")]
    NoSnapshot(&'static str),
    #[error("register {0} is unavailable (device disabled?)")]
    Unavailable(&'static str),
    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),
    #[error("metrics init error: {0}")]
    Metrics(String),
    #[error(transparent)]
    Link(#[from] LinkError),
}
