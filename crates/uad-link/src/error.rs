use thiserror::Error;

pub type Result<T, E = LinkError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("instance binary not found: {0}")]
    InstanceNotFound(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("unparsable device output: {0:?}")]
    BadOutput(String),
    #[error("{op} failed with status {code}")]
    Failed { op: &'static str, code: i32 },
}
