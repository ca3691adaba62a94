//! filter-regs: register codec and device session for the UAD filter device
//!
//! Three fixed 32-bit registers (`csr`, `coef`, `outcap`) are described by
//! `(name, offset, width)` tables; one generic codec decodes and encodes all
//! of them. [`DeviceSession`] reads, mutates and writes them back over any
//! [`uad_link::DeviceLink`].

mod error;
pub use error::{Error, Result};

pub mod layout;
pub use layout::{Field, Layout, RegisterKind};

mod register;
pub use register::{decode, parse_value, FieldAssignment, FieldValue, Register, RegisterRecord};

mod sample;
pub use sample::{format_q6, q6_to_f64, Q6_FRAC_BITS};

mod metrics;
pub use metrics::{MetricsHub, SessionMetrics};

mod session;
pub use session::DeviceSession;

mod loader;
pub use loader::{
    load_bench_config, load_coef_config, load_reset_vector, load_samples, read_coef_config,
    read_reset_vector, read_samples, save_output_vec, write_output_vec, BenchConfig, CoefSetting,
    ResetExpectation, DEFAULT_OUTPUT,
};

pub mod scenario;
