//! uad-link: the device boundary for UAD filter simulation instances
//!
//! A device instance offers three status-coded operations: `cfg` (register
//! read/write), `com` (control command) and `sig` (one sample through the
//! signal path). [`DeviceLink`] abstracts them so register logic can run
//! against a spawned simulation binary or the in-process [`MockLink`].

mod types;
pub use types::{parse_int, Action, Instance, Status};

mod error;
pub use error::{LinkError, Result};

mod traits;
pub use traits::DeviceLink;

mod config;
pub use config::{DeviceConfig, DEFAULT_INSTS_DIR};

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockLink, PorValues};

#[cfg(feature = "process")]
mod process;

#[cfg(feature = "process")]
pub use process::ProcessLink;
