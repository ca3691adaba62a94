use crate::{parse_int, Action, DeviceConfig, DeviceLink, LinkError, Result, Status};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

/// Drives a simulation binary by spawning it once per operation:
/// `cfg --address <a> [--data <d>]`, `com --action <a>`, `sig --data <n>`.
pub struct ProcessLink {
    path: PathBuf,
}

impl ProcessLink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Resolve the binary from a device configuration. Fails when the
    /// resolved path does not exist.
    pub fn open(config: &DeviceConfig) -> Result<Self> {
        let path = config.resolve_path();
        if !path.exists() {
            return Err(LinkError::InstanceNotFound(path.display().to_string()));
        }
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn run(&self, args: &[String]) -> Result<Output> {
        debug!(bin = %self.path.display(), ?args, "spawning instance");
        Command::new(&self.path)
            .args(args)
            .output()
            .map_err(|e| LinkError::Io(format!("{}: {e}", self.path.display())))
    }
}

fn status_of(out: &Output) -> Status {
    // Killed by a signal has no code; report it as a generic failure
    Status(out.status.code().unwrap_or(-1))
}

fn parse_stdout(out: &Output) -> Result<i64> {
    let text = String::from_utf8_lossy(&out.stdout);
    parse_int(&text).ok_or_else(|| LinkError::BadOutput(text.trim().to_string()))
}

impl DeviceLink for ProcessLink {
    fn read(&mut self, address: u8) -> Result<Option<u32>> {
        let out = self.run(&["cfg".into(), "--address".into(), address.to_string()])?;
        let status = status_of(&out);
        if !status.is_success() {
            debug!(address, %status, "read refused");
            return Ok(None);
        }
        let val = parse_stdout(&out)?;
        // Registers are 32 bits wide; keep the low word of whatever came back
        Ok(Some(val as u32))
    }

    fn write(&mut self, address: u8, data: u32) -> Result<Status> {
        let out = self.run(&[
            "cfg".into(),
            "--address".into(),
            address.to_string(),
            "--data".into(),
            format!("{data:#x}"),
        ])?;
        Ok(status_of(&out))
    }

    fn command(&mut self, action: Action) -> Result<Status> {
        let out = self.run(&["com".into(), "--action".into(), action.to_string()])?;
        Ok(status_of(&out))
    }

    fn signal(&mut self, sample: i64) -> Result<i64> {
        let out = self.run(&["sig".into(), "--data".into(), sample.to_string()])?;
        let status = status_of(&out);
        if !status.is_success() {
            return Err(LinkError::Failed {
                op: "sig",
                code: status.code(),
            });
        }
        parse_stdout(&out)
    }
}
