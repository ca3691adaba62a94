use crate::layout::RegisterKind;
use crate::metrics::SessionMetrics;
use crate::register::Register;
use crate::{Error, Result};
use tracing::{debug, info, warn};
use uad_link::{Action, DeviceConfig, DeviceLink, ProcessLink, Status};

/// Owns the link to one device instance and the latest snapshot of each
/// register.
///
/// A snapshot exists only after a successful read. Writing a register makes
/// its snapshot stale, so [`DeviceSession::set`] always re-reads it; if that
/// read is refused the snapshot is dropped.
pub struct DeviceSession<L> {
    link: L,
    snapshots: [Option<Register>; 3],
    metrics: Option<SessionMetrics>,
}

impl DeviceSession<ProcessLink> {
    /// Session on the simulation binary selected by `config`.
    pub fn open(config: &DeviceConfig) -> Result<Self> {
        let link = ProcessLink::open(config)?;
        info!(instance = %config.instance, bin = %link.path().display(), "opened device");
        Ok(Self::new(link))
    }
}

impl<L: DeviceLink> DeviceSession<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            snapshots: [None, None, None],
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SessionMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Read a register and replace its snapshot. `Ok(None)` when the device
    /// refuses the read, which is the normal outcome while it is disabled;
    /// the previous snapshot is kept in that case.
    pub fn get(&mut self, kind: RegisterKind) -> Result<Option<&mut Register>> {
        let raw = self.link.read(kind.address())?;
        let slot = &mut self.snapshots[kind.index()];
        match raw {
            Some(raw) => {
                if let Some(m) = &self.metrics {
                    m.reads.inc();
                }
                debug!(register = %kind, raw = format_args!("{raw:#010x}"), "read");
                *slot = Some(Register::decode(kind, raw));
                Ok(slot.as_mut())
            }
            None => {
                if let Some(m) = &self.metrics {
                    m.unavailable.inc();
                }
                debug!(register = %kind, "read refused");
                Ok(None)
            }
        }
    }

    pub fn snapshot(&self, kind: RegisterKind) -> Option<&Register> {
        self.snapshots[kind.index()].as_ref()
    }

    pub fn snapshot_mut(&mut self, kind: RegisterKind) -> Option<&mut Register> {
        self.snapshots[kind.index()].as_mut()
    }

    /// Encode the current snapshot, write it, then re-read the register.
    /// Returns the write's status as reported by the device.
    pub fn set(&mut self, kind: RegisterKind) -> Result<Status> {
        let raw = self
            .snapshot(kind)
            .ok_or(Error::NoSnapshot(kind.name()))?
            .encode();
        let status = self.link.write(kind.address(), raw)?;
        if let Some(m) = &self.metrics {
            m.writes.inc();
        }
        if status.is_success() {
            debug!(register = %kind, raw = format_args!("{raw:#010x}"), "wrote");
        } else {
            warn!(register = %kind, %status, "write reported failure");
        }
        self.snapshots[kind.index()] = None;
        self.get(kind)?;
        Ok(status)
    }

    /// Read, mutate and write back one register.
    pub fn modify<F>(&mut self, kind: RegisterKind, f: F) -> Result<Status>
    where
        F: FnOnce(&mut Register) -> Result<()>,
    {
        match self.get(kind)? {
            Some(reg) => f(reg)?,
            None => return Err(Error::Unavailable(kind.name())),
        }
        self.set(kind)
    }

    pub fn reset(&mut self) -> Result<Status> {
        self.command(Action::Reset)
    }

    pub fn enable(&mut self) -> Result<Status> {
        self.command(Action::Enable)
    }

    pub fn disable(&mut self) -> Result<Status> {
        self.command(Action::Disable)
    }

    fn command(&mut self, action: Action) -> Result<Status> {
        let status = self.link.command(action)?;
        if let Some(m) = &self.metrics {
            m.commands.inc();
        }
        info!(%action, %status, "command");
        Ok(status)
    }

    /// One sample in, one sample out.
    pub fn drive(&mut self, sample: i64) -> Result<i64> {
        let out = self.link.signal(sample)?;
        if let Some(m) = &self.metrics {
            m.samples.inc();
        }
        debug!(sample, out, "drive");
        Ok(out)
    }
}
