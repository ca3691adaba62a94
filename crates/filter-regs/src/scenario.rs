//! Bench scenarios composed from session primitives. The session does not
//! enforce the device state machine; the ordering here (halt before touching
//! coefficients, clear buffers before driving) is what keeps the device
//! consistent.

use crate::layout::RegisterKind;
use crate::loader::{CoefSetting, ResetExpectation};
use crate::register::{FieldAssignment, Register, RegisterRecord};
use crate::session::DeviceSession;
use crate::Error;
use anyhow::Context;
use core::fmt;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};
use uad_link::{DeviceLink, Status};

fn ensure_ok(status: Status, what: &str) -> anyhow::Result<()> {
    if !status.is_success() {
        anyhow::bail!("{what} returned status {status}");
    }
    Ok(())
}

fn now_rfc3339() -> Option<String> {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .ok()
}

#[derive(Debug, Clone)]
pub struct DumpEntry {
    pub kind: RegisterKind,
    pub register: Option<Register>,
}

impl fmt::Display for DumpEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.register {
            Some(reg) => write!(f, "{reg}"),
            None => write!(f, "{}: unavailable", self.kind),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DumpRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    pub registers: Vec<Option<RegisterRecord>>,
}

pub fn dump_record(entries: &[DumpEntry]) -> DumpRecord {
    DumpRecord {
        ts: now_rfc3339(),
        registers: entries
            .iter()
            .map(|e| e.register.as_ref().map(Register::to_record))
            .collect(),
    }
}

/// Read all three registers; refused reads are reported, not fatal.
pub fn dump<L: DeviceLink>(s: &mut DeviceSession<L>) -> anyhow::Result<Vec<DumpEntry>> {
    let mut out = Vec::with_capacity(RegisterKind::ALL.len());
    for kind in RegisterKind::ALL {
        let register = s.get(kind)?.cloned();
        out.push(DumpEntry { kind, register });
    }
    Ok(out)
}

/// Apply one `register.field=value` assignment and return the register as
/// the device reports it afterwards.
pub fn set_field<L: DeviceLink>(
    s: &mut DeviceSession<L>,
    assignment: &FieldAssignment,
) -> anyhow::Result<Register> {
    let kind = assignment.register;
    let status = s.modify(kind, |reg| assignment.apply(reg))?;
    ensure_ok(status, &format!("writing {kind}"))?;
    info!(register = %kind, field = %assignment.field, value = assignment.value, "field set");
    s.snapshot(kind)
        .cloned()
        .ok_or(Error::Unavailable(kind.name()))
        .context("refreshing after write")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub register: RegisterKind,
    pub field: String,
    pub expected: u32,
    pub actual: u32,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field {}.{} does not match. expected: {:#x}, got {:#x}",
            self.register, self.field, self.expected, self.actual
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PorReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    pub checked: usize,
    pub mismatches: Vec<Mismatch>,
}

impl PorReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Reset the device and compare every expected field against what it
/// reports.
pub fn por_check<L: DeviceLink>(
    s: &mut DeviceSession<L>,
    expected: &[ResetExpectation],
) -> anyhow::Result<PorReport> {
    ensure_ok(s.reset()?, "reset")?;
    let mut regs: Vec<Option<Register>> = Vec::with_capacity(RegisterKind::ALL.len());
    for kind in RegisterKind::ALL {
        regs.push(s.get(kind)?.cloned());
    }

    let mut mismatches = Vec::new();
    for row in expected {
        let reg = regs[row.register.index()]
            .as_ref()
            .ok_or(Error::Unavailable(row.register.name()))
            .context("reading registers after reset")?;
        let actual = reg.get(&row.field)?;
        if actual != row.value {
            let m = Mismatch {
                register: row.register,
                field: row.field.clone(),
                expected: row.value,
                actual,
            };
            warn!("{m}");
            mismatches.push(m);
        }
    }
    info!(checked = expected.len(), mismatches = mismatches.len(), "power-on-reset check");
    Ok(PorReport {
        ts: now_rfc3339(),
        checked: expected.len(),
        mismatches,
    })
}

/// Load coefficient slots: halt, update slot enables and values, release
/// halt, then write coefficients before the control register.
pub fn configure<L: DeviceLink>(
    s: &mut DeviceSession<L>,
    settings: &[CoefSetting],
) -> anyhow::Result<()> {
    ensure_ok(
        s.modify(RegisterKind::Csr, |csr| csr.set("halt", 1))?,
        "halting",
    )?;
    for kind in [RegisterKind::Coef, RegisterKind::Csr] {
        if s.get(kind)?.is_none() {
            return Err(Error::Unavailable(kind.name()).into());
        }
    }

    for setting in settings {
        let csr = s
            .snapshot_mut(RegisterKind::Csr)
            .ok_or(Error::NoSnapshot("csr"))?;
        csr.set(&format!("c{}en", setting.slot), setting.enable)?;
        let coef = s
            .snapshot_mut(RegisterKind::Coef)
            .ok_or(Error::NoSnapshot("coef"))?;
        coef.set(&format!("c{}", setting.slot), setting.value)?;
    }
    s.snapshot_mut(RegisterKind::Csr)
        .ok_or(Error::NoSnapshot("csr"))?
        .set("halt", 0)?;

    // set() refreshes only its own slot, so the pending csr edits survive
    ensure_ok(s.set(RegisterKind::Coef)?, "writing coef")?;
    ensure_ok(s.set(RegisterKind::Csr)?, "writing csr")?;
    info!(slots = settings.len(), "coefficients configured");
    Ok(())
}

/// Enable the filter with cleared buffers and time base, then drive each
/// sample in order, one round trip per sample.
pub fn drive<L: DeviceLink>(s: &mut DeviceSession<L>, samples: &[i64]) -> anyhow::Result<Vec<i64>> {
    let status = s.modify(RegisterKind::Csr, |csr| {
        csr.set("fen", 1)?;
        csr.set("tclr", 1)?;
        csr.set("ibclr", 1)
    })?;
    ensure_ok(status, "enabling filter")?;

    let mut out = Vec::with_capacity(samples.len());
    for (i, x) in samples.iter().enumerate() {
        let y = s
            .drive(*x)
            .with_context(|| format!("driving sample {i} ({x:#x})"))?;
        out.push(y);
    }
    info!(samples = out.len(), "drive complete");
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisableCheck {
    /// CSR read was refused while disabled.
    pub blocked: bool,
    /// CSR read worked again after re-enabling.
    pub restored: bool,
}

impl DisableCheck {
    pub fn passed(&self) -> bool {
        self.blocked && self.restored
    }
}

/// Global enable/disable: register access must be refused while the device
/// is disabled and come back once it is enabled.
pub fn disable_check<L: DeviceLink>(s: &mut DeviceSession<L>) -> anyhow::Result<DisableCheck> {
    s.disable()?;
    let blocked = s.get(RegisterKind::Csr)?.is_none();
    s.enable()?;
    let restored = s.get(RegisterKind::Csr)?.is_some();
    Ok(DisableCheck { blocked, restored })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uad_link::{MockLink, PorValues};

    fn session() -> DeviceSession<MockLink> {
        DeviceSession::new(MockLink::new())
    }

    fn expect(register: RegisterKind, field: &str, value: u32) -> ResetExpectation {
        ResetExpectation {
            register,
            field: field.into(),
            value,
        }
    }

    fn slot(slot: u8, enable: u32, value: u32) -> CoefSetting {
        CoefSetting {
            slot,
            enable,
            value,
        }
    }

    #[test]
    fn test_dump_reports_unavailable_registers() {
        let mut s = session();
        let all = dump(&mut s).unwrap();
        assert!(all.iter().all(|e| e.register.is_some()));
        assert_eq!(dump_record(&all).registers.len(), 3);

        s.disable().unwrap();
        let all = dump(&mut s).unwrap();
        assert!(all.iter().all(|e| e.register.is_none()));
        assert_eq!(all[2].to_string(), "outcap: unavailable");
    }

    #[test]
    fn test_set_field_returns_refreshed_register() {
        let mut s = session();
        let a: FieldAssignment = "outcap.lcap=0x1ff".parse().unwrap();
        let reg = set_field(&mut s, &a).unwrap();
        assert_eq!(reg.get("lcap").unwrap(), 0xFF);
        assert_eq!(reg.get("hcap").unwrap(), 0x7F);
    }

    #[test]
    fn test_por_matches_after_reset() {
        let mut s = session();
        s.link_mut().poke(0x4, 0x1234_5678);
        let expected = vec![
            expect(RegisterKind::Coef, "c0", 0),
            expect(RegisterKind::Outcap, "hcap", 0x7F),
            expect(RegisterKind::Csr, "halt", 0),
        ];
        let report = por_check(&mut s, &expected).unwrap();
        assert!(report.passed(), "{:?}", report.mismatches);
        assert_eq!(report.checked, 3);
    }

    #[test]
    fn test_por_mismatch_message() {
        let mut s = DeviceSession::new(MockLink::with_por(PorValues {
            csr: 0x20,
            ..PorValues::default()
        }));
        let expected = vec![
            expect(RegisterKind::Csr, "halt", 0),
            expect(RegisterKind::Outcap, "lcap", 0x0),
        ];
        let report = por_check(&mut s, &expected).unwrap();
        let lines: Vec<String> = report.mismatches.iter().map(|m| m.to_string()).collect();
        assert_eq!(
            lines,
            [
                "field csr.halt does not match. expected: 0x0, got 0x1",
                "field outcap.lcap does not match. expected: 0x0, got 0x80",
            ]
        );
    }

    #[test]
    fn test_configure_coefficients() {
        let mut s = session();
        let settings = [
            slot(0, 1, 0x10),
            slot(2, 1, 0x20),
        ];
        configure(&mut s, &settings).unwrap();

        let coef = s.get(RegisterKind::Coef).unwrap().unwrap().clone();
        assert_eq!(coef.get("c0").unwrap(), 0x10);
        assert_eq!(coef.get("c2").unwrap(), 0x20);

        let csr = s.get(RegisterKind::Csr).unwrap().unwrap();
        assert_eq!(csr.get("c0en").unwrap(), 1);
        assert_eq!(csr.get("c1en").unwrap(), 0);
        assert_eq!(csr.get("c2en").unwrap(), 1);
        assert_eq!(csr.get("c3en").unwrap(), 0);
        assert_eq!(csr.get("halt").unwrap(), 0);

        // halt, then coef, then csr
        let order: Vec<u8> = s.link().writes().iter().map(|(a, _)| *a).collect();
        assert_eq!(order, [0x0, 0x4, 0x0]);
        assert_eq!(s.link().writes()[0].1 & 0x20, 0x20);
    }

    #[test]
    fn test_configure_on_disabled_device_fails() {
        let mut s = session();
        s.disable().unwrap();
        assert!(configure(&mut s, &[]).is_err());
    }

    #[test]
    fn test_drive_outputs_one_value_per_sample() {
        let mut s = session();
        let input = [0x00, 0x40, 0x7F, 0x80, 0xFF];
        let out = drive(&mut s, &input).unwrap();
        assert_eq!(out.len(), input.len());
        assert_eq!(s.link().samples(), &input);

        // filter on, no coefficient slots enabled
        assert!(out.iter().all(|y| *y == 0));
        let csr = s.snapshot(RegisterKind::Csr).unwrap();
        assert_eq!(csr.get("fen").unwrap(), 1);
        assert_eq!(csr.get("ibclr").unwrap(), 0);
    }

    #[test]
    fn test_drive_after_configure_filters() {
        let mut s = session();
        configure(&mut s, &[slot(0, 1, 0x40)]).unwrap();
        let out = drive(&mut s, &[0x20, 0xE0]).unwrap();
        assert_eq!(out, vec![0x20, 0xE0]);
    }

    #[test]
    fn test_drive_on_disabled_device_fails() {
        let mut s = session();
        s.disable().unwrap();
        assert!(drive(&mut s, &[1]).is_err());
    }

    #[test]
    fn test_shipped_configs_pass_on_mock() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../configs");
        let mut s = session();

        let expected = crate::load_reset_vector(dir.join("por.csv")).unwrap();
        assert!(por_check(&mut s, &expected).unwrap().passed());

        configure(&mut s, &crate::load_coef_config(dir.join("coef.csv")).unwrap()).unwrap();
        let samples = crate::load_samples(dir.join("step.vec")).unwrap();
        assert_eq!(drive(&mut s, &samples).unwrap().len(), samples.len());
    }

    #[test]
    fn test_disable_blocks_access() {
        let mut s = session();
        let check = disable_check(&mut s).unwrap();
        assert!(check.blocked);
        assert!(check.restored);
        assert!(check.passed());
    }
}
