use crate::{Action, DeviceLink, LinkError, Result, Status};
use std::collections::VecDeque;

const CSR: u8 = 0x0;
const COEF: u8 = 0x4;
const OUTCAP: u8 = 0x8;

const FEN: u32 = 1 << 0;
const HALT: u32 = 1 << 5;
const STS_SHIFT: u32 = 6;
const STS_MASK: u32 = 0x3 << STS_SHIFT;
const IBCNT_SHIFT: u32 = 8;
const IBCNT_MASK: u32 = 0xFF << IBCNT_SHIFT;
const IBOVF: u32 = 1 << 16;
const IBCLR: u32 = 1 << 17;
const TCLR: u32 = 1 << 18;
// Hardware-owned bits; writes leave them untouched
const CSR_RO: u32 = STS_MASK | IBCNT_MASK | IBOVF;

const STS_IDLE: u32 = 1;
const STS_DRIVING: u32 = 2;
const STS_HALTED: u32 = 3;

/// Register contents right after a reset command.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PorValues {
    pub csr: u32,
    pub coef: u32,
    pub outcap: u32,
}

impl Default for PorValues {
    fn default() -> Self {
        Self {
            csr: 0x0000_0000,
            coef: 0x0000_0000,
            outcap: 0x0000_807F,
        }
    }
}

/// In-process fake of a filter device instance.
///
/// Reads and writes are refused with status 1 while disabled. `ibclr` and
/// `tclr` are write-1-to-clear pulses that always read back as zero. With
/// `fen` clear the signal path echoes its input; with `fen` set it runs a
/// 4-tap Q6 FIR over the enabled coefficient slots and saturates to 8 bits.
#[derive(Debug, Clone)]
pub struct MockLink {
    por: PorValues,
    csr: u32,
    coef: u32,
    outcap: u32,
    enabled: bool,
    taps: VecDeque<i32>,
    writes: Vec<(u8, u32)>,
    commands: Vec<Action>,
    samples: Vec<i64>,
}

impl Default for MockLink {
    fn default() -> Self {
        Self::with_por(PorValues::default())
    }
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_por(por: PorValues) -> Self {
        Self {
            por,
            csr: por.csr,
            coef: por.coef,
            outcap: por.outcap,
            enabled: true,
            taps: VecDeque::from(vec![0; 4]),
            writes: Vec::new(),
            commands: Vec::new(),
            samples: Vec::new(),
        }
    }

    /// Raw register word as the device would report it, ignoring the
    /// enable gate.
    pub fn peek(&self, address: u8) -> Option<u32> {
        match address {
            CSR => Some(self.csr_view()),
            COEF => Some(self.coef),
            OUTCAP => Some(self.outcap),
            _ => None,
        }
    }

    /// Overwrite a register word directly, bypassing write masking.
    pub fn poke(&mut self, address: u8, data: u32) {
        match address {
            CSR => self.csr = data & !STS_MASK,
            COEF => self.coef = data,
            OUTCAP => self.outcap = data,
            _ => {}
        }
    }

    pub fn writes(&self) -> &[(u8, u32)] {
        &self.writes
    }

    pub fn commands(&self) -> &[Action] {
        &self.commands
    }

    pub fn samples(&self) -> &[i64] {
        &self.samples
    }

    fn csr_view(&self) -> u32 {
        let sts = if self.csr & HALT != 0 {
            STS_HALTED
        } else if self.csr & FEN != 0 && self.csr & IBCNT_MASK != 0 {
            STS_DRIVING
        } else {
            STS_IDLE
        };
        (self.csr & !STS_MASK) | (sts << STS_SHIFT)
    }

    fn write_csr(&mut self, data: u32) {
        let mut next = (self.csr & CSR_RO) | (data & !CSR_RO);
        if next & IBCLR != 0 {
            next &= !(IBCNT_MASK | IBOVF);
        }
        if next & TCLR != 0 {
            self.taps.iter_mut().for_each(|t| *t = 0);
        }
        self.csr = next & !(IBCLR | TCLR);
    }

    fn filter(&mut self, sample: i64) -> i64 {
        self.taps.pop_back();
        self.taps.push_front(i32::from((sample & 0xFF) as u8 as i8));

        let count = ((self.csr & IBCNT_MASK) >> IBCNT_SHIFT) + 1;
        if count > 0xFF {
            self.csr |= IBOVF | IBCNT_MASK;
        } else {
            self.csr = (self.csr & !IBCNT_MASK) | (count << IBCNT_SHIFT);
        }

        let mut acc: i32 = 0;
        for (slot, x) in self.taps.iter().enumerate() {
            if self.csr & (1 << (slot + 1)) == 0 {
                continue;
            }
            let c = i32::from(((self.coef >> (slot * 8)) & 0xFF) as u8 as i8);
            acc += c * x;
        }
        let y = (acc >> 6).clamp(-128, 127);
        i64::from(y & 0xFF)
    }
}

impl DeviceLink for MockLink {
    fn read(&mut self, address: u8) -> Result<Option<u32>> {
        if !self.enabled {
            return Ok(None);
        }
        Ok(self.peek(address))
    }

    fn write(&mut self, address: u8, data: u32) -> Result<Status> {
        if !self.enabled {
            return Ok(Status(1));
        }
        match address {
            CSR => self.write_csr(data),
            COEF => self.coef = data,
            OUTCAP => self.outcap = data,
            _ => return Ok(Status(2)),
        }
        self.writes.push((address, data));
        Ok(Status::OK)
    }

    fn command(&mut self, action: Action) -> Result<Status> {
        self.commands.push(action);
        match action {
            Action::Reset => {
                self.csr = self.por.csr & !STS_MASK;
                self.coef = self.por.coef;
                self.outcap = self.por.outcap;
                self.taps.iter_mut().for_each(|t| *t = 0);
                self.enabled = true;
            }
            Action::Enable => self.enabled = true,
            Action::Disable => self.enabled = false,
        }
        Ok(Status::OK)
    }

    fn signal(&mut self, sample: i64) -> Result<i64> {
        if !self.enabled {
            return Err(LinkError::Failed { op: "sig", code: 1 });
        }
        self.samples.push(sample);
        if self.csr & FEN == 0 {
            return Ok(sample);
        }
        Ok(self.filter(sample))
    }
}
