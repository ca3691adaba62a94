use crate::layout::{Field, Layout, RegisterKind};
use crate::{Error, Result};
use core::fmt;
use core::str::FromStr;
use serde::Serialize;
use uad_link::parse_int;

/// Decoded snapshot of one register: a value per field of its layout.
///
/// Values are kept exactly as assigned; masking to the field width happens
/// in [`Register::encode`], so an oversized value truncates instead of
/// spilling into neighbouring fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    layout: &'static Layout,
    values: Vec<u32>,
}

/// Split a raw register word into its fields.
pub fn decode(layout: &'static Layout, raw: u32) -> Register {
    let values = layout
        .fields
        .iter()
        .map(|f| (raw >> f.offset) & f.mask())
        .collect();
    Register { layout, values }
}

impl Register {
    pub fn decode(kind: RegisterKind, raw: u32) -> Self {
        decode(kind.layout(), raw)
    }

    pub fn encode(&self) -> u32 {
        self.layout
            .fields
            .iter()
            .zip(&self.values)
            .fold(0u32, |raw, (f, v)| raw | ((v & f.mask()) << f.offset))
    }

    pub fn get(&self, field: &str) -> Result<u32> {
        let (idx, _) = self.layout.field(field)?;
        Ok(self.values[idx])
    }

    pub fn set(&mut self, field: &str, value: u32) -> Result<()> {
        let (idx, _) = self.layout.field(field)?;
        self.values[idx] = value;
        Ok(())
    }

    /// Field value sign-extended from its width (two's complement).
    pub fn signed(&self, field: &str) -> Result<i32> {
        let (idx, f) = self.layout.field(field)?;
        let v = self.values[idx] & f.mask();
        let shift = 32 - u32::from(f.width);
        Ok(((v << shift) as i32) >> shift)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static Field, u32)> + '_ {
        self.layout.fields.iter().zip(self.values.iter().copied())
    }

    pub fn to_record(&self) -> RegisterRecord {
        RegisterRecord {
            register: self.layout.name,
            address: self.layout.address,
            raw: format!("{:#010x}", self.encode()),
            fields: self
                .iter()
                .map(|(f, v)| FieldValue {
                    name: f.name,
                    value: v & f.mask(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Register Content", self.layout.title)?;
        let pad = self.layout.fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
        for (field, v) in self.iter() {
            write!(f, "\n{:<pad$} : {:#x}", field.name, v)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRecord {
    pub register: &'static str,
    pub address: u8,
    pub raw: String,
    pub fields: Vec<FieldValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldValue {
    pub name: &'static str,
    pub value: u32,
}

/// `register.field=value`, e.g. `csr.halt=1` or `coef.c2=-0x10`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAssignment {
    pub register: RegisterKind,
    pub field: String,
    pub value: u32,
}

impl FieldAssignment {
    pub fn apply(&self, reg: &mut Register) -> Result<()> {
        reg.set(&self.field, self.value)
    }
}

impl FromStr for FieldAssignment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (path, value) = s
            .split_once('=')
            .ok_or_else(|| Error::InvalidAssignment(format!("missing '=': {s}")))?;
        let (reg, field) = path
            .trim()
            .split_once('.')
            .ok_or_else(|| Error::InvalidAssignment(format!("expected register.field: {path}")))?;
        let register: RegisterKind = reg.parse()?;
        let (_, f) = register.layout().field(field.trim())?;
        let value = parse_value(value)
            .ok_or_else(|| Error::InvalidAssignment(format!("bad value: {}", value.trim())))?;
        Ok(Self {
            register,
            field: f.name.to_string(),
            value,
        })
    }
}

/// Integer literal as a register word. Negative values are taken as 32-bit
/// two's complement so signed coefficients can be written directly.
pub fn parse_value(s: &str) -> Option<u32> {
    let v = parse_int(s)?;
    u32::try_from(v)
        .ok()
        .or_else(|| i32::try_from(v).ok().map(|x| x as u32))
}
