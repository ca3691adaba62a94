use crate::{Error, Result};
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// One named bitfield inside a 32-bit register word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Short hardware name, as used in CSV files and assignments.
    pub name: &'static str,
    pub long_name: &'static str,
    pub offset: u8,
    pub width: u8,
}

impl Field {
    const fn new(name: &'static str, long_name: &'static str, offset: u8, width: u8) -> Self {
        Self {
            name,
            long_name,
            offset,
            width,
        }
    }

    pub const fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.long_name.eq_ignore_ascii_case(name)
    }
}

/// Fixed layout of one register: its address and its fields in bit order.
#[derive(Debug, PartialEq, Eq)]
pub struct Layout {
    pub name: &'static str,
    pub title: &'static str,
    pub address: u8,
    pub fields: &'static [Field],
}

impl Layout {
    pub fn field(&self, name: &str) -> Result<(usize, &'static Field)> {
        self.fields
            .iter()
            .enumerate()
            .find(|(_, f)| f.matches(name))
            .ok_or_else(|| Error::UnknownField {
                register: self.name,
                field: name.to_string(),
            })
    }
}

pub static CSR: Layout = Layout {
    name: "csr",
    title: "CSR",
    address: 0x0,
    fields: &[
        Field::new("fen", "filter_enable", 0, 1),
        Field::new("c0en", "coef0_enable", 1, 1),
        Field::new("c1en", "coef1_enable", 2, 1),
        Field::new("c2en", "coef2_enable", 3, 1),
        Field::new("c3en", "coef3_enable", 4, 1),
        Field::new("halt", "halt", 5, 1),
        Field::new("sts", "status", 6, 2),
        Field::new("ibcnt", "input_buffer_count", 8, 8),
        Field::new("ibovf", "input_buffer_overflow", 16, 1),
        Field::new("ibclr", "input_buffer_clear", 17, 1),
        Field::new("tclr", "time_clear", 18, 1),
        Field::new("rnd", "rounding_mode", 19, 2),
        Field::new("icoef", "coef_interrupt", 21, 1),
        Field::new("icap", "cap_interrupt", 22, 1),
        Field::new("rsvd", "reserved", 23, 9),
    ],
};

pub static COEF: Layout = Layout {
    name: "coef",
    title: "COEF",
    address: 0x4,
    fields: &[
        Field::new("c0", "coef0", 0, 8),
        Field::new("c1", "coef1", 8, 8),
        Field::new("c2", "coef2", 16, 8),
        Field::new("c3", "coef3", 24, 8),
    ],
};

pub static OUTCAP: Layout = Layout {
    name: "outcap",
    title: "OUTCAP",
    address: 0x8,
    fields: &[
        Field::new("hcap", "high_capacity", 0, 8),
        Field::new("lcap", "low_capacity", 8, 8),
        Field::new("rsvd", "reserved", 16, 16),
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterKind {
    Csr,
    Coef,
    Outcap,
}

impl RegisterKind {
    pub const ALL: [RegisterKind; 3] = [
        RegisterKind::Csr,
        RegisterKind::Coef,
        RegisterKind::Outcap,
    ];

    pub fn layout(self) -> &'static Layout {
        match self {
            RegisterKind::Csr => &CSR,
            RegisterKind::Coef => &COEF,
            RegisterKind::Outcap => &OUTCAP,
        }
    }

    pub fn address(self) -> u8 {
        self.layout().address
    }

    pub fn name(self) -> &'static str {
        self.layout().name
    }

    pub(crate) fn index(self) -> usize {
        match self {
            RegisterKind::Csr => 0,
            RegisterKind::Coef => 1,
            RegisterKind::Outcap => 2,
        }
    }
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RegisterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        RegisterKind::ALL
            .iter()
            .copied()
            .find(|k| k.name().eq_ignore_ascii_case(t))
            .ok_or_else(|| Error::UnknownRegister(t.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layouts_tile_the_word() {
        for kind in RegisterKind::ALL {
            let mut seen = 0u32;
            for f in kind.layout().fields {
                let bits = f.mask() << f.offset;
                assert_eq!(seen & bits, 0, "{kind}.{} overlaps", f.name);
                seen |= bits;
            }
            assert_eq!(seen, u32::MAX, "{kind} leaves bits uncovered");
        }
    }

    #[test]
    fn test_field_lookup_by_either_name() {
        let (idx, f) = CSR.field("ibcnt").unwrap();
        assert_eq!((idx, f.offset, f.width), (7, 8, 8));
        assert_eq!(CSR.field("input_buffer_count").unwrap().0, 7);
        assert_eq!(OUTCAP.field("HCAP").unwrap().0, 0);
        assert!(matches!(
            CSR.field("bogus"),
            Err(Error::UnknownField { register: "csr", .. })
        ));
    }

    #[test]
    fn test_register_names() {
        assert_eq!("csr".parse::<RegisterKind>().unwrap(), RegisterKind::Csr);
        assert_eq!(" OUTCAP ".parse::<RegisterKind>().unwrap(), RegisterKind::Outcap);
        assert!(matches!(
            "status".parse::<RegisterKind>(),
            Err(Error::UnknownRegister(_))
        ));
        assert_eq!(RegisterKind::Coef.address(), 0x4);
        assert_eq!(RegisterKind::Outcap.to_string(), "outcap");
    }
}
