use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Status code reported by a device operation (process exit code for the
/// process backend). Zero means success.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Status(pub i32);

impl Status {
    pub const OK: Status = Status(0);

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    pub fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Control commands accepted by the `com` operation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Reset,
    Enable,
    Disable,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Reset => "reset",
            Action::Enable => "enable",
            Action::Disable => "disable",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulation targets shipped with the bench: the reference model and the
/// candidate implementations.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instance {
    #[default]
    Golden,
    Impl0,
    Impl1,
    Impl2,
    Impl3,
    Impl4,
    Impl5,
}

impl Instance {
    pub const ALL: [Instance; 7] = [
        Instance::Golden,
        Instance::Impl0,
        Instance::Impl1,
        Instance::Impl2,
        Instance::Impl3,
        Instance::Impl4,
        Instance::Impl5,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Instance::Golden => "golden",
            Instance::Impl0 => "impl0",
            Instance::Impl1 => "impl1",
            Instance::Impl2 => "impl2",
            Instance::Impl3 => "impl3",
            Instance::Impl4 => "impl4",
            Instance::Impl5 => "impl5",
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        Instance::ALL
            .iter()
            .copied()
            .find(|i| i.as_str().eq_ignore_ascii_case(t))
            .ok_or_else(|| format!("unknown instance: {t}"))
    }
}

/// Parse an integer literal, inferring the radix from its prefix
/// (`0x`, `0o`, `0b`, otherwise decimal). An optional sign is accepted.
pub fn parse_int(s: &str) -> Option<i64> {
    let t = s.trim();
    let (neg, body) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(hex) = lower.strip_prefix("0x") {
        (16, hex)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (8, oct)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (2, bin)
    } else {
        (10, lower.as_str())
    };
    let digits = digits.replace('_', "");
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let val = i64::from_str_radix(&digits, radix).ok()?;
    Some(if neg { -val } else { val })
}
