//! Knobs shared by every way of running a program.

use std::env;
use std::fmt;
use std::str::FromStr;

use static_assertions::const_assert;

/// Cells in the fixed-size tape of a compiled program. The index starts in the middle.
///
/// Large enough that only a runaway program walks off either end. Neither the in-process tape
/// nor the static C array touches pages the program never visits.
pub const DEFAULT_TAPE_SIZE: usize = 600_000_000;

const_assert!(tape_size_min; DEFAULT_TAPE_SIZE >= 2);
const_assert!(tape_size_max; DEFAULT_TAPE_SIZE <= i32::MAX as usize);

/// What `,` does to the current cell once input is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EofBehavior {
    /// Leave the cell as it is.
    Unchanged,
    /// Store 0.
    Zero,
    /// Store 255, which is C's `EOF` truncated to a byte.
    Max,
}

impl EofBehavior {
    pub const NAMES: &'static [&'static str] = &["unchanged", "zero", "max"];

    /// Value the cell ends up with, given its current value.
    pub fn apply(self, current: u8) -> u8 {
        match self {
            EofBehavior::Unchanged => current,
            EofBehavior::Zero => 0,
            EofBehavior::Max => 255,
        }
    }
}

impl Default for EofBehavior {
    fn default() -> Self {
        EofBehavior::Unchanged
    }
}

impl FromStr for EofBehavior {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unchanged" => Ok(EofBehavior::Unchanged),
            "zero" => Ok(EofBehavior::Zero),
            "max" => Ok(EofBehavior::Max),
            _ => Err(format!(
                "unknown end-of-input behavior '{}' (expected one of: {})",
                s,
                Self::NAMES.join(", ")
            )),
        }
    }
}

impl fmt::Display for EofBehavior {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            EofBehavior::Unchanged => "unchanged",
            EofBehavior::Zero => "zero",
            EofBehavior::Max => "max",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub eof: EofBehavior,
    /// Cells available to compiled programs.
    pub tape_size: usize,
    /// C compiler used to build executables.
    pub cc: String,
    /// Keep the generated C file next to the executable.
    pub keep_c: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            eof: EofBehavior::default(),
            tape_size: DEFAULT_TAPE_SIZE,
            cc: env::var("CC").unwrap_or_else(|_| "cc".to_string()),
            keep_c: false,
        }
    }
}
