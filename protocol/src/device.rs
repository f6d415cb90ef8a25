//! The robot's line protocol.
//!
//! Every command is a single line of ASCII text terminated by `\n`. The
//! robot answers each line with at most one reply line.

use core::fmt;
use strum::{Display, EnumString};

/// Ticks value the firmware treats as "push to the end of travel".
pub const PUSH_ALL_TICKS: i64 = -1;

/// A single line to be sent to the robot.
///
/// Never contains a line terminator and is never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceCommand(String);

impl DeviceCommand {
    /// Returns `None` if the line is blank or would span more than one line once trimmed.
    pub fn new(line: impl Into<String>) -> Option<Self> {
        let line = line.into();
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.contains(['\r', '\n']) {
            None
        } else {
            Some(Self(line))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceCommand {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Instruction> for DeviceCommand {
    fn from(instruction: Instruction) -> Self {
        Self(instruction.to_string())
    }
}

/// Continuous jog directions for the XY stage (X, Y) and the lift (Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Direction {
    #[strum(serialize = "X+")]
    XPositive,
    #[strum(serialize = "X-")]
    XNegative,
    #[strum(serialize = "Y+")]
    YPositive,
    #[strum(serialize = "Y-")]
    YNegative,
    #[strum(serialize = "Z+")]
    ZPositive,
    #[strum(serialize = "Z-")]
    ZNegative,
}

/// How the robot interprets a received line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// Start jogging until released.
    Move(Direction),
    /// Stop jogging.
    Release,
    Pull(i64),
    Push(i64),
    PushAll,
    /// Stop everything. Also the fallback for anything unrecognised.
    Halt,
}

impl Instruction {
    /// Parses a line the way the robot firmware does.
    ///
    /// Unknown lines are never an error: the robot halts on them.
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(['\r', '\n']);

        match line.split_once(' ') {
            None => match line {
                "RELEASED" => Self::Release,
                other => other.parse().map(Self::Move).unwrap_or(Self::Halt),
            },
            Some((verb, argument)) => {
                let ticks = leading_integer(argument);

                match verb {
                    "PULL" => Self::Pull(ticks),
                    "PUSH" if ticks == PUSH_ALL_TICKS => Self::PushAll,
                    "PUSH" => Self::Push(ticks),
                    _ => Self::Halt,
                }
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(direction) => write!(f, "{direction}"),
            Self::Release => f.write_str("RELEASED"),
            Self::Pull(ticks) => write!(f, "PULL {ticks}"),
            Self::Push(ticks) => write!(f, "PUSH {ticks}"),
            Self::PushAll => write!(f, "PUSH {PUSH_ALL_TICKS}"),
            Self::Halt => f.write_str("HALT"),
        }
    }
}

/// Integer prefix of `text`, or zero if there is none.
fn leading_integer(text: &str) -> i64 {
    let text = text.trim_start();

    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());

    digits[..end].parse::<i64>().map_or(0, |n| sign * n)
}
