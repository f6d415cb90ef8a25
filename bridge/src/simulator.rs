//! A stand-in for the robot firmware.
//!
//! Replies with the same messages as the real robot. Syringe moves complete
//! instantly, so the simulated robot is only ever idle or jogging.

use crate::transport::memory::Device;
use pipette_protocol::{Direction, Instruction, TICKS_PER_UNIT};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    Halting,
    Moving(Direction),
}

#[derive(Debug, Default)]
pub struct SimulatedRobot {
    state: State,
}

impl SimulatedRobot {
    /// Direction the robot is currently jogging in, if any.
    pub fn moving(&self) -> Option<Direction> {
        match self.state {
            State::Halting => None,
            State::Moving(direction) => Some(direction),
        }
    }

    fn start(&mut self, instruction: Instruction) -> Option<String> {
        if self.state != State::Halting {
            debug!("Ignoring {instruction:?} while {:?}", self.state);
            return None;
        }

        match instruction {
            Instruction::Move(direction) => {
                self.state = State::Moving(direction);
                Some(format!("Move {direction}"))
            }
            Instruction::Pull(ticks) => Some(format!("Pull {} ml", volume(ticks))),
            Instruction::Push(ticks) => Some(format!("Push {} ml", volume(ticks))),
            Instruction::PushAll => Some("Push All".to_string()),
            Instruction::Release | Instruction::Halt => None,
        }
    }
}

impl Device for SimulatedRobot {
    fn respond(&mut self, line: &str) -> Option<String> {
        match Instruction::parse(line) {
            Instruction::Halt => {
                self.state = State::Halting;
                Some("Halt Robot".to_string())
            }
            Instruction::Release => match self.state {
                State::Moving(_) => {
                    self.state = State::Halting;
                    Some("Halt Move".to_string())
                }
                State::Halting => None,
            },
            instruction => self.start(instruction),
        }
    }
}

fn volume(ticks: i64) -> String {
    format!("{:.1}", ticks as f64 / TICKS_PER_UNIT)
}
