pub mod device;
pub mod gui;
mod translate;

pub use device::{DeviceCommand, Direction, Instruction};
pub use gui::{ButtonEvent, DecodeError, GuiPayload, SyringeRequest};
pub use translate::{command_for, ticks, translate, TICKS_PER_UNIT};
