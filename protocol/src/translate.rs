use crate::{ButtonEvent, DeviceCommand, GuiPayload, Instruction, SyringeRequest};
use serde_json::Value;
use tracing::debug;

/// Syringe ticks per GUI volume unit; one tick is 0.2 units.
pub const TICKS_PER_UNIT: f64 = 5.0;

/// Converts a GUI volume to syringe ticks, rounding half to even.
pub fn ticks(volume: f64) -> i64 {
    (volume * TICKS_PER_UNIT).round_ties_even() as i64
}

/// Maps a GUI payload to the line the robot expects.
///
/// Returns `None` when the payload has no device equivalent.
pub fn translate(payload: &GuiPayload) -> Option<DeviceCommand> {
    match payload {
        GuiPayload::Xy(event) | GuiPayload::Lift(event) => match event {
            ButtonEvent::Pressed { command } => DeviceCommand::new(command.as_str()),
            ButtonEvent::Released => Some(Instruction::Release.into()),
        },
        GuiPayload::Syringes(request) => Some(
            match request {
                SyringeRequest::Pull { volume } => Instruction::Pull(ticks(*volume)),
                SyringeRequest::Push { volume } => Instruction::Push(ticks(*volume)),
                SyringeRequest::PushAll => Instruction::PushAll,
            }
            .into(),
        ),
        GuiPayload::Halt => Some(Instruction::Halt.into()),
    }
}

/// Decodes and translates a raw GUI message in one step.
pub fn command_for(value: &Value) -> Option<DeviceCommand> {
    match GuiPayload::from_value(value) {
        Ok(payload) => translate(&payload),
        Err(e) => {
            debug!("Dropping GUI message: {e}");
            None
        }
    }
}
