//! Messages sent by the operator GUI.
//!
//! The GUI posts JSON objects of the form `{"type": ..., "payload": {...}}`
//! where the shape of `payload` depends on `type`.

use serde_json::{Map, Value};
use strum::EnumString;

#[derive(Debug, Clone, PartialEq)]
pub enum GuiPayload {
    Xy(ButtonEvent),
    Lift(ButtonEvent),
    Syringes(SyringeRequest),
    Halt,
}

/// A press or release of one of the jog buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed { command: String },
    Released,
}

/// Syringe volumes are in GUI units (see [`crate::TICKS_PER_UNIT`]).
#[derive(Debug, Clone, PartialEq)]
pub enum SyringeRequest {
    Pull { volume: f64 },
    Push { volume: f64 },
    PushAll,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Missing field \"{0}\"")]
    MissingField(&'static str),

    #[error("Field \"{0}\" has the wrong type")]
    InvalidField(&'static str),

    #[error("Unknown payload type \"{0}\"")]
    UnknownType(String),

    #[error("Unknown button state \"{0}\"")]
    UnknownButtonState(String),

    #[error("Unknown syringe action \"{0}\"")]
    UnknownSyringeAction(String),
}

#[derive(Debug, Clone, Copy, EnumString)]
#[strum(serialize_all = "lowercase")]
enum PayloadType {
    Xy,
    Lift,
    Syringes,
    Halt,
}

#[derive(Debug, Clone, Copy, EnumString)]
#[strum(serialize_all = "lowercase")]
enum ButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
enum SyringeAction {
    Pull,
    Push,
    PushAll,
}

impl GuiPayload {
    pub fn from_value(value: &Value) -> Result<Self, DecodeError> {
        let message = value.as_object().ok_or(DecodeError::NotAnObject)?;

        let kind = str_field(message, "type")?;
        let kind: PayloadType = kind
            .parse()
            .map_err(|_| DecodeError::UnknownType(kind.to_string()))?;

        match kind {
            PayloadType::Xy => Ok(Self::Xy(ButtonEvent::decode(payload(message)?)?)),
            PayloadType::Lift => Ok(Self::Lift(ButtonEvent::decode(payload(message)?)?)),
            PayloadType::Syringes => Ok(Self::Syringes(SyringeRequest::decode(payload(
                message,
            )?)?)),
            PayloadType::Halt => Ok(Self::Halt),
        }
    }
}

impl TryFrom<&Value> for GuiPayload {
    type Error = DecodeError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl ButtonEvent {
    fn decode(payload: &Map<String, Value>) -> Result<Self, DecodeError> {
        let state = str_field(payload, "state")?;

        match state.parse::<ButtonState>() {
            Ok(ButtonState::Pressed) => Ok(Self::Pressed {
                command: str_field(payload, "command")?.to_string(),
            }),
            Ok(ButtonState::Released) => Ok(Self::Released),
            Err(_) => Err(DecodeError::UnknownButtonState(state.to_string())),
        }
    }
}

impl SyringeRequest {
    fn decode(payload: &Map<String, Value>) -> Result<Self, DecodeError> {
        let action = str_field(payload, "command")?;

        match action.parse::<SyringeAction>() {
            Ok(SyringeAction::Pull) => Ok(Self::Pull {
                volume: volume_field(payload)?,
            }),
            Ok(SyringeAction::Push) => Ok(Self::Push {
                volume: volume_field(payload)?,
            }),
            Ok(SyringeAction::PushAll) => Ok(Self::PushAll),
            Err(_) => Err(DecodeError::UnknownSyringeAction(action.to_string())),
        }
    }
}

fn field<'a>(object: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, DecodeError> {
    object.get(name).ok_or(DecodeError::MissingField(name))
}

fn str_field<'a>(object: &'a Map<String, Value>, name: &'static str) -> Result<&'a str, DecodeError> {
    field(object, name)?
        .as_str()
        .ok_or(DecodeError::InvalidField(name))
}

fn number_field(object: &Map<String, Value>, name: &'static str) -> Result<f64, DecodeError> {
    field(object, name)?
        .as_f64()
        .ok_or(DecodeError::InvalidField(name))
}

/// A volume whose tick count fits in an `i64`.
fn volume_field(object: &Map<String, Value>) -> Result<f64, DecodeError> {
    let volume = number_field(object, "value")?;

    if (volume * crate::TICKS_PER_UNIT).abs() < i64::MAX as f64 {
        Ok(volume)
    } else {
        Err(DecodeError::InvalidField("value"))
    }
}

fn payload(message: &Map<String, Value>) -> Result<&Map<String, Value>, DecodeError> {
    field(message, "payload")?
        .as_object()
        .ok_or(DecodeError::InvalidField("payload"))
}
