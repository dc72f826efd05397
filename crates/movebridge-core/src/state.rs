//! Per-tick device state records read from the tracking service
//!
//! A state record is only valid for the tick it was read in. Each record
//! answers field lookups keyed by the schema's field ids, so the publisher
//! never needs to know a record's concrete layout.

use serde::{Deserialize, Serialize};

use crate::pose::{Quaternion, Vector3};
use crate::schema::{AnalogField, ButtonField, PeripheralType};

/// Button state as reported by the tracking service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonState {
    #[default]
    Up,
    /// Went down since the previous service update
    Pressed,
    Down,
    /// Went up since the previous service update
    Released,
}

impl ButtonState {
    /// A channel reads `true` only while the button is held down
    pub fn is_down(&self) -> bool {
        matches!(self, Self::Down)
    }
}

/// Position and orientation in the tracking service's convention
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackedPose {
    pub position: Vector3,
    pub orientation: Quaternion,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WandState {
    pub pose: TrackedPose,
    /// Trigger travel, 0..=255
    pub trigger: u8,
    pub triangle: ButtonState,
    pub circle: ButtonState,
    pub cross: ButtonState,
    pub square: ButtonState,
    pub select: ButtonState,
    pub start: ButtonState,
    pub ps: ButtonState,
    #[serde(rename = "move")]
    pub move_button: ButtonState,
    pub trigger_button: ButtonState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NavState {
    /// Trigger travel, 0..=255
    pub trigger: u8,
    /// Stick deflection, 0..=255 with 128 centered
    pub stick_x: u8,
    pub stick_y: u8,
    pub l1: ButtonState,
    pub l2: ButtonState,
    pub l3: ButtonState,
    pub circle: ButtonState,
    pub cross: ButtonState,
    pub ps: ButtonState,
    pub trigger_button: ButtonState,
    pub dpad_up: ButtonState,
    pub dpad_right: ButtonState,
    pub dpad_down: ButtonState,
    pub dpad_left: ButtonState,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GamepadState {
    pub pose: TrackedPose,
    /// Stick axes, normalized to [-1, 1]
    pub left_x: f32,
    pub left_y: f32,
    pub right_x: f32,
    pub right_y: f32,
    /// Trigger travel, [0, 1]
    pub left_trigger: f32,
    pub right_trigger: f32,
    pub dpad_up: ButtonState,
    pub dpad_down: ButtonState,
    pub dpad_left: ButtonState,
    pub dpad_right: ButtonState,
    pub square: ButtonState,
    pub cross: ButtonState,
    pub circle: ButtonState,
    pub triangle: ButtonState,
    pub l1: ButtonState,
    pub r1: ButtonState,
    pub l2: ButtonState,
    pub r2: ButtonState,
    pub l3: ButtonState,
    pub r3: ButtonState,
    pub share: ButtonState,
    pub options: ButtonState,
    pub ps: ButtonState,
    pub trackpad: ButtonState,
}

/// Latest state of one peripheral, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceState {
    Wand(WandState),
    Nav(NavState),
    Gamepad(GamepadState),
    VirtualController(TrackedPose),
    VirtualHmd(TrackedPose),
    PhysicalHmd(TrackedPose),
}

impl DeviceState {
    /// Neutral state for a kind: origin pose, released buttons, zeroed analogs
    pub fn neutral(kind: PeripheralType) -> Self {
        match kind {
            PeripheralType::WandController => Self::Wand(WandState::default()),
            PeripheralType::NavController => Self::Nav(NavState::default()),
            PeripheralType::Gamepad4Axis => Self::Gamepad(GamepadState::default()),
            PeripheralType::VirtualController => Self::VirtualController(TrackedPose::default()),
            PeripheralType::VirtualHMD => Self::VirtualHmd(TrackedPose::default()),
            PeripheralType::PhysicalHMD => Self::PhysicalHmd(TrackedPose::default()),
        }
    }

    /// Peripheral kind this record belongs to
    pub fn kind(&self) -> PeripheralType {
        match self {
            Self::Wand(_) => PeripheralType::WandController,
            Self::Nav(_) => PeripheralType::NavController,
            Self::Gamepad(_) => PeripheralType::Gamepad4Axis,
            Self::VirtualController(_) => PeripheralType::VirtualController,
            Self::VirtualHmd(_) => PeripheralType::VirtualHMD,
            Self::PhysicalHmd(_) => PeripheralType::PhysicalHMD,
        }
    }

    /// Tracked pose, if this kind is tracked
    pub fn pose(&self) -> Option<TrackedPose> {
        match self {
            Self::Wand(s) => Some(s.pose),
            Self::Gamepad(s) => Some(s.pose),
            Self::VirtualController(p) | Self::VirtualHmd(p) | Self::PhysicalHmd(p) => Some(*p),
            Self::Nav(_) => None,
        }
    }

    /// Raw analog reading, before encoding; `None` if this kind lacks the field
    pub fn analog(&self, field: AnalogField) -> Option<f64> {
        let raw = match (self, field) {
            (Self::Wand(s), AnalogField::Trigger) => f64::from(s.trigger),
            (Self::Nav(s), AnalogField::Trigger) => f64::from(s.trigger),
            (Self::Nav(s), AnalogField::StickX) => f64::from(s.stick_x),
            (Self::Nav(s), AnalogField::StickY) => f64::from(s.stick_y),
            (Self::Gamepad(s), AnalogField::LeftStickX) => f64::from(s.left_x),
            (Self::Gamepad(s), AnalogField::LeftStickY) => f64::from(s.left_y),
            (Self::Gamepad(s), AnalogField::RightStickX) => f64::from(s.right_x),
            (Self::Gamepad(s), AnalogField::RightStickY) => f64::from(s.right_y),
            (Self::Gamepad(s), AnalogField::LeftTrigger) => f64::from(s.left_trigger),
            (Self::Gamepad(s), AnalogField::RightTrigger) => f64::from(s.right_trigger),
            _ => return None,
        };
        Some(raw)
    }

    /// Button state; fields this kind lacks read as [`ButtonState::Up`]
    pub fn button(&self, field: ButtonField) -> ButtonState {
        use ButtonField as B;
        match self {
            Self::Wand(s) => match field {
                B::Triangle => s.triangle,
                B::Circle => s.circle,
                B::Cross => s.cross,
                B::Square => s.square,
                B::Select => s.select,
                B::Start => s.start,
                B::Ps => s.ps,
                B::Move => s.move_button,
                B::TriggerButton => s.trigger_button,
                _ => ButtonState::Up,
            },
            Self::Nav(s) => match field {
                B::L1 => s.l1,
                B::L2 => s.l2,
                B::L3 => s.l3,
                B::Circle => s.circle,
                B::Cross => s.cross,
                B::Ps => s.ps,
                B::TriggerButton => s.trigger_button,
                B::DPadUp => s.dpad_up,
                B::DPadRight => s.dpad_right,
                B::DPadDown => s.dpad_down,
                B::DPadLeft => s.dpad_left,
                _ => ButtonState::Up,
            },
            Self::Gamepad(s) => match field {
                B::DPadUp => s.dpad_up,
                B::DPadDown => s.dpad_down,
                B::DPadLeft => s.dpad_left,
                B::DPadRight => s.dpad_right,
                B::Square => s.square,
                B::Cross => s.cross,
                B::Circle => s.circle,
                B::Triangle => s.triangle,
                B::L1 => s.l1,
                B::R1 => s.r1,
                B::L2 => s.l2,
                B::R2 => s.r2,
                B::L3 => s.l3,
                B::R3 => s.r3,
                B::Share => s.share,
                B::Options => s.options,
                B::Ps => s.ps,
                B::TrackPad => s.trackpad,
                _ => ButtonState::Up,
            },
            Self::VirtualController(_) | Self::VirtualHmd(_) | Self::PhysicalHmd(_) => ButtonState::Up,
        }
    }
}
