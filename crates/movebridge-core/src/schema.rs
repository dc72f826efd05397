//! Device type schema
//!
//! The single table describing, per peripheral kind, how many tracker channels
//! it contributes and which analog and button fields it exposes, in order.
//! Both the manifest builder and the frame publisher walk these lists, so the
//! field order written here is the channel order everywhere.

use serde::{Deserialize, Serialize};

/// Kind of peripheral exposed by the tracking service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeripheralType {
    /// Motion wand with a single trigger analog ("Move")
    WandController,
    /// Untracked auxiliary nav-pad ("Navi")
    NavController,
    /// Tracked gamepad with two sticks and two triggers ("DualShock4")
    Gamepad4Axis,
    /// Pose-only controller emulated by the service ("VirtualMove")
    VirtualController,
    /// Pose-only headset emulated by the service ("VirtualHMD")
    VirtualHMD,
    /// Physical headset ("PSVR")
    PhysicalHMD,
}

impl PeripheralType {
    pub const ALL: [PeripheralType; 6] = [
        PeripheralType::WandController,
        PeripheralType::NavController,
        PeripheralType::Gamepad4Axis,
        PeripheralType::VirtualController,
        PeripheralType::VirtualHMD,
        PeripheralType::PhysicalHMD,
    ];

    /// Resolve a configuration type name.
    ///
    /// Accepts the short names used in existing plugin configurations
    /// (`Move`, `Navi`, `DualShock4`, `VirtualMove`, `VirtualHMD`, `PSVR`) as
    /// well as the variant names. Matching ignores ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| {
            t.config_name().eq_ignore_ascii_case(name) || t.variant_name().eq_ignore_ascii_case(name)
        })
    }

    /// Resolve a numeric configuration type code.
    ///
    /// Codes 0-3 keep their legacy meaning; 4 was the "null device" and
    /// resolves to nothing.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::WandController),
            1 => Some(Self::NavController),
            2 => Some(Self::PhysicalHMD),
            3 => Some(Self::VirtualHMD),
            5 => Some(Self::Gamepad4Axis),
            6 => Some(Self::VirtualController),
            _ => None,
        }
    }

    /// Short name used in configuration files
    pub fn config_name(&self) -> &'static str {
        match self {
            Self::WandController => "Move",
            Self::NavController => "Navi",
            Self::Gamepad4Axis => "DualShock4",
            Self::VirtualController => "VirtualMove",
            Self::VirtualHMD => "VirtualHMD",
            Self::PhysicalHMD => "PSVR",
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            Self::WandController => "WandController",
            Self::NavController => "NavController",
            Self::Gamepad4Axis => "Gamepad4Axis",
            Self::VirtualController => "VirtualController",
            Self::VirtualHMD => "VirtualHMD",
            Self::PhysicalHMD => "PhysicalHMD",
        }
    }

    /// Whether the tracking service lists this kind among its HMDs
    pub fn is_hmd(&self) -> bool {
        matches!(self, Self::VirtualHMD | Self::PhysicalHMD)
    }
}

impl std::fmt::Display for PeripheralType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.config_name())
    }
}

/// How a raw analog reading becomes a published channel value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogEncoding {
    /// Already a hardware byte in 0..=255
    Passthrough,
    /// Normalized [-1, 1], rescaled with `round(255 * (v + 1) / 2)`
    Normalized,
    /// Unit [0, 1], rescaled with `round(255 * v)`
    Unit,
}

impl AnalogEncoding {
    /// Convert a raw reading into the common 0..=255 range
    pub fn apply(&self, raw: f64) -> f64 {
        match self {
            Self::Passthrough => raw,
            Self::Normalized => (255.0 * (raw.clamp(-1.0, 1.0) + 1.0) / 2.0).round(),
            Self::Unit => (255.0 * raw.clamp(0.0, 1.0)).round(),
        }
    }
}

/// Analog field exposed by a peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogField {
    Trigger,
    StickX,
    StickY,
    LeftStickX,
    LeftStickY,
    RightStickX,
    RightStickY,
    LeftTrigger,
    RightTrigger,
}

impl AnalogField {
    /// Semantic path suffix, appended as `<name>/<suffix>`
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Trigger => "trigger",
            Self::StickX => "stickx",
            Self::StickY => "sticky",
            Self::LeftStickX => "lstickx",
            Self::LeftStickY => "lsticky",
            Self::RightStickX => "rstickx",
            Self::RightStickY => "rsticky",
            Self::LeftTrigger => "ltrigger",
            Self::RightTrigger => "rtrigger",
        }
    }

    pub fn encoding(&self) -> AnalogEncoding {
        match self {
            Self::Trigger | Self::StickX | Self::StickY => AnalogEncoding::Passthrough,
            Self::LeftStickX | Self::LeftStickY | Self::RightStickX | Self::RightStickY => {
                AnalogEncoding::Normalized
            }
            Self::LeftTrigger | Self::RightTrigger => AnalogEncoding::Unit,
        }
    }
}

/// Button field exposed by a peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonField {
    Triangle,
    Circle,
    Cross,
    Square,
    Select,
    Start,
    Ps,
    Move,
    TriggerButton,
    L1,
    L2,
    L3,
    R1,
    R2,
    R3,
    DPadUp,
    DPadRight,
    DPadDown,
    DPadLeft,
    Share,
    Options,
    TrackPad,
}

impl ButtonField {
    /// Semantic path suffix, appended as `<name>/<suffix>`
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Triangle => "triangle",
            Self::Circle => "circle",
            Self::Cross => "cross",
            Self::Square => "square",
            Self::Select => "select",
            Self::Start => "start",
            Self::Ps => "ps",
            Self::Move => "move",
            Self::TriggerButton => "triggerbtn",
            Self::L1 => "l1",
            Self::L2 => "l2",
            Self::L3 => "l3",
            Self::R1 => "r1",
            Self::R2 => "r2",
            Self::R3 => "r3",
            Self::DPadUp => "dpadup",
            Self::DPadRight => "dpadright",
            Self::DPadDown => "dpaddown",
            Self::DPadLeft => "dpadleft",
            Self::Share => "share",
            Self::Options => "options",
            Self::TrackPad => "trackpad",
        }
    }
}

/// Semantic suffix of a tracker channel
pub const TRACKER_SUFFIX: &str = "tracker";

/// Channel shape of one peripheral kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeripheralSchema {
    pub trackable: bool,
    pub analogs: &'static [AnalogField],
    pub buttons: &'static [ButtonField],
}

impl PeripheralSchema {
    pub fn tracker_count(&self) -> usize {
        usize::from(self.trackable)
    }
}

const WAND_ANALOGS: &[AnalogField] = &[AnalogField::Trigger];

const WAND_BUTTONS: &[ButtonField] = &[
    ButtonField::Triangle,
    ButtonField::Circle,
    ButtonField::Cross,
    ButtonField::Square,
    ButtonField::Select,
    ButtonField::Start,
    ButtonField::Ps,
    ButtonField::Move,
    ButtonField::TriggerButton,
];

const NAV_ANALOGS: &[AnalogField] = &[AnalogField::Trigger, AnalogField::StickX, AnalogField::StickY];

const NAV_BUTTONS: &[ButtonField] = &[
    ButtonField::L1,
    ButtonField::L2,
    ButtonField::L3,
    ButtonField::Circle,
    ButtonField::Cross,
    ButtonField::Ps,
    ButtonField::TriggerButton,
    ButtonField::DPadUp,
    ButtonField::DPadRight,
    ButtonField::DPadDown,
    ButtonField::DPadLeft,
];

const GAMEPAD_ANALOGS: &[AnalogField] = &[
    AnalogField::LeftStickX,
    AnalogField::LeftStickY,
    AnalogField::RightStickX,
    AnalogField::RightStickY,
    AnalogField::LeftTrigger,
    AnalogField::RightTrigger,
];

const GAMEPAD_BUTTONS: &[ButtonField] = &[
    ButtonField::DPadUp,
    ButtonField::DPadDown,
    ButtonField::DPadLeft,
    ButtonField::DPadRight,
    ButtonField::Square,
    ButtonField::Cross,
    ButtonField::Circle,
    ButtonField::Triangle,
    ButtonField::L1,
    ButtonField::R1,
    ButtonField::L2,
    ButtonField::R2,
    ButtonField::L3,
    ButtonField::R3,
    ButtonField::Share,
    ButtonField::Options,
    ButtonField::Ps,
    ButtonField::TrackPad,
];

const POSE_ONLY: PeripheralSchema = PeripheralSchema {
    trackable: true,
    analogs: &[],
    buttons: &[],
};

/// Look up the channel shape of a peripheral kind
pub fn schema_for(kind: PeripheralType) -> PeripheralSchema {
    match kind {
        PeripheralType::WandController => PeripheralSchema {
            trackable: true,
            analogs: WAND_ANALOGS,
            buttons: WAND_BUTTONS,
        },
        PeripheralType::NavController => PeripheralSchema {
            trackable: false,
            analogs: NAV_ANALOGS,
            buttons: NAV_BUTTONS,
        },
        PeripheralType::Gamepad4Axis => PeripheralSchema {
            trackable: true,
            analogs: GAMEPAD_ANALOGS,
            buttons: GAMEPAD_BUTTONS,
        },
        PeripheralType::VirtualController | PeripheralType::VirtualHMD | PeripheralType::PhysicalHMD => {
            POSE_ONLY
        }
    }
}
