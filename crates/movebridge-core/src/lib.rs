//! movebridge Core - Peripheral schema, registry, channel manifest and frame publishing
//!
//! This crate maps a heterogeneous set of tracked peripherals onto flat,
//! contiguously indexed tracker/analog/button channels:
//! - Device type schema describing the channel shape of every peripheral kind
//! - Peripheral registry validated against the tracking service's live device list
//! - Channel manifest built once from the registry
//! - Frame publisher that re-walks the registry every tick and fills the same indices
//! - Pose conversion from the tracking service's units to the consumer's

pub mod bridge;
pub mod manifest;
pub mod pose;
pub mod publisher;
pub mod registry;
pub mod schema;
pub mod service;
pub mod sim;
pub mod sink;
pub mod state;

pub use bridge::{Bridge, BridgeError};
pub use manifest::{ChannelKind, ChannelManifest, ChannelRef};
pub use pose::{to_consumer_pose, Pose, Quaternion, Vector3, DISTANCE_DIVISOR};
pub use publisher::{FramePublisher, FrameStats, PublishError};
pub use registry::{
    Claimed, Peripheral, PeripheralCandidate, PeripheralRegistry, PeripheralSpec, RegistrationPolicy,
    RegistryError, RejectReason, TypeTag,
};
pub use schema::{schema_for, AnalogEncoding, AnalogField, ButtonField, PeripheralSchema, PeripheralType};
pub use service::{
    ControllerKind, DeviceList, DeviceTarget, HmdKind, ServiceError, StreamFlags, TrackingService,
    DEFAULT_TIMEOUT_MS,
};
pub use sim::{SimulatedService, StreamLog};
pub use sink::{ChannelSink, FrameBuffer};
pub use state::{ButtonState, DeviceState, GamepadState, NavState, TrackedPose, WandState};
