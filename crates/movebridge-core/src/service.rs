//! Tracking-service seam
//!
//! The bridge talks to the tracking service only through [`TrackingService`].
//! Backends (a network client, the in-process simulator) implement it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::PeripheralType;
use crate::state::DeviceState;

/// Default timeout for service requests, in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Connection cancelled")]
    Canceled,
    #[error("Connection error")]
    Error,
    #[error("No data received")]
    NoData,
    #[error("Connection timed out")]
    Timeout,
    #[error("Not connected to the tracking service")]
    Disconnected,
    #[error("Unknown device {0}")]
    UnknownDevice(DeviceTarget),
    #[error("{0}")]
    Other(String),
}

/// A device addressed in the service's controller or HMD table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "table", content = "id", rename_all = "lowercase")]
pub enum DeviceTarget {
    Controller(i32),
    Hmd(i32),
}

impl DeviceTarget {
    pub fn id(&self) -> i32 {
        match self {
            Self::Controller(id) | Self::Hmd(id) => *id,
        }
    }
}

impl std::fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Controller(id) => write!(f, "controller {}", id),
            Self::Hmd(id) => write!(f, "hmd {}", id),
        }
    }
}

/// Controller kind as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerKind {
    Move,
    Navi,
    DualShock4,
    Virtual,
}

/// HMD kind as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HmdKind {
    Morpheus,
    Virtual,
}

/// Snapshot of the devices currently connected to the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceList {
    pub controllers: Vec<(i32, ControllerKind)>,
    pub hmds: Vec<(i32, HmdKind)>,
}

impl DeviceList {
    /// Look up the reported kind of a target, `None` if it is not connected
    pub fn reported_type(&self, target: DeviceTarget) -> Option<PeripheralType> {
        match target {
            DeviceTarget::Controller(id) => self
                .controllers
                .iter()
                .find(|(cid, _)| *cid == id)
                .map(|(_, kind)| match kind {
                    ControllerKind::Move => PeripheralType::WandController,
                    ControllerKind::Navi => PeripheralType::NavController,
                    ControllerKind::DualShock4 => PeripheralType::Gamepad4Axis,
                    ControllerKind::Virtual => PeripheralType::VirtualController,
                }),
            DeviceTarget::Hmd(id) => self
                .hmds
                .iter()
                .find(|(hid, _)| *hid == id)
                .map(|(_, kind)| match kind {
                    HmdKind::Morpheus => PeripheralType::PhysicalHMD,
                    HmdKind::Virtual => PeripheralType::VirtualHMD,
                }),
        }
    }

    pub fn len(&self) -> usize {
        self.controllers.len() + self.hmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Data requested when a device stream is started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFlags {
    pub position: bool,
    pub calibrated_sensor: bool,
    pub physics: bool,
}

impl StreamFlags {
    /// Everything the bridge publishes from
    pub const FULL: StreamFlags = StreamFlags {
        position: true,
        calibrated_sensor: true,
        physics: true,
    };
}

/// Operations the bridge needs from a connected tracking-service session
pub trait TrackingService {
    /// Enumerate connected controllers and HMDs
    fn device_list(&mut self, timeout_ms: u64) -> Result<DeviceList, ServiceError>;

    /// Allocate a listener for a device and start its data stream
    fn start_stream(
        &mut self,
        target: DeviceTarget,
        flags: StreamFlags,
        timeout_ms: u64,
    ) -> Result<(), ServiceError>;

    /// Stop a device's data stream and free its listener
    fn stop_stream(&mut self, target: DeviceTarget) -> Result<(), ServiceError>;

    /// Process pending service messages without blocking
    fn pump(&mut self) -> Result<(), ServiceError>;

    /// Latest cached state of a streaming device, `None` if nothing fresh arrived
    fn read_state(&mut self, target: DeviceTarget) -> Option<DeviceState>;
}

impl<T: TrackingService + ?Sized> TrackingService for Box<T> {
    fn device_list(&mut self, timeout_ms: u64) -> Result<DeviceList, ServiceError> {
        (**self).device_list(timeout_ms)
    }

    fn start_stream(
        &mut self,
        target: DeviceTarget,
        flags: StreamFlags,
        timeout_ms: u64,
    ) -> Result<(), ServiceError> {
        (**self).start_stream(target, flags, timeout_ms)
    }

    fn stop_stream(&mut self, target: DeviceTarget) -> Result<(), ServiceError> {
        (**self).stop_stream(target)
    }

    fn pump(&mut self) -> Result<(), ServiceError> {
        (**self).pump()
    }

    fn read_state(&mut self, target: DeviceTarget) -> Option<DeviceState> {
        (**self).read_state(target)
    }
}

impl<T: TrackingService + ?Sized> TrackingService for &mut T {
    fn device_list(&mut self, timeout_ms: u64) -> Result<DeviceList, ServiceError> {
        (**self).device_list(timeout_ms)
    }

    fn start_stream(
        &mut self,
        target: DeviceTarget,
        flags: StreamFlags,
        timeout_ms: u64,
    ) -> Result<(), ServiceError> {
        (**self).start_stream(target, flags, timeout_ms)
    }

    fn stop_stream(&mut self, target: DeviceTarget) -> Result<(), ServiceError> {
        (**self).stop_stream(target)
    }

    fn pump(&mut self) -> Result<(), ServiceError> {
        (**self).pump()
    }

    fn read_state(&mut self, target: DeviceTarget) -> Option<DeviceState> {
        (**self).read_state(target)
    }
}
