//! Simulated connector
//!
//! Builds an in-process [`SimulatedService`] from a rig description, so the
//! daemon can run without a tracking service on the machine.

use movebridge_core::{ControllerKind, HmdKind, PeripheralType, ServiceError, SimulatedService};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::connect::{Connector, ServiceEndpoint};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RigError {
    #[error("Unknown device kind \"{0}\" in simulation rig")]
    UnknownKind(String),
    #[error("Simulated device id {0} is negative")]
    NegativeId(i32),
}

/// One device connected to the simulated service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigDevice {
    pub id: i32,
    /// Same names accepted for peripheral types in configuration
    pub kind: String,
}

impl RigDevice {
    pub fn new(id: i32, kind: PeripheralType) -> Self {
        Self {
            id,
            kind: kind.config_name().to_string(),
        }
    }
}

/// Devices and behaviour of a simulated tracking service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedRig {
    #[serde(default)]
    pub devices: Vec<RigDevice>,
    /// Report "no data" for every device on every n-th tick (0 disables)
    #[serde(default)]
    pub drop_every: u64,
    #[serde(default = "default_true")]
    pub animate: bool,
}

impl Default for SimulatedRig {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            drop_every: 0,
            animate: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl SimulatedRig {
    /// A fresh service session with this rig's devices connected
    pub fn build(&self) -> Result<SimulatedService, RigError> {
        let mut service = SimulatedService::new();
        for device in &self.devices {
            if device.id < 0 {
                return Err(RigError::NegativeId(device.id));
            }
            let kind =
                PeripheralType::from_name(&device.kind).ok_or_else(|| RigError::UnknownKind(device.kind.clone()))?;
            match kind {
                PeripheralType::WandController => service.connect_controller(device.id, ControllerKind::Move),
                PeripheralType::NavController => service.connect_controller(device.id, ControllerKind::Navi),
                PeripheralType::Gamepad4Axis => service.connect_controller(device.id, ControllerKind::DualShock4),
                PeripheralType::VirtualController => service.connect_controller(device.id, ControllerKind::Virtual),
                PeripheralType::VirtualHMD => service.connect_hmd(device.id, HmdKind::Virtual),
                PeripheralType::PhysicalHMD => service.connect_hmd(device.id, HmdKind::Morpheus),
            }
            debug!(id = device.id, kind = %kind, "Simulated device connected");
        }
        service.set_drop_every(self.drop_every);
        service.set_animate(self.animate);
        Ok(service)
    }
}

/// Connector serving a [`SimulatedRig`]
#[derive(Debug, Clone)]
pub struct SimulatedConnector {
    rig: SimulatedRig,
    failures_left: u32,
}

impl SimulatedConnector {
    pub fn new(rig: SimulatedRig) -> Self {
        Self { rig, failures_left: 0 }
    }

    /// Refuse the first `n` connection attempts
    pub fn failing_first(mut self, n: u32) -> Self {
        self.failures_left = n;
        self
    }
}

impl Connector for SimulatedConnector {
    type Service = SimulatedService;

    fn connect(&mut self, endpoint: &ServiceEndpoint) -> Result<SimulatedService, ServiceError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(ServiceError::Timeout);
        }
        let service = self.rig.build().map_err(|e| ServiceError::Other(e.to_string()))?;
        info!(
            endpoint = %endpoint,
            devices = self.rig.devices.len(),
            "Opened simulated tracking service"
        );
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect::{connect_with_retries, ConnectError};
    use movebridge_core::{DeviceTarget, TrackingService};

    fn rig() -> SimulatedRig {
        SimulatedRig {
            devices: vec![
                RigDevice::new(0, PeripheralType::WandController),
                RigDevice::new(0, PeripheralType::PhysicalHMD),
                RigDevice {
                    id: 1,
                    kind: "navi".to_string(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_rig_builds_device_tables() {
        let mut service = rig().build().unwrap();
        let devices = service.device_list(100).unwrap();
        assert_eq!(devices.controllers, vec![(0, ControllerKind::Move), (1, ControllerKind::Navi)]);
        assert_eq!(devices.hmds, vec![(0, HmdKind::Morpheus)]);
        assert_eq!(
            devices.reported_type(DeviceTarget::Hmd(0)),
            Some(PeripheralType::PhysicalHMD)
        );
    }

    #[test]
    fn test_rig_rejects_unknown_kind() {
        let rig = SimulatedRig {
            devices: vec![RigDevice {
                id: 0,
                kind: "Wiimote".to_string(),
            }],
            ..Default::default()
        };
        assert_eq!(rig.build().unwrap_err(), RigError::UnknownKind("Wiimote".to_string()));
    }

    #[test]
    fn test_rig_deserializes_with_defaults() {
        let rig: SimulatedRig = serde_json::from_str(r#"{"devices": [{"id": 2, "kind": "DualShock4"}]}"#).unwrap();
        assert_eq!(rig.devices, vec![RigDevice::new(2, PeripheralType::Gamepad4Axis)]);
        assert_eq!(rig.drop_every, 0);
        assert!(rig.animate);
    }

    #[tokio::test]
    async fn test_connector_retries_until_rig_is_up() {
        let mut connector = SimulatedConnector::new(rig()).failing_first(2);
        let endpoint = ServiceEndpoint {
            retry_delay_ms: 0,
            ..Default::default()
        };
        let mut service = connect_with_retries(&mut connector, &endpoint).await.unwrap();
        assert_eq!(service.device_list(100).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_broken_rig_exhausts_attempts() {
        let rig = SimulatedRig {
            devices: vec![RigDevice { id: -1, kind: "Move".to_string() }],
            ..Default::default()
        };
        let mut connector = SimulatedConnector::new(rig);
        let endpoint = ServiceEndpoint {
            retry_delay_ms: 0,
            connect_attempts: 2,
            ..Default::default()
        };
        let err = connect_with_retries(&mut connector, &endpoint).await.unwrap_err();
        let ConnectError::Exhausted { attempts, last } = err;
        assert_eq!(attempts, 2);
        assert_eq!(last, ServiceError::Other("Simulated device id -1 is negative".to_string()));
    }
}
