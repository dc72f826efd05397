//! Peripheral registry
//!
//! Validates configured peripherals against the tracking service's live
//! device list, starts a data stream for each accepted one, and keeps them in
//! registration order. That order is the channel traversal order for the
//! whole session and is never re-sorted.
//!
//! The registry owns the service session: every stream it starts is stopped
//! when the registry is dropped or [`PeripheralRegistry::release_all`] runs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::schema::PeripheralType;
use crate::service::{DeviceList, DeviceTarget, ServiceError, StreamFlags, TrackingService, DEFAULT_TIMEOUT_MS};
use crate::state::DeviceState;

/// Why a configured peripheral was not registered
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RejectReason {
    #[error("name is empty")]
    EmptyName,
    #[error("id {0} is out of range")]
    InvalidId(i64),
    #[error("unknown type \"{0}\" (valid types are Move, Navi, DualShock4, VirtualMove, VirtualHMD and PSVR)")]
    UnknownType(String),
    #[error("name \"{0}\" is already registered")]
    DuplicateName(String),
    #[error("{0} is already registered under another name")]
    DuplicateDevice(DeviceTarget),
    #[error("{0} is not connected, connect it and restart")]
    NotConnected(DeviceTarget),
    #[error("{target} is a {actual}, not a {declared}")]
    TypeMismatch {
        target: DeviceTarget,
        declared: PeripheralType,
        actual: PeripheralType,
    },
    #[error("failed to start data stream: {0}")]
    StreamFailed(ServiceError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("No controllers specified")]
    NoPeripheralsConfigured,
    #[error("Peripheral \"{name}\" rejected: {reason}")]
    Rejected { name: String, reason: RejectReason },
    #[error("Failed to enumerate devices: {0}")]
    Service(#[from] ServiceError),
}

/// What to do when a configured peripheral fails validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegistrationPolicy {
    /// Log a warning and register the remaining peripherals
    #[default]
    SkipInvalid,
    /// Release everything acquired so far and fail startup
    Strict,
}

/// Peripheral type as written in configuration: a name or a numeric code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeTag {
    Code(i64),
    Name(String),
}

impl TypeTag {
    pub fn resolve(&self) -> Option<PeripheralType> {
        match self {
            Self::Code(code) => PeripheralType::from_code(*code),
            Self::Name(name) => PeripheralType::from_name(name),
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{}", code),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<PeripheralType> for TypeTag {
    fn from(kind: PeripheralType) -> Self {
        Self::Name(kind.config_name().to_string())
    }
}

fn default_id() -> i64 {
    -1
}

/// A configured peripheral before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_id")]
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: TypeTag,
}

impl PeripheralCandidate {
    pub fn new(name: &str, id: i64, kind: impl Into<TypeTag>) -> Self {
        Self {
            name: name.to_string(),
            id,
            kind: kind.into(),
        }
    }
}

/// A validated peripheral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralSpec {
    /// Unique name, prefix of every semantic path of this peripheral
    pub name: String,
    /// Id in the service's controller or HMD table
    pub service_id: i32,
    pub kind: PeripheralType,
}

impl PeripheralSpec {
    /// Where the service lists this peripheral
    pub fn target(&self) -> DeviceTarget {
        if self.kind.is_hmd() {
            DeviceTarget::Hmd(self.service_id)
        } else {
            DeviceTarget::Controller(self.service_id)
        }
    }
}

/// Proof that a device stream was started; owned by exactly one registry entry
#[derive(Debug)]
pub struct StreamHandle {
    target: DeviceTarget,
}

/// A registered peripheral with a live data stream
#[derive(Debug)]
pub struct Peripheral {
    pub spec: PeripheralSpec,
    stream: StreamHandle,
}

/// Names and devices already claimed by accepted peripherals
#[derive(Debug, Default)]
pub struct Claimed {
    pub names: HashSet<String>,
    pub targets: HashSet<DeviceTarget>,
}

impl Claimed {
    fn claim(&mut self, spec: &PeripheralSpec) {
        self.names.insert(spec.name.clone());
        self.targets.insert(spec.target());
    }
}

/// Check one candidate against the live device list and what is already claimed
pub fn validate(
    candidate: &PeripheralCandidate,
    devices: &DeviceList,
    claimed: &Claimed,
) -> Result<PeripheralSpec, RejectReason> {
    if candidate.name.is_empty() {
        return Err(RejectReason::EmptyName);
    }
    let service_id = i32::try_from(candidate.id)
        .ok()
        .filter(|id| *id >= 0)
        .ok_or(RejectReason::InvalidId(candidate.id))?;
    let kind = candidate
        .kind
        .resolve()
        .ok_or_else(|| RejectReason::UnknownType(candidate.kind.to_string()))?;
    if claimed.names.contains(&candidate.name) {
        return Err(RejectReason::DuplicateName(candidate.name.clone()));
    }

    let spec = PeripheralSpec {
        name: candidate.name.clone(),
        service_id,
        kind,
    };
    let target = spec.target();
    match devices.reported_type(target) {
        None => Err(RejectReason::NotConnected(target)),
        Some(actual) if actual != kind => Err(RejectReason::TypeMismatch {
            target,
            declared: kind,
            actual,
        }),
        Some(_) if claimed.targets.contains(&target) => Err(RejectReason::DuplicateDevice(target)),
        Some(_) => Ok(spec),
    }
}

/// Ordered set of registered peripherals plus the service session they stream from
pub struct PeripheralRegistry<S: TrackingService> {
    service: S,
    peripherals: Vec<Peripheral>,
}

impl<S: TrackingService> PeripheralRegistry<S> {
    /// Validate candidates in order and start a stream for each accepted one
    pub fn register(
        service: S,
        candidates: &[PeripheralCandidate],
        policy: RegistrationPolicy,
    ) -> Result<Self, RegistryError> {
        Self::register_with_timeout(service, candidates, policy, DEFAULT_TIMEOUT_MS)
    }

    pub fn register_with_timeout(
        mut service: S,
        candidates: &[PeripheralCandidate],
        policy: RegistrationPolicy,
        timeout_ms: u64,
    ) -> Result<Self, RegistryError> {
        if candidates.is_empty() {
            return Err(RegistryError::NoPeripheralsConfigured);
        }

        let devices = service.device_list(timeout_ms)?;
        debug!(
            controllers = devices.controllers.len(),
            hmds = devices.hmds.len(),
            "Enumerated tracking service devices"
        );

        // Built before any stream starts so an early return releases them
        let mut registry = Self {
            service,
            peripherals: Vec::with_capacity(candidates.len()),
        };
        let mut claimed = Claimed::default();

        for candidate in candidates {
            info!(
                peripheral = %candidate.name,
                id = candidate.id,
                kind = %candidate.kind,
                "Parsing device"
            );

            let outcome = validate(candidate, &devices, &claimed).and_then(|spec| {
                registry
                    .service
                    .start_stream(spec.target(), StreamFlags::FULL, timeout_ms)
                    .map(|()| spec)
                    .map_err(RejectReason::StreamFailed)
            });

            match outcome {
                Ok(spec) => {
                    info!(peripheral = %spec.name, target = %spec.target(), "Registered peripheral");
                    claimed.claim(&spec);
                    let stream = StreamHandle {
                        target: spec.target(),
                    };
                    registry.peripherals.push(Peripheral { spec, stream });
                }
                Err(reason) => {
                    warn!(peripheral = %candidate.name, id = candidate.id, reason = %reason, "Rejected peripheral");
                    if policy == RegistrationPolicy::Strict {
                        return Err(RegistryError::Rejected {
                            name: candidate.name.clone(),
                            reason,
                        });
                    }
                }
            }
        }

        info!(
            registered = registry.peripherals.len(),
            configured = candidates.len(),
            "Parsed controllers/HMDs"
        );
        Ok(registry)
    }

    /// Peripherals in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Peripheral> {
        self.peripherals.iter()
    }

    /// Validated specs in registration order
    pub fn specs(&self) -> impl Iterator<Item = &PeripheralSpec> {
        self.peripherals.iter().map(|p| &p.spec)
    }

    pub fn count(&self) -> usize {
        self.peripherals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peripherals.is_empty()
    }

    /// Process pending service messages
    pub fn pump(&mut self) -> Result<(), ServiceError> {
        self.service.pump()
    }

    /// Latest state of every peripheral, in registration order
    pub fn read_states(&mut self) -> Vec<Option<DeviceState>> {
        let service = &mut self.service;
        self.peripherals
            .iter()
            .map(|p| service.read_state(p.stream.target))
            .collect()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn service_mut(&mut self) -> &mut S {
        &mut self.service
    }

    /// Stop every stream this registry started and forget its peripherals.
    ///
    /// Safe to call more than once.
    pub fn release_all(&mut self) {
        for peripheral in self.peripherals.drain(..) {
            let target = peripheral.stream.target;
            match self.service.stop_stream(target) {
                Ok(()) => debug!(peripheral = %peripheral.spec.name, target = %target, "Released stream"),
                Err(e) => warn!(
                    peripheral = %peripheral.spec.name,
                    target = %target,
                    error = %e,
                    "Failed to release stream"
                ),
            }
        }
    }
}

impl<S: TrackingService> Drop for PeripheralRegistry<S> {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl<S: TrackingService> std::fmt::Debug for PeripheralRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeripheralRegistry")
            .field("peripherals", &self.peripherals)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ControllerKind, HmdKind};
    use crate::sim::SimulatedService;

    fn service() -> SimulatedService {
        let mut service = SimulatedService::new();
        service.connect_controller(0, ControllerKind::Move);
        service.connect_controller(1, ControllerKind::Navi);
        service.connect_controller(2, ControllerKind::DualShock4);
        service.connect_hmd(0, HmdKind::Morpheus);
        service.connect_hmd(1, HmdKind::Virtual);
        service
    }

    #[test]
    fn test_registration_order_preserved() {
        let candidates = vec![
            PeripheralCandidate::new("pad", 2, PeripheralType::Gamepad4Axis),
            PeripheralCandidate::new("head", 0, PeripheralType::PhysicalHMD),
            PeripheralCandidate::new("wand", 0, PeripheralType::WandController),
        ];
        let registry =
            PeripheralRegistry::register(service(), &candidates, RegistrationPolicy::SkipInvalid).unwrap();
        let names: Vec<&str> = registry.specs().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["pad", "head", "wand"]);
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.service().active_streams().len(), 3);
    }

    #[test]
    fn test_skip_invalid_keeps_remaining() {
        let candidates = vec![
            PeripheralCandidate::new("", 0, PeripheralType::WandController),
            PeripheralCandidate::new("neg", -1, PeripheralType::WandController),
            PeripheralCandidate::new("odd", 0, TypeTag::Name("Wiimote".to_string())),
            PeripheralCandidate::new("wrong", 1, PeripheralType::WandController),
            PeripheralCandidate::new("gone", 9, PeripheralType::WandController),
            PeripheralCandidate::new("wand", 0, PeripheralType::WandController),
            PeripheralCandidate::new("wand", 2, PeripheralType::Gamepad4Axis),
        ];
        let registry =
            PeripheralRegistry::register(service(), &candidates, RegistrationPolicy::SkipInvalid).unwrap();
        let names: Vec<&str> = registry.specs().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["wand"]);
    }

    #[test]
    fn test_strict_releases_acquired_streams() {
        let candidates = vec![
            PeripheralCandidate::new("wand", 0, PeripheralType::WandController),
            PeripheralCandidate::new("gone", 9, PeripheralType::WandController),
        ];
        let mut service = service();
        let err = PeripheralRegistry::register(&mut service, &candidates, RegistrationPolicy::Strict)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Rejected {
                name: "gone".to_string(),
                reason: RejectReason::NotConnected(DeviceTarget::Controller(9)),
            }
        );
        assert!(service.active_streams().is_empty());
        assert_eq!(service.stream_log().started, 1);
        assert_eq!(service.stream_log().stopped, 1);
    }

    #[test]
    fn test_drop_releases_streams() {
        let candidates = vec![
            PeripheralCandidate::new("wand", 0, PeripheralType::WandController),
            PeripheralCandidate::new("head", 1, PeripheralType::VirtualHMD),
        ];
        let mut service = service();
        {
            let registry =
                PeripheralRegistry::register(&mut service, &candidates, RegistrationPolicy::SkipInvalid)
                    .unwrap();
            assert_eq!(registry.count(), 2);
        }
        assert!(service.active_streams().is_empty());
    }

    #[test]
    fn test_release_all_idempotent() {
        let candidates = vec![PeripheralCandidate::new("wand", 0, PeripheralType::WandController)];
        let mut registry =
            PeripheralRegistry::register(service(), &candidates, RegistrationPolicy::SkipInvalid).unwrap();
        registry.release_all();
        registry.release_all();
        assert!(registry.is_empty());
        assert_eq!(registry.service().stream_log().stopped, 1);
    }

    #[test]
    fn test_stream_failure_skips_only_that_peripheral() {
        let mut service = service();
        service.fail_stream(DeviceTarget::Controller(0), ServiceError::Timeout);
        let candidates = vec![
            PeripheralCandidate::new("wand", 0, PeripheralType::WandController),
            PeripheralCandidate::new("nav", 1, PeripheralType::NavController),
        ];
        let registry =
            PeripheralRegistry::register(service, &candidates, RegistrationPolicy::SkipInvalid).unwrap();
        let names: Vec<&str> = registry.specs().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["nav"]);
    }

    #[test]
    fn test_same_device_under_two_names_streams_once() {
        let candidates = vec![
            PeripheralCandidate::new("a", 0, PeripheralType::WandController),
            PeripheralCandidate::new("b", 0, PeripheralType::WandController),
            PeripheralCandidate::new("head", 0, PeripheralType::PhysicalHMD),
        ];
        let mut service = service();
        {
            let registry =
                PeripheralRegistry::register(&mut service, &candidates, RegistrationPolicy::SkipInvalid)
                    .unwrap();
            // Controller 0 and HMD 0 are different devices
            let names: Vec<&str> = registry.specs().map(|s| s.name.as_str()).collect();
            assert_eq!(names, vec!["a", "head"]);
        }
        assert_eq!(service.stream_log(), crate::sim::StreamLog { started: 2, stopped: 2 });
    }

    #[test]
    fn test_same_device_twice_fails_strict() {
        let candidates = vec![
            PeripheralCandidate::new("a", 1, PeripheralType::NavController),
            PeripheralCandidate::new("b", 1, PeripheralType::NavController),
        ];
        let err = PeripheralRegistry::register(service(), &candidates, RegistrationPolicy::Strict).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Rejected {
                name: "b".to_string(),
                reason: RejectReason::DuplicateDevice(DeviceTarget::Controller(1)),
            }
        );
    }

    #[test]
    fn test_no_candidates_is_error() {
        let err = PeripheralRegistry::register(service(), &[], RegistrationPolicy::SkipInvalid).unwrap_err();
        assert_eq!(err, RegistryError::NoPeripheralsConfigured);
    }

    #[test]
    fn test_validate_reasons() {
        let mut devices = DeviceList::default();
        devices.controllers.push((0, ControllerKind::Move));
        devices.hmds.push((0, HmdKind::Virtual));
        devices.controllers.push((1, ControllerKind::Move));
        let mut claimed = Claimed::default();
        claimed.names.insert("used".to_string());
        claimed.targets.insert(DeviceTarget::Controller(1));

        let check = |c: PeripheralCandidate| validate(&c, &devices, &claimed);

        assert_eq!(
            check(PeripheralCandidate::new("a", 0, PeripheralType::WandController)).unwrap().target(),
            DeviceTarget::Controller(0)
        );
        assert_eq!(
            check(PeripheralCandidate::new("", 0, PeripheralType::WandController)),
            Err(RejectReason::EmptyName)
        );
        assert_eq!(
            check(PeripheralCandidate::new("a", -3, PeripheralType::WandController)),
            Err(RejectReason::InvalidId(-3))
        );
        assert_eq!(
            check(PeripheralCandidate::new("a", 0, TypeTag::Code(4))),
            Err(RejectReason::UnknownType("4".to_string()))
        );
        assert_eq!(
            check(PeripheralCandidate::new("used", 0, PeripheralType::WandController)),
            Err(RejectReason::DuplicateName("used".to_string()))
        );
        assert_eq!(
            check(PeripheralCandidate::new("b", 1, PeripheralType::WandController)),
            Err(RejectReason::DuplicateDevice(DeviceTarget::Controller(1)))
        );
        // PSVR needs a physical headset, a virtual one does not qualify
        assert_eq!(
            check(PeripheralCandidate::new("a", 0, PeripheralType::PhysicalHMD)),
            Err(RejectReason::TypeMismatch {
                target: DeviceTarget::Hmd(0),
                declared: PeripheralType::PhysicalHMD,
                actual: PeripheralType::VirtualHMD,
            })
        );
        assert_eq!(
            check(PeripheralCandidate::new("a", 0, TypeTag::Name("VirtualHMD".to_string())))
                .unwrap()
                .kind,
            PeripheralType::VirtualHMD
        );
    }

    #[test]
    fn test_candidate_type_accepts_name_or_code() {
        let by_name: PeripheralCandidate =
            serde_json::from_str(r#"{"name": "left", "id": 0, "type": "Move"}"#).unwrap();
        assert_eq!(by_name.kind.resolve(), Some(PeripheralType::WandController));

        let by_code: PeripheralCandidate =
            serde_json::from_str(r#"{"name": "head", "id": 1, "type": 3}"#).unwrap();
        assert_eq!(by_code.kind.resolve(), Some(PeripheralType::VirtualHMD));

        let no_id: PeripheralCandidate = serde_json::from_str(r#"{"name": "x", "type": "Navi"}"#).unwrap();
        assert_eq!(no_id.id, -1);
    }
}
