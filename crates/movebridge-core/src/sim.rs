//! In-process tracking service
//!
//! Keeps a scripted device table and per-device state records in memory.
//! Used by tests and by the daemon when no real service client is wired in.
//! Supports injected stream failures and "no data" ticks so carry-forward
//! and release paths can be exercised.

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::trace;

use crate::pose::{Quaternion, Vector3};
use crate::service::{
    ControllerKind, DeviceList, DeviceTarget, HmdKind, ServiceError, StreamFlags, TrackingService,
};
use crate::state::{DeviceState, TrackedPose};

/// Counts of stream start/stop calls that succeeded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamLog {
    pub started: usize,
    pub stopped: usize,
}

#[derive(Debug, Default)]
pub struct SimulatedService {
    devices: DeviceList,
    states: HashMap<DeviceTarget, DeviceState>,
    streaming: BTreeSet<(u8, i32)>,
    failing_streams: HashMap<DeviceTarget, ServiceError>,
    stale_once: HashSet<DeviceTarget>,
    drop_every: u64,
    animate: bool,
    tick: u64,
    log: StreamLog,
}

fn key(target: DeviceTarget) -> (u8, i32) {
    match target {
        DeviceTarget::Controller(id) => (0, id),
        DeviceTarget::Hmd(id) => (1, id),
    }
}

fn unkey((table, id): (u8, i32)) -> DeviceTarget {
    if table == 0 {
        DeviceTarget::Controller(id)
    } else {
        DeviceTarget::Hmd(id)
    }
}

impl SimulatedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a controller to the device table
    pub fn connect_controller(&mut self, id: i32, kind: ControllerKind) {
        self.devices.controllers.retain(|(cid, _)| *cid != id);
        self.devices.controllers.push((id, kind));
    }

    /// Add an HMD to the device table
    pub fn connect_hmd(&mut self, id: i32, kind: HmdKind) {
        self.devices.hmds.retain(|(hid, _)| *hid != id);
        self.devices.hmds.push((id, kind));
    }

    /// Replace the cached state of a device
    pub fn set_state(&mut self, target: DeviceTarget, state: DeviceState) {
        self.states.insert(target, state);
    }

    /// Make the next `start_stream` for `target` fail
    pub fn fail_stream(&mut self, target: DeviceTarget, error: ServiceError) {
        self.failing_streams.insert(target, error);
    }

    /// Report "no data" for `target` on its next read
    pub fn drop_next(&mut self, target: DeviceTarget) {
        self.stale_once.insert(target);
    }

    /// Report "no data" for every device on every `n`-th tick (0 disables)
    pub fn set_drop_every(&mut self, n: u64) {
        self.drop_every = n;
    }

    /// Move tracked devices along a slow circle on every pump
    pub fn set_animate(&mut self, animate: bool) {
        self.animate = animate;
    }

    /// Targets with a running stream
    pub fn active_streams(&self) -> Vec<DeviceTarget> {
        self.streaming.iter().copied().map(unkey).collect()
    }

    pub fn stream_log(&self) -> StreamLog {
        self.log
    }

    fn neutral_state(&self, target: DeviceTarget) -> Option<DeviceState> {
        self.devices.reported_type(target).map(DeviceState::neutral)
    }

    fn advance_motion(&mut self) {
        let t = self.tick as f64 * 0.05;
        let targets: Vec<DeviceTarget> = self.active_streams();
        for target in targets {
            let Some(mut state) = self.states.get(&target).cloned().or_else(|| self.neutral_state(target)) else {
                continue;
            };
            let phase = t + f64::from(target.id());
            let pose = TrackedPose {
                position: Vector3::new((20.0 * phase.sin()) as f32, 150.0, (20.0 * phase.cos()) as f32),
                orientation: Quaternion::new((phase / 2.0).cos(), 0.0, (phase / 2.0).sin(), 0.0),
            };
            match &mut state {
                DeviceState::Wand(s) => s.pose = pose,
                DeviceState::Gamepad(s) => s.pose = pose,
                DeviceState::VirtualController(p) | DeviceState::VirtualHmd(p) | DeviceState::PhysicalHmd(p) => {
                    *p = pose
                }
                DeviceState::Nav(_) => {}
            }
            self.states.insert(target, state);
        }
    }
}

impl TrackingService for SimulatedService {
    fn device_list(&mut self, _timeout_ms: u64) -> Result<DeviceList, ServiceError> {
        Ok(self.devices.clone())
    }

    fn start_stream(
        &mut self,
        target: DeviceTarget,
        _flags: StreamFlags,
        _timeout_ms: u64,
    ) -> Result<(), ServiceError> {
        if let Some(error) = self.failing_streams.remove(&target) {
            return Err(error);
        }
        if self.devices.reported_type(target).is_none() {
            return Err(ServiceError::UnknownDevice(target));
        }
        if self.streaming.insert(key(target)) {
            self.log.started += 1;
        }
        Ok(())
    }

    fn stop_stream(&mut self, target: DeviceTarget) -> Result<(), ServiceError> {
        if self.streaming.remove(&key(target)) {
            self.log.stopped += 1;
            Ok(())
        } else {
            Err(ServiceError::UnknownDevice(target))
        }
    }

    fn pump(&mut self) -> Result<(), ServiceError> {
        self.tick += 1;
        if self.animate {
            self.advance_motion();
        }
        trace!(tick = self.tick, "Pumped simulated service");
        Ok(())
    }

    fn read_state(&mut self, target: DeviceTarget) -> Option<DeviceState> {
        if !self.streaming.contains(&key(target)) {
            return None;
        }
        if self.stale_once.remove(&target) {
            return None;
        }
        if self.drop_every > 0 && self.tick % self.drop_every == 0 {
            return None;
        }
        self.states.get(&target).cloned().or_else(|| self.neutral_state(target))
    }
}
