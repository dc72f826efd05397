//! Frame publisher
//!
//! Runs once per tick. Walks the registry in registration order, advancing
//! one cursor per channel kind exactly the way [`ChannelManifest::build`]
//! did, and stages every channel value. The staged frame only reaches the
//! sink once the cursors have been checked against the manifest counts.
//!
//! A peripheral with no fresh data this tick is published from its last
//! known state, so every channel carries a value on every tick.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::manifest::{ChannelKind, ChannelManifest, Cursors};
use crate::pose::{to_consumer_pose, Pose};
use crate::registry::{PeripheralRegistry, PeripheralSpec};
use crate::schema::schema_for;
use crate::service::TrackingService;
use crate::sink::ChannelSink;
use crate::state::DeviceState;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The registry no longer matches the manifest it was built from
    #[error("{kind} channels drifted from the manifest: expected {expected}, walked {actual}")]
    ManifestDrift {
        kind: ChannelKind,
        expected: usize,
        actual: usize,
    },
}

/// Summary of one published frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    pub trackers: usize,
    pub analogs: usize,
    pub buttons: usize,
    /// Peripherals published from carried-forward state
    pub stale: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StagedFrame {
    poses: Vec<(usize, Pose)>,
    analogs: Vec<(usize, f64)>,
    buttons: Vec<(usize, bool)>,
}

/// Per-tick channel writer bound to one manifest
#[derive(Debug)]
pub struct FramePublisher {
    manifest: ChannelManifest,
    last_known: HashMap<String, DeviceState>,
}

impl FramePublisher {
    pub fn new(manifest: ChannelManifest) -> Self {
        Self {
            manifest,
            last_known: HashMap::new(),
        }
    }

    pub fn manifest(&self) -> &ChannelManifest {
        &self.manifest
    }

    /// Read every peripheral's state and publish one full frame
    pub fn publish<S: TrackingService>(
        &mut self,
        registry: &mut PeripheralRegistry<S>,
        sink: &mut impl ChannelSink,
    ) -> Result<FrameStats, PublishError> {
        let states = registry.read_states();
        let mut cursors = Cursors::default();
        let mut frame = StagedFrame::default();
        let mut stale = Vec::new();

        for (peripheral, fresh) in registry.iter().zip(states) {
            let spec = &peripheral.spec;
            let state = self.resolve_state(spec, fresh, &mut stale);
            stage_peripheral(spec, &state, &mut cursors, &mut frame);
        }

        for kind in [ChannelKind::Tracker, ChannelKind::Analog, ChannelKind::Button] {
            let expected = self.manifest.count(kind);
            let actual = cursors.get(kind);
            if expected != actual {
                return Err(PublishError::ManifestDrift {
                    kind,
                    expected,
                    actual,
                });
            }
        }

        let timestamp = Utc::now();
        sink.begin_frame(timestamp);
        for (index, pose) in frame.poses {
            sink.set_pose(index, pose);
        }
        for (index, value) in frame.analogs {
            sink.set_analog(index, value);
        }
        for (index, pressed) in frame.buttons {
            sink.set_button(index, pressed);
        }

        trace!(
            trackers = cursors.tracker,
            analogs = cursors.analog,
            buttons = cursors.button,
            stale = stale.len(),
            "Published frame"
        );

        Ok(FrameStats {
            trackers: cursors.tracker,
            analogs: cursors.analog,
            buttons: cursors.button,
            stale,
            timestamp,
        })
    }

    /// Fresh state if usable, else the last known one, else neutral
    fn resolve_state(
        &mut self,
        spec: &PeripheralSpec,
        fresh: Option<DeviceState>,
        stale: &mut Vec<String>,
    ) -> DeviceState {
        match fresh {
            Some(state) if state.kind() == spec.kind => {
                self.last_known.insert(spec.name.clone(), state.clone());
                return state;
            }
            Some(state) => warn!(
                peripheral = %spec.name,
                expected = %spec.kind,
                got = %state.kind(),
                "Service returned state of the wrong kind, ignoring"
            ),
            None => debug!(peripheral = %spec.name, "No fresh data, carrying last state forward"),
        }
        stale.push(spec.name.clone());
        self.last_known
            .get(&spec.name)
            .cloned()
            .unwrap_or_else(|| DeviceState::neutral(spec.kind))
    }
}

/// Stage one peripheral's channels at the current cursors
fn stage_peripheral(spec: &PeripheralSpec, state: &DeviceState, cursors: &mut Cursors, frame: &mut StagedFrame) {
    let schema = schema_for(spec.kind);

    if schema.trackable {
        let pose = state
            .pose()
            .map(|p| to_consumer_pose(p.position, p.orientation))
            .unwrap_or_default();
        frame.poses.push((cursors.claim(ChannelKind::Tracker), pose));
    }

    for field in schema.analogs {
        let value = state
            .analog(*field)
            .map(|raw| field.encoding().apply(raw))
            .unwrap_or(0.0);
        frame.analogs.push((cursors.claim(ChannelKind::Analog), value));
    }

    for field in schema.buttons {
        let pressed = state.button(*field).is_down();
        frame.buttons.push((cursors.claim(ChannelKind::Button), pressed));
    }
}
