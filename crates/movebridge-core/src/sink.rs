//! Consuming-runtime seam
//!
//! A sink is told the channel layout once, then receives every channel's
//! value on every tick.

use chrono::{DateTime, Utc};

use crate::manifest::ChannelManifest;
use crate::pose::Pose;

/// Indexed tracker/analog/button outputs of the consuming runtime
pub trait ChannelSink {
    /// Announce the channel layout, once, before the first frame
    fn declare(&mut self, manifest: &ChannelManifest);

    /// Mark the start of a frame
    fn begin_frame(&mut self, _timestamp: DateTime<Utc>) {}

    fn set_pose(&mut self, index: usize, pose: Pose);

    fn set_analog(&mut self, index: usize, value: f64);

    fn set_button(&mut self, index: usize, pressed: bool);
}

/// In-memory sink holding the latest value of every channel
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    pub manifest: Option<ChannelManifest>,
    pub poses: Vec<Pose>,
    pub analogs: Vec<f64>,
    pub buttons: Vec<bool>,
    /// Frames received since declaration
    pub frames: u64,
    pub last_frame_at: Option<DateTime<Utc>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pose(&self, index: usize) -> Option<Pose> {
        self.poses.get(index).copied()
    }

    pub fn analog(&self, index: usize) -> Option<f64> {
        self.analogs.get(index).copied()
    }

    pub fn button(&self, index: usize) -> Option<bool> {
        self.buttons.get(index).copied()
    }
}

impl ChannelSink for FrameBuffer {
    fn declare(&mut self, manifest: &ChannelManifest) {
        self.poses = vec![Pose::default(); manifest.tracker_count];
        self.analogs = vec![0.0; manifest.analog_count];
        self.buttons = vec![false; manifest.button_count];
        self.manifest = Some(manifest.clone());
        self.frames = 0;
        self.last_frame_at = None;
    }

    fn begin_frame(&mut self, timestamp: DateTime<Utc>) {
        self.frames += 1;
        self.last_frame_at = Some(timestamp);
    }

    fn set_pose(&mut self, index: usize, pose: Pose) {
        if let Some(slot) = self.poses.get_mut(index) {
            *slot = pose;
        }
    }

    fn set_analog(&mut self, index: usize, value: f64) {
        if let Some(slot) = self.analogs.get_mut(index) {
            *slot = value;
        }
    }

    fn set_button(&mut self, index: usize, pressed: bool) {
        if let Some(slot) = self.buttons.get_mut(index) {
            *slot = pressed;
        }
    }
}
