//! Bridge lifecycle
//!
//! Ties registration, manifest construction and per-tick publishing into one
//! object with an explicit start, tick and shutdown.

use thiserror::Error;
use tracing::{error, info, warn};

use crate::manifest::ChannelManifest;
use crate::publisher::{FramePublisher, FrameStats, PublishError};
use crate::registry::{PeripheralCandidate, PeripheralRegistry, RegistrationPolicy, RegistryError};
use crate::service::{ServiceError, TrackingService, DEFAULT_TIMEOUT_MS};
use crate::sink::ChannelSink;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Registration failed: {0}")]
    Registry(#[from] RegistryError),
    #[error("Publish failed: {0}")]
    Publish(#[from] PublishError),
    #[error("Tracking service error: {0}")]
    Service(#[from] ServiceError),
    #[error("Bridge is shut down")]
    ShutDown,
}

/// A running bridge between one tracking service session and one sink
pub struct Bridge<S: TrackingService> {
    registry: PeripheralRegistry<S>,
    publisher: FramePublisher,
    shut_down: bool,
}

impl<S: TrackingService> Bridge<S> {
    /// Register peripherals, build the manifest and declare it to the sink
    pub fn start(
        service: S,
        candidates: &[PeripheralCandidate],
        policy: RegistrationPolicy,
        sink: &mut impl ChannelSink,
    ) -> Result<Self, BridgeError> {
        Self::start_with_timeout(service, candidates, policy, DEFAULT_TIMEOUT_MS, sink)
    }

    pub fn start_with_timeout(
        service: S,
        candidates: &[PeripheralCandidate],
        policy: RegistrationPolicy,
        timeout_ms: u64,
        sink: &mut impl ChannelSink,
    ) -> Result<Self, BridgeError> {
        let registry = PeripheralRegistry::register_with_timeout(service, candidates, policy, timeout_ms)?;
        if registry.is_empty() {
            warn!("No peripherals registered, publishing empty frames");
        }

        let manifest = ChannelManifest::build(registry.specs());
        info!(
            trackers = manifest.tracker_count,
            analogs = manifest.analog_count,
            buttons = manifest.button_count,
            "Built channel manifest"
        );
        sink.declare(&manifest);

        Ok(Self {
            registry,
            publisher: FramePublisher::new(manifest),
            shut_down: false,
        })
    }

    /// Pump the service once and publish one frame.
    ///
    /// A failed pump is logged and the frame is still published from cached
    /// state. Manifest drift is returned as an error.
    pub fn tick(&mut self, sink: &mut impl ChannelSink) -> Result<FrameStats, BridgeError> {
        if self.shut_down {
            return Err(BridgeError::ShutDown);
        }
        if let Err(e) = self.registry.pump() {
            warn!(error = %e, "Tracking service pump failed");
        }
        self.publisher.publish(&mut self.registry, sink).map_err(|e| {
            error!(error = %e, "Channel layout drifted");
            BridgeError::from(e)
        })
    }

    pub fn manifest(&self) -> &ChannelManifest {
        self.publisher.manifest()
    }

    pub fn registry(&self) -> &PeripheralRegistry<S> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PeripheralRegistry<S> {
        &mut self.registry
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Release every stream. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        info!(peripherals = self.registry.count(), "Shutting down bridge");
        self.registry.release_all();
        self.shut_down = true;
    }
}

impl<S: TrackingService> std::fmt::Debug for Bridge<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("registry", &self.registry)
            .field("manifest", self.publisher.manifest())
            .field("shut_down", &self.shut_down)
            .finish()
    }
}
