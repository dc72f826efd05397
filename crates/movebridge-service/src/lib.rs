//! movebridge Service - Tracking service connection
//!
//! Opens a session with the tracking service through a [`Connector`], retrying
//! a bounded number of times, and provides a simulated connector that serves
//! a scripted device rig in-process.

pub mod connect;
pub mod simulated;

pub use connect::{
    connect_with_retries, ConnectError, Connector, ServiceEndpoint, MAX_CONNECT_ATTEMPTS, RETRY_DELAY_MS,
};
pub use simulated::{RigDevice, RigError, SimulatedConnector, SimulatedRig};
