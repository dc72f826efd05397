//! Tick loop
//!
//! Drives one bridge at a fixed period until shutdown is requested, a tick
//! limit is reached, or the channel layout drifts.

use chrono::SecondsFormat;
use movebridge_core::{Bridge, BridgeError, ChannelSink, TrackingService};
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub period: Duration,
    /// Log a summary every n ticks (0 disables)
    pub summary_every: u64,
    /// Stop after this many ticks
    pub max_ticks: Option<u64>,
}

impl LoopSettings {
    pub fn from_millis(poll_delay_ms: u64) -> Self {
        Self {
            period: Duration::from_millis(poll_delay_ms.max(1)),
            summary_every: 0,
            max_ticks: None,
        }
    }
}

/// What the loop did before it stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub ticks: u64,
    /// Ticks where at least one peripheral was carried forward
    pub stale_ticks: u64,
}

pub async fn run<S, K, F>(
    bridge: &mut Bridge<S>,
    sink: &mut K,
    settings: LoopSettings,
    shutdown: F,
) -> Result<LoopReport, BridgeError>
where
    S: TrackingService,
    K: ChannelSink,
    F: Future<Output = ()>,
{
    let mut ticker = interval(settings.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut report = LoopReport::default();
    info!(period = ?settings.period, "Tick loop started");

    loop {
        if settings.max_ticks.is_some_and(|max| report.ticks >= max) {
            debug!(ticks = report.ticks, "Tick limit reached");
            break;
        }

        tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                let stats = bridge.tick(sink)?;
                report.ticks += 1;
                if !stats.stale.is_empty() {
                    report.stale_ticks += 1;
                }
                if settings.summary_every > 0 && report.ticks % settings.summary_every == 0 {
                    info!(
                        ticks = report.ticks,
                        stale_ticks = report.stale_ticks,
                        trackers = stats.trackers,
                        analogs = stats.analogs,
                        buttons = stats.buttons,
                        at = %stats.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                        "Frame summary"
                    );
                }
            }
        }
    }

    info!(ticks = report.ticks, stale_ticks = report.stale_ticks, "Tick loop stopped");
    Ok(report)
}
