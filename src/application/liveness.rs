//! Liveness monitor: periodic keepalive probes on an established connection.
//!
//! A monitor is armed when the connection enters `Connected` and dropped
//! when it leaves, so its timer cannot outlive the connection it probes.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace};

use crate::adapters::websocket::messages::encode_ping;
use crate::ports::LinkSender;

/// Keepalive timer for one connected period.
#[derive(Debug)]
pub struct LivenessMonitor {
    interval: Interval,
}

impl LivenessMonitor {
    /// Arms the monitor. The first probe is due one full period from now.
    pub fn arm(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Completes when the next probe is due.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Sends one keepalive probe.
///
/// A connection that is already gone is not an error here: the tick is
/// skipped and reconnection is left to the controller. Returns whether the
/// probe was queued.
pub fn send_probe(sender: &LinkSender) -> bool {
    match sender.send(encode_ping()) {
        Ok(()) => {
            trace!("keepalive probe sent");
            true
        }
        Err(e) => {
            debug!(error = %e, "skipping keepalive probe");
            false
        }
    }
}
