//! # Logging Utilities
//!
//! Rate limiting and frame dumps for the poll side of the driver. Nothing in
//! here may be used from callback context.
//!
//! ```rust
//! use ieee802154_phy::util::logging::{log_frame_hex, LogThrottle};
//!
//! // Allow 5 messages per second
//! let mut throttle = LogThrottle::new(1000, 5);
//! if throttle.allow() {
//!     log::warn!("Dropped RX packet");
//! }
//!
//! log_frame_hex("RX PSDU", &[0x41, 0x88, 0x05]);
//! ```

use crate::radio::stats::PhyStats;
use std::time::Instant;

/// Rate limiter for repetitive log messages
#[derive(Debug)]
pub struct LogThrottle {
    /// Time window in milliseconds
    window_ms: u64,
    /// Messages allowed per window
    cap: u32,
    count: u32,
    t0: Instant,
}

impl LogThrottle {
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            t0: Instant::now(),
        }
    }

    /// Whether the next message may be logged. The counter restarts once the
    /// window has elapsed.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.t0).as_millis() as u64 > self.window_ms {
            self.t0 = now;
            self.count = 0;
        }

        self.count = self.count.saturating_add(1);
        self.count <= self.cap
    }

    /// Messages suppressed in the current window
    pub fn suppressed(&self) -> u32 {
        self.count.saturating_sub(self.cap)
    }

    /// Start a new window immediately
    pub fn reset(&mut self) {
        self.t0 = Instant::now();
        self.count = 0;
    }
}

/// Log a PSDU in hex at debug level, truncated to keep lines short
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    const MAX_LOG_BYTES: usize = 64;

    if !log::log_enabled!(log::Level::Debug) {
        return;
    }

    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let hex_str = crate::util::hex::format_hex_compact(shown);
    if data.len() > MAX_LOG_BYTES {
        log::debug!("{prefix}: {hex_str} ... ({} bytes total)", data.len());
    } else {
        log::debug!("{prefix}: {hex_str}");
    }
}

/// Log a driver statistics snapshot at info level
pub fn log_phy_stats(stats: &PhyStats) {
    log::info!(
        "PHY stats: tx ok={} no_ack={} cca_fail={} abort={}, rx delivered={} dropped={} overflows={}, band_reloads={} scans={} calibrations={}",
        stats.tx_success,
        stats.tx_no_ack,
        stats.tx_channel_access_failure,
        stats.tx_abort,
        stats.rx_delivered,
        stats.rx_dropped(),
        stats.rx_ring_overflows,
        stats.band_reloads,
        stats.energy_scans,
        stats.calibrations
    );
}

/// Log a warning with throttling
#[macro_export]
macro_rules! log_warn_throttled {
    ($throttle:expr, $($arg:tt)*) => {
        if $throttle.allow() {
            log::warn!($($arg)*);
        }
    };
}
