use std::io::{self, Write};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::geoip::Locator;

/// Observation state for one address. Entries are created on first
/// sight and kept for the life of the process.
#[derive(Clone, Debug)]
struct SeenAddr {
    count: u32,
    last_seen: Instant,
}

/// Per-address frequency tracker with an idle-window streak reset.
///
/// A streak is the run of observations of one address where no gap
/// between consecutive observations exceeds the window. `observe`
/// reports `true` exactly once per streak, at the moment the count
/// equals the threshold.
pub struct Tracker {
    seen: FxHashMap<String, SeenAddr>,
    threshold: u32,
    window: Duration,
}

impl Tracker {
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self {
            seen: FxHashMap::default(),
            threshold,
            window,
        }
    }

    /// Record one observation of `addr` at `now`. Returns whether this
    /// observation triggers an emission.
    ///
    /// A stale entry (idle longer than the window) restarts at zero
    /// before this observation is counted, so the post-update count is
    /// 1 rather than the old streak plus one. The trigger comparison is
    /// exact equality, never `>=`: a streak that keeps growing past the
    /// threshold stays silent until an idle gap resets it.
    pub fn observe(&mut self, addr: &str, now: Instant) -> bool {
        let entry = self
            .seen
            .entry(addr.to_string())
            .or_insert_with(|| SeenAddr {
                count: 0,
                last_seen: now,
            });

        if now.duration_since(entry.last_seen) > self.window {
            entry.count = 0;
        }
        entry.count += 1;
        entry.last_seen = now;

        debug!(addr, count = entry.count, "observed");
        entry.count == self.threshold
    }
}

/// Formats and writes emission lines, suppressing an immediate repeat
/// of the address emitted last.
pub struct Emitter {
    locator: Locator,
    last_emitted: String,
}

impl Emitter {
    pub fn new(locator: Locator) -> Self {
        Self {
            locator,
            last_emitted: String::new(),
        }
    }

    /// Emit one summary line for `addr`, unless `addr` was also the
    /// previous emission. Only a *different* address's emission re-arms
    /// a suppressed one.
    pub fn emit<W: Write>(&mut self, addr: &str, out: &mut W) -> io::Result<()> {
        if addr == self.last_emitted {
            return Ok(());
        }
        let body = self.locator.describe(addr);
        // address right-aligned to a minimum of 15 columns
        writeln!(out, "{addr:>15}  {body}")?;
        self.last_emitted.clear();
        self.last_emitted.push_str(addr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn triggers_exactly_at_threshold() {
        let mut tracker = Tracker::new(3, secs(2));
        let t0 = Instant::now();
        assert!(!tracker.observe("1.2.3.4", t0));
        assert!(!tracker.observe("1.2.3.4", t0 + millis(500)));
        assert!(tracker.observe("1.2.3.4", t0 + millis(900)));
        // streak keeps growing past the threshold without re-triggering
        assert!(!tracker.observe("1.2.3.4", t0 + millis(1000)));
        assert!(!tracker.observe("1.2.3.4", t0 + millis(1100)));
    }

    #[test]
    fn idle_gap_resets_streak_to_one() {
        let mut tracker = Tracker::new(3, secs(2));
        let t0 = Instant::now();
        tracker.observe("1.2.3.4", t0);
        tracker.observe("1.2.3.4", t0 + millis(500));
        assert!(tracker.observe("1.2.3.4", t0 + millis(900)));

        // gap of 4.1s > 2s window: count restarts at 1, no trigger
        assert!(!tracker.observe("1.2.3.4", t0 + secs(5)));
        assert_eq!(tracker.seen["1.2.3.4"].count, 1);

        // a fresh in-window streak can trigger again
        assert!(!tracker.observe("1.2.3.4", t0 + secs(5) + millis(100)));
        assert!(tracker.observe("1.2.3.4", t0 + secs(5) + millis(200)));
    }

    #[test]
    fn gap_exactly_at_window_does_not_reset() {
        let mut tracker = Tracker::new(2, secs(2));
        let t0 = Instant::now();
        tracker.observe("5.6.7.8", t0);
        // reset requires strictly more than the window
        assert!(tracker.observe("5.6.7.8", t0 + secs(2)));
    }

    #[test]
    fn addresses_are_tracked_independently() {
        let mut tracker = Tracker::new(2, secs(2));
        let t0 = Instant::now();
        assert!(!tracker.observe("1.1.1.1", t0));
        assert!(!tracker.observe("2.2.2.2", t0));
        assert!(tracker.observe("1.1.1.1", t0 + millis(100)));
        assert!(tracker.observe("2.2.2.2", t0 + millis(100)));
    }

    #[test]
    fn threshold_one_triggers_on_first_sight() {
        let mut tracker = Tracker::new(1, secs(2));
        let t0 = Instant::now();
        assert!(tracker.observe("9.9.9.9", t0));
        assert!(!tracker.observe("9.9.9.9", t0 + millis(100)));
    }

    fn test_emitter() -> Emitter {
        Emitter::new(Locator::Degraded("lookup unavailable".to_string()))
    }

    fn emitted_lines(emitter: &mut Emitter, addrs: &[&str]) -> Vec<String> {
        let mut out = Vec::new();
        for addr in addrs {
            emitter.emit(addr, &mut out).unwrap();
        }
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn emits_padded_address_and_body() {
        let lines = emitted_lines(&mut test_emitter(), &["8.8.8.8"]);
        assert_eq!(lines, vec!["        8.8.8.8  lookup unavailable"]);
    }

    #[test]
    fn addresses_wider_than_the_pad_are_not_truncated() {
        let lines = emitted_lines(&mut test_emitter(), &["999.999.999.999"]);
        assert_eq!(lines, vec!["999.999.999.999  lookup unavailable"]);
    }

    #[test]
    fn suppresses_consecutive_duplicates() {
        let lines = emitted_lines(&mut test_emitter(), &["1.1.1.1", "1.1.1.1"]);
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn different_address_rearms_suppression() {
        let lines = emitted_lines(&mut test_emitter(), &["1.1.1.1", "2.2.2.2", "1.1.1.1"]);
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains("1.1.1.1"));
    }
}
