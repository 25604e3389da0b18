use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::format_size;

/// Number of rate samples kept in the rolling window.
pub const SPEED_WINDOW: usize = 10;

/// Mean throughput below which a full window counts as a stall: 70 KiB/s.
pub const STALL_THRESHOLD: u64 = 70 * 1024;

/// Width the annotation is padded to so a redraw fully overwrites the
/// previous one.
const ANNOTATION_WIDTH: usize = 16;

/// Returned when a full window of samples averages below the threshold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transfer stalled: {} samples averaged {mean_bps} B/s (< {threshold_bps} B/s)", SPEED_WINDOW)]
pub struct StallDetected {
    pub mean_bps: u64,
    pub threshold_bps: u64,
}

/// Rolling throughput tracker for a single transfer attempt.
///
/// Feed it the cumulative byte count at each progress checkpoint; it answers
/// with a short `"<rate>/s <eta>"` annotation, or with [`StallDetected`] once
/// the last [`SPEED_WINDOW`] instantaneous rates average below the threshold.
#[derive(Debug)]
pub struct SpeedTracker {
    prev: Option<(Instant, u64)>,
    started_at: Option<Instant>,
    window: VecDeque<u64>,
    threshold: u64,
}

impl Default for SpeedTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedTracker {
    pub fn new() -> Self {
        Self::with_threshold(STALL_THRESHOLD)
    }

    /// Creates a tracker with a custom stall threshold in bytes/second.
    pub fn with_threshold(threshold: u64) -> Self {
        Self {
            prev: None,
            started_at: None,
            window: VecDeque::with_capacity(SPEED_WINDOW),
            threshold,
        }
    }

    /// Starts a fresh measurement: zero bytes at the current instant.
    pub fn reset(&mut self) {
        self.reset_at(Instant::now());
    }

    pub fn reset_at(&mut self, now: Instant) {
        self.prev = Some((now, 0));
        self.started_at = Some(now);
        self.window.clear();
    }

    /// Records `bytes_so_far` at the current instant.
    pub fn sample(&mut self, bytes_so_far: u64, total: Option<u64>) -> Result<String, StallDetected> {
        self.sample_at(Instant::now(), bytes_so_far, total)
    }

    /// Records `bytes_so_far` as observed at `now`.
    ///
    /// The first call without a preceding [`reset`](Self::reset) only sets
    /// the baseline.
    pub fn sample_at(
        &mut self,
        now: Instant,
        bytes_so_far: u64,
        total: Option<u64>,
    ) -> Result<String, StallDetected> {
        let (prev_time, prev_bytes) = *self.prev.get_or_insert((now, bytes_so_far));
        let started_at = *self.started_at.get_or_insert(now);

        let elapsed_ms = now.saturating_duration_since(prev_time).as_millis() as u64;
        let delta = bytes_so_far.saturating_sub(prev_bytes);
        self.prev = Some((now, bytes_so_far));

        let rate = (elapsed_ms > 0).then(|| delta.saturating_mul(1000) / elapsed_ms);
        if let Some(rate) = rate {
            if self.window.len() == SPEED_WINDOW {
                self.window.pop_front();
            }
            self.window.push_back(rate);
            self.check_stall()?;
        }

        let eta = match total {
            Some(total) if total > 0 && bytes_so_far > 0 => {
                let since_start = now.saturating_duration_since(started_at).as_secs_f64();
                let remaining = total.saturating_sub(bytes_so_far) as f64;
                Some(format_eta(Duration::from_secs_f64(
                    since_start / bytes_so_far as f64 * remaining,
                )))
            }
            _ => None,
        };

        let mut annotation = match rate {
            Some(rate) => format!("{}/s", format_size(rate)),
            None => String::new(),
        };
        if let Some(eta) = eta {
            if !annotation.is_empty() {
                annotation.push(' ');
            }
            annotation.push_str(&eta);
        }
        Ok(format!("{annotation:<width$}", width = ANNOTATION_WIDTH))
    }

    /// Number of rate samples currently in the window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    fn check_stall(&mut self) -> Result<(), StallDetected> {
        if self.window.len() < SPEED_WINDOW {
            return Ok(());
        }
        let mean = self.window.iter().sum::<u64>() / self.window.len() as u64;
        if mean < self.threshold {
            self.window.clear();
            return Err(StallDetected {
                mean_bps: mean,
                threshold_bps: self.threshold,
            });
        }
        Ok(())
    }
}

/// Formats an estimated time remaining.
///
/// Under 5 minutes as whole seconds, under 10 minutes as minutes with two
/// decimals, under 100 minutes with one decimal, otherwise whole minutes.
pub fn format_eta(remaining: Duration) -> String {
    let secs = remaining.as_secs_f64();
    let mins = secs / 60.0;
    if secs < 300.0 {
        format!("{secs:.0}s")
    } else if secs < 600.0 {
        format!("{mins:.2}m")
    } else if mins < 100.0 {
        format!("{mins:.1}m")
    } else {
        format!("{mins:.0}m")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn first_sample_after_reset_reports_rate() {
        let base = Instant::now();
        let mut t = SpeedTracker::new();
        t.reset_at(base);

        let annotation = t.sample_at(base + secs(1), 2048, None).unwrap();
        assert_eq!(annotation.trim_end(), "2.0K/s");
        assert_eq!(t.window_len(), 1);
    }

    #[test]
    fn zero_elapsed_time_records_no_rate() {
        let base = Instant::now();
        let mut t = SpeedTracker::new();
        t.reset_at(base);

        let annotation = t.sample_at(base, 4096, None).unwrap();
        assert_eq!(annotation.trim_end(), "");
        assert_eq!(t.window_len(), 0);
    }

    #[test]
    fn sample_without_reset_sets_baseline() {
        let base = Instant::now();
        let mut t = SpeedTracker::new();
        t.sample_at(base, 1000, None).unwrap();
        assert_eq!(t.window_len(), 0);

        t.sample_at(base + secs(1), 1_000_000, None).unwrap();
        assert_eq!(t.window_len(), 1);
    }

    #[test]
    fn eta_included_when_total_known() {
        let base = Instant::now();
        let mut t = SpeedTracker::new();
        t.reset_at(base);

        // 1 MiB after 10 s, 3 MiB left → 30 s remaining.
        let annotation = t
            .sample_at(base + secs(10), 1024 * 1024, Some(4 * 1024 * 1024))
            .unwrap();
        assert_eq!(annotation.trim_end(), "102.4K/s 30s");
    }

    #[test]
    fn eta_omitted_for_zero_or_unknown_total() {
        let base = Instant::now();
        let mut t = SpeedTracker::new();
        t.reset_at(base);

        let a = t.sample_at(base + secs(1), 100_000, Some(0)).unwrap();
        assert_eq!(a.trim_end(), "97.7K/s");
        let b = t.sample_at(base + secs(2), 200_000, None).unwrap();
        assert_eq!(b.trim_end(), "97.7K/s");
    }

    #[test]
    fn eta_omitted_before_any_bytes() {
        let base = Instant::now();
        let mut t = SpeedTracker::new();
        t.reset_at(base);
        let a = t.sample_at(base + secs(1), 0, Some(1000)).unwrap();
        assert_eq!(a.trim_end(), "0.0B/s");
    }

    #[test]
    fn window_never_exceeds_capacity() {
        let base = Instant::now();
        let mut t = SpeedTracker::with_threshold(0);
        t.reset_at(base);
        for i in 1..=25u64 {
            t.sample_at(base + secs(i), i * 1_000_000, None).unwrap();
            assert!(t.window_len() <= SPEED_WINDOW);
        }
        assert_eq!(t.window_len(), SPEED_WINDOW);
    }

    #[test]
    fn slow_full_window_is_a_stall_and_clears() {
        let base = Instant::now();
        let mut t = SpeedTracker::new();
        t.reset_at(base);

        // 10 KiB/s, well below 70 KiB/s.
        for i in 1..SPEED_WINDOW as u64 {
            t.sample_at(base + secs(i), i * 10 * 1024, None).unwrap();
        }
        assert_eq!(t.window_len(), SPEED_WINDOW - 1);

        let n = SPEED_WINDOW as u64;
        let err = t.sample_at(base + secs(n), n * 10 * 1024, None).unwrap_err();
        assert_eq!(err.mean_bps, 10 * 1024);
        assert_eq!(err.threshold_bps, STALL_THRESHOLD);
        assert_eq!(t.window_len(), 0);
    }

    #[test]
    fn fast_transfer_never_stalls() {
        let base = Instant::now();
        let mut t = SpeedTracker::new();
        t.reset_at(base);
        for i in 1..=30u64 {
            t.sample_at(base + secs(i), i * 1024 * 1024, Some(100 * 1024 * 1024))
                .unwrap();
        }
    }

    #[test]
    fn mean_exactly_at_threshold_is_not_a_stall() {
        let base = Instant::now();
        let mut t = SpeedTracker::new();
        t.reset_at(base);
        for i in 1..=SPEED_WINDOW as u64 {
            t.sample_at(base + secs(i), i * STALL_THRESHOLD, None).unwrap();
        }
        assert_eq!(t.window_len(), SPEED_WINDOW);
    }

    #[test]
    fn reset_clears_window() {
        let base = Instant::now();
        let mut t = SpeedTracker::new();
        t.reset_at(base);
        t.sample_at(base + secs(1), 1_000_000, None).unwrap();
        t.reset();
        assert_eq!(t.window_len(), 0);
    }

    #[test]
    fn eta_formatting_bands() {
        assert_eq!(format_eta(secs(42)), "42s");
        assert_eq!(format_eta(secs(299)), "299s");
        assert_eq!(format_eta(secs(300)), "5.00m");
        assert_eq!(format_eta(secs(450)), "7.50m");
        assert_eq!(format_eta(secs(600)), "10.0m");
        assert_eq!(format_eta(secs(5_970)), "99.5m");
        assert_eq!(format_eta(secs(6_000)), "100m");
        assert_eq!(format_eta(secs(12_000)), "200m");
    }
}
