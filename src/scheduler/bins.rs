use super::ExecutionPlan;

/// Equal partition of the execution horizon into `bin_count` time slices.
///
/// The bin index is derived by division and clamped, never by floating
/// interval containment, so clock jitter around a boundary can delay a
/// transition by a tick but can never skip a bin or leave the terminal
/// tick unassigned.
#[derive(Debug, Clone)]
pub struct BinSchedule {
    total_duration: f64,
    bin_count: u32,
    time_per_bin: f64,
}

/// Where an elapsed time falls within the schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinPosition {
    /// 1-based bin number in `1..=bin_count`.
    pub bin: u32,
    /// Seconds until the current bin's upper boundary, zero once past it.
    pub remaining_bin_time: f64,
    /// True once the horizon is exhausted.
    pub terminal: bool,
}

impl BinSchedule {
    pub fn new(total_duration: f64, bin_count: u32) -> Self {
        debug_assert!(total_duration > 0.0 && bin_count >= 1);
        Self {
            total_duration,
            bin_count,
            time_per_bin: total_duration / bin_count as f64,
        }
    }

    pub fn from_plan(plan: &ExecutionPlan) -> Self {
        Self::new(plan.total_duration, plan.bin_count)
    }

    pub fn time_per_bin(&self) -> f64 {
        self.time_per_bin
    }

    /// The `bin_count + 1` equally spaced boundaries over
    /// `[0, total_duration]`.
    pub fn boundaries(&self) -> Vec<f64> {
        (0..=self.bin_count)
            .map(|i| self.time_per_bin * i as f64)
            .collect()
    }

    /// Map elapsed seconds since start to a bin. Bins are half-open
    /// `[lo, hi)`; the final boundary is closed, so `elapsed >=
    /// total_duration` clamps to the last bin and flags terminal.
    pub fn position(&self, elapsed: f64) -> BinPosition {
        let elapsed = elapsed.max(0.0);
        let index = ((elapsed / self.time_per_bin) as u32).min(self.bin_count - 1);
        let upper = self.time_per_bin * (index + 1) as f64;
        BinPosition {
            bin: index + 1,
            remaining_bin_time: (upper - elapsed).max(0.0),
            terminal: elapsed >= self.total_duration,
        }
    }
}
