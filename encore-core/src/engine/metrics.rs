//! Rolling latency window for transcript handling.

use std::collections::VecDeque;

use serde::Serialize;

const WINDOW_CAP: usize = 512;

/// Last `WINDOW_CAP` handling times plus lifetime count, mean and max.
#[derive(Debug)]
pub struct LatencyWindow {
    samples: VecDeque<f64>,
    count: usize,
    sum_ms: f64,
    max_ms: f64,
}

impl Default for LatencyWindow {
    fn default() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_CAP),
            count: 0,
            sum_ms: 0.0,
            max_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencySnapshot {
    pub count: usize,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

impl LatencyWindow {
    pub fn record(&mut self, elapsed_ms: f64) {
        let v = if elapsed_ms.is_finite() {
            elapsed_ms.max(0.0)
        } else {
            0.0
        };
        if self.samples.len() == WINDOW_CAP {
            self.samples.pop_front();
        }
        self.samples.push_back(v);
        self.count = self.count.saturating_add(1);
        self.sum_ms += v;
        self.max_ms = self.max_ms.max(v);
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        if self.samples.is_empty() {
            return LatencySnapshot {
                count: 0,
                mean_ms: 0.0,
                p50_ms: 0.0,
                p95_ms: 0.0,
                max_ms: 0.0,
            };
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let percentile = |p: f64| {
            let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
            sorted[idx.min(sorted.len() - 1)]
        };

        LatencySnapshot {
            count: self.count,
            mean_ms: self.sum_ms / self.count as f64,
            p50_ms: percentile(0.50),
            p95_ms: percentile(0.95),
            max_ms: self.max_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_window_reports_zeroes() {
        let snap = LatencyWindow::default().snapshot();
        assert_eq!(snap.count, 0);
        assert_relative_eq!(snap.p95_ms, 0.0);
    }

    #[test]
    fn percentiles_follow_sorted_samples() {
        let mut window = LatencyWindow::default();
        for ms in [40.0, 10.0, 30.0, 20.0, 50.0] {
            window.record(ms);
        }
        window.record(f64::NAN);

        let snap = window.snapshot();
        assert_eq!(snap.count, 6);
        assert_relative_eq!(snap.p50_ms, 30.0);
        assert_relative_eq!(snap.p95_ms, 50.0);
        assert_relative_eq!(snap.max_ms, 50.0);
        assert_relative_eq!(snap.mean_ms, 25.0);
    }

    #[test]
    fn window_keeps_only_recent_samples() {
        let mut window = LatencyWindow::default();
        for _ in 0..WINDOW_CAP {
            window.record(1000.0);
        }
        for _ in 0..WINDOW_CAP {
            window.record(1.0);
        }
        let snap = window.snapshot();
        assert_eq!(snap.count, 2 * WINDOW_CAP);
        assert_relative_eq!(snap.p95_ms, 1.0);
        assert_relative_eq!(snap.max_ms, 1000.0);
    }
}
