//! Moving-average smoothing for a single tracked landmark.

use std::collections::VecDeque;

use crate::landmarks::Point;

/// Default number of frames averaged.
pub const DEFAULT_WINDOW: usize = 6;

/// Bounded history of recent positions for one tracked point.
///
/// One instance per tracked point per session. Never cleared mid-session:
/// stale points age out as new ones arrive.
#[derive(Debug, Clone)]
pub struct SmoothingHistory {
    window: usize,
    points: VecDeque<Point>,
}

impl SmoothingHistory {
    /// Create a history averaging over `window` frames (0 is treated as 1).
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            points: VecDeque::with_capacity(window + 1),
        }
    }

    /// Append a point, evict beyond the window, and return the mean.
    pub fn smooth(&mut self, point: Point) -> Point {
        self.points.push_back(point);
        while self.points.len() > self.window {
            self.points.pop_front();
        }

        let n = self.points.len() as f32;
        let (sx, sy) = self
            .points
            .iter()
            .fold((0.0f32, 0.0f32), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / n, sy / n)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Default for SmoothingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-5 && (a.y - b.y).abs() < 1e-5
    }

    #[test]
    fn test_single_point_passthrough() {
        let mut h = SmoothingHistory::default();
        let out = h.smooth(Point::new(0.3, 0.6));
        assert!(close(out, Point::new(0.3, 0.6)));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn test_constant_input_is_fixed_point() {
        let mut h = SmoothingHistory::new(6);
        let p = Point::new(0.42, 0.17);
        let mut out = Point::default();
        for _ in 0..10 {
            out = h.smooth(p);
        }
        assert!(close(out, p), "expected {:?}, got {:?}", p, out);
    }

    #[test]
    fn test_step_converges_within_window() {
        let mut h = SmoothingHistory::new(6);
        for _ in 0..6 {
            h.smooth(Point::new(0.0, 0.0));
        }
        let target = Point::new(1.0, 0.5);
        let mut outputs = Vec::new();
        for _ in 0..6 {
            outputs.push(h.smooth(target));
        }
        // Partial progress before the window is full of new samples
        assert!(outputs[0].x > 0.0 && outputs[0].x < 1.0);
        assert!(close(outputs[5], target), "got {:?}", outputs[5]);
    }

    #[test]
    fn test_length_bounded_by_window() {
        let mut h = SmoothingHistory::new(3);
        for i in 0..20 {
            h.smooth(Point::new(i as f32 * 0.01, 0.0));
            assert!(h.len() <= 3);
        }
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn test_mean_of_window() {
        let mut h = SmoothingHistory::new(2);
        h.smooth(Point::new(0.0, 0.0));
        h.smooth(Point::new(0.2, 0.4));
        let out = h.smooth(Point::new(0.4, 0.8));
        // Only the last two remain
        assert!(close(out, Point::new(0.3, 0.6)), "got {:?}", out);
    }

    #[test]
    fn test_zero_window_treated_as_one() {
        let mut h = SmoothingHistory::new(0);
        assert_eq!(h.window(), 1);
        h.smooth(Point::new(0.1, 0.1));
        let out = h.smooth(Point::new(0.9, 0.9));
        assert!(close(out, Point::new(0.9, 0.9)));
    }
}
