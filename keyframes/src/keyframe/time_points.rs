use super::request::Sampling;

/// Used when the video does not report a usable frame rate.
pub const DEFAULT_FPS: f64 = 30.0;

/// How far float error may push an estimated point index off, in points.
const POINT_SLACK: u64 = 4;

/// The frames to keep, answered one frame at a time.
///
/// A count of `n > 1` splits `start..=end` into `n - 1` equal parts, so both ends are
/// always included. An interval starts at `start` and stops before passing `end`. A
/// frame is a target when some time point truncates to it.
///
/// The time points are never collected, so a count or interval asking for far more
/// points than there are frames costs no more than one point per frame would.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetFrames {
    start: f64,
    end: f64,
    sampling: Sampling,
    fps: f64,
}

impl TargetFrames {
    pub fn new(start: f64, end: f64, sampling: Sampling, fps: f64) -> Self {
        Self {
            start,
            end,
            sampling,
            fps,
        }
    }

    /// Seconds between two neighbouring points, zero if there is at most one.
    fn step(&self) -> f64 {
        match self.sampling {
            Sampling::Count(n) if n > 1 => (self.end - self.start) / (n - 1) as f64,
            Sampling::Count(_) => 0.0,
            Sampling::Interval(step) => step.max(0.0),
        }
    }

    /// The time of point `i`, in seconds, if there is one.
    pub fn point(&self, i: u64) -> Option<f64> {
        match self.sampling {
            Sampling::Count(n) if i >= n => None,
            Sampling::Count(n) if n > 1 && i == n - 1 => Some(self.end),
            Sampling::Count(_) => Some(self.start + i as f64 * self.step()),
            Sampling::Interval(step) if step > 0.0 => {
                Some(self.start + i as f64 * step).filter(|t| *t <= self.end)
            }
            Sampling::Interval(_) => (i == 0).then_some(self.start),
        }
    }

    fn last_point(&self) -> Option<f64> {
        match self.sampling {
            Sampling::Interval(step) if step > 0.0 => {
                let mut i = ((self.end - self.start) / step).floor().max(0.0) as u64;
                for _ in 0..POINT_SLACK {
                    match self.point(i.saturating_add(1)) {
                        Some(_) if i < u64::MAX => i += 1,
                        _ => break,
                    }
                }
                for _ in 0..POINT_SLACK {
                    if i == 0 || self.point(i).is_some() {
                        break;
                    }
                    i -= 1;
                }
                // Only off by more than the slack when the step is negligible next to `end`
                self.point(i).or(Some(self.end))
            }
            Sampling::Count(n) => self.point(n.saturating_sub(1)),
            Sampling::Interval(_) => self.point(0),
        }
    }

    pub fn contains(&self, frame: u64) -> bool {
        let step = self.step();
        if step * self.fps <= 1.0 {
            // At most one frame between neighbouring points, so no frame in between
            // the first and the last point is skipped.
            let Some(last) = self.last_point() else {
                return false;
            };
            return (frame_index(self.start, self.fps)..=frame_index(last, self.fps))
                .contains(&frame);
        }

        let estimate = ((frame_time(frame, self.fps) - self.start) / step)
            .ceil()
            .max(0.0) as u64;
        (estimate.saturating_sub(1)..=estimate.saturating_add(1))
            .filter_map(|i| self.point(i))
            .any(|t| frame_index(t, self.fps) == frame)
    }
}

/// The index of the frame shown at `time`. Truncates.
pub fn frame_index(time: f64, fps: f64) -> u64 {
    (time * fps) as u64
}

/// The time the frame at `index` is shown at.
pub fn frame_time(index: u64, fps: f64) -> f64 {
    index as f64 / fps
}

pub fn keyframe_file_name(time: f64) -> String {
    format!("keyframe_{time:.2}s.jpg")
}
