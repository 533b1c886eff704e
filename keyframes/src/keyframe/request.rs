use std::path::PathBuf;

use color_eyre::eyre;

/// What one extraction is asked to do: which video, which part of it and how densely to
/// sample it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    /// Opaque locator of the video, resolved by a
    /// [`MetadataResolver`](super::MetadataResolver).
    pub source: String,
    /// Seconds
    pub start: f64,
    /// Seconds, inclusive
    pub end: f64,
    /// Number of keyframes. Wins over `interval` when both are given.
    pub frames: Option<i64>,
    /// Seconds between keyframes, zero means unset
    pub interval: f64,
}

impl ExtractionRequest {
    /// `frames` keyframes evenly spread over `start..=end`.
    pub fn with_frames(source: impl Into<String>, start: f64, end: f64, frames: i64) -> Self {
        Self {
            source: source.into(),
            start,
            end,
            frames: Some(frames),
            interval: 0.0,
        }
    }

    /// One keyframe every `interval` seconds from `start`, while not past `end`.
    pub fn with_interval(
        source: impl Into<String>,
        start: f64,
        end: f64,
        interval: f64,
    ) -> Self {
        Self {
            source: source.into(),
            start,
            end,
            frames: None,
            interval,
        }
    }

    /// Checks the request and decides on what to sample.
    pub fn plan(&self) -> Result<Plan, ExtractError> {
        let Self {
            start,
            end,
            frames,
            interval,
            ..
        } = *self;

        if !start.is_finite() || !end.is_finite() || !interval.is_finite() {
            return Err(ExtractError::NotFinite);
        }
        if start < 0.0 || end < 0.0 {
            return Err(ExtractError::NegativeTimestamp);
        }
        if start > end {
            return Err(ExtractError::StartAfterEnd);
        }
        if interval < 0.0 {
            return Err(ExtractError::NegativeInterval);
        }
        if frames.is_some_and(|n| n <= 0) {
            return Err(ExtractError::NoFrames);
        }

        let single = Plan {
            start,
            end: start,
            sampling: Sampling::Count(1),
            single_reason: None,
        };
        let plan = match frames {
            None if interval == 0.0 => Plan {
                single_reason: Some(SingleReason::NothingRequested),
                ..single
            },
            _ if start == end => Plan {
                single_reason: Some(SingleReason::SingleInstant),
                ..single
            },
            Some(n) => Plan {
                start,
                end,
                sampling: Sampling::Count(n.try_into().map_err(|_| ExtractError::NoFrames)?),
                single_reason: None,
            },
            None => Plan {
                start,
                end,
                sampling: Sampling::Interval(interval),
                single_reason: None,
            },
        };
        Ok(plan)
    }
}

/// How the time points are laid out
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sampling {
    Count(u64),
    Interval(f64),
}

/// Why a request collapsed into a single keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleReason {
    NothingRequested,
    SingleInstant,
}

/// A validated request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub start: f64,
    pub end: f64,
    pub sampling: Sampling,
    pub single_reason: Option<SingleReason>,
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Timestamps must be finite numbers.")]
    NotFinite,
    #[error("Timestamps cannot be negative.")]
    NegativeTimestamp,
    #[error("Start time must be less than or equal to end time.")]
    StartAfterEnd,
    #[error("Interval time must be greater than or equals 0.")]
    NegativeInterval,
    #[error("Number of frames must be greater than 0.")]
    NoFrames,
    #[error("Could not create the directory {path:?}: {source}")]
    SaveDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not resolve the video: {0:#}")]
    Resolve(eyre::Report),
    #[error("Could not get video stream URL.")]
    NoStreamUrl,
    #[error("End time {end:?}s exceeds video duration {duration:?}s.")]
    ExceedsDuration { end: f64, duration: f64 },
    #[error("Could not open video stream: {0:#}")]
    Open(eyre::Report),
}
