//! Segment ids of the indexed clips look like `<youtube id>_<start>_<end>`, e.g.
//! `WTf5EgVY5uU_98_104`. YouTube ids can contain underscores themselves.

use std::{fmt, num::ParseFloatError, str::FromStr};

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: String,
    /// Seconds
    pub start: f64,
    /// Seconds
    pub end: f64,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SegmentError {
    #[error("segment id {0:?} is not of the form <id>_<start>_<end>")]
    Malformed(String),
    #[error("segment id {video_id:?} has an invalid time {time:?}")]
    BadTime {
        video_id: String,
        time: String,
        source: ParseFloatError,
    },
}

impl FromStr for Segment {
    type Err = SegmentError;

    fn from_str(video_id: &str) -> Result<Self, Self::Err> {
        let mut parts = video_id.rsplitn(3, '_');
        let (Some(end), Some(start), Some(id)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(SegmentError::Malformed(video_id.to_owned()));
        };
        if id.is_empty() {
            return Err(SegmentError::Malformed(video_id.to_owned()));
        }

        let seconds = |time: &str| {
            time.parse::<f64>()
                .map_err(|source| SegmentError::BadTime {
                    video_id: video_id.to_owned(),
                    time: time.to_owned(),
                    source,
                })
        };

        Ok(Self {
            id: id.to_owned(),
            start: seconds(start)?,
            end: seconds(end)?,
        })
    }
}

impl Segment {
    /// A watch link that starts playing at the start of the segment
    pub fn link(&self) -> String {
        watch_link(&self.id, self.start)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.id, self.start, self.end)
    }
}

pub fn watch_link(id: &str, start: f64) -> String {
    format!("https://www.youtube.com/watch?v={id}&t={start}s")
}
