//! In-memory collaborators for tests.

use std::{
    cell::RefCell,
    collections::VecDeque,
    path::{Path, PathBuf},
};

use color_eyre::eyre;
use image::RgbImage;
use keyframes_common::cancellation::CancelToken;

use super::extractor::{
    FrameReader, ImageWriter, MetadataResolver, ResolvedSource, StreamOpener,
};

pub(crate) struct FakeResolver {
    pub(crate) resolved: Option<ResolvedSource>,
}

impl FakeResolver {
    pub(crate) fn duration(secs: f64) -> Self {
        Self {
            resolved: Some(ResolvedSource {
                stream_url: Some("stream://fake".into()),
                duration: Some(secs),
            }),
        }
    }
}

impl MetadataResolver for FakeResolver {
    fn resolve(&self, _locator: &str) -> eyre::Result<ResolvedSource> {
        self.resolved
            .clone()
            .ok_or_else(|| eyre::eyre!("video unavailable"))
    }
}

/// Plays back a number of frames, each one a 1x1 image whose red channel is the
/// frame index modulo 256.
#[derive(Clone)]
pub(crate) struct FakeStream {
    pub(crate) fps: Option<f64>,
    pub(crate) frames: u64,
    pub(crate) fail_at: Option<u64>,
    pub(crate) cancel_after: Option<(u64, CancelToken)>,
    pub(crate) refuse: bool,
}

impl FakeStream {
    pub(crate) fn new(fps: f64, frames: u64) -> Self {
        Self {
            fps: Some(fps),
            frames,
            fail_at: None,
            cancel_after: None,
            refuse: false,
        }
    }
}

pub(crate) struct FakeReader {
    pub(crate) stream: FakeStream,
    pub(crate) next: u64,
}

impl FrameReader for FakeReader {
    fn frame_rate(&self) -> Option<f64> {
        self.stream.fps
    }

    fn frame_count(&self) -> Option<u64> {
        Some(self.stream.frames)
    }

    fn read_frame(&mut self) -> eyre::Result<Option<RgbImage>> {
        if let Some((after, token)) = &self.stream.cancel_after {
            if self.next == *after {
                token.cancel();
            }
        }
        if self.stream.fail_at == Some(self.next) {
            eyre::bail!("corrupt packet");
        }
        if self.next >= self.stream.frames {
            return Ok(None);
        }
        let img = RgbImage::from_pixel(1, 1, image::Rgb([(self.next % 256) as u8, 0, 0]));
        self.next += 1;
        Ok(Some(img))
    }
}

impl StreamOpener for FakeStream {
    type Reader = FakeReader;

    fn open(&self, _url: &str) -> eyre::Result<FakeReader> {
        eyre::ensure!(!self.refuse, "connection refused");
        Ok(FakeReader {
            stream: self.clone(),
            next: 0,
        })
    }
}

/// Remembers what would have been written, and the red value of each frame.
#[derive(Default)]
pub(crate) struct RecordingWriter {
    pub(crate) written: RefCell<Vec<(PathBuf, u8)>>,
    pub(crate) fail: RefCell<VecDeque<bool>>,
}

impl ImageWriter for RecordingWriter {
    fn write(&self, frame: &RgbImage, path: &Path) -> eyre::Result<()> {
        if self.fail.borrow_mut().pop_front().unwrap_or(false) {
            eyre::bail!("disk full");
        }
        self.written
            .borrow_mut()
            .push((path.to_owned(), frame.get_pixel(0, 0)[0]));
        Ok(())
    }
}
