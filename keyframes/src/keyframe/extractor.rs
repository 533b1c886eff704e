//! Keyframe extraction from a video stream.
//!
//! The stream is always read sequentially from its first frame. Seeking to a timestamp
//! turned out to be unreliable on remote streams, so every frame up to the end of the
//! requested window is decoded and only the targeted ones are kept.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use color_eyre::eyre;
use image::RgbImage;
use keyframes_common::cancellation::CancelToken;

use super::{
    logger::{fault, information, warning, ExtractionLog, Logger},
    request::{ExtractError, ExtractionRequest, Sampling, SingleReason},
    time_points::{frame_index, frame_time, keyframe_file_name, TargetFrames, DEFAULT_FPS},
};

/// Where a locator actually streams from.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedSource {
    pub stream_url: Option<String>,
    /// Seconds, if known
    pub duration: Option<f64>,
}

pub trait MetadataResolver {
    fn resolve(&self, locator: &str) -> eyre::Result<ResolvedSource>;
}

/// Decodes frames in presentation order, one at a time.
pub trait FrameReader {
    fn frame_rate(&self) -> Option<f64>;
    fn frame_count(&self) -> Option<u64>;
    /// `None` when the stream has ended.
    fn read_frame(&mut self) -> eyre::Result<Option<RgbImage>>;
}

pub trait StreamOpener {
    type Reader: FrameReader;
    fn open(&self, url: &str) -> eyre::Result<Self::Reader>;
}

pub trait ImageWriter {
    fn write(&self, frame: &RgbImage, path: &Path) -> eyre::Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub success: bool,
    /// In the order they were written
    pub keyframes: Vec<PathBuf>,
    pub log: Vec<String>,
}

impl ExtractionResult {
    pub fn log_text(&self) -> String {
        self.log.join("\n")
    }
}

pub struct Extractor<R, O, W> {
    resolver: R,
    opener: O,
    writer: W,
}

impl<R, O, W> Extractor<R, O, W>
where
    R: MetadataResolver,
    O: StreamOpener,
    W: ImageWriter,
{
    pub fn new(resolver: R, opener: O, writer: W) -> Self {
        Self {
            resolver,
            opener,
            writer,
        }
    }

    /// Saves the keyframes of `request` into `save_to` as `keyframe_<secs>s.jpg`.
    ///
    /// Never fails: problems end up in the log and make `success` false. Successful
    /// means that reading got past the first requested frame, even if nothing was
    /// saved. `cancel` is polled before every frame read.
    pub fn extract(
        &self,
        request: &ExtractionRequest,
        save_to: &Path,
        cancel: &CancelToken,
    ) -> ExtractionResult {
        let log = ExtractionLog::new(request.source.as_str());
        let mut keyframes = Vec::new();

        let success = match self.run(request, save_to, cancel, &log, &mut keyframes) {
            Ok(success) => success,
            Err(e) => {
                fault!(log, "{e}");
                false
            }
        };

        ExtractionResult {
            success,
            keyframes,
            log: log.into_lines(),
        }
    }

    fn run(
        &self,
        request: &ExtractionRequest,
        save_to: &Path,
        cancel: &CancelToken,
        log: &ExtractionLog,
        keyframes: &mut Vec<PathBuf>,
    ) -> Result<bool, ExtractError> {
        let plan = request.plan()?;
        match plan.single_reason {
            Some(SingleReason::NothingRequested) => information!(
                log,
                "No interval and no number of frames given. Extract only 1 keyframe."
            ),
            Some(SingleReason::SingleInstant) => {
                information!(log, "Start time equals end time. Extract only 1 keyframe.")
            }
            None => (),
        }
        match plan.sampling {
            Sampling::Count(n) => information!(log, "Extracting {n} keyframes."),
            Sampling::Interval(secs) => {
                information!(log, "Extracting keyframes with interval {secs}s.")
            }
        }

        fs::create_dir_all(save_to).map_err(|source| ExtractError::SaveDir {
            path: save_to.to_owned(),
            source,
        })?;

        if cancel.is_cancelled() {
            warning!(log, "Process stopped by user");
            return Ok(false);
        }

        let resolved = self
            .resolver
            .resolve(&request.source)
            .map_err(ExtractError::Resolve)?;
        let url = resolved
            .stream_url
            .filter(|url| !url.is_empty())
            .ok_or(ExtractError::NoStreamUrl)?;
        let duration = resolved.duration.filter(|d| *d > 0.0);
        if let Some(duration) = duration {
            if plan.end > duration {
                return Err(ExtractError::ExceedsDuration {
                    end: plan.end,
                    duration,
                });
            }
        }

        let mut reader = self.opener.open(&url).map_err(ExtractError::Open)?;

        let fps = reader
            .frame_rate()
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .unwrap_or(DEFAULT_FPS);
        information!(
            log,
            "Video FPS: {fps}, Total Frames: {}, Duration: {}",
            reader
                .frame_count()
                .map_or_else(|| "unknown".to_owned(), |n| n.to_string()),
            duration.map_or_else(|| "unknown".to_owned(), |d| format!("{d}s")),
        );

        let start_frame = frame_index(plan.start, fps);
        let end_frame = frame_index(plan.end, fps);
        let targets = TargetFrames::new(plan.start, plan.end, plan.sampling, fps);
        log::debug!(
            "Scanning frames 0 to {end_frame} of {}, keeping from frame {start_frame}",
            request.source
        );

        let mut saved: HashSet<String> = HashSet::new();
        let mut current_frame: u64 = 0;
        while current_frame <= end_frame {
            if cancel.is_cancelled() {
                warning!(log, "Process stopped by user");
                break;
            }

            let frame = match reader.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    fault!(log, "Could not read frame at position {current_frame}.");
                    break;
                }
                Err(e) => {
                    fault!(log, "Could not read frame at position {current_frame}: {e:#}");
                    break;
                }
            };

            if targets.contains(current_frame) {
                let time = frame_time(current_frame, fps);
                let name = keyframe_file_name(time);
                if !saved.contains(&name) {
                    let path = save_to.join(&name);
                    match self.writer.write(&frame, &path) {
                        Ok(()) => {
                            information!(
                                log,
                                "Saved keyframe at {time:.2} seconds as {}",
                                path.display()
                            );
                            keyframes.push(path);
                            saved.insert(name);
                        }
                        Err(e) => fault!(
                            log,
                            "Failed to write keyframe at {time:.2} seconds to {}: {e:#}",
                            path.display()
                        ),
                    }
                }
            }

            current_frame += 1;
        }
        drop(reader);

        if current_frame < start_frame {
            fault!(
                log,
                "Could not reach start frame {start_frame} (stopped at {current_frame})."
            );
        }

        let success = current_frame > start_frame;
        if success && keyframes.is_empty() {
            warning!(log, "Frames were scanned, but no keyframe was saved.");
        }
        Ok(success)
    }
}

#[cfg(test)]
mod test {
    use super::super::fakes::*;
    use super::*;

    fn extractor(
        resolver: FakeResolver,
        stream: FakeStream,
    ) -> Extractor<FakeResolver, FakeStream, RecordingWriter> {
        Extractor::new(resolver, stream, RecordingWriter::default())
    }

    fn file_names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| {
                p.file_name()
                    .expect("has a name")
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }

    fn has_line(result: &ExtractionResult, prefix: &str, needle: &str) -> bool {
        result
            .log
            .iter()
            .any(|line| line.starts_with(prefix) && line.contains(needle))
    }

    #[test]
    fn three_evenly_spaced_frames() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let ex = extractor(FakeResolver::duration(60.0), FakeStream::new(30.0, 1800));
        let request = ExtractionRequest::with_frames("vid", 10.0, 20.0, 3);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(result.success);
        assert_eq!(
            vec![
                "keyframe_10.00s.jpg",
                "keyframe_15.00s.jpg",
                "keyframe_20.00s.jpg"
            ],
            file_names(&result.keyframes)
        );
        let reds: Vec<u8> = ex.writer.written.borrow().iter().map(|(_, r)| *r).collect();
        assert_eq!(vec![(300 % 256) as u8, (450 % 256) as u8, (600 % 256) as u8], reds);
        assert_eq!(result.log.join("\n"), result.log_text());
        assert!(has_line(&result, "[INFO]", "Extracting 3 keyframes."));
    }

    #[test]
    fn start_after_end_writes_nothing() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let save_to = tmp.path().join("out");
        let ex = extractor(FakeResolver::duration(60.0), FakeStream::new(30.0, 1800));
        let request = ExtractionRequest::with_frames("vid", 20.0, 10.0, 3);

        let result = ex.extract(&request, &save_to, &CancelToken::new());

        assert!(!result.success);
        assert!(result.keyframes.is_empty());
        assert!(ex.writer.written.borrow().is_empty());
        assert!(!save_to.exists());
        assert_eq!(
            vec!["[ERROR] - Start time must be less than or equal to end time."],
            result.log
        );
    }

    #[test]
    fn single_instant_takes_start_frame() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let ex = extractor(FakeResolver::duration(60.0), FakeStream::new(25.0, 1500));

        let request = ExtractionRequest::with_frames("vid", 4.0, 4.0, 5);
        let result = ex.extract(&request, tmp.path(), &CancelToken::new());
        assert!(result.success);
        assert_eq!(vec!["keyframe_4.00s.jpg"], file_names(&result.keyframes));

        let request = ExtractionRequest::with_interval("vid", 2.0, 9.0, 0.0);
        let result = ex.extract(&request, tmp.path(), &CancelToken::new());
        assert!(result.success);
        assert_eq!(vec!["keyframe_2.00s.jpg"], file_names(&result.keyframes));
        assert!(has_line(&result, "[INFO]", "Extract only 1 keyframe."));
    }

    #[test]
    fn interval_sampling() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let ex = extractor(FakeResolver::duration(60.0), FakeStream::new(10.0, 600));
        let request = ExtractionRequest::with_interval("vid", 1.0, 3.0, 0.5);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(result.success);
        assert_eq!(
            vec![
                "keyframe_1.00s.jpg",
                "keyframe_1.50s.jpg",
                "keyframe_2.00s.jpg",
                "keyframe_2.50s.jpg",
                "keyframe_3.00s.jpg",
            ],
            file_names(&result.keyframes)
        );
    }

    #[test]
    fn huge_frame_count_keeps_every_frame_in_window() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let ex = extractor(FakeResolver::duration(60.0), FakeStream::new(10.0, 600));
        let request = ExtractionRequest::with_frames("vid", 1.0, 2.0, i64::MAX);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(result.success);
        assert_eq!(11, result.keyframes.len());
        assert_eq!(
            Some(&"keyframe_1.00s.jpg".to_owned()),
            file_names(&result.keyframes).first()
        );
        assert_eq!(
            Some(&"keyframe_2.00s.jpg".to_owned()),
            file_names(&result.keyframes).last()
        );
    }

    #[test]
    fn tiny_interval_keeps_every_frame_in_window() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let ex = extractor(FakeResolver::duration(60.0), FakeStream::new(10.0, 600));
        let request = ExtractionRequest::with_interval("vid", 1.0, 2.05, 1e-12);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(result.success);
        let reds: Vec<u8> = ex.writer.written.borrow().iter().map(|(_, r)| *r).collect();
        assert_eq!((10..=20).collect::<Vec<u8>>(), reds);
    }

    #[test]
    fn scan_details_stay_out_of_the_log() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let ex = extractor(FakeResolver::duration(60.0), FakeStream::new(10.0, 600));
        let request = ExtractionRequest::with_frames("vid", 1.0, 2.0, 2);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(result.success);
        assert!(!result.log.is_empty());
        assert!(result.log.iter().all(|line| !line.starts_with("[DEBUG]")));
        assert!(!has_line(&result, "", "Scanning frames"));
    }

    #[test]
    fn duplicate_targets_are_saved_once() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        // 1 fps: 5 points between 2s and 3s all land on frame 2 or 3
        let ex = extractor(FakeResolver::duration(60.0), FakeStream::new(1.0, 60));
        let request = ExtractionRequest::with_frames("vid", 2.0, 3.0, 5);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(result.success);
        assert_eq!(
            vec!["keyframe_2.00s.jpg", "keyframe_3.00s.jpg"],
            file_names(&result.keyframes)
        );
        assert_eq!(2, ex.writer.written.borrow().len());
    }

    #[test]
    fn missing_frame_rate_defaults_to_30() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let mut stream = FakeStream::new(0.0, 300);
        stream.fps = None;
        let ex = extractor(FakeResolver::duration(10.0), stream);
        let request = ExtractionRequest::with_frames("vid", 1.0, 2.0, 2);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(result.success);
        let reds: Vec<u8> = ex.writer.written.borrow().iter().map(|(_, r)| *r).collect();
        assert_eq!(vec![30, 60], reds);
        assert!(has_line(&result, "[INFO]", "Video FPS: 30"));
    }

    #[test]
    fn cancelled_before_reading() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let ex = extractor(FakeResolver::duration(60.0), FakeStream::new(30.0, 1800));
        let request = ExtractionRequest::with_frames("vid", 1.0, 5.0, 3);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = ex.extract(&request, tmp.path(), &cancel);

        assert!(!result.success);
        assert!(result.keyframes.is_empty());
        assert!(has_line(&result, "[WARNING]", "Process stopped by user"));
    }

    #[test]
    fn cancelled_midway_keeps_partial_results() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let cancel = CancelToken::new();
        let mut stream = FakeStream::new(10.0, 600);
        // Frames 0..=25 are read, targets are 10, 20, 30, 40 and 50
        stream.cancel_after = Some((25, cancel.clone()));
        let ex = extractor(FakeResolver::duration(60.0), stream);
        let request = ExtractionRequest::with_frames("vid", 1.0, 5.0, 5);

        let result = ex.extract(&request, tmp.path(), &cancel);

        assert!(result.success);
        assert_eq!(
            vec!["keyframe_1.00s.jpg", "keyframe_2.00s.jpg"],
            file_names(&result.keyframes)
        );
        assert!(has_line(&result, "[WARNING]", "Process stopped by user"));
    }

    #[test]
    fn cancelled_before_start_frame_is_failure() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let cancel = CancelToken::new();
        let mut stream = FakeStream::new(10.0, 600);
        stream.cancel_after = Some((5, cancel.clone()));
        let ex = extractor(FakeResolver::duration(60.0), stream);
        let request = ExtractionRequest::with_frames("vid", 3.0, 5.0, 2);

        let result = ex.extract(&request, tmp.path(), &cancel);

        assert!(!result.success);
        assert!(result.keyframes.is_empty());
        assert!(has_line(&result, "[ERROR]", "Could not reach start frame 30"));
    }

    #[test]
    fn unresolvable_source() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let request = ExtractionRequest::with_frames("vid", 1.0, 2.0, 2);

        let ex = extractor(FakeResolver { resolved: None }, FakeStream::new(30.0, 100));
        let result = ex.extract(&request, tmp.path(), &CancelToken::new());
        assert!(!result.success);
        assert!(has_line(&result, "[ERROR]", "video unavailable"));

        let no_url = FakeResolver {
            resolved: Some(ResolvedSource {
                stream_url: None,
                duration: Some(10.0),
            }),
        };
        let ex = extractor(no_url, FakeStream::new(30.0, 100));
        let result = ex.extract(&request, tmp.path(), &CancelToken::new());
        assert!(!result.success);
        assert!(has_line(&result, "[ERROR]", "Could not get video stream URL."));
    }

    #[test]
    fn end_past_duration() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let ex = extractor(FakeResolver::duration(8.0), FakeStream::new(30.0, 240));
        let request = ExtractionRequest::with_frames("vid", 1.0, 9.0, 2);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(!result.success);
        assert!(has_line(&result, "[ERROR]", "End time 9.0s exceeds video duration 8.0s."));
    }

    #[test]
    fn unknown_duration_is_not_checked() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let ex = extractor(FakeResolver::duration(0.0), FakeStream::new(10.0, 100));
        let request = ExtractionRequest::with_frames("vid", 1.0, 2.0, 2);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(result.success);
        assert_eq!(2, result.keyframes.len());
    }

    #[test]
    fn stream_that_cannot_open() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let mut stream = FakeStream::new(30.0, 100);
        stream.refuse = true;
        let ex = extractor(FakeResolver::duration(60.0), stream);
        let request = ExtractionRequest::with_frames("vid", 1.0, 2.0, 2);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(!result.success);
        assert!(has_line(&result, "[ERROR]", "Could not open video stream"));
    }

    #[test]
    fn read_failure_keeps_what_was_saved() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let mut stream = FakeStream::new(10.0, 600);
        stream.fail_at = Some(25);
        let ex = extractor(FakeResolver::duration(60.0), stream);
        let request = ExtractionRequest::with_frames("vid", 1.0, 5.0, 3);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(result.success);
        assert_eq!(vec!["keyframe_1.00s.jpg"], file_names(&result.keyframes));
        assert!(has_line(
            &result,
            "[ERROR]",
            "Could not read frame at position 25: corrupt packet"
        ));
    }

    #[test]
    fn short_stream_before_start() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let ex = extractor(FakeResolver::duration(0.0), FakeStream::new(10.0, 20));
        let request = ExtractionRequest::with_frames("vid", 5.0, 6.0, 2);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(!result.success);
        assert!(has_line(&result, "[ERROR]", "Could not read frame at position 20."));
        assert!(has_line(&result, "[ERROR]", "(stopped at 20)"));
    }

    #[test]
    fn failed_writes_are_skipped() {
        let tmp = tempfile::tempdir().expect("tmpdir");
        let ex = extractor(FakeResolver::duration(60.0), FakeStream::new(10.0, 600));
        ex.writer.fail.borrow_mut().extend([true, true]);
        let request = ExtractionRequest::with_frames("vid", 1.0, 2.0, 2);

        let result = ex.extract(&request, tmp.path(), &CancelToken::new());

        assert!(result.success);
        assert!(result.keyframes.is_empty());
        assert!(has_line(&result, "[ERROR]", "disk full"));
        assert!(has_line(&result, "[WARNING]", "no keyframe was saved"));
    }
}
