//! Keyframes for every hit of a search, one folder per hit.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use color_eyre::eyre::{self, Context};
use keyframes_common::{cancellation::CancelToken, utils::fsutils};

use crate::{
    keyframe::{
        logger::Level, ExtractionRequest, Extractor, ImageWriter, MetadataResolver,
        StreamOpener,
    },
    report::{report_json, SearchHit},
};

pub const NO_HITS: &str = "No metadata available.";

#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Saved keyframes per video id
    pub files: HashMap<String, Vec<PathBuf>>,
    /// One block per processed hit, in order
    pub logs: Vec<String>,
}

impl BatchOutcome {
    pub fn log_text(&self) -> String {
        self.logs.join("\n\n")
    }
}

/// Runs `extractor` on each hit in order, into `save_to/<video id>`. Stops between hits
/// when `cancel` is set; the extraction in progress stops by itself.
pub fn fetch_keyframes<R, O, W>(
    extractor: &Extractor<R, O, W>,
    hits: &[SearchHit],
    frames: i64,
    save_to: &Path,
    cancel: &CancelToken,
) -> BatchOutcome
where
    R: MetadataResolver,
    O: StreamOpener,
    W: ImageWriter,
{
    let mut outcome = BatchOutcome::default();
    let total = hits.len();

    for (i, hit) in hits.iter().enumerate() {
        if cancel.is_cancelled() {
            log::warn!("Stopping before {}, as requested", hit.video_id());
            break;
        }
        let video_id = hit.video_id();
        log::info!("Extracting keyframes {video_id} ({}/{total})", i + 1);

        let segment = match hit.segment() {
            Ok(segment) => segment,
            Err(e) => {
                log::error!("Skipping hit: {e}");
                outcome.logs.push(format!(
                    "--- Logs for {video_id} ---\n{} - {e}",
                    Level::Error.tag()
                ));
                continue;
            }
        };
        let link = segment.link();

        let request = ExtractionRequest::with_frames(&link, segment.start, segment.end, frames);
        let sub_folder = save_to.join(fsutils::path_as_filename(video_id));
        let result = extractor.extract(&request, &sub_folder, cancel);
        log::info!(
            "{} keyframes for {video_id}, {}",
            result.keyframes.len(),
            if result.success { "success" } else { "failure" }
        );

        outcome
            .logs
            .push(format!("--- Logs for {link} ({video_id}) ---\n{}", result.log_text()));
        outcome.files.insert(video_id.to_owned(), result.keyframes);
    }

    outcome
}

/// Empties `save_to` and fetches keyframes for all hits. Returns the JSON report and the
/// joined logs.
pub fn extract_and_report<R, O, W>(
    extractor: &Extractor<R, O, W>,
    hits: &[SearchHit],
    frames: i64,
    save_to: &Path,
    cancel: &CancelToken,
) -> eyre::Result<(String, String)>
where
    R: MetadataResolver,
    O: StreamOpener,
    W: ImageWriter,
{
    fsutils::clear_dir(save_to)
        .wrap_err_with(|| format!("failed to clear {}", save_to.display()))?;

    if hits.is_empty() {
        return Ok((NO_HITS.to_owned(), String::new()));
    }

    let outcome = fetch_keyframes(extractor, hits, frames, save_to, cancel);
    let report = report_json(hits, &outcome.files).wrap_err("failed to create the report")?;
    Ok((report, outcome.log_text()))
}
