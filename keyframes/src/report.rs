//! Search hits going in, and what is shown about them coming out.

use std::{
    collections::{BTreeMap, HashMap},
    fmt, io,
    path::{Path, PathBuf},
};

use color_eyre::eyre::{self, Context};
use keyframes_common::utils::fsutils;
use serde::{Deserialize, Serialize};

use crate::youtube::{Segment, SegmentError};

/// One result of the similarity search.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchHit {
    #[serde(default)]
    pub id: Option<String>,
    pub metadata: HitMetadata,
    /// The caption that matched
    #[serde(default)]
    pub page_content: String,
    pub score: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HitMetadata {
    /// `<youtube id>_<start>_<end>`
    pub video_id: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl SearchHit {
    pub fn video_id(&self) -> &str {
        &self.metadata.video_id
    }

    pub fn segment(&self) -> Result<Segment, SegmentError> {
        self.video_id().parse()
    }
}

/// Reads the JSON array of hits written by the search.
pub fn read_hits(path: impl AsRef<Path>) -> eyre::Result<Vec<SearchHit>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .wrap_err_with(|| format!("failed to open the hits file at {}", path.display()))?;
    serde_json::from_reader(io::BufReader::new(file))
        .wrap_err_with(|| format!("failed to parse the hits file at {}", path.display()))
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    #[serde(flatten)]
    hit: &'a SearchHit,
    keyframes: &'a [PathBuf],
}

/// Every hit, in order, together with the keyframes saved for its video id.
pub fn report_json(
    hits: &[SearchHit],
    files: &HashMap<String, Vec<PathBuf>>,
) -> serde_json::Result<String> {
    let entries: Vec<ReportEntry<'_>> = hits
        .iter()
        .map(|hit| ReportEntry {
            hit,
            keyframes: files
                .get(hit.video_id())
                .map(Vec::as_slice)
                .unwrap_or_default(),
        })
        .collect();
    serde_json::to_string_pretty(&entries)
}

/// A row of the results table
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub link: String,
    pub start: f64,
    pub end: f64,
    /// Rounded to 5 decimals
    pub score: f64,
}

impl TableRow {
    pub fn from_hit(hit: &SearchHit) -> Result<Self, SegmentError> {
        let segment = hit.segment()?;
        Ok(Self {
            link: segment.link(),
            start: segment.start,
            end: segment.end,
            score: (hit.score * 1e5).round() / 1e5,
        })
    }
}

impl fmt::Display for TableRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.link, self.start, self.end, self.score
        )
    }
}

/// The keyframes of one video, as found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Gallery {
    pub folder: PathBuf,
    pub images: Vec<PathBuf>,
}

impl Gallery {
    pub fn label(&self) -> String {
        let name = self
            .folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{} keyframes: {}", self.images.len(), name)
    }
}

/// One gallery per sub folder of `dir` holding at least one jpg, sorted by folder.
pub fn galleries(dir: impl AsRef<Path>) -> io::Result<Vec<Gallery>> {
    let mut galleries = Vec::new();
    for folder in fsutils::sub_dirs(dir)? {
        let images = fsutils::files_with_extension(&folder, "jpg")?;
        if !images.is_empty() {
            galleries.push(Gallery { folder, images });
        }
    }
    Ok(galleries)
}
