//! Turning a locator into something ffmpeg can stream.

use std::{
    ffi::OsString,
    process::{Command, Stdio},
};

use color_eyre::eyre::{self, Context};
use serde::Deserialize;

use crate::{
    ffmpeg_reader::probe_duration,
    keyframe::{MetadataResolver, ResolvedSource},
};

pub const DEFAULT_YT_DLP: &str = "yt-dlp";
pub const DEFAULT_FORMAT: &str = "best[ext=mp4]";

/// Asks `yt-dlp` for a direct media URL of a video page, without downloading anything.
#[derive(Debug, Clone)]
pub struct YtDlpResolver {
    program: OsString,
    format: String,
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new(DEFAULT_YT_DLP, DEFAULT_FORMAT)
    }
}

/// The parts of `yt-dlp --dump-single-json` that are of interest
#[derive(Deserialize, Debug)]
struct YtDlpInfo {
    url: Option<String>,
    duration: Option<f64>,
}

impl YtDlpResolver {
    pub fn new(program: impl Into<OsString>, format: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            format: format.into(),
        }
    }

    fn command(&self, locator: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["--format", self.format.as_str()])
            .args(["--no-playlist", "--simulate", "--dump-single-json"])
            .arg("--")
            .arg(locator)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

fn parse_info(json: &[u8]) -> eyre::Result<ResolvedSource> {
    let info: YtDlpInfo =
        serde_json::from_slice(json).wrap_err("yt-dlp printed something unexpected")?;
    Ok(ResolvedSource {
        stream_url: info.url,
        duration: info.duration,
    })
}

impl MetadataResolver for YtDlpResolver {
    fn resolve(&self, locator: &str) -> eyre::Result<ResolvedSource> {
        log::debug!("Resolving {locator} with {:?}", self.program);
        let output = self
            .command(locator)
            .output()
            .wrap_err_with(|| format!("failed to run {:?}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            eyre::bail!(
                "{:?} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            );
        }

        parse_info(&output.stdout)
    }
}

/// For locators that already are streamable, like local files or direct media URLs.
/// The duration is probed with ffmpeg.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectResolver;

impl MetadataResolver for DirectResolver {
    fn resolve(&self, locator: &str) -> eyre::Result<ResolvedSource> {
        let duration = probe_duration(locator)
            .wrap_err_with(|| format!("failed to probe the duration of {locator}"))?;
        Ok(ResolvedSource {
            stream_url: Some(locator.to_owned()),
            duration,
        })
    }
}

/// Any of the resolvers, picked at runtime.
#[derive(Debug, Clone)]
pub enum Resolver {
    YtDlp(YtDlpResolver),
    Direct(DirectResolver),
}

impl MetadataResolver for Resolver {
    fn resolve(&self, locator: &str) -> eyre::Result<ResolvedSource> {
        match self {
            Resolver::YtDlp(r) => r.resolve(locator),
            Resolver::Direct(r) => r.resolve(locator),
        }
    }
}
