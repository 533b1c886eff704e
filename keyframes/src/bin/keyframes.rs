use std::{ffi::OsString, path::PathBuf, time::Instant};

use clap::Parser;
use color_eyre::eyre::{self, Context};
use keyframes::{
    args::ResolverCli,
    batch::extract_and_report,
    ffmpeg_reader::FfmpegOpener,
    image_writer::JpegWriter,
    keyframe::Extractor,
    report::{galleries, read_hits, TableRow},
};
use keyframes_common::{
    bin_common::init::{init_eyre, init_logger},
    cancellation::CancelToken,
    utils::fsutils::read_optional_file,
};

#[derive(Parser, Debug)]
#[command()]
/// Extracts keyframes for every hit of a similarity search.
///
/// Without arguments, flags are read from `.keyframesrc` in the working directory.
struct Cli {
    #[command(flatten)]
    resolver_args: ResolverCli,

    /// JSON array of search hits, each with a `metadata.video_id` of the form
    /// `<youtube id>_<start>_<end>`
    #[arg(long)]
    hits: PathBuf,

    /// Keyframes per video
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(i64).range(1..=100))]
    frames: i64,

    /// Folder to place the keyframes in, one sub folder per video. It is emptied first.
    #[arg(long, default_value = "keyframes")]
    save_to: PathBuf,

    /// Where to write the JSON report, stdout if not given
    #[arg(long)]
    report: Option<PathBuf>,

    /// A file to additionally write the logs to
    #[arg(long)]
    logfile: Option<PathBuf>,
}

fn cli_arguments() -> eyre::Result<Cli> {
    const ARGS_FILE: &str = ".keyframesrc";
    let mut args: Vec<OsString> = std::env::args_os().collect();

    if args.len() == 1 {
        if let Some(flags) = read_optional_file(ARGS_FILE)
            .wrap_err_with(|| format!("Could not read config file at: {ARGS_FILE}"))?
        {
            args.extend(
                flags
                    .split_whitespace()
                    .map(|s| std::ffi::OsStr::new(s).to_owned()),
            );
        }
    }

    Ok(Cli::parse_from(args))
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = cli_arguments()?;
    init_logger(cli.logfile.as_deref())?;
    log::debug!("CLI arguments: {cli:#?}");

    let hits = read_hits(&cli.hits)?;
    log::info!("Read {} hits from {}", hits.len(), cli.hits.display());
    for hit in &hits {
        match TableRow::from_hit(hit) {
            Ok(row) => log::info!("{row}"),
            Err(e) => log::warn!("{e}"),
        }
    }

    let cancel = CancelToken::with_signals().wrap_err("failed to create cancel token")?;
    let extractor = Extractor::new(cli.resolver_args.to_resolver(), FfmpegOpener, JpegWriter);

    let started = Instant::now();
    let (report, logs) = extract_and_report(&extractor, &hits, cli.frames, &cli.save_to, &cancel)?;
    log::info!(
        "Extraction took {}",
        humantime::format_duration(std::time::Duration::from_secs(
            started.elapsed().as_secs()
        ))
    );
    if cancel.is_cancelled() {
        log::warn!("Cancelled, the results are partial");
    }

    println!("{logs}");

    for gallery in galleries(&cli.save_to)
        .wrap_err_with(|| format!("failed to list {}", cli.save_to.display()))?
    {
        log::info!("{}", gallery.label());
    }

    match cli.report {
        Some(path) => std::fs::write(&path, report)
            .wrap_err_with(|| format!("failed to write the report to {}", path.display()))?,
        None => println!("{report}"),
    }

    Ok(())
}
