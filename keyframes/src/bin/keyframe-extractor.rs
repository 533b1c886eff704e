use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre;
use keyframes::{
    args::ResolverCli,
    ffmpeg_reader::FfmpegOpener,
    image_writer::JpegWriter,
    keyframe::{ExtractionRequest, Extractor},
};
use keyframes_common::{
    bin_common::init::{init_eyre, init_logger},
    cancellation::CancelToken,
};

#[derive(Parser, Debug)]
#[command()]
/// Extract keyframes from a part of one video
struct Cli {
    #[command(flatten)]
    resolver_args: ResolverCli,

    /// Where to start, in seconds
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Where to stop, in seconds. Defaults to the start.
    #[arg(long)]
    end: Option<f64>,

    /// How many keyframes to extract, evenly spread between start and end
    #[arg(long, conflicts_with = "interval", value_parser = clap::value_parser!(i64).range(1..))]
    frames: Option<i64>,

    /// Seconds between each keyframe
    #[arg(long, default_value_t = 0.0)]
    interval: f64,

    /// Where to place the keyframes
    #[arg(long, default_value = "keyframes")]
    outdir: PathBuf,

    /// A file to additionally write the logs to
    #[arg(long)]
    logfile: Option<PathBuf>,

    /// The video to extract from, a page URL or, with `--resolver direct`, a file or
    /// media URL
    source: String,
}

fn main() -> eyre::Result<()> {
    init_eyre()?;
    let cli = Cli::parse();
    init_logger(cli.logfile.as_deref())?;
    log::debug!("CLI arguments: {cli:#?}");

    let cancel = CancelToken::with_signals()?;
    let extractor = Extractor::new(cli.resolver_args.to_resolver(), FfmpegOpener, JpegWriter);
    let request = ExtractionRequest {
        source: cli.source,
        start: cli.start,
        end: cli.end.unwrap_or(cli.start),
        frames: cli.frames,
        interval: cli.interval,
    };

    let result = extractor.extract(&request, &cli.outdir, &cancel);
    for path in &result.keyframes {
        println!("{}", path.display());
    }

    eyre::ensure!(result.success, "the extraction failed:\n{}", result.log_text());
    Ok(())
}
