use std::path::PathBuf;

use crate::resolver::{
    DirectResolver, Resolver, YtDlpResolver, DEFAULT_FORMAT, DEFAULT_YT_DLP,
};

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolverKind {
    /// Video pages, resolved with yt-dlp
    YtDlp,
    /// Local files or direct media URLs
    Direct,
}

#[derive(clap::Args, Debug)]
pub struct ResolverCli {
    /// How to turn the source into a stream
    #[arg(long, value_enum, default_value_t = ResolverKind::YtDlp)]
    resolver: ResolverKind,

    /// The yt-dlp executable
    #[arg(long, default_value = DEFAULT_YT_DLP)]
    yt_dlp: PathBuf,

    /// yt-dlp format selector, must pick a single progressive stream
    #[arg(long, default_value = DEFAULT_FORMAT)]
    format: String,
}

impl ResolverCli {
    pub fn to_resolver(&self) -> Resolver {
        match self.resolver {
            ResolverKind::YtDlp => {
                Resolver::YtDlp(YtDlpResolver::new(&self.yt_dlp, self.format.clone()))
            }
            ResolverKind::Direct => Resolver::Direct(DirectResolver),
        }
    }
}
