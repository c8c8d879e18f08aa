use clap::Parser;
use fetchpool::config::{ByteSize, Overrides};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fetchpool")]
#[command(about = "Download a list of URLs concurrently (http, https, ftp, s3)", long_about = None)]
pub struct Cli {
    /// AWS credential profile for s3:// URLs
    #[arg(long)]
    pub profile: Option<String>,

    /// Read size for http(s) and ftp downloads (e.g. 1024, 64KB)
    #[arg(long)]
    pub chunk: Option<ByteSize>,

    /// Number of concurrent download workers
    #[arg(long)]
    pub threads: Option<usize>,

    /// Directory downloaded files are written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Settings file (defaults to $FETCHPOOL_CONFIG or config/fetchpool.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long)]
    pub verbose: bool,

    /// URLs to download
    #[arg(required = true, num_args = 1..)]
    pub urls: Vec<String>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            profile: self.profile.clone(),
            chunk: self.chunk,
            workers: self.threads,
            output_dir: self.output_dir.clone(),
        }
    }
}
