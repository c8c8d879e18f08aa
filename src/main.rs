mod cli;

use clap::Parser;
use cli::Cli;
use fetchpool::config::Settings;
use fetchpool::strategies::{Backends, FtpConfig, HttpConfig};
use fetchpool::{observability, orchestrator};
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    observability::init_tracing(cli.verbose);

    let settings = Settings::load(cli.config.as_deref(), cli.overrides())?;
    if !settings.profile.is_empty() {
        info!(profile = %settings.profile, "working with profile");
    }

    // One runtime thread per worker so downloads run in parallel.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(settings.workers)
        .thread_name("fetchpool-worker")
        .enable_all()
        .build()?;

    let backends = Backends::standard(HttpConfig::default(), FtpConfig::default())?;
    let parameters = settings.global_parameters();

    runtime.block_on(orchestrator::run(cli.urls, settings.workers, parameters, backends));

    Ok(())
}
