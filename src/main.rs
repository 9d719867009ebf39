use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ytm_enrich::batch::BatchRunner;
use ytm_enrich::catalog::CatalogMatcher;
use ytm_enrich::config::{self, Config};
use ytm_enrich::cover::HttpCoverFetcher;
use ytm_enrich::http::{build_agent, RetryPolicy};
use ytm_enrich::media::{MediaSource, YtDlp};
use ytm_enrich::models::{BatchEntry, BatchReport, ItemStatus};
use ytm_enrich::pipeline::TrackPipeline;
use ytm_enrich::progress::{create_spinner, format_duration, ProgressMode};
use ytm_enrich::spotify::SpotifyClient;

const PROMPT: &str = "Enter YouTube Music URL (track or playlist): ";

#[derive(Parser)]
#[command(name = "ytm-enrich")]
#[command(about = "Download YouTube Music tracks or playlists as MP3 with catalog-matched tags")]
struct Args {
    /// Track or playlist URL; prompted for when omitted
    locator: Option<String>,

    #[arg(long, default_value = config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Parallel items (1-16)
    #[arg(long, default_value = "1")]
    workers: usize,

    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Path to the yt-dlp binary
    #[arg(long = "yt-dlp", default_value = "yt-dlp")]
    yt_dlp: PathBuf,

    /// MP3 bitrate in kbps
    #[arg(long, default_value = "320")]
    bitrate: u32,

    /// Per-request network timeout (catalog, cover art and media source)
    #[arg(long, default_value = "15")]
    timeout_secs: u64,

    /// Extra attempts for transient HTTP failures
    #[arg(long, default_value = "2")]
    retries: u32,

    /// Fail an item when its cover art cannot be fetched
    #[arg(long)]
    strict_cover: bool,

    /// Hide progress bars and log progress lines instead
    #[arg(long)]
    log_only: bool,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> (Option<String>, Config) {
        let config = Config {
            output_dir: self.output_dir,
            workers: self.workers,
            credentials: config::credentials_from(self.client_id, self.client_secret),
            ytdlp_binary: self.yt_dlp,
            bitrate_kbps: self.bitrate,
            timeout: Duration::from_secs(self.timeout_secs),
            retry: RetryPolicy::new(self.retries),
            strict_cover: self.strict_cover,
            progress: ProgressMode::from_log_only(self.log_only),
            report_path: self.report,
        };
        (self.locator, config)
    }
}

fn read_locator(arg: Option<String>) -> Result<String> {
    let locator = match arg {
        Some(locator) => locator,
        None => {
            print!("{}", PROMPT);
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read locator from stdin")?;
            line
        }
    };
    let locator = locator.trim().to_string();
    if locator.is_empty() {
        bail!("No URL given");
    }
    Ok(locator)
}

fn build_matcher(config: &Config, agent: &ureq::Agent) -> CatalogMatcher {
    let Some(credentials) = &config.credentials else {
        warn!("No catalog credentials configured; using source metadata only");
        return CatalogMatcher::disabled();
    };
    match SpotifyClient::connect(agent.clone(), credentials, config.retry) {
        Ok(client) => CatalogMatcher::new(Box::new(client)),
        Err(err) => {
            warn!("{}; using source metadata only", err);
            CatalogMatcher::disabled()
        }
    }
}

fn print_summary(report: &BatchReport, config: &Config) {
    println!("\n{:=<60}", "");
    println!("All done!");
    println!("  Attempted: {}", report.attempted);
    println!("  Succeeded: {}", report.succeeded);
    println!("  Failed: {}", report.failed);
    println!("  Catalog matched: {}", report.catalog_matched);
    println!(
        "  Elapsed: {}",
        format_duration(Duration::from_secs_f64(report.elapsed_seconds))
    );
    println!("  Files saved to: {}", config.output_dir.display());
    for outcome in &report.outcomes {
        if let ItemStatus::Failed { stage, reason } = &outcome.status {
            println!("  [{}] {} failed at {}: {}", outcome.ordinal, outcome.label, stage, reason);
        }
    }
    println!("{:=<60}", "");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let (locator, config) = Args::parse().into_config();
    config.validate()?;

    let locator = read_locator(locator)?;
    config::prepare_output_dir(&config.output_dir)?;

    let agent = build_agent(config.timeout);
    let matcher = build_matcher(&config, &agent);
    if !matcher.is_enabled() {
        info!("Catalog matching disabled");
    }
    let ytdlp = YtDlp::new(&config.ytdlp_binary, config.bitrate_kbps)
        .with_socket_timeout(config.timeout);

    let spinner = create_spinner("Reading source", config.progress);
    let listing = ytdlp.enumerate(&locator);
    spinner.finish_and_clear();
    let listing = listing.with_context(|| format!("Failed to read source '{}'", locator))?;

    let entries: Vec<BatchEntry> = listing.into();
    info!("Processing {} item(s) with {} worker(s)", entries.len(), config.workers);

    let pipeline = TrackPipeline::new(
        config.pipeline_config(),
        matcher,
        Box::new(ytdlp.clone()),
        Box::new(ytdlp),
        Box::new(HttpCoverFetcher::new(agent, config.retry)),
    );
    let runner = BatchRunner::new(pipeline, config.workers, config.progress)
        .context("Failed to build worker pool")?;

    let report = runner.run_all(entries);
    print_summary(&report, &config);

    if let Some(path) = &config.report_path {
        report
            .write_to_file(path)
            .with_context(|| format!("Failed to write report to '{}'", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok(())
}
