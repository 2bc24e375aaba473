use boundary_fetch::config::{CityLevel, FetchSettings, GranularityConfig, NamingMode, ProvinceLevel};
use boundary_fetch::constants::*;
use boundary_fetch::downloader::VariantDownloader;
use boundary_fetch::errors::{AppError, AppResult};
use boundary_fetch::fetcher::{Fetcher, RetryPolicy};
use boundary_fetch::layout::OutputLayout;
use boundary_fetch::logging::{log, setup_logging, LogLevel};
use boundary_fetch::orchestrator::Orchestrator;
use boundary_fetch::persist::InFlightSlot;
use boundary_fetch::progress::ConsoleProgress;

use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Download China administrative boundary GeoJSON into a directory tree", long_about = None)]
struct CliArgs {
    /// Output root directory.
    #[arg(short, long, default_value = OUT_DIR)]
    output: PathBuf,

    /// Sub-boundary detail embedded at province level.
    #[arg(long, value_enum, default_value = "city")]
    province_level: ProvinceLevel,

    /// Sub-boundary detail embedded at city level.
    #[arg(long, value_enum, default_value = "county")]
    city_level: CityLevel,

    /// Store municipality districts under the city directory.
    #[arg(long)]
    municipality_children_to_city: bool,

    /// Province codes to download, in order (default: all).
    #[arg(short, long, value_delimiter = ',', value_name = "CODE")]
    provinces: Vec<String>,

    /// File naming: administrative code or Chinese name.
    #[arg(short, long, value_enum, default_value = "code")]
    naming: NamingMode,

    #[arg(long, default_value = BASE_URL)]
    base_url: String,

    /// Attempts per request, including the first.
    #[arg(long, default_value_t = MAX_RETRIES)]
    retries: u32,

    /// Base backoff between attempts; grows linearly.
    #[arg(long, default_value_t = BACKOFF_BASE_MS)]
    backoff_ms: u64,

    /// Pause after every successful base download.
    #[arg(long, default_value_t = POST_DOWNLOAD_DELAY_MS)]
    delay_ms: u64,

    #[arg(short, long)]
    verbose: bool,
}

impl CliArgs {
    fn granularity(&self) -> GranularityConfig {
        GranularityConfig {
            province_level: self.province_level,
            city_level: self.city_level,
            municipality_children_go_to_city_bucket: self.municipality_children_to_city,
            selected_provinces: self.provinces.clone(),
            naming_mode: self.naming,
        }
    }

    fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            base_url: self.base_url.clone(),
            retry: RetryPolicy::new(self.retries, Duration::from_millis(self.backoff_ms)),
            post_download_delay: Duration::from_millis(self.delay_ms),
        }
    }
}

const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();
    setup_logging(cli.verbose);

    match main_async(cli).await {
        Ok(code) => {
            log(LogLevel::Info, &format!("Exiting with code {}.", code));
            ExitCode::from(code)
        }
        Err(e) => {
            log(LogLevel::Error, &format!("FATAL ERROR: {}", e));
            ExitCode::FAILURE
        }
    }
}

async fn main_async(cli: CliArgs) -> AppResult<u8> {
    let start_ts = Utc::now().format("%Y-%m-%d %H:%M:%S %Z").to_string();
    log(
        LogLevel::Step,
        &format!("Boundary download started at {}", start_ts),
    );

    let config = cli.granularity();
    let settings = cli.fetch_settings();
    let layout = OutputLayout::new(&cli.output, config.naming_mode);
    layout.ensure_dirs().await?;
    log(
        LogLevel::Info,
        &format!("Output directory: {}", layout.root().display()),
    );

    let slot = InFlightSlot::new();
    let fetcher = Fetcher::new(&settings.base_url, settings.retry.clone())?;
    let downloader = VariantDownloader::new(fetcher, slot.clone(), settings.post_download_delay);
    let mut orchestrator = Orchestrator::new(downloader, layout, config, Box::new(ConsoleProgress::new()));
    let cancel = orchestrator.cancel_flag();

    let summary = tokio::select! {
        res = orchestrator.run() => res?,
        _ = tokio::signal::ctrl_c() => {
            cancel.store(true, Ordering::SeqCst);
            if let Some(path) = slot.discard() {
                log(
                    LogLevel::Warning,
                    &format!("Removed partial file {}", path.display()),
                );
            }
            log(LogLevel::Warning, &AppError::Cancelled.to_string());
            return Ok(EXIT_INTERRUPTED);
        }
    };

    summary.print();
    if summary.failed() == 0 {
        log(LogLevel::Success, "All boundary files downloaded.");
    } else {
        log(
            LogLevel::Warning,
            &format!(
                "Run completed with {} of {} downloads failed.",
                summary.failed(),
                summary.attempted
            ),
        );
    }

    let end_ts = Utc::now().format("%Y-%m-%d %H:%M:%S %Z").to_string();
    log(LogLevel::Step, &format!("--- Finished at {} ---", end_ts));
    Ok(0)
}
