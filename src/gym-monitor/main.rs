use core::time::Duration;
use std::path::PathBuf;

use gmon::{
    config::{MonitorConfig, SourceKind, constants},
    monitor::Monitor,
    record::ExtractionResult,
    retry::{RetryPolicy, TokioSleeper},
    sink::{CsvLayout, CsvLog, JsonSnapshot},
    source::SignalSource,
    util::jst_now,
};

#[derive(clap::Parser)]
#[command(about = "Check the gym occupancy page once and log the result")]
struct Args {
    /// Page to monitor.
    #[arg(long, env = "GYM_MONITOR_URL", default_value = constants::URL)]
    url: String,
    /// How the page state is read.
    #[arg(short, long, value_enum, env = "GYM_MONITOR_SOURCE", default_value_t = SourceKind::Ocr)]
    source: SourceKind,
    #[arg(long, default_value_t = constants::MAX_ATTEMPTS)]
    max_attempts: u32,
    /// Seconds between attempts.
    #[arg(long, default_value_t = constants::RETRY_DELAY.as_secs())]
    retry_delay: u64,
    /// Rounds to wait out a maintenance notice; 1 disables waiting.
    #[arg(long, default_value_t = constants::MAINTENANCE_ATTEMPTS)]
    maintenance_attempts: u32,
    #[arg(long, default_value_t = constants::MAINTENANCE_DELAY.as_secs())]
    maintenance_delay: u64,
    /// Seconds to let scripts run before the screenshot.
    #[arg(long, default_value_t = constants::SETTLE.as_secs())]
    settle: u64,
    #[arg(long, default_value_t = constants::LOAD_TIMEOUT.as_secs())]
    load_timeout: u64,
    /// Characters of page text searched for wording.
    #[arg(long, default_value_t = constants::WINDOW_SIZE)]
    window_size: usize,
    /// Show the browser window.
    #[arg(long)]
    headful: bool,
    #[arg(long, env = "GYM_MONITOR_CSV", default_value = constants::CSV_PATH)]
    csv: PathBuf,
    #[arg(long, env = "GYM_MONITOR_JSON", default_value = constants::JSON_PATH)]
    json: PathBuf,
}

impl Args {
    fn into_config(self) -> MonitorConfig {
        let mut cfg = MonitorConfig {
            url: self.url,
            source: self.source,
            retry: RetryPolicy::new(self.max_attempts, Duration::from_secs(self.retry_delay)),
            maintenance_retry: RetryPolicy::new(
                self.maintenance_attempts,
                Duration::from_secs(self.maintenance_delay),
            ),
            settle: Duration::from_secs(self.settle),
            load_timeout: Duration::from_secs(self.load_timeout),
            headless: !self.headful,
            csv_path: self.csv,
            json_path: self.json,
            ..MonitorConfig::default()
        };
        cfg.classifier.window_size = self.window_size;
        cfg
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    pretty_env_logger::init_timed();

    let cfg = Args::parse().into_config();
    tracing::info!(target: "monitor", "starting gym occupancy monitoring ({:?} source) ...", cfg.source);

    let csv = CsvLog::new(cfg.csv_path.clone(), CsvLayout::for_source(cfg.source));
    let snapshot = JsonSnapshot::new(cfg.json_path.clone());

    let result = match SignalSource::from_config(&cfg) {
        Ok(source) => Monitor::new(cfg, source, TokioSleeper).run_once().await,
        Err(e) => {
            tracing::error!(target: "monitor", "\x1b[31msource setup failed\x1b[0m: {e}");
            ExtractionResult::failed(e.to_string(), jst_now())
        }
    };

    csv.append(&result)?;
    snapshot.write(&result)?;

    println!("{}", result.summary());
    Ok(())
}
