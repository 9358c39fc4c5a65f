use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use crossterm::event::KeyEventKind;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn};

use hostwatch::app::App;
use hostwatch::config::{self, Config, ExporterKind};
use hostwatch::event::{Event, EventHandler};
use hostwatch::logging::{self, LogFormat};
use hostwatch::metrics::{Pump, SnapshotStore, SysinfoCollector};
use hostwatch::telemetry::{self, ExportSink, JsonLinesExporter, LogExporter};
use hostwatch::ui;

#[derive(Parser)]
#[command(
    name = "hostwatch",
    about = "Terminal host monitor backed by a bounded metrics history"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refresh rate in milliseconds
    #[arg(long)]
    refresh_rate: Option<u64>,

    /// Maximum number of snapshots kept in history
    #[arg(long)]
    buffer_cap: Option<usize>,

    /// History retention in seconds
    #[arg(long)]
    retention: Option<u64>,

    /// Disable the telemetry exporter
    #[arg(long, default_value_t = false)]
    no_telemetry: bool,

    /// Export snapshots and cycle spans as JSON lines to this file
    #[arg(long)]
    export_jsonl: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Collect a couple of samples, print the latest as JSON and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let log_path = cli.log_file.clone().unwrap_or_else(logging::default_log_path);
    logging::init(&log_path, &cli.log_level, cli.log_format)?;

    let config = load_config_for_cli(&cli);
    let (settings, policy) = config.pipeline()?;
    info!(
        refresh_ms = config.general.refresh_rate_ms,
        buffer_cap = policy.buffer_cap,
        retention_secs = policy.retention.as_secs(),
        "starting hostwatch"
    );

    let store = Arc::new(SnapshotStore::with_policy(&policy));
    let (sink, exporter_task) = start_exporter(&config)?;

    let collector = SysinfoCollector::new();
    let mut pump = Pump::new(Box::new(collector), Arc::clone(&store), settings, policy)
        .with_sink(sink)
        .with_span(info_span!("pump"));
    pump.start()?;

    let result = if cli.once {
        run_once(&pump, settings.refresh_interval, settings.collection_timeout).await
    } else {
        run_interactive(&config, Arc::clone(&store)).await
    };

    pump.stop().await;
    let stats = pump.stats();
    info!(
        cycles = stats.cycles(),
        collections = stats.collections(),
        failures = stats.failures(),
        overruns = stats.overruns(),
        "pump stopped"
    );
    // The dispatcher exits once the last sink clone is gone.
    drop(pump);
    if let Some(task) = exporter_task
        && let Err(e) = task.await
    {
        warn!(error = %e, "exporter task failed");
    }

    result
}

fn load_config_for_cli(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => config::load_config_from_path(path),
        None => config::load_config(),
    };

    if let Some(rate) = cli.refresh_rate {
        config.general.refresh_rate_ms = rate;
    }
    if let Some(cap) = cli.buffer_cap {
        config.history.buffer_cap = cap;
    }
    if let Some(retention) = cli.retention {
        config.history.retention_secs = retention;
    }
    if cli.no_telemetry {
        config.telemetry.enabled = false;
    }
    if let Some(path) = &cli.export_jsonl {
        config.telemetry.enabled = true;
        config.telemetry.exporter = ExporterKind::Jsonl;
        config.telemetry.output_path = Some(path.clone());
    }

    config
}

fn start_exporter(config: &Config) -> Result<(ExportSink, Option<JoinHandle<()>>)> {
    let export = &config.telemetry;
    if !export.enabled {
        return Ok((ExportSink::disabled(), None));
    }
    let (sink, task) = match export.exporter {
        ExporterKind::Log => {
            telemetry::spawn_exporter(LogExporter::new(), export.queue_capacity)
        }
        ExporterKind::Jsonl => {
            let path = export
                .output_path
                .clone()
                .unwrap_or_else(default_export_path);
            info!(path = %path.display(), "exporting snapshots as JSON lines");
            let exporter = JsonLinesExporter::create(&path)?;
            telemetry::spawn_exporter(exporter, export.queue_capacity)
        }
    };
    Ok((sink, Some(task)))
}

fn default_export_path() -> PathBuf {
    logging::default_log_path().with_file_name("metrics.jsonl")
}

async fn run_once(pump: &Pump, refresh: Duration, timeout: Duration) -> Result<()> {
    // Two samples so CPU usage has a baseline.
    let deadline = Instant::now() + refresh * 2 + timeout;
    let stats = pump.stats();
    while stats.collections() < 2 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let latest = pump.store().latest();
    if latest.is_empty() {
        return Err(eyre!("no snapshot collected within {:?}", refresh * 2 + timeout));
    }
    println!("{}", serde_json::to_string_pretty(&latest)?);
    Ok(())
}

async fn run_interactive(config: &Config, store: Arc<SnapshotStore>) -> Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let result = run(&mut terminal, config, store).await;
    ratatui::restore();
    result
}

async fn run(
    terminal: &mut ratatui::DefaultTerminal,
    config: &Config,
    store: Arc<SnapshotStore>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(config.general.refresh_rate_ms);
    let mut app = App::new(config, store);
    let mut events = EventHandler::new(tick_rate);

    terminal.draw(|frame| ui::draw(frame, &app))?;

    while app.running {
        let Some(event) = events.next().await else {
            break;
        };
        let should_draw = match event {
            Event::Key(key) => {
                if key.kind == KeyEventKind::Press {
                    let action = app.map_key(key);
                    app.dispatch(action);
                    true
                } else {
                    false
                }
            }
            Event::Tick => {
                app.refresh_data();
                true
            }
            Event::Resize => true,
        };
        if should_draw {
            terminal.draw(|frame| ui::draw(frame, &app))?;
        }
    }

    Ok(())
}
