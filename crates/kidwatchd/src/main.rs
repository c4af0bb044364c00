//! kidwatchd - The kidwatch background service
//!
//! This is the main entry point for the kidwatch service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization
//! - Monitor engine
//! - Periodic enforcement loop, or a single one-shot command

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kidwatch_api::{AppUsage, LocationUpdate};
use kidwatch_config::load_config;
use kidwatch_core::{CoreEvent, MonitorEngine};
use kidwatch_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use kidwatch_util::{
    default_config_path, format_datetime_full, ChildId, DATABASE_FILENAME, KIDWATCH_DATA_DIR_ENV,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// kidwatchd - Parental-control enforcement service
#[derive(Parser, Debug)]
#[command(name = "kidwatchd", version)]
#[command(about = "Parental-control enforcement service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/kidwatch/config.toml)
    #[arg(short, long, global = true, env = "KIDWATCH_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set KIDWATCH_DATA_DIR env var)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level, used when RUST_LOG is unset
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the enforcement loop until SIGTERM or SIGINT (default)
    Run,

    /// Print the device status of a child as JSON
    Status { child: String },

    /// Report a location and print any geofence transitions
    Locate {
        child: String,

        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Accuracy radius in meters
        #[arg(long)]
        accuracy: Option<f64>,
    },

    /// Add minutes of app usage to today's total
    Usage {
        child: String,
        app: String,
        minutes: u32,

        #[arg(long)]
        category: Option<String>,
    },

    /// Lock a child's device for the rest of the day
    Pause { child: String },

    /// Clear today's parent pause
    Resume { child: String },

    /// List a child's notifications, newest first
    Notifications {
        child: String,

        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

/// Main service state
struct Service {
    engine: Arc<MonitorEngine>,
    store: Arc<dyn Store>,
    config_path: PathBuf,
    tick_interval: Duration,
}

impl Service {
    fn new(args: &Args) -> Result<Self> {
        // Load configuration
        let policy = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            child_count = policy.children.len(),
            "Configuration loaded"
        );

        // Flag, then environment, then config file
        let data_dir = args
            .data_dir
            .clone()
            .or_else(|| std::env::var_os(KIDWATCH_DATA_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| policy.service.data_dir.clone());

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(DATABASE_FILENAME);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        debug!(db_path = %db_path.display(), "Store initialized");

        let tick_interval = policy.service.tick_interval;
        let engine = Arc::new(MonitorEngine::new(policy, store.clone()));

        Ok(Self {
            engine,
            store,
            config_path: args.config.clone(),
            tick_interval,
        })
    }

    async fn run(self) -> Result<()> {
        self.store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        // Set up signal handlers
        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup())
            .context("Failed to create SIGHUP handler")?;

        let mut tick_timer = tokio::time::interval(self.tick_interval);

        info!(
            tick_interval_secs = self.tick_interval.as_secs(),
            "Service running"
        );

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                // SIGHUP re-reads the config file
                _ = sighup.recv() => {
                    self.reload();
                }

                _ = tick_timer.tick() => {
                    let engine = self.engine.clone();
                    let now = kidwatch_util::now();
                    let events = tokio::task::spawn_blocking(move || engine.tick(now))
                        .await
                        .context("Enforcement tick panicked")?;

                    for event in events {
                        Self::handle_core_event(&event);
                    }
                }
            }
        }

        info!("Shutting down kidwatchd");

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }

    fn reload(&self) {
        match load_config(&self.config_path) {
            Ok(policy) => {
                if let Err(e) = self.engine.reload_policy(policy) {
                    warn!(error = %e, "Failed to apply reloaded configuration");
                }
            }
            Err(e) => {
                warn!(
                    config_path = %self.config_path.display(),
                    error = %e,
                    "Config reload failed; keeping current policy"
                );
            }
        }
    }

    fn handle_core_event(event: &CoreEvent) {
        match event {
            CoreEvent::DeviceLocked { child_id, reason } => {
                debug!(child_id = %child_id, reason = reason.as_str(), "Lock event delivered");
            }
            CoreEvent::DeviceUnlocked { child_id } => {
                debug!(child_id = %child_id, "Unlock event delivered");
            }
            CoreEvent::ScreenTimeWarning {
                child_id,
                remaining_minutes,
                ..
            } => {
                debug!(child_id = %child_id, remaining_minutes, "Warning delivered");
            }
            CoreEvent::PolicyReloaded { child_count } => {
                debug!(child_count, "Policy reload delivered");
            }
        }
    }

    async fn execute(self, command: Command) -> Result<()> {
        let now = kidwatch_util::now();

        match command {
            Command::Run => return self.run().await,

            Command::Status { child } => {
                let status = self.engine.device_status(&ChildId::new(child), now);
                println!("{}", serde_json::to_string_pretty(&status)?);
            }

            Command::Locate {
                child,
                lat,
                lon,
                accuracy,
            } => {
                let update = LocationUpdate {
                    latitude: lat,
                    longitude: lon,
                    accuracy,
                };
                let events = self
                    .engine
                    .report_location(&ChildId::new(child), &update, now)
                    .context("Location report failed")?;
                println!("{}", serde_json::to_string_pretty(&events)?);
            }

            Command::Usage {
                child,
                app,
                minutes,
                category,
            } => {
                let usage = AppUsage {
                    name: app,
                    minutes,
                    category,
                };
                let snapshot = self
                    .engine
                    .record_usage(&ChildId::new(child), usage, now)
                    .context("Failed to record usage")?;
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }

            Command::Pause { child } => {
                let child_id = ChildId::new(child);
                self.engine
                    .set_paused(&child_id, true, now)
                    .context("Failed to pause")?;
                println!("Paused {} for today", child_id);
            }

            Command::Resume { child } => {
                let child_id = ChildId::new(child);
                self.engine
                    .set_paused(&child_id, false, now)
                    .context("Failed to resume")?;
                println!("Resumed {}", child_id);
            }

            Command::Notifications { child, limit } => {
                let child_id = ChildId::new(child);
                let notifications = self
                    .engine
                    .notifications(&child_id, limit)
                    .context("Failed to read notifications")?;
                let name = self
                    .engine
                    .child_name(&child_id)
                    .unwrap_or_else(|| child_id.to_string());

                if notifications.is_empty() {
                    println!("No notifications for {}", name);
                }
                for notification in &notifications {
                    println!(
                        "{}  {}",
                        format_datetime_full(&notification.timestamp),
                        notification.message(&name)
                    );
                }
            }
        }

        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if kidwatch_util::is_mock_time_active() {
        warn!("Mock time is active; all evaluations use the mocked clock");
    }

    debug!(version = env!("CARGO_PKG_VERSION"), "kidwatchd starting");

    let service = Service::new(&args)?;
    service.execute(args.command.unwrap_or(Command::Run)).await
}
