use std::{sync::Arc, time::Duration};

use clap::{Parser, ValueEnum};
use delayq_core::{DelayqConfig, StorageBackend};
use delayq_scheduler::Scheduler;
use delayq_storage::{FileStorage, SqliteStorage, Storage};
use tokio::sync::watch;
use tracing::{info, warn};

mod jobs;
mod services;

use jobs::{Answer, Deps, EmailJob, Greet};
use services::MockMailer;

#[derive(Debug, Parser)]
#[command(name = "delayq-demo", about = "Schedule a few sample jobs and run them")]
struct Args {
    /// Config file (default: $DELAYQ_CONFIG, then ~/.delayq/delayq.toml)
    #[arg(long)]
    config: Option<String>,

    /// Override the configured storage backend
    #[arg(long, value_enum)]
    backend: Option<Backend>,

    /// Override the configured storage path
    #[arg(long)]
    path: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Sqlite,
    File,
}

impl From<Backend> for StorageBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Sqlite => StorageBackend::Sqlite,
            Backend::File => StorageBackend::File,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "delayq_demo=info,delayq_scheduler=info,delayq_storage=info".into()
            }),
        )
        .init();

    let args = Args::parse();

    // load config: --config > DELAYQ_CONFIG env > ~/.delayq/delayq.toml
    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("DELAYQ_CONFIG").ok());
    let mut config = DelayqConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        DelayqConfig::default()
    });
    if let Some(backend) = args.backend {
        config.storage.backend = backend.into();
    }
    if let Some(path) = args.path {
        config.storage.path = Some(path);
    }

    let storage = open_storage(&config)?;
    let scheduler = Scheduler::with_config(storage, config.scheduler.clone());

    let mailer = Arc::new(MockMailer::default());
    let deps = Deps {
        mailer: mailer.clone(),
    };

    scheduler.schedule_in(
        &mut Greet {
            id: Default::default(),
            message: "Hello".to_string(),
        },
        Duration::from_secs(2),
    )?;
    scheduler.schedule_in(
        &mut Answer {
            id: Default::default(),
            answer: 42,
        },
        Duration::from_secs(1),
    )?;
    scheduler.schedule_in(
        &mut EmailJob {
            id: Default::default(),
            to: "user@example.com".to_string(),
            subject: "Welcome!".to_string(),
            body: "<h1>Hello from the job scheduler!</h1>".to_string(),
        },
        Duration::from_secs(3),
    )?;
    info!(
        pending = scheduler.storage().len()?,
        "sample jobs scheduled; press Ctrl-C to stop"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C: {e}");
            return;
        }
        let _ = shutdown_tx.send(true);
    });

    scheduler.run(deps, shutdown_rx).await?;

    info!(
        emails_sent = mailer.sent().len(),
        pending = scheduler.storage().len()?,
        "demo finished"
    );
    Ok(())
}

fn open_storage(config: &DelayqConfig) -> anyhow::Result<Box<dyn Storage<Deps>>> {
    let registry = Arc::new(jobs::registry());
    let path = config.storage.resolved_path();
    ensure_parent_dir(&path);

    let storage: Box<dyn Storage<Deps>> = match config.storage.backend {
        StorageBackend::Sqlite => {
            info!(%path, table = %config.storage.table_name, "opening SQLite storage");
            Box::new(SqliteStorage::<Deps>::open(
                &path,
                registry,
                &config.storage.table_name,
            )?)
        }
        StorageBackend::File => {
            info!(%path, "using JSON file storage");
            Box::new(FileStorage::<Deps>::new(path, registry))
        }
    };
    Ok(storage)
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), "cannot create storage directory: {e}");
            }
        }
    }
}
