//! tpanel-gw - AMX NetLinx touch panel emulator core
//!
//! Loads the panel configuration and project, runs the page manager on its
//! runtime task and feeds it from the REPL and the config watcher.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

use tpanel_gw::cli;
use tpanel_gw::config::{ConfigWatcher, LoggingConfig};
use tpanel_gw::link::ChannelLink;
use tpanel_gw::manager::PageManager;
use tpanel_gw::project::ProjectResources;
use tpanel_gw::runtime::PanelRuntime;
use tpanel_gw::surface::LoggingSurface;

/// Handle used to swap the log filter at runtime
type LogReload = reload::Handle<EnvFilter, Registry>;

/// tpanel-gw - AMX NetLinx touch panel emulator core
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Project file, overrides `project.path` of the configuration
    #[arg(short, long, env = "TPANEL_PROJECT")]
    project: Option<String>,

    /// Start the interactive command prompt
    #[arg(long)]
    repl: bool,

    /// Port used for commands typed at the prompt
    #[arg(long, default_value = "1")]
    repl_port: u16,

    /// Load configuration and project, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    // Load configuration with hot-reload watcher
    let (mut config_watcher, initial_config) = ConfigWatcher::new(args.config.clone()).await?;
    let mut config = (*initial_config).clone();

    // Initialize logging
    let (log_reload, _log_guard) = init_logging(&args.log_level, config.logging.as_ref())?;

    info!("Starting tpanel-gw v{}...", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let project_path = args.project.clone().unwrap_or_else(|| config.project.path.clone());
    let resources = ProjectResources::load(&project_path)
        .with_context(|| format!("Failed to load project: {}", project_path))?;
    info!(
        "Project '{}' ready, power-up page {:?}",
        resources.project().name,
        resources.project().power_up_page
    );

    if args.check {
        info!("✅ Configuration and project are valid");
        return Ok(());
    }

    // Controller link: outbound commands are printed
    let (link, mut outbound) = ChannelLink::new();
    tokio::spawn(async move {
        while let Some(command) = outbound.recv().await {
            cli::print_outbound(&command);
        }
        debug!("Outbound printer stopped");
    });

    let mut manager = PageManager::new(
        Arc::new(resources),
        Arc::new(link),
        Arc::new(LoggingSurface),
        config.settings.clone(),
    );
    manager.start().context("Failed to show the power-up page")?;

    let (panel, mut panel_task) = PanelRuntime::spawn(manager);
    let mut panel_settings = panel.subscribe_settings();
    let mut log_level = config.settings.log_level.clone();
    info!("Panel runtime initialized");

    let repl = if args.repl {
        let panel = panel.clone();
        let port = args.repl_port;
        Some(tokio::spawn(async move { cli::run_repl(panel, port).await }))
    } else {
        None
    };
    let repl_done = async {
        match repl {
            Some(task) => match task.await {
                Ok(Ok(())) => info!("REPL closed"),
                Ok(Err(e)) => warn!("⚠️ REPL failed: {:#}", e),
                Err(e) => warn!("⚠️ REPL task failed: {}", e),
            },
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(repl_done);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut stopping = false;

    // Main event loop
    let manager = loop {
        tokio::select! {
            result = &mut panel_task => {
                break result.context("Panel runtime task failed")?;
            }

            // Handle config reload
            Some(new_config) = config_watcher.next_config() => {
                info!("📝 Configuration file changed, applying settings...");
                if new_config.settings.log_level != log_level {
                    log_level = new_config.settings.log_level.clone();
                    set_log_level(&log_reload, &log_level);
                }
                panel.update_settings(new_config.settings.clone());
                config = new_config;
            }

            // Log level picked on the setup page
            Ok(()) = panel_settings.changed() => {
                let level = panel_settings.borrow_and_update().log_level.clone();
                if level != log_level {
                    set_log_level(&log_reload, &level);
                    log_level = level;
                }
            }

            _ = &mut repl_done, if !stopping => {
                stopping = true;
                panel.shutdown();
            }

            // Handle shutdown signal
            _ = &mut shutdown, if !stopping => {
                info!("Shutdown signal received, stopping panel");
                stopping = true;
                panel.shutdown();
            }
        }
    };

    // Settings changed from the system pages are written back
    if manager.settings() != &config.settings {
        config.settings = manager.settings().clone();
        config
            .save(&args.config)
            .await
            .context("Failed to save panel settings")?;
        info!("💾 Panel settings saved to {}", args.config);
    }

    info!("tpanel-gw shutdown complete");
    Ok(())
}

fn init_logging(
    level: &str,
    logging: Option<&LoggingConfig>,
) -> Result<(LogReload, Option<WorkerGuard>)> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let (filter, reload_handle) = reload::Layer::new(filter);

    let (file_layer, guard) = match logging.and_then(|l| l.directory.as_ref().map(|d| (d, l))) {
        Some((directory, logging)) => {
            let appender = tracing_appender::rolling::daily(directory, &logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok((reload_handle, guard))
}

fn set_log_level(reload: &LogReload, level: &str) {
    match reload.modify(|filter| *filter = EnvFilter::new(level)) {
        Ok(()) => info!("Log level set to {}", level),
        Err(e) => warn!("⚠️ Failed to change log level: {}", e),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("⚠️ Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
