//! Relay server binary.
//!
//! Opens the event database, starts the writer thread and imports events
//! from standard input, printing one `OK` frame per event to standard
//! output. Stops at end of input or on SIGTERM/SIGINT, after the writer has
//! flushed every queued event.

use relay_db::{create_pool, run_migrations, DbRuntimeSettings, SqliteEventStore};
use relay_server::config::load_config;
use relay_server::import::{import_lines, IMPORT_CONN};
use relay_server::{init_tracing, ConnectionRegistry, ServerError};
use relay_writer::spawn_writer;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

/// Outbound frames buffered for the import connection before acks are
/// dropped.
const IMPORT_ACK_BUFFER: usize = 65_536;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("RELAY_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().unwrap_or("config.toml");

    let config = load_config(Some(selected_config_path))?;
    init_tracing(&config.logging);

    tracing::info!(
        source = config_source,
        path = selected_config_path,
        "resolved startup configuration path"
    );

    let pool = create_pool(
        &config.database.path,
        DbRuntimeSettings {
            busy_timeout_ms: config.database.busy_timeout_ms,
            pool_max_size: config.database.pool_max_size,
        },
    )?;

    {
        let conn = pool.get()?;
        let applied = run_migrations(&conn)?;
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    let store = SqliteEventStore::from_pool(&pool)?;
    let policy = relay_policy::from_plugin_command(config.policy.plugin.as_deref());
    let registry = ConnectionRegistry::new();
    let (inbox_tx, inbox) = relay_writer::inbox();
    let writer = spawn_writer(store, policy, registry.clone(), inbox)?;

    let acks = registry.register(IMPORT_CONN, IMPORT_ACK_BUFFER);
    let printer = tokio::spawn(print_frames(acks));

    tracing::info!(db = %config.database.path, "importing events from stdin");

    let reader = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = import_lines(reader, &inbox_tx) => {
            let stats = result?;
            tracing::info!(
                submitted = stats.submitted,
                invalid = stats.invalid,
                "end of input"
            );
        }
        () = shutdown_signal() => {}
    }

    // The writer finishes the queued events once every sender is gone.
    drop(inbox_tx);
    tokio::task::spawn_blocking(move || writer.join())
        .await
        .map_err(|_| ServerError::WriterPanicked)?
        .map_err(|_| ServerError::WriterPanicked)?;

    registry.unregister(IMPORT_CONN);
    if let Err(e) = printer.await {
        tracing::error!("acknowledgement printer failed: {}", e);
    }

    tracing::info!("relay server shut down");
    Ok(())
}

/// Writes each frame to stdout on its own line until the queue closes.
async fn print_frames(mut frames: mpsc::Receiver<String>) {
    let mut stdout = tokio::io::stdout();
    while let Some(frame) = frames.recv().await {
        let line = format!("{frame}\n");
        if let Err(e) = stdout.write_all(line.as_bytes()).await {
            tracing::error!("failed to write acknowledgement: {}", e);
            return;
        }
    }
    if let Err(e) = stdout.flush().await {
        tracing::error!("failed to flush stdout: {}", e);
    }
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
