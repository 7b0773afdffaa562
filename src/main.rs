//! rircd - a minimalistic IRC daemon.

use rircd::config::Config;
use rircd::daemon::Daemon;
use rircd::network::Gateway;
use rircd::sinks;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "rircd.toml".to_string());
    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "failed to load config");
        e
    })?;

    info!(hostname = %config.server.hostname, "starting rircd");

    let log_sink = sinks::spawn_logger(config.storage.logdir.clone());
    if let Some(logdir) = &config.storage.logdir {
        info!(logdir = %logdir.display(), "logger initialized");
    }
    let state_sink = sinks::spawn_state_keeper(config.storage.statedir.clone());

    let mut daemon = Daemon::new(
        &config.server.hostname,
        config.motd.file.clone(),
        log_sink,
        state_sink,
    );
    if let Some(statedir) = &config.storage.statedir {
        let restored = sinks::restore_rooms(&mut daemon, statedir).await?;
        info!(rooms = restored, statedir = %statedir.display(), "statekeeper initialized");
    }

    let hostname = daemon.hostname();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    tokio::spawn(daemon.run(events_rx));

    let gateway = Gateway::bind(
        hostname,
        config.listen.address,
        config.tls.as_ref(),
        events_tx,
    )
    .await?;
    gateway.run().await?;

    Ok(())
}
