//! Mediaroom simulation binary.
//!
//! Runs a full session (initialize, join, publish, remote peers joining and
//! leaving, teardown) against the in-memory SDK and logs the snapshots a
//! mounted state container observes.
//!
//! # Usage
//!
//! ```bash
//! MEDIAROOM_APP_ID=demo mediaroom-sim --room lobby --uid 7 --peers 3
//! mediaroom-sim --app-id demo --log-level debug
//! ```

use clap::Parser;
use mediaroom_app::StateContainer;
use mediaroom_core::{SessionClient, SessionConfig};
use mediaroom_harness::{SimSdk, peer_ids, pump_pending};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Mediaroom session simulator
#[derive(Parser, Debug)]
#[command(name = "mediaroom-sim")]
#[command(about = "Drive a mediaroom session against an in-memory SDK")]
#[command(version)]
struct Args {
    /// Room to join
    #[arg(short, long, default_value = "lobby")]
    room: String,

    /// Local participant ID
    #[arg(short, long, default_value = "1")]
    uid: u64,

    /// Number of simulated remote peers
    #[arg(short, long, default_value = "2")]
    peers: u64,

    /// Application identifier (overrides MEDIAROOM_APP_ID)
    #[arg(long)]
    app_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = match args.app_id {
        Some(app_id) => SessionConfig::new(app_id),
        None => SessionConfig::from_env()?,
    };

    let sdk = SimSdk::new();
    let sdk_handle = sdk.handle();
    let mut client = SessionClient::new(sdk, config);

    let mut container = StateContainer::new();
    container.attach(&client);
    let mut ctx = container.context();
    let watcher = tokio::spawn(async move {
        while let Some(snapshot) = ctx.changed().await {
            tracing::info!(
                phase = %snapshot.phase(),
                local = ?snapshot.local_track,
                remote = snapshot.remote_tracks.len(),
                "ui snapshot"
            );
        }
    });

    client.start_session(args.uid, &args.room).await?;

    let peers = peer_ids(args.uid, args.peers);
    if peers.len() as u64 != args.peers {
        tracing::warn!(
            requested = args.peers,
            simulated = peers.len(),
            "peer IDs past u64::MAX skipped"
        );
    }
    for &peer in &peers {
        sdk_handle.peer_joins(peer);
    }
    let applied = pump_pending(&mut client).await;
    tracing::info!(applied, remote = client.state().remote_tracks.len(), "peers subscribed");

    if let Some(&first) = peers.first() {
        sdk_handle.peer_leaves(first);
        pump_pending(&mut client).await;
    }

    client.stop_session().await?;
    tokio::task::yield_now().await;

    container.detach();
    drop(container);
    let _ = watcher.await;

    tracing::info!(calls = sdk_handle.calls().len(), "session finished");
    Ok(())
}
