//! taskboard - relay server and local demo

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Days, Utc};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::info;

use taskboard_core::domain::{MemberId, Priority, ServerMessage, Status};
use taskboard_core::ports::{IdGenerator, SystemClock, TimestampIdGenerator};
use taskboard_core::relay::{self, LinkEmitter};
use taskboard_core::{
    BoardConfig, BoardState, ClientStore, Coordinator, RelayRuntime, logging, seed,
};

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(about = "Replicated team task board", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay over TCP (newline-delimited JSON)
    Serve,

    /// Two in-process clients editing the same board
    Demo,

    /// Print the seeded snapshot as JSON
    Snapshot,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = BoardConfig::load(cli.config.as_deref()).context("loading config")?;
    logging::init(&config.logging, cli.verbose);

    match cli.command {
        Commands::Serve => serve(config).await?,
        Commands::Demo => demo(config).await?,
        Commands::Snapshot => {
            let state = seed::board(config.relay.seed_sample_tasks);
            println!("{}", serde_json::to_string_pretty(&state.snapshot())?);
        }
    }

    Ok(())
}

fn coordinator(config: &BoardConfig, ids: Arc<dyn IdGenerator>) -> Coordinator {
    Coordinator::new(seed::board(config.relay.seed_sample_tasks), ids)
        .with_snapshot_policy(config.relay.snapshot_policy)
}

async fn serve(config: BoardConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let ids: Arc<dyn IdGenerator> = Arc::new(TimestampIdGenerator::new(SystemClock));
    let relay = RelayRuntime::spawn(coordinator(&config, ids));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    let (stop_tx, stop_rx) = watch::channel(false);
    let server = tokio::spawn(relay::serve(listener, relay.handle(), stop_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    let _ = stop_tx.send(true);
    server.await??;

    if let Some(coordinator) = relay.shutdown_and_join().await {
        info!(tasks = coordinator.state().task_count(), "relay stopped");
    }
    Ok(())
}

/// Alice creates a task and hands it to Bob; both move its due date.
/// The relay processes Bob's edit last, so everyone ends on Bob's date.
async fn demo(config: BoardConfig) -> anyhow::Result<()> {
    let ids: Arc<dyn IdGenerator> = Arc::new(TimestampIdGenerator::new(SystemClock));
    let relay = RelayRuntime::spawn(coordinator(&config, Arc::clone(&ids)));
    let handle = relay.handle();

    let (alice_tx, mut alice_rx) = handle.connect().split();
    let (bob_tx, mut bob_rx) = handle.connect().split();
    let mut alice = ClientStore::new(BoardState::empty(), alice_tx, Arc::clone(&ids));
    let mut bob = ClientStore::new(BoardState::empty(), bob_tx, Arc::clone(&ids));
    settle(&handle, &mut alice, &mut alice_rx).await?;
    settle(&handle, &mut bob, &mut bob_rx).await?;

    let today = Utc::now().date_naive();
    let created = alice.create_task(
        "Write spec",
        Some("Describe the sync protocol".to_string()),
        Priority::Medium,
        today,
    )?;
    let task_id = created.task.id.clone();
    alice.assign(&task_id, MemberId::new("bob"), Some("card-x".to_string()));
    settle(&handle, &mut bob, &mut bob_rx).await?;

    bob.update_status(&task_id, Status::InProgress);
    alice.update_due_date(&task_id, today + Days::new(7));
    bob.update_due_date(&task_id, today + Days::new(14));
    settle(&handle, &mut alice, &mut alice_rx).await?;
    settle(&handle, &mut bob, &mut bob_rx).await?;

    let canonical = handle
        .call({
            let task_id = task_id.clone();
            move |c| c.state().task(&task_id).cloned()
        })
        .await?;

    println!("canonical: {}", serde_json::to_string_pretty(&canonical)?);
    for (who, store) in [("alice", &alice), ("bob", &bob)] {
        println!("--- {who} (revision {}) ---", store.revision());
        for row in store.task_list() {
            println!(
                "{:<24} {:<8} {:<12} {} {}",
                row.name,
                row.priority.as_str(),
                row.status_label,
                row.due_date,
                row.assignee.as_deref().unwrap_or("-"),
            );
        }
    }
    let converged = [&alice, &bob]
        .iter()
        .all(|store| store.task(&task_id) == canonical.as_ref());
    println!("converged: {converged}");

    relay.shutdown_and_join().await;
    Ok(())
}

/// Wait until the relay has processed everything sent so far, then apply
/// whatever it broadcast to `store`.
async fn settle(
    handle: &relay::RelayHandle,
    store: &mut ClientStore<LinkEmitter>,
    inbound: &mut mpsc::UnboundedReceiver<ServerMessage>,
) -> anyhow::Result<()> {
    handle.call(|_| ()).await?;
    while let Ok(message) = inbound.try_recv() {
        store.apply_server_message(message);
    }
    Ok(())
}
