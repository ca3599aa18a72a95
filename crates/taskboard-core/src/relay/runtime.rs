//! RelayRuntime - Coordinator を 1 本の tokio タスクで回す
//!
//! # 学習ポイント
//! - 所有権ごと Coordinator をタスクに move する（Mutex 不要）
//! - 入力は 1 本の mpsc に集約 → 到着順に直列処理
//! - shutdown は watch チャネル。select! で command と同時に待つ
//! - `call()` は oneshot で結果を返す request/reply 用の口

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::coordinator::Coordinator;
use crate::domain::{ClientId, ClientMessage, ServerMessage};
use crate::error::TransportError;
use crate::ports::{Emitter, IdGenerator};

type Call = Box<dyn FnOnce(&mut Coordinator) + Send>;

enum Command {
    Connect {
        client_id: ClientId,
        outbox: mpsc::UnboundedSender<ServerMessage>,
    },
    Disconnect {
        client_id: ClientId,
    },
    Event {
        client_id: ClientId,
        message: ClientMessage,
    },
    Call(Call),
}

/// Owner of the relay task.
/// - `handle()` をクローンして各接続に配る
/// - `shutdown_and_join()` で停止し、最終状態の Coordinator を取り戻す
pub struct RelayRuntime {
    handle: RelayHandle,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<Coordinator>,
}

impl RelayRuntime {
    pub fn spawn(coordinator: Coordinator) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ids = Arc::clone(coordinator.ids());

        let join = tokio::spawn(relay_loop(coordinator, rx, shutdown_rx));

        Self {
            handle: RelayHandle { commands, ids },
            shutdown_tx,
            join,
        }
    }

    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    pub fn request_shutdown(&self) {
        // ignore send error: the loop may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop the loop and hand back the coordinator (None if the task panicked).
    pub async fn shutdown_and_join(self) -> Option<Coordinator> {
        self.request_shutdown();
        self.join.await.ok()
    }
}

/// Cheap, cloneable access to a running relay.
#[derive(Clone)]
pub struct RelayHandle {
    commands: mpsc::UnboundedSender<Command>,
    ids: Arc<dyn IdGenerator>,
}

impl RelayHandle {
    /// Open a new client session.
    ///
    /// The returned link's `inbound` receives `initialData` first.
    pub fn connect(&self) -> ClientLink {
        let client_id = self.ids.generate_client_id();
        let (outbox, inbound) = mpsc::unbounded_channel();
        let open = self
            .commands
            .send(Command::Connect { client_id, outbox })
            .is_ok();

        ClientLink {
            client_id,
            inbound,
            emitter: LinkEmitter {
                client_id,
                commands: self.commands.clone(),
                open: Arc::new(AtomicBool::new(open)),
            },
        }
    }

    /// Run `f` on the coordinator, in order with every other inbound event.
    ///
    /// # Errors
    /// - `TransportError::Disconnected` if the relay has stopped.
    pub async fn call<R, F>(&self, f: F) -> Result<R, TransportError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Coordinator) -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let call: Call = Box::new(move |coordinator| {
            let _ = tx.send(f(coordinator));
        });
        self.commands
            .send(Command::Call(call))
            .map_err(|_| TransportError::Disconnected)?;
        rx.await.map_err(|_| TransportError::Disconnected)
    }
}

/// One client session attached to an in-process relay.
pub struct ClientLink {
    pub client_id: ClientId,
    pub inbound: mpsc::UnboundedReceiver<ServerMessage>,
    emitter: LinkEmitter,
}

impl ClientLink {
    pub fn emitter(&self) -> LinkEmitter {
        self.emitter.clone()
    }

    /// Split into the emitter (for a `ClientStore`) and the inbound stream.
    pub fn split(self) -> (LinkEmitter, mpsc::UnboundedReceiver<ServerMessage>) {
        (self.emitter, self.inbound)
    }

    pub fn disconnect(&self) {
        self.emitter.disconnect();
    }
}

/// `Emitter` that feeds the relay's command channel directly.
#[derive(Clone)]
pub struct LinkEmitter {
    client_id: ClientId,
    commands: mpsc::UnboundedSender<Command>,
    open: Arc<AtomicBool>,
}

impl LinkEmitter {
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Close the session. Later `emit` calls fail with `Disconnected`.
    pub fn disconnect(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            let _ = self.commands.send(Command::Disconnect {
                client_id: self.client_id,
            });
        }
    }
}

impl Emitter for LinkEmitter {
    fn emit(&self, message: ClientMessage) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::Disconnected);
        }
        self.commands
            .send(Command::Event {
                client_id: self.client_id,
                message,
            })
            .map_err(|_| TransportError::Disconnected)
    }
}

async fn relay_loop(
    mut coordinator: Coordinator,
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Coordinator {
    info!("relay loop started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let command = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            command = commands.recv() => command,
        };

        let Some(command) = command else {
            // every handle is gone
            break;
        };

        match command {
            Command::Connect { client_id, outbox } => coordinator.on_connect(client_id, outbox),
            Command::Disconnect { client_id } => {
                coordinator.on_disconnect(client_id);
            }
            Command::Event { client_id, message } => {
                if coordinator.is_connected(&client_id) {
                    coordinator.handle(client_id, message);
                } else {
                    debug!(client = %client_id, "event from unknown client dropped");
                }
            }
            Command::Call(call) => call(&mut coordinator),
        }
    }
    info!(clients = coordinator.client_count(), "relay loop stopped");
    coordinator
}
