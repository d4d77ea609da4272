//! WebSocket driver for the broker session.
//!
//! Thin I/O layer that executes the actions produced by the state machines
//! and feeds transport events back in. Protocol behavior (subscription
//! dedup, deferred flush, unseen routing) lives entirely in the sans-io
//! [`Coordinator`]; this module only owns the socket.
//!
//! The driver is one tokio task per session: it provisions the directory and
//! snapshot through the [`SeenLedger`], then loops a fixed-delay reconnect
//! around the socket. Commands from the host and notifications to the UI
//! travel over bounded mpsc channels, so every state mutation happens on
//! this single task.

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{net::TcpStream, sync::mpsc, task::AbortHandle};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message,
};

use carelink_proto::{ChatId, ChatInfo, Destination, Envelope, InboundMessage, UserId};

use crate::{
    coordinator::{Coordinator, CoordinatorAction},
    error::TransportError,
    ledger::SeenLedger,
    session::{ConnectionStatus, SessionConfig, SocketAction},
};

/// Commands the host application sends into the driver.
#[derive(Debug)]
pub enum Command {
    /// Replace the chat directory after a refetch; new chats are subscribed,
    /// existing subscriptions are untouched.
    RefreshDirectory(Vec<ChatInfo>),

    /// Optimistically zero a chat and push the mark-seen acknowledgement.
    MarkSeen(ChatId),

    /// Publish a body to a destination, fire-and-forget.
    Publish {
        /// Destination to publish to.
        destination: Destination,
        /// Opaque payload.
        body: String,
    },

    /// Tear the session down. Ends the driver task.
    Dispose,
}

/// Handle to a running broker channel.
///
/// Dropping the command sender (or sending [`Command::Dispose`]) ends the
/// driver task after a clean teardown; `stop` aborts it outright.
pub struct ConnectedChannel {
    /// Commands into the driver.
    pub commands: mpsc::Sender<Command>,
    /// New-message notifications for the UI (toast).
    pub notifications: mpsc::Receiver<InboundMessage>,
    abort_handle: AbortHandle,
}

impl ConnectedChannel {
    /// Replace the chat directory after a refetch.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ChannelClosed` if the driver is gone.
    pub async fn refresh_directory(&self, chats: Vec<ChatInfo>) -> Result<(), TransportError> {
        self.commands
            .send(Command::RefreshDirectory(chats))
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Mark a chat as seen.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ChannelClosed` if the driver is gone.
    pub async fn mark_seen(&self, chat_id: ChatId) -> Result<(), TransportError> {
        self.commands
            .send(Command::MarkSeen(chat_id))
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Tear the session down cleanly.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ChannelClosed` if the driver is gone.
    pub async fn dispose(&self) -> Result<(), TransportError> {
        self.commands.send(Command::Dispose).await.map_err(|_| TransportError::ChannelClosed)
    }

    /// Abort the driver task without a clean teardown.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// What the driver should do after executing a batch of actions.
enum Flow {
    /// Keep going.
    Continue,
    /// The socket failed mid-send; reconnect.
    TransportLost,
    /// The session was disposed; end the task.
    Dispose,
}

/// Spawn the driver for one authenticated session.
///
/// Provisions the directory and the unseen snapshot through the ledger, then
/// keeps the socket alive with fixed-delay reconnect until disposal.
pub fn spawn<L>(user_id: UserId, config: SessionConfig, ledger: L) -> ConnectedChannel
where
    L: SeenLedger + 'static,
{
    let (commands_tx, commands_rx) = mpsc::channel(config.command_capacity);
    let (notify_tx, notify_rx) = mpsc::channel(config.notify_capacity);

    let coordinator = Coordinator::new(user_id, config);
    let handle = tokio::spawn(run_channel(coordinator, ledger, commands_rx, notify_tx));

    ConnectedChannel {
        commands: commands_tx,
        notifications: notify_rx,
        abort_handle: handle.abort_handle(),
    }
}

/// Run the session: provisioning, then the reconnect loop.
async fn run_channel<L: SeenLedger>(
    mut coordinator: Coordinator,
    ledger: L,
    mut commands: mpsc::Receiver<Command>,
    notify: mpsc::Sender<InboundMessage>,
) {
    let user_id = coordinator.user_id();

    // Initial provisioning. A failed directory fetch leaves the session
    // idle; a later RefreshDirectory command can still start it.
    match ledger.fetch_directory(user_id).await {
        Ok(chats) => {
            let actions = coordinator.directory_loaded(chats);
            let _ = execute(&mut coordinator, &ledger, &notify, None, actions).await;
        },
        Err(error) => tracing::warn!(%error, "initial directory fetch failed"),
    }

    match ledger.fetch_unseen(user_id).await {
        Ok(snapshot) => coordinator.snapshot_loaded(snapshot),
        Err(error) => tracing::warn!(%error, "initial unseen snapshot fetch failed"),
    }

    let url = coordinator.config().broker_url.clone();
    let delay = coordinator.config().reconnect_delay;

    loop {
        if coordinator.status() == ConnectionStatus::Disconnected {
            // Not started (or disposed mid-wait); block on the next command.
            let Some(command) = commands.recv().await else { return };
            if apply_command(&mut coordinator, &ledger, &notify, None, command).await {
                return;
            }
            continue;
        }

        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                tracing::debug!(%url, "broker socket connected");
                let (mut sink, mut source) = stream.split();
                if run_connected(
                    &mut coordinator,
                    &ledger,
                    &mut commands,
                    &notify,
                    &mut sink,
                    &mut source,
                )
                .await
                {
                    return;
                }
                coordinator.transport_down();
            },
            Err(error) => {
                tracing::warn!(%error, "broker connect failed, retrying");
            },
        }

        if wait_reconnect(&mut coordinator, &ledger, &notify, &mut commands, delay).await {
            return;
        }
    }
}

/// Drive one live socket until it drops or the session is disposed.
///
/// Returns `true` if the session was disposed.
async fn run_connected<L: SeenLedger>(
    coordinator: &mut Coordinator,
    ledger: &L,
    commands: &mut mpsc::Receiver<Command>,
    notify: &mpsc::Sender<InboundMessage>,
    sink: &mut WsSink,
    source: &mut WsSource,
) -> bool {
    let handshake_actions = coordinator.transport_up();
    match execute(coordinator, ledger, notify, Some(&mut *sink), handshake_actions).await {
        Flow::Dispose => return true,
        Flow::TransportLost => return false,
        Flow::Continue => {},
    }

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    // Host dropped the handle; tear down cleanly.
                    let actions = coordinator.dispose();
                    let _ = execute(coordinator, ledger, notify, Some(&mut *sink), actions).await;
                    return true;
                };
                match apply_command_actions(coordinator, ledger, notify, Some(&mut *sink), command).await {
                    Flow::Dispose => return true,
                    Flow::TransportLost => return false,
                    Flow::Continue => {},
                }
            },
            frame = source.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match Envelope::decode(&text) {
                            Ok(envelope) => {
                                let actions = coordinator.frame_received(envelope);
                                match execute(coordinator, ledger, notify, Some(&mut *sink), actions).await {
                                    Flow::Dispose => return true,
                                    Flow::TransportLost => return false,
                                    Flow::Continue => {},
                                }
                            },
                            Err(error) => {
                                tracing::warn!(%error, "dropping malformed broker frame");
                            },
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!("broker closed the socket");
                        return false;
                    },
                    Some(Ok(_)) => {
                        // Pings, pongs and binary frames are transport noise.
                    },
                    Some(Err(error)) => {
                        tracing::warn!(%error, "broker socket error");
                        return false;
                    },
                }
            },
        }
    }
}

/// Serve commands while waiting out the fixed reconnect delay.
///
/// Returns `true` if the session was disposed.
async fn wait_reconnect<L: SeenLedger>(
    coordinator: &mut Coordinator,
    ledger: &L,
    notify: &mpsc::Sender<InboundMessage>,
    commands: &mut mpsc::Receiver<Command>,
    delay: std::time::Duration,
) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => return false,
            command = commands.recv() => {
                let Some(command) = command else { return true };
                if apply_command(coordinator, ledger, notify, None, command).await {
                    return true;
                }
            },
        }
    }
}

/// Apply one host command. Returns `true` if the session was disposed.
async fn apply_command<L: SeenLedger>(
    coordinator: &mut Coordinator,
    ledger: &L,
    notify: &mpsc::Sender<InboundMessage>,
    sink: Option<&mut WsSink>,
    command: Command,
) -> bool {
    matches!(
        apply_command_actions(coordinator, ledger, notify, sink, command).await,
        Flow::Dispose
    )
}

/// Apply one host command and execute the resulting actions.
async fn apply_command_actions<L: SeenLedger>(
    coordinator: &mut Coordinator,
    ledger: &L,
    notify: &mpsc::Sender<InboundMessage>,
    sink: Option<&mut WsSink>,
    command: Command,
) -> Flow {
    let actions = match command {
        Command::RefreshDirectory(chats) => coordinator.directory_loaded(chats),
        Command::MarkSeen(chat_id) => coordinator.mark_seen(chat_id),
        Command::Publish { destination, body } => coordinator.publish(destination, body),
        Command::Dispose => coordinator.dispose(),
    };

    execute(coordinator, ledger, notify, sink, actions).await
}

/// Execute a batch of coordinator actions.
async fn execute<L: SeenLedger>(
    coordinator: &mut Coordinator,
    ledger: &L,
    notify: &mpsc::Sender<InboundMessage>,
    mut sink: Option<&mut WsSink>,
    actions: Vec<CoordinatorAction>,
) -> Flow {
    let mut transport_lost = false;
    let mut disposed = false;

    for action in actions {
        match action {
            CoordinatorAction::Transport(SocketAction::OpenTransport { .. }) => {
                // The outer retry loop owns socket opening.
            },
            CoordinatorAction::Transport(SocketAction::SendFrame(envelope)) => {
                if transport_lost {
                    continue;
                }
                let Some(sink) = sink.as_deref_mut() else {
                    tracing::debug!("no socket for outgoing frame, dropping");
                    continue;
                };
                match envelope.encode() {
                    Ok(raw) => {
                        if let Err(error) = sink.send(Message::Text(raw)).await {
                            tracing::warn!(%error, "send failed, transport lost");
                            transport_lost = true;
                        }
                    },
                    Err(error) => {
                        tracing::warn!(%error, "dropping unencodable frame");
                    },
                }
            },
            CoordinatorAction::Transport(SocketAction::CloseTransport) => {
                if let Some(sink) = sink.as_deref_mut() {
                    let _ = sink.close().await;
                }
                disposed = true;
            },
            CoordinatorAction::NotifyMessage(message) => {
                if notify.send(message).await.is_err() {
                    tracing::debug!("notification receiver dropped");
                }
            },
            CoordinatorAction::FetchSnapshot => {
                match ledger.fetch_unseen(coordinator.user_id()).await {
                    Ok(snapshot) => coordinator.snapshot_loaded(snapshot),
                    Err(error) => {
                        tracing::warn!(%error, "snapshot fetch failed, badge may be stale");
                    },
                }
            },
            CoordinatorAction::PushSeen { chat_id } => {
                match ledger.mark_seen(coordinator.user_id(), chat_id).await {
                    Ok(()) => match ledger.fetch_unseen(coordinator.user_id()).await {
                        Ok(snapshot) => coordinator.snapshot_loaded(snapshot),
                        Err(error) => {
                            tracing::warn!(%error, "snapshot fetch failed, badge may be stale");
                        },
                    },
                    Err(error) => {
                        // The optimistic zero stands; the next snapshot
                        // reload reconciles.
                        tracing::warn!(%error, "mark-seen push failed");
                    },
                }
            },
        }
    }

    if disposed {
        Flow::Dispose
    } else if transport_lost {
        Flow::TransportLost
    } else {
        Flow::Continue
    }
}
