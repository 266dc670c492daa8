//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! One connection drives one `ViewController`. Client messages and completions of
//! spawned work are handled in a single loop, so the controller is never shared.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::{AppState, ConnectionState},
    view::Snapshot,
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Extension,
};
use festival_planner_core::{
    controller::{FetchRequest, ScheduleLoad},
    domain::{Coordinates, DateSelection, Event, Identity, TransportInfo},
    schedule::PendingWrite,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

type WsSender = SplitSink<WebSocket, Message>;

/// The result of work spawned on behalf of the connection.
enum Completion {
    Fetched(FetchRequest, Vec<Event>),
    ScheduleLoaded(ScheduleLoad, Vec<Event>),
    TransportFound(String, TransportInfo),
}

/// What a client message did to the connection.
#[derive(Debug, PartialEq)]
enum Outcome {
    Unchanged,
    /// The render state may have changed; a snapshot follows.
    Changed,
    /// The action was refused and the client is told why.
    Rejected(String),
}

impl From<bool> for Outcome {
    fn from(changed: bool) -> Self {
        if changed {
            Outcome::Changed
        } else {
            Outcome::Unchanged
        }
    }
}

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
    identity: Option<Extension<Identity>>,
) -> Response {
    let cookie_identity = identity.map(|Extension(identity)| identity);
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, cookie_identity))
}

//=========================================================================================
// Spawned Work
//=========================================================================================

/// Spawns the asynchronous side of controller transitions. Every task stops when the
/// connection's token is cancelled.
struct Effects {
    app_state: Arc<AppState>,
    completions: mpsc::UnboundedSender<Completion>,
    writes: mpsc::UnboundedSender<PendingWrite>,
    token: CancellationToken,
}

impl Effects {
    fn spawn<F>(&self, work: F)
    where
        F: std::future::Future<Output = Option<Completion>> + Send + 'static,
    {
        let token = self.token.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                done = work => {
                    if let Some(done) = done {
                        // The loop is gone once the connection closes.
                        let _ = completions.send(done);
                    }
                }
            }
        });
    }

    fn fetch(&self, request: Option<FetchRequest>) {
        let Some(request) = request else { return };
        let source = self.app_state.events.clone();
        self.spawn(async move {
            let key = request.key;
            let events = source.fetch_events(key.year, key.month, key.category).await;
            Some(Completion::Fetched(request, events))
        });
    }

    fn load_schedule(&self, conn: &ConnectionState, load: ScheduleLoad) {
        let store = conn.controller.store().clone();
        self.spawn(async move {
            let events = store.load(load.session.as_ref()).await;
            Some(Completion::ScheduleLoaded(load, events))
        });
    }

    fn lookup_transport(&self, event_id: String, at: Option<Coordinates>) {
        let Some(at) = at else { return };
        let transport = self.app_state.transport.clone();
        self.spawn(async move {
            let info = transport.nearby_transport(at).await;
            Some(Completion::TransportFound(event_id, info))
        });
    }

    fn write(&self, write: Option<PendingWrite>) {
        if let Some(write) = write {
            if self.writes.send(write).is_err() {
                error!("Schedule writer has stopped; dropping write.");
            }
        }
    }
}

/// Commits schedule writes one at a time, in the order they were issued, so a later
/// local overwrite can never be clobbered by an earlier one.
fn spawn_writer(token: CancellationToken) -> (mpsc::UnboundedSender<PendingWrite>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<PendingWrite>();
    let writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                next = rx.recv() => match next {
                    Some(write) => write.commit_or_log().await,
                    None => break,
                },
            }
        }
        // Flush what was already accepted before the connection closed.
        while let Ok(write) = rx.try_recv() {
            write.commit_or_log().await;
        }
    });
    (tx, writer)
}

//=========================================================================================
// Connection Lifecycle
//=========================================================================================

async fn send_message(ws_sender: &mut WsSender, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(json) => ws_sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

async fn send_snapshot(ws_sender: &mut WsSender, app_state: &AppState, conn: &ConnectionState) -> bool {
    let snapshot = Snapshot::capture(&conn.controller, app_state.today());
    send_message(ws_sender, &ServerMessage::Snapshot(snapshot)).await
}

/// Reads the fields of the opening `init` message. Anything else is refused.
fn parse_init(text: &str) -> Option<(Option<Uuid>, Option<String>)> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Init { device_id, auth_token }) => Some((device_id, auth_token)),
        _ => None,
    }
}

async fn identity_for_token(app_state: &AppState, token: &str) -> Option<Identity> {
    match app_state.accounts.validate_auth_session(token).await {
        Ok(user_id) => Some(Identity { id: user_id }),
        Err(e) => {
            warn!("Rejected auth token: {:?}", e);
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>, cookie_identity: Option<Identity>) {
    info!("New WebSocket connection established.");
    let (mut ws_sender, mut receiver) = socket.split();

    // --- 1. Initialization Phase ---
    let (device_id, auth_token) = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => match parse_init(&init_json) {
            Some(fields) => fields,
            None => {
                error!("First message was not a valid Init message.");
                let err = ServerMessage::Error {
                    message: "The first message must be init.".to_string(),
                };
                send_message(&mut ws_sender, &err).await;
                return;
            }
        },
        _ => {
            error!("Client disconnected before sending Init message.");
            return;
        }
    };

    let session = match auth_token.as_deref() {
        Some(token) => identity_for_token(&app_state, token).await,
        None => cookie_identity,
    };
    let device_id = device_id.unwrap_or_else(Uuid::new_v4);
    info!("Initializing device {} (signed in: {})", device_id, session.is_some());

    let mut conn = ConnectionState::new(&app_state, device_id, session);
    let initialized = ServerMessage::Initialized {
        device_id,
        signed_in: session.is_some(),
    };
    if !send_message(&mut ws_sender, &initialized).await {
        error!("Failed to send initialized message.");
        return;
    }

    let (completions_tx, mut completions) = mpsc::unbounded_channel();
    let (writes, writer) = spawn_writer(conn.cancellation_token.clone());
    let effects = Effects {
        app_state: app_state.clone(),
        completions: completions_tx,
        writes,
        token: conn.cancellation_token.clone(),
    };

    effects.fetch(conn.controller.request_events());
    let load = conn.controller.reload_schedule();
    effects.load_schedule(&conn, load);

    // --- 2. Main Message Loop ---
    let mut open = send_snapshot(&mut ws_sender, &app_state, &conn).await;
    while open {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(client_msg) => {
                            match handle_client_message(client_msg, &app_state, &mut conn, &effects).await {
                                Outcome::Changed => {
                                    open = send_snapshot(&mut ws_sender, &app_state, &conn).await;
                                }
                                Outcome::Rejected(message) => {
                                    open = send_message(&mut ws_sender, &ServerMessage::Error { message }).await;
                                }
                                Outcome::Unchanged => {}
                            }
                        }
                        Err(e) => {
                            warn!("Failed to deserialize client message: {}", e);
                            let err = ServerMessage::Error {
                                message: format!("Unrecognized message: {}", e),
                            };
                            open = send_message(&mut ws_sender, &err).await;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    info!("Client sent close message.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
                None => {
                    info!("Client disconnected.");
                    break;
                }
            },
            Some(done) = completions.recv() => {
                if apply_completion(done, &mut conn) {
                    open = send_snapshot(&mut ws_sender, &app_state, &conn).await;
                }
            }
        }
    }

    // --- 3. Cleanup ---
    conn.cancellation_token.cancel();
    if let Err(e) = writer.await {
        error!("Schedule writer for device {} failed: {}", conn.device_id, e);
    }
    info!("WebSocket connection for device {} closed.", conn.device_id);
}

/// Applies a client action.
async fn handle_client_message(
    client_msg: ClientMessage,
    app_state: &AppState,
    conn: &mut ConnectionState,
    effects: &Effects,
) -> Outcome {
    let controller = &mut conn.controller;
    match client_msg {
        ClientMessage::Init { .. } => {
            warn!("Received subsequent Init message, which is ignored.");
            Outcome::Unchanged
        }
        ClientMessage::SelectCategory { category } => {
            effects.fetch(controller.select_category(category));
            Outcome::Changed
        }
        ClientMessage::ChangeDate { year, month, day } => match DateSelection::new(year, month, day) {
            Some(selection) => {
                effects.fetch(controller.change_date(selection));
                Outcome::Changed
            }
            None => {
                debug!("Ignoring invalid date year={} month={} day={}", year, month, day);
                Outcome::Unchanged
            }
        },
        ClientMessage::PreviousMonth => {
            effects.fetch(controller.previous_month());
            Outcome::Changed
        }
        ClientMessage::NextMonth => {
            effects.fetch(controller.next_month());
            Outcome::Changed
        }
        ClientMessage::SelectDay { day } => controller.select_day(day).into(),
        ClientMessage::Search { query } => {
            controller.set_search(query.trim());
            Outcome::Changed
        }
        ClientMessage::OpenEvent { event_id } => {
            let coordinates = controller.open_event(&event_id);
            if controller.selected_event().is_none() {
                return Outcome::Unchanged;
            }
            effects.lookup_transport(event_id, coordinates);
            Outcome::Changed
        }
        ClientMessage::BackToList => {
            controller.back_to_list();
            Outcome::Changed
        }
        ClientMessage::Navigate { view } => controller.navigate(view).into(),
        ClientMessage::ToggleSave { event_id } => {
            if controller.is_schedule_loading() {
                return Outcome::Rejected("Saved events are still loading. Try again in a moment.".to_string());
            }
            let write = controller.toggle_save(&event_id);
            let changed = write.is_some();
            effects.write(write);
            changed.into()
        }
        ClientMessage::SignIn { token } => {
            let Some(identity) = identity_for_token(app_state, &token).await else {
                return Outcome::Rejected("Sign-in failed: the session is invalid or expired.".to_string());
            };
            let load = controller.change_session(Some(identity));
            effects.load_schedule(conn, load);
            Outcome::Changed
        }
        ClientMessage::SignOut => {
            let load = controller.change_session(None);
            effects.load_schedule(conn, load);
            Outcome::Changed
        }
    }
}

/// Feeds a finished task back into the controller. Returns whether it was applied.
fn apply_completion(done: Completion, conn: &mut ConnectionState) -> bool {
    match done {
        Completion::Fetched(request, events) => {
            // Even a stale result is cached; only the latest one is displayed.
            conn.controller.finish_fetch(&request, events)
        }
        Completion::ScheduleLoaded(load, events) => conn.controller.finish_schedule_load(&load, events),
        Completion::TransportFound(event_id, info) => {
            conn.controller.finish_transport_lookup(&event_id, info)
        }
    }
}
