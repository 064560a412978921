//! WebSocket Event Broadcasting
//!
//! Real-time change notifications over WebSocket topics.
//!
//! ## Architecture
//!
//! - A tokio broadcast channel carries every domain event to every session
//! - Each session keeps its own topic set and forwards only matching events
//! - Client frames subscribe to or unsubscribe from topics
//!
//! ## Protocol
//!
//! 1. Client upgrades `GET /api/v1/ws` with an `X-User-Id` header
//! 2. Server sends `Connected { session_id }`
//! 3. Client sends `{"action":"subscribe","topic":"projects/5"}`
//! 4. Server answers `Subscribed`, or `Error` for a bad frame or a topic the
//!    user may not read: `projects/{id}` needs membership, `users/{id}` must
//!    name the caller
//! 5. Server streams events published on the subscribed topics
//! 6. Removal from a project, or its deletion, ends that subscription with
//!    `Unsubscribed`
//! 7. A lagging session receives an `Error` naming the dropped count
//! 8. On shutdown the server sends `Disconnected`

use crate::error::{ApiError, ApiResult};
use crate::events::{Topic, WsEvent};
use crate::extractors::ActorExtractor;
use crate::services::require_member;
use crate::telemetry::METRICS;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tasklane_core::UserId;
use tasklane_storage::{RoleRegistry, SharedStorage};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// WebSocket state shared across the application.
#[derive(Clone)]
pub struct WsState {
    tx: broadcast::Sender<WsEvent>,
}

impl WsState {
    /// Create a new WebSocket state with the specified channel capacity.
    ///
    /// Sessions that fall more than `capacity` events behind lose the oldest
    /// events and are told how many they missed.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event to all sessions.
    ///
    /// Non-blocking. With no session connected the event is dropped.
    pub fn broadcast(&self, event: WsEvent) {
        let event_type = event.event_type();
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_broadcast(event_type);
        }
        match self.tx.send(event) {
            Ok(receiver_count) => {
                debug!(
                    event_type = event_type,
                    receivers = receiver_count,
                    "Broadcast event"
                );
            }
            Err(_) => {
                debug!(event_type = event_type, "No receivers for event");
            }
        }
    }

    /// Subscribe to the raw event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.tx.subscribe()
    }

    /// Number of live sessions.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ============================================================================
// CLIENT FRAMES
// ============================================================================

/// A text frame sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ClientFrame {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
}

/// What the receive task hands to the session loop.
#[derive(Debug, PartialEq)]
enum Control {
    Subscribe(Topic),
    Unsubscribe(Topic),
    Reject(String),
}

fn parse_client_frame(text: &str) -> Control {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => return Control::Reject(format!("Invalid frame: {}", e)),
    };
    let (topic, subscribe) = match frame {
        ClientFrame::Subscribe { topic } => (topic, true),
        ClientFrame::Unsubscribe { topic } => (topic, false),
    };
    match topic.parse::<Topic>() {
        Ok(topic) if subscribe => Control::Subscribe(topic),
        Ok(topic) => Control::Unsubscribe(topic),
        Err(message) => Control::Reject(message),
    }
}

/// Topic-filtered view of the broadcast stream for one session.
#[derive(Debug, Default)]
pub struct Subscriptions {
    topics: HashSet<Topic>,
}

impl Subscriptions {
    pub fn subscribe(&mut self, topic: Topic) -> bool {
        self.topics.insert(topic)
    }

    pub fn unsubscribe(&mut self, topic: &Topic) -> bool {
        self.topics.remove(topic)
    }

    /// Whether the event is published on any subscribed topic.
    pub fn matches(&self, event: &WsEvent) -> bool {
        event.topics().iter().any(|topic| self.topics.contains(topic))
    }

    /// Drops the project topic when `event` ends `user_id`'s access to it.
    pub fn revoke_on(&mut self, event: &WsEvent, user_id: UserId) -> Option<Topic> {
        let project_id = match *event {
            WsEvent::MemberRemoved {
                project_id,
                user_id: removed,
            } if removed == user_id => project_id,
            WsEvent::ProjectDeleted { project_id } => project_id,
            _ => return None,
        };
        let topic = Topic::Project(project_id);
        self.topics.remove(&topic).then_some(topic)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

// ============================================================================
// HANDLER
// ============================================================================

/// Who a session belongs to and what it needs to check topic access.
#[derive(Clone)]
pub struct SessionAccess {
    pub storage: SharedStorage,
    pub registry: Arc<RoleRegistry>,
    pub user_id: UserId,
}

impl SessionAccess {
    /// Same rule as the REST reads: project topics need membership, user
    /// topics are private to that user.
    pub async fn authorize(&self, topic: Topic) -> ApiResult<()> {
        match topic {
            Topic::Project(project_id) => {
                require_member(&self.storage, &self.registry, project_id, self.user_id).await?;
                Ok(())
            }
            Topic::User(user_id) if user_id == self.user_id => Ok(()),
            Topic::User(user_id) => Err(ApiError::forbidden(format!(
                "User {} cannot follow the events of user {}",
                self.user_id, user_id
            ))),
        }
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<WsState>>,
    State(storage): State<SharedStorage>,
    State(registry): State<Arc<RoleRegistry>>,
    ActorExtractor(actor): ActorExtractor,
) -> ApiResult<Response> {
    info!(user_id = actor.user_id, "WebSocket connection request");
    let access = SessionAccess {
        storage,
        registry,
        user_id: actor.user_id,
    };
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, access)))
}

/// Run one WebSocket session until either side closes it.
async fn handle_socket(socket: WebSocket, state: Arc<WsState>, access: SessionAccess) {
    let user_id = access.user_id;
    let session_id = Uuid::now_v7();
    info!(%session_id, user_id, "WebSocket connected");
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.ws_connected();
    }

    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.subscribe();
    let mut subscriptions = Subscriptions::default();

    if let Err(e) = send_event(&mut sender, WsEvent::Connected { session_id }).await {
        error!(%session_id, error = %e, "Failed to send Connected event");
        finish_session(session_id);
        return;
    }

    // Client frames are parsed off the session loop and handed over as
    // control messages; the channel closes when the client goes away.
    let (control_tx, mut control_rx) = mpsc::channel::<Control>(32);
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    debug!(%session_id, "Client sent close frame");
                    break;
                }
                Ok(Message::Text(text)) => {
                    if control_tx.send(parse_client_frame(&text)).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Binary(_)) => {
                    let reject = Control::Reject("Binary frames are not supported".to_string());
                    if control_tx.send(reject).await.is_err() {
                        break;
                    }
                }
                // Pongs are sent by axum.
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Err(e) => {
                    warn!(%session_id, error = %e, "WebSocket receive error");
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(event) => {
                        let revoked = subscriptions.revoke_on(&event, user_id);
                        let forward = revoked.is_some() || subscriptions.matches(&event);
                        if forward {
                            if let Err(e) = send_event(&mut sender, event).await {
                                error!(%session_id, error = %e, "Failed to send event, closing connection");
                                break;
                            }
                        }
                        if let Some(topic) = revoked {
                            debug!(%session_id, %topic, "Access to topic ended");
                            let notice = WsEvent::Unsubscribed { topic: topic.to_string() };
                            if let Err(e) = send_event(&mut sender, notice).await {
                                error!(%session_id, error = %e, "Failed to send unsubscribe notice");
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(%session_id, skipped, "Client lagged, some events were dropped");
                        let error_event = WsEvent::Error {
                            message: format!("Lagged: {} events dropped", skipped),
                        };
                        if let Err(e) = send_event(&mut sender, error_event).await {
                            error!(%session_id, error = %e, "Failed to send error event");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!(%session_id, "Broadcast channel closed");
                        break;
                    }
                }
            }

            control = control_rx.recv() => {
                let Some(control) = control else {
                    debug!(%session_id, "Receiver task finished");
                    break;
                };
                let control = match control {
                    Control::Subscribe(topic) => match access.authorize(topic).await {
                        Ok(()) => Control::Subscribe(topic),
                        Err(e) => {
                            debug!(%session_id, %topic, error = %e, "Subscription refused");
                            Control::Reject(e.message)
                        }
                    },
                    other => other,
                };
                let reply = apply_control(&mut subscriptions, control);
                if let Err(e) = send_event(&mut sender, reply).await {
                    error!(%session_id, error = %e, "Failed to answer client frame");
                    break;
                }
            }
        }
    }

    recv_task.abort();

    let disconnected_event = WsEvent::Disconnected {
        reason: "Connection closed".to_string(),
    };
    let _ = send_event(&mut sender, disconnected_event).await;

    finish_session(session_id);
}

fn apply_control(subscriptions: &mut Subscriptions, control: Control) -> WsEvent {
    match control {
        Control::Subscribe(topic) => {
            subscriptions.subscribe(topic);
            WsEvent::Subscribed {
                topic: topic.to_string(),
            }
        }
        Control::Unsubscribe(topic) => {
            subscriptions.unsubscribe(&topic);
            WsEvent::Unsubscribed {
                topic: topic.to_string(),
            }
        }
        Control::Reject(message) => WsEvent::Error { message },
    }
}

fn finish_session(session_id: Uuid) {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.ws_disconnected();
    }
    info!(%session_id, "WebSocket disconnected");
}

/// Serialize an event to JSON and send it as a text message.
async fn send_event(
    sender: &mut futures_util::stream::SplitSink<WebSocket, Message>,
    event: WsEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(&event).map_err(|e| {
        error!(error = %e, "Failed to serialize event");
        axum::Error::new(e)
    })?;

    sender.send(Message::Text(json)).await
}
