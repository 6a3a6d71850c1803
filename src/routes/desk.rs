// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live check-in desk over a websocket.
//!
//! The browser streams camera frames as binary messages (PNG or JPEG) and
//! sends commands as JSON text. The server runs one [`CheckInFlow`] per
//! connection and answers every change with a [`DeskSnapshot`].

use super::checkin::ReviewResponse;
use crate::checkin::{CheckInError, CheckInFlow, CheckInState};
use crate::models::Operator;
use crate::scanner::{ChannelCamera, FrameSender, GrayFrame};
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Extension, Router,
};
use axum::body::Bytes;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

/// Frames waiting for the sampler. Older ones are skipped anyway.
const DESK_FRAME_BUFFER: usize = 4;

/// Operator routes. Auth and role middleware are applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/admin/checkin/desk", get(open_desk))
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DeskCommand {
    Start,
    Stop,
    Confirm,
    Dismiss,
    /// Text decoded by the browser itself
    Submit { payload: String },
}

/// Sent after every state change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeskSnapshot {
    pub state: &'static str,
    pub review: Option<ReviewResponse>,
    /// Error for the current attempt, in operator wording
    pub error: Option<String>,
    /// One-off notification, e.g. a completed check-in
    pub notice: Option<String>,
}

impl DeskSnapshot {
    fn of(flow: &CheckInFlow) -> Self {
        let (review, error) = match flow.state() {
            CheckInState::Reviewing(review) | CheckInState::CheckingIn(review) => {
                (Some(review.clone().into()), None)
            }
            CheckInState::Failed(err) => (None, Some(err.user_message())),
            _ => (None, None),
        };
        Self {
            state: flow.state().name(),
            review,
            error,
            notice: None,
        }
    }

    fn with_outcome<T>(mut self, outcome: &Result<T, CheckInError>) -> Self {
        if let Err(err) = outcome {
            self.error = Some(err.user_message());
        }
        self
    }

    fn with_notice(mut self, notice: String) -> Self {
        self.notice = Some(notice);
        self
    }
}

async fn open_desk(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Extension(operator): Extension<Operator>,
) -> Response {
    ws.on_upgrade(move |socket| {
        let (sink, stream) = socket.split();
        run_desk(stream, sink, state, operator)
    })
}

async fn send_snapshot<K>(sink: &mut K, snapshot: &DeskSnapshot) -> bool
where
    K: Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(snapshot) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize desk snapshot");
            return false;
        }
    };
    sink.send(Message::Text(text.into())).await.is_ok()
}

/// Drive one desk until the client goes away.
///
/// `stream` and `sink` are the two halves of the websocket; any message
/// transport works.
pub async fn run_desk<S, K, E>(mut stream: S, mut sink: K, state: Arc<AppState>, operator: Operator)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    K: Sink<Message> + Unpin,
    E: std::fmt::Display,
{
    tracing::info!(operator = %operator.uid(), "Check-in desk opened");

    let (frames, camera) = ChannelCamera::new(DESK_FRAME_BUFFER);
    let mut flow = CheckInFlow::new(
        operator,
        Arc::clone(&state.db),
        Arc::clone(&state.decoder),
        state.config.scan_frame_interval,
    );

    if !send_snapshot(&mut sink, &DeskSnapshot::of(&flow)).await {
        return;
    }

    loop {
        let scanning = flow.is_scanning();
        let snapshot = tokio::select! {
            outcome = flow.next_code(), if scanning => {
                let result = flow.resolve_scan(outcome).await;
                DeskSnapshot::of(&flow).with_outcome(&result)
            }
            message = stream.next() => match message {
                Some(Ok(Message::Binary(bytes))) => {
                    if scanning {
                        push_frame(&frames, bytes).await;
                    }
                    continue;
                }
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<DeskCommand>(text.as_str()) {
                        Ok(command) => run_command(&mut flow, &camera, command).await,
                        Err(err) => {
                            tracing::debug!(error = %err, "Ignoring malformed desk command");
                            DeskSnapshot::of(&flow).with_notice("Unknown command.".to_string())
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    tracing::debug!(error = %err, "Desk socket error");
                    break;
                }
            },
        };

        if !send_snapshot(&mut sink, &snapshot).await {
            break;
        }
    }

    flow.stop_scan().await;
    tracing::info!(operator = %flow.operator().uid(), "Check-in desk closed");
}

/// Decode a browser frame off the runtime threads and queue it for the
/// sampler.
async fn push_frame(frames: &FrameSender, bytes: Bytes) {
    let decoded = tokio::task::spawn_blocking(move || GrayFrame::from_image_bytes(&bytes)).await;
    let frame = match decoded {
        Ok(Ok(frame)) => frame,
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "Dropping unreadable frame");
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, "Frame decode task failed");
            return;
        }
    };
    match frames.try_send(frame) {
        Ok(()) | Err(TrySendError::Full(_)) => {}
        Err(TrySendError::Closed(_)) => tracing::warn!("Frame channel closed"),
    }
}

async fn run_command(
    flow: &mut CheckInFlow,
    camera: &ChannelCamera,
    command: DeskCommand,
) -> DeskSnapshot {
    match command {
        DeskCommand::Start => {
            let result = flow.start_scan(camera);
            DeskSnapshot::of(flow).with_outcome(&result)
        }
        DeskCommand::Stop => {
            flow.stop_scan().await;
            DeskSnapshot::of(flow)
        }
        DeskCommand::Submit { payload } => {
            let result = flow.accept_decoded(&payload).await;
            DeskSnapshot::of(flow).with_outcome(&result)
        }
        DeskCommand::Confirm => match flow.confirm().await {
            Ok(receipt) => DeskSnapshot::of(flow).with_notice(receipt.message),
            Err(err) => DeskSnapshot::of(flow).with_outcome::<()>(&Err(err)),
        },
        DeskCommand::Dismiss => {
            let result = flow.dismiss();
            DeskSnapshot::of(flow).with_outcome(&result)
        }
    }
}
