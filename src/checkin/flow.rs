// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-desk check-in state machine.
//!
//! ```text
//! Idle -> Scanning -> Decoded -> Fetching -> Reviewing -> CheckingIn -> Idle
//! ```
//!
//! Capture, payload and lookup errors land in `Failed`, with the camera
//! already released. Nothing restarts on its own: the operator starts the
//! next scan, and a review stays open until it is confirmed or dismissed.

use super::review::{self, CheckInReceipt, Review};
use super::CheckInError;
use crate::db::DocumentStore;
use crate::models::{Operator, QrPayload};
use crate::scanner::{Camera, CaptureError, QrDecoder, ScanSession};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckInState {
    Idle,
    Scanning,
    Decoded(QrPayload),
    Fetching(QrPayload),
    Reviewing(Review),
    CheckingIn(Review),
    Failed(CheckInError),
}

impl CheckInState {
    pub fn name(&self) -> &'static str {
        match self {
            CheckInState::Idle => "idle",
            CheckInState::Scanning => "scanning",
            CheckInState::Decoded(_) => "decoded",
            CheckInState::Fetching(_) => "fetching",
            CheckInState::Reviewing(_) => "reviewing",
            CheckInState::CheckingIn(_) => "checking_in",
            CheckInState::Failed(_) => "failed",
        }
    }
}

/// One operator's check-in desk.
pub struct CheckInFlow {
    operator: Operator,
    store: Arc<dyn DocumentStore>,
    decoder: Arc<dyn QrDecoder>,
    frame_interval: Duration,
    state: CheckInState,
    session: Option<ScanSession>,
}

impl CheckInFlow {
    pub fn new(
        operator: Operator,
        store: Arc<dyn DocumentStore>,
        decoder: Arc<dyn QrDecoder>,
        frame_interval: Duration,
    ) -> Self {
        Self {
            operator,
            store,
            decoder,
            frame_interval,
            state: CheckInState::Idle,
            session: None,
        }
    }

    pub fn state(&self) -> &CheckInState {
        &self.state
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self.state, CheckInState::Scanning)
    }

    fn transition(&mut self, next: CheckInState) {
        tracing::debug!(
            operator = %self.operator.uid(),
            from = self.state.name(),
            to = next.name(),
            "Check-in state change"
        );
        self.state = next;
    }

    fn fail<T>(&mut self, err: CheckInError) -> Result<T, CheckInError> {
        tracing::info!(
            operator = %self.operator.uid(),
            state = self.state.name(),
            error = %err,
            "Check-in attempt failed"
        );
        self.transition(CheckInState::Failed(err.clone()));
        Err(err)
    }

    fn invalid<T>(&self, action: &'static str) -> Result<T, CheckInError> {
        Err(CheckInError::InvalidState {
            action,
            state: self.state.name(),
        })
    }

    /// Open the camera and begin sampling frames.
    pub fn start_scan(&mut self, camera: &dyn Camera) -> Result<(), CheckInError> {
        if !matches!(self.state, CheckInState::Idle | CheckInState::Failed(_)) {
            return self.invalid("start scanning");
        }

        let source = match camera.open() {
            Ok(source) => source,
            Err(err) => return self.fail(err.into()),
        };
        self.session = Some(ScanSession::start(
            source,
            Arc::clone(&self.decoder),
            self.frame_interval,
        ));
        self.transition(CheckInState::Scanning);
        Ok(())
    }

    /// Wait for the running scan to decode something.
    ///
    /// Cancel-safe, so it can sit in a `select!` next to other inputs. Pass
    /// the result to [`CheckInFlow::resolve_scan`].
    pub async fn next_code(&mut self) -> Result<String, CaptureError> {
        match self.session.as_mut() {
            Some(session) => session.decoded().await,
            None => Err(CaptureError::Closed),
        }
    }

    /// Finish a scan with what the session produced.
    pub async fn resolve_scan(
        &mut self,
        outcome: Result<String, CaptureError>,
    ) -> Result<Review, CheckInError> {
        if !self.is_scanning() {
            return self.invalid("resolve a scan");
        }

        match outcome {
            Ok(text) => self.accept_decoded(&text).await,
            Err(err) => {
                self.release_camera().await;
                self.fail(err.into())
            }
        }
    }

    /// Scan until a code is decoded, then fetch the registration.
    pub async fn await_code(&mut self) -> Result<Review, CheckInError> {
        if !self.is_scanning() {
            return self.invalid("wait for a code");
        }
        let outcome = self.next_code().await;
        self.resolve_scan(outcome).await
    }

    /// Handle decoded QR text, whether from the live scan or decoded elsewhere.
    pub async fn accept_decoded(&mut self, text: &str) -> Result<Review, CheckInError> {
        if !matches!(
            self.state,
            CheckInState::Idle | CheckInState::Scanning | CheckInState::Failed(_)
        ) {
            return self.invalid("accept a code");
        }

        // Scanning stops on the first decode, valid or not.
        self.release_camera().await;

        let payload = match QrPayload::parse(text) {
            Ok(payload) => payload,
            Err(err) => return self.fail(err.into()),
        };
        self.transition(CheckInState::Decoded(payload.clone()));
        self.transition(CheckInState::Fetching(payload.clone()));

        match review::lookup(self.store.as_ref(), &payload).await {
            Ok(review) => {
                self.transition(CheckInState::Reviewing(review.clone()));
                Ok(review)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Check in the rider under review.
    ///
    /// On success the desk returns to `Idle`. Otherwise the review stays open
    /// and the error is for the operator to see before retrying.
    pub async fn confirm(&mut self) -> Result<CheckInReceipt, CheckInError> {
        let review = match &self.state {
            CheckInState::Reviewing(review) => review.clone(),
            _ => return self.invalid("confirm"),
        };
        if let Some(reason) = review.ineligibility() {
            return Err(CheckInError::NotEligible {
                rider: review.rider,
                reason,
            });
        }

        self.transition(CheckInState::CheckingIn(review.clone()));
        match review::confirm(self.store.as_ref(), &self.operator, &review.payload()).await {
            Ok(receipt) => {
                self.transition(CheckInState::Idle);
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!(
                    operator = %self.operator.uid(),
                    registration_id = %review.registration_id,
                    rider = %review.rider,
                    error = %err,
                    "Check-in confirm failed"
                );
                // Another desk may have changed the record; show it as it is now.
                let shown = match &err {
                    CheckInError::NotEligible { .. } => {
                        review::lookup(self.store.as_ref(), &review.payload())
                            .await
                            .unwrap_or(review)
                    }
                    _ => review,
                };
                self.transition(CheckInState::Reviewing(shown));
                Err(err)
            }
        }
    }

    /// Cancel a running scan and release the camera.
    pub async fn stop_scan(&mut self) {
        self.release_camera().await;
        if self.is_scanning() {
            self.transition(CheckInState::Idle);
        }
    }

    /// Close a review or clear an error.
    pub fn dismiss(&mut self) -> Result<(), CheckInError> {
        if self.is_scanning() {
            return self.invalid("dismiss");
        }
        self.transition(CheckInState::Idle);
        Ok(())
    }

    async fn release_camera(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop().await;
        }
    }
}
