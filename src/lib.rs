// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Ride-Checkin: registration and QR check-in back end for a ride event
//!
//! Riders register solo or as a duo and download QR tickets once approved.
//! At the event, operators scan tickets at a check-in desk, review the rider,
//! and confirm the one-way check-in.

pub mod checkin;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scanner;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use scanner::QrDecoder;
use services::TicketRenderer;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn DocumentStore>,
    pub decoder: Arc<dyn QrDecoder>,
    pub tickets: TicketRenderer,
}

impl AppState {
    /// State with the production decoder and a renderer sized from config.
    pub fn new(config: Config, db: Arc<dyn DocumentStore>) -> Self {
        let tickets = TicketRenderer::new(config.ticket_module_px);
        Self {
            config,
            db,
            decoder: Arc::new(scanner::RqrrDecoder),
            tickets,
        }
    }
}
