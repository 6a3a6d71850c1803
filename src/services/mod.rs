// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - rendering and export.

pub mod ticket;

pub use ticket::{certificate_pdf, TicketError, TicketRenderer};
