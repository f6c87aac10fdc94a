// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tempo job scheduling server library.

pub mod api;
pub mod db;
pub mod routes;

pub use api::{create_router, AppState};
pub use tempo_server_config::ServerConfig;
