// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router assembly.

use std::sync::Arc;

use axum::{
	routing::{get, post, put},
	Router,
};

use tempo_server_jobs::{SqliteJobsRepository, StuckJobSweeper};

use crate::routes;

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
	pub jobs_repo: Arc<SqliteJobsRepository>,
	pub sweeper: Arc<StuckJobSweeper>,
}

/// Build the API router.
pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/api/health", get(routes::health::health))
		.route(
			"/api/jobs",
			post(routes::jobs::create_job).get(routes::jobs::list_jobs),
		)
		.route(
			"/api/jobs/{id}",
			get(routes::jobs::get_job).delete(routes::jobs::delete_job),
		)
		.route("/api/jobs/{id}/schedule", put(routes::jobs::update_schedule))
		.route("/api/jobs/{id}/cancel", post(routes::jobs::cancel_job))
		.route(
			"/api/maintenance/sweep",
			post(routes::maintenance::trigger_sweep),
		)
		.route(
			"/api/maintenance/sweeps",
			get(routes::maintenance::list_sweeps),
		)
		.with_state(state)
}
