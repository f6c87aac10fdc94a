// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Health check handler.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::instrument;

use tempo_jobs_core::SweepRun;
use tempo_server_jobs::JobsRepository;

use crate::api::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	/// When the sweeper last attempted a sweep (None before the first one).
	pub last_sweep_attempt_at: Option<DateTime<Utc>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub last_sweep: Option<SweepRun>,
}

#[instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
	let last_sweep = state
		.jobs_repo
		.list_recent_sweeps(1)
		.await
		.ok()
		.and_then(|mut sweeps| sweeps.pop());

	Json(HealthResponse {
		status: "ok",
		last_sweep_attempt_at: state.sweeper.last_attempt_at().await,
		last_sweep,
	})
}
