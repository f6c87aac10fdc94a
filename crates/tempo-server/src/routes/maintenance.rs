// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Maintenance HTTP handlers: manual sweep trigger and sweep audit trail.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::{info, instrument};

use tempo_jobs_core::{SweepReport, SweepRun};
use tempo_server_jobs::JobsRepository;

use crate::api::AppState;
use crate::routes::{map_jobs_error, ErrorResponse};

#[derive(Debug, Serialize)]
pub struct SweepResponse {
	/// True when the sweep was a guarded no-op (already running, or too
	/// soon after the previous attempt).
	pub skipped: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub report: Option<SweepReport>,
}

#[derive(Debug, Serialize)]
pub struct SweepHistoryResponse {
	pub sweeps: Vec<SweepRun>,
}

/// Manually trigger one stuck-job sweep.
///
/// Intended for operators and external cron; the in-process timer calls
/// the same entry point.
#[instrument(skip(state))]
pub async fn trigger_sweep(
	State(state): State<AppState>,
) -> Result<Json<SweepResponse>, (StatusCode, Json<ErrorResponse>)> {
	match state.sweeper.run_sweep().await {
		Ok(Some(report)) => {
			info!(
				processed = report.processed,
				rescued = report.rescued,
				failed = report.failed,
				"Manual sweep completed"
			);
			Ok(Json(SweepResponse {
				skipped: false,
				report: Some(report),
			}))
		}
		Ok(None) => Ok(Json(SweepResponse {
			skipped: true,
			report: None,
		})),
		Err(e) => Err(map_jobs_error(e)),
	}
}

/// Recent sweep outcomes, newest first.
#[instrument(skip(state))]
pub async fn list_sweeps(
	State(state): State<AppState>,
) -> Result<Json<SweepHistoryResponse>, (StatusCode, Json<ErrorResponse>)> {
	let sweeps = state
		.jobs_repo
		.list_recent_sweeps(20)
		.await
		.map_err(map_jobs_error)?;
	Ok(Json(SweepHistoryResponse { sweeps }))
}
