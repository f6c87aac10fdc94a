// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP route handlers.

pub mod health;
pub mod jobs;
pub mod maintenance;

use axum::{http::StatusCode, Json};
use serde::Serialize;

use tempo_server_jobs::JobsServerError;

/// Error response for API endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

pub(crate) fn error_response(
	status: StatusCode,
	error: &str,
	message: impl Into<String>,
) -> (StatusCode, Json<ErrorResponse>) {
	(
		status,
		Json(ErrorResponse {
			error: error.to_string(),
			message: message.into(),
		}),
	)
}

/// Map an engine error onto an HTTP response. Validation mistakes are the
/// caller's fault and come back as 400 with the specific message; state
/// conflicts and missing rows get their own codes; everything else is an
/// opaque 500.
pub(crate) fn map_jobs_error(e: JobsServerError) -> (StatusCode, Json<ErrorResponse>) {
	match e {
		JobsServerError::JobNotFound => {
			error_response(StatusCode::NOT_FOUND, "not_found", "job not found")
		}
		JobsServerError::TransitionConflict => error_response(
			StatusCode::CONFLICT,
			"conflict",
			"job was not in the expected state for this transition",
		),
		JobsServerError::Schedule(err) => {
			error_response(StatusCode::BAD_REQUEST, "invalid_schedule", err.to_string())
		}
		e => {
			tracing::error!(error = %e, "request failed");
			error_response(
				StatusCode::INTERNAL_SERVER_ERROR,
				"internal_error",
				"internal server error",
			)
		}
	}
}
