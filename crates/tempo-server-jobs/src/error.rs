// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for job store and sweeper operations.

use thiserror::Error;

/// Result type for job server operations.
pub type Result<T> = std::result::Result<T, JobsServerError>;

/// Errors that can occur in job store and sweeper operations.
#[derive(Debug, Error)]
pub enum JobsServerError {
	#[error("job not found")]
	JobNotFound,

	#[error("job was not in the expected state for this transition")]
	TransitionConflict,

	#[error("invalid schedule: {0}")]
	Schedule(#[from] tempo_jobs_core::JobsError),

	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("internal error: {0}")]
	Internal(String),
}
