// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for job scheduling.

use thiserror::Error;

/// Result type for job domain operations.
pub type Result<T> = std::result::Result<T, JobsError>;

/// Errors that can occur when validating or computing schedules.
#[derive(Debug, Error)]
pub enum JobsError {
	#[error("unknown schedule type: {0}")]
	UnknownScheduleType(String),

	#[error("weekly schedule requires at least one weekday")]
	EmptyWeeklyDays,

	#[error("unknown weekday: {0}")]
	UnknownWeekday(String),

	#[error("custom schedule interval must be at least 1 day, got {0}")]
	InvalidIntervalDays(i64),

	#[error("invalid timezone: {0}")]
	InvalidTimezone(String),

	#[error("schedule type {0} requires an anchor time")]
	MissingAnchor(String),

	#[error("internal error: {0}")]
	Internal(String),
}
