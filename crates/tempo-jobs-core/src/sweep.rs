// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sweep report and audit types for stuck-job recovery.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::job::{JobId, JobStatus};

/// Unique identifier for a sweep run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SweepRunId(pub Uuid);

impl SweepRunId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for SweepRunId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for SweepRunId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for SweepRunId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// A stuck job identified during a sweep, for the report's audit list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StuckJobInfo {
	pub id: JobId,
	pub owner: String,
	pub name: String,
	pub status: JobStatus,
	/// How long the job has sat in `running` without progress.
	pub minutes_stuck: i64,
}

/// A per-job failure recorded during a sweep without aborting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepError {
	pub job_id: JobId,
	pub message: String,
}

/// Outcome summary of one stuck-job sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepReport {
	/// Stuck jobs examined.
	pub processed: u32,
	/// Jobs reset to `pending` for another attempt.
	pub rescued: u32,
	/// Jobs marked permanently `failed`.
	pub failed: u32,
	pub errors: Vec<SweepError>,
	pub stuck_jobs: Vec<StuckJobInfo>,
}

/// Terminal state of a recorded sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepOutcome {
	/// The sweep examined every candidate (per-job errors permitted).
	Completed,
	/// The sweep aborted before examining candidates (store unreachable).
	Failed,
}

impl fmt::Display for SweepOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Completed => write!(f, "completed"),
			Self::Failed => write!(f, "failed"),
		}
	}
}

impl FromStr for SweepOutcome {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"completed" => Ok(Self::Completed),
			"failed" => Ok(Self::Failed),
			_ => Err(format!("unknown sweep outcome: {}", s)),
		}
	}
}

/// Persisted record of one sweep, for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRun {
	pub id: SweepRunId,
	pub started_at: DateTime<Utc>,
	pub finished_at: DateTime<Utc>,
	pub processed: u32,
	pub rescued: u32,
	pub failed: u32,
	pub error_count: u32,
	pub outcome: SweepOutcome,
	pub error_message: Option<String>,
}
