// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job types for the Tempo scheduling system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{JobsError, Result};

/// Unique identifier for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for JobId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for JobId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for JobId {
	type Err = uuid::Error;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(Self(Uuid::parse_str(s)?))
	}
}

/// Execution status of a job.
///
/// The runner owns the `pending -> running -> {completed, failed}`
/// transitions; the sweeper is the only component allowed to force
/// `running -> pending` (rescue) or `running -> failed` (exhaustion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Pending,
	Running,
	Completed,
	Failed,
	Cancelled,
}

impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Pending => write!(f, "pending"),
			Self::Running => write!(f, "running"),
			Self::Completed => write!(f, "completed"),
			Self::Failed => write!(f, "failed"),
			Self::Cancelled => write!(f, "cancelled"),
		}
	}
}

impl FromStr for JobStatus {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"running" => Ok(Self::Running),
			"completed" => Ok(Self::Completed),
			"failed" => Ok(Self::Failed),
			"cancelled" => Ok(Self::Cancelled),
			_ => Err(format!("unknown job status: {}", s)),
		}
	}
}

/// Weekday token for weekly schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekDay {
	Monday,
	Tuesday,
	Wednesday,
	Thursday,
	Friday,
	Saturday,
	Sunday,
}

impl WeekDay {
	pub fn to_chrono(self) -> chrono::Weekday {
		match self {
			Self::Monday => chrono::Weekday::Mon,
			Self::Tuesday => chrono::Weekday::Tue,
			Self::Wednesday => chrono::Weekday::Wed,
			Self::Thursday => chrono::Weekday::Thu,
			Self::Friday => chrono::Weekday::Fri,
			Self::Saturday => chrono::Weekday::Sat,
			Self::Sunday => chrono::Weekday::Sun,
		}
	}
}

impl fmt::Display for WeekDay {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Monday => write!(f, "monday"),
			Self::Tuesday => write!(f, "tuesday"),
			Self::Wednesday => write!(f, "wednesday"),
			Self::Thursday => write!(f, "thursday"),
			Self::Friday => write!(f, "friday"),
			Self::Saturday => write!(f, "saturday"),
			Self::Sunday => write!(f, "sunday"),
		}
	}
}

impl FromStr for WeekDay {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"monday" => Ok(Self::Monday),
			"tuesday" => Ok(Self::Tuesday),
			"wednesday" => Ok(Self::Wednesday),
			"thursday" => Ok(Self::Thursday),
			"friday" => Ok(Self::Friday),
			"saturday" => Ok(Self::Saturday),
			"sunday" => Ok(Self::Sunday),
			_ => Err(format!("unknown weekday: {}", s)),
		}
	}
}

/// Parse a comma-separated weekday list ("monday,wednesday") into tokens.
///
/// Whitespace around tokens is tolerated, duplicates are collapsed, and the
/// result is sorted Monday-first. Empty input yields an empty vector; the
/// caller decides whether that is an error (it is for weekly schedules).
pub fn parse_weekly_days(raw: &str) -> Result<Vec<WeekDay>> {
	let mut days = Vec::new();
	for token in raw.split(',') {
		let token = token.trim();
		if token.is_empty() {
			continue;
		}
		let day: WeekDay = token
			.parse()
			.map_err(|_| JobsError::UnknownWeekday(token.to_string()))?;
		if !days.contains(&day) {
			days.push(day);
		}
	}
	days.sort();
	Ok(days)
}

/// Render a weekday list back into the comma-separated storage form.
pub fn join_weekly_days(days: &[WeekDay]) -> String {
	days.iter()
		.map(|d| d.to_string())
		.collect::<Vec<_>>()
		.join(",")
}

/// Recurrence specification for a job.
///
/// The anchor carries the wall-clock time-of-day the job should fire at
/// (interpreted in the job's timezone) and, for `once`, the exact target
/// instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
	/// Fire exactly once at the anchor instant.
	Once { at: DateTime<Utc> },
	/// Fire every day at the anchor's time-of-day.
	Daily { anchor: DateTime<Utc> },
	/// Fire on the listed weekdays at the anchor's time-of-day.
	Weekly {
		anchor: DateTime<Utc>,
		days: Vec<WeekDay>,
	},
	/// Fire every `interval_days` days at the anchor's time-of-day.
	Custom {
		anchor: DateTime<Utc>,
		interval_days: u32,
	},
}

impl Schedule {
	/// Reconstruct a schedule from its storage columns, validating as it goes.
	///
	/// # Errors
	///
	/// Returns an error for an unrecognized schedule type, an empty or
	/// malformed weekday list on a weekly schedule, or a non-positive
	/// interval on a custom schedule.
	pub fn from_parts(
		schedule_type: &str,
		schedule_time: DateTime<Utc>,
		interval_days: Option<i64>,
		weekly_days: Option<&str>,
	) -> Result<Self> {
		match schedule_type {
			"once" => Ok(Self::Once { at: schedule_time }),
			"daily" => Ok(Self::Daily {
				anchor: schedule_time,
			}),
			"weekly" => {
				let days = parse_weekly_days(weekly_days.unwrap_or(""))?;
				if days.is_empty() {
					return Err(JobsError::EmptyWeeklyDays);
				}
				Ok(Self::Weekly {
					anchor: schedule_time,
					days,
				})
			}
			"custom" => {
				let interval = interval_days.unwrap_or(0);
				if interval < 1 {
					return Err(JobsError::InvalidIntervalDays(interval));
				}
				Ok(Self::Custom {
					anchor: schedule_time,
					interval_days: interval as u32,
				})
			}
			other => Err(JobsError::UnknownScheduleType(other.to_string())),
		}
	}

	/// Validate an already-constructed schedule.
	pub fn validate(&self) -> Result<()> {
		match self {
			Self::Weekly { days, .. } if days.is_empty() => Err(JobsError::EmptyWeeklyDays),
			Self::Custom { interval_days, .. } if *interval_days < 1 => {
				Err(JobsError::InvalidIntervalDays(*interval_days as i64))
			}
			_ => Ok(()),
		}
	}

	/// Storage token for the schedule type column.
	pub fn schedule_type(&self) -> &'static str {
		match self {
			Self::Once { .. } => "once",
			Self::Daily { .. } => "daily",
			Self::Weekly { .. } => "weekly",
			Self::Custom { .. } => "custom",
		}
	}

	/// The anchor instant the schedule is derived from.
	pub fn anchor(&self) -> DateTime<Utc> {
		match self {
			Self::Once { at } => *at,
			Self::Daily { anchor } => *anchor,
			Self::Weekly { anchor, .. } => *anchor,
			Self::Custom { anchor, .. } => *anchor,
		}
	}

	/// Interval column value (`custom` only).
	pub fn interval_days(&self) -> Option<u32> {
		match self {
			Self::Custom { interval_days, .. } => Some(*interval_days),
			_ => None,
		}
	}

	/// Weekday list column value (`weekly` only).
	pub fn weekly_days_column(&self) -> Option<String> {
		match self {
			Self::Weekly { days, .. } => Some(join_weekly_days(days)),
			_ => None,
		}
	}
}

/// A user-defined unit of work with scheduling metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
	pub id: JobId,
	/// Opaque owning principal (a wallet address or user id upstream).
	pub owner: String,
	pub name: String,
	pub description: Option<String>,

	pub status: JobStatus,

	/// None = not scheduled; such a job never has a `next_run_time`.
	pub schedule: Option<Schedule>,
	/// IANA timezone the anchor's time-of-day is interpreted in.
	pub timezone: String,
	/// Next instant the job should fire. Computed, never user-set.
	pub next_run_time: Option<DateTime<Utc>>,

	/// Optional cap on total executions.
	pub max_runs: Option<u32>,
	pub run_count: u32,
	/// Rescue attempts consumed; reset on a successful run.
	pub retry_count: u32,
	pub last_run_at: Option<DateTime<Utc>>,
	pub last_error: Option<String>,
	pub is_active: bool,

	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Job {
	/// Whether the run cap still permits another execution.
	pub fn has_runs_remaining(&self) -> bool {
		match self.max_runs {
			Some(max) => self.run_count < max,
			None => true,
		}
	}
}
