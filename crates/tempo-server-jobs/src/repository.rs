// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Repository layer for job store operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use tempo_jobs_core::{Job, JobId, JobStatus, JobsError, Schedule, SweepRun, SweepRunId};

use crate::error::{JobsServerError, Result};

const JOB_COLUMNS: &str = "id, owner, name, description, status, \
	schedule_type, schedule_time, interval_days, weekly_days, timezone, \
	next_run_time, max_runs, run_count, retry_count, \
	last_run_at, last_error, is_active, created_at, updated_at";

/// Repository trait for job store operations.
#[async_trait]
pub trait JobsRepository: Send + Sync {
	// Job CRUD
	async fn create_job(&self, job: &Job) -> Result<()>;
	async fn get_job(&self, id: JobId) -> Result<Option<Job>>;
	async fn list_jobs_for_owner(&self, owner: &str) -> Result<Vec<Job>>;
	async fn delete_job(&self, id: JobId) -> Result<bool>;

	/// Replace a job's schedule, recomputed `next_run_time` included.
	/// Reactivates the job and resets its run accounting (an explicit user
	/// edit is the one place `run_count` may restart).
	async fn update_schedule(
		&self,
		id: JobId,
		schedule: &Schedule,
		timezone: &str,
		next_run_time: DateTime<Utc>,
		now: DateTime<Utc>,
	) -> Result<()>;

	async fn cancel_job(&self, id: JobId, now: DateTime<Utc>) -> Result<()>;

	// Run lifecycle
	/// Jobs the external runner should execute now.
	async fn list_due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<Job>>;

	/// Conditional `-> running` transition; fails with `TransitionConflict`
	/// if the job is not in a runnable state.
	async fn mark_running(&self, id: JobId, now: DateTime<Utc>) -> Result<()>;

	/// Record a finished run: bumps `run_count`, resets `retry_count`, sets
	/// the outcome fields computed by the lifecycle layer. Conditional on
	/// `status = running`.
	async fn complete_run(
		&self,
		id: JobId,
		status: JobStatus,
		last_error: Option<&str>,
		next_run_time: Option<DateTime<Utc>>,
		is_active: bool,
		now: DateTime<Utc>,
	) -> Result<()>;

	// Sweeper queries
	/// Jobs sitting in `running` whose `updated_at` is older than the
	/// threshold.
	async fn list_stuck_jobs(&self, now: DateTime<Utc>, threshold_minutes: u32)
		-> Result<Vec<Job>>;

	/// Stuck-job rescue: `running -> pending`, consuming one retry.
	async fn rescue_job(&self, id: JobId, now: DateTime<Utc>) -> Result<()>;

	/// Stuck-job exhaustion: `running -> failed`, deactivating the job and
	/// clearing `next_run_time` in the same update.
	async fn fail_job(&self, id: JobId, error: &str, now: DateTime<Utc>) -> Result<()>;

	// Sweep audit trail
	async fn record_sweep(&self, run: &SweepRun) -> Result<()>;
	async fn list_recent_sweeps(&self, limit: u32) -> Result<Vec<SweepRun>>;
}

/// SQLite implementation of the jobs repository.
#[derive(Clone)]
pub struct SqliteJobsRepository {
	pool: SqlitePool,
}

impl SqliteJobsRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}
}

#[async_trait]
impl JobsRepository for SqliteJobsRepository {
	#[instrument(skip(self, job), fields(job_id = %job.id, owner = %job.owner))]
	async fn create_job(&self, job: &Job) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO jobs (
				id, owner, name, description, status,
				schedule_type, schedule_time, interval_days, weekly_days, timezone,
				next_run_time, max_runs, run_count, retry_count,
				last_run_at, last_error, is_active, created_at, updated_at
			)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(job.id.0.to_string())
		.bind(&job.owner)
		.bind(&job.name)
		.bind(&job.description)
		.bind(job.status.to_string())
		.bind(job.schedule.as_ref().map(|s| s.schedule_type()))
		.bind(job.schedule.as_ref().map(|s| s.anchor().to_rfc3339()))
		.bind(
			job.schedule
				.as_ref()
				.and_then(|s| s.interval_days())
				.map(|d| d as i64),
		)
		.bind(job.schedule.as_ref().and_then(|s| s.weekly_days_column()))
		.bind(&job.timezone)
		.bind(job.next_run_time.map(|dt| dt.to_rfc3339()))
		.bind(job.max_runs.map(|m| m as i64))
		.bind(job.run_count as i64)
		.bind(job.retry_count as i64)
		.bind(job.last_run_at.map(|dt| dt.to_rfc3339()))
		.bind(&job.last_error)
		.bind(job.is_active)
		.bind(job.created_at.to_rfc3339())
		.bind(job.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self), fields(job_id = %id))]
	async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
		let row = sqlx::query_as::<_, JobRow>(&format!(
			"SELECT {} FROM jobs WHERE id = ?",
			JOB_COLUMNS
		))
		.bind(id.0.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(TryInto::try_into).transpose()
	}

	#[instrument(skip(self), fields(owner = %owner))]
	async fn list_jobs_for_owner(&self, owner: &str) -> Result<Vec<Job>> {
		let rows = sqlx::query_as::<_, JobRow>(&format!(
			"SELECT {} FROM jobs WHERE owner = ? ORDER BY created_at DESC",
			JOB_COLUMNS
		))
		.bind(owner)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self), fields(job_id = %id))]
	async fn delete_job(&self, id: JobId) -> Result<bool> {
		let result = sqlx::query("DELETE FROM jobs WHERE id = ?")
			.bind(id.0.to_string())
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}

	#[instrument(skip(self, schedule), fields(job_id = %id, schedule_type = schedule.schedule_type()))]
	async fn update_schedule(
		&self,
		id: JobId,
		schedule: &Schedule,
		timezone: &str,
		next_run_time: DateTime<Utc>,
		now: DateTime<Utc>,
	) -> Result<()> {
		let result = sqlx::query(
			r#"
			UPDATE jobs
			SET schedule_type = ?, schedule_time = ?, interval_days = ?, weekly_days = ?,
				timezone = ?, next_run_time = ?,
				status = 'pending', is_active = 1,
				run_count = 0, retry_count = 0, last_error = NULL,
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(schedule.schedule_type())
		.bind(schedule.anchor().to_rfc3339())
		.bind(schedule.interval_days().map(|d| d as i64))
		.bind(schedule.weekly_days_column())
		.bind(timezone)
		.bind(next_run_time.to_rfc3339())
		.bind(now.to_rfc3339())
		.bind(id.0.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(JobsServerError::JobNotFound);
		}
		Ok(())
	}

	#[instrument(skip(self), fields(job_id = %id))]
	async fn cancel_job(&self, id: JobId, now: DateTime<Utc>) -> Result<()> {
		let result = sqlx::query(
			r#"
			UPDATE jobs
			SET status = 'cancelled', is_active = 0, next_run_time = NULL, updated_at = ?
			WHERE id = ? AND status != 'cancelled'
			"#,
		)
		.bind(now.to_rfc3339())
		.bind(id.0.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(JobsServerError::TransitionConflict);
		}
		Ok(())
	}

	#[instrument(skip(self))]
	async fn list_due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<Job>> {
		let rows = sqlx::query_as::<_, JobRow>(&format!(
			r#"
			SELECT {}
			FROM jobs
			WHERE is_active = 1
			  AND next_run_time IS NOT NULL
			  AND datetime(next_run_time) <= datetime(?)
			  AND status NOT IN ('running', 'cancelled')
			ORDER BY next_run_time ASC
			"#,
			JOB_COLUMNS
		))
		.bind(now.to_rfc3339())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self), fields(job_id = %id))]
	async fn mark_running(&self, id: JobId, now: DateTime<Utc>) -> Result<()> {
		let result = sqlx::query(
			r#"
			UPDATE jobs
			SET status = 'running', updated_at = ?
			WHERE id = ? AND is_active = 1
			  AND status IN ('pending', 'completed', 'failed')
			"#,
		)
		.bind(now.to_rfc3339())
		.bind(id.0.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(JobsServerError::TransitionConflict);
		}
		Ok(())
	}

	#[instrument(skip(self, last_error), fields(job_id = %id, status = %status))]
	async fn complete_run(
		&self,
		id: JobId,
		status: JobStatus,
		last_error: Option<&str>,
		next_run_time: Option<DateTime<Utc>>,
		is_active: bool,
		now: DateTime<Utc>,
	) -> Result<()> {
		let result = sqlx::query(
			r#"
			UPDATE jobs
			SET status = ?,
				run_count = run_count + 1,
				retry_count = 0,
				last_run_at = ?,
				last_error = ?,
				next_run_time = ?,
				is_active = ?,
				updated_at = ?
			WHERE id = ? AND status = 'running'
			"#,
		)
		.bind(status.to_string())
		.bind(now.to_rfc3339())
		.bind(last_error)
		.bind(next_run_time.map(|dt| dt.to_rfc3339()))
		.bind(is_active)
		.bind(now.to_rfc3339())
		.bind(id.0.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(JobsServerError::TransitionConflict);
		}
		Ok(())
	}

	#[instrument(skip(self))]
	async fn list_stuck_jobs(
		&self,
		now: DateTime<Utc>,
		threshold_minutes: u32,
	) -> Result<Vec<Job>> {
		// A job is stuck when it has sat in `running` with no mutation for
		// longer than the threshold. SQLite lacks interval arithmetic, so
		// the comparison goes through datetime() with a minute offset.
		let rows = sqlx::query_as::<_, JobRow>(&format!(
			r#"
			SELECT {}
			FROM jobs
			WHERE status = 'running'
			  AND datetime(updated_at, '+' || ? || ' minutes') < datetime(?)
			ORDER BY updated_at ASC
			"#,
			JOB_COLUMNS
		))
		.bind(threshold_minutes as i64)
		.bind(now.to_rfc3339())
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}

	#[instrument(skip(self), fields(job_id = %id))]
	async fn rescue_job(&self, id: JobId, now: DateTime<Utc>) -> Result<()> {
		let result = sqlx::query(
			r#"
			UPDATE jobs
			SET status = 'pending', retry_count = retry_count + 1, updated_at = ?
			WHERE id = ? AND status = 'running'
			"#,
		)
		.bind(now.to_rfc3339())
		.bind(id.0.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(JobsServerError::TransitionConflict);
		}
		Ok(())
	}

	#[instrument(skip(self, error), fields(job_id = %id))]
	async fn fail_job(&self, id: JobId, error: &str, now: DateTime<Utc>) -> Result<()> {
		let result = sqlx::query(
			r#"
			UPDATE jobs
			SET status = 'failed', last_error = ?,
				is_active = 0, next_run_time = NULL,
				updated_at = ?
			WHERE id = ? AND status = 'running'
			"#,
		)
		.bind(error)
		.bind(now.to_rfc3339())
		.bind(id.0.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(JobsServerError::TransitionConflict);
		}
		Ok(())
	}

	#[instrument(skip(self, run), fields(sweep_id = %run.id))]
	async fn record_sweep(&self, run: &SweepRun) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO sweep_runs (
				id, started_at, finished_at,
				processed, rescued, failed, error_count,
				outcome, error_message
			)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(run.id.0.to_string())
		.bind(run.started_at.to_rfc3339())
		.bind(run.finished_at.to_rfc3339())
		.bind(run.processed as i64)
		.bind(run.rescued as i64)
		.bind(run.failed as i64)
		.bind(run.error_count as i64)
		.bind(run.outcome.to_string())
		.bind(&run.error_message)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[instrument(skip(self))]
	async fn list_recent_sweeps(&self, limit: u32) -> Result<Vec<SweepRun>> {
		let rows = sqlx::query_as::<_, SweepRunRow>(
			r#"
			SELECT id, started_at, finished_at,
				   processed, rescued, failed, error_count,
				   outcome, error_message
			FROM sweep_runs
			ORDER BY started_at DESC
			LIMIT ?
			"#,
		)
		.bind(limit as i64)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(TryInto::try_into).collect()
	}
}

// Database row types for sqlx

#[derive(sqlx::FromRow)]
struct JobRow {
	id: String,
	owner: String,
	name: String,
	description: Option<String>,
	status: String,
	schedule_type: Option<String>,
	schedule_time: Option<String>,
	interval_days: Option<i64>,
	weekly_days: Option<String>,
	timezone: String,
	next_run_time: Option<String>,
	max_runs: Option<i64>,
	run_count: i64,
	retry_count: i64,
	last_run_at: Option<String>,
	last_error: Option<String>,
	is_active: bool,
	created_at: String,
	updated_at: String,
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|_| JobsServerError::Internal(format!("invalid {} timestamp", column)))
}

impl TryFrom<JobRow> for Job {
	type Error = JobsServerError;

	fn try_from(row: JobRow) -> Result<Self> {
		let schedule = match (row.schedule_type.as_deref(), row.schedule_time.as_deref()) {
			(None, _) => None,
			(Some(schedule_type), None) => {
				return Err(JobsServerError::Schedule(JobsError::MissingAnchor(
					schedule_type.to_string(),
				)))
			}
			(Some(schedule_type), Some(schedule_time)) => Some(Schedule::from_parts(
				schedule_type,
				parse_timestamp(schedule_time, "schedule_time")?,
				row.interval_days,
				row.weekly_days.as_deref(),
			)?),
		};

		Ok(Job {
			id: row
				.id
				.parse()
				.map_err(|_| JobsServerError::Internal("invalid job id".to_string()))?,
			owner: row.owner,
			name: row.name,
			description: row.description,
			status: row
				.status
				.parse()
				.map_err(|_| JobsServerError::Internal("invalid job status".to_string()))?,
			schedule,
			timezone: row.timezone,
			next_run_time: row
				.next_run_time
				.as_deref()
				.map(|s| parse_timestamp(s, "next_run_time"))
				.transpose()?,
			max_runs: row.max_runs.map(|m| m as u32),
			run_count: row.run_count as u32,
			retry_count: row.retry_count as u32,
			last_run_at: row
				.last_run_at
				.as_deref()
				.map(|s| parse_timestamp(s, "last_run_at"))
				.transpose()?,
			last_error: row.last_error,
			is_active: row.is_active,
			created_at: parse_timestamp(&row.created_at, "created_at")?,
			updated_at: parse_timestamp(&row.updated_at, "updated_at")?,
		})
	}
}

#[derive(sqlx::FromRow)]
struct SweepRunRow {
	id: String,
	started_at: String,
	finished_at: String,
	processed: i64,
	rescued: i64,
	failed: i64,
	error_count: i64,
	outcome: String,
	error_message: Option<String>,
}

impl TryFrom<SweepRunRow> for SweepRun {
	type Error = JobsServerError;

	fn try_from(row: SweepRunRow) -> Result<Self> {
		Ok(SweepRun {
			id: row
				.id
				.parse()
				.map_err(|_| JobsServerError::Internal("invalid sweep run id".to_string()))?,
			started_at: parse_timestamp(&row.started_at, "started_at")?,
			finished_at: parse_timestamp(&row.finished_at, "finished_at")?,
			processed: row.processed as u32,
			rescued: row.rescued as u32,
			failed: row.failed as u32,
			error_count: row.error_count as u32,
			outcome: row
				.outcome
				.parse()
				.map_err(|_| JobsServerError::Internal("invalid sweep outcome".to_string()))?,
			error_message: row.error_message,
		})
	}
}

#[cfg(test)]
pub(crate) mod testing {
	use super::*;
	use chrono::TimeZone;

	pub async fn setup_pool() -> SqlitePool {
		let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
		crate::schema::apply(&pool).await.unwrap();
		pool
	}

	pub fn sample_job(owner: &str, name: &str) -> Job {
		let now = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
		let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
		Job {
			id: JobId::new(),
			owner: owner.to_string(),
			name: name.to_string(),
			description: None,
			status: JobStatus::Pending,
			schedule: Some(Schedule::Daily { anchor }),
			timezone: "UTC".to_string(),
			next_run_time: Some(anchor),
			max_runs: None,
			run_count: 0,
			retry_count: 0,
			last_run_at: None,
			last_error: None,
			is_active: true,
			created_at: now,
			updated_at: now,
		}
	}
}
