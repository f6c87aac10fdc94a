// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Run lifecycle transitions: what happens to a job's scheduling state
//! after the runner reports an outcome.

use chrono::{DateTime, Utc};
use tracing::instrument;

use tempo_jobs_core::{Job, JobStatus, Schedule};

use crate::error::Result;
use crate::repository::JobsRepository;
use crate::schedule::compute_next_run_time;

/// Outcome the runner reports for a finished execution.
#[derive(Debug, Clone)]
pub enum RunOutcome {
	Completed,
	Failed { message: String },
}

/// Record a finished run and advance the job's schedule.
///
/// Increments `run_count`, stamps `last_run_at`, and then decides the job's
/// future: a `once` job (or an unscheduled one, or one that just hit its
/// `max_runs` cap) is deactivated with `next_run_time` cleared in the same
/// update; a recurring job gets a fresh `next_run_time` from the
/// calculator. A failed run does not stop the recurrence — only the
/// sweeper's retry ceiling or the run cap can do that.
///
/// Returns the new `next_run_time`, if any.
#[instrument(skip(repository, job, outcome), fields(job_id = %job.id))]
pub async fn finish_run(
	repository: &dyn JobsRepository,
	job: &Job,
	outcome: RunOutcome,
	now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>> {
	let (status, last_error) = match &outcome {
		RunOutcome::Completed => (JobStatus::Completed, None),
		RunOutcome::Failed { message } => (JobStatus::Failed, Some(message.as_str())),
	};

	let runs_after = job.run_count + 1;
	let cap_reached = job.max_runs.is_some_and(|max| runs_after >= max);

	let next_run_time = match &job.schedule {
		Some(schedule) if !cap_reached && !matches!(schedule, Schedule::Once { .. }) => {
			Some(compute_next_run_time(schedule, &job.timezone, now)?)
		}
		_ => None,
	};

	let is_active = next_run_time.is_some();
	repository
		.complete_run(job.id, status, last_error, next_run_time, is_active, now)
		.await?;

	Ok(next_run_time)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::repository::testing::{sample_job, setup_pool};
	use crate::repository::SqliteJobsRepository;
	use chrono::TimeZone;
	use tempo_jobs_core::JobId;

	#[tokio::test]
	async fn daily_job_reschedules_for_next_day() {
		// The end-to-end scenario: a daily 09:00 UTC job created at 08:00
		// gets 09:00 today; after completing at 09:00:01 it gets 09:00
		// tomorrow.
		let repo = SqliteJobsRepository::new(setup_pool().await);
		let anchor = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
		let created = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();

		let mut job = sample_job("0xaaa", "daily digest");
		job.schedule = Some(Schedule::Daily { anchor });
		job.next_run_time = Some(
			compute_next_run_time(job.schedule.as_ref().unwrap(), "UTC", created).unwrap(),
		);
		assert_eq!(job.next_run_time, Some(anchor));
		repo.create_job(&job).await.unwrap();

		let ran_at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 1).unwrap();
		repo.mark_running(job.id, ran_at).await.unwrap();
		let next = finish_run(&repo, &job, RunOutcome::Completed, ran_at)
			.await
			.unwrap();

		assert_eq!(next, Some(Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 0).unwrap()));
		let loaded = repo.get_job(job.id).await.unwrap().unwrap();
		assert_eq!(loaded.status, JobStatus::Completed);
		assert_eq!(loaded.run_count, 1);
		assert_eq!(loaded.next_run_time, next);
		assert!(loaded.is_active);
	}

	#[tokio::test]
	async fn once_job_deactivates_after_its_run() {
		let repo = SqliteJobsRepository::new(setup_pool().await);
		let at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

		let mut job = sample_job("0xaaa", "one shot");
		job.schedule = Some(Schedule::Once { at });
		job.next_run_time = Some(at);
		repo.create_job(&job).await.unwrap();

		let ran_at = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 5).unwrap();
		repo.mark_running(job.id, ran_at).await.unwrap();
		let next = finish_run(&repo, &job, RunOutcome::Completed, ran_at)
			.await
			.unwrap();

		assert_eq!(next, None);
		let loaded = repo.get_job(job.id).await.unwrap().unwrap();
		assert!(!loaded.is_active);
		assert_eq!(loaded.next_run_time, None);
	}

	#[tokio::test]
	async fn run_cap_deactivates_in_the_same_update() {
		let repo = SqliteJobsRepository::new(setup_pool().await);

		let mut job = sample_job("0xaaa", "capped");
		job.max_runs = Some(2);
		job.run_count = 1;
		repo.create_job(&job).await.unwrap();

		let ran_at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 1).unwrap();
		repo.mark_running(job.id, ran_at).await.unwrap();
		let next = finish_run(&repo, &job, RunOutcome::Completed, ran_at)
			.await
			.unwrap();

		assert_eq!(next, None);
		let loaded = repo.get_job(job.id).await.unwrap().unwrap();
		assert_eq!(loaded.run_count, 2);
		assert!(!loaded.is_active);
		assert_eq!(loaded.next_run_time, None);
	}

	#[tokio::test]
	async fn failed_run_keeps_the_recurrence() {
		let repo = SqliteJobsRepository::new(setup_pool().await);

		let job = sample_job("0xaaa", "flaky");
		repo.create_job(&job).await.unwrap();

		let ran_at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 1).unwrap();
		repo.mark_running(job.id, ran_at).await.unwrap();
		let next = finish_run(
			&repo,
			&job,
			RunOutcome::Failed {
				message: "upstream timeout".to_string(),
			},
			ran_at,
		)
		.await
		.unwrap();

		assert!(next.is_some());
		let loaded = repo.get_job(job.id).await.unwrap().unwrap();
		assert_eq!(loaded.status, JobStatus::Failed);
		assert_eq!(loaded.last_error.as_deref(), Some("upstream timeout"));
		assert!(loaded.is_active);
	}

	#[tokio::test]
	async fn finish_run_requires_running_status() {
		let repo = SqliteJobsRepository::new(setup_pool().await);
		let job = sample_job("0xaaa", "idle");
		repo.create_job(&job).await.unwrap();

		let ran_at = Utc.with_ymd_and_hms(2024, 1, 2, 9, 0, 1).unwrap();
		let err = finish_run(&repo, &job, RunOutcome::Completed, ran_at)
			.await
			.unwrap_err();
		assert!(matches!(err, crate::error::JobsServerError::TransitionConflict));

		// And an unknown id surfaces the same way: the conditional write
		// matched nothing.
		let mut ghost = sample_job("0xaaa", "ghost");
		ghost.id = JobId::new();
		let err = finish_run(&repo, &ghost, RunOutcome::Completed, ran_at)
			.await
			.unwrap_err();
		assert!(matches!(err, crate::error::JobsServerError::TransitionConflict));
	}
}
