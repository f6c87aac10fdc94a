// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stuck-job detection and recovery.
//!
//! A job whose runner crashed or hung stays in `running` forever on its
//! own. The sweeper periodically finds jobs whose `updated_at` went stale
//! in that state and either rescues them back to `pending` or, once the
//! retry ceiling is spent, marks them permanently `failed`.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use tempo_jobs_core::{
	StuckJobInfo, SweepError, SweepOutcome, SweepReport, SweepRun, SweepRunId,
};

use crate::error::Result;
use crate::repository::JobsRepository;

/// Tunables for the sweeper. All externally configurable; the defaults
/// match a five-minute sweep cadence.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
	/// How long a job may sit in `running` without progress before it
	/// counts as stuck.
	pub stuck_threshold_minutes: u32,
	/// Cadence of the background sweep loop.
	pub sweep_interval_secs: u64,
	/// Sweeps attempted closer together than this are skipped.
	pub min_sweep_interval_secs: u64,
	/// Delay before the first sweep after process startup.
	pub initial_delay_secs: u64,
	/// Rescue attempts per job before it is failed permanently.
	pub max_retries: u32,
}

impl Default for SweeperConfig {
	fn default() -> Self {
		Self {
			stuck_threshold_minutes: 10,
			sweep_interval_secs: 300,
			min_sweep_interval_secs: 120,
			initial_delay_secs: 30,
			max_retries: 3,
		}
	}
}

/// Background service that rescues or fails stuck jobs.
///
/// Constructed once at process start and driven by an explicit `start()`
/// call; nothing happens as a side effect of construction. The overlap
/// guard is in-memory and therefore per-process: a deployment running
/// several instances against one database relies on the repository's
/// conditional writes, not on this guard.
pub struct StuckJobSweeper {
	repository: Arc<dyn JobsRepository>,
	config: SweeperConfig,
	is_running: AtomicBool,
	last_attempt_at: Mutex<Option<DateTime<Utc>>>,
	shutdown_tx: broadcast::Sender<()>,
	handle: Mutex<Option<JoinHandle<()>>>,
}

impl StuckJobSweeper {
	pub fn new(repository: Arc<dyn JobsRepository>, config: SweeperConfig) -> Self {
		let (shutdown_tx, _) = broadcast::channel(1);
		Self {
			repository,
			config,
			is_running: AtomicBool::new(false),
			last_attempt_at: Mutex::new(None),
			shutdown_tx,
			handle: Mutex::new(None),
		}
	}

	/// Start the background sweep loop: one delayed initial sweep, then a
	/// fixed-interval cadence until `stop()`.
	#[instrument(skip(self))]
	pub async fn start(self: Arc<Self>) {
		let sweeper = Arc::clone(&self);
		let mut shutdown_rx = self.shutdown_tx.subscribe();
		let initial_delay = Duration::from_secs(self.config.initial_delay_secs);
		let interval = Duration::from_secs(self.config.sweep_interval_secs);

		let handle = tokio::spawn(async move {
			tokio::select! {
				_ = tokio::time::sleep(initial_delay) => {}
				_ = shutdown_rx.recv() => {
					info!("Shutting down stuck job sweeper before first sweep");
					return;
				}
			}

			loop {
				if let Err(e) = sweeper.run_sweep().await {
					warn!(error = %e, "Scheduled stuck job sweep failed");
				}

				tokio::select! {
					_ = tokio::time::sleep(interval) => {}
					_ = shutdown_rx.recv() => {
						info!("Shutting down stuck job sweeper");
						break;
					}
				}
			}
		});

		*self.handle.lock().await = Some(handle);
		info!(
			sweep_interval_secs = self.config.sweep_interval_secs,
			stuck_threshold_minutes = self.config.stuck_threshold_minutes,
			"Stuck job sweeper started"
		);
	}

	/// Stop the background loop and wait for it to finish.
	#[instrument(skip(self))]
	pub async fn stop(&self) {
		let _ = self.shutdown_tx.send(());
		if let Some(handle) = self.handle.lock().await.take() {
			let _ = handle.await;
		}
	}

	/// When the sweeper last attempted a sweep (including guarded skips
	/// that advanced the clock after a store failure).
	pub async fn last_attempt_at(&self) -> Option<DateTime<Utc>> {
		*self.last_attempt_at.lock().await
	}

	/// Run one sweep now.
	///
	/// Returns `Ok(None)` without touching the store when another sweep is
	/// already in flight or the previous attempt was too recent — callers
	/// triggering sweeps faster than `min_sweep_interval_secs` are no-ops,
	/// not queued. Per-job store failures ride in the report's error list;
	/// only a total store failure surfaces as `Err`.
	#[instrument(skip(self))]
	pub async fn run_sweep(&self) -> Result<Option<SweepReport>> {
		if self
			.is_running
			.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
			.is_err()
		{
			debug!("Sweep already in progress, skipping");
			return Ok(None);
		}

		let result = self.sweep(Utc::now()).await;
		self.is_running.store(false, Ordering::SeqCst);
		result
	}

	async fn sweep(&self, started_at: DateTime<Utc>) -> Result<Option<SweepReport>> {
		{
			let mut last_attempt = self.last_attempt_at.lock().await;
			if let Some(last) = *last_attempt {
				let min_interval =
					ChronoDuration::seconds(self.config.min_sweep_interval_secs as i64);
				if started_at - last < min_interval {
					debug!(last_attempt = %last, "Sweep attempted too soon after the last one, skipping");
					return Ok(None);
				}
			}
			// Advanced before the store round trip so a transient outage
			// cannot turn into a retry storm on recovery.
			*last_attempt = Some(started_at);
		}

		let stuck = match self
			.repository
			.list_stuck_jobs(started_at, self.config.stuck_threshold_minutes)
			.await
		{
			Ok(jobs) => jobs,
			Err(e) => {
				error!(error = %e, "Stuck job sweep could not query the job store");
				self.record_failed_sweep(started_at, &e.to_string()).await;
				return Err(e);
			}
		};

		let mut report = SweepReport::default();
		for job in stuck {
			let minutes_stuck = (started_at - job.updated_at).num_minutes();
			report.stuck_jobs.push(StuckJobInfo {
				id: job.id,
				owner: job.owner.clone(),
				name: job.name.clone(),
				status: job.status,
				minutes_stuck,
			});
			report.processed += 1;

			let outcome = if job.retry_count < self.config.max_retries {
				self.repository
					.rescue_job(job.id, started_at)
					.await
					.map(|()| {
						report.rescued += 1;
						info!(
							job_id = %job.id,
							owner = %job.owner,
							minutes_stuck,
							retry_count = job.retry_count + 1,
							"Rescued stuck job"
						);
					})
			} else {
				let annotation = format!(
					"abandoned while running; gave up after {} rescue attempts",
					job.retry_count
				);
				self.repository
					.fail_job(job.id, &annotation, started_at)
					.await
					.map(|()| {
						report.failed += 1;
						warn!(
							job_id = %job.id,
							owner = %job.owner,
							minutes_stuck,
							retry_count = job.retry_count,
							"Stuck job exhausted its retries, marked failed"
						);
					})
			};

			if let Err(e) = outcome {
				warn!(job_id = %job.id, error = %e, "Failed to transition stuck job");
				report.errors.push(SweepError {
					job_id: job.id,
					message: e.to_string(),
				});
			}
		}

		if report.processed > 0 {
			info!(
				processed = report.processed,
				rescued = report.rescued,
				failed = report.failed,
				errors = report.errors.len(),
				"Stuck job sweep completed"
			);
		}

		self.record_completed_sweep(started_at, &report).await;
		Ok(Some(report))
	}

	async fn record_completed_sweep(&self, started_at: DateTime<Utc>, report: &SweepReport) {
		let run = SweepRun {
			id: SweepRunId::new(),
			started_at,
			finished_at: Utc::now(),
			processed: report.processed,
			rescued: report.rescued,
			failed: report.failed,
			error_count: report.errors.len() as u32,
			outcome: SweepOutcome::Completed,
			error_message: None,
		};
		if let Err(e) = self.repository.record_sweep(&run).await {
			warn!(error = %e, "Failed to record sweep in audit trail");
		}
	}

	async fn record_failed_sweep(&self, started_at: DateTime<Utc>, message: &str) {
		let run = SweepRun {
			id: SweepRunId::new(),
			started_at,
			finished_at: Utc::now(),
			processed: 0,
			rescued: 0,
			failed: 0,
			error_count: 0,
			outcome: SweepOutcome::Failed,
			error_message: Some(message.to_string()),
		};
		if let Err(e) = self.repository.record_sweep(&run).await {
			warn!(error = %e, "Failed to record failed sweep in audit trail");
		}
	}
}
