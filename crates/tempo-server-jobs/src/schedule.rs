// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Next run time calculation for job schedules.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use tempo_jobs_core::{JobsError, Result, Schedule};

/// Calculate the next run time for a schedule.
///
/// All wall-clock arithmetic (time-of-day, day-of-week) happens in the
/// given IANA timezone; the returned instant is UTC so storage and
/// comparison stay timezone-independent.
///
/// # Arguments
///
/// * `schedule` - The job's recurrence specification
/// * `timezone` - IANA timezone string (e.g., "America/New_York", "UTC")
/// * `now` - The instant to calculate from (injected for determinism)
///
/// # Returns
///
/// An instant strictly after `now`, except for `once` schedules where the
/// anchor is returned unchanged even when it lies in the past — the caller
/// decides whether a past-dated one-shot means "run immediately".
///
/// # Errors
///
/// Returns an error if:
/// - The timezone string is invalid
/// - A weekly schedule has no weekdays selected
/// - A custom schedule has a non-positive interval
pub fn compute_next_run_time(
	schedule: &Schedule,
	timezone: &str,
	now: DateTime<Utc>,
) -> Result<DateTime<Utc>> {
	schedule.validate()?;

	let tz: Tz = timezone
		.parse()
		.map_err(|_| JobsError::InvalidTimezone(timezone.to_string()))?;

	match schedule {
		Schedule::Once { at } => Ok(*at),
		Schedule::Daily { anchor } => {
			let fire_time = anchor.with_timezone(&tz).time();
			let today = now.with_timezone(&tz).date_naive();

			let candidate = resolve_local(&tz, today, fire_time);
			if candidate > now {
				Ok(candidate)
			} else {
				Ok(resolve_local(&tz, today + Duration::days(1), fire_time))
			}
		}
		Schedule::Weekly { anchor, days } => {
			let fire_time = anchor.with_timezone(&tz).time();
			let today = now.with_timezone(&tz).date_naive();

			// Walk forward one day at a time; offset 7 covers the case where
			// today is the only selected weekday and its slot already passed.
			for offset in 0..=7 {
				let date = today + Duration::days(offset);
				if !days.iter().any(|d| d.to_chrono() == date.weekday()) {
					continue;
				}
				let candidate = resolve_local(&tz, date, fire_time);
				if candidate > now {
					return Ok(candidate);
				}
			}

			Err(JobsError::Internal(format!(
				"no weekly slot within 8 days of {} in timezone {}",
				now, timezone
			)))
		}
		Schedule::Custom {
			anchor,
			interval_days,
		} => {
			let fire_time = anchor.with_timezone(&tz).time();
			let today = now.with_timezone(&tz).date_naive();
			Ok(resolve_local(
				&tz,
				today + Duration::days(*interval_days as i64),
				fire_time,
			))
		}
	}
}

/// Resolve a local wall-clock date + time to a UTC instant.
///
/// DST policy: an ambiguous local time (clocks fell back) resolves to its
/// earliest occurrence; a nonexistent local time (clocks sprang forward)
/// rolls forward an hour at a time until it lands on a valid instant.
fn resolve_local(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
	let mut naive = date.and_time(time);
	for _ in 0..4 {
		match tz.from_local_datetime(&naive) {
			LocalResult::Single(dt) => return dt.with_timezone(&Utc),
			LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
			LocalResult::None => naive = naive + Duration::hours(1),
		}
	}
	// No tz database gap exceeds a few hours.
	Utc.from_utc_datetime(&naive)
}
