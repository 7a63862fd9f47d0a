//! Tag-addressable job scheduler.
//!
//! The scheduler owns a fixed-capacity table of pending jobs.  Each job
//! carries a [`Tag`] for bulk cancellation, an immutable [`Trigger`], and
//! an action value.  The scheduler never interprets actions itself: when a
//! job comes due it hands the action to a [`JobRunner`], the same way the
//! control loop is notified through a delegate rather than the scheduler
//! reaching into the rest of the system.
//!
//! ```text
//!  schedule(tag, trigger, action) ──▶ ┌──────────────────────────┐
//!  cancel_tag(tag)                ──▶ │   job table (≤ MAX_JOBS) │
//!                                     └────────────┬─────────────┘
//!                                                  │ run_pending(now)
//!                                                  ▼
//!                              JobRunner::fire(action, now, &mut scheduler)
//!                                                  │ Err(e)
//!                                                  ▼
//!                              JobRunner::job_failed(id, tag, &e)
//! ```
//!
//! ## Rules
//!
//! - Due jobs are snapshotted at the start of [`Scheduler::run_pending`].
//!   Jobs added by an action during the tick wait for the next call;
//!   jobs cancelled by an earlier action in the same tick are skipped.
//! - Recurring jobs advance from their previous trigger instant, never
//!   from `now`.  Periods missed entirely (clock jump, long stall) collapse
//!   into a single firing and the job stays on its original grid.
//! - A failing action is reported to the runner and never aborts the tick.

use core::fmt;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use heapless::Vec;
use log::{debug, info, warn};

use crate::error::{Error, Result, SchedulerError};

/// Maximum number of pending jobs (stack-allocated).
pub const MAX_JOBS: usize = 16;

// ═══════════════════════════════════════════════════════════════
//  Job types
// ═══════════════════════════════════════════════════════════════

/// Category label grouping related jobs for bulk cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Daily light-on / light-off pair.
    Light,
    /// Nightly light-window refresh.
    LightUpdate,
    /// One-shot retry after a failed refresh.
    LightRetry,
    /// Recurring pump burst.
    PumpOn,
    /// The single pending pump-off deadline.
    PumpOff,
    /// Periodic sensor sampling.
    Measurement,
}

impl Tag {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light_task",
            Self::LightUpdate => "light_update_task",
            Self::LightRetry => "light_retry_task",
            Self::PumpOn => "pump_on_task",
            Self::PumpOff => "pump_off_task",
            Self::Measurement => "measurement_task",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Every day at the given wall-clock time.
    DailyAt(NaiveTime),
    /// Repeatedly, every `period` after scheduling.
    Every(Duration),
    /// Once, `delay` after scheduling.
    After(Duration),
}

impl Trigger {
    /// Distance between consecutive firings, `None` for one-shots.
    fn period(&self) -> Option<Duration> {
        match self {
            Self::DailyAt(_) => Some(Duration::days(1)),
            Self::Every(period) => Some(*period),
            Self::After(_) => None,
        }
    }

    /// First firing instant for a job registered at `now`.  A daily time
    /// equal to `now` counts as already passed.
    fn first_run(&self, now: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::DailyAt(at) => {
                let today = now.date().and_time(*at);
                if today > now {
                    today
                } else {
                    today + Duration::days(1)
                }
            }
            Self::Every(period) => now + *period,
            Self::After(delay) => now + (*delay).max(Duration::zero()),
        }
    }
}

/// Opaque handle returned by [`Scheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u32);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A pending job.  The trigger is fixed at registration; only the
/// derived `next_run` moves.
#[derive(Debug, Clone)]
pub struct Job<A> {
    id: JobId,
    tag: Tag,
    trigger: Trigger,
    action: A,
    next_run: NaiveDateTime,
}

impl<A> Job<A> {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }
}

// ═══════════════════════════════════════════════════════════════
//  Runner (delegate)
// ═══════════════════════════════════════════════════════════════

/// Executes actions on behalf of the scheduler.
///
/// `fire` receives the scheduler itself so that an action can schedule or
/// cancel jobs (e.g. a pump-on firing arms the pump-off deadline).
pub trait JobRunner<A> {
    fn fire(&mut self, action: &A, now: NaiveDateTime, sched: &mut Scheduler<A>) -> Result<()>;

    /// Called after `fire` returned an error.  The tick continues.
    fn job_failed(&mut self, id: JobId, tag: Tag, error: &Error) {
        log::error!("Scheduler: job {} ({}) failed: {}", id, tag, error);
    }
}

/// Outcome of one [`Scheduler::run_pending`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Jobs whose action was invoked (including failures).
    pub fired: usize,
    /// Jobs whose action returned an error.
    pub failed: usize,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

pub struct Scheduler<A> {
    /// Pending jobs in insertion order.
    jobs: Vec<Job<A>, MAX_JOBS>,
    next_id: u32,
}

impl<A: Clone> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Clone> Scheduler<A> {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            next_id: 1,
        }
    }

    /// Register a job.  Its first firing is derived from `now`.
    pub fn schedule(
        &mut self,
        tag: Tag,
        trigger: Trigger,
        action: A,
        now: NaiveDateTime,
    ) -> core::result::Result<JobId, SchedulerError> {
        if let Trigger::Every(period) = trigger {
            if period <= Duration::zero() {
                return Err(SchedulerError::InvalidPeriod);
            }
        }

        let id = JobId(self.next_id);
        let next_run = trigger.first_run(now);
        let job = Job {
            id,
            tag,
            trigger,
            action,
            next_run,
        };
        if self.jobs.push(job).is_err() {
            warn!("Scheduler: table full, rejected {} job", tag);
            return Err(SchedulerError::Full);
        }
        self.next_id = self.next_id.wrapping_add(1);
        info!("Scheduler: added {} {} ({:?}), next run {}", tag, id, trigger, next_run);
        Ok(id)
    }

    /// Remove every job carrying `tag`.  Returns how many were removed;
    /// zero is not an error.
    pub fn cancel_tag(&mut self, tag: Tag) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|job| job.tag != tag);
        let removed = before - self.jobs.len();
        if removed > 0 {
            info!("Scheduler: cancelled {} {} job(s)", removed, tag);
        }
        removed
    }

    /// Remove a single job.  Returns `false` if it was already gone.
    pub fn cancel(&mut self, id: JobId) -> bool {
        match self.jobs.iter().position(|job| job.id == id) {
            Some(idx) => {
                let job = self.jobs.remove(idx);
                info!("Scheduler: cancelled {} {}", job.tag, id);
                true
            }
            None => false,
        }
    }

    /// Drop every pending job.
    pub fn clear(&mut self) {
        if !self.jobs.is_empty() {
            info!("Scheduler: cleared {} job(s)", self.jobs.len());
        }
        self.jobs.clear();
    }

    /// Fire every job whose trigger is at or before `now`.
    ///
    /// Due jobs run in order of their trigger instant, ties broken by
    /// insertion order.
    pub fn run_pending<R>(&mut self, now: NaiveDateTime, runner: &mut R) -> TickReport
    where
        R: JobRunner<A> + ?Sized,
    {
        let mut due: Vec<(NaiveDateTime, usize, JobId), MAX_JOBS> = Vec::new();
        for (seq, job) in self.jobs.iter().enumerate() {
            if job.next_run <= now {
                // Capacity matches the job table, so this cannot overflow.
                let _ = due.push((job.next_run, seq, job.id));
            }
        }
        due.sort_unstable_by_key(|&(at, seq, _)| (at, seq));

        let mut report = TickReport::default();
        for (_, _, id) in due {
            let Some(idx) = self.jobs.iter().position(|job| job.id == id) else {
                debug!("Scheduler: job {} cancelled earlier in this tick", id);
                continue;
            };

            let (tag, action) = match self.jobs[idx].trigger.period() {
                Some(period) => {
                    let job = &mut self.jobs[idx];
                    job.next_run = advance(job.next_run, period, now);
                    (job.tag, job.action.clone())
                }
                None => {
                    let job = self.jobs.remove(idx);
                    (job.tag, job.action)
                }
            };

            debug!("Scheduler: firing {} {}", tag, id);
            report.fired += 1;
            if let Err(e) = runner.fire(&action, now, self) {
                report.failed += 1;
                warn!("Scheduler: {} {} raised: {}", tag, id, e);
                runner.job_failed(id, tag, &e);
            }
        }
        report
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of jobs carrying `tag`.
    pub fn count(&self, tag: Tag) -> usize {
        self.jobs.iter().filter(|job| job.tag == tag).count()
    }

    /// Jobs carrying `tag`, in insertion order.
    pub fn tagged(&self, tag: Tag) -> impl Iterator<Item = &Job<A>> {
        self.jobs.iter().filter(move |job| job.tag == tag)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job<A>> {
        self.jobs.iter()
    }

    /// Earliest pending trigger instant across all jobs.
    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.jobs.iter().map(|job| job.next_run).min()
    }
}

/// Next trigger after `prev`: one period later, or the first grid point
/// after `now` if whole periods were missed.
fn advance(prev: NaiveDateTime, period: Duration, now: NaiveDateTime) -> NaiveDateTime {
    let next = prev + period;
    if next > now {
        return next;
    }
    let period_ms = period.num_milliseconds().max(1);
    let missed = (now - next).num_milliseconds() / period_ms + 1;
    next + Duration::milliseconds(missed * period_ms)
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
