//! Scheduled actions.
//!
//! Each job in the [`Scheduler`](crate::scheduler::Scheduler) carries one
//! of these.  The controller's runner interprets them against the cycle
//! managers and ports when the job comes due.

/// What a job does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Switch the grow light on.
    LightOn,

    /// Switch the grow light off.
    LightOff,

    /// Recompute the light window from today's sun times.
    RefreshLight,

    /// Start a pump burst and arm its off-timer.
    PumpOn,

    /// End the pump burst.
    PumpOff,

    /// Sample the environmental probes.
    Measure,
}
