//! Fuzz target: `Scheduler` operation sequences
//!
//! Interprets the input as a stream of 3-byte ops (schedule / cancel /
//! tick) against a scheduler and checks:
//! - No panics, including on a full job table
//! - The table never exceeds `MAX_JOBS`
//! - After a tick, no job is left due at or before that instant
//!
//! cargo fuzz run fuzz_scheduler_ops

#![no_main]

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use growbox::scheduler::{JobRunner, MAX_JOBS, Scheduler, Tag, Trigger};
use libfuzzer_sys::fuzz_target;

const TAGS: [Tag; 6] = [
    Tag::Light,
    Tag::LightUpdate,
    Tag::LightRetry,
    Tag::PumpOn,
    Tag::PumpOff,
    Tag::Measurement,
];

/// Runner whose actions may cancel a tag or schedule a follow-up.
struct Chaos;

impl JobRunner<u8> for Chaos {
    fn fire(&mut self, action: &u8, now: NaiveDateTime, sched: &mut Scheduler<u8>) -> growbox::Result<()> {
        let tag = TAGS[usize::from(*action) % TAGS.len()];
        match action % 3 {
            0 => {
                sched.cancel_tag(tag);
            }
            1 => {
                sched.schedule(tag, Trigger::After(Duration::minutes(5)), *action, now)?;
            }
            _ => {}
        }
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let Some(start) = NaiveDate::from_ymd_opt(2024, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0)) else {
        return;
    };
    let mut now = start;
    let mut sched: Scheduler<u8> = Scheduler::new();

    for op in data.chunks_exact(3) {
        let (kind, a, b) = (op[0], op[1], op[2]);
        let tag = TAGS[usize::from(a) % TAGS.len()];
        match kind % 5 {
            0 => {
                let period = Duration::minutes(i64::from(b));
                let _ = sched.schedule(tag, Trigger::Every(period), a, now);
            }
            1 => {
                let _ = sched.schedule(tag, Trigger::After(Duration::minutes(i64::from(b))), a, now);
            }
            2 => {
                let at = NaiveTime::from_num_seconds_from_midnight_opt(u32::from(b) * 337, 0)
                    .unwrap_or_default();
                let _ = sched.schedule(tag, Trigger::DailyAt(at), a, now);
            }
            3 => {
                sched.cancel_tag(tag);
            }
            _ => {
                now += Duration::minutes(i64::from(a) * i64::from(b));
                sched.run_pending(now, &mut Chaos);
                assert!(sched.jobs().all(|j| j.next_run() > now));
            }
        }
        assert!(sched.len() <= MAX_JOBS);
    }
});
