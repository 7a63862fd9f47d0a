//! Integration tests for controller startup: window computation, the
//! optional output self-test, and light reconciliation.

use chrono::Duration;

use growbox::app::events::GrowEvent;
use growbox::app::ports::{Level, Output};
use growbox::app::service::{ControlState, Controller};
use growbox::error::LookupError;
use growbox::scheduler::Tag;

use crate::mock_hw::{HwCall, MockHardware, MockSky, SimClock, hm, june, rig, test_config};

// ── Reconciliation ────────────────────────────────────────────

#[test]
fn start_inside_window_turns_light_on_before_any_job() {
    let clock = SimClock::at(june(21, 22, 0));
    let mut rig = rig(MockHardware::new(), MockSky::new());
    let mut c = Controller::new(test_config());

    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();

    assert_eq!(c.state(), ControlState::Running);
    assert_eq!(rig.hw.level(Output::Light), Level::On);
    assert!(c.light().is_lit());

    let updated = GrowEvent::SunTimesUpdated {
        on: hm(18, 0),
        off: hm(8, 0),
    };
    let events = &rig.sink.events;
    assert_eq!(
        events.as_slice(),
        [updated, GrowEvent::ProgramStarted, GrowEvent::LightsOn]
    );
}

#[test]
fn start_after_midnight_inside_straddling_window() {
    let clock = SimClock::at(june(21, 3, 0));
    let mut rig = rig(MockHardware::new(), MockSky::new());
    let mut c = Controller::new(test_config());

    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();

    assert_eq!(rig.hw.level(Output::Light), Level::On);
}

#[test]
fn start_outside_window_leaves_light_off() {
    let clock = SimClock::at(june(21, 12, 0));
    let mut rig = rig(MockHardware::new(), MockSky::new());
    let mut c = Controller::new(test_config());

    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();

    assert!(rig.hw.sets(Output::Light).is_empty());
    assert_eq!(rig.sink.count(|e| *e == GrowEvent::LightsOn), 0);
    assert_eq!(rig.sink.count(|e| *e == GrowEvent::ProgramStarted), 1);
}

#[test]
fn window_edges_are_inclusive_at_startup() {
    for (h, m) in [(18, 0), (8, 0)] {
        let clock = SimClock::at(june(21, h, m));
        let mut rig = rig(MockHardware::new(), MockSky::new());
        let mut c = Controller::new(test_config());
        c.start(&mut rig, &clock, &mut clock.clone()).unwrap();
        assert_eq!(rig.hw.level(Output::Light), Level::On, "at {h:02}:{m:02}");
    }
}

#[test]
fn start_on_the_on_edge_switches_once() {
    let clock = SimClock::at(june(21, 18, 0));
    let mut rig = rig(MockHardware::new(), MockSky::new());
    let mut c = Controller::new(test_config());

    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();
    c.tick(&mut rig, june(21, 18, 0)).unwrap();
    c.tick(&mut rig, june(21, 18, 1)).unwrap();

    assert_eq!(rig.hw.sets(Output::Light), [Level::On]);
    assert_eq!(rig.sink.count(|e| *e == GrowEvent::LightsOn), 1);
    let on_job = c
        .scheduler()
        .tagged(Tag::Light)
        .map(|j| j.next_run())
        .min();
    assert_eq!(on_job, Some(june(22, 8, 0)));
}

#[test]
fn pump_is_not_restored_at_startup() {
    let clock = SimClock::at(june(21, 22, 0));
    let mut rig = rig(MockHardware::new(), MockSky::new());
    let mut c = Controller::new(test_config());

    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();

    assert!(rig.hw.sets(Output::Pump).is_empty());
    assert!(!c.pump().is_running());
}

#[test]
fn start_installs_recurring_jobs() {
    let clock = SimClock::at(june(21, 12, 0));
    let mut rig = rig(MockHardware::new(), MockSky::new());
    let mut c = Controller::new(test_config());

    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();

    let s = c.scheduler();
    assert_eq!(s.count(Tag::Light), 2);
    assert_eq!(s.count(Tag::LightUpdate), 1);
    assert_eq!(s.count(Tag::PumpOn), 1);
    assert_eq!(s.count(Tag::Measurement), 1);
    assert_eq!(s.count(Tag::PumpOff), 0);
    assert_eq!(s.count(Tag::LightRetry), 0);
    assert_eq!(s.next_due(), Some(june(21, 13, 0)));
}

// ── Lookup failure at startup ─────────────────────────────────

#[test]
fn failed_first_lookup_starts_dark_with_retry_armed() {
    let clock = SimClock::at(june(21, 22, 0));
    let sky = MockSky::new().then(Err(LookupError::Service("timeout".into())));
    let mut rig = rig(MockHardware::new(), sky);
    let mut c = Controller::new(test_config());

    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();

    assert_eq!(c.light().window(), None);
    assert_eq!(rig.hw.level(Output::Light), Level::Off);
    assert_eq!(c.scheduler().count(Tag::Light), 0);
    assert_eq!(c.scheduler().count(Tag::LightRetry), 1);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, GrowEvent::SunLookupFailed(_))),
        1
    );

    // The retry fires fifteen minutes later and the light catches up
    // straight away.
    c.tick(&mut rig, june(21, 22, 15)).unwrap();
    assert!(c.light().window().is_some());
    assert_eq!(c.scheduler().count(Tag::LightRetry), 0);
    assert_eq!(c.scheduler().count(Tag::Light), 2);
    assert_eq!(rig.hw.level(Output::Light), Level::On);
    assert_eq!(rig.sink.count(|e| *e == GrowEvent::LightsOn), 1);
}

// ── System check ──────────────────────────────────────────────

#[test]
fn system_check_cycles_outputs_in_order() {
    let clock = SimClock::at(june(21, 12, 0));
    let mut rig = rig(MockHardware::new(), MockSky::new());
    let mut config = test_config();
    config.system_check = true;
    let mut c = Controller::new(config);

    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();

    use Level::{Off, On};
    use Output::{Light, Pump};
    assert_eq!(
        rig.hw.calls,
        [
            HwCall::Set(Light, On),
            HwCall::Set(Pump, Off),
            HwCall::Set(Light, On),
            HwCall::Set(Pump, On),
            HwCall::Set(Light, On),
            HwCall::Set(Pump, Off),
            HwCall::Set(Light, Off),
            HwCall::Set(Pump, Off),
        ]
    );
    let started = rig.sink.position(&GrowEvent::SystemCheckStarted).unwrap();
    let done = rig.sink.position(&GrowEvent::SystemCheckCompleted).unwrap();
    let program = rig.sink.position(&GrowEvent::ProgramStarted).unwrap();
    assert!(started < done && done < program);

    // Reconciliation and job installation use the time after the check.
    assert_eq!(
        c.scheduler().next_due(),
        Some(june(21, 12, 0) + Duration::seconds(47) + Duration::hours(1))
    );
}
