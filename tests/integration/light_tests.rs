//! Integration tests for the light cycle: daily switching, the nightly
//! window refresh, lookup retries, and place-name geocoding.

use growbox::app::events::GrowEvent;
use growbox::app::light::LightWindow;
use growbox::app::ports::{Level, Output};
use growbox::app::service::Controller;
use growbox::config::Site;
use growbox::error::LookupError;
use growbox::scheduler::Tag;

use crate::mock_hw::{MockHardware, MockRig, MockSky, SimClock, hm, june, rig, sun, test_config};

fn started_at(h: u32, m: u32, sky: MockSky) -> (Controller, MockRig) {
    let clock = SimClock::at(june(21, h, m));
    let mut rig = rig(MockHardware::new(), sky);
    let mut c = Controller::new(test_config());
    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();
    (c, rig)
}

#[test]
fn light_switches_on_and_off_daily() {
    let (mut c, mut rig) = started_at(12, 0, MockSky::new());

    c.tick(&mut rig, june(21, 18, 0)).unwrap();
    assert_eq!(rig.hw.level(Output::Light), Level::On);

    c.tick(&mut rig, june(21, 23, 45)).unwrap();
    c.tick(&mut rig, june(22, 8, 0)).unwrap();
    assert_eq!(rig.hw.level(Output::Light), Level::Off);

    c.tick(&mut rig, june(22, 18, 0)).unwrap();
    assert_eq!(rig.hw.sets(Output::Light), [Level::On, Level::Off, Level::On]);
    assert_eq!(rig.sink.count(|e| *e == GrowEvent::LightsOn), 2);
    assert_eq!(rig.sink.count(|e| *e == GrowEvent::LightsOff), 1);
}

#[test]
fn nightly_refresh_replaces_light_jobs() {
    let sky = MockSky::new()
        .then(Ok(sun(hm(6, 0), hm(20, 0))))
        .then(Ok(sun(hm(6, 5), hm(19, 50))));
    let (mut c, mut rig) = started_at(12, 0, sky);
    assert_eq!(
        c.light().window(),
        Some(LightWindow {
            on: hm(18, 0),
            off: hm(8, 0)
        })
    );

    c.tick(&mut rig, june(21, 23, 45)).unwrap();

    assert_eq!(
        c.light().window(),
        Some(LightWindow {
            on: hm(17, 50),
            off: hm(8, 5)
        })
    );
    // Exactly one on/off pair survives the refresh.
    assert_eq!(c.scheduler().count(Tag::Light), 2);
    assert_eq!(c.scheduler().count(Tag::LightUpdate), 1);
    let next: Vec<_> = c
        .scheduler()
        .tagged(Tag::Light)
        .map(|j| j.next_run())
        .collect();
    assert_eq!(next, [june(22, 17, 50), june(22, 8, 5)]);

    // The refresh looks up the date it runs on.
    assert_eq!(rig.sky.lookups.len(), 2);
    assert_eq!(rig.sky.lookups[1].0, june(21, 0, 0).date());
}

#[test]
fn failed_refresh_keeps_old_window_and_retries_once() {
    let sky = MockSky::new()
        .then(Ok(sun(hm(6, 0), hm(20, 0))))
        .then(Err(LookupError::Service("HTTP 503".into())))
        .then(Ok(sun(hm(6, 10), hm(19, 40))));
    let (mut c, mut rig) = started_at(12, 0, sky);

    let report = c.tick(&mut rig, june(21, 23, 45)).unwrap();
    assert_eq!(report.failed, 0, "lookup failures are not job faults");
    assert_eq!(
        c.light().window(),
        Some(LightWindow {
            on: hm(18, 0),
            off: hm(8, 0)
        })
    );
    assert_eq!(c.scheduler().count(Tag::Light), 2);
    assert_eq!(c.scheduler().count(Tag::LightRetry), 1);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, GrowEvent::SunLookupFailed(m) if m.contains("503"))),
        1
    );

    c.tick(&mut rig, june(22, 0, 0)).unwrap();
    assert_eq!(c.scheduler().count(Tag::LightRetry), 0);
    assert_eq!(
        c.light().window(),
        Some(LightWindow {
            on: hm(17, 40),
            off: hm(8, 10)
        })
    );
    assert_eq!(c.scheduler().count(Tag::Light), 2);
}

#[test]
fn retry_landing_past_the_new_on_edge_switches_light_immediately() {
    let sky = MockSky::new()
        .then(Ok(sun(hm(6, 0), hm(20, 2))))
        .then(Err(LookupError::Service("timeout".into())))
        .then(Ok(sun(hm(6, 0), hm(19, 58))));
    let clock = SimClock::at(june(21, 17, 0));
    let mut rig = rig(MockHardware::new(), sky);
    let mut config = test_config();
    config.light_refresh_at = hm(17, 55);
    config.lookup_retry_minutes = 6;
    let mut c = Controller::new(config);
    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();
    assert_eq!(c.light().window().map(|w| w.on), Some(hm(18, 2)));

    c.tick(&mut rig, june(21, 17, 55)).unwrap();
    assert_eq!(c.scheduler().count(Tag::LightRetry), 1);

    // 18:01 is inside the new window (17:58) but before the stale 18:02 edge.
    c.tick(&mut rig, june(21, 18, 1)).unwrap();
    assert_eq!(c.light().window().map(|w| w.on), Some(hm(17, 58)));
    assert_eq!(rig.hw.level(Output::Light), Level::On);
    assert!(c.light().is_lit());
    assert_eq!(rig.sink.count(|e| *e == GrowEvent::LightsOn), 1);

    let next: Vec<_> = c
        .scheduler()
        .tagged(Tag::Light)
        .map(|j| j.next_run())
        .collect();
    assert_eq!(next, [june(22, 17, 58), june(22, 8, 0)]);

    // No second switch when the replacement pair comes round.
    c.tick(&mut rig, june(21, 18, 2)).unwrap();
    assert_eq!(rig.hw.sets(Output::Light), [Level::On]);
}

#[test]
fn refresh_that_closes_the_window_switches_light_off() {
    let sky = MockSky::new()
        .then(Ok(sun(hm(6, 0), hm(20, 0))))
        .then(Ok(sun(hm(1, 0), hm(23, 59))));
    let clock = SimClock::at(june(21, 23, 0));
    let mut rig = rig(MockHardware::new(), sky);
    let mut config = test_config();
    config.light_refresh_at = hm(4, 0);
    let mut c = Controller::new(config);
    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();
    assert!(c.light().is_lit());

    // The new window ends at 03:00; the stale 08:00 edge is gone.
    c.tick(&mut rig, june(22, 4, 0)).unwrap();
    assert_eq!(c.light().window().map(|w| w.off), Some(hm(3, 0)));
    assert_eq!(rig.hw.level(Output::Light), Level::Off);
    assert_eq!(rig.sink.count(|e| *e == GrowEvent::LightsOff), 1);
}

#[test]
fn repeated_failures_keep_a_single_retry() {
    let sky = MockSky::new()
        .then(Ok(sun(hm(6, 0), hm(20, 0))))
        .then(Err(LookupError::NoSunEvent))
        .then(Err(LookupError::NoSunEvent))
        .then(Err(LookupError::NoSunEvent));
    let (mut c, mut rig) = started_at(12, 0, sky);

    c.tick(&mut rig, june(21, 23, 45)).unwrap();
    c.tick(&mut rig, june(22, 0, 0)).unwrap();
    c.tick(&mut rig, june(22, 0, 15)).unwrap();

    assert_eq!(c.scheduler().count(Tag::LightRetry), 1);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, GrowEvent::SunLookupFailed(_))),
        3
    );
    // The stale pair stays installed.
    assert_eq!(c.scheduler().count(Tag::Light), 2);
    assert_eq!(
        c.light().window(),
        Some(LightWindow {
            on: hm(18, 0),
            off: hm(8, 0)
        })
    );
}

#[test]
fn place_is_geocoded_once_and_cached() {
    let clock = SimClock::at(june(21, 12, 0));
    let mut rig = rig(MockHardware::new(), MockSky::new());
    let mut config = test_config();
    config.site = Site::Place {
        place: "Saint Louis".into(),
    };
    let mut c = Controller::new(config);

    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();
    c.tick(&mut rig, june(21, 23, 45)).unwrap();

    assert_eq!(rig.sky.locate_calls, 1);
    assert_eq!(rig.sky.lookups.len(), 2);
}

#[test]
fn unknown_place_is_a_recoverable_lookup_failure() {
    let clock = SimClock::at(june(21, 12, 0));
    let mut sky = MockSky::new();
    sky.place_found = false;
    let mut rig = rig(MockHardware::new(), sky);
    let mut config = test_config();
    config.site = Site::Place {
        place: "Atlantis".into(),
    };
    let mut c = Controller::new(config);

    c.start(&mut rig, &clock, &mut clock.clone()).unwrap();

    assert_eq!(c.light().window(), None);
    assert_eq!(c.scheduler().count(Tag::LightRetry), 1);
    assert!(rig.sky.lookups.is_empty());
    assert_eq!(
        rig.sink.count(
            |e| matches!(e, GrowEvent::SunLookupFailed(m) if m.contains("Atlantis"))
        ),
        1
    );
}
