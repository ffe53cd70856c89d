//! Card reader flows: cooldown, local allow-list, remote authorization.

use smarthouse::app::events::{AccessDecision, HomeEvent};
use smarthouse::app::ports::{ActuatorPort, Position, Rgb};
use smarthouse::config::{AuthMode, SystemConfig};
use smarthouse::indicator::Owner;
use smarthouse::tasks::{AccessControlTask, GasTask};
use smarthouse::tasks::access::AUTH_RESPONSE_EVENT;

use crate::mock_hw::{ActuatorCall, House, card, house, step, topic};

const TICK: u64 = 500;
const ALLOWED: &str = "0x12345678";
const STRANGER: &str = "0xAABBCCDD";

fn access_house(cfg: &SystemConfig) -> House {
    let mut h = house(cfg);
    h.register(Box::new(AccessControlTask::new(cfg.access.clone())));
    h.start();
    h
}

fn scans(h: &House) -> usize {
    h.sink().count(|e| matches!(e, HomeEvent::CardScanned { .. }))
}

fn decisions(h: &House) -> Vec<AccessDecision> {
    h.sink()
        .events
        .iter()
        .filter_map(|e| match e {
            HomeEvent::AccessDecision { decision, .. } => Some(*decision),
            _ => None,
        })
        .collect()
}

fn scan_reports(h: &House) -> Vec<serde_json::Value> {
    h.channel()
        .transport()
        .payloads_on(&topic("events/rfid_scan"))
        .into_iter()
        .map(|p| serde_json::from_str(p).unwrap())
        .collect()
}

// ── Cooldown ──────────────────────────────────────────────────

#[test]
fn same_card_within_cooldown_is_one_scan() {
    let mut cfg = SystemConfig::default();
    cfg.access.deny_flash_count = 0;
    let mut h = access_house(&cfg);

    h.hw_mut().card = Some(card(STRANGER));
    step(&mut h, TICK);
    for _ in 0..4 {
        step(&mut h, TICK);
    }
    // 2 s after the first read.
    assert_eq!(scans(&h), 1);

    step(&mut h, 1_500);
    assert_eq!(scans(&h), 2);
}

#[test]
fn different_card_skips_cooldown() {
    let mut cfg = SystemConfig::default();
    cfg.access.deny_flash_count = 0;
    let mut h = access_house(&cfg);

    h.hw_mut().card = Some(card(STRANGER));
    step(&mut h, TICK);
    h.hw_mut().card = Some(card("0x01020304"));
    step(&mut h, TICK);
    assert_eq!(scans(&h), 2);
}

// ── Local allow-list ──────────────────────────────────────────

#[test]
fn unknown_card_flashes_red_and_keeps_door_shut() {
    let mut h = access_house(&SystemConfig::default());

    h.hw_mut().card = Some(card(STRANGER));
    step(&mut h, TICK);

    assert_eq!(h.hw().count(ActuatorCall::Door(Position::Open)), 0);
    assert_eq!(h.hw().count(ActuatorCall::Buzzer(true)), 3);
    assert_eq!(
        h.hw().rgb_writes(),
        [Rgb::RED, Rgb::OFF, Rgb::RED, Rgb::OFF, Rgb::RED, Rgb::OFF]
    );
    assert_eq!(h.clock().delays_ms, [300; 6]);
    assert!(!h.hw().actuator_states().buzzer);
    assert_eq!(h.indicator().current_owner(), None);

    assert_eq!(decisions(&h), [AccessDecision::Denied]);
    let reports = scan_reports(&h);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["card"], STRANGER);
    assert_eq!(reports[0]["status"], "unauthorized");
    assert!(h.channel().transport().payloads_on(&topic("devices/door/state")).is_empty());
}

#[test]
fn allowed_card_opens_door_for_dwell() {
    let mut h = access_house(&SystemConfig::default());

    h.hw_mut().card = Some(card(ALLOWED));
    step(&mut h, TICK);

    assert_eq!(
        h.hw().calls,
        [
            ActuatorCall::Door(Position::Open),
            ActuatorCall::Rgb(Rgb::GREEN),
            ActuatorCall::Door(Position::Closed),
            ActuatorCall::Rgb(Rgb::OFF),
        ]
    );
    assert_eq!(h.clock().delays_ms, [3000]);
    assert_eq!(
        h.channel().transport().payloads_on(&topic("devices/door/state")),
        ["open", "closed"]
    );
    assert_eq!(decisions(&h), [AccessDecision::Granted]);
    assert_eq!(scan_reports(&h)[0]["status"], "authorized");
}

#[test]
fn allow_list_match_ignores_hex_case() {
    let mut cfg = SystemConfig::default();
    cfg.access.allow_list.clear();
    cfg.access.allow_list.push(card(STRANGER)).unwrap();
    let mut h = access_house(&cfg);

    h.hw_mut().card = Some(card(&STRANGER.to_ascii_lowercase()));
    step(&mut h, TICK);

    assert_eq!(decisions(&h), [AccessDecision::Granted]);
    assert_eq!(h.hw().count(ActuatorCall::Door(Position::Open)), 1);
}

#[test]
fn denial_flash_stays_behind_gas_colour() {
    let mut cfg = SystemConfig::default();
    cfg.gas.warmup_secs = 0;
    cfg.gas.debounce_count = 1;
    let mut h = house(&cfg);
    h.register(Box::new(GasTask::new(&cfg.gas, 0)));
    h.register(Box::new(AccessControlTask::new(cfg.access.clone())));
    h.start();

    h.hw_mut().gas = Ok(true);
    step(&mut h, TICK);
    assert_eq!(h.indicator().current_owner(), Some(Owner::Gas));

    h.hw_mut().card = Some(card(STRANGER));
    step(&mut h, TICK);

    assert_eq!(h.hw().count(ActuatorCall::Buzzer(true)), 3);
    assert_eq!(h.hw().rgb_writes(), [Rgb::RED]);
    assert_eq!(h.indicator().current_owner(), Some(Owner::Gas));
}

// ── Remote authorization ──────────────────────────────────────

fn remote_cfg() -> SystemConfig {
    let mut cfg = SystemConfig::default();
    cfg.access.mode = AuthMode::Remote;
    cfg
}

#[test]
fn remote_mode_subscribes_to_responses() {
    let h = access_house(&remote_cfg());
    let filter = topic(&format!("events/{AUTH_RESPONSE_EVENT}"));
    assert!(h.channel().transport().subscriptions().contains(&filter));

    let local = access_house(&SystemConfig::default());
    assert!(local.channel().transport().subscriptions().is_empty());
}

#[test]
fn remote_verdict_opens_door() {
    let mut h = access_house(&remote_cfg());

    h.hw_mut().card = Some(card(STRANGER));
    step(&mut h, TICK);
    h.hw_mut().card = None;

    let reports = scan_reports(&h);
    assert_eq!(reports[0]["status"], "check");
    assert!(h.hw().calls.is_empty());

    h.channel_mut()
        .transport_mut()
        .inject(&topic("events/rfid_auth_response"), &format!("{STRANGER}:authorized"));
    step(&mut h, TICK);

    assert_eq!(h.hw().count(ActuatorCall::Door(Position::Open)), 1);
    assert_eq!(h.hw().count(ActuatorCall::Door(Position::Closed)), 1);
    assert_eq!(decisions(&h), [AccessDecision::Granted]);
    assert_eq!(scan_reports(&h)[1]["status"], "authorized");
}

#[test]
fn remote_verdict_for_another_card_is_ignored() {
    let mut h = access_house(&remote_cfg());

    h.hw_mut().card = Some(card(STRANGER));
    step(&mut h, TICK);
    h.hw_mut().card = None;

    h.channel_mut().transport_mut().inject(
        &topic("events/rfid_auth_response"),
        r#"{"card":"0x01020304","status":"authorized"}"#,
    );
    step(&mut h, TICK);
    assert!(h.hw().calls.is_empty());
    assert!(decisions(&h).is_empty());
}

#[test]
fn remote_silence_times_out_as_denial() {
    let mut h = access_house(&remote_cfg());

    h.hw_mut().card = Some(card(STRANGER));
    step(&mut h, TICK);
    h.hw_mut().card = None;

    // Exactly at the timeout: still pending.
    step(&mut h, 5_000);
    assert!(decisions(&h).is_empty());

    step(&mut h, 1);
    assert_eq!(decisions(&h), [AccessDecision::TimedOut]);
    assert_eq!(h.hw().count(ActuatorCall::Door(Position::Open)), 0);
    assert_eq!(h.hw().count(ActuatorCall::Buzzer(true)), 3);
    assert_eq!(scan_reports(&h)[1]["status"], "unauthorized");

    // A late verdict has nothing to resolve.
    h.channel_mut()
        .transport_mut()
        .inject(&topic("events/rfid_auth_response"), &format!("{STRANGER}:authorized"));
    step(&mut h, TICK);
    assert_eq!(h.hw().count(ActuatorCall::Door(Position::Open)), 0);
}
