//! RFID access control: scan, decide, then open the door or refuse.
//!
//! A read counts as a new scan when the card differs from the last one, or
//! when strictly more than `cooldown_ms` has passed since that card was last
//! accepted. A card left on the reader therefore registers once per
//! cooldown window, not once per tick.
//!
//! Authorization is either local (allow-list) or remote: the task publishes
//! a `check` request and waits for `<root>/events/rfid_auth_response`
//! carrying `"<card>:authorized"` / `"<card>:unauthorized"` (or the JSON
//! form). No verdict within `auth_timeout_ms` denies.
//!
//! Grant: door open, green indicator, hold for `dwell_ms`, close.
//! Deny: red indicator and buzzer flashed `deny_flash_count` times. The
//! door is never touched on a denial.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::events::{AccessDecision, HomeEvent};
use crate::app::ports::{CardId, Position, Rgb};
use crate::app::topics::Topics;
use crate::config::{AccessConfig, AuthMode};
use crate::connectivity::InboundMessage;
use crate::indicator::Owner;

use super::{Subscriptions, Task, TaskContext, attempt_each, subscriptions};

pub const SCAN_EVENT: &str = "rfid_scan";
pub const AUTH_RESPONSE_EVENT: &str = "rfid_auth_response";

/// Flat JSON published for every scan.
#[derive(Debug, Serialize)]
struct ScanReport<'a> {
    card: &'a str,
    status: &'a str,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    card: CardId,
    status: heapless::String<16>,
}

/// Parse a remote verdict. Returns the card and whether it was authorized.
pub fn parse_auth_response(payload: &str) -> Option<(CardId, bool)> {
    let payload = payload.trim();
    let (card, status) = if payload.starts_with('{') {
        let resp: AuthResponse = serde_json::from_str(payload).ok()?;
        (resp.card, resp.status)
    } else {
        let (card, status) = payload.split_once(':')?;
        let mut c = CardId::new();
        c.push_str(card.trim()).ok()?;
        let mut s = heapless::String::new();
        s.push_str(status.trim()).ok()?;
        (c, s)
    };
    if status.eq_ignore_ascii_case("authorized") {
        Some((card, true))
    } else if status.eq_ignore_ascii_case("unauthorized") {
        Some((card, false))
    } else {
        None
    }
}

/// A scanned card awaiting a remote verdict.
#[derive(Debug, Clone)]
struct PendingAuthorization {
    card: CardId,
    since_ms: u64,
}

pub struct AccessControlTask {
    cfg: AccessConfig,
    last_card: Option<CardId>,
    last_scan_ms: u64,
    pending: Option<PendingAuthorization>,
    scans: u32,
}

impl AccessControlTask {
    pub fn new(cfg: AccessConfig) -> Self {
        Self {
            cfg,
            last_card: None,
            last_scan_ms: 0,
            pending: None,
            scans: 0,
        }
    }

    /// Scan events accepted so far.
    pub fn scans(&self) -> u32 {
        self.scans
    }

    pub fn pending_card(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.card.as_str())
    }

    fn is_new_scan(&self, card: &CardId, now_ms: u64) -> bool {
        self.last_card.as_ref() != Some(card)
            || now_ms.saturating_sub(self.last_scan_ms) > u64::from(self.cfg.cooldown_ms)
    }

    /// Card ids are hex; the reader and the allow-list may differ in case.
    fn is_allowed(&self, card: &str) -> bool {
        self.cfg
            .allow_list
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(card))
    }

    fn publish_scan(&self, ctx: &mut TaskContext<'_>, card: &str, status: &str) {
        match serde_json::to_string(&ScanReport { card, status }) {
            Ok(json) => {
                let topic = ctx.topics.event(SCAN_EVENT);
                ctx.publish(&topic, &json);
            }
            Err(e) => warn!("Access: scan report encode failed: {}", e),
        }
    }

    fn resolve(&self, ctx: &mut TaskContext<'_>, card: &CardId, decision: AccessDecision) {
        let status = if decision.is_granted() { "authorized" } else { "unauthorized" };
        self.publish_scan(ctx, card, status);
        ctx.emit(HomeEvent::AccessDecision {
            card: card.clone(),
            decision,
        });
        if decision.is_granted() {
            info!("Access: {} authorized", card);
            self.grant(ctx);
        } else {
            info!("Access: {} refused ({:?})", card, decision);
            self.deny(ctx);
        }
    }

    fn grant(&self, ctx: &mut TaskContext<'_>) {
        if let Err(e) = ctx.hw.set_door(Position::Open) {
            warn!("Door: write failed: {}", e);
        }
        ctx.publish_device_state("door", Position::Open.as_str());
        ctx.claim(Owner::Access, Rgb::GREEN);

        ctx.clock.delay_ms(self.cfg.dwell_ms);

        if let Err(e) = ctx.hw.set_door(Position::Closed) {
            warn!("Door: write failed: {}", e);
        }
        ctx.publish_device_state("door", Position::Closed.as_str());
        ctx.unclaim(Owner::Access);
    }

    fn deny(&self, ctx: &mut TaskContext<'_>) {
        for _ in 0..self.cfg.deny_flash_count {
            ctx.claim(Owner::Access, Rgb::RED);
            if let Err(e) = ctx.hw.set_buzzer(true) {
                warn!("Buzzer: write failed: {}", e);
            }
            ctx.clock.delay_ms(self.cfg.deny_flash_on_ms);

            ctx.unclaim(Owner::Access);
            if let Err(e) = ctx.hw.set_buzzer(false) {
                warn!("Buzzer: write failed: {}", e);
            }
            ctx.clock.delay_ms(self.cfg.deny_flash_off_ms);
        }
    }
}

impl Task for AccessControlTask {
    fn name(&self) -> &'static str {
        "access"
    }

    fn subscriptions(&self, topics: &Topics) -> Subscriptions {
        match self.cfg.mode {
            AuthMode::Remote => subscriptions([topics.event(AUTH_RESPONSE_EVENT)]),
            AuthMode::Local => Subscriptions::new(),
        }
    }

    fn update(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        let now = ctx.now_ms();

        if let Some(p) = &self.pending {
            if now.saturating_sub(p.since_ms) > u64::from(self.cfg.auth_timeout_ms) {
                let card = p.card.clone();
                self.pending = None;
                warn!("Access: no verdict for {}, denying", card);
                self.resolve(ctx, &card, AccessDecision::TimedOut);
            }
        }

        let card = match ctx.hw.scan_card() {
            Ok(Some(card)) => card,
            Ok(None) => return Ok(()),
            Err(e) => {
                debug!("Access: no reading ({})", e);
                return Ok(());
            }
        };
        if !self.is_new_scan(&card, now) {
            return Ok(());
        }
        self.last_card = Some(card.clone());
        self.last_scan_ms = now;
        self.scans = self.scans.wrapping_add(1);
        info!("Access: card {} scanned", card);
        ctx.emit(HomeEvent::CardScanned { card: card.clone() });

        match self.cfg.mode {
            AuthMode::Local => {
                let decision = if self.is_allowed(&card) {
                    AccessDecision::Granted
                } else {
                    AccessDecision::Denied
                };
                self.resolve(ctx, &card, decision);
            }
            AuthMode::Remote => {
                self.publish_scan(ctx, &card, "check");
                if let Some(old) = self.pending.replace(PendingAuthorization {
                    card,
                    since_ms: now,
                }) {
                    debug!("Access: superseded pending check for {}", old.card);
                }
            }
        }
        Ok(())
    }

    fn on_message(&mut self, msg: &InboundMessage, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        let Some((card, authorized)) = parse_auth_response(&msg.payload) else {
            debug!("Access: ignoring response '{}'", msg.payload);
            return Ok(());
        };
        if !self
            .pending
            .as_ref()
            .is_some_and(|p| p.card.eq_ignore_ascii_case(&card))
        {
            debug!("Access: verdict for {} with nothing pending", card);
            return Ok(());
        }
        self.pending = None;
        let decision = if authorized {
            AccessDecision::Granted
        } else {
            AccessDecision::Denied
        };
        self.resolve(ctx, &card, decision);
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut TaskContext<'_>) -> anyhow::Result<()> {
        self.pending = None;
        ctx.unclaim(Owner::Access);
        attempt_each(
            self.name(),
            [
                ("buzzer", ctx.hw.set_buzzer(false)),
                ("door", ctx.hw.set_door(Position::Closed)),
            ],
        )
    }
}
