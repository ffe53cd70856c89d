//! Indicator arbiter for the shared RGB strip.
//!
//! One physical indicator, several independent status sources. Each
//! source holds at most one *claim* (a colour). The arbiter decides which
//! claim is shown:
//!
//! - A request is shown iff its priority is `>=` the priority currently
//!   shown. Equal priority means the newer request wins.
//! - A lower-priority request is remembered but not shown.
//! - Releasing the shown claim falls back to the highest remaining claim
//!   (newest first on ties), or turns the strip off when none remain.
//! - Releasing a claim that is not shown never touches the strip.
//!
//! ```text
//!   off(0) < Occupancy(1) < Moisture(2) = Access(2) < Gas(3)
//! ```
//!
//! All methods take the actuator port explicitly; the arbiter is the only
//! caller of [`ActuatorPort::set_rgb`].

use log::{debug, warn};

use crate::app::ports::{ActuatorPort, Rgb};

/// Subsystems that may claim the indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Occupancy,
    Moisture,
    Access,
    Gas,
}

impl Owner {
    pub const ALL: [Owner; 4] = [Owner::Occupancy, Owner::Moisture, Owner::Access, Owner::Gas];

    pub const fn priority(self) -> u8 {
        match self {
            Owner::Occupancy => 1,
            Owner::Moisture | Owner::Access => 2,
            Owner::Gas => 3,
        }
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct Claim {
    colour: Rgb,
    seq: u32,
}

#[derive(Debug, Default)]
pub struct IndicatorArbiter {
    claims: [Option<Claim>; 4],
    current: Option<Owner>,
    seq: u32,
}

impl IndicatorArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owner whose colour is on the strip, if any.
    pub fn current_owner(&self) -> Option<Owner> {
        self.current
    }

    /// Priority of the shown claim; 0 when the strip is off.
    pub fn current_priority(&self) -> u8 {
        self.current.map_or(0, Owner::priority)
    }

    pub fn current_colour(&self) -> Rgb {
        self.current
            .and_then(|o| self.claims[o.slot()])
            .map_or(Rgb::OFF, |c| c.colour)
    }

    /// Whether `owner` holds a claim, shown or not.
    pub fn holds_claim(&self, owner: Owner) -> bool {
        self.claims[owner.slot()].is_some()
    }

    /// Record `owner`'s claim and show it if priority allows.
    /// Returns `true` when the colour went to the strip.
    pub fn request<A: ActuatorPort + ?Sized>(&mut self, owner: Owner, colour: Rgb, out: &mut A) -> bool {
        self.seq = self.seq.wrapping_add(1);
        self.claims[owner.slot()] = Some(Claim { colour, seq: self.seq });

        if owner.priority() < self.current_priority() {
            debug!(
                "Indicator: {:?} held behind {:?} (p{} < p{})",
                owner,
                self.current,
                owner.priority(),
                self.current_priority()
            );
            return false;
        }
        self.current = Some(owner);
        write(out, colour);
        true
    }

    /// Drop `owner`'s claim. Returns `true` when the strip changed.
    pub fn release<A: ActuatorPort + ?Sized>(&mut self, owner: Owner, out: &mut A) -> bool {
        self.claims[owner.slot()] = None;
        if self.current != Some(owner) {
            return false;
        }

        self.current = self.strongest_claim();
        let colour = self.current_colour();
        debug!("Indicator: {:?} released, now {:?}", owner, self.current);
        write(out, colour);
        true
    }

    /// Forget every claim and turn the strip off (shutdown).
    pub fn reset<A: ActuatorPort + ?Sized>(&mut self, out: &mut A) {
        self.claims = [None; 4];
        self.current = None;
        write(out, Rgb::OFF);
    }

    fn strongest_claim(&self) -> Option<Owner> {
        Owner::ALL
            .into_iter()
            .filter_map(|o| self.claims[o.slot()].map(|c| (o, c)))
            .max_by_key(|(o, c)| (o.priority(), c.seq))
            .map(|(o, _)| o)
    }
}

fn write<A: ActuatorPort + ?Sized>(out: &mut A, colour: Rgb) {
    if let Err(e) = out.set_rgb(colour) {
        warn!("Indicator: strip write failed: {}", e);
    }
}
