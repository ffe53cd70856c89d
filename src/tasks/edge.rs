//! Edge detection for binary conditions.
//!
//! Tasks publish and act on transitions only; holding a state repeats
//! nothing.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    /// quiescent → active
    Rising,
    /// active → quiescent
    Falling,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EdgeDetector {
    active: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed this tick's observation; returns the transition, if any.
    pub fn observe(&mut self, now: bool) -> Option<Edge> {
        let edge = match (self.active, now) {
            (false, true) => Some(Edge::Rising),
            (true, false) => Some(Edge::Falling),
            _ => None,
        };
        self.active = now;
        edge
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
