//! Optional diagnostics output for the rope core.
//!
//! The core reports transitions and, when `debug_draw` is enabled, debug
//! shapes to a [`DiagnosticsSink`] injected at construction. Nothing in the
//! simulation depends on a sink being present.

use crossbeam_channel::{bounded, Receiver, Sender};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::state::RopePhase;

/// Debug color hint for a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugColor {
    /// Assist band
    Cyan,
    /// Minimum anchor distance
    Yellow,
    /// Ledge probe
    Orange,
    /// Accepted target
    Green,
    /// Rejected target
    Red,
    /// Surface normal
    Blue,
}

/// A debug primitive the host may draw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum DebugShape {
    /// Wire sphere
    Sphere {
        /// Centre
        center: Vec3,
        /// Radius
        radius: f32,
        /// Color hint
        color: DebugColor,
    },
    /// Line segment
    Line {
        /// Start point
        start: Vec3,
        /// End point
        end: Vec3,
        /// Color hint
        color: DebugColor,
    },
    /// Directional arrow
    Arrow {
        /// Tail
        start: Vec3,
        /// Head
        end: Vec3,
        /// Color hint
        color: DebugColor,
    },
}

/// Events emitted by the rope core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RopeEvent {
    /// The rope mode changed
    PhaseChanged {
        /// Previous phase
        from: RopePhase,
        /// New phase
        to: RopePhase,
    },
    /// The rope fixed itself to the world
    Attached {
        /// Anchor point
        anchor: Vec3,
        /// Rope length at attach time
        length: f32,
    },
    /// Ledge assist placed the character
    LedgeClimbed {
        /// Final stand position
        target: Vec3,
    },
    /// Recall finished and the rope was cleared
    Recalled,
    /// The rope was reset after losing a collaborator or by request
    Reset,
    /// Debug visualization
    Debug(DebugShape),
}

/// Receives diagnostics from the rope core.
pub trait DiagnosticsSink {
    /// Records one event.
    fn record(&self, event: RopeEvent);
}

impl<F> DiagnosticsSink for F
where
    F: Fn(RopeEvent),
{
    fn record(&self, event: RopeEvent) {
        self(event);
    }
}

/// Bounded event queue implementing [`DiagnosticsSink`].
#[derive(Debug)]
pub struct RopeEventBus {
    /// Sender for recording events
    sender: Sender<RopeEvent>,
    /// Receiver for draining events
    receiver: Receiver<RopeEvent>,
    /// Channel capacity
    capacity: usize,
}

impl Default for RopeEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl RopeEventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<RopeEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl DiagnosticsSink for RopeEventBus {
    fn record(&self, event: RopeEvent) {
        // Non-blocking send - if full, event is dropped
        let _ = self.sender.try_send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_bus_drains_in_order() {
        let bus = RopeEventBus::new(8);
        bus.record(RopeEvent::Reset);
        bus.record(RopeEvent::Recalled);

        assert_eq!(bus.pending_count(), 2);
        assert_eq!(bus.drain(), vec![RopeEvent::Reset, RopeEvent::Recalled]);
        assert_eq!(bus.pending_count(), 0);
    }

    #[test]
    fn test_bus_drops_when_full() {
        let bus = RopeEventBus::new(1);
        bus.record(RopeEvent::Reset);
        bus.record(RopeEvent::Recalled);
        assert_eq!(bus.drain(), vec![RopeEvent::Reset]);
        assert_eq!(bus.capacity(), 1);
    }

    #[test]
    fn test_closure_sink() {
        let seen = RefCell::new(Vec::new());
        let sink = |event: RopeEvent| seen.borrow_mut().push(event);
        sink.record(RopeEvent::PhaseChanged {
            from: RopePhase::Idle,
            to: RopePhase::Aiming,
        });
        assert_eq!(seen.borrow().len(), 1);
    }
}
