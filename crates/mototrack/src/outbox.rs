//! Post-mutation events.
//!
//! The fleet service records what each successful mutation did. Callers
//! drain the outbox after a mutation and decide what to do with the events,
//! typically handing them to the notification dispatcher.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::motorcycle::{Motorcycle, MotorcycleId};

/// A successful fleet mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FleetEvent {
    /// A motorcycle was registered.
    Created {
        /// The stored record.
        motorcycle: Motorcycle,
    },
    /// A motorcycle was saved.
    Updated {
        /// Last version known locally before the save, if any was cached.
        previous: Option<Motorcycle>,
        /// The saved record.
        current: Motorcycle,
    },
    /// A motorcycle was removed.
    Deleted {
        /// Id of the removed record.
        id: MotorcycleId,
    },
}

impl FleetEvent {
    /// Id of the motorcycle the event concerns.
    #[must_use]
    pub fn motorcycle_id(&self) -> MotorcycleId {
        match self {
            Self::Created { motorcycle } => motorcycle.id,
            Self::Updated { current, .. } => current.id,
            Self::Deleted { id } => *id,
        }
    }

    /// Short event name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Updated { .. } => "updated",
            Self::Deleted { .. } => "deleted",
        }
    }
}

/// FIFO queue of fleet events.
#[derive(Debug, Default)]
pub struct Outbox {
    events: Mutex<VecDeque<FleetEvent>>,
}

impl Outbox {
    /// Create an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&self, event: FleetEvent) {
        self.events.lock().push_back(event);
    }

    /// Take every queued event, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<FleetEvent> {
        self.events.lock().drain(..).collect()
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if no events are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motorcycle::{sample_motorcycle, MotorcycleStatus};

    #[test]
    fn test_drain_is_fifo_and_empties() {
        let outbox = Outbox::new();
        outbox.push(FleetEvent::Created {
            motorcycle: sample_motorcycle(1, MotorcycleStatus::Available, 0),
        });
        outbox.push(FleetEvent::Deleted { id: 2 });
        assert_eq!(outbox.len(), 2);

        let events = outbox.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name(), "created");
        assert_eq!(events[1].motorcycle_id(), 2);
        assert!(outbox.is_empty());
        assert!(outbox.drain().is_empty());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = FleetEvent::Deleted { id: 5 };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "deleted");
        assert_eq!(value["id"], 5);
    }

    #[test]
    fn test_updated_event_id_comes_from_current() {
        let event = FleetEvent::Updated {
            previous: None,
            current: sample_motorcycle(9, MotorcycleStatus::InUse, 10),
        };
        assert_eq!(event.motorcycle_id(), 9);
    }
}
