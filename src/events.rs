//! Outbound notifications from the simulation core to a presentation layer.
//!
//! The core never renders anything itself. Job tasks and the scheduler emit
//! [`Event`]s into an [`EventSink`]; the terminal front end in `ui` consumes
//! them from a channel.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::state_machine::JobStatus;
use crate::world::EntityId;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    ShipDocking {
        ship: EntityId,
        dock: EntityId,
        port: EntityId,
    },
    ShipDeparting {
        ship: EntityId,
        dock: EntityId,
        port: EntityId,
    },
    JobCompleted {
        job: EntityId,
        ship: EntityId,
        dock: EntityId,
        port: EntityId,
    },
    JobProgress {
        job: EntityId,
        percent: u8,
        status: JobStatus,
    },
}

/// Receives notifications. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

pub type SharedSink = Arc<dyn EventSink>;

/// Forwards events into an unbounded tokio channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: Event) {
        // A dropped receiver only means nobody is watching anymore.
        let _ = self.tx.send(event);
    }
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Records every event for later assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingSink {
        pub fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        pub fn dock_events(&self) -> Vec<Event> {
            self.events()
                .into_iter()
                .filter(|e| !matches!(e, Event::JobProgress { .. }))
                .collect()
        }
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_tag() {
        let event = Event::ShipDocking {
            ship: 30001,
            dock: 20001,
            port: 10001,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "ship_docking");
        assert_eq!(json["ship"], 30001);
    }

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(Event::JobProgress {
            job: 1,
            percent: 10,
            status: JobStatus::Working,
        });
        sink.emit(Event::JobProgress {
            job: 1,
            percent: 20,
            status: JobStatus::Working,
        });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, Event::JobProgress { percent: 10, .. }));
        assert!(matches!(second, Event::JobProgress { percent: 20, .. }));
    }

    #[test]
    fn channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(Event::ShipDeparting {
            ship: 1,
            dock: 2,
            port: 3,
        });
    }
}
