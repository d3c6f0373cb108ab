use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DashboardEvent {
    #[serde(rename_all = "camelCase")]
    KpisUpdated { date: NaiveDate },
    #[serde(rename_all = "camelCase")]
    KpisRebuilt { days: usize },
    #[serde(rename_all = "camelCase")]
    ContactUpdated { contact_id: String },
    SequencesUpdated,
    SettingsUpdated,
}

/// Fan-out of dashboard changes to whichever views subscribed. Publishing
/// with nobody listening is fine.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DashboardEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: DashboardEvent) {
        let receivers = self.sender.send(event.clone()).unwrap_or(0);
        tracing::debug!(?event, receivers, "dashboard event published");
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{DashboardEvent, EventBus};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let date = NaiveDate::from_ymd_opt(2024, 1, 15).expect("date");
        bus.publish(DashboardEvent::KpisUpdated { date });

        assert_eq!(first.recv().await.expect("first"), DashboardEvent::KpisUpdated { date });
        assert_eq!(second.recv().await.expect("second"), DashboardEvent::KpisUpdated { date });
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(DashboardEvent::SettingsUpdated);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let value = serde_json::to_value(DashboardEvent::ContactUpdated {
            contact_id: "c-1".to_string(),
        })
        .expect("serialize");
        assert_eq!(value["type"], "contactUpdated");
        assert_eq!(value["contactId"], "c-1");
    }
}
