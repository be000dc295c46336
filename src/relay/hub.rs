//! Connection hub
//!
//! Registry of open relay sockets and their topic subscriptions. Each
//! connection is reached through its own unbounded channel; the socket
//! writer task drains it.

use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::messages::{RelayEvent, ServerMessage};

pub type ConnectionId = String;

/// Topic prefix accepted by `subscribe`
const GESTURE_TOPIC_PREFIX: &str = "gestures.";

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
        }
    }
}

struct ConnectionHandle {
    sender: mpsc::UnboundedSender<ServerMessage>,
    subscriptions: HashSet<String>,
}

pub struct ConnectionHub {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    /// Topic → subscribed connections
    subscriptions: RwLock<HashMap<String, HashSet<ConnectionId>>>,
    config: HubConfig,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a connection, failing once the limit is reached
    pub async fn register(
        &self,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut connections = self.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(
            id.clone(),
            ConnectionHandle {
                sender,
                subscriptions: HashSet::new(),
            },
        );

        tracing::info!(connection_id = %id, "Relay client connected");
        Ok(id)
    }

    pub async fn unregister(&self, id: &str) {
        let handle = self.connections.write().await.remove(id);

        if let Some(handle) = handle {
            let mut subs = self.subscriptions.write().await;
            for topic in handle.subscriptions {
                remove_subscriber(&mut subs, &topic, id);
            }
        }

        tracing::info!(connection_id = %id, "Relay client disconnected");
    }

    /// Subscribe to topics; invalid topics are skipped. Returns the
    /// topics actually subscribed.
    pub async fn subscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut subscribed = Vec::new();

        for topic in topics {
            if !is_valid_topic(&topic) {
                tracing::warn!(connection_id = %id, topic = %topic, "Invalid topic ignored");
                continue;
            }
            handle.subscriptions.insert(topic.clone());
            subs.entry(topic.clone()).or_default().insert(id.to_string());
            subscribed.push(topic);
        }

        tracing::debug!(connection_id = %id, topics = ?subscribed, "Subscribed");
        Ok(subscribed)
    }

    pub async fn unsubscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut unsubscribed = Vec::new();

        for topic in topics {
            if handle.subscriptions.remove(&topic) {
                remove_subscriber(&mut subs, &topic, id);
                unsubscribed.push(topic);
            }
        }

        tracing::debug!(connection_id = %id, topics = ?unsubscribed, "Unsubscribed");
        Ok(unsubscribed)
    }

    /// Deliver an event to every subscriber of its topic, including
    /// `gestures.*` wildcard subscribers. Returns the delivery count.
    pub async fn publish(&self, event: &RelayEvent) -> usize {
        let wildcard = event
            .topic
            .split('.')
            .next()
            .map(|prefix| format!("{prefix}.*"));

        // Subscription guard is released before `connections` is locked;
        // subscribe/unsubscribe take the two locks in the opposite order.
        let recipients: HashSet<ConnectionId> = {
            let subs = self.subscriptions.read().await;
            let mut recipients = HashSet::new();
            if let Some(ids) = subs.get(&event.topic) {
                recipients.extend(ids.iter().cloned());
            }
            if let Some(ids) = wildcard.and_then(|t| subs.get(&t)) {
                recipients.extend(ids.iter().cloned());
            }
            recipients
        };
        if recipients.is_empty() {
            return 0;
        }

        let connections = self.connections.read().await;
        let sent = recipients
            .iter()
            .filter_map(|id| connections.get(id))
            .filter(|handle| handle.sender.send(event.message.clone()).is_ok())
            .count();

        if sent > 0 {
            tracing::trace!(topic = %event.topic, subscribers = sent, "Published");
        }
        sent
    }

    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.connections.read().await;
        let handle = connections.get(id).ok_or(HubError::ConnectionNotFound)?;
        handle
            .sender
            .send(message)
            .map_err(|_| HubError::SendFailed)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(topic)
            .map_or(0, HashSet::len)
    }
}

fn remove_subscriber(subs: &mut HashMap<String, HashSet<ConnectionId>>, topic: &str, id: &str) {
    if let Some(subscribers) = subs.get_mut(topic) {
        subscribers.remove(id);
        if subscribers.is_empty() {
            subs.remove(topic);
        }
    }
}

/// `gestures.{connection_id}` or `gestures.*`
fn is_valid_topic(topic: &str) -> bool {
    topic
        .strip_prefix(GESTURE_TOPIC_PREFIX)
        .is_some_and(|rest| !rest.is_empty())
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::{Gesture, StrokeAction, TrackerUpdate};

    fn idle_event(id: &str) -> RelayEvent {
        RelayEvent::gesture(
            id,
            &TrackerUpdate {
                gesture: Gesture::Idle,
                cursor: None,
                action: StrokeAction::None,
            },
        )
    }

    #[test]
    fn test_valid_topics() {
        assert!(is_valid_topic("gestures.*"));
        assert!(is_valid_topic("gestures.1234"));
        assert!(!is_valid_topic("gestures."));
        assert!(!is_valid_topic("metrics.mood"));
        assert!(!is_valid_topic(""));
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = hub.register(tx).await.unwrap();
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let hub = ConnectionHub::new(HubConfig { max_connections: 2 });
        let (tx1, _) = mpsc::unbounded_channel();
        let (tx2, _) = mpsc::unbounded_channel();
        let (tx3, _) = mpsc::unbounded_channel();

        hub.register(tx1).await.unwrap();
        hub.register(tx2).await.unwrap();
        let err = hub.register(tx3).await.unwrap_err();
        assert!(matches!(err, HubError::TooManyConnections(2)));
        assert_eq!(err.to_string(), "Too many connections (limit: 2)");
    }

    #[tokio::test]
    async fn test_unregister_drops_subscriptions() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        let subscribed = hub
            .subscribe(&id, vec!["gestures.*".into(), "bogus".into()])
            .await
            .unwrap();
        assert_eq!(subscribed, vec!["gestures.*"]);
        assert_eq!(hub.subscription_count("gestures.*").await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.subscription_count("gestures.*").await, 0);
    }

    #[tokio::test]
    async fn test_publish_to_exact_and_wildcard() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx_source, mut rx_source) = mpsc::unbounded_channel();
        let (tx_exact, mut rx_exact) = mpsc::unbounded_channel();
        let (tx_all, mut rx_all) = mpsc::unbounded_channel();

        let source = hub.register(tx_source).await.unwrap();
        let exact = hub.register(tx_exact).await.unwrap();
        let all = hub.register(tx_all).await.unwrap();

        hub.subscribe(&exact, vec![format!("gestures.{source}")])
            .await
            .unwrap();
        hub.subscribe(&all, vec!["gestures.*".into()]).await.unwrap();

        assert_eq!(hub.publish(&idle_event(&source)).await, 2);
        assert!(rx_exact.try_recv().is_ok());
        assert!(rx_all.try_recv().is_ok());
        assert!(rx_source.try_recv().is_err());

        // Subscribed to both forms: delivered once
        hub.subscribe(&all, vec![format!("gestures.{source}")])
            .await
            .unwrap();
        hub.unsubscribe(&exact, vec![format!("gestures.{source}")])
            .await
            .unwrap();
        assert_eq!(hub.publish(&idle_event(&source)).await, 1);
        assert!(rx_all.try_recv().is_ok());
        assert!(rx_all.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_to_unknown() {
        let hub = ConnectionHub::new(HubConfig::default());
        let err = hub.send_to("missing", ServerMessage::Pong).await.unwrap_err();
        assert!(matches!(err, HubError::ConnectionNotFound));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_publish_alongside_subscribe() {
        let hub = std::sync::Arc::new(ConnectionHub::new(HubConfig::default()));
        let (tx_source, _rx_source) = mpsc::unbounded_channel();
        let (tx_observer, mut rx_observer) = mpsc::unbounded_channel();
        let source = hub.register(tx_source).await.unwrap();
        let observer = hub.register(tx_observer).await.unwrap();
        hub.subscribe(&observer, vec!["gestures.*".into()]).await.unwrap();

        let publisher = {
            let hub = hub.clone();
            let event = idle_event(&source);
            tokio::spawn(async move {
                for _ in 0..20_000 {
                    hub.publish(&event).await;
                }
            })
        };
        let subscriber = {
            let hub = hub.clone();
            let topic = format!("gestures.{source}");
            tokio::spawn(async move {
                for _ in 0..20_000 {
                    hub.subscribe(&observer, vec![topic.clone()]).await.unwrap();
                }
            })
        };

        let both = async {
            publisher.await.unwrap();
            subscriber.await.unwrap();
        };
        tokio::time::timeout(std::time::Duration::from_secs(20), both)
            .await
            .expect("publish and subscribe should both finish");

        while rx_observer.try_recv().is_ok() {}
    }
}
