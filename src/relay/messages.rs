//! Relay message types
//!
//! JSON text frames tagged by `type`, in both directions.

use serde::{Deserialize, Serialize};

use crate::vision::{Gesture, Landmark, StrokeAction, TrackerUpdate};

/// Messages sent from client to relay
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Canvas geometry for coordinate mapping
    Configure {
        width: u32,
        height: u32,
        #[serde(default)]
        mirrored: Option<bool>,
    },
    /// One detector result; an empty list means no hand
    Frame {
        #[serde(default)]
        landmarks: Vec<Landmark>,
        /// Capture time; the relay clock is used when absent
        #[serde(default)]
        timestamp_ms: Option<u64>,
    },
    /// Drop the current stroke
    Reset,
    Subscribe {
        topics: Vec<String>,
    },
    Unsubscribe {
        topics: Vec<String>,
    },
    Ping,
}

/// Messages sent from relay to client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        connection_id: String,
    },
    /// Tracker result for one frame
    Gesture {
        /// Session that produced the frame
        connection_id: String,
        gesture: Gesture,
        /// Display label, e.g. "Drawing" or "No hand"
        label: String,
        is_drawing: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        x: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        y: Option<f32>,
        action: StrokeAction,
    },
    Configured {
        width: u32,
        height: u32,
        mirrored: bool,
    },
    Subscribed {
        topics: Vec<String>,
    },
    Unsubscribed {
        topics: Vec<String>,
    },
    Pong,
    Error {
        message: String,
    },
}

impl ServerMessage {
    pub fn gesture(connection_id: &str, update: &TrackerUpdate) -> Self {
        ServerMessage::Gesture {
            connection_id: connection_id.to_string(),
            gesture: update.gesture,
            label: update.gesture.label().to_string(),
            is_drawing: update.is_drawing(),
            x: update.cursor.map(|p| p.x),
            y: update.cursor.map(|p| p.y),
            action: update.action,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

/// Message routed to topic subscribers
#[derive(Debug, Clone)]
pub struct RelayEvent {
    /// e.g. `gestures.{connection_id}`
    pub topic: String,
    pub message: ServerMessage,
}

impl RelayEvent {
    pub fn gesture(connection_id: &str, update: &TrackerUpdate) -> Self {
        Self {
            topic: gesture_topic(connection_id),
            message: ServerMessage::gesture(connection_id, update),
        }
    }
}

pub fn gesture_topic(connection_id: &str) -> String {
    format!("gestures.{connection_id}")
}
