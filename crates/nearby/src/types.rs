use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::{NearbyError, Result};

/// Lifetime of a publication or subscription before the service expires it
pub const TTL_SECONDS: u64 = 3 * 60;

/// Opaque payload handed to the proximity service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    pub content: Vec<u8>,
}

impl Message {
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }
}

/// What this app publishes: a stable per-install id plus a readable label.
///
/// The id keeps the payload unique per install so the service does not
/// de-duplicate two devices that happen to share a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMessage {
    pub uuid: String,
    pub message_body: String,
}

impl DeviceMessage {
    pub fn new(uuid: impl Into<String>, message_body: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            message_body: message_body.into(),
        }
    }

    /// Wrap this device message into a service payload
    pub fn to_nearby_message(&self) -> Result<Message> {
        Ok(Message::new(serde_json::to_vec(self)?))
    }

    /// Decode a service payload published by another instance of this app
    pub fn from_nearby_message(message: &Message) -> Result<Self> {
        serde_json::from_slice(&message.content).map_err(|e| {
            NearbyError::Serialization(format!("invalid device message payload: {}", e))
        })
    }
}

/// Result of a publish or subscribe request as reported by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: i32,
    pub message: Option<String>,
}

impl Status {
    pub const SUCCESS: i32 = 0;
    pub const NOT_CONNECTED: i32 = 2;
    pub const ERROR: i32 = 13;
    pub const TOO_MANY_REQUESTS: i32 = 2803;
    pub const PERMISSION_DENIED: i32 = 2806;

    pub fn success() -> Self {
        Self {
            code: Self::SUCCESS,
            message: None,
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == Self::SUCCESS
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "Status{{code={}, message={}}}", self.code, message),
            None => write!(f, "Status{{code={}}}", self.code),
        }
    }
}

/// Why a connection to the service could not be established
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionResult {
    pub code: i32,
    pub message: Option<String>,
}

impl ConnectionResult {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: Some(message.into()),
        }
    }

    pub fn error_message(&self) -> &str {
        self.message.as_deref().unwrap_or("unknown error")
    }
}

/// Pub/sub strategy shared by publish and subscribe requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategy {
    pub ttl: Duration,
}

impl Strategy {
    pub fn with_ttl_seconds(seconds: u64) -> Self {
        Self {
            ttl: Duration::from_secs(seconds),
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self::with_ttl_seconds(TTL_SECONDS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishOptions {
    pub strategy: Strategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubscribeOptions {
    pub strategy: Strategy,
}

/// Callbacks delivered asynchronously by the proximity service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    Connected,
    ConnectionSuspended(i32),
    ConnectionFailed(ConnectionResult),
    PublishResult(Status),
    PublishExpired,
    SubscribeResult(Status),
    SubscribeExpired,
    Found(Message),
    Lost(Message),
}

/// The two independent pub/sub channels a user can toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Publish,
    Subscribe,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Publish => write!(f, "publish"),
            Channel::Subscribe => write!(f, "subscribe"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_message_payload() {
        let device = DeviceMessage::new("1b4e28ba-2fa1-11d2-883f-0016d3cca427", "Pixel-7");
        let message = device.to_nearby_message().unwrap();

        let json: serde_json::Value = serde_json::from_slice(&message.content).unwrap();
        assert_eq!(json["message_body"], "Pixel-7");

        let decoded = DeviceMessage::from_nearby_message(&message).unwrap();
        assert_eq!(decoded, device);
    }

    #[test]
    fn test_foreign_payload_is_rejected() {
        let message = Message::new(b"not json".to_vec());
        let err = DeviceMessage::from_nearby_message(&message).unwrap_err();
        assert!(matches!(err, NearbyError::Serialization(_)));
    }

    #[test]
    fn test_default_strategy_ttl() {
        assert_eq!(Strategy::default().ttl, Duration::from_secs(180));
        assert_eq!(PublishOptions::default().strategy.ttl.as_secs(), TTL_SECONDS);
    }

    #[test]
    fn test_status_display() {
        assert!(Status::success().is_success());
        let status = Status::error(Status::TOO_MANY_REQUESTS, "slow down");
        assert!(!status.is_success());
        assert_eq!(status.to_string(), "Status{code=2803, message=slow down}");
    }
}
