// Messaging facade - single point of contact with the proximity service

use crate::platform::{MessagingService, ServiceEventReceiver};
use crate::{
    Channel, ConnectionResult, DeviceMessage, ErrorContext, Message, PublishOptions,
    ServiceEvent, Status, Strategy, SubscribeOptions,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Flat listener contract for everything the proximity service reports
pub trait NearbyMessageListener {
    fn on_device_found(&mut self, message: &str);
    fn on_device_lost(&mut self, message: &str);
    fn on_connection_failed(&mut self, result: &ConnectionResult);
    fn on_connection_suspended(&mut self, code: i32);
    fn on_connected(&mut self);
    fn on_device_subscription(&mut self, success: bool, status: &Status);
    fn on_device_subscription_expired(&mut self);
    fn on_publish(&mut self, success: bool, status: &Status);
    fn on_publish_expired(&mut self);
}

/// Owns the connection handle and forwards pub/sub requests to it.
///
/// Requests made while not connected are dropped without reaching the
/// service; callers check [`NearbyMessenger::is_connected`] first and
/// re-issue on connect.
pub struct NearbyMessenger {
    client: Option<Arc<dyn MessagingService>>,
    events: Option<ServiceEventReceiver>,
    strategy: Strategy,
}

impl NearbyMessenger {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            client: None,
            events: None,
            strategy,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Bind to a service session. No-op if a handle is already held.
    pub fn connect(&mut self, service: Arc<dyn MessagingService>) {
        if self.client.is_some() {
            debug!("Messenger already holds a connection handle");
            return;
        }

        info!("Connecting to {} proximity service", service.platform_name());
        let (tx, rx) = mpsc::unbounded_channel();
        service.connect(tx);
        self.client = Some(service);
        self.events = Some(rx);
    }

    /// Tear the handle down. Pending callbacks are discarded.
    pub fn disconnect(&mut self) {
        if let Some(client) = self.client.take() {
            info!("Disconnecting from {} proximity service", client.platform_name());
            client.disconnect();
        }
        self.events = None;
    }

    pub fn is_connected(&self) -> bool {
        self.client
            .as_ref()
            .map(|client| client.is_connected())
            .unwrap_or(false)
    }

    /// Subscribe for found/lost events with the configured TTL
    pub fn subscribe(&self) {
        match self.connected_client() {
            Some(client) => {
                debug!("Subscribing with ttl {:?}", self.strategy.ttl);
                client.subscribe(SubscribeOptions {
                    strategy: self.strategy,
                });
            }
            None => debug!("Ignoring subscribe while disconnected"),
        }
    }

    pub fn unsubscribe(&self) {
        match self.connected_client() {
            Some(client) => client.unsubscribe(),
            None => debug!("Ignoring unsubscribe while disconnected"),
        }
    }

    /// Publish a message with the configured TTL
    pub fn publish(&self, message: &Message) {
        match self.connected_client() {
            Some(client) => {
                debug!("Publishing {} bytes with ttl {:?}", message.content.len(), self.strategy.ttl);
                client.publish(
                    message,
                    PublishOptions {
                        strategy: self.strategy,
                    },
                );
            }
            None => debug!("Ignoring publish while disconnected"),
        }
    }

    pub fn unpublish(&self, message: &Message) {
        match self.connected_client() {
            Some(client) => client.unpublish(message),
            None => debug!("Ignoring unpublish while disconnected"),
        }
    }

    /// Wait for the next callback from the service.
    ///
    /// Returns `None` once there is no handle or the service dropped its sender.
    pub async fn next_event(&mut self) -> Option<ServiceEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => None,
        }
    }

    /// Take an already delivered callback without waiting
    pub fn try_next_event(&mut self) -> Option<ServiceEvent> {
        self.events.as_mut().and_then(|events| events.try_recv().ok())
    }

    /// Translate one service callback into the matching listener call.
    ///
    /// Found/lost payloads that are not device messages are logged and dropped.
    pub fn dispatch<L>(event: ServiceEvent, listener: &mut L)
    where
        L: NearbyMessageListener + ?Sized,
    {
        match event {
            ServiceEvent::Connected => listener.on_connected(),
            ServiceEvent::ConnectionSuspended(code) => listener.on_connection_suspended(code),
            ServiceEvent::ConnectionFailed(result) => listener.on_connection_failed(&result),
            ServiceEvent::PublishResult(status) => {
                listener.on_publish(status.is_success(), &status)
            }
            ServiceEvent::PublishExpired => listener.on_publish_expired(),
            ServiceEvent::SubscribeResult(status) => {
                listener.on_device_subscription(status.is_success(), &status)
            }
            ServiceEvent::SubscribeExpired => listener.on_device_subscription_expired(),
            ServiceEvent::Found(message) => {
                if let Some(device) = decode(&message, "found") {
                    listener.on_device_found(&device.message_body);
                }
            }
            ServiceEvent::Lost(message) => {
                if let Some(device) = decode(&message, "lost") {
                    listener.on_device_lost(&device.message_body);
                }
            }
        }
    }

    fn connected_client(&self) -> Option<&Arc<dyn MessagingService>> {
        self.client.as_ref().filter(|client| client.is_connected())
    }
}

impl Default for NearbyMessenger {
    fn default() -> Self {
        Self::new(Strategy::default())
    }
}

fn decode(message: &Message, kind: &str) -> Option<DeviceMessage> {
    match DeviceMessage::from_nearby_message(message) {
        Ok(device) => Some(device),
        Err(e) => {
            e.log_with_context(
                &ErrorContext::new()
                    .with_channel(Channel::Subscribe)
                    .with_info(format!("dropping {} event", kind)),
            );
            None
        }
    }
}
