// Platform abstraction for the proximity messaging service
// The service itself (discovery, ranging, matching, TTL bookkeeping) is opaque.

use crate::{Message, PublishOptions, ServiceEvent, SubscribeOptions};
use tokio::sync::mpsc;

/// Channel on which a service delivers its asynchronous callbacks
pub type ServiceEventSender = mpsc::UnboundedSender<ServiceEvent>;
pub type ServiceEventReceiver = mpsc::UnboundedReceiver<ServiceEvent>;

/// Capability surface of a proximity messaging service.
///
/// Every method returns immediately. Results, found/lost notifications and
/// expiries are delivered later as [`ServiceEvent`]s on the sender passed to
/// [`MessagingService::connect`], in the order the service produced them.
pub trait MessagingService: Send + Sync {
    /// Begin connecting. Emits `Connected` or `ConnectionFailed` later.
    fn connect(&self, events: ServiceEventSender);

    /// Drop the session. Registrations made through it are withdrawn.
    fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// Register for found/lost events. Emits `SubscribeResult`, then
    /// `SubscribeExpired` once the strategy's TTL elapses.
    fn subscribe(&self, options: SubscribeOptions);

    fn unsubscribe(&self);

    /// Register a message. Emits `PublishResult`, then `PublishExpired`
    /// once the strategy's TTL elapses.
    fn publish(&self, message: &Message, options: PublishOptions);

    fn unpublish(&self, message: &Message);

    /// Platform name for logging
    fn platform_name(&self) -> &str;
}
