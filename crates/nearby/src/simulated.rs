//! In-process stand-in for the proximity messaging service.
//!
//! Every [`SimulatedClient`] created from the same [`SimulatedNearby`] medium
//! is "nearby" every other one. The medium honours the service contract:
//! results and found/lost notifications arrive as events, and registrations
//! expire after their strategy's TTL. Timers run as tokio tasks, so clients
//! must be used from within a tokio runtime.

use crate::platform::{MessagingService, ServiceEventSender};
use crate::{ConnectionResult, Message, PublishOptions, ServiceEvent, Status, SubscribeOptions};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

type ClientId = u64;

/// How many requests of each kind reached the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    pub publish: u32,
    pub unpublish: u32,
    pub subscribe: u32,
    pub unsubscribe: u32,
}

#[derive(Default)]
struct ClientState {
    events: Option<ServiceEventSender>,
    connected: bool,
    // Bumped on every connect/disconnect so stale connect tasks can tell
    session: u64,
    // Bumped on every registration so stale TTL timers can tell
    generation: u64,
    subscription: Option<u64>,
    publications: HashMap<Message, u64>,
    fail_next_connect: Option<ConnectionResult>,
    reject_next_publish: Option<Status>,
    reject_next_subscribe: Option<Status>,
    requests: RequestCounts,
}

impl ClientState {
    fn emit(&self, event: ServiceEvent) {
        if let Some(events) = &self.events {
            // Receiver gone means the facade already tore down
            let _ = events.send(event);
        }
    }

    fn is_listening(&self) -> bool {
        self.connected && self.subscription.is_some()
    }
}

#[derive(Default)]
struct Medium {
    clients: HashMap<ClientId, ClientState>,
    next_id: ClientId,
}

impl Medium {
    fn notify_others(&self, publisher: ClientId, event: &ServiceEvent) {
        for (id, client) in &self.clients {
            if *id != publisher && client.is_listening() {
                client.emit(event.clone());
            }
        }
    }

    fn withdraw(&mut self, publisher: ClientId, message: &Message) -> bool {
        let removed = self
            .clients
            .get_mut(&publisher)
            .and_then(|client| client.publications.remove(message))
            .is_some();
        if removed {
            self.notify_others(publisher, &ServiceEvent::Lost(message.clone()));
        }
        removed
    }
}

/// Shared medium all simulated clients talk through
#[derive(Clone, Default)]
pub struct SimulatedNearby {
    medium: Arc<Mutex<Medium>>,
}

impl SimulatedNearby {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new client session on this medium
    pub fn client(&self) -> Arc<SimulatedClient> {
        let mut medium = self.lock();
        let id = medium.next_id;
        medium.next_id += 1;
        medium.clients.insert(id, ClientState::default());
        Arc::new(SimulatedClient {
            id,
            nearby: self.clone(),
        })
    }

    /// Number of messages currently published across all clients
    pub fn published_count(&self) -> usize {
        self.lock()
            .clients
            .values()
            .map(|client| client.publications.len())
            .sum()
    }

    fn lock(&self) -> MutexGuard<'_, Medium> {
        self.medium.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_client<R>(&self, id: ClientId, f: impl FnOnce(&mut ClientState) -> R) -> Option<R> {
        self.lock().clients.get_mut(&id).map(f)
    }

    fn spawn_connect(&self, id: ClientId, session: u64) {
        let nearby = self.clone();
        tokio::spawn(async move {
            nearby.with_client(id, |client| {
                if client.session != session {
                    return;
                }
                match client.fail_next_connect.take() {
                    Some(result) => {
                        info!("Simulated client {} failed to connect", id);
                        client.emit(ServiceEvent::ConnectionFailed(result));
                    }
                    None => {
                        client.connected = true;
                        debug!("Simulated client {} connected", id);
                        client.emit(ServiceEvent::Connected);
                    }
                }
            });
        });
    }

    fn spawn_publish_expiry(&self, id: ClientId, message: Message, generation: u64, ttl: Duration) {
        let nearby = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut medium = nearby.lock();
            let current = medium
                .clients
                .get(&id)
                .and_then(|client| client.publications.get(&message))
                .copied();
            if current == Some(generation) {
                medium.withdraw(id, &message);
                if let Some(client) = medium.clients.get(&id) {
                    debug!("Simulated publication of client {} expired", id);
                    client.emit(ServiceEvent::PublishExpired);
                }
            }
        });
    }

    fn spawn_subscribe_expiry(&self, id: ClientId, generation: u64, ttl: Duration) {
        let nearby = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            nearby.with_client(id, |client| {
                if client.subscription == Some(generation) {
                    client.subscription = None;
                    debug!("Simulated subscription of client {} expired", id);
                    client.emit(ServiceEvent::SubscribeExpired);
                }
            });
        });
    }
}

/// One device's session with the simulated medium
pub struct SimulatedClient {
    id: ClientId,
    nearby: SimulatedNearby,
}

impl SimulatedClient {
    /// Make the next connect attempt fail with `result`
    pub fn fail_next_connect(&self, result: ConnectionResult) {
        self.nearby.with_client(self.id, |client| {
            client.fail_next_connect = Some(result);
        });
    }

    /// Answer the next publish with `status` instead of registering it
    pub fn reject_next_publish(&self, status: Status) {
        self.nearby.with_client(self.id, |client| {
            client.reject_next_publish = Some(status);
        });
    }

    /// Answer the next subscribe with `status` instead of registering it
    pub fn reject_next_subscribe(&self, status: Status) {
        self.nearby.with_client(self.id, |client| {
            client.reject_next_subscribe = Some(status);
        });
    }

    /// Report a transient interruption; the session stays up
    pub fn suspend(&self, code: i32) {
        self.nearby.with_client(self.id, |client| {
            client.emit(ServiceEvent::ConnectionSuspended(code));
        });
    }

    pub fn request_counts(&self) -> RequestCounts {
        self.nearby
            .with_client(self.id, |client| client.requests)
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self) -> bool {
        self.nearby
            .with_client(self.id, |client| client.subscription.is_some())
            .unwrap_or(false)
    }
}

impl MessagingService for SimulatedClient {
    fn connect(&self, events: ServiceEventSender) {
        let session = self.nearby.with_client(self.id, |client| {
            client.session += 1;
            client.events = Some(events);
            client.session
        });
        if let Some(session) = session {
            self.nearby.spawn_connect(self.id, session);
        }
    }

    fn disconnect(&self) {
        let mut medium = self.nearby.lock();
        let publications: Vec<Message> = match medium.clients.get_mut(&self.id) {
            Some(client) => {
                client.session += 1;
                client.connected = false;
                client.events = None;
                client.subscription = None;
                client.publications.keys().cloned().collect()
            }
            None => return,
        };
        for message in &publications {
            medium.withdraw(self.id, message);
        }
        debug!("Simulated client {} disconnected", self.id);
    }

    fn is_connected(&self) -> bool {
        self.nearby
            .with_client(self.id, |client| client.connected)
            .unwrap_or(false)
    }

    fn subscribe(&self, options: SubscribeOptions) {
        let mut medium = self.nearby.lock();
        let Some(client) = medium.clients.get_mut(&self.id) else {
            return;
        };
        client.requests.subscribe += 1;

        if !client.connected {
            client.emit(ServiceEvent::SubscribeResult(Status::error(
                Status::NOT_CONNECTED,
                "not connected",
            )));
            return;
        }
        if let Some(status) = client.reject_next_subscribe.take() {
            client.emit(ServiceEvent::SubscribeResult(status));
            return;
        }

        client.generation += 1;
        let generation = client.generation;
        client.subscription = Some(generation);
        client.emit(ServiceEvent::SubscribeResult(Status::success()));

        let visible: Vec<Message> = medium
            .clients
            .iter()
            .filter(|(id, other)| **id != self.id && other.connected)
            .flat_map(|(_, other)| other.publications.keys().cloned())
            .collect();
        if let Some(client) = medium.clients.get(&self.id) {
            for message in visible {
                client.emit(ServiceEvent::Found(message));
            }
        }
        drop(medium);

        self.nearby
            .spawn_subscribe_expiry(self.id, generation, options.strategy.ttl);
    }

    fn unsubscribe(&self) {
        self.nearby.with_client(self.id, |client| {
            client.requests.unsubscribe += 1;
            client.subscription = None;
        });
    }

    fn publish(&self, message: &Message, options: PublishOptions) {
        let mut medium = self.nearby.lock();
        let Some(client) = medium.clients.get_mut(&self.id) else {
            return;
        };
        client.requests.publish += 1;

        if !client.connected {
            client.emit(ServiceEvent::PublishResult(Status::error(
                Status::NOT_CONNECTED,
                "not connected",
            )));
            return;
        }
        if let Some(status) = client.reject_next_publish.take() {
            client.emit(ServiceEvent::PublishResult(status));
            return;
        }

        client.generation += 1;
        let generation = client.generation;
        client.publications.insert(message.clone(), generation);
        client.emit(ServiceEvent::PublishResult(Status::success()));
        medium.notify_others(self.id, &ServiceEvent::Found(message.clone()));
        drop(medium);

        self.nearby
            .spawn_publish_expiry(self.id, message.clone(), generation, options.strategy.ttl);
    }

    fn unpublish(&self, message: &Message) {
        let mut medium = self.nearby.lock();
        if let Some(client) = medium.clients.get_mut(&self.id) {
            client.requests.unpublish += 1;
        }
        medium.withdraw(self.id, message);
    }

    fn platform_name(&self) -> &str {
        "simulated"
    }
}

impl Drop for SimulatedClient {
    fn drop(&mut self) {
        let mut medium = self.nearby.lock();
        let publications: Vec<Message> = medium
            .clients
            .get(&self.id)
            .map(|client| client.publications.keys().cloned().collect())
            .unwrap_or_default();
        for message in &publications {
            medium.withdraw(self.id, message);
        }
        medium.clients.remove(&self.id);
    }
}
