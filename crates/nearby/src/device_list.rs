// Device list controller - publish/subscribe switches plus the nearby roster
// Reconciles the switches with the messenger's asynchronous connection lifecycle.

use crate::messenger::{NearbyMessageListener, NearbyMessenger};
use crate::platform::MessagingService;
use crate::roster::NearbyDeviceRoster;
use crate::{Channel, ConnectionResult, DeviceMessage, Message, NearbyError, Result, Status};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// State of one pub/sub switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToggleState {
    Off,
    /// Switched on while disconnected; the request goes out on connect
    RequestedOn,
    /// Request sent and not yet failed or expired
    On,
}

impl ToggleState {
    /// Whether the switch shows as on
    pub fn is_checked(self) -> bool {
        !matches!(self, ToggleState::Off)
    }
}

#[derive(Debug, Clone, Copy)]
struct Toggle {
    state: ToggleState,
    enabled: bool,
}

impl Toggle {
    fn restore(checked: bool, enabled: bool) -> Self {
        Self {
            state: if checked {
                ToggleState::RequestedOn
            } else {
                ToggleState::Off
            },
            enabled,
        }
    }
}

/// Switch positions that outlive a controller, e.g. across re-creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedToggles {
    pub publishing: bool,
    pub subscribing: bool,
    #[serde(default = "enabled_by_default")]
    pub publish_enabled: bool,
    #[serde(default = "enabled_by_default")]
    pub subscribe_enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Default for SavedToggles {
    fn default() -> Self {
        Self {
            publishing: false,
            subscribing: false,
            publish_enabled: true,
            subscribe_enabled: true,
        }
    }
}

/// Where the controller is in its start/stop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Started,
    Stopped,
}

/// Short user-facing message about a failure or interruption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub at: DateTime<Utc>,
}

pub struct DeviceListController {
    messenger: NearbyMessenger,
    message: Message,
    publish: Toggle,
    subscribe: Toggle,
    roster: NearbyDeviceRoster,
    notices: Vec<Notice>,
    lifecycle: Lifecycle,
    /// Set once the connect callback has been handled for the current handle
    ready: bool,
}

impl DeviceListController {
    /// Create a controller with both switches off
    pub fn new(messenger: NearbyMessenger, device: &DeviceMessage) -> Result<Self> {
        Self::restore(messenger, device, SavedToggles::default())
    }

    /// Create a controller whose switches start where a previous one left them.
    ///
    /// Checked switches wait for the next connection before anything is sent.
    pub fn restore(
        messenger: NearbyMessenger,
        device: &DeviceMessage,
        saved: SavedToggles,
    ) -> Result<Self> {
        Ok(Self {
            messenger,
            message: device.to_nearby_message()?,
            publish: Toggle::restore(saved.publishing, saved.publish_enabled),
            subscribe: Toggle::restore(saved.subscribing, saved.subscribe_enabled),
            roster: NearbyDeviceRoster::new(),
            notices: Vec::new(),
            lifecycle: Lifecycle::Created,
            ready: false,
        })
    }

    /// Bind to the service. Reuses the existing handle if there is one.
    pub fn start(&mut self, service: Arc<dyn MessagingService>) {
        self.messenger.connect(service);
        self.lifecycle = Lifecycle::Started;
    }

    /// Release the connection handle.
    ///
    /// Nothing is unpublished or unsubscribed first; the service expires the
    /// registrations on its own once their TTL runs out.
    pub fn stop(&mut self) {
        self.messenger.disconnect();
        self.ready = false;
        for toggle in [&mut self.publish, &mut self.subscribe] {
            if toggle.state == ToggleState::On {
                toggle.state = ToggleState::RequestedOn;
            }
        }
        self.lifecycle = Lifecycle::Stopped;
    }

    pub fn save_state(&self) -> SavedToggles {
        SavedToggles {
            publishing: self.publish.state.is_checked(),
            subscribing: self.subscribe.state.is_checked(),
            publish_enabled: self.publish.enabled,
            subscribe_enabled: self.subscribe.enabled,
        }
    }

    pub fn set_subscribe(&mut self, on: bool) -> Result<ToggleState> {
        self.set_toggle(Channel::Subscribe, on)
    }

    pub fn set_publish(&mut self, on: bool) -> Result<ToggleState> {
        self.set_toggle(Channel::Publish, on)
    }

    /// Wait for the next service callback and apply it.
    ///
    /// Returns `false` when no more callbacks can arrive.
    pub async fn process_next_event(&mut self) -> bool {
        match self.messenger.next_event().await {
            Some(event) => {
                NearbyMessenger::dispatch(event, self);
                true
            }
            None => false,
        }
    }

    /// Apply every callback that has already been delivered
    pub fn process_pending_events(&mut self) -> usize {
        let mut processed = 0;
        while let Some(event) = self.messenger.try_next_event() {
            NearbyMessenger::dispatch(event, self);
            processed += 1;
        }
        processed
    }

    pub fn subscribe_state(&self) -> ToggleState {
        self.subscribe.state
    }

    pub fn publish_state(&self) -> ToggleState {
        self.publish.state
    }

    pub fn is_subscribe_enabled(&self) -> bool {
        self.subscribe.enabled
    }

    pub fn is_publish_enabled(&self) -> bool {
        self.publish.enabled
    }

    pub fn roster(&self) -> &[String] {
        self.roster.labels()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn messenger(&self) -> &NearbyMessenger {
        &self.messenger
    }

    fn set_toggle(&mut self, channel: Channel, on: bool) -> Result<ToggleState> {
        let toggle = *self.toggle(channel);
        if !toggle.enabled {
            return Err(NearbyError::ControlDisabled(channel));
        }
        if toggle.state.is_checked() == on {
            return Ok(toggle.state);
        }

        // Until on_connected runs, requests stay deferred even if the service
        // already reports connected
        let connected = self.ready && self.messenger.is_connected();
        let next = if on {
            if connected {
                self.send_request(channel);
                ToggleState::On
            } else {
                debug!("Deferring {} until connected", channel);
                ToggleState::RequestedOn
            }
        } else {
            if connected {
                self.send_cancel(channel);
            }
            ToggleState::Off
        };

        self.toggle_mut(channel).state = next;
        Ok(next)
    }

    fn send_request(&self, channel: Channel) {
        match channel {
            Channel::Publish => self.messenger.publish(&self.message),
            Channel::Subscribe => self.messenger.subscribe(),
        }
    }

    fn send_cancel(&self, channel: Channel) {
        match channel {
            Channel::Publish => self.messenger.unpublish(&self.message),
            Channel::Subscribe => self.messenger.unsubscribe(),
        }
    }

    fn toggle(&self, channel: Channel) -> &Toggle {
        match channel {
            Channel::Publish => &self.publish,
            Channel::Subscribe => &self.subscribe,
        }
    }

    fn toggle_mut(&mut self, channel: Channel) -> &mut Toggle {
        match channel {
            Channel::Publish => &mut self.publish,
            Channel::Subscribe => &mut self.subscribe,
        }
    }

    fn on_result(&mut self, channel: Channel, success: bool, status: &Status) {
        let state = self.toggle(channel).state;
        if state == ToggleState::Off {
            debug!("Ignoring stale {} result {}", channel, status);
            return;
        }

        if success {
            info!("{} succeeded", channel);
        } else {
            self.log_and_notify(format!("Could not {}, status = {}", channel, status));
            self.toggle_mut(channel).state = ToggleState::Off;
        }
    }

    fn on_expired(&mut self, channel: Channel) {
        match channel {
            Channel::Publish => info!("No longer publishing"),
            Channel::Subscribe => info!("No longer subscribing"),
        }
        self.toggle_mut(channel).state = ToggleState::Off;
    }

    fn log_and_notify(&mut self, text: String) {
        warn!("{}", text);
        self.notices.push(Notice {
            text,
            at: Utc::now(),
        });
    }
}

impl NearbyMessageListener for DeviceListController {
    fn on_device_found(&mut self, message: &str) {
        if self.roster.insert(message) {
            info!("Device found: {}", message);
        }
    }

    fn on_device_lost(&mut self, message: &str) {
        if self.roster.remove(message) {
            info!("Device lost: {}", message);
        }
    }

    fn on_connection_failed(&mut self, result: &ConnectionResult) {
        self.ready = false;
        self.publish.enabled = false;
        self.subscribe.enabled = false;
        self.log_and_notify(format!(
            "Exception while connecting to the proximity service: {}",
            result.error_message()
        ));
    }

    fn on_connection_suspended(&mut self, code: i32) {
        self.log_and_notify(format!("Connection suspended. Error code: {}", code));
    }

    fn on_connected(&mut self) {
        info!("Proximity service connected");
        self.ready = true;
        // Switches survive re-creation but the connection does not, so any
        // checked switch is re-issued here.
        for channel in [Channel::Publish, Channel::Subscribe] {
            if self.toggle(channel).state.is_checked() {
                self.send_request(channel);
                self.toggle_mut(channel).state = ToggleState::On;
            }
        }
    }

    fn on_device_subscription(&mut self, success: bool, status: &Status) {
        self.on_result(Channel::Subscribe, success, status);
    }

    fn on_device_subscription_expired(&mut self) {
        self.on_expired(Channel::Subscribe);
    }

    fn on_publish(&mut self, success: bool, status: &Status) {
        self.on_result(Channel::Publish, success, status);
    }

    fn on_publish_expired(&mut self) {
        self.on_expired(Channel::Publish);
    }
}
