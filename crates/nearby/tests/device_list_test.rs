use nearby::{
    ConnectionResult, DeviceListController, DeviceMessage, Lifecycle, NearbyMessenger,
    SimulatedClient, SimulatedNearby, Status, Strategy, ToggleState,
};
use std::sync::Arc;
use std::time::Duration;

fn device(uuid: &str, label: &str) -> DeviceMessage {
    DeviceMessage::new(uuid, label)
}

async fn started_controller(
    nearby: &SimulatedNearby,
    label: &str,
) -> (DeviceListController, Arc<SimulatedClient>) {
    let client = nearby.client();
    let mut list =
        DeviceListController::new(NearbyMessenger::default(), &device(label, label)).unwrap();
    list.start(client.clone());
    assert!(list.process_next_event().await, "expected a connect callback");
    assert!(list.messenger().is_connected());
    (list, client)
}

#[tokio::test]
async fn test_subscribe_before_connect_then_device_found_and_lost() {
    let nearby = SimulatedNearby::new();
    let client = nearby.client();
    let mut list = DeviceListController::new(
        NearbyMessenger::default(),
        &device("install-a", "Moto-G"),
    )
    .unwrap();

    // Switch flipped before the service is connected
    assert_eq!(list.set_subscribe(true).unwrap(), ToggleState::RequestedOn);
    list.start(client.clone());
    assert_eq!(list.lifecycle(), Lifecycle::Started);
    assert_eq!(client.request_counts().subscribe, 0);

    // Connected: the deferred subscribe goes out
    assert!(list.process_next_event().await);
    assert_eq!(client.request_counts().subscribe, 1);
    assert_eq!(list.subscribe_state(), ToggleState::On);

    // Service acknowledges
    assert!(list.process_next_event().await);
    assert_eq!(list.subscribe_state(), ToggleState::On);
    assert!(list.roster().is_empty());
    assert!(list.notices().is_empty());

    // A Pixel-7 nearby starts publishing
    let (mut pixel, _pixel_client) = started_controller(&nearby, "Pixel-7").await;
    assert_eq!(pixel.set_publish(true).unwrap(), ToggleState::On);

    assert!(list.process_next_event().await);
    assert_eq!(list.roster(), ["Pixel-7"]);

    // ...and stops
    assert_eq!(pixel.set_publish(false).unwrap(), ToggleState::Off);
    assert!(list.process_next_event().await);
    assert!(list.roster().is_empty());
}

#[tokio::test]
async fn test_requests_while_disconnected_do_not_reach_service() {
    let nearby = SimulatedNearby::new();
    let client = nearby.client();
    let mut list =
        DeviceListController::new(NearbyMessenger::default(), &device("a", "Moto-G")).unwrap();

    // Handle installed but the connect callback has not been processed yet
    list.start(client.clone());
    assert!(!list.messenger().is_connected());

    assert_eq!(list.set_subscribe(true).unwrap(), ToggleState::RequestedOn);
    assert_eq!(list.set_publish(true).unwrap(), ToggleState::RequestedOn);
    list.messenger().subscribe();
    list.messenger()
        .publish(&device("a", "Moto-G").to_nearby_message().unwrap());

    assert_eq!(client.request_counts().subscribe, 0);
    assert_eq!(client.request_counts().publish, 0);
    assert!(list.save_state().publishing);
    assert!(list.save_state().subscribing);
}

#[tokio::test]
async fn test_recreated_controller_reissues_each_request_once() {
    let nearby = SimulatedNearby::new();
    let me = device("install-a", "Moto-G");

    let first_client = nearby.client();
    let mut list = DeviceListController::new(NearbyMessenger::default(), &me).unwrap();
    list.set_publish(true).unwrap();
    list.set_subscribe(true).unwrap();
    list.start(first_client.clone());
    assert!(list.process_next_event().await);
    list.process_pending_events();
    assert_eq!(list.publish_state(), ToggleState::On);

    // Re-creation: switches survive, the connection does not
    let saved = list.save_state();
    list.stop();
    assert_eq!(list.lifecycle(), Lifecycle::Stopped);
    assert_eq!(list.publish_state(), ToggleState::RequestedOn);
    drop(list);

    let second_client = nearby.client();
    let mut recreated =
        DeviceListController::restore(NearbyMessenger::default(), &me, saved).unwrap();
    assert_eq!(recreated.publish_state(), ToggleState::RequestedOn);
    assert_eq!(recreated.subscribe_state(), ToggleState::RequestedOn);

    recreated.start(second_client.clone());
    assert!(recreated.process_next_event().await);
    recreated.process_pending_events();

    let counts = second_client.request_counts();
    assert_eq!(counts.publish, 1);
    assert_eq!(counts.subscribe, 1);
    assert_eq!(recreated.publish_state(), ToggleState::On);
    assert_eq!(recreated.subscribe_state(), ToggleState::On);
}

#[tokio::test]
async fn test_switch_flipped_before_connect_callback_is_sent_once() {
    let nearby = SimulatedNearby::new();
    let client = nearby.client();
    let mut list =
        DeviceListController::new(NearbyMessenger::default(), &device("a", "Moto-G")).unwrap();

    list.start(client.clone());
    // Let the service finish connecting without handling its callback yet
    tokio::task::yield_now().await;
    assert!(list.messenger().is_connected());

    assert_eq!(list.set_subscribe(true).unwrap(), ToggleState::RequestedOn);
    assert_eq!(client.request_counts().subscribe, 0);

    assert!(list.process_next_event().await);
    assert_eq!(client.request_counts().subscribe, 1);
    assert_eq!(list.subscribe_state(), ToggleState::On);

    list.process_pending_events();
    assert_eq!(client.request_counts().subscribe, 1);
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let nearby = SimulatedNearby::new();
    let (mut list, client) = started_controller(&nearby, "Moto-G").await;
    let other = nearby.client();

    list.start(other.clone());
    list.set_subscribe(true).unwrap();

    assert_eq!(client.request_counts().subscribe, 1);
    assert_eq!(other.request_counts().subscribe, 0);
}

#[tokio::test]
async fn test_rejected_subscribe_resets_switch() {
    let nearby = SimulatedNearby::new();
    let (mut list, client) = started_controller(&nearby, "Moto-G").await;
    client.reject_next_subscribe(Status::error(Status::TOO_MANY_REQUESTS, "quota"));

    assert_eq!(list.set_subscribe(true).unwrap(), ToggleState::On);
    assert!(list.process_next_event().await);

    assert_eq!(list.subscribe_state(), ToggleState::Off);
    assert_eq!(list.notices().len(), 1);
    assert!(list.notices()[0].text.starts_with("Could not subscribe"));

    // No automatic retry
    assert_eq!(client.request_counts().subscribe, 1);
}

#[tokio::test]
async fn test_rejected_publish_resets_switch() {
    let nearby = SimulatedNearby::new();
    let (mut list, client) = started_controller(&nearby, "Moto-G").await;
    client.reject_next_publish(Status::error(Status::PERMISSION_DENIED, "denied"));

    list.set_publish(true).unwrap();
    assert!(list.process_next_event().await);

    assert_eq!(list.publish_state(), ToggleState::Off);
    assert!(list.notices()[0].text.contains("denied"));
    assert_eq!(nearby.published_count(), 0);
}

#[tokio::test]
async fn test_stale_success_after_unsubscribe_is_ignored() {
    let nearby = SimulatedNearby::new();
    let (mut list, client) = started_controller(&nearby, "Moto-G").await;

    list.set_subscribe(true).unwrap();
    assert_eq!(list.set_subscribe(false).unwrap(), ToggleState::Off);
    assert_eq!(client.request_counts().unsubscribe, 1);

    // The subscribe acknowledgement is still queued
    assert!(list.process_next_event().await);
    assert_eq!(list.subscribe_state(), ToggleState::Off);
    assert!(list.notices().is_empty());
}

#[tokio::test]
async fn test_connection_failure_disables_both_switches() {
    let nearby = SimulatedNearby::new();
    let client = nearby.client();
    client.fail_next_connect(ConnectionResult::new(17, "location permission missing"));

    let mut list =
        DeviceListController::new(NearbyMessenger::default(), &device("a", "Moto-G")).unwrap();
    list.start(client.clone());
    assert!(list.process_next_event().await);

    assert!(!list.is_publish_enabled());
    assert!(!list.is_subscribe_enabled());
    assert!(list.set_publish(true).is_err());
    assert!(list.notices()[0]
        .text
        .contains("location permission missing"));
}

#[tokio::test]
async fn test_connection_suspended_keeps_switches() {
    let nearby = SimulatedNearby::new();
    let (mut list, client) = started_controller(&nearby, "Moto-G").await;
    list.set_subscribe(true).unwrap();
    list.process_pending_events();

    client.suspend(1);
    assert!(list.process_next_event().await);

    assert_eq!(list.subscribe_state(), ToggleState::On);
    assert_eq!(list.notices()[0].text, "Connection suspended. Error code: 1");
}

#[tokio::test(start_paused = true)]
async fn test_registrations_expire_after_ttl() {
    let nearby = SimulatedNearby::new();
    let (mut list, _client) = started_controller(&nearby, "Moto-G").await;

    list.set_publish(true).unwrap();
    list.process_pending_events();
    assert_eq!(list.publish_state(), ToggleState::On);

    let started = tokio::time::Instant::now();
    assert!(list.process_next_event().await);
    assert!(started.elapsed() >= Duration::from_secs(180));
    assert_eq!(list.publish_state(), ToggleState::Off);
    assert_eq!(nearby.published_count(), 0);
    assert!(list.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_subscription_expires_once_with_custom_ttl() {
    let nearby = SimulatedNearby::new();
    let client = nearby.client();
    let mut list = DeviceListController::new(
        NearbyMessenger::new(Strategy::with_ttl_seconds(5)),
        &device("a", "Moto-G"),
    )
    .unwrap();
    list.start(client.clone());
    list.set_subscribe(true).unwrap();
    assert!(list.process_next_event().await);
    list.process_pending_events();
    assert!(client.is_subscribed());

    let started = tokio::time::Instant::now();
    assert!(list.process_next_event().await);
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(180));
    assert_eq!(list.subscribe_state(), ToggleState::Off);
    assert!(!client.is_subscribed());

    // Nothing else is pending after the single expiry
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(list.process_pending_events(), 0);
}

#[tokio::test]
async fn test_stop_without_handle_is_harmless() {
    let mut list =
        DeviceListController::new(NearbyMessenger::default(), &device("a", "Moto-G")).unwrap();
    list.stop();
    assert!(!list.process_next_event().await);
    assert_eq!(list.lifecycle(), Lifecycle::Stopped);
}
