mod logging;

use anyhow::Result;
use nearby::{
    DeviceListController, DeviceMessage, FilePreferences, InMemoryPreferences, InstallId,
    NearbyMessenger, SimulatedNearby, Strategy,
};
use shared::Config;
use std::time::Duration;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    logging::init(config.logging.format);

    tracing::info!("Starting nearby devices demo");

    let prefs = FilePreferences::new(&config.nearby.preferences_path);
    let install_id = InstallId::get_or_create(&prefs).await?;
    tracing::info!(
        install_id = %install_id,
        label = %config.nearby.device_label,
        "Loaded device identity"
    );

    let strategy = Strategy::with_ttl_seconds(config.nearby.ttl_seconds);
    let run_for = Duration::from_secs(config.demo.run_seconds);
    let nearby = SimulatedNearby::new();

    let mut peers = Vec::with_capacity(config.demo.simulated_peers);
    for index in 0..config.demo.simulated_peers {
        // The first peer walks away halfway through
        let lifetime = if index == 0 { run_for / 2 } else { run_for };
        peers.push(spawn_peer(&nearby, strategy, index, lifetime).await?);
    }

    let device = DeviceMessage::new(install_id, config.nearby.device_label.clone());
    let mut list = DeviceListController::new(NearbyMessenger::new(strategy), &device)?;
    for switched in [list.set_publish(true), list.set_subscribe(true)] {
        if let Err(err) = switched {
            tracing::warn!(error = %err, "{}", err.user_message());
        }
    }
    list.start(nearby.client());

    let deadline = tokio::time::sleep(run_for);
    tokio::pin!(deadline);
    let mut shown = list.roster().to_vec();

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            more = list.process_next_event() => {
                if !more {
                    tracing::warn!("Proximity service closed its event channel");
                    break;
                }
                if list.roster() != shown.as_slice() {
                    shown = list.roster().to_vec();
                    tracing::info!(devices = ?shown, "Nearby devices changed");
                }
            }
        }
    }

    for notice in list.notices() {
        tracing::info!(at = %notice.at, "Notice: {}", notice.text);
    }
    tracing::info!(
        devices = ?list.roster(),
        publishing = ?list.publish_state(),
        subscribing = ?list.subscribe_state(),
        "Demo finished"
    );

    list.stop();
    for peer in peers {
        peer.abort();
    }

    Ok(())
}

/// Run a simulated nearby device that publishes its label for `lifetime`
async fn spawn_peer(
    nearby: &SimulatedNearby,
    strategy: Strategy,
    index: usize,
    lifetime: Duration,
) -> Result<JoinHandle<()>> {
    let install_id = InstallId::get_or_create(&InMemoryPreferences::new()).await?;
    let device = DeviceMessage::new(install_id, format!("Simulated-{}", index + 1));
    let mut peer = DeviceListController::new(NearbyMessenger::new(strategy), &device)?;
    peer.set_publish(true)?;
    peer.start(nearby.client());

    Ok(tokio::spawn(async move {
        let deadline = tokio::time::sleep(lifetime);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                more = peer.process_next_event() => if !more { break },
            }
        }
        tracing::debug!(peer = index + 1, "Simulated peer leaving");
        peer.stop();
    }))
}
