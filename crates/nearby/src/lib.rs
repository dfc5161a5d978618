pub mod types;
pub mod error;
pub mod platform;
pub mod messenger;
pub mod roster;
pub mod device_list;
pub mod preferences;
pub mod install_id;
pub mod simulated;

pub use types::*;
pub use error::{NearbyError, Result, ErrorContext};
pub use platform::{MessagingService, ServiceEventReceiver, ServiceEventSender};
pub use messenger::{NearbyMessageListener, NearbyMessenger};
pub use roster::NearbyDeviceRoster;
pub use device_list::{DeviceListController, Lifecycle, Notice, SavedToggles, ToggleState};
pub use preferences::{FilePreferences, InMemoryPreferences, PreferenceStore};
pub use install_id::{InstallId, KEY_UUID};
pub use simulated::{RequestCounts, SimulatedClient, SimulatedNearby};
