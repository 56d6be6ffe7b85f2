pub mod config;
pub mod constants;
pub mod event;
pub mod logging;
pub mod namespace;
pub mod run_state;
pub mod watch_list;

pub use config::{Config, ConfigLoader};
pub use event::{parse_event_line, ProcessEvent};
pub use namespace::{NamespaceIdentity, NamespaceReader, NamespaceTracker, SpawnerLister};
pub use run_state::RunState;
pub use watch_list::{AddOutcome, RemoveOutcome, WatchList, WatchListError};
