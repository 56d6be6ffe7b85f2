pub mod channel;
pub mod error;
pub mod event_source;
pub mod hide_daemon;
pub mod lifecycle;
pub mod monitor;
pub mod platform;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use channel::{channel_pair, ChannelError, HandoffRequest, HideChannel, HideEndpoint};
pub use error::{ExitReason, MonitorError};
pub use event_source::{
    ChannelEventSource, ChannelEventSourceLauncher, CommandEventSource,
    CommandEventSourceLauncher, EventSource, EventSourceLauncher,
};
pub use hide_daemon::{
    CommandHideAction, ConfiguredHideAction, HideAction, HideDaemon, HideDaemonExit,
    NoopHideAction,
};
pub use lifecycle::{launch, Lifecycle, MonitorHandle};
pub use monitor::{Monitor, MonitorSettings};
pub use platform::{LinuxProcessControl, ProcessControl};
