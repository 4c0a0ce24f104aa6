pub mod config;
pub mod desktop;
pub mod dispatch;
pub mod feed;
pub mod lifecycle;
mod lock;
pub mod logging;
pub mod scheduler;
pub mod supervisor;

pub(crate) use lock::lock_or_recover;
pub use config::{AppConfig, SessionConfig};
pub use lifecycle::{Coordinator, LifecycleState, ShutdownHandle, ShutdownReason, ShutdownSummary};
