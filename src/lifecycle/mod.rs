//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Bind primary → Bind metrics → Spawn one serve task per listener
//!
//! Running (coordinator.rs):
//!     Wait for signal, or for a server task to die (fatal)
//!
//! Shutdown (shutdown.rs, coordinator.rs):
//!     Broadcast → every server stops accepting and drains
//!     → join all against one deadline → collect errors
//!
//! Signals (signals.rs):
//!     SIGINT / SIGTERM → graceful shutdown
//! ```

pub mod coordinator;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use coordinator::{Lifecycle, LifecycleError, Phase, ShutdownError};
pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
