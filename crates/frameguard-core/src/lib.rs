//! frameguard Core - Refresh Guard
//!
//! Gates progress-display updates against a shared, externally owned display
//! surface:
//! - At most one mutation in flight per task identity
//! - At most one mutation per configured interval per task identity
//! - Mutation failures are logged and swallowed, never propagated
//!
//! # Example
//!
//! ```rust,ignore
//! use frameguard_core::{RefreshGuard, RefreshMode, TaskId, UpdateOutcome};
//!
//! let guard = RefreshGuard::default();
//! let task = TaskId::new("analysis-42")?;
//!
//! let outcome = guard.try_update(&task, RefreshMode::Fast, || surface.redraw());
//! if let UpdateOutcome::Recovered(err) = outcome {
//!     eprintln!("frame dropped: {err}");
//! }
//!
//! // Analysis finished: discard the bookkeeping for this task.
//! guard.release(&task);
//! ```

#![warn(unreachable_pub)]

pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod policy;
pub mod simulator;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DisplaySettings, GuardConfig};
pub use error::{BoxError, GuardError, MutationError};
pub use guard::{GuardStats, RefreshGuard, SlotDiagnostics};
pub use policy::{IntervalPolicy, TierMapping};
pub use simulator::{run_simulator, SimulatorConfig, SimulatorReport};
pub use types::{RefreshMode, SkipReason, TaskId, UpdateOutcome};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the refresh guard
    pub use crate::{
        Clock, GuardConfig, IntervalPolicy, RefreshGuard, RefreshMode, SkipReason, SystemClock,
        TaskId, TierMapping, UpdateOutcome,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
