//! frameguard Progress - Guarded Live Progress Display
//!
//! Polls a progress source for one analysis task and renders frames onto a
//! display surface, with every mutation passing through a shared
//! [`RefreshGuard`](frameguard_core::RefreshGuard):
//! - `snapshot`: progress data published by the producing task
//! - `frame`: render model derived from a snapshot
//! - `source`: where snapshots come from (in-memory, JSON files)
//! - `surface`: where frames go (any writer, or your own UI)
//! - `display`: the polling loop tying them together
//!
//! # Example
//!
//! ```rust,ignore
//! use frameguard_core::{GuardConfig, RefreshGuard, TaskId};
//! use frameguard_progress::{FileSource, ProgressDisplay, WriterSurface};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GuardConfig::load("frameguard.toml")?;
//! let guard = Arc::new(RefreshGuard::from_config(&config));
//! let task = TaskId::new("analysis-42")?;
//!
//! let mut display = ProgressDisplay::new(
//!     task,
//!     guard,
//!     FileSource::new("./progress"),
//!     WriterSurface::stdout(),
//!     &config,
//! );
//! let end = display.auto_refresh().await;
//! println!("auto refresh ended: {end:?}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod display;
pub mod error;
pub mod format;
pub mod frame;
pub mod snapshot;
pub mod source;
pub mod surface;

pub use display::{DisplayState, ProgressDisplay, RefreshEnd};
pub use error::{SourceError, SurfaceError};
pub use format::format_duration;
pub use frame::ProgressFrame;
pub use snapshot::{ProgressSnapshot, ProgressStatus};
pub use source::{FileSource, MemorySource, ProgressSource};
pub use surface::{DisplaySurface, WriterSurface};
