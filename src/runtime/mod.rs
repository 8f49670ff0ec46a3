//! # Runtime Module
//!
//! Runtime components of the service: initialization, shutdown handling and
//! the closer registry.

pub mod closer;
pub mod initialization;
pub mod shutdown;

pub use closer::{Closer, CloserError, CloserRegistry};
pub use initialization::{initialize, run, AppContext};
pub use shutdown::{drain_within, termination_signal, Drained};
