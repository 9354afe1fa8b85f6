// src/process/mod.rs

//! Child process supervision.
//!
//! - [`supervisor`] owns the child lifecycle: argv resolution, spawn,
//!   concurrent stream draining, bounded quiesce, cleanup and the final
//!   result-or-error report.
//! - [`reader`] defines the polymorphic stream reader contract and the
//!   default [`Gobbler`] that drains unread pipes.
//! - [`stopper`] is the out-of-band handle for stopping a running child,
//!   gracefully or forcefully.

pub mod reader;
pub mod stopper;
pub mod supervisor;

pub use reader::{Gobbler, StdReader, StreamHandle};
pub use stopper::Stopper;
pub use supervisor::{ArgumentsSupplier, Supervisor};
