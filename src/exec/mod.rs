// src/exec/mod.rs

//! Concurrent worker execution layer.
//!
//! The [`Executor`] runs named workers (boxed futures) alongside a child
//! process: loopback-socket helpers and the stdout/stderr readers. It
//! captures the first worker error, tracks liveness for diagnostics, and
//! supports an idempotent stop that aborts everything it started.

pub mod executor;

pub use executor::{Executor, Worker};
