// src/net/mod.rs

//! Loopback TCP plumbing for in-memory data exchange with the child.

pub mod tcp_server;

pub use tcp_server::{Negotiator, TcpServer};
