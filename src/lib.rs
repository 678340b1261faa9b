//! Stratum v1 mining pool client.
//!
//! This crate connects a worker program to a mining pool over the Stratum
//! v1 protocol: newline-delimited JSON-RPC on a persistent TCP connection.
//! The client subscribes, authorizes, receives a stream of mining jobs,
//! turns each into a hashable block header plus share target, and submits
//! nonces that satisfy the pool's current difficulty.
//!
//! # Protocol overview
//!
//! Stratum v1 is a bidirectional, event-driven protocol:
//!
//! - **Client requests**: subscribe, authorize, submit, suggest_difficulty
//! - **Server notifications**: mining.notify (new work),
//!   mining.set_difficulty, mining.set_extranonce, client.reconnect
//! - **Server responses**: results for client requests (boolean, array,
//!   or error payload)
//!
//! # Architecture
//!
//! Each connection is split across two execution contexts joined only by
//! typed channels. A dedicated I/O thread owns the socket, the line
//! framer, the pending-call table, and the protocol state; the
//! synchronous [`Client`] façade owns a mirror of that state and blocks
//! on typed receives with deadlines. Server notifications keep flowing
//! into the mirror even while a request is waiting for its response, so
//! no difficulty change or job announcement is ever lost.
//!
//! # Usage
//!
//! ```rust,ignore
//! use galena::{Client, ConnectionParams, JobResult};
//!
//! let mut client = Client::connect(ConnectionParams {
//!     hostname: "pool.example.com".to_string(),
//!     port: 3333,
//!     worker_name: "worker1".to_string(),
//!     password: "x".to_string(),
//! })?;
//!
//! let extranonce2 = client.next_extranonce2();
//! let job = client.build_current_job(extranonce2)?;
//! // ... search job.header_hex for a nonce meeting job.target ...
//!
//! let accepted = client.submit(&JobResult {
//!     worker_name: "worker1".to_string(),
//!     job_id: job.job_id.clone(),
//!     ntime: 0x4dd7f5c7,
//!     nonce: 0x9546a142,
//!     extranonce2,
//!     extranonce2_size: job.extranonce2_size,
//! })?;
//! ```

mod client;
mod connection;
mod error;
mod io;
mod job;
mod messages;
mod rpc;
mod state;
mod target;
mod u256;

pub use client::{Client, ConnectionParams};
pub use error::{Error, Result};
pub use job::{hex_reverse, Job, JobResult};
pub use messages::{JobNotification, StratumMethod};
pub use target::difficulty_to_target;
