//! # Ball Physics Server Library
//!
//! This library provides the authoritative server for the networked 2D
//! rigid-circle simulation. It owns the only true copy of world state and
//! streams incremental updates to any number of connected observers and
//! controllers over a line-oriented text protocol.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the definitive physics: fixed-tick integration, pairwise
//! circle collision resolution and world-boundary clamping. Clients never
//! simulate; they render what the server announces.
//!
//! ### Change Broadcasting
//! Every ball carries a dirty flag with read-and-clear semantics. After each
//! tick the server broadcasts exactly one update line per changed ball, so a
//! quiet world generates no traffic. Structural changes (add/remove) are
//! broadcast immediately, independent of the tick clock.
//!
//! ### Session Management
//! Each TCP connection gets a reader task, a writer task and an outbound line
//! queue. A fresh session receives a full snapshot before any incremental
//! update; a session whose connection fails is removed without disturbing
//! delivery to the others.
//!
//! ## Architecture Design
//!
//! The main loop is a single `tokio::select!` over a message channel and a
//! fixed-rate interval. It is the only writer for both the world and the
//! session set: acceptor, reader and writer tasks communicate with it purely
//! through messages, which eliminates iterate-while-mutating races on the
//! shared collections by construction.
//!
//! ## Module Organization
//!
//! - [`world`]: the ball collection, global simulation parameters and the
//!   per-tick physics advance.
//! - [`sim`]: the fixed-rate tick driver with its pause state machine.
//! - [`session`]: the live-session set and broadcast fan-out.
//! - [`network`]: TCP accept loop, per-session line pumps and command
//!   dispatch.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 60 ticks per second in a 1024x1024 world.
//!     let mut server = Server::new("127.0.0.1:8080", 60, 1024.0, 1024.0).await?;
//!
//!     // Runs the accept loop, the tick driver and the broadcast fan-out
//!     // until shutdown.
//!     server.run().await;
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod session;
pub mod sim;
pub mod world;
