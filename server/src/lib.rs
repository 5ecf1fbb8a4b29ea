//! # Relay Server Library
//!
//! This library provides the relay for a host-authoritative multiplayer
//! session. The relay never simulates anything: one participant's client is
//! the authoritative host, and the relay forwards messages between that host
//! and every other member of its room, who cannot reach each other directly.
//!
//! ## Core Responsibilities
//!
//! ### Session Setup
//! Every accepted connection is assigned a unique character hash and a
//! default character. The first connection in a room becomes its host and is
//! told so with `HostConfirm`. Later connections are announced to the host
//! with `HostAcknowledge` and receive their own character under `Joined`.
//!
//! ### Message Forwarding
//! Member movement and attack requests are stamped with the sender's hash
//! and delivered to the host only. The host's authoritative broadcasts and
//! removal notices are delivered to every other member. Nothing a member
//! sends is ever applied to relay state directly.
//!
//! ### Host Loss
//! The host never migrates. When the host disconnects every remaining member
//! is told the host left and is disconnected; the room starts over empty.
//!
//! ## Architecture Design
//!
//! ### Single Routing Task
//! Connection tasks decode frames and forward them as events to one task
//! that owns every room. Joins, departures and host elections are therefore
//! applied one at a time in arrival order, so two connections can never both
//! believe they host the same room.
//!
//! ### WebSocket Transport
//! Each connection is a WebSocket carrying one bincode-encoded message per
//! binary frame. The transport provides reliable, ordered delivery and a
//! close notification, which is all the relay relies on.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! Per-connection records: assigned hash, `Host`/`Member` role and the host
//! connection each member follows.
//!
//! ### Room Module (`room`)
//! Explicit rooms keyed by [`room::RoomId`], the host election and routing
//! rules, and the [`room::RoomRegistry`] holding every room. Operations
//! return [`room::Delivery`] values instead of touching sockets.
//!
//! ### Network Module (`network`)
//! WebSocket accept loop, per-connection reader and writer tasks, and the
//! routing loop that applies room operations and carries out deliveries.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::RelayConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RelayConfig {
//!         bind_addr: "127.0.0.1:8080".to_string(),
//!         ..RelayConfig::default()
//!     };
//!     let mut server = Server::new(config).await?;
//!
//!     // Accepts connections and routes their messages until the process ends
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod network;
pub mod room;
pub mod session;
