//! # Arena Client Library
//!
//! This library provides the client side of a host-authoritative multiplayer
//! session. Every participant runs the same client; the one elected host by
//! the relay additionally runs the authoritative simulation for the room.
//!
//! ## Architecture Overview
//!
//! ### Host Authority
//! The relay has no game logic. The hosting client validates every member's
//! movement and attack request, stamps authoritative records with strictly
//! increasing timestamps, and resolves hits on a fixed sweep cadence. Other
//! members only ever apply what the host broadcasts.
//!
//! ### Reconciliation
//! Each client keeps a shadow copy of every character. Authoritative records
//! older than the local copy are discarded; newer ones replace the motion
//! state (previous position, destination, facing, intents) while the
//! rendered position is left alone and eased toward the new destination by
//! linear interpolation, one step per frame.
//!
//! ### Session End
//! A client whose character is hit, or whose host leaves, enters a terminal
//! state and disconnects. There is no host migration and no rejoin.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! The client's view of the room: message handling, reconciliation of
//! authoritative updates, the per-frame interpolation pass and the
//! renderer-facing [`game::Drawable`] snapshots.
//!
//! ### Host Module (`host`)
//! The authoritative simulation: movement intake, attack hitboxes and the
//! collision sweep.
//!
//! ### Controller Module (`controller`)
//! Key state tracking and the movement step applied to the local character
//! every movement tick, plus a random input driver for headless runs.
//!
//! ### Network Module (`network`)
//! WebSocket connection to the relay and the event loop multiplexing
//! incoming frames with the sweep, movement and frame timers.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::config::ClientConfig;
//! use client::network::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig {
//!         room: Some("arena".to_string()),
//!         wander: true,
//!         ..ClientConfig::default()
//!     };
//!
//!     // Plays until this client dies or the host leaves
//!     let outcome = Client::new(config).run().await?;
//!     println!("Session ended: {:?}", outcome);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod game;
pub mod host;
pub mod network;
