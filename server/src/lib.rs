//! # MOAB Game Server Library
//!
//! Authoritative server for a free-for-all naval battle played over plain
//! TCP. Every client registers one named ship on a shared 10x10 grid and then
//! fires at coordinates; hits, misses, arrivals and eliminations are
//! broadcast to every registered player.
//!
//! ## Core Responsibilities
//!
//! ### Shared Battle State
//! A single [`registry::Registry`] holds every connected player and their
//! ship. It sits behind one lock and all game rules run inside that lock:
//! - Name uniqueness across registered players
//! - Ship placement validation
//! - Bomb resolution against every ship, followed by elimination of sunk ships
//!
//! ### Ordered Event Delivery
//! Broadcasts are queued for each recipient while the registry lock is held,
//! so all players observe game events in one total order. A recipient whose
//! session has gone away is evicted during the broadcast, and delivery
//! continues for everybody else.
//!
//! ### Connection Lifecycle
//! Each accepted connection takes a fixed slot in the registry and is served
//! by its own task:
//! - Line reassembly with a 100 byte limit per line
//! - Command dispatch and direct replies
//! - Cleanup exactly once on disconnect, protocol abuse or elimination
//!
//! ## Module Organization
//!
//! ### Registry (`registry`)
//! Slot arena, registration, bombing, elimination sweep and broadcast.
//!
//! ### Ship (`ship`)
//! A placed ship and its per-cell damage.
//!
//! ### Connection (`connection`)
//! Outbound line queue tying a registry slot to its session.
//!
//! ### Dispatcher (`dispatcher`)
//! Turns one protocol line into registry calls and a direct reply.
//!
//! ### Session (`session`)
//! Per-connection worker reading lines and writing queued output.
//!
//! ### Network (`network`)
//! Listening socket, admission into the registry and graceful shutdown.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use moab_server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Listen on all interfaces with room for 100 players
//!     let server = Server::bind("0.0.0.0:8080", 100).await?;
//!
//!     // Serve until Ctrl+C, then close every session
//!     server
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod dispatcher;
pub mod network;
pub mod registry;
pub mod session;
pub mod ship;
