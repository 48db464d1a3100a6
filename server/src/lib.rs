//! # FireZone Host Library
//!
//! Server side of the position-synchronization subsystem. The
//! [`session::ServerSession`] owns the listening socket, the table of
//! peer connections, and the authoritative [`shared::PlayerRegistry`].
//!
//! The session is the source of truth for join snapshots and a pure
//! relay for movement: a `MOVE` received from one peer updates the
//! registry and is forwarded unchanged to every other peer. Newly
//! admitted peers receive their identity followed by a `SYNC` snapshot
//! of every player already present, before anything else can reach
//! them, so a joiner never sees an update for a player it has not met.
//!
//! All socket work is non-blocking and happens inside
//! [`session::ServerSession::tick`], which the host application calls
//! once per frame. There are no background threads and no locks; the
//! registry is touched only from the tick path.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::session::ServerSession;
//! use shared::MoveIntent;
//!
//! let mut session = ServerSession::start("127.0.0.1", shared::DEFAULT_PORT)
//!     .expect("port is free");
//! loop {
//!     // Movement intent comes from the host application's input handling.
//!     session.tick(MoveIntent::default());
//!     for player in session.registry().active_players() {
//!         // Draw `player` here.
//!     }
//! }
//! ```

pub mod session;
