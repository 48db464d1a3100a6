//! # FireZone Client Library
//!
//! Client side of the position-synchronization subsystem. A
//! [`session::ClientSession`] holds the single link to the server, the
//! local copy of the [`shared::PlayerRegistry`], and the identity the
//! server assigned on join.
//!
//! Connecting performs the one intentional blocking read of the whole
//! subsystem: the client cannot usefully proceed until it knows its
//! slot, so it waits (bounded by a timeout) for the server's `ID`
//! message. Everything after that is a zero-timeout poll inside
//! [`session::ClientSession::tick`], called once per frame by the host
//! application.
//!
//! Remote `MOVE` and `SYNC` messages both mean "that player is at this
//! position"; `SYNC` additionally marks the slot active, which is how
//! the client first learns a peer exists. Local movement is clamped to
//! the map and reported to the server fire-and-forget.
//!
//! A failed connect is not fatal. The caller logs it and keeps running
//! with only the local slot active, which the player experiences as an
//! ordinary single-player game.

pub mod session;
