//! Joining a session, reporting movement, applying remote updates.

use log::{debug, info, warn};
use shared::protocol::{FrameBuffer, Message};
use shared::registry::PlayerRegistry;
use shared::MoveIntent;
use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::Duration;
use thiserror::Error;

/// Slot the local player provisionally occupies until the server
/// assigns the real one.
pub const DEFAULT_LOCAL_SLOT: u8 = 1;

/// How long to wait for the server's `ID` during the join handshake.
/// A stalled server degrades the join instead of hanging the process.
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(3);

const READ_CHUNK: usize = 512;

/// The client failed to reach the server. Non-fatal: the caller logs it
/// and the process continues in local-only mode.
#[derive(Debug, Error)]
#[error("failed to connect to {addr}: {source}")]
pub struct ConnectError {
    pub addr: String,
    #[source]
    pub source: std::io::Error,
}

/// A connected client's view of the session.
///
/// Connecting is terminal: there is no retry and no reconnect. A dead
/// link means updates simply stop arriving; the registry keeps the last
/// known positions.
#[derive(Debug)]
pub struct ClientSession {
    link: TcpStream,
    inbox: FrameBuffer,
    registry: PlayerRegistry,
    local_id: u8,
    /// Messages that rode in alongside the identity handshake, applied
    /// on the first tick.
    backlog: Vec<Message>,
    link_open: bool,
}

impl ClientSession {
    /// Connects to a hosting session and waits (bounded) for the
    /// identity the server assigns.
    pub fn connect(host: &str, port: u16) -> Result<Self, ConnectError> {
        let addr = format!("{host}:{port}");
        let link = TcpStream::connect(&addr).map_err(|source| ConnectError {
            addr: addr.clone(),
            source,
        })?;

        let mut session = Self {
            link,
            inbox: FrameBuffer::new(),
            registry: PlayerRegistry::new(DEFAULT_LOCAL_SLOT),
            local_id: DEFAULT_LOCAL_SLOT,
            backlog: Vec::new(),
            link_open: true,
        };
        session.await_identity(&addr);
        session
            .link
            .set_nonblocking(true)
            .map_err(|source| ConnectError {
                addr: addr.clone(),
                source,
            })?;

        info!("connected to {} as player {}", addr, session.local_id);
        Ok(session)
    }

    /// The one blocking read of the subsystem: a single attempt to pull
    /// the server's `ID` off the wire. Anything else that arrives with
    /// it is kept for the first tick. Garbage or a timeout leave the
    /// provisional identity in place.
    fn await_identity(&mut self, addr: &str) {
        if let Err(e) = self.link.set_read_timeout(Some(IDENTITY_TIMEOUT)) {
            warn!("could not arm identity timeout: {e}");
            return;
        }

        let mut buf = [0u8; READ_CHUNK];
        match self.link.read(&mut buf) {
            Ok(0) => warn!("{} closed the link before assigning an identity", addr),
            Ok(n) => {
                let mut assigned = false;
                for frame in self.inbox.feed(&buf[..n]) {
                    match Message::decode(&frame) {
                        Ok(Message::Id { slot }) if !assigned => {
                            self.assign_identity(slot);
                            assigned = true;
                        }
                        Ok(message) => self.backlog.push(message),
                        Err(e) => warn!("dropping bad frame during handshake: {e}"),
                    }
                }
                if !assigned {
                    warn!(
                        "{} sent no identity, keeping provisional slot {}",
                        addr, self.local_id
                    );
                }
            }
            Err(e) => warn!(
                "no identity from {} ({e}), keeping provisional slot {}",
                addr, self.local_id
            ),
        }
    }

    fn assign_identity(&mut self, slot: u8) {
        if slot == self.local_id {
            return;
        }
        match self.registry.relocate(self.local_id, slot) {
            Ok(()) => self.local_id = slot,
            Err(e) => warn!("identity {slot} rejected: {e}"),
        }
    }

    /// Identity assigned by the server, or the provisional one.
    pub fn local_id(&self) -> u8 {
        self.local_id
    }

    /// The local player table, read by the host for rendering.
    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    /// Drives one frame of the session: local movement (reported to the
    /// server when the position changed), then a zero-timeout poll of
    /// the link. Never blocks.
    pub fn tick(&mut self, intent: MoveIntent) {
        self.apply_local_input(intent);
        self.drain_link();
    }

    fn apply_local_input(&mut self, intent: MoveIntent) {
        if intent.is_idle() {
            return;
        }
        let before = self.registry.get(self.local_id).map(|s| (s.x, s.y));
        match self.registry.apply_movement(self.local_id, intent.dx, intent.dy) {
            Ok((x, y)) => {
                // Pressing against a map edge changes nothing and sends
                // nothing.
                if before != Some((x, y)) {
                    self.report_move(x, y);
                }
            }
            Err(e) => warn!("local movement dropped: {e}"),
        }
    }

    /// Fire-and-forget movement report. A failed send is logged and the
    /// session carries on; there is no disconnect detection on writes.
    fn report_move(&mut self, x: i32, y: i32) {
        let message = Message::Move {
            slot: self.local_id,
            x,
            y,
        };
        if let Err(e) = self.link.write_all(&message.encode()) {
            warn!("movement report failed: {e}");
        }
    }

    fn drain_link(&mut self) {
        for message in std::mem::take(&mut self.backlog) {
            self.apply_remote(message);
        }
        if !self.link_open {
            return;
        }

        let mut buf = [0u8; READ_CHUNK];
        loop {
            match self.link.read(&mut buf) {
                Ok(0) => {
                    // Server went away. Keep the last known state and
                    // stop reading; the registry stays as it was.
                    info!("server link closed");
                    self.link_open = false;
                    break;
                }
                Ok(n) => {
                    let frames = self.inbox.feed(&buf[..n]);
                    for frame in frames {
                        match Message::decode(&frame) {
                            Ok(message) => self.apply_remote(message),
                            Err(e) => warn!("dropping bad frame from server: {e}"),
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!("link read failed: {e}");
                    break;
                }
            }
        }
    }

    fn apply_remote(&mut self, message: Message) {
        match message {
            // MOVE and SYNC both mean "that player is at this position";
            // SYNC is also the first sighting of a peer.
            Message::Move { slot, x, y } => {
                if let Err(e) = self.registry.set_position(slot, x, y) {
                    warn!("update for slot {slot} dropped: {e}");
                }
            }
            Message::Sync { slot, x, y } => {
                let applied = self
                    .registry
                    .set_position(slot, x, y)
                    .and_then(|()| self.registry.activate(slot));
                if let Err(e) = applied {
                    warn!("snapshot for slot {slot} dropped: {e}");
                }
            }
            Message::Id { slot } => {
                // Late identity reassignment; normally handled during
                // the handshake.
                self.assign_identity(slot);
            }
        }
    }
}
