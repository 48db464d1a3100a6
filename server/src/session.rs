//! Accepting, identifying, and relaying between connected players.

use log::{debug, info, warn};
use shared::protocol::{FrameBuffer, Message};
use shared::registry::PlayerRegistry;
use shared::{MoveIntent, MAX_PLAYERS};
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use thiserror::Error;

/// Slot reserved for the hosting player.
pub const HOST_SLOT: u8 = 0;

const READ_CHUNK: usize = 512;

/// The server failed to start listening. Non-fatal: the caller logs it
/// and the process continues in local-only mode.
#[derive(Debug, Error)]
#[error("failed to listen on {addr}: {source}")]
pub struct BindError {
    pub addr: String,
    #[source]
    pub source: std::io::Error,
}

/// One admitted peer connection, keyed by its slot id.
#[derive(Debug)]
struct Peer {
    stream: TcpStream,
    inbox: FrameBuffer,
}

/// The hosting side of a multiplayer session.
///
/// Owns the listener, every peer connection, and the player registry.
/// Once started it stays in its accepting/relaying state for the life
/// of the process; there is no shutdown transition.
#[derive(Debug)]
pub struct ServerSession {
    listener: TcpListener,
    peers: HashMap<u8, Peer>,
    registry: PlayerRegistry,
}

impl ServerSession {
    /// Binds the listening socket and switches it to non-blocking mode.
    pub fn start(host: &str, port: u16) -> Result<Self, BindError> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr).map_err(|source| BindError {
            addr: addr.clone(),
            source,
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| BindError {
                addr: addr.clone(),
                source,
            })?;
        info!("Hosting session on {}", addr);

        Ok(Self {
            listener,
            peers: HashMap::new(),
            registry: PlayerRegistry::new(HOST_SLOT),
        })
    }

    /// Address the listener actually bound, useful when hosting on port 0.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The authoritative player table, read by the host for rendering.
    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    /// Number of peers with a live connection.
    pub fn connected_peers(&self) -> usize {
        self.peers.len()
    }

    /// Drives one frame of the session: local movement, then accepts,
    /// then a zero-timeout poll of every peer. Never blocks.
    pub fn tick(&mut self, intent: MoveIntent) {
        self.apply_local_input(intent);
        self.accept_joiners();
        self.pump_peers();
    }

    fn apply_local_input(&mut self, intent: MoveIntent) {
        if intent.is_idle() {
            return;
        }
        match self.registry.apply_movement(HOST_SLOT, intent.dx, intent.dy) {
            Ok((x, y)) => self.broadcast(
                &Message::Move {
                    slot: HOST_SLOT,
                    x,
                    y,
                },
                None,
            ),
            Err(e) => warn!("host movement dropped: {e}"),
        }
    }

    fn accept_joiners(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => self.admit(stream, addr),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("accept failed: {e}");
                    break;
                }
            }
        }
    }

    /// Admits one freshly accepted connection, or closes it when the
    /// session is full. An admitted peer receives its identity first,
    /// then a snapshot of every player already present, before the rest
    /// of the session hears about it.
    fn admit(&mut self, stream: TcpStream, addr: SocketAddr) {
        let Some(slot) = self.free_slot() else {
            // Dropping the stream closes it; the joiner never gets a slot.
            info!("session full, refusing {}", addr);
            return;
        };
        if let Err(e) = stream.set_nonblocking(true) {
            warn!("refusing {}: could not set non-blocking: {e}", addr);
            return;
        }

        let mut peer = Peer {
            stream,
            inbox: FrameBuffer::new(),
        };
        send_to(&mut peer, slot, &Message::Id { slot });
        let snapshots: Vec<Message> = self
            .registry
            .active_players()
            .map(|player| Message::Sync {
                slot: player.id,
                x: player.x,
                y: player.y,
            })
            .collect();
        for snapshot in &snapshots {
            send_to(&mut peer, slot, snapshot);
        }

        if let Err(e) = self.registry.activate(slot) {
            warn!("could not activate slot {slot}: {e}");
            return;
        }
        // Announce the newcomer to everyone who was already here. The
        // new peer is not in the table yet, so it never sees this.
        if let Some(player) = self.registry.get(slot) {
            let announce = Message::Sync {
                slot,
                x: player.x,
                y: player.y,
            };
            self.broadcast(&announce, Some(slot));
        }

        info!("player {} joined from {}", slot, addr);
        self.peers.insert(slot, peer);
    }

    /// Next sequential unused slot id. Slot 0 is the host's, and slots
    /// of departed peers stay active, so they are never handed out again.
    fn free_slot(&self) -> Option<u8> {
        (1..MAX_PLAYERS as u8).find(|&slot| {
            !self.registry.get(slot).map(|s| s.active).unwrap_or(true)
        })
    }

    fn pump_peers(&mut self) {
        let mut buf = [0u8; READ_CHUNK];
        let mut inbound: Vec<(u8, Message)> = Vec::new();
        let mut departed: Vec<u8> = Vec::new();

        for (&slot, peer) in self.peers.iter_mut() {
            loop {
                match peer.stream.read(&mut buf) {
                    Ok(0) => {
                        departed.push(slot);
                        break;
                    }
                    Ok(n) => {
                        for frame in peer.inbox.feed(&buf[..n]) {
                            match Message::decode(&frame) {
                                Ok(message) => inbound.push((slot, message)),
                                Err(e) => warn!("bad frame from player {slot}: {e}"),
                            }
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                    Err(e) => {
                        debug!("read from player {slot} failed: {e}");
                        break;
                    }
                }
            }
        }

        for slot in departed {
            // The slot stays active with its last known position; only
            // the connection handle goes away.
            info!("player {} connection closed", slot);
            self.peers.remove(&slot);
        }

        for (from, message) in inbound {
            self.apply_inbound(from, message);
        }
    }

    fn apply_inbound(&mut self, from: u8, message: Message) {
        match message {
            Message::Move { slot, x, y } => {
                if let Err(e) = self.registry.set_position(slot, x, y) {
                    warn!("move from player {from} dropped: {e}");
                    return;
                }
                self.broadcast(&message, Some(from));
            }
            other => debug!("ignoring unexpected {other:?} from player {from}"),
        }
    }

    /// Sends a message to every peer, optionally excluding one slot.
    /// Send failures are logged and otherwise ignored.
    fn broadcast(&mut self, message: &Message, exclude: Option<u8>) {
        let bytes = message.encode();
        for (&slot, peer) in self.peers.iter_mut() {
            if Some(slot) == exclude {
                continue;
            }
            if let Err(e) = peer.stream.write_all(&bytes) {
                warn!("send to player {slot} failed: {e}");
            }
        }
    }
}

fn send_to(peer: &mut Peer, slot: u8, message: &Message) {
    if let Err(e) = peer.stream.write_all(&message.encode()) {
        warn!("send to player {slot} failed: {e}");
    }
}
