//! Types shared between the FireZone server and client: the player
//! registry, the text wire protocol, and the world constants both sides
//! must agree on.
//!
//! Nothing in this crate performs I/O. The session crates drive these
//! types from their per-frame tick functions.

pub mod protocol;
pub mod registry;

pub use registry::{PlayerRegistry, PlayerSlot, RegistryError};

/// Map dimensions in tiles.
pub const MAP_WIDTH: i32 = 50;
pub const MAP_HEIGHT: i32 = 50;
/// Edge length of one map tile in pixels.
pub const TILE_SIZE: i32 = 16;
/// Edge length of a player sprite in pixels.
pub const SPRITE_SIZE: i32 = 16;

/// Map extent in world pixels. Player positions are clamped to
/// `[0, extent - SPRITE_SIZE]` on each axis.
pub const MAP_PIXEL_WIDTH: i32 = MAP_WIDTH * TILE_SIZE;
pub const MAP_PIXEL_HEIGHT: i32 = MAP_HEIGHT * TILE_SIZE;

/// Fixed capacity of the player table. Slot 0 belongs to the host.
pub const MAX_PLAYERS: usize = 4;

/// Default port for both hosting and joining.
pub const DEFAULT_PORT: u16 = 7777;

/// Pixels a player moves per tick of held input.
pub const PLAYER_SPEED: i32 = 4;

/// One frame's worth of local movement input, in pixels.
///
/// Produced by the host application's input handling and consumed by a
/// session tick. A zero intent means the local player held still.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub dx: i32,
    pub dy: i32,
}

impl MoveIntent {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }

    pub fn is_idle(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}
