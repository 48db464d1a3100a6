//! Fixed-capacity table of player slots.
//!
//! A slot's id always equals its index, so the wire protocol's small
//! integer ids address the table directly. Slots are activated when a
//! player appears and are never destroyed during a session; a departed
//! peer simply keeps its last known position.

use thiserror::Error;

use crate::{MAP_PIXEL_HEIGHT, MAP_PIXEL_WIDTH, MAX_PLAYERS, SPRITE_SIZE};

/// Spawn point, shared by every slot until the server says otherwise.
const SPAWN_X: i32 = (MAP_PIXEL_WIDTH - SPRITE_SIZE) / 2;
const SPAWN_Y: i32 = (MAP_PIXEL_HEIGHT - SPRITE_SIZE) / 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("slot {slot} is out of range for {max} players", max = MAX_PLAYERS)]
    SlotOutOfRange { slot: u8 },
}

/// One potential participant, active or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerSlot {
    pub id: u8,
    pub x: i32,
    pub y: i32,
    pub active: bool,
}

/// The session's view of every player, indexed by slot id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRegistry {
    slots: [PlayerSlot; MAX_PLAYERS],
}

impl PlayerRegistry {
    /// Creates a registry with every slot inactive except `local_id`.
    pub fn new(local_id: u8) -> Self {
        let mut slots = [PlayerSlot {
            id: 0,
            x: SPAWN_X,
            y: SPAWN_Y,
            active: false,
        }; MAX_PLAYERS];
        for (index, slot) in slots.iter_mut().enumerate() {
            slot.id = index as u8;
        }
        if let Some(slot) = slots.get_mut(local_id as usize) {
            slot.active = true;
        }
        Self { slots }
    }

    fn index(id: u8) -> Result<usize, RegistryError> {
        let index = id as usize;
        if index >= MAX_PLAYERS {
            return Err(RegistryError::SlotOutOfRange { slot: id });
        }
        Ok(index)
    }

    pub fn get(&self, id: u8) -> Option<&PlayerSlot> {
        self.slots.get(id as usize)
    }

    /// Sets a slot's position verbatim. Remote updates land here; no
    /// clamping is applied to what the server reports.
    pub fn set_position(&mut self, id: u8, x: i32, y: i32) -> Result<(), RegistryError> {
        let index = Self::index(id)?;
        self.slots[index].x = x;
        self.slots[index].y = y;
        Ok(())
    }

    pub fn activate(&mut self, id: u8) -> Result<(), RegistryError> {
        let index = Self::index(id)?;
        self.slots[index].active = true;
        Ok(())
    }

    /// Moves a slot by a local input delta, clamped to the map bounds.
    /// Returns the resulting position.
    pub fn apply_movement(&mut self, id: u8, dx: i32, dy: i32) -> Result<(i32, i32), RegistryError> {
        let index = Self::index(id)?;
        let slot = &mut self.slots[index];
        slot.x = (slot.x + dx).clamp(0, MAP_PIXEL_WIDTH - SPRITE_SIZE);
        slot.y = (slot.y + dy).clamp(0, MAP_PIXEL_HEIGHT - SPRITE_SIZE);
        Ok((slot.x, slot.y))
    }

    /// Transfers the local player from one slot to another, used when the
    /// server assigns an identity that differs from the provisional one.
    pub fn relocate(&mut self, from: u8, to: u8) -> Result<(), RegistryError> {
        let from_index = Self::index(from)?;
        let to_index = Self::index(to)?;
        if from_index == to_index {
            return Ok(());
        }
        let (x, y) = (self.slots[from_index].x, self.slots[from_index].y);
        self.slots[from_index].active = false;
        self.slots[to_index].x = x;
        self.slots[to_index].y = y;
        self.slots[to_index].active = true;
        Ok(())
    }

    pub fn slots(&self) -> &[PlayerSlot] {
        &self.slots
    }

    pub fn active_players(&self) -> impl Iterator<Item = &PlayerSlot> {
        self.slots.iter().filter(|slot| slot.active)
    }

    pub fn capacity(&self) -> usize {
        MAX_PLAYERS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_activates_only_local_slot() {
        let registry = PlayerRegistry::new(0);
        assert_eq!(registry.active_players().count(), 1);
        assert!(registry.get(0).unwrap().active);
        assert!(!registry.get(1).unwrap().active);
        for (index, slot) in registry.slots().iter().enumerate() {
            assert_eq!(slot.id as usize, index);
        }
    }

    #[test]
    fn test_out_of_range_slot_is_an_error_not_a_panic() {
        let mut registry = PlayerRegistry::new(0);
        assert_eq!(registry.get(200), None);
        assert_eq!(
            registry.set_position(4, 1, 1),
            Err(RegistryError::SlotOutOfRange { slot: 4 })
        );
        assert_eq!(
            registry.activate(255),
            Err(RegistryError::SlotOutOfRange { slot: 255 })
        );
        assert_eq!(
            registry.apply_movement(4, 1, 1),
            Err(RegistryError::SlotOutOfRange { slot: 4 })
        );
    }

    #[test]
    fn test_movement_clamps_to_map_bounds() {
        let mut registry = PlayerRegistry::new(0);
        let limit = MAP_PIXEL_WIDTH - SPRITE_SIZE;

        let (x, y) = registry.apply_movement(0, -10_000, -10_000).unwrap();
        assert_eq!((x, y), (0, 0));

        let (x, y) = registry.apply_movement(0, 10_000, 3).unwrap();
        assert_eq!((x, y), (limit, 3));

        let (x, y) = registry.apply_movement(0, 0, 10_000).unwrap();
        assert_eq!((x, y), (limit, MAP_PIXEL_HEIGHT - SPRITE_SIZE));
    }

    #[test]
    fn test_remote_positions_are_not_clamped() {
        let mut registry = PlayerRegistry::new(0);
        registry.set_position(2, -50, 9_999).unwrap();
        let slot = registry.get(2).unwrap();
        assert_eq!((slot.x, slot.y), (-50, 9_999));
    }

    #[test]
    fn test_snapshot_application_is_idempotent() {
        let mut registry = PlayerRegistry::new(0);
        registry.set_position(2, 120, 240).unwrap();
        registry.activate(2).unwrap();
        let once = registry.clone();

        registry.set_position(2, 120, 240).unwrap();
        registry.activate(2).unwrap();
        assert_eq!(registry, once);
    }

    #[test]
    fn test_relocate_moves_the_local_player() {
        let mut registry = PlayerRegistry::new(1);
        registry.set_position(1, 30, 40).unwrap();

        registry.relocate(1, 3).unwrap();
        assert!(!registry.get(1).unwrap().active);
        let slot = registry.get(3).unwrap();
        assert!(slot.active);
        assert_eq!((slot.x, slot.y), (30, 40));

        // Relocating onto the same slot changes nothing.
        let before = registry.clone();
        registry.relocate(3, 3).unwrap();
        assert_eq!(registry, before);
    }
}
