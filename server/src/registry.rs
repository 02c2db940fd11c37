//! Shared registry of connected players and their ships
//!
//! The registry is the only mutable state shared between sessions. It lives
//! behind a single lock (`SharedRegistry`) and every game operation runs as
//! one method call under that lock:
//! - Admission and removal of connections into fixed slots
//! - Registration of a named ship
//! - Bomb resolution followed by the sweep for destroyed ships
//! - Broadcasting game events to every registered player
//!
//! Because broadcasts only queue lines while the lock is held, every player
//! sees the events in the same order the registry produced them.

use crate::connection::{ClientId, Connection, Outbox};
use crate::ship::Ship;
use log::{debug, info, warn};
use moab_shared::{is_valid_name, validate_placement, Orientation, ServerMessage};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// Index of a player slot. Stable for the lifetime of a connection.
pub type SlotId = usize;

/// The registry as shared between the acceptor and all sessions.
pub type SharedRegistry = Arc<Mutex<Registry>>;

/// Slot capacity used when none is configured.
pub const DEFAULT_MAX_CLIENTS: usize = 100;

/// Lines a session may fall behind before its player is dropped.
pub const OUTBOX_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("all {0} player slots are occupied")]
    CapacityExceeded(usize),
}

/// Outcome of a registration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Success,
    NameTaken,
    Invalid,
}

/// What a newly admitted connection needs to run its session
#[derive(Debug)]
pub struct Admission {
    pub slot: SlotId,
    pub client: ClientId,
    pub outbox: Outbox,
}

/// An occupied slot. Registered once it owns a ship.
#[derive(Debug)]
pub struct Player {
    connection: Connection,
    ship: Option<Ship>,
}

impl Player {
    pub fn is_registered(&self) -> bool {
        self.ship.is_some()
    }

    pub fn name(&self) -> Option<&str> {
        self.ship.as_ref().map(Ship::owner)
    }
}

/// Fixed-capacity arena of player slots
///
/// A slot is active while it holds a `Player`. Removing a player drops its
/// `Connection`, which closes the outbox of the session serving it; the
/// session then flushes whatever was queued and closes the socket.
pub struct Registry {
    slots: Vec<Option<Player>>,
    /// Number of active slots
    live: usize,
    next_client_id: ClientId,
    outbox_capacity: usize,
}

impl Registry {
    pub fn new(max_clients: usize) -> Self {
        Self {
            slots: (0..max_clients).map(|_| None).collect(),
            live: 0,
            next_client_id: 1,
            // One bomb can queue a HIT and a GG per player in a single step
            outbox_capacity: OUTBOX_CAPACITY.max(2 * max_clients + 1),
        }
    }

    pub fn shared(max_clients: usize) -> SharedRegistry {
        Arc::new(Mutex::new(Self::new(max_clients)))
    }

    /// Admits a connection into the first free slot
    pub fn join(&mut self, addr: SocketAddr) -> Result<Admission, JoinError> {
        let slot = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(JoinError::CapacityExceeded(self.slots.len()))?;

        let client = self.next_client_id;
        self.next_client_id += 1;

        let (connection, outbox) = Connection::new(client, addr, self.outbox_capacity);
        self.slots[slot] = Some(Player {
            connection,
            ship: None,
        });
        self.live += 1;

        info!("Client {} from {} assigned to slot {}", client, addr, slot);
        Ok(Admission {
            slot,
            client,
            outbox,
        })
    }

    /// Removes the connection `client` from `slot`
    ///
    /// A registered player's departure is announced with `GG <name>` to
    /// everyone else first. Returns false if the slot no longer belongs to
    /// that connection, which makes repeated calls harmless even after the
    /// slot has been handed to a new connection.
    pub fn leave(&mut self, slot: SlotId, client: ClientId) -> bool {
        if !self.holds(slot, client) {
            return false;
        }

        if let Some(name) = self.name(slot).map(str::to_owned) {
            info!("Player {} left", name);
            self.broadcast(&ServerMessage::Gg { name }, Some(slot));
        }

        self.remove(slot);
        true
    }

    /// Attaches a ship to an unregistered slot
    ///
    /// Checks run in order: slot state, name syntax, name uniqueness, ship
    /// placement. A taken name is reported even if the placement is bad.
    pub fn register(
        &mut self,
        slot: SlotId,
        name: &str,
        x: i32,
        y: i32,
        direction: char,
    ) -> Registration {
        match self.player(slot) {
            Some(player) if !player.is_registered() => {}
            _ => return Registration::Invalid,
        }

        if !is_valid_name(name) {
            return Registration::Invalid;
        }

        if self.is_name_taken(name, slot) {
            return Registration::NameTaken;
        }

        let Some(orientation) =
            Orientation::from_symbol(direction).filter(|&o| validate_placement(x, y, o))
        else {
            return Registration::Invalid;
        };

        if let Some(player) = self.slots[slot].as_mut() {
            player.ship = Some(Ship::new(name, x, y, orientation));
        }

        info!(
            "Slot {} registered as {} at ({}, {}) {}",
            slot,
            name,
            x,
            y,
            orientation.symbol()
        );
        Registration::Success
    }

    /// Drops the bomb of `attacker` on (x, y) and broadcasts the result
    ///
    /// Every registered ship, the attacker's own included, is checked. Each
    /// ship that takes new damage yields one `HIT`; if none does, a single
    /// `MISS` is sent. Coordinates are not bounds-checked. Returns the
    /// broadcast events, or nothing if the attacker is not registered.
    pub fn resolve_bomb(&mut self, attacker: SlotId, x: i32, y: i32) -> Vec<ServerMessage> {
        let Some(attacker) = self.name(attacker).map(str::to_owned) else {
            return Vec::new();
        };

        let mut events = Vec::new();
        for ship in self
            .slots
            .iter_mut()
            .flatten()
            .filter_map(|player| player.ship.as_mut())
        {
            if ship.strike(x, y) {
                events.push(ServerMessage::Hit {
                    attacker: attacker.clone(),
                    x,
                    y,
                    owner: ship.owner().to_string(),
                });
            }
        }

        if events.is_empty() {
            events.push(ServerMessage::Miss { attacker, x, y });
        }

        for event in &events {
            debug!("{}", event);
            self.broadcast(event, None);
        }
        events
    }

    /// Eliminates every player whose ship has taken full damage
    ///
    /// `GG <name>` goes to every registered player, the owner included,
    /// before the owner is removed. Returns the eliminated names.
    pub fn sweep_destroyed(&mut self) -> Vec<String> {
        let destroyed: Vec<SlotId> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, entry)| {
                entry
                    .as_ref()
                    .and_then(|player| player.ship.as_ref())
                    .is_some_and(Ship::is_destroyed)
            })
            .map(|(slot, _)| slot)
            .collect();

        let mut eliminated = Vec::new();
        for slot in destroyed {
            // An earlier broadcast in this sweep may already have evicted it
            let Some(name) = self.name(slot).map(str::to_owned) else {
                continue;
            };

            info!("Player {} eliminated", name);
            self.broadcast(&ServerMessage::Gg { name: name.clone() }, None);
            self.remove(slot);
            eliminated.push(name);
        }
        eliminated
    }

    /// Queues `message` for every registered player except `exclude`
    ///
    /// A player whose session is gone is evicted on the spot, without a
    /// `GG`, and delivery continues with the remaining players.
    pub fn broadcast(&mut self, message: &ServerMessage, exclude: Option<SlotId>) {
        let line = message.to_line();

        for (slot, entry) in self.slots.iter_mut().enumerate() {
            if Some(slot) == exclude {
                continue;
            }
            let Some(player) = entry else {
                continue;
            };
            if !player.is_registered() {
                continue;
            }

            if let Err(e) = player.connection.send_line(&line) {
                warn!(
                    "Failed to deliver to client {} ({}) in slot {}, dropping it: {}",
                    player.connection.id, player.connection.addr, slot, e
                );
                *entry = None;
                self.live -= 1;
            }
        }
    }

    /// Queues a direct reply for one slot, registered or not
    pub fn send_to(&mut self, slot: SlotId, message: &ServerMessage) -> bool {
        let Some(player) = self.player(slot) else {
            return false;
        };

        match player.connection.send_line(&message.to_line()) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to reply to slot {}, dropping it: {}", slot, e);
                self.remove(slot);
                false
            }
        }
    }

    /// Drops every connection without announcing anything
    pub fn close_all(&mut self) {
        let closed = self.live;
        for entry in &mut self.slots {
            *entry = None;
        }
        self.live = 0;
        info!("Closed {} connections", closed);
    }

    /// True while `slot` is occupied by the connection `client`
    pub fn holds(&self, slot: SlotId, client: ClientId) -> bool {
        self.player(slot)
            .is_some_and(|player| player.connection.id == client)
    }

    pub fn is_registered(&self, slot: SlotId) -> bool {
        self.player(slot).is_some_and(Player::is_registered)
    }

    pub fn name(&self, slot: SlotId) -> Option<&str> {
        self.player(slot).and_then(Player::name)
    }

    pub fn ship(&self, slot: SlotId) -> Option<&Ship> {
        self.player(slot).and_then(|player| player.ship.as_ref())
    }

    /// Number of active slots
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Undelivered lines each connection may hold
    pub fn outbox_capacity(&self) -> usize {
        self.outbox_capacity
    }

    /// Verifies the registry's internal consistency
    ///
    /// The live count must match the occupied slots, registered names must
    /// be unique, and each ship's damage counter must equal its flag count.
    pub fn check_invariants(&self) -> Result<(), String> {
        let occupied = self.slots.iter().flatten().count();
        if occupied != self.live {
            return Err(format!(
                "live count {} but {} occupied slots",
                self.live, occupied
            ));
        }

        let mut names = HashSet::new();
        for ship in self.slots.iter().flatten().filter_map(|p| p.ship.as_ref()) {
            if !names.insert(ship.owner()) {
                return Err(format!("name {} registered twice", ship.owner()));
            }

            let flagged = ship.damage_flags().iter().filter(|&&d| d).count();
            if flagged != ship.total_damage() {
                return Err(format!(
                    "ship {} counts {} damage but has {} damaged cells",
                    ship.owner(),
                    ship.total_damage(),
                    flagged
                ));
            }
        }

        Ok(())
    }

    fn player(&self, slot: SlotId) -> Option<&Player> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn is_name_taken(&self, name: &str, exclude: SlotId) -> bool {
        self.slots.iter().enumerate().any(|(slot, entry)| {
            slot != exclude && entry.as_ref().and_then(Player::name) == Some(name)
        })
    }

    fn remove(&mut self, slot: SlotId) {
        if let Some(player) = self.slots.get_mut(slot).and_then(Option::take) {
            self.live -= 1;
            debug!(
                "Client {} ({}) released slot {}",
                player.connection.id, player.connection.addr, slot
            );
        }
    }
}
