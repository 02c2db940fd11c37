//! Maps one client line onto registry operations.

use crate::registry::{Registration, Registry, SlotId};
use log::debug;
use moab_shared::{Command, ParseError, ServerMessage};

/// Handles one complete line (terminator stripped) from `slot`
///
/// Must be called with the registry lock held for the whole call so that the
/// mutation and its broadcasts form one step. Returns the direct reply for
/// the sender, if the command has one.
///
/// | line                         | reply                        |
/// |------------------------------|------------------------------|
/// | `REG` while unregistered     | `WELCOME`, `TAKEN`, `INVALID`|
/// | `REG` while registered       | `INVALID`                    |
/// | `BOMB` while registered      | none, `INVALID` if malformed |
/// | `BOMB` while unregistered    | none                         |
/// | anything else                | `INVALID`                    |
pub fn dispatch(registry: &mut Registry, slot: SlotId, line: &str) -> Option<ServerMessage> {
    let registered = registry.is_registered(slot);

    match line.parse::<Command>() {
        Ok(Command::Register { .. }) | Err(ParseError::MalformedRegister) if registered => {
            Some(ServerMessage::Invalid)
        }
        Ok(Command::Register {
            name,
            x,
            y,
            direction,
        }) => match registry.register(slot, &name, x, y, direction) {
            Registration::Success => {
                registry.broadcast(&ServerMessage::Join { name }, Some(slot));
                Some(ServerMessage::Welcome)
            }
            Registration::NameTaken => Some(ServerMessage::Taken),
            Registration::Invalid => Some(ServerMessage::Invalid),
        },
        Ok(Command::Bomb { x, y }) if registered => {
            registry.resolve_bomb(slot, x, y);
            registry.sweep_destroyed();
            None
        }
        Err(ParseError::MalformedBomb) if registered => Some(ServerMessage::Invalid),
        Ok(Command::Bomb { .. }) | Err(ParseError::MalformedBomb) => {
            debug!("Ignoring BOMB from unregistered slot {}", slot);
            None
        }
        Err(_) => Some(ServerMessage::Invalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Admission;
    use std::net::SocketAddr;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:9000".parse().unwrap()
    }

    fn drain(admission: &mut Admission) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = admission.outbox.try_recv() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_register_welcomes_and_announces_to_others() {
        let mut registry = Registry::new(4);
        let mut a = registry.join(test_addr()).unwrap();
        let mut b = registry.join(test_addr()).unwrap();

        assert_eq!(
            dispatch(&mut registry, a.slot, "REG A 4 4 -"),
            Some(ServerMessage::Welcome)
        );
        assert_eq!(
            dispatch(&mut registry, b.slot, "REG B 4 6 |"),
            Some(ServerMessage::Welcome)
        );

        assert_eq!(drain(&mut a), vec!["JOIN B\n"]);
        assert!(drain(&mut b).is_empty());
    }

    #[test]
    fn test_register_taken() {
        let mut registry = Registry::new(4);
        let a = registry.join(test_addr()).unwrap();
        let b = registry.join(test_addr()).unwrap();

        assert_eq!(
            dispatch(&mut registry, a.slot, "REG Ann1 4 4 -"),
            Some(ServerMessage::Welcome)
        );
        assert_eq!(
            dispatch(&mut registry, b.slot, "REG Ann1 4 4 |"),
            Some(ServerMessage::Taken)
        );
    }

    #[test]
    fn test_register_invalid_placement_and_syntax() {
        let mut registry = Registry::new(2);
        let a = registry.join(test_addr()).unwrap();

        for line in [
            "REG Bob 1 0 -",
            "REG Bob 4 4 x",
            "REG Bob 4 4",
            "REG Bob four 4 -",
            "REG this-name-is-far-too-long 4 4 -",
        ] {
            assert_eq!(
                dispatch(&mut registry, a.slot, line),
                Some(ServerMessage::Invalid),
                "{line}"
            );
        }
        assert!(!registry.is_registered(a.slot));
    }

    #[test]
    fn test_second_register_is_invalid() {
        let mut registry = Registry::new(2);
        let a = registry.join(test_addr()).unwrap();

        dispatch(&mut registry, a.slot, "REG A 4 4 -");
        assert_eq!(
            dispatch(&mut registry, a.slot, "REG Z 5 5 |"),
            Some(ServerMessage::Invalid)
        );
        assert_eq!(
            dispatch(&mut registry, a.slot, "REG garbage"),
            Some(ServerMessage::Invalid)
        );
        assert_eq!(registry.name(a.slot), Some("A"));
    }

    #[test]
    fn test_bomb_has_no_direct_reply() {
        let mut registry = Registry::new(2);
        let mut a = registry.join(test_addr()).unwrap();
        dispatch(&mut registry, a.slot, "REG A 4 4 -");

        assert_eq!(dispatch(&mut registry, a.slot, "BOMB 0 0"), None);
        assert_eq!(drain(&mut a), vec!["MISS A 0 0\n"]);
    }

    #[test]
    fn test_malformed_bomb_from_registered_player() {
        let mut registry = Registry::new(2);
        let mut a = registry.join(test_addr()).unwrap();
        dispatch(&mut registry, a.slot, "REG A 4 4 -");

        assert_eq!(
            dispatch(&mut registry, a.slot, "BOMB 1"),
            Some(ServerMessage::Invalid)
        );
        assert!(drain(&mut a).is_empty());
    }

    #[test]
    fn test_bomb_from_unregistered_player_is_ignored() {
        let mut registry = Registry::new(3);
        let mut a = registry.join(test_addr()).unwrap();
        let lurker = registry.join(test_addr()).unwrap();
        dispatch(&mut registry, a.slot, "REG A 4 4 -");

        assert_eq!(dispatch(&mut registry, lurker.slot, "BOMB 4 4"), None);
        assert_eq!(dispatch(&mut registry, lurker.slot, "BOMB x"), None);
        assert!(drain(&mut a).is_empty());
        assert_eq!(registry.ship(a.slot).unwrap().total_damage(), 0);
    }

    #[test]
    fn test_unknown_commands_are_invalid() {
        let mut registry = Registry::new(2);
        let a = registry.join(test_addr()).unwrap();

        for line in ["", "HELLO", "REG", "BOMB", "bomb 1 2"] {
            assert_eq!(
                dispatch(&mut registry, a.slot, line),
                Some(ServerMessage::Invalid),
                "{line:?}"
            );
        }
    }

    #[test]
    fn test_final_hit_eliminates_target() {
        let mut registry = Registry::new(3);
        let mut a = registry.join(test_addr()).unwrap();
        let mut b = registry.join(test_addr()).unwrap();
        dispatch(&mut registry, a.slot, "REG A 4 4 -");
        dispatch(&mut registry, b.slot, "REG B 8 6 |");
        drain(&mut a);

        for x in 2..=6 {
            dispatch(&mut registry, b.slot, &format!("BOMB {x} 4"));
        }

        let b_lines = drain(&mut b);
        assert_eq!(b_lines.len(), 6);
        assert_eq!(b_lines[0], "HIT B 2 4 A\n");
        assert_eq!(b_lines[5], "GG A\n");
        assert_eq!(drain(&mut a), b_lines);
        assert!(!registry.holds(a.slot, a.client));
        assert!(registry.is_registered(b.slot));
    }
}
