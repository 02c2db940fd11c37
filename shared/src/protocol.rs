//! Line grammar spoken between clients and the server.
//!
//! Every message is one ASCII line. Client lines are recognised by their
//! fixed prefix (`REG ` or `BOMB `); server lines are either a direct reply
//! (`WELCOME`, `TAKEN`, `INVALID`) or a game event broadcast to every
//! registered player.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command")]
    UnknownCommand,
    #[error("malformed REG command")]
    MalformedRegister,
    #[error("malformed BOMB command")]
    MalformedBomb,
    #[error("unrecognised server message")]
    UnknownMessage,
}

/// A command sent by a client.
///
/// `Register` carries the raw direction symbol: name and placement rules are
/// enforced by the registry, not by the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register {
        name: String,
        x: i32,
        y: i32,
        direction: char,
    },
    Bomb {
        x: i32,
        y: i32,
    },
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        if let Some(args) = line.strip_prefix("REG ") {
            parse_register(args).ok_or(ParseError::MalformedRegister)
        } else if let Some(args) = line.strip_prefix("BOMB ") {
            parse_bomb(args).ok_or(ParseError::MalformedBomb)
        } else {
            Err(ParseError::UnknownCommand)
        }
    }
}

fn parse_register(args: &str) -> Option<Command> {
    let mut tokens = args.split_whitespace();
    let name = tokens.next()?.to_string();
    let x = tokens.next()?.parse().ok()?;
    let y = tokens.next()?.parse().ok()?;
    let direction = single_char(tokens.next()?)?;
    if tokens.next().is_some() {
        return None;
    }
    Some(Command::Register {
        name,
        x,
        y,
        direction,
    })
}

fn parse_bomb(args: &str) -> Option<Command> {
    let mut tokens = args.split_whitespace();
    let x = tokens.next()?.parse().ok()?;
    let y = tokens.next()?.parse().ok()?;
    if tokens.next().is_some() {
        return None;
    }
    Some(Command::Bomb { x, y })
}

fn single_char(token: &str) -> Option<char> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Register {
                name,
                x,
                y,
                direction,
            } => write!(f, "REG {name} {x} {y} {direction}"),
            Command::Bomb { x, y } => write!(f, "BOMB {x} {y}"),
        }
    }
}

/// A line sent by the server, either as a direct reply or a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    Welcome,
    Taken,
    Invalid,
    Join {
        name: String,
    },
    Hit {
        attacker: String,
        x: i32,
        y: i32,
        owner: String,
    },
    Miss {
        attacker: String,
        x: i32,
        y: i32,
    },
    Gg {
        name: String,
    },
}

impl ServerMessage {
    /// The message with its line terminator, ready for the socket.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Welcome => f.write_str("WELCOME"),
            ServerMessage::Taken => f.write_str("TAKEN"),
            ServerMessage::Invalid => f.write_str("INVALID"),
            ServerMessage::Join { name } => write!(f, "JOIN {name}"),
            ServerMessage::Hit {
                attacker,
                x,
                y,
                owner,
            } => write!(f, "HIT {attacker} {x} {y} {owner}"),
            ServerMessage::Miss { attacker, x, y } => write!(f, "MISS {attacker} {x} {y}"),
            ServerMessage::Gg { name } => write!(f, "GG {name}"),
        }
    }
}

impl FromStr for ServerMessage {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let coord = |token: &str| token.parse::<i32>().map_err(|_| ParseError::UnknownMessage);

        match tokens.as_slice() {
            ["WELCOME"] => Ok(ServerMessage::Welcome),
            ["TAKEN"] => Ok(ServerMessage::Taken),
            ["INVALID"] => Ok(ServerMessage::Invalid),
            ["JOIN", name] => Ok(ServerMessage::Join {
                name: name.to_string(),
            }),
            ["HIT", attacker, x, y, owner] => Ok(ServerMessage::Hit {
                attacker: attacker.to_string(),
                x: coord(x)?,
                y: coord(y)?,
                owner: owner.to_string(),
            }),
            ["MISS", attacker, x, y] => Ok(ServerMessage::Miss {
                attacker: attacker.to_string(),
                x: coord(x)?,
                y: coord(y)?,
            }),
            ["GG", name] => Ok(ServerMessage::Gg {
                name: name.to_string(),
            }),
            _ => Err(ParseError::UnknownMessage),
        }
    }
}
