pub mod protocol;

pub use protocol::{Command, ParseError, ServerMessage};

pub const BOARD_SIZE: i32 = 10;
pub const SHIP_LENGTH: usize = 5;
pub const MAX_NAME_LENGTH: usize = 20;
/// Longest accepted line in bytes, terminator included.
pub const MAX_MESSAGE_LENGTH: usize = 100;

/// Distance from a ship's center to either end.
const SHIP_REACH: i32 = (SHIP_LENGTH as i32) / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

impl Orientation {
    /// Maps the wire symbol (`-` or `|`) to an orientation.
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '-' => Some(Orientation::Horizontal),
            '|' => Some(Orientation::Vertical),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Orientation::Horizontal => '-',
            Orientation::Vertical => '|',
        }
    }
}

/// Checks that a ship centered on (x, y) lies fully on the board.
///
/// The axis the ship runs along needs `SHIP_REACH` free cells on each side
/// of the center, the other axis only needs to be on the board.
pub fn validate_placement(x: i32, y: i32, orientation: Orientation) -> bool {
    let (along, across) = match orientation {
        Orientation::Horizontal => (x, y),
        Orientation::Vertical => (y, x),
    };

    (SHIP_REACH..BOARD_SIZE - SHIP_REACH).contains(&along) && (0..BOARD_SIZE).contains(&across)
}

/// Returns the cells covered by a ship, ordered from `center - 2` to
/// `center + 2` along its axis.
pub fn occupied_cells(x: i32, y: i32, orientation: Orientation) -> [(i32, i32); SHIP_LENGTH] {
    let mut cells = [(0, 0); SHIP_LENGTH];
    for (offset, cell) in (-SHIP_REACH..=SHIP_REACH).zip(cells.iter_mut()) {
        *cell = match orientation {
            Orientation::Horizontal => (x + offset, y),
            Orientation::Vertical => (x, y + offset),
        };
    }
    cells
}

/// Names are 1 to 20 ASCII letters, digits or hyphens.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_NAME_LENGTH
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
}
