//! A placed ship and the damage it has taken.

use moab_shared::{occupied_cells, Orientation, SHIP_LENGTH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ship {
    owner: String,
    x: i32,
    y: i32,
    orientation: Orientation,
    /// One flag per occupied cell, in the order of [`Ship::cells`].
    damaged: [bool; SHIP_LENGTH],
    /// Always equal to the number of set flags in `damaged`.
    total_damage: usize,
}

impl Ship {
    /// Creates an undamaged ship. Placement must already be validated.
    pub fn new(owner: &str, x: i32, y: i32, orientation: Orientation) -> Self {
        Self {
            owner: owner.to_string(),
            x,
            y,
            orientation,
            damaged: [false; SHIP_LENGTH],
            total_damage: 0,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn cells(&self) -> [(i32, i32); SHIP_LENGTH] {
        occupied_cells(self.x, self.y, self.orientation)
    }

    pub fn damage_flags(&self) -> &[bool; SHIP_LENGTH] {
        &self.damaged
    }

    pub fn total_damage(&self) -> usize {
        self.total_damage
    }

    /// Applies a bomb at (x, y). Returns true only when it damaged a cell
    /// that was still intact; a repeated hit on the same cell changes nothing.
    pub fn strike(&mut self, x: i32, y: i32) -> bool {
        let Some(index) = self.cells().iter().position(|&cell| cell == (x, y)) else {
            return false;
        };

        if self.damaged[index] {
            return false;
        }

        self.damaged[index] = true;
        self.total_damage += 1;
        true
    }

    pub fn is_destroyed(&self) -> bool {
        self.total_damage == SHIP_LENGTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag_count(ship: &Ship) -> usize {
        ship.damage_flags().iter().filter(|&&damaged| damaged).count()
    }

    #[test]
    fn test_new_ship_is_intact() {
        let ship = Ship::new("A", 4, 4, Orientation::Horizontal);

        assert_eq!(ship.owner(), "A");
        assert_eq!(ship.center(), (4, 4));
        assert_eq!(ship.total_damage(), 0);
        assert!(!ship.is_destroyed());
    }

    #[test]
    fn test_strike_marks_the_matching_cell() {
        let mut ship = Ship::new("B", 4, 6, Orientation::Vertical);

        assert!(ship.strike(4, 8));
        assert_eq!(ship.damage_flags(), &[false, false, false, false, true]);
        assert_eq!(ship.total_damage(), 1);
    }

    #[test]
    fn test_strike_misses_outside_the_ship() {
        let mut ship = Ship::new("A", 4, 4, Orientation::Horizontal);

        assert!(!ship.strike(4, 5));
        assert!(!ship.strike(7, 4));
        assert!(!ship.strike(-100, 4));
        assert_eq!(ship.total_damage(), 0);
    }

    #[test]
    fn test_repeated_strike_counts_once() {
        let mut ship = Ship::new("A", 4, 4, Orientation::Horizontal);

        assert!(ship.strike(3, 4));
        assert!(!ship.strike(3, 4));
        assert_eq!(ship.total_damage(), 1);
        assert_eq!(flag_count(&ship), 1);
    }

    #[test]
    fn test_destroyed_after_every_cell_is_hit() {
        let mut ship = Ship::new("A", 4, 4, Orientation::Horizontal);

        for x in 2..=6 {
            assert!(!ship.is_destroyed());
            assert!(ship.strike(x, 4));
            assert_eq!(ship.total_damage(), flag_count(&ship));
        }

        assert!(ship.is_destroyed());
    }
}
