use serde::{Deserialize, Serialize};

pub mod analyzer;
pub mod environment;
pub mod layout;
pub mod map;
pub mod simulation;
pub mod strategies;
pub mod strategy;

/// Represents a 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Euclidean distance between two positions.
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Iterates over the (up to 8) surrounding positions that fall inside a
    /// `width` x `height` grid, in row-major order.
    pub fn neighbors(self, width: usize, height: usize) -> impl Iterator<Item = Position> {
        (-1isize..=1)
            .flat_map(|dy| (-1isize..=1).map(move |dx| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .filter_map(move |(dx, dy)| {
                let x = self.x.checked_add_signed(dx)?;
                let y = self.y.checked_add_signed(dy)?;
                (x < width && y < height).then_some(Position { x, y })
            })
    }
}

/// Represents the visible content of a single cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Marker {
    #[default]
    Empty,
    Obstacle,
    /// An unopened chest. Its contents stay hidden until it is opened.
    Chest,
    /// A chest that was opened and held the treasure.
    Treasure,
    /// A chest that was opened and held a trap.
    Trap,
}

impl Marker {
    /// True for anything that is neither free floor nor an unopened chest.
    #[inline]
    pub fn is_occupied(self) -> bool {
        !matches!(self, Marker::Empty | Marker::Chest)
    }

    #[inline]
    pub fn is_chest(self) -> bool {
        matches!(self, Marker::Chest)
    }
}

/// What a chest really holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChestContents {
    Treasure,
    Trap,
}

impl ChestContents {
    /// The marker shown once a chest with these contents has been opened.
    pub fn revealed(self) -> Marker {
        match self {
            ChestContents::Treasure => Marker::Treasure,
            ChestContents::Trap => Marker::Trap,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_are_clipped_at_corners() {
        let corner: Vec<_> = Position::new(0, 0).neighbors(8, 8).collect();
        assert_eq!(
            corner,
            vec![Position::new(1, 0), Position::new(0, 1), Position::new(1, 1)]
        );

        assert_eq!(Position::new(3, 3).neighbors(8, 8).count(), 8);
        assert_eq!(Position::new(7, 7).neighbors(8, 8).count(), 3);
    }

    #[test]
    fn occupied_excludes_floor_and_unopened_chests() {
        assert!(!Marker::Empty.is_occupied());
        assert!(!Marker::Chest.is_occupied());
        assert!(Marker::Obstacle.is_occupied());
        assert!(Marker::Treasure.is_occupied());
        assert!(Marker::Trap.is_occupied());
    }
}
