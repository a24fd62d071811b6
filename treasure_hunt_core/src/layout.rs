//! Textual scenario layouts.
//!
//! A layout is a grid of whitespace separated two-letter codes, one row per line:
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | `BL` | empty floor                                          |
//! | `WL` | obstacle                                             |
//! | `ST` | robot start (empty floor)                            |
//! | `CT` | chest holding the treasure                           |
//! | `CX` | chest holding a trap                                 |
//! | `CH` | chest whose contents are drawn on instantiation      |

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    ChestContents, Marker, Position,
    environment::{Scenario, ScenarioError, check_trap_probability},
    map::Grid,
};

/// A parsed layout. Instantiating it yields a fresh [`Scenario`] every time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    cells: Grid<Marker>,
    /// `None` marks a chest whose contents are decided per instance.
    chests: Vec<(Position, Option<ChestContents>)>,
    start: Position,
}

impl Layout {
    pub fn parse(layout: &str) -> Result<Self, ScenarioError> {
        let lines: Vec<&str> = layout
            .trim()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        if lines.is_empty() {
            return Err(ScenarioError::EmptyLayout);
        }

        let rows: Vec<Vec<&str>> = lines
            .iter()
            .map(|line| line.split_whitespace().collect())
            .collect();
        let width = rows[0].len();
        for (row, tokens) in rows.iter().enumerate().skip(1) {
            if tokens.len() != width {
                return Err(ScenarioError::InconsistentWidth {
                    row,
                    expected: width,
                    found: tokens.len(),
                });
            }
        }

        let mut cells: Grid<Marker> = Grid::new(width, rows.len());
        let mut chests = Vec::new();
        let mut start = None;

        for (y, tokens) in rows.iter().enumerate() {
            for (x, token) in tokens.iter().enumerate() {
                let position = Position { x, y };
                match *token {
                    "BL" => {}
                    "WL" => cells[position] = Marker::Obstacle,
                    "ST" => {
                        if start.replace(position).is_some() {
                            return Err(ScenarioError::MultipleStarts);
                        }
                    }
                    "CT" => chests.push((position, Some(ChestContents::Treasure))),
                    "CX" => chests.push((position, Some(ChestContents::Trap))),
                    "CH" => chests.push((position, None)),
                    unknown => {
                        return Err(ScenarioError::UnknownCode {
                            code: unknown.to_string(),
                            x,
                            y,
                        });
                    }
                }
            }
        }

        Ok(Layout {
            cells,
            chests,
            start: start.ok_or(ScenarioError::MissingStart)?,
        })
    }

    #[cfg(test)]
    pub(crate) fn size(&self) -> (usize, usize) {
        self.cells.size()
    }

    #[cfg(test)]
    pub(crate) fn start(&self) -> Position {
        self.start
    }

    /// Builds a scenario, drawing the contents of every `CH` chest with
    /// `trap_probability`.
    pub fn instantiate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        trap_probability: f64,
    ) -> Result<Scenario, ScenarioError> {
        check_trap_probability(trap_probability)?;

        let chests: HashMap<Position, ChestContents> = self
            .chests
            .iter()
            .map(|&(position, contents)| {
                let contents = contents.unwrap_or_else(|| {
                    if rng.random_bool(trap_probability) {
                        ChestContents::Trap
                    } else {
                        ChestContents::Treasure
                    }
                });
                (position, contents)
            })
            .collect();

        Ok(Scenario::new(self.cells.clone(), chests, self.start))
    }
}
