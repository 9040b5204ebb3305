use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance on the grid, in tiles.
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Travel time in milliseconds for an army moving at `speed` tiles per hour.
    pub fn travel_time_ms(&self, other: &Position, speed: u32, server_speed: u8) -> i64 {
        let speed = speed.max(1) as f64;
        let server_speed = server_speed.max(1) as f64;
        let hours = self.distance(other) / speed;

        (hours * 3_600_000.0 / server_speed).round() as i64
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}|{})", self.x, self.y)
    }
}
