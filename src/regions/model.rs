use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A named screen rectangle. Bounds are inclusive on every edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Region {
    /// Builds a region, rejecting empty or inverted rectangles.
    pub fn new(
        name: impl Into<String>,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
    ) -> Result<Self, EngineError> {
        let region = Self {
            name: name.into(),
            x0,
            y0,
            x1,
            y1,
        };
        region.validate()?;
        Ok(region)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.x0 >= self.x1 || self.y0 >= self.y1 {
            return Err(EngineError::InvalidGeometry {
                name: self.name.clone(),
                x0: self.x0,
                y0: self.y0,
                x1: self.x1,
                y1: self.y1,
            });
        }
        Ok(())
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.x0 <= x && x <= self.x1 && self.y0 <= y && y <= self.y1
    }

    pub fn width(&self) -> u32 {
        self.x1.abs_diff(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.abs_diff(self.y0)
    }
}
