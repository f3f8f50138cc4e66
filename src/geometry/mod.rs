//! Geometry primitives shared by the platform layer and the placement core.
//!
//! Nothing here talks to the OS: displays and rectangles are plain snapshots,
//! recomputed on every enforcement pass.

pub mod aspect;
pub mod orientation;

pub use aspect::{classify_displays, reduce_ratio, AspectRatio};
pub use orientation::Orientation;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Прямоугольник в экранных координатах
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Из пары углов (left, top, right, bottom), как их отдаёт Win32 RECT
    #[allow(dead_code)]
    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn same_size(&self, width: i32, height: i32) -> bool {
        self.width == width && self.height == height
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@({},{})", self.width, self.height, self.x, self.y)
    }
}

/// Снимок подключённого монитора. Идентичность между перечислениями не гарантируется.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    pub id: String,
    pub bounds: Rect,
}

impl Display {
    pub fn new(id: impl Into<String>, bounds: Rect) -> Self {
        Self {
            id: id.into(),
            bounds,
        }
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        reduce_ratio(self.bounds.width, self.bounds.height)
    }
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.id, self.bounds, self.aspect_ratio())
    }
}
