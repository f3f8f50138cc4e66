use super::AspectRatio;
use serde::{Deserialize, Serialize};

/// Ориентация окна или монитора
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Landscape только при строгом `width > height`; квадрат считается Portrait.
    pub fn from_size(width: i32, height: i32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }

    /// Соотношение сторон мониторов-кандидатов для этой ориентации
    pub fn target_ratio(&self) -> AspectRatio {
        match self {
            Orientation::Landscape => AspectRatio::LANDSCAPE_WIDE,
            Orientation::Portrait => AspectRatio::PORTRAIT_WIDE,
        }
    }
}
