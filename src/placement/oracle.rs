use super::WindowStyleFlags;
use crate::geometry::{classify_displays, Display, Orientation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Свежий снимок окна. Никогда не кэшируется между проходами.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowGeometrySnapshot {
    pub style: WindowStyleFlags,
    pub client_width: i32,
    pub client_height: i32,
}

impl WindowGeometrySnapshot {
    pub fn new(style: WindowStyleFlags, client_width: i32, client_height: i32) -> Self {
        Self {
            style,
            client_width,
            client_height,
        }
    }

    /// Ориентация по текущей клиентской области, даже если рамка ещё не снята
    pub fn orientation(&self) -> Orientation {
        Orientation::from_size(self.client_width, self.client_height)
    }
}

impl fmt::Display for WindowGeometrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "client {}x{}, style {}",
            self.client_width, self.client_height, self.style
        )
    }
}

/// Итог проверки окна
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NoActionNeeded,
    /// Окно с рамкой, но подходящего монитора нет: снимаем рамку, окно не двигаем
    StripDecorationsOnly,
    /// Снять рамку и растянуть окно ровно на `target.bounds`
    Correct { target: Display },
}

impl Decision {
    pub fn requires_write(&self) -> bool {
        !matches!(self, Decision::NoActionNeeded)
    }
}

/// Решает, нужна ли коррекция.
///
/// 1. A decorated window (border or caption set) always needs correcting.
/// 2. Candidates are the displays whose exact reduced ratio matches the window's
///    orientation, taken from its current raw client size.
/// 3. An undecorated window whose client size equals some candidate's size is
///    left alone; otherwise the first candidate in enumeration order wins.
///
/// With no candidates, an undecorated window is never forced anywhere and a
/// decorated one only loses its decorations.
pub fn decide(window: &WindowGeometrySnapshot, displays: &[Display]) -> Decision {
    let orientation = window.orientation();
    let candidates = classify_displays(displays, orientation.target_ratio());

    crate::debug_if_enabled!(
        "Окно: {}, ориентация {:?}, кандидатов: {}",
        window,
        orientation,
        candidates.len()
    );

    let Some(first) = candidates.first() else {
        return if window.style.is_decorated() {
            Decision::StripDecorationsOnly
        } else {
            Decision::NoActionNeeded
        };
    };

    if window.style.is_decorated() {
        return Decision::Correct {
            target: (*first).clone(),
        };
    }

    let already_fits = candidates
        .iter()
        .any(|display| display.bounds.same_size(window.client_width, window.client_height));

    if already_fits {
        Decision::NoActionNeeded
    } else {
        Decision::Correct {
            target: (*first).clone(),
        }
    }
}
