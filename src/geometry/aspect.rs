use super::Display;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Соотношение сторон в несократимом виде. `(0, 0)` означает «не определено».
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const LANDSCAPE_WIDE: AspectRatio = AspectRatio::new(16, 9);
    pub const PORTRAIT_WIDE: AspectRatio = AspectRatio::new(9, 16);
    pub const UNDEFINED: AspectRatio = AspectRatio::new(0, 0);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_defined(&self) -> bool {
        *self != Self::UNDEFINED
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_defined() {
            write!(f, "{}:{}", self.width, self.height)
        } else {
            write!(f, "undefined")
        }
    }
}

/// Итеративный алгоритм Евклида
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Сокращает ширину и высоту до несократимой пары.
///
/// Non-positive sides yield [`AspectRatio::UNDEFINED`]; such a display can never
/// match a target ratio.
pub fn reduce_ratio(width: i32, height: i32) -> AspectRatio {
    if width <= 0 || height <= 0 {
        return AspectRatio::UNDEFINED;
    }

    let (width, height) = (width as u32, height as u32);
    let divisor = gcd(width, height);
    AspectRatio::new(width / divisor, height / divisor)
}

/// Все мониторы, чьё сокращённое соотношение сторон в точности равно `target`.
///
/// Сравнение точное, без допусков: 1920x1080 даёт 16:9, а 1921x1080 уже нет.
/// Порядок перечисления сохраняется.
pub fn classify_displays(displays: &[Display], target: AspectRatio) -> Vec<&Display> {
    displays
        .iter()
        .filter(|candidate| {
            let ratio = candidate.aspect_ratio();
            crate::debug_if_enabled!("Монитор {}: соотношение сторон {}", candidate.id, ratio);
            ratio.is_defined() && ratio == target
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;

    #[test]
    fn reduces_common_resolutions() {
        assert_eq!(reduce_ratio(1920, 1080), AspectRatio::LANDSCAPE_WIDE);
        assert_eq!(reduce_ratio(2560, 1440), AspectRatio::LANDSCAPE_WIDE);
        assert_eq!(reduce_ratio(1080, 1920), AspectRatio::PORTRAIT_WIDE);
        assert_eq!(reduce_ratio(1920, 1200), AspectRatio::new(8, 5));
        assert_eq!(reduce_ratio(1921, 1080), AspectRatio::new(1921, 1080));
        assert_eq!(reduce_ratio(500, 500), AspectRatio::new(1, 1));
    }

    #[test]
    fn reduced_ratio_is_coprime_and_proportional() {
        let sizes = [
            (1, 1),
            (7, 3),
            (1920, 1080),
            (3440, 1440),
            (1366, 768),
            (1080, 2400),
            (i32::MAX, 1),
            (i32::MAX, i32::MAX - 1),
            (65536, 4096),
        ];

        for (w, h) in sizes {
            let ratio = reduce_ratio(w, h);
            assert_eq!(gcd(ratio.width, ratio.height), 1, "{}x{}", w, h);
            assert_eq!(
                ratio.width as u64 * h as u64,
                ratio.height as u64 * w as u64,
                "{}x{}",
                w,
                h
            );
        }
    }

    #[test]
    fn non_positive_sides_are_undefined() {
        assert_eq!(reduce_ratio(0, 1080), AspectRatio::UNDEFINED);
        assert_eq!(reduce_ratio(1920, 0), AspectRatio::UNDEFINED);
        assert_eq!(reduce_ratio(-1920, 1080), AspectRatio::UNDEFINED);
        assert!(!AspectRatio::UNDEFINED.is_defined());
        assert_eq!(AspectRatio::UNDEFINED.to_string(), "undefined");
    }

    #[test]
    fn classification_is_exact_match() {
        let displays = vec![
            Display::new("exact", Rect::new(0, 0, 1920, 1080)),
            Display::new("off-by-one", Rect::new(1920, 0, 1920, 1081)),
            Display::new("wider", Rect::new(0, 1080, 1921, 1080)),
            Display::new("portrait", Rect::new(3840, 0, 1080, 1920)),
            Display::new("qhd", Rect::new(0, -1440, 2560, 1440)),
            Display::new("broken", Rect::new(0, 0, 0, 0)),
        ];

        let landscape: Vec<&str> = classify_displays(&displays, AspectRatio::LANDSCAPE_WIDE)
            .into_iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(landscape, vec!["exact", "qhd"]);

        let portrait = classify_displays(&displays, AspectRatio::PORTRAIT_WIDE);
        assert_eq!(portrait.len(), 1);
        assert_eq!(portrait[0].id, "portrait");

        assert!(classify_displays(&[], AspectRatio::LANDSCAPE_WIDE).is_empty());
    }
}
