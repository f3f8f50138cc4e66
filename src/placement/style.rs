use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// Биты стиля окна (значения совпадают с `GWL_STYLE` в Win32)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowStyleFlags(pub u32);

impl WindowStyleFlags {
    pub const NONE: WindowStyleFlags = WindowStyleFlags(0);
    /// WS_BORDER
    pub const BORDER: WindowStyleFlags = WindowStyleFlags(0x0080_0000);
    /// WS_CAPTION (включает WS_BORDER)
    pub const CAPTION: WindowStyleFlags = WindowStyleFlags(0x00C0_0000);
    /// WS_SIZEBOX / WS_THICKFRAME
    pub const SIZEBOX: WindowStyleFlags = WindowStyleFlags(0x0004_0000);

    pub const DECORATIONS: WindowStyleFlags =
        WindowStyleFlags(Self::BORDER.0 | Self::CAPTION.0 | Self::SIZEBOX.0);

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Хотя бы один бит из `other` выставлен
    pub fn intersects(&self, other: WindowStyleFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn has_border(&self) -> bool {
        self.intersects(Self::BORDER)
    }

    pub fn has_caption(&self) -> bool {
        self.intersects(Self::CAPTION)
    }

    /// Рамка или заголовок: такое состояние окна никогда не допустимо
    pub fn is_decorated(&self) -> bool {
        self.has_border() || self.has_caption()
    }

    pub fn without_decorations(self) -> Self {
        self & !Self::DECORATIONS
    }
}

impl BitOr for WindowStyleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for WindowStyleFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for WindowStyleFlags {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl fmt::Display for WindowStyleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#010x} (border: {}, caption: {}, sizebox: {})",
            self.0,
            self.has_border(),
            self.has_caption(),
            self.intersects(Self::SIZEBOX)
        )
    }
}
