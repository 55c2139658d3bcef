use serde::{Deserialize, Serialize};

pub mod coords;

// ----------------------------------------------
// Macros
// ----------------------------------------------

// Defines a bitflags struct with a Display implementation.
#[macro_export]
macro_rules! bitflags_with_display {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                const $flag:ident = $value:expr;
            )+
        }
    ) => {
        ::bitflags::bitflags! {
            $(#[$meta])*
            $vis struct $name: $ty {
                $(
                    const $flag = $value;
                )+
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let mut first = true;
                $(
                    if self.contains($name::$flag) {
                        if !first {
                            write!(f, " | ")?;
                        }
                        write!(f, stringify!($flag))?;
                        first = false;
                    }
                )+
                if first {
                    write!(f, "(empty)")
                } else {
                    Ok(())
                }
            }
        }
    };
}

// ----------------------------------------------
// Size
// ----------------------------------------------

// Integer width & height pair.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { width: 0, height: 0 }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    #[inline]
    pub const fn half(self) -> Self {
        Self { width: self.width / 2, height: self.height / 2 }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{}]", self.width, self.height)
    }
}

// ----------------------------------------------
// Rect
// ----------------------------------------------

// Integer screen space rectangle.
// `left`/`top` are inclusive, `right`/`bottom` are exclusive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    #[inline]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    #[inline]
    pub const fn from_pos_and_size(x: i32, y: i32, size: Size) -> Self {
        Self { left: x, top: y, right: x + size.width, bottom: y + size.height }
    }

    #[inline]
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }

    #[inline]
    pub const fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    // Returns `true` if this rect intersects with another.
    #[inline]
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
        && self.right > other.left
        && self.top < other.bottom
        && self.bottom > other.top
    }

    // Inclusive of left/top, exclusive of right/bottom.
    #[inline]
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.left
        && x < self.right
        && y >= self.top
        && y < self.bottom
    }

    // Returns `true` if this rect fully contains the other rect.
    #[inline]
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.left <= other.left
        && self.right >= other.right
        && self.top <= other.top
        && self.bottom >= other.bottom
    }

    // May return an invalid (empty) rect if there is no overlap.
    #[inline]
    pub fn intersection(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "(L:{}, T:{}, R:{}, B:{})", self.left, self.top, self.right, self.bottom)
    }
}

// ----------------------------------------------
// Integer math helpers
// ----------------------------------------------

// Rounds down to a multiple of `step` (power of two or not), towards negative infinity.
#[inline]
pub const fn floor2(value: i32, step: i32) -> i32 {
    value - value.rem_euclid(step)
}

// Integer division rounding the magnitude up, sign preserved.
#[inline]
pub const fn div_away_from_zero(value: i32, divisor: i32) -> i32 {
    let magnitude = (value.abs() + divisor - 1) / divisor;
    if value < 0 { -magnitude } else { magnitude }
}
