use crate::foundation::error::{AdError, AdResult};

pub use kurbo::{Point, Rect, Vec2};

/// Largest edge accepted for any composed asset.
pub const MAX_DIMENSION: u32 = 16_384;

/// Exact pixel size of a channel or raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> AdResult<Self> {
        let d = Self { width, height };
        d.validate()?;
        Ok(d)
    }

    pub fn validate(self) -> AdResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(AdError::composition(format!(
                "dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(AdError::composition(format!(
                "dimensions {}x{} exceed the {MAX_DIMENSION}px limit",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn aspect(self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }

    pub fn pixel_count(self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    pub fn orientation(self) -> Orientation {
        let aspect = self.aspect();
        if aspect >= 1.5 {
            Orientation::Landscape
        } else if aspect <= 1.0 / 1.5 {
            Orientation::Portrait
        } else {
            Orientation::Balanced
        }
    }
}

/// Coarse aspect-ratio class used by layout adaptation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// height / width >= 1.5
    Portrait,
    /// width / height >= 1.5
    Landscape,
    Balanced,
}

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (leading `#` optional).
    pub fn from_hex(hex: &str) -> AdResult<Self> {
        let s = hex.trim().trim_start_matches('#');
        let nib = |c: u8| -> Option<u8> { (c as char).to_digit(16).map(|d| d as u8) };
        let bytes = s.as_bytes();
        let bad = || AdError::schema(format!("invalid hex color '{hex}'"));
        match bytes.len() {
            3 => {
                let mut out = [0u8; 3];
                for (o, &c) in out.iter_mut().zip(bytes) {
                    let v = nib(c).ok_or_else(bad)?;
                    *o = v * 17;
                }
                Ok(Self::rgb(out[0], out[1], out[2]))
            }
            6 | 8 => {
                let mut out = [255u8; 4];
                for (i, pair) in bytes.chunks(2).enumerate() {
                    let hi = nib(pair[0]).ok_or_else(bad)?;
                    let lo = nib(pair[1]).ok_or_else(bad)?;
                    out[i] = hi * 16 + lo;
                }
                Ok(Self {
                    r: out[0],
                    g: out[1],
                    b: out[2],
                    a: out[3],
                })
            }
            _ => Err(bad()),
        }
    }

    /// Perceived brightness in `0.0..=1.0` (Rec. 601 weights).
    pub fn luminance(self) -> f64 {
        (0.299 * f64::from(self.r) + 0.587 * f64::from(self.g) + 0.114 * f64::from(self.b))
            / 255.0
    }

    /// Black on light colors, white on dark ones.
    pub fn contrasting(self) -> Self {
        if self.luminance() > 0.5 {
            Self::BLACK
        } else {
            Self::WHITE
        }
    }

    pub fn to_premul(self) -> [u8; 4] {
        let a = u16::from(self.a);
        let p = |c: u8| crate::foundation::math::mul_div255_u8(u16::from(c), a);
        [p(self.r), p(self.g), p(self.b), self.a]
    }
}

/// Integer pixel rectangle inside a canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(self) -> u32 {
        self.y + self.height
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn short_side(self) -> u32 {
        self.width.min(self.height)
    }

    pub fn intersects(self, other: Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains(self, other: Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Scale a normalized `[0,1]` rectangle to pixels with floor semantics.
    pub fn from_normalized(r: Rect, dims: Dimensions) -> Self {
        let w = f64::from(dims.width);
        let h = f64::from(dims.height);
        let x0 = (r.x0.clamp(0.0, 1.0) * w).floor() as u32;
        let y0 = (r.y0.clamp(0.0, 1.0) * h).floor() as u32;
        let x1 = (r.x1.clamp(0.0, 1.0) * w).floor() as u32;
        let y1 = (r.y1.clamp(0.0, 1.0) * h).floor() as u32;
        Self::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.right()),
            f64::from(self.bottom()),
        )
    }

    /// Shrink on every side by `px`, never below an empty box.
    pub fn inset(self, px: u32) -> Self {
        let dx = px.min(self.width / 2);
        let dy = px.min(self.height / 2);
        Self::new(
            self.x + dx,
            self.y + dy,
            self.width - 2 * dx,
            self.height - 2 * dy,
        )
    }

    /// Split horizontally into two halves separated by `gap` pixels.
    pub fn split_columns(self, gap: u32) -> (Self, Self) {
        let gap = gap.min(self.width);
        let left_w = (self.width - gap) / 2;
        let right_w = self.width - gap - left_w;
        (
            Self::new(self.x, self.y, left_w, self.height),
            Self::new(self.x + left_w + gap, self.y, right_w, self.height),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
