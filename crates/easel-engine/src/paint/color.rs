/// Straight-alpha RGBA color with `f32` channels in `[0, 1]`.
///
/// Vertex colors and the canvas background use this type. Renderers that blend
/// in premultiplied space convert with [`Color::to_premul`].
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const GRAY: Self = Self::rgb(0.75, 0.75, 0.75);
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Self = Self::rgb(0.0, 0.0, 1.0);
    pub const YELLOW: Self = Self::rgb(1.0, 1.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[inline]
    pub const fn transparent() -> Self {
        Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 }
    }

    /// Creates a color from 8-bit channels.
    #[inline]
    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    /// Clamps all channels to `[0, 1]`.
    #[inline]
    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }

    /// Premultiplied representation (`rgb * a`).
    #[inline]
    pub fn to_premul(self) -> Self {
        let c = self.clamped();
        Self { r: c.r * c.a, g: c.g * c.a, b: c.b * c.a, a: c.a }
    }

    /// Scales RGB, keeping alpha. Used for simple diffuse shading.
    #[inline]
    pub fn shaded(self, factor: f32) -> Self {
        Self { r: self.r * factor, g: self.g * factor, b: self.b * factor, a: self.a }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}

/// 8-bit RGBA color, as read back from the frame buffer.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct ColorInt {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl ColorInt {
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Largest per-channel difference, ignoring alpha.
    #[inline]
    pub fn rgb_distance(self, other: ColorInt) -> u8 {
        self.r
            .abs_diff(other.r)
            .max(self.g.abs_diff(other.g))
            .max(self.b.abs_diff(other.b))
    }
}

impl From<Color> for ColorInt {
    fn from(c: Color) -> Self {
        let c = c.clamped();
        let q = |v: f32| (v * 255.0).round() as u8;
        Self { r: q(c.r), g: q(c.g), b: q(c.b), a: q(c.a) }
    }
}

impl From<ColorInt> for Color {
    fn from(c: ColorInt) -> Self {
        Color::from_u8(c.r, c.g, c.b, c.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_bytes_with_rounding() {
        assert_eq!(ColorInt::from(Color::RED), ColorInt::new(255, 0, 0, 255));
        assert_eq!(ColorInt::from(Color::new(0.5, 2.0, -1.0, 1.0)), ColorInt::new(128, 255, 0, 255));
    }

    #[test]
    fn premul_scales_rgb_by_alpha() {
        let c = Color::new(1.0, 0.5, 0.0, 0.5).to_premul();
        assert_eq!(c, Color::new(0.5, 0.25, 0.0, 0.5));
    }

    #[test]
    fn rgb_distance_ignores_alpha() {
        let a = ColorInt::new(250, 3, 0, 255);
        let b = ColorInt::new(255, 0, 0, 0);
        assert_eq!(a.rgb_distance(b), 5);
    }
}
