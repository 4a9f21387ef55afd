use std::fmt;

use smallvec::SmallVec;

use crate::error::{ParseError, PdfResult};

use self::math::{clip01_3, Color3};

mod cie;
mod color_space;
mod device_n;
mod icc;
mod indexed;
pub mod math;
mod pattern;
mod resolver;
mod separation;

pub use self::{
    cie::{CalGrayColorSpace, CalRgbColorSpace, LabColorSpace, XyzCalibration},
    color_space::{ColorSpace, ColorSpaceName},
    device_n::{Colorant, DeviceNColorSpace, DeviceNKind, ProcessColorSpace},
    icc::{IccBasedColorSpace, IccProfile, IccProfileHeader, IccSignature, IccTransform},
    indexed::IndexedColorSpace,
    pattern::PatternColorSpace,
    resolver::{resolve, ColorSpaceCache, ColorSpaceResolver, COLOR_SPACE_MAX_LEVEL_OF_RECURSION},
    separation::SeparationColorSpace,
};

/// Components of a color in some color space. Most spaces have at most four
/// components; DeviceN may have more
pub type Color = SmallVec<[f32; 4]>;

pub fn convert_to_color(components: &[f32]) -> Color {
    Color::from_slice(components)
}

/// Colors with different numbers of components are never equal
pub fn is_color_equal(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| (a - b).abs() <= tolerance)
}

/// `ratio` of 0 gives `a`, 1 gives `b`
pub fn mix_colors(a: &[f32], b: &[f32], ratio: f32) -> PdfResult<Color> {
    if a.len() != b.len() {
        anyhow::bail!(ParseError::ComponentCountMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }

    Ok(a.iter()
        .zip(b)
        .map(|(a, b)| a * (1.0 - ratio) + b * ratio)
        .collect())
}

/// A device color with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    /// Clips each component to `[0, 1]`
    pub fn from_rgb01(rgb: Color3) -> Self {
        let [red, green, blue] = clip01_3(rgb);

        Self { red, green, blue }
    }

    pub fn gray(value: f32) -> Self {
        Self::from_rgb01([value; 3])
    }

    pub fn to_rgb8(self) -> [u8; 3] {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;

        [quantize(self.red), quantize(self.green), quantize(self.blue)]
    }

    /// ARGB, fully opaque
    pub fn as_u32(self) -> u32 {
        let [r, g, b] = self.to_rgb8();

        (0xff << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }

    pub fn is_close(self, other: Self, tolerance: f32) -> bool {
        is_color_equal(
            &[self.red, self.green, self.blue],
            &[other.red, other.green, other.blue],
            tolerance,
        )
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.to_rgb8();

        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rgb_quantization() {
        assert_eq!(Rgb::new(1.0, 0.5, 0.0).to_rgb8(), [255, 128, 0]);
        assert_eq!(Rgb::WHITE.as_u32(), 0xff_ff_ff_ff);
        assert_eq!(Rgb::BLACK.as_u32(), 0xff_00_00_00);
        assert_eq!(Rgb::new(1.0, 0.0, 0.0).as_u32(), 0xff_ff_00_00);
        assert_eq!(Rgb::from_rgb01([2.0, -1.0, 0.25]), Rgb::new(1.0, 0.0, 0.25));
        assert_eq!(Rgb::new(0.0, 0.2, 1.0).to_string(), "#0033ff");
    }

    #[test]
    fn color_helpers() {
        let a = convert_to_color(&[0.0, 0.5, 1.0]);
        let b = convert_to_color(&[1.0, 0.5, 0.0]);

        assert!(is_color_equal(&a, &[0.001, 0.5, 0.999], 0.01));
        assert!(!is_color_equal(&a, &b, 0.01));
        assert!(!is_color_equal(&a, &[0.0, 0.5], 0.01));

        assert_eq!(mix_colors(&a, &b, 0.5).unwrap().as_slice(), &[0.5, 0.5, 0.5]);
        assert_eq!(mix_colors(&a, &b, 0.0).unwrap(), a);
        assert!(mix_colors(&a, &[1.0], 0.5).is_err());
    }

    #[test]
    fn spills_to_heap() {
        let color = convert_to_color(&[0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(color.len(), 5);
        assert!(color.spilled());
    }
}
