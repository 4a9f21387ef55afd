use std::sync::Arc;

use once_cell::sync::Lazy;
use pdf_macro::pdf_enum;

use crate::error::{ParseError, PdfResult};

use super::{
    cie::{CalGrayColorSpace, CalRgbColorSpace, LabColorSpace},
    device_n::DeviceNColorSpace,
    icc::{IccBasedColorSpace, IccTransform},
    indexed::IndexedColorSpace,
    math::clip01,
    pattern::PatternColorSpace,
    separation::SeparationColorSpace,
    Color, Rgb,
};

static DEVICE_GRAY: Lazy<Arc<ColorSpace>> = Lazy::new(|| Arc::new(ColorSpace::DeviceGray));
static DEVICE_RGB: Lazy<Arc<ColorSpace>> = Lazy::new(|| Arc::new(ColorSpace::DeviceRGB));
static DEVICE_CMYK: Lazy<Arc<ColorSpace>> = Lazy::new(|| Arc::new(ColorSpace::DeviceCMYK));

/// A resolved color space. Immutable once built, and shared through `Arc`
#[derive(Debug, Clone)]
pub enum ColorSpace {
    // Device
    DeviceGray,
    DeviceRGB,
    DeviceCMYK,

    // CIE-based
    CalGray(CalGrayColorSpace),
    CalRGB(CalRgbColorSpace),
    Lab(LabColorSpace),
    IccBased(IccBasedColorSpace),

    // Special
    Indexed(IndexedColorSpace),
    Separation(SeparationColorSpace),
    DeviceN(DeviceNColorSpace),
    Pattern(PatternColorSpace),
}

impl ColorSpace {
    pub fn device_gray() -> Arc<Self> {
        Arc::clone(&DEVICE_GRAY)
    }

    pub fn device_rgb() -> Arc<Self> {
        Arc::clone(&DEVICE_RGB)
    }

    pub fn device_cmyk() -> Arc<Self> {
        Arc::clone(&DEVICE_CMYK)
    }

    /// The device space of the given family, if it is one
    pub fn device(family: ColorSpaceName) -> Option<Arc<Self>> {
        Some(match family {
            ColorSpaceName::DeviceGray => Self::device_gray(),
            ColorSpaceName::DeviceRGB => Self::device_rgb(),
            ColorSpaceName::DeviceCMYK => Self::device_cmyk(),
            _ => return None,
        })
    }

    pub fn family(&self) -> ColorSpaceName {
        match self {
            Self::DeviceGray => ColorSpaceName::DeviceGray,
            Self::DeviceRGB => ColorSpaceName::DeviceRGB,
            Self::DeviceCMYK => ColorSpaceName::DeviceCMYK,
            Self::CalGray(..) => ColorSpaceName::CalGray,
            Self::CalRGB(..) => ColorSpaceName::CalRGB,
            Self::Lab(..) => ColorSpaceName::Lab,
            Self::IccBased(..) => ColorSpaceName::ICCBased,
            Self::Indexed(..) => ColorSpaceName::Indexed,
            Self::Separation(..) => ColorSpaceName::Separation,
            Self::DeviceN(..) => ColorSpaceName::DeviceN,
            Self::Pattern(..) => ColorSpaceName::Pattern,
        }
    }

    pub fn component_count(&self) -> usize {
        match self {
            Self::DeviceGray | Self::CalGray(..) | Self::Indexed(..) | Self::Separation(..) => 1,
            Self::DeviceRGB | Self::CalRGB(..) | Self::Lab(..) => 3,
            Self::DeviceCMYK => 4,
            Self::IccBased(space) => space.alternate.component_count(),
            Self::DeviceN(space) => space.colorants.len(),
            Self::Pattern(space) => space.component_count(),
        }
    }

    /// The tuple a graphics state starts with after selecting this space
    pub fn initial_color(&self) -> Color {
        match self {
            Self::DeviceCMYK => Color::from_slice(&[0.0, 0.0, 0.0, 1.0]),
            _ => Color::from_elem(0.0, self.component_count()),
        }
    }

    /// The color of the initial tuple. Pattern spaces have no intrinsic color
    pub fn default_color(&self) -> Option<Rgb> {
        if let Self::Pattern(..) = self {
            return None;
        }

        match self.get_color(&self.initial_color()) {
            Ok(rgb) => rgb,
            Err(err) => {
                log::warn!("unable to compute default color: {}", err);
                None
            }
        }
    }

    /// `Ok(None)` means the color is undefined, for example because a tint
    /// transform failed
    pub fn get_color(&self, color: &[f32]) -> PdfResult<Option<Rgb>> {
        self.get_color_with_cms(color, None)
    }

    pub fn get_color_with_cms(
        &self,
        color: &[f32],
        cms: Option<&dyn IccTransform>,
    ) -> PdfResult<Option<Rgb>> {
        let expected = self.component_count();

        if color.len() != expected {
            anyhow::bail!(ParseError::ComponentCountMismatch {
                expected,
                found: color.len(),
            });
        }

        Ok(match self {
            Self::DeviceGray => Some(Rgb::gray(color[0])),
            Self::DeviceRGB => Some(Rgb::from_rgb01([color[0], color[1], color[2]])),
            Self::DeviceCMYK => Some(cmyk_to_rgb(color[0], color[1], color[2], color[3])),
            Self::CalGray(space) => Some(space.to_rgb(color[0])),
            Self::CalRGB(space) => Some(space.to_rgb([color[0], color[1], color[2]])),
            Self::Lab(space) => Some(space.to_rgb([color[0], color[1], color[2]])),
            Self::IccBased(space) => {
                let clipped = space.clip_to_range(color);

                if let Some(rgb) = cms.and_then(|cms| cms.transform(&clipped, &space.profile)) {
                    return Ok(Some(rgb));
                }

                space.alternate.get_color_with_cms(&clipped, cms)?
            }
            Self::Indexed(space) => space.get_color(color[0], cms)?,
            Self::Separation(space) => space.get_color(color, cms)?,
            Self::DeviceN(space) => space.get_color(color, cms)?,
            Self::Pattern(space) => space.get_color(color, cms)?,
        })
    }

    /// Converts a run of pixels, `component_count()` components each, into
    /// packed 8-bit RGB triples. Undefined colors are written as black
    pub fn fill_rgb_buffer(&self, components: &[f32], out: &mut [u8]) -> PdfResult<()> {
        if out.len() % 3 != 0 {
            anyhow::bail!("output buffer of {} bytes does not hold whole RGB triples", out.len());
        }

        let n = self.component_count();
        let pixels = out.len() / 3;

        if components.len() != pixels * n {
            anyhow::bail!(ParseError::ComponentCountMismatch {
                expected: pixels * n,
                found: components.len(),
            });
        }

        for (idx, pixel) in out.chunks_exact_mut(3).enumerate() {
            let color = &components[idx * n..(idx + 1) * n];
            let rgb = self.get_color(color)?.unwrap_or(Rgb::BLACK);

            pixel.copy_from_slice(&rgb.to_rgb8());
        }

        Ok(())
    }

    pub fn as_pattern(&self) -> Option<&PatternColorSpace> {
        match self {
            Self::Pattern(space) => Some(space),
            _ => None,
        }
    }

    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(..))
    }
}

fn cmyk_to_rgb(cyan: f32, magenta: f32, yellow: f32, key: f32) -> Rgb {
    let key = 1.0 - clip01(key);

    Rgb::from_rgb01([
        (1.0 - clip01(cyan)) * key,
        (1.0 - clip01(magenta)) * key,
        (1.0 - clip01(yellow)) * key,
    ])
}

#[pdf_enum]
pub enum ColorSpaceName {
    DeviceGray = "DeviceGray",
    DeviceRGB = "DeviceRGB",
    DeviceCMYK = "DeviceCMYK",
    CalGray = "CalGray",
    CalRGB = "CalRGB",
    Lab = "Lab",
    ICCBased = "ICCBased",
    Indexed = "Indexed",
    Pattern = "Pattern",
    Separation = "Separation",
    DeviceN = "DeviceN",
}
