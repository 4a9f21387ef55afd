use std::sync::Arc;

use crate::error::{ParseError, PdfResult};

use super::{icc::IccTransform, Color, ColorSpace, Rgb};

/// A palette of colors in a base space, addressed by a single index
#[derive(Debug, Clone)]
pub struct IndexedColorSpace {
    base: Arc<ColorSpace>,

    /// The maximum valid index value
    hival: u8,

    /// `(hival + 1) * base.component_count()` bytes, one component per byte
    lookup: Vec<u8>,
}

impl IndexedColorSpace {
    pub fn new(base: Arc<ColorSpace>, hival: u8, lookup: Vec<u8>) -> PdfResult<Self> {
        let expected = (usize::from(hival) + 1) * base.component_count();

        if lookup.len() != expected {
            anyhow::bail!(ParseError::invalid_color_space(format!(
                "indexed lookup table has {} bytes, expected {}",
                lookup.len(),
                expected
            )));
        }

        Ok(Self {
            base,
            hival,
            lookup,
        })
    }

    pub fn base(&self) -> &Arc<ColorSpace> {
        &self.base
    }

    pub fn hival(&self) -> u8 {
        self.hival
    }

    pub fn lookup(&self) -> &[u8] {
        &self.lookup
    }

    /// The base space tuple for an index. Fractional indices are truncated and
    /// out of range indices clipped
    pub fn base_color(&self, index: f32) -> Color {
        let index = (index as i32).clamp(0, i32::from(self.hival)) as usize;
        let n = self.base.component_count();

        self.lookup[index * n..(index + 1) * n]
            .iter()
            .map(|&b| f32::from(b) / 255.0)
            .collect()
    }

    pub(super) fn get_color(
        &self,
        index: f32,
        cms: Option<&dyn IccTransform>,
    ) -> PdfResult<Option<Rgb>> {
        self.base.get_color_with_cms(&self.base_color(index), cms)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn palette() -> IndexedColorSpace {
        IndexedColorSpace::new(
            ColorSpace::device_rgb(),
            2,
            vec![255, 0, 0, 0, 255, 0, 0, 0, 255],
        )
        .unwrap()
    }

    #[test]
    fn indices_map_to_palette() {
        let space = palette();

        assert_eq!(space.get_color(0.0, None).unwrap(), Some(Rgb::new(1.0, 0.0, 0.0)));
        assert_eq!(space.get_color(1.0, None).unwrap(), Some(Rgb::new(0.0, 1.0, 0.0)));
        assert_eq!(space.get_color(2.0, None).unwrap(), Some(Rgb::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn indices_are_truncated_and_clipped() {
        let space = palette();

        assert_eq!(space.base_color(1.9), space.base_color(1.0));
        assert_eq!(space.base_color(3.0), space.base_color(2.0));
        assert_eq!(space.base_color(-5.0), space.base_color(0.0));
        assert_eq!(space.base_color(f32::NAN), space.base_color(0.0));
    }

    #[test]
    fn lookup_size_must_match() {
        let err = IndexedColorSpace::new(ColorSpace::device_rgb(), 2, vec![0; 8]).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<ParseError>(),
            Some(ParseError::InvalidColorSpace { .. })
        ));
        assert!(IndexedColorSpace::new(ColorSpace::device_gray(), 255, vec![0; 256]).is_ok());
    }
}
