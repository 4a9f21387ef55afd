use std::sync::Arc;

use crate::{
    error::{ParseError, PdfResult},
    objects::Object,
};

use super::{icc::IccTransform, Color, ColorSpace, Rgb};

/// Paints with a pattern rather than a single color
///
/// Colored patterns carry their own colors, so the space has no components.
/// Uncolored patterns are painted in an underlying space
#[derive(Debug, Clone)]
pub struct PatternColorSpace {
    /// The pattern object, once one is selected
    pattern: Option<Object>,
    underlying: Option<Arc<ColorSpace>>,

    /// Fixed color in the underlying space for an uncolored pattern
    color: Option<Color>,
}

impl PatternColorSpace {
    pub fn new(underlying: Option<Arc<ColorSpace>>) -> Self {
        Self {
            pattern: None,
            underlying,
            color: None,
        }
    }

    /// Selects a pattern, and for uncolored patterns the color to paint it with
    pub fn with_pattern(mut self, pattern: Object, color: Option<Color>) -> PdfResult<Self> {
        if let Some(color) = &color {
            let expected = self.component_count();

            if color.len() != expected {
                anyhow::bail!(ParseError::ComponentCountMismatch {
                    expected,
                    found: color.len(),
                });
            }
        }

        self.pattern = Some(pattern);
        self.color = color;

        Ok(self)
    }

    pub fn pattern(&self) -> Option<&Object> {
        self.pattern.as_ref()
    }

    pub fn underlying(&self) -> Option<&Arc<ColorSpace>> {
        self.underlying.as_ref()
    }

    pub fn color(&self) -> Option<&[f32]> {
        self.color.as_deref()
    }

    pub fn component_count(&self) -> usize {
        self.underlying
            .as_ref()
            .map_or(0, |space| space.component_count())
    }

    pub(super) fn get_color(
        &self,
        color: &[f32],
        cms: Option<&dyn IccTransform>,
    ) -> PdfResult<Option<Rgb>> {
        match &self.underlying {
            Some(space) => space.get_color_with_cms(self.color.as_deref().unwrap_or(color), cms),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use crate::color::convert_to_color;

    use super::*;

    #[test]
    fn colored_pattern_has_no_color() {
        let space = ColorSpace::Pattern(PatternColorSpace::new(None));

        assert_eq!(space.component_count(), 0);
        assert_eq!(space.get_color(&[]).unwrap(), None);
        assert_eq!(space.default_color(), None);
        assert!(space.get_color(&[1.0]).is_err());
    }

    #[test]
    fn uncolored_pattern_uses_underlying_space() {
        let space = PatternColorSpace::new(Some(ColorSpace::device_rgb()));
        assert_eq!(space.component_count(), 3);

        let caller = ColorSpace::Pattern(space.clone());
        assert_eq!(
            caller.get_color(&[0.0, 1.0, 0.0]).unwrap(),
            Some(Rgb::new(0.0, 1.0, 0.0))
        );
        assert_eq!(caller.default_color(), None);

        let fixed = ColorSpace::Pattern(
            space
                .with_pattern(Object::name("P0"), Some(convert_to_color(&[1.0, 0.0, 0.0])))
                .unwrap(),
        );
        assert_eq!(
            fixed.get_color(&[0.0, 1.0, 0.0]).unwrap(),
            Some(Rgb::new(1.0, 0.0, 0.0))
        );
        assert!(fixed.as_pattern().unwrap().pattern().is_some());
    }

    #[test]
    fn fixed_color_must_match_underlying_space() {
        let space = PatternColorSpace::new(Some(ColorSpace::device_gray()));

        assert!(space
            .with_pattern(Object::name("P0"), Some(convert_to_color(&[0.0, 0.0])))
            .is_err());
    }
}
