use std::sync::Arc;

use crate::{error::PdfResult, function::TintTransform, objects::Name};

use super::{icc::IccTransform, ColorSpace, Rgb};

/// A single spot colorant, approximated through an alternate space
#[derive(Debug, Clone)]
pub struct SeparationColorSpace {
    colorant: Name,
    alternate: Arc<ColorSpace>,
    tint_transform: Arc<dyn TintTransform>,
}

impl SeparationColorSpace {
    pub fn new(
        colorant: Name,
        alternate: Arc<ColorSpace>,
        tint_transform: Arc<dyn TintTransform>,
    ) -> Self {
        Self {
            colorant,
            alternate,
            tint_transform,
        }
    }

    pub fn colorant(&self) -> &Name {
        &self.colorant
    }

    pub fn alternate(&self) -> &Arc<ColorSpace> {
        &self.alternate
    }

    pub fn tint_transform(&self) -> &Arc<dyn TintTransform> {
        &self.tint_transform
    }

    pub(super) fn get_color(
        &self,
        tint: &[f32],
        cms: Option<&dyn IccTransform>,
    ) -> PdfResult<Option<Rgb>> {
        apply_tint_transform(&*self.tint_transform, &self.alternate, tint, cms)
    }
}

/// Runs the tint transform and converts its output in the alternate space. A
/// transform that fails, or that produces the wrong number of components,
/// gives an undefined color
pub(super) fn apply_tint_transform(
    tint_transform: &dyn TintTransform,
    alternate: &ColorSpace,
    tint: &[f32],
    cms: Option<&dyn IccTransform>,
) -> PdfResult<Option<Rgb>> {
    let output = match tint_transform.apply(tint) {
        Ok(output) => output,
        Err(err) => {
            log::debug!("tint transform failed: {:#}", err);
            return Ok(None);
        }
    };

    if output.len() != alternate.component_count() {
        log::debug!(
            "tint transform produced {} components, alternate space expects {}",
            output.len(),
            alternate.component_count()
        );
        return Ok(None);
    }

    alternate.get_color_with_cms(&output, cms)
}

#[cfg(test)]
pub(super) mod test {
    use super::*;

    /// `t -> [t, t / 2, 0]`
    #[derive(Debug)]
    pub struct HalfRed;

    impl TintTransform for HalfRed {
        fn input_count(&self) -> usize {
            1
        }

        fn output_count(&self) -> Option<usize> {
            Some(3)
        }

        fn apply(&self, input: &[f32]) -> PdfResult<Vec<f32>> {
            Ok(vec![input[0], input[0] / 2.0, 0.0])
        }
    }

    #[derive(Debug)]
    pub struct Failing;

    impl TintTransform for Failing {
        fn input_count(&self) -> usize {
            1
        }

        fn output_count(&self) -> Option<usize> {
            None
        }

        fn apply(&self, _input: &[f32]) -> PdfResult<Vec<f32>> {
            anyhow::bail!("stack underflow")
        }
    }

    #[test]
    fn tint_goes_through_alternate() {
        let space = ColorSpace::Separation(SeparationColorSpace::new(
            Name::new("Spot"),
            ColorSpace::device_rgb(),
            Arc::new(HalfRed),
        ));

        assert_eq!(space.component_count(), 1);
        assert_eq!(
            space.get_color(&[1.0]).unwrap(),
            Some(Rgb::new(1.0, 0.5, 0.0))
        );
        assert_eq!(space.default_color(), Some(Rgb::BLACK));
    }

    #[test]
    fn failing_transform_is_undefined() {
        let space = ColorSpace::Separation(SeparationColorSpace::new(
            Name::new("Spot"),
            ColorSpace::device_rgb(),
            Arc::new(Failing),
        ));

        assert_eq!(space.get_color(&[0.5]).unwrap(), None);

        let mut out = [7; 6];
        space.fill_rgb_buffer(&[0.0, 1.0], &mut out).unwrap();
        assert_eq!(out, [0; 6]);
    }

    #[test]
    fn wrong_output_arity_is_undefined() {
        let space = ColorSpace::Separation(SeparationColorSpace::new(
            Name::new("Spot"),
            ColorSpace::device_cmyk(),
            Arc::new(HalfRed),
        ));

        assert_eq!(space.get_color(&[1.0]).unwrap(), None);
    }
}
