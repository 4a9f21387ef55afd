use std::sync::Arc;

use pdf_macro::pdf_enum;

use crate::{error::PdfResult, function::TintTransform, objects::Name};

use super::{icc::IccTransform, separation::apply_tint_transform, ColorSpace, Rgb};

/// Any number of colorants, approximated together through an alternate space
#[derive(Debug, Clone)]
pub struct DeviceNColorSpace {
    pub(super) kind: DeviceNKind,

    /// One entry per component, in the order of the names array
    pub(super) colorants: Vec<Colorant>,
    pub(super) alternate: Arc<ColorSpace>,
    pub(super) tint_transform: Arc<dyn TintTransform>,

    /// The process colour space whose components are included in this colour
    /// space
    pub(super) process: Option<ProcessColorSpace>,

    /// The order in which inks shall be laid down. May list colorants unused
    /// by this space
    pub(super) printing_order: Vec<Name>,
}

impl DeviceNColorSpace {
    pub fn new(
        colorants: Vec<Colorant>,
        alternate: Arc<ColorSpace>,
        tint_transform: Arc<dyn TintTransform>,
    ) -> Self {
        Self {
            kind: DeviceNKind::DeviceN,
            colorants,
            alternate,
            tint_transform,
            process: None,
            printing_order: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: DeviceNKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_process(mut self, process: ProcessColorSpace) -> Self {
        self.process = Some(process);
        self
    }

    pub fn with_printing_order(mut self, printing_order: Vec<Name>) -> Self {
        self.printing_order = printing_order;
        self
    }

    pub fn kind(&self) -> DeviceNKind {
        self.kind
    }

    pub fn colorants(&self) -> &[Colorant] {
        &self.colorants
    }

    pub fn colorant(&self, name: &str) -> Option<&Colorant> {
        self.colorants.iter().find(|colorant| colorant.name == name)
    }

    pub fn alternate(&self) -> &Arc<ColorSpace> {
        &self.alternate
    }

    pub fn tint_transform(&self) -> &Arc<dyn TintTransform> {
        &self.tint_transform
    }

    pub fn process(&self) -> Option<&ProcessColorSpace> {
        self.process.as_ref()
    }

    pub fn printing_order(&self) -> &[Name] {
        &self.printing_order
    }

    pub(super) fn get_color(
        &self,
        tints: &[f32],
        cms: Option<&dyn IccTransform>,
    ) -> PdfResult<Option<Rgb>> {
        apply_tint_transform(&*self.tint_transform, &self.alternate, tints, cms)
    }
}

/// The preferred treatment for the colour space
#[pdf_enum]
pub enum DeviceNKind {
    DeviceN = "DeviceN",
    NChannel = "NChannel",
}

#[derive(Debug, Clone)]
pub struct Colorant {
    pub(super) name: Name,

    /// The Separation space from the `Colorants` dictionary. It describes the
    /// appearance of this colorant alone, whereas the tint transform of the
    /// DeviceN space describes only the appearance of its colorants in
    /// combination
    pub(super) separation: Option<Arc<ColorSpace>>,

    /// Solidity of the ink, from 0 (transparent) to 1 (opaque)
    pub(super) solidity: Option<f32>,

    /// Maps values in the range 0 to 1 to values in the range 0 to 1
    pub(super) dot_gain: Option<Arc<dyn TintTransform>>,
}

impl Colorant {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            separation: None,
            solidity: None,
            dot_gain: None,
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn separation(&self) -> Option<&Arc<ColorSpace>> {
        self.separation.as_ref()
    }

    pub fn solidity(&self) -> Option<f32> {
        self.solidity
    }

    pub fn dot_gain(&self) -> Option<&Arc<dyn TintTransform>> {
        self.dot_gain.as_ref()
    }
}

#[derive(Debug, Clone)]
pub struct ProcessColorSpace {
    /// Any device or CIE-based colour space
    pub(super) color_space: Arc<ColorSpace>,

    /// Names corresponding, in order, to the components of `color_space`
    pub(super) components: Vec<Name>,
}

impl ProcessColorSpace {
    pub fn new(color_space: Arc<ColorSpace>, components: Vec<Name>) -> Self {
        Self {
            color_space,
            components,
        }
    }

    pub fn color_space(&self) -> &Arc<ColorSpace> {
        &self.color_space
    }

    pub fn components(&self) -> &[Name] {
        &self.components
    }
}

#[cfg(test)]
mod test {
    use crate::color::separation::test::Failing;

    use super::*;

    /// `[c m y k] -> [c m y k]`
    #[derive(Debug)]
    struct Passthrough(usize);

    impl TintTransform for Passthrough {
        fn input_count(&self) -> usize {
            self.0
        }

        fn output_count(&self) -> Option<usize> {
            Some(self.0)
        }

        fn apply(&self, input: &[f32]) -> PdfResult<Vec<f32>> {
            Ok(input.to_vec())
        }
    }

    fn colorants(names: &[&str]) -> Vec<Colorant> {
        names.iter().map(|name| Colorant::new(Name::new(name))).collect()
    }

    #[test]
    fn components_follow_colorants() {
        let space = ColorSpace::DeviceN(DeviceNColorSpace::new(
            colorants(&["Cyan", "Magenta", "Yellow", "Black"]),
            ColorSpace::device_cmyk(),
            Arc::new(Passthrough(4)),
        ));

        assert_eq!(space.component_count(), 4);
        assert_eq!(
            space.get_color(&[0.0, 0.0, 0.0, 0.0]).unwrap(),
            Some(Rgb::WHITE)
        );
        assert!(space.get_color(&[0.0; 3]).is_err());
    }

    #[test]
    fn more_than_four_colorants() {
        let space = ColorSpace::DeviceN(DeviceNColorSpace::new(
            colorants(&["A", "B", "C", "D", "E"]),
            ColorSpace::device_rgb(),
            Arc::new(Passthrough(5)),
        ));

        assert_eq!(space.component_count(), 5);
        assert_eq!(space.initial_color().len(), 5);

        // 5 outputs do not fit an RGB alternate
        assert_eq!(space.get_color(&[0.0; 5]).unwrap(), None);
    }

    #[test]
    fn failing_transform_is_undefined() {
        let space = ColorSpace::DeviceN(DeviceNColorSpace::new(
            colorants(&["Spot"]),
            ColorSpace::device_gray(),
            Arc::new(Failing),
        ));

        assert_eq!(space.get_color(&[1.0]).unwrap(), None);
        assert_eq!(space.default_color(), None);
    }

    #[test]
    fn lookup_by_colorant_name() {
        let space = DeviceNColorSpace::new(
            colorants(&["Orange", "Green"]),
            ColorSpace::device_rgb(),
            Arc::new(Passthrough(2)),
        )
        .with_kind(DeviceNKind::NChannel)
        .with_printing_order(vec![Name::new("Green"), Name::new("Orange")]);

        assert_eq!(space.kind(), DeviceNKind::NChannel);
        assert!(space.colorant("Green").is_some());
        assert!(space.colorant("Violet").is_none());
        assert_eq!(space.printing_order()[0], "Green");
    }
}
