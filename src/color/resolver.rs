/*!

Turns color space descriptors into [`ColorSpace`]s

A descriptor is either a name (a device family, one of its inline image
abbreviations, or a key into the `ColorSpace` resource dictionary) or an array
whose first element names a family and whose remaining elements are its
parameters.

*/

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, PoisonError, RwLock},
};

use anyhow::Context;

use crate::{
    error::{ParseError, PdfResult},
    function::{Function, TintTransform},
    objects::{Dictionary, Name, Object, ObjectType},
    resolve::{FromObj, Resolve},
};

use super::{
    cie::{CalGrayColorSpace, CalRgbColorSpace, LabColorSpace},
    device_n::{Colorant, DeviceNColorSpace, DeviceNKind, ProcessColorSpace},
    icc::{IccBasedColorSpace, IccProfile},
    indexed::IndexedColorSpace,
    pattern::PatternColorSpace,
    separation::SeparationColorSpace,
    ColorSpace, ColorSpaceName,
};

/// Each nested descriptor, and each name lookup, consumes one level
pub const COLOR_SPACE_MAX_LEVEL_OF_RECURSION: usize = 12;

macro_rules! invalid {
    ($($arg:tt)*) => {
        anyhow::bail!(ParseError::invalid_color_space(format!($($arg)*)))
    };
}

#[derive(Debug, Clone, Copy)]
pub struct ColorSpaceResolver<'a> {
    /// The `ColorSpace` subdictionary of the current resource dictionary
    color_spaces: Option<&'a Dictionary>,
    max_depth: usize,
}

impl<'a> ColorSpaceResolver<'a> {
    pub fn new(color_spaces: Option<&'a Dictionary>) -> Self {
        Self {
            color_spaces,
            max_depth: COLOR_SPACE_MAX_LEVEL_OF_RECURSION,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Every failure is reported as [`ParseError::InvalidColorSpace`]
    pub fn resolve(
        &self,
        descriptor: &Object,
        resolver: &mut dyn Resolve,
    ) -> PdfResult<Arc<ColorSpace>> {
        let mut in_progress = HashSet::new();

        let space = self
            .resolve_impl(descriptor.clone(), resolver, self.max_depth, &mut in_progress)
            .map_err(|err| match err.downcast_ref::<ParseError>() {
                Some(ParseError::InvalidColorSpace { .. }) => err,
                _ => ParseError::invalid_color_space(format!("{:#}", err)).into(),
            })?;

        log::trace!("resolved color space {:?}", space.family());

        Ok(space)
    }

    fn descend(depth: usize) -> PdfResult<usize> {
        match depth.checked_sub(1) {
            Some(depth) if depth > 0 => Ok(depth),
            _ => invalid!("color space structure is too complex"),
        }
    }

    fn resolve_impl(
        &self,
        descriptor: Object,
        resolver: &mut dyn Resolve,
        depth: usize,
        in_progress: &mut HashSet<Name>,
    ) -> PdfResult<Arc<ColorSpace>> {
        let depth = Self::descend(depth)?;

        match resolver.resolve(descriptor)? {
            Object::Name(name) => self.resolve_name(&name, resolver, depth, in_progress),
            Object::Array(arr) => self.resolve_array(&arr, resolver, depth, in_progress),
            found => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::Name,
                found,
            }),
        }
    }

    fn resolve_name(
        &self,
        name: &Name,
        resolver: &mut dyn Resolve,
        depth: usize,
        in_progress: &mut HashSet<Name>,
    ) -> PdfResult<Arc<ColorSpace>> {
        let depth = Self::descend(depth)?;

        let family = match name.as_str() {
            "DeviceGray" | "G" => ColorSpaceName::DeviceGray,
            "DeviceRGB" | "RGB" => ColorSpaceName::DeviceRGB,
            "DeviceCMYK" | "CMYK" => ColorSpaceName::DeviceCMYK,
            "Pattern" => return Ok(Arc::new(ColorSpace::Pattern(PatternColorSpace::new(None)))),
            _ => return self.resolve_resource(name, resolver, depth, in_progress),
        };

        self.resolve_device(family, resolver, depth, in_progress)
    }

    /// Device spaces may be replaced by `DefaultGray`, `DefaultRGB` or
    /// `DefaultCMYK` from the resource dictionary
    fn resolve_device(
        &self,
        family: ColorSpaceName,
        resolver: &mut dyn Resolve,
        depth: usize,
        in_progress: &mut HashSet<Name>,
    ) -> PdfResult<Arc<ColorSpace>> {
        let (device, key) = match family {
            ColorSpaceName::DeviceGray => (ColorSpace::device_gray(), "DefaultGray"),
            ColorSpaceName::DeviceRGB => (ColorSpace::device_rgb(), "DefaultRGB"),
            ColorSpaceName::DeviceCMYK => (ColorSpace::device_cmyk(), "DefaultCMYK"),
            _ => invalid!("/{} is not a device color space", family.as_str()),
        };

        let replacement = match self.color_spaces.and_then(|dict| dict.get_object(key)) {
            Some(replacement) => replacement.clone(),
            None => return Ok(device),
        };

        // e.g. `DefaultRGB` is an ICC profile whose alternate is `DeviceRGB`
        let key = Name::new(key);
        if in_progress.contains(&key) {
            return Ok(device);
        }

        in_progress.insert(key.clone());
        let result = self.resolve_impl(replacement, resolver, depth, in_progress);
        in_progress.remove(&key);

        let space = result?;

        if space.component_count() != device.component_count() {
            log::warn!(
                "ignoring {}: it has {} components, /{} has {}",
                key,
                space.component_count(),
                family.as_str(),
                device.component_count()
            );
            return Ok(device);
        }

        Ok(space)
    }

    fn resolve_resource(
        &self,
        name: &Name,
        resolver: &mut dyn Resolve,
        depth: usize,
        in_progress: &mut HashSet<Name>,
    ) -> PdfResult<Arc<ColorSpace>> {
        let descriptor = match self.color_spaces.and_then(|dict| dict.get_object(name.as_str())) {
            Some(descriptor) => descriptor.clone(),
            None if ColorSpaceName::from_str(name.as_str()).is_ok() => {
                invalid!("color space family {} requires parameters", name)
            }
            None => invalid!("unknown color space {}", name),
        };

        if !in_progress.insert(name.clone()) {
            invalid!("color space {} refers to itself", name);
        }

        let result = self.resolve_impl(descriptor, resolver, depth, in_progress);
        in_progress.remove(name);

        result
    }

    fn resolve_array(
        &self,
        arr: &[Object],
        resolver: &mut dyn Resolve,
        depth: usize,
        in_progress: &mut HashSet<Name>,
    ) -> PdfResult<Arc<ColorSpace>> {
        let name = match arr.first() {
            Some(obj) => resolver.assert_name(obj.clone())?,
            None => invalid!("empty color space array"),
        };

        let family = match name.as_str() {
            "I" => Some(ColorSpaceName::Indexed),
            s => ColorSpaceName::from_str(s).ok(),
        };

        let space = match family {
            Some(ColorSpaceName::CalGray) => {
                let dict = Self::parameters(arr, resolver)?;
                ColorSpace::CalGray(CalGrayColorSpace::from_dict(&dict, resolver))
            }
            Some(ColorSpaceName::CalRGB) => {
                let dict = Self::parameters(arr, resolver)?;
                ColorSpace::CalRGB(CalRgbColorSpace::from_dict(&dict, resolver))
            }
            Some(ColorSpaceName::Lab) => {
                let dict = Self::parameters(arr, resolver)?;
                ColorSpace::Lab(LabColorSpace::from_dict(&dict, resolver))
            }
            Some(ColorSpaceName::ICCBased) => self.resolve_icc(arr, resolver, depth, in_progress)?,
            Some(ColorSpaceName::Indexed) => {
                self.resolve_indexed(arr, resolver, depth, in_progress)?
            }
            Some(ColorSpaceName::Separation) => {
                self.resolve_separation(arr, resolver, depth, in_progress)?
            }
            Some(ColorSpaceName::DeviceN) => {
                self.resolve_device_n(arr, resolver, depth, in_progress)?
            }
            Some(ColorSpaceName::Pattern) => {
                let underlying = match arr.get(1) {
                    Some(obj) => Some(self.resolve_component_space(
                        obj,
                        "Pattern",
                        resolver,
                        depth,
                        in_progress,
                    )?),
                    None => None,
                };

                ColorSpace::Pattern(PatternColorSpace::new(underlying))
            }
            // `[/DeviceRGB]` and friends, or a resource name
            Some(
                ColorSpaceName::DeviceGray | ColorSpaceName::DeviceRGB | ColorSpaceName::DeviceCMYK,
            )
            | None => return self.resolve_name(&name, resolver, depth, in_progress),
        };

        Ok(Arc::new(space))
    }

    fn parameters(arr: &[Object], resolver: &mut dyn Resolve) -> PdfResult<Dictionary> {
        match arr.get(1) {
            Some(obj) => resolver
                .assert_dict(obj.clone())
                .context("invalid color space parameters"),
            None => invalid!("color space parameter dictionary is missing"),
        }
    }

    /// Resolves a base or alternate space, which may not be a pattern space
    fn resolve_component_space(
        &self,
        descriptor: &Object,
        parent: &str,
        resolver: &mut dyn Resolve,
        depth: usize,
        in_progress: &mut HashSet<Name>,
    ) -> PdfResult<Arc<ColorSpace>> {
        let space = self.resolve_impl(descriptor.clone(), resolver, depth, in_progress)?;

        if space.is_pattern() {
            invalid!("/{} may not be based on a pattern color space", parent);
        }

        Ok(space)
    }

    fn resolve_icc(
        &self,
        arr: &[Object],
        resolver: &mut dyn Resolve,
        depth: usize,
        in_progress: &mut HashSet<Name>,
    ) -> PdfResult<ColorSpace> {
        let stream = match arr.get(1) {
            Some(obj) => resolver
                .assert_stream(obj.clone())
                .context("ICC profile must be a stream")?,
            None => invalid!("ICC profile stream is missing"),
        };

        let dict = stream.dict();
        let n = dict.get_integer("N", resolver, 0);

        let alternate = match dict.get_object("Alternate") {
            Some(alternate) => alternate.clone(),
            None => match n {
                1 => Object::name("DeviceGray"),
                3 => Object::name("DeviceRGB"),
                4 => Object::name("DeviceCMYK"),
                _ => invalid!("ICC profile with {} components has no /Alternate", n),
            },
        };

        let alternate =
            self.resolve_component_space(&alternate, "ICCBased", resolver, depth, in_progress)?;
        let count = alternate.component_count();

        if count > 4 {
            invalid!("ICC alternate space has {} components", count);
        }

        if usize::try_from(n).map_or(true, |n| n != count) {
            log::warn!("ICC profile declares /N {}, alternate space has {} components", n, count);
        }

        let mut range = [0.0, 1.0].repeat(count);
        dict.read_number_array_into("Range", resolver, &mut range);

        let data = stream
            .decode(resolver)
            .context("unable to decode ICC profile")?
            .into_owned();
        let profile = IccProfile::new(data);

        if let Some(header) = profile.header() {
            if header.component_count().map_or(false, |c| c != count) {
                log::warn!(
                    "ICC profile of {:?} data has {} components",
                    header.colour_space,
                    count
                );
            }
        }

        Ok(ColorSpace::IccBased(IccBasedColorSpace::new(
            alternate, range, profile,
        )))
    }

    fn resolve_indexed(
        &self,
        arr: &[Object],
        resolver: &mut dyn Resolve,
        depth: usize,
        in_progress: &mut HashSet<Name>,
    ) -> PdfResult<ColorSpace> {
        if arr.len() != 4 {
            invalid!("/Indexed requires 4 elements, found {}", arr.len());
        }

        let base = self.resolve_component_space(&arr[1], "Indexed", resolver, depth, in_progress)?;

        if let ColorSpace::Indexed(..) = *base {
            invalid!("/Indexed may not be based on another indexed color space");
        }

        let hival = (resolver.assert_number(arr[2].clone())? as i32).clamp(0, 255) as u8;

        let lookup = match resolver.resolve(arr[3].clone())? {
            Object::String(bytes) => bytes,
            Object::Stream(stream) => stream
                .decode(resolver)
                .context("unable to decode indexed lookup table")?
                .into_owned(),
            found => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::String,
                found,
            }),
        };

        Ok(ColorSpace::Indexed(IndexedColorSpace::new(base, hival, lookup)?))
    }

    fn tint_transform(
        obj: &Object,
        colorants: usize,
        alternate: &ColorSpace,
        resolver: &mut dyn Resolve,
    ) -> PdfResult<Arc<dyn TintTransform>> {
        let function = Function::from_obj(obj.clone(), resolver).context("invalid tint transform")?;

        if function.input_count() != colorants {
            invalid!(
                "tint transform takes {} inputs, but there are {} colorants",
                function.input_count(),
                colorants
            );
        }

        if let Some(outputs) = function.output_count() {
            if outputs != alternate.component_count() {
                log::warn!(
                    "tint transform produces {} outputs, alternate space expects {}",
                    outputs,
                    alternate.component_count()
                );
            }
        }

        Ok(Arc::new(function))
    }

    fn resolve_separation(
        &self,
        arr: &[Object],
        resolver: &mut dyn Resolve,
        depth: usize,
        in_progress: &mut HashSet<Name>,
    ) -> PdfResult<ColorSpace> {
        if arr.len() != 4 {
            invalid!("/Separation requires 4 elements, found {}", arr.len());
        }

        let colorant = resolver.assert_name(arr[1].clone())?;
        let alternate =
            self.resolve_component_space(&arr[2], "Separation", resolver, depth, in_progress)?;
        let tint_transform = Self::tint_transform(&arr[3], 1, &alternate, resolver)?;

        Ok(ColorSpace::Separation(SeparationColorSpace::new(
            colorant,
            alternate,
            tint_transform,
        )))
    }

    fn resolve_device_n(
        &self,
        arr: &[Object],
        resolver: &mut dyn Resolve,
        depth: usize,
        in_progress: &mut HashSet<Name>,
    ) -> PdfResult<ColorSpace> {
        if !(4..=5).contains(&arr.len()) {
            invalid!("/DeviceN requires 4 or 5 elements, found {}", arr.len());
        }

        let names = <Vec<Name>>::from_obj(arr[1].clone(), resolver)?;

        if names.is_empty() {
            invalid!("/DeviceN requires at least one colorant");
        }

        let alternate =
            self.resolve_component_space(&arr[2], "DeviceN", resolver, depth, in_progress)?;
        let tint_transform = Self::tint_transform(&arr[3], names.len(), &alternate, resolver)?;

        let attributes = match arr.get(4) {
            Some(obj) => match resolver.resolve(obj.clone())? {
                Object::Dictionary(dict) => Some(dict),
                Object::Null => None,
                found => anyhow::bail!(ParseError::MismatchedObjectType {
                    expected: ObjectType::Dictionary,
                    found,
                }),
            },
            None => None,
        };

        let mut colorants = names.into_iter().map(Colorant::new).collect::<Vec<_>>();

        let attributes = match attributes {
            Some(attributes) => attributes,
            None => {
                return Ok(ColorSpace::DeviceN(DeviceNColorSpace::new(
                    colorants,
                    alternate,
                    tint_transform,
                )))
            }
        };

        let kind = attributes
            .get::<DeviceNKind>("Subtype", resolver)?
            .unwrap_or(DeviceNKind::DeviceN);

        if let Some(separations) = attributes.get::<Dictionary>("Colorants", resolver)? {
            for colorant in &mut colorants {
                if let Some(descriptor) = separations.get_object(colorant.name.as_str()) {
                    let separation =
                        self.resolve_impl(descriptor.clone(), resolver, depth, in_progress)?;

                    if !matches!(*separation, ColorSpace::Separation(..)) {
                        invalid!(
                            "/Colorants entry for {:?} is a {} space, not a Separation space",
                            colorant.name.as_str(),
                            separation.family().as_str()
                        );
                    }

                    colorant.separation = Some(separation);
                }
            }
        } else if kind == DeviceNKind::NChannel {
            log::debug!("NChannel color space has no /Colorants");
        }

        let mut printing_order = Vec::new();

        if let Some(hints) = attributes.get::<Dictionary>("MixingHints", resolver)? {
            let solidities = hints.get::<Dictionary>("Solidities", resolver)?;
            let dot_gain = hints.get::<Dictionary>("DotGain", resolver)?;

            for colorant in &mut colorants {
                if let Some(solidities) = &solidities {
                    colorant.solidity = Self::colorant_entry(solidities, &colorant.name, resolver)?;
                }

                if let Some(dot_gain) = &dot_gain {
                    colorant.dot_gain = Self::colorant_entry::<Function>(
                        dot_gain,
                        &colorant.name,
                        resolver,
                    )?
                    .map(|f| Arc::new(f) as Arc<dyn TintTransform>);
                }
            }

            printing_order = hints
                .get::<Vec<Name>>("PrintingOrder", resolver)?
                .unwrap_or_default();
        }

        let mut space = DeviceNColorSpace::new(colorants, alternate, tint_transform)
            .with_kind(kind)
            .with_printing_order(printing_order);

        if let Some(process) = attributes.get::<Dictionary>("Process", resolver)? {
            let descriptor = match process.get_object("ColorSpace") {
                Some(descriptor) => descriptor.clone(),
                None => anyhow::bail!(ParseError::MissingRequiredKey { key: "ColorSpace" }),
            };

            let color_space = self.resolve_component_space(
                &descriptor,
                "DeviceN",
                resolver,
                depth,
                in_progress,
            )?;
            let components = process
                .get::<Vec<Name>>("Components", resolver)?
                .unwrap_or_default();

            space = space.with_process(ProcessColorSpace::new(color_space, components));
        }

        Ok(ColorSpace::DeviceN(space))
    }

    /// The entry for a colorant, or the `Default` entry when it has none
    fn colorant_entry<T: FromObj>(
        dict: &Dictionary,
        colorant: &Name,
        resolver: &mut dyn Resolve,
    ) -> PdfResult<Option<T>> {
        match dict.get::<T>(colorant.as_str(), resolver)? {
            Some(entry) => Ok(Some(entry)),
            None => dict.get::<T>("Default", resolver),
        }
    }
}

/// Resolves `descriptor` against the `ColorSpace` resource subdictionary
pub fn resolve(
    descriptor: &Object,
    color_spaces: Option<&Dictionary>,
    resolver: &mut dyn Resolve,
) -> PdfResult<Arc<ColorSpace>> {
    ColorSpaceResolver::new(color_spaces).resolve(descriptor, resolver)
}

/// Color spaces resolved from resource names, shared between threads
///
/// Resolution runs outside the lock. When two threads resolve the same name at
/// once, the first one to finish wins and both get its value
#[derive(Debug, Default)]
pub struct ColorSpaceCache {
    spaces: RwLock<HashMap<Name, Arc<ColorSpace>>>,
}

impl ColorSpaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<ColorSpace>> {
        self.spaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn get_or_resolve(
        &self,
        name: &Name,
        color_spaces: &ColorSpaceResolver<'_>,
        resolver: &mut dyn Resolve,
    ) -> PdfResult<Arc<ColorSpace>> {
        if let Some(space) = self.get(name.as_str()) {
            return Ok(space);
        }

        let space = color_spaces.resolve(&Object::Name(name.clone()), resolver)?;

        let mut spaces = self.spaces.write().unwrap_or_else(PoisonError::into_inner);

        Ok(Arc::clone(spaces.entry(name.clone()).or_insert(space)))
    }

    pub fn len(&self) -> usize {
        self.spaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.spaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use flate2::{write::ZlibEncoder, Compression};

    use crate::{
        color::{icc::test::profile_bytes, Rgb},
        lex::parse_object,
        object_store::ObjectStore,
        resolve::NoResolve,
        stream::Stream,
    };

    use super::*;

    fn obj(src: &str) -> Object {
        parse_object(src.as_bytes()).unwrap()
    }

    fn dict(src: &str) -> Dictionary {
        match obj(src) {
            Object::Dictionary(dict) => dict,
            found => panic!("expected dictionary, found {:?}", found),
        }
    }

    fn resolve_str(descriptor: &str, resources: Option<&Dictionary>) -> PdfResult<Arc<ColorSpace>> {
        resolve(&obj(descriptor), resources, &mut NoResolve)
    }

    fn reason(err: anyhow::Error) -> String {
        match err.downcast_ref::<ParseError>() {
            Some(ParseError::InvalidColorSpace { reason }) => reason.clone(),
            _ => panic!("expected an invalid color space error, found {:?}", err),
        }
    }

    fn icc_stream(entries: &str, data: Vec<u8>) -> Object {
        Object::Stream(Stream::new(dict(entries), data))
    }

    #[test]
    fn device_names_and_abbreviations() {
        for (descriptor, family) in [
            ("/DeviceGray", ColorSpaceName::DeviceGray),
            ("/G", ColorSpaceName::DeviceGray),
            ("/RGB", ColorSpaceName::DeviceRGB),
            ("/CMYK", ColorSpaceName::DeviceCMYK),
            ("[/DeviceRGB]", ColorSpaceName::DeviceRGB),
        ] {
            let space = resolve_str(descriptor, None).unwrap();

            assert_eq!(space.family(), family, "{}", descriptor);
            assert_eq!(space.default_color(), Some(Rgb::BLACK));
        }
    }

    #[test]
    fn device_default_ignores_document() {
        let resources = dict("<< /CS0 /DeviceRGB >>");

        let a = resolve_str("/DeviceCMYK", None).unwrap();
        let b = resolve_str("/DeviceCMYK", Some(&resources)).unwrap();

        assert_eq!(a.default_color(), b.default_color());
    }

    #[test]
    fn unknown_and_parameterless_names() {
        assert!(reason(resolve_str("/Foo", None).unwrap_err()).contains("unknown"));
        assert!(reason(resolve_str("/CalRGB", None).unwrap_err()).contains("requires parameters"));
        assert!(resolve_str("[]", None).is_err());
        assert!(resolve_str("42", None).is_err());
    }

    #[test]
    fn resource_names() {
        let resources = dict("<< /CS0 [/Indexed /DeviceRGB 1 <ff000000ff00>] /CS1 /CS0 >>");

        let space = resolve_str("/CS1", Some(&resources)).unwrap();

        assert_eq!(space.family(), ColorSpaceName::Indexed);
        assert_eq!(
            space.get_color(&[1.0]).unwrap(),
            Some(Rgb::new(0.0, 1.0, 0.0))
        );
    }

    #[test]
    fn indexed_palette() {
        let space = resolve_str("[/I /DeviceRGB 2 <ff00000080ff0000ff>]", None).unwrap();

        let palette = [[255, 0, 0], [0, 128, 255], [0, 0, 255]];

        for (idx, entry) in palette.iter().enumerate() {
            let rgb = space.get_color(&[idx as f32]).unwrap().unwrap();
            assert_eq!(rgb.to_rgb8(), *entry);
        }

        // hival + 1 clips to hival
        assert_eq!(
            space.get_color(&[3.0]).unwrap(),
            space.get_color(&[2.0]).unwrap()
        );
    }

    #[test]
    fn indexed_errors() {
        // 5 bytes, expected 6
        assert!(resolve_str("[/Indexed /DeviceRGB 1 <ff00000000>]", None).is_err());
        assert!(resolve_str("[/Indexed /DeviceRGB 1]", None).is_err());
        assert!(resolve_str("[/Indexed /Pattern 0 <00>]", None).is_err());
        assert!(resolve_str("[/Indexed [/Indexed /DeviceGray 0 <00>] 0 <00>]", None).is_err());
    }

    #[test]
    fn indexed_hival_is_clipped() {
        let mut table = String::from("<");
        for _ in 0..256 {
            table.push_str("80");
        }
        table.push('>');

        let space =
            resolve_str(&format!("[/Indexed /DeviceGray 1000 {}]", table), None).unwrap();

        match &*space {
            ColorSpace::Indexed(indexed) => assert_eq!(indexed.hival(), 255),
            space => panic!("{:?}", space),
        }
    }

    #[test]
    fn flate_lookup_stream() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&[0, 0, 0, 255, 255, 255]).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut doc = ObjectStore::new();
        doc.insert(
            crate::objects::Reference::new(5, 0),
            Object::Stream(Stream::new(dict("<< /Filter /FlateDecode >>"), compressed)),
        );

        let space = resolve(&obj("[/Indexed /DeviceRGB 1 5 0 R]"), None, &mut doc).unwrap();

        assert_eq!(space.get_color(&[0.0]).unwrap(), Some(Rgb::BLACK));
        assert_eq!(space.get_color(&[1.0]).unwrap(), Some(Rgb::WHITE));
    }

    #[test]
    fn self_reference_is_rejected() {
        let resources = dict("<< /X [/X] >>");

        assert!(resolve_str("/X", Some(&resources)).is_err());

        let resources = dict("<< /A /B /B /A >>");
        assert!(resolve_str("/A", Some(&resources)).is_err());
    }

    #[test]
    fn long_alias_chains_are_too_complex() {
        let mut resources = Dictionary::empty();
        for i in 0..20 {
            resources.insert(&format!("A{}", i), Object::name(&format!("A{}", i + 1)));
        }
        resources.insert("A20", Object::name("DeviceRGB"));

        let err = resolve_str("/A0", Some(&resources)).unwrap_err();
        assert!(reason(err).contains("too complex"));

        // a short chain stays within the limit
        assert!(resolve_str("/A18", Some(&resources)).is_ok());
    }

    #[test]
    fn max_depth_is_configurable() {
        let resources = dict("<< /A /B /B /DeviceRGB >>");
        let descriptor = Object::name("A");

        let shallow = ColorSpaceResolver::new(Some(&resources)).with_max_depth(3);
        assert!(shallow.resolve(&descriptor, &mut NoResolve).is_err());

        let deep = ColorSpaceResolver::new(Some(&resources));
        assert!(deep.resolve(&descriptor, &mut NoResolve).is_ok());
    }

    #[test]
    fn default_override() {
        let resources = dict("<< /DefaultGray [/CalGray << /Gamma 2.2 >>] >>");

        let space = resolve_str("/DeviceGray", Some(&resources)).unwrap();
        assert_eq!(space.family(), ColorSpaceName::CalGray);

        let space = resolve_str("/G", Some(&resources)).unwrap();
        assert_eq!(space.family(), ColorSpaceName::CalGray);

        // other device families are unaffected
        let space = resolve_str("/DeviceRGB", Some(&resources)).unwrap();
        assert_eq!(space.family(), ColorSpaceName::DeviceRGB);
    }

    #[test]
    fn default_override_with_wrong_component_count_is_ignored() {
        let resources = dict("<< /DefaultGray /DeviceRGB >>");

        let space = resolve_str("/DeviceGray", Some(&resources)).unwrap();
        assert_eq!(space.family(), ColorSpaceName::DeviceGray);
    }

    #[test]
    fn default_rgb_icc_does_not_loop() {
        let mut resources = Dictionary::empty();
        resources.insert(
            "DefaultRGB",
            Object::Array(vec![
                Object::name("ICCBased"),
                icc_stream("<< /N 3 >>", profile_bytes(b"RGB ")),
            ]),
        );

        let space = resolve_str("/DeviceRGB", Some(&resources)).unwrap();

        match &*space {
            ColorSpace::IccBased(icc) => {
                assert_eq!(icc.alternate().family(), ColorSpaceName::DeviceRGB)
            }
            space => panic!("{:?}", space),
        }
    }

    #[test]
    fn icc_alternate_from_component_count() {
        for (n, family) in [
            (1, ColorSpaceName::DeviceGray),
            (3, ColorSpaceName::DeviceRGB),
            (4, ColorSpaceName::DeviceCMYK),
        ] {
            let descriptor = Object::Array(vec![
                Object::name("ICCBased"),
                icc_stream(&format!("<< /N {} >>", n), Vec::new()),
            ]);

            let space = resolve(&descriptor, None, &mut NoResolve).unwrap();

            assert_eq!(space.component_count(), n);
            match &*space {
                ColorSpace::IccBased(icc) => assert_eq!(icc.alternate().family(), family),
                space => panic!("{:?}", space),
            }
        }

        let descriptor = Object::Array(vec![
            Object::name("ICCBased"),
            icc_stream("<< /N 2 >>", Vec::new()),
        ]);
        assert!(resolve(&descriptor, None, &mut NoResolve).is_err());
    }

    #[test]
    fn icc_explicit_alternate_and_range() {
        let descriptor = Object::Array(vec![
            Object::name("ICCBased"),
            icc_stream(
                "<< /N 3 /Alternate /DeviceRGB /Range [0 0.5 0 1 0 1] >>",
                profile_bytes(b"RGB "),
            ),
        ]);

        let space = resolve(&descriptor, None, &mut NoResolve).unwrap();

        assert_eq!(
            space.get_color(&[1.0, 1.0, 1.0]).unwrap(),
            Some(Rgb::new(0.5, 1.0, 1.0))
        );

        match &*space {
            ColorSpace::IccBased(icc) => {
                assert!(icc.profile().header().is_some());
                assert_eq!(icc.range(), &[0.0, 0.5, 0.0, 1.0, 0.0, 1.0]);
            }
            space => panic!("{:?}", space),
        }
    }

    #[test]
    fn icc_transform_is_consulted() {
        struct AlwaysRed;

        impl crate::color::IccTransform for AlwaysRed {
            fn transform(&self, _color: &[f32], profile: &IccProfile) -> Option<Rgb> {
                profile.header().map(|_| Rgb::new(1.0, 0.0, 0.0))
            }
        }

        let descriptor = Object::Array(vec![
            Object::name("ICCBased"),
            icc_stream("<< /N 1 >>", profile_bytes(b"GRAY")),
        ]);
        let space = resolve(&descriptor, None, &mut NoResolve).unwrap();

        assert_eq!(
            space.get_color_with_cms(&[0.5], Some(&AlwaysRed)).unwrap(),
            Some(Rgb::new(1.0, 0.0, 0.0))
        );
        assert_eq!(space.get_color(&[0.5]).unwrap(), Some(Rgb::gray(0.5)));
    }

    #[test]
    fn cie_families_with_defaults() {
        let gray = resolve_str("[/CalGray << >>]", None).unwrap();
        assert!(gray.get_color(&[1.0]).unwrap().unwrap().is_close(Rgb::WHITE, 1e-4));

        let rgb = resolve_str(
            "[/CalRGB << /WhitePoint [0.9505 1 1.089] /Matrix [0.4124 0.2126 0.0193 0.3576 0.7152 0.1192 0.1805 0.0722 0.9505] >>]",
            None,
        )
        .unwrap();
        assert!(rgb
            .get_color(&[1.0, 1.0, 1.0])
            .unwrap()
            .unwrap()
            .is_close(Rgb::WHITE, 1e-4));

        let lab = resolve_str("[/Lab << /WhitePoint [0.9505 1 1.089] >>]", None).unwrap();
        assert!(lab
            .get_color(&[100.0, 0.0, 0.0])
            .unwrap()
            .unwrap()
            .is_close(Rgb::WHITE, 1e-4));

        assert!(resolve_str("[/Lab]", None).is_err());
    }

    #[test]
    fn separation() {
        let space = resolve_str(
            "[/Separation /Spot /DeviceCMYK << /FunctionType 2 /Domain [0 1] /C0 [0 0 0 0] /C1 [0 0 0 1] /N 1 >>]",
            None,
        )
        .unwrap();

        assert_eq!(space.component_count(), 1);
        assert_eq!(space.get_color(&[0.0]).unwrap(), Some(Rgb::WHITE));
        assert_eq!(space.get_color(&[1.0]).unwrap(), Some(Rgb::BLACK));
    }

    #[test]
    fn separation_errors() {
        let tint = "<< /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 1 >>";

        assert!(resolve_str(&format!("[/Separation (Spot) /DeviceGray {}]", tint), None).is_err());
        assert!(resolve_str(&format!("[/Separation /Spot /Pattern {}]", tint), None).is_err());
        assert!(resolve_str("[/Separation /Spot /DeviceGray]", None).is_err());
        assert!(resolve_str("[/Separation /Spot /DeviceGray << /FunctionType 7 /Domain [0 1] >>]", None).is_err());
    }

    #[test]
    fn failing_tint_transform_is_undefined() {
        let space = resolve_str(
            "[/Separation /Spot /DeviceRGB << /FunctionType 4 /Domain [0 1] /Range [0 1 0 1 0 1] >> stream\n{ pop pop }\nendstream]",
            None,
        )
        .unwrap();

        assert_eq!(space.get_color(&[0.5]).unwrap(), None);
    }

    #[test]
    fn device_n() {
        let space = resolve_str(
            "[/DeviceN [/Orange /Green] /DeviceRGB << /FunctionType 4 /Domain [0 1 0 1] /Range [0 1 0 1 0 1] >> stream\n{ 0 }\nendstream]",
            None,
        )
        .unwrap();

        assert_eq!(space.component_count(), 2);
        assert_eq!(space.family(), ColorSpaceName::DeviceN);

        assert!(resolve_str(
            "[/DeviceN [/A /B /C] /DeviceRGB << /FunctionType 4 /Domain [0 1 0 1] /Range [0 1 0 1 0 1] >> stream\n{ 0 }\nendstream]",
            None,
        )
        .is_err());
    }

    #[test]
    fn device_n_attributes() {
        let mut resources = Dictionary::empty();
        resources.insert(
            "CS0",
            obj("[/DeviceN [/Cyan /Spot] /DeviceCMYK
                << /FunctionType 4 /Domain [0 1 0 1] /Range [0 1 0 1 0 1 0 1] >> stream\n{ 0 0 }\nendstream
                << /Subtype /NChannel
                   /Colorants << /Spot [/Separation /Spot /DeviceGray << /FunctionType 2 /Domain [0 1] /N 1 >>] >>
                   /Process << /ColorSpace /DeviceCMYK /Components [/Cyan /Magenta /Yellow /Black] >>
                   /MixingHints << /Solidities << /Spot 1 /Default 0.25 >> /PrintingOrder [/Cyan /Spot] >> >>]"),
        );

        let space = resolve_str("/CS0", Some(&resources)).unwrap();

        let device_n = match &*space {
            ColorSpace::DeviceN(device_n) => device_n,
            space => panic!("{:?}", space),
        };

        assert_eq!(device_n.kind(), DeviceNKind::NChannel);
        assert_eq!(device_n.colorant("Spot").unwrap().solidity(), Some(1.0));
        assert_eq!(device_n.colorant("Cyan").unwrap().solidity(), Some(0.25));
        assert!(device_n.colorant("Spot").unwrap().separation().is_some());
        assert!(device_n.colorant("Cyan").unwrap().separation().is_none());
        assert_eq!(device_n.process().unwrap().components().len(), 4);
        assert_eq!(device_n.printing_order().len(), 2);
    }

    fn device_n_with_attributes(attributes: &str) -> PdfResult<Arc<ColorSpace>> {
        resolve_str(
            &format!(
                "[/DeviceN [/Cyan /Spot] /DeviceCMYK
                    << /FunctionType 4 /Domain [0 1 0 1] /Range [0 1 0 1 0 1 0 1] >> stream\n{{ 0 0 }}\nendstream
                    {}]",
                attributes
            ),
            None,
        )
    }

    #[test]
    fn device_n_dot_gain() {
        let space = device_n_with_attributes(
            "<< /MixingHints << /DotGain <<
                /Spot << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 2 >>
                /Default << /FunctionType 2 /Domain [0 1] /C0 [0] /C1 [1] /N 1 >>
            >> >> >>",
        )
        .unwrap();

        let device_n = match &*space {
            ColorSpace::DeviceN(device_n) => device_n,
            space => panic!("{:?}", space),
        };

        let spot = device_n.colorant("Spot").unwrap().dot_gain().unwrap();
        let cyan = device_n.colorant("Cyan").unwrap().dot_gain().unwrap();

        assert!((spot.apply(&[0.5]).unwrap()[0] - 0.25).abs() < 1e-4);
        assert!((cyan.apply(&[0.5]).unwrap()[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn device_n_process_requires_color_space() {
        let err = device_n_with_attributes(
            "<< /Subtype /NChannel /Process << /Components [/Cyan /Magenta /Yellow /Black] >> >>",
        )
        .unwrap_err();

        assert!(reason(err).contains("ColorSpace"));
    }

    #[test]
    fn device_n_colorants_must_be_separations() {
        let err = device_n_with_attributes(
            "<< /Subtype /NChannel /Colorants << /Spot /DeviceGray >> >>",
        )
        .unwrap_err();

        assert!(reason(err).contains("Separation"));

        let space = device_n_with_attributes(
            "<< /Colorants << /Spot [/Separation /Spot /DeviceGray << /FunctionType 2 /Domain [0 1] /N 1 >>] >> >>",
        )
        .unwrap();

        assert_eq!(space.component_count(), 2);
    }

    #[test]
    fn self_referential_tint_transform() {
        let mut doc = ObjectStore::from_source(
            b"1 0 obj << /FunctionType 3 /Domain [0 1] /Functions [1 0 R] /Bounds [] /Encode [0 1] >> endobj",
        )
        .unwrap();

        let err = resolve(&obj("[/Separation /Spot /DeviceGray 1 0 R]"), None, &mut doc).unwrap_err();

        assert!(reason(err).contains("tint transform"));
    }

    #[test]
    fn oversized_sampled_tint_transform() {
        let err = resolve_str(
            "[/DeviceN [/A /B /C] /DeviceGray
                << /FunctionType 0 /Domain [0 1 0 1 0 1] /Range [0 1] /BitsPerSample 8
                   /Size [2147483647 2147483647 2147483647] >> stream\n0123456789\nendstream]",
            None,
        )
        .unwrap_err();

        assert!(reason(err).contains("tint transform"));
    }

    #[test]
    fn pattern_spaces() {
        let space = resolve_str("/Pattern", None).unwrap();
        assert_eq!(space.component_count(), 0);
        assert!(space.as_pattern().unwrap().underlying().is_none());

        let space = resolve_str("[/Pattern /DeviceRGB]", None).unwrap();
        assert_eq!(space.component_count(), 3);

        assert!(resolve_str("[/Pattern /Pattern]", None).is_err());
    }

    #[test]
    fn errors_are_invalid_color_space() {
        let err = resolve_str("[/Indexed /DeviceRGB (x) <00>]", None).unwrap_err();
        assert!(!reason(err).is_empty());

        let err = resolve_str("[/ICCBased 5]", None).unwrap_err();
        assert!(!reason(err).is_empty());
    }

    #[test]
    fn resolution_is_deterministic() {
        let descriptor = "[/Lab << /WhitePoint [0.9642 1 0.8249] /Range [-128 127 -128 127] >>]";

        let a = resolve_str(descriptor, None).unwrap();
        let b = resolve_str(descriptor, None).unwrap();

        for color in [[50.0, 20.0, -30.0], [0.0, 0.0, 0.0], [100.0, 127.0, 127.0]] {
            assert_eq!(a.get_color(&color).unwrap(), b.get_color(&color).unwrap());
        }
    }

    #[test]
    fn fill_rgb_buffer_matches_get_color() {
        let space = resolve_str("[/Indexed /DeviceRGB 1 <ff8000 0080ff>]", None).unwrap();

        let indices = [0.0, 1.0, 1.0, 0.0];
        let mut out = [0; 12];
        space.fill_rgb_buffer(&indices, &mut out).unwrap();

        for (pixel, &index) in out.chunks_exact(3).zip(&indices) {
            assert_eq!(pixel, space.get_color(&[index]).unwrap().unwrap().to_rgb8());
        }
    }

    #[test]
    fn references_are_followed() {
        let mut doc = ObjectStore::from_source(
            b"1 0 obj << /CS0 2 0 R >> endobj
              2 0 obj [/Indexed 3 0 R 0 <ff>] endobj
              3 0 obj /DeviceGray endobj",
        )
        .unwrap();

        let resources = match doc.resolve(Object::Reference(crate::objects::Reference::new(1, 0))) {
            Ok(Object::Dictionary(dict)) => dict,
            found => panic!("{:?}", found),
        };

        let space = resolve(&Object::name("CS0"), Some(&resources), &mut doc).unwrap();
        assert_eq!(space.get_color(&[0.0]).unwrap(), Some(Rgb::WHITE));
    }

    #[test]
    fn cache_is_shared_between_threads() {
        let doc = ObjectStore::from_source(b"1 0 obj [/Indexed /DeviceGray 0 <80>] endobj").unwrap();
        let resources = dict("<< /CS0 1 0 R >>");
        let cache = ColorSpaceCache::new();

        let spaces = std::thread::scope(|scope| {
            let handles = (0..4)
                .map(|_| {
                    let mut doc = doc.clone();
                    let resources = &resources;
                    let cache = &cache;

                    scope.spawn(move || {
                        let resolver = ColorSpaceResolver::new(Some(resources));
                        cache
                            .get_or_resolve(&Name::new("CS0"), &resolver, &mut doc)
                            .unwrap()
                    })
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect::<Vec<_>>()
        });

        assert_eq!(cache.len(), 1);

        let cached = cache.get("CS0").unwrap();
        for space in &spaces {
            assert!(Arc::ptr_eq(space, &cached));
        }

        cache.clear();
        assert!(cache.is_empty());
    }
}
