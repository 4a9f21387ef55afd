/*!

ICC-based color spaces

The profile data is kept for identity and for an optional colorimetric
provider. Without one, colors are converted through the alternate space.

See https://www.color.org/icc1v42.pdf

*/

use std::{
    fmt::{self, Write},
    sync::Arc,
};

use super::{ColorSpace, Rgb};

/// Converts colors described by an embedded ICC profile
pub trait IccTransform {
    /// `None` means the profile could not be used, and the alternate space
    /// applies
    fn transform(&self, color: &[f32], profile: &IccProfile) -> Option<Rgb>;
}

#[derive(Debug, Clone)]
pub struct IccBasedColorSpace {
    /// The color space used when the profile is not understood. Its number of
    /// components is the number of components of this space
    pub(super) alternate: Arc<ColorSpace>,

    /// `[min0 max0 min1 max1 ...]`, 2 values per component
    pub(super) range: Vec<f32>,

    pub(super) profile: IccProfile,
}

impl IccBasedColorSpace {
    pub fn new(alternate: Arc<ColorSpace>, range: Vec<f32>, profile: IccProfile) -> Self {
        Self {
            alternate,
            range,
            profile,
        }
    }

    pub fn alternate(&self) -> &Arc<ColorSpace> {
        &self.alternate
    }

    pub fn range(&self) -> &[f32] {
        &self.range
    }

    pub fn profile(&self) -> &IccProfile {
        &self.profile
    }

    pub(super) fn clip_to_range(&self, color: &[f32]) -> super::Color {
        color
            .iter()
            .zip(self.range.chunks_exact(2))
            .map(|(&c, bounds)| c.max(bounds[0]).min(bounds[1]))
            .collect()
    }
}

/// Raw ICC profile bytes
#[derive(Clone)]
pub struct IccProfile {
    data: Arc<[u8]>,

    /// md5 digest of `data`. Two profiles with equal checksums are treated as
    /// the same profile
    checksum: [u8; 16],

    header: Option<IccProfileHeader>,
}

impl fmt::Debug for IccProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IccProfile")
            .field("data", &format!("[ {} bytes ]", self.data.len()))
            .field("checksum", &format!("{:x}", md5::Digest(self.checksum)))
            .field("header", &self.header)
            .finish()
    }
}

impl PartialEq for IccProfile {
    fn eq(&self, other: &Self) -> bool {
        self.checksum == other.checksum
    }
}

impl IccProfile {
    pub fn new(data: Vec<u8>) -> Self {
        let checksum = md5::compute(&data).0;
        let header = IccProfileHeader::parse(&data);

        if header.is_none() {
            log::debug!("ICC profile of {} bytes has no valid header", data.len());
        }

        Self {
            data: data.into(),
            checksum,
            header,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn checksum(&self) -> [u8; 16] {
        self.checksum
    }

    pub fn header(&self) -> Option<&IccProfileHeader> {
        self.header.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IccProfileHeader {
    /// The exact size obtained by combining the profile header, the tag table,
    /// and the tagged element data, including the pad bytes for the last
    /// tag
    pub profile_size: u32,

    /// Major, minor and bug fix revision
    pub version: (u8, u8, u8),
    pub profile_device_class: IccSignature,
    pub colour_space: IccSignature,
    pub profile_connection_space: IccSignature,
}

impl IccProfileHeader {
    const LEN: usize = 128;
    const MAGIC: [u8; 4] = *b"acsp";

    fn signature_at(buffer: &[u8], offset: usize) -> Option<IccSignature> {
        buffer
            .get(offset..offset + 4)?
            .try_into()
            .ok()
            .map(IccSignature)
    }

    /// `None` if the buffer is too short or lacks the `acsp` file signature
    pub fn parse(buffer: &[u8]) -> Option<Self> {
        if buffer.len() < Self::LEN || buffer[36..40] != Self::MAGIC {
            return None;
        }

        let profile_size = u32::from_be_bytes(buffer[0..4].try_into().ok()?);

        Some(Self {
            profile_size,
            version: (buffer[8], buffer[9] >> 4, buffer[9] & 0xf),
            profile_device_class: Self::signature_at(buffer, 12)?,
            colour_space: Self::signature_at(buffer, 16)?,
            profile_connection_space: Self::signature_at(buffer, 20)?,
        })
    }

    /// Number of components of the profile's data colour space, for the
    /// spaces that can appear in a PDF
    pub fn component_count(&self) -> Option<usize> {
        Some(match &self.colour_space.0 {
            b"GRAY" => 1,
            b"RGB " | b"Lab " | b"XYZ " | b"YCbr" | b"Luv " | b"Yxy " | b"HSV " | b"HLS "
            | b"CMY " => 3,
            b"CMYK" => 4,
            _ => return None,
        })
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct IccSignature(pub [u8; 4]);

impl fmt::Debug for IccSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for &b in &self.0 {
            f.write_char(b as char)?;
        }
        f.write_char('"')
    }
}
