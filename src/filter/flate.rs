use std::io::Read;

use flate2::read::ZlibDecoder;
use pdf_macro::pdf_enum;

use crate::{error::PdfResult, objects::Dictionary, resolve::Resolve};

/// <https://www.adobe.com/content/dam/acom/en/devnet/postscript/pdfs/TN5603.Filters.pdf>
#[derive(Debug, Clone, Copy)]
pub struct FlateDecoderParams {
    /// The default value is 1 (Predictor::Unused)
    predictor: Predictor,

    /// Specifies the number of samples in the sampled row.
    ///
    /// The value of this key only has an effect on the filter if
    /// the value of `predictor` is greater than 1.
    ///
    /// The default value is 1
    columns: u32,

    /// Specifies the number of interleaved color components in a sample.
    ///
    /// The default value is 1
    colors: u32,

    /// The number of bits used to represent each component.
    ///
    /// The possible values are 1, 2, 4, 8, and 16
    ///
    /// The default value is 8
    bits_per_component: BitsPerComponent,
}

impl Default for FlateDecoderParams {
    fn default() -> Self {
        Self {
            predictor: Predictor::Unused,
            columns: 1,
            colors: 1,
            bits_per_component: BitsPerComponent::Eight,
        }
    }
}

impl FlateDecoderParams {
    pub fn from_dict(dict: &Dictionary, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        let default = Self::default();

        Ok(Self {
            predictor: dict
                .get("Predictor", resolver)?
                .unwrap_or(default.predictor),
            columns: dict.get("Columns", resolver)?.unwrap_or(default.columns),
            colors: dict.get("Colors", resolver)?.unwrap_or(default.colors),
            bits_per_component: dict
                .get("BitsPerComponent", resolver)?
                .unwrap_or(default.bits_per_component),
        })
    }

    const fn bits_per_pixel(&self) -> u32 {
        self.colors * self.bits_per_component as u32
    }

    /// Sub-byte pixels are compared with the byte to their left
    pub const fn bytes_per_pixel(&self) -> usize {
        let bytes = self.bits_per_pixel().div_ceil(8) as usize;

        if bytes == 0 {
            1
        } else {
            bytes
        }
    }

    pub const fn bytes_per_row(&self) -> usize {
        ((self.bits_per_pixel() * self.columns).div_ceil(8)) as usize
    }
}

#[derive(Debug)]
pub struct FlateDecoder {
    params: FlateDecoderParams,
    buffer: Vec<u8>,
}

#[pdf_enum(Integer)]
enum Predictor {
    /// No filter is applied *and* no byte precedes each row
    Unused = 1,

    /// TIFF predictor 2. Not supported
    Tiff = 2,

    /// No filter is applied
    None = 10,

    /// The pixel is subtracted by the pixel to the left of it
    Sub = 11,

    /// The pixel is subtracted by the pixel above it
    Up = 12,

    /// The pixel is subtracted by the average of the pixel to the left and above
    Average = 13,

    /// The pixel is subtracted by the pixel that comes out of a prediction algorithm
    Paeth = 14,

    /// A hybrid of all 4, chosen per row
    Optimum = 15,
}

#[pdf_enum(Integer)]
pub enum BitsPerComponent {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
    Sixteen = 16,
}

/// The PNG filter type stored as the first byte of every row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowFilter {
    None,
    Sub,
    Up,
    Average,
    Paeth,
}

impl RowFilter {
    fn from_byte(b: u8) -> PdfResult<Self> {
        Ok(match b {
            0 => Self::None,
            1 => Self::Sub,
            2 => Self::Up,
            3 => Self::Average,
            4 => Self::Paeth,
            _ => anyhow::bail!("invalid PNG row filter type {}", b),
        })
    }
}

impl FlateDecoder {
    pub fn new(buffer: &[u8], params: FlateDecoderParams) -> PdfResult<Self> {
        let mut decoder = ZlibDecoder::new(buffer);
        let mut buffer = Vec::new();
        decoder.read_to_end(&mut buffer)?;

        Ok(Self { buffer, params })
    }

    pub fn decode(self) -> PdfResult<Vec<u8>> {
        match self.params.predictor {
            Predictor::Unused => Ok(self.buffer),
            Predictor::Tiff => anyhow::bail!("TIFF predictors are not supported"),
            // For PNG predictors, the row filter byte decides what is done
            // with each row, regardless of which PNG predictor was declared
            Predictor::None
            | Predictor::Sub
            | Predictor::Up
            | Predictor::Average
            | Predictor::Paeth
            | Predictor::Optimum => self.decode_png(),
        }
    }

    fn decode_png(self) -> PdfResult<Vec<u8>> {
        let bytes_per_row = self.params.bytes_per_row();
        let bpp = self.params.bytes_per_pixel();

        let mut out = Vec::with_capacity(self.buffer.len());
        let mut row_above = vec![0; bytes_per_row];

        // a truncated final row is decoded as far as it goes
        for chunk in self.buffer.chunks(bytes_per_row + 1) {
            let (&filter, data) = match chunk.split_first() {
                Some(split) => split,
                None => break,
            };

            let mut this_row = data.to_vec();
            let above = &row_above[..this_row.len()];

            match RowFilter::from_byte(filter)? {
                RowFilter::None => {}
                RowFilter::Sub => Self::decode_sub(&mut this_row, bpp),
                RowFilter::Up => Self::decode_up(&mut this_row, above),
                RowFilter::Average => Self::decode_average(&mut this_row, above, bpp),
                RowFilter::Paeth => Self::decode_paeth(&mut this_row, above, bpp),
            }

            out.extend_from_slice(&this_row);
            row_above[..this_row.len()].copy_from_slice(&this_row);
        }

        Ok(out)
    }

    fn decode_sub(this_row: &mut [u8], bpp: usize) {
        // the first pixel is unchanged
        for idx in bpp..this_row.len() {
            this_row[idx] = this_row[idx].wrapping_add(this_row[idx - bpp]);
        }
    }

    fn decode_up(this_row: &mut [u8], row_above: &[u8]) {
        for (b, above) in this_row.iter_mut().zip(row_above) {
            *b = b.wrapping_add(*above);
        }
    }

    fn decode_average(this_row: &mut [u8], row_above: &[u8], bpp: usize) {
        for idx in 0..this_row.len() {
            let left = if idx >= bpp { this_row[idx - bpp] } else { 0 };
            let avg = (u16::from(left) + u16::from(row_above[idx])) / 2;

            this_row[idx] = this_row[idx].wrapping_add(avg as u8);
        }
    }

    fn decode_paeth(this_row: &mut [u8], row_above: &[u8], bpp: usize) {
        for idx in 0..this_row.len() {
            let (left, above_left) = if idx >= bpp {
                (this_row[idx - bpp], row_above[idx - bpp])
            } else {
                (0, 0)
            };

            let p = Self::paeth_predictor(
                i16::from(left),
                i16::from(row_above[idx]),
                i16::from(above_left),
            );

            this_row[idx] = this_row[idx].wrapping_add(p);
        }
    }

    fn paeth_predictor(a: i16, b: i16, c: i16) -> u8 {
        let p = a + b - c;
        let pa = (p - a).abs();
        let pb = (p - b).abs();
        let pc = (p - c).abs();

        // order here for ties is important
        if pa <= pb && pa <= pc {
            a as u8
        } else if pb <= pc {
            b as u8
        } else {
            c as u8
        }
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use flate2::{write::ZlibEncoder, Compression};

    use super::*;
    use crate::{objects::Object, resolve::NoResolve};

    fn compress(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn params(predictor: i32, columns: i32, colors: i32) -> FlateDecoderParams {
        let dict = Dictionary::from_iter([
            ("Predictor".to_owned(), Object::Integer(predictor)),
            ("Columns".to_owned(), Object::Integer(columns)),
            ("Colors".to_owned(), Object::Integer(colors)),
        ]);

        FlateDecoderParams::from_dict(&dict, &mut NoResolve).unwrap()
    }

    #[test]
    fn no_predictor() {
        let data = compress(b"hello world");
        let decoded = FlateDecoder::new(&data, FlateDecoderParams::default())
            .unwrap()
            .decode()
            .unwrap();

        assert_eq!(decoded, b"hello world");
    }

    #[test]
    fn png_up_and_sub_rows() {
        #[rustfmt::skip]
        let rows = [
            1, 10, 5, 1,
            2, 1, 1, 1,
        ];

        let data = compress(&rows);
        let decoded = FlateDecoder::new(&data, params(12, 3, 1))
            .unwrap()
            .decode()
            .unwrap();

        assert_eq!(decoded, [10, 15, 16, 11, 16, 17]);
    }

    #[test]
    fn png_average_and_paeth_rows() {
        #[rustfmt::skip]
        let rows = [
            0, 100, 50,
            3, 10, 10,
            4, 0, 0,
        ];

        let data = compress(&rows);
        let decoded = FlateDecoder::new(&data, params(15, 2, 1))
            .unwrap()
            .decode()
            .unwrap();

        // average: 10 + 100/2 = 60, 10 + (60 + 50)/2 = 65
        // paeth with zero residuals repeats the nearest neighbour
        assert_eq!(decoded, [100, 50, 60, 65, 60, 65]);
    }

    #[test]
    fn invalid_row_filter() {
        let data = compress(&[9, 1, 2]);
        let decoder = FlateDecoder::new(&data, params(10, 2, 1)).unwrap();

        assert!(decoder.decode().is_err());
    }

    #[test]
    fn corrupt_data_is_an_error() {
        assert!(FlateDecoder::new(b"not zlib", FlateDecoderParams::default()).is_err());
    }
}
