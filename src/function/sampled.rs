use pdf_macro::pdf_enum;

use crate::{error::PdfResult, stream::Stream, Resolve};

use super::{clip, interpolate};

/// Sample tables with more input dimensions than this are an error. It
/// matches the largest number of colorants a DeviceN space may have
const MAX_INPUTS: usize = 32;

/// Type 0 functions use a sequence of sample values (contained in a stream) to provide an
/// approximation for functions whose domains and ranges are bounded. The samples are organized
/// as an m-dimensional table in which each entry has n components.
#[derive(Debug, Clone)]
pub struct SampledFunction {
    /// An array of m positive integers that shall specify the number of samples in each
    /// input dimension of the sample table
    size: Vec<usize>,

    /// The function's `/Domain`, needed to map inputs through `/Encode`
    domain: Vec<f32>,

    /// An array of 2 * m numbers specifying the linear mapping of input values into the domain
    /// of the function's sample table.
    ///
    /// Default value: [0 (Size0 - 1) 0 (Size1 - 1) ...]
    encode: Vec<f32>,

    /// An array of 2 * n numbers specifying the linear mapping of sample values into the range
    /// appropriate for the function's output values
    ///
    /// Default value: same as the value of Range
    decode: Vec<f32>,

    /// Largest value a single sample can hold, `2^BitsPerSample - 1`
    max_sample: f32,

    /// Unpacked sample table, `output_count` values per entry, the first
    /// dimension varying fastest
    samples: Vec<f32>,
}

/// The order of interpolation between samples. Valid values shall be 1 and 3, specifying
/// linear and cubic spline interpolation, respectively
#[pdf_enum(Integer)]
enum InterpolationOrder {
    Linear = 1,
    Cubic = 3,
}

#[pdf_enum(Integer)]
enum BitsPerSample {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
    Twelve = 12,
    Sixteen = 16,
    TwentyFour = 24,
    ThirtyTwo = 32,
}

/// Reads big-endian, MSB-first samples of a fixed bit width
struct SampleReader<'a> {
    buffer: &'a [u8],
    bit_pos: usize,
}

impl<'a> SampleReader<'a> {
    fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, bit_pos: 0 }
    }

    fn next_sample(&mut self, bits: usize) -> Option<u32> {
        let mut value = 0_u32;

        for _ in 0..bits {
            let byte = *self.buffer.get(self.bit_pos / 8)?;
            let bit = (byte >> (7 - self.bit_pos % 8)) & 1;

            value = value << 1 | u32::from(bit);
            self.bit_pos += 1;
        }

        Some(value)
    }
}

impl SampledFunction {
    pub fn from_stream(
        stream: Stream,
        domain: &[f32],
        range: &[f32],
        resolver: &mut dyn Resolve,
    ) -> PdfResult<Self> {
        let dict = stream.dict();

        let size = dict
            .expect::<Vec<u32>>("Size", resolver)?
            .into_iter()
            .map(|n| n as usize)
            .collect::<Vec<usize>>();

        if size.len() != domain.len() / 2 {
            anyhow::bail!(
                "/Size has {} entries, but the function has {} inputs",
                size.len(),
                domain.len() / 2
            );
        }

        if size.len() > MAX_INPUTS {
            anyhow::bail!(
                "sampled function has {} inputs, at most {} are supported",
                size.len(),
                MAX_INPUTS
            );
        }

        if size.iter().any(|&n| n == 0) {
            anyhow::bail!("/Size entries must be positive");
        }

        let bits_per_sample = dict.expect::<BitsPerSample>("BitsPerSample", resolver)? as usize;

        let order = dict
            .get::<InterpolationOrder>("Order", resolver)?
            .unwrap_or(InterpolationOrder::Linear);

        if order == InterpolationOrder::Cubic {
            log::debug!("cubic spline sampled functions are interpolated linearly");
        }

        let encode = dict.get::<Vec<f32>>("Encode", resolver)?.unwrap_or_else(|| {
            size.iter()
                .flat_map(|&n| [0.0, n as f32 - 1.0])
                .collect()
        });

        if encode.len() != size.len() * 2 {
            anyhow::bail!("/Encode must hold 2 values per input");
        }

        let decode = dict
            .get::<Vec<f32>>("Decode", resolver)?
            .unwrap_or_else(|| range.to_vec());

        if decode.len() != range.len() {
            anyhow::bail!("/Decode must hold 2 values per output");
        }

        let output_count = range.len() / 2;
        let sample_count = match size
            .iter()
            .try_fold(output_count, |count, &n| count.checked_mul(n))
        {
            Some(count) => count,
            None => anyhow::bail!("sampled function table of {:?} entries is too large", size),
        };

        let data = stream.decode(resolver)?;

        if sample_count
            .checked_mul(bits_per_sample)
            .map_or(true, |bits| bits > data.len().saturating_mul(8))
        {
            anyhow::bail!(
                "sampled function stream holds fewer than the {} samples required",
                sample_count
            );
        }

        let mut reader = SampleReader::new(&data);

        let samples = (0..sample_count)
            .map(|_| reader.next_sample(bits_per_sample).map(|s| s as f32))
            .collect::<Option<Vec<f32>>>();

        let samples = match samples {
            Some(samples) => samples,
            None => anyhow::bail!(
                "sampled function stream holds fewer than the {} samples required",
                sample_count
            ),
        };

        Ok(Self {
            size,
            domain: domain.to_vec(),
            encode,
            decode,
            max_sample: ((1_u64 << bits_per_sample) - 1) as f32,
            samples,
        })
    }

    fn output_count(&self) -> usize {
        self.decode.len() / 2
    }

    /// Multilinear interpolation between the samples surrounding the encoded
    /// input
    pub fn evaluate(&self, input: &[f32]) -> Vec<f32> {
        let n = self.output_count();

        // offset of the sample below the input in every dimension
        let mut base = 0;

        // per dimension lying between two samples: distance to the next sample
        // along that dimension, weight of that sample
        let mut steps = Vec::new();
        let mut stride = 1;

        for (i, &x) in input.iter().enumerate() {
            let size = self.size[i];
            let e = interpolate(
                x,
                self.domain[2 * i],
                self.domain[2 * i + 1],
                self.encode[2 * i],
                self.encode[2 * i + 1],
            );
            let e = clip(e, 0.0, size as f32 - 1.0);

            let low = (e.floor() as usize).min(size - 1);
            let frac = e - low as f32;

            base += low * stride;

            if low + 1 < size && frac > 0.0 {
                steps.push((stride, frac));
            }

            stride *= size;
        }

        let mut output = vec![0.0; n];

        // each corner of the surrounding cell, one bit per entry of `steps`
        for corner in 0..(1_usize << steps.len()) {
            let mut weight = 1.0;
            let mut offset = base;

            for (i, &(step, frac)) in steps.iter().enumerate() {
                if corner >> i & 1 == 1 {
                    weight *= frac;
                    offset += step;
                } else {
                    weight *= 1.0 - frac;
                }
            }

            for (j, out) in output.iter_mut().enumerate() {
                *out += weight * self.samples[offset * n + j];
            }
        }

        output
            .into_iter()
            .enumerate()
            .map(|(j, sample)| {
                interpolate(
                    sample,
                    0.0,
                    self.max_sample,
                    self.decode[2 * j],
                    self.decode[2 * j + 1],
                )
            })
            .collect()
    }
}
