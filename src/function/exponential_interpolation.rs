use crate::{error::PdfResult, objects::Dictionary, Resolve};

/// Type 2 functions (PDF 1.3) include a set of parameters that define an exponential
/// interpolation of one input value and n output values
#[derive(Debug, Clone)]
pub struct ExponentialInterpolationFunction {
    /// An array of n numbers that shall define the function result when x = 0.0.
    ///
    /// Default value: [0.0]
    c0: Vec<f32>,

    /// An array of n numbers that shall define the function result when x = 1.0.
    ///
    /// Default value: [1.0]
    c1: Vec<f32>,

    /// The interpolation exponent. Each input value x shall return n values, given by
    /// yj = C0j + xN * (C1j - C0j), for 0 <= j < n
    n: f32,
}

impl ExponentialInterpolationFunction {
    pub fn from_dict(dict: &Dictionary, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        let c0 = dict
            .get::<Vec<f32>>("C0", resolver)?
            .unwrap_or_else(|| vec![0.0]);

        let c1 = dict
            .get::<Vec<f32>>("C1", resolver)?
            .unwrap_or_else(|| vec![1.0]);

        if c0.len() != c1.len() {
            anyhow::bail!(
                "/C0 and /C1 differ in length ({} and {})",
                c0.len(),
                c1.len()
            );
        }

        let n = dict.expect::<f32>("N", resolver)?;

        Ok(Self { c0, c1, n })
    }

    pub fn output_count(&self) -> usize {
        self.c0.len()
    }

    pub fn evaluate(&self, x: f32) -> Vec<f32> {
        let x_n = x.powf(self.n);

        self.c0
            .iter()
            .zip(&self.c1)
            .map(|(c0, c1)| c0 + x_n * (c1 - c0))
            .collect()
    }
}
