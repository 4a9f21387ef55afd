use crate::{
    error::PdfResult,
    objects::{Dictionary, Object},
    Resolve,
};

use super::{interpolate, Function};

/// Type 3 functions (PDF 1.3) define a stitching of the subdomains of several 1-input functions to
/// produce a single new 1-input function. Since the resulting stitching function is a 1-input function,
/// the domain is given by a twoelement array, [Domain0 Domain1].
#[derive(Debug, Clone)]
pub struct StitchingFunction {
    /// An array of k 1-input functions that shall make up the stitching function. The output
    /// dimensionality of all functions shall be the same, and compatible with the value of Range if Range
    /// is present
    functions: Vec<Function>,

    /// An array of k - 1 numbers that, in combination with Domain, shall define the intervals to which
    /// each function from the Functions array shall apply. Bounds elements shall be in order of
    /// increasing value, and each value shall be within the domain defined by Domain
    bounds: Vec<f32>,

    /// An array of 2 * k numbers that, taken in pairs, shall map each subset of the domain defined by
    /// Domain and the Bounds array to the domain of the corresponding function
    encode: Vec<f32>,

    domain: [f32; 2],
}

impl StitchingFunction {
    /// Component functions are built with the remaining nesting `depth`
    pub fn from_dict(
        dict: &Dictionary,
        domain: &[f32],
        resolver: &mut dyn Resolve,
        depth: usize,
    ) -> PdfResult<Self> {
        let functions = dict
            .expect::<Vec<Object>>("Functions", resolver)?
            .into_iter()
            .map(|obj| Function::from_obj_nested(obj, resolver, depth))
            .collect::<PdfResult<Vec<Function>>>()?;
        let bounds = dict.expect::<Vec<f32>>("Bounds", resolver)?;
        let encode = dict.expect::<Vec<f32>>("Encode", resolver)?;

        let k = functions.len();

        if k == 0 {
            anyhow::bail!("stitching function has no /Functions");
        }

        if bounds.len() != k - 1 || encode.len() != 2 * k {
            anyhow::bail!(
                "stitching function of {} functions has {} bounds and {} encode values",
                k,
                bounds.len(),
                encode.len()
            );
        }

        if bounds.windows(2).any(|pair| pair[0] > pair[1]) {
            anyhow::bail!("stitching function /Bounds are not in increasing order");
        }

        if functions.iter().any(|f| f.input_count() != 1) {
            anyhow::bail!("stitching function components must take exactly one input");
        }

        Ok(Self {
            functions,
            bounds,
            encode,
            domain: [domain[0], domain[1]],
        })
    }

    pub fn output_count(&self) -> Option<usize> {
        self.functions.first().and_then(Function::output_count)
    }

    /// Subdomains are half-open, `[Bounds(i-1), Bounds(i))`, except the last,
    /// which is closed. When `Domain0 == Bounds0`, the first subdomain is the
    /// single point `Domain0`
    fn subdomain(&self, x: f32) -> usize {
        if self.bounds.first() == Some(&self.domain[0]) && x == self.domain[0] {
            return 0;
        }

        self.bounds
            .iter()
            .position(|&bound| x < bound)
            .unwrap_or(self.functions.len() - 1)
    }

    pub fn evaluate(&self, x: f32) -> PdfResult<Vec<f32>> {
        let i = self.subdomain(x);

        let low = if i == 0 {
            self.domain[0]
        } else {
            self.bounds[i - 1]
        };

        let high = if i == self.bounds.len() {
            self.domain[1]
        } else {
            self.bounds[i]
        };

        let x = interpolate(x, low, high, self.encode[2 * i], self.encode[2 * i + 1]);

        self.functions[i].evaluate(&[x])
    }
}
