use std::fmt;

use pdf_macro::pdf_enum;

use crate::{
    error::{ParseError, PdfResult},
    objects::{Dictionary, Object, ObjectType},
    stream::Stream,
    FromObj, Resolve,
};

use self::{
    exponential_interpolation::ExponentialInterpolationFunction,
    postscript_calculator::PostScriptCalculatorFunction, sampled::SampledFunction,
    stitching::StitchingFunction,
};

mod exponential_interpolation;
mod postscript_calculator;
mod sampled;
mod stitching;

/// Stitching functions nested deeper than this are an error
const MAX_FUNCTION_DEPTH: usize = 16;

/// Maps a tint (or a tuple of colorant tints) to components of an alternate
/// color space
///
/// Failures are reported per call; callers turn them into an undefined color
pub trait TintTransform: fmt::Debug + Send + Sync {
    /// The number of input values, fixed at construction
    fn input_count(&self) -> usize;

    /// The number of output values, when it can be known without evaluating
    fn output_count(&self) -> Option<usize>;

    fn apply(&self, input: &[f32]) -> PdfResult<Vec<f32>>;
}

#[derive(Debug, Clone)]
pub struct Function {
    /// An array of 2 * m numbers, where m shall be the number of input values.
    /// For each i from 0 to m - 1, Domain2i shall be less than or equal to Domain2i+1,
    /// and the ith input value, xi, shall lie in the interval Domain2i <= xi <= Domain2i+1.
    /// Input values outside the declared domain shall be clipped to the nearest boundary
    /// value.
    domain: Vec<f32>,

    /// An array of 2 * n numbers, where n shall be the number of output values. For
    /// each j from 0 to n - 1, Range2j shall be less than or equal to Range2j+1,
    /// and the jth output value, yj , shall lie in the interval Range2j <= yj <= Range2j+1.
    /// Output values outside the declared range shall be clipped to the nearest
    /// boundary value. If this entry is absent, no clipping shall be done.
    range: Option<Vec<f32>>,

    subtype: FunctionSubtype,
}

#[derive(Debug)]
enum StreamOrDict {
    Stream(Stream),
    Dict(Dictionary),
}

impl StreamOrDict {
    fn dict(&self) -> &Dictionary {
        match self {
            Self::Dict(dict) => dict,
            Self::Stream(stream) => stream.dict(),
        }
    }

    fn expect_stream(self) -> PdfResult<Stream> {
        match self {
            Self::Dict(dict) => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::Stream,
                found: Object::Dictionary(dict),
            }),
            Self::Stream(stream) => Ok(stream),
        }
    }
}

fn assert_pairs(key: &str, values: &[f32]) -> PdfResult<()> {
    if values.is_empty() || values.len() % 2 != 0 {
        anyhow::bail!("/{} must hold a non-empty, even number of values", key);
    }

    if values.chunks_exact(2).any(|pair| pair[0] > pair[1]) {
        anyhow::bail!("/{} has an interval whose minimum exceeds its maximum", key);
    }

    Ok(())
}

impl FromObj for Function {
    fn from_obj(obj: Object, resolver: &mut dyn Resolve) -> PdfResult<Self> {
        Self::from_obj_nested(obj, resolver, MAX_FUNCTION_DEPTH)
    }
}

impl Function {
    /// `depth` is the number of function levels that may still be built below
    /// this one, counting this one
    fn from_obj_nested(obj: Object, resolver: &mut dyn Resolve, depth: usize) -> PdfResult<Self> {
        let depth = match depth.checked_sub(1) {
            Some(depth) => depth,
            None => anyhow::bail!("function nesting is too deep"),
        };

        let stream_or_dict = match resolver.resolve(obj)? {
            Object::Stream(stream) => StreamOrDict::Stream(stream),
            Object::Dictionary(dict) => StreamOrDict::Dict(dict),
            found => anyhow::bail!(ParseError::MismatchedObjectType {
                expected: ObjectType::Dictionary,
                found,
            }),
        };

        let dict = stream_or_dict.dict();

        let domain = dict.expect::<Vec<f32>>("Domain", resolver)?;
        assert_pairs("Domain", &domain)?;

        let range = dict.get::<Vec<f32>>("Range", resolver)?;
        if let Some(range) = &range {
            assert_pairs("Range", range)?;
        }

        let function_type = dict.expect::<FunctionType>("FunctionType", resolver)?;

        let subtype = match function_type {
            FunctionType::Sampled => {
                let range = match &range {
                    Some(range) => range,
                    None => anyhow::bail!(ParseError::MissingRequiredKey { key: "Range" }),
                };

                FunctionSubtype::Sampled(SampledFunction::from_stream(
                    stream_or_dict.expect_stream()?,
                    &domain,
                    range,
                    resolver,
                )?)
            }
            FunctionType::ExponentialInterpolation => {
                if domain.len() != 2 {
                    anyhow::bail!("exponential interpolation functions take exactly one input");
                }

                FunctionSubtype::ExponentialInterpolation(
                    ExponentialInterpolationFunction::from_dict(dict, resolver)?,
                )
            }
            FunctionType::Stitching => {
                if domain.len() != 2 {
                    anyhow::bail!("stitching functions take exactly one input");
                }

                FunctionSubtype::Stitching(StitchingFunction::from_dict(
                    dict, &domain, resolver, depth,
                )?)
            }
            FunctionType::PostScriptCalculator => {
                if range.is_none() {
                    anyhow::bail!(ParseError::MissingRequiredKey { key: "Range" });
                }

                FunctionSubtype::PostScriptCalculator(PostScriptCalculatorFunction::from_stream(
                    stream_or_dict.expect_stream()?,
                    resolver,
                )?)
            }
        };

        log::trace!("loaded {:?} function", function_type);

        Ok(Self {
            domain,
            range,
            subtype,
        })
    }

    /// Inputs are clipped to the domain, outputs to the range if there is one
    pub fn evaluate(&self, input: &[f32]) -> PdfResult<Vec<f32>> {
        if input.len() != self.input_count() {
            anyhow::bail!(
                "function expects {} inputs, found {}",
                self.input_count(),
                input.len()
            );
        }

        let input = input
            .iter()
            .zip(self.domain.chunks_exact(2))
            .map(|(&x, bounds)| clip(x, bounds[0], bounds[1]))
            .collect::<Vec<f32>>();

        let mut output = match &self.subtype {
            FunctionSubtype::Sampled(f) => f.evaluate(&input),
            FunctionSubtype::ExponentialInterpolation(f) => f.evaluate(input[0]),
            FunctionSubtype::Stitching(f) => f.evaluate(input[0])?,
            FunctionSubtype::PostScriptCalculator(f) => f.evaluate(&input)?,
        };

        if let Some(range) = &self.range {
            if output.len() != range.len() / 2 {
                anyhow::bail!(
                    "function produced {} outputs, but /Range declares {}",
                    output.len(),
                    range.len() / 2
                );
            }

            for (y, bounds) in output.iter_mut().zip(range.chunks_exact(2)) {
                *y = clip(*y, bounds[0], bounds[1]);
            }
        }

        Ok(output)
    }

    pub fn input_count(&self) -> usize {
        self.domain.len() / 2
    }

    pub fn output_count(&self) -> Option<usize> {
        if let Some(range) = &self.range {
            return Some(range.len() / 2);
        }

        match &self.subtype {
            FunctionSubtype::ExponentialInterpolation(f) => Some(f.output_count()),
            FunctionSubtype::Stitching(f) => f.output_count(),
            FunctionSubtype::Sampled(..) | FunctionSubtype::PostScriptCalculator(..) => None,
        }
    }
}

impl TintTransform for Function {
    fn input_count(&self) -> usize {
        Function::input_count(self)
    }

    fn output_count(&self) -> Option<usize> {
        Function::output_count(self)
    }

    fn apply(&self, input: &[f32]) -> PdfResult<Vec<f32>> {
        self.evaluate(input)
    }
}

#[derive(Debug, Clone)]
enum FunctionSubtype {
    Sampled(SampledFunction),
    ExponentialInterpolation(ExponentialInterpolationFunction),
    Stitching(StitchingFunction),
    PostScriptCalculator(PostScriptCalculatorFunction),
}

#[pdf_enum(Integer)]
enum FunctionType {
    Sampled = 0,
    ExponentialInterpolation = 2,
    Stitching = 3,
    PostScriptCalculator = 4,
}

fn clip(x: f32, min: f32, max: f32) -> f32 {
    if x < min {
        min
    } else if x > max {
        max
    } else {
        x
    }
}

/// Linear mapping of `x` from `[x_min, x_max]` onto `[y_min, y_max]`
fn interpolate(x: f32, x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> f32 {
    if x_max == x_min {
        return y_min;
    }

    y_min + (x - x_min) * (y_max - y_min) / (x_max - x_min)
}
