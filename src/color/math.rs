use std::ops::Mul;

pub type Color3 = [f32; 3];

pub fn clip01(component: f32) -> f32 {
    component.clamp(0.0, 1.0)
}

/// NaN components are treated as 0
pub fn clip01_3(color: Color3) -> Color3 {
    color.map(|c| if c.is_nan() { 0.0 } else { clip01(c) })
}

pub fn multiply_by_factor(color: Color3, factor: f32) -> Color3 {
    color.map(|c| c * factor)
}

pub fn multiply_by_factors(color: Color3, factors: Color3) -> Color3 {
    [
        color[0] * factors[0],
        color[1] * factors[1],
        color[2] * factors[2],
    ]
}

pub fn power_by_factors(color: Color3, exponents: Color3) -> Color3 {
    [
        color[0].powf(exponents[0]),
        color[1].powf(exponents[1]),
        color[2].powf(exponents[2]),
    ]
}

/// A 3x3 matrix, stored row-major: `m[row][col]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix3 {
    pub m: [[f32; 3]; 3],
}

impl Matrix3 {
    pub const IDENTITY: Self = Self::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub const fn new(m: [[f32; 3]; 3]) -> Self {
        Self { m }
    }

    /// Builds a matrix from 9 values listed column after column, the order in
    /// which a CalRGB `/Matrix` is written
    pub const fn from_columns(values: [f32; 9]) -> Self {
        Self::new([
            [values[0], values[3], values[6]],
            [values[1], values[4], values[7]],
            [values[2], values[5], values[8]],
        ])
    }
}

impl Mul<Color3> for Matrix3 {
    type Output = Color3;

    fn mul(self, v: Color3) -> Color3 {
        let m = &self.m;

        [
            m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
            m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
            m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
        ]
    }
}

/// XYZ to linear sRGB, D65
pub const XYZ_TO_RGB: Matrix3 = Matrix3::new([
    [3.2406, -1.5372, -0.4986],
    [-0.9689, 1.8758, 0.0415],
    [0.0557, -0.2040, 1.0570],
]);
