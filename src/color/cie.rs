use crate::{objects::Dictionary, Resolve};

use super::{
    math::{
        clip01, clip01_3, multiply_by_factor, multiply_by_factors, power_by_factors, Color3,
        Matrix3, XYZ_TO_RGB,
    },
    Rgb,
};

/// Standard D65 white point
pub const D65_WHITE_POINT: Color3 = [0.9505, 1.0000, 1.0890];

/// Shared state of the CIE-based families: the white point and the per
/// channel factors that make the white point map exactly to white
#[derive(Debug, Clone, PartialEq)]
pub struct XyzCalibration {
    white_point: Color3,
    black_point: Color3,
    correction: Color3,
}

impl XyzCalibration {
    pub fn new(white_point: Color3, black_point: Color3) -> Self {
        let mapped = XYZ_TO_RGB * white_point;

        Self {
            white_point,
            black_point,
            correction: mapped.map(|c| 1.0 / c),
        }
    }

    fn from_dict(dict: &Dictionary, resolver: &mut dyn Resolve) -> Self {
        let white_point = dict.get_number_array("WhitePoint", resolver, D65_WHITE_POINT);
        let black_point = dict.get_number_array("BlackPoint", resolver, [0.0; 3]);

        Self::new(white_point, black_point)
    }

    pub fn white_point(&self) -> Color3 {
        self.white_point
    }

    pub fn black_point(&self) -> Color3 {
        self.black_point
    }

    pub(super) fn xyz_to_rgb(&self, xyz: Color3) -> Rgb {
        let rgb = XYZ_TO_RGB * xyz;

        Rgb::from_rgb01(multiply_by_factors(rgb, self.correction))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalGrayColorSpace {
    calibration: XyzCalibration,
    gamma: f32,
}

impl CalGrayColorSpace {
    pub fn new(white_point: Color3, black_point: Color3, gamma: f32) -> Self {
        Self {
            calibration: XyzCalibration::new(white_point, black_point),
            gamma,
        }
    }

    pub fn from_dict(dict: &Dictionary, resolver: &mut dyn Resolve) -> Self {
        Self {
            calibration: XyzCalibration::from_dict(dict, resolver),
            gamma: dict.get_number("Gamma", resolver, 1.0),
        }
    }

    pub fn calibration(&self) -> &XyzCalibration {
        &self.calibration
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub(super) fn to_rgb(&self, a: f32) -> Rgb {
        let a = clip01(a).powf(self.gamma);

        self.calibration
            .xyz_to_rgb(multiply_by_factor(self.calibration.white_point, a))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalRgbColorSpace {
    calibration: XyzCalibration,
    gamma: Color3,

    /// Maps gamma-corrected ABC to XYZ
    matrix: Matrix3,
}

impl CalRgbColorSpace {
    pub fn new(white_point: Color3, black_point: Color3, gamma: Color3, matrix: Matrix3) -> Self {
        Self {
            calibration: XyzCalibration::new(white_point, black_point),
            gamma,
            matrix,
        }
    }

    /// `/Matrix` lists XA YA ZA XB YB ZB XC YC ZC
    pub fn from_dict(dict: &Dictionary, resolver: &mut dyn Resolve) -> Self {
        let identity = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

        Self {
            calibration: XyzCalibration::from_dict(dict, resolver),
            gamma: dict.get_number_array("Gamma", resolver, [1.0; 3]),
            matrix: Matrix3::from_columns(dict.get_number_array("Matrix", resolver, identity)),
        }
    }

    pub fn calibration(&self) -> &XyzCalibration {
        &self.calibration
    }

    pub(super) fn to_rgb(&self, abc: Color3) -> Rgb {
        let abc = power_by_factors(clip01_3(abc), self.gamma);

        self.calibration.xyz_to_rgb(self.matrix * abc)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabColorSpace {
    calibration: XyzCalibration,

    /// `[a_min a_max b_min b_max]`
    range: [f32; 4],
}

impl LabColorSpace {
    pub fn new(white_point: Color3, black_point: Color3, range: [f32; 4]) -> Self {
        Self {
            calibration: XyzCalibration::new(white_point, black_point),
            range,
        }
    }

    pub fn from_dict(dict: &Dictionary, resolver: &mut dyn Resolve) -> Self {
        let unbounded = [f32::NEG_INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::INFINITY];

        Self {
            calibration: XyzCalibration::from_dict(dict, resolver),
            range: dict.get_number_array("Range", resolver, unbounded),
        }
    }

    pub fn calibration(&self) -> &XyzCalibration {
        &self.calibration
    }

    pub fn range(&self) -> [f32; 4] {
        self.range
    }

    pub(super) fn to_rgb(&self, lab: Color3) -> Rgb {
        let [a_min, a_max, b_min, b_max] = self.range;

        // `f32::clamp` panics on inverted bounds, which a malformed /Range may hold
        let l_star = lab[0].max(0.0).min(100.0);
        let a_star = lab[1].max(a_min).min(a_max);
        let b_star = lab[2].max(b_min).min(b_max);

        let m = (l_star + 16.0) / 116.0;
        let l = m + a_star / 500.0;
        let n = m - b_star / 200.0;

        let lmn = [l, m, n].map(Self::inverse);

        self.calibration
            .xyz_to_rgb(multiply_by_factors(self.calibration.white_point, lmn))
    }

    /// Inverse of the CIE L*a*b* companding function
    fn inverse(x: f32) -> f32 {
        if x >= 6.0 / 29.0 {
            x * x * x
        } else {
            (108.0 / 841.0) * (x - 4.0 / 29.0)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assert_white(rgb: Rgb) {
        assert!(rgb.is_close(Rgb::WHITE, 1e-4), "{:?} is not white", rgb);
    }

    #[test]
    fn cal_gray_white_point_is_white() {
        let space = CalGrayColorSpace::new(D65_WHITE_POINT, [0.0; 3], 2.2);

        assert_white(space.to_rgb(1.0));
        assert_eq!(space.to_rgb(0.0), Rgb::BLACK);
    }

    #[test]
    fn cal_gray_other_white_point() {
        let space = CalGrayColorSpace::new([0.9642, 1.0, 0.8249], [0.0; 3], 1.0);

        assert_white(space.to_rgb(1.0));

        let mid = space.to_rgb(0.5);
        assert!((mid.red - 0.5).abs() < 1e-4);
        assert!((mid.green - 0.5).abs() < 1e-4);
    }

    #[test]
    fn cal_rgb_white_point_is_white() {
        // sRGB primaries; columns sum to D65
        let matrix = Matrix3::from_columns([
            0.4124, 0.2126, 0.0193, 0.3576, 0.7152, 0.1192, 0.1805, 0.0722, 0.9505,
        ]);
        let space = CalRgbColorSpace::new(D65_WHITE_POINT, [0.0; 3], [1.8, 1.8, 1.8], matrix);

        assert_white(space.to_rgb([1.0, 1.0, 1.0]));
        assert_eq!(space.to_rgb([0.0, 0.0, 0.0]), Rgb::BLACK);
    }

    #[test]
    fn cal_rgb_primaries() {
        let matrix = Matrix3::from_columns([
            0.4124, 0.2126, 0.0193, 0.3576, 0.7152, 0.1192, 0.1805, 0.0722, 0.9505,
        ]);
        let space = CalRgbColorSpace::new(D65_WHITE_POINT, [0.0; 3], [1.0; 3], matrix);

        let red = space.to_rgb([1.0, 0.0, 0.0]);
        assert!(red.red > 0.95, "{:?}", red);
        assert!(red.green < 0.05 && red.blue < 0.05, "{:?}", red);
    }

    #[test]
    fn lab_white_point_is_white() {
        let space = LabColorSpace::new(
            D65_WHITE_POINT,
            [0.0; 3],
            [-100.0, 100.0, -100.0, 100.0],
        );

        assert_white(space.to_rgb([100.0, 0.0, 0.0]));
        assert!(space.to_rgb([0.0, 0.0, 0.0]).is_close(Rgb::BLACK, 1e-4));
    }

    #[test]
    fn lab_clips_to_range() {
        let space = LabColorSpace::new(D65_WHITE_POINT, [0.0; 3], [-10.0, 10.0, -10.0, 10.0]);

        assert_eq!(
            space.to_rgb([50.0, 80.0, -80.0]),
            space.to_rgb([50.0, 10.0, -10.0])
        );
        assert_eq!(space.to_rgb([150.0, 0.0, 0.0]), space.to_rgb([100.0, 0.0, 0.0]));
    }
}
