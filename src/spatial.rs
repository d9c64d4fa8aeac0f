//! Spatial transformations of 3D coordinates.
//!
//! Coordinate sets are `(n, 3)` arrays with one x,y,z point per row. Affine transforms are 4x4 matrices in
//! homogeneous coordinates: a 3x3 linear part, a translation column and the row `[0, 0, 0, 1]`.

use nalgebra::{Matrix4, Vector4};
use ndarray::{Array2, ArrayView2};

use std::f64::consts::PI;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{NeuroformatsError, Result};

/// A 4x4 affine transformation matrix.
pub type Affine = Matrix4<f64>;


/// One of the 3 coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn column(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Axis {
    type Err = NeuroformatsError;

    fn from_str(s: &str) -> Result<Axis> {
        match s {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            _ => Err(NeuroformatsError::InvalidArgument(format!("axis must be one of {{'x', 'y', 'z'}} but is '{}'.", s))),
        }
    }
}


/// Apply an affine transform to a single point.
pub fn apply_affine(x: f64, y: f64, z: f64, affine: &Affine) -> [f64; 3] {
    let v = affine * Vector4::new(x, y, z, 1.0);
    [v[0], v[1], v[2]]
}

/// Apply an affine transform to all points of an `(n, 3)` coordinate array.
pub fn apply_affine_3d(coords: ArrayView2<f64>, affine: &Affine) -> Array2<f64> {
    let mut result = Array2::<f64>::zeros((coords.nrows(), 3));
    for (idx, row) in coords.outer_iter().enumerate() {
        let p = apply_affine(row[0], row[1], row[2], affine);
        for dim in 0..3 {
            result[[idx, dim]] = p[dim];
        }
    }
    result
}


/// Rotate coordinates around a single axis. The angle is given in radians.
pub fn rotate_3d_coordinates_around_axis(coords: ArrayView2<f64>, rot: f64, axis: Axis) -> Array2<f64> {
    let (s, c) = rot.sin_cos();
    let mut result = coords.to_owned();
    for mut row in result.outer_iter_mut() {
        let (x, y, z) = (row[0], row[1], row[2]);
        match axis {
            Axis::X => {
                row[1] = c * y - s * z;
                row[2] = s * y + c * z;
            }
            Axis::Y => {
                row[2] = c * z - s * x;
                row[0] = s * z + c * x;
            }
            Axis::Z => {
                row[0] = c * x - s * y;
                row[1] = s * x + c * y;
            }
        }
    }
    result
}

/// Rotate coordinates around the x, then the y, then the z axis. Angles are given in radians.
///
/// The order matters, as rotations do not commute.
pub fn rotate_3d_coordinates_around_axes(coords: ArrayView2<f64>, rotx: f64, roty: f64, rotz: f64) -> Array2<f64> {
    let rotated = rotate_3d_coordinates_around_axis(coords, rotx, Axis::X);
    let rotated = rotate_3d_coordinates_around_axis(rotated.view(), roty, Axis::Y);
    rotate_3d_coordinates_around_axis(rotated.view(), rotz, Axis::Z)
}

/// Shift coordinates along the axes.
pub fn translate_3d_coordinates_along_axes(coords: ArrayView2<f64>, shift_x: f64, shift_y: f64, shift_z: f64) -> Array2<f64> {
    let mut result = coords.to_owned();
    for mut row in result.outer_iter_mut() {
        row[0] += shift_x;
        row[1] += shift_y;
        row[2] += shift_z;
    }
    result
}

/// Scale coordinates. If no y or z factor is given, the x factor is used for that axis.
pub fn scale_3d_coordinates(coords: ArrayView2<f64>, x_scale_factor: f64, y_scale_factor: Option<f64>, z_scale_factor: Option<f64>) -> Array2<f64> {
    let factors = [x_scale_factor, y_scale_factor.unwrap_or(x_scale_factor), z_scale_factor.unwrap_or(x_scale_factor)];
    let mut result = coords.to_owned();
    for mut row in result.outer_iter_mut() {
        for dim in 0..3 {
            row[dim] *= factors[dim];
        }
    }
    result
}

/// Mirror coordinates at the plane perpendicular to `axis` through `mirror_at`.
///
/// If `mirror_at` is `None`, the smallest coordinate along the axis is used, so the mirrored points lie on the other side of it.
pub fn mirror_3d_coordinates_at_axis(coords: ArrayView2<f64>, axis: Axis, mirror_at: Option<f64>) -> Array2<f64> {
    let col = axis.column();
    let plane = mirror_at.unwrap_or_else(|| coords.column(col).iter().cloned().fold(f64::INFINITY, f64::min));
    let mut result = coords.to_owned();
    for v in result.column_mut(col).iter_mut() {
        *v = mirror_coordinate(*v, plane);
    }
    result
}

/// Point-mirror coordinates at the given point.
pub fn point_mirror_3d_coordinates(coords: ArrayView2<f64>, point: [f64; 3]) -> Array2<f64> {
    let mut result = coords.to_owned();
    for mut row in result.outer_iter_mut() {
        for dim in 0..3 {
            row[dim] = mirror_coordinate(row[dim], point[dim]);
        }
    }
    result
}

fn mirror_coordinate(c: f64, at: f64) -> f64 {
    at - (c - at)
}


/// Convert an angle from radians to degrees. Angles outside `[0, 2π]` are first wrapped into `[0, 2π)`.
pub fn rad2deg(rad: f64) -> f64 {
    let rad = if rad < 0.0 || rad > 2.0 * PI { rad.rem_euclid(2.0 * PI) } else { rad };
    rad * 180.0 / PI
}

/// Convert an angle from degrees to radians. Angles outside `[0, 360]` are first wrapped into `[0, 360)`.
pub fn deg2rad(degrees: f64) -> f64 {
    let degrees = if degrees < 0.0 || degrees > 360.0 { degrees.rem_euclid(360.0) } else { degrees };
    degrees * PI / 180.0
}


/// The affine from MNI305 space (used by FreeSurfer's fsaverage) to MNI152 space.
///
/// See https://surfer.nmr.mgh.harvard.edu/fswiki/CoordinateSystems
#[rustfmt::skip]
pub fn affine_mni305_to_mni152() -> Affine {
    Affine::new(
        0.9975, -0.0073, 0.0176, -0.0429,
        0.0146, 1.0009, -0.0024, 1.5496,
        -0.0130, -0.0093, 0.9971, 1.1840,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// The affine from MNI152 space to MNI305 space, the inverse of [`affine_mni305_to_mni152`].
pub fn affine_mni152_to_mni305() -> Affine {
    affine_mni305_to_mni152().try_inverse().unwrap_or_else(Affine::identity)
}

/// The vox2ras matrix of a conformed FreeSurfer volume (256^3 voxels of 1mm, coronal slices), like `mri/orig.mgz`.
#[rustfmt::skip]
pub fn freesurfer_vox2ras() -> Affine {
    Affine::new(
        -1.0, 0.0, 0.0, 128.0,
        0.0, 0.0, 1.0, -128.0,
        0.0, -1.0, 0.0, 128.0,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// The ras2vox matrix of a conformed FreeSurfer volume, the inverse of [`freesurfer_vox2ras`].
#[rustfmt::skip]
pub fn freesurfer_ras2vox() -> Affine {
    Affine::new(
        -1.0, 0.0, 0.0, 128.0,
        0.0, 0.0, -1.0, 128.0,
        0.0, 1.0, 0.0, 128.0,
        0.0, 0.0, 0.0, 1.0,
    )
}


/// Parse the 4 matrix lines of a registration file into an affine.
pub fn parse_registration_matrix<S: AsRef<str>>(lines: &[S]) -> Result<Affine> {
    if lines.len() != 4 {
        return Err(NeuroformatsError::InvalidRegistrationFormat(format!("Expected 4 matrix lines, got {}.", lines.len())));
    }
    let mut m = Affine::zeros();
    for (row, line) in lines.iter().enumerate() {
        let values = line.as_ref().split_whitespace().map(|t| t.parse::<f64>()).collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(|e| NeuroformatsError::InvalidRegistrationFormat(format!("Invalid number in matrix line {}: {}", row + 1, e)))?;
        if values.len() != 4 {
            return Err(NeuroformatsError::InvalidRegistrationFormat(format!("Matrix line {} has {} values, expected 4.", row + 1, values.len())));
        }
        for (col, v) in values.iter().enumerate() {
            m[(row, col)] = *v;
        }
    }
    Ok(m)
}


/// The contents of a tkregister-style registration file, like `register.dat`.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub subject: Option<String>,
    pub inplane_resolution: f64,
    pub between_plane_resolution: f64,
    pub intensity: f64,
    pub matrix: Affine,
    /// The optional line after the matrix, e.g., `round`.
    pub float2int: Option<String>,
}

impl fmt::Display for Registration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Registration for subject '{}'.", self.subject.as_deref().unwrap_or("unknown"))
    }
}

/// Parse the lines of a registration file.
///
/// The layout is: an optional subject name, the in-plane resolution, the between-plane resolution,
/// the intensity, 4 matrix rows and an optional float-to-int conversion method line.
pub fn parse_registration<S: AsRef<str>>(lines: &[S]) -> Result<Registration> {
    let lines: Vec<&str> = lines.iter().map(|l| l.as_ref().trim()).filter(|l| !l.is_empty()).collect();

    let has_subject = match lines.first() {
        Some(first) => first.parse::<f64>().is_err(),
        None => return Err(NeuroformatsError::InvalidRegistrationFormat(String::from("Empty registration file."))),
    };
    let start = if has_subject { 1 } else { 0 };
    if lines.len() < start + 7 || lines.len() > start + 8 {
        return Err(NeuroformatsError::InvalidRegistrationFormat(format!("Expected {} or {} non-empty lines, got {}.", start + 7, start + 8, lines.len())));
    }

    let scalar = |idx: usize| -> Result<f64> {
        lines[idx].parse::<f64>().map_err(|e| NeuroformatsError::InvalidRegistrationFormat(format!("Invalid number '{}': {}", lines[idx], e)))
    };

    Ok(Registration {
        subject: if has_subject { Some(lines[0].to_string()) } else { None },
        inplane_resolution: scalar(start)?,
        between_plane_resolution: scalar(start + 1)?,
        intensity: scalar(start + 2)?,
        matrix: parse_registration_matrix(&lines[start + 3..start + 7])?,
        float2int: lines.get(start + 7).map(|l| l.to_string()),
    })
}

/// Read a registration file from disk.
pub fn read_registration_file<P: AsRef<Path>>(path: P) -> Result<Registration> {
    let contents = fs::read_to_string(path)?;
    let lines: Vec<&str> = contents.lines().collect();
    parse_registration(&lines)
}


#[cfg(test)]
mod test {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use ndarray::array;

    #[test]
    fn angles_are_wrapped_before_conversion() {
        assert_relative_eq!(360.0, rad2deg(2.0 * PI), max_relative = 1e-9);
        assert_relative_eq!(270.0, rad2deg(-0.5 * PI), max_relative = 1e-9);
        assert_relative_eq!(PI, deg2rad(180.0), max_relative = 1e-9);
        assert_relative_eq!(1.5 * PI, deg2rad(-90.0), max_relative = 1e-9);
        assert_relative_eq!(1.25, deg2rad(rad2deg(1.25)), max_relative = 1e-9);
    }

    #[test]
    fn mni305_to_mni152_matches_the_reference_point() {
        let v = apply_affine(10.0, -20.0, 35.0, &affine_mni305_to_mni152());
        assert_abs_diff_eq!(10.6941, v[0], epsilon = 1e-3);
        assert_abs_diff_eq!(-18.4064, v[1], epsilon = 1e-3);
        assert_abs_diff_eq!(36.1385, v[2], epsilon = 1e-3);
    }

    #[test]
    fn mni_transforms_round_trip() {
        let v = apply_affine(10.0, -20.0, 35.0, &affine_mni305_to_mni152());
        let w = apply_affine(v[0], v[1], v[2], &affine_mni152_to_mni305());
        assert_abs_diff_eq!(10.0, w[0], epsilon = 1e-9);
        assert_abs_diff_eq!(-20.0, w[1], epsilon = 1e-9);
        assert_abs_diff_eq!(35.0, w[2], epsilon = 1e-9);
    }

    #[test]
    fn affines_apply_row_wise_to_coordinate_arrays() {
        let coords = array![[10.0, -20.0, 35.0], [-5.0, -20.0, 72.0]];
        let res = apply_affine_3d(coords.view(), &affine_mni305_to_mni152());
        let expected = array![[10.6941, -18.4064, 36.1385], [-3.6172, -18.7142, 73.2262]];
        assert_abs_diff_eq!(expected, res, epsilon = 1e-3);
    }

    #[test]
    fn conformed_matrices_are_inverses() {
        assert_abs_diff_eq!(Affine::identity(), freesurfer_ras2vox() * freesurfer_vox2ras(), epsilon = 1e-12);
    }

    #[test]
    fn single_axis_rotations_rotate_in_the_right_plane() {
        let coords = array![[1.0, 0.0, 0.0]];
        let rz = rotate_3d_coordinates_around_axis(coords.view(), PI / 2.0, Axis::Z);
        assert_abs_diff_eq!(array![[0.0, 1.0, 0.0]], rz, epsilon = 1e-12);
        let rx = rotate_3d_coordinates_around_axis(coords.view(), PI / 2.0, Axis::X);
        assert_abs_diff_eq!(coords, rx, epsilon = 1e-12);
    }

    #[test]
    fn composite_rotation_applies_x_then_y_then_z() {
        let coords = array![[0.0, 1.0, 0.0]];
        // x: (0,1,0) -> (0,0,1); y: (0,0,1) -> (1,0,0); z: (1,0,0) -> (0,1,0)
        let r = rotate_3d_coordinates_around_axes(coords.view(), PI / 2.0, PI / 2.0, PI / 2.0);
        assert_abs_diff_eq!(array![[0.0, 1.0, 0.0]], r, epsilon = 1e-12);
        let r = rotate_3d_coordinates_around_axes(coords.view(), PI / 2.0, PI / 2.0, 0.0);
        assert_abs_diff_eq!(array![[1.0, 0.0, 0.0]], r, epsilon = 1e-12);
    }

    #[test]
    fn translate_and_scale() {
        let coords = array![[5.0, 7.0, 9.0], [6.0, 8.0, 10.0]];
        let t = translate_3d_coordinates_along_axes(coords.view(), 2.0, -4.0, 0.0);
        assert_eq!(array![[7.0, 3.0, 9.0], [8.0, 4.0, 10.0]], t);
        let s = scale_3d_coordinates(coords.view(), 3.0, None, None);
        assert_eq!(array![[15.0, 21.0, 27.0], [18.0, 24.0, 30.0]], s);
        let s = scale_3d_coordinates(coords.view(), 1.0, Some(2.0), Some(0.0));
        assert_eq!(array![[5.0, 14.0, 0.0], [6.0, 16.0, 0.0]], s);
    }

    #[test]
    fn mirroring_defaults_to_the_minimum_coordinate() {
        let coords = array![[5.0, 7.0, 9.0], [6.0, 8.0, 10.0]];
        let m = mirror_3d_coordinates_at_axis(coords.view(), Axis::X, None);
        assert_eq!(array![[5.0, 7.0, 9.0], [4.0, 8.0, 10.0]], m);
        let m = mirror_3d_coordinates_at_axis(coords.view(), Axis::Z, Some(0.0));
        assert_eq!(array![[5.0, 7.0, -9.0], [6.0, 8.0, -10.0]], m);
        let p = point_mirror_3d_coordinates(coords.view(), [0.0, 0.0, 0.0]);
        assert_eq!(array![[-5.0, -7.0, -9.0], [-6.0, -8.0, -10.0]], p);
        assert!("w".parse::<Axis>().is_err());
    }

    #[test]
    fn registration_matrix_lines_are_parsed() {
        let lines = [
            "1.000000000000000e+00 0.000000000000000e+00 0.000000000000000e+00 0.000000000000000e+00",
            "0.000000000000000e+00 0.000000000000000e+00 1.000000000000000e+00 0.000000000000000e+00",
            "0.000000000000000e+00 -1.000000000000000e+00 0.000000000000000e+00 0.000000000000000e+00",
            "0 0 0 1",
        ];
        let m = parse_registration_matrix(&lines).unwrap();
        assert_eq!(-1.0, m[(2, 1)]);
        assert_eq!(1.0, m[(3, 3)]);
        assert!(parse_registration_matrix(&lines[..3]).is_err());
    }

    #[test]
    fn registration_files_with_and_without_subject_line_are_parsed() {
        let with_subject = ["subject1", "1.0", "1.0", "0.15", "1 0 0 0", "0 1 0 0", "0 0 1 0", "0 0 0 1", "round"];
        let reg = parse_registration(&with_subject).unwrap();
        assert_eq!(Some(String::from("subject1")), reg.subject);
        assert_eq!(0.15, reg.intensity);
        assert_eq!(Affine::identity(), reg.matrix);
        assert_eq!(Some(String::from("round")), reg.float2int);

        let without_subject = &with_subject[1..8];
        let reg = parse_registration(without_subject).unwrap();
        assert_eq!(None, reg.subject);
        assert_eq!(None, reg.float2int);

        assert!(parse_registration(&with_subject[..6]).is_err());
    }
}
