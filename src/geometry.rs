// src/geometry.rs - Pure planar/3D angle and alignment math
use crate::landmarks::Landmark;
use nalgebra::Vector3;

/// Scale applied to normalized y-offsets when mapping to a 0-100 levelness
/// score. At 0.2 of the frame height the score bottoms out.
const LEVELNESS_SCALE: f64 = 500.0;

/// Scale applied to the degree difference between paired joints when mapping
/// to a 0-100 symmetry score. A 50-degree asymmetry scores 0.
const SYMMETRY_SCALE: f64 = 2.0;

/// Angle at vertex `b` subtended by `a` and `c`, in degrees within [0,180].
///
/// Planar form: absolute difference of the two atan2 bearings, folded into
/// [0,180]. Returns `None` when any input is missing.
pub fn angle(a: Option<Landmark>, b: Option<Landmark>, c: Option<Landmark>) -> Option<f64> {
    let (a, b, c) = (a?, b?, c?);
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let mut degrees = radians.to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    Some(degrees)
}

/// Depth-aware variant of [`angle`] using the dot-product/arccosine formula
/// over 3D vectors. Returns `None` for missing inputs or degenerate
/// (zero-length) limb vectors.
pub fn angle_3d(a: Option<Landmark>, b: Option<Landmark>, c: Option<Landmark>) -> Option<f64> {
    let (a, b, c) = (a?, b?, c?);
    let v1: Vector3<f64> = a.xyz() - b.xyz();
    let v2: Vector3<f64> = c.xyz() - b.xyz();
    let mag = v1.norm() * v2.norm();
    if mag < 1e-9 {
        return None;
    }
    let cos = (v1.dot(&v2) / mag).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Planar Euclidean distance between two landmarks.
pub fn distance(a: Option<Landmark>, b: Option<Landmark>) -> Option<f64> {
    let (a, b) = (a?, b?);
    Some((a.xy() - b.xy()).norm())
}

/// Levelness of two nominally level points (shoulders, hips): 100 when their
/// heights match, falling linearly to 0.
pub fn horizontal_deviation(p1: Option<Landmark>, p2: Option<Landmark>) -> Option<f64> {
    let (p1, p2) = (p1?, p2?);
    Some((100.0 - (p1.y - p2.y).abs() * LEVELNESS_SCALE).max(0.0))
}

/// Alignment of a set of nominally stacked points (e.g. nose, shoulder
/// midpoint, hip midpoint): 100 when their x coordinates agree, falling
/// linearly with the mean absolute deviation about the mean x.
pub fn vertical_deviation(points: &[Landmark]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let mean_x = points.iter().map(|p| p.x).sum::<f64>() / points.len() as f64;
    let mad = points.iter().map(|p| (p.x - mean_x).abs()).sum::<f64>() / points.len() as f64;
    Some((100.0 - mad * LEVELNESS_SCALE).max(0.0))
}

/// Angle in degrees between the bearings of two 2-point lines, folded into
/// [0,180]. Used for shoulder-line vs hip-line torso rotation.
pub fn rotation(line_a: (Landmark, Landmark), line_b: (Landmark, Landmark)) -> f64 {
    let bearing_a = (line_a.1.y - line_a.0.y).atan2(line_a.1.x - line_a.0.x);
    let bearing_b = (line_b.1.y - line_b.0.y).atan2(line_b.1.x - line_b.0.x);
    let mut degrees = (bearing_a - bearing_b).to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    degrees
}

/// Bearing of a 2-point line off horizontal, in degrees within [0,90].
pub fn line_tilt(p1: Landmark, p2: Landmark) -> f64 {
    let degrees = (p2.y - p1.y).atan2(p2.x - p1.x).to_degrees().abs();
    if degrees > 90.0 {
        180.0 - degrees
    } else {
        degrees
    }
}

/// Bilateral symmetry score for a paired metric: 100 when the sides agree,
/// falling linearly to a floor of 0. `None` if either side is unmeasured.
pub fn symmetry(left: Option<f64>, right: Option<f64>) -> Option<f64> {
    let (l, r) = (left?, right?);
    Some((100.0 - SYMMETRY_SCALE * (l - r).abs()).max(0.0))
}
