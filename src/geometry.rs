use glam::{DVec2, DVec3};
use rand::Rng;

/// Strategy for computing the vector from one point to another.
///
/// The mesh never subtracts positions directly. Every geometric quantity is
/// computed from the vectors returned by this trait, which allows meshes on
/// periodic domains.
pub trait Displacement {
    fn vector(&self, from: DVec3, to: DVec3) -> DVec3;

    /// The period of the domain along the axis, if it is periodic.
    fn period(&self, _axis: usize) -> Option<f64> {
        None
    }
}

/// Plain, non-periodic displacement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Planar;

impl Displacement for Planar {
    fn vector(&self, from: DVec3, to: DVec3) -> DVec3 {
        to - from
    }
}

/// Displacement on a domain that is periodic in x with the given width. The x
/// component of the displacement is wrapped into `[-width / 2, width / 2]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cylindrical {
    pub width: f64,
}

impl Displacement for Cylindrical {
    fn vector(&self, from: DVec3, to: DVec3) -> DVec3 {
        let mut v = to - from;
        let half = 0.5 * self.width;
        if v.x > half {
            v.x -= self.width;
        } else if v.x < -half {
            v.x += self.width;
        }
        v
    }

    fn period(&self, axis: usize) -> Option<f64> {
        (axis == 0).then_some(self.width)
    }
}

/// Second moments of area of a polygon about its centroid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    /// Integral of x² over the polygon.
    pub xx: f64,
    /// Integral of y² over the polygon.
    pub yy: f64,
    /// Integral of xy over the polygon.
    pub xy: f64,
}

fn cyclic_pairs(pts: &[DVec2]) -> impl Iterator<Item = (DVec2, DVec2)> + use<'_> {
    let n = pts.len();
    (0..n).map(move |i| (pts[i], pts[(i + 1) % n]))
}

/// Signed area of the polygon using the shoelace formula. Positive for
/// counter-clockwise polygons.
pub(crate) fn signed_area(pts: &[DVec2]) -> f64 {
    0.5 * cyclic_pairs(pts).map(|(a, b)| a.perp_dot(b)).sum::<f64>()
}

pub(crate) fn perimeter(pts: &[DVec2]) -> f64 {
    cyclic_pairs(pts).map(|(a, b)| a.distance(b)).sum()
}

/// Area weighted centroid of the polygon. Falls back to the average of the
/// vertices when the polygon has no area.
pub(crate) fn centroid(pts: &[DVec2]) -> DVec2 {
    if pts.is_empty() {
        return DVec2::ZERO;
    }
    let area = signed_area(pts);
    let scale = perimeter(pts);
    if area.abs() <= f64::EPSILON * scale * scale {
        return pts.iter().sum::<DVec2>() / pts.len() as f64;
    }
    cyclic_pairs(pts)
        .map(|(a, b)| (a + b) * a.perp_dot(b))
        .sum::<DVec2>()
        / (6.0 * area)
}

/// Second moments of the polygon about its centroid. The values are
/// independent of the orientation of the polygon.
pub(crate) fn moments(pts: &[DVec2]) -> Moments {
    let c = centroid(pts);
    let mut m = Moments::default();
    for (a, b) in cyclic_pairs(pts) {
        let (a, b) = (a - c, b - c);
        let cross = a.perp_dot(b);
        m.xx += cross * (a.x * a.x + a.x * b.x + b.x * b.x);
        m.yy += cross * (a.y * a.y + a.y * b.y + b.y * b.y);
        m.xy += cross * (a.x * b.y + 2.0 * a.x * a.y + 2.0 * b.x * b.y + b.x * a.y);
    }
    m.xx /= 12.0;
    m.yy /= 12.0;
    m.xy /= 24.0;
    if signed_area(pts) < 0.0 {
        m.xx = -m.xx;
        m.yy = -m.yy;
        m.xy = -m.xy;
    }
    m
}

/// The direction along which the polygon is narrowest, i.e. the eigenvector of
/// the smallest eigenvalue of the moment tensor. If the tensor is isotropic, a
/// random unit vector is returned.
pub(crate) fn short_axis<R: Rng>(m: &Moments, rng: &mut R) -> DVec2 {
    let disc = ((m.xx - m.yy) * (m.xx - m.yy) + 4.0 * m.xy * m.xy).sqrt();
    if disc <= 1e-10 * (m.xx + m.yy).abs() {
        let angle = rng.gen_range(0.0..std::f64::consts::PI);
        return DVec2::new(angle.cos(), angle.sin());
    }
    if m.xy == 0.0 {
        return if m.xx < m.yy { DVec2::X } else { DVec2::Y };
    }
    let smallest = 0.5 * (m.xx + m.yy - disc);
    DVec2::new(smallest - m.yy, m.xy).normalize()
}

/// Ray casting test for whether the origin is inside the polygon. The vertices
/// must be expressed relative to the test point. Returns false if the test
/// point coincides with a vertex, or lies on a horizontal edge.
pub(crate) fn contains_origin(pts: &[DVec2]) -> bool {
    let mut inside = false;
    for (a, b) in cyclic_pairs(pts) {
        if a.length() < f64::EPSILON || b.length() < f64::EPSILON {
            return false;
        }
        let ab = b - a;
        if ab.y.abs() < f64::EPSILON
            && a.y.abs() < f64::EPSILON
            && b.y.abs() < f64::EPSILON
            && (a.x < 0.0) != (b.x < 0.0)
        {
            return false;
        }
        if (a.y > 0.0) != (b.y > 0.0) && 0.0 < a.x - ab.x * a.y / ab.y {
            inside = !inside;
        }
    }
    inside
}

/// Closest point to `p` on the segment from `a` to `b`, and its parameter along
/// the segment.
pub(crate) fn closest_point_on_segment(a: DVec2, b: DVec2, p: DVec2) -> (DVec2, f64) {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 == 0.0 {
        return (a, 0.0);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Parameter along the segment from `a` to `b` where it crosses the line
/// through `origin` in the direction `axis`. `None` if they are parallel.
pub(crate) fn line_segment_intersection(
    origin: DVec2,
    axis: DVec2,
    a: DVec2,
    b: DVec2,
) -> Option<f64> {
    let denom = (b - a).perp_dot(axis);
    if denom.abs() < f64::EPSILON * (b - a).length() * axis.length() {
        return None;
    }
    Some((origin - a).perp_dot(axis) / denom)
}

/// Unsigned area of a planar polygon embedded in 3d, using Newell's method.
pub(crate) fn newell_area(pts: &[DVec3]) -> f64 {
    let n = pts.len();
    0.5 * (0..n)
        .map(|i| pts[i].cross(pts[(i + 1) % n]))
        .sum::<DVec3>()
        .length()
}

#[cfg(test)]
mod test {
    use glam::{DVec2, DVec3, dvec2, dvec3};
    use rand::{SeedableRng, rngs::SmallRng};

    use super::{
        Cylindrical, Displacement, Planar, centroid, closest_point_on_segment, contains_origin,
        line_segment_intersection, moments, newell_area, perimeter, short_axis, signed_area,
    };
    use crate::macros::{assert_f64_eq, assert_vec2_eq};

    fn rectangle(w: f64, h: f64) -> Vec<DVec2> {
        vec![dvec2(0.0, 0.0), dvec2(w, 0.0), dvec2(w, h), dvec2(0.0, h)]
    }

    fn relative_to(pts: &[DVec2], p: DVec2) -> Vec<DVec2> {
        pts.iter().map(|q| *q - p).collect()
    }

    #[test]
    fn t_displacement() {
        let a = dvec3(-4.5, 1.0, 0.0);
        let b = dvec3(4.5, 2.0, 0.0);
        assert_eq!(Planar.vector(a, b), dvec3(9.0, 1.0, 0.0));
        let cyl = Cylindrical { width: 10.0 };
        assert_eq!(cyl.vector(a, b), dvec3(-1.0, 1.0, 0.0));
        assert_eq!(cyl.vector(b, a), dvec3(1.0, -1.0, 0.0));
        assert_eq!(cyl.vector(a, dvec3(0.0, 0.0, 0.0)), dvec3(4.5, -1.0, 0.0));
    }

    #[test]
    fn t_rectangle_properties() {
        let rect = rectangle(2.0, 1.0);
        assert_f64_eq!(signed_area(&rect), 2.0);
        assert_f64_eq!(perimeter(&rect), 6.0);
        assert_vec2_eq!(centroid(&rect), dvec2(1.0, 0.5));
        let m = moments(&rect);
        assert_f64_eq!(m.xx, 8.0 / 12.0);
        assert_f64_eq!(m.yy, 2.0 / 12.0);
        assert_f64_eq!(m.xy, 0.0);
        // Clockwise has negative area, but the same moments.
        let cw: Vec<_> = rect.iter().rev().copied().collect();
        assert_f64_eq!(signed_area(&cw), -2.0);
        let mcw = moments(&cw);
        assert_f64_eq!(mcw.xx, m.xx);
        assert_f64_eq!(mcw.yy, m.yy);
        assert_f64_eq!(mcw.xy, m.xy);
    }

    #[test]
    fn t_degenerate_centroid() {
        let line = [dvec2(0.0, 0.0), dvec2(1.0, 1.0), dvec2(2.0, 2.0)];
        assert_vec2_eq!(centroid(&line), dvec2(1.0, 1.0));
    }

    #[test]
    fn t_short_axis() {
        let mut rng = SmallRng::seed_from_u64(42);
        let wide = short_axis(&moments(&rectangle(2.0, 1.0)), &mut rng);
        assert_vec2_eq!(wide, DVec2::Y);
        let tall = short_axis(&moments(&rectangle(1.0, 3.0)), &mut rng);
        assert_vec2_eq!(tall, DVec2::X);
        // A rectangle rotated by 45 degrees, long along (1, 1).
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let rotated = [
            dvec2(0.0, 0.0),
            dvec2(2.0 * s, 2.0 * s),
            dvec2(s, 3.0 * s),
            dvec2(-s, s),
        ];
        let axis = short_axis(&moments(&rotated), &mut rng);
        assert_f64_eq!(axis.dot(dvec2(s, s)).abs(), 0.0, 1e-9);
        assert_f64_eq!(axis.length(), 1.0, 1e-12);
    }

    #[test]
    fn t_short_axis_of_isotropic_polygon_is_random_unit_vector() {
        let mut rng = SmallRng::seed_from_u64(7);
        let square = moments(&rectangle(1.0, 1.0));
        let a = short_axis(&square, &mut rng);
        let b = short_axis(&square, &mut rng);
        assert_f64_eq!(a.length(), 1.0, 1e-12);
        assert_f64_eq!(b.length(), 1.0, 1e-12);
        assert!(a.y >= 0.0 && b.y >= 0.0);
        assert_ne!(a, b);
    }

    #[test]
    fn t_contains_point() {
        let square = rectangle(1.0, 1.0);
        assert!(contains_origin(&relative_to(&square, dvec2(0.5, 0.5))));
        assert!(contains_origin(&relative_to(&square, dvec2(0.01, 0.99))));
        assert!(!contains_origin(&relative_to(&square, dvec2(1.5, 0.5))));
        assert!(!contains_origin(&relative_to(&square, dvec2(-0.5, 0.5))));
        assert!(!contains_origin(&relative_to(&square, dvec2(0.5, 1.5))));
        // Concave polygon.
        let ell = [
            dvec2(0.0, 0.0),
            dvec2(2.0, 0.0),
            dvec2(2.0, 1.0),
            dvec2(1.0, 1.0),
            dvec2(1.0, 2.0),
            dvec2(0.0, 2.0),
        ];
        assert!(contains_origin(&relative_to(&ell, dvec2(0.5, 1.5))));
        assert!(!contains_origin(&relative_to(&ell, dvec2(1.5, 1.5))));
    }

    #[test]
    fn t_contains_point_pathological() {
        let square = rectangle(1.0, 1.0);
        // Coincident with a vertex.
        assert!(!contains_origin(&relative_to(&square, dvec2(1.0, 1.0))));
        // On a horizontal edge.
        assert!(!contains_origin(&relative_to(&square, dvec2(0.5, 0.0))));
        assert!(!contains_origin(&relative_to(&square, dvec2(0.5, 1.0))));
    }

    #[test]
    fn t_closest_point_on_segment() {
        let (a, b) = (dvec2(0.0, 0.0), dvec2(2.0, 0.0));
        let (p, t) = closest_point_on_segment(a, b, dvec2(0.5, 1.0));
        assert_vec2_eq!(p, dvec2(0.5, 0.0));
        assert_f64_eq!(t, 0.25);
        let (p, t) = closest_point_on_segment(a, b, dvec2(3.0, -1.0));
        assert_vec2_eq!(p, b);
        assert_f64_eq!(t, 1.0);
    }

    #[test]
    fn t_line_segment_intersection() {
        let t = line_segment_intersection(
            dvec2(0.5, 0.5),
            DVec2::Y,
            dvec2(0.0, 0.0),
            dvec2(2.0, 0.0),
        )
        .expect("Expecting an intersection");
        assert_f64_eq!(t, 0.25);
        assert!(
            line_segment_intersection(dvec2(0.5, 0.5), DVec2::X, dvec2(0.0, 0.0), dvec2(2.0, 0.0))
                .is_none()
        );
    }

    #[test]
    fn t_newell_area() {
        // Unit square in the yz plane.
        let square = [
            DVec3::ZERO,
            dvec3(0.0, 1.0, 0.0),
            dvec3(0.0, 1.0, 1.0),
            dvec3(0.0, 0.0, 1.0),
        ];
        assert_f64_eq!(newell_area(&square), 1.0);
    }
}
