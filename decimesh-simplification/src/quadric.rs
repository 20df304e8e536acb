//! Planes and symmetric error quadrics
//!
//! A quadric stores the ten independent coefficients of a symmetric 4x4
//! matrix `Q`. For a homogeneous point `x = [p, 1]` the error `xᵗ Q x` is the
//! sum of squared distances from `p` to every plane folded into `Q`.

use decimesh_core::{Matrix3, Matrix4, Point3d, Vector3, Vector3d};
use std::ops::{Add, AddAssign, Mul};

/// Determinant magnitude below which the 3x3 minimisation system is treated
/// as singular.
pub const SINGULAR_EPSILON: f64 = 1e-10;

/// Squared cross-product length below which a triangle has no usable plane.
const DEGENERATE_AREA_SQ: f64 = 1e-24;

/// An oriented plane `normal · x + offset = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3d,
    pub offset: f64,
}

impl Plane {
    /// Plane through a triangle, oriented by its winding.
    ///
    /// Zero-area triangles produce a zero normal and offset, which folds into
    /// a zero quadric.
    pub fn from_triangle(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> Self {
        let normal = triangle_normal(p0, p1, p2);
        Self {
            normal,
            offset: -normal.dot(&p0.coords),
        }
    }

    /// Constraint plane that contains the edge `a -> b` and is perpendicular
    /// to the face with normal `face_normal`.
    pub fn through_edge(a: &Point3d, b: &Point3d, face_normal: &Vector3d) -> Self {
        let normal = (b - a)
            .cross(face_normal)
            .try_normalize(0.0)
            .unwrap_or_else(Vector3d::zeros);
        Self {
            normal,
            offset: -normal.dot(&a.coords),
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.normal == Vector3d::zeros()
    }

    pub fn signed_distance(&self, p: &Point3d) -> f64 {
        self.normal.dot(&p.coords) + self.offset
    }

    pub fn quadric(&self) -> Quadric {
        Quadric::from_plane(self)
    }
}

/// Unit normal of a triangle, or zero if the triangle has no area.
pub fn triangle_normal(p0: &Point3d, p1: &Point3d, p2: &Point3d) -> Vector3d {
    let n = (p1 - p0).cross(&(p2 - p0));
    if n.norm_squared() <= DEGENERATE_AREA_SQ {
        return Vector3d::zeros();
    }
    n.normalize()
}

/// Symmetric 4x4 error quadric.
///
/// Coefficient layout, upper triangle in row order:
///
/// ```txt
/// [q0 q1 q2 q3]
/// [   q4 q5 q6]
/// [      q7 q8]
/// [         q9]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quadric {
    q: [f64; 10],
}

impl Quadric {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_coefficients(q: [f64; 10]) -> Self {
        Self { q }
    }

    /// `p pᵗ` for the homogeneous plane vector `p = [a, b, c, d]`.
    #[rustfmt::skip]
    pub fn from_plane(plane: &Plane) -> Self {
        let (a, b, c, d) = (plane.normal.x, plane.normal.y, plane.normal.z, plane.offset);
        Self {
            q: [
                a * a, a * b, a * c, a * d,
                       b * b, b * c, b * d,
                              c * c, c * d,
                                     d * d,
            ],
        }
    }

    pub fn coefficients(&self) -> &[f64; 10] {
        &self.q
    }

    /// Expand into a full symmetric matrix.
    #[rustfmt::skip]
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let q = &self.q;
        Matrix4::new(
            q[0], q[1], q[2], q[3],
            q[1], q[4], q[5], q[6],
            q[2], q[5], q[7], q[8],
            q[3], q[6], q[8], q[9],
        )
    }

    /// Raw value of `[p, 1]ᵗ Q [p, 1]`; may dip below zero through cancellation.
    #[rustfmt::skip]
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let q = &self.q;
        let (x, y, z) = (p.x, p.y, p.z);
        q[0] * x * x + 2.0 * q[1] * x * y + 2.0 * q[2] * x * z + 2.0 * q[3] * x
            + q[4] * y * y + 2.0 * q[5] * y * z + 2.0 * q[6] * y
            + q[7] * z * z + 2.0 * q[8] * z
            + q[9]
    }

    /// `evaluate` clamped at zero, for use as a collapse cost.
    pub fn cost(&self, p: &Point3d) -> f64 {
        self.evaluate(p).max(0.0)
    }

    /// Point minimising the quadric, or `None` if the system is singular.
    pub fn minimizer(&self) -> Option<Point3d> {
        let q = &self.q;
        #[rustfmt::skip]
        let a = Matrix3::new(
            q[0], q[1], q[2],
            q[1], q[4], q[5],
            q[2], q[5], q[7],
        );
        if a.determinant().abs() < SINGULAR_EPSILON {
            return None;
        }
        let b = Vector3::new(q[3], q[6], q[8]);
        let p = -(a.try_inverse()? * b);
        if !p.iter().all(|c| c.is_finite()) {
            return None;
        }
        Some(Point3d::from(p))
    }

    /// Best merge point for the edge `v0 – v1` and its clamped cost.
    ///
    /// Falls back to the cheapest of `v0`, `v1` and their midpoint when the
    /// system is singular. Ties resolve toward the later candidate, so the
    /// midpoint wins a three-way tie.
    pub fn optimal_point(&self, v0: &Point3d, v1: &Point3d) -> (Point3d, f64) {
        if let Some(p) = self.minimizer() {
            return (p, self.cost(&p));
        }

        let midpoint = Point3d::from((v0.coords + v1.coords) * 0.5);
        let mut best = (*v0, self.cost(v0));
        for p in [*v1, midpoint] {
            let cost = self.cost(&p);
            if cost <= best.1 {
                best = (p, cost);
            }
        }
        best
    }
}

impl Add for Quadric {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl AddAssign for Quadric {
    fn add_assign(&mut self, other: Self) {
        for (a, b) in self.q.iter_mut().zip(other.q.iter()) {
            *a += b;
        }
    }
}

impl Mul<f64> for Quadric {
    type Output = Self;

    fn mul(mut self, weight: f64) -> Self {
        for a in self.q.iter_mut() {
            *a *= weight;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use decimesh_core::Vector4;

    fn p(x: f64, y: f64, z: f64) -> Point3d {
        Point3d::new(x, y, z)
    }

    #[test]
    fn test_plane_from_triangle() {
        let plane = Plane::from_triangle(&p(0.0, 0.0, 2.0), &p(1.0, 0.0, 2.0), &p(0.0, 1.0, 2.0));
        assert_relative_eq!(plane.normal, Vector3d::new(0.0, 0.0, 1.0));
        assert_relative_eq!(plane.offset, -2.0);
        assert_relative_eq!(plane.signed_distance(&p(5.0, -3.0, 2.0)), 0.0);
        assert_relative_eq!(plane.signed_distance(&p(0.0, 0.0, 5.0)), 3.0);
    }

    #[test]
    fn test_degenerate_triangle_has_zero_quadric() {
        let plane = Plane::from_triangle(&p(0.0, 0.0, 0.0), &p(1.0, 1.0, 1.0), &p(2.0, 2.0, 2.0));
        assert!(plane.is_degenerate());
        assert_eq!(plane.quadric(), Quadric::zero());
    }

    #[test]
    fn test_through_edge_is_perpendicular_to_face() {
        let plane = Plane::through_edge(
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &Vector3d::new(0.0, 0.0, 1.0),
        );
        assert_relative_eq!(plane.normal.dot(&Vector3d::z()), 0.0);
        assert_relative_eq!(plane.signed_distance(&p(0.5, 0.0, 0.0)), 0.0);
        assert_relative_eq!(plane.signed_distance(&p(0.5, 2.0, 0.0)).abs(), 2.0);
    }

    #[test]
    fn test_evaluate_matches_matrix_form() {
        let a = Plane::from_triangle(&p(0.0, 0.0, 0.0), &p(1.0, 0.2, 0.1), &p(0.3, 1.0, -0.4));
        let b = Plane::from_triangle(&p(2.0, 0.0, 1.0), &p(1.0, 3.0, 0.0), &p(0.0, 1.0, 1.0));
        let q = a.quadric() + b.quadric() * 3.0;
        let x = p(0.7, -1.2, 2.5);
        let h = Vector4::new(x.x, x.y, x.z, 1.0);
        let expected = (h.transpose() * q.to_matrix() * h)[0];
        assert_relative_eq!(q.evaluate(&x), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_squared_distance() {
        let plane = Plane::from_triangle(&p(0.0, 0.0, 0.0), &p(1.0, 0.0, 0.0), &p(0.0, 1.0, 0.0));
        let q = plane.quadric();
        assert_relative_eq!(q.evaluate(&p(3.0, 4.0, 2.0)), 4.0);
    }

    #[test]
    fn test_addition_is_coefficient_wise() {
        let a = Quadric::from_coefficients([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let b = Quadric::from_coefficients([0.5; 10]);
        let sum = a + b;
        for i in 0..10 {
            assert_relative_eq!(sum.coefficients()[i], a.coefficients()[i] + 0.5);
        }
    }

    #[test]
    fn test_minimizer_of_three_planes() {
        // x = 1, y = 2, z = 3
        let q = Quadric::from_plane(&Plane { normal: Vector3d::x(), offset: -1.0 })
            + Quadric::from_plane(&Plane { normal: Vector3d::y(), offset: -2.0 })
            + Quadric::from_plane(&Plane { normal: Vector3d::z(), offset: -3.0 });
        let (point, cost) = q.optimal_point(&p(0.0, 0.0, 0.0), &p(5.0, 5.0, 5.0));
        assert_relative_eq!(point, p(1.0, 2.0, 3.0), epsilon = 1e-9);
        assert_relative_eq!(cost, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_singular_fallback_picks_cheapest() {
        // Single plane z = 0: rank one, cannot be solved.
        let q = Quadric::from_plane(&Plane { normal: Vector3d::z(), offset: 0.0 });
        assert!(q.minimizer().is_none());

        let (point, cost) = q.optimal_point(&p(0.0, 0.0, 0.0), &p(1.0, 0.0, 2.0));
        assert_eq!(point, p(0.0, 0.0, 0.0));
        assert_relative_eq!(cost, 0.0);

        // Both endpoints on the plane: the midpoint wins the tie.
        let (point, _) = q.optimal_point(&p(0.0, 0.0, 0.0), &p(2.0, 0.0, 0.0));
        assert_eq!(point, p(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_cost_is_never_negative() {
        let planes = [
            Plane::from_triangle(&p(0.0, 0.0, 0.0), &p(1.0, 0.0, 0.0), &p(0.0, 1.0, 0.0)),
            Plane::from_triangle(&p(0.0, 0.0, 0.0), &p(0.0, 0.0, 1.0), &p(1.0, 0.0, 0.0)),
            Plane::from_triangle(
                &p(1e6, 1e6, 1e6),
                &p(1e6 + 1.0, 1e6, 1e6),
                &p(1e6, 1e6 + 1.0, 1e6 + 1e-7),
            ),
            Plane::from_triangle(&p(0.1, 0.2, 0.3), &p(0.4, 0.1, 0.9), &p(0.2, 0.8, 0.5)),
        ];
        let mut q = Quadric::zero();
        for plane in &planes {
            q += plane.quadric();
            let (point, cost) = q.optimal_point(&p(1e6, 1e6, 1e6), &p(0.0, 0.0, 0.0));
            assert!(cost >= 0.0);
            assert!(q.cost(&point) >= 0.0);
        }
    }
}
