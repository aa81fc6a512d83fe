//! Quadrature rules for Galerkin surface integration
//!
//! Symmetric triangle rules (weights normalized as area fractions summing
//! to one) for regular element pairs, hardcoded 1D Gauss-Legendre tables,
//! and a Duffy-transformed apex subdivision for singular inner integrals.
//! The Duffy parametrization has a radial Jacobian proportional to the
//! distance from the apex, which cancels the 1/r singularity of the
//! Laplace kernels exactly.

#![allow(clippy::excessive_precision)]

/// A quadrature point on the reference triangle: (ξ, η, weight).
///
/// Weights are area fractions: multiplying by the physical element area
/// integrates over the element.
pub type TrianglePoint = (f64, f64, f64);

const CENTROID: [TrianglePoint; 1] = [(1.0 / 3.0, 1.0 / 3.0, 1.0)];

/// Degree 2, interior points.
const THREE_POINT: [TrianglePoint; 3] = [
    (1.0 / 6.0, 1.0 / 6.0, 1.0 / 3.0),
    (2.0 / 3.0, 1.0 / 6.0, 1.0 / 3.0),
    (1.0 / 6.0, 2.0 / 3.0, 1.0 / 3.0),
];

/// Degree 4 (Dunavant).
const SIX_POINT: [TrianglePoint; 6] = [
    (0.445948490915965, 0.445948490915965, 0.223381589678011),
    (0.108103018168070, 0.445948490915965, 0.223381589678011),
    (0.445948490915965, 0.108103018168070, 0.223381589678011),
    (0.091576213509771, 0.091576213509771, 0.109951743655322),
    (0.816847572980459, 0.091576213509771, 0.109951743655322),
    (0.091576213509771, 0.816847572980459, 0.109951743655322),
];

/// Degree 5 (Dunavant).
const SEVEN_POINT: [TrianglePoint; 7] = [
    (1.0 / 3.0, 1.0 / 3.0, 0.225),
    (0.470142064105115, 0.470142064105115, 0.132394152788506),
    (0.059715871789770, 0.470142064105115, 0.132394152788506),
    (0.470142064105115, 0.059715871789770, 0.132394152788506),
    (0.101286507323456, 0.101286507323456, 0.125939180544827),
    (0.797426985353087, 0.101286507323456, 0.125939180544827),
    (0.101286507323456, 0.797426985353087, 0.125939180544827),
];

/// Degree 6 (Dunavant).
const TWELVE_POINT: [TrianglePoint; 12] = [
    (0.063089014491502, 0.063089014491502, 0.050844906370207),
    (0.873821971016996, 0.063089014491502, 0.050844906370207),
    (0.063089014491502, 0.873821971016996, 0.050844906370207),
    (0.249286745170910, 0.249286745170910, 0.116786275726379),
    (0.501426509658179, 0.249286745170910, 0.116786275726379),
    (0.249286745170910, 0.501426509658179, 0.116786275726379),
    (0.310352451033785, 0.636502499121399, 0.082851075618374),
    (0.053145049844816, 0.310352451033785, 0.082851075618374),
    (0.636502499121399, 0.053145049844816, 0.082851075618374),
    (0.636502499121399, 0.310352451033785, 0.082851075618374),
    (0.310352451033785, 0.053145049844816, 0.082851075618374),
    (0.053145049844816, 0.636502499121399, 0.082851075618374),
];

/// Symmetric triangle rule exact for polynomials of the requested degree.
///
/// Falls back to the closest available rule; the highest provided rule
/// has degree 6.
pub fn triangle_rule(degree: usize) -> &'static [TrianglePoint] {
    match degree {
        0 | 1 => &CENTROID,
        2 => &THREE_POINT,
        3 | 4 => &SIX_POINT,
        5 => &SEVEN_POINT,
        _ => &TWELVE_POINT,
    }
}

// 1D Gauss-Legendre abscissas (on [-1,1]) and weights.

const GL1_X: [f64; 1] = [0.0];
const GL1_W: [f64; 1] = [2.0];
const GL2_X: [f64; 2] = [-0.5773502691896257, 0.5773502691896257];
const GL2_W: [f64; 2] = [1.0, 1.0];
const GL3_X: [f64; 3] = [-0.7745966692414834, 0.0, 0.7745966692414834];
const GL3_W: [f64; 3] = [
    0.5555555555555556,
    0.8888888888888888,
    0.5555555555555556,
];
const GL4_X: [f64; 4] = [
    -0.8611363115940526,
    -0.3399810435848563,
    0.3399810435848563,
    0.8611363115940526,
];
const GL4_W: [f64; 4] = [
    0.3478548451374538,
    0.6521451548625461,
    0.6521451548625461,
    0.3478548451374538,
];
const GL5_X: [f64; 5] = [
    -0.9061798459386640,
    -0.5384693101056831,
    0.0,
    0.5384693101056831,
    0.9061798459386640,
];
const GL5_W: [f64; 5] = [
    0.2369268850561891,
    0.4786286704993665,
    0.5688888888888889,
    0.4786286704993665,
    0.2369268850561891,
];
const GL6_X: [f64; 6] = [
    -0.9324695142031521,
    -0.6612093864662645,
    -0.2386191860831969,
    0.2386191860831969,
    0.6612093864662645,
    0.9324695142031521,
];
const GL6_W: [f64; 6] = [
    0.1713244923791704,
    0.3607615730481386,
    0.4679139345726910,
    0.4679139345726910,
    0.3607615730481386,
    0.1713244923791704,
];
const GL8_X: [f64; 8] = [
    -0.9602898564975363,
    -0.7966664774136267,
    -0.5255324099163290,
    -0.1834346424956498,
    0.1834346424956498,
    0.5255324099163290,
    0.7966664774136267,
    0.9602898564975363,
];
const GL8_W: [f64; 8] = [
    0.1012285362903763,
    0.2223810344533745,
    0.3137066458778873,
    0.3626837833783620,
    0.3626837833783620,
    0.3137066458778873,
    0.2223810344533745,
    0.1012285362903763,
];

/// 1D Gauss-Legendre points and weights on [-1, 1].
///
/// Orders 1-6 and 8 are tabulated; other orders fall back to the closest
/// available table.
pub fn gauss_legendre(order: usize) -> (&'static [f64], &'static [f64]) {
    match order {
        0 | 1 => (&GL1_X, &GL1_W),
        2 => (&GL2_X, &GL2_W),
        3 => (&GL3_X, &GL3_W),
        4 => (&GL4_X, &GL4_W),
        5 => (&GL5_X, &GL5_W),
        6 | 7 => (&GL6_X, &GL6_W),
        _ => (&GL8_X, &GL8_W),
    }
}

/// Duffy-transformed quadrature on the reference triangle with the
/// singularity at `apex` (reference coordinates, clamped into the triangle
/// by the caller).
///
/// The triangle is split into up to three sub-triangles sharing the apex;
/// each is mapped from the unit square so that one square edge collapses
/// onto the apex. The resulting weights are area fractions like
/// [`triangle_rule`], and the point density concentrates toward the apex.
pub fn duffy_points(apex: (f64, f64), gauss_order: usize) -> Vec<TrianglePoint> {
    const CORNERS: [(f64, f64); 3] = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];
    let (gx, gw) = gauss_legendre(gauss_order);

    let mut out = Vec::with_capacity(3 * gx.len() * gx.len());
    for k in 0..3 {
        let a = CORNERS[k];
        let b = CORNERS[(k + 1) % 3];
        let pa = (a.0 - apex.0, a.1 - apex.1);
        let ab = (b.0 - a.0, b.1 - a.1);
        // Twice the signed area of the sub-triangle (apex, a, b)
        let det = pa.0 * ab.1 - pa.1 * ab.0;
        if det.abs() < 1e-14 {
            // Apex lies on this edge, the sub-triangle degenerates
            continue;
        }

        for (iu, &xu) in gx.iter().enumerate() {
            let u = 0.5 * (xu + 1.0);
            let wu = 0.5 * gw[iu];
            for (iv, &xv) in gx.iter().enumerate() {
                let v = 0.5 * (xv + 1.0);
                let wv = 0.5 * gw[iv];

                // y = apex + u*((a - apex) + v*(b - a)); dS = u*|det| du dv
                let xi = apex.0 + u * (pa.0 + v * ab.0);
                let eta = apex.1 + u * (pa.1 + v * ab.1);
                // Reference weight u*|det|*wu*wv, scaled by 2 to make it an
                // area fraction (reference triangle has area 1/2).
                out.push((xi, eta, 2.0 * u * det.abs() * wu * wv));
            }
        }
    }
    out
}
