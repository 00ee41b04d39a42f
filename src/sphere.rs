//! Point samplers for the unit sphere.

use glam::DVec3;
use rand::Rng;

/// Generate `n` random unit vectors by sampling the cube `[-1, 1]³` and
/// normalizing.
///
/// Not surface-uniform: density leans toward the cube corners. The
/// dispersion dynamic erases the bias within a few steps. Draws too close
/// to the origin are rejected so normalization is always defined.
pub fn random_cube_points_with_rng<R: Rng>(n: usize, rng: &mut R) -> Vec<DVec3> {
    (0..n)
        .map(|_| loop {
            let v = DVec3::new(
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(-1.0..=1.0),
            );
            if v.length_squared() > 1e-12 {
                break v.normalize();
            }
        })
        .collect()
}

/// Generate `n` uniformly distributed random points on the unit sphere.
pub fn random_sphere_points_with_rng<R: Rng>(n: usize, rng: &mut R) -> Vec<DVec3> {
    (0..n)
        .map(|_| {
            let z: f64 = rng.gen_range(-1.0..1.0);
            let theta: f64 = rng.gen_range(0.0..std::f64::consts::TAU);
            let r = (1.0 - z * z).sqrt();
            DVec3::new(r * theta.cos(), r * theta.sin(), z)
        })
        .collect()
}

/// Generate `n` points arranged on a Fibonacci (golden-angle) spiral.
///
/// Nearly equidistributed without any relaxation; useful as a calm starting
/// arrangement.
pub fn fibonacci_sphere_points(n: usize) -> Vec<DVec3> {
    let golden_angle = std::f64::consts::PI * (1.0 + 5.0f64.sqrt());
    (0..n)
        .map(|i| {
            let idx = i as f64 + 0.5;
            let theta = golden_angle * idx;
            let phi = (1.0 - 2.0 * idx / n as f64).acos();
            let w = phi.sin();
            DVec3::new(w * theta.cos(), phi.cos(), w * theta.sin())
        })
        .collect()
}
