//! D3Q19 stencil: discrete velocities, weights, opposite-direction table, and the
//! equilibrium / Guo-forcing kernels shared by collision.

use nalgebra::Vector3;

/// Number of discrete velocity directions in the D3Q19 set.
pub const Q: usize = 19;

/// Lattice sound speed squared, c_s^2 = 1/3 in lattice units.
pub const CS2: f64 = 1.0 / 3.0;

/// Discrete velocity vectors e_i, rest direction first, then the six
/// axis-aligned neighbors, then the twelve face diagonals.
pub const VELOCITIES: [[i32; 3]; Q] = [
    [0, 0, 0],
    [1, 0, 0],
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
    [1, 1, 0],
    [-1, -1, 0],
    [1, -1, 0],
    [-1, 1, 0],
    [1, 0, 1],
    [-1, 0, -1],
    [1, 0, -1],
    [-1, 0, 1],
    [0, 1, 1],
    [0, -1, -1],
    [0, 1, -1],
    [0, -1, 1],
];

/// Quadrature weights w_i matching `VELOCITIES`.
pub const WEIGHTS: [f64; Q] = [
    1.0 / 3.0,
    1.0 / 18.0,
    1.0 / 18.0,
    1.0 / 18.0,
    1.0 / 18.0,
    1.0 / 18.0,
    1.0 / 18.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
];

/// Index of the direction opposite to `i`, i.e. `e_opposite(i) == -e_i`. Used by
/// half-way bounce-back.
pub const OPPOSITE: [usize; Q] = [
    0, 2, 1, 4, 3, 6, 5, 8, 7, 10, 9, 12, 11, 14, 13, 16, 15, 18, 17,
];

#[inline]
pub fn velocity(i: usize) -> Vector3<f64> {
    let e = VELOCITIES[i];
    Vector3::new(e[0] as f64, e[1] as f64, e[2] as f64)
}

/// Maxwell-Boltzmann equilibrium distribution for direction `i`.
///
/// f_i^eq = w_i * rho * [1 + (e_i . u)/c_s^2 + (e_i . u)^2/(2 c_s^4) - (u . u)/(2 c_s^2)]
#[inline]
pub fn equilibrium(i: usize, rho: f64, u: &Vector3<f64>) -> f64 {
    let eu = velocity(i).dot(u);
    let uu = u.dot(u);
    WEIGHTS[i] * rho * (1.0 + eu / CS2 + (eu * eu) / (2.0 * CS2 * CS2) - uu / (2.0 * CS2))
}

/// Fills all 19 equilibrium values for a cell into `out`.
#[inline]
pub fn equilibrium_all(rho: f64, u: &Vector3<f64>, out: &mut [f64; Q]) {
    for i in 0..Q {
        out[i] = equilibrium(i, rho, u);
    }
}

/// Guo (2002) discrete forcing term for direction `i`.
///
/// F_i = w_i (1 - 1/(2 tau_eff)) [ (e_i - u)/c_s^2 + (e_i . u) e_i / c_s^4 ] . F
#[inline]
pub fn guo_forcing(i: usize, u: &Vector3<f64>, tau_eff: f64, force: &Vector3<f64>) -> f64 {
    let e = velocity(i);
    let eu = e.dot(u);
    let term = (e - u) / CS2 + e * (eu / (CS2 * CS2));
    WEIGHTS[i] * (1.0 - 1.0 / (2.0 * tau_eff)) * term.dot(force)
}
