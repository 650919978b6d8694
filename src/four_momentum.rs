use nalgebra::Vector3;
use std::ops::{Add, Sub};

/// Charged kaon mass in GeV/$`c^2`$, the mass hypothesis used for both phi daughters.
pub const KAON_MASS: f64 = 0.493_677;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FourMomentum {
    pub e: f64,
    pub px: f64,
    pub py: f64,
    pub pz: f64,
}

impl FourMomentum {
    //! A Lorentz four-vector of the form $`(E, \overrightarrow{p})`$ where $E$ is the energy and
    //! $`\overrightarrow{p}`$ is the momentum.
    //!
    //! # Examples
    //! ```
    //! use phiflow::prelude::*;
    //!
    //! let vec_a = FourMomentum::new(1.3, 0.2, 0.3, 0.1);
    //! let vec_b = FourMomentum::from_momentum(0.5, 0.4, 0.5, KAON_MASS);
    //! let sum = vec_a + vec_b;
    //! assert!(sum.m() > 0.0);
    //! ```

    pub fn new(e: f64, px: f64, py: f64, pz: f64) -> Self {
        //! Create a new [`FourMomentum`] from energy and momentum components.
        //!
        //! Components are listed in the order $` (E, p_x, p_y, p_z) `$
        Self { e, px, py, pz }
    }

    pub fn from_momentum(px: f64, py: f64, pz: f64, mass: f64) -> Self {
        //! Create a new [`FourMomentum`] from a 3-momentum and a mass hypothesis.
        //!
        //! The energy is $` E = \sqrt{\overrightarrow{p}^2 + m^2} `$.
        let e = (px * px + py * py + pz * pz + mass * mass).sqrt();
        Self { e, px, py, pz }
    }

    pub fn momentum(&self) -> Vector3<f64> {
        //! Extract the 3-momentum as a [`nalgebra::Vector3<f64>`]
        Vector3::new(self.px, self.py, self.pz)
    }

    pub fn pt(&self) -> f64 {
        //! Transverse momentum $` \sqrt{p_x^2 + p_y^2} `$.
        self.px.hypot(self.py)
    }

    pub fn eta(&self) -> f64 {
        //! Pseudorapidity of the 3-momentum. Purely longitudinal vectors give $`\pm\infty`$ and a
        //! null vector gives `0`.
        let p = self.momentum().norm();
        let pt = self.pt();
        if pt == 0.0 {
            return if self.pz > 0.0 {
                f64::INFINITY
            } else if self.pz < 0.0 {
                f64::NEG_INFINITY
            } else {
                0.0
            };
        }
        0.5 * ((p + self.pz) / (p - self.pz)).ln()
    }

    pub fn m2(&self) -> f64 {
        //! Calculate the invariant $ m^2 $ for this [`FourMomentum`] instance.
        //!
        //! Calculates $` m^2 = E^2 - \overrightarrow{p}^2 `$
        self.e.powi(2) - self.px.powi(2) - self.py.powi(2) - self.pz.powi(2)
    }

    pub fn m(&self) -> f64 {
        //! Calculate the invariant $ m $ for this [`FourMomentum`] instance.
        //!
        //! Rounding can push $` m^2 `$ of a (nearly) massless system slightly below zero, in which
        //! case `0.0` is returned.
        //!
        //! # See Also:
        //!
        //! [`FourMomentum::m2`]
        self.m2().max(0.0).sqrt()
    }
}

impl Add for FourMomentum {
    type Output = FourMomentum;
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            e: self.e + rhs.e,
            px: self.px + rhs.px,
            py: self.py + rhs.py,
            pz: self.pz + rhs.pz,
        }
    }
}

impl Sub for FourMomentum {
    type Output = FourMomentum;
    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            e: self.e - rhs.e,
            px: self.px - rhs.px,
            py: self.py - rhs.py,
            pz: self.pz - rhs.pz,
        }
    }
}

impl Default for FourMomentum {
    fn default() -> Self {
        Self {
            e: 0.0,
            px: 0.0,
            py: 0.0,
            pz: 0.0,
        }
    }
}

impl<'a> std::iter::Sum<&'a FourMomentum> for FourMomentum {
    fn sum<I: Iterator<Item = &'a FourMomentum>>(iter: I) -> Self {
        iter.fold(FourMomentum::default(), |a, b| a + *b)
    }
}
