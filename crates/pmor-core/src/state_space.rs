//! Linear time-invariant state-space realizations.
//!
//! ```text
//! x' = A x + B u
//! y  = C x + D u
//! ```
//!
//! `dt` is `Some(step)` for discrete-time systems and `None` for
//! continuous-time ones.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::{Mat, Real, block_diag, hstack, vstack};

#[derive(Debug, Error, PartialEq)]
pub enum StateSpaceError {
    #[error("{matrix} has shape {found:?}, expected {expected:?}")]
    Dimension {
        matrix: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("cannot couple systems with time steps {0:?} and {1:?}")]
    TimeStepMismatch(Option<Real>, Option<Real>),
    #[error("feedback loop is singular, (I - K12 D2 K21 D1) is not invertible")]
    Singular,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSpace {
    pub a: Mat,
    pub b: Mat,
    pub c: Mat,
    pub d: Mat,
    pub dt: Option<Real>,
}

pub(crate) fn expect_shape(
    matrix: &'static str,
    m: &Mat,
    expected: (usize, usize),
) -> Result<(), StateSpaceError> {
    if m.shape() != expected {
        return Err(StateSpaceError::Dimension {
            matrix,
            expected,
            found: m.shape(),
        });
    }
    Ok(())
}

impl StateSpace {
    /// Build a realization, checking that the four matrices are conformable.
    pub fn new(a: Mat, b: Mat, c: Mat, d: Mat, dt: Option<Real>) -> Result<Self, StateSpaceError> {
        let ss = Self { a, b, c, d, dt };
        ss.validate()?;
        Ok(ss)
    }

    pub fn validate(&self) -> Result<(), StateSpaceError> {
        let n = self.a.nrows();
        expect_shape("A", &self.a, (n, n))?;
        expect_shape("B", &self.b, (n, self.b.ncols()))?;
        expect_shape("C", &self.c, (self.c.nrows(), n))?;
        expect_shape("D", &self.d, (self.c.nrows(), self.b.ncols()))?;
        Ok(())
    }

    pub fn states(&self) -> usize {
        self.a.nrows()
    }

    pub fn inputs(&self) -> usize {
        self.b.ncols()
    }

    pub fn outputs(&self) -> usize {
        self.c.nrows()
    }

    pub fn is_discrete(&self) -> bool {
        self.dt.is_some()
    }

    /// Petrov-Galerkin projection onto the right basis `v` with left basis `wt = W^T`.
    ///
    /// Returns `(W^T A V, W^T B, C V, D)` with the same time step.
    pub fn project(&self, v: &Mat, wt: &Mat) -> Result<Self, StateSpaceError> {
        let n = self.states();
        expect_shape("V", v, (n, v.ncols()))?;
        expect_shape("W^T", wt, (v.ncols(), n))?;

        Ok(Self {
            a: wt * &self.a * v,
            b: wt * &self.b,
            c: &self.c * v,
            d: self.d.clone(),
            dt: self.dt,
        })
    }
}

/// Feedback interconnection of two systems.
///
/// The coupled inputs are `[v1; v2]` with
/// `u1 = v1 + k12 y2` and `u2 = v2 + k21 y1`. The coupled state is `[x1; x2]`
/// and the coupled output `[y1; y2]`. Direct feed-through on both sides
/// creates an algebraic loop, resolved through `(I - k12 D2 k21 D1)^-1`.
pub fn couple(
    ss1: &StateSpace,
    ss2: &StateSpace,
    k12: &Mat,
    k21: &Mat,
) -> Result<StateSpace, StateSpaceError> {
    if ss1.dt != ss2.dt {
        return Err(StateSpaceError::TimeStepMismatch(ss1.dt, ss2.dt));
    }
    ss1.validate()?;
    ss2.validate()?;

    let (nx1, nu1, ny1) = (ss1.states(), ss1.inputs(), ss1.outputs());
    let (nx2, nu2, ny2) = (ss2.states(), ss2.inputs(), ss2.outputs());
    expect_shape("K12", k12, (nu1, ny2))?;
    expect_shape("K21", k21, (nu2, ny1))?;

    let (d1, d2) = (&ss1.d, &ss2.d);
    let loop_gain = Mat::identity(nu1, nu1) - k12 * d2 * k21 * d1;
    let l1 = loop_gain.try_inverse().ok_or(StateSpaceError::Singular)?;

    // u1 = U1x [x1; x2] + U1v [v1; v2]
    let u1x = &l1 * hstack(&(k12 * d2 * k21 * &ss1.c), &(k12 * &ss2.c));
    let u1v = &l1 * hstack(&Mat::identity(nu1, nu1), &(k12 * d2));

    // u2 = v2 + k21 (C1 x1 + D1 u1)
    let u2x = hstack(&(k21 * &ss1.c), &Mat::zeros(nu2, nx2)) + k21 * d1 * &u1x;
    let u2v = hstack(&Mat::zeros(nu2, nu1), &Mat::identity(nu2, nu2)) + k21 * d1 * &u1v;

    let y1x = hstack(&ss1.c, &Mat::zeros(ny1, nx2)) + d1 * &u1x;
    let y1v = d1 * &u1v;
    let y2x = hstack(&Mat::zeros(ny2, nx1), &ss2.c) + d2 * &u2x;
    let y2v = d2 * &u2v;

    let b_blk = block_diag(&[&ss1.b, &ss2.b]);
    let a = block_diag(&[&ss1.a, &ss2.a]) + &b_blk * vstack(&u1x, &u2x);
    let b = &b_blk * vstack(&u1v, &u2v);
    let c = vstack(&y1x, &y2x);
    let d = vstack(&y1v, &y2v);

    StateSpace::new(a, b, c, d, ss1.dt)
}
