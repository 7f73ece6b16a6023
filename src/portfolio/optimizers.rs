//! # Portfolio Optimizers
//!
//! $$
//! \min_{\mathbf{w}} \ \tfrac12\mathbf{w}^\top \Sigma \mathbf{w}
//! \quad\text{s.t.}\quad A\mathbf{w} = \mathbf{b},\ \mathbf{w} \ge 0
//! $$
//!
//! Long-only minimum-variance solves with the clarabel interior-point QP
//! solver. Equalities go into a zero cone, the long-only bounds into a
//! nonnegative cone; `w <= 1` follows from the budget row.

use clarabel::algebra::CscMatrix;
use clarabel::solver::*;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray_stats::QuantileExt;

use super::types::SolveFailure;

/// Residual allowed on the equality constraints of a returned solution.
const FEASIBILITY_TOLERANCE: f64 = 1e-6;

/// Limits handed to the interior-point solver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverConfig {
  /// Maximum number of interior-point iterations per solve.
  pub max_iters: usize,
  /// Duality gap and feasibility tolerance.
  pub tolerance: f64,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      max_iters: 500,
      tolerance: 1e-8,
    }
  }
}

/// Whether some long-only fully-invested portfolio earns exactly `target`.
pub(crate) fn target_in_range(mean: ArrayView1<f64>, target: f64, tolerance: f64) -> bool {
  let (Ok(lo), Ok(hi)) = (mean.min(), mean.max()) else {
    return false;
  };
  let slack = tolerance * (1.0 + target.abs());
  target.is_finite() && target >= lo - slack && target <= hi + slack
}

/// Upper triangle of `cov` in compressed-column form.
fn upper_triangle(cov: ArrayView2<f64>) -> CscMatrix<f64> {
  let n = cov.nrows();
  let mut colptr = Vec::with_capacity(n + 1);
  let mut rowval = Vec::new();
  let mut nzval = Vec::new();

  colptr.push(0);
  for j in 0..n {
    for i in 0..=j {
      let v = cov[[i, j]];
      if v != 0.0 {
        rowval.push(i);
        nzval.push(v);
      }
    }
    colptr.push(nzval.len());
  }
  CscMatrix::new(n, n, colptr, rowval, nzval)
}

/// `[A; -I]` in compressed-column form.
fn constraint_matrix(a: ArrayView2<f64>) -> CscMatrix<f64> {
  let (m, n) = a.dim();
  let mut colptr = Vec::with_capacity(n + 1);
  let mut rowval = Vec::new();
  let mut nzval = Vec::new();

  colptr.push(0);
  for j in 0..n {
    for k in 0..m {
      let v = a[[k, j]];
      if v != 0.0 {
        rowval.push(k);
        nzval.push(v);
      }
    }
    rowval.push(m + j);
    nzval.push(-1.0);
    colptr.push(nzval.len());
  }
  CscMatrix::new(m + n, n, colptr, rowval, nzval)
}

/// Minimize `w' Σ w` subject to `A w = b` and `w >= 0`.
///
/// Returns the solution and the number of iterations used.
pub(crate) fn solve_long_only(
  cov: ArrayView2<f64>,
  a: ArrayView2<f64>,
  b: &[f64],
  config: &SolverConfig,
) -> Result<(Vec<f64>, usize), SolveFailure> {
  let (m, n) = a.dim();
  if n == 0 || cov.dim() != (n, n) || b.len() != m {
    return Err(SolveFailure::Numerical);
  }

  let p = upper_triangle(cov);
  let q = vec![0.0; n];
  let constraints = constraint_matrix(a);
  let mut rhs = b.to_vec();
  rhs.extend(std::iter::repeat(0.0).take(n));
  let cones = [ZeroConeT(m), NonnegativeConeT(n)];

  let settings = DefaultSettingsBuilder::default()
    .max_iter(u32::try_from(config.max_iters).unwrap_or(u32::MAX))
    .tol_gap_abs(config.tolerance)
    .tol_gap_rel(config.tolerance)
    .tol_feas(config.tolerance)
    .verbose(false)
    .build()
    .map_err(|_| SolveFailure::Numerical)?;

  let mut solver = DefaultSolver::new(&p, &q, &constraints, &rhs, &cones, settings)
    .map_err(|_| SolveFailure::Numerical)?;
  solver.solve();

  let iterations = solver.solution.iterations as usize;
  match solver.solution.status {
    SolverStatus::Solved => finish(&solver.solution.x, a, b, iterations),
    SolverStatus::MaxIterations => Err(SolveFailure::IterationLimit),
    SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
      Err(SolveFailure::TargetOutOfRange)
    }
    _ => Err(SolveFailure::Numerical),
  }
}

/// Clip interior-point noise onto the bounds and recheck the equalities.
fn finish(
  x: &[f64],
  a: ArrayView2<f64>,
  b: &[f64],
  iterations: usize,
) -> Result<(Vec<f64>, usize), SolveFailure> {
  let w: Vec<f64> = x.iter().map(|v| v.clamp(0.0, 1.0)).collect();

  let residual = a
    .rows()
    .into_iter()
    .zip(b)
    .map(|(row, bk)| (row.iter().zip(&w).map(|(r, wi)| r * wi).sum::<f64>() - bk).abs())
    .fold(0.0_f64, f64::max);
  if !residual.is_finite() || residual > FEASIBILITY_TOLERANCE {
    return Err(SolveFailure::Numerical);
  }

  Ok((w, iterations))
}
