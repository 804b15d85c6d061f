use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{
    DEFAULT_ERROR_THRESHOLD, DEFAULT_MIN_POINTS_TO_KEEP, MAX_CORRESPONDENCES, RELATIVE_PIVOT_FLOOR,
};
use crate::error::{AlignError, Result};

use super::map::{AffineMap, AffineShape, Point2};

/// A matched pair of points: `source` in the pattern image, `dest` in the target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub source: Point2,
    pub dest: Point2,
    /// Excluded from fitting.
    #[serde(default)]
    pub rejected: bool,
}

impl Correspondence {
    pub fn new(source: Point2, dest: Point2) -> Self {
        Self {
            source,
            dest,
            rejected: false,
        }
    }
}

/// Outlier-rejection settings for [`AffineSolver`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// RMS residual (pixels) above which the worst point is dropped (default: 3.0).
    pub error_threshold: f64,
    /// Rejection stops once this many points remain (default: 4, never below 3).
    pub min_points_to_keep: usize,
    /// Largest correspondence list accepted (default: 1000).
    pub max_points: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            min_points_to_keep: DEFAULT_MIN_POINTS_TO_KEEP,
            max_points: MAX_CORRESPONDENCES,
        }
    }
}

/// Result of an affine fit.
#[derive(Clone, Debug, PartialEq)]
pub struct AffineFit {
    /// Maps source points onto destination points.
    pub forward: AffineMap,
    /// Maps destination points back onto source points.
    pub inverse: AffineMap,
    /// Root mean square residual over the points still in use.
    pub rms: f64,
    /// Indices of every rejected correspondence, including those rejected on input.
    pub rejected: Vec<usize>,
    /// Number of points the final fit was computed from.
    pub used: usize,
    /// False when rejection stopped at the point floor with `rms` still above threshold.
    pub within_threshold: bool,
}

/// Least-squares affine fit with iterative worst-point rejection.
#[derive(Clone, Debug, Default)]
pub struct AffineSolver {
    config: SolverConfig,
}

impl AffineSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Fit an affine map to three or more correspondences.
    ///
    /// While the RMS residual exceeds `error_threshold` and more than
    /// `min_points_to_keep` points remain, the point with the largest
    /// residual is rejected and the system is solved again.
    pub fn solve(&self, points: &[Correspondence]) -> Result<AffineFit> {
        self.check_capacity(points)?;
        let floor = self.config.min_points_to_keep.max(3);
        let mut active: Vec<bool> = points.iter().map(|p| !p.rejected).collect();

        loop {
            let used = active.iter().filter(|&&a| a).count();
            if used < 3 {
                return Err(AlignError::DegenerateSystem(format!(
                    "{used} usable correspondences, at least 3 required"
                )));
            }

            let forward = least_squares(points, &active)?;
            let inverse = forward.inverse().map_err(|_| {
                AlignError::DegenerateSystem(format!(
                    "fitted map is singular (determinant {:e})",
                    forward.determinant()
                ))
            })?;

            let mut sum_sq = 0.0;
            let mut worst: Option<(usize, f64)> = None;
            for (i, p) in points.iter().enumerate() {
                if !active[i] {
                    continue;
                }
                let r = forward.apply(p.source).distance(&p.dest);
                sum_sq += r * r;
                match worst {
                    Some((_, w)) if w >= r => {}
                    _ => worst = Some((i, r)),
                }
            }
            let rms = (sum_sq / used as f64).sqrt();

            match worst {
                Some((index, residual)) if rms > self.config.error_threshold && used > floor => {
                    debug!(index, residual, rms, used, "rejecting worst correspondence");
                    active[index] = false;
                }
                _ => {
                    let rejected = (0..points.len()).filter(|&i| !active[i]).collect();
                    return Ok(AffineFit {
                        forward,
                        inverse,
                        rms,
                        rejected,
                        used,
                        within_threshold: rms <= self.config.error_threshold,
                    });
                }
            }
        }
    }

    /// Like [`AffineSolver::solve`], but also accepts one or two points.
    ///
    /// One point yields a pure translation. Two points add a third point
    /// rotated 90° about the first in both images, giving a similarity
    /// transform (rotation, isotropic scale and translation).
    pub fn estimate(&self, points: &[Correspondence]) -> Result<AffineFit> {
        self.check_capacity(points)?;
        let usable: Vec<(usize, &Correspondence)> =
            points.iter().enumerate().filter(|(_, p)| !p.rejected).collect();
        let forward = match usable.as_slice() {
            [] => {
                return Err(AlignError::DegenerateSystem(
                    "no usable correspondences".to_string(),
                ))
            }
            [(_, p)] => AffineMap::translation(p.dest.x - p.source.x, p.dest.y - p.source.y),
            [(_, p), (_, q)] => {
                let src = [p.source, q.source, quarter_turn(p.source, q.source)];
                let dst = [p.dest, q.dest, quarter_turn(p.dest, q.dest)];
                AffineMap::from_triangle(src, dst)?
            }
            _ => return self.solve(points),
        };
        let inverse = forward.inverse()?;
        let rejected = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.rejected)
            .map(|(i, _)| i)
            .collect();
        Ok(AffineFit {
            forward,
            inverse,
            rms: 0.0,
            rejected,
            used: usable.len(),
            within_threshold: true,
        })
    }

    /// Rotation plus translation best matching two correspondences.
    ///
    /// The rotation aligns the direction `p → q` in source and destination,
    /// and the translation maps the source midpoint onto the destination midpoint.
    pub fn fit_rotation(p: &Correspondence, q: &Correspondence) -> Result<AffineMap> {
        let (sx, sy) = (q.source.x - p.source.x, q.source.y - p.source.y);
        let (dx, dy) = (q.dest.x - p.dest.x, q.dest.y - p.dest.y);
        if sx.hypot(sy) < f64::EPSILON || dx.hypot(dy) < f64::EPSILON {
            return Err(AlignError::DegenerateSystem(
                "rotation fit needs two distinct points".to_string(),
            ));
        }
        let degrees = (dy.atan2(dx) - sy.atan2(sx)).to_degrees();
        let shape = AffineShape::rotation(degrees);
        let src_mid = Point2::new((p.source.x + q.source.x) / 2.0, (p.source.y + q.source.y) / 2.0);
        let dst_mid = Point2::new((p.dest.x + q.dest.x) / 2.0, (p.dest.y + q.dest.y) / 2.0);
        let (rx, ry) = shape.apply(src_mid.x, src_mid.y);
        Ok(AffineMap::from_shape(shape, dst_mid.x - rx, dst_mid.y - ry))
    }

    fn check_capacity(&self, points: &[Correspondence]) -> Result<()> {
        if points.len() > self.config.max_points {
            return Err(AlignError::CapacityExceeded {
                what: "correspondences",
                count: points.len(),
                capacity: self.config.max_points,
            });
        }
        Ok(())
    }
}

/// `origin + rot90(p - origin)`.
fn quarter_turn(origin: Point2, p: Point2) -> Point2 {
    Point2::new(origin.x - (p.y - origin.y), origin.y + (p.x - origin.x))
}

/// Solve the 3x3 normal equations for both output coordinates at once.
fn least_squares(points: &[Correspondence], active: &[bool]) -> Result<AffineMap> {
    // Centre the source points so the normal matrix stays well conditioned
    // for large image coordinates.
    let used = || points.iter().zip(active).filter_map(|(p, &a)| a.then_some(p));
    let n = used().count() as f64;
    let (mut mx, mut my) = (0.0, 0.0);
    for p in used() {
        mx += p.source.x;
        my += p.source.y;
    }
    mx /= n;
    my /= n;

    let mut m = [[0.0f64; 5]; 3];
    for p in used() {
        let row = [p.source.x - mx, p.source.y - my, 1.0];
        for i in 0..3 {
            for j in 0..3 {
                m[i][j] += row[i] * row[j];
            }
            m[i][3] += row[i] * p.dest.x;
            m[i][4] += row[i] * p.dest.y;
        }
    }

    gauss_jordan(&mut m)?;

    let (a, b, c) = (m[0][3], m[1][3], m[2][3]);
    let (d, e, f) = (m[0][4], m[1][4], m[2][4]);
    Ok(AffineMap {
        a,
        b,
        c: c - a * mx - b * my,
        d,
        e,
        f: f - d * mx - e * my,
    })
}

/// Reduce `[A | B]` to `[I | A⁻¹B]` in place with partial pivoting.
fn gauss_jordan<const N: usize, const M: usize>(m: &mut [[f64; M]; N]) -> Result<()> {
    let scale = m
        .iter()
        .flat_map(|row| row[..N].iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    let floor = (scale * RELATIVE_PIVOT_FLOOR).max(f64::MIN_POSITIVE);

    for col in 0..N {
        let mut pivot = col;
        for row in col + 1..N {
            if m[row][col].abs() > m[pivot][col].abs() {
                pivot = row;
            }
        }
        if m[pivot][col].abs() < floor {
            return Err(AlignError::DegenerateSystem(format!(
                "pivot {:e} in column {col} below stability floor {:e}",
                m[pivot][col], floor
            )));
        }
        m.swap(col, pivot);

        let p = m[col][col];
        for v in m[col].iter_mut() {
            *v /= p;
        }
        for row in 0..N {
            if row == col {
                continue;
            }
            let factor = m[row][col];
            if factor == 0.0 {
                continue;
            }
            for k in 0..M {
                m[row][k] -= factor * m[col][k];
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauss_jordan_needs_pivoting() {
        // Zero in the leading position forces a row swap.
        let mut m = [[0.0, 2.0, 4.0], [3.0, 1.0, 5.0]];
        gauss_jordan(&mut m).unwrap();
        assert!((m[0][2] - 1.0).abs() < 1e-12);
        assert!((m[1][2] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_gauss_jordan_singular() {
        let mut m = [[1.0, 2.0, 1.0], [2.0, 4.0, 2.0]];
        assert!(matches!(
            gauss_jordan(&mut m),
            Err(AlignError::DegenerateSystem(_))
        ));
    }

    #[test]
    fn test_quarter_turn() {
        let p = quarter_turn(Point2::new(1.0, 1.0), Point2::new(3.0, 1.0));
        assert!((p.x - 1.0).abs() < 1e-12 && (p.y - 3.0).abs() < 1e-12);
    }
}
