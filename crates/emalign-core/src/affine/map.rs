use serde::{Deserialize, Serialize};

use crate::consts::{EPSILON, SINGULAR_DETERMINANT};
use crate::error::{AlignError, Result};

/// A point in image coordinates (x to the right, y down).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// The linear 2x2 part of an affine map: rotation, scale and shear.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineShape {
    pub a: f64,
    pub b: f64,
    pub d: f64,
    pub e: f64,
}

impl Default for AffineShape {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineShape {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            d: 0.0,
            e: 1.0,
        }
    }

    /// Counter-clockwise rotation (as seen with y pointing down) by `degrees`.
    pub fn rotation(degrees: f64) -> Self {
        let (s, c) = degrees.to_radians().sin_cos();
        Self {
            a: c,
            b: -s,
            d: s,
            e: c,
        }
    }

    pub fn apply(&self, dx: f64, dy: f64) -> (f64, f64) {
        (self.a * dx + self.b * dy, self.d * dx + self.e * dy)
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    pub fn is_identity(&self) -> bool {
        (self.a - 1.0).abs() < EPSILON
            && self.b.abs() < EPSILON
            && self.d.abs() < EPSILON
            && (self.e - 1.0).abs() < EPSILON
    }

    /// Rotation angle in degrees, taken from the antisymmetric part.
    pub fn rotation_degrees(&self) -> f64 {
        (self.d - self.b).atan2(self.a + self.e).to_degrees()
    }
}

/// `x' = a·x + b·y + c`, `y' = d·x + e·y + f`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineMap {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for AffineMap {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::fmt::Display for AffineMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
            self.a, self.b, self.c, self.d, self.e, self.f
        )
    }
}

impl AffineMap {
    pub const fn identity() -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 0.0,
            e: 1.0,
            f: 0.0,
        }
    }

    pub const fn translation(tx: f64, ty: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: tx,
            d: 0.0,
            e: 1.0,
            f: ty,
        }
    }

    /// Rotation by `degrees` about `center`.
    pub fn rotation_about(degrees: f64, center: Point2) -> Self {
        let shape = AffineShape::rotation(degrees);
        let (rx, ry) = shape.apply(center.x, center.y);
        Self::from_shape(shape, center.x - rx, center.y - ry)
    }

    pub fn from_shape(shape: AffineShape, tx: f64, ty: f64) -> Self {
        Self {
            a: shape.a,
            b: shape.b,
            c: tx,
            d: shape.d,
            e: shape.e,
            f: ty,
        }
    }

    /// Coefficients in `a b c d e f` order.
    pub fn from_coefficients(k: [f64; 6]) -> Self {
        Self {
            a: k[0],
            b: k[1],
            c: k[2],
            d: k[3],
            e: k[4],
            f: k[5],
        }
    }

    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    pub fn apply(&self, p: Point2) -> Point2 {
        let (x, y) = self.apply_linear(p.x, p.y);
        Point2::new(x + self.c, y + self.f)
    }

    /// Apply only the linear part (for displacements).
    pub fn apply_linear(&self, dx: f64, dy: f64) -> (f64, f64) {
        self.shape().apply(dx, dy)
    }

    pub fn shape(&self) -> AffineShape {
        AffineShape {
            a: self.a,
            b: self.b,
            d: self.d,
            e: self.e,
        }
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// Closed-form inverse by 2x2 cofactors.
    pub fn inverse(&self) -> Result<AffineMap> {
        let det = self.determinant();
        if det.abs() < SINGULAR_DETERMINANT {
            return Err(AlignError::SingularTransform(det));
        }
        let a = self.e / det;
        let b = -self.b / det;
        let d = -self.d / det;
        let e = self.a / det;
        Ok(AffineMap {
            a,
            b,
            c: -(a * self.c + b * self.f),
            d,
            e,
            f: -(d * self.c + e * self.f),
        })
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &AffineMap) -> AffineMap {
        AffineMap {
            a: self.a * other.a + self.b * other.d,
            b: self.a * other.b + self.b * other.e,
            c: self.a * other.c + self.b * other.f + self.c,
            d: self.d * other.a + self.e * other.d,
            e: self.d * other.b + self.e * other.e,
            f: self.d * other.c + self.e * other.f + self.f,
        }
    }

    /// Add `(dx, dy)` to the output of the map.
    pub fn shifted(&self, dx: f64, dy: f64) -> AffineMap {
        AffineMap {
            c: self.c + dx,
            f: self.f + dy,
            ..*self
        }
    }

    /// Re-express the map for coordinates measured from `origin` on both sides.
    pub fn to_local(&self, origin: Point2) -> AffineMap {
        AffineMap::translation(-origin.x, -origin.y)
            .compose(self)
            .compose(&AffineMap::translation(origin.x, origin.y))
    }

    /// Inverse of [`AffineMap::to_local`].
    pub fn to_global(&self, origin: Point2) -> AffineMap {
        self.to_local(Point2::new(-origin.x, -origin.y))
    }

    pub fn rotation_degrees(&self) -> f64 {
        self.shape().rotation_degrees()
    }

    /// Bounding box of a `width` x `height` image's pixel centres after mapping.
    pub fn bounds(&self, width: usize, height: usize) -> Bounds {
        let (w, h) = (width.saturating_sub(1) as f64, height.saturating_sub(1) as f64);
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, h),
            Point2::new(0.0, h),
        ];
        let mut bounds = Bounds {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for corner in corners {
            let p = self.apply(corner);
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        bounds
    }

    /// The unique map taking each `src[i]` to `dst[i]`.
    pub fn from_triangle(src: [Point2; 3], dst: [Point2; 3]) -> Result<AffineMap> {
        let (u1x, u1y) = (src[1].x - src[0].x, src[1].y - src[0].y);
        let (u2x, u2y) = (src[2].x - src[0].x, src[2].y - src[0].y);
        let (v1x, v1y) = (dst[1].x - dst[0].x, dst[1].y - dst[0].y);
        let (v2x, v2y) = (dst[2].x - dst[0].x, dst[2].y - dst[0].y);

        let det = u1x * u2y - u2x * u1y;
        let scale = (u1x.abs() + u1y.abs()) * (u2x.abs() + u2y.abs());
        if det.abs() <= SINGULAR_DETERMINANT.max(scale * 1e-12) {
            return Err(AlignError::DegenerateSystem(format!(
                "triangle ({:.3},{:.3}) ({:.3},{:.3}) ({:.3},{:.3}) is collinear",
                src[0].x, src[0].y, src[1].x, src[1].y, src[2].x, src[2].y
            )));
        }

        // L = [v1 v2] * [u1 u2]^-1
        let a = (v1x * u2y - v2x * u1y) / det;
        let b = (v2x * u1x - v1x * u2x) / det;
        let d = (v1y * u2y - v2y * u1y) / det;
        let e = (v2y * u1x - v1y * u2x) / det;
        Ok(AffineMap {
            a,
            b,
            c: dst[0].x - a * src[0].x - b * src[0].y,
            d,
            e,
            f: dst[0].y - d * src[0].x - e * src[0].y,
        })
    }
}

/// Axis-aligned rectangle in floating point coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}
