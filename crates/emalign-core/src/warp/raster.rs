use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::affine::{AffineMap, Bounds, Point2};
use crate::error::{AlignError, Result};
use crate::pixel::PixelBuffer;

use super::mesh::Mesh;
use super::sampler::{BicubicKernel, BilinearKernel, ChannelMap, Interpolation, Kernel, NearestKernel};

/// Tolerance when deciding which pixel centres lie on a span or row.
const EDGE_TOLERANCE: f64 = 1e-7;

/// Rendering options shared by every warp call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpOptions {
    pub interpolation: Interpolation,
    /// Source value treated as "no data". Falls back to the source image's
    /// own transparent value when unset.
    pub skip: Option<u32>,
}

/// What a warp call painted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WarpReport {
    pub pixels_written: usize,
    pub triangles_drawn: usize,
    pub quads_drawn: usize,
    /// Indices of triangles skipped because their vertices are collinear.
    pub degenerate_triangles: Vec<usize>,
}

/// Scan-converts meshes and affine maps, resampling a source image onto a canvas.
#[derive(Clone, Debug, Default)]
pub struct WarpRasterizer {
    options: WarpOptions,
}

/// Per-call rendering context with the channel mapping already chosen.
struct Target<'s, 'd> {
    source: &'s PixelBuffer,
    dest: &'d mut PixelBuffer,
    channels: ChannelMap,
    skip: Option<u32>,
    written: usize,
}

impl Target<'_, '_> {
    #[inline]
    fn paint<K: Kernel>(&mut self, kernel: &K, x: usize, y: usize, src: Point2) {
        let mut values = [0.0; 3];
        if kernel.sample(self.source, src.x, src.y, self.skip, &mut values) {
            self.channels.write(self.dest, x, y, &values);
            self.written += 1;
        }
    }

    /// Canvas rows whose centres lie in `[y0, y1]`.
    fn rows(&self, y0: f64, y1: f64) -> Option<(usize, usize)> {
        clip_range(y0, y1, self.dest.height())
    }

    /// Canvas columns whose centres lie in `[x0, x1]`.
    fn cols(&self, x0: f64, x1: f64) -> Option<(usize, usize)> {
        clip_range(x0, x1, self.dest.width())
    }
}

fn clip_range(lo: f64, hi: f64, len: usize) -> Option<(usize, usize)> {
    let first = (lo - EDGE_TOLERANCE).ceil().max(0.0);
    let last = (hi + EDGE_TOLERANCE).floor().min(len as f64 - 1.0);
    if !(first.is_finite() && last.is_finite()) || first > last {
        return None;
    }
    Some((first as usize, last as usize))
}

impl WarpRasterizer {
    pub fn new(options: WarpOptions) -> Self {
        Self { options }
    }

    pub fn with_interpolation(interpolation: Interpolation) -> Self {
        Self::new(WarpOptions {
            interpolation,
            skip: None,
        })
    }

    pub fn options(&self) -> &WarpOptions {
        &self.options
    }

    /// Paint every triangle and quad of `mesh` into `dest`.
    ///
    /// Pixels whose source position falls outside `source`, lacks the
    /// interpolation margin, or touches a skip-valued source pixel are left
    /// as they were.
    pub fn warp(&self, source: &PixelBuffer, dest: &mut PixelBuffer, mesh: &Mesh) -> Result<WarpReport> {
        mesh.validate()?;
        for (i, q) in mesh.quads.iter().enumerate() {
            quad_rect(mesh, q).ok_or_else(|| {
                AlignError::InvalidMesh(format!(
                    "quad {i} is not an axis-aligned rectangle listed clockwise from top-left"
                ))
            })?;
        }
        let mut target = self.target(source, dest)?;
        let report = match self.options.interpolation {
            Interpolation::Nearest => draw_mesh(&mut target, &NearestKernel, mesh),
            Interpolation::Bilinear => draw_mesh(&mut target, &BilinearKernel, mesh),
            Interpolation::Bicubic => draw_mesh(&mut target, &BicubicKernel, mesh),
        };
        debug!(
            pixels = report.pixels_written,
            triangles = report.triangles_drawn,
            quads = report.quads_drawn,
            "mesh warp finished"
        );
        Ok(report)
    }

    /// Render `source` through a single map, filling the canvas rectangle
    /// covered by the source image's footprint.
    pub fn warp_affine(
        &self,
        source: &PixelBuffer,
        dest: &mut PixelBuffer,
        dest_to_source: &AffineMap,
    ) -> Result<WarpReport> {
        let forward = dest_to_source.inverse()?;
        let bounds = forward.bounds(source.width(), source.height());
        let mut target = self.target(source, dest)?;
        match self.options.interpolation {
            Interpolation::Nearest => draw_affine(&mut target, &NearestKernel, dest_to_source, bounds),
            Interpolation::Bilinear => draw_affine(&mut target, &BilinearKernel, dest_to_source, bounds),
            Interpolation::Bicubic => draw_affine(&mut target, &BicubicKernel, dest_to_source, bounds),
        }
        Ok(WarpReport {
            pixels_written: target.written,
            ..Default::default()
        })
    }

    fn target<'s, 'd>(&self, source: &'s PixelBuffer, dest: &'d mut PixelBuffer) -> Result<Target<'s, 'd>> {
        let channels = ChannelMap::select(source.format(), dest.format())?;
        Ok(Target {
            source,
            dest,
            channels,
            skip: self.options.skip.or(source.transparent()),
            written: 0,
        })
    }
}

fn draw_mesh<K: Kernel>(target: &mut Target<'_, '_>, kernel: &K, mesh: &Mesh) -> WarpReport {
    let mut report = WarpReport::default();
    for (i, tri) in mesh.triangles.iter().enumerate() {
        let verts = tri.map(|v| mesh.vertices[v]);
        let dest = verts.map(|v| v.dest);
        let source = verts.map(|v| v.source);
        let dest_to_source = AffineMap::from_triangle(source, dest).and_then(|m| m.inverse());
        match dest_to_source {
            Ok(map) => {
                draw_triangle(target, kernel, dest, &map);
                report.triangles_drawn += 1;
            }
            Err(e) => {
                warn!(triangle = i, "skipping degenerate triangle: {e}");
                report.degenerate_triangles.push(i);
            }
        }
    }
    for q in &mesh.quads {
        if let Some(rect) = quad_rect(mesh, q) {
            let src = q.map(|v| mesh.vertices[v].source);
            draw_quad(target, kernel, rect, src);
            report.quads_drawn += 1;
        }
    }
    report.pixels_written = target.written;
    report
}

/// Top/bottom split scan conversion of one triangle.
fn draw_triangle<K: Kernel>(target: &mut Target<'_, '_>, kernel: &K, mut v: [Point2; 3], dest_to_source: &AffineMap) {
    v.sort_by(|a, b| a.y.total_cmp(&b.y));
    let Some((first_row, last_row)) = target.rows(v[0].y, v[2].y) else {
        return;
    };
    for row in first_row..=last_row {
        let y = row as f64;
        let long = edge_x(v[0], v[2], y);
        let (a, b) = if y < v[1].y { (v[0], v[1]) } else { (v[1], v[2]) };
        let (s0, s1) = if (b.y - a.y).abs() <= EDGE_TOLERANCE {
            (a.x, b.x)
        } else {
            let x = edge_x(a, b, y);
            (x, x)
        };
        let left = long.min(s0).min(s1);
        let right = long.max(s0).max(s1);
        let Some((first_col, last_col)) = target.cols(left, right) else {
            continue;
        };
        for col in first_col..=last_col {
            let src = dest_to_source.apply(Point2::new(col as f64, y));
            target.paint(kernel, col, row, src);
        }
    }
}

/// x where edge `a → b` crosses row `y`, clamped to the edge's extent.
fn edge_x(a: Point2, b: Point2, y: f64) -> f64 {
    let dy = b.y - a.y;
    if dy.abs() <= EDGE_TOLERANCE {
        return a.x;
    }
    let t = ((y - a.y) / dy).clamp(0.0, 1.0);
    a.x + t * (b.x - a.x)
}

/// Destination rectangle `(left, top, right, bottom)` of a well-formed quad.
fn quad_rect(mesh: &Mesh, q: &[usize; 4]) -> Option<(f64, f64, f64, f64)> {
    let [tl, tr, br, bl] = q.map(|v| mesh.vertices[v].dest);
    let close = |a: f64, b: f64| (a - b).abs() <= EDGE_TOLERANCE;
    let ok = close(tl.y, tr.y)
        && close(bl.y, br.y)
        && close(tl.x, bl.x)
        && close(tr.x, br.x)
        && tr.x > tl.x
        && bl.y > tl.y;
    ok.then_some((tl.x, tl.y, tr.x, bl.y))
}

/// Bilinear parametric mapping of a destination rectangle onto a source quad.
fn draw_quad<K: Kernel>(
    target: &mut Target<'_, '_>,
    kernel: &K,
    (left, top, right, bottom): (f64, f64, f64, f64),
    [s_tl, s_tr, s_br, s_bl]: [Point2; 4],
) {
    let Some((first_row, last_row)) = target.rows(top, bottom) else {
        return;
    };
    let Some((first_col, last_col)) = target.cols(left, right) else {
        return;
    };
    let lerp = |a: Point2, b: Point2, t: f64| Point2::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
    for row in first_row..=last_row {
        let v = (row as f64 - top) / (bottom - top);
        let src_left = lerp(s_tl, s_bl, v);
        let src_right = lerp(s_tr, s_br, v);
        for col in first_col..=last_col {
            let u = (col as f64 - left) / (right - left);
            target.paint(kernel, col, row, lerp(src_left, src_right, u));
        }
    }
}

fn draw_affine<K: Kernel>(
    target: &mut Target<'_, '_>,
    kernel: &K,
    dest_to_source: &AffineMap,
    bounds: Bounds,
) {
    let Some((first_row, last_row)) = target.rows(bounds.min_y, bounds.max_y) else {
        return;
    };
    let Some((first_col, last_col)) = target.cols(bounds.min_x, bounds.max_x) else {
        return;
    };
    for row in first_row..=last_row {
        for col in first_col..=last_col {
            let src = dest_to_source.apply(Point2::new(col as f64, row as f64));
            target.paint(kernel, col, row, src);
        }
    }
}
