use serde::{Deserialize, Serialize};

use crate::affine::Point2;
use crate::consts::{MAX_MESH_QUADS, MAX_MESH_TRIANGLES, MAX_MESH_VERTICES};
use crate::error::{AlignError, Result};

/// A mesh node: where it lands on the canvas and where it reads the source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub dest: Point2,
    pub source: Point2,
}

impl Vertex {
    pub fn new(dest: Point2, source: Point2) -> Self {
        Self { dest, source }
    }
}

/// Triangles and quads over a shared vertex list.
///
/// Quads list their corners clockwise on the canvas starting at the top-left
/// (top-left, top-right, bottom-right, bottom-left) and must cover an
/// axis-aligned destination rectangle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    #[serde(default)]
    pub vertices: Vec<Vertex>,
    #[serde(default)]
    pub triangles: Vec<[usize; 3]>,
    #[serde(default)]
    pub quads: Vec<[usize; 4]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, dest: Point2, source: Point2) -> Result<usize> {
        check_capacity("mesh vertices", self.vertices.len() + 1, MAX_MESH_VERTICES)?;
        self.vertices.push(Vertex::new(dest, source));
        Ok(self.vertices.len() - 1)
    }

    pub fn add_triangle(&mut self, indices: [usize; 3]) -> Result<()> {
        check_capacity("mesh triangles", self.triangles.len() + 1, MAX_MESH_TRIANGLES)?;
        self.check_indices(&indices)?;
        self.triangles.push(indices);
        Ok(())
    }

    pub fn add_quad(&mut self, indices: [usize; 4]) -> Result<()> {
        check_capacity("mesh quads", self.quads.len() + 1, MAX_MESH_QUADS)?;
        self.check_indices(&indices)?;
        self.quads.push(indices);
        Ok(())
    }

    /// Check capacities, indices and coordinates, e.g. after deserializing.
    pub fn validate(&self) -> Result<()> {
        check_capacity("mesh vertices", self.vertices.len(), MAX_MESH_VERTICES)?;
        check_capacity("mesh triangles", self.triangles.len(), MAX_MESH_TRIANGLES)?;
        check_capacity("mesh quads", self.quads.len(), MAX_MESH_QUADS)?;
        for (i, v) in self.vertices.iter().enumerate() {
            let coords = [v.dest.x, v.dest.y, v.source.x, v.source.y];
            if coords.iter().any(|c| !c.is_finite()) {
                return Err(AlignError::InvalidMesh(format!(
                    "vertex {i} has a non-finite coordinate"
                )));
            }
        }
        for t in &self.triangles {
            self.check_indices(t)?;
        }
        for q in &self.quads {
            self.check_indices(q)?;
        }
        Ok(())
    }

    /// A `cols` x `rows` grid of quads over the canvas rectangle
    /// `[x0, x1] x [y0, y1]`, reading the source at `source_of(dest)`.
    pub fn grid(
        x0: f64,
        y0: f64,
        x1: f64,
        y1: f64,
        cols: usize,
        rows: usize,
        source_of: impl Fn(Point2) -> Point2,
    ) -> Result<Mesh> {
        if cols == 0 || rows == 0 || x1 <= x0 || y1 <= y0 {
            return Err(AlignError::InvalidMesh(format!(
                "empty grid {cols}x{rows} over [{x0}, {x1}] x [{y0}, {y1}]"
            )));
        }
        let mut mesh = Mesh::new();
        for j in 0..=rows {
            let y = y0 + (y1 - y0) * j as f64 / rows as f64;
            for i in 0..=cols {
                let x = x0 + (x1 - x0) * i as f64 / cols as f64;
                let dest = Point2::new(x, y);
                mesh.add_vertex(dest, source_of(dest))?;
            }
        }
        let stride = cols + 1;
        for j in 0..rows {
            for i in 0..cols {
                let tl = j * stride + i;
                mesh.add_quad([tl, tl + 1, tl + stride + 1, tl + stride])?;
            }
        }
        Ok(mesh)
    }

    /// Copy of the mesh with every quad split into two triangles.
    pub fn triangulated(&self) -> Result<Mesh> {
        let mut mesh = Mesh {
            vertices: self.vertices.clone(),
            triangles: self.triangles.clone(),
            quads: Vec::new(),
        };
        for &[tl, tr, br, bl] in &self.quads {
            mesh.add_triangle([tl, tr, br])?;
            mesh.add_triangle([tl, br, bl])?;
        }
        Ok(mesh)
    }

    fn check_indices(&self, indices: &[usize]) -> Result<()> {
        match indices.iter().find(|&&i| i >= self.vertices.len()) {
            Some(bad) => Err(AlignError::InvalidMesh(format!(
                "vertex index {bad} out of range ({} vertices)",
                self.vertices.len()
            ))),
            None => Ok(()),
        }
    }
}

fn check_capacity(what: &'static str, count: usize, capacity: usize) -> Result<()> {
    if count > capacity {
        return Err(AlignError::CapacityExceeded {
            what,
            count,
            capacity,
        });
    }
    Ok(())
}
