//! Quad lattice generation.
//!
//! A source quad is split into `rows x cols` cells. Each cell is a full
//! [`SceneObject`] with its own transform, and the composite object draws the
//! concatenation of every cell's vertices in row-major order.

use glam::Vec3;

use super::animation::AnimationPolicy;
use super::object::{Quad, SceneObject, TexturedVertex};
use super::transform::ModelUniforms;
use super::SceneError;

/// Column/row position of a cell. Row 0 is the top of the source quad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub col: usize,
    pub row: usize,
}

impl CellCoord {
    pub const fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }
}

/// Lattice dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatticeDims {
    pub cols: usize,
    pub rows: usize,
}

impl LatticeDims {
    pub fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    fn index(&self, coord: CellCoord) -> Option<usize> {
        (coord.col < self.cols && coord.row < self.rows).then(|| coord.row * self.cols + coord.col)
    }

    fn coord(&self, index: usize) -> CellCoord {
        CellCoord::new(index % self.cols, index / self.cols)
    }
}

/// Per-cell uniform record: model matrix plus the pivot the shader rotates about.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CellUniforms {
    pub model: [[f32; 4]; 4],
    pub pivot: [f32; 4],
}

/// One-shot factory that tiles a quad into a fixed grid.
#[derive(Debug, Clone, Copy)]
pub struct QuadLatticeGenerator {
    dims: LatticeDims,
}

impl QuadLatticeGenerator {
    pub fn new(cols: usize, rows: usize) -> Result<Self, SceneError> {
        if cols == 0 || rows == 0 {
            return Err(SceneError::EmptyLattice { cols, rows });
        }
        Ok(Self {
            dims: LatticeDims { cols, rows },
        })
    }

    pub fn dims(&self) -> LatticeDims {
        self.dims
    }

    /// Tile `source` into a lattice.
    ///
    /// Cell `(i, j)` covers the parametric rectangle
    /// `[i/cols, (i+1)/cols] x [j/rows, (j+1)/rows]`. Boundaries are computed once
    /// per grid line so neighbouring cells share bit-identical edge vertices.
    pub fn generate(&self, source: &Quad) -> LatticeNode {
        let LatticeDims { cols, rows } = self.dims;
        let us: Vec<f32> = (0..=cols).map(|i| i as f32 / cols as f32).collect();
        let vs: Vec<f32> = (0..=rows).map(|j| j as f32 / rows as f32).collect();

        let mut cells = Vec::with_capacity(self.dims.cell_count());
        for row in 0..rows {
            for col in 0..cols {
                let quad = Quad {
                    top_left: source.point(us[col], vs[row]),
                    top_right: source.point(us[col + 1], vs[row]),
                    bottom_left: source.point(us[col], vs[row + 1]),
                    bottom_right: source.point(us[col + 1], vs[row + 1]),
                };
                cells.push(SceneObject::new(
                    format!("cell[{col},{row}]"),
                    quad.triangles().to_vec(),
                ));
            }
        }

        log::debug!(
            "Generated {}x{} lattice ({} vertices)",
            cols,
            rows,
            cells.len() * Quad::VERTEX_COUNT
        );
        LatticeNode::from_cells(self.dims, cells)
    }
}

/// Composite object owning a fixed grid of cells.
#[derive(Debug, Clone)]
pub struct LatticeNode {
    dims: LatticeDims,
    composite: SceneObject,
    cells: Vec<SceneObject>,
    pivots: Vec<Vec3>,
    vertex_generation: u64,
}

impl LatticeNode {
    fn from_cells(dims: LatticeDims, cells: Vec<SceneObject>) -> Self {
        let mut node = Self {
            dims,
            composite: SceneObject::new("lattice", Vec::new()),
            cells,
            pivots: Vec::new(),
            vertex_generation: 0,
        };
        node.rebuild_vertices();
        node
    }

    pub fn dims(&self) -> LatticeDims {
        self.dims
    }

    /// The composite object; its transform places the whole lattice.
    pub fn composite(&self) -> &SceneObject {
        &self.composite
    }

    pub fn composite_mut(&mut self) -> &mut SceneObject {
        &mut self.composite
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> &[SceneObject] {
        &self.cells
    }

    pub fn cell(&self, coord: CellCoord) -> Option<&SceneObject> {
        self.dims.index(coord).map(|i| &self.cells[i])
    }

    pub fn cell_mut(&mut self, coord: CellCoord) -> Option<&mut SceneObject> {
        self.dims.index(coord).map(move |i| &mut self.cells[i])
    }

    /// Corners of a cell as currently stored in its vertex run.
    pub fn cell_quad(&self, coord: CellCoord) -> Option<Quad> {
        self.cell(coord)
            .and_then(|cell| Quad::from_triangles(cell.vertices()))
    }

    /// Concatenated vertices of every cell, row-major.
    pub fn vertices(&self) -> &[TexturedVertex] {
        self.composite.vertices()
    }

    pub fn vertex_count(&self) -> usize {
        self.composite.vertex_count()
    }

    /// Bumped every time the composite vertex buffer is rebuilt.
    pub fn vertex_generation(&self) -> u64 {
        self.vertex_generation
    }

    /// Replace the vertex run of one cell and rebuild the composite buffer.
    ///
    /// Transform changes never need this; only changes of shape do. The run
    /// must be a full quad ([`Quad::VERTEX_COUNT`] vertices) since the shader
    /// derives the cell index from the vertex index.
    pub fn replace_cell_vertices(
        &mut self,
        coord: CellCoord,
        vertices: Vec<TexturedVertex>,
    ) -> Result<(), SceneError> {
        let index = self
            .dims
            .index(coord)
            .ok_or(SceneError::CellOutOfRange {
                col: coord.col,
                row: coord.row,
            })?;
        if vertices.len() != Quad::VERTEX_COUNT {
            return Err(SceneError::CellVertexCount {
                expected: Quad::VERTEX_COUNT,
                actual: vertices.len(),
            });
        }
        self.cells[index].replace_vertices(vertices);
        self.rebuild_vertices();
        Ok(())
    }

    /// Rebuild the composite vertex buffer and cell pivots from the cells.
    pub fn rebuild_vertices(&mut self) {
        let vertices: Vec<TexturedVertex> = self
            .cells
            .iter()
            .flat_map(|cell| cell.vertices().iter().copied())
            .collect();
        self.pivots = self
            .cells
            .iter()
            .map(|cell| {
                Quad::from_triangles(cell.vertices())
                    .map(|quad| quad.center())
                    .unwrap_or_else(|| centroid(cell.vertices()))
            })
            .collect();
        self.composite.replace_vertices(vertices);
        self.vertex_generation += 1;
    }

    /// Let `policy` drive every cell's transform for the given elapsed time.
    pub fn update_cell_transforms<P>(&mut self, elapsed: f32, policy: &P)
    where
        P: AnimationPolicy + ?Sized,
    {
        let dims = self.dims;
        for (index, cell) in self.cells.iter_mut().enumerate() {
            policy.cell_transform(dims.coord(index), dims, elapsed, &mut cell.transform);
        }
    }

    /// Sync the composite and every cell uniform slot.
    pub fn sync_uniforms(&mut self) {
        self.composite.sync_uniform();
        for cell in &mut self.cells {
            cell.sync_uniform();
        }
    }

    pub fn composite_uniform(&self) -> &ModelUniforms {
        self.composite.uniform()
    }

    /// Synced uniform of every cell, row-major.
    pub fn cell_uniforms(&self) -> Vec<CellUniforms> {
        let mut out = Vec::with_capacity(self.cells.len());
        self.fill_cell_uniforms(&mut out);
        out
    }

    /// Write each cell's synced uniform into `out`, replacing its contents.
    pub fn fill_cell_uniforms(&self, out: &mut Vec<CellUniforms>) {
        out.clear();
        out.extend(self.cells.iter().zip(&self.pivots).map(|(cell, pivot)| {
            CellUniforms {
                model: cell.uniform().model,
                pivot: pivot.extend(1.0).to_array(),
            }
        }));
    }
}

fn centroid(vertices: &[TexturedVertex]) -> Vec3 {
    if vertices.is_empty() {
        return Vec3::ZERO;
    }
    vertices.iter().map(TexturedVertex::xyz).sum::<Vec3>() / vertices.len() as f32
}
