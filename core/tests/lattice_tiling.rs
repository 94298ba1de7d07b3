//! Integration tests for quad lattice generation.

use wavelattice::scene::{CellCoord, Quad, QuadLatticeGenerator, SceneError, TexturedVertex};

fn skewed_quad() -> Quad {
    // Parallelogram with non-trivial texture mapping
    Quad {
        top_left: TexturedVertex::new([-2.0, 1.0, 0.5, 1.0], [0.0, 0.0]),
        top_right: TexturedVertex::new([1.0, 1.5, 0.5, 1.0], [2.0, 0.0]),
        bottom_left: TexturedVertex::new([-1.5, -1.0, 0.5, 1.0], [0.0, 1.0]),
        bottom_right: TexturedVertex::new([1.5, -0.5, 0.5, 1.0], [2.0, 1.0]),
    }
}

fn area(quad: &Quad) -> f32 {
    let a = quad.top_right.xyz() - quad.top_left.xyz();
    let b = quad.bottom_left.xyz() - quad.top_left.xyz();
    a.cross(b).length()
}

#[test]
fn test_cells_follow_parametric_grid() {
    let source = skewed_quad();
    for cols in 1..=6 {
        for rows in 1..=5 {
            let lattice = QuadLatticeGenerator::new(cols, rows).unwrap().generate(&source);
            assert_eq!(lattice.cells().len(), cols * rows);
            assert_eq!(lattice.vertex_count(), cols * rows * Quad::VERTEX_COUNT);

            for row in 0..rows {
                for col in 0..cols {
                    let quad = lattice.cell_quad(CellCoord::new(col, row)).unwrap();
                    let expected = source.point(col as f32 / cols as f32, row as f32 / rows as f32);
                    for (got, want) in quad.top_left.position.iter().zip(expected.position) {
                        assert!((got - want).abs() < 1e-5, "{}x{} cell ({}, {})", cols, rows, col, row);
                    }
                    for (got, want) in quad.top_left.tex_coords.iter().zip(expected.tex_coords) {
                        assert!((got - want).abs() < 1e-5);
                    }
                }
            }
        }
    }
}

#[test]
fn test_neighbours_share_bit_identical_edges() {
    let lattice = QuadLatticeGenerator::new(7, 4).unwrap().generate(&skewed_quad());
    for row in 0..4 {
        for col in 0..7 {
            let quad = lattice.cell_quad(CellCoord::new(col, row)).unwrap();
            if col + 1 < 7 {
                let right = lattice.cell_quad(CellCoord::new(col + 1, row)).unwrap();
                assert_eq!(quad.top_right, right.top_left);
                assert_eq!(quad.bottom_right, right.bottom_left);
            }
            if row + 1 < 4 {
                let below = lattice.cell_quad(CellCoord::new(col, row + 1)).unwrap();
                assert_eq!(quad.bottom_left, below.top_left);
                assert_eq!(quad.bottom_right, below.top_right);
            }
        }
    }
}

#[test]
fn test_cells_cover_source_area() {
    let source = skewed_quad();
    let lattice = QuadLatticeGenerator::new(5, 3).unwrap().generate(&source);
    let total: f32 = (0..3)
        .flat_map(|row| (0..5).map(move |col| CellCoord::new(col, row)))
        .map(|coord| area(&lattice.cell_quad(coord).unwrap()))
        .sum();
    assert!((total - area(&source)).abs() < 1e-3);
}

#[test]
fn test_single_cell_reproduces_source() {
    let source = skewed_quad();
    let lattice = QuadLatticeGenerator::new(1, 1).unwrap().generate(&source);
    assert_eq!(lattice.cell_quad(CellCoord::new(0, 0)), Some(source));
    assert_eq!(lattice.vertices(), &source.triangles()[..]);
}

#[test]
fn test_cells_are_row_major() {
    let lattice = QuadLatticeGenerator::new(3, 2).unwrap().generate(&Quad::unit());
    let names: Vec<&str> = lattice.cells().iter().map(|c| c.name()).collect();
    assert_eq!(
        names,
        vec!["cell[0,0]", "cell[1,0]", "cell[2,0]", "cell[0,1]", "cell[1,1]", "cell[2,1]"]
    );

    // The composite buffer is the concatenation of the cells
    let second = &lattice.vertices()[Quad::VERTEX_COUNT..2 * Quad::VERTEX_COUNT];
    assert_eq!(second, lattice.cells()[1].vertices());
}

#[test]
fn test_degenerate_dimensions_are_rejected() {
    assert_eq!(
        QuadLatticeGenerator::new(0, 3).err(),
        Some(SceneError::EmptyLattice { cols: 0, rows: 3 })
    );
    assert!(QuadLatticeGenerator::new(3, 0).is_err());

    let mut lattice = QuadLatticeGenerator::new(2, 2).unwrap().generate(&Quad::unit());
    assert_eq!(
        lattice.replace_cell_vertices(CellCoord::new(2, 0), Vec::new()),
        Err(SceneError::CellOutOfRange { col: 2, row: 0 })
    );
}
