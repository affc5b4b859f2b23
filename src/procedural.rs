//! Procedural generation of structured box grids.
//!
//! Nodes of a grid of order `p` lie on the Gauss-Lobatto lattice of each cell, so that element
//! node order and the basis nodes of the tensor-product elements coincide.
use crate::basis;
use crate::domain::{BoundaryDomain, Domain};
use crate::error::ConfigurationError;
use crate::quadrature::Geometry;
use crate::space::{ElementRestriction, FunctionSpace};
use nalgebra::SVector;

/// One side of a box, given by the axis it is orthogonal to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Side {
    pub axis: usize,
    pub upper: bool,
}

impl Side {
    pub fn lower(axis: usize) -> Self {
        Self { axis, upper: false }
    }

    pub fn upper(axis: usize) -> Self {
        Self { axis, upper: true }
    }

    /// The face-local axes of this side, each with a flag telling whether it runs backwards.
    ///
    /// The axes are ordered so that the face normal computed from them points out of the box.
    fn tangents(&self, dim: usize) -> Vec<(usize, bool)> {
        match (dim, self.axis, self.upper) {
            (2, 0, false) => vec![(1, true)],
            (2, 0, true) => vec![(1, false)],
            (2, 1, false) => vec![(0, false)],
            (2, 1, true) => vec![(0, true)],
            (3, 0, false) => vec![(2, false), (1, false)],
            (3, 0, true) => vec![(1, false), (2, false)],
            (3, 1, false) => vec![(0, false), (2, false)],
            (3, 1, true) => vec![(2, false), (0, false)],
            (3, 2, false) => vec![(1, false), (0, false)],
            (3, 2, true) => vec![(0, false), (1, false)],
            _ => Vec::new(),
        }
    }
}

/// A box `[0, L_0] x ... x [0, L_{D-1}]` divided into equally sized cells of order `p`.
///
/// Nodes and cells are numbered with the x index running fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredGrid<const D: usize> {
    order: usize,
    cells: [usize; D],
    extents: [f64; D],
    lattice: Vec<f64>,
}

/// Visits all multi-indices below `extents`, first index fastest.
fn for_each_index(extents: &[usize], mut f: impl FnMut(&[usize])) {
    if extents.iter().any(|&e| e == 0) {
        return;
    }
    let mut index = vec![0; extents.len()];
    loop {
        f(&index);
        let mut axis = 0;
        loop {
            if axis == extents.len() {
                return;
            }
            index[axis] += 1;
            if index[axis] < extents[axis] {
                break;
            }
            index[axis] = 0;
            axis += 1;
        }
    }
}

impl<const D: usize> StructuredGrid<D> {
    pub fn new(order: usize, cells: [usize; D], extents: [f64; D]) -> Result<Self, ConfigurationError> {
        let lattice = basis::nodes(order)?;
        if let Some(axis) = (0..D).find(|&a| cells[a] == 0 || !(extents[a] > 0.0)) {
            return Err(ConfigurationError::InvalidRestriction {
                reason: format!("grid axis {} needs at least one cell of positive size", axis),
            });
        }
        Ok(Self {
            order,
            cells,
            extents,
            lattice,
        })
    }

    /// The unit box with `cells_per_dim` cells along every axis.
    pub fn unit(order: usize, cells_per_dim: usize) -> Result<Self, ConfigurationError> {
        Self::new(order, [cells_per_dim; D], [1.0; D])
    }

    pub fn geometry(&self) -> Geometry {
        match D {
            1 => Geometry::Segment,
            2 => Geometry::Quadrilateral,
            _ => Geometry::Hexahedron,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn nodes_per_axis(&self, axis: usize) -> usize {
        self.cells[axis] * self.order + 1
    }

    pub fn num_nodes(&self) -> usize {
        (0..D).map(|a| self.nodes_per_axis(a)).product()
    }

    pub fn num_elements(&self) -> usize {
        self.cells.iter().product()
    }

    fn node_index(&self, lattice_index: &[usize]) -> usize {
        (0..D)
            .rev()
            .fold(0, |acc, a| acc * self.nodes_per_axis(a) + lattice_index[a])
    }

    /// Coordinate along `axis` of the lattice line `g`.
    fn lattice_coordinate(&self, axis: usize, g: usize) -> f64 {
        let h = self.extents[axis] / self.cells[axis] as f64;
        let (cell, k) = if g == self.cells[axis] * self.order {
            (self.cells[axis] - 1, self.order)
        } else {
            (g / self.order, g % self.order)
        };
        (cell as f64 + self.lattice[k]) * h
    }

    pub fn node_coordinates(&self) -> Vec<SVector<f64, D>> {
        let extents: Vec<usize> = (0..D).map(|a| self.nodes_per_axis(a)).collect();
        let mut coordinates = Vec::with_capacity(self.num_nodes());
        for_each_index(&extents, |g| {
            coordinates.push(SVector::from_fn(|a, _| self.lattice_coordinate(a, g[a])));
        });
        coordinates
    }

    /// Global nodes of every cell, in element node order.
    pub fn element_nodes(&self) -> Vec<usize> {
        let n = self.order + 1;
        let mut nodes = Vec::with_capacity(self.num_elements() * n.pow(D as u32));
        for_each_index(&self.cells, |cell| {
            for_each_index(&[n; D], |local| {
                let g: Vec<usize> = (0..D).map(|a| cell[a] * self.order + local[a]).collect();
                nodes.push(self.node_index(&g));
            });
        });
        nodes
    }

    pub fn restriction(&self) -> Result<ElementRestriction, ConfigurationError> {
        ElementRestriction::new((self.order + 1).pow(D as u32), self.element_nodes())
    }

    pub fn element_coordinates(&self) -> Vec<Vec<SVector<f64, D>>> {
        let coordinates = self.node_coordinates();
        let n = (self.order + 1).pow(D as u32);
        self.element_nodes()
            .chunks_exact(n)
            .map(|nodes| nodes.iter().map(|&node| coordinates[node]).collect())
            .collect()
    }

    /// The cells of the grid with quadrature rule `points`.
    pub fn domain(&self, points: usize) -> Result<Domain<D>, ConfigurationError> {
        Domain::from_element_coordinates(self.geometry(), self.order, points, &self.element_coordinates())
    }

    /// All sides of the box.
    pub fn sides(&self) -> Vec<Side> {
        (0..D)
            .flat_map(|axis| [Side::lower(axis), Side::upper(axis)])
            .collect()
    }

    /// Global nodes of every boundary face on the given sides, in face node order.
    pub fn face_nodes(&self, sides: &[Side]) -> Vec<usize> {
        let n = self.order + 1;
        let mut nodes = Vec::new();
        for side in sides {
            let tangents = side.tangents(D);
            if tangents.is_empty() {
                continue;
            }
            let face_cells: Vec<usize> = tangents.iter().map(|&(axis, _)| self.cells[axis]).collect();
            let local_extents = vec![n; tangents.len()];
            for_each_index(&face_cells, |cell| {
                for_each_index(&local_extents, |local| {
                    let mut g = [0; D];
                    if side.upper {
                        g[side.axis] = self.nodes_per_axis(side.axis) - 1;
                    }
                    for (t, &(axis, reversed)) in tangents.iter().enumerate() {
                        let forward = cell[t] * self.order + local[t];
                        g[axis] = if reversed {
                            self.nodes_per_axis(axis) - 1 - forward
                        } else {
                            forward
                        };
                    }
                    nodes.push(self.node_index(&g));
                });
            });
        }
        nodes
    }

    fn nodes_per_face(&self) -> usize {
        (self.order + 1).pow(D.saturating_sub(1) as u32)
    }

    pub fn boundary_restriction(&self, sides: &[Side]) -> Result<ElementRestriction, ConfigurationError> {
        ElementRestriction::new(self.nodes_per_face(), self.face_nodes(sides))
    }

    /// The boundary faces on the given sides with quadrature rule `points`.
    pub fn boundary_domain(&self, sides: &[Side], points: usize) -> Result<BoundaryDomain<D>, ConfigurationError> {
        let coordinates = self.node_coordinates();
        let faces: Vec<Vec<SVector<f64, D>>> = self
            .face_nodes(sides)
            .chunks_exact(self.nodes_per_face())
            .map(|nodes| nodes.iter().map(|&node| coordinates[node]).collect())
            .collect();
        BoundaryDomain::from_face_coordinates(self.order, points, &faces)
    }

    /// A space of the grid's order on all nodes.
    pub fn space(&self, components: usize) -> Result<FunctionSpace, ConfigurationError> {
        FunctionSpace::new(self.order, components, self.num_nodes(), self.restriction()?)
    }

    /// A space that also carries the restriction to the faces on the given sides.
    pub fn space_with_boundary(&self, components: usize, sides: &[Side]) -> Result<FunctionSpace, ConfigurationError> {
        self.space(components)?
            .with_boundary_restriction(self.boundary_restriction(sides)?)
    }
}
