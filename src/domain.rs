//! Geometric data of the cells and boundary faces that integrals are evaluated over.
//!
//! Positions and Jacobians per quadrature point are what the kernels need from the mesh. They
//! can be supplied directly, or computed from nodal coordinates of isoparametric elements.
use crate::element::{Element, Family, FiniteElement};
use crate::error::ConfigurationError;
use crate::interpolate::{QuadratureFields, SumFactorizationCache};
use crate::quadrature::{self, Geometry};
use crate::tensor::det_and_inverse;
use nalgebra::{SMatrix, SVector};

/// Volume cells of a single geometry together with their quadrature point data.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain<const D: usize> {
    geometry: Geometry,
    points: usize,
    weights: Vec<f64>,
    num_elements: usize,
    positions: Vec<SVector<f64, D>>,
    jacobians: Vec<f64>,
}

fn check_dimension(expected: usize, actual: usize) -> Result<(), ConfigurationError> {
    if expected == actual {
        Ok(())
    } else {
        Err(ConfigurationError::DimensionMismatch { expected, actual })
    }
}

/// Identity Jacobians, for evaluating reference-space gradients through the element interface.
fn identity_jacobians(dim: usize, num_points: usize) -> Vec<f64> {
    (0..num_points)
        .flat_map(|_| (0..dim * dim).map(move |k| if k % (dim + 1) == 0 { 1.0 } else { 0.0 }))
        .collect()
}

/// Interpolates nodal coordinates of one element, returning positions and reference gradients.
fn interpolate_coordinates<const D: usize>(
    element: &Element,
    coordinates: &[SVector<f64, D>],
    identity: &[f64],
    fields: &mut QuadratureFields<f64>,
    cache: &mut SumFactorizationCache<f64>,
) -> Result<(), ConfigurationError> {
    let n = element.num_nodes();
    if coordinates.len() != n {
        return Err(ConfigurationError::NodeCountMismatch {
            expected: n,
            actual: coordinates.len(),
        });
    }
    let mut dofs = vec![0.0; D * n];
    for (a, x) in coordinates.iter().enumerate() {
        for i in 0..D {
            dofs[i * n + a] = x[i];
        }
    }
    element.interpolate(&dofs, identity, fields, cache);
    Ok(())
}

impl<const D: usize> Domain<D> {
    /// Collects positions and Jacobians `J[r][c] = dx_r / dxi_c` at the quadrature points of
    /// `rule(geometry, points)`, element by element.
    pub fn from_jacobians(
        geometry: Geometry,
        points: usize,
        positions: Vec<SVector<f64, D>>,
        jacobians: Vec<SMatrix<f64, D, D>>,
    ) -> Result<Self, ConfigurationError> {
        check_dimension(D, geometry.dimension())?;
        let rule = quadrature::rule(geometry, points)?;
        let points_per_element = rule.len();
        if positions.len() % points_per_element != 0 {
            return Err(ConfigurationError::NodeCountMismatch {
                expected: points_per_element,
                actual: positions.len() % points_per_element,
            });
        }
        if jacobians.len() != positions.len() {
            return Err(ConfigurationError::ElementCountMismatch {
                expected: positions.len() / points_per_element,
                actual: jacobians.len() / points_per_element,
            });
        }

        let mut flat = Vec::with_capacity(jacobians.len() * D * D);
        for j in &jacobians {
            for r in 0..D {
                for c in 0..D {
                    flat.push(j[(r, c)]);
                }
            }
        }

        let domain = Self {
            geometry,
            points,
            weights: rule.weights().to_vec(),
            num_elements: positions.len() / points_per_element,
            positions,
            jacobians: flat,
        };
        domain.check_jacobians()?;
        Ok(domain)
    }

    /// Computes quadrature point data of isoparametric elements of the given order from the
    /// coordinates of their nodes, listed in element node order.
    pub fn from_element_coordinates(
        geometry: Geometry,
        order: usize,
        points: usize,
        coordinates: &[Vec<SVector<f64, D>>],
    ) -> Result<Self, ConfigurationError> {
        check_dimension(D, geometry.dimension())?;
        let element = Element::new(geometry, Family::H1, order, points)?;
        let rule = element.quadrature();
        let nq = rule.len();
        let identity = identity_jacobians(D, nq);
        let mut fields = QuadratureFields::new(nq, D, D);
        let mut cache = SumFactorizationCache::default();

        let mut positions = Vec::with_capacity(coordinates.len() * nq);
        let mut jacobians = Vec::with_capacity(coordinates.len() * nq * D * D);
        for element_coordinates in coordinates {
            interpolate_coordinates(&element, element_coordinates, &identity, &mut fields, &mut cache)?;
            for point in 0..nq {
                positions.push(SVector::from_fn(|r, _| fields.value(point, r)));
                for r in 0..D {
                    for c in 0..D {
                        jacobians.push(fields.gradient(point, r, c));
                    }
                }
            }
        }

        let domain = Self {
            geometry,
            points,
            weights: rule.weights().to_vec(),
            num_elements: coordinates.len(),
            positions,
            jacobians,
        };
        domain.check_jacobians()?;
        Ok(domain)
    }

    fn check_jacobians(&self) -> Result<(), ConfigurationError> {
        let nq = self.points_per_element();
        let mut inverse = [0.0; 9];
        for (index, j) in self.jacobians.chunks_exact(D * D).enumerate() {
            let determinant = det_and_inverse(D, j, &mut inverse[..D * D]);
            if !(determinant > 0.0) {
                return Err(ConfigurationError::NonPositiveJacobian {
                    element: index / nq,
                    point: index % nq,
                    determinant,
                });
            }
        }
        Ok(())
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// The quadrature parameter: points per dimension, or the simplex table index.
    pub fn points(&self) -> usize {
        self.points
    }

    pub fn points_per_element(&self) -> usize {
        self.weights.len()
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn position(&self, element: usize, point: usize) -> &SVector<f64, D> {
        &self.positions[element * self.points_per_element() + point]
    }

    pub fn element_positions(&self, element: usize) -> &[SVector<f64, D>] {
        let nq = self.points_per_element();
        &self.positions[element * nq..(element + 1) * nq]
    }

    /// Row-major Jacobians of all quadrature points of `element`.
    pub fn element_jacobians(&self, element: usize) -> &[f64] {
        let stride = self.points_per_element() * D * D;
        &self.jacobians[element * stride..(element + 1) * stride]
    }

    pub fn jacobian(&self, element: usize, point: usize) -> SMatrix<f64, D, D> {
        let offset = (element * self.points_per_element() + point) * D * D;
        SMatrix::from_fn(|r, c| self.jacobians[offset + r * D + c])
    }

    /// Total measure of the domain as seen by the quadrature rule.
    pub fn measure(&self) -> f64 {
        let mut inverse = [0.0; 9];
        self.jacobians
            .chunks_exact(D * D)
            .enumerate()
            .map(|(index, j)| {
                let w = self.weights[index % self.points_per_element()];
                w * det_and_inverse(D, j, &mut inverse[..D * D])
            })
            .sum()
    }
}

/// Boundary faces of a `D`-dimensional domain with outward normals and surface measures at
/// their quadrature points.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryDomain<const D: usize> {
    geometry: Geometry,
    points: usize,
    points_per_face: usize,
    num_faces: usize,
    positions: Vec<SVector<f64, D>>,
    normals: Vec<SVector<f64, D>>,
    measures: Vec<f64>,
}

impl<const D: usize> BoundaryDomain<D> {
    /// Assembles boundary data from positions, unit outward normals and measures (surface
    /// Jacobian determinant times quadrature weight) per face quadrature point.
    pub fn from_parts(
        geometry: Geometry,
        points: usize,
        positions: Vec<SVector<f64, D>>,
        normals: Vec<SVector<f64, D>>,
        measures: Vec<f64>,
    ) -> Result<Self, ConfigurationError> {
        check_dimension(D, geometry.dimension() + 1)?;
        let points_per_face = quadrature::rule(geometry, points)?.len();
        if positions.len() % points_per_face != 0 || normals.len() != positions.len() || measures.len() != positions.len()
        {
            return Err(ConfigurationError::ElementCountMismatch {
                expected: positions.len() / points_per_face,
                actual: normals.len().min(measures.len()) / points_per_face,
            });
        }
        Ok(Self {
            geometry,
            points,
            points_per_face,
            num_faces: positions.len() / points_per_face,
            positions,
            normals,
            measures,
        })
    }

    /// Computes boundary data of isoparametric faces from the coordinates of their nodes.
    ///
    /// Faces are segments in 2D and quadrilaterals in 3D. Their orientation defines the normal:
    /// `(t_y, -t_x)` for a segment with tangent `t`, and `t_a x t_b` for a quadrilateral with
    /// tangents `t_a`, `t_b` along its first and second reference axes.
    pub fn from_face_coordinates(
        order: usize,
        points: usize,
        faces: &[Vec<SVector<f64, D>>],
    ) -> Result<Self, ConfigurationError> {
        let geometry = match D {
            2 => Geometry::Segment,
            3 => Geometry::Quadrilateral,
            _ => return Err(ConfigurationError::DimensionMismatch { expected: 3, actual: D }),
        };
        let element = Element::new(geometry, Family::H1, order, points)?;
        let rule = element.quadrature();
        let nq = rule.len();
        let face_dim = D - 1;
        let identity = identity_jacobians(face_dim, nq);
        let mut fields = QuadratureFields::new(nq, D, face_dim);
        let mut cache = SumFactorizationCache::default();

        let mut positions = Vec::with_capacity(faces.len() * nq);
        let mut normals = Vec::with_capacity(faces.len() * nq);
        let mut measures = Vec::with_capacity(faces.len() * nq);
        for (face, coordinates) in faces.iter().enumerate() {
            interpolate_coordinates(&element, coordinates, &identity, &mut fields, &mut cache)?;
            for (point, &w) in rule.weights().iter().enumerate() {
                let tangent = |axis: usize| SVector::<f64, D>::from_fn(|r, _| fields.gradient(point, r, axis));
                let scaled_normal: SVector<f64, D> = match D {
                    2 => {
                        let t = tangent(0);
                        SVector::from_fn(|r, _| if r == 0 { t[1] } else { -t[0] })
                    }
                    _ => {
                        let (ta, tb) = (tangent(0), tangent(1));
                        SVector::from_fn(|r, _| {
                            let (k, l) = ((r + 1) % 3, (r + 2) % 3);
                            ta[k] * tb[l] - ta[l] * tb[k]
                        })
                    }
                };
                let area = scaled_normal.norm();
                if !(area > 0.0) {
                    return Err(ConfigurationError::NonPositiveJacobian {
                        element: face,
                        point,
                        determinant: area,
                    });
                }
                positions.push(SVector::from_fn(|r, _| fields.value(point, r)));
                normals.push(scaled_normal / area);
                measures.push(area * w);
            }
        }

        Ok(Self {
            geometry,
            points,
            points_per_face: nq,
            num_faces: faces.len(),
            positions,
            normals,
            measures,
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn points(&self) -> usize {
        self.points
    }

    pub fn points_per_face(&self) -> usize {
        self.points_per_face
    }

    pub fn num_faces(&self) -> usize {
        self.num_faces
    }

    pub fn position(&self, face: usize, point: usize) -> &SVector<f64, D> {
        &self.positions[face * self.points_per_face + point]
    }

    pub fn normal(&self, face: usize, point: usize) -> &SVector<f64, D> {
        &self.normals[face * self.points_per_face + point]
    }

    pub fn face_measures(&self, face: usize) -> &[f64] {
        &self.measures[face * self.points_per_face..(face + 1) * self.points_per_face]
    }

    /// Total surface measure.
    pub fn measure(&self) -> f64 {
        self.measures.iter().sum()
    }
}
