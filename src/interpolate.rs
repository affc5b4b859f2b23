//! Evaluation of element fields at quadrature points.
//!
//! The tensor-product kernels contract the nodal dofs against the one-dimensional basis tables
//! one axis at a time, x first, then y, then z. Each pass produces value and derivative
//! contractions together, so that after the final pass the value and all reference-space
//! partial derivatives are available at every quadrature point. For order `p` and `q` points per
//! axis this costs `O(p q^3 + p^2 q^2 + p^3 q)` per component, compared to `O(p^3 q^3)` for a
//! direct contraction.
//!
//! Dofs are laid out component-major with x varying fastest, i.e. dof `(i, dz, dy, dx)` is found
//! at `((i * n + dz) * n + dy) * n + dx`. Quadrature points are numbered
//! `(qz * q + qy) * q + qx`.
use crate::basis::BasisTable;
use crate::element::ElementBasis;
use crate::tensor::det_and_inverse;
use crate::Numeric;

/// Values and gradients of a (possibly vector-valued) field at the points of a quadrature rule.
///
/// Values are stored as `[point][component]`, gradients as `[point][component][axis]`. The same
/// layout describes sources and fluxes on the way back through integration.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureFields<T> {
    num_points: usize,
    components: usize,
    dim: usize,
    values: Vec<T>,
    gradients: Vec<T>,
}

impl<T> Default for QuadratureFields<T> {
    fn default() -> Self {
        Self {
            num_points: 0,
            components: 0,
            dim: 0,
            values: Vec::new(),
            gradients: Vec::new(),
        }
    }
}

impl<T: Numeric> QuadratureFields<T> {
    pub fn new(num_points: usize, components: usize, dim: usize) -> Self {
        Self {
            num_points,
            components,
            dim,
            values: vec![T::zero(); num_points * components],
            gradients: vec![T::zero(); num_points * components * dim],
        }
    }

    /// Reshapes the buffers and sets every entry to zero.
    pub fn reset(&mut self, num_points: usize, components: usize, dim: usize) {
        self.num_points = num_points;
        self.components = components;
        self.dim = dim;
        self.values.clear();
        self.values.resize(num_points * components, T::zero());
        self.gradients.clear();
        self.gradients.resize(num_points * components * dim, T::zero());
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline(always)]
    pub fn value(&self, point: usize, component: usize) -> T {
        self.values[point * self.components + component]
    }

    #[inline(always)]
    pub fn gradient(&self, point: usize, component: usize, axis: usize) -> T {
        self.gradients[(point * self.components + component) * self.dim + axis]
    }

    #[inline(always)]
    pub fn set_value(&mut self, point: usize, component: usize, value: T) {
        self.values[point * self.components + component] = value;
    }

    #[inline(always)]
    pub fn set_gradient(&mut self, point: usize, component: usize, axis: usize, value: T) {
        self.gradients[(point * self.components + component) * self.dim + axis] = value;
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn gradients(&self) -> &[T] {
        &self.gradients
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    pub fn gradients_mut(&mut self) -> &mut [T] {
        &mut self.gradients
    }

    /// Values of all components at a single point.
    pub fn point_values(&self, point: usize) -> &[T] {
        &self.values[point * self.components..(point + 1) * self.components]
    }

    /// Gradients of all components at a single point, row-major `[component][axis]`.
    pub fn point_gradients(&self, point: usize) -> &[T] {
        let stride = self.components * self.dim;
        &self.gradients[point * stride..(point + 1) * stride]
    }
}

/// Scratch buffers holding the partial contractions between sum-factorization passes.
///
/// Reused across components and elements, never shared between threads.
#[derive(Debug)]
pub struct SumFactorizationCache<T> {
    first: Vec<T>,
    second: Vec<T>,
}

impl<T> Default for SumFactorizationCache<T> {
    fn default() -> Self {
        Self {
            first: Vec::new(),
            second: Vec::new(),
        }
    }
}

impl<T: Numeric> SumFactorizationCache<T> {
    pub(crate) fn prepare(&mut self, first_len: usize, second_len: usize) -> (&mut [T], &mut [T]) {
        self.first.clear();
        self.first.resize(first_len, T::zero());
        self.second.clear();
        self.second.resize(second_len, T::zero());
        (&mut self.first, &mut self.second)
    }
}

fn check_sizes<T: Numeric>(table: &BasisTable, dim: usize, dofs: &[T], output: &QuadratureFields<T>) {
    let n = table.num_nodes();
    let q = table.num_points();
    assert_eq!(dofs.len(), output.components() * n.pow(dim as u32), "dof count mismatch");
    assert_eq!(output.num_points(), q.pow(dim as u32), "quadrature point count mismatch");
    assert_eq!(output.dim(), dim, "gradient dimension mismatch");
}

/// Interpolates values and reference gradients on the unit segment.
pub fn interpolate_segment<T: Numeric>(table: &BasisTable, dofs: &[T], output: &mut QuadratureFields<T>) {
    check_sizes(table, 1, dofs, output);
    let (n, q) = (table.num_nodes(), table.num_points());
    for i in 0..output.components() {
        let u = &dofs[i * n..(i + 1) * n];
        for qx in 0..q {
            let mut value = T::zero();
            let mut dx = T::zero();
            for (a, &u_a) in u.iter().enumerate() {
                value += u_a * table.b(qx, a);
                dx += u_a * table.g(qx, a);
            }
            output.set_value(qx, i, value);
            output.set_gradient(qx, i, 0, dx);
        }
    }
}

/// Interpolates values and reference gradients on the unit square.
pub fn interpolate_quadrilateral<T: Numeric>(
    table: &BasisTable,
    dofs: &[T],
    output: &mut QuadratureFields<T>,
    cache: &mut SumFactorizationCache<T>,
) {
    check_sizes(table, 2, dofs, output);
    let (n, q) = (table.num_nodes(), table.num_points());
    let (a1, _) = cache.prepare(2 * n * q, 0);
    let a1_index = move |s: usize, dy: usize, qx: usize| (s * n + dy) * q + qx;

    for i in 0..output.components() {
        let u = &dofs[i * n * n..(i + 1) * n * n];

        for dy in 0..n {
            for qx in 0..q {
                let mut sum_b = T::zero();
                let mut sum_g = T::zero();
                for dx in 0..n {
                    let u_d = u[dy * n + dx];
                    sum_b += u_d * table.b(qx, dx);
                    sum_g += u_d * table.g(qx, dx);
                }
                a1[a1_index(0, dy, qx)] = sum_b;
                a1[a1_index(1, dy, qx)] = sum_g;
            }
        }

        for qy in 0..q {
            for qx in 0..q {
                let mut value = T::zero();
                let mut dx = T::zero();
                let mut dy_ = T::zero();
                for dy in 0..n {
                    let (b, g) = (table.b(qy, dy), table.g(qy, dy));
                    value += a1[a1_index(0, dy, qx)] * b;
                    dx += a1[a1_index(1, dy, qx)] * b;
                    dy_ += a1[a1_index(0, dy, qx)] * g;
                }
                let point = qy * q + qx;
                output.set_value(point, i, value);
                output.set_gradient(point, i, 0, dx);
                output.set_gradient(point, i, 1, dy_);
            }
        }
    }
}

/// Interpolates values and reference gradients on the unit cube.
pub fn interpolate_hexahedron<T: Numeric>(
    table: &BasisTable,
    dofs: &[T],
    output: &mut QuadratureFields<T>,
    cache: &mut SumFactorizationCache<T>,
) {
    check_sizes(table, 3, dofs, output);
    let (n, q) = (table.num_nodes(), table.num_points());
    let (a1, a2) = cache.prepare(2 * n * n * q, 3 * n * q * q);
    let a1_index = move |s: usize, dz: usize, dy: usize, qx: usize| ((s * n + dz) * n + dy) * q + qx;
    let a2_index = move |s: usize, dz: usize, qy: usize, qx: usize| ((s * n + dz) * q + qy) * q + qx;

    for i in 0..output.components() {
        let u = &dofs[i * n * n * n..(i + 1) * n * n * n];

        // Contract along x
        for dz in 0..n {
            for dy in 0..n {
                for qx in 0..q {
                    let mut sum_b = T::zero();
                    let mut sum_g = T::zero();
                    for dx in 0..n {
                        let u_d = u[(dz * n + dy) * n + dx];
                        sum_b += u_d * table.b(qx, dx);
                        sum_g += u_d * table.g(qx, dx);
                    }
                    a1[a1_index(0, dz, dy, qx)] = sum_b;
                    a1[a1_index(1, dz, dy, qx)] = sum_g;
                }
            }
        }

        // Contract along y
        for dz in 0..n {
            for qy in 0..q {
                for qx in 0..q {
                    let mut bb = T::zero();
                    let mut bg = T::zero();
                    let mut gb = T::zero();
                    for dy in 0..n {
                        let (b, g) = (table.b(qy, dy), table.g(qy, dy));
                        bb += a1[a1_index(0, dz, dy, qx)] * b;
                        bg += a1[a1_index(1, dz, dy, qx)] * b;
                        gb += a1[a1_index(0, dz, dy, qx)] * g;
                    }
                    a2[a2_index(0, dz, qy, qx)] = bb;
                    a2[a2_index(1, dz, qy, qx)] = bg;
                    a2[a2_index(2, dz, qy, qx)] = gb;
                }
            }
        }

        // Contract along z
        for qz in 0..q {
            for qy in 0..q {
                for qx in 0..q {
                    let mut value = T::zero();
                    let mut gradient = [T::zero(); 3];
                    for dz in 0..n {
                        let (b, g) = (table.b(qz, dz), table.g(qz, dz));
                        value += a2[a2_index(0, dz, qy, qx)] * b;
                        gradient[0] += a2[a2_index(1, dz, qy, qx)] * b;
                        gradient[1] += a2[a2_index(2, dz, qy, qx)] * b;
                        gradient[2] += a2[a2_index(0, dz, qy, qx)] * g;
                    }
                    let point = (qz * q + qy) * q + qx;
                    output.set_value(point, i, value);
                    for (j, &g_j) in gradient.iter().enumerate() {
                        output.set_gradient(point, i, j, g_j);
                    }
                }
            }
        }
    }
}

/// Interpolates values only, on the unit segment, square or cube of dimension `output.dim()`.
///
/// Gradients in `output` are left untouched.
pub fn interpolate_values_tensor<T: Numeric>(
    table: &BasisTable,
    dofs: &[T],
    output: &mut QuadratureFields<T>,
    cache: &mut SumFactorizationCache<T>,
) {
    let dim = output.dim();
    check_sizes(table, dim, dofs, output);
    let (n, q) = (table.num_nodes(), table.num_points());
    let nodes_per_component = n.pow(dim as u32);
    // Extents of the partially contracted tensor: leading node axes, trailing point axes
    let (a1, a2) = cache.prepare(n.pow(dim as u32 - 1) * q, n.pow((dim as u32).saturating_sub(2)) * q * q);

    for i in 0..output.components() {
        let u = &dofs[i * nodes_per_component..(i + 1) * nodes_per_component];
        let contract_x = |source: &[T], target: &mut [T]| {
            for (row, target_row) in source.chunks_exact(n).zip(target.chunks_exact_mut(q)) {
                for (qx, t) in target_row.iter_mut().enumerate() {
                    *t = row
                        .iter()
                        .enumerate()
                        .fold(T::zero(), |acc, (dx, &u_d)| acc + u_d * table.b(qx, dx));
                }
            }
        };

        match dim {
            1 => {
                contract_x(u, a1);
                for (qx, &value) in a1.iter().enumerate() {
                    output.set_value(qx, i, value);
                }
            }
            2 => {
                contract_x(u, a1);
                for qy in 0..q {
                    for qx in 0..q {
                        let value = (0..n).fold(T::zero(), |acc, dy| acc + a1[dy * q + qx] * table.b(qy, dy));
                        output.set_value(qy * q + qx, i, value);
                    }
                }
            }
            3 => {
                contract_x(u, a1);
                for dz in 0..n {
                    for qy in 0..q {
                        for qx in 0..q {
                            a2[(dz * q + qy) * q + qx] = (0..n)
                                .fold(T::zero(), |acc, dy| acc + a1[(dz * n + dy) * q + qx] * table.b(qy, dy));
                        }
                    }
                }
                for qz in 0..q {
                    for qy in 0..q {
                        for qx in 0..q {
                            let value = (0..n)
                                .fold(T::zero(), |acc, dz| acc + a2[(dz * q + qy) * q + qx] * table.b(qz, dz));
                            output.set_value((qz * q + qy) * q + qx, i, value);
                        }
                    }
                }
            }
            _ => panic!("tensor-product kernels support dimensions 1 to 3"),
        }
    }
}

/// Interpolates values and reference gradients by contracting against the full element basis.
///
/// Serves simplices, which have no tensor structure, and as a reference for the
/// sum-factorized kernels.
pub fn interpolate_direct<T: Numeric>(basis: &ElementBasis, dofs: &[T], output: &mut QuadratureFields<T>) {
    let n = basis.num_nodes();
    let dim = basis.dim();
    assert_eq!(dofs.len(), output.components() * n, "dof count mismatch");
    assert_eq!(output.num_points(), basis.num_points(), "quadrature point count mismatch");
    assert_eq!(output.dim(), dim, "gradient dimension mismatch");

    for i in 0..output.components() {
        let u = &dofs[i * n..(i + 1) * n];
        for point in 0..basis.num_points() {
            let mut value = T::zero();
            let mut gradient = [T::zero(); 3];
            for (a, &u_a) in u.iter().enumerate() {
                value += u_a * basis.value(point, a);
                for (j, g_j) in gradient.iter_mut().enumerate().take(dim) {
                    *g_j += u_a * basis.gradient(point, a, j);
                }
            }
            output.set_value(point, i, value);
            for (j, &g_j) in gradient.iter().enumerate().take(dim) {
                output.set_gradient(point, i, j, g_j);
            }
        }
    }
}

/// Maps reference gradients to physical gradients, `grad_x u = grad_xi u J^{-1}`.
///
/// `jacobians` holds one row-major `dim x dim` matrix `J[r][c] = dx_r / dxi_c` per point.
pub fn to_physical_gradients<T: Numeric>(fields: &mut QuadratureFields<T>, jacobians: &[f64]) {
    let dim = fields.dim();
    assert_eq!(jacobians.len(), fields.num_points() * dim * dim, "Jacobian count mismatch");
    let mut j_inv = [0.0; 9];
    let mut reference = [T::zero(); 3];
    for point in 0..fields.num_points() {
        det_and_inverse(dim, &jacobians[point * dim * dim..(point + 1) * dim * dim], &mut j_inv[..dim * dim]);
        for i in 0..fields.components() {
            for (j, r) in reference.iter_mut().enumerate().take(dim) {
                *r = fields.gradient(point, i, j);
            }
            for k in 0..dim {
                let physical = (0..dim).fold(T::zero(), |acc, j| acc + reference[j] * j_inv[j * dim + k]);
                fields.set_gradient(point, i, k, physical);
            }
        }
    }
}
