//! Integration of quadrature-point sources and fluxes against the element basis.
//!
//! The tensor-product kernels here are the exact transposes of those in
//! [`interpolate`](crate::interpolate): with `s` and `f` the per-point sources and reference
//! fluxes, they accumulate `sum_q s_q phi_a(q) + f_q . grad phi_a(q)` for every dof `a` by
//! contracting the quadrature axes one at a time, x first.
//!
//! All kernels accumulate into the residual, so contributions from several integrals may share
//! the same buffer.
use crate::basis::BasisTable;
use crate::element::ElementBasis;
use crate::interpolate::{QuadratureFields, SumFactorizationCache};
use crate::tensor::det_and_inverse;
use crate::Numeric;
use itertools::izip;

fn check_sizes<T: Numeric>(table: &BasisTable, dim: usize, fields: &QuadratureFields<T>, residual: &[T]) {
    let n = table.num_nodes();
    let q = table.num_points();
    assert_eq!(residual.len(), fields.components() * n.pow(dim as u32), "dof count mismatch");
    assert_eq!(fields.num_points(), q.pow(dim as u32), "quadrature point count mismatch");
    assert_eq!(fields.dim(), dim, "flux dimension mismatch");
}

/// Scales sources by the volume element `det(J) w` and pulls fluxes back to the reference cell,
/// `f_ref = f J^{-T} det(J) w`.
pub fn pull_back<T: Numeric>(fields: &mut QuadratureFields<T>, jacobians: &[f64], weights: &[f64]) {
    let dim = fields.dim();
    assert_eq!(jacobians.len(), fields.num_points() * dim * dim, "Jacobian count mismatch");
    assert_eq!(weights.len(), fields.num_points(), "weight count mismatch");
    let mut j_inv = [0.0; 9];
    let mut physical = [T::zero(); 3];
    for (point, (jacobian, &w)) in izip!(jacobians.chunks_exact(dim * dim), weights).enumerate() {
        let det = det_and_inverse(dim, jacobian, &mut j_inv[..dim * dim]);
        let dv = det * w;
        for i in 0..fields.components() {
            let source = fields.value(point, i);
            fields.set_value(point, i, source * dv);
            for (k, f) in physical.iter_mut().enumerate().take(dim) {
                *f = fields.gradient(point, i, k);
            }
            for j in 0..dim {
                let reference = (0..dim).fold(T::zero(), |acc, k| acc + physical[k] * j_inv[j * dim + k]);
                fields.set_gradient(point, i, j, reference * dv);
            }
        }
    }
}

/// Integrates sources and reference fluxes on the unit segment.
pub fn integrate_segment<T: Numeric>(table: &BasisTable, fields: &QuadratureFields<T>, residual: &mut [T]) {
    check_sizes(table, 1, fields, residual);
    let (n, q) = (table.num_nodes(), table.num_points());
    for i in 0..fields.components() {
        let r = &mut residual[i * n..(i + 1) * n];
        for (dx, r_d) in r.iter_mut().enumerate() {
            for qx in 0..q {
                *r_d += fields.value(qx, i) * table.b(qx, dx) + fields.gradient(qx, i, 0) * table.g(qx, dx);
            }
        }
    }
}

/// Integrates sources and reference fluxes on the unit square.
pub fn integrate_quadrilateral<T: Numeric>(
    table: &BasisTable,
    fields: &QuadratureFields<T>,
    residual: &mut [T],
    cache: &mut SumFactorizationCache<T>,
) {
    check_sizes(table, 2, fields, residual);
    let (n, q) = (table.num_nodes(), table.num_points());
    let (a, _) = cache.prepare(2 * q * n, 0);
    let a_index = move |s: usize, qy: usize, dx: usize| (s * q + qy) * n + dx;

    for i in 0..fields.components() {
        for qy in 0..q {
            for dx in 0..n {
                let mut sum0 = T::zero();
                let mut sum1 = T::zero();
                for qx in 0..q {
                    let point = qy * q + qx;
                    let (b, g) = (table.b(qx, dx), table.g(qx, dx));
                    sum0 += fields.value(point, i) * b + fields.gradient(point, i, 0) * g;
                    sum1 += fields.gradient(point, i, 1) * b;
                }
                a[a_index(0, qy, dx)] = sum0;
                a[a_index(1, qy, dx)] = sum1;
            }
        }

        let r = &mut residual[i * n * n..(i + 1) * n * n];
        for dy in 0..n {
            for dx in 0..n {
                let mut sum = T::zero();
                for qy in 0..q {
                    sum += a[a_index(0, qy, dx)] * table.b(qy, dy) + a[a_index(1, qy, dx)] * table.g(qy, dy);
                }
                r[dy * n + dx] += sum;
            }
        }
    }
}

/// Integrates sources and reference fluxes on the unit cube.
pub fn integrate_hexahedron<T: Numeric>(
    table: &BasisTable,
    fields: &QuadratureFields<T>,
    residual: &mut [T],
    cache: &mut SumFactorizationCache<T>,
) {
    check_sizes(table, 3, fields, residual);
    let (n, q) = (table.num_nodes(), table.num_points());
    let (a1, a2) = cache.prepare(2 * q * n * n, 3 * q * q * n);
    let a1_index = move |s: usize, qz: usize, dy: usize, dx: usize| ((s * q + qz) * n + dy) * n + dx;
    let a2_index = move |s: usize, qz: usize, qy: usize, dx: usize| ((s * q + qz) * q + qy) * n + dx;

    for i in 0..fields.components() {
        // Contract along x
        for qz in 0..q {
            for qy in 0..q {
                for dx in 0..n {
                    let mut sum = [T::zero(); 3];
                    for qx in 0..q {
                        let point = (qz * q + qy) * q + qx;
                        let (b, g) = (table.b(qx, dx), table.g(qx, dx));
                        sum[0] += fields.value(point, i) * b + fields.gradient(point, i, 0) * g;
                        sum[1] += fields.gradient(point, i, 1) * b;
                        sum[2] += fields.gradient(point, i, 2) * b;
                    }
                    for (s, &value) in sum.iter().enumerate() {
                        a2[a2_index(s, qz, qy, dx)] = value;
                    }
                }
            }
        }

        // Contract along y
        for qz in 0..q {
            for dy in 0..n {
                for dx in 0..n {
                    let mut sum0 = T::zero();
                    let mut sum1 = T::zero();
                    for qy in 0..q {
                        let (b, g) = (table.b(qy, dy), table.g(qy, dy));
                        sum0 += a2[a2_index(0, qz, qy, dx)] * b + a2[a2_index(1, qz, qy, dx)] * g;
                        sum1 += a2[a2_index(2, qz, qy, dx)] * b;
                    }
                    a1[a1_index(0, qz, dy, dx)] = sum0;
                    a1[a1_index(1, qz, dy, dx)] = sum1;
                }
            }
        }

        // Contract along z
        let r = &mut residual[i * n * n * n..(i + 1) * n * n * n];
        for dz in 0..n {
            for dy in 0..n {
                for dx in 0..n {
                    let mut sum = T::zero();
                    for qz in 0..q {
                        sum += a1[a1_index(0, qz, dy, dx)] * table.b(qz, dz) + a1[a1_index(1, qz, dy, dx)] * table.g(qz, dz);
                    }
                    r[(dz * n + dy) * n + dx] += sum;
                }
            }
        }
    }
}

/// Integrates sources only, on the unit segment, square or cube of dimension `sources.dim()`.
pub fn integrate_sources_tensor<T: Numeric>(
    table: &BasisTable,
    sources: &QuadratureFields<T>,
    residual: &mut [T],
    cache: &mut SumFactorizationCache<T>,
) {
    let dim = sources.dim();
    check_sizes(table, dim, sources, residual);
    let (n, q) = (table.num_nodes(), table.num_points());
    let nodes_per_component = n.pow(dim as u32);
    let (a1, a2) = cache.prepare(q.pow(dim as u32 - 1) * n, q.pow((dim as u32).saturating_sub(2)) * n * n);

    for i in 0..sources.components() {
        let r = &mut residual[i * nodes_per_component..(i + 1) * nodes_per_component];
        // Contract along x: a1[(rest of points), dx]
        let num_rows = q.pow(dim as u32 - 1);
        for row in 0..num_rows {
            for dx in 0..n {
                a1[row * n + dx] = (0..q).fold(T::zero(), |acc, qx| {
                    acc + sources.value(row * q + qx, i) * table.b(qx, dx)
                });
            }
        }

        match dim {
            1 => {
                for (r_d, &a) in r.iter_mut().zip(a1.iter()) {
                    *r_d += a;
                }
            }
            2 => {
                for dy in 0..n {
                    for dx in 0..n {
                        r[dy * n + dx] += (0..q).fold(T::zero(), |acc, qy| acc + a1[qy * n + dx] * table.b(qy, dy));
                    }
                }
            }
            3 => {
                for qz in 0..q {
                    for dy in 0..n {
                        for dx in 0..n {
                            a2[(qz * n + dy) * n + dx] = (0..q).fold(T::zero(), |acc, qy| {
                                acc + a1[(qz * q + qy) * n + dx] * table.b(qy, dy)
                            });
                        }
                    }
                }
                for dz in 0..n {
                    for dy in 0..n {
                        for dx in 0..n {
                            r[(dz * n + dy) * n + dx] += (0..q).fold(T::zero(), |acc, qz| {
                                acc + a2[(qz * n + dy) * n + dx] * table.b(qz, dz)
                            });
                        }
                    }
                }
            }
            _ => panic!("tensor-product kernels support dimensions 1 to 3"),
        }
    }
}

/// Integrates sources and reference fluxes by contracting against the full element basis.
pub fn integrate_direct<T: Numeric>(basis: &ElementBasis, fields: &QuadratureFields<T>, residual: &mut [T]) {
    let n = basis.num_nodes();
    let dim = basis.dim();
    assert_eq!(residual.len(), fields.components() * n, "dof count mismatch");
    assert_eq!(fields.num_points(), basis.num_points(), "quadrature point count mismatch");
    assert_eq!(fields.dim(), dim, "flux dimension mismatch");

    for i in 0..fields.components() {
        let r = &mut residual[i * n..(i + 1) * n];
        for (a, r_a) in r.iter_mut().enumerate() {
            for point in 0..basis.num_points() {
                *r_a += fields.value(point, i) * basis.value(point, a);
                for j in 0..dim {
                    *r_a += fields.gradient(point, i, j) * basis.gradient(point, a, j);
                }
            }
        }
    }
}

/// Integrates sources only by contracting against the full element basis.
pub fn integrate_sources_direct<T: Numeric>(basis: &ElementBasis, sources: &QuadratureFields<T>, residual: &mut [T]) {
    let n = basis.num_nodes();
    assert_eq!(residual.len(), sources.components() * n, "dof count mismatch");
    assert_eq!(sources.num_points(), basis.num_points(), "quadrature point count mismatch");

    for i in 0..sources.components() {
        let r = &mut residual[i * n..(i + 1) * n];
        for (a, r_a) in r.iter_mut().enumerate() {
            for point in 0..basis.num_points() {
                *r_a += sources.value(point, i) * basis.value(point, a);
            }
        }
    }
}
