//! Block-parallel execution in the style of a GPU work group.
//!
//! A [`WorkGroup`] processes one element with a block of logical threads. The basis tables are
//! staged into shared scratch memory once, and every sum-factorization pass is a phase in which
//! all threads run in lockstep over block-strided index ranges, followed by a barrier. A phase
//! only reads what earlier phases wrote, so the threads of a phase never race.
//!
//! Cross-element accumulation goes through [`AtomicAccumulator`].
use crate::basis::BasisTable;
use crate::error::ConfigurationError;
use crate::interpolate::QuadratureFields;
use crate::Numeric;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of threads along each axis of a work group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockDim {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl BlockDim {
    pub fn new(x: usize, y: usize, z: usize) -> Self {
        Self { x, y, z }
    }

    pub fn num_threads(&self) -> usize {
        self.x * self.y * self.z
    }
}

/// Position of a thread within its work group.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ThreadIdx {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

/// Scratch memory visible to every thread of a work group.
#[derive(Debug)]
pub struct SharedMemory<T> {
    b: Vec<f64>,
    g: Vec<f64>,
    first: Vec<T>,
    second: Vec<T>,
}

impl<T> Default for SharedMemory<T> {
    fn default() -> Self {
        Self {
            b: Vec::new(),
            g: Vec::new(),
            first: Vec::new(),
            second: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct WorkGroup<T> {
    block: BlockDim,
    shared: SharedMemory<T>,
    barriers: usize,
}

fn strided(start: usize, end: usize, step: usize) -> impl Iterator<Item = usize> {
    (start..end).step_by(step)
}

impl<T: Numeric> WorkGroup<T> {
    pub fn new(block: BlockDim) -> Result<Self, ConfigurationError> {
        if block.num_threads() == 0 {
            return Err(ConfigurationError::EmptyBlock);
        }
        Ok(Self::with_block(block))
    }

    /// Creates a group without validating the block, which must be checked by the caller.
    pub(crate) fn with_block(block: BlockDim) -> Self {
        Self {
            block,
            shared: SharedMemory::default(),
            barriers: 0,
        }
    }

    pub fn block(&self) -> BlockDim {
        self.block
    }

    /// Number of barriers executed since the group was created.
    pub fn barriers(&self) -> usize {
        self.barriers
    }

    /// Runs `kernel` for every thread of the block, then synchronizes.
    fn phase(&mut self, mut kernel: impl FnMut(ThreadIdx, &mut SharedMemory<T>)) {
        let BlockDim { x, y, z } = self.block;
        for tz in 0..z {
            for ty in 0..y {
                for tx in 0..x {
                    kernel(ThreadIdx { x: tx, y: ty, z: tz }, &mut self.shared);
                }
            }
        }
        self.barrier();
    }

    fn barrier(&mut self) {
        self.barriers += 1;
    }

    /// Copies the basis tables into shared memory, using the `z == 0` plane of threads.
    fn stage(&mut self, table: &BasisTable, first_len: usize, second_len: usize) {
        let (n, q) = (table.num_nodes(), table.num_points());
        let block = self.block;
        let shared = &mut self.shared;
        shared.b.resize(q * n, 0.0);
        shared.g.resize(q * n, 0.0);
        shared.first.clear();
        shared.first.resize(first_len, T::zero());
        shared.second.clear();
        shared.second.resize(second_len, T::zero());
        self.phase(|t, shared| {
            if t.z == 0 {
                for qi in strided(t.y, q, block.y) {
                    for a in strided(t.x, n, block.x) {
                        shared.b[qi * n + a] = table.b(qi, a);
                        shared.g[qi * n + a] = table.g(qi, a);
                    }
                }
            }
        });
    }

    /// Interpolates values and reference gradients on the unit cube.
    ///
    /// Produces the same result as [`interpolate_hexahedron`](crate::interpolate::interpolate_hexahedron)
    /// for any block shape.
    pub fn interpolate_hexahedron(&mut self, table: &BasisTable, dofs: &[T], output: &mut QuadratureFields<T>) {
        let (n, q) = (table.num_nodes(), table.num_points());
        let components = output.components();
        assert_eq!(dofs.len(), components * n * n * n, "dof count mismatch");
        assert_eq!(output.num_points(), q * q * q, "quadrature point count mismatch");
        assert_eq!(output.dim(), 3, "gradient dimension mismatch");

        let block = self.block;
        self.stage(table, 2 * n * n * q, 3 * n * q * q);
        let a1_index = move |s: usize, dz: usize, dy: usize, qx: usize| ((s * n + dz) * n + dy) * q + qx;
        let a2_index = move |s: usize, dz: usize, qy: usize, qx: usize| ((s * n + dz) * q + qy) * q + qx;

        for i in 0..components {
            let u = &dofs[i * n * n * n..(i + 1) * n * n * n];

            self.phase(|t, shared| {
                for dz in strided(t.z, n, block.z) {
                    for dy in strided(t.y, n, block.y) {
                        for qx in strided(t.x, q, block.x) {
                            let mut sum_b = T::zero();
                            let mut sum_g = T::zero();
                            for dx in 0..n {
                                let u_d = u[(dz * n + dy) * n + dx];
                                sum_b += u_d * shared.b[qx * n + dx];
                                sum_g += u_d * shared.g[qx * n + dx];
                            }
                            shared.first[a1_index(0, dz, dy, qx)] = sum_b;
                            shared.first[a1_index(1, dz, dy, qx)] = sum_g;
                        }
                    }
                }
            });

            self.phase(|t, shared| {
                for dz in strided(t.z, n, block.z) {
                    for qy in strided(t.y, q, block.y) {
                        for qx in strided(t.x, q, block.x) {
                            let mut sums = [T::zero(); 3];
                            for dy in 0..n {
                                let (b, g) = (shared.b[qy * n + dy], shared.g[qy * n + dy]);
                                sums[0] += shared.first[a1_index(0, dz, dy, qx)] * b;
                                sums[1] += shared.first[a1_index(1, dz, dy, qx)] * b;
                                sums[2] += shared.first[a1_index(0, dz, dy, qx)] * g;
                            }
                            for (s, &sum) in sums.iter().enumerate() {
                                shared.second[a2_index(s, dz, qy, qx)] = sum;
                            }
                        }
                    }
                }
            });

            self.phase(|t, shared| {
                for qz in strided(t.z, q, block.z) {
                    for qy in strided(t.y, q, block.y) {
                        for qx in strided(t.x, q, block.x) {
                            let mut value = T::zero();
                            let mut gradient = [T::zero(); 3];
                            for dz in 0..n {
                                let (b, g) = (shared.b[qz * n + dz], shared.g[qz * n + dz]);
                                value += shared.second[a2_index(0, dz, qy, qx)] * b;
                                gradient[0] += shared.second[a2_index(1, dz, qy, qx)] * b;
                                gradient[1] += shared.second[a2_index(2, dz, qy, qx)] * b;
                                gradient[2] += shared.second[a2_index(0, dz, qy, qx)] * g;
                            }
                            let point = (qz * q + qy) * q + qx;
                            output.set_value(point, i, value);
                            for (j, &g_j) in gradient.iter().enumerate() {
                                output.set_gradient(point, i, j, g_j);
                            }
                        }
                    }
                }
            });
        }
    }

    /// Integrates sources and reference fluxes on the unit cube, accumulating into `residual`.
    ///
    /// Produces the same result as [`integrate_hexahedron`](crate::integrate::integrate_hexahedron)
    /// for any block shape.
    pub fn integrate_hexahedron(&mut self, table: &BasisTable, fields: &QuadratureFields<T>, residual: &mut [T]) {
        let (n, q) = (table.num_nodes(), table.num_points());
        let components = fields.components();
        assert_eq!(residual.len(), components * n * n * n, "dof count mismatch");
        assert_eq!(fields.num_points(), q * q * q, "quadrature point count mismatch");
        assert_eq!(fields.dim(), 3, "flux dimension mismatch");

        let block = self.block;
        self.stage(table, 2 * q * n * n, 3 * q * q * n);
        let a1_index = move |s: usize, qz: usize, dy: usize, dx: usize| ((s * q + qz) * n + dy) * n + dx;
        let a2_index = move |s: usize, qz: usize, qy: usize, dx: usize| ((s * q + qz) * q + qy) * n + dx;

        for i in 0..components {
            self.phase(|t, shared| {
                for qz in strided(t.z, q, block.z) {
                    for qy in strided(t.y, q, block.y) {
                        for dx in strided(t.x, n, block.x) {
                            let mut sums = [T::zero(); 3];
                            for qx in 0..q {
                                let point = (qz * q + qy) * q + qx;
                                let (b, g) = (shared.b[qx * n + dx], shared.g[qx * n + dx]);
                                sums[0] += fields.value(point, i) * b + fields.gradient(point, i, 0) * g;
                                sums[1] += fields.gradient(point, i, 1) * b;
                                sums[2] += fields.gradient(point, i, 2) * b;
                            }
                            for (s, &sum) in sums.iter().enumerate() {
                                shared.second[a2_index(s, qz, qy, dx)] = sum;
                            }
                        }
                    }
                }
            });

            self.phase(|t, shared| {
                for qz in strided(t.z, q, block.z) {
                    for dy in strided(t.y, n, block.y) {
                        for dx in strided(t.x, n, block.x) {
                            let mut sum0 = T::zero();
                            let mut sum1 = T::zero();
                            for qy in 0..q {
                                let (b, g) = (shared.b[qy * n + dy], shared.g[qy * n + dy]);
                                sum0 += shared.second[a2_index(0, qz, qy, dx)] * b
                                    + shared.second[a2_index(1, qz, qy, dx)] * g;
                                sum1 += shared.second[a2_index(2, qz, qy, dx)] * b;
                            }
                            shared.first[a1_index(0, qz, dy, dx)] = sum0;
                            shared.first[a1_index(1, qz, dy, dx)] = sum1;
                        }
                    }
                }
            });

            let r = &mut residual[i * n * n * n..(i + 1) * n * n * n];
            self.phase(|t, shared| {
                for dz in strided(t.z, n, block.z) {
                    for dy in strided(t.y, n, block.y) {
                        for dx in strided(t.x, n, block.x) {
                            let mut sum = T::zero();
                            for qz in 0..q {
                                let (b, g) = (shared.b[qz * n + dz], shared.g[qz * n + dz]);
                                sum += shared.first[a1_index(0, qz, dy, dx)] * b + shared.first[a1_index(1, qz, dy, dx)] * g;
                            }
                            r[(dz * n + dy) * n + dx] += sum;
                        }
                    }
                }
            });
        }
    }
}

/// A vector of `f64` supporting concurrent additions.
///
/// Each entry stores the bit pattern of an `f64`; additions retry a compare-and-swap until no
/// other thread modified the entry in between.
#[derive(Debug)]
pub struct AtomicAccumulator {
    data: Vec<AtomicU64>,
}

impl AtomicAccumulator {
    pub fn new(len: usize) -> Self {
        Self {
            data: (0..len).map(|_| AtomicU64::new(0.0f64.to_bits())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn add(&self, index: usize, value: f64) {
        let entry = &self.data[index];
        let mut current = entry.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(current) + value).to_bits();
            match entry.compare_exchange_weak(current, new, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
            .into_iter()
            .map(|entry| f64::from_bits(entry.into_inner()))
            .collect()
    }
}
