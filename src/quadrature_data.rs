//! Persistent per-quadrature-point state.
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// One state slot of type `S` per (element, quadrature point).
///
/// This is a shared handle: clones refer to the same slots, so the caller can keep a handle to
/// inspect the state after passing one to an integral. Assembly passes that do not commit only
/// ever take read locks and work on copies of the state. Committing passes take the write lock,
/// so that there is a single writer at commit time.
#[derive(Debug)]
pub struct QuadratureData<S> {
    num_elements: usize,
    points_per_element: usize,
    states: Arc<RwLock<Vec<S>>>,
}

impl<S> Clone for QuadratureData<S> {
    fn clone(&self) -> Self {
        Self {
            num_elements: self.num_elements,
            points_per_element: self.points_per_element,
            states: Arc::clone(&self.states),
        }
    }
}

impl<S: Clone> QuadratureData<S> {
    pub fn new(num_elements: usize, points_per_element: usize, initial: S) -> Self {
        Self {
            num_elements,
            points_per_element,
            states: Arc::new(RwLock::new(vec![initial; num_elements * points_per_element])),
        }
    }

    /// Overwrites every slot with `state`.
    pub fn fill(&self, state: S) {
        self.states.write().fill(state);
    }

    pub fn get(&self, element: usize, point: usize) -> S {
        self.states.read()[element * self.points_per_element + point].clone()
    }
}

impl<S> QuadratureData<S> {
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    pub fn points_per_element(&self) -> usize {
        self.points_per_element
    }

    pub fn len(&self) -> usize {
        self.num_elements * self.points_per_element
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read access to all slots, element-major.
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<S>> {
        self.states.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Vec<S>> {
        self.states.write()
    }
}
