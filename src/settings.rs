//! Configuration of assembly passes.
use crate::workgroup::BlockDim;
use serde::{Deserialize, Serialize};

/// How the element loop is scheduled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionPolicy {
    /// One element after another on the calling thread.
    Serial,
    /// Elements distributed over the rayon thread pool, each thread accumulating into a private
    /// buffer that is reduced at the end.
    #[default]
    Parallel,
    /// One emulated work group per element, with basis tables staged in shared scratch memory and
    /// contributions scattered with atomic additions. Only available for hexahedra.
    WorkGroup { block: BlockDim },
}

impl ExecutionPolicy {
    pub fn is_parallel(&self) -> bool {
        !matches!(self, Self::Serial)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AssemblySettings {
    pub execution: ExecutionPolicy,
}

impl AssemblySettings {
    pub fn with_execution(mut self, execution: ExecutionPolicy) -> Self {
        self.execution = execution;
        self
    }
}
