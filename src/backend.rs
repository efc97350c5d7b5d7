//! Capability-record dispatch for kernel execution (§9 design notes): the LBM
//! core and orchestrator depend only on "run this per-cell work in
//! parallel", never on a concrete thread pool. `CpuBackend` is the reference
//! implementation; a future SIMT or SIMD backend implements the same trait
//! without touching the orchestrator.

use rayon::prelude::*;

/// Parallel-dispatch capability used by every kernel in the orchestrator.
pub trait Backend {
    /// Evaluates `body(cell_index)` for every cell in `0..n_cells` and
    /// collects the results in index order. Used by kernels that derive a
    /// brand-new field from the previous step's state (LES, phase field,
    /// porous force) without any cross-cell write aliasing.
    fn map_cells<T: Send>(&self, n_cells: usize, body: impl Fn(usize) -> T + Sync + Send) -> Vec<T>;
}

/// Reference CPU backend: maps each kernel to a `rayon` parallel iterator
/// over the flat index range (§5).
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuBackend;

impl Backend for CpuBackend {
    fn map_cells<T: Send>(&self, n_cells: usize, body: impl Fn(usize) -> T + Sync + Send) -> Vec<T> {
        (0..n_cells).into_par_iter().map(body).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_cells_visits_every_index_exactly_once_in_order() {
        let backend = CpuBackend;
        let n = 1000;
        let result = backend.map_cells(n, |id| id * 2);
        assert_eq!(result, (0..n).map(|id| id * 2).collect::<Vec<_>>());
    }
}
