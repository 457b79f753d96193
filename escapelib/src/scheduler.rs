use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{rectangle::Rectangle, Error};

/// Splits `bounds` into one tile per available worker and runs `job` on all
/// tiles in parallel on the global thread pool.
///
/// At most `cell_count` tiles are created, so every worker receives a
/// non-empty rectangle. The tiles are disjoint and cover `bounds` exactly,
/// which lets jobs write through shared buffer handles without locking as
/// long as each stays inside its own tile. The call returns only after every
/// job has finished; the first reported failure is propagated to the caller.
pub(crate) fn for_each_tile<F>(bounds: Rectangle, job: F) -> Result<(), Error>
where
    F: Fn(Rectangle) -> Result<(), Error> + Sync,
{
    let workers = rayon::current_num_threads().max(1) as u64;
    let parts = workers.min(bounds.cell_count()) as u32;
    let tiles = bounds.cut_in_n(parts)?;

    tiles
        .into_par_iter()
        .map(|tile| job(tile).map_err(|error| Error::WorkerFailure(Box::new(error))))
        .collect()
}

#[cfg(test)]
mod test_scheduler {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[test]
    fn every_cell_is_visited_exactly_once() {
        let bounds = Rectangle::new(0, 0, 63, 47);
        let visited = AtomicU64::new(0);
        for_each_tile(bounds, |tile| {
            visited.fetch_add(tile.cell_count(), Ordering::Relaxed);
            Ok(())
        })
        .unwrap();
        assert_eq!(visited.load(Ordering::Relaxed), bounds.cell_count());
    }

    #[test]
    fn a_failing_worker_surfaces_as_a_worker_failure() {
        let bounds = Rectangle::new(0, 0, 15, 15);
        let result = for_each_tile(bounds, |tile| {
            if tile.x1 == 0 && tile.y1 == 0 {
                Err(Error::EmptyImage)
            } else {
                Ok(())
            }
        });
        assert!(matches!(result, Err(Error::WorkerFailure(_))));
    }

    #[test]
    fn tiny_bounds_spawn_no_more_tiles_than_cells() {
        // A single cell must work even on a many-core machine.
        let bounds = Rectangle::new(5, 5, 5, 5);
        for_each_tile(bounds, |tile| {
            assert_eq!(tile, bounds);
            Ok(())
        })
        .unwrap();
    }
}
