//! Upstream tracing over a D8 flow direction grid.

use std::collections::VecDeque;

use hydromap_core::error::{HydroError, Result};
use hydromap_core::models::{Raster, WatershedMask};

use crate::d8::D8;

/// Mark the outlet and every cell that drains to it.
///
/// Breadth-first from the outlet: a neighbour joins the watershed when it is in
/// bounds, not nodata, not yet marked, and its code points back at the current
/// cell. Each cell is enqueued at most once. The outlet's own code is never
/// read, so a nodata outlet traces like any other and yields a one-cell
/// watershed when no valid neighbour drains into it.
pub fn trace_upstream(flow_dir: &Raster<i32>, outlet_row: i64, outlet_col: i64) -> Result<WatershedMask> {
    trace_counting(flow_dir, outlet_row, outlet_col).map(|(mask, _)| mask)
}

/// Trace and also report how many cells were dequeued
fn trace_counting(
    flow_dir: &Raster<i32>,
    outlet_row: i64,
    outlet_col: i64,
) -> Result<(WatershedMask, usize)> {
    let (rows, cols) = (flow_dir.rows(), flow_dir.cols());
    if !flow_dir.contains(outlet_row, outlet_col) {
        return Err(HydroError::OutOfBounds { row: outlet_row, col: outlet_col, rows, cols });
    }

    let (outlet_row, outlet_col) = (outlet_row as usize, outlet_col as usize);
    let mut mask = WatershedMask::new(rows, cols);
    mask.insert(outlet_row, outlet_col);

    let codes = flow_dir.data();
    let reverse: [(i64, i64, i32); 8] = D8::ALL.map(|d| {
        let (dr, dc) = d.offset();
        (dr, dc, d.reverse().code())
    });

    let mut queue = VecDeque::from([(outlet_row, outlet_col)]);
    let mut dequeued = 0;

    while let Some((r, c)) = queue.pop_front() {
        dequeued += 1;
        for &(dr, dc, wanted) in &reverse {
            let (nr, nc) = (r as i64 + dr, c as i64 + dc);
            if !flow_dir.contains(nr, nc) {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            if mask.contains(nr, nc) {
                continue;
            }
            let code = codes[nr * cols + nc];
            if flow_dir.is_nodata(code) || code != wanted {
                continue;
            }
            mask.insert(nr, nc);
            queue.push_back((nr, nc));
        }
    }

    tracing::debug!(cells = mask.count(), "Traced upstream area");
    Ok((mask, dequeued))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: Vec<Vec<i32>>) -> Raster<i32> {
        Raster::from_rows(rows).unwrap().with_nodata(0)
    }

    #[test]
    fn test_cross_scenario() {
        let fdir = grid(vec![vec![0, 4, 0], vec![1, 0, 16], vec![0, 64, 0]]);
        let mask = trace_upstream(&fdir, 1, 1).unwrap();
        assert_eq!(mask.to_grid(), vec![vec![0, 1, 0], vec![1, 1, 1], vec![0, 1, 0]]);
    }

    #[test]
    fn test_cross_scenario_with_coded_outlet() {
        // Same neighbours, but the outlet itself drains off-grid to the south
        let fdir = grid(vec![vec![0, 4, 0], vec![1, 4, 16], vec![0, 64, 0]]);
        let mask = trace_upstream(&fdir, 1, 1).unwrap();
        assert_eq!(mask.count(), 5);
    }

    #[test]
    fn test_chain_upstream() {
        // Everything drains east along the row into the last column
        let fdir = grid(vec![vec![1, 1, 1, 4], vec![1, 1, 1, 4], vec![64, 64, 64, 4]]);
        let mask = trace_upstream(&fdir, 0, 2).unwrap();
        assert_eq!(mask.to_grid(), vec![vec![1, 1, 1, 0], vec![0, 0, 0, 0], vec![0, 0, 0, 0]]);

        let mask = trace_upstream(&fdir, 2, 3).unwrap();
        assert_eq!(mask.count(), 12);
    }

    #[test]
    fn test_out_of_bounds() {
        let fdir = grid(vec![vec![1, 1], vec![1, 1]]);
        for (r, c) in [(-1, 0), (0, -1), (2, 0), (0, 2)] {
            let err = trace_upstream(&fdir, r, c).unwrap_err();
            assert!(matches!(err, HydroError::OutOfBounds { .. }));
        }
    }

    #[test]
    fn test_nodata_outlet_is_single_cell() {
        let fdir = grid(vec![vec![1, 1, 0, 0], vec![1, 1, 0, 0]]);
        let mask = trace_upstream(&fdir, 0, 3).unwrap();
        assert_eq!(mask.count(), 1);
        assert!(mask.contains(0, 3));
    }

    #[test]
    fn test_cycle_terminates() {
        // Two cells pointing at each other
        let fdir = grid(vec![vec![1, 16]]);
        let mask = trace_upstream(&fdir, 0, 0).unwrap();
        assert_eq!(mask.count(), 2);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn fdir_strategy() -> impl Strategy<Value = (Raster<i32>, i64, i64)> {
            (1usize..12, 1usize..12).prop_flat_map(|(rows, cols)| {
                let codes = prop_oneof![
                    1 => Just(0),
                    8 => proptest::sample::select(vec![1, 2, 4, 8, 16, 32, 64, 128]),
                ];
                (
                    proptest::collection::vec(codes, rows * cols),
                    0..rows as i64,
                    0..cols as i64,
                )
                    .prop_map(move |(data, r, c)| {
                        (Raster::from_vec(data, rows, cols).unwrap().with_nodata(0), r, c)
                    })
            })
        }

        /// Walk downstream from a cell through marked cells until the outlet
        fn drains_to_outlet(fdir: &Raster<i32>, mask: &WatershedMask, start: (usize, usize), outlet: (usize, usize)) -> bool {
            let mut at = start;
            for _ in 0..=fdir.len() {
                if at == outlet {
                    return true;
                }
                let Some(dir) = fdir.get(at.0, at.1).and_then(D8::from_code) else {
                    return false;
                };
                let (dr, dc) = dir.offset();
                let (nr, nc) = (at.0 as i64 + dr, at.1 as i64 + dc);
                if !fdir.contains(nr, nc) || !mask.contains(nr as usize, nc as usize) {
                    return false;
                }
                at = (nr as usize, nc as usize);
            }
            false
        }

        proptest! {
            #[test]
            fn trace_is_idempotent((fdir, r, c) in fdir_strategy()) {
                let first = trace_upstream(&fdir, r, c).unwrap();
                let second = trace_upstream(&fdir, r, c).unwrap();
                prop_assert_eq!(first, second);
            }

            #[test]
            fn every_marked_cell_drains_to_outlet((fdir, r, c) in fdir_strategy()) {
                let mask = trace_upstream(&fdir, r, c).unwrap();
                let outlet = (r as usize, c as usize);
                for cell in mask.cells() {
                    prop_assert!(drains_to_outlet(&fdir, &mask, (cell.row, cell.col), outlet));
                }
            }

            #[test]
            fn each_cell_visited_at_most_once((fdir, r, c) in fdir_strategy()) {
                let (mask, dequeued) = trace_counting(&fdir, r, c).unwrap();
                prop_assert_eq!(dequeued, mask.count());
                prop_assert!(dequeued <= fdir.len());
            }
        }
    }
}
