//! Mask-to-polygon conversion by boundary tracing.
//!
//! Cells are treated as 4-connected: cells that only touch at a corner belong to
//! different polygons. Each connected component yields one polygon whose holes are
//! the enclosed background regions. Ring vertices are grid corners mapped through
//! the raster's affine transform.

use std::collections::HashMap;

use geo::orient::{Direction, Orient};
use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use hydromap_core::error::{HydroError, Result};
use hydromap_core::models::{GeoTransform, WatershedMask};

/// Grid corner as (row, col); corners run over `0..=rows` and `0..=cols`
type Corner = (usize, usize);

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Corner,
    to: Corner,
}

impl Edge {
    fn heading(&self) -> (i64, i64) {
        (
            self.to.0 as i64 - self.from.0 as i64,
            self.to.1 as i64 - self.from.1 as i64,
        )
    }
}

/// Convert a watershed mask to polygons in the raster's coordinate space.
///
/// Fails with [`HydroError::EmptyWatershed`] when no cell is marked.
pub fn polygonize(mask: &WatershedMask, transform: &GeoTransform) -> Result<MultiPolygon<f64>> {
    if mask.is_empty() {
        return Err(HydroError::EmptyWatershed);
    }

    let (labels, components) = label_components(mask);
    let mut polygons = Vec::with_capacity(components);

    for edges in boundary_edges(mask, &labels, components) {
        let rings = link_rings(&edges);

        let mut shells = Vec::new();
        let mut holes = Vec::new();
        for ring in rings {
            let ring = drop_collinear(ring);
            if signed_area(&ring) > 0.0 {
                shells.push(ring);
            } else {
                holes.push(ring);
            }
        }

        // A 4-connected component has exactly one outer boundary
        shells.sort_by(|a, b| signed_area(b).total_cmp(&signed_area(a)));
        let mut shells = shells.into_iter();
        let Some(exterior) = shells.next() else {
            continue;
        };

        let interiors = holes.iter().map(|h| to_line_string(h, transform)).collect();
        polygons.push(Polygon::new(to_line_string(&exterior, transform), interiors));
        polygons.extend(shells.map(|extra| Polygon::new(to_line_string(&extra, transform), vec![])));
    }

    if polygons.is_empty() {
        return Err(HydroError::EmptyWatershed);
    }

    tracing::debug!(cells = mask.count(), components, parts = polygons.len(), "Polygonized mask");
    Ok(MultiPolygon::new(polygons).orient(Direction::Default))
}

/// Collapse a single-part result to a plain polygon
pub fn merge_parts(mut parts: MultiPolygon<f64>) -> Geometry<f64> {
    if parts.0.len() == 1 {
        if let Some(polygon) = parts.0.pop() {
            return Geometry::Polygon(polygon);
        }
    }
    Geometry::MultiPolygon(parts)
}

/// 4-connected component labels, 0 for unmarked cells
fn label_components(mask: &WatershedMask) -> (Vec<u32>, usize) {
    let (rows, cols) = (mask.rows(), mask.cols());
    let mut labels = vec![0u32; rows * cols];
    let mut next = 0u32;
    let mut stack = Vec::new();

    for start in mask.cells() {
        if labels[start.row * cols + start.col] != 0 {
            continue;
        }
        next += 1;
        labels[start.row * cols + start.col] = next;
        stack.push((start.row, start.col));

        while let Some((r, c)) = stack.pop() {
            let neighbors = [
                (r.wrapping_sub(1), c),
                (r + 1, c),
                (r, c.wrapping_sub(1)),
                (r, c + 1),
            ];
            for (nr, nc) in neighbors {
                if mask.contains(nr, nc) && labels[nr * cols + nc] == 0 {
                    labels[nr * cols + nc] = next;
                    stack.push((nr, nc));
                }
            }
        }
    }

    (labels, next as usize)
}

/// Directed boundary edges bucketed by component, clockwise on screen (row axis
/// pointing down). Bucket `i` holds the edges of label `i + 1`.
fn boundary_edges(mask: &WatershedMask, labels: &[u32], components: usize) -> Vec<Vec<Edge>> {
    let cols = mask.cols();
    let mut buckets: Vec<Vec<Edge>> = vec![Vec::new(); components];

    for cell in mask.cells() {
        let (r, c) = (cell.row, cell.col);
        let label = labels[r * cols + c];
        let Some(edges) = (label as usize).checked_sub(1).and_then(|i| buckets.get_mut(i)) else {
            continue;
        };
        if r == 0 || !mask.contains(r - 1, c) {
            edges.push(Edge { from: (r, c), to: (r, c + 1) });
        }
        if !mask.contains(r, c + 1) {
            edges.push(Edge { from: (r, c + 1), to: (r + 1, c + 1) });
        }
        if !mask.contains(r + 1, c) {
            edges.push(Edge { from: (r + 1, c + 1), to: (r + 1, c) });
        }
        if c == 0 || !mask.contains(r, c - 1) {
            edges.push(Edge { from: (r + 1, c), to: (r, c) });
        }
    }

    buckets
}

/// Link edges into closed rings, turning right first at corners shared by diagonal cells
fn link_rings(edges: &[Edge]) -> Vec<Vec<Corner>> {
    let mut outgoing: HashMap<Corner, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (idx, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.from).or_default().push(idx);
    }

    let successor = |idx: usize| -> Option<usize> {
        let (dr, dc) = edges[idx].heading();
        let candidates = outgoing.get(&edges[idx].to)?;
        if candidates.len() == 1 {
            return Some(candidates[0]);
        }
        // Right, straight, left in a row-down frame
        let preferences = [(dc, -dr), (dr, dc), (-dc, dr)];
        preferences
            .iter()
            .find_map(|want| candidates.iter().copied().find(|c| edges[*c].heading() == *want))
    };

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }

        let mut ring = vec![edges[start].from];
        let mut current = start;
        loop {
            used[current] = true;
            ring.push(edges[current].to);
            match successor(current) {
                Some(next) if next != start && !used[next] => current = next,
                _ => break,
            }
        }
        rings.push(ring);
    }

    rings
}

/// Remove vertices lying on a straight run; keeps the ring closed
fn drop_collinear(ring: Vec<Corner>) -> Vec<Corner> {
    // ring is closed: first == last
    let open = &ring[..ring.len() - 1];
    let n = open.len();
    if n < 4 {
        return ring;
    }

    let direction = |a: Corner, b: Corner| {
        ((b.0 as i64 - a.0 as i64).signum(), (b.1 as i64 - a.1 as i64).signum())
    };

    let mut kept: Vec<Corner> = (0..n)
        .filter(|&i| {
            let prev = open[(i + n - 1) % n];
            let next = open[(i + 1) % n];
            direction(prev, open[i]) != direction(open[i], next)
        })
        .map(|i| open[i])
        .collect();

    if let Some(first) = kept.first().copied() {
        kept.push(first);
    }
    kept
}

/// Shoelace area in (col, row) space; positive for the clockwise-on-screen outer boundary
fn signed_area(ring: &[Corner]) -> f64 {
    ring.windows(2)
        .map(|w| {
            let (r0, c0) = (w[0].0 as f64, w[0].1 as f64);
            let (r1, c1) = (w[1].0 as f64, w[1].1 as f64);
            c0 * r1 - c1 * r0
        })
        .sum::<f64>()
        / 2.0
}

fn to_line_string(ring: &[Corner], transform: &GeoTransform) -> LineString<f64> {
    ring.iter()
        .map(|&(row, col)| {
            let (x, y) = transform.corner(row, col);
            Coord { x, y }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn mask(grid: &[&[u8]]) -> WatershedMask {
        let mut mask = WatershedMask::new(grid.len(), grid[0].len());
        for (r, row) in grid.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                if *v == 1 {
                    mask.insert(r, c);
                }
            }
        }
        mask
    }

    #[test]
    fn test_empty_mask_fails() {
        let err = polygonize(&WatershedMask::new(3, 3), &GeoTransform::unit()).unwrap_err();
        assert!(matches!(err, HydroError::EmptyWatershed));
    }

    #[test]
    fn test_single_cell_is_unit_square() {
        let mp = polygonize(&mask(&[&[0, 0], &[0, 1]]), &GeoTransform::unit()).unwrap();
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].exterior().0.len(), 5);
        assert_eq!(mp.unsigned_area(), 1.0);
    }

    #[test]
    fn test_cross_has_twelve_corners() {
        let mp = polygonize(&mask(&[&[0, 1, 0], &[1, 1, 1], &[0, 1, 0]]), &GeoTransform::unit()).unwrap();
        assert_eq!(mp.0.len(), 1);
        // 12 distinct corners plus the closing vertex
        assert_eq!(mp.0[0].exterior().0.len(), 13);
        assert_eq!(mp.unsigned_area(), 5.0);
    }

    #[test]
    fn test_ring_with_hole() {
        let grid: &[&[u8]] = &[&[1, 1, 1], &[1, 0, 1], &[1, 1, 1]];
        let mp = polygonize(&mask(grid), &GeoTransform::unit()).unwrap();
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert_eq!(mp.unsigned_area(), 8.0);
    }

    #[test]
    fn test_diagonal_cells_are_separate_parts() {
        let mp = polygonize(&mask(&[&[1, 0], &[0, 1]]), &GeoTransform::unit()).unwrap();
        assert_eq!(mp.0.len(), 2);
        assert!(matches!(merge_parts(mp), Geometry::MultiPolygon(_)));
    }

    #[test]
    fn test_pinched_hole_touching_at_corner() {
        // Background cell (1,1) is enclosed on all sides except diagonally at (2,2)
        let grid: &[&[u8]] = &[&[1, 1, 1, 0], &[1, 0, 1, 0], &[1, 1, 0, 1], &[0, 0, 1, 1]];
        let mp = polygonize(&mask(grid), &GeoTransform::unit()).unwrap();
        let cells: usize = grid.iter().map(|r| r.iter().filter(|v| **v == 1).count()).sum();
        assert_eq!(mp.unsigned_area(), cells as f64);
    }

    #[test]
    fn test_transform_applied_to_vertices() {
        let gt = GeoTransform::new(-78.0, 39.0, 0.5, -0.5);
        let mp = polygonize(&mask(&[&[1]]), &gt).unwrap();
        let xs: Vec<f64> = mp.0[0].exterior().0.iter().map(|c| c.x).collect();
        let ys: Vec<f64> = mp.0[0].exterior().0.iter().map(|c| c.y).collect();
        assert_eq!(xs.iter().cloned().fold(f64::INFINITY, f64::min), -78.0);
        assert_eq!(xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max), -77.5);
        assert_eq!(ys.iter().cloned().fold(f64::INFINITY, f64::min), 38.5);
        assert_eq!(mp.unsigned_area(), 0.25);
    }

    #[test]
    fn test_many_components_in_large_grid() {
        // Diagonal chain: cells touch only at corners, so each is its own part
        let n = 2000;
        let mut mask = WatershedMask::new(n, n);
        for i in 0..n {
            mask.insert(i, i);
        }

        let mp = polygonize(&mask, &GeoTransform::unit()).unwrap();
        assert_eq!(mp.0.len(), n);
        assert_eq!(mp.unsigned_area(), n as f64);
        assert!(mp.0.iter().all(|p| p.exterior().0.len() == 5));
    }

    #[test]
    fn test_single_component_merges_to_polygon() {
        let mp = polygonize(&mask(&[&[1, 1]]), &GeoTransform::unit()).unwrap();
        assert!(matches!(merge_parts(mp), Geometry::Polygon(_)));
    }
}
