// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary extraction: region mask to simplified closed polygon

use crate::error::{Error, Result};
use crate::image_ops::components_by_size;
use crate::types::{Mask, PixelPoint};

/// Starting perpendicular-distance tolerance for simplification
const SIMPLIFY_EPSILON: f64 = 0.5;

/// Tolerance growth factor per simplification round
const SIMPLIFY_GROWTH: f64 = 1.5;

/// Tolerance ceiling; past this the best achieved result is returned
const SIMPLIFY_EPSILON_CEILING: f64 = 64.0;

/// Moore neighborhood in clockwise order starting west, y down
const NEIGHBORS: [(i32, i32); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

/// Trace the outer boundary of a mask as an ordered pixel polygon
///
/// When the mask holds several disconnected components the largest one
/// wins. Fails only on a mask with no foreground at all.
pub fn mask_to_contour(mask: &Mask) -> Result<Vec<PixelPoint>> {
    let components = components_by_size(mask);
    let largest = components.first().ok_or(Error::EmptyMask)?;

    // Row-major first pixel: its west and north neighbors are background
    let (sx, sy) = largest
        .set_pixels()
        .next()
        .map(|(x, y)| (x as i32, y as i32))
        .ok_or(Error::EmptyMask)?;
    let start = (sx, sy);

    if largest.area() == 1 {
        return Ok(vec![start]);
    }

    // Moore-neighbor trace with Jacob's stopping criterion
    let mut contour = vec![start];
    let mut current = start;
    let mut backtrack = (sx - 1, sy);
    let initial_backtrack = backtrack;
    let step_cap = 4 * largest.area() + 8;

    while contour.len() <= step_cap {
        let Some(bi) = neighbor_index(current, backtrack) else {
            break;
        };
        let mut advanced = false;
        for k in 1..=8 {
            let idx = (bi + k) % 8;
            let next = (
                current.0 + NEIGHBORS[idx].0,
                current.1 + NEIGHBORS[idx].1,
            );
            if largest.get(next.0, next.1) {
                let prev_idx = (bi + k - 1) % 8;
                let new_backtrack = (
                    current.0 + NEIGHBORS[prev_idx].0,
                    current.1 + NEIGHBORS[prev_idx].1,
                );
                if next == start && new_backtrack == initial_backtrack {
                    return Ok(contour);
                }
                current = next;
                backtrack = new_backtrack;
                contour.push(current);
                advanced = true;
                break;
            }
        }
        if !advanced {
            break;
        }
    }
    Ok(contour)
}

fn neighbor_index(center: PixelPoint, neighbor: PixelPoint) -> Option<usize> {
    let delta = (neighbor.0 - center.0, neighbor.1 - center.1);
    NEIGHBORS.iter().position(|&d| d == delta)
}

/// Reduce a contour to at most `max_vertices` points
///
/// Runs polygon approximation with a geometrically growing tolerance
/// until the budget is met. At the tolerance ceiling the best achieved
/// simplification is returned even if still over budget.
pub fn simplify(contour: &[PixelPoint], max_vertices: usize) -> Vec<PixelPoint> {
    if contour.len() <= max_vertices {
        return contour.to_vec();
    }

    let mut epsilon = SIMPLIFY_EPSILON;
    let mut best = contour.to_vec();
    while epsilon <= SIMPLIFY_EPSILON_CEILING {
        let simplified = douglas_peucker(contour, epsilon);
        if simplified.len() < best.len() {
            best = simplified;
        }
        if best.len() <= max_vertices {
            break;
        }
        epsilon *= SIMPLIFY_GROWTH;
    }
    best
}

/// Nearest contour vertex by squared distance, first occurrence on ties
pub fn snap_to_contour(point: PixelPoint, contour: &[PixelPoint]) -> Option<PixelPoint> {
    let mut best: Option<(i64, PixelPoint)> = None;
    for &vertex in contour {
        let dx = i64::from(vertex.0 - point.0);
        let dy = i64::from(vertex.1 - point.1);
        let dist = dx * dx + dy * dy;
        if best.map_or(true, |(d, _)| dist < d) {
            best = Some((dist, vertex));
        }
    }
    best.map(|(_, v)| v)
}

/// Douglas-Peucker line simplification
fn douglas_peucker(points: &[PixelPoint], epsilon: f64) -> Vec<PixelPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let first = points[0];
    let last = points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_idx = 0;
    for (i, &point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance(point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        let left = douglas_peucker(&points[..=max_idx], epsilon);
        let right = douglas_peucker(&points[max_idx..], epsilon);
        let mut result = left;
        result.extend_from_slice(&right[1..]);
        result
    } else {
        vec![first, last]
    }
}

fn perpendicular_distance(point: PixelPoint, line_start: PixelPoint, line_end: PixelPoint) -> f64 {
    let (px, py) = (point.0 as f64, point.1 as f64);
    let (ax, ay) = (line_start.0 as f64, line_start.1 as f64);
    let (bx, by) = (line_end.0 as f64, line_end.1 as f64);

    let dx = bx - ax;
    let dy = by - ay;
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    ((dy * px - dx * py + bx * ay - by * ax).abs()) / length_sq.sqrt()
}
