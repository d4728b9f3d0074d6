// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Region splitting along a user-drawn cut line

use tracing::debug;

use crate::error::{Error, Result};
use crate::image_ops::{components_by_size, dilate_mask, line_mask, polyline_mask};
use crate::raster::BoundaryRaster;
use crate::types::{Mask, PixelPoint};
use roomplan_core::Element;

/// Half-width of the painted cut line (3 px total)
const CUT_HALF_WIDTH: i32 = 1;

/// Structuring-element radius for merging cut slivers into a half
const FRAGMENT_MERGE_RADIUS: u8 = 2;

/// Structuring-element radius for the wall-zone element fallback,
/// wider than the wall strip so in-wall doors still register
const ELEMENT_ASSIGN_RADIUS: u8 = 7;

/// Cut a region mask along the line from `p1` to `p2`
///
/// The two largest connected components of the remainder become the
/// halves; every smaller sliver is merged into whichever half it
/// overlaps more after dilation, recomputed as the halves grow. Ties
/// go to half A. The result is a strict bipartition of the input mask
/// minus the cut-line pixels.
pub fn split_mask(mask: &Mask, p1: PixelPoint, p2: PixelPoint) -> Result<(Mask, Mask)> {
    let cut = line_mask(mask.width(), mask.height(), p1, p2, CUT_HALF_WIDTH);

    let mut remainder = mask.clone();
    remainder.subtract(&cut);

    let mut components = components_by_size(&remainder);
    if components.len() < 2 {
        return Err(Error::RegionNotDivided);
    }

    let fragments = components.split_off(2);
    let (Some(mut half_b), Some(mut half_a)) = (components.pop(), components.pop()) else {
        return Err(Error::RegionNotDivided);
    };

    for fragment in fragments {
        let overlap_a = fragment.overlap(&dilate_mask(&half_a, FRAGMENT_MERGE_RADIUS));
        let overlap_b = fragment.overlap(&dilate_mask(&half_b, FRAGMENT_MERGE_RADIUS));
        if overlap_a >= overlap_b {
            half_a.union_with(&fragment);
        } else {
            half_b.union_with(&fragment);
        }
    }

    debug!(
        area_a = half_a.area(),
        area_b = half_b.area(),
        "split region into two halves"
    );

    Ok((half_a, half_b))
}

/// Assign door/window elements to the half each one serves
///
/// Elements are re-rendered as thick polylines and compared by raster
/// overlap; when neither half is hit directly (the element sits fully
/// inside the wall strip) the comparison repeats against dilated
/// halves. Ties go to half A.
pub fn assign_elements_to_halves<'a>(
    elements: &[&'a Element],
    half_a: &Mask,
    half_b: &Mask,
    raster: &BoundaryRaster,
) -> (Vec<&'a Element>, Vec<&'a Element>) {
    let dilated_a = dilate_mask(half_a, ELEMENT_ASSIGN_RADIUS);
    let dilated_b = dilate_mask(half_b, ELEMENT_ASSIGN_RADIUS);

    let mut for_a = Vec::new();
    let mut for_b = Vec::new();

    for &element in elements {
        let rendering = render_element(element, raster);

        let mut overlap_a = rendering.overlap(half_a);
        let mut overlap_b = rendering.overlap(half_b);
        if overlap_a == 0 && overlap_b == 0 {
            overlap_a = rendering.overlap(&dilated_a);
            overlap_b = rendering.overlap(&dilated_b);
        }

        if overlap_a >= overlap_b {
            for_a.push(element);
        } else {
            for_b.push(element);
        }
    }

    (for_a, for_b)
}

/// Element paths as 3-px open polylines in raster space
fn render_element(element: &Element, raster: &BoundaryRaster) -> Mask {
    let mut mask = Mask::new(raster.width(), raster.height());
    for path in &element.paths {
        let pixels: Vec<PixelPoint> = path
            .iter()
            .map(|&(x, y)| raster.svg_to_pixel(x, y))
            .collect();
        if pixels.len() < 2 {
            continue;
        }
        mask.union_with(&polyline_mask(
            raster.width(),
            raster.height(),
            &pixels,
            CUT_HALF_WIDTH,
        ));
    }
    mask
}
