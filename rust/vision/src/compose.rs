// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Categorical mask composition
//!
//! Renders a fixed-size grayscale mask per room or per unit with four
//! pixel categories: void (0), floor (85), door (170), window (255).
//! Doors and windows are detected where their rendered paths fall into
//! the "boundary zone", the ring between a dilated and an eroded copy
//! of the region mask that reaches into the surrounding wall strip.

use image::{GrayImage, Luma};
use tracing::debug;

use crate::error::{Error, Result};
use crate::image_ops::{dilate_mask, erode_mask, pad_to_square, polyline_mask, resize_nearest};
use crate::raster::BoundaryRaster;
use crate::types::{Mask, PixelPoint, Room};
use roomplan_core::Element;

/// Output side length of every composed mask
pub const MASK_SIZE: u32 = 120;

/// Crop margin in raster pixels, reaching into adjoining wall thickness
const CROP_MARGIN: u32 = 15;

/// Category values
pub const VALUE_VOID: u8 = 0;
pub const VALUE_FLOOR: u8 = 85;
pub const VALUE_DOOR: u8 = 170;
pub const VALUE_WINDOW: u8 = 255;

/// Dilation radius defining the outer rim of the boundary zone
const ZONE_DILATE_RADIUS: u8 = 5;

/// Erosion radius defining the inner rim of the boundary zone
const ZONE_ERODE_RADIUS: u8 = 1;

/// Half-width of rendered element polylines (3 px)
const ELEMENT_HALF_WIDTH: i32 = 1;

/// Fraction of the split seam left void at each end, modeling the
/// residual wall stubs of an interior partition opening
const SEAM_CORNER_FRACTION: f64 = 0.175;

/// Composes categorical masks against one boundary raster and its
/// door/window element sets
pub struct MaskComposer<'a> {
    raster: &'a BoundaryRaster,
    doors: Vec<&'a Element>,
    windows: Vec<&'a Element>,
}

/// Crop window in raster space, inclusive
#[derive(Debug, Clone, Copy)]
struct CropWindow {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl CropWindow {
    fn width(&self) -> u32 {
        self.x1 - self.x0 + 1
    }

    fn height(&self) -> u32 {
        self.y1 - self.y0 + 1
    }
}

impl<'a> MaskComposer<'a> {
    pub fn new(
        raster: &'a BoundaryRaster,
        doors: Vec<&'a Element>,
        windows: Vec<&'a Element>,
    ) -> Self {
        Self {
            raster,
            doors,
            windows,
        }
    }

    /// 120x120 categorical mask for one room
    pub fn room_mask(&self, room: &Room) -> Result<GrayImage> {
        let window = self.crop_window(std::slice::from_ref(&room.mask))?;
        let crop = room.mask.crop(window.x0, window.y0, window.x1, window.y1);

        let mut canvas = floor_fill(&crop);
        let zone = boundary_zone(&crop);
        self.overlay_elements(&mut canvas, &zone, &self.doors, window, VALUE_DOOR);
        self.overlay_elements(&mut canvas, &zone, &self.windows, window, VALUE_WINDOW);
        if let Some(seam) = room.split_seam {
            overlay_seam_door(&mut canvas, &zone, seam, window);
        }

        Ok(finish(canvas))
    }

    /// 120x120 categorical mask aggregating all rooms of one unit
    pub fn unit_mask(&self, rooms: &[&Room]) -> Result<GrayImage> {
        let masks: Vec<Mask> = rooms.iter().map(|r| r.mask.clone()).collect();
        let window = self.crop_window(&masks)?;

        let mut combined = Mask::new(window.width(), window.height());
        for mask in &masks {
            combined.union_with(&mask.crop(window.x0, window.y0, window.x1, window.y1));
        }

        let mut canvas = floor_fill(&combined);
        let zone = boundary_zone(&combined);
        self.overlay_elements(&mut canvas, &zone, &self.doors, window, VALUE_DOOR);
        self.overlay_elements(&mut canvas, &zone, &self.windows, window, VALUE_WINDOW);
        for room in rooms {
            if let Some(seam) = room.split_seam {
                let crop = room.mask.crop(window.x0, window.y0, window.x1, window.y1);
                let room_zone = boundary_zone(&crop);
                overlay_seam_door(&mut canvas, &room_zone, seam, window);
            }
        }

        Ok(finish(canvas))
    }

    /// Margin-expanded crop window covering all given masks
    fn crop_window(&self, masks: &[Mask]) -> Result<CropWindow> {
        let mut bbox: Option<(u32, u32, u32, u32)> = None;
        for mask in masks {
            if let Some((x0, y0, x1, y1)) = mask.pixel_bbox() {
                bbox = Some(match bbox {
                    None => (x0, y0, x1, y1),
                    Some((a, b, c, d)) => (a.min(x0), b.min(y0), c.max(x1), d.max(y1)),
                });
            }
        }
        let (x0, y0, x1, y1) = bbox.ok_or(Error::EmptyMask)?;
        Ok(CropWindow {
            x0: x0.saturating_sub(CROP_MARGIN),
            y0: y0.saturating_sub(CROP_MARGIN),
            x1: (x1 + CROP_MARGIN).min(self.raster.width() - 1),
            y1: (y1 + CROP_MARGIN).min(self.raster.height() - 1),
        })
    }

    /// Paint element renderings with `value` where they hit the zone
    fn overlay_elements(
        &self,
        canvas: &mut GrayImage,
        zone: &Mask,
        elements: &[&Element],
        window: CropWindow,
        value: u8,
    ) {
        let (w, h) = (window.width(), window.height());
        for element in elements {
            let (ex0, ey0) = self.raster.svg_to_pixel(element.bbox.x, element.bbox.y);
            let (ex1, ey1) = self
                .raster
                .svg_to_pixel(element.bbox.right(), element.bbox.bottom());
            if ex0 > window.x1 as i32
                || ex1 < window.x0 as i32
                || ey0 > window.y1 as i32
                || ey1 < window.y0 as i32
            {
                continue;
            }

            let mut rendering = Mask::new(w, h);
            for path in &element.paths {
                let pixels: Vec<PixelPoint> = path
                    .iter()
                    .map(|&(x, y)| {
                        let (px, py) = self.raster.svg_to_pixel(x, y);
                        (px - window.x0 as i32, py - window.y0 as i32)
                    })
                    .collect();
                if pixels.len() < 2 {
                    continue;
                }
                rendering.union_with(&polyline_mask(w, h, &pixels, ELEMENT_HALF_WIDTH));
            }

            let mut painted = 0usize;
            for (x, y) in rendering.set_pixels() {
                if zone.get(x as i32, y as i32) {
                    canvas.put_pixel(x, y, Luma([value]));
                    painted += 1;
                }
            }
            if painted > 0 {
                debug!(element = %element.id, value, painted, "overlaid opening");
            }
        }
    }
}

/// Void canvas with the mask's pixels painted as floor
fn floor_fill(mask: &Mask) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(mask.width(), mask.height(), Luma([VALUE_VOID]));
    for (x, y) in mask.set_pixels() {
        canvas.put_pixel(x, y, Luma([VALUE_FLOOR]));
    }
    canvas
}

/// Ring between the dilated and eroded copies of the mask
fn boundary_zone(mask: &Mask) -> Mask {
    let mut zone = dilate_mask(mask, ZONE_DILATE_RADIUS);
    zone.subtract(&erode_mask(mask, ZONE_ERODE_RADIUS));
    zone
}

/// Synthesize a door along the central span of a split seam
///
/// Seam pixels inside the boundary zone are parametrized by their
/// projection fraction along the segment; only the central span
/// becomes door, the ends stay void.
fn overlay_seam_door(
    canvas: &mut GrayImage,
    zone: &Mask,
    seam: (PixelPoint, PixelPoint),
    window: CropWindow,
) {
    let p1 = (seam.0 .0 - window.x0 as i32, seam.0 .1 - window.y0 as i32);
    let p2 = (seam.1 .0 - window.x0 as i32, seam.1 .1 - window.y0 as i32);

    let dx = (p2.0 - p1.0) as f64;
    let dy = (p2.1 - p1.1) as f64;
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return;
    }

    let line = polyline_mask(zone.width(), zone.height(), &[p1, p2], ELEMENT_HALF_WIDTH);
    for (x, y) in line.set_pixels() {
        if !zone.get(x as i32, y as i32) {
            continue;
        }
        let t = ((x as i32 - p1.0) as f64 * dx + (y as i32 - p1.1) as f64 * dy) / length_sq;
        let t = t.clamp(0.0, 1.0);
        if (SEAM_CORNER_FRACTION..=1.0 - SEAM_CORNER_FRACTION).contains(&t) {
            canvas.put_pixel(x, y, Luma([VALUE_DOOR]));
        }
    }
}

/// Pad to a centered square and resample to the output size
///
/// Nearest-neighbor keeps the category values discrete.
fn finish(canvas: GrayImage) -> GrayImage {
    resize_nearest(&pad_to_square(&canvas, VALUE_VOID), MASK_SIZE, MASK_SIZE)
}
