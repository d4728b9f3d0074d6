// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Seeded room detection via 4-connected flood fill

use tracing::debug;

use crate::raster::BoundaryRaster;
use crate::types::{Mask, PixelPoint};

/// Regions below this pixel count are noise (slivers between walls)
const MIN_REGION_AREA: usize = 100;

/// Flood fill over a boundary raster
///
/// Borrows the raster, so detection cannot outlive or mutate it.
pub struct FloodFiller<'a> {
    raster: &'a BoundaryRaster,
    /// Regions above half the raster are the outside, not a room
    max_area: usize,
}

impl<'a> FloodFiller<'a> {
    pub fn new(raster: &'a BoundaryRaster) -> Self {
        let max_area = (raster.width() as usize * raster.height() as usize) / 2;
        Self { raster, max_area }
    }

    /// Fill the open region containing the seed
    ///
    /// Returns `None` for seeds on boundary or out of bounds, and for
    /// regions outside the plausible room size band; those are normal
    /// interaction outcomes, not errors.
    pub fn fill_at(&self, seed: PixelPoint) -> Option<Mask> {
        if self.raster.is_boundary(seed.0, seed.1) {
            return None;
        }

        let mut mask = Mask::new(self.raster.width(), self.raster.height());
        let mut area = 0usize;
        let mut stack = vec![seed];
        mask.set(seed.0, seed.1, true);

        while let Some((x, y)) = stack.pop() {
            area += 1;
            for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
                if !mask.get(nx, ny) && self.raster.is_open(nx, ny) {
                    mask.set(nx, ny, true);
                    stack.push((nx, ny));
                }
            }
        }

        if area < MIN_REGION_AREA {
            debug!(area, "filled region below minimum size, discarding");
            return None;
        }
        if area > self.max_area {
            debug!(area, "filled region spans exterior, discarding");
            return None;
        }
        Some(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use roomplan_core::SvgRect;

    /// 200x200 raster with a rectangular room from (50,50) to (150,150)
    fn boxed_raster() -> BoundaryRaster {
        let mut img = GrayImage::from_pixel(200, 200, Luma([0]));
        for y in 50..=150 {
            for x in 50..=150 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        BoundaryRaster::from_image(img, SvgRect::new(0.0, 0.0, 200.0, 200.0), 1.0)
    }

    #[test]
    fn test_fill_inside_box() {
        let raster = boxed_raster();
        let mask = FloodFiller::new(&raster).fill_at((100, 100)).unwrap();
        assert_eq!(mask.area(), 101 * 101);
        assert_eq!(mask.pixel_bbox(), Some((50, 50, 150, 150)));
    }

    #[test]
    fn test_seed_on_boundary() {
        let raster = boxed_raster();
        assert!(FloodFiller::new(&raster).fill_at((10, 10)).is_none());
    }

    #[test]
    fn test_seed_out_of_bounds() {
        let raster = boxed_raster();
        let filler = FloodFiller::new(&raster);
        assert!(filler.fill_at((-1, 0)).is_none());
        assert!(filler.fill_at((200, 10)).is_none());
    }

    #[test]
    fn test_tiny_region_discarded() {
        let mut img = GrayImage::from_pixel(100, 100, Luma([0]));
        // 5x5 pocket, below the 100 px floor
        for y in 10..15 {
            for x in 10..15 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let raster =
            BoundaryRaster::from_image(img, SvgRect::new(0.0, 0.0, 100.0, 100.0), 1.0);
        assert!(FloodFiller::new(&raster).fill_at((12, 12)).is_none());
    }

    #[test]
    fn test_exterior_region_discarded() {
        // Fully open raster: the fill covers everything, which exceeds
        // half the raster and is rejected as exterior
        let img = GrayImage::from_pixel(100, 100, Luma([255]));
        let raster =
            BoundaryRaster::from_image(img, SvgRect::new(0.0, 0.0, 100.0, 100.0), 1.0);
        assert!(FloodFiller::new(&raster).fill_at((50, 50)).is_none());
    }
}
