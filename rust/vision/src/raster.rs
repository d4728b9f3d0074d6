// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary rasterization
//!
//! Renders the normalized plan markup to a binary raster where walls,
//! sealed openings and other cut geometry read as boundary (0) and
//! everything else as open space (255). The raster carries its SVG
//! viewBox and scale so masks can be mapped back into plan coordinates.

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::morphology;
use imageproc::point::Point;
use imageproc::rect::Rect;
use resvg::{tiny_skia, usvg};
use tracing::debug;

use crate::error::{Error, Result};
use crate::image_ops::draw_thick_polyline;
use crate::types::{Mask, PixelPoint};
use roomplan_core::{Element, SvgRect};

/// Luminance at or below which a rendered pixel counts as boundary
const LUMA_THRESHOLD: u8 = 200;

/// Half-width of re-traced wall polylines, in raster pixels
const WALL_HALF_WIDTH: i32 = 2;

/// Distance in SVG units under which a path counts as closed
const CLOSED_PATH_TOLERANCE: f64 = 0.5;

/// Structuring-element radius for the crack-sealing closing pass
const CLOSING_RADIUS: u8 = 2;

/// Binary plan raster with its coordinate mapping
#[derive(Debug, Clone)]
pub struct BoundaryRaster {
    image: GrayImage,
    viewbox: SvgRect,
    scale: f64,
}

impl BoundaryRaster {
    /// Rasterize a normalized plan
    ///
    /// `markup` is rendered as the base layer; wall polylines are then
    /// re-traced at guaranteed thickness, door and window bounding
    /// boxes are sealed as solid boundary, and a morphological closing
    /// bridges hairline cracks between abutting wall pieces.
    pub fn build(
        markup: &str,
        viewbox: SvgRect,
        scale: f64,
        walls: &[&Element],
        doors: &[&Element],
        windows: &[&Element],
    ) -> Result<Self> {
        let width = (viewbox.width * scale).ceil() as u32;
        let height = (viewbox.height * scale).ceil() as u32;
        if width == 0 || height == 0 || width.checked_mul(height).is_none() {
            return Err(Error::RasterAlloc(width, height));
        }

        let mut raster = Self {
            image: render_threshold(markup, width, height)?,
            viewbox,
            scale,
        };

        for wall in walls {
            raster.trace_wall(wall);
        }
        for opening in doors.iter().chain(windows.iter()) {
            raster.seal_opening(opening);
        }

        // Closing over the boundary phase: erode grows black, dilate
        // shrinks it back, leaving cracks bridged
        let grown = morphology::erode(&raster.image, Norm::LInf, CLOSING_RADIUS);
        raster.image = morphology::dilate(&grown, Norm::LInf, CLOSING_RADIUS);

        debug!(
            width,
            height,
            walls = walls.len(),
            openings = doors.len() + windows.len(),
            "built boundary raster"
        );

        Ok(raster)
    }

    /// Wrap an existing binary image; used by tests and synthetic plans
    pub fn from_image(image: GrayImage, viewbox: SvgRect, scale: f64) -> Self {
        Self {
            image,
            viewbox,
            scale,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn viewbox(&self) -> SvgRect {
        self.viewbox
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// True when the pixel is boundary; out-of-bounds counts as boundary
    pub fn is_boundary(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return true;
        }
        self.image.get_pixel(x as u32, y as u32).0[0] == 0
    }

    pub fn is_open(&self, x: i32, y: i32) -> bool {
        !self.is_boundary(x, y)
    }

    /// Map an SVG-unit point into raster space (truncating)
    pub fn svg_to_pixel(&self, x: f64, y: f64) -> PixelPoint {
        (
            ((x - self.viewbox.x) * self.scale) as i32,
            ((y - self.viewbox.y) * self.scale) as i32,
        )
    }

    /// Map a raster pixel back into SVG-unit space (pixel center)
    pub fn pixel_to_svg(&self, x: i32, y: i32) -> (f64, f64) {
        (
            self.viewbox.x + (x as f64 + 0.5) / self.scale,
            self.viewbox.y + (y as f64 + 0.5) / self.scale,
        )
    }

    /// Bounding box of a mask's set pixels in SVG-unit space
    pub fn mask_bbox_svg(&self, mask: &Mask) -> Option<SvgRect> {
        let (x0, y0, x1, y1) = mask.pixel_bbox()?;
        let (sx0, sy0) = self.pixel_to_svg(x0 as i32, y0 as i32);
        let (sx1, sy1) = self.pixel_to_svg(x1 as i32, y1 as i32);
        Some(SvgRect::new(sx0, sy0, sx1 - sx0, sy1 - sy0))
    }

    /// Re-trace wall geometry: closed paths as filled polygons, open
    /// paths as thick polylines
    fn trace_wall(&mut self, wall: &Element) {
        for path in &wall.paths {
            if path.len() < 2 {
                continue;
            }
            let mut pixels: Vec<PixelPoint> =
                path.iter().map(|&(x, y)| self.svg_to_pixel(x, y)).collect();

            let first = path[0];
            let last = path[path.len() - 1];
            let closed = path.len() >= 3
                && (first.0 - last.0).hypot(first.1 - last.1) <= CLOSED_PATH_TOLERANCE;

            if closed {
                // draw_polygon_mut rejects an explicitly repeated last point
                if pixels.len() > 1 && pixels[0] == pixels[pixels.len() - 1] {
                    pixels.pop();
                }
                let polygon: Vec<Point<i32>> =
                    pixels.iter().map(|&(x, y)| Point::new(x, y)).collect();
                if polygon.len() >= 3 {
                    draw_polygon_mut(&mut self.image, &polygon, Luma([0]));
                }
                // The outline still gets minimum thickness
                pixels.push(pixels[0]);
            }
            draw_thick_polyline(&mut self.image, &pixels, WALL_HALF_WIDTH, 0);
        }
    }

    /// Paint an opening's bounding box as solid boundary
    ///
    /// Doors and windows stay sealed during flood fill so adjacent
    /// rooms come out as separate regions.
    fn seal_opening(&mut self, opening: &Element) {
        let (x0, y0) = self.svg_to_pixel(opening.bbox.x, opening.bbox.y);
        let (x1, y1) = self.svg_to_pixel(opening.bbox.right(), opening.bbox.bottom());
        // (x1, y1) is the far corner pixel, so the painted rect includes it
        let w = (x1 - x0 + 1).max(1) as u32;
        let h = (y1 - y0 + 1).max(1) as u32;
        draw_filled_rect_mut(&mut self.image, Rect::at(x0, y0).of_size(w, h), Luma([0]));
    }
}

/// Render SVG markup over white and threshold to a binary image
fn render_threshold(markup: &str, width: u32, height: u32) -> Result<GrayImage> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_str(markup, &options).map_err(|e| Error::Svg(e.to_string()))?;

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(Error::RasterAlloc(width, height))?;
    pixmap.fill(tiny_skia::Color::WHITE);

    let size = tree.size();
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / size.width(),
        height as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let mut image = GrayImage::new(width, height);
    for (i, p) in pixmap.pixels().iter().enumerate() {
        // BT.601 luma over the white-composited render
        let luma = 0.299 * f32::from(p.red())
            + 0.587 * f32::from(p.green())
            + 0.114 * f32::from(p.blue());
        let value = if (luma as u8) <= LUMA_THRESHOLD { 0 } else { 255 };
        image.put_pixel(i as u32 % width, i as u32 / width, Luma([value]));
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use roomplan_core::{coords_bbox, ElementClass, Layer};

    fn open_raster(side: u32) -> BoundaryRaster {
        BoundaryRaster::from_image(
            GrayImage::from_pixel(side, side, Luma([255])),
            SvgRect::new(0.0, 0.0, side as f64, side as f64),
            1.0,
        )
    }

    fn element(class: ElementClass, paths: Vec<Vec<(f64, f64)>>) -> Element {
        let coords: Vec<(f64, f64)> = paths.iter().flatten().copied().collect();
        Element {
            id: "e1".to_string(),
            class,
            name: String::new(),
            guid: String::new(),
            material: String::new(),
            layer: Layer::Cut,
            bbox: coords_bbox(&coords).unwrap(),
            paths,
        }
    }

    #[test]
    fn test_coordinate_round_trip() {
        let raster = BoundaryRaster::from_image(
            GrayImage::new(100, 100),
            SvgRect::new(50.0, 20.0, 200.0, 200.0),
            0.5,
        );
        let (px, py) = raster.svg_to_pixel(150.0, 120.0);
        assert_eq!((px, py), (50, 50));
        let (sx, sy) = raster.pixel_to_svg(px, py);
        assert_abs_diff_eq!(sx, 151.0, epsilon = 1.0 / raster.scale());
        assert_abs_diff_eq!(sy, 121.0, epsilon = 1.0 / raster.scale());
    }

    #[test]
    fn test_out_of_bounds_is_boundary() {
        let raster = open_raster(10);
        assert!(raster.is_boundary(-1, 5));
        assert!(raster.is_boundary(5, 10));
        assert!(raster.is_open(5, 5));
    }

    #[test]
    fn test_open_wall_traced_thick() {
        let mut raster = open_raster(50);
        let wall = element(ElementClass::Wall, vec![vec![(10.0, 25.0), (40.0, 25.0)]]);
        raster.trace_wall(&wall);
        // Stamped at half-width 2 -> 5 rows of boundary
        assert!(raster.is_boundary(20, 23));
        assert!(raster.is_boundary(20, 27));
        assert!(raster.is_open(20, 22));
    }

    #[test]
    fn test_closed_wall_filled() {
        let mut raster = open_raster(60);
        let ring = vec![
            (10.0, 10.0),
            (40.0, 10.0),
            (40.0, 40.0),
            (10.0, 40.0),
            (10.0, 10.0),
        ];
        let wall = element(ElementClass::Wall, vec![ring]);
        raster.trace_wall(&wall);
        assert!(raster.is_boundary(25, 25));
    }

    #[test]
    fn test_seal_opening_covers_far_corner() {
        let mut raster = open_raster(30);
        let mut door = element(ElementClass::Door, vec![vec![(10.0, 10.0), (14.0, 12.0)]]);
        door.bbox = SvgRect::new(10.0, 10.0, 4.0, 2.0);
        raster.seal_opening(&door);
        assert!(raster.is_boundary(10, 10));
        assert!(raster.is_boundary(14, 12));
        assert!(raster.is_open(15, 12));
        assert!(raster.is_open(14, 13));
    }

    #[test]
    fn test_threshold_boundary_at_exact_luma() {
        // Gray at the threshold value must classify as boundary, one
        // clear step above it as open
        let at = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 4 4">
            <rect width="4" height="4" fill="rgb(200,200,200)"/></svg>"#;
        let image = render_threshold(at, 4, 4).unwrap();
        assert_eq!(image.get_pixel(2, 2).0[0], 0);

        let above = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 4 4">
            <rect width="4" height="4" fill="rgb(210,210,210)"/></svg>"#;
        let image = render_threshold(above, 4, 4).unwrap();
        assert_eq!(image.get_pixel(2, 2).0[0], 255);
    }

    #[test]
    fn test_seal_opening_clamps_to_one_pixel() {
        let mut raster = open_raster(30);
        let mut door = element(ElementClass::Door, vec![vec![(12.0, 12.0)]]);
        door.bbox = SvgRect::new(12.0, 12.0, 0.0, 0.0);
        raster.seal_opening(&door);
        assert!(raster.is_boundary(12, 12));
    }

    #[test]
    fn test_mask_bbox_svg() {
        let raster = BoundaryRaster::from_image(
            GrayImage::from_pixel(100, 100, Luma([255])),
            SvgRect::new(0.0, 0.0, 200.0, 200.0),
            0.5,
        );
        let mut mask = Mask::new(100, 100);
        for y in 10..20 {
            for x in 10..30 {
                mask.set(x, y, true);
            }
        }
        let bbox = raster.mask_bbox_svg(&mask).unwrap();
        assert_abs_diff_eq!(bbox.x, 21.0);
        assert_abs_diff_eq!(bbox.width, 38.0);
    }
}
