// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared raster helpers: line stamping, morphology and resampling

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use imageproc::region_labelling::{connected_components, Connectivity};
use rustc_hash::FxHashMap;

use crate::types::{Mask, PixelPoint};

/// Bresenham walk from `p1` to `p2`, inclusive of both endpoints
pub fn bresenham(p1: PixelPoint, p2: PixelPoint) -> Vec<PixelPoint> {
    let (mut x, mut y) = p1;
    let (x1, y1) = p2;
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut points = Vec::new();
    loop {
        points.push((x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    points
}

/// Stamp a square of side `2 * half_width + 1` at each line pixel
pub fn draw_thick_line(image: &mut GrayImage, p1: PixelPoint, p2: PixelPoint, half_width: i32, color: u8) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    for (cx, cy) in bresenham(p1, p2) {
        for dy in -half_width..=half_width {
            for dx in -half_width..=half_width {
                let (px, py) = (cx + dx, cy + dy);
                if px >= 0 && py >= 0 && px < w && py < h {
                    image.put_pixel(px as u32, py as u32, Luma([color]));
                }
            }
        }
    }
}

/// Draw an open polyline with square line caps
pub fn draw_thick_polyline(image: &mut GrayImage, points: &[PixelPoint], half_width: i32, color: u8) {
    for pair in points.windows(2) {
        draw_thick_line(image, pair[0], pair[1], half_width, color);
    }
}

/// Thick line segment as a standalone mask
pub fn line_mask(width: u32, height: u32, p1: PixelPoint, p2: PixelPoint, half_width: i32) -> Mask {
    let mut img = GrayImage::new(width, height);
    draw_thick_line(&mut img, p1, p2, half_width, 255);
    Mask::from_gray(&img)
}

/// Thick open polyline as a standalone mask
pub fn polyline_mask(width: u32, height: u32, points: &[PixelPoint], half_width: i32) -> Mask {
    let mut img = GrayImage::new(width, height);
    draw_thick_polyline(&mut img, points, half_width, 255);
    Mask::from_gray(&img)
}

/// Dilate with a square structuring element of side `2 * radius + 1`
pub fn dilate_mask(mask: &Mask, radius: u8) -> Mask {
    Mask::from_gray(&morphology::dilate(&mask.to_gray(), Norm::LInf, radius))
}

/// Erode with a square structuring element of side `2 * radius + 1`
pub fn erode_mask(mask: &Mask, radius: u8) -> Mask {
    Mask::from_gray(&morphology::erode(&mask.to_gray(), Norm::LInf, radius))
}

/// 4-connected components of a mask, largest first
pub fn components_by_size(mask: &Mask) -> Vec<Mask> {
    let labeled = connected_components(&mask.to_gray(), Connectivity::Four, Luma([0u8]));

    let mut sizes: FxHashMap<u32, usize> = FxHashMap::default();
    for pixel in labeled.pixels() {
        if pixel.0[0] != 0 {
            *sizes.entry(pixel.0[0]).or_insert(0) += 1;
        }
    }

    let mut order: Vec<(u32, usize)> = sizes.into_iter().collect();
    order.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    order
        .into_iter()
        .map(|(label, _)| {
            let mut out = Mask::new(mask.width(), mask.height());
            for (x, y, pixel) in labeled.enumerate_pixels() {
                if pixel.0[0] == label {
                    out.set(x as i32, y as i32, true);
                }
            }
            out
        })
        .collect()
}

/// Pad to a centered square canvas filled with `fill`
pub fn pad_to_square(image: &GrayImage, fill: u8) -> GrayImage {
    let side = image.width().max(image.height());
    let mut out = GrayImage::from_pixel(side, side, Luma([fill]));
    let off_x = (side - image.width()) / 2;
    let off_y = (side - image.height()) / 2;
    imageops::overlay(&mut out, image, i64::from(off_x), i64::from(off_y));
    out
}

/// Nearest-neighbor resize, preserving the categorical value set
pub fn resize_nearest(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    imageops::resize(image, width, height, FilterType::Nearest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bresenham_endpoints_inclusive() {
        let points = bresenham((2, 3), (6, 3));
        assert_eq!(points.first(), Some(&(2, 3)));
        assert_eq!(points.last(), Some(&(6, 3)));
        assert_eq!(points.len(), 5);
    }

    #[test]
    fn test_thick_line_width() {
        // half_width 1 -> a horizontal line covers 3 rows
        let mask = line_mask(20, 20, (5, 10), (15, 10), 1);
        assert_eq!(mask.pixel_bbox(), Some((4, 9, 16, 11)));
        assert_eq!(mask.area(), 13 * 3);
    }

    #[test]
    fn test_thick_line_clips_at_border() {
        let mask = line_mask(10, 10, (0, 0), (0, 9), 2);
        assert_eq!(mask.pixel_bbox(), Some((0, 0, 2, 9)));
    }

    #[test]
    fn test_dilate_then_erode_round_trip() {
        let mut mask = Mask::new(15, 15);
        for y in 5..10 {
            for x in 5..10 {
                mask.set(x, y, true);
            }
        }
        let closed = erode_mask(&dilate_mask(&mask, 2), 2);
        assert_eq!(closed, mask);
    }

    #[test]
    fn test_components_sorted_by_size() {
        let mut mask = Mask::new(30, 10);
        // Small blob then a larger one
        mask.set(1, 1, true);
        for x in 10..20 {
            mask.set(x, 5, true);
        }
        let parts = components_by_size(&mask);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].area(), 10);
        assert_eq!(parts[1].area(), 1);
    }

    #[test]
    fn test_pad_to_square_centers_content() {
        let mut img = GrayImage::from_pixel(10, 4, Luma([85]));
        img.put_pixel(0, 0, Luma([255]));
        let padded = pad_to_square(&img, 0);
        assert_eq!(padded.dimensions(), (10, 10));
        assert_eq!(padded.get_pixel(0, 0).0[0], 0);
        assert_eq!(padded.get_pixel(0, 3).0[0], 255);
        assert_eq!(padded.get_pixel(5, 5).0[0], 85);
    }
}
