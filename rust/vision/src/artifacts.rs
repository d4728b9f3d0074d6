// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Export artifacts: 3D boundary polygons, overview renders and the
//! metadata document
//!
//! These are the data structures an export collaborator serializes;
//! the module itself never touches the filesystem.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::contour::{mask_to_contour, simplify};
use crate::error::Result;
use crate::raster::BoundaryRaster;
use crate::types::Room;
use roomplan_core::{replace_viewbox, SvgRect};

/// Fixed conversion from SVG units to meters
pub const SVG_TO_METERS: f64 = 0.1;

/// Crop margin around a unit's bounding box in overview renders,
/// in SVG units
const OVERVIEW_MARGIN: f64 = 15.0;

/// Default vertex budget for exported boundary polygons
pub const DEFAULT_MAX_VERTICES: usize = 32;

/// Room overlay colors, cycled per unit (RGBA, translucent)
const UNIT_COLORS: [[u8; 4]; 6] = [
    [255, 100, 100, 80],
    [100, 100, 255, 80],
    [100, 255, 100, 80],
    [255, 200, 50, 80],
    [200, 100, 255, 80],
    [50, 200, 200, 80],
];

/// Flat-extruded 3D outline of one room
///
/// Vertices are `[x, y, z]` in meters, centered at the room's own
/// bounding-box midpoint, with z derived from the negated SVG y axis.
/// `bottom` sits at y = 0 and `top` at the supplied room height.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boundary3D {
    pub bottom: Vec<[f64; 3]>,
    pub top: Vec<[f64; 3]>,
}

impl Boundary3D {
    /// Simplified closed outline of a room, extruded to `height_m`
    pub fn from_room(
        room: &Room,
        raster: &BoundaryRaster,
        height_m: f64,
        max_vertices: usize,
    ) -> Result<Self> {
        let contour = mask_to_contour(&room.mask)?;
        let outline = simplify(&contour, max_vertices);

        let (cx, cy) = room.bbox_svg.midpoint();
        let mut bottom = Vec::with_capacity(outline.len() + 1);
        let mut top = Vec::with_capacity(outline.len() + 1);
        for &(px, py) in &outline {
            let (sx, sy) = raster.pixel_to_svg(px, py);
            let x = (sx - cx) * SVG_TO_METERS;
            let z = -(sy - cy) * SVG_TO_METERS;
            bottom.push([x, 0.0, z]);
            top.push([x, height_m, z]);
        }
        // Close the rings
        if let (Some(&first_b), Some(&first_t)) = (bottom.first(), top.first()) {
            bottom.push(first_b);
            top.push(first_t);
        }

        Ok(Self { bottom, top })
    }
}

/// Output file name for a room mask: `unit_<uid>_room_<n>_<type>.png`
///
/// `n` is the 1-based position within the unit, not the room id.
pub fn room_file_name(unit_id: u32, position: usize, label: &str) -> String {
    let room_type = if label.is_empty() { "unlabelled" } else { label };
    format!("unit_{unit_id}_room_{position}_{room_type}.png")
}

/// Bounding box entry in both coordinate spaces, rounded to 2 decimals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BboxEntry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BboxEntry {
    pub fn from_svg(bbox: SvgRect) -> Self {
        Self {
            x: round2(bbox.x),
            y: round2(bbox.y),
            width: round2(bbox.width),
            height: round2(bbox.height),
        }
    }

    /// Meter-space variant: x scaled, y negated into the z axis
    pub fn from_svg_in_meters(bbox: SvgRect) -> Self {
        Self {
            x: round2(bbox.x * SVG_TO_METERS),
            y: round2(-bbox.bottom() * SVG_TO_METERS),
            width: round2(bbox.width * SVG_TO_METERS),
            height: round2(bbox.height * SVG_TO_METERS),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEntry {
    pub room_id: usize,
    pub room_type: String,
    pub bbox_in_svg: BboxEntry,
    pub bbox_in_meters: BboxEntry,
    pub output_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitEntry {
    pub unit_id: u32,
    pub rooms: Vec<RoomEntry>,
    pub combined_file: String,
    pub overview_file: String,
}

/// Top-level metadata document enumerating every exported unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub source_svg: String,
    pub centered_svg: String,
    pub units: Vec<UnitEntry>,
}

impl Metadata {
    pub fn new(source_svg: &str, centered_svg: &str) -> Self {
        Self {
            source_svg: source_svg.to_string(),
            centered_svg: centered_svg.to_string(),
            units: Vec::new(),
        }
    }
}

/// Metadata entry for one room at a given 1-based unit position
pub fn room_entry(room: &Room, unit_id: u32, position: usize) -> RoomEntry {
    RoomEntry {
        room_id: position,
        room_type: if room.label.is_empty() {
            "unlabelled".to_string()
        } else {
            room.label.clone()
        },
        bbox_in_svg: BboxEntry::from_svg(room.bbox_svg),
        bbox_in_meters: BboxEntry::from_svg_in_meters(room.bbox_svg),
        output_file: format!(
            "unit_{unit_id}/{}",
            room_file_name(unit_id, position, &room.label)
        ),
    }
}

/// Combined bounding box of a set of rooms in SVG units
pub fn rooms_bbox_svg(rooms: &[&Room]) -> Option<SvgRect> {
    let mut iter = rooms.iter();
    let first = iter.next()?.bbox_svg;
    let (mut x0, mut y0, mut x1, mut y1) =
        (first.x, first.y, first.right(), first.bottom());
    for room in iter {
        x0 = x0.min(room.bbox_svg.x);
        y0 = y0.min(room.bbox_svg.y);
        x1 = x1.max(room.bbox_svg.right());
        y1 = y1.max(room.bbox_svg.bottom());
    }
    Some(SvgRect::new(x0, y0, x1 - x0, y1 - y0))
}

/// Overview render of a unit: boundary raster with translucent room
/// overlays, cropped to the unit's bounding box plus a margin
pub fn unit_overview(raster: &BoundaryRaster, rooms: &[&Room], unit_index: usize) -> Option<RgbaImage> {
    let bbox = rooms_bbox_svg(rooms)?.expanded(OVERVIEW_MARGIN);
    let (x0, y0) = raster.svg_to_pixel(bbox.x, bbox.y);
    let (x1, y1) = raster.svg_to_pixel(bbox.right(), bbox.bottom());
    let x0 = x0.max(0);
    let y0 = y0.max(0);
    let x1 = x1.min(raster.width() as i32 - 1);
    let y1 = y1.min(raster.height() as i32 - 1);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let color = UNIT_COLORS[unit_index % UNIT_COLORS.len()];
    let mut out = RgbaImage::new((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let base = if raster.is_boundary(x, y) { 0 } else { 255 };
            let mut pixel = [base, base, base, 255u8];
            if rooms.iter().any(|r| r.mask.get(x, y)) {
                pixel = blend(pixel, color);
            }
            out.put_pixel((x - x0) as u32, (y - y0) as u32, Rgba(pixel));
        }
    }
    Some(out)
}

/// Source-over blend of a translucent overlay onto an opaque base
fn blend(base: [u8; 4], overlay: [u8; 4]) -> [u8; 4] {
    let alpha = overlay[3] as u32;
    let inv = 255 - alpha;
    [
        ((overlay[0] as u32 * alpha + base[0] as u32 * inv) / 255) as u8,
        ((overlay[1] as u32 * alpha + base[1] as u32 * inv) / 255) as u8,
        ((overlay[2] as u32 * alpha + base[2] as u32 * inv) / 255) as u8,
        255,
    ]
}

/// Unit overview as SVG markup: the normalized plan with its viewport
/// rewritten to the unit's bounding box plus a margin
pub fn unit_overview_svg(markup: &str, rooms: &[&Room]) -> Option<String> {
    let bbox = rooms_bbox_svg(rooms)?.expanded(OVERVIEW_MARGIN);
    Some(replace_viewbox(markup, bbox))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Mask;
    use approx::assert_abs_diff_eq;
    use image::{GrayImage, Luma};

    fn room_with_mask(side: u32, x0: i32, y0: i32, x1: i32, y1: i32) -> Room {
        let mut mask = Mask::new(side, side);
        for y in y0..=y1 {
            for x in x0..=x1 {
                mask.set(x, y, true);
            }
        }
        Room {
            id: 0,
            label: String::new(),
            mask,
            bbox_svg: SvgRect::new(
                x0 as f64,
                y0 as f64,
                (x1 - x0) as f64,
                (y1 - y0) as f64,
            ),
            unit_id: None,
            split_from: None,
            split_seam: None,
        }
    }

    fn open_raster(side: u32) -> BoundaryRaster {
        BoundaryRaster::from_image(
            GrayImage::from_pixel(side, side, Luma([255])),
            SvgRect::new(0.0, 0.0, side as f64, side as f64),
            1.0,
        )
    }

    #[test]
    fn test_boundary_3d_is_closed_and_extruded() {
        let raster = open_raster(200);
        let room = room_with_mask(200, 50, 50, 150, 150);
        let boundary = Boundary3D::from_room(&room, &raster, 2.8, 16).unwrap();

        assert_eq!(boundary.bottom.first(), boundary.bottom.last());
        assert_eq!(boundary.top.first(), boundary.top.last());
        for v in &boundary.bottom {
            assert_abs_diff_eq!(v[1], 0.0);
        }
        for v in &boundary.top {
            assert_abs_diff_eq!(v[1], 2.8);
        }
        // Centered at the bbox midpoint: extents roughly symmetric
        let max_x = boundary
            .bottom
            .iter()
            .map(|v| v[0])
            .fold(f64::MIN, f64::max);
        let min_x = boundary
            .bottom
            .iter()
            .map(|v| v[0])
            .fold(f64::MAX, f64::min);
        assert_abs_diff_eq!(max_x + min_x, 0.0, epsilon = 0.5);
    }

    #[test]
    fn test_room_file_name() {
        assert_eq!(
            room_file_name(3, 2, "kitchen"),
            "unit_3_room_2_kitchen.png"
        );
        assert_eq!(room_file_name(1, 1, ""), "unit_1_room_1_unlabelled.png");
    }

    #[test]
    fn test_bbox_entry_rounding() {
        let entry = BboxEntry::from_svg(SvgRect::new(1.234, 5.678, 9.995, 0.004));
        assert_eq!(entry.x, 1.23);
        assert_eq!(entry.y, 5.68);
        assert_eq!(entry.width, 10.0);
        assert_eq!(entry.height, 0.0);
    }

    #[test]
    fn test_meter_bbox_negates_y() {
        let entry = BboxEntry::from_svg_in_meters(SvgRect::new(10.0, 20.0, 30.0, 40.0));
        assert_eq!(entry.x, 1.0);
        assert_eq!(entry.y, -6.0);
        assert_eq!(entry.width, 3.0);
        assert_eq!(entry.height, 4.0);
    }

    #[test]
    fn test_unit_overview_crops_to_unit() {
        let raster = open_raster(300);
        let room = room_with_mask(300, 100, 100, 150, 150);
        let overview = unit_overview(&raster, &[&room], 0).unwrap();
        // 50 SVG units of room + 15 margin each side at scale 1
        assert_eq!(overview.dimensions(), (81, 81));
        // Room interior carries the red overlay
        let center = overview.get_pixel(40, 40).0;
        assert_ne!(center[0], center[2]);
    }

    #[test]
    fn test_overview_svg_rewrites_viewbox() {
        let markup = r#"<svg viewBox="0 0 1000 1000"><path d="M 0,0 L 1,1"/></svg>"#;
        let room = room_with_mask(100, 10, 10, 50, 50);
        let out = unit_overview_svg(markup, &[&room]).unwrap();
        assert!(out.contains("viewBox=\"-5 -5 70 70\""));
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut meta = Metadata::new("plan.svg", "plan_centered.svg");
        let mut room = room_with_mask(100, 10, 10, 50, 50);
        room.label = "kitchen".to_string();
        meta.units.push(UnitEntry {
            unit_id: 1,
            rooms: vec![room_entry(&room, 1, 1)],
            combined_file: "unit_1/unit_1_combined.png".to_string(),
            overview_file: "unit_1/unit_1_overview.png".to_string(),
        });

        let json = serde_json::to_string_pretty(&meta).unwrap();
        let parsed: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.units[0].rooms[0].room_type, "kitchen");
        assert_eq!(
            parsed.units[0].rooms[0].output_file,
            "unit_1/unit_1_room_1_kitchen.png"
        );
    }
}
