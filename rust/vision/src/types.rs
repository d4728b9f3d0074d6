// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types: region masks, rooms, apartment units and the editing session

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::raster::BoundaryRaster;
use roomplan_core::SvgRect;

/// A raster-space point (column, row)
pub type PixelPoint = (i32, i32);

/// Boolean region mask at raster resolution
///
/// Each mask has exactly one owner; rendering and export consumers
/// receive a reference or an explicit clone, never shared mutability.
#[derive(Debug, Clone, PartialEq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![false; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Out-of-bounds reads are false
    pub fn get(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return false;
        }
        self.bits[(y as u32 * self.width + x as u32) as usize]
    }

    /// Out-of-bounds writes are ignored
    pub fn set(&mut self, x: i32, y: i32, value: bool) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        self.bits[(y as u32 * self.width + x as u32) as usize] = value;
    }

    /// Number of set pixels
    pub fn area(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.bits.contains(&true)
    }

    /// Inclusive pixel bounding box `(min_x, min_y, max_x, max_y)`
    pub fn pixel_bbox(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bbox: Option<(u32, u32, u32, u32)> = None;
        for (x, y) in self.set_pixels() {
            bbox = Some(match bbox {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bbox
    }

    /// Iterate over set pixels in row-major order
    pub fn set_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width;
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, b)| **b)
            .map(move |(i, _)| (i as u32 % width, i as u32 / width))
    }

    /// Count of pixels set in both masks (shapes must match)
    pub fn overlap(&self, other: &Mask) -> usize {
        self.bits
            .iter()
            .zip(&other.bits)
            .filter(|(a, b)| **a && **b)
            .count()
    }

    pub fn intersects(&self, other: &Mask) -> bool {
        self.bits.iter().zip(&other.bits).any(|(a, b)| *a && *b)
    }

    pub fn union_with(&mut self, other: &Mask) {
        for (a, b) in self.bits.iter_mut().zip(&other.bits) {
            *a |= *b;
        }
    }

    pub fn subtract(&mut self, other: &Mask) {
        for (a, b) in self.bits.iter_mut().zip(&other.bits) {
            *a &= !*b;
        }
    }

    /// Copy the inclusive window `(x0, y0)..=(x1, y1)` into a new mask
    pub fn crop(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Mask {
        let mut out = Mask::new(x1 - x0 + 1, y1 - y0 + 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                out.set(
                    (x - x0) as i32,
                    (y - y0) as i32,
                    self.get(x as i32, y as i32),
                );
            }
        }
        out
    }

    /// Binary image with set pixels white
    pub fn to_gray(&self) -> GrayImage {
        let mut img = GrayImage::new(self.width, self.height);
        for (x, y) in self.set_pixels() {
            img.put_pixel(x, y, Luma([255]));
        }
        img
    }

    /// Set pixels are the nonzero pixels of the image
    pub fn from_gray(img: &GrayImage) -> Mask {
        let mut mask = Mask::new(img.width(), img.height());
        for (x, y, pixel) in img.enumerate_pixels() {
            if pixel.0[0] > 0 {
                mask.set(x as i32, y as i32, true);
            }
        }
        mask
    }
}

/// A detected or derived room region
#[derive(Debug, Clone)]
pub struct Room {
    /// Unique identifier, monotonic, never reused
    pub id: u32,
    /// User-assigned label, empty until assigned
    pub label: String,
    /// Region mask at raster resolution, exclusively owned
    pub mask: Mask,
    /// Bounding box in SVG-unit space
    pub bbox_svg: SvgRect,
    /// Owning unit, `None` until saved into one
    pub unit_id: Option<u32>,
    /// Parent room when created by a split
    pub split_from: Option<u32>,
    /// Seam endpoints in raster space when created by a split,
    /// consumed later for synthetic door placement
    pub split_seam: Option<(PixelPoint, PixelPoint)>,
}

/// A named grouping of rooms representing one apartment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApartmentUnit {
    pub id: u32,
    /// Member room ids; order carries no meaning
    pub room_ids: Vec<u32>,
}

/// One editing session: the boundary raster plus the room/unit
/// collections and their identifier counters
///
/// All mutable state of the core lives here; operations take the
/// session by reference instead of touching ambient globals.
#[derive(Debug)]
pub struct Session {
    raster: BoundaryRaster,
    rooms: Vec<Room>,
    units: Vec<ApartmentUnit>,
    next_room_id: u32,
    next_unit_id: u32,
}

impl Session {
    pub fn new(raster: BoundaryRaster) -> Self {
        Self {
            raster,
            rooms: Vec::new(),
            units: Vec::new(),
            next_room_id: 0,
            next_unit_id: 1,
        }
    }

    pub fn raster(&self) -> &BoundaryRaster {
        &self.raster
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn units(&self) -> &[ApartmentUnit] {
        &self.units
    }

    pub fn room(&self, id: u32) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn unit(&self, id: u32) -> Option<&ApartmentUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn rooms_in_unit(&self, unit_id: u32) -> Vec<&Room> {
        self.rooms
            .iter()
            .filter(|r| r.unit_id == Some(unit_id))
            .collect()
    }

    /// Register a freshly filled region as an unlabeled room
    ///
    /// Rejects masks overlapping any existing room: regions stay
    /// pairwise disjoint by construction.
    pub fn add_room(&mut self, mask: Mask) -> Result<u32> {
        if self.rooms.iter().any(|r| r.mask.intersects(&mask)) {
            return Err(Error::RegionOccupied);
        }
        let bbox_svg = self.raster.mask_bbox_svg(&mask).ok_or(Error::EmptyMask)?;

        let id = self.next_room_id;
        self.next_room_id += 1;
        self.rooms.push(Room {
            id,
            label: String::new(),
            mask,
            bbox_svg,
            unit_id: None,
            split_from: None,
            split_seam: None,
        });
        Ok(id)
    }

    pub fn label_room(&mut self, id: u32, label: &str) -> Result<()> {
        let room = self
            .rooms
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(Error::UnknownRoom(id))?;
        room.label = label.to_string();
        Ok(())
    }

    /// Remove a room that has not yet been saved into a unit
    pub fn remove_room(&mut self, id: u32) -> Result<()> {
        let room = self.room(id).ok_or(Error::UnknownRoom(id))?;
        if room.unit_id.is_some() {
            return Err(Error::RoomInUnit(id));
        }
        self.rooms.retain(|r| r.id != id);
        Ok(())
    }

    /// Group rooms into a new unit and stamp them with its id
    pub fn save_unit(&mut self, room_ids: &[u32]) -> Result<u32> {
        if room_ids.is_empty() {
            return Err(Error::NoRoomsSelected);
        }
        for &id in room_ids {
            let room = self.room(id).ok_or(Error::UnknownRoom(id))?;
            if room.unit_id.is_some() {
                return Err(Error::RoomInUnit(id));
            }
        }

        let unit_id = self.next_unit_id;
        self.next_unit_id += 1;
        for room in &mut self.rooms {
            if room_ids.contains(&room.id) {
                room.unit_id = Some(unit_id);
            }
        }
        self.units.push(ApartmentUnit {
            id: unit_id,
            room_ids: room_ids.to_vec(),
        });
        Ok(unit_id)
    }

    /// Replace a split room by its two halves
    ///
    /// The parent is removed, the children inherit its unit, and the
    /// unit's member list swaps the parent id for the two child ids in
    /// one step, so rooms and units never disagree about membership.
    pub fn apply_split(
        &mut self,
        parent_id: u32,
        half_a: Mask,
        half_b: Mask,
        seam: (PixelPoint, PixelPoint),
        labels: (&str, &str),
    ) -> Result<(u32, u32)> {
        let parent = self.room(parent_id).ok_or(Error::UnknownRoom(parent_id))?;
        let unit_id = parent.unit_id;
        let bbox_a = self.raster.mask_bbox_svg(&half_a).ok_or(Error::EmptyMask)?;
        let bbox_b = self.raster.mask_bbox_svg(&half_b).ok_or(Error::EmptyMask)?;

        let id_a = self.next_room_id;
        let id_b = self.next_room_id + 1;
        self.next_room_id += 2;

        self.rooms.retain(|r| r.id != parent_id);
        self.rooms.push(Room {
            id: id_a,
            label: labels.0.to_string(),
            mask: half_a,
            bbox_svg: bbox_a,
            unit_id,
            split_from: Some(parent_id),
            split_seam: Some(seam),
        });
        self.rooms.push(Room {
            id: id_b,
            label: labels.1.to_string(),
            mask: half_b,
            bbox_svg: bbox_b,
            unit_id,
            split_from: Some(parent_id),
            split_seam: Some(seam),
        });

        if let Some(unit_id) = unit_id {
            let unit = self
                .units
                .iter_mut()
                .find(|u| u.id == unit_id)
                .ok_or(Error::UnknownUnit(unit_id))?;
            unit.room_ids.retain(|&rid| rid != parent_id);
            unit.room_ids.extend([id_a, id_b]);
        }

        Ok((id_a, id_b))
    }

    /// Rooms of a unit labeled `large_label` whose area exceeds the
    /// unit's mean room area, reported only while no room carries
    /// `missing_label`
    ///
    /// Pure query behind the "offer to split an oversized room" flow;
    /// the decision itself stays with the caller.
    pub fn split_candidates(
        &self,
        unit_id: u32,
        large_label: &str,
        missing_label: &str,
    ) -> Vec<u32> {
        let members = self.rooms_in_unit(unit_id);
        if members.is_empty() || members.iter().any(|r| r.label == missing_label) {
            return Vec::new();
        }
        let mean_area =
            members.iter().map(|r| r.mask.area()).sum::<usize>() as f64 / members.len() as f64;
        members
            .iter()
            .filter(|r| r.label == large_label && r.mask.area() as f64 > mean_area)
            .map(|r| r.id)
            .collect()
    }

    /// Drop all rooms and units and restart both counters
    pub fn reset(&mut self) {
        self.rooms.clear();
        self.units.clear();
        self.next_room_id = 0;
        self.next_unit_id = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::BoundaryRaster;
    use roomplan_core::SvgRect;

    fn open_raster(width: u32, height: u32) -> BoundaryRaster {
        let img = GrayImage::from_pixel(width, height, Luma([255]));
        BoundaryRaster::from_image(img, SvgRect::new(0.0, 0.0, width as f64, height as f64), 1.0)
    }

    fn block(width: u32, height: u32, x0: i32, y0: i32, x1: i32, y1: i32) -> Mask {
        let mut mask = Mask::new(width, height);
        for y in y0..=y1 {
            for x in x0..=x1 {
                mask.set(x, y, true);
            }
        }
        mask
    }

    #[test]
    fn test_mask_bbox_and_area() {
        let mask = block(20, 20, 3, 4, 7, 6);
        assert_eq!(mask.area(), 5 * 3);
        assert_eq!(mask.pixel_bbox(), Some((3, 4, 7, 6)));
    }

    #[test]
    fn test_mask_crop() {
        let mask = block(20, 20, 3, 4, 7, 6);
        let crop = mask.crop(3, 4, 7, 6);
        assert_eq!(crop.width(), 5);
        assert_eq!(crop.height(), 3);
        assert_eq!(crop.area(), 15);
    }

    #[test]
    fn test_add_room_rejects_overlap() {
        let mut session = Session::new(open_raster(20, 20));
        session.add_room(block(20, 20, 2, 2, 8, 8)).unwrap();
        let overlapping = block(20, 20, 8, 8, 12, 12);
        assert!(matches!(
            session.add_room(overlapping),
            Err(Error::RegionOccupied)
        ));
    }

    #[test]
    fn test_room_ids_never_reused() {
        let mut session = Session::new(open_raster(20, 20));
        let a = session.add_room(block(20, 20, 1, 1, 3, 3)).unwrap();
        session.remove_room(a).unwrap();
        let b = session.add_room(block(20, 20, 1, 1, 3, 3)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_remove_room_in_unit_rejected() {
        let mut session = Session::new(open_raster(20, 20));
        let a = session.add_room(block(20, 20, 1, 1, 3, 3)).unwrap();
        session.save_unit(&[a]).unwrap();
        assert!(matches!(session.remove_room(a), Err(Error::RoomInUnit(_))));
    }

    #[test]
    fn test_split_updates_unit_membership_atomically() {
        let mut session = Session::new(open_raster(30, 30));
        let parent = session.add_room(block(30, 30, 2, 2, 20, 10)).unwrap();
        let unit = session.save_unit(&[parent]).unwrap();

        let half_a = block(30, 30, 2, 2, 10, 10);
        let half_b = block(30, 30, 12, 2, 20, 10);
        let (a, b) = session
            .apply_split(parent, half_a, half_b, ((11, 2), (11, 10)), ("livingroom", "diningroom"))
            .unwrap();

        // Bidirectional consistency: unit lists exactly the children,
        // and every room pointing at the unit appears in that list
        let unit = session.unit(unit).unwrap();
        assert_eq!(unit.room_ids, vec![a, b]);
        assert!(session.room(parent).is_none());
        for room in session.rooms() {
            if room.unit_id == Some(unit.id) {
                assert!(unit.room_ids.contains(&room.id));
            }
        }
        assert_eq!(session.room(a).unwrap().split_from, Some(parent));
        assert!(session.room(b).unwrap().split_seam.is_some());
    }

    #[test]
    fn test_split_candidates() {
        let mut session = Session::new(open_raster(40, 40));
        let big = session.add_room(block(40, 40, 1, 1, 30, 20)).unwrap();
        let small = session.add_room(block(40, 40, 1, 25, 8, 30)).unwrap();
        session.label_room(big, "diningroom").unwrap();
        session.label_room(small, "bedroom").unwrap();
        let unit = session.save_unit(&[big, small]).unwrap();

        assert_eq!(
            session.split_candidates(unit, "diningroom", "livingroom"),
            vec![big]
        );

        session.label_room(small, "livingroom").unwrap();
        assert!(session
            .split_candidates(unit, "diningroom", "livingroom")
            .is_empty());
    }

    #[test]
    fn test_reset_clears_and_restarts_counters() {
        let mut session = Session::new(open_raster(20, 20));
        session.add_room(block(20, 20, 1, 1, 3, 3)).unwrap();
        session.reset();
        assert!(session.rooms().is_empty());
        assert!(session.units().is_empty());
        let id = session.add_room(block(20, 20, 1, 1, 3, 3)).unwrap();
        assert_eq!(id, 0);
    }
}
