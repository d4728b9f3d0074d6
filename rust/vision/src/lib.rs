// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Roomplan Vision
//!
//! Raster geometry core for floor-plan room extraction.
//!
//! Builds a binary boundary raster from an annotated plan SVG, detects
//! rooms by seeded flood fill, splits oversized regions along a cut
//! line, extracts simplified boundary polygons, and composes 120x120
//! categorical masks (void/floor/door/window) per room or per unit.
//!
//! ## Pipeline
//!
//! ```rust,ignore
//! use roomplan_core::{normalize_content, SvgDocument};
//! use roomplan_vision::{BoundaryRaster, FloodFiller, Session};
//!
//! let markup = normalize_content(&std::fs::read_to_string("plan.svg")?)?;
//! let doc = SvgDocument::parse(&markup)?;
//! let viewbox = doc.viewbox;
//!
//! let scale = 2000.0 / viewbox.longest_side();
//! let raster = BoundaryRaster::build(
//!     &markup, viewbox, scale,
//!     &doc.walls(), &doc.doors(), &doc.windows(),
//! )?;
//!
//! let mut session = Session::new(raster);
//! if let Some(mask) = FloodFiller::new(session.raster()).fill_at((900, 700)) {
//!     let room_id = session.add_room(mask)?;
//!     session.label_room(room_id, "kitchen")?;
//! }
//! ```

pub mod artifacts;
pub mod compose;
pub mod contour;
pub mod error;
pub mod flood;
pub mod image_ops;
pub mod raster;
pub mod split;
pub mod types;

pub use artifacts::{Boundary3D, Metadata, RoomEntry, UnitEntry, SVG_TO_METERS};
pub use compose::{MaskComposer, MASK_SIZE};
pub use contour::{mask_to_contour, simplify, snap_to_contour};
pub use error::{Error, Result};
pub use flood::FloodFiller;
pub use raster::BoundaryRaster;
pub use split::{assign_elements_to_halves, split_mask};
pub use types::{ApartmentUnit, Mask, PixelPoint, Room, Session};
