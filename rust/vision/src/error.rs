// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for raster geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during raster geometry processing
///
/// Recoverable "no result" outcomes (`RegionNotDivided`, `EmptyMask`)
/// are distinct variants so callers can re-prompt instead of aborting;
/// the flood filler signals its no-region outcome through `Option`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("SVG rasterization failed: {0}")]
    Svg(String),

    #[error("Could not allocate a {0}x{1} raster")]
    RasterAlloc(u32, u32),

    #[error("Split line does not divide the region into two parts")]
    RegionNotDivided,

    #[error("Mask has no foreground pixels")]
    EmptyMask,

    #[error("Unknown room id {0}")]
    UnknownRoom(u32),

    #[error("Unknown unit id {0}")]
    UnknownUnit(u32),

    #[error("Region overlaps an already detected room")]
    RegionOccupied,

    #[error("Room {0} is already assigned to a unit")]
    RoomInUnit(u32),

    #[error("No rooms selected")]
    NoRoomsSelected,

    #[error("Core parser error: {0}")]
    Core(#[from] roomplan_core::Error),
}
