// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Roomplan Core
//!
//! Parsing and normalization of annotated floor-plan SVG exports.
//!
//! BIM tools export plans as SVG with `<g>` groups carrying semantic
//! class tokens (`IfcWall`, `IfcDoor`, `IfcWindow`, ...). This crate
//! turns such markup into typed [`Element`]s with explicit coordinate
//! lists and bounding boxes, and rewrites oversized viewports to the
//! actual content bounds before rasterization.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use roomplan_core::{normalize_content, SvgDocument};
//!
//! let markup = std::fs::read_to_string("plan.svg")?;
//! let markup = normalize_content(&markup)?;
//! let doc = SvgDocument::parse(&markup)?;
//!
//! println!(
//!     "walls: {}, doors: {}, windows: {}",
//!     doc.walls().len(),
//!     doc.doors().len(),
//!     doc.windows().len(),
//! );
//! ```

pub mod element;
pub mod error;
pub mod normalize;
pub mod parser;

pub use element::{coords_bbox, parse_path_d, Element, ElementClass, Layer, SvgRect};
pub use error::{Error, Result};
pub use normalize::{normalize_content, replace_viewbox};
pub use parser::SvgDocument;
