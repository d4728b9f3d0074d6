// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for parsing and normalization operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or rewriting floor-plan SVG markup
#[derive(Error, Debug)]
pub enum Error {
    #[error("SVG has no viewBox attribute")]
    MissingViewBox,

    #[error("Malformed viewBox attribute: {0:?}")]
    InvalidViewBox(String),

    #[error("Malformed SVG markup: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed SVG attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
}
