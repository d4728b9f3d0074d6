// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Viewport normalization
//!
//! BIM exporters commonly declare a viewBox far larger than the drawn
//! plan, leaving dead margin that wastes raster resolution. This pass
//! scans the geometry-bearing elements outside `<defs>` for the true
//! content bounds and rewrites the viewBox to enclose them plus a small
//! margin, rescaling the physical width/height attributes to match.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::parser::parse_viewbox;
use crate::SvgRect;

/// Margin added around the content, as a fraction of its longest extent
const MARGIN_FRACTION: f64 = 0.01;

/// Rewrite the viewBox so it tightly encloses the drawn content
///
/// Returns the rewritten markup, or the input unchanged when no content
/// geometry could be located (logged, not fatal). A missing viewBox is
/// fatal: nothing downstream can establish a coordinate frame.
pub fn normalize_content(markup: &str) -> Result<String> {
    let old_viewbox = find_viewbox(markup)?;

    let Some(content) = content_bbox(markup)? else {
        warn!("no content geometry found, leaving viewBox unchanged");
        return Ok(markup.to_string());
    };

    let margin = content.longest_side() * MARGIN_FRACTION;
    let new_viewbox = content.expanded(margin);

    let mut rewritten = replace_viewbox(markup, new_viewbox);

    // Physical width/height scale with the viewBox so that mm-per-unit
    // stays constant
    if let Some(old_mm) = read_physical_attr(markup, "width") {
        if old_viewbox.width > 0.0 {
            let mm_per_unit = old_mm / old_viewbox.width;
            rewritten = set_physical_attr(&rewritten, "width", new_viewbox.width * mm_per_unit);
            rewritten = set_physical_attr(&rewritten, "height", new_viewbox.height * mm_per_unit);
        }
    }

    info!(
        old = ?old_viewbox,
        new = ?new_viewbox,
        "normalized viewBox to content bounds"
    );

    Ok(rewritten)
}

/// Locate and parse the first viewBox attribute in the markup
fn find_viewbox(markup: &str) -> Result<SvgRect> {
    let raw = viewbox_span(markup)
        .map(|(start, end)| &markup[start..end])
        .ok_or(Error::MissingViewBox)?;
    parse_viewbox(raw)
}

/// Byte span of the viewBox attribute value, exclusive of quotes
fn viewbox_span(markup: &str) -> Option<(usize, usize)> {
    let key = "viewBox=\"";
    let start = markup.find(key)? + key.len();
    let end = start + markup[start..].find('"')?;
    Some((start, end))
}

/// Replace the viewBox attribute value in place
pub fn replace_viewbox(markup: &str, viewbox: SvgRect) -> String {
    let value = format!(
        "{} {} {} {}",
        viewbox.x, viewbox.y, viewbox.width, viewbox.height
    );
    match viewbox_span(markup) {
        Some((start, end)) => format!("{}{}{}", &markup[..start], value, &markup[end..]),
        None => markup.to_string(),
    }
}

/// Byte span of a `attr="...mm"`-style root attribute value
fn physical_attr_span(markup: &str, attr: &str) -> Option<(usize, usize)> {
    let key = format!("{attr}=\"");
    let start = markup.find(&key)? + key.len();
    let end = start + markup[start..].find('"')?;
    markup[start..end].strip_suffix("mm")?;
    Some((start, end))
}

/// Read a `width="123mm"`-style root attribute, `None` when absent
fn read_physical_attr(markup: &str, attr: &str) -> Option<f64> {
    let (start, end) = physical_attr_span(markup, attr)?;
    markup[start..end].strip_suffix("mm")?.parse().ok()
}

/// Overwrite a `width="123mm"`-style root attribute with a new value
fn set_physical_attr(markup: &str, attr: &str, value_mm: f64) -> String {
    match physical_attr_span(markup, attr) {
        Some((start, end)) => {
            format!("{}{}mm{}", &markup[..start], value_mm, &markup[end..])
        }
        None => markup.to_string(),
    }
}

/// Scan geometry-bearing elements outside `<defs>` for the content bounds
fn content_bbox(markup: &str) -> Result<Option<SvgRect>> {
    let mut reader = Reader::from_str(markup);
    let mut xs: Vec<f64> = Vec::new();
    let mut ys: Vec<f64> = Vec::new();
    let mut defs_depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(tag) => {
                if tag.local_name().as_ref() == b"defs" {
                    defs_depth += 1;
                } else if defs_depth == 0 {
                    scan_tag(&tag, &mut xs, &mut ys)?;
                }
            }
            Event::Empty(tag) => {
                if defs_depth == 0 && tag.local_name().as_ref() != b"defs" {
                    scan_tag(&tag, &mut xs, &mut ys)?;
                }
            }
            Event::End(tag) => {
                if tag.local_name().as_ref() == b"defs" {
                    defs_depth = defs_depth.saturating_sub(1);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if xs.is_empty() || ys.is_empty() {
        return Ok(None);
    }

    let (min_x, max_x) = min_max(&xs);
    let (min_y, max_y) = min_max(&ys);
    Ok(Some(SvgRect::new(
        min_x,
        min_y,
        max_x - min_x,
        max_y - min_y,
    )))
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

/// Collect coordinates from one geometry primitive
fn scan_tag(tag: &BytesStart, xs: &mut Vec<f64>, ys: &mut Vec<f64>) -> Result<()> {
    match tag.local_name().as_ref() {
        b"path" => {
            if let Some(d) = attr_value(tag, b"d")? {
                for (x, y) in crate::element::parse_path_d(&d) {
                    xs.push(x);
                    ys.push(y);
                }
            }
        }
        b"line" => {
            for key in [b"x1" as &[u8], b"x2"] {
                if let Some(v) = attr_float(tag, key)? {
                    xs.push(v);
                }
            }
            for key in [b"y1" as &[u8], b"y2"] {
                if let Some(v) = attr_float(tag, key)? {
                    ys.push(v);
                }
            }
        }
        b"rect" => {
            if let (Some(x), Some(y), Some(w), Some(h)) = (
                attr_float(tag, b"x")?,
                attr_float(tag, b"y")?,
                attr_float(tag, b"width")?,
                attr_float(tag, b"height")?,
            ) {
                xs.extend([x, x + w]);
                ys.extend([y, y + h]);
            }
        }
        b"circle" => {
            if let (Some(cx), Some(cy), Some(r)) = (
                attr_float(tag, b"cx")?,
                attr_float(tag, b"cy")?,
                attr_float(tag, b"r")?,
            ) {
                xs.extend([cx - r, cx + r]);
                ys.extend([cy - r, cy + r]);
            }
        }
        _ => {}
    }
    Ok(())
}

fn attr_value(tag: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in tag.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn attr_float(tag: &BytesStart, key: &[u8]) -> Result<Option<f64>> {
    Ok(attr_value(tag, key)?.and_then(|v| v.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_bbox_skips_defs() {
        let markup = r#"<svg viewBox="0 0 500 500">
          <defs><path d="M 0,0 L 400,400"/><rect x="450" y="450" width="10" height="10"/></defs>
          <path d="M 100,100 L 200,150"/>
          <line x1="120" y1="90" x2="180" y2="160"/>
        </svg>"#;
        let bbox = content_bbox(markup).unwrap().unwrap();
        assert_eq!(bbox, SvgRect::new(100.0, 90.0, 100.0, 70.0));
    }

    #[test]
    fn test_rect_and_circle_extents() {
        let markup = r#"<svg viewBox="0 0 100 100">
          <rect x="10" y="20" width="30" height="5"/>
          <circle cx="60" cy="60" r="15"/>
        </svg>"#;
        let bbox = content_bbox(markup).unwrap().unwrap();
        assert_eq!(bbox, SvgRect::new(10.0, 20.0, 65.0, 55.0));
    }

    #[test]
    fn test_normalize_rewrites_viewbox_with_margin() {
        let markup = r#"<svg viewBox="0 0 1000 1000" width="500mm" height="500mm">
          <path d="M 100,100 L 300,100 L 300,200 L 100,200 Z"/>
        </svg>"#;
        let out = normalize_content(markup).unwrap();
        // Content 200x100, margin = 1% of 200 = 2
        let vb = find_viewbox(&out).unwrap();
        assert_eq!(vb, SvgRect::new(98.0, 98.0, 204.0, 104.0));
        // mm-per-unit was 0.5, so new physical width is 102mm
        assert!(out.contains("width=\"102mm\""));
    }

    #[test]
    fn test_no_geometry_passthrough() {
        let markup = r#"<svg viewBox="0 0 10 10"><desc>empty</desc></svg>"#;
        assert_eq!(normalize_content(markup).unwrap(), markup);
    }

    #[test]
    fn test_missing_viewbox_is_fatal() {
        assert!(normalize_content("<svg><path d=\"M 0,0 L 1,1\"/></svg>").is_err());
    }
}
