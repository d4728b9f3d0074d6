// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document walk over annotated floor-plan SVG markup
//!
//! The BIM exporter annotates `<g>` groups with CSS class tokens
//! (`IfcWall`, `IfcDoor`, ...) plus `cut`/`projection` layer tokens and
//! namespaced `ifc:name`/`ifc:guid` attributes. Groups without a
//! recognized class are transparent: the walk recurses into them so
//! elements nested inside organizational wrappers are still found.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::element::{coords_bbox, parse_path_d, Element, ElementClass, Layer};
use crate::error::{Error, Result};
use crate::SvgRect;

/// Parsed floor-plan document: typed elements plus the declared viewport
#[derive(Debug, Clone)]
pub struct SvgDocument {
    pub elements: Vec<Element>,
    /// Declared viewport rectangle in SVG units
    pub viewbox: SvgRect,
    /// Physical width/height in millimeters, 0 when undeclared
    pub width_mm: f64,
    pub height_mm: f64,
}

/// A matched group being collected, open until its end tag
struct OpenGroup {
    element: Element,
    depth: usize,
}

impl SvgDocument {
    /// Parse SVG markup into the ordered set of recognized elements
    ///
    /// Elements whose groups contain no resolvable coordinates are
    /// discarded (no bounding box can be computed for them). A missing
    /// viewBox is fatal: no coordinate frame exists without it.
    pub fn parse(markup: &str) -> Result<Self> {
        let mut reader = Reader::from_str(markup);

        let mut elements = Vec::new();
        let mut viewbox = None;
        let mut width_mm = 0.0;
        let mut height_mm = 0.0;
        let mut open: Option<OpenGroup> = None;
        let mut depth = 0usize;

        loop {
            match reader.read_event()? {
                Event::Start(tag) => {
                    depth += 1;
                    match tag.local_name().as_ref() {
                        b"svg" if viewbox.is_none() => {
                            let (vb, w, h) = parse_viewport(&tag)?;
                            viewbox = Some(vb);
                            width_mm = w;
                            height_mm = h;
                        }
                        b"g" if open.is_none() => {
                            if let Some(element) = match_group(&tag)? {
                                open = Some(OpenGroup {
                                    element,
                                    depth: depth - 1,
                                });
                            }
                        }
                        b"path" => {
                            if let Some(group) = open.as_mut() {
                                collect_path(&tag, &mut group.element)?;
                            }
                        }
                        _ => {}
                    }
                }
                Event::Empty(tag) => {
                    if tag.local_name().as_ref() == b"path" {
                        if let Some(group) = open.as_mut() {
                            collect_path(&tag, &mut group.element)?;
                        }
                    }
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if open.as_ref().is_some_and(|g| g.depth == depth) {
                        if let Some(group) = open.take() {
                            let mut element = group.element;
                            if let Some(bbox) = coords_bbox(element.paths.iter().flatten()) {
                                element.bbox = bbox;
                                elements.push(element);
                            } else {
                                debug!(id = %element.id, "discarding element without coordinates");
                            }
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let viewbox = viewbox.ok_or(Error::MissingViewBox)?;
        debug!(
            elements = elements.len(),
            ?viewbox,
            "parsed floor-plan document"
        );

        Ok(Self {
            elements,
            viewbox,
            width_mm,
            height_mm,
        })
    }

    pub fn elements_of(&self, class: ElementClass) -> Vec<&Element> {
        self.elements.iter().filter(|e| e.class == class).collect()
    }

    /// Both wall variants, in any layer
    pub fn walls(&self) -> Vec<&Element> {
        self.elements.iter().filter(|e| e.class.is_wall()).collect()
    }

    pub fn doors(&self) -> Vec<&Element> {
        self.elements_of(ElementClass::Door)
    }

    pub fn windows(&self) -> Vec<&Element> {
        self.elements_of(ElementClass::Window)
    }

    /// Elements forming room boundaries: walls, doors and columns in the cut layer
    pub fn boundary_elements(&self) -> Vec<&Element> {
        self.elements
            .iter()
            .filter(|e| {
                e.layer == Layer::Cut
                    && (e.class.is_wall()
                        || e.class == ElementClass::Door
                        || e.class == ElementClass::Column)
            })
            .collect()
    }
}

/// Read viewBox and physical dimensions off the root `<svg>` tag
fn parse_viewport(tag: &BytesStart) -> Result<(SvgRect, f64, f64)> {
    let mut viewbox = None;
    let mut width_mm = 0.0;
    let mut height_mm = 0.0;

    for attr in tag.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"viewBox" => {
                let raw = attr.unescape_value()?;
                viewbox = Some(parse_viewbox(&raw)?);
            }
            b"width" => width_mm = parse_physical(&attr.unescape_value()?),
            b"height" => height_mm = parse_physical(&attr.unescape_value()?),
            _ => {}
        }
    }

    Ok((viewbox.ok_or(Error::MissingViewBox)?, width_mm, height_mm))
}

/// Parse a `viewBox` value: four whitespace-separated numbers
pub fn parse_viewbox(raw: &str) -> Result<SvgRect> {
    let mut parts = raw.split_whitespace().map(str::parse::<f64>);
    let mut next = || -> Result<f64> {
        parts
            .next()
            .and_then(std::result::Result::ok)
            .ok_or_else(|| Error::InvalidViewBox(raw.to_string()))
    };
    Ok(SvgRect::new(next()?, next()?, next()?, next()?))
}

/// Strip a unit suffix ("210mm" -> 210.0); 0 when nothing numeric remains
fn parse_physical(raw: &str) -> f64 {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().unwrap_or(0.0)
}

/// Check a `<g>` tag against the class allow-list, returning a shell
/// element (paths still empty) when it matches
fn match_group(tag: &BytesStart) -> Result<Option<Element>> {
    let mut class_attr = String::new();
    let mut id = String::new();
    let mut name = String::new();
    let mut guid = String::new();

    for attr in tag.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"class" => class_attr = attr.unescape_value()?.into_owned(),
            b"id" => id = attr.unescape_value()?.into_owned(),
            b"ifc:name" => name = attr.unescape_value()?.into_owned(),
            b"ifc:guid" => guid = attr.unescape_value()?.into_owned(),
            _ => {}
        }
    }

    let tokens: Vec<&str> = class_attr.split_whitespace().collect();
    let Some(class) = tokens.iter().find_map(|t| ElementClass::from_class_token(t)) else {
        return Ok(None);
    };

    let layer = if tokens.contains(&"projection") {
        Layer::Projection
    } else if tokens.contains(&"cut") {
        Layer::Cut
    } else {
        Layer::Unknown
    };

    let material = tokens
        .iter()
        .find(|t| t.starts_with("material-"))
        .map(|t| (*t).to_string())
        .unwrap_or_default();

    Ok(Some(Element {
        id,
        class,
        name,
        guid,
        material,
        layer,
        paths: Vec::new(),
        bbox: SvgRect::new(0.0, 0.0, 0.0, 0.0),
    }))
}

/// Append a `<path>` primitive's coordinates to the open group
fn collect_path(tag: &BytesStart, element: &mut Element) -> Result<()> {
    for attr in tag.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"d" {
            let coords = parse_path_d(&attr.unescape_value()?);
            if !coords.is_empty() {
                element.paths.push(coords);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 80" width="200mm" height="160mm">
      <defs><marker id="m"/></defs>
      <g class="section">
        <g id="w1" class="IfcWallStandardCase cut material-concrete" ifc:name="Wall-01" ifc:guid="2aG">
          <path d="M 10,10 L 90,10 L 90,12 L 10,12 Z"/>
        </g>
        <g id="d1" class="IfcDoor projection">
          <path d="M 40,10 l 8,0"/>
        </g>
        <g id="empty" class="IfcWindow cut"></g>
        <g class="annotation">
          <g id="w2" class="IfcWall cut">
            <path d="M 10,70 90,70"/>
          </g>
        </g>
      </g>
    </svg>"#;

    #[test]
    fn test_parse_viewport() {
        let doc = SvgDocument::parse(PLAN).unwrap();
        assert_eq!(doc.viewbox, SvgRect::new(0.0, 0.0, 100.0, 80.0));
        assert_eq!(doc.width_mm, 200.0);
        assert_eq!(doc.height_mm, 160.0);
    }

    #[test]
    fn test_transparent_wrapper_groups() {
        // w2 sits two wrapper groups deep and must still be found
        let doc = SvgDocument::parse(PLAN).unwrap();
        let ids: Vec<&str> = doc.elements.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["w1", "d1", "w2"]);
    }

    #[test]
    fn test_empty_group_discarded() {
        let doc = SvgDocument::parse(PLAN).unwrap();
        assert!(doc.windows().is_empty());
    }

    #[test]
    fn test_element_attributes() {
        let doc = SvgDocument::parse(PLAN).unwrap();
        let wall = &doc.elements[0];
        assert_eq!(wall.class, ElementClass::WallStandardCase);
        assert_eq!(wall.layer, Layer::Cut);
        assert_eq!(wall.material, "material-concrete");
        assert_eq!(wall.name, "Wall-01");
        assert_eq!(wall.guid, "2aG");
        assert_eq!(wall.bbox, SvgRect::new(10.0, 10.0, 80.0, 2.0));
    }

    #[test]
    fn test_typed_accessors() {
        let doc = SvgDocument::parse(PLAN).unwrap();
        assert_eq!(doc.walls().len(), 2);
        assert_eq!(doc.doors().len(), 1);
        // d1 is projection layer, so boundary elements are the two walls
        assert_eq!(doc.boundary_elements().len(), 2);
    }

    #[test]
    fn test_missing_viewbox_is_fatal() {
        let err = SvgDocument::parse(r#"<svg width="10mm"><g/></svg>"#).unwrap_err();
        assert!(matches!(err, Error::MissingViewBox));
    }
}
