// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed building elements extracted from annotated SVG groups

use serde::{Deserialize, Serialize};

/// Semantic class of a building element, decided once at parse time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ElementClass {
    Wall,
    WallStandardCase,
    Door,
    Window,
    Slab,
    Column,
    Space,
}

impl ElementClass {
    /// Map a CSS class token to an element class
    ///
    /// Tokens outside the allow-list yield `None`; their groups are
    /// treated as transparent containers during the document walk.
    pub fn from_class_token(token: &str) -> Option<Self> {
        match token {
            "IfcWall" => Some(Self::Wall),
            "IfcWallStandardCase" => Some(Self::WallStandardCase),
            "IfcDoor" => Some(Self::Door),
            "IfcWindow" => Some(Self::Window),
            "IfcSlab" => Some(Self::Slab),
            "IfcColumn" => Some(Self::Column),
            "IfcSpace" => Some(Self::Space),
            _ => None,
        }
    }

    /// Both wall variants count as walls for boundary rasterization
    pub fn is_wall(self) -> bool {
        matches!(self, Self::Wall | Self::WallStandardCase)
    }
}

/// Drawing layer of an element within the plan cut
///
/// Cut-layer geometry is the true structural footprint; projection
/// geometry (door swings, fixtures seen from above) is not.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Layer {
    Cut,
    Projection,
    #[default]
    Unknown,
}

/// Axis-aligned rectangle in SVG-unit coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SvgRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SvgRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn midpoint(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Grow the rectangle by `margin` on every side
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    pub fn longest_side(&self) -> f64 {
        self.width.max(self.height)
    }
}

/// One semantic building element parsed from an annotated SVG group
///
/// Immutable once parsed. `paths` holds the group's path primitives as
/// explicit coordinate lists in SVG-unit space; `bbox` spans all of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    /// Stable identifier (the group's `id` attribute)
    pub id: String,
    pub class: ElementClass,
    /// Human-readable name from the exporter's namespaced attributes
    pub name: String,
    /// Source-model GUID from the exporter's namespaced attributes
    pub guid: String,
    /// Material class token (`material-*`), empty when absent
    pub material: String,
    pub layer: Layer,
    /// Polylines in SVG-unit coordinates
    pub paths: Vec<Vec<(f64, f64)>>,
    pub bbox: SvgRect,
}

/// Parse an SVG path `d` attribute into explicit coordinates
///
/// Supports absolute/relative move and line commands (M/m/L/l) and
/// close (Z/z), including the implicit-repeat rule: coordinate pairs
/// following a completed move command are treated as line commands.
/// Curve commands are not produced by the BIM exporter and are skipped.
pub fn parse_path_d(d: &str) -> Vec<(f64, f64)> {
    let mut coords = Vec::new();
    let mut cursor = (0.0_f64, 0.0_f64);
    let mut tokens = PathTokens::new(d);

    let mut cmd = None;
    while let Some(token) = tokens.next() {
        match token {
            PathToken::Command(c) => match c {
                'M' | 'm' | 'L' | 'l' => cmd = Some(c),
                'Z' | 'z' => cmd = None,
                // Unsupported command: drop it and everything until the next one
                _ => cmd = None,
            },
            PathToken::Number(x) => {
                let Some(active) = cmd else { continue };
                let Some(PathToken::Number(y)) = tokens.next() else {
                    break; // dangling x coordinate at end of data
                };
                let (mut px, mut py) = (x, y);
                if active == 'm' || active == 'l' {
                    px += cursor.0;
                    py += cursor.1;
                }
                cursor = (px, py);
                coords.push((px, py));
                // Implicit repeat: M -> L, m -> l
                cmd = Some(match active {
                    'M' => 'L',
                    'm' => 'l',
                    other => other,
                });
            }
        }
    }

    coords
}

/// Compute the bounding box of a coordinate set, `None` when empty
pub fn coords_bbox<'a, I>(coords: I) -> Option<SvgRect>
where
    I: IntoIterator<Item = &'a (f64, f64)>,
{
    let mut iter = coords.into_iter();
    let &(x0, y0) = iter.next()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
    for &(x, y) in iter {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    Some(SvgRect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

enum PathToken {
    Command(char),
    Number(f64),
}

/// Minimal scanner over path data: command letters and numbers,
/// separated by whitespace or commas
struct PathTokens<'a> {
    rest: &'a str,
}

impl<'a> PathTokens<'a> {
    fn new(d: &'a str) -> Self {
        Self { rest: d }
    }
}

impl Iterator for PathTokens<'_> {
    type Item = PathToken;

    fn next(&mut self) -> Option<PathToken> {
        let s = self.rest.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
        let mut chars = s.char_indices();
        let (_, first) = chars.next()?;

        if first.is_ascii_alphabetic() {
            self.rest = &s[1..];
            return Some(PathToken::Command(first));
        }

        // Number: sign, digits, optional fraction, optional exponent.
        // A second sign or dot starts the next number.
        let mut end = s.len();
        let mut seen_dot = false;
        let mut seen_exp = false;
        for (i, c) in s.char_indices() {
            let ok = match c {
                '0'..='9' => true,
                '+' | '-' => i == 0 || s.as_bytes()[i - 1] == b'e' || s.as_bytes()[i - 1] == b'E',
                '.' if !seen_dot && !seen_exp => {
                    seen_dot = true;
                    true
                }
                'e' | 'E' if !seen_exp && i > 0 => {
                    seen_exp = true;
                    true
                }
                _ => false,
            };
            if !ok {
                end = i;
                break;
            }
        }

        let (num, rest) = s.split_at(end);
        self.rest = rest;
        match num.parse::<f64>() {
            Ok(v) => Some(PathToken::Number(v)),
            // Unparseable run (stray separator): skip one byte and retry
            Err(_) => {
                self.rest = &s[1.min(s.len())..];
                self.next()
            }
        }
    }
}
