// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Batch room extraction and export
//!
//! Reads an annotated plan SVG plus a plan file describing seed points
//! and splits, runs the full pipeline and writes the export artifacts:
//! per-room categorical masks, 3D boundaries, per-unit combined masks,
//! overview renders and the metadata document.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::info;

use roomplan_core::{normalize_content, SvgDocument};
use roomplan_vision::artifacts::{
    self, room_entry, room_file_name, Boundary3D, Metadata, UnitEntry,
};
use roomplan_vision::{
    mask_to_contour, snap_to_contour, split_mask, BoundaryRaster, FloodFiller, MaskComposer,
    Session,
};

#[derive(Parser)]
#[command(
    name = "rooms-export",
    about = "Extract labeled rooms from an annotated floor-plan SVG"
)]
struct Cli {
    /// Annotated floor-plan SVG
    svg: PathBuf,

    /// Plan file (JSON) with unit/room seeds, labels and splits
    plan: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Room extrusion height in meters
    #[arg(long, default_value_t = 2.8)]
    room_height: f64,

    /// Target longest raster side in pixels
    #[arg(long, default_value_t = 2000.0)]
    target_side: f64,

    /// Vertex budget for exported boundary polygons
    #[arg(long, default_value_t = artifacts::DEFAULT_MAX_VERTICES)]
    max_vertices: usize,
}

/// Extraction plan: seeds are in SVG-unit coordinates
#[derive(Deserialize)]
struct Plan {
    units: Vec<UnitRequest>,
}

#[derive(Deserialize)]
struct UnitRequest {
    rooms: Vec<RoomRequest>,
}

#[derive(Deserialize)]
struct RoomRequest {
    seed: [f64; 2],
    #[serde(default)]
    label: String,
    split: Option<SplitRequest>,
}

#[derive(Deserialize)]
struct SplitRequest {
    from: [f64; 2],
    to: [f64; 2],
    labels: [String; 2],
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let input_name = cli
        .svg
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("plan")
        .to_string();

    let raw = fs::read_to_string(&cli.svg)
        .with_context(|| format!("reading {}", cli.svg.display()))?;
    let plan: Plan = serde_json::from_str(
        &fs::read_to_string(&cli.plan)
            .with_context(|| format!("reading {}", cli.plan.display()))?,
    )
    .context("parsing plan file")?;

    let markup = normalize_content(&raw).context("normalizing SVG content")?;
    let doc = SvgDocument::parse(&markup).context("parsing SVG elements")?;
    info!(
        walls = doc.walls().len(),
        doors = doc.doors().len(),
        windows = doc.windows().len(),
        "parsed plan"
    );

    let viewbox = doc.viewbox;
    let scale = cli.target_side / viewbox.longest_side();
    let raster = BoundaryRaster::build(
        &markup,
        viewbox,
        scale,
        &doc.walls(),
        &doc.doors(),
        &doc.windows(),
    )?;

    let mut session = Session::new(raster);
    for unit in &plan.units {
        let mut room_ids = Vec::new();
        for request in &unit.rooms {
            let seed = session.raster().svg_to_pixel(request.seed[0], request.seed[1]);
            let Some(mask) = FloodFiller::new(session.raster()).fill_at(seed) else {
                bail!(
                    "no room found at seed ({}, {})",
                    request.seed[0],
                    request.seed[1]
                );
            };
            let room_id = session.add_room(mask)?;
            session.label_room(room_id, &request.label)?;

            match &request.split {
                None => room_ids.push(room_id),
                Some(split) => {
                    let (a, b) = apply_split(&mut session, room_id, split)?;
                    room_ids.extend([a, b]);
                }
            }
        }
        let unit_id = session.save_unit(&room_ids)?;
        info!(unit_id, rooms = room_ids.len(), "saved unit");
    }

    export(&cli, &input_name, &markup, &doc, &session)
}

/// Snap the requested cut endpoints onto the room boundary and split
fn apply_split(session: &mut Session, room_id: u32, split: &SplitRequest) -> Result<(u32, u32)> {
    let raster = session.raster();
    let p1 = raster.svg_to_pixel(split.from[0], split.from[1]);
    let p2 = raster.svg_to_pixel(split.to[0], split.to[1]);

    let room = session
        .room(room_id)
        .context("split target room disappeared")?;
    let contour = mask_to_contour(&room.mask)?;
    let p1 = snap_to_contour(p1, &contour).unwrap_or(p1);
    let p2 = snap_to_contour(p2, &contour).unwrap_or(p2);

    let (half_a, half_b) = split_mask(&room.mask, p1, p2)?;
    let (label_a, label_b) = (split.labels[0].clone(), split.labels[1].clone());
    let children = session.apply_split(room_id, half_a, half_b, (p1, p2), (&label_a, &label_b))?;
    info!(room_id, ?p1, ?p2, "split room");
    Ok(children)
}

fn export(
    cli: &Cli,
    input_name: &str,
    markup: &str,
    doc: &SvgDocument,
    session: &Session,
) -> Result<()> {
    let base_dir = cli.output.join(input_name);
    fs::create_dir_all(&base_dir)
        .with_context(|| format!("creating {}", base_dir.display()))?;

    let centered_name = format!("{input_name}_centered.svg");
    fs::write(base_dir.join(&centered_name), markup)?;

    let composer = MaskComposer::new(session.raster(), doc.doors(), doc.windows());
    let mut metadata = Metadata::new(&format!("{input_name}.svg"), &centered_name);

    for (index, unit) in session.units().iter().enumerate() {
        let unit_dir = base_dir.join(format!("unit_{}", unit.id));
        fs::create_dir_all(&unit_dir)?;

        let rooms = session.rooms_in_unit(unit.id);
        let mut entry = UnitEntry {
            unit_id: unit.id,
            rooms: Vec::new(),
            combined_file: format!("unit_{0}/unit_{0}_combined.png", unit.id),
            overview_file: format!("unit_{0}/unit_{0}_overview.png", unit.id),
        };

        for (position, room) in rooms.iter().copied().enumerate() {
            let position = position + 1;
            let mask = composer.room_mask(room)?;
            let file_name = room_file_name(unit.id, position, &room.label);
            mask.save(unit_dir.join(&file_name))
                .with_context(|| format!("writing {file_name}"))?;

            let boundary =
                Boundary3D::from_room(room, session.raster(), cli.room_height, cli.max_vertices)?;
            let boundary_name = format!("unit_{}_room_{}_boundary.json", unit.id, position);
            fs::write(
                unit_dir.join(&boundary_name),
                serde_json::to_string_pretty(&boundary)?,
            )?;

            entry.rooms.push(room_entry(room, unit.id, position));
        }

        let combined = composer.unit_mask(&rooms)?;
        combined.save(base_dir.join(&entry.combined_file))?;

        if let Some(overview) = artifacts::unit_overview(session.raster(), &rooms, index) {
            overview.save(base_dir.join(&entry.overview_file))?;
        }
        if let Some(svg) = artifacts::unit_overview_svg(markup, &rooms) {
            fs::write(unit_dir.join(format!("unit_{}_overview.svg", unit.id)), svg)?;
        }

        metadata.units.push(entry);
    }

    let meta_path = base_dir.join("metadata.json");
    fs::write(&meta_path, serde_json::to_string_pretty(&metadata)?)?;
    info!(path = %meta_path.display(), units = metadata.units.len(), "export complete");
    Ok(())
}
