// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Cityfuse Contributors

//! Cityfuse CLI

use anyhow::{Context, Result};
use cityfuse::pipeline::{ObjectStatus, RunSummary};
use cityfuse::{io, pipeline, PipelineConfig};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cityfuse")]
#[command(about = "Fuse OSM points of interest with CityJSON LOD2 buildings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: match, merge, mesh, export
    Run {
        /// OSM features (GeoJSON or fetch JSON)
        osm: PathBuf,

        /// Directory of CityJSON tiles
        tiles: PathBuf,

        /// Output directory for records and meshes
        #[arg(short, long, default_value = "3d")]
        out: PathBuf,

        /// Matching radius in meters
        #[arg(short, long, default_value_t = 25.0)]
        radius: f64,
    },

    /// Merge only: write <id>_bld.json records, no meshes
    Merge {
        /// OSM features (GeoJSON or fetch JSON)
        osm: PathBuf,

        /// Directory of CityJSON tiles
        tiles: PathBuf,

        /// Output directory for records
        #[arg(short, long, default_value = "3d")]
        out: PathBuf,

        /// Matching radius in meters
        #[arg(short, long, default_value_t = 25.0)]
        radius: f64,
    },

    /// Mesh one merged record file into a GLB
    Mesh {
        /// Merged record (<id>_bld.json)
        input: PathBuf,

        /// Output GLB (defaults to the record name with .glb)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert fetch JSON into compact inspection GeoJSON
    Convert {
        /// Fetch output JSON
        input: PathBuf,

        /// Output GeoJSON
        output: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            osm,
            tiles,
            out,
            radius,
        } => run_command(&osm, &tiles, &out, radius, true, cli.verbose),
        Commands::Merge {
            osm,
            tiles,
            out,
            radius,
        } => run_command(&osm, &tiles, &out, radius, false, cli.verbose),
        Commands::Mesh { input, output } => mesh_command(&input, output.as_deref(), cli.verbose),
        Commands::Convert { input, output } => convert_command(&input, &output),
        Commands::Version => {
            println!("cityfuse v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_command(
    osm: &std::path::Path,
    tiles: &std::path::Path,
    out: &std::path::Path,
    radius: f64,
    emit_meshes: bool,
    verbose: bool,
) -> Result<()> {
    let (objects, skipped) =
        io::osm::read_features(osm).with_context(|| format!("loading {}", osm.display()))?;
    if verbose && skipped > 0 {
        println!("Skipped {} features without usable geometry", skipped);
    }
    println!("Loaded {} OSM objects from {}", objects.len(), osm.display());

    let buildings =
        io::cityjson::load_dir(tiles).with_context(|| format!("loading {}", tiles.display()))?;
    println!(
        "Loaded {} buildings from {}",
        buildings.len(),
        tiles.display()
    );

    let mut config = PipelineConfig::default();
    config.matching.search_radius_m = radius;

    let progress = ProgressBar::new(objects.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let summary = pipeline::run(
        &objects,
        buildings,
        out,
        &config,
        emit_meshes,
        Some(&progress),
    )?;
    progress.finish_and_clear();

    report_summary(&summary, verbose);
    Ok(())
}

fn report_summary(summary: &RunSummary, verbose: bool) {
    println!("\n{}", "━".repeat(60).bright_black());
    println!("{}", "Run summary".bold());
    println!("{}", "━".repeat(60).bright_black());
    println!("  {:<10} {}", "total:", summary.total);
    println!("  {:<10} {}", "matched:", summary.matched.to_string().green());
    println!(
        "  {:<10} {}",
        "unmatched:",
        summary.unmatched.to_string().yellow()
    );
    println!("  {:<10} {}", "merged:", summary.merged);
    println!("  {:<10} {}", "meshed:", summary.meshed);
    if summary.failed > 0 {
        println!("  {:<10} {}", "failed:", summary.failed.to_string().red());
        for report in summary.failures() {
            if let ObjectStatus::Failed { stage, kind, message } = &report.status {
                if verbose {
                    println!(
                        "    {} {} [{:?}/{}] {}",
                        "✗".red(),
                        report.osm_id,
                        stage,
                        kind,
                        message
                    );
                } else {
                    println!("    {} {} [{}]", "✗".red(), report.osm_id, kind);
                }
            }
        }
    } else {
        println!("  {:<10} {}", "failed:", "0".green());
    }
}

fn mesh_command(
    input: &std::path::Path,
    output: Option<&std::path::Path>,
    verbose: bool,
) -> Result<()> {
    let record = io::merged::read_record(input)
        .with_context(|| format!("loading {}", input.display()))?;

    let mesh = pipeline::build_mesh(&record, &Default::default())
        .with_context(|| format!("meshing {}", record.osm_id))?;
    if verbose {
        println!(
            "{}: {} vertices, {} triangles",
            record.osm_id,
            mesh.vertex_count(),
            mesh.triangle_count()
        );
    }

    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None => input.with_extension("glb"),
    };
    io::export_glb(&mesh, &out_path)
        .with_context(|| format!("writing {}", out_path.display()))?;
    println!("{} {}", "Wrote".green(), out_path.display());
    Ok(())
}

fn convert_command(input: &std::path::Path, output: &std::path::Path) -> Result<()> {
    let (objects, skipped) = io::osm::read_features(input)
        .with_context(|| format!("loading {}", input.display()))?;
    io::osm::write_geojson(&objects, output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "{} {} features to {} ({} skipped)",
        "Converted".green(),
        objects.len(),
        output.display(),
        skipped
    );
    Ok(())
}
