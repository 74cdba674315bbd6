use std::path::PathBuf;

use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use river_generator::export::{self, ExportError};
use river_generator::grid::{MapGrid, TerrainType};
use river_generator::river::{
    generate_rivers_with_artifacts, ChannelPreset, RiverMode, RiverParams, RiverRequest,
};

#[derive(Parser, Debug)]
#[command(name = "river_generator")]
#[command(about = "Carve procedural rivers and deltas into a terrain grid")]
struct Args {
    /// Width of the grid in cells
    #[arg(short = 'W', long, default_value = "300")]
    width: usize,

    /// Height of the grid in cells
    #[arg(short = 'H', long, default_value = "300")]
    height: usize,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Downstream heading in degrees (0 = east, 90 = south)
    #[arg(long, default_value = "90")]
    heading: f32,

    /// River layout: single or delta
    #[arg(short, long, default_value = "single")]
    mode: RiverMode,

    /// Channel size preset: creek, river, large, huge
    #[arg(short, long, default_value = "river")]
    preset: ChannelPreset,

    /// Base channel width, overriding the preset
    #[arg(long)]
    base_width: Option<f32>,

    /// JSON file with river parameter overrides
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Share of the map that stays land in delta mode
    #[arg(long, default_value = "0.7")]
    land_fraction: f32,

    /// Width of the shallow ocean shelf in delta mode
    #[arg(long, default_value = "20")]
    shelf: f32,

    /// Output prefix for PNG exports (writes <prefix>_terrain.png, _depth.png, _flow.png)
    #[arg(short, long)]
    output: Option<String>,

    /// Print an ASCII preview of the result
    #[arg(long)]
    ascii: bool,

    /// Write the ASCII preview to this file
    #[arg(long)]
    ascii_out: Option<PathBuf>,

    /// Maximum width of the ASCII preview
    #[arg(long, default_value = "100")]
    ascii_cols: usize,

    /// Print the effective parameters as JSON and exit
    #[arg(long)]
    dump_params: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let params = match &args.config {
        Some(path) => match RiverParams::from_file(path) {
            Ok(params) => params,
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
        None => RiverParams::default(),
    };

    if args.dump_params {
        match params.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let seed = args.seed.unwrap_or_else(|| rand::random());
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let base_width = args.base_width.unwrap_or_else(|| args.preset.base_width());

    println!("Generating rivers with seed: {}", seed);
    println!("Grid size: {}x{}", args.width, args.height);
    println!(
        "Mode: {} ({}), heading {:.1}°, base width {:.1}",
        args.mode,
        args.mode.description(),
        args.heading,
        base_width
    );

    let mut grid = MapGrid::new(args.width, args.height, TerrainType::Soil);
    if args.mode == RiverMode::Delta {
        println!("Painting coastline ({:.0}% land)...", args.land_fraction * 100.0);
        grid.paint_coast(args.heading, args.land_fraction, args.shelf, seed as u32);
    }

    let request = RiverRequest {
        heading: args.heading,
        mode: args.mode,
        base_width,
    };

    println!("Carving rivers...");
    let (output, artifacts) = generate_rivers_with_artifacts(&mut grid, &request, &params, &mut rng);

    println!();
    println!("{}", output.report);
    println!("Seeds: {}", artifacts.seeds);

    println!();
    println!("Terrain:");
    for (terrain, count) in grid.terrain_counts() {
        println!(
            "  {:<14} {:>8} ({:.1}%)",
            terrain.display_name(),
            count,
            100.0 * count as f64 / (args.width * args.height).max(1) as f64
        );
    }

    if let Some(prefix) = &args.output {
        let terrain_path = format!("{}_terrain.png", prefix);
        report_export(&terrain_path, export::export_terrain(&grid, &terrain_path));
        let depth_path = format!("{}_depth.png", prefix);
        report_export(&depth_path, export::export_depth(&artifacts.depth, &depth_path));
        let flow_path = format!("{}_flow.png", prefix);
        report_export(&flow_path, export::export_flow(&output.flow, &flow_path));
    }

    if let Some(path) = &args.ascii_out {
        let label = path.display().to_string();
        report_export(&label, export::export_ascii(&grid, args.ascii_cols, path));
    }

    if args.ascii {
        println!();
        print!("{}", export::render_ascii(&grid, args.ascii_cols));
    }
}

fn report_export(path: &str, result: Result<(), ExportError>) {
    match result {
        Ok(()) => println!("Saved {}", path),
        Err(e) => eprintln!("Error: {}", e),
    }
}
