/// UV3 converter command line entry point
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use std::fs::File;
use std::io::{BufReader, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uv3_converter::inspect::StreamSummary;
use uv3_converter::manifest::RunManifest;
use uv3_converter::mesh::Mesh;
use uv3_converter::palette::{PALETTE_NAMES, Palette};
use uv3_converter::raster::Raster;
use uv3_converter::raster_io::read_raster;
use uv3_converter::reproject::{Crs, to_wgs84};
use uv3_converter::uv3::{Rgb, Uv3Writer};
use uv3_converter::{ConversionPipeline, DemColourOptions, ImageryOptions, MeshOptions};

#[derive(Parser, Debug)]
#[command(name = "uv3-converter", version, about = "Convert meshes, DEMs and imagery to UV3")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Triangle mesh (OBJ/OFF) to triangle vertices.
    Mesh(MeshArgs),
    /// Imagery pixels as points, heights from a DEM.
    RgbDem(RgbDemArgs),
    /// Imagery pixel quads as two triangles each.
    Poly(PolyArgs),
    /// DEM pixels as palette-coloured points.
    DemColour(DemColourArgs),
    /// Print a summary of an existing UV3 file.
    Inspect {
        /// UV3 file to read
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// UV3 file to write
    #[arg(short, long)]
    output: PathBuf,

    /// Also write <output>.json describing the run
    #[arg(long, default_value_t = false)]
    manifest: bool,
}

#[derive(Args, Debug)]
struct MeshArgs {
    /// Mesh file (.obj or .off)
    #[arg(short, long)]
    input: PathBuf,

    /// Vertices are Swiss grid (LV03/LV95) easting, northing, height
    #[arg(long, default_value_t = false)]
    swiss: bool,

    /// Apply SITG local scaling to vertices
    #[arg(long, default_value_t = false)]
    sitg_scaling: bool,

    /// Vertex colour as R,G,B
    #[arg(long, value_parser = parse_colour, default_value = "173,73,74")]
    colour: Rgb,

    #[command(flatten)]
    out: OutputArgs,
}

#[derive(Args, Debug)]
struct ImageryArgs {
    /// Imagery raster
    #[arg(short, long)]
    input: PathBuf,

    /// Band used for red
    #[arg(short = 'r', long, default_value_t = 1)]
    red: usize,

    /// Band used for green
    #[arg(short = 'g', long, default_value_t = 2)]
    green: usize,

    /// Band used for blue
    #[arg(short = 'b', long, default_value_t = 3)]
    blue: usize,

    /// Imagery nodata value
    #[arg(long, allow_negative_numbers = true)]
    nodata: Option<f64>,

    /// Coordinate system of the imagery
    #[arg(long, value_enum, default_value_t = CrsArg::Wgs84)]
    source_crs: CrsArg,

    /// DEM nodata value; these cells read as elevation 0
    #[arg(long, allow_negative_numbers = true)]
    dem_nodata: Option<f64>,

    /// Coordinate system of the DEM
    #[arg(long, value_enum, default_value_t = CrsArg::Wgs84)]
    dem_crs: CrsArg,
}

impl ImageryArgs {
    fn options(&self) -> ImageryOptions {
        ImageryOptions {
            bands: [self.red, self.green, self.blue],
        }
    }
}

#[derive(Args, Debug)]
struct RgbDemArgs {
    #[command(flatten)]
    imagery: ImageryArgs,

    /// Elevation raster
    #[arg(short, long)]
    dem: PathBuf,

    #[command(flatten)]
    out: OutputArgs,
}

#[derive(Args, Debug)]
struct PolyArgs {
    #[command(flatten)]
    imagery: ImageryArgs,

    /// Optional elevation raster; quads are flat without it
    #[arg(short, long)]
    dem: Option<PathBuf>,

    #[command(flatten)]
    out: OutputArgs,
}

#[derive(Args, Debug)]
struct DemColourArgs {
    /// Elevation raster
    #[arg(short, long)]
    input: PathBuf,

    /// Colour palette
    #[arg(short, long, default_value = constants::raster::DEFAULT_PALETTE)]
    palette: String,

    /// Emit every point at elevation 0
    #[arg(long, default_value_t = false)]
    no_height: bool,

    /// DEM nodata value
    #[arg(long, allow_negative_numbers = true)]
    nodata: Option<f64>,

    /// Coordinate system of the DEM
    #[arg(long, value_enum, default_value_t = CrsArg::Wgs84)]
    source_crs: CrsArg,

    #[command(flatten)]
    out: OutputArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CrsArg {
    Wgs84,
    Lv03,
    Lv95,
}

impl From<CrsArg> for Crs {
    fn from(arg: CrsArg) -> Self {
        match arg {
            CrsArg::Wgs84 => Crs::Wgs84,
            CrsArg::Lv03 => Crs::Lv03,
            CrsArg::Lv95 => Crs::Lv95,
        }
    }
}

fn parse_colour(s: &str) -> std::result::Result<Rgb, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let &[r, g, b] = parts.as_slice() else {
        return Err(format!("expected R,G,B, got '{s}'"));
    };
    let channel = |v: &str| v.parse::<u8>().map_err(|e| format!("bad channel '{v}': {e}"));
    Ok(Rgb::new(channel(r)?, channel(g)?, channel(b)?))
}

fn load_raster(path: &Path, nodata: Option<f64>, crs: CrsArg) -> Result<Raster> {
    let raster = read_raster(path, nodata)
        .with_context(|| format!("reading raster {}", path.display()))?;
    to_wgs84(raster, crs.into()).with_context(|| format!("reprojecting {}", path.display()))
}

/// Run a pipeline into `out.output`, optionally writing the manifest.
fn execute(pipeline: ConversionPipeline, inputs: Vec<PathBuf>, out: &OutputArgs) -> Result<()> {
    let start = Instant::now();
    let file = File::create(&out.output)
        .with_context(|| format!("creating {}", out.output.display()))?;
    let mut writer = Uv3Writer::new(file);

    let pipeline = pipeline.with_progress(std::io::stderr().is_terminal());
    let stats = pipeline
        .run(&mut writer)
        .with_context(|| format!("writing {}", out.output.display()))?;
    writer
        .finish()
        .with_context(|| format!("flushing {}", out.output.display()))?;

    let elapsed = start.elapsed();
    if out.manifest {
        RunManifest::new(pipeline.name(), inputs, &out.output, &stats, elapsed.as_secs_f64())
            .write()
            .context("writing run manifest")?;
    }

    info!(
        "Conversion complete: {} records to {} in {:.2?}",
        stats.records,
        out.output.display(),
        elapsed
    );
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let summary = StreamSummary::from_reader(BufReader::new(file))
        .with_context(|| format!("reading {}", path.display()))?;

    println!("UV3 stream: {}", path.display());
    println!("  Records: {}", summary.records);
    println!("  Points: {}", summary.points);
    println!("  Line vertices: {}", summary.line_vertices);
    println!("  Triangle vertices: {}", summary.triangle_vertices);
    if summary.records > 0 {
        let (min_lon, min_lat, max_lon, max_lat) = summary.bounds.degrees();
        println!("  Longitude: {:.6} to {:.6}", min_lon, max_lon);
        println!("  Latitude: {:.6} to {:.6}", min_lat, max_lat);
        println!(
            "  Elevation: {:.2} to {:.2}",
            summary.bounds.min_z, summary.bounds.max_z
        );
    }
    println!("  Distinct colours: {}", summary.colours.len());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Mesh(args) => {
            let mesh = Mesh::load(&args.input)
                .with_context(|| format!("reading mesh {}", args.input.display()))?;
            let options = MeshOptions {
                swiss: args.swiss,
                sitg_scaling: args.sitg_scaling,
                colour: args.colour,
            };
            execute(
                ConversionPipeline::mesh_points(mesh, options),
                vec![args.input],
                &args.out,
            )
        }
        Command::RgbDem(args) => {
            let img = &args.imagery;
            let imagery = load_raster(&img.input, img.nodata, img.source_crs)?;
            let dem = load_raster(&args.dem, img.dem_nodata, img.dem_crs)?;
            let pipeline = ConversionPipeline::raster_points(imagery, &dem, img.options())?;
            execute(pipeline, vec![img.input.clone(), args.dem], &args.out)
        }
        Command::Poly(args) => {
            let img = &args.imagery;
            let imagery = load_raster(&img.input, img.nodata, img.source_crs)?;
            let dem = args
                .dem
                .as_deref()
                .map(|d| load_raster(d, img.dem_nodata, img.dem_crs))
                .transpose()?;
            let pipeline = ConversionPipeline::raster_quads(imagery, dem.as_ref(), img.options())?;
            let mut inputs = vec![img.input.clone()];
            inputs.extend(args.dem.clone());
            execute(pipeline, inputs, &args.out)
        }
        Command::DemColour(args) => {
            let Ok(palette) = Palette::by_name(&args.palette) else {
                bail!(
                    "unknown palette '{}', expected one of: {}",
                    args.palette,
                    PALETTE_NAMES.join(", ")
                );
            };
            let dem = load_raster(&args.input, args.nodata, args.source_crs)?;
            let options = DemColourOptions {
                palette,
                with_height: !args.no_height,
            };
            execute(
                ConversionPipeline::dem_points(dem, options),
                vec![args.input],
                &args.out,
            )
        }
        Command::Inspect { path } => inspect(&path),
    }
}
