/// Conversion pipeline turning meshes and rasters into UV3 record streams.
///
/// One pipeline, four variants sharing the same per-unit steps: locate the
/// unit, convert to WGS84 degrees when needed, resolve an elevation, pick a
/// colour, then encode through the UV3 writer in processing order.
use crate::bounds::OutputBounds;
use crate::constants::{PROGRESS_BAR, PROGRESS_CHARS, PROGRESS_UPDATE_INTERVAL};
use crate::coordinates::{DatumConverter, GeoPoint, RadianPoint, sitg_scaling};
use crate::error::Result;
use crate::heightmap::ElevationModel;
use crate::mesh::Mesh;
use crate::palette::Palette;
use crate::raster::{Grid, Raster};
use crate::uv3::{Primitive, Rgb, Uv3Record, Uv3Writer};
use constants::raster::{DEFAULT_BANDS, ELEVATION_NODATA, ELEVATION_NODATA_THRESHOLD};
use constants::uv3::{MESH_COLOUR, UV3_RECORD_SIZE};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::io::Write;

/// Options for the mesh variant.
#[derive(Debug, Clone, Copy)]
pub struct MeshOptions {
    /// Vertices are Swiss grid (easting, northing, height) and get converted.
    pub swiss: bool,
    /// Apply SITG local scaling before any conversion.
    pub sitg_scaling: bool,
    pub colour: Rgb,
}

impl Default for MeshOptions {
    fn default() -> Self {
        Self {
            swiss: false,
            sitg_scaling: false,
            colour: Rgb(MESH_COLOUR),
        }
    }
}

/// Options for the imagery variants: 1-based bands read as red, green, blue.
#[derive(Debug, Clone, Copy)]
pub struct ImageryOptions {
    pub bands: [usize; 3],
}

impl Default for ImageryOptions {
    fn default() -> Self {
        Self {
            bands: DEFAULT_BANDS,
        }
    }
}

/// Options for colouring an elevation raster.
#[derive(Debug, Clone)]
pub struct DemColourOptions {
    pub palette: Palette,
    /// Emit the elevation as z; otherwise every z is 0.
    pub with_height: bool,
}

/// Input data and options of one pipeline variant.
pub enum Variant {
    /// Three triangle vertices per mesh face.
    MeshPoints { mesh: Mesh, options: MeshOptions },
    /// One point per imagery pixel, elevation from a DEM.
    RasterPoints {
        imagery: Raster,
        dem: ElevationModel,
        options: ImageryOptions,
    },
    /// Two triangles per quad of adjacent imagery pixels.
    RasterQuads {
        imagery: Raster,
        dem: Option<ElevationModel>,
        options: ImageryOptions,
    },
    /// One palette-coloured point per DEM pixel.
    DemPoints {
        dem: Raster,
        options: DemColourOptions,
    },
}

/// Counters and extent of a finished run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub records: u64,
    pub bytes: u64,
    pub points: u64,
    pub triangle_vertices: u64,
    /// Background-coloured records (missing samples).
    pub background: u64,
    pub bounds: OutputBounds,
}

pub struct ConversionPipeline {
    variant: Variant,
    show_progress: bool,
}

impl ConversionPipeline {
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            show_progress: false,
        }
    }

    pub fn mesh_points(mesh: Mesh, options: MeshOptions) -> Self {
        Self::new(Variant::MeshPoints { mesh, options })
    }

    /// Pair imagery with an elevation raster; DEM missing cells become 0.
    pub fn raster_points(imagery: Raster, dem: &Raster, options: ImageryOptions) -> Result<Self> {
        check_bands(&imagery, &options)?;
        Ok(Self::new(Variant::RasterPoints {
            imagery,
            dem: ElevationModel::from_raster(dem)?,
            options,
        }))
    }

    pub fn raster_quads(
        imagery: Raster,
        dem: Option<&Raster>,
        options: ImageryOptions,
    ) -> Result<Self> {
        check_bands(&imagery, &options)?;
        let dem = dem.map(ElevationModel::from_raster).transpose()?;
        Ok(Self::new(Variant::RasterQuads {
            imagery,
            dem,
            options,
        }))
    }

    pub fn dem_points(dem: Raster, options: DemColourOptions) -> Self {
        Self::new(Variant::DemPoints { dem, options })
    }

    /// Draw an indicatif progress bar while running.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Command-line name of the variant.
    pub fn name(&self) -> &'static str {
        match &self.variant {
            Variant::MeshPoints { .. } => "mesh",
            Variant::RasterPoints { .. } => "rgb-dem",
            Variant::RasterQuads { .. } => "poly",
            Variant::DemPoints { .. } => "dem-colour",
        }
    }

    /// Stream every record to `writer` and flush it.
    pub fn run<W: Write>(&self, writer: &mut Uv3Writer<W>) -> Result<RunStats> {
        let mut emitter = Emitter {
            writer,
            stats: RunStats::default(),
        };

        match &self.variant {
            Variant::MeshPoints { mesh, options } => {
                self.emit_mesh(&mut emitter, mesh, options)?
            }
            Variant::RasterPoints {
                imagery,
                dem,
                options,
            } => self.emit_raster_points(&mut emitter, imagery, dem, options)?,
            Variant::RasterQuads {
                imagery,
                dem,
                options,
            } => self.emit_raster_quads(&mut emitter, imagery, dem.as_ref(), options)?,
            Variant::DemPoints { dem, options } => {
                self.emit_dem_points(&mut emitter, dem, options)?
            }
        }

        emitter.writer.flush()?;
        let stats = emitter.stats;
        info!(
            "{}: wrote {} records ({} bytes), {} with background colour",
            self.name(),
            stats.records,
            stats.bytes,
            stats.background
        );
        Ok(stats)
    }

    fn progress_bar(&self, len: u64, unit: &str, message: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        let template = format!("[{PROGRESS_BAR}] {{pos}}/{{len}} {unit} ({{percent}}%) {{msg}}");
        let style = ProgressStyle::default_bar()
            .template(&template)
            .map(|s| s.progress_chars(PROGRESS_CHARS))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb.set_message(message);
        pb
    }

    fn emit_mesh<W: Write>(
        &self,
        out: &mut Emitter<'_, W>,
        mesh: &Mesh,
        options: &MeshOptions,
    ) -> Result<()> {
        info!(
            "Converting {} faces (swiss: {}, SITG scaling: {})",
            mesh.faces().len(),
            options.swiss,
            options.sitg_scaling
        );

        let converter = DatumConverter::new();
        let pb = self.progress_bar(mesh.faces().len() as u64, "faces", "Encoding faces");

        for (face_idx, face) in mesh.faces().iter().enumerate() {
            for [x, y, z] in mesh.face_vertices(face) {
                let (x, y, z) = if options.sitg_scaling {
                    sitg_scaling(x, y, z)
                } else {
                    (x, y, z)
                };
                let geo = if options.swiss {
                    converter.convert(x, y, z)
                } else {
                    // Vertices already hold (latitude, longitude, height)
                    GeoPoint::new(x, y, z)
                };
                out.emit(geo.to_radians(), Primitive::Triangle, options.colour)?;
            }

            if face_idx % PROGRESS_UPDATE_INTERVAL == 0 {
                pb.set_position(face_idx as u64);
            }
        }

        pb.finish_with_message("Faces encoded");
        Ok(())
    }

    fn emit_raster_points<W: Write>(
        &self,
        out: &mut Emitter<'_, W>,
        imagery: &Raster,
        dem: &ElevationModel,
        options: &ImageryOptions,
    ) -> Result<()> {
        let (width, height) = (imagery.width(), imagery.height());
        info!(
            "Sampling {}x{} imagery against {}x{} elevation model",
            width,
            height,
            dem.width(),
            dem.height()
        );

        let channels = ChannelBands::new(imagery, options)?;
        let pb = self.progress_bar(width as u64, "columns", "Encoding pixels");

        for x in 0..width {
            for y in 0..height {
                let (lon, lat) = imagery.transform.pixel_to_geo(x as f64, y as f64);
                let z = dem.elevation_at(lon, lat);
                let colour = channels.colour(y, x);
                out.emit_coloured(
                    RadianPoint::from_degrees(lon, lat, z),
                    Primitive::Point,
                    colour,
                )?;
            }
            pb.inc(1);
        }

        pb.finish_with_message("Pixels encoded");
        Ok(())
    }

    fn emit_raster_quads<W: Write>(
        &self,
        out: &mut Emitter<'_, W>,
        imagery: &Raster,
        dem: Option<&ElevationModel>,
        options: &ImageryOptions,
    ) -> Result<()> {
        let quads_x = imagery.width().saturating_sub(1);
        let quads_y = imagery.height().saturating_sub(1);
        info!(
            "Triangulating {}x{} quads ({})",
            quads_x,
            quads_y,
            if dem.is_some() {
                "elevation from DEM"
            } else {
                "flat"
            }
        );
        if quads_x == 0 || quads_y == 0 {
            warn!("Imagery is too small to form any quad");
        }

        let channels = ChannelBands::new(imagery, options)?;
        let transform = &imagery.transform;
        let pb = self.progress_bar(quads_x as u64, "columns", "Encoding quads");

        for x in 0..quads_x {
            for y in 0..quads_y {
                // Corners 1..4 clockwise from the top-left pixel.
                let corners = [(x, y), (x + 1, y), (x + 1, y + 1), (x, y + 1)];

                // One elevation per quad, taken at its lower-left corner.
                let z = dem.map_or(0.0, |d| {
                    let (lon, lat) = transform.pixel_to_geo(x as f64, (y + 1) as f64);
                    d.elevation_at(lon, lat)
                });

                let vertices = corners.map(|(col, row)| {
                    let (lon, lat) = transform.pixel_to_geo(col as f64, row as f64);
                    (
                        RadianPoint::from_degrees(lon, lat, z),
                        channels.colour(row, col),
                    )
                });

                let [v1, v2, v3, v4] = vertices;
                for (position, colour) in [v3, v2, v1, v4, v3, v1] {
                    out.emit_coloured(position, Primitive::Triangle, colour)?;
                }
            }
            pb.inc(1);
        }

        pb.finish_with_message("Quads encoded");
        Ok(())
    }

    fn emit_dem_points<W: Write>(
        &self,
        out: &mut Emitter<'_, W>,
        dem: &Raster,
        options: &DemColourOptions,
    ) -> Result<()> {
        let grid = dem.band(1)?;
        let is_missing = |v: f64| dem.is_nodata(v) || v < ELEVATION_NODATA_THRESHOLD;
        let stats = dem.statistics(1, |v| !is_missing(v))?;

        match &stats {
            Some(s) => info!(
                "Elevation range {:.2} to {:.2} over {} valid cells, palette '{}'",
                s.min,
                s.max,
                s.valid,
                options.palette.name()
            ),
            None => warn!("Elevation raster has no valid cells"),
        }

        let (width, height) = (grid.cols(), grid.rows());
        let pb = self.progress_bar(width as u64, "columns", "Encoding elevations");

        for x in 0..width {
            for y in 0..height {
                let value = grid.get(y, x);
                let (lon, lat) = dem.transform.pixel_to_geo(x as f64, y as f64);

                let sample = stats.filter(|_| !is_missing(value));
                let (z, colour) = match sample {
                    Some(s) => (
                        value,
                        Some(Rgb::from_unit(options.palette.colour(s.normalise(value)))),
                    ),
                    None => (ELEVATION_NODATA, None),
                };
                let z = if options.with_height { z } else { 0.0 };

                out.emit_coloured(
                    RadianPoint::from_degrees(lon, lat, z),
                    Primitive::Point,
                    colour,
                )?;
            }
            pb.inc(1);
        }

        pb.finish_with_message("Elevations encoded");
        Ok(())
    }
}

fn check_bands(imagery: &Raster, options: &ImageryOptions) -> Result<()> {
    for band in options.bands {
        imagery.band(band)?;
    }
    Ok(())
}

/// The three band grids read as red, green and blue.
struct ChannelBands<'a> {
    raster: &'a Raster,
    grids: [&'a Grid; 3],
}

impl<'a> ChannelBands<'a> {
    fn new(raster: &'a Raster, options: &ImageryOptions) -> Result<Self> {
        let [r, g, b] = options.bands;
        Ok(Self {
            raster,
            grids: [raster.band(r)?, raster.band(g)?, raster.band(b)?],
        })
    }

    /// Pixel colour, `None` when any channel is nodata or negative.
    fn colour(&self, row: usize, col: usize) -> Option<Rgb> {
        let mut rgb = [0u8; 3];
        for (slot, grid) in rgb.iter_mut().zip(self.grids) {
            let v = grid.get(row, col);
            if self.raster.is_nodata(v) || v < 0.0 {
                return None;
            }
            *slot = Rgb::channel(v);
        }
        Some(Rgb(rgb))
    }
}

/// Writes records and keeps the run counters.
struct Emitter<'w, W: Write> {
    writer: &'w mut Uv3Writer<W>,
    stats: RunStats,
}

impl<W: Write> Emitter<'_, W> {
    fn emit(&mut self, position: RadianPoint, primitive: Primitive, colour: Rgb) -> Result<()> {
        self.writer
            .write_record(&Uv3Record::new(position, primitive, colour))?;

        let stats = &mut self.stats;
        stats.records += 1;
        stats.bytes = stats.records * UV3_RECORD_SIZE as u64;
        match primitive {
            Primitive::Point => stats.points += 1,
            Primitive::Triangle => stats.triangle_vertices += 1,
            Primitive::Line => {}
        }
        stats.bounds.update(&position);
        Ok(())
    }

    /// Emit with the background colour standing in for a missing sample.
    fn emit_coloured(
        &mut self,
        position: RadianPoint,
        primitive: Primitive,
        colour: Option<Rgb>,
    ) -> Result<()> {
        if colour.is_none() {
            self.stats.background += 1;
        }
        self.emit(position, primitive, Rgb::or_background(colour))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geotransform::GeoTransform;
    use crate::uv3::Uv3Reader;
    use constants::uv3::BACKGROUND_COLOUR;

    fn run(pipeline: &ConversionPipeline) -> (RunStats, Vec<Uv3Record>) {
        let mut writer = Uv3Writer::new(Vec::new());
        let stats = pipeline.run(&mut writer).unwrap();
        let bytes = writer.finish().unwrap();
        let records = Uv3Reader::new(bytes.as_slice())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        (stats, records)
    }

    fn rgb_raster(nodata: Option<f64>) -> Raster {
        // 2x2 pixels over lon [6, 8], lat [45, 47]
        let gt = GeoTransform::new(6.0, 47.0, 1.0, 1.0).unwrap();
        let r = Grid::from_rows(&[vec![10.0, 20.0], vec![30.0, 0.0]]).unwrap();
        let g = Grid::from_rows(&[vec![11.0, 300.0], vec![-1.0, 0.0]]).unwrap();
        let b = Grid::from_rows(&[vec![12.0, 22.0], vec![32.0, 0.0]]).unwrap();
        Raster::new(gt, nodata, vec![r, g, b]).unwrap()
    }

    fn flat_dem(height: f64) -> Raster {
        let gt = GeoTransform::new(5.0, 48.0, 1.0, 1.0).unwrap();
        let band = Grid::new(5, 5, vec![height; 25]).unwrap();
        Raster::new(gt, None, vec![band]).unwrap()
    }

    #[test]
    fn mesh_faces_become_triangle_vertices() {
        let mesh = Mesh::new(
            vec![[46.0, 7.0, 500.0], [46.5, 7.0, 510.0], [46.0, 7.5, 520.0]],
            vec![[0, 1, 2]],
        )
        .unwrap();
        let (stats, records) = run(&ConversionPipeline::mesh_points(mesh, MeshOptions::default()));

        assert_eq!(stats.triangle_vertices, 3);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.primitive == Primitive::Triangle));
        assert!(records.iter().all(|r| r.colour == Rgb(MESH_COLOUR)));
        // (lat, lon, h) vertex -> (lon rad, lat rad, h)
        assert_eq!(records[1].position.x, 7.0f64.to_radians());
        assert_eq!(records[1].position.y, 46.5f64.to_radians());
        assert_eq!(records[2].position.z, 520.0);
    }

    #[test]
    fn swiss_mesh_is_converted() {
        let mesh = Mesh::new(vec![[600_000.0, 200_000.0, 600.0]; 3], vec![[0, 1, 2]]).unwrap();
        let options = MeshOptions {
            swiss: true,
            ..MeshOptions::default()
        };
        let (_, records) = run(&ConversionPipeline::mesh_points(mesh, options));
        let p = records[0].position;
        assert!((p.x.to_degrees() - 7.438_637).abs() < 1e-4);
        assert!((p.y.to_degrees() - 46.951_081).abs() < 1e-4);
        assert!((p.z - 649.55).abs() < 1e-9);
    }

    #[test]
    fn raster_points_iterate_columns_outer() {
        let pipeline =
            ConversionPipeline::raster_points(rgb_raster(None), &flat_dem(420.0), ImageryOptions::default())
                .unwrap();
        let (stats, records) = run(&pipeline);

        assert_eq!(stats.points, 4);
        let expected = [(6.0, 47.0), (6.0, 46.0), (7.0, 47.0), (7.0, 46.0)];
        for (record, (lon, lat)) in records.iter().zip(expected) {
            assert_eq!(record.position.x, f64::to_radians(lon));
            assert_eq!(record.position.y, f64::to_radians(lat));
            assert_eq!(record.position.z, 420.0);
            assert_eq!(record.primitive, Primitive::Point);
        }
        assert_eq!(records[0].colour, Rgb::new(10, 11, 12));
        // Negative green channel blanks the pixel.
        assert_eq!(records[1].colour, Rgb(BACKGROUND_COLOUR));
        // Channels above 255 clamp.
        assert_eq!(records[2].colour, Rgb::new(20, 255, 22));
    }

    #[test]
    fn declared_nodata_gives_background() {
        let pipeline = ConversionPipeline::raster_points(
            rgb_raster(Some(0.0)),
            &flat_dem(1.0),
            ImageryOptions::default(),
        )
        .unwrap();
        let (stats, records) = run(&pipeline);
        assert_eq!(records[3].colour, Rgb(BACKGROUND_COLOUR));
        assert_eq!(stats.background, 2);
    }

    #[test]
    fn pixels_outside_dem_get_zero_elevation() {
        let gt = GeoTransform::new(100.0, 10.0, 1.0, 1.0).unwrap();
        let far_dem = Raster::new(gt, None, vec![Grid::new(3, 3, vec![900.0; 9]).unwrap()]).unwrap();
        let pipeline =
            ConversionPipeline::raster_points(rgb_raster(None), &far_dem, ImageryOptions::default())
                .unwrap();
        let (_, records) = run(&pipeline);
        assert!(records.iter().all(|r| r.position.z == 0.0));
    }

    #[test]
    fn bad_band_is_rejected_up_front() {
        let options = ImageryOptions { bands: [1, 2, 4] };
        assert!(ConversionPipeline::raster_quads(rgb_raster(None), None, options).is_err());
    }

    #[test]
    fn quads_emit_six_vertices_in_fixed_order() {
        let pipeline =
            ConversionPipeline::raster_quads(rgb_raster(None), None, ImageryOptions::default())
                .unwrap();
        let (stats, records) = run(&pipeline);

        assert_eq!(stats.triangle_vertices, 6);
        let lon_lat: Vec<(f64, f64)> = records
            .iter()
            .map(|r| (r.position.x.to_degrees().round(), r.position.y.to_degrees().round()))
            .collect();
        // v3, v2, v1, v4, v3, v1
        assert_eq!(
            lon_lat,
            vec![
                (7.0, 46.0),
                (7.0, 47.0),
                (6.0, 47.0),
                (6.0, 46.0),
                (7.0, 46.0),
                (6.0, 47.0)
            ]
        );
        assert!(records.iter().all(|r| r.position.z == 0.0));
        // Per-corner colours: v4 is the pixel with a negative channel.
        assert_eq!(records[2].colour, Rgb::new(10, 11, 12));
        assert_eq!(records[3].colour, Rgb(BACKGROUND_COLOUR));
    }

    #[test]
    fn quads_outside_dem_are_kept_flat() {
        let gt = GeoTransform::new(-50.0, -50.0, 1.0, 1.0).unwrap();
        let far_dem = Raster::new(gt, None, vec![Grid::new(2, 2, vec![5.0; 4]).unwrap()]).unwrap();
        let pipeline = ConversionPipeline::raster_quads(
            rgb_raster(None),
            Some(&far_dem),
            ImageryOptions::default(),
        )
        .unwrap();
        let (_, records) = run(&pipeline);
        assert_eq!(records.len(), 6);
        assert!(records.iter().all(|r| r.position.z == 0.0));
    }

    #[test]
    fn quads_share_one_elevation() {
        let pipeline = ConversionPipeline::raster_quads(
            rgb_raster(None),
            Some(&flat_dem(77.0)),
            ImageryOptions::default(),
        )
        .unwrap();
        let (_, records) = run(&pipeline);
        assert!(records.iter().all(|r| r.position.z == 77.0));
    }

    fn dem_options(with_height: bool) -> DemColourOptions {
        DemColourOptions {
            palette: Palette::by_name("gray").unwrap(),
            with_height,
        }
    }

    #[test]
    fn dem_points_scale_between_min_and_max() {
        let gt = GeoTransform::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let band = Grid::from_rows(&[vec![1.0, 2.0], vec![3.0, -9999.0]]).unwrap();
        let dem = Raster::new(gt, Some(-9999.0), vec![band]).unwrap();
        let (stats, records) = run(&ConversionPipeline::dem_points(dem, dem_options(true)));

        assert_eq!(stats.points, 4);
        // x outer: (0,0)=1, (0,1)=3, (1,0)=2, (1,1)=nodata
        assert_eq!(records[0].colour, Rgb::new(0, 0, 0));
        assert_eq!(records[1].colour, Rgb::new(255, 255, 255));
        assert_eq!(records[0].position.z, 1.0);
        assert_eq!(records[3].colour, Rgb(BACKGROUND_COLOUR));
        assert_eq!(records[3].position.z, ELEVATION_NODATA);
    }

    #[test]
    fn dem_points_without_height_are_flat() {
        let gt = GeoTransform::new(0.0, 0.0, 1.0, 1.0).unwrap();
        let band = Grid::from_rows(&[vec![5.0, -4e38]]).unwrap();
        let dem = Raster::new(gt, None, vec![band]).unwrap();
        let (_, records) = run(&ConversionPipeline::dem_points(dem, dem_options(false)));
        assert!(records.iter().all(|r| r.position.z == 0.0));
        // Flat range maps to the first palette entry.
        assert_eq!(records[0].colour, Rgb::new(0, 0, 0));
        assert_eq!(records[1].colour, Rgb(BACKGROUND_COLOUR));
    }
}
