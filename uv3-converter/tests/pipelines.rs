use std::f64::consts::PI;
use std::fs::{self, File};
use std::path::Path;
use tempfile::TempDir;
use uv3_converter::geotransform::GeoTransform;
use uv3_converter::inspect::StreamSummary;
use uv3_converter::manifest::RunManifest;
use uv3_converter::mesh::Mesh;
use uv3_converter::palette::Palette;
use uv3_converter::raster::{Grid, Raster};
use uv3_converter::raster_io::read_raster;
use uv3_converter::uv3::{Primitive, Rgb, Uv3Reader, Uv3Record, Uv3Writer};
use uv3_converter::{ConversionPipeline, DemColourOptions, ImageryOptions, MeshOptions};

fn write_uv3(pipeline: &ConversionPipeline, path: &Path) -> uv3_converter::RunStats {
    let mut writer = Uv3Writer::new(File::create(path).unwrap());
    let stats = pipeline.run(&mut writer).unwrap();
    writer.finish().unwrap();
    stats
}

fn read_uv3(path: &Path) -> Vec<Uv3Record> {
    Uv3Reader::new(File::open(path).unwrap())
        .collect::<Result<_, _>>()
        .unwrap()
}

fn dem_colour(dem: Raster, with_height: bool) -> ConversionPipeline {
    ConversionPipeline::dem_points(
        dem,
        DemColourOptions {
            palette: Palette::by_name("inferno").unwrap(),
            with_height,
        },
    )
}

fn two_by_two() -> Raster {
    let gt = GeoTransform::from_gdal([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]).unwrap();
    let band = Grid::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    Raster::new(gt, None, vec![band]).unwrap()
}

#[test]
fn two_by_two_dem_colour_end_to_end() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("grid.uv3");
    write_uv3(&dem_colour(two_by_two(), false), &out);

    assert_eq!(fs::metadata(&out).unwrap().len(), 4 * 28);
    let records = read_uv3(&out);

    // x outer, y inner: (0,0), (0,1), (1,0), (1,1)
    let expected = [(0.0, 0.0), (0.0, -1.0), (1.0, 0.0), (1.0, -1.0)];
    for (record, (lon, lat)) in records.iter().zip(expected) {
        assert!((record.position.x - lon * PI / 180.0).abs() < 1e-15);
        assert!((record.position.y - lat * PI / 180.0).abs() < 1e-15);
        assert_eq!(record.position.z, 0.0);
        assert_eq!(record.primitive, Primitive::Point);
    }

    // Lowest value takes the first palette entry, highest the last.
    let palette = Palette::by_name("inferno").unwrap();
    assert_eq!(records[0].colour, Rgb::from_unit(palette.colour(0.0)));
    assert_eq!(records[3].colour, Rgb::from_unit(palette.colour(1.0)));
}

#[test]
fn identical_inputs_give_identical_bytes() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.uv3");
    let b = dir.path().join("b.uv3");
    write_uv3(&dem_colour(two_by_two(), true), &a);
    write_uv3(&dem_colour(two_by_two(), true), &b);
    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
}

#[test]
fn ascii_dem_drives_rgb_points() {
    let dir = TempDir::new().unwrap();

    // 3x3 DEM covering lon [6, 6.3], lat [46.7, 47.0]; the last row is off the imagery.
    let dem_path = dir.path().join("dem.asc");
    fs::write(
        &dem_path,
        "ncols 3\nnrows 3\nxllcorner 6.0\nyllcorner 46.7\ncellsize 0.1\nNODATA_value -9999\n\
         100 100 100\n100 -9999 100\n100 100 100\n",
    )
    .unwrap();
    let dem = read_raster(&dem_path, None).unwrap();

    // 2x2 imagery starting at the DEM origin, with pixels 0.1 apart.
    let gt = GeoTransform::new(6.0, 47.0, 0.1, 0.1).unwrap();
    let band = |v: f64| Grid::new(2, 2, vec![v; 4]).unwrap();
    let imagery = Raster::new(gt, None, vec![band(50.0), band(60.0), band(70.0)]).unwrap();

    let pipeline =
        ConversionPipeline::raster_points(imagery, &dem, ImageryOptions::default()).unwrap();
    let out = dir.path().join("rgb.uv3");
    let stats = write_uv3(&pipeline, &out);
    assert_eq!(stats.points, 4);

    let records = read_uv3(&out);
    assert!(records.iter().all(|r| r.colour == Rgb::new(50, 60, 70)));
    // Corner pixel sits on a valid node; the centre node is nodata and reads as 0.
    assert_eq!(records[0].position.z, 100.0);
    assert!(records[3].position.z.abs() < 1e-9);
}

#[test]
fn world_file_georeferences_png() {
    let dir = TempDir::new().unwrap();
    let png = dir.path().join("ortho.png");
    let img = image::RgbImage::from_fn(3, 2, |x, y| image::Rgb([x as u8 * 10, y as u8 * 20, 5]));
    img.save(&png).unwrap();
    fs::write(dir.path().join("ortho.pgw"), "0.5\n0\n0\n-0.5\n7.25\n46.75\n").unwrap();

    let raster = read_raster(&png, None).unwrap();
    assert_eq!((raster.width(), raster.height()), (3, 2));
    assert_eq!(raster.transform.origin_x, 7.0);
    assert_eq!(raster.transform.origin_y, 47.0);
    assert_eq!(raster.band(1).unwrap().get(0, 2), 20.0);
    assert_eq!(raster.band(2).unwrap().get(1, 0), 20.0);

    let pipeline =
        ConversionPipeline::raster_quads(raster, None, ImageryOptions::default()).unwrap();
    let out = dir.path().join("quads.uv3");
    let stats = write_uv3(&pipeline, &out);
    assert_eq!(stats.triangle_vertices, 2 * 6);
}

#[test]
fn signed_integer_tiff_dem_with_world_file() {
    let dir = TempDir::new().unwrap();
    let tif = dir.path().join("dem.tif");
    {
        let mut tiff = tiff::encoder::TiffEncoder::new(File::create(&tif).unwrap()).unwrap();
        tiff.write_image::<tiff::encoder::colortype::GrayI16>(2, 2, &[-5i16, 10, -9999, 20])
            .unwrap();
    }
    fs::write(dir.path().join("dem.tfw"), "1\n0\n0\n-1\n0.5\n-0.5\n").unwrap();

    let dem = read_raster(&tif, Some(-9999.0)).unwrap();
    assert_eq!((dem.transform.origin_x, dem.transform.origin_y), (0.0, 0.0));
    assert_eq!(dem.band(1).unwrap().get(0, 0), -5.0);

    let out = dir.path().join("dem.uv3");
    let stats = write_uv3(&dem_colour(dem, true), &out);
    assert_eq!(stats.points, 4);
    assert_eq!(stats.background, 1);

    let records = read_uv3(&out);
    // x outer, y inner: the nodata cell (row 1, col 0) is the second record.
    assert_eq!(records[0].position.z, -5.0);
    assert_eq!(records[1].colour, Rgb::new(7, 10, 12));
    assert_eq!(records[3].position.z, 20.0);
}

#[test]
fn missing_world_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let png = dir.path().join("bare.png");
    image::RgbImage::new(2, 2).save(&png).unwrap();
    assert!(matches!(
        read_raster(&png, None),
        Err(uv3_converter::ConvertError::MissingWorldFile(_))
    ));
}

#[test]
fn obj_mesh_to_uv3_with_manifest() {
    let dir = TempDir::new().unwrap();
    let obj = dir.path().join("tile.obj");
    fs::write(
        &obj,
        "v 2600000 1200000 500\nv 2600100 1200000 500\nv 2600100 1200100 510\nv 2600000 1200100 505\n\
         f 1 2 3 4\n",
    )
    .unwrap();

    let mesh = Mesh::load(&obj).unwrap();
    let options = MeshOptions {
        swiss: true,
        ..MeshOptions::default()
    };
    let pipeline = ConversionPipeline::mesh_points(mesh, options);
    let out = dir.path().join("tile.uv3");
    let stats = write_uv3(&pipeline, &out);

    let summary = StreamSummary::from_reader(File::open(&out).unwrap()).unwrap();
    assert_eq!(summary.records, 6);
    assert_eq!(summary.triangle_vertices, 6);
    assert_eq!(summary.colours.get("173,73,74"), Some(&6));
    let (min_lon, min_lat, _, _) = summary.bounds.degrees();
    assert!((min_lon - 7.4386).abs() < 1e-3);
    assert!((min_lat - 46.9511).abs() < 1e-3);

    let manifest_path = RunManifest::new(pipeline.name(), vec![obj], &out, &stats, 0.5)
        .write()
        .unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(manifest_path).unwrap()).unwrap();
    assert_eq!(json["pipeline"], "mesh");
    assert_eq!(json["record_count"], 6);
    assert_eq!(json["byte_size"], 6 * 28);
}

#[test]
fn truncated_stream_fails_inspection() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.uv3");
    fs::write(&path, [0u8; 30]).unwrap();
    assert!(StreamSummary::from_reader(File::open(&path).unwrap()).is_err());
}
