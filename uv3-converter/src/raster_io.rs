/// Raster readers: GeoTIFFs, images and OpenEXR grids georeferenced by an
/// ESRI world file, and self-describing ESRI ASCII grids.
use crate::constants::HEADER_PREALLOCATION_LIMIT;
use crate::error::{ConvertError, Result};
use crate::geotransform::GeoTransform;
use crate::raster::{Grid, Raster};
use image::{ColorType, DynamicImage, GenericImageView};
use log::{debug, info};
use std::fs::{self, File};
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

/// Read a raster, dispatching on the file extension.
///
/// `nodata` overrides any sentinel declared by the file itself.
pub fn read_raster(path: &Path, nodata: Option<f64>) -> Result<Raster> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let raster = match ext.as_str() {
        "asc" => read_ascii_grid(path, nodata)?,
        "exr" => read_exr(path, nodata)?,
        "tif" | "tiff" => read_geotiff(path, nodata)?,
        "png" | "jpg" | "jpeg" | "bmp" => read_image(path, nodata)?,
        _ => return Err(ConvertError::UnsupportedFormat(path.to_path_buf())),
    };

    let (min_x, min_y, max_x, max_y) = raster.transform.extent(raster.width(), raster.height());
    info!(
        "Loaded raster {}: {}x{} pixels, {} band(s), extent ({}, {}) to ({}, {})",
        path.display(),
        raster.width(),
        raster.height(),
        raster.band_count(),
        min_x,
        min_y,
        max_x,
        max_y
    );
    Ok(raster)
}

/// Candidate world file names for `path`: `.tfw` style, `.tifw` style, `.wld`.
fn world_file_candidates(path: &Path) -> Vec<PathBuf> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    let mut names = Vec::new();
    let mut chars = ext.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.last()) {
        names.push(format!("{first}{last}w"));
    }
    names.push(format!("{ext}w"));
    names.push("wld".to_string());

    names
        .iter()
        .flat_map(|n| [n.to_ascii_lowercase(), n.to_ascii_uppercase()])
        .map(|n| path.with_extension(n))
        .collect()
}

/// Locate and parse the world file next to `path`.
pub fn find_world_file(path: &Path) -> Result<GeoTransform> {
    let world = world_file_candidates(path)
        .into_iter()
        .find(|p| p.is_file())
        .ok_or_else(|| ConvertError::MissingWorldFile(path.to_path_buf()))?;

    debug!("Using world file {}", world.display());
    parse_world_file(&fs::read_to_string(&world)?, &world)
}

/// Parse the six lines `A D B E C F` of an ESRI world file.
///
/// World files locate the centre of the upper-left pixel; the returned
/// transform is shifted half a pixel to its outer corner.
pub fn parse_world_file(text: &str, path: &Path) -> Result<GeoTransform> {
    let mut values = [0.0f64; 6];
    let mut count = 0;
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if count == 6 {
            return Err(ConvertError::parse(path, i + 1, "more than six values"));
        }
        values[count] = line
            .parse()
            .map_err(|e| ConvertError::parse(path, i + 1, format!("bad value '{line}': {e}")))?;
        count += 1;
    }
    if count != 6 {
        return Err(ConvertError::parse(
            path,
            text.lines().count(),
            format!("expected six values, found {count}"),
        ));
    }

    let [a, d, b, e, c, f] = values;
    GeoTransform::from_gdal([c - a / 2.0 - b / 2.0, a, b, f - d / 2.0 - e / 2.0, d, e])
}

/// Split interleaved samples into `channels` band grids.
fn deinterleave(
    samples: impl Iterator<Item = f64>,
    channels: usize,
    width: usize,
    height: usize,
) -> Result<Vec<Grid>> {
    let mut bands = vec![Vec::with_capacity(width * height); channels];
    for (i, v) in samples.enumerate() {
        bands[i % channels].push(v);
    }
    bands
        .into_iter()
        .map(|values| Grid::new(height, width, values))
        .collect()
}

/// Expand a decoded image to RGBA bands, keeping the native sample depth.
fn image_bands(img: &DynamicImage) -> Result<Vec<Grid>> {
    let (w, h) = img.dimensions();
    let (w, h) = (w as usize, h as usize);
    match img.color() {
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
            let buf = img.to_rgba16();
            deinterleave(buf.as_raw().iter().map(|&v| f64::from(v)), 4, w, h)
        }
        ColorType::Rgb32F | ColorType::Rgba32F => {
            let buf = img.to_rgba32f();
            deinterleave(buf.as_raw().iter().map(|&v| f64::from(v)), 4, w, h)
        }
        _ => {
            let buf = img.to_rgba8();
            deinterleave(buf.as_raw().iter().map(|&v| f64::from(v)), 4, w, h)
        }
    }
}

/// Read an image through the `image` crate as four bands (R, G, B, A).
/// Grey images repeat the grey level in the first three bands.
pub fn read_image(path: &Path, nodata: Option<f64>) -> Result<Raster> {
    let transform = find_world_file(path)?;
    let img = image::open(path)?;
    debug!("Image {} decoded as {:?}", path.display(), img.color());
    Raster::new(transform, nodata, image_bands(&img)?)
}

/// GeoKey holding the raster space convention.
const GT_RASTER_TYPE_GEO_KEY: u32 = 1025;
const RASTER_PIXEL_IS_POINT: u32 = 2;

/// Read a GeoTIFF with one band per sample, at any sample format.
///
/// Georeferencing comes from the GeoTIFF tags when present and from a world
/// file otherwise. `nodata` overrides the GDAL_NODATA tag.
pub fn read_geotiff(path: &Path, nodata: Option<f64>) -> Result<Raster> {
    let file = File::open(path)?;
    decode_geotiff(BufReader::new(file), path, nodata)
}

fn decode_geotiff<R: Read + Seek>(reader: R, path: &Path, nodata: Option<f64>) -> Result<Raster> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let transform = match geotiff_transform(&mut decoder)? {
        Some(gt) => gt,
        None => find_world_file(path)?,
    };
    let declared_nodata = gdal_nodata(&mut decoder, path)?;
    debug!(
        "TIFF {} decoded as {:?}, nodata {:?}",
        path.display(),
        decoder.colortype()?,
        declared_nodata
    );

    let samples: Vec<f64> = match decoder.read_image()? {
        DecodingResult::U8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::F64(data) => data,
    };

    let pixels = width.checked_mul(height).filter(|&p| p > 0).ok_or_else(|| {
        ConvertError::InvalidRaster(format!("{} has size {width}x{height}", path.display()))
    })?;
    if samples.len() % pixels != 0 {
        return Err(ConvertError::InvalidRaster(format!(
            "{}: {} samples do not fill {width}x{height} pixels",
            path.display(),
            samples.len()
        )));
    }
    let channels = samples.len() / pixels;
    let bands = deinterleave(samples.into_iter(), channels, width, height)?;
    Raster::new(transform, nodata.or(declared_nodata), bands)
}

/// Geotransform from ModelTiepoint + ModelPixelScale, or ModelTransformation.
fn geotiff_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>> {
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;
    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;
    let matrix = decoder
        .find_tag(Tag::ModelTransformationTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;

    let gt = match (tiepoint, scale, matrix) {
        (Some(tie), Some(scale), _) if tie.len() >= 6 && scale.len() >= 2 => {
            let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
            [x - i * scale[0], scale[0], 0.0, y + j * scale[1], 0.0, -scale[1]]
        }
        (_, _, Some(m)) if m.len() >= 8 => [m[3], m[0], m[1], m[7], m[4], m[5]],
        _ => return Ok(None),
    };
    let mut gt = GeoTransform::from_gdal(gt)?;

    if raster_type(decoder)? == Some(RASTER_PIXEL_IS_POINT) {
        gt.origin_x -= gt.pixel_width / 2.0;
        gt.origin_y += gt.pixel_height / 2.0;
    }
    Ok(Some(gt))
}

/// GTRasterTypeGeoKey from the GeoKey directory, when stored inline.
fn raster_type<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<u32>> {
    let Some(keys) = decoder.find_tag(Tag::GeoKeyDirectoryTag)? else {
        return Ok(None);
    };
    let keys = keys.into_u32_vec()?;
    // Header of four shorts, then (key, location, count, value) entries.
    Ok(keys
        .get(4..)
        .unwrap_or_default()
        .chunks_exact(4)
        .find(|entry| entry[0] == GT_RASTER_TYPE_GEO_KEY && entry[1] == 0)
        .map(|entry| entry[3]))
}

/// Nodata declared in the GDAL_NODATA ASCII tag.
fn gdal_nodata<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<Option<f64>> {
    let Some(value) = decoder.find_tag(Tag::GdalNodata)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    let text = text.trim_matches(char::from(0)).trim();
    text.parse().map(Some).map_err(|e| {
        ConvertError::InvalidRaster(format!("{}: bad GDAL_NODATA '{text}': {e}", path.display()))
    })
}

/// Read the first channel of the first layer of an OpenEXR file.
pub fn read_exr(path: &Path, nodata: Option<f64>) -> Result<Raster> {
    let transform = find_world_file(path)?;
    let image = exr::prelude::read_first_flat_layer_from_file(path)?;
    let layer = &image.layer_data;
    let (width, height) = (layer.size.0, layer.size.1);

    let channel = layer
        .channel_data
        .list
        .first()
        .ok_or_else(|| ConvertError::InvalidRaster(format!("{} has no channels", path.display())))?;
    debug!("EXR {}: reading channel {:?}", path.display(), channel.name);

    let values: Vec<f64> = channel
        .sample_data
        .values_as_f32()
        .map(f64::from)
        .collect();
    Raster::new(transform, nodata, vec![Grid::new(height, width, values)?])
}

/// Read an ESRI ASCII grid.
pub fn read_ascii_grid(path: &Path, nodata: Option<f64>) -> Result<Raster> {
    let text = fs::read_to_string(path)?;
    parse_ascii_grid(&text, path, nodata)
}

/// `ncols`/`nrows` must be positive whole numbers.
fn grid_dimension(path: &Path, line: usize, key: &str, number: f64) -> Result<usize> {
    if number.is_finite() && number >= 1.0 && number.fract() == 0.0 && number < usize::MAX as f64 {
        Ok(number as usize)
    } else {
        Err(ConvertError::parse(path, line, format!("{key} must be a positive integer, got {number}")))
    }
}

pub fn parse_ascii_grid(text: &str, path: &Path, nodata: Option<f64>) -> Result<Raster> {
    let mut ncols = None;
    let mut nrows = None;
    let mut x = None;
    let mut y = None;
    let mut centred = false;
    let mut cellsize = None;
    let mut declared_nodata = None;

    let mut lines = text.lines().enumerate().peekable();
    while let Some((i, line)) = lines.peek().copied() {
        let mut fields = line.split_whitespace();
        let Some(key) = fields.next() else {
            lines.next();
            continue;
        };
        if key.parse::<f64>().is_ok() {
            break;
        }
        let key = key.to_ascii_lowercase();
        let value = fields.next().unwrap_or_default();
        let number: f64 = value
            .parse()
            .map_err(|e| ConvertError::parse(path, i + 1, format!("bad {key} '{value}': {e}")))?;
        match key.as_str() {
            "ncols" => ncols = Some(grid_dimension(path, i + 1, &key, number)?),
            "nrows" => nrows = Some(grid_dimension(path, i + 1, &key, number)?),
            "xllcorner" => x = Some(number),
            "yllcorner" => y = Some(number),
            "xllcenter" => {
                x = Some(number);
                centred = true;
            }
            "yllcenter" => {
                y = Some(number);
                centred = true;
            }
            "cellsize" => cellsize = Some(number),
            "nodata_value" => declared_nodata = Some(number),
            _ => return Err(ConvertError::parse(path, i + 1, format!("unknown header '{key}'"))),
        }
        lines.next();
    }

    let missing = |name: &str| ConvertError::parse(path, 0, format!("missing {name} header"));
    let ncols = ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = nrows.ok_or_else(|| missing("nrows"))?;
    let x = x.ok_or_else(|| missing("xllcorner"))?;
    let y = y.ok_or_else(|| missing("yllcorner"))?;
    let cellsize = cellsize.ok_or_else(|| missing("cellsize"))?;

    let expected = ncols
        .checked_mul(nrows)
        .ok_or_else(|| ConvertError::parse(path, 0, format!("grid of {ncols}x{nrows} is too large")))?;
    let mut values = Vec::with_capacity(expected.min(HEADER_PREALLOCATION_LIMIT));
    for (i, line) in lines {
        for field in line.split_whitespace() {
            let v: f64 = field
                .parse()
                .map_err(|e| ConvertError::parse(path, i + 1, format!("bad sample '{field}': {e}")))?;
            values.push(v);
        }
    }

    let shift = if centred { cellsize / 2.0 } else { 0.0 };
    let transform = GeoTransform::new(
        x - shift,
        y - shift + nrows as f64 * cellsize,
        cellsize,
        cellsize,
    )?;

    let grid = Grid::new(nrows, ncols, values)?;
    Raster::new(transform, nodata.or(declared_nodata), vec![grid])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tiff::encoder::{TiffEncoder, colortype};

    fn geotiff(tags: &[(Tag, &[f64])], key_directory: Option<&[u16]>, nodata: Option<&str>) -> Cursor<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut tiff = TiffEncoder::new(&mut buf).unwrap();
            let mut image = tiff.new_image::<colortype::Gray32Float>(2, 2).unwrap();
            for &(tag, values) in tags {
                image.encoder().write_tag(tag, values).unwrap();
            }
            if let Some(keys) = key_directory {
                image.encoder().write_tag(Tag::GeoKeyDirectoryTag, keys).unwrap();
            }
            if let Some(text) = nodata {
                image.encoder().write_tag(Tag::GdalNodata, text).unwrap();
            }
            image.write_data(&[1.5f32, -9999.0, 3.0, 4.25]).unwrap();
        }
        buf.set_position(0);
        buf
    }

    const SCALE: &[f64] = &[0.5, 0.25, 0.0];
    const TIEPOINT: &[f64] = &[0.0, 0.0, 0.0, 6.0, 47.0, 0.0];

    #[test]
    fn geotiff_float_dem_uses_embedded_tags() {
        let buf = geotiff(
            &[(Tag::ModelPixelScaleTag, SCALE), (Tag::ModelTiepointTag, TIEPOINT)],
            None,
            Some("-9999"),
        );
        let r = decode_geotiff(buf, Path::new("dem.tif"), None).unwrap();
        assert_eq!((r.width(), r.height(), r.band_count()), (2, 2, 1));
        assert_eq!((r.transform.origin_x, r.transform.origin_y), (6.0, 47.0));
        assert_eq!((r.transform.pixel_width, r.transform.pixel_height), (0.5, 0.25));
        assert_eq!(r.nodata, Some(-9999.0));
        let band = r.band(1).unwrap();
        assert_eq!(band.get(0, 0), 1.5);
        assert!(r.is_nodata(band.get(0, 1)));
        assert_eq!(band.get(1, 1), 4.25);
    }

    #[test]
    fn geotiff_nodata_flag_overrides_tag() {
        let buf = geotiff(
            &[(Tag::ModelPixelScaleTag, SCALE), (Tag::ModelTiepointTag, TIEPOINT)],
            None,
            Some("-9999"),
        );
        let r = decode_geotiff(buf, Path::new("dem.tif"), Some(3.0)).unwrap();
        assert_eq!(r.nodata, Some(3.0));
    }

    #[test]
    fn geotiff_pixel_is_point_shifts_to_corner() {
        let keys: &[u16] = &[1, 1, 0, 1, 1025, 0, 1, 2];
        let buf = geotiff(
            &[(Tag::ModelPixelScaleTag, SCALE), (Tag::ModelTiepointTag, TIEPOINT)],
            Some(keys),
            None,
        );
        let r = decode_geotiff(buf, Path::new("dem.tif"), None).unwrap();
        assert_eq!((r.transform.origin_x, r.transform.origin_y), (5.75, 47.125));
        assert_eq!(r.nodata, None);
    }

    #[test]
    fn geotiff_transformation_matrix() {
        let matrix: &[f64] = &[
            2.0, 0.0, 0.0, 600000.0, 0.0, -2.0, 0.0, 200000.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ];
        let buf = geotiff(&[(Tag::ModelTransformationTag, matrix)], None, None);
        let r = decode_geotiff(buf, Path::new("lv03.tif"), None).unwrap();
        assert_eq!((r.transform.origin_x, r.transform.origin_y), (600000.0, 200000.0));
        assert_eq!(r.transform.pixel_height, 2.0);
    }

    #[test]
    fn geotiff_without_tags_needs_world_file() {
        let buf = geotiff(&[], None, None);
        assert!(matches!(
            decode_geotiff(buf, Path::new("missing/plain.tif"), None),
            Err(ConvertError::MissingWorldFile(_))
        ));
    }

    #[test]
    fn world_file_shifts_to_pixel_corner() {
        let text = "0.5\n0.0\n0.0\n-0.25\n6.25\n46.875\n";
        let gt = parse_world_file(text, Path::new("a.wld")).unwrap();
        assert_eq!(gt.origin_x, 6.0);
        assert_eq!(gt.origin_y, 47.0);
        assert_eq!(gt.pixel_width, 0.5);
        assert_eq!(gt.pixel_height, 0.25);
    }

    #[test]
    fn world_file_needs_six_values() {
        assert!(parse_world_file("1\n0\n0\n-1\n", Path::new("a.wld")).is_err());
        assert!(parse_world_file("1\n0\n0\n-1\n0\n0\n9\n", Path::new("a.wld")).is_err());
    }

    #[test]
    fn world_file_candidates_follow_extension() {
        let names: Vec<String> = world_file_candidates(Path::new("dir/ortho.tif"))
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains(&"ortho.tfw".to_string()));
        assert!(names.contains(&"ortho.tifw".to_string()));
        assert!(names.contains(&"ortho.wld".to_string()));
    }

    #[test]
    fn ascii_grid_corner_origin() {
        let text = "ncols 3\nnrows 2\nxllcorner 10\nyllcorner 20\ncellsize 5\nNODATA_value -9999\n\
                    1 2 3\n4 -9999 6\n";
        let r = parse_ascii_grid(text, Path::new("g.asc"), None).unwrap();
        assert_eq!((r.width(), r.height()), (3, 2));
        assert_eq!(r.transform.origin_x, 10.0);
        assert_eq!(r.transform.origin_y, 30.0);
        assert_eq!(r.nodata, Some(-9999.0));
        assert_eq!(r.band(1).unwrap().get(1, 2), 6.0);
        assert!(r.is_nodata(r.band(1).unwrap().get(1, 1)));
    }

    #[test]
    fn ascii_grid_centre_origin_and_override() {
        let text = "ncols 2\nnrows 2\nxllcenter 0.5\nyllcenter 0.5\ncellsize 1\n1 2\n3 4\n";
        let r = parse_ascii_grid(text, Path::new("g.asc"), Some(4.0)).unwrap();
        assert_eq!(r.transform.origin_x, 0.0);
        assert_eq!(r.transform.origin_y, 2.0);
        assert_eq!(r.nodata, Some(4.0));
    }

    #[test]
    fn ascii_grid_sample_count_must_match() {
        let text = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n";
        assert!(parse_ascii_grid(text, Path::new("g.asc"), None).is_err());
    }

    #[test]
    fn ascii_grid_rejects_bad_dimensions() {
        let grid = |ncols: &str, nrows: &str| {
            let text = format!("ncols {ncols}\nnrows {nrows}\nxllcorner 0\nyllcorner 0\ncellsize 1\n1\n");
            parse_ascii_grid(&text, Path::new("g.asc"), None)
        };
        for (ncols, nrows) in [("-3", "1"), ("2.7", "1"), ("0", "1"), ("1", "nan"), ("1e19", "1e19")] {
            assert!(
                matches!(grid(ncols, nrows), Err(ConvertError::Parse { .. })),
                "ncols {ncols} nrows {nrows} accepted"
            );
        }
        assert!(grid("1", "1").is_ok());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            read_raster(Path::new("dem.xyz"), None),
            Err(ConvertError::UnsupportedFormat(_))
        ));
    }
}
