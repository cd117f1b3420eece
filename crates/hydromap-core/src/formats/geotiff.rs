//! Native single-band GeoTIFF reader and writer.
//!
//! Georeferencing is taken from ModelPixelScale + ModelTiepoint, or from
//! ModelTransformation when present. The nodata value comes from the
//! GDAL_NODATA ASCII tag and the EPSG code from the GeoKey directory.

use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;

use tiff::decoder::{ChunkType, Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::error::{HydroError, Result};
use crate::models::geometry::Crs;
use crate::models::raster::{GeoTransform, Raster, RasterElement, RasterInfo, RasterWindow};

const MODEL_PIXEL_SCALE: Tag = Tag::Unknown(33550);
const MODEL_TIEPOINT: Tag = Tag::Unknown(33922);
const MODEL_TRANSFORMATION: Tag = Tag::Unknown(34264);
const GEO_KEY_DIRECTORY: Tag = Tag::Unknown(34735);
const GDAL_NODATA: Tag = Tag::Unknown(42113);

const GT_MODEL_TYPE_KEY: u32 = 1024;
const GT_RASTER_TYPE_KEY: u32 = 1025;
const GEOGRAPHIC_TYPE_KEY: u32 = 2048;
const PROJECTED_CS_TYPE_KEY: u32 = 3072;
const USER_DEFINED: u32 = 32767;
const RASTER_PIXEL_IS_POINT: u32 = 2;
const MODEL_TYPE_PROJECTED: u32 = 1;
const MODEL_TYPE_GEOGRAPHIC: u32 = 2;

/// Read the first band of a GeoTIFF file.
///
/// Cells equal to the nodata value, and cells the target type cannot hold
/// (NaN in an integer raster), become the target's nodata sentinel.
pub fn read_geotiff<T: RasterElement>(path: &Path) -> Result<Raster<T>> {
    let reader = open_file(path)?;
    decode_geotiff(reader).map_err(|reason| read_error(path, reason))
}

/// Read the first band of a GeoTIFF held in memory
pub fn read_geotiff_from_buffer<T: RasterElement>(data: &[u8]) -> Result<Raster<T>> {
    decode_geotiff(std::io::Cursor::new(data)).map_err(HydroError::InvalidRaster)
}

/// Shape, georeferencing and nodata of a GeoTIFF without decoding any pixels
pub fn read_geotiff_info(path: &Path) -> Result<RasterInfo> {
    let reader = open_file(path)?;
    let mut decoder = open_decoder(reader).map_err(|reason| read_error(path, reason))?;
    read_info(&mut decoder).map_err(|reason| read_error(path, reason))
}

/// Read the inclusive cell window `[row_min, row_max] x [col_min, col_max]`,
/// clipped to the image bounds.
///
/// Only the strips or tiles that intersect the window are decoded. Values are
/// returned as stored; compare them against [`RasterInfo::is_nodata`].
pub fn read_geotiff_window(
    path: &Path,
    row_min: i64,
    row_max: i64,
    col_min: i64,
    col_max: i64,
) -> Result<RasterWindow<f64>> {
    let reader = open_file(path)?;
    decode_window(reader, row_min, row_max, col_min, col_max).map_err(|reason| read_error(path, reason))
}

fn open_file(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|e| read_error(path, e.to_string()))?;
    Ok(BufReader::new(file))
}

fn read_error(path: &Path, reason: String) -> HydroError {
    HydroError::RasterRead { path: path.to_path_buf(), reason }
}

fn open_decoder<R: Read + Seek>(reader: R) -> std::result::Result<Decoder<R>, String> {
    Ok(Decoder::new(reader)
        .map_err(|e| format!("TIFF decode error: {}", e))?
        .with_limits(Limits::unlimited()))
}

fn read_info<R: Read + Seek>(decoder: &mut Decoder<R>) -> std::result::Result<RasterInfo, String> {
    let (width, height) = decoder.dimensions().map_err(|e| format!("Cannot read dimensions: {}", e))?;
    let geokeys = read_geokeys(decoder);

    let mut transform = read_transform(decoder).unwrap_or_default();
    if geokeys.raster_type == Some(RASTER_PIXEL_IS_POINT) {
        // Tiepoints refer to pixel centres; shift to the corner convention
        transform.origin_x -= 0.5 * transform.pixel_width + 0.5 * transform.row_rotation;
        transform.origin_y -= 0.5 * transform.col_rotation + 0.5 * transform.pixel_height;
    }

    Ok(RasterInfo {
        rows: height as usize,
        cols: width as usize,
        transform,
        crs: geokeys.crs(),
        nodata: read_nodata(decoder),
    })
}

fn samples_to_f64(image: DecodingResult) -> Vec<f64> {
    match image {
        DecodingResult::U8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::U64(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::I64(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(buf) => buf.into_iter().map(f64::from).collect(),
        DecodingResult::F64(buf) => buf,
    }
}

/// Samples per pixel of a decoded buffer covering `pixels` pixels
fn samples_per_pixel(len: usize, pixels: usize) -> std::result::Result<usize, String> {
    let samples = if pixels > 0 { len / pixels } else { 0 };
    if samples == 0 || len != pixels * samples {
        return Err(format!("Pixel buffer holds {} values for {} pixels", len, pixels));
    }
    Ok(samples)
}

/// Maps stored values onto a target cell type
struct CellConverter<T> {
    declared: Option<f64>,
    fill: T,
    filled: bool,
}

impl<T: RasterElement> CellConverter<T> {
    fn new(declared: Option<f64>) -> Self {
        let fill = declared.and_then(num_traits::cast::<f64, T>).unwrap_or_else(T::zero);
        Self { declared, fill, filled: false }
    }

    fn convert(&mut self, value: f64) -> T {
        let is_nodata = match self.declared {
            Some(nd) if nd.is_nan() => value.is_nan(),
            Some(nd) => value == nd,
            None => false,
        };
        if is_nodata {
            return self.fill;
        }
        num_traits::cast::<f64, T>(value).unwrap_or_else(|| {
            self.filled = true;
            self.fill
        })
    }

    /// Nodata sentinel of the converted raster
    fn nodata(&self) -> Option<T> {
        (self.declared.is_some() || self.filled).then_some(self.fill)
    }
}

fn decode_geotiff<T, R>(reader: R) -> std::result::Result<Raster<T>, String>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = open_decoder(reader)?;
    let info = read_info(&mut decoder)?;

    let image = decoder.read_image().map_err(|e| format!("Cannot read image data: {}", e))?;
    let data = samples_to_f64(image);

    // Bands are interleaved; keep the first one
    let samples = samples_per_pixel(data.len(), info.rows * info.cols)?;
    let mut converter = CellConverter::<T>::new(info.nodata);
    let cells: Vec<T> = data.into_iter().step_by(samples).map(|v| converter.convert(v)).collect();

    let mut raster = Raster::from_vec(cells, info.rows, info.cols)
        .map_err(|e| e.to_string())?
        .with_transform(info.transform)
        .with_crs(info.crs);
    if let Some(nd) = converter.nodata() {
        raster = raster.with_nodata(nd);
    }

    Ok(raster)
}

fn decode_window<R: Read + Seek>(
    reader: R,
    row_min: i64,
    row_max: i64,
    col_min: i64,
    col_max: i64,
) -> std::result::Result<RasterWindow<f64>, String> {
    let mut decoder = open_decoder(reader)?;
    let (width, height) = decoder.dimensions().map_err(|e| format!("Cannot read dimensions: {}", e))?;
    let (rows, cols) = (height as i64, width as i64);

    let (r0, r1) = (row_min.max(0), (row_max + 1).min(rows));
    let (c0, c1) = (col_min.max(0), (col_max + 1).min(cols));
    if r0 >= r1 || c0 >= c1 {
        return Ok(RasterWindow::empty());
    }
    let (r0, r1, c0, c1) = (r0 as usize, r1 as usize, c0 as usize, c1 as usize);
    let out_cols = c1 - c0;
    let mut out = vec![f64::NAN; (r1 - r0) * out_cols];

    let (chunk_w, chunk_h) = decoder.chunk_dimensions();
    let (chunk_w, chunk_h) = (chunk_w.max(1) as usize, chunk_h.max(1) as usize);
    let chunks_across = match decoder.get_chunk_type() {
        ChunkType::Strip => 1,
        ChunkType::Tile => (width as usize).div_ceil(chunk_w),
    };

    for chunk_row in r0 / chunk_h..=(r1 - 1) / chunk_h {
        for chunk_col in c0 / chunk_w..=(c1 - 1) / chunk_w {
            let index = (chunk_row * chunks_across + chunk_col) as u32;
            let chunk = decoder
                .read_chunk(index)
                .map_err(|e| format!("Cannot read chunk {}: {}", index, e))?;
            let (data_w, data_h) = decoder.chunk_data_dimensions(index);
            let (data_w, data_h) = (data_w as usize, data_h as usize);

            let values = samples_to_f64(chunk);
            let samples = samples_per_pixel(values.len(), data_w * data_h)?;

            let top = chunk_row * chunk_h;
            let left = chunk_col * chunk_w;
            for local_row in 0..data_h {
                let row = top + local_row;
                if row < r0 || row >= r1 {
                    continue;
                }
                let from = c0.max(left);
                let to = c1.min(left + data_w);
                for col in from..to {
                    let value = values[(local_row * data_w + (col - left)) * samples];
                    out[(row - r0) * out_cols + (col - c0)] = value;
                }
            }
        }
    }

    RasterWindow::from_parts(r0, c0, r1 - r0, out_cols, out).map_err(|e| e.to_string())
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(MODEL_TRANSFORMATION) {
        if m.len() >= 8 {
            return Some(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
        }
    }

    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z]; scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let raw = decoder.get_tag_ascii_string(GDAL_NODATA).ok()?;
    let trimmed = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match trimmed.to_ascii_lowercase().as_str() {
        "nan" => Some(f64::NAN),
        _ => trimmed.parse().ok(),
    }
}

#[derive(Debug, Default)]
struct GeoKeys {
    model_type: Option<u32>,
    raster_type: Option<u32>,
    geographic: Option<u32>,
    projected: Option<u32>,
}

impl GeoKeys {
    fn crs(&self) -> Crs {
        let known = |code: Option<u32>| code.filter(|c| *c != 0 && *c != USER_DEFINED);
        match (known(self.projected), known(self.geographic)) {
            (Some(epsg), _) if self.model_type != Some(MODEL_TYPE_GEOGRAPHIC) => Crs::from_epsg(epsg),
            (_, Some(epsg)) => Crs::geographic(epsg),
            (Some(epsg), None) => Crs::from_epsg(epsg),
            (None, None) => {
                tracing::debug!("GeoTIFF carries no EPSG code; assuming WGS84");
                Crs::wgs84()
            }
        }
    }
}

fn read_geokeys<R: Read + Seek>(decoder: &mut Decoder<R>) -> GeoKeys {
    let mut keys = GeoKeys::default();
    let Ok(dir) = decoder.get_tag_u32_vec(GEO_KEY_DIRECTORY) else {
        return keys;
    };

    // Header: [version, revision, minor, key count]; then [id, location, count, value] per key
    for entry in dir.get(4..).unwrap_or_default().chunks_exact(4) {
        let (id, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 {
            continue;
        }
        match id {
            GT_MODEL_TYPE_KEY => keys.model_type = Some(value),
            GT_RASTER_TYPE_KEY => keys.raster_type = Some(value),
            GEOGRAPHIC_TYPE_KEY => keys.geographic = Some(value),
            PROJECTED_CS_TYPE_KEY => keys.projected = Some(value),
            _ => {}
        }
    }
    keys
}

/// Write a raster as a single-band 32-bit float GeoTIFF
pub fn write_geotiff<T: RasterElement>(raster: &Raster<T>, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    encode_geotiff(raster, std::io::BufWriter::new(file))
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let err = |what: &str, e: tiff::TiffError| HydroError::InvalidRaster(format!("{}: {}", what, e));

    let mut encoder = TiffEncoder::new(writer).map_err(|e| err("TIFF encoder error", e))?;

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|v| num_traits::cast(*v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(raster.cols() as u32, raster.rows() as u32)
        .map_err(|e| err("Cannot create TIFF image", e))?;

    let gt = raster.transform();
    if gt.row_rotation == 0.0 && gt.col_rotation == 0.0 {
        let scale = [gt.pixel_width, -gt.pixel_height, 0.0];
        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        image
            .encoder()
            .write_tag(MODEL_PIXEL_SCALE, &scale[..])
            .map_err(|e| err("Cannot write scale tag", e))?;
        image
            .encoder()
            .write_tag(MODEL_TIEPOINT, &tiepoint[..])
            .map_err(|e| err("Cannot write tiepoint tag", e))?;
    } else {
        let matrix = [
            gt.pixel_width, gt.row_rotation, 0.0, gt.origin_x,
            gt.col_rotation, gt.pixel_height, 0.0, gt.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        image
            .encoder()
            .write_tag(MODEL_TRANSFORMATION, &matrix[..])
            .map_err(|e| err("Cannot write transformation tag", e))?;
    }

    let epsg = raster.crs().epsg as u16;
    let (model_type, crs_key) = if raster.crs().is_geographic() {
        (MODEL_TYPE_GEOGRAPHIC as u16, GEOGRAPHIC_TYPE_KEY as u16)
    } else {
        (MODEL_TYPE_PROJECTED as u16, PROJECTED_CS_TYPE_KEY as u16)
    };
    let geokeys: [u16; 16] = [
        1, 1, 0, 3,
        GT_MODEL_TYPE_KEY as u16, 0, 1, model_type,
        GT_RASTER_TYPE_KEY as u16, 0, 1, 1,
        crs_key, 0, 1, epsg,
    ];
    image
        .encoder()
        .write_tag(GEO_KEY_DIRECTORY, &geokeys[..])
        .map_err(|e| err("Cannot write geokey tag", e))?;

    if let Some(nodata) = raster.nodata().and_then(num_traits::cast::<T, f64>) {
        image
            .encoder()
            .write_tag(GDAL_NODATA, nodata.to_string().as_str())
            .map_err(|e| err("Cannot write nodata tag", e))?;
    }

    image.write_data(&data).map_err(|e| err("Cannot write image data", e))?;

    Ok(())
}
