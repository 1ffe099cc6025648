/// UV3 record encoding and streaming.
///
/// A UV3 file is a flat sequence of 28-byte little-endian records with no
/// header: x, y, z as f64 (longitude and latitude in radians, elevation in
/// metres) followed by the primitive tag and the red, green, blue channels.
/// Readers derive the record count from the file size.
use crate::coordinates::RadianPoint;
use crate::error::{ConvertError, Result};
use byteorder::{ByteOrder, LittleEndian};
use constants::uv3::{BACKGROUND_COLOUR, UV3_LINE, UV3_POINT, UV3_RECORD_SIZE, UV3_TRIANGLE};
use std::io::{self, BufWriter, Read, Write};

/// Primitive tag carried by each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Point,
    Line,
    Triangle,
}

impl Primitive {
    pub fn code(self) -> u8 {
        match self {
            Primitive::Point => UV3_POINT,
            Primitive::Line => UV3_LINE,
            Primitive::Triangle => UV3_TRIANGLE,
        }
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            UV3_POINT => Ok(Primitive::Point),
            UV3_LINE => Ok(Primitive::Line),
            UV3_TRIANGLE => Ok(Primitive::Triangle),
            other => Err(ConvertError::UnknownPrimitive(other)),
        }
    }
}

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const BACKGROUND: Rgb = Rgb(BACKGROUND_COLOUR);

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb([r, g, b])
    }

    /// Clamp a channel sample to 0..=255 and truncate.
    pub fn channel(value: f64) -> u8 {
        if value.is_nan() {
            0
        } else {
            value.clamp(0.0, 255.0) as u8
        }
    }

    /// Colour from a unit-range triple (palette output): `trunc(c * 255)`.
    pub fn from_unit(rgb: [f64; 3]) -> Self {
        Rgb(rgb.map(|c| Self::channel(c * 255.0)))
    }

    /// Substitute the background colour for a missing sample.
    pub fn or_background(colour: Option<Rgb>) -> Rgb {
        colour.unwrap_or(Rgb::BACKGROUND)
    }
}

/// One encoded vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uv3Record {
    pub position: RadianPoint,
    pub primitive: Primitive,
    pub colour: Rgb,
}

impl Uv3Record {
    pub fn new(position: RadianPoint, primitive: Primitive, colour: Rgb) -> Self {
        Self {
            position,
            primitive,
            colour,
        }
    }

    pub fn encode(&self) -> [u8; UV3_RECORD_SIZE] {
        let [r, g, b] = self.colour.0;
        encode(
            self.position.x,
            self.position.y,
            self.position.z,
            self.primitive.code(),
            r,
            g,
            b,
        )
    }

    pub fn decode(bytes: &[u8; UV3_RECORD_SIZE]) -> Result<Self> {
        let position = RadianPoint {
            x: LittleEndian::read_f64(&bytes[0..8]),
            y: LittleEndian::read_f64(&bytes[8..16]),
            z: LittleEndian::read_f64(&bytes[16..24]),
        };
        Ok(Self {
            position,
            primitive: Primitive::from_code(bytes[24])?,
            colour: Rgb([bytes[25], bytes[26], bytes[27]]),
        })
    }
}

/// Encode `(x, y, z, type, r, g, b)` into one 28-byte record.
#[allow(clippy::too_many_arguments)]
pub fn encode(x: f64, y: f64, z: f64, type_code: u8, r: u8, g: u8, b: u8) -> [u8; UV3_RECORD_SIZE] {
    let mut bytes = [0u8; UV3_RECORD_SIZE];
    LittleEndian::write_f64(&mut bytes[0..8], x);
    LittleEndian::write_f64(&mut bytes[8..16], y);
    LittleEndian::write_f64(&mut bytes[16..24], z);
    bytes[24] = type_code;
    bytes[25] = r;
    bytes[26] = g;
    bytes[27] = b;
    bytes
}

/// Append-only UV3 stream over any writer.
pub struct Uv3Writer<W: Write> {
    inner: BufWriter<W>,
    records: u64,
}

impl<W: Write> Uv3Writer<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
            records: 0,
        }
    }

    pub fn write_record(&mut self, record: &Uv3Record) -> io::Result<()> {
        self.inner.write_all(&record.encode())?;
        self.records += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(self) -> io::Result<W> {
        self.inner.into_inner().map_err(|e| e.into_error())
    }
}

/// Sequential reader yielding records until end of stream.
pub struct Uv3Reader<R: Read> {
    inner: R,
}

impl<R: Read> Uv3Reader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Next record, `None` at a clean end of stream.
    pub fn next_record(&mut self) -> Result<Option<Uv3Record>> {
        let mut bytes = [0u8; UV3_RECORD_SIZE];
        let mut filled = 0;
        while filled < UV3_RECORD_SIZE {
            let n = match self.inner.read(&mut bytes[filled..]) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                break;
            }
            filled += n;
        }

        match filled {
            0 => Ok(None),
            UV3_RECORD_SIZE => Uv3Record::decode(&bytes).map(Some),
            partial => Err(ConvertError::TruncatedRecord(partial)),
        }
    }
}

impl<R: Read> Iterator for Uv3Reader<R> {
    type Item = Result<Uv3Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
