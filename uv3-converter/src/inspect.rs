/// Summary of an existing UV3 stream.
use crate::bounds::OutputBounds;
use crate::error::Result;
use crate::uv3::{Primitive, Uv3Reader};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;

#[derive(Debug, Default, Serialize)]
pub struct StreamSummary {
    pub records: u64,
    pub points: u64,
    pub line_vertices: u64,
    pub triangle_vertices: u64,
    /// Distinct colours and how many records carry them.
    pub colours: BTreeMap<String, u64>,
    pub bounds: OutputBounds,
}

impl StreamSummary {
    /// Read the whole stream; a trailing partial record is an error.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut summary = StreamSummary::default();
        for record in Uv3Reader::new(reader) {
            let record = record?;
            summary.records += 1;
            match record.primitive {
                Primitive::Point => summary.points += 1,
                Primitive::Line => summary.line_vertices += 1,
                Primitive::Triangle => summary.triangle_vertices += 1,
            }
            let [r, g, b] = record.colour.0;
            *summary
                .colours
                .entry(format!("{r},{g},{b}"))
                .or_insert(0) += 1;
            summary.bounds.update(&record.position);
        }
        Ok(summary)
    }
}
