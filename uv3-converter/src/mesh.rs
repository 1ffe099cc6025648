/// Triangle mesh model and loaders for Wavefront OBJ and OFF files.
use crate::constants::HEADER_PREALLOCATION_LIMIT;
use crate::error::{ConvertError, Result};
use log::{debug, info};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Vertex positions plus triangular faces of 0-based vertex indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<[f64; 3]>,
    faces: Vec<[usize; 3]>,
}

impl Mesh {
    /// Build a mesh, rejecting any face index past the vertex list.
    pub fn new(vertices: Vec<[f64; 3]>, faces: Vec<[usize; 3]>) -> Result<Self> {
        for (i, face) in faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&v| v >= vertices.len()) {
                return Err(ConvertError::InvalidMesh(format!(
                    "face {} references vertex {} but mesh has {} vertices",
                    i,
                    bad,
                    vertices.len()
                )));
            }
        }
        Ok(Self { vertices, faces })
    }

    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// The three corner positions of a face, in face order.
    pub fn face_vertices(&self, face: &[usize; 3]) -> [[f64; 3]; 3] {
        face.map(|i| self.vertices[i])
    }

    /// Load from disk, picking the parser from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let file = File::open(path)?;
        let mesh = match ext.as_str() {
            "obj" => parse_obj(file, path)?,
            "off" => parse_off(file, path)?,
            _ => return Err(ConvertError::UnsupportedFormat(path.to_path_buf())),
        };

        info!(
            "Loaded mesh {}: {} vertices, {} faces",
            path.display(),
            mesh.vertices.len(),
            mesh.faces.len()
        );
        Ok(mesh)
    }
}

fn parse_coords(path: &Path, line_no: usize, fields: &[&str]) -> Result<[f64; 3]> {
    if fields.len() < 3 {
        return Err(ConvertError::parse(
            path,
            line_no,
            format!("expected 3 coordinates, found {}", fields.len()),
        ));
    }
    let mut out = [0.0; 3];
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = field.parse::<f64>().map_err(|e| {
            ConvertError::parse(path, line_no, format!("bad coordinate '{field}': {e}"))
        })?;
    }
    Ok(out)
}

/// Resolve an OBJ face token (`7`, `7/2`, `7//3`, `-1`) to a 0-based index.
fn obj_index(path: &Path, line_no: usize, token: &str, vertex_count: usize) -> Result<usize> {
    let head = token.split('/').next().unwrap_or_default();
    let raw: i64 = head
        .parse()
        .map_err(|e| ConvertError::parse(path, line_no, format!("bad face index '{token}': {e}")))?;

    let index = match raw {
        0 => None,
        r if r > 0 => Some(r as usize - 1),
        r => vertex_count.checked_sub(r.unsigned_abs() as usize),
    };
    index.ok_or_else(|| {
        ConvertError::parse(path, line_no, format!("face index {raw} out of range"))
    })
}

/// Fan-triangulate a polygon given as vertex indices.
fn push_fan(faces: &mut Vec<[usize; 3]>, polygon: &[usize]) {
    for i in 1..polygon.len().saturating_sub(1) {
        faces.push([polygon[0], polygon[i], polygon[i + 1]]);
    }
}

/// Parse Wavefront OBJ geometry: `v` records and `f` records, ignoring
/// normals, texture coordinates, groups and materials.
pub fn parse_obj<R: Read>(reader: R, path: &Path) -> Result<Mesh> {
    let mut rd = BufReader::new(reader);
    let mut line = String::with_capacity(256);
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    let mut polygon = Vec::with_capacity(4);
    let mut line_no = 0;

    loop {
        line.clear();
        if rd.read_line(&mut line)? == 0 {
            break;
        }
        line_no += 1;

        let mut it = line.split_whitespace();
        match it.next() {
            Some("v") => {
                let fields: Vec<&str> = it.take(3).collect();
                vertices.push(parse_coords(path, line_no, &fields)?);
            }
            Some("f") => {
                polygon.clear();
                for token in it {
                    polygon.push(obj_index(path, line_no, token, vertices.len())?);
                }
                if polygon.len() < 3 {
                    return Err(ConvertError::parse(
                        path,
                        line_no,
                        "face needs at least 3 vertices",
                    ));
                }
                push_fan(&mut faces, &polygon);
            }
            _ => {}
        }
    }

    debug!("OBJ {}: {} lines read", path.display(), line_no);
    Mesh::new(vertices, faces)
}

/// Parse an ASCII OFF file (`OFF`, counts line, vertices, faces).
pub fn parse_off<R: Read>(reader: R, path: &Path) -> Result<Mesh> {
    let rd = BufReader::new(reader);

    // Non-empty, comment-stripped lines paired with their 1-based number.
    let mut lines = rd
        .lines()
        .enumerate()
        .map(|(i, l)| l.map(|l| (i + 1, l)))
        .filter(|r| {
            r.as_ref().map_or(true, |(_, l)| {
                let t = l.split('#').next().unwrap_or_default().trim();
                !t.is_empty()
            })
        });

    let mut next_line = |what: &str| -> Result<(usize, String)> {
        match lines.next() {
            Some(Ok((n, l))) => Ok((n, l.split('#').next().unwrap_or_default().trim().to_string())),
            Some(Err(e)) => Err(e.into()),
            None => Err(ConvertError::parse(path, 0, format!("unexpected end of file, expected {what}"))),
        }
    };

    let (n, header) = next_line("OFF header")?;
    let counts_inline = match header.strip_prefix("OFF") {
        Some(rest) if !rest.trim().is_empty() => Some((n, rest.trim().to_string())),
        Some(_) => None,
        None => return Err(ConvertError::parse(path, n, "missing OFF header")),
    };
    let (n, counts) = match counts_inline {
        Some(c) => c,
        None => next_line("vertex and face counts")?,
    };

    let fields: Vec<&str> = counts.split_whitespace().collect();
    let parse_count = |s: Option<&&str>| -> Result<usize> {
        s.and_then(|s| s.parse().ok())
            .ok_or_else(|| ConvertError::parse(path, n, format!("bad counts line '{counts}'")))
    };
    let vertex_count = parse_count(fields.first())?;
    let face_count = parse_count(fields.get(1))?;

    // Header counts are untrusted; cap the preallocation.
    let mut vertices = Vec::with_capacity(vertex_count.min(HEADER_PREALLOCATION_LIMIT));
    for _ in 0..vertex_count {
        let (n, l) = next_line("vertex")?;
        let fields: Vec<&str> = l.split_whitespace().collect();
        vertices.push(parse_coords(path, n, &fields)?);
    }

    let mut faces = Vec::with_capacity(face_count.min(HEADER_PREALLOCATION_LIMIT));
    for _ in 0..face_count {
        let (n, l) = next_line("face")?;
        let mut tokens = l.split_whitespace();
        let bad_face = |e: std::num::ParseIntError| ConvertError::parse(path, n, format!("bad face: {e}"));

        // Leading vertex count, then k indices; trailing per-face colour values are ignored.
        let k: usize = tokens
            .next()
            .ok_or_else(|| ConvertError::parse(path, n, "empty face line"))?
            .parse()
            .map_err(bad_face)?;
        let polygon: Vec<usize> = tokens
            .take(k)
            .map(|s| s.parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(bad_face)?;
        if k < 3 || polygon.len() < k {
            return Err(ConvertError::parse(
                path,
                n,
                format!("face declares {k} vertices, found {}", polygon.len()),
            ));
        }
        push_fan(&mut faces, &polygon);
    }

    Mesh::new(vertices, faces)
}
