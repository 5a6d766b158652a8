/// Tracklet CSV codec
///
/// This module parses and serializes the flat tracklet table: one row per
/// bounding-box detection, comma-separated, header row required.
/// Legacy columns (e.g. a derived `layer` index) are tolerated on read and
/// dropped on write.
use std::collections::HashMap;
use std::path::Path;

use crate::error::Error;

/// One bounding-box detection of an object in one frame, carrying the
/// identity label that links the same object across frames and timepoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Tracklet {
    /// Basename of the image frame this row belongs to.
    pub filename: String,
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    /// Identity label, unique among rows of the same frame.
    pub id: i64,
    pub score: f32,
    pub class: String,
    pub width: u32,
    pub height: u32,
}

impl Tracklet {
    /// Corner vertices in draw order: (x, y) pairs starting at the
    /// top-left, winding clockwise.
    pub fn corners(&self) -> [(f32, f32); 4] {
        [
            (self.xmin, self.ymin),
            (self.xmax, self.ymin),
            (self.xmax, self.ymax),
            (self.xmin, self.ymax),
        ]
    }

    /// Rewrite the box extents from a vertex list, taking min/max over all
    /// vertices. Returns true if any coordinate actually changed.
    pub fn set_extents_from_vertices(&mut self, vertices: &[(f32, f32)]) -> bool {
        if vertices.is_empty() {
            return false;
        }
        let mut xmin = f32::INFINITY;
        let mut ymin = f32::INFINITY;
        let mut xmax = f32::NEG_INFINITY;
        let mut ymax = f32::NEG_INFINITY;
        for &(x, y) in vertices {
            xmin = xmin.min(x);
            ymin = ymin.min(y);
            xmax = xmax.max(x);
            ymax = ymax.max(y);
        }
        let changed = self.xmin != xmin || self.ymin != ymin || self.xmax != xmax || self.ymax != ymax;
        self.xmin = xmin;
        self.ymin = ymin;
        self.xmax = xmax;
        self.ymax = ymax;
        changed
    }
}

/// Columns written on save, in canonical order. Files may carry extra
/// columns; those are ignored on read.
pub const COLUMNS: [&str; 10] = [
    "filename", "xmin", "ymin", "xmax", "ymax", "id", "score", "class", "width", "height",
];

/// Parse tracklet CSV from a file.
pub fn read_file(path: &Path) -> Result<Vec<Tracklet>, Error> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Io(format!("failed to read {}: {}", path.display(), e)))?;
    parse_str(&content)
}

/// Parse tracklet CSV from a string. The first non-empty line must be a
/// header naming every canonical column; column order is free.
pub fn parse_str(content: &str) -> Result<Vec<Tracklet>, Error> {
    let mut lines = content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines
        .next()
        .ok_or_else(|| Error::Format("file is empty".to_string()))?;
    let columns = parse_header(header)?;

    let mut rows = Vec::new();
    for (line_no, line) in lines {
        rows.push(parse_row(line, &columns, line_no + 1)?);
    }
    Ok(rows)
}

/// Serialize rows back to the canonical CSV layout.
pub fn to_csv_string(rows: &[Tracklet]) -> String {
    let mut out = String::with_capacity(rows.len() * 64 + 128);
    out.push_str(&COLUMNS.join(","));
    out.push('\n');
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{}\n",
            row.filename,
            row.xmin,
            row.ymin,
            row.xmax,
            row.ymax,
            row.id,
            row.score,
            row.class,
            row.width,
            row.height
        ));
    }
    out
}

/// Quick detection: does this content look like a tracklet CSV?
pub fn is_tracklet_csv(content: &str) -> bool {
    content
        .lines()
        .find(|l| !l.trim().is_empty())
        .map(|header| parse_header(header).is_ok())
        .unwrap_or(false)
}

fn parse_header(header: &str) -> Result<HashMap<String, usize>, Error> {
    let mut columns = HashMap::new();
    for (idx, name) in header.split(',').enumerate() {
        columns.entry(name.trim().to_string()).or_insert(idx);
    }
    for required in COLUMNS {
        if !columns.contains_key(required) {
            return Err(Error::Format(format!("missing column '{}'", required)));
        }
    }
    Ok(columns)
}

fn parse_row(line: &str, columns: &HashMap<String, usize>, line_no: usize) -> Result<Tracklet, Error> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let field = |name: &str| -> Result<&str, Error> {
        let idx = columns[name];
        fields.get(idx).copied().ok_or_else(|| {
            Error::Format(format!("line {}: missing field '{}'", line_no, name))
        })
    };

    Ok(Tracklet {
        filename: basename(field("filename")?).to_string(),
        xmin: parse_f32(field("xmin")?, "xmin", line_no)?,
        ymin: parse_f32(field("ymin")?, "ymin", line_no)?,
        xmax: parse_f32(field("xmax")?, "xmax", line_no)?,
        ymax: parse_f32(field("ymax")?, "ymax", line_no)?,
        id: parse_id(field("id")?, line_no)?,
        score: parse_f32(field("score")?, "score", line_no)?,
        class: field("class")?.to_string(),
        width: parse_dim(field("width")?, "width", line_no)?,
        height: parse_dim(field("height")?, "height", line_no)?,
    })
}

/// Strip any directory prefix; rows always hold basenames.
fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn parse_f32(value: &str, name: &str, line_no: usize) -> Result<f32, Error> {
    value.parse::<f32>().map_err(|_| {
        Error::Format(format!("line {}: '{}' is not a number for '{}'", line_no, value, name))
    })
}

/// Ids are integers, but tables that went through float-typed tooling may
/// carry them as "7.0".
fn parse_id(value: &str, line_no: usize) -> Result<i64, Error> {
    if let Ok(id) = value.parse::<i64>() {
        return Ok(id);
    }
    match value.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 => Ok(f as i64),
        _ => Err(Error::Format(format!("line {}: '{}' is not a valid id", line_no, value))),
    }
}

fn parse_dim(value: &str, name: &str, line_no: usize) -> Result<u32, Error> {
    if let Ok(dim) = value.parse::<u32>() {
        return Ok(dim);
    }
    match value.parse::<f64>() {
        Ok(f) if f >= 0.0 && f.fract() == 0.0 => Ok(f as u32),
        _ => Err(Error::Format(format!(
            "line {}: '{}' is not a valid dimension for '{}'",
            line_no, value, name
        ))),
    }
}
