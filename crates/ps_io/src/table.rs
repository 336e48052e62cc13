//! Candidate table loading.
//!
//! Sources: delimited text (CSV, `;` by default) or a JSON array of flat
//! records. Both go through the same row ingestion:
//!
//! - Required columns (id, group, life, cost) are resolved by exact name,
//!   then ASCII case-insensitively, then through the configured aliases.
//!   Any that cannot be resolved fail the load with `IoError::MissingColumns`.
//! - Numbers: a lone decimal comma is read as a decimal point (`"12,5"`).
//!   Empty, unparsable, NaN or infinite values become `0` with a
//!   `Row.ValueCoerced` warning; a negative cost becomes `0` with
//!   `Row.NegativeCost`.
//! - Rows with an empty id are skipped (`Row.MissingId`); a repeated id keeps
//!   the first row (`Row.DuplicateId`).
//! - Every other column is carried through as an attribute, in header order.
//! - Bytes that are not valid UTF-8 are decoded as Windows-1252 (the Latin-1
//!   superset spreadsheet exports use) with an `Input.Latin1Fallback` warning.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use ps_core::diagnostics::{codes, EntityRef, Issue};
use ps_core::entities::{Candidate, CandidateTable};
use ps_core::ids::{CandidateId, GroupKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::hasher::sha256_hex;
use crate::{IoError, IoResult};

/// Hard cap on candidate file size.
pub const MAX_INPUT_BYTES: u64 = 256 * 1024 * 1024;

/* --------------------------------- Config --------------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    #[default]
    Csv,
    Json,
}

/// How to read the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSource {
    pub format: InputFormat,
    /// CSV field delimiter (ignored for JSON).
    pub delimiter: u8,
}

impl Default for TableSource {
    fn default() -> Self {
        Self { format: InputFormat::Csv, delimiter: b';' }
    }
}

/// Extra accepted header names per role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnAliases {
    #[serde(default)]
    pub id: Vec<String>,
    #[serde(default)]
    pub group: Vec<String>,
    #[serde(default)]
    pub life: Vec<String>,
    #[serde(default)]
    pub cost: Vec<String>,
}

/// Names of the four required columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMap {
    pub id: String,
    pub group: String,
    pub life: String,
    pub cost: String,
    #[serde(default)]
    pub aliases: ColumnAliases,
}

impl Default for ColumnMap {
    /// Header names of the project sheets this tool was built around.
    fn default() -> Self {
        Self {
            id: "id_proyecto".into(),
            group: "proyecto".into(),
            life: "vida".into(),
            cost: "valorinversion".into(),
            aliases: ColumnAliases {
                cost: vec![
                    "Valor Inversión (mill)".into(),
                    "Valor Inversion (mill)".into(),
                    "Valor InversiÃ³n (mill)".into(),
                ],
                ..ColumnAliases::default()
            },
        }
    }
}

/// Result of a load: the table plus every row-level finding.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: CandidateTable,
    pub issues: Vec<Issue>,
    /// SHA-256 of the raw input bytes.
    pub input_sha256: String,
    /// Data rows seen, including skipped ones.
    pub rows_read: usize,
}

/* --------------------------------- Entry --------------------------------- */

/// Read, decode and parse a candidate file.
pub fn load_table(path: &Path, source: &TableSource, columns: &ColumnMap) -> IoResult<LoadedTable> {
    let meta = fs::metadata(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    if meta.len() > MAX_INPUT_BYTES {
        return Err(IoError::Limit(format!(
            "{} is {} bytes; limit is {MAX_INPUT_BYTES}",
            path.display(),
            meta.len()
        )));
    }
    let bytes = fs::read(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    load_table_from_bytes(&bytes, source, columns)
}

/// Same as [`load_table`] over in-memory bytes.
pub fn load_table_from_bytes(
    bytes: &[u8],
    source: &TableSource,
    columns: &ColumnMap,
) -> IoResult<LoadedTable> {
    let input_sha256 = sha256_hex(bytes);
    let mut issues = Vec::new();
    let text = decode_text(bytes, &mut issues);

    let (header, records) = match source.format {
        InputFormat::Csv => read_csv(&text, source.delimiter)?,
        InputFormat::Json => read_json_records(&text)?,
    };

    let mut ingest = Ingest::new(&header, columns)?;
    let rows_read = records.len();
    for (i, rec) in records.iter().enumerate() {
        ingest.row(i + 1, rec, &mut issues)?;
    }
    let (rows, attribute_columns) = ingest.finish();
    debug!(rows_read, candidates = rows.len(), issues = issues.len(), "candidate table loaded");

    let table = CandidateTable::new(rows, attribute_columns).map_err(|e| IoError::Schema {
        pointer: "/".into(),
        msg: e.to_string(),
    })?;
    Ok(LoadedTable { table, issues, input_sha256, rows_read })
}

/* -------------------------------- Decoding -------------------------------- */

fn decode_text(bytes: &[u8], issues: &mut Vec<Issue>) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) => {
            warn!(valid_up_to = e.valid_up_to(), "input is not UTF-8; decoding as Windows-1252");
            issues.push(Issue::warning(
                codes::INPUT_LATIN1_FALLBACK,
                EntityRef::Root,
                format!("invalid UTF-8 at byte {}; decoded as Windows-1252", e.valid_up_to()),
            ));
            bytes.iter().map(|&b| cp1252_char(b)).collect()
        }
    }
}

/// Windows-1252 code points for 0x80..=0x9F. Zero marks the five unassigned
/// bytes, which pass through as their Latin-1 C1 controls.
const CP1252_HIGH: [u16; 32] = [
    0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, //
    0x02C6, 0x2030, 0x0160, 0x2039, 0x0152, 0, 0x017D, 0, //
    0, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, //
    0x02DC, 0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E, 0x0178,
];

fn cp1252_char(b: u8) -> char {
    match b {
        0x80..=0x9F => match CP1252_HIGH[usize::from(b - 0x80)] {
            0 => char::from(b),
            cp => char::from_u32(u32::from(cp)).unwrap_or(char::REPLACEMENT_CHARACTER),
        },
        _ => char::from(b),
    }
}

/* --------------------------------- Readers -------------------------------- */

type Records = Vec<Vec<String>>;

fn read_csv(text: &str, delimiter: u8) -> IoResult<(Vec<String>, Records)> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let header: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut records = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        records.push(rec.iter().map(str::to_string).collect());
    }
    Ok((header, records))
}

fn read_json_records(text: &str) -> IoResult<(Vec<String>, Records)> {
    let v: Value = serde_json::from_str(text)?;
    let arr = v.as_array().ok_or_else(|| IoError::Schema {
        pointer: "/".into(),
        msg: "expected a JSON array of records".into(),
    })?;

    // Header = union of keys in first-seen order.
    let mut header: Vec<String> = Vec::new();
    for (i, item) in arr.iter().enumerate() {
        let obj = item.as_object().ok_or_else(|| IoError::Schema {
            pointer: format!("/{i}"),
            msg: "record must be an object".into(),
        })?;
        for k in obj.keys() {
            if !header.iter().any(|h| h == k) {
                header.push(k.clone());
            }
        }
    }

    let records = arr
        .iter()
        .map(|item| {
            header
                .iter()
                .map(|k| match item.get(k) {
                    None | Some(Value::Null) => String::new(),
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                })
                .collect()
        })
        .collect();
    Ok((header, records))
}

/* -------------------------------- Ingestion -------------------------------- */

fn resolve(header: &[String], name: &str, aliases: &[String]) -> Option<usize> {
    let exact = |n: &str| header.iter().position(|h| h == n);
    let folded = |n: &str| header.iter().position(|h| h.eq_ignore_ascii_case(n));
    exact(name)
        .or_else(|| folded(name))
        .or_else(|| aliases.iter().find_map(|a| exact(a)))
        .or_else(|| aliases.iter().find_map(|a| folded(a)))
}

struct Ingest {
    id: usize,
    group: usize,
    life: usize,
    cost: usize,
    header: Vec<String>,
    seen: BTreeSet<CandidateId>,
    rows: Vec<Candidate>,
}

impl Ingest {
    fn new(header: &[String], columns: &ColumnMap) -> IoResult<Self> {
        let a = &columns.aliases;
        let roles = [
            ("id", &columns.id, &a.id),
            ("group", &columns.group, &a.group),
            ("life", &columns.life, &a.life),
            ("cost", &columns.cost, &a.cost),
        ];
        let mut found = [0usize; 4];
        let mut missing = Vec::new();
        for (slot, (role, name, aliases)) in roles.iter().enumerate() {
            match resolve(header, name, aliases) {
                Some(i) => found[slot] = i,
                None => missing.push(format!("{role} ({name})")),
            }
        }
        if !missing.is_empty() {
            return Err(IoError::MissingColumns(missing));
        }
        Ok(Self {
            id: found[0],
            group: found[1],
            life: found[2],
            cost: found[3],
            header: header.to_vec(),
            seen: BTreeSet::new(),
            rows: Vec::new(),
        })
    }

    fn is_role(&self, i: usize) -> bool {
        i == self.id || i == self.group || i == self.life || i == self.cost
    }

    fn row(&mut self, row_no: usize, rec: &[String], issues: &mut Vec<Issue>) -> IoResult<()> {
        let field = |i: usize| rec.get(i).map(String::as_str).unwrap_or("");

        let raw_id = field(self.id);
        let Ok(id) = raw_id.parse::<CandidateId>() else {
            if raw_id.trim().is_empty() {
                warn!(row = row_no, "row skipped: empty id");
                issues.push(Issue::warning(codes::ROW_MISSING_ID, EntityRef::Row(row_no), "empty id; row skipped"));
            } else {
                warn!(row = row_no, id = ?raw_id, "row skipped: invalid id");
                issues.push(Issue::warning(
                    codes::ROW_INVALID_ID,
                    EntityRef::Row(row_no),
                    format!("id {raw_id:?} contains control characters; row skipped"),
                ));
            }
            return Ok(());
        };
        if self.seen.contains(&id) {
            warn!(row = row_no, candidate = %id, "row skipped: duplicate id");
            issues.push(Issue::warning(
                codes::ROW_DUPLICATE_ID,
                EntityRef::Row(row_no),
                format!("id {id} already seen; row skipped"),
            ));
            return Ok(());
        }

        let life = coerce_field(field(self.life), row_no, &self.header[self.life], issues);
        let mut cost = coerce_field(field(self.cost), row_no, &self.header[self.cost], issues);
        if cost < 0.0 {
            warn!(row = row_no, cost, "negative cost coerced to 0");
            issues.push(Issue::warning(
                codes::ROW_NEGATIVE_COST,
                EntityRef::Row(row_no),
                format!("cost {cost} is negative; using 0"),
            ));
            cost = 0.0;
        }

        let group = GroupKey::new(field(self.group).trim());
        let mut cand = Candidate::new(id.clone(), group, life, cost).map_err(|e| IoError::Schema {
            pointer: format!("/rows/{row_no}"),
            msg: e.to_string(),
        })?;
        for (i, name) in self.header.iter().enumerate() {
            if !self.is_role(i) {
                cand = cand.with_attribute(name.clone(), field(i));
            }
        }

        self.seen.insert(id);
        self.rows.push(cand);
        Ok(())
    }

    fn finish(self) -> (Vec<Candidate>, Vec<String>) {
        let attrs = self
            .header
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.is_role(*i))
            .map(|(_, h)| h.clone())
            .collect();
        (self.rows, attrs)
    }
}

/// Parse a numeric cell. `None` means the cell cannot be used as a number.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let parsed = if !s.contains('.') && s.matches(',').count() == 1 {
        s.replacen(',', ".", 1).parse::<f64>()
    } else {
        s.parse::<f64>()
    };
    parsed.ok().filter(|v| v.is_finite())
}

fn coerce_field(raw: &str, row_no: usize, column: &str, issues: &mut Vec<Issue>) -> f64 {
    match parse_number(raw) {
        Some(v) => v,
        None => {
            warn!(row = row_no, column, value = raw, "non-numeric value coerced to 0");
            issues.push(Issue::warning(
                codes::ROW_VALUE_COERCED,
                EntityRef::Row(row_no),
                format!("{column}: {raw:?} is not a number; using 0"),
            ));
            0.0
        }
    }
}
