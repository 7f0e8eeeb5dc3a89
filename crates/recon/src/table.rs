//! Tabular (CSV) serialization for input record sets and reconciled output.

use std::io::Write;
use std::path::Path;

use crate::compare::FieldPair;
use crate::config::SourceConfig;
use crate::error::ReconError;
use crate::model::{AggregateRow, ReconciledRecord, Record, RecordSet, Side};
use crate::value::{Number, Value};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Load CSV data into a record set, applying null tokens, declared column
/// types and the row filter. Headers become the schema.
pub fn load_csv(side: Side, csv_data: &str, source: &SourceConfig) -> Result<RecordSet, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(source.delimiter as u8)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, ReconError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ReconError::MissingField { side, field: name.into() })
    };

    for column in source.types.keys() {
        idx(column)?;
    }
    let column_types: Vec<_> = headers.iter().map(|h| source.types.get(h).copied()).collect();

    let filter = match source.filter {
        Some(ref filter) => Some((idx(&filter.column)?, &filter.values)),
        None => None,
    };

    let mut set = RecordSet::new(headers.clone());

    for (row, record) in reader.records().enumerate() {
        let record = record?;

        if let Some((fi, values)) = filter {
            let val = record.get(fi).unwrap_or("");
            if !values.iter().any(|v| v == val) {
                continue;
            }
        }

        let mut out = Record::new();
        for (i, header) in headers.iter().enumerate() {
            let raw = record.get(i).unwrap_or("");
            let value = if source.null_values.iter().any(|n| n.trim() == raw.trim()) {
                Value::Missing
            } else {
                match column_types[i] {
                    Some(ty) => ty.parse(raw).ok_or_else(|| ReconError::ValueParse {
                        side,
                        row: row + 1,
                        column: header.clone(),
                        value: raw.to_string(),
                    })?,
                    None => Value::infer(raw),
                }
            };
            out.insert(header.clone(), value);
        }
        set.push(out);
    }

    log::debug!("{side}: loaded {} record(s) with {} column(s)", set.len(), set.columns().len());
    Ok(set)
}

/// Read and load a CSV file.
pub fn load_csv_file(side: Side, path: &Path, source: &SourceConfig) -> Result<RecordSet, ReconError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| ReconError::Io(format!("cannot read {}: {e}", path.display())))?;
    load_csv(side, &data, source)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn cell(value: Option<&Value>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn number_cell(n: Option<Number>) -> String {
    n.map(|n| n.to_string()).unwrap_or_default()
}

/// One row per reconciled record: key columns, status, then
/// `<field>_left`, `<field>_right`, `<field>_diff` per compared field.
/// Absent values are empty cells.
pub fn write_records_csv<W: Write>(
    out: W,
    key_fields: &[String],
    records: &[ReconciledRecord],
    pairs: &[FieldPair],
) -> Result<(), ReconError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header: Vec<String> = key_fields.to_vec();
    header.push("status".into());
    for pair in pairs {
        let name = pair.name();
        header.push(format!("{name}_left"));
        header.push(format!("{name}_right"));
        header.push(format!("{name}_diff"));
    }
    writer.write_record(&header)?;

    for record in records {
        let mut row: Vec<String> = record.key.components().iter().map(|v| v.to_string()).collect();
        row.push(record.status.to_string());
        for pair in pairs {
            row.push(cell(record.left.as_ref().and_then(|r| r.get(&pair.left))));
            row.push(cell(record.right.as_ref().and_then(|r| r.get(&pair.right))));
            row.push(number_cell(record.difference(pair.name())));
        }
        writer.write_record(&row)?;
    }

    writer.flush().map_err(|e| ReconError::Io(e.to_string()))
}

/// One row per aggregation group. The `scope` column is `group` or `total`.
pub fn write_aggregates_csv<W: Write>(
    out: W,
    group_by: &[String],
    rows: &[AggregateRow],
    pairs: &[FieldPair],
) -> Result<(), ReconError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header: Vec<String> = vec!["scope".into()];
    header.extend(group_by.iter().cloned());
    header.extend(
        ["records", "match", "mismatch", "left_only", "right_only", "indeterminate"]
            .iter()
            .map(|s| s.to_string()),
    );
    for pair in pairs {
        let name = pair.name();
        for suffix in ["left_sum", "right_sum", "diff", "compared", "left_only", "right_only", "abs_gap"] {
            header.push(format!("{name}_{suffix}"));
        }
    }
    writer.write_record(&header)?;

    for agg in rows {
        let scope = if agg.is_grand_total() { "total" } else { "group" };
        let mut row: Vec<String> = vec![scope.into()];
        row.extend(group_by.iter().map(|g| cell(agg.group.get(g))));
        let counts = &agg.status_counts;
        row.extend(
            [
                agg.record_count,
                counts.matched,
                counts.mismatched,
                counts.left_only,
                counts.right_only,
                counts.indeterminate,
            ]
            .iter()
            .map(|n| n.to_string()),
        );
        for pair in pairs {
            match agg.field(pair.name()) {
                Some(t) => {
                    row.push(number_cell(t.left_sum));
                    row.push(number_cell(t.right_sum));
                    row.push(number_cell(t.difference));
                    row.push(t.compared.to_string());
                    row.push(number_cell(t.left_only));
                    row.push(number_cell(t.right_only));
                    row.push(t.absolute_gap.to_string());
                }
                None => row.extend(std::iter::repeat(String::new()).take(7)),
            }
        }
        writer.write_record(&row)?;
    }

    writer.flush().map_err(|e| ReconError::Io(e.to_string()))
}
