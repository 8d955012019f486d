//! Plain-text CSV helpers for elevation profiles and slope tables.

use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Reads `pk,elevation` rows.
///
/// A first line that does not parse as numbers is taken as a header. Blank
/// lines are ignored. Extra columns are ignored.
pub fn read_profile_csv(path: &str) -> io::Result<Vec<(f64, f64)>> {
    let lines = super::read_lines(path)?;
    let mut rows = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split(',').map(str::trim);
        let pk = fields.next().and_then(|v| v.parse::<f64>().ok());
        let elev = fields.next().and_then(|v| v.parse::<f64>().ok());
        match (pk, elev) {
            (Some(pk), Some(elev)) => rows.push((pk, elev)),
            _ if rows.is_empty() && idx == first_content_line(&lines) => continue,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{path}: line {}: expected `pk,elevation`, got `{line}`", idx + 1),
                ))
            }
        }
    }
    Ok(rows)
}

fn first_content_line(lines: &[String]) -> usize {
    lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .unwrap_or(0)
}

/// Formats a number for output; `NaN` becomes an empty cell.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

/// Quotes a cell only when it contains a separator, quote or newline.
fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Writes a two-column numeric series with a header row.
pub fn write_series_csv(path: &str, header: [&str; 2], rows: &[(f64, f64)]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{},{}", quote(header[0]), quote(header[1]))?;
    for (a, b) in rows {
        writeln!(out, "{},{}", format_value(*a), format_value(*b))?;
    }
    out.flush()
}

/// Writes a text table with a header row.
pub fn write_table_csv(path: &str, header: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    let line = |cells: &[String]| cells.iter().map(|c| quote(c)).collect::<Vec<_>>().join(",");
    writeln!(out, "{}", line(header))?;
    for row in rows {
        writeln!(out, "{}", line(row))?;
    }
    out.flush()
}
