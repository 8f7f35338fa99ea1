// src/io/namelist/writer.rs

use crate::config::{FormatConfig, MatrixIndex};
use crate::model::Value;

/// Appends one `&name ... /` block to `out`.
///
/// Keys are written in the order given. Empty lists and matrices have no
/// namelist spelling and are skipped.
pub fn write_group(out: &mut String, name: &str, entries: &[(&str, &Value)], config: &FormatConfig) {
    out.push('&');
    out.push_str(name);
    out.push('\n');

    for (key, value) in entries {
        match value {
            Value::IntMatrix(rows) => {
                let rows: Vec<Vec<String>> = rows
                    .iter()
                    .map(|r| r.iter().map(|i| i.to_string()).collect())
                    .collect();
                push_matrix(out, key, &rows, config);
            }
            Value::FloatMatrix(rows) => {
                let rows: Vec<Vec<String>> = rows
                    .iter()
                    .map(|r| r.iter().map(|f| format_real(*f)).collect())
                    .collect();
                push_matrix(out, key, &rows, config);
            }
            other => {
                let items = items(other);
                if items.is_empty() {
                    log::warn!("'{}' is an empty list; not written", key);
                    continue;
                }
                // A single bare value reads back as a scalar
                if items.len() == 1 && is_list(other) {
                    push_assignment(out, config, &format!("{}(:)", key), &items);
                } else {
                    push_assignment(out, config, key, &items);
                }
            }
        }
    }

    out.push_str("/\n");
}

fn is_list(value: &Value) -> bool {
    matches!(
        value,
        Value::IntList(_) | Value::FloatList(_) | Value::StrList(_)
    )
}

fn items(value: &Value) -> Vec<String> {
    match value {
        Value::Bool(b) => vec![format_logical(*b)],
        Value::Int(i) => vec![i.to_string()],
        Value::Float(f) => vec![format_real(*f)],
        Value::Str(s) => vec![quote(s)],
        Value::IntList(v) => v.iter().map(|i| i.to_string()).collect(),
        Value::FloatList(v) => v.iter().map(|f| format_real(*f)).collect(),
        Value::StrList(v) => v.iter().map(|s| quote(s)).collect(),
        Value::IntMatrix(_) | Value::FloatMatrix(_) => Vec::new(),
    }
}

fn push_matrix(out: &mut String, key: &str, rows: &[Vec<String>], config: &FormatConfig) {
    if rows.is_empty() || rows[0].is_empty() {
        log::warn!("'{}' is an empty matrix; not written", key);
        return;
    }

    match config.matrix_index {
        MatrixIndex::ColumnMajor => {
            for (j, row) in rows.iter().enumerate() {
                push_assignment(out, config, &format!("{}(:,{})", key, j + 1), row);
            }
        }
        MatrixIndex::RowMajor => {
            for i in 0..rows[0].len() {
                let component: Vec<String> = rows.iter().map(|r| r[i].clone()).collect();
                push_assignment(out, config, &format!("{}({},:)", key, i + 1), &component);
            }
        }
    }
}

/// `name = a, b, c`, wrapped at `column_width` with continuation lines
/// aligned under the first value.
fn push_assignment(out: &mut String, config: &FormatConfig, name: &str, items: &[String]) {
    let lead = format!("{}{} = ", " ".repeat(config.indent), name);
    let mut line = lead.clone();
    let mut has_value = false;

    for (n, item) in items.iter().enumerate() {
        let piece = if n + 1 < items.len() {
            format!("{},", item)
        } else {
            item.clone()
        };

        if has_value && line.len() + 1 + piece.len() > config.column_width {
            out.push_str(&line);
            out.push('\n');
            line = " ".repeat(lead.len());
            has_value = false;
        }
        if has_value {
            line.push(' ');
        }
        line.push_str(&piece);
        has_value = true;
    }

    out.push_str(&line);
    out.push('\n');
}

fn format_logical(b: bool) -> String {
    if b { ".true." } else { ".false." }.to_string()
}

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Formats a real the way it is written to CONTROL.
///
/// Shortest decimal that reads back to the same `f64`, always with a
/// fractional part (`0.0`, `0.1`, `2.734363999`). Magnitudes below 1e-4 or
/// from 1e16 up use an exponent with a sign and two digits (`1e-05`).
pub fn format_real(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let abs = v.abs();
    if abs == 0.0 || (1e-4..1e16).contains(&abs) {
        let mut s = v.to_string();
        if !s.contains('.') {
            s.push_str(".0");
        }
        return s;
    }

    let s = format!("{:e}", v);
    match s.split_once('e') {
        Some((mantissa, exponent)) => {
            let exp: i32 = exponent.parse().unwrap_or_default();
            format!("{}e{}{:02}", mantissa, if exp < 0 { '-' } else { '+' }, exp.abs())
        }
        None => s,
    }
}
