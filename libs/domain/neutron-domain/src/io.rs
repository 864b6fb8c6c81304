//! Cross-section file reading: plain text, one `<energy> <sigma>` pair per line, blank lines
//! and trailing whitespace tolerated (mirrors the reference's `read_cs_file`).

use std::io::BufRead;

use neutron_core::cross_section::CrossSectionTable;
use tracing::{debug, instrument};

use crate::errors::IoError;

/// Parses a cross-section table from an already-open reader.
#[instrument(skip(reader))]
pub fn read_cross_section_table(
    path_for_errors: &str,
    reader: impl std::io::Read,
) -> Result<CrossSectionTable, crate::errors::ConfigError> {
    let mut keys = Vec::new();
    let mut values = Vec::new();

    for (lineno, line) in std::io::BufReader::new(reader).lines().enumerate() {
        let line = line.map_err(|source| IoError::Read {
            path: path_for_errors.to_string(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut fields = trimmed.split_whitespace();
        let (Some(k), Some(v)) = (fields.next(), fields.next()) else {
            return Err(IoError::MalformedLine {
                path: path_for_errors.to_string(),
                line: lineno + 1,
                content: line.clone(),
            }
            .into());
        };
        let k: f64 = k.parse().map_err(|_| IoError::MalformedLine {
            path: path_for_errors.to_string(),
            line: lineno + 1,
            content: line.clone(),
        })?;
        let v: f64 = v.parse().map_err(|_| IoError::MalformedLine {
            path: path_for_errors.to_string(),
            line: lineno + 1,
            content: line.clone(),
        })?;
        keys.push(k);
        values.push(v);
    }

    debug!(nentries = keys.len(), "parsed cross-section table");

    CrossSectionTable::new(keys, values)
        .map_err(|e| IoError::MalformedLine {
            path: path_for_errors.to_string(),
            line: 0,
            content: e.to_string(),
        })
        .map_err(Into::into)
}

/// Reads a cross-section table from a file path.
#[instrument(skip_all)]
pub fn read_cross_section_file(
    path: impl AsRef<std::path::Path>,
) -> Result<CrossSectionTable, crate::errors::ConfigError> {
    let path_str = path.as_ref().display().to_string();
    debug!(path = %path_str, "reading cross-section file");
    let file = std::fs::File::open(path.as_ref()).map_err(|source| IoError::Read {
        path: path_str.clone(),
        source,
    })?;
    read_cross_section_table(&path_str, file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_whitespace_separated_pairs_tolerating_blank_lines() {
        let text = "0.0   1.0\n\n  1.0  2.0  \n2.0 4.0\n";
        let table = read_cross_section_table("mem", Cursor::new(text)).unwrap();
        assert_eq!(table.nentries(), 3);
        let (v, _) = table.lookup(1.0, neutron_core::cross_section::NO_HINT);
        assert_eq!(v, 2.0);
    }

    #[test]
    fn rejects_a_line_missing_its_second_field() {
        let text = "0.0 1.0\n1.0\n";
        let result = read_cross_section_table("mem", Cursor::new(text));
        assert!(result.is_err());
    }
}
