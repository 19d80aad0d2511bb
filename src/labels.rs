// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Gesture label table.
//!
//! Labels come from a UTF-8 CSV file with one record per class. The label is
//! the first field of each record and the record's position is its class
//! index. A leading byte-order mark is ignored.

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::{RecognitionError, Result};
use crate::results::GestureClass;

const BOM: char = '\u{feff}';

/// Ordered, immutable mapping from class index to gesture name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    /// Load a label file from disk.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if the file is missing,
    /// not UTF-8, empty, or contains an empty record before the last label.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(RecognitionError::ConfigError(format!(
                "Label file not found: {}",
                path.display()
            )));
        }
        let text = fs::read_to_string(path).map_err(|e| {
            RecognitionError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&text).map_err(|e| match e {
            RecognitionError::ConfigError(msg) => {
                RecognitionError::ConfigError(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Read a label file from any reader.
    ///
    /// # Errors
    ///
    /// Same conditions as [`LabelTable::load`].
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|e| RecognitionError::ConfigError(format!("Failed to read labels: {e}")))?;
        Self::parse(&text)
    }

    /// Parse label file contents.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if there are no labels, a
    /// quoted field is unterminated, or an empty record appears before the
    /// last label.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.strip_prefix(BOM).unwrap_or(text);

        let mut labels = Vec::new();
        let mut blank_rows = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.is_empty() {
                blank_rows.push(line_no + 1);
                continue;
            }
            if let Some(&row) = blank_rows.first() {
                return Err(RecognitionError::ConfigError(format!(
                    "empty record on line {row} would shift class indices"
                )));
            }
            labels.push(first_field(line).map_err(|msg| {
                RecognitionError::ConfigError(format!("line {}: {msg}", line_no + 1))
            })?);
        }

        Self::from_labels(labels)
    }

    /// Build a table from labels already in class order.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognitionError::ConfigError`] if `labels` is empty.
    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(RecognitionError::ConfigError(
                "label table is empty".to_string(),
            ));
        }
        Ok(Self { labels })
    }

    /// Label for a class.
    ///
    /// # Errors
    ///
    /// Returns [`RecognitionError::LookupError`] for an abstention or an index
    /// outside the table.
    pub fn label_of(&self, class: GestureClass) -> Result<&str> {
        class
            .index()
            .and_then(|i| self.labels.get(i))
            .map(String::as_str)
            .ok_or_else(|| {
                RecognitionError::LookupError(format!(
                    "no label for class {class} (table has {} labels)",
                    self.labels.len()
                ))
            })
    }

    /// Class index of a label, if present.
    #[must_use]
    pub fn position(&self, label: &str) -> Option<GestureClass> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(GestureClass::from_index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

/// First CSV field of a record. Handles double-quoted fields with `""` escapes;
/// text between the closing quote and the next comma is kept, as `csv` readers
/// do. A quoted field must close on the line it opens.
fn first_field(line: &str) -> std::result::Result<String, &'static str> {
    let Some(rest) = line.strip_prefix('"') else {
        return Ok(line.split(',').next().unwrap_or_default().to_string());
    };

    let mut field = String::new();
    let mut chars = rest.chars().peekable();
    loop {
        match chars.next() {
            Some('"') if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            Some('"') => break,
            Some(c) => field.push(c),
            None => return Err("unterminated quoted field (fields cannot span lines)"),
        }
    }
    field.extend(chars.take_while(|&c| c != ','));
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_in_order() {
        let table = LabelTable::parse("Hello\nThanks\nYes\nNo\n").unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.label_of(GestureClass::from_index(0)).unwrap(), "Hello");
        assert_eq!(table.label_of(GestureClass::from_index(3)).unwrap(), "No");
        assert_eq!(table.iter().collect::<Vec<_>>(), ["Hello", "Thanks", "Yes", "No"]);
    }

    #[test]
    fn test_bom_stripped() {
        let table = LabelTable::parse("\u{feff}Hello\nThanks").unwrap();
        assert_eq!(table.label_of(GestureClass::from_index(0)).unwrap(), "Hello");
    }

    #[test]
    fn test_crlf_and_extra_columns() {
        let table = LabelTable::parse("Open,0\r\nClose,1\r\n").unwrap();
        assert_eq!(table.iter().collect::<Vec<_>>(), ["Open", "Close"]);
    }

    #[test]
    fn test_quoted_fields() {
        let table = LabelTable::parse("\"I love you\",x\n\"say \"\"hi\"\"\"\n").unwrap();
        assert_eq!(table.label_of(GestureClass::from_index(0)).unwrap(), "I love you");
        assert_eq!(table.label_of(GestureClass::from_index(1)).unwrap(), "say \"hi\"");

        assert!(LabelTable::parse("\"open").is_err());
    }

    #[test]
    fn test_text_after_closing_quote_kept() {
        let table = LabelTable::parse("\"abc\"def,1\n\"I \"x\n").unwrap();
        assert_eq!(table.label_of(GestureClass::from_index(0)).unwrap(), "abcdef");
        assert_eq!(table.label_of(GestureClass::from_index(1)).unwrap(), "I x");
    }

    #[test]
    fn test_quoted_field_cannot_span_lines() {
        let err = LabelTable::parse("Hello\n\"Thank\nyou\"\n").unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_trailing_blank_lines_ignored() {
        let table = LabelTable::parse("A\nB\n\n\n").unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_interior_blank_line_rejected() {
        let err = LabelTable::parse("A\n\nB\n").unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_empty_rejected() {
        assert!(LabelTable::parse("").is_err());
        assert!(LabelTable::parse("\u{feff}").is_err());
        assert!(LabelTable::parse("\n\n").is_err());
    }

    #[test]
    fn test_lookup_errors() {
        let table = LabelTable::parse("A\nB").unwrap();
        assert!(matches!(
            table.label_of(GestureClass::ABSTAIN),
            Err(RecognitionError::LookupError(_))
        ));
        assert!(matches!(
            table.label_of(GestureClass::from_index(2)),
            Err(RecognitionError::LookupError(_))
        ));
    }

    #[test]
    fn test_position() {
        let table = LabelTable::from_labels(["Hello", "Thanks"]).unwrap();
        assert_eq!(table.position("Thanks"), Some(GestureClass::from_index(1)));
        assert_eq!(table.position("Bye"), None);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.csv");
        fs::write(&path, "\u{feff}Hello\nThanks\n").unwrap();
        let table = LabelTable::load(&path).unwrap();
        assert_eq!(table.len(), 2);

        let err = LabelTable::load(dir.path().join("missing.csv")).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_from_reader() {
        let table = LabelTable::from_reader("X\nY\n".as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
    }
}
