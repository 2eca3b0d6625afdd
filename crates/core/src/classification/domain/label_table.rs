use std::fs;
use std::io;
use std::path::Path;

/// Immutable class-index → label mapping.
///
/// Loaded once from a plain-text file, one label per line, where the line
/// index is the class index.
#[derive(Clone, Debug)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_lines(text.lines()))
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Label for `index`, or `None` when the index is outside the table.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_lines_indexes_by_position() {
        let table = LabelTable::from_lines(["Alice", "Bob"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0), Some("Alice"));
        assert_eq!(table.get(1), Some("Bob"));
    }

    #[test]
    fn test_get_out_of_range_is_none() {
        let table = LabelTable::from_lines(["Alice"]);
        assert_eq!(table.get(1), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Alice").unwrap();
        writeln!(file, "Bob").unwrap();

        let table = LabelTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1), Some("Bob"));
    }

    #[test]
    fn test_load_handles_crlf() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Alice\r\nBob\r\n").unwrap();

        let table = LabelTable::load(file.path()).unwrap();
        assert_eq!(table.get(0), Some("Alice"));
        assert_eq!(table.get(1), Some("Bob"));
    }

    #[test]
    fn test_empty_file_yields_empty_table() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let table = LabelTable::load(file.path()).unwrap();
        assert!(table.is_empty());
    }
}
