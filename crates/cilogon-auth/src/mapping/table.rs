//! Parsing of the `external_name local_name` mapping file format.

use std::collections::HashMap;

/// Lower-cased external identity to lower-cased local account name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    entries: HashMap<String, String>,
    skipped_lines: usize,
}

impl MappingTable {
    /// Parses mapping file contents.
    ///
    /// Each line must hold exactly two whitespace-separated tokens. Blank
    /// lines are ignored; any other line is skipped with a warning. When a
    /// name appears more than once the last line wins.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let mut entries = HashMap::new();
        let mut skipped_lines = 0;

        for (index, line) in contents.lines().enumerate() {
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next(), tokens.next()) {
                (None, _, _) => {}
                (Some(external), Some(local), None) => {
                    entries.insert(external.to_lowercase(), local.to_lowercase());
                }
                _ => {
                    skipped_lines += 1;
                    tracing::warn!(
                        line = index + 1,
                        "Skipping malformed username mapping line: expected two names"
                    );
                }
            }
        }

        Self {
            entries,
            skipped_lines,
        }
    }

    /// Local name for `external`, which must already be lower-cased.
    #[must_use]
    pub fn get(&self, external: &str) -> Option<&str> {
        self.entries.get(external).map(String::as_str)
    }

    /// Number of mappings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no mappings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lines skipped as malformed during parsing.
    #[must_use]
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pairs() {
        let table = MappingTable::parse("alice local1\nBob@Example.EDU  LocalBob\n");
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("alice"), Some("local1"));
        assert_eq!(table.get("bob@example.edu"), Some("localbob"));
        assert_eq!(table.get("Bob@Example.EDU"), None);
    }

    #[test]
    fn test_last_duplicate_wins() {
        let table = MappingTable::parse("alice first\nALICE second\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("alice"), Some("second"));
    }

    #[test]
    fn test_blank_lines_ignored() {
        let table = MappingTable::parse("\n   \nalice local1\n\t\n");
        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped_lines(), 0);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let table = MappingTable::parse("lonely\nalice local1\na b c\ncarol\tlocal3\r\n");
        assert_eq!(table.len(), 2);
        assert_eq!(table.skipped_lines(), 2);
        assert_eq!(table.get("carol"), Some("local3"));
        assert_eq!(table.get("a"), None);
    }

    #[test]
    fn test_empty_contents() {
        let table = MappingTable::parse("");
        assert!(table.is_empty());
    }
}
