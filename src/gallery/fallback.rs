//! Flat list shown when no render surface can be created.

use std::fmt;

use crate::events::CatalogEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    pub position: usize,
    pub label: String,
    pub uri: String,
}

#[derive(Debug, Clone, Default)]
pub struct FlatList {
    rows: Vec<FlatRow>,
}

impl FlatList {
    pub fn new(entries: &[CatalogEntry]) -> Self {
        let rows = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let label = if entry.alt_text.trim().is_empty() {
                    format!("Memory {}", idx + 1)
                } else {
                    entry.alt_text.clone()
                };
                FlatRow {
                    position: idx + 1,
                    label,
                    uri: entry.uri.clone(),
                }
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for FlatList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows.is_empty() {
            return writeln!(f, "No memories yet");
        }
        writeln!(f, "# {} memories", self.rows.len())?;
        for row in &self.rows {
            writeln!(f, "  {:>4}: {}  <{}>", row.position, row.label, row.uri)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_alt_text_gets_a_numbered_label() {
        let list = FlatList::new(&[
            CatalogEntry::new("/p/a.jpg", "a.jpg"),
            CatalogEntry::new("/p/b.jpg", "  "),
        ]);
        assert_eq!(list.rows()[0].label, "a.jpg");
        assert_eq!(list.rows()[1].label, "Memory 2");
        assert_eq!(list.rows()[1].position, 2);
    }

    #[test]
    fn renders_one_line_per_entry() {
        let list = FlatList::new(&[
            CatalogEntry::new("/p/a.jpg", "a.jpg"),
            CatalogEntry::new("/p/b.jpg", "b.jpg"),
        ]);
        let text = list.to_string();
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("a.jpg  </p/a.jpg>"));
    }

    #[test]
    fn empty_list_shows_empty_state() {
        let list = FlatList::new(&[]);
        assert!(list.is_empty());
        assert_eq!(list.to_string(), "No memories yet\n");
    }
}
