//! Read-only id → display name table.
//!
//! Loaded once at startup from a CSV file of `id,name` rows. Ids are matched
//! on their digits only, so `123-456` in the file matches a query of `123456`.
//! This table is independent of the relay's records.

use crate::error::ServerError;
use relay_types::digits_only;
use std::collections::HashMap;
use std::path::Path;

/// Display name used when a row has no name column.
const DEFAULT_NAME: &str = "User";

/// Maps normalized ids to display names.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    names: HashMap<String, String>,
}

impl LookupTable {
    /// A table that never matches.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the table from `path`.
    ///
    /// A missing file yields an empty table; any other read error is returned.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let table = Self::parse(&content);
                tracing::info!("Loaded {} lookup ids from {}", table.len(), path.display());
                Ok(table)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Lookup table {} not found, lookups will miss", path.display());
                Ok(Self::empty())
            }
            Err(source) => Err(ServerError::Lookup {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Build a table from CSV text.
    ///
    /// The first row for an id wins, even if its name is empty. Rows with an
    /// empty id are skipped.
    pub fn parse(content: &str) -> Self {
        let mut names = HashMap::new();

        for line in content.lines() {
            let fields = split_csv_line(line);
            let Some(raw_id) = fields.first() else {
                continue;
            };

            let id = digits_only(raw_id);
            if id.is_empty() {
                continue;
            }

            let name = match fields.get(1) {
                Some(name) => name.trim().to_string(),
                None => DEFAULT_NAME.to_string(),
            };

            // An empty name still claims the id, so it answers as a miss.
            names.entry(id).or_insert(name);
        }

        Self { names }
    }

    /// Find the display name for `raw_code`.
    pub fn lookup(&self, raw_code: &str) -> Option<&str> {
        let id = digits_only(raw_code);
        if id.is_empty() {
            return None;
        }
        self.names
            .get(&id)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Number of ids in the table.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the table has no ids.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Split one CSV line, honoring double-quoted fields and `""` escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', _) => in_quotes = !in_quotes,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);

    fields
}
