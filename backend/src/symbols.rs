// =============================================================================
// Symbol Table — display name -> exchange token lookup
// =============================================================================
//
// Loaded once at startup from a CSV file with at least the columns
// `name,token,symbol`. Rows keep file order; a name that appears twice
// resolves to its first row.
// =============================================================================

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DashboardError;

/// One tradable instrument as listed in the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolReference {
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "token")]
    pub exchange_token: String,
    #[serde(rename = "symbol")]
    pub exchange_symbol: String,
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    rows: Vec<SymbolReference>,
}

impl SymbolTable {
    /// Read the table at `path`. A missing, unreadable or empty file is a
    /// configuration error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DashboardError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            DashboardError::Configuration(format!("symbol table {} not readable: {e}", path.display()))
        })?;

        let table = Self::from_reader(file)?;
        info!(path = %path.display(), rows = table.rows.len(), "symbol table loaded");
        Ok(table)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, DashboardError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let mut rows = Vec::new();
        for (line, record) in csv_reader.deserialize::<SymbolReference>().enumerate() {
            let row = record.map_err(|e| {
                DashboardError::Configuration(format!("symbol table row {} is invalid: {e}", line + 1))
            })?;
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(DashboardError::Configuration("symbol table has no rows".to_string()));
        }

        Ok(Self { rows })
    }

    /// Selectable names, unique, in first-appearance order.
    pub fn names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .map(|row| row.display_name.as_str())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// First row whose display name equals `name`.
    pub fn lookup(&self, name: &str) -> Result<&SymbolReference, DashboardError> {
        self.rows
            .iter()
            .find(|row| row.display_name == name)
            .ok_or_else(|| DashboardError::UnknownSymbol(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
