//! Row/column projection of schema-less items into a fixed-width grid.
//!
//! Column 0 is always the selector column. It is followed by the partition
//! key, the sort key and then every other attribute in first-seen order,
//! up to [`MAX_COLUMNS`] columns in total.

use std::collections::HashMap;
use std::fmt;

use aws_sdk_dynamodb::types::AttributeValue;
use serde::{Deserialize, Serialize};

use crate::record::{Attr, Record};

/// Grid width cap, selector column included.
pub const MAX_COLUMNS: usize = 10;

/// Primary key layout of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySchema {
    pub partition: Option<String>,
    pub sort: Option<String>,
}

impl KeySchema {
    pub fn new(partition: impl Into<String>, sort: Option<&str>) -> Self {
        Self {
            partition: Some(partition.into()),
            sort: sort.map(str::to_string),
        }
    }

    /// Build from `(attribute_name, key_type)` pairs as found in a table
    /// description (`HASH` / `RANGE`).
    pub fn from_elements<'a, I>(elements: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut schema = KeySchema::default();
        for (name, key_type) in elements {
            match key_type {
                "HASH" => schema.partition = Some(name.to_string()),
                "RANGE" => schema.sort = Some(name.to_string()),
                _ => {}
            }
        }
        schema
    }
}

/// Key values of one row, taken from its record.
///
/// Serialized by role (`partition`, `sort`) rather than by attribute name;
/// the names are in [`Grid::schema`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowKey {
    pub partition: Option<Attr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Attr>,
}

impl RowKey {
    fn of(schema: &KeySchema, record: &Record) -> Self {
        let lookup = |name: &Option<String>| {
            name.as_deref()
                .and_then(|name| record.get(name))
                .cloned()
        };
        Self {
            partition: lookup(&schema.partition),
            sort: lookup(&schema.sort),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyCell {
    pub key: RowKey,
    pub selected: bool,
}

/// One grid cell. Data cells keep the primitive type that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Cell {
    Key(KeyCell),
    String(String),
    Number(String),
    Bool(bool),
    Null,
    List,
    Map,
    Unknown,
}

impl Cell {
    fn from_attr(value: Option<&Attr>) -> Self {
        match value {
            Some(Attr::String(s)) => Cell::String(s.clone()),
            Some(Attr::Number(n)) => Cell::Number(n.clone()),
            Some(Attr::Bool(b)) => Cell::Bool(*b),
            Some(Attr::Null) => Cell::Null,
            Some(Attr::List(_)) => Cell::List,
            Some(Attr::Map(_)) => Cell::Map,
            Some(Attr::Binary(_)) | None => Cell::Unknown,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Key(cell) => match &cell.key.partition {
                Some(value) => f.write_str(&value.display_text()),
                None => Ok(()),
            },
            Cell::String(s) => f.write_str(s),
            Cell::Number(n) => f.write_str(n),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Null => f.write_str("null"),
            Cell::List => f.write_str("[...]"),
            Cell::Map => f.write_str("{...}"),
            Cell::Unknown => f.write_str("?"),
        }
    }
}

/// Projected grid plus per-row selection state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    columns: Vec<Option<String>>,
    rows: Vec<Vec<Cell>>,
    #[serde(skip)]
    schema: KeySchema,
}

/// Project `records` into a grid under the given key schema.
pub fn project(schema: &KeySchema, records: &[Record]) -> Grid {
    let mut columns: Vec<Option<String>> = Vec::new();
    if schema.partition.is_some() || schema.sort.is_some() || !records.is_empty() {
        columns.push(None);
    }
    for key in [&schema.partition, &schema.sort].into_iter().flatten() {
        if !columns.iter().any(|c| c.as_ref() == Some(key)) {
            columns.push(Some(key.clone()));
        }
    }

    'discover: for record in records {
        for name in record.names() {
            if columns.len() >= MAX_COLUMNS {
                break 'discover;
            }
            if !columns.iter().any(|c| c.as_deref() == Some(name)) {
                columns.push(Some(name.to_string()));
            }
        }
    }

    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| match column {
                    None => Cell::Key(KeyCell {
                        key: RowKey::of(schema, record),
                        selected: false,
                    }),
                    Some(name) => Cell::from_attr(record.get(name)),
                })
                .collect()
        })
        .collect();

    Grid {
        columns,
        rows,
        schema: schema.clone(),
    }
}

impl Grid {
    pub fn columns(&self) -> &[Option<String>] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    fn key_cell_mut(&mut self, row: usize) -> Option<&mut KeyCell> {
        match self.rows.get_mut(row)?.first_mut()? {
            Cell::Key(cell) => Some(cell),
            _ => None,
        }
    }

    /// Flip the selection flag of a row, returning its new value.
    pub fn toggle(&mut self, row: usize) -> Option<bool> {
        let cell = self.key_cell_mut(row)?;
        cell.selected = !cell.selected;
        Some(cell.selected)
    }

    pub fn select_all(&mut self, selected: bool) {
        for row in 0..self.rows.len() {
            if let Some(cell) = self.key_cell_mut(row) {
                cell.selected = selected;
            }
        }
    }

    pub fn is_selected(&self, row: usize) -> bool {
        matches!(
            self.rows.get(row).and_then(|cells| cells.first()),
            Some(Cell::Key(KeyCell { selected: true, .. }))
        )
    }

    /// Primary keys of the selected rows, shaped for `DeleteItem`.
    /// Rows whose partition value is absent are skipped.
    pub fn selected_keys(&self) -> Vec<HashMap<String, AttributeValue>> {
        let Some(partition_name) = self.schema.partition.as_deref() else {
            return Vec::new();
        };

        self.rows
            .iter()
            .filter_map(|cells| match cells.first() {
                Some(Cell::Key(cell)) if cell.selected => Some(&cell.key),
                _ => None,
            })
            .filter_map(|key| {
                let partition = key.partition.as_ref()?;
                let mut item = HashMap::new();
                item.insert(partition_name.to_string(), partition.to_attribute_value());
                if let (Some(sort_name), Some(sort)) = (self.schema.sort.as_deref(), &key.sort) {
                    item.insert(sort_name.to_string(), sort.to_attribute_value());
                }
                Some(item)
            })
            .collect()
    }
}
