use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::merge::{AttrValue, Attributes};

/// Label under which the hit list's media type is stored.
pub const MEDIA_TYPE_KEY: &str = "Medientyp";
/// Reserved key holding the copy rows.
pub const EXEMPLARS_KEY: &str = "Exemplare";

/// One physical copy: column header to cell text, in column order.
///
/// Empty cells are left out; a row never has zero cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExemplarRow {
    cells: Vec<(String, String)>,
}

impl ExemplarRow {
    /// Pairs `columns` with `cells` by position. Returns `None` when every
    /// cell is missing or blank.
    pub fn from_cells<I>(columns: &[String], cells: I) -> Option<Self>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let cells: Vec<(String, String)> = columns
            .iter()
            .zip(cells)
            .filter_map(|(column, cell)| {
                let cell = cell?.trim().to_string();
                (!cell.is_empty()).then(|| (column.clone(), cell))
            })
            .collect();
        (!cells.is_empty()).then_some(Self { cells })
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(header, _)| header == column)
            .map(|(_, cell)| cell.as_str())
    }

    pub fn cells(&self) -> &[(String, String)] {
        &self.cells
    }
}

impl Serialize for ExemplarRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, cell) in &self.cells {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

/// The finished metadata of one catalog item.
///
/// Serializes as a flat map: attributes in page order, then the copy rows
/// under [`EXEMPLARS_KEY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    attributes: Vec<(String, AttrValue)>,
    exemplars: Vec<ExemplarRow>,
}

impl ItemRecord {
    pub fn new(attributes: Attributes, exemplars: Vec<ExemplarRow>) -> Self {
        Self {
            attributes: attributes.finish(),
            exemplars,
        }
    }

    pub fn get(&self, label: &str) -> Option<&AttrValue> {
        self.attributes
            .iter()
            .find(|(seen, _)| seen == label)
            .map(|(_, value)| value)
    }

    pub fn media_type(&self) -> Option<&str> {
        match self.get(MEDIA_TYPE_KEY)? {
            AttrValue::Scalar(value) => Some(value),
            AttrValue::List(values) => values.first().map(String::as_str),
        }
    }

    pub fn attributes(&self) -> &[(String, AttrValue)] {
        &self.attributes
    }

    pub fn exemplars(&self) -> &[ExemplarRow] {
        &self.exemplars
    }
}

impl Serialize for ItemRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len() + 1))?;
        for (label, value) in &self.attributes {
            map.serialize_entry(label, value)?;
        }
        map.serialize_entry(EXEMPLARS_KEY, &self.exemplars)?;
        map.end()
    }
}
