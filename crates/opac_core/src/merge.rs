//! Folding of repeated label/value pairs from a detail page.

use serde::Serialize;

/// A finished attribute value: one value, or several in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Scalar(String),
    List(Vec<String>),
}

impl AttrValue {
    pub fn values(&self) -> &[String] {
        match self {
            AttrValue::Scalar(value) => std::slice::from_ref(value),
            AttrValue::List(values) => values,
        }
    }
}

/// Labels in first-seen order, each with its distinct non-empty values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<(String, Vec<String>)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure form of [`Attributes::insert`].
    pub fn merge(mut self, label: &str, value: &str) -> Self {
        self.insert(label, value);
        self
    }

    /// Adds `value` under `label` after trimming both (and a trailing colon
    /// from the label). Returns `false` when nothing changed: an empty value
    /// or label, or a value the label already holds.
    pub fn insert(&mut self, label: &str, value: &str) -> bool {
        let label = sanitize_label(label);
        let value = value.trim();
        if label.is_empty() || value.is_empty() {
            return false;
        }

        match self.entries.iter_mut().find(|(seen, _)| seen == label) {
            Some((_, values)) => {
                if values.iter().any(|existing| existing == value) {
                    return false;
                }
                values.push(value.to_string());
            }
            None => self
                .entries
                .push((label.to_string(), vec![value.to_string()])),
        }
        true
    }

    pub fn get(&self, label: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(seen, _)| seen == label)
            .map(|(_, values)| values.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unwraps single values to scalars; labels keep first-seen order.
    pub fn finish(self) -> Vec<(String, AttrValue)> {
        self.entries
            .into_iter()
            .map(|(label, mut values)| {
                let value = if values.len() == 1 {
                    AttrValue::Scalar(values.remove(0))
                } else {
                    AttrValue::List(values)
                };
                (label, value)
            })
            .collect()
    }
}

fn sanitize_label(label: &str) -> &str {
    label.trim().trim_end_matches(':').trim_end()
}
