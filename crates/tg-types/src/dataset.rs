use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Class label as it appears in the source data.
pub type Label = String;

/// One labeled piece of feedback text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Zero-based row index in the source file.
    pub row: usize,
    pub text: String,
    pub label: Label,
}

impl Document {
    pub fn new(row: usize, text: impl Into<String>, label: impl Into<Label>) -> Self {
        Self {
            row,
            text: text.into(),
            label: label.into(),
        }
    }
}

/// An ordered collection of documents (training or test partition).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub documents: Vec<Document>,
}

impl Dataset {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn texts(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.text.clone()).collect()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.documents.iter().map(|d| d.label.clone()).collect()
    }

    pub fn rows(&self) -> Vec<usize> {
        self.documents.iter().map(|d| d.row).collect()
    }

    /// Document count per class, sorted by label.
    pub fn class_counts(&self) -> BTreeMap<Label, usize> {
        let mut counts = BTreeMap::new();
        for doc in &self.documents {
            *counts.entry(doc.label.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Documents at the given positions, in the given order.
    pub fn select(&self, positions: &[usize]) -> Dataset {
        Dataset {
            documents: positions
                .iter()
                .filter_map(|&i| self.documents.get(i).cloned())
                .collect(),
        }
    }
}
