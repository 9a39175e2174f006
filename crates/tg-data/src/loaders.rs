use std::io::Read;
use std::path::Path;

use tg_types::{DataError, Dataset, Document, TgResult};

/// Reads labeled feedback text from CSV files with a header row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    target: String,
    predictor: String,
}

impl CsvSource {
    pub fn new(target: impl Into<String>, predictor: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            predictor: predictor.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn predictor(&self) -> &str {
        &self.predictor
    }

    /// Load a CSV file. Rows with an empty target are dropped; every kept
    /// document remembers its zero-based row in the file.
    pub async fn load<P: AsRef<Path>>(&self, file_path: P) -> TgResult<Dataset> {
        let path = file_path.as_ref();
        tracing::info!("Loading dataset from: {}", path.display());

        if !path.exists() {
            return Err(DataError::SourceNotFound(path.display().to_string()).into());
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| DataError::LoadingFailed {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;

        let dataset = self.parse(bytes.as_slice())?;
        tracing::info!("Loaded {} documents from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Parse CSV content from any reader.
    pub fn parse<R: Read>(&self, reader: R) -> TgResult<Dataset> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read CSV headers: {}", e),
            })?
            .clone();
        tracing::debug!("CSV headers: {:?}", headers);

        let target_idx = Self::column_index(&headers, &self.target)?;
        let predictor_idx = Self::column_index(&headers, &self.predictor)?;

        let mut documents = Vec::new();
        let mut dropped = 0usize;

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| DataError::LoadingFailed {
                message: format!("Failed to read CSV record at line {}: {}", row + 2, e),
            })?;

            let (Some(label), Some(text)) = (record.get(target_idx), record.get(predictor_idx))
            else {
                return Err(DataError::LoadingFailed {
                    message: format!(
                        "Truncated CSV record at line {}: expected {} fields, found {}",
                        row + 2,
                        headers.len(),
                        record.len()
                    ),
                }
                .into());
            };

            let label = label.trim();
            if label.is_empty() {
                dropped += 1;
                continue;
            }
            documents.push(Document::new(row, text, label));
        }

        if dropped > 0 {
            tracing::warn!("Dropped {} rows with an empty {} value", dropped, self.target);
        }

        Ok(Dataset::new(documents))
    }

    fn column_index(headers: &csv::StringRecord, column: &str) -> TgResult<usize> {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| {
                DataError::MissingColumn {
                    column: column.to_string(),
                }
                .into()
            })
    }
}

impl Default for CsvSource {
    fn default() -> Self {
        Self::new("label", "feedback")
    }
}
