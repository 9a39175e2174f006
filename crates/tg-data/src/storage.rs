use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tg_types::{ConfigError, DataError, Dataset, Label, TgResult};

/// Objects an experiment can write to its results folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SavedObject {
    Pipeline,
    TuningResults,
    Predictions,
    AccuracyPerClass,
    TrainingIndex,
    TestIndex,
}

impl SavedObject {
    pub const ALL: [SavedObject; 6] = [
        SavedObject::Pipeline,
        SavedObject::TuningResults,
        SavedObject::Predictions,
        SavedObject::AccuracyPerClass,
        SavedObject::TrainingIndex,
        SavedObject::TestIndex,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SavedObject::Pipeline => "pipeline",
            SavedObject::TuningResults => "tuning results",
            SavedObject::Predictions => "predictions",
            SavedObject::AccuracyPerClass => "accuracy per class",
            SavedObject::TrainingIndex => "index - training data",
            SavedObject::TestIndex => "index - test data",
        }
    }

    /// File name inside the results folder. The pipeline file is named after
    /// `save_as`.
    pub fn file_name(&self, save_as: &str) -> String {
        match self {
            SavedObject::Pipeline => format!("{save_as}.json"),
            SavedObject::TuningResults => "tuning_results.csv".to_string(),
            SavedObject::Predictions => "predictions.csv".to_string(),
            SavedObject::AccuracyPerClass => "accuracy_per_class.csv".to_string(),
            SavedObject::TrainingIndex => "index_training_data.csv".to_string(),
            SavedObject::TestIndex => "index_test_data.csv".to_string(),
        }
    }
}

impl fmt::Display for SavedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SavedObject {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', " ");
        SavedObject::ALL
            .into_iter()
            .find(|object| object.name() == wanted)
            .ok_or_else(|| ConfigError::Invalid {
                message: format!(
                    "unknown object to save: {} (expected one of: {})",
                    s,
                    SavedObject::ALL.map(|o| o.name()).join(", ")
                ),
            })
    }
}

impl TryFrom<String> for SavedObject {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SavedObject> for String {
    fn from(value: SavedObject) -> Self {
        value.name().to_string()
    }
}

/// Writes experiment artifacts into a results folder.
#[derive(Debug)]
pub struct ArtifactStore {
    pub results_root: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(results_root: P) -> TgResult<Self> {
        let results_root = results_root.as_ref().to_path_buf();
        std::fs::create_dir_all(&results_root)?;

        Ok(Self { results_root })
    }

    pub fn path_for(&self, object: SavedObject, save_as: &str) -> PathBuf {
        self.results_root.join(object.file_name(save_as))
    }

    /// Pretty-printed JSON document.
    pub async fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> TgResult<PathBuf> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(file_name, bytes).await
    }

    /// CSV with a header row derived from the record fields.
    pub async fn write_records<R: Serialize>(&self, file_name: &str, records: &[R]) -> TgResult<PathBuf> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in records {
            writer.serialize(record).map_err(|e| Self::csv_failure(file_name, e))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Self::csv_failure(file_name, e.error()))?;
        self.write_bytes(file_name, bytes).await
    }

    /// CSV with an explicit header, for tables whose columns are only known
    /// at runtime.
    pub async fn write_table(
        &self,
        file_name: &str,
        header: &[String],
        rows: &[Vec<String>],
    ) -> TgResult<PathBuf> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(header)
            .map_err(|e| Self::csv_failure(file_name, e))?;
        for row in rows {
            if row.len() != header.len() {
                return Err(DataError::WriteFailed {
                    message: format!(
                        "{}: row has {} fields, header has {}",
                        file_name,
                        row.len(),
                        header.len()
                    ),
                }
                .into());
            }
            writer
                .write_record(row)
                .map_err(|e| Self::csv_failure(file_name, e))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Self::csv_failure(file_name, e.error()))?;
        self.write_bytes(file_name, bytes).await
    }

    /// Test documents next to their predicted labels.
    pub async fn write_predictions(
        &self,
        file_name: &str,
        test: &Dataset,
        predicted: &[Label],
    ) -> TgResult<PathBuf> {
        if test.len() != predicted.len() {
            return Err(DataError::WriteFailed {
                message: format!(
                    "{} test documents but {} predictions",
                    test.len(),
                    predicted.len()
                ),
            }
            .into());
        }

        let header = ["row", "text", "actual", "predicted"].map(String::from);
        let rows: Vec<Vec<String>> = test
            .documents
            .iter()
            .zip(predicted)
            .map(|(doc, pred)| vec![doc.row.to_string(), doc.text.clone(), doc.label.clone(), pred.clone()])
            .collect();
        self.write_table(file_name, &header, &rows).await
    }

    /// Source row indices of a partition, one per line.
    pub async fn write_index(&self, file_name: &str, data: &Dataset) -> TgResult<PathBuf> {
        let rows: Vec<Vec<String>> = data.rows().iter().map(|r| vec![r.to_string()]).collect();
        self.write_table(file_name, &["row".to_string()], &rows).await
    }

    async fn write_bytes(&self, file_name: &str, bytes: Vec<u8>) -> TgResult<PathBuf> {
        let path = self.results_root.join(file_name);
        tokio::fs::write(&path, bytes).await.map_err(|e| DataError::WriteFailed {
            message: format!("{}: {}", path.display(), e),
        })?;
        tracing::info!("Saved {}", path.display());
        Ok(path)
    }

    fn csv_failure(file_name: &str, error: impl fmt::Display) -> DataError {
        DataError::WriteFailed {
            message: format!("{}: {}", file_name, error),
        }
    }
}
