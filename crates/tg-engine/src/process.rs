//! Search backend that delegates model fitting to an external worker process.
//!
//! Each request spawns the worker, writes one JSON line to its stdin and
//! reads one JSON reply line from its stdout. The worker owns vectorization,
//! fold generation and estimator training.
//!
//! # Wire protocol
//!
//! Requests are objects tagged by a `request` field. `candidate` is a
//! [`CandidateConfiguration`] and `model` is whatever the worker returned from
//! an earlier `refit`. When a tokenizer is configured every request also
//! carries a `tokenizer` string, which the worker interprets.
//!
//! ```text
//! {"request":"cross_validate","candidate":{...},"texts":["great staff","rude"],"labels":["pos","neg"],"folds":5,"tokenizer":"wordnet"}
//! {"request":"refit","candidate":{...},"texts":["great staff","rude"],"labels":["pos","neg"]}
//! {"request":"predict","model":{...},"texts":["long wait"]}
//! ```
//!
//! Replies are tagged by a `reply` field. Only the last non-empty stdout line
//! is parsed, so a worker may print progress before it. `folds` holds one
//! entry per fold with the held-out labels and their predictions.
//!
//! ```text
//! {"reply":"folds","folds":[{"y_true":["pos","neg"],"y_pred":["pos","pos"]}]}
//! {"reply":"model","model":{...}}
//! {"reply":"predictions","labels":["neg"]}
//! {"reply":"error","message":"model is not fitted"}
//! ```
//!
//! A non-zero exit status fails the request with the worker's stderr.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};

use tg_optimizer::{CandidateConfiguration, FittedModel, FoldPredictions, SearchBackend};
use tg_types::{Dataset, Label, SearchError, TgResult};

use crate::config::WorkerCommand;

/// Work a worker can be asked to do.
#[derive(Debug, Serialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum WorkerTask<'a> {
    CrossValidate {
        candidate: &'a CandidateConfiguration,
        texts: Vec<String>,
        labels: Vec<Label>,
        folds: usize,
    },
    Refit {
        candidate: &'a CandidateConfiguration,
        texts: Vec<String>,
        labels: Vec<Label>,
    },
    Predict {
        model: &'a FittedModel,
        texts: &'a [String],
    },
}

/// One line written to the worker: the task plus run-wide options.
#[derive(Debug, Serialize)]
pub struct WorkerRequest<'a> {
    #[serde(flatten)]
    pub task: WorkerTask<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenizer: Option<&'a str>,
}

/// Replies a worker may send back.
#[derive(Debug, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum WorkerReply {
    Folds { folds: Vec<FoldPredictions> },
    Model { model: FittedModel },
    Predictions { labels: Vec<Label> },
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct ProcessBackend {
    command: WorkerCommand,
    name: String,
    tokenizer: Option<String>,
}

impl ProcessBackend {
    pub fn new(command: WorkerCommand) -> Self {
        let name = std::iter::once(command.program.as_str())
            .chain(command.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            command,
            name,
            tokenizer: None,
        }
    }

    /// Tokenizer name forwarded to the worker with every request.
    pub fn with_tokenizer(mut self, tokenizer: Option<String>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    fn request<'a>(&'a self, task: WorkerTask<'a>) -> WorkerRequest<'a> {
        WorkerRequest {
            task,
            tokenizer: self.tokenizer.as_deref(),
        }
    }

    fn failed(&self, message: String) -> SearchError {
        SearchError::BackendFailed {
            backend: self.name.clone(),
            message,
        }
    }

    /// Run the worker once for a single request.
    pub fn call(&self, request: &WorkerRequest<'_>) -> TgResult<WorkerReply> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.failed(format!("could not start worker: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&line) {
                drop(stdin);
                // reap the worker so its stderr can be reported
                let stderr = child
                    .wait_with_output()
                    .map(|output| String::from_utf8_lossy(&output.stderr).trim().to_string())
                    .unwrap_or_default();
                return Err(self
                    .failed(format!("could not send request: {e}: {stderr}"))
                    .into());
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| self.failed(format!("worker did not finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self
                .failed(format!("worker exited with {}: {}", output.status, stderr.trim()))
                .into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reply_line = stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| SearchError::MalformedReply {
                message: "worker wrote no reply".to_string(),
            })?;

        let reply: WorkerReply =
            serde_json::from_str(reply_line).map_err(|e| SearchError::MalformedReply {
                message: format!("{e}: {reply_line}"),
            })?;

        match reply {
            WorkerReply::Error { message } => Err(self.failed(message).into()),
            reply => Ok(reply),
        }
    }

    fn unexpected(expected: &str, reply: &WorkerReply) -> SearchError {
        SearchError::MalformedReply {
            message: format!("expected a {expected} reply, got {reply:?}"),
        }
    }
}

impl SearchBackend for ProcessBackend {
    fn cross_validate(
        &self,
        candidate: &CandidateConfiguration,
        train: &Dataset,
        folds: usize,
    ) -> TgResult<Vec<FoldPredictions>> {
        let request = self.request(WorkerTask::CrossValidate {
            candidate,
            texts: train.texts(),
            labels: train.labels(),
            folds,
        });
        match self.call(&request)? {
            WorkerReply::Folds { folds } => Ok(folds),
            other => Err(Self::unexpected("folds", &other).into()),
        }
    }

    fn refit(&self, candidate: &CandidateConfiguration, train: &Dataset) -> TgResult<FittedModel> {
        let request = self.request(WorkerTask::Refit {
            candidate,
            texts: train.texts(),
            labels: train.labels(),
        });
        match self.call(&request)? {
            WorkerReply::Model { model } => Ok(model),
            other => Err(Self::unexpected("model", &other).into()),
        }
    }

    fn predict(&self, model: &FittedModel, texts: &[String]) -> TgResult<Vec<Label>> {
        match self.call(&self.request(WorkerTask::Predict { model, texts }))? {
            WorkerReply::Predictions { labels } if labels.len() == texts.len() => Ok(labels),
            WorkerReply::Predictions { labels } => Err(SearchError::MalformedReply {
                message: format!("{} predictions for {} texts", labels.len(), texts.len()),
            }
            .into()),
            other => Err(Self::unexpected("predictions", &other).into()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tg_types::{Document, TgError};

    fn shell(script: &str) -> ProcessBackend {
        ProcessBackend::new(WorkerCommand::new("sh").with_args(["-c", script]))
    }

    fn texts() -> Vec<String> {
        vec!["good".to_string(), "bad".to_string()]
    }

    #[test]
    fn test_request_wire_format() {
        let model = FittedModel(serde_json::json!({"weights": [1, 2]}));
        let texts = texts();
        let json = serde_json::to_value(WorkerRequest {
            task: WorkerTask::Predict {
                model: &model,
                texts: &texts,
            },
            tokenizer: None,
        })
        .unwrap();
        assert_eq!(json["request"], "predict");
        assert_eq!(json["model"]["weights"][1], 2);
        assert_eq!(json["texts"][0], "good");
        assert!(json.get("tokenizer").is_none());
    }

    #[test]
    fn test_tokenizer_is_forwarded() {
        let backend = shell("true").with_tokenizer(Some("spacy".to_string()));
        let model = FittedModel(serde_json::Value::Null);
        let texts = texts();
        let json =
            serde_json::to_value(backend.request(WorkerTask::Predict { model: &model, texts: &texts }))
                .unwrap();
        assert_eq!(json["request"], "predict");
        assert_eq!(json["tokenizer"], "spacy");

        // the worker reads the tokenizer off the request line
        let backend = shell(
            r#"read line; tok=$(echo "$line" | sed 's/.*"tokenizer":"\([a-z]*\)".*/\1/'); echo "{\"reply\":\"predictions\",\"labels\":[\"$tok\",\"$tok\"]}""#,
        )
        .with_tokenizer(Some("wordnet".to_string()));
        let labels = backend.predict(&model, &texts).unwrap();
        assert_eq!(labels, vec!["wordnet".to_string(), "wordnet".to_string()]);
    }

    #[test]
    fn test_predict_round_trip() {
        let backend = shell(r#"read line; echo '{"reply":"predictions","labels":["pos","neg"]}'"#);
        let labels = backend
            .predict(&FittedModel(serde_json::Value::Null), &texts())
            .unwrap();
        assert_eq!(labels, vec!["pos".to_string(), "neg".to_string()]);
    }

    #[test]
    fn test_worker_sees_request() {
        // echo the request kind back as the only label
        let backend = shell(
            r#"read line; kind=$(echo "$line" | sed 's/.*"request":"\([a-z_]*\)".*/\1/'); echo "{\"reply\":\"predictions\",\"labels\":[\"$kind\"]}""#,
        );
        let labels = backend
            .predict(&FittedModel(serde_json::Value::Null), &["x".to_string()])
            .unwrap();
        assert_eq!(labels, vec!["predict".to_string()]);
    }

    #[test]
    fn test_cross_validate_reply() {
        let backend = shell(
            r#"read line; echo 'progress...'; echo '{"reply":"folds","folds":[{"y_true":["a"],"y_pred":["a"]},{"y_true":["b"],"y_pred":["a"]}]}'"#,
        );
        let train = Dataset::new(vec![Document::new(0, "t", "a"), Document::new(1, "u", "b")]);
        let candidate = tg_optimizer::GridSearch::new(
            &tg_optimizer::assemble(
                &tg_optimizer::PreprocessingGrid::base(),
                &[tg_types::ClassifierFamily::NearestCentroid],
            )
            .unwrap(),
        )
        .unwrap()
        .candidates()[0]
            .clone();

        let folds = backend.cross_validate(&candidate, &train, 2).unwrap();
        assert_eq!(folds.len(), 2);
        assert_eq!(folds[1].y_pred, vec!["a".to_string()]);
    }

    #[test]
    fn test_worker_error_reply() {
        let backend = shell(r#"read line; echo '{"reply":"error","message":"model is not fitted"}'"#);
        let err = backend
            .predict(&FittedModel(serde_json::Value::Null), &texts())
            .unwrap_err();
        assert!(matches!(
            err,
            TgError::Search(SearchError::BackendFailed { ref message, .. }) if message == "model is not fitted"
        ));
    }

    #[test]
    fn test_nonzero_exit() {
        let backend = shell("read line; echo boom >&2; exit 3");
        let err = backend
            .predict(&FittedModel(serde_json::Value::Null), &texts())
            .unwrap_err();
        match err {
            TgError::Search(SearchError::BackendFailed { message, .. }) => {
                assert!(message.contains("boom"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_worker_exiting_before_reading_is_reaped() {
        // larger than a pipe buffer, so the write cannot finish unread
        let texts: Vec<String> = (0..4096).map(|i| format!("feedback text number {i:08}")).collect();
        let backend = shell("echo tokenizer model missing >&2; exit 2");
        let err = backend
            .predict(&FittedModel(serde_json::Value::Null), &texts)
            .unwrap_err();
        match err {
            TgError::Search(SearchError::BackendFailed { message, .. }) => {
                assert!(message.contains("tokenizer model missing"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_and_mismatched_replies() {
        let garbage = shell("read line; echo not-json");
        assert!(matches!(
            garbage.predict(&FittedModel(serde_json::Value::Null), &texts()),
            Err(TgError::Search(SearchError::MalformedReply { .. }))
        ));

        let wrong_kind = shell(r#"read line; echo '{"reply":"model","model":{}}'"#);
        assert!(matches!(
            wrong_kind.predict(&FittedModel(serde_json::Value::Null), &texts()),
            Err(TgError::Search(SearchError::MalformedReply { .. }))
        ));

        let short = shell(r#"read line; echo '{"reply":"predictions","labels":["pos"]}'"#);
        assert!(matches!(
            short.predict(&FittedModel(serde_json::Value::Null), &texts()),
            Err(TgError::Search(SearchError::MalformedReply { .. }))
        ));
    }

    #[test]
    fn test_missing_program() {
        let backend = ProcessBackend::new(WorkerCommand::new("/nonexistent/worker"));
        assert!(matches!(
            backend.predict(&FittedModel(serde_json::Value::Null), &texts()),
            Err(TgError::Search(SearchError::BackendFailed { .. }))
        ));
        assert_eq!(backend.name(), "/nonexistent/worker");
    }
}
