//! Per-grant feedback
//!
//! Every grant gets one [`GrantFeedback`] record, registered before any
//! work starts. Components report errors and warnings against grant ids;
//! the records are handed to a [`FeedbackHandler`] once the run is over.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedbackError {
    #[error("feedback handler failed for grant {grant_id}: {message}")]
    Handler { grant_id: String, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantFeedback {
    pub grant_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl GrantFeedback {
    pub fn new(grant_id: impl Into<String>) -> Self {
        Self {
            grant_id: grant_id.into(),
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }
}

/// Receives the feedback records at the end of a run.
#[async_trait]
pub trait FeedbackHandler: Send + Sync {
    async fn add_feedback(&self, feedback: GrantFeedback) -> Result<(), FeedbackError>;
}

/// Handler that keeps every record it is given.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    records: Mutex<Vec<GrantFeedback>>,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<GrantFeedback> {
        self.records.lock().clone()
    }

    pub fn get(&self, grant_id: &str) -> Option<GrantFeedback> {
        self.records
            .lock()
            .iter()
            .find(|r| r.grant_id == grant_id)
            .cloned()
    }
}

#[async_trait]
impl FeedbackHandler for CollectingHandler {
    async fn add_feedback(&self, feedback: GrantFeedback) -> Result<(), FeedbackError> {
        self.records.lock().push(feedback);
        Ok(())
    }
}

/// Lock-protected collection of feedback records keyed by grant id.
#[derive(Debug, Default)]
pub struct FeedbackSink {
    records: Mutex<BTreeMap<String, GrantFeedback>>,
}

impl FeedbackSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the record for `grant_id`. Registering twice keeps the
    ///  existing record.
    pub fn register(&self, grant_id: &str) {
        self.records
            .lock()
            .entry(grant_id.to_string())
            .or_insert_with(|| GrantFeedback::new(grant_id));
    }

    pub fn error<I, S>(&self, message: &str, grant_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.record(message, grant_ids, |feedback| &mut feedback.errors);
    }

    pub fn warning<I, S>(&self, message: &str, grant_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.record(message, grant_ids, |feedback| &mut feedback.warnings);
    }

    fn record<I, S>(
        &self,
        message: &str,
        grant_ids: I,
        field: impl Fn(&mut GrantFeedback) -> &mut Vec<String>,
    ) where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut records = self.records.lock();
        for grant_id in grant_ids {
            match records.get_mut(grant_id.as_ref()) {
                Some(feedback) => field(feedback).push(message.to_string()),
                None => tracing::debug!(grant = grant_id.as_ref(), "dropping feedback for unknown grant"),
            }
        }
    }

    pub fn get(&self, grant_id: &str) -> Option<GrantFeedback> {
        self.records.lock().get(grant_id).cloned()
    }

    /// Snapshot of every record, ordered by grant id.
    pub fn records(&self) -> Vec<GrantFeedback> {
        self.records.lock().values().cloned().collect()
    }

    /// Hand every record to `handler`. Delivery continues past a failing
    ///  record; the first failure is returned.
    pub async fn flush<H: FeedbackHandler + ?Sized>(&self, handler: &H) -> Result<(), FeedbackError> {
        let records = self.records();
        let mut first_error = None;

        for record in records {
            if let Err(err) = handler.add_feedback(record).await {
                tracing::error!("{}", err);
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
