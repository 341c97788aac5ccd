//! Document queue — the proofs a user still has to upload, in order.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::DialogError;

/// Ordered list of pending document labels, consumed front to back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentQueue {
    pending: VecDeque<String>,
}

/// Outcome of one accepted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dequeued {
    /// Label of the document this upload satisfied.
    pub received: String,
    /// Labels still outstanding, head first.
    pub remaining: Vec<String>,
    /// True only for the upload that emptied the queue.
    pub just_completed: bool,
}

impl DocumentQueue {
    /// Replace whatever was pending with `labels`.
    pub fn initialize<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending = labels.into_iter().map(Into::into).collect();
    }

    /// Accept one upload. The file name is not checked against the label.
    pub fn submit(&mut self, display_name: &str) -> Result<Dequeued, DialogError> {
        let received = self
            .pending
            .pop_front()
            .ok_or(DialogError::UploadWithNoPendingDocument)?;

        tracing::debug!(
            document = %received,
            file = %display_name,
            remaining = self.pending.len(),
            "Document received"
        );

        Ok(Dequeued {
            received,
            remaining: self.pending.iter().cloned().collect(),
            just_completed: self.pending.is_empty(),
        })
    }

    pub fn head(&self) -> Option<&str> {
        self.pending.front().map(String::as_str)
    }

    /// Pending labels, head first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
