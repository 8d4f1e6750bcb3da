use crate::error::{Error, ErrorKind, ErrorRepr, Result};
use crate::plan::{Part, PartPlan};
use crate::request::{CompletedPart, CompletedParts, PartNumber};

use std::collections::HashMap;

/// Collects the outcomes of the part uploads of one multipart upload.
///
/// Outcomes may arrive in any order. The first failure recorded is the one
/// that is reported; failures recorded after it are logged and dropped.
#[derive(Debug)]
pub struct ResultAggregator<'a> {
    plan: &'a PartPlan,
    completed: HashMap<PartNumber, CompletedPart>,
    failure: Option<Error>,
}

impl<'a> ResultAggregator<'a> {
    /// Create an aggregator expecting one result for every part in `plan`.
    pub fn new(plan: &'a PartPlan) -> Self {
        Self {
            plan,
            completed: HashMap::with_capacity(plan.len()),
            failure: None,
        }
    }

    /// Record the outcome of uploading `part`.
    ///
    /// A successful result for a part that is not in the plan, or that names
    /// a different part, is recorded as a failure.
    pub fn record(&mut self, part: Part, res: Result<CompletedPart>) {
        let res = res.and_then(|completed| {
            if self.plan.contains(&part) && completed.part_number == part.part_number {
                Ok(completed)
            } else {
                Err(ErrorRepr::UnknownPart(completed.part_number).into())
            }
        });

        match res {
            Ok(completed) => {
                trace!(
                    part = %completed.part_number,
                    etag = %completed.etag,
                    done = self.completed.len() + 1,
                    total = self.plan.len(),
                    "recorded part",
                );
                self.completed.insert(completed.part_number, completed);
            }
            Err(e) if self.failure.is_none() => {
                if e.kind() != ErrorKind::Cancelled {
                    error!(part = %part.part_number, error = %e, "first part failure");
                }
                self.failure = Some(e);
            }
            Err(e) => {
                debug!(part = %part.part_number, error = %e, "dropping later part failure");
            }
        }
    }

    /// Whether a failure has been recorded.
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Number of parts recorded as uploaded.
    pub fn completed(&self) -> usize {
        self.completed.len()
    }

    /// Whether every planned part has been uploaded.
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.completed.len() == self.plan.len()
    }

    /// Return the completed parts sorted by part number, or the first
    /// failure.
    ///
    /// If no failure was recorded but some part has no result, the upload
    /// was stopped before it could finish and the error has kind
    /// [`ErrorKind::Cancelled`].
    pub fn finish(self) -> Result<CompletedParts> {
        if let Some(e) = self.failure {
            return Err(e);
        }
        if self.completed.len() != self.plan.len() {
            return Err(ErrorRepr::Incomplete {
                expected: self.plan.len(),
                completed: self.completed.len(),
            })?;
        }
        Ok(self.completed.into_values().collect())
    }
}
