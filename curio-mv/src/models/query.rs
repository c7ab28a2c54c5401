//! Item lookup query
//!
//! The immutable input to every valuation operation. Carries the fields
//! needed to identify one collectible against the external pricing and
//! metadata services; it has no identity beyond the request.

use serde::{Deserialize, Serialize};

use super::valuation::{normalize_grade_key, GRADE_KEY_CURRENT, GRADE_KEY_RAW};

/// Condition status of the queried item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeStatus {
    /// Ungraded book, valued under the "raw" sentinel grade
    #[default]
    Raw,
    /// Third-party certified (slabbed), valued at its numeric grade
    Slabbed,
}

/// Identifying fields for one collectible lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemQuery {
    /// Series title, e.g. "Saga". Required.
    pub title: String,

    /// Issue number within the series, e.g. "1" or "Annual 3"
    #[serde(default)]
    pub issue_number: Option<String>,

    /// Publisher, e.g. "Image Comics"
    #[serde(default)]
    pub publisher: Option<String>,

    /// Grade the caller wants a recommendation for, e.g. "9.8"
    #[serde(default)]
    pub target_grade: Option<String>,

    /// Raw vs third-party certified
    #[serde(default)]
    pub grade_status: GradeStatus,

    /// Certification number for slabbed books
    #[serde(default)]
    pub cert_number: Option<String>,
}

impl ItemQuery {
    /// Reject malformed caller input before any provider call is made
    ///
    /// A query without a title cannot be matched against any service, so it
    /// is the one hard request error in the system.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("item query requires a non-empty title".to_string());
        }
        Ok(())
    }

    /// The grade bucket key this query asks a recommendation for
    ///
    /// Raw items always resolve under the "raw" sentinel. Slabbed items use
    /// their normalized target grade when given, otherwise the "current"
    /// catch-all (the aggregator applies its own fallback chain from there).
    pub fn target_grade_key(&self) -> String {
        match self.grade_status {
            GradeStatus::Raw => GRADE_KEY_RAW.to_string(),
            GradeStatus::Slabbed => self
                .target_grade
                .as_deref()
                .and_then(normalize_grade_key)
                .unwrap_or_else(|| GRADE_KEY_CURRENT.to_string()),
        }
    }

    /// One-line description for logging and audit summaries
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("title={:?}", self.title)];
        if let Some(issue) = &self.issue_number {
            parts.push(format!("issue={}", issue));
        }
        if let Some(publisher) = &self.publisher {
            parts.push(format!("publisher={}", publisher));
        }
        if let Some(grade) = &self.target_grade {
            parts.push(format!("grade={}", grade));
        }
        if self.grade_status == GradeStatus::Slabbed {
            parts.push("slabbed".to_string());
        }
        parts.join(" ")
    }
}
