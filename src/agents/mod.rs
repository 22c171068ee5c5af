mod context;
mod engine;
pub mod mock;
pub mod parse;
mod prompts;
pub mod providers;
pub mod random;

pub use engine::ContentEngine;
pub use providers::Provider;
pub use random::{RandomSource, RngSource};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::models::{
    AIFeedback, ClassReportRequest, GradeResult, JournalEntry, PupilReport, PupilReportRequest,
    SchemeAnalysisResult, SchemeDocument, WorkSubmission,
};

/// Why a generation was served from templates instead of the provider.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    #[error("no AI provider key configured")]
    NotConfigured,

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("provider returned no text")]
    EmptyResponse,

    #[error("provider output could not be parsed: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationKind {
    GradeWork,
    JournalFeedback,
    PupilReport,
    ClassReport,
    SchemeAnalysis,
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GenerationKind::GradeWork => "grade-work",
            GenerationKind::JournalFeedback => "journal-feedback",
            GenerationKind::PupilReport => "pupil-report",
            GenerationKind::ClassReport => "class-report",
            GenerationKind::SchemeAnalysis => "scheme-analysis",
        })
    }
}

#[derive(Debug, Clone)]
pub enum GenerationRequest {
    GradeWork(WorkSubmission),
    JournalFeedback(JournalEntry),
    PupilReport(PupilReportRequest),
    ClassReport(ClassReportRequest),
    SchemeAnalysis(SchemeDocument),
}

impl GenerationRequest {
    /// Decodes a loosely typed payload for the given kind.
    pub fn from_payload(kind: GenerationKind, payload: Value) -> Result<Self, GenerateError> {
        let invalid = |e: serde_json::Error| GenerateError::InvalidInput(format!("{} payload: {}", kind, e));
        Ok(match kind {
            GenerationKind::GradeWork => Self::GradeWork(serde_json::from_value(payload).map_err(invalid)?),
            GenerationKind::JournalFeedback => {
                Self::JournalFeedback(serde_json::from_value(payload).map_err(invalid)?)
            }
            GenerationKind::PupilReport => Self::PupilReport(serde_json::from_value(payload).map_err(invalid)?),
            GenerationKind::ClassReport => Self::ClassReport(serde_json::from_value(payload).map_err(invalid)?),
            GenerationKind::SchemeAnalysis => {
                Self::SchemeAnalysis(serde_json::from_value(payload).map_err(invalid)?)
            }
        })
    }

    pub fn kind(&self) -> GenerationKind {
        match self {
            Self::GradeWork(_) => GenerationKind::GradeWork,
            Self::JournalFeedback(_) => GenerationKind::JournalFeedback,
            Self::PupilReport(_) => GenerationKind::PupilReport,
            Self::ClassReport(_) => GenerationKind::ClassReport,
            Self::SchemeAnalysis(_) => GenerationKind::SchemeAnalysis,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "result", rename_all = "kebab-case")]
pub enum Generated {
    GradeWork(GradeResult),
    JournalFeedback(AIFeedback),
    PupilReport(PupilReport),
    ClassReport(PupilReport),
    SchemeAnalysis(SchemeAnalysisResult),
}

/// A generated value and, when templates were used, the reason why.
#[derive(Debug, Clone, Serialize)]
pub struct Generation<T> {
    #[serde(flatten)]
    pub value: T,
    pub fallback: Option<FallbackReason>,
}

impl<T> Generation<T> {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Generation<U> {
        Generation {
            value: f(self.value),
            fallback: self.fallback,
        }
    }
}
