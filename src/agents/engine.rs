use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::mock::{grading, journal, reports, scheme};
use super::providers::{self, Provider};
use super::random::{RandomSource, RngSource};
use super::{context, parse, prompts};
use super::{FallbackReason, GenerateError, Generated, Generation, GenerationKind, GenerationRequest};
use crate::config::AiSettings;
use crate::models::{
    AIFeedback, ClassReportRequest, GradeResult, JournalEntry, PupilReport, PupilReportRequest,
    SchemeAnalysisResult, SchemeDocument, WorkSubmission,
};

/// Generates grades, feedback, reports and scheme analyses, trying the
/// configured provider first and falling back to local templates.
pub struct ContentEngine {
    settings: AiSettings,
    provider: Option<Box<dyn Provider>>,
    rng: Mutex<Box<dyn RandomSource>>,
}

fn require(value: &str, field: &str) -> Result<(), GenerateError> {
    if value.trim().is_empty() {
        return Err(GenerateError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

impl ContentEngine {
    pub fn new(settings: AiSettings) -> Self {
        let provider = providers::build(&settings);
        Self::with_parts(settings, provider, Box::new(RngSource::from_entropy()))
    }

    pub fn with_parts(
        settings: AiSettings,
        provider: Option<Box<dyn Provider>>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        Self {
            settings,
            provider,
            rng: Mutex::new(rng),
        }
    }

    pub fn settings(&self) -> &AiSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> Option<&'static str> {
        self.provider.as_ref().map(|p| p.name())
    }

    async fn remote<T>(
        &self,
        kind: GenerationKind,
        prompt_override: Option<&str>,
        context: &Value,
        decode: fn(&str) -> Result<T, FallbackReason>,
    ) -> Result<T, FallbackReason> {
        let provider = self.provider.as_ref().ok_or(FallbackReason::NotConfigured)?;
        let system = prompt_override
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| prompts::default_for(kind));
        let text = provider.complete(system, &context.to_string()).await?;
        decode(&text)
    }

    async fn resolve<T>(
        &self,
        kind: GenerationKind,
        remote: Result<T, FallbackReason>,
        mock: impl FnOnce(&mut dyn RandomSource) -> T,
    ) -> Generation<T> {
        match remote {
            Ok(value) => {
                info!("{} generated by {}", kind, self.provider_name().unwrap_or("provider"));
                Generation {
                    value,
                    fallback: None,
                }
            }
            Err(reason) => {
                if reason == FallbackReason::NotConfigured {
                    debug!("{} using templates: {}", kind, reason);
                } else {
                    warn!("{} falling back to templates: {}", kind, reason);
                }
                if self.settings.mock_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.settings.mock_delay_ms)).await;
                }
                let value = {
                    let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    mock(&mut **rng)
                };
                Generation {
                    value,
                    fallback: Some(reason),
                }
            }
        }
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        prompt_override: Option<&str>,
    ) -> Result<Generation<Generated>, GenerateError> {
        Ok(match request {
            GenerationRequest::GradeWork(s) => self.grade_work(s, prompt_override).await?.map(Generated::GradeWork),
            GenerationRequest::JournalFeedback(e) => self
                .journal_feedback(e, prompt_override)
                .await?
                .map(Generated::JournalFeedback),
            GenerationRequest::PupilReport(r) => self
                .pupil_report(r, prompt_override)
                .await?
                .map(Generated::PupilReport),
            GenerationRequest::ClassReport(r) => self
                .class_report(r, prompt_override)
                .await?
                .map(Generated::ClassReport),
            GenerationRequest::SchemeAnalysis(d) => self
                .scheme_analysis(d, prompt_override)
                .await?
                .map(Generated::SchemeAnalysis),
        })
    }

    pub async fn grade_work(
        &self,
        submission: &WorkSubmission,
        prompt_override: Option<&str>,
    ) -> Result<Generation<GradeResult>, GenerateError> {
        require(&submission.title, "title")?;
        require(&submission.project_id, "project")?;

        let kind = GenerationKind::GradeWork;
        let remote = self
            .remote(kind, prompt_override, &context::grade(submission), parse::grade_result)
            .await;
        Ok(self
            .resolve(kind, remote, |rng| grading::grade(submission, rng))
            .await)
    }

    pub async fn journal_feedback(
        &self,
        entry: &JournalEntry,
        prompt_override: Option<&str>,
    ) -> Result<Generation<AIFeedback>, GenerateError> {
        require(&entry.title, "title")?;
        require(&entry.content, "content")?;

        let kind = GenerationKind::JournalFeedback;
        let remote = self
            .remote(kind, prompt_override, &context::journal(entry), parse::journal_feedback)
            .await;
        Ok(self
            .resolve(kind, remote, |rng| journal::feedback(entry, rng))
            .await)
    }

    pub async fn pupil_report(
        &self,
        request: &PupilReportRequest,
        prompt_override: Option<&str>,
    ) -> Result<Generation<PupilReport>, GenerateError> {
        require(&request.pupil.name, "pupil name")?;

        let kind = GenerationKind::PupilReport;
        let remote = self
            .remote(kind, prompt_override, &context::pupil_report(request), parse::narrative)
            .await
            .map(|content| PupilReport {
                content,
                ..reports::pupil_report(request)
            });
        Ok(self
            .resolve(kind, remote, |_| reports::pupil_report(request))
            .await)
    }

    pub async fn class_report(
        &self,
        request: &ClassReportRequest,
        prompt_override: Option<&str>,
    ) -> Result<Generation<PupilReport>, GenerateError> {
        require(&request.class_name, "class name")?;

        let kind = GenerationKind::ClassReport;
        let remote = self
            .remote(kind, prompt_override, &context::class_report(request), parse::narrative)
            .await
            .map(|content| PupilReport {
                content,
                ..reports::class_report(request)
            });
        Ok(self
            .resolve(kind, remote, |_| reports::class_report(request))
            .await)
    }

    pub async fn scheme_analysis(
        &self,
        doc: &SchemeDocument,
        prompt_override: Option<&str>,
    ) -> Result<Generation<SchemeAnalysisResult>, GenerateError> {
        require(&doc.title, "title")?;

        let kind = GenerationKind::SchemeAnalysis;
        let remote = self
            .remote(kind, prompt_override, &context::scheme(doc), parse::scheme_analysis)
            .await;
        Ok(self
            .resolve(kind, remote, |rng| scheme::analyze(doc, rng))
            .await)
    }
}
