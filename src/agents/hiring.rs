//! Candidate-screening agent
//!
//! Ranks stored CVs against a job description by keyword overlap, evaluates
//! the short list with the LLM, and returns UI-ready candidate reports. All
//! defaulting of partially filled evaluations happens once, at the boundary
//! where the LLM result becomes a [`CandidateReport`].

use crate::agents::{extract_json_object, index_terms, Agent};
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::openrouter::{CompletionRequest, Message};
use crate::orchestrator::registry::HIRING_AGENT;
use crate::storage::{CvStats, CvStore};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Default number of CVs short-listed by keyword ranking
pub const DEFAULT_INITIAL_RETRIEVAL: usize = 30;

/// Default number of candidates evaluated by the LLM
pub const DEFAULT_FINAL_CANDIDATES: usize = 5;

const EVALUATION_PROMPT: &str = "You are a technical recruiter evaluating one CV against a \
    job description. Reply with a single JSON object with these fields: name (string), \
    overall_score (number, 0-100), decision (STRONG_HIRE | HIRE | MAYBE | REJECT), \
    key_skills (array of strings), relevant_experience (array of strings), \
    education_qualifications (array of strings), achievements (array of strings), \
    concerns (array of strings), soft_skills (array of strings), reasoning (string), \
    resume_summary (string).";

/// Hiring decision for a screened candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HiringDecision {
    /// Clear hire, top of the list
    StrongHire,
    /// Hire
    Hire,
    /// Worth a closer look
    Maybe,
    /// Not a fit
    Reject,
    /// Evaluation produced no decision; replaced by score inference
    Pending,
}

impl HiringDecision {
    /// Infer a decision from an overall score
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            Self::StrongHire
        } else if score >= 70.0 {
            Self::Hire
        } else if score >= 50.0 {
            Self::Maybe
        } else {
            Self::Reject
        }
    }
}

/// Raw LLM evaluation; every field optional, defaulted at the boundary
#[derive(Debug, Clone, Default, Deserialize)]
struct CandidateEvaluation {
    name: Option<String>,
    overall_score: Option<f64>,
    decision: Option<HiringDecision>,
    key_skills: Option<Vec<String>>,
    relevant_experience: Option<Vec<String>>,
    education_qualifications: Option<Vec<String>>,
    achievements: Option<Vec<String>>,
    concerns: Option<Vec<String>>,
    soft_skills: Option<Vec<String>>,
    reasoning: Option<String>,
    resume_summary: Option<String>,
    scoring: Option<serde_json::Value>,
}

/// A screened candidate, formatted for display
#[derive(Debug, Clone, Serialize)]
pub struct CandidateReport {
    /// Candidate name, falling back to the CV filename stem
    pub name: String,
    /// CV filename the report was built from
    pub filename: String,
    /// Overall score in 0..=100, one decimal
    pub overall_score: f64,
    /// Duplicate of `overall_score` kept for UI compatibility
    pub score: f64,
    /// Hiring decision, inferred from the score when the LLM gave none
    pub decision: HiringDecision,
    /// Credential verification status
    pub credibility_status: String,
    /// Evaluation reasoning
    pub reasoning: String,
    /// Up to ten key skills
    pub key_skills: Vec<String>,
    /// Up to five relevant positions
    pub relevant_experience: Vec<String>,
    /// Education and certifications
    pub education_qualifications: Vec<String>,
    /// Up to five notable achievements
    pub achievements: Vec<String>,
    /// Evaluation concerns
    pub concerns: Vec<String>,
    /// Soft skills
    pub soft_skills: Vec<String>,
    /// Raw scoring breakdown from the evaluation
    pub scoring: serde_json::Value,
    /// When the evaluation ran
    pub evaluation_timestamp: String,
    /// Resume summary, truncated to 500 characters
    pub resume_summary: String,
}

impl CandidateReport {
    fn from_evaluation(filename: &str, eval: CandidateEvaluation) -> Self {
        let name = eval
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| filename_stem(filename));

        let overall_score = round1(eval.overall_score.unwrap_or(0.0).clamp(0.0, 100.0));

        let decision = match eval.decision {
            Some(decision) if decision != HiringDecision::Pending => decision,
            _ => HiringDecision::from_score(overall_score),
        };

        let reasoning = eval
            .reasoning
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| {
                "Evaluation completed. See skills and experience for details.".to_string()
            });

        Self {
            name,
            filename: filename.to_string(),
            overall_score,
            score: overall_score,
            decision,
            credibility_status: "NOT_VERIFIED".to_string(),
            reasoning,
            key_skills: truncated(eval.key_skills, 10),
            relevant_experience: truncated(eval.relevant_experience, 5),
            education_qualifications: eval.education_qualifications.unwrap_or_default(),
            achievements: truncated(eval.achievements, 5),
            concerns: eval.concerns.unwrap_or_default(),
            soft_skills: eval.soft_skills.unwrap_or_default(),
            scoring: eval.scoring.unwrap_or_else(|| serde_json::json!({})),
            evaluation_timestamp: Utc::now().to_rfc3339(),
            resume_summary: eval
                .resume_summary
                .map(|s| s.chars().take(500).collect())
                .unwrap_or_default(),
        }
    }
}

fn filename_stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn truncated(values: Option<Vec<String>>, limit: usize) -> Vec<String> {
    let mut values = values.unwrap_or_default();
    values.truncate(limit);
    values
}

/// A CV matched by keyword search
#[derive(Debug, Clone, Serialize)]
pub struct CvMatch {
    /// Row id of the CV
    pub id: i64,
    /// CV filename
    pub filename: String,
    /// Keyword-overlap score against the job description
    pub score: usize,
    /// First 200 characters of the CV text
    pub preview: String,
}

/// Candidate-screening agent backed by the CV store and an LLM
pub struct HiringAgent {
    cvs: CvStore,
    client: Arc<dyn LlmClient>,
    model: String,
}

impl HiringAgent {
    /// Create the agent over a CV store and LLM client
    pub fn new(cvs: CvStore, client: Arc<dyn LlmClient>, model: String) -> Self {
        Self { cvs, client, model }
    }

    /// Screen stored CVs against a job description
    ///
    /// Short-lists `initial_retrieval` CVs by keyword overlap, evaluates the
    /// top `final_candidates` with the LLM, and returns reports sorted by
    /// score. A failed evaluation drops that candidate with a warning rather
    /// than failing the batch.
    pub async fn process_job_hiring(
        &self,
        job_description: &str,
        initial_retrieval: usize,
        final_candidates: usize,
    ) -> Result<Vec<CandidateReport>> {
        if job_description.trim().is_empty() {
            return Err(Error::invalid_input("job description is required"));
        }

        let short_list = self.rank_cvs(job_description, initial_retrieval).await?;

        let mut reports = Vec::new();
        for matched in short_list.into_iter().take(final_candidates) {
            match self.evaluate(job_description, &matched).await {
                Ok(report) => reports.push(report),
                Err(err) => {
                    warn!(filename = %matched.filename, "candidate evaluation failed: {err}");
                }
            }
        }

        reports.sort_by(|a, b| {
            b.overall_score
                .partial_cmp(&a.overall_score)
                .unwrap_or(Ordering::Equal)
        });
        Ok(reports)
    }

    /// Store a CV in the database
    pub async fn add_cv(
        &self,
        filename: &str,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<i64> {
        if filename.trim().is_empty() {
            return Err(Error::invalid_input("filename is required"));
        }
        if content.trim().is_empty() {
            return Err(Error::invalid_input("CV content is empty"));
        }
        self.cvs.add(filename, content, metadata).await
    }

    /// CV database statistics
    pub async fn cv_stats(&self) -> Result<CvStats> {
        self.cvs.stats().await
    }

    /// CVs matching a job description, best first
    pub async fn search_cvs(&self, job_description: &str, limit: usize) -> Result<Vec<CvMatch>> {
        if job_description.trim().is_empty() {
            return Err(Error::invalid_input("job description is required"));
        }
        self.rank_cvs(job_description, limit).await
    }

    async fn rank_cvs(&self, job_description: &str, limit: usize) -> Result<Vec<CvMatch>> {
        let job_terms = index_terms(job_description);
        let mut scored: Vec<CvMatch> = self
            .cvs
            .all()
            .await?
            .into_iter()
            .filter_map(|cv| {
                let cv_terms = index_terms(&cv.content);
                let score = job_terms.intersection(&cv_terms).count();
                (score > 0).then(|| CvMatch {
                    id: cv.id,
                    filename: cv.filename.clone(),
                    score,
                    preview: cv.content.chars().take(200).collect(),
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn evaluate(&self, job_description: &str, matched: &CvMatch) -> Result<CandidateReport> {
        let cv = self
            .cvs
            .get(matched.id)
            .await?
            .ok_or_else(|| Error::agent(format!("CV {} disappeared", matched.id)))?;

        let request = CompletionRequest::new(
            &self.model,
            vec![
                Message::system(EVALUATION_PROMPT),
                Message::user(format!(
                    "Job description:\n{job_description}\n\nCV ({}):\n{}",
                    cv.filename, cv.content
                )),
            ],
        )
        .with_temperature(0.1)
        .with_max_tokens(1200);

        let response = self.client.complete(request).await?;
        let raw = response
            .text()
            .ok_or_else(|| Error::agent("empty completion from LLM"))?;
        let payload = extract_json_object(raw)
            .ok_or_else(|| Error::agent("evaluation did not contain a JSON object"))?;
        let evaluation: CandidateEvaluation = serde_json::from_str(payload)?;

        Ok(CandidateReport::from_evaluation(&cv.filename, evaluation))
    }
}

#[async_trait]
impl Agent for HiringAgent {
    fn name(&self) -> &str {
        HIRING_AGENT
    }

    async fn stats(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.cvs.stats().await?)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::StaticLlm;
    use crate::storage::Database;

    async fn seeded_agent(reply: &str) -> HiringAgent {
        let db = Database::in_memory().await.unwrap();
        let cvs = CvStore::new(db.pool());
        cvs.add(
            "alice_rust.txt",
            "Senior Rust engineer with tokio and sqlx experience, 7 years.",
            None,
        )
        .await
        .unwrap();
        cvs.add("bob_python.txt", "Python data analyst, pandas and SQL.", None)
            .await
            .unwrap();
        HiringAgent::new(cvs, StaticLlm::shared(reply), "test-model".to_string())
    }

    #[test]
    fn test_decision_from_score_thresholds() {
        assert_eq!(HiringDecision::from_score(92.0), HiringDecision::StrongHire);
        assert_eq!(HiringDecision::from_score(85.0), HiringDecision::StrongHire);
        assert_eq!(HiringDecision::from_score(70.0), HiringDecision::Hire);
        assert_eq!(HiringDecision::from_score(55.5), HiringDecision::Maybe);
        assert_eq!(HiringDecision::from_score(10.0), HiringDecision::Reject);
    }

    #[test]
    fn test_report_defaults_from_empty_evaluation() {
        let report =
            CandidateReport::from_evaluation("carol_smith.pdf", CandidateEvaluation::default());
        assert_eq!(report.name, "carol_smith");
        assert_eq!(report.overall_score, 0.0);
        assert_eq!(report.decision, HiringDecision::Reject);
        assert_eq!(report.credibility_status, "NOT_VERIFIED");
        assert!(report.reasoning.contains("Evaluation completed"));
        assert!(report.key_skills.is_empty());
    }

    #[test]
    fn test_report_infers_decision_when_pending() {
        let eval = CandidateEvaluation {
            overall_score: Some(88.0),
            decision: Some(HiringDecision::Pending),
            ..CandidateEvaluation::default()
        };
        let report = CandidateReport::from_evaluation("x.txt", eval);
        assert_eq!(report.decision, HiringDecision::StrongHire);
    }

    #[test]
    fn test_report_truncates_lists_and_summary() {
        let eval = CandidateEvaluation {
            key_skills: Some((0..20).map(|i| format!("skill-{i}")).collect()),
            achievements: Some((0..9).map(|i| format!("achievement-{i}")).collect()),
            resume_summary: Some("x".repeat(2000)),
            overall_score: Some(120.0),
            ..CandidateEvaluation::default()
        };
        let report = CandidateReport::from_evaluation("x.txt", eval);
        assert_eq!(report.key_skills.len(), 10);
        assert_eq!(report.achievements.len(), 5);
        assert_eq!(report.resume_summary.chars().count(), 500);
        // Scores are clamped into 0..=100.
        assert_eq!(report.overall_score, 100.0);
    }

    #[tokio::test]
    async fn test_process_job_hiring_end_to_end() {
        let reply = r#"{"name": "Alice", "overall_score": 91.5, "decision": "STRONG_HIRE",
            "key_skills": ["rust", "tokio"], "reasoning": "Strong systems background."}"#;
        let agent = seeded_agent(reply).await;

        let reports = agent
            .process_job_hiring("Rust engineer with tokio experience", 30, 5)
            .await
            .unwrap();

        // Only the Rust CV overlaps the job description.
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].name, "Alice");
        assert_eq!(reports[0].overall_score, 91.5);
        assert_eq!(reports[0].decision, HiringDecision::StrongHire);
        assert_eq!(reports[0].filename, "alice_rust.txt");
    }

    #[tokio::test]
    async fn test_process_job_hiring_requires_description() {
        let agent = seeded_agent("{}").await;
        assert!(agent.process_job_hiring("  ", 30, 5).await.is_err());
    }

    #[tokio::test]
    async fn test_search_cvs_orders_by_score() {
        let agent = seeded_agent("{}").await;
        let matches = agent
            .search_cvs("Rust engineer, tokio, sqlx, pandas", 10)
            .await
            .unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].filename, "alice_rust.txt");
        assert!(matches[0].score > matches[1].score);
    }

    #[tokio::test]
    async fn test_add_cv_validates_input() {
        let agent = seeded_agent("{}").await;
        assert!(agent.add_cv("", "content", None).await.is_err());
        assert!(agent.add_cv("x.txt", "  ", None).await.is_err());
        assert!(agent.add_cv("x.txt", "Go engineer", None).await.is_ok());
    }
}
