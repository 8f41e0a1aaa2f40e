use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AssessmentResult;
use crate::models::{EffectivenessRecord, RiskAssessment, RiskLevel};

/// Append-only store for logged assessments and effectiveness records.
#[async_trait]
pub trait AssessmentLog: Send + Sync {
    /// Most recently logged assessment for the student, if any.
    async fn latest_assessment(&self, student_id: Uuid) -> AssessmentResult<Option<RiskAssessment>>;

    async fn record_assessment(&self, assessment: &RiskAssessment) -> AssessmentResult<()>;

    async fn record_effectiveness(&self, record: &EffectivenessRecord) -> AssessmentResult<()>;
}

pub fn level_score(level: RiskLevel) -> f64 {
    match level {
        RiskLevel::Low => 25.0,
        RiskLevel::Medium => 50.0,
        RiskLevel::High => 75.0,
        RiskLevel::Critical => 100.0,
    }
}

/// Compares the risk level before and after an intervention.
pub fn compare_assessments(
    student_id: Uuid,
    intervention_id: &str,
    baseline: Option<&RiskAssessment>,
    current: &RiskAssessment,
    recorded_at: DateTime<Utc>,
) -> EffectivenessRecord {
    let Some(baseline) = baseline else {
        return EffectivenessRecord {
            student_id,
            intervention_id: intervention_id.to_string(),
            effective: false,
            improvement: 0.0,
            notes: "No baseline assessment on record; effectiveness cannot be measured"
                .to_string(),
            recorded_at,
        };
    };

    let improvement =
        level_score(baseline.overall_risk_level) - level_score(current.overall_risk_level);
    let notes = format!(
        "Risk level moved from {} ({}) to {} ({})",
        baseline.overall_risk_level.as_str(),
        baseline.assessment_date.format("%Y-%m-%d"),
        current.overall_risk_level.as_str(),
        current.assessment_date.format("%Y-%m-%d"),
    );

    EffectivenessRecord {
        student_id,
        intervention_id: intervention_id.to_string(),
        effective: improvement > 0.0,
        improvement,
        notes,
        recorded_at,
    }
}
