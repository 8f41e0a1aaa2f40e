use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct StudentSummary {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Dropped,
}

impl EnrollmentStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "dropped" => Some(Self::Dropped),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRecord {
    pub score: Option<f64>,
    pub due_date: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn is_on_time(&self) -> bool {
        self.due_date.map_or(true, |due| self.submitted_at <= due)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrollmentRecord {
    pub enrollment_id: Uuid,
    pub course_title: String,
    pub status: EnrollmentStatus,
    pub progress_percentage: f64,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub submissions: Vec<SubmissionRecord>,
}

impl EnrollmentRecord {
    /// Mean of the scored submissions, `None` when nothing has been graded.
    pub fn average_score(&self) -> Option<f64> {
        let scores: Vec<f64> = self.submissions.iter().filter_map(|s| s.score).collect();
        if scores.is_empty() {
            None
        } else {
            Some(scores.iter().sum::<f64>() / scores.len() as f64)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorType {
    LowGpa,
    PoorAttendance,
    LowEngagement,
    AcademicStruggles,
    FinancialStress,
    SocialIsolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    #[serde(rename = "type")]
    pub factor_type: RiskFactorType,
    pub severity: f64,
    pub description: String,
    pub evidence: Vec<String>,
    pub trend: Trend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectiveFactorType {
    StrongSupportSystem,
    HighMotivation,
    GoodStudyHabits,
    FinancialStability,
    ClearGoals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtectiveFactor {
    #[serde(rename = "type")]
    pub factor_type: ProtectiveFactorType,
    pub strength: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn is_elevated(&self) -> bool {
        *self >= Self::High
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeType {
    Dropout,
    AcademicProbation,
    CourseFailure,
    DelayedGraduation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskPrediction {
    pub outcome_type: OutcomeType,
    pub probability: f64,
    pub timeframe: String,
    pub preventable: bool,
    pub prevention_strategies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AdvisorNotification,
    ScheduleTutoring,
    FormStudyGroup,
    SpiritualCounseling,
    FinancialAidReferral,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionAction {
    pub action_type: ActionType,
    pub description: String,
    pub priority: u32,
    pub estimated_impact: f64,
    pub resources_required: Vec<String>,
    pub auto_executable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub student_id: Uuid,
    pub assessment_date: DateTime<Utc>,
    pub overall_risk_level: RiskLevel,
    pub risk_factors: Vec<RiskFactor>,
    pub protective_factors: Vec<ProtectiveFactor>,
    pub predictions: Vec<RiskPrediction>,
    pub recommended_interventions: Vec<InterventionAction>,
    pub confidence: f64,
    pub policy_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivenessRecord {
    pub student_id: Uuid,
    pub intervention_id: String,
    pub effective: bool,
    pub improvement: f64,
    pub notes: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRequest {
    pub student_id: Uuid,
    #[serde(default)]
    pub include_interventions: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<RiskAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urgent_actions: Option<Vec<InterventionAction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn risk_levels_are_totally_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert!(RiskLevel::High.is_elevated());
        assert!(!RiskLevel::Medium.is_elevated());
    }

    #[test]
    fn submissions_without_due_date_count_as_on_time() {
        let now = Utc::now();
        let undated = SubmissionRecord {
            score: Some(80.0),
            due_date: None,
            submitted_at: now,
        };
        let late = SubmissionRecord {
            score: Some(80.0),
            due_date: Some(now - Duration::days(1)),
            submitted_at: now,
        };
        assert!(undated.is_on_time());
        assert!(!late.is_on_time());
    }

    #[test]
    fn factor_serializes_with_wire_names() {
        let factor = RiskFactor {
            factor_type: RiskFactorType::LowGpa,
            severity: 28.0,
            description: "GPA below good standing".to_string(),
            evidence: vec![],
            trend: Trend::Stable,
        };
        let json = serde_json::to_value(&factor).unwrap();
        assert_eq!(json["type"], "low_gpa");
        assert_eq!(json["trend"], "stable");
    }

    fn full_assessment() -> RiskAssessment {
        RiskAssessment {
            student_id: Uuid::new_v4(),
            assessment_date: Utc::now(),
            overall_risk_level: RiskLevel::High,
            risk_factors: vec![RiskFactor {
                factor_type: RiskFactorType::PoorAttendance,
                severity: 35.0,
                description: "Course progress is lagging".to_string(),
                evidence: vec!["Average progress 65%".to_string()],
                trend: Trend::Decreasing,
            }],
            protective_factors: vec![ProtectiveFactor {
                factor_type: ProtectiveFactorType::FinancialStability,
                strength: 80.0,
                description: "Receiving financial aid".to_string(),
            }],
            predictions: vec![RiskPrediction {
                outcome_type: OutcomeType::Dropout,
                probability: 55.0,
                timeframe: "within 6 months".to_string(),
                preventable: true,
                prevention_strategies: vec!["Weekly advisor check-ins".to_string()],
            }],
            recommended_interventions: vec![InterventionAction {
                action_type: ActionType::ScheduleTutoring,
                description: "Schedule tutoring sessions".to_string(),
                priority: 2,
                estimated_impact: 70.0,
                resources_required: vec!["tutor".to_string()],
                auto_executable: true,
                execution_details: Some(serde_json::json!({
                    "sessionsPerWeek": 2,
                    "subjects": ["Biblical Hebrew I"],
                })),
            }],
            confidence: 85.0,
            policy_version: "2024.1".to_string(),
        }
    }

    #[test]
    fn request_reads_camel_case_keys() {
        let student_id = Uuid::new_v4();
        let request: AssessmentRequest = serde_json::from_value(serde_json::json!({
            "studentId": student_id,
            "includeInterventions": false,
        }))
        .unwrap();
        assert_eq!(request.student_id, student_id);
        assert_eq!(request.include_interventions, Some(false));

        let request: AssessmentRequest =
            serde_json::from_value(serde_json::json!({ "studentId": student_id })).unwrap();
        assert_eq!(request.include_interventions, None);
    }

    #[test]
    fn failed_response_omits_assessment_keys() {
        let response = AssessmentResponse {
            success: false,
            risk_assessment: None,
            urgent_actions: None,
            error: Some("data unavailable: timed out".to_string()),
        };
        let json = serde_json::to_value(&response).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "data unavailable: timed out");
        assert!(json.get("riskAssessment").is_none());
        assert!(json.get("urgentActions").is_none());
    }

    #[test]
    fn successful_response_uses_wire_names() {
        let assessment = full_assessment();
        let urgent = assessment.recommended_interventions.clone();
        let response = AssessmentResponse {
            success: true,
            risk_assessment: Some(assessment),
            urgent_actions: Some(urgent),
            error: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["riskAssessment"]["overallRiskLevel"], "high");
        assert_eq!(json["riskAssessment"]["policyVersion"], "2024.1");
        assert_eq!(json["riskAssessment"]["predictions"][0]["outcomeType"], "dropout");
        assert_eq!(json["urgentActions"][0]["actionType"], "schedule_tutoring");
        assert_eq!(json["urgentActions"][0]["executionDetails"]["sessionsPerWeek"], 2);
    }

    #[test]
    fn stored_assessment_reads_back_unchanged() {
        let assessment = full_assessment();
        let stored = serde_json::to_value(&assessment).unwrap();
        let restored: RiskAssessment = serde_json::from_value(stored).unwrap();
        assert_eq!(restored, assessment);

        let mut plain = full_assessment();
        plain.recommended_interventions[0].execution_details = None;
        let stored = serde_json::to_value(&plain).unwrap();
        assert!(stored["recommendedInterventions"][0]
            .get("executionDetails")
            .is_none());
        let restored: RiskAssessment = serde_json::from_value(stored).unwrap();
        assert_eq!(restored, plain);
    }
}
