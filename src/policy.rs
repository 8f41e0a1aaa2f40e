//! Scoring policy table.
//!
//! Every threshold and coefficient the engine applies lives here so a policy
//! revision is a new constant with a new `version`, never an edit to control
//! flow. Assessments record the version that produced them.

use serde::Serialize;

/// Score-to-grade-point scale, highest cutoff first. Scores below the last
/// cutoff map to 0.0.
pub const GRADE_POINT_SCALE: [(f64, f64); 11] = [
    (93.0, 4.0),
    (90.0, 3.7),
    (87.0, 3.3),
    (83.0, 3.0),
    (80.0, 2.7),
    (77.0, 2.3),
    (73.0, 2.0),
    (70.0, 1.7),
    (67.0, 1.3),
    (63.0, 1.0),
    (60.0, 0.7),
];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskPolicy {
    pub version: &'static str,

    // signal collection
    pub engagement_window_days: i64,
    pub engagement_per_tutoring_session: f64,
    pub engagement_per_submission: f64,
    pub support_baseline: f64,
    pub support_study_group_bonus: f64,
    pub support_advisor_bonus: f64,
    pub default_gpa: f64,

    // risk factors
    pub low_gpa_threshold: f64,
    pub low_gpa_multiplier: f64,
    pub attendance_threshold: f64,
    pub engagement_threshold: f64,
    pub recent_submission_window: usize,
    pub struggling_score_threshold: f64,
    pub financial_stress_gpa_threshold: f64,
    pub financial_stress_severity: f64,
    pub isolation_threshold: f64,

    // protective factors
    pub strong_support_threshold: f64,
    pub motivation_threshold: f64,
    pub on_time_rate_threshold: f64,
    pub financial_stability_strength: f64,
    pub clear_goals_gpa_threshold: f64,
    pub clear_goals_multiplier: f64,

    // trend
    pub trend_min_points: usize,
    pub gpa_trend_delta: f64,
    pub score_trend_delta: f64,

    // scoring
    pub protective_discount: f64,
    pub critical_threshold: f64,
    pub high_threshold: f64,
    pub medium_threshold: f64,

    // predictions
    pub dropout: DropoutWeights,
    pub probation_gpa_threshold: f64,
    pub probation_multiplier: f64,
    pub failing_course_threshold: f64,
    pub course_failure_step: f64,
    pub course_failure_cap: f64,
    pub delayed_graduation_gpa_threshold: f64,
    pub delayed_graduation_attendance_threshold: f64,
    pub delayed_graduation_probability: f64,

    // interventions
    pub urgent_priority_cutoff: u32,
    pub urgent_action_limit: usize,

    // confidence: (minimum data points, confidence), highest first
    pub confidence_tiers: [(usize, f64); 3],
    pub confidence_floor: f64,
}

/// Additive dropout heuristic. This is an uncalibrated rule of thumb, not a
/// fitted model; changing it changes reported probabilities for every student.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropoutWeights {
    pub severe_gpa_threshold: f64,
    pub severe_gpa_weight: f64,
    pub low_gpa_threshold: f64,
    pub low_gpa_weight: f64,
    pub severe_attendance_threshold: f64,
    pub severe_attendance_weight: f64,
    pub low_attendance_threshold: f64,
    pub low_attendance_weight: f64,
    pub engagement_threshold: f64,
    pub engagement_weight: f64,
    pub severe_factor_threshold: f64,
    pub severe_factor_weight: f64,
    pub strong_protection_threshold: f64,
    pub strong_protection_weight: f64,
    pub inclusion_threshold: f64,
}

impl RiskPolicy {
    pub const V1: RiskPolicy = RiskPolicy {
        version: "2024.1",

        engagement_window_days: 30,
        engagement_per_tutoring_session: 10.0,
        engagement_per_submission: 5.0,
        support_baseline: 50.0,
        support_study_group_bonus: 25.0,
        support_advisor_bonus: 25.0,
        default_gpa: 3.0,

        low_gpa_threshold: 2.5,
        low_gpa_multiplier: 40.0,
        attendance_threshold: 80.0,
        engagement_threshold: 50.0,
        recent_submission_window: 10,
        struggling_score_threshold: 70.0,
        financial_stress_gpa_threshold: 3.0,
        financial_stress_severity: 60.0,
        isolation_threshold: 40.0,

        strong_support_threshold: 70.0,
        motivation_threshold: 70.0,
        on_time_rate_threshold: 80.0,
        financial_stability_strength: 80.0,
        clear_goals_gpa_threshold: 3.0,
        clear_goals_multiplier: 25.0,

        trend_min_points: 4,
        gpa_trend_delta: 0.3,
        score_trend_delta: 10.0,

        protective_discount: 0.5,
        critical_threshold: 70.0,
        high_threshold: 50.0,
        medium_threshold: 30.0,

        dropout: DropoutWeights {
            severe_gpa_threshold: 2.0,
            severe_gpa_weight: 40.0,
            low_gpa_threshold: 2.5,
            low_gpa_weight: 20.0,
            severe_attendance_threshold: 70.0,
            severe_attendance_weight: 30.0,
            low_attendance_threshold: 80.0,
            low_attendance_weight: 15.0,
            engagement_threshold: 40.0,
            engagement_weight: 20.0,
            severe_factor_threshold: 70.0,
            severe_factor_weight: 10.0,
            strong_protection_threshold: 70.0,
            strong_protection_weight: 15.0,
            inclusion_threshold: 20.0,
        },
        probation_gpa_threshold: 2.5,
        probation_multiplier: 50.0,
        failing_course_threshold: 60.0,
        course_failure_step: 30.0,
        course_failure_cap: 90.0,
        delayed_graduation_gpa_threshold: 3.0,
        delayed_graduation_attendance_threshold: 85.0,
        delayed_graduation_probability: 60.0,

        urgent_priority_cutoff: 2,
        urgent_action_limit: 3,

        confidence_tiers: [(20, 95.0), (10, 85.0), (5, 75.0)],
        confidence_floor: 60.0,
    };

    /// Maps a 0-100 score onto the 4.0 grade-point scale.
    pub fn grade_points(&self, score: f64) -> f64 {
        GRADE_POINT_SCALE
            .iter()
            .find(|(cutoff, _)| score >= *cutoff)
            .map(|(_, points)| *points)
            .unwrap_or(0.0)
    }
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self::V1
    }
}

/// Clamps a score into the 0-100 range shared by severities, strengths and
/// probabilities.
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}
