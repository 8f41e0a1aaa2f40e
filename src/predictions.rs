use crate::models::{OutcomeType, ProtectiveFactor, RiskFactor, RiskPrediction};
use crate::policy::{clamp_score, RiskPolicy};
use crate::signals::StudentSignalSet;

pub fn generate_predictions(
    signals: &StudentSignalSet,
    risk_factors: &[RiskFactor],
    protective_factors: &[ProtectiveFactor],
    policy: &RiskPolicy,
) -> Vec<RiskPrediction> {
    let mut predictions = Vec::new();

    let dropout = dropout_probability(signals, risk_factors, protective_factors, policy);
    if dropout > policy.dropout.inclusion_threshold {
        predictions.push(prediction(OutcomeType::Dropout, dropout));
    }

    if signals.gpa < policy.probation_gpa_threshold {
        let probability =
            (policy.probation_gpa_threshold - signals.gpa) * policy.probation_multiplier;
        predictions.push(prediction(OutcomeType::AcademicProbation, probability));
    }

    let failing = signals
        .enrollments
        .iter()
        .filter_map(|e| e.average_score())
        .filter(|avg| *avg < policy.failing_course_threshold)
        .count();
    if failing > 0 {
        let probability =
            (failing as f64 * policy.course_failure_step).min(policy.course_failure_cap);
        predictions.push(prediction(OutcomeType::CourseFailure, probability));
    }

    if signals.gpa < policy.delayed_graduation_gpa_threshold
        && signals.attendance < policy.delayed_graduation_attendance_threshold
    {
        predictions.push(prediction(
            OutcomeType::DelayedGraduation,
            policy.delayed_graduation_probability,
        ));
    }

    predictions
}

/// Additive dropout heuristic, clamped to 0-100. The weights are not fitted
/// to outcome data.
pub fn dropout_probability(
    signals: &StudentSignalSet,
    risk_factors: &[RiskFactor],
    protective_factors: &[ProtectiveFactor],
    policy: &RiskPolicy,
) -> f64 {
    let w = &policy.dropout;
    let mut probability = 0.0;

    if signals.gpa < w.severe_gpa_threshold {
        probability += w.severe_gpa_weight;
    } else if signals.gpa < w.low_gpa_threshold {
        probability += w.low_gpa_weight;
    }

    if signals.attendance < w.severe_attendance_threshold {
        probability += w.severe_attendance_weight;
    } else if signals.attendance < w.low_attendance_threshold {
        probability += w.low_attendance_weight;
    }

    if signals.engagement < w.engagement_threshold {
        probability += w.engagement_weight;
    }

    let severe = risk_factors
        .iter()
        .filter(|f| f.severity >= w.severe_factor_threshold)
        .count();
    let strong = protective_factors
        .iter()
        .filter(|f| f.strength >= w.strong_protection_threshold)
        .count();
    probability += severe as f64 * w.severe_factor_weight;
    probability -= strong as f64 * w.strong_protection_weight;

    clamp_score(probability)
}

fn prediction(outcome_type: OutcomeType, probability: f64) -> RiskPrediction {
    RiskPrediction {
        outcome_type,
        probability: clamp_score(probability),
        timeframe: timeframe(outcome_type).to_string(),
        preventable: true,
        prevention_strategies: prevention_strategies(outcome_type)
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

fn timeframe(outcome_type: OutcomeType) -> &'static str {
    match outcome_type {
        OutcomeType::Dropout => "next 3-6 months",
        OutcomeType::AcademicProbation => "end of current semester",
        OutcomeType::CourseFailure => "current term",
        OutcomeType::DelayedGraduation => "1-2 semesters",
    }
}

fn prevention_strategies(outcome_type: OutcomeType) -> &'static [&'static str] {
    match outcome_type {
        OutcomeType::Dropout => &[
            "Immediate advisor outreach",
            "Personalized academic recovery plan",
            "Connect with peer mentoring",
            "Review financial support options",
        ],
        OutcomeType::AcademicProbation => &[
            "Intensive tutoring in weakest courses",
            "Structured study schedule",
            "Reduce course load next term",
        ],
        OutcomeType::CourseFailure => &[
            "Meet with course instructors",
            "Targeted tutoring on missed material",
            "Negotiate extensions for outstanding work",
        ],
        OutcomeType::DelayedGraduation => &[
            "Degree-plan review with advisor",
            "Prioritize required courses",
            "Summer or intensive course options",
        ],
    }
}
