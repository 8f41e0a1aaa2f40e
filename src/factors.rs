use crate::models::{
    ProtectiveFactor, ProtectiveFactorType, RiskFactor, RiskFactorType, Trend,
};
use crate::policy::{clamp_score, RiskPolicy};
use crate::signals::StudentSignalSet;
use crate::trend::TrendStrategy;

/// Applies the threshold rules; each rule yields at most one factor.
pub fn analyze_risk_factors(
    signals: &StudentSignalSet,
    policy: &RiskPolicy,
    trend: &dyn TrendStrategy,
) -> Vec<RiskFactor> {
    let mut factors = Vec::new();
    let gpa_trend = trend.detect(&signals.grade_history(policy), policy.gpa_trend_delta);

    if signals.gpa < policy.low_gpa_threshold {
        factors.push(risk_factor(
            RiskFactorType::LowGpa,
            (policy.low_gpa_threshold - signals.gpa) * policy.low_gpa_multiplier,
            "GPA is below the good-standing threshold",
            vec![
                format!("Current GPA: {:.2}", signals.gpa),
                format!("Threshold: {:.2}", policy.low_gpa_threshold),
            ],
            gpa_trend,
        ));
    }

    if signals.attendance < policy.attendance_threshold {
        factors.push(risk_factor(
            RiskFactorType::PoorAttendance,
            100.0 - signals.attendance,
            "Course progress suggests irregular attendance",
            vec![format!("Average course progress: {:.0}%", signals.attendance)],
            Trend::Stable,
        ));
    }

    if signals.engagement < policy.engagement_threshold {
        factors.push(risk_factor(
            RiskFactorType::LowEngagement,
            100.0 - signals.engagement,
            "Little platform activity in the last 30 days",
            vec![format!("Engagement score: {:.0}", signals.engagement)],
            Trend::Stable,
        ));
    }

    let scores = signals.score_history();
    let recent = &scores[scores.len().saturating_sub(policy.recent_submission_window)..];
    if !recent.is_empty() {
        let average = recent.iter().sum::<f64>() / recent.len() as f64;
        if average < policy.struggling_score_threshold {
            factors.push(risk_factor(
                RiskFactorType::AcademicStruggles,
                100.0 - average,
                "Recent assignment scores are consistently low",
                vec![format!(
                    "Average of last {} scored submissions: {:.1}",
                    recent.len(),
                    average
                )],
                trend.detect(&scores, policy.score_trend_delta),
            ));
        }
    }

    if !signals.has_financial_aid && signals.gpa < policy.financial_stress_gpa_threshold {
        factors.push(risk_factor(
            RiskFactorType::FinancialStress,
            policy.financial_stress_severity,
            "No financial aid on record while grades are slipping",
            vec![
                "No financial aid award found".to_string(),
                format!("Current GPA: {:.2}", signals.gpa),
            ],
            gpa_trend,
        ));
    }

    if signals.support_system < policy.isolation_threshold {
        factors.push(risk_factor(
            RiskFactorType::SocialIsolation,
            100.0 - signals.support_system,
            "Limited connection to peers and advisors",
            vec![format!("Support system score: {:.0}", signals.support_system)],
            Trend::Stable,
        ));
    }

    factors
}

pub fn analyze_protective_factors(
    signals: &StudentSignalSet,
    policy: &RiskPolicy,
) -> Vec<ProtectiveFactor> {
    let mut factors = Vec::new();

    if signals.support_system >= policy.strong_support_threshold {
        factors.push(protective_factor(
            ProtectiveFactorType::StrongSupportSystem,
            signals.support_system,
            "Connected to study groups or an advisor",
        ));
    }

    if signals.engagement >= policy.motivation_threshold {
        factors.push(protective_factor(
            ProtectiveFactorType::HighMotivation,
            signals.engagement,
            "Consistently active on the platform",
        ));
    }

    if let Some(rate) = signals.on_time_rate() {
        if rate >= policy.on_time_rate_threshold {
            factors.push(protective_factor(
                ProtectiveFactorType::GoodStudyHabits,
                rate.round(),
                "Submits coursework on time",
            ));
        }
    }

    if signals.has_financial_aid {
        factors.push(protective_factor(
            ProtectiveFactorType::FinancialStability,
            policy.financial_stability_strength,
            "Receiving financial aid",
        ));
    }

    if signals.gpa >= policy.clear_goals_gpa_threshold {
        factors.push(protective_factor(
            ProtectiveFactorType::ClearGoals,
            signals.gpa * policy.clear_goals_multiplier,
            "Strong academic record",
        ));
    }

    factors
}

fn risk_factor(
    factor_type: RiskFactorType,
    severity: f64,
    description: &str,
    evidence: Vec<String>,
    trend: Trend,
) -> RiskFactor {
    RiskFactor {
        factor_type,
        severity: clamp_score(severity),
        description: description.to_string(),
        evidence,
        trend,
    }
}

fn protective_factor(
    factor_type: ProtectiveFactorType,
    strength: f64,
    description: &str,
) -> ProtectiveFactor {
    ProtectiveFactor {
        factor_type,
        strength: clamp_score(strength),
        description: description.to_string(),
    }
}
