use std::fmt::Write;

use crate::models::{InterventionAction, OutcomeType, RiskAssessment, RiskFactorType, Trend};

pub fn build_report(
    student_label: &str,
    assessment: &RiskAssessment,
    urgent_actions: Option<&[InterventionAction]>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Risk Assessment");
    let _ = writeln!(
        output,
        "Generated for {} on {} (policy {})",
        student_label,
        assessment.assessment_date.format("%Y-%m-%d %H:%M UTC"),
        assessment.policy_version
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "**Overall risk:** {} (confidence {:.0}%)",
        assessment.overall_risk_level.as_str(),
        assessment.confidence
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk Factors");

    if assessment.risk_factors.is_empty() {
        let _ = writeln!(output, "No risk factors identified.");
    } else {
        let mut factors = assessment.risk_factors.clone();
        factors.sort_by(|a, b| {
            b.severity
                .partial_cmp(&a.severity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for factor in factors.iter() {
            let _ = writeln!(
                output,
                "- {} severity {:.0} ({}): {}",
                factor_label(factor.factor_type),
                factor.severity,
                trend_label(factor.trend),
                factor.description
            );
            for evidence in factor.evidence.iter() {
                let _ = writeln!(output, "  - {evidence}");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Protective Factors");

    if assessment.protective_factors.is_empty() {
        let _ = writeln!(output, "No protective factors identified.");
    } else {
        for factor in assessment.protective_factors.iter() {
            let _ = writeln!(
                output,
                "- {} (strength {:.0})",
                factor.description, factor.strength
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Predicted Outcomes");

    if assessment.predictions.is_empty() {
        let _ = writeln!(output, "No adverse outcomes predicted.");
    } else {
        for prediction in assessment.predictions.iter() {
            let _ = writeln!(
                output,
                "- {}: {:.0}% within {}",
                outcome_label(prediction.outcome_type),
                prediction.probability,
                prediction.timeframe
            );
            if !prediction.prevention_strategies.is_empty() {
                let _ = writeln!(
                    output,
                    "  - Prevention: {}",
                    prediction.prevention_strategies.join("; ")
                );
            }
        }
    }

    if let Some(urgent) = urgent_actions {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Urgent Actions");
        if urgent.is_empty() {
            let _ = writeln!(output, "No actions meet the urgency cutoff.");
        } else {
            for action in urgent.iter() {
                let _ = writeln!(output, "- [P{}] {}", action.priority, action.description);
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommended Interventions");

    if assessment.recommended_interventions.is_empty() {
        let _ = writeln!(output, "No interventions recommended.");
    } else {
        for action in assessment.recommended_interventions.iter() {
            let _ = writeln!(
                output,
                "- [P{}] {} (impact {:.0}{})",
                action.priority,
                action.description,
                action.estimated_impact,
                if action.auto_executable { ", automatic" } else { "" }
            );
        }
    }

    output
}

fn factor_label(factor_type: RiskFactorType) -> &'static str {
    match factor_type {
        RiskFactorType::LowGpa => "Low GPA",
        RiskFactorType::PoorAttendance => "Poor attendance",
        RiskFactorType::LowEngagement => "Low engagement",
        RiskFactorType::AcademicStruggles => "Academic struggles",
        RiskFactorType::FinancialStress => "Financial stress",
        RiskFactorType::SocialIsolation => "Social isolation",
    }
}

fn outcome_label(outcome_type: OutcomeType) -> &'static str {
    match outcome_type {
        OutcomeType::Dropout => "Dropout",
        OutcomeType::AcademicProbation => "Academic probation",
        OutcomeType::CourseFailure => "Course failure",
        OutcomeType::DelayedGraduation => "Delayed graduation",
    }
}

fn trend_label(trend: Trend) -> &'static str {
    match trend {
        Trend::Increasing => "trending up",
        Trend::Stable => "steady",
        Trend::Decreasing => "trending down",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::{
        ActionType, ProtectiveFactor, ProtectiveFactorType, RiskFactor, RiskLevel, RiskPrediction,
    };

    fn sample_assessment() -> RiskAssessment {
        RiskAssessment {
            student_id: Uuid::new_v4(),
            assessment_date: Utc::now(),
            overall_risk_level: RiskLevel::High,
            risk_factors: vec![
                RiskFactor {
                    factor_type: RiskFactorType::PoorAttendance,
                    severity: 35.0,
                    description: "Course progress suggests irregular attendance".to_string(),
                    evidence: vec!["Average course progress: 65%".to_string()],
                    trend: Trend::Stable,
                },
                RiskFactor {
                    factor_type: RiskFactorType::LowEngagement,
                    severity: 80.0,
                    description: "Little platform activity".to_string(),
                    evidence: vec![],
                    trend: Trend::Stable,
                },
            ],
            protective_factors: vec![ProtectiveFactor {
                factor_type: ProtectiveFactorType::FinancialStability,
                strength: 80.0,
                description: "Receiving financial aid".to_string(),
            }],
            predictions: vec![RiskPrediction {
                outcome_type: OutcomeType::Dropout,
                probability: 45.0,
                timeframe: "next 3-6 months".to_string(),
                preventable: true,
                prevention_strategies: vec!["Immediate advisor outreach".to_string()],
            }],
            recommended_interventions: vec![InterventionAction {
                action_type: ActionType::AdvisorNotification,
                description: "Notify advisor about falling course progress".to_string(),
                priority: 2,
                estimated_impact: 70.0,
                resources_required: vec![],
                auto_executable: true,
                execution_details: None,
            }],
            confidence: 85.0,
            policy_version: "2024.1".to_string(),
        }
    }

    #[test]
    fn report_lists_factors_by_severity() {
        let assessment = sample_assessment();
        let report = build_report("Avery Lee", &assessment, None);

        assert!(report.contains("**Overall risk:** high (confidence 85%)"));
        let engagement = report.find("Low engagement severity 80").unwrap();
        let attendance = report.find("Poor attendance severity 35").unwrap();
        assert!(engagement < attendance);
        assert!(report.contains("Dropout: 45% within next 3-6 months"));
        assert!(!report.contains("## Urgent Actions"));
    }

    #[test]
    fn report_includes_urgent_actions_when_present() {
        let assessment = sample_assessment();
        let urgent = assessment.recommended_interventions.clone();
        let report = build_report("Avery Lee", &assessment, Some(&urgent));

        assert!(report.contains("## Urgent Actions"));
        assert!(report.contains("- [P2] Notify advisor about falling course progress"));
        assert!(report.contains("impact 70, automatic"));
    }
}
