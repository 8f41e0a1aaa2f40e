//! Intervention planning: turns risk factors into a deduplicated,
//! priority-ordered list of recommended actions.

use std::collections::HashSet;

use serde_json::json;

use crate::models::{ActionType, InterventionAction, RiskFactor, RiskFactorType, RiskLevel};
use crate::policy::RiskPolicy;

pub fn plan_interventions(
    level: RiskLevel,
    risk_factors: &[RiskFactor],
) -> Vec<InterventionAction> {
    let mut candidates = Vec::new();

    if level == RiskLevel::Critical {
        candidates.push(InterventionAction {
            action_type: ActionType::AdvisorNotification,
            description: "Student is at critical risk; advisor outreach required within 24 hours"
                .to_string(),
            priority: 1,
            estimated_impact: 85.0,
            resources_required: vec!["Academic advisor".to_string()],
            auto_executable: true,
            execution_details: Some(json!({ "urgency": "critical", "responseWithinHours": 24 })),
        });
    }

    for factor in risk_factors {
        candidates.extend(actions_for(factor.factor_type));
    }

    let mut seen = HashSet::new();
    let mut planned: Vec<InterventionAction> = candidates
        .into_iter()
        .filter(|action| seen.insert((action.action_type, action.description.clone())))
        .collect();

    // stable: equal priorities keep their insertion order
    planned.sort_by_key(|action| action.priority);
    planned
}

/// Highest-priority subset for high and critical risk; `None` otherwise.
pub fn urgent_actions(
    level: RiskLevel,
    planned: &[InterventionAction],
    policy: &RiskPolicy,
) -> Option<Vec<InterventionAction>> {
    if !level.is_elevated() {
        return None;
    }

    Some(
        planned
            .iter()
            .filter(|action| action.priority <= policy.urgent_priority_cutoff)
            .take(policy.urgent_action_limit)
            .cloned()
            .collect(),
    )
}

fn actions_for(factor_type: RiskFactorType) -> Vec<InterventionAction> {
    match factor_type {
        RiskFactorType::LowGpa | RiskFactorType::AcademicStruggles => vec![InterventionAction {
            action_type: ActionType::ScheduleTutoring,
            description: "Schedule weekly tutoring for courses with low scores".to_string(),
            priority: 2,
            estimated_impact: 80.0,
            resources_required: vec!["Tutor".to_string(), "Course materials".to_string()],
            auto_executable: true,
            execution_details: Some(json!({ "sessionsPerWeek": 2, "durationMinutes": 60 })),
        }],
        RiskFactorType::PoorAttendance => vec![InterventionAction {
            action_type: ActionType::AdvisorNotification,
            description: "Notify advisor about falling course progress".to_string(),
            priority: 2,
            estimated_impact: 70.0,
            resources_required: vec!["Academic advisor".to_string()],
            auto_executable: true,
            execution_details: Some(json!({ "urgency": "high" })),
        }],
        RiskFactorType::LowEngagement => vec![InterventionAction {
            action_type: ActionType::FormStudyGroup,
            description: "Invite student into a peer study group".to_string(),
            priority: 3,
            estimated_impact: 65.0,
            resources_required: vec!["Peer group facilitator".to_string()],
            auto_executable: false,
            execution_details: None,
        }],
        RiskFactorType::SocialIsolation => vec![
            InterventionAction {
                action_type: ActionType::SpiritualCounseling,
                description: "Offer pastoral counseling and peer support".to_string(),
                priority: 2,
                estimated_impact: 75.0,
                resources_required: vec!["Counselor".to_string()],
                auto_executable: false,
                execution_details: None,
            },
            InterventionAction {
                action_type: ActionType::FormStudyGroup,
                description: "Invite student into a peer study group".to_string(),
                priority: 3,
                estimated_impact: 65.0,
                resources_required: vec!["Peer group facilitator".to_string()],
                auto_executable: false,
                execution_details: None,
            },
        ],
        RiskFactorType::FinancialStress => vec![InterventionAction {
            action_type: ActionType::FinancialAidReferral,
            description: "Refer student to the financial aid office".to_string(),
            priority: 3,
            estimated_impact: 60.0,
            resources_required: vec!["Financial aid officer".to_string()],
            auto_executable: false,
            execution_details: None,
        }],
    }
}
