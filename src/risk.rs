use crate::models::{ProtectiveFactor, RiskFactor, RiskLevel};
use crate::policy::RiskPolicy;
use crate::signals::StudentSignalSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScore {
    pub risk_score: f64,
    pub protective_score: f64,
    pub net_risk: f64,
    pub level: RiskLevel,
}

pub fn score_risk(
    risk_factors: &[RiskFactor],
    protective_factors: &[ProtectiveFactor],
    policy: &RiskPolicy,
) -> RiskScore {
    let risk_score = mean(risk_factors.iter().map(|f| f.severity));
    let protective_score = mean(protective_factors.iter().map(|f| f.strength));
    let net_risk = risk_score - policy.protective_discount * protective_score;

    RiskScore {
        risk_score,
        protective_score,
        net_risk,
        level: level_for(net_risk, policy),
    }
}

pub fn level_for(net_risk: f64, policy: &RiskPolicy) -> RiskLevel {
    if net_risk >= policy.critical_threshold {
        RiskLevel::Critical
    } else if net_risk >= policy.high_threshold {
        RiskLevel::High
    } else if net_risk >= policy.medium_threshold {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Reliability of an assessment, from how much history backs it.
pub fn estimate_confidence(signals: &StudentSignalSet, policy: &RiskPolicy) -> f64 {
    let mut data_points = signals.enrollments.len() + signals.submission_count();
    if signals.has_financial_aid {
        data_points += 1;
    }
    if signals.support_system > 0.0 {
        data_points += 1;
    }

    policy
        .confidence_tiers
        .iter()
        .find(|(minimum, _)| data_points >= *minimum)
        .map(|(_, confidence)| *confidence)
        .unwrap_or(policy.confidence_floor)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
