use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::effectiveness::{compare_assessments, AssessmentLog};
use crate::error::{AssessmentError, AssessmentResult};
use crate::factors::{analyze_protective_factors, analyze_risk_factors};
use crate::interventions::{plan_interventions, urgent_actions};
use crate::models::{
    AssessmentRequest, AssessmentResponse, EffectivenessRecord, InterventionAction,
    RiskAssessment,
};
use crate::policy::RiskPolicy;
use crate::predictions::generate_predictions;
use crate::risk::{estimate_confidence, score_risk, RiskScore};
use crate::signals::{collect_signals, SignalSource, StudentSignalSet};
use crate::trend::{SplitHalfTrend, TrendStrategy};

/// An assessment together with the numbers behind its level.
#[derive(Debug, Clone)]
pub struct ScoredAssessment {
    pub assessment: RiskAssessment,
    pub score: RiskScore,
    pub urgent_actions: Option<Vec<InterventionAction>>,
}

/// Stateless risk assessment service over an injected signal source.
pub struct RiskEngine {
    source: Arc<dyn SignalSource>,
    policy: RiskPolicy,
    trend: Box<dyn TrendStrategy>,
    collection_timeout: Duration,
}

impl RiskEngine {
    pub fn new(source: Arc<dyn SignalSource>, collection_timeout: Duration) -> Self {
        let policy = RiskPolicy::default();
        let trend = Box::new(SplitHalfTrend {
            min_points: policy.trend_min_points,
        });
        Self {
            source,
            policy,
            trend,
            collection_timeout,
        }
    }

    /// Swaps the policy table. The trend strategy is rebuilt from the new
    /// policy's minimum series length, so apply `with_trend` after this.
    pub fn with_policy(mut self, policy: RiskPolicy) -> Self {
        self.trend = Box::new(SplitHalfTrend {
            min_points: policy.trend_min_points,
        });
        self.policy = policy;
        self
    }

    pub fn with_trend(mut self, trend: Box<dyn TrendStrategy>) -> Self {
        self.trend = trend;
        self
    }

    /// Request/response entry point. Failures come back as `success: false`
    /// with the error message, never as a substitute assessment.
    pub async fn handle(&self, request: AssessmentRequest) -> AssessmentResponse {
        let include = request.include_interventions.unwrap_or(true);
        match self.assess(request.student_id, include).await {
            Ok(scored) => AssessmentResponse {
                success: true,
                risk_assessment: Some(scored.assessment),
                urgent_actions: scored.urgent_actions,
                error: None,
            },
            Err(err) => {
                tracing::warn!(
                    student_id = %request.student_id,
                    error = %err,
                    "risk assessment failed"
                );
                AssessmentResponse {
                    success: false,
                    risk_assessment: None,
                    urgent_actions: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    pub async fn assess(
        &self,
        student_id: Uuid,
        include_interventions: bool,
    ) -> AssessmentResult<ScoredAssessment> {
        let now = Utc::now();
        let signals = collect_signals(
            self.source.as_ref(),
            &self.policy,
            student_id,
            self.collection_timeout,
            now,
        )
        .await?;

        let scored = self.assess_signals(&signals, include_interventions, now);
        tracing::info!(
            student_id = %student_id,
            level = scored.assessment.overall_risk_level.as_str(),
            net_risk = scored.score.net_risk,
            factors = scored.assessment.risk_factors.len(),
            confidence = scored.assessment.confidence,
            "risk assessment complete"
        );
        Ok(scored)
    }

    /// Assesses many students with at most `max_in_flight` collections
    /// running at once. A student's collection deadline only starts once it
    /// holds a slot. Results come back in completion order.
    pub async fn assess_many(
        self: Arc<Self>,
        student_ids: Vec<Uuid>,
        include_interventions: bool,
        max_in_flight: usize,
    ) -> Vec<(Uuid, AssessmentResult<ScoredAssessment>)> {
        let slots = Arc::new(Semaphore::new(max_in_flight.max(1)));
        let mut tasks = JoinSet::new();
        for student_id in student_ids {
            let engine = self.clone();
            let slots = slots.clone();
            tasks.spawn(async move {
                let result = match slots.acquire_owned().await {
                    Ok(_slot) => engine.assess(student_id, include_interventions).await,
                    Err(_) => Err(AssessmentError::DataUnavailable(
                        "assessment queue closed".to_string(),
                    )),
                };
                (student_id, result)
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => results.push(outcome),
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => tracing::error!(error = %err, "assessment task cancelled"),
            }
        }
        results
    }

    /// The synchronous part of an assessment: analysis, scoring, prediction
    /// and planning over already-collected signals.
    pub fn assess_signals(
        &self,
        signals: &StudentSignalSet,
        include_interventions: bool,
        assessed_at: DateTime<Utc>,
    ) -> ScoredAssessment {
        let risk_factors = analyze_risk_factors(signals, &self.policy, self.trend.as_ref());
        let protective_factors = analyze_protective_factors(signals, &self.policy);
        let score = score_risk(&risk_factors, &protective_factors, &self.policy);
        let predictions =
            generate_predictions(signals, &risk_factors, &protective_factors, &self.policy);

        let (recommended, urgent) = if include_interventions {
            let planned = plan_interventions(score.level, &risk_factors);
            let urgent = urgent_actions(score.level, &planned, &self.policy);
            (planned, urgent)
        } else {
            (Vec::new(), None)
        };

        ScoredAssessment {
            assessment: RiskAssessment {
                student_id: signals.student_id,
                assessment_date: assessed_at,
                overall_risk_level: score.level,
                risk_factors,
                protective_factors,
                predictions,
                recommended_interventions: recommended,
                confidence: estimate_confidence(signals, &self.policy),
                policy_version: self.policy.version.to_string(),
            },
            score,
            urgent_actions: urgent,
        }
    }

    /// Re-assesses the student and compares against the last logged
    /// assessment. Only comparisons with a baseline are appended to the log.
    pub async fn track_intervention_effectiveness(
        &self,
        log: &dyn AssessmentLog,
        student_id: Uuid,
        intervention_id: &str,
    ) -> AssessmentResult<EffectivenessRecord> {
        let baseline = log.latest_assessment(student_id).await?;
        let current = self.assess(student_id, false).await?;
        let record = compare_assessments(
            student_id,
            intervention_id,
            baseline.as_ref(),
            &current.assessment,
            Utc::now(),
        );

        if baseline.is_some() {
            log.record_effectiveness(&record).await?;
        }

        tracing::info!(
            student_id = %student_id,
            intervention_id,
            effective = record.effective,
            improvement = record.improvement,
            "intervention effectiveness tracked"
        );
        Ok(record)
    }
}
