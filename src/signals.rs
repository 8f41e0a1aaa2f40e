//! Signal collection: the read side of the engine.
//!
//! Collaborator stores sit behind [`SignalSource`]. [`collect_signals`] fans
//! out the independent reads, joins them under a single deadline and folds the
//! raw records into a [`StudentSignalSet`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{AssessmentError, AssessmentResult};
use crate::models::{EnrollmentRecord, EnrollmentStatus, SubmissionRecord};
use crate::policy::{clamp_score, RiskPolicy};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityCounts {
    pub tutoring_sessions: u32,
    pub submissions: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportIndicators {
    pub in_study_group: bool,
    pub has_advisor: bool,
}

/// Read-only access to the stores that hold a student's history.
#[async_trait]
pub trait SignalSource: Send + Sync {
    async fn student_exists(&self, student_id: Uuid) -> AssessmentResult<bool>;

    /// All enrollments with their graded-submission history.
    async fn enrollments(&self, student_id: Uuid) -> AssessmentResult<Vec<EnrollmentRecord>>;

    /// Tutoring sessions and submissions recorded at or after `since`.
    async fn activity_counts(
        &self,
        student_id: Uuid,
        since: DateTime<Utc>,
    ) -> AssessmentResult<ActivityCounts>;

    async fn has_financial_aid(&self, student_id: Uuid) -> AssessmentResult<bool>;

    async fn support_indicators(&self, student_id: Uuid) -> AssessmentResult<SupportIndicators>;
}

/// Everything one assessment run knows about a student.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentSignalSet {
    pub student_id: Uuid,
    /// Active and completed enrollments only.
    pub enrollments: Vec<EnrollmentRecord>,
    pub gpa: f64,
    pub attendance: f64,
    pub engagement: f64,
    pub has_financial_aid: bool,
    pub support_system: f64,
}

impl StudentSignalSet {
    pub fn submissions(&self) -> impl Iterator<Item = &SubmissionRecord> {
        self.enrollments.iter().flat_map(|e| e.submissions.iter())
    }

    pub fn submission_count(&self) -> usize {
        self.submissions().count()
    }

    /// Grade points per completed course with scored work, oldest first.
    pub fn grade_history(&self, policy: &RiskPolicy) -> Vec<f64> {
        let mut completed: Vec<(DateTime<Utc>, f64)> = self
            .enrollments
            .iter()
            .filter(|e| e.status == EnrollmentStatus::Completed)
            .filter_map(|e| {
                e.average_score().map(|avg| {
                    (
                        e.completed_at.unwrap_or(e.enrolled_at),
                        policy.grade_points(avg),
                    )
                })
            })
            .collect();
        completed.sort_by_key(|(at, _)| *at);
        completed.into_iter().map(|(_, points)| points).collect()
    }

    /// Scored submissions, oldest first.
    pub fn score_history(&self) -> Vec<f64> {
        let mut scored: Vec<(DateTime<Utc>, f64)> = self
            .submissions()
            .filter_map(|s| s.score.map(|score| (s.submitted_at, score)))
            .collect();
        scored.sort_by_key(|(at, _)| *at);
        scored.into_iter().map(|(_, score)| score).collect()
    }

    /// Percentage of submissions handed in by their due date. `None` when the
    /// student has submitted nothing.
    pub fn on_time_rate(&self) -> Option<f64> {
        let total = self.submission_count();
        if total == 0 {
            return None;
        }
        let on_time = self.submissions().filter(|s| s.is_on_time()).count();
        Some(on_time as f64 / total as f64 * 100.0)
    }
}

/// Gathers a student's signals, failing as a whole if any read fails or the
/// reads do not finish within `timeout`.
pub async fn collect_signals(
    source: &dyn SignalSource,
    policy: &RiskPolicy,
    student_id: Uuid,
    timeout: Duration,
    now: DateTime<Utc>,
) -> AssessmentResult<StudentSignalSet> {
    let since = now - chrono::Duration::days(policy.engagement_window_days);

    let gather = async {
        if !source.student_exists(student_id).await? {
            return Err(AssessmentError::InvalidStudent(student_id));
        }
        tokio::try_join!(
            source.enrollments(student_id),
            source.activity_counts(student_id, since),
            source.has_financial_aid(student_id),
            source.support_indicators(student_id),
        )
    };

    let (enrollments, activity, has_financial_aid, support) =
        tokio::time::timeout(timeout, gather).await.map_err(|_| {
            tracing::warn!(
                student_id = %student_id,
                timeout_ms = timeout.as_millis() as u64,
                "signal collection timed out"
            );
            AssessmentError::DataUnavailable(format!(
                "signal collection did not finish within {}ms",
                timeout.as_millis()
            ))
        })??;

    build_signal_set(
        policy,
        student_id,
        enrollments,
        activity,
        has_financial_aid,
        support,
    )
}

/// Folds raw collaborator records into a signal set.
///
/// Dropped enrollments are ignored. With nothing active or completed left,
/// attendance is 0, so a student with no course history is scored as poorly
/// attending rather than given the benefit of the doubt.
pub fn build_signal_set(
    policy: &RiskPolicy,
    student_id: Uuid,
    enrollments: Vec<EnrollmentRecord>,
    activity: ActivityCounts,
    has_financial_aid: bool,
    support: SupportIndicators,
) -> AssessmentResult<StudentSignalSet> {
    let enrollments: Vec<EnrollmentRecord> = enrollments
        .into_iter()
        .filter(|e| e.status != EnrollmentStatus::Dropped)
        .collect();

    for enrollment in &enrollments {
        validate_enrollment(enrollment)?;
    }

    let attendance = if enrollments.is_empty() {
        0.0
    } else {
        enrollments
            .iter()
            .map(|e| e.progress_percentage)
            .sum::<f64>()
            / enrollments.len() as f64
    };

    let engagement = clamp_score(
        activity.tutoring_sessions as f64 * policy.engagement_per_tutoring_session
            + activity.submissions as f64 * policy.engagement_per_submission,
    );

    let mut support_system = policy.support_baseline;
    if support.in_study_group {
        support_system += policy.support_study_group_bonus;
    }
    if support.has_advisor {
        support_system += policy.support_advisor_bonus;
    }

    let mut signals = StudentSignalSet {
        student_id,
        enrollments,
        gpa: policy.default_gpa,
        attendance,
        engagement,
        has_financial_aid,
        support_system: clamp_score(support_system),
    };

    let history = signals.grade_history(policy);
    if !history.is_empty() {
        signals.gpa = history.iter().sum::<f64>() / history.len() as f64;
    }

    Ok(signals)
}

fn validate_enrollment(enrollment: &EnrollmentRecord) -> AssessmentResult<()> {
    let progress = enrollment.progress_percentage;
    if !progress.is_finite() || !(0.0..=100.0).contains(&progress) {
        return Err(AssessmentError::ComputationError(format!(
            "enrollment {} has progress {} outside 0-100",
            enrollment.enrollment_id, progress
        )));
    }

    for submission in &enrollment.submissions {
        if let Some(score) = submission.score {
            if !score.is_finite() || score < 0.0 {
                return Err(AssessmentError::ComputationError(format!(
                    "enrollment {} has invalid submission score {}",
                    enrollment.enrollment_id, score
                )));
            }
        }
    }

    Ok(())
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn engagement_and_support_are_capped() {
        let signals = build_signal_set(
            &RiskPolicy::V1,
            Uuid::new_v4(),
            Vec::new(),
            ActivityCounts {
                tutoring_sessions: 8,
                submissions: 9,
            },
            false,
            SupportIndicators {
                in_study_group: true,
                has_advisor: true,
            },
        )
        .unwrap();

        assert_eq!(signals.engagement, 100.0);
        assert_eq!(signals.support_system, 100.0);
    }

    #[test]
    fn no_course_history_means_zero_attendance() {
        let dropped = enrollment(EnrollmentStatus::Dropped, 80.0, 40, &[90.0]);
        let signals = build_signal_set(
            &RiskPolicy::V1,
            Uuid::new_v4(),
            vec![dropped],
            ActivityCounts::default(),
            false,
            SupportIndicators::default(),
        )
        .unwrap();

        assert!(signals.enrollments.is_empty());
        assert_eq!(signals.attendance, 0.0);
        assert_eq!(signals.gpa, RiskPolicy::V1.default_gpa);
    }

    #[test]
    fn engagement_weights_sessions_and_submissions() {
        let signals = build_signal_set(
            &RiskPolicy::V1,
            Uuid::new_v4(),
            Vec::new(),
            ActivityCounts {
                tutoring_sessions: 2,
                submissions: 3,
            },
            false,
            SupportIndicators {
                in_study_group: true,
                has_advisor: false,
            },
        )
        .unwrap();

        assert_eq!(signals.engagement, 35.0);
        assert_eq!(signals.support_system, 75.0);
    }

    #[test]
    fn gpa_averages_mapped_course_scores() {
        let enrollments = vec![
            enrollment(EnrollmentStatus::Completed, 100.0, 200, &[95.0, 91.0]),
            enrollment(EnrollmentStatus::Completed, 100.0, 100, &[74.0, 72.0]),
            enrollment(EnrollmentStatus::Active, 40.0, 0, &[10.0]),
        ];
        let signals = build_signal_set(
            &RiskPolicy::V1,
            Uuid::new_v4(),
            enrollments,
            ActivityCounts::default(),
            false,
            SupportIndicators::default(),
        )
        .unwrap();

        // course averages 93 -> 4.0 and 73 -> 2.0; the active course is ignored
        assert!((signals.gpa - 3.0).abs() < 1e-9);
        assert_eq!(signals.grade_history(&RiskPolicy::V1), vec![4.0, 2.0]);
        assert!((signals.attendance - 80.0).abs() < 1e-9);
    }

    #[test]
    fn gpa_defaults_without_completed_scored_courses() {
        let enrollments = vec![enrollment(EnrollmentStatus::Active, 50.0, 0, &[40.0])];
        let signals = build_signal_set(
            &RiskPolicy::V1,
            Uuid::new_v4(),
            enrollments,
            ActivityCounts::default(),
            false,
            SupportIndicators::default(),
        )
        .unwrap();

        assert_eq!(signals.gpa, 3.0);
    }

    #[test]
    fn dropped_enrollments_are_excluded() {
        let enrollments = vec![
            enrollment(EnrollmentStatus::Active, 90.0, 0, &[]),
            enrollment(EnrollmentStatus::Dropped, 5.0, 0, &[]),
        ];
        let signals = build_signal_set(
            &RiskPolicy::V1,
            Uuid::new_v4(),
            enrollments,
            ActivityCounts::default(),
            false,
            SupportIndicators::default(),
        )
        .unwrap();

        assert_eq!(signals.enrollments.len(), 1);
        assert_eq!(signals.attendance, 90.0);
    }

    #[test]
    fn negative_score_is_a_computation_error() {
        let enrollments = vec![enrollment(EnrollmentStatus::Active, 50.0, 0, &[-5.0])];
        let result = build_signal_set(
            &RiskPolicy::V1,
            Uuid::new_v4(),
            enrollments,
            ActivityCounts::default(),
            false,
            SupportIndicators::default(),
        );

        assert!(matches!(result, Err(AssessmentError::ComputationError(_))));
    }

    #[test]
    fn on_time_rate_counts_undated_submissions() {
        let mut course = enrollment(EnrollmentStatus::Active, 50.0, 0, &[]);
        course.submissions = vec![
            submission(80.0, 3, false),
            submission(80.0, 2, true),
            SubmissionRecord {
                score: None,
                due_date: None,
                submitted_at: Utc::now(),
            },
        ];
        let signals = build_signal_set(
            &RiskPolicy::V1,
            Uuid::new_v4(),
            vec![course],
            ActivityCounts::default(),
            false,
            SupportIndicators::default(),
        )
        .unwrap();

        let rate = signals.on_time_rate().unwrap();
        assert!((rate - 200.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unknown_student_is_rejected() {
        let source = StaticSource::new(Uuid::new_v4());
        let other = Uuid::new_v4();
        let result = collect_signals(&source, &RiskPolicy::V1, other, TIMEOUT, Utc::now()).await;

        assert!(matches!(result, Err(AssessmentError::InvalidStudent(id)) if id == other));
    }

    #[tokio::test]
    async fn failed_read_fails_collection() {
        let student_id = Uuid::new_v4();
        let source = StaticSource {
            fail_aid_lookup: true,
            ..StaticSource::new(student_id)
        };
        let result =
            collect_signals(&source, &RiskPolicy::V1, student_id, TIMEOUT, Utc::now()).await;

        assert!(matches!(result, Err(AssessmentError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn slow_reads_time_out() {
        let student_id = Uuid::new_v4();
        let source = StaticSource {
            delay: Some(Duration::from_millis(500)),
            ..StaticSource::new(student_id)
        };
        let result = collect_signals(
            &source,
            &RiskPolicy::V1,
            student_id,
            Duration::from_millis(20),
            Utc::now(),
        )
        .await;

        assert!(matches!(result, Err(AssessmentError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn reads_run_concurrently() {
        let recorder = OverlapRecorder::default();
        collect_signals(&recorder, &RiskPolicy::V1, Uuid::new_v4(), TIMEOUT, Utc::now())
            .await
            .unwrap();

        assert!(recorder
            .aid_saw_enrollments_pending
            .load(std::sync::atomic::Ordering::SeqCst));
    }
}
