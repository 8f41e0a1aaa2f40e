use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::effectiveness::AssessmentLog;
use crate::error::{AssessmentError, AssessmentResult};
use crate::models::{
    EffectivenessRecord, EnrollmentRecord, EnrollmentStatus, RiskAssessment, StudentSummary,
    SubmissionRecord,
};
use crate::signals::{ActivityCounts, SignalSource, SupportIndicators};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let students = vec![
        (
            Uuid::parse_str("7a1c9e42-5b3d-4f80-a6e2-1d9c48f07b35")?,
            "Tobias Lindqvist",
            "tobias.lindqvist@example.edu",
        ),
        (
            Uuid::parse_str("c4e86b1f-92a7-4d3c-b5f0-6e2a17d9c840")?,
            "Marisol Ocampo",
            "marisol.ocampo@example.edu",
        ),
        (
            Uuid::parse_str("19f3d2a8-e6c4-4b71-8d05-a37b5e0c6f92")?,
            "Ife Adeyemi",
            "ife.adeyemi@example.edu",
        ),
    ];

    for (id, name, email) in students {
        sqlx::query(
            r#"
            INSERT INTO risk_engine.students (id, full_name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET full_name = EXCLUDED.full_name
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .execute(pool)
        .await?;
    }

    let now = Utc::now();
    // (email, course, status, progress, completed days ago, scores, late submissions)
    let courses = vec![
        (
            "tobias.lindqvist@example.edu",
            "Biblical Hebrew I",
            "completed",
            100.0,
            Some(120),
            vec![58.0, 61.0, 55.0],
            true,
        ),
        (
            "tobias.lindqvist@example.edu",
            "Church History",
            "active",
            45.0,
            None,
            vec![52.0, 48.0],
            true,
        ),
        (
            "marisol.ocampo@example.edu",
            "Systematic Theology",
            "completed",
            100.0,
            Some(90),
            vec![78.0, 74.0, 81.0],
            false,
        ),
        (
            "marisol.ocampo@example.edu",
            "Homiletics",
            "active",
            72.0,
            None,
            vec![70.0, 66.0],
            false,
        ),
        (
            "ife.adeyemi@example.edu",
            "New Testament Greek",
            "completed",
            100.0,
            Some(150),
            vec![95.0, 97.0, 93.0],
            false,
        ),
        (
            "ife.adeyemi@example.edu",
            "Ethics",
            "active",
            92.0,
            None,
            vec![94.0, 91.0],
            false,
        ),
    ];

    for (email, course, status, progress, completed_days_ago, scores, late) in courses {
        let student_id = student_id_for(pool, email).await?;
        let completed_at = completed_days_ago.map(|days| now - Duration::days(days));
        let enrollment_id = upsert_enrollment(
            pool,
            student_id,
            course,
            status,
            progress,
            completed_at,
        )
        .await?;

        let last_submission = completed_at.unwrap_or(now);
        for (index, score) in scores.iter().enumerate() {
            let submitted_at = last_submission - Duration::days(7 * (scores.len() - index) as i64);
            let due_date = if late {
                submitted_at - Duration::days(2)
            } else {
                submitted_at + Duration::days(1)
            };
            insert_submission(
                pool,
                enrollment_id,
                Some(*score),
                Some(due_date),
                submitted_at,
                &format!("seed-{email}-{course}-{index}"),
            )
            .await?;
        }
    }

    let ife = student_id_for(pool, "ife.adeyemi@example.edu").await?;
    let marisol = student_id_for(pool, "marisol.ocampo@example.edu").await?;

    for (student_id, sessions) in [(ife, 4), (marisol, 1)] {
        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM risk_engine.tutoring_sessions WHERE student_id = $1",
        )
        .bind(student_id)
        .fetch_one(pool)
        .await?;
        if existing > 0 {
            continue;
        }

        for day in 0..sessions {
            sqlx::query(
                "INSERT INTO risk_engine.tutoring_sessions (id, student_id, started_at) VALUES ($1, $2, $3)",
            )
            .bind(Uuid::new_v4())
            .bind(student_id)
            .bind(now - Duration::days(3 + day * 5))
            .execute(pool)
            .await?;
        }
    }

    sqlx::query(
        r#"
        INSERT INTO risk_engine.financial_aid_awards (id, student_id, award_name)
        SELECT $1, $2, 'Merit Scholarship'
        WHERE NOT EXISTS (
            SELECT 1 FROM risk_engine.financial_aid_awards WHERE student_id = $2
        )
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(ife)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO risk_engine.study_group_members (student_id, group_name)
        VALUES ($1, 'Greek Reading Circle')
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(ife)
    .execute(pool)
    .await?;

    for (student_id, advisor) in [(ife, "Dr. Ruth Okafor"), (marisol, "Dr. Ruth Okafor")] {
        sqlx::query(
            r#"
            INSERT INTO risk_engine.advisor_assignments (student_id, advisor_name)
            VALUES ($1, $2)
            ON CONFLICT (student_id) DO UPDATE SET advisor_name = EXCLUDED.advisor_name
            "#,
        )
        .bind(student_id)
        .bind(advisor)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn list_students(pool: &PgPool) -> anyhow::Result<Vec<StudentSummary>> {
    let rows = sqlx::query(
        "SELECT id, full_name, email FROM risk_engine.students ORDER BY full_name",
    )
    .fetch_all(pool)
    .await
    .context("failed to list students")?;

    Ok(rows
        .into_iter()
        .map(|row| StudentSummary {
            id: row.get("id"),
            full_name: row.get("full_name"),
            email: row.get("email"),
        })
        .collect())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        course_title: String,
        course_status: String,
        progress_percentage: f64,
        completed_at: Option<DateTime<Utc>>,
        score: Option<f64>,
        due_date: Option<DateTime<Utc>>,
        submitted_at: DateTime<Utc>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        if EnrollmentStatus::parse(&row.course_status).is_none() {
            anyhow::bail!(
                "unknown course status {:?} for {}",
                row.course_status,
                row.email
            );
        }

        let student_id: Uuid = sqlx::query(
            r#"
            INSERT INTO risk_engine.students (id, full_name, email)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE SET full_name = EXCLUDED.full_name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.full_name)
        .bind(&row.email)
        .fetch_one(pool)
        .await?
        .get("id");

        let enrollment_id = upsert_enrollment(
            pool,
            student_id,
            &row.course_title,
            &row.course_status.to_lowercase(),
            row.progress_percentage,
            row.completed_at,
        )
        .await?;

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_submission(
            pool,
            enrollment_id,
            row.score,
            row.due_date,
            row.submitted_at,
            &source_key,
        )
        .await?
        {
            inserted += 1;
        }
    }

    tracing::info!(path = %csv_path.display(), inserted, "submission import finished");
    Ok(inserted)
}

async fn student_id_for(pool: &PgPool, email: &str) -> anyhow::Result<Uuid> {
    let id = sqlx::query("SELECT id FROM risk_engine.students WHERE email = $1")
        .bind(email)
        .fetch_one(pool)
        .await
        .with_context(|| format!("no student with email {email}"))?
        .get("id");
    Ok(id)
}

async fn upsert_enrollment(
    pool: &PgPool,
    student_id: Uuid,
    course_title: &str,
    status: &str,
    progress: f64,
    completed_at: Option<DateTime<Utc>>,
) -> anyhow::Result<Uuid> {
    let id = sqlx::query(
        r#"
        INSERT INTO risk_engine.enrollments
        (id, student_id, course_title, status, progress_percentage, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (student_id, course_title) DO UPDATE
        SET status = EXCLUDED.status,
            progress_percentage = EXCLUDED.progress_percentage,
            completed_at = COALESCE(EXCLUDED.completed_at, risk_engine.enrollments.completed_at)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(student_id)
    .bind(course_title)
    .bind(status)
    .bind(progress)
    .bind(completed_at)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

/// Returns whether a new row was written; replays of a `source_key` are no-ops.
async fn insert_submission(
    pool: &PgPool,
    enrollment_id: Uuid,
    score: Option<f64>,
    due_date: Option<DateTime<Utc>>,
    submitted_at: DateTime<Utc>,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO risk_engine.submissions
        (id, enrollment_id, score, due_date, submitted_at, source_key)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(enrollment_id)
    .bind(score)
    .bind(due_date)
    .bind(submitted_at)
    .bind(source_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Postgres-backed signal source and assessment log.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SignalSource for PgStore {
    async fn student_exists(&self, student_id: Uuid) -> AssessmentResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM risk_engine.students WHERE id = $1)",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn enrollments(&self, student_id: Uuid) -> AssessmentResult<Vec<EnrollmentRecord>> {
        let enrollment_rows = sqlx::query(
            r#"
            SELECT id, course_title, status, progress_percentage, enrolled_at, completed_at
            FROM risk_engine.enrollments
            WHERE student_id = $1
            ORDER BY enrolled_at
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let submission_rows = sqlx::query(
            r#"
            SELECT s.enrollment_id, s.score, s.due_date, s.submitted_at
            FROM risk_engine.submissions s
            JOIN risk_engine.enrollments e ON e.id = s.enrollment_id
            WHERE e.student_id = $1
            ORDER BY s.submitted_at
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        let mut submissions: HashMap<Uuid, Vec<SubmissionRecord>> = HashMap::new();
        for row in submission_rows {
            submissions
                .entry(row.try_get("enrollment_id")?)
                .or_default()
                .push(SubmissionRecord {
                    score: row.try_get("score")?,
                    due_date: row.try_get("due_date")?,
                    submitted_at: row.try_get("submitted_at")?,
                });
        }

        let mut enrollments = Vec::with_capacity(enrollment_rows.len());
        for row in enrollment_rows {
            let enrollment_id: Uuid = row.try_get("id")?;
            let status: String = row.try_get("status")?;
            let status = EnrollmentStatus::parse(&status).ok_or_else(|| {
                AssessmentError::ComputationError(format!(
                    "enrollment {enrollment_id} has unknown status {status:?}"
                ))
            })?;

            enrollments.push(EnrollmentRecord {
                enrollment_id,
                course_title: row.try_get("course_title")?,
                status,
                progress_percentage: row.try_get("progress_percentage")?,
                enrolled_at: row.try_get("enrolled_at")?,
                completed_at: row.try_get("completed_at")?,
                submissions: submissions.remove(&enrollment_id).unwrap_or_default(),
            });
        }

        Ok(enrollments)
    }

    async fn activity_counts(
        &self,
        student_id: Uuid,
        since: DateTime<Utc>,
    ) -> AssessmentResult<ActivityCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM risk_engine.tutoring_sessions
                 WHERE student_id = $1 AND started_at >= $2) AS tutoring_sessions,
                (SELECT COUNT(*) FROM risk_engine.submissions s
                 JOIN risk_engine.enrollments e ON e.id = s.enrollment_id
                 WHERE e.student_id = $1
                   AND e.status <> 'dropped'
                   AND s.submitted_at >= $2) AS submissions
            "#,
        )
        .bind(student_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        let tutoring: i64 = row.try_get("tutoring_sessions")?;
        let submissions: i64 = row.try_get("submissions")?;
        Ok(ActivityCounts {
            tutoring_sessions: u32::try_from(tutoring).unwrap_or(u32::MAX),
            submissions: u32::try_from(submissions).unwrap_or(u32::MAX),
        })
    }

    async fn has_financial_aid(&self, student_id: Uuid) -> AssessmentResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM risk_engine.financial_aid_awards WHERE student_id = $1)",
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn support_indicators(&self, student_id: Uuid) -> AssessmentResult<SupportIndicators> {
        let row = sqlx::query(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM risk_engine.study_group_members WHERE student_id = $1)
                    AS in_study_group,
                EXISTS (SELECT 1 FROM risk_engine.advisor_assignments WHERE student_id = $1)
                    AS has_advisor
            "#,
        )
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(SupportIndicators {
            in_study_group: row.try_get("in_study_group")?,
            has_advisor: row.try_get("has_advisor")?,
        })
    }
}

#[async_trait]
impl AssessmentLog for PgStore {
    async fn latest_assessment(
        &self,
        student_id: Uuid,
    ) -> AssessmentResult<Option<RiskAssessment>> {
        let row = sqlx::query(
            r#"
            SELECT payload FROM risk_engine.risk_assessments
            WHERE student_id = $1
            ORDER BY assessed_at DESC
            LIMIT 1
            "#,
        )
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let Json(assessment): Json<RiskAssessment> = row.try_get("payload")?;
                Ok(Some(assessment))
            }
            None => Ok(None),
        }
    }

    async fn record_assessment(&self, assessment: &RiskAssessment) -> AssessmentResult<()> {
        sqlx::query(
            r#"
            INSERT INTO risk_engine.risk_assessments
            (id, student_id, assessed_at, overall_risk_level, payload)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(assessment.student_id)
        .bind(assessment.assessment_date)
        .bind(assessment.overall_risk_level.as_str())
        .bind(Json(assessment))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_effectiveness(&self, record: &EffectivenessRecord) -> AssessmentResult<()> {
        sqlx::query(
            r#"
            INSERT INTO risk_engine.effectiveness_records
            (id, student_id, intervention_id, effective, improvement, notes, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.student_id)
        .bind(&record.intervention_id)
        .bind(record.effective)
        .bind(record.improvement)
        .bind(&record.notes)
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
