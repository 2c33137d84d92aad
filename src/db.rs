use std::collections::{HashMap, HashSet};

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::collection::CollectionOutcome;
use crate::levels;
use crate::models::{
    CollectionWinnerRow, LatestCollection, Student, TaTeacher, TaTeam, UncountedCard,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let teams = vec![
        (
            Uuid::parse_str("7b1e7a90-55c1-4f05-9a6d-1d4c2a6f03b1")?,
            "Bulldog Blue",
        ),
        (
            Uuid::parse_str("4f9b3a12-8c55-4e2a-b7d9-6a0e5f21c844")?,
            "Bulldog Gold",
        ),
    ];

    for (id, team_name) in &teams {
        sqlx::query(
            r#"
            INSERT INTO pbis.ta_teams (id, team_name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(team_name)
        .execute(pool)
        .await?;
    }

    let teachers = vec![
        (
            Uuid::parse_str("9d2f6c3e-0b74-4aa1-86d4-2f8f31c5e9a7")?,
            teams[0].0,
            "Dana Okafor",
        ),
        (
            Uuid::parse_str("c81d4f26-3e9a-4b08-9f57-74a2d0b6e113")?,
            teams[1].0,
            "Miguel Vance",
        ),
    ];

    for (id, team_id, name) in &teachers {
        sqlx::query(
            r#"
            INSERT INTO pbis.ta_teachers (id, team_id, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(team_id)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let students = vec![
        (
            Uuid::parse_str("1a5e8d70-92c4-4f3b-b1a6-08d7e3c254f9")?,
            teachers[0].0,
            "Avery Lee",
        ),
        (
            Uuid::parse_str("6e3c9b51-47d8-4a20-9c15-3b8f60a1d2e4")?,
            teachers[0].0,
            "Jules Moreno",
        ),
        (
            Uuid::parse_str("b74a2d18-65f0-4c9e-8273-5e1da9046cbf")?,
            teachers[1].0,
            "Kiara Patel",
        ),
        (
            Uuid::parse_str("3f80c6a4-d12b-4e57-a968-40b2c791e5d3")?,
            teachers[1].0,
            "Rowan Diaz",
        ),
    ];

    for (id, teacher_id, name) in &students {
        sqlx::query(
            r#"
            INSERT INTO pbis.students (id, teacher_id, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(teacher_id)
        .bind(name)
        .execute(pool)
        .await?;
    }

    let cards = vec![
        ("seed-001", students[0].0, "respect", NaiveDate::from_ymd_opt(2026, 2, 2)),
        ("seed-002", students[0].0, "responsibility", NaiveDate::from_ymd_opt(2026, 2, 3)),
        ("seed-003", students[0].0, "respect", NaiveDate::from_ymd_opt(2026, 2, 5)),
        ("seed-004", students[1].0, "perseverance", NaiveDate::from_ymd_opt(2026, 2, 4)),
        ("seed-005", students[2].0, "kindness", NaiveDate::from_ymd_opt(2026, 2, 2)),
        ("seed-006", students[2].0, "respect", NaiveDate::from_ymd_opt(2026, 2, 6)),
        ("seed-007", students[3].0, "safety", NaiveDate::from_ymd_opt(2026, 2, 6)),
    ];

    for (source_key, student_id, category, issued_on) in cards {
        let issued_on = issued_on.context("invalid date")?;
        sqlx::query(
            r#"
            INSERT INTO pbis.cards (id, student_id, category, counted, issued_on, source_key)
            VALUES ($1, $2, $3, FALSE, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(category)
        .bind(issued_on)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Fetches the denormalized snapshot one collection run consumes: every team
/// with its teachers and students, each student carrying uncounted/lifetime
/// card counts derived from the cards table.
pub async fn fetch_snapshot(pool: &PgPool) -> anyhow::Result<Vec<TaTeam>> {
    let team_rows = sqlx::query(
        "SELECT id, team_name, average_cards_per_student, current_level \
         FROM pbis.ta_teams ORDER BY team_name",
    )
    .fetch_all(pool)
    .await?;

    let teacher_rows = sqlx::query(
        "SELECT id, team_id, name, current_ta_winner, previous_ta_winner \
         FROM pbis.ta_teachers ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    let student_rows = sqlx::query(
        "SELECT s.id, s.teacher_id, s.name, s.individual_pbis_level, \
         COUNT(c.id) FILTER (WHERE NOT c.counted) AS uncounted_cards, \
         COUNT(c.id) AS total_cards \
         FROM pbis.students s \
         LEFT JOIN pbis.cards c ON c.student_id = s.id \
         GROUP BY s.id \
         ORDER BY s.name",
    )
    .fetch_all(pool)
    .await?;

    let mut students_by_teacher: HashMap<Uuid, Vec<Student>> = HashMap::new();
    for row in student_rows {
        let teacher_id: Uuid = row.get("teacher_id");
        students_by_teacher
            .entry(teacher_id)
            .or_default()
            .push(Student {
                id: row.get("id"),
                name: row.get("name"),
                individual_pbis_level: row.get::<i32, _>("individual_pbis_level") as u32,
                uncounted_cards: row.get::<i64, _>("uncounted_cards") as u32,
                total_cards: row.get::<i64, _>("total_cards") as u32,
            });
    }

    let mut teachers_by_team: HashMap<Uuid, Vec<TaTeacher>> = HashMap::new();
    for row in teacher_rows {
        let team_id: Uuid = row.get("team_id");
        let id: Uuid = row.get("id");
        teachers_by_team.entry(team_id).or_default().push(TaTeacher {
            id,
            name: row.get("name"),
            ta_students: students_by_teacher.remove(&id).unwrap_or_default(),
            current_ta_winner: row.get("current_ta_winner"),
            previous_ta_winner: row.get("previous_ta_winner"),
        });
    }

    let mut teams = Vec::with_capacity(team_rows.len());
    for row in team_rows {
        let id: Uuid = row.get("id");
        teams.push(TaTeam {
            id,
            team_name: row.get("team_name"),
            average_cards_per_student: row.get("average_cards_per_student"),
            current_level: row.get::<i32, _>("current_level") as u32,
            ta_teacher: teachers_by_team.remove(&id).unwrap_or_default(),
        });
    }

    Ok(teams)
}

pub async fn fetch_uncounted_cards(pool: &PgPool) -> anyhow::Result<Vec<UncountedCard>> {
    let rows = sqlx::query(
        "SELECT id, student_id, category FROM pbis.cards WHERE NOT counted ORDER BY issued_on",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| UncountedCard {
            id: row.get("id"),
            student_id: row.get("student_id"),
            category: row.get("category"),
        })
        .collect())
}

/// Students who won in any of the last `collections` collection events; their
/// tickets stay out of the next drawing pool.
pub async fn fetch_recent_winner_ids(
    pool: &PgPool,
    collections: i64,
) -> anyhow::Result<HashSet<Uuid>> {
    let rows = sqlx::query(
        "SELECT DISTINCT w.student_id \
         FROM pbis.collection_winners w \
         WHERE w.collection_id IN ( \
             SELECT id FROM pbis.collection_events \
             ORDER BY collected_on DESC LIMIT $1)",
    )
    .bind(collections)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|row| row.get("student_id")).collect())
}

/// Applies one collection outcome in a single transaction. This is the
/// serialization point that keeps two runs from double-counting the same
/// uncounted cards or double-incrementing the cumulative averages.
pub async fn apply_collection(
    pool: &PgPool,
    outcome: &CollectionOutcome,
    collected_on: NaiveDate,
) -> anyhow::Result<Uuid> {
    let mut tx = pool.begin().await?;

    for update in &outcome.team_updates {
        sqlx::query(
            "UPDATE pbis.ta_teams \
             SET current_level = $2, average_cards_per_student = $3 \
             WHERE id = $1",
        )
        .bind(update.target.id)
        .bind(update.data.current_level as i32)
        .bind(update.data.average_cards_per_student)
        .execute(&mut *tx)
        .await?;
    }

    for update in &outcome.winner_updates {
        sqlx::query(
            "UPDATE pbis.ta_teachers \
             SET current_ta_winner = $2, previous_ta_winner = $3 \
             WHERE id = $1",
        )
        .bind(update.target.id)
        .bind(update.data.current_ta_winner)
        .bind(update.data.previous_ta_winner)
        .execute(&mut *tx)
        .await?;
    }

    for level_up in &outcome.level_ups {
        sqlx::query("UPDATE pbis.students SET individual_pbis_level = $2 WHERE id = $1")
            .bind(level_up.id)
            .bind(level_up.individual_pbis_level as i32)
            .execute(&mut *tx)
            .await?;
    }

    for batch in &outcome.card_update_batches {
        let ids: Vec<Uuid> = batch.iter().map(|update| update.target.id).collect();
        sqlx::query("UPDATE pbis.cards SET counted = TRUE WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
    }

    let event_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO pbis.collection_events (id, collected_on, team_goal) VALUES ($1, $2, $3)",
    )
    .bind(event_id)
    .bind(collected_on)
    .bind(outcome.team_goal as i32)
    .execute(&mut *tx)
    .await?;

    for winner in &outcome.winners {
        sqlx::query(
            "INSERT INTO pbis.collection_winners (id, collection_id, student_id, teacher_id) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(event_id)
        .bind(winner.student.id)
        .bind(winner.teacher_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(event_id)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        team_name: String,
        teacher_name: String,
        student_name: String,
        category: Option<String>,
        issued_on: NaiveDate,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;

        let team_id: Uuid = sqlx::query(
            r#"
            INSERT INTO pbis.ta_teams (id, team_name)
            VALUES ($1, $2)
            ON CONFLICT (team_name) DO UPDATE
            SET team_name = EXCLUDED.team_name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.team_name)
        .fetch_one(pool)
        .await?
        .get("id");

        let teacher_id: Uuid = sqlx::query(
            r#"
            INSERT INTO pbis.ta_teachers (id, team_id, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE
            SET team_id = EXCLUDED.team_id
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(team_id)
        .bind(&row.teacher_name)
        .fetch_one(pool)
        .await?
        .get("id");

        let student_id: Uuid = sqlx::query(
            r#"
            INSERT INTO pbis.students (id, teacher_id, name)
            VALUES ($1, $2, $3)
            ON CONFLICT (teacher_id, name) DO UPDATE
            SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(teacher_id)
        .bind(&row.student_name)
        .fetch_one(pool)
        .await?
        .get("id");

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO pbis.cards (id, student_id, category, counted, issued_on, source_key)
            VALUES ($1, $2, $3, FALSE, $4, $5)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student_id)
        .bind(&row.category)
        .bind(row.issued_on)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

/// Recomputes one student's personal level from their lifetime card count and
/// persists it. Returns the student's name and new level, or None when the
/// id is unknown.
pub async fn recalculate_student(
    pool: &PgPool,
    student_id: Uuid,
) -> anyhow::Result<Option<(String, u32)>> {
    let row = sqlx::query(
        "SELECT s.name, COUNT(c.id) AS total_cards \
         FROM pbis.students s \
         LEFT JOIN pbis.cards c ON c.student_id = s.id \
         WHERE s.id = $1 \
         GROUP BY s.id",
    )
    .bind(student_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let total_cards = row.get::<i64, _>("total_cards") as u32;
    let level = levels::personal_level(total_cards);

    sqlx::query("UPDATE pbis.students SET individual_pbis_level = $2 WHERE id = $1")
        .bind(student_id)
        .bind(level as i32)
        .execute(pool)
        .await?;

    Ok(Some((row.get("name"), level)))
}

pub async fn fetch_latest_collection(pool: &PgPool) -> anyhow::Result<Option<LatestCollection>> {
    let event = sqlx::query(
        "SELECT id, collected_on, team_goal FROM pbis.collection_events \
         ORDER BY collected_on DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    let Some(event) = event else {
        return Ok(None);
    };

    let event_id: Uuid = event.get("id");
    let winner_rows = sqlx::query(
        "SELECT s.name AS student_name, t.name AS teacher_name \
         FROM pbis.collection_winners w \
         JOIN pbis.students s ON s.id = w.student_id \
         JOIN pbis.ta_teachers t ON t.id = w.teacher_id \
         WHERE w.collection_id = $1 \
         ORDER BY s.name",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(LatestCollection {
        collected_on: event.get("collected_on"),
        team_goal: event.get::<i32, _>("team_goal") as u32,
        winners: winner_rows
            .into_iter()
            .map(|row| CollectionWinnerRow {
                student_name: row.get("student_name"),
                teacher_name: row.get("teacher_name"),
            })
            .collect(),
    }))
}
