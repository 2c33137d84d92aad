use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One student inside a collection snapshot. `uncounted_cards` is the number
/// of cards earned since the last collection; `total_cards` is lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub individual_pbis_level: u32,
    pub uncounted_cards: u32,
    pub total_cards: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaTeacher {
    pub id: Uuid,
    pub name: String,
    pub ta_students: Vec<Student>,
    pub current_ta_winner: Option<Uuid>,
    pub previous_ta_winner: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaTeam {
    pub id: Uuid,
    pub team_name: String,
    pub average_cards_per_student: f64,
    pub current_level: u32,
    pub ta_teacher: Vec<TaTeacher>,
}

/// A card row not yet folded into a collection. Needed both for the
/// counted-flag instructions and for the category breakdown in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncountedCard {
    pub id: Uuid,
    pub student_id: Uuid,
    pub category: Option<String>,
}

/// Per-team result of one collection run. `average_cards_per_student` is the
/// new cumulative value (prior average plus this run's per-student average).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub id: Uuid,
    pub name: String,
    pub average_cards_per_student: f64,
    pub number_of_students: usize,
    pub current_ta_level: u32,
    pub is_new_level: bool,
}

/// A student who crossed a personal level threshold during this run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalLevelUp {
    pub id: Uuid,
    pub name: String,
    pub individual_pbis_level: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub student: WinnerStudent,
    #[serde(skip)]
    pub teacher_id: Uuid,
    #[serde(skip)]
    pub team_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerStudent {
    pub id: Uuid,
    pub name: String,
    pub ta_teacher: WinnerTeacher,
}

#[derive(Debug, Clone, Serialize)]
pub struct WinnerTeacher {
    pub name: String,
}

/// Generic update-by-id instruction consumed by the persistence layer.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateInstruction<T> {
    #[serde(rename = "where")]
    pub target: RecordRef,
    pub data: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordRef {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamLevelData {
    pub current_level: u32,
    pub average_cards_per_student: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherWinnerData {
    pub current_ta_winner: Uuid,
    pub previous_ta_winner: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardCountedData {
    pub counted: bool,
}

/// Read model for the most recent collection event, used by reports.
#[derive(Debug, Clone)]
pub struct LatestCollection {
    pub collected_on: chrono::NaiveDate,
    pub team_goal: u32,
    pub winners: Vec<CollectionWinnerRow>,
}

#[derive(Debug, Clone)]
pub struct CollectionWinnerRow {
    pub student_name: String,
    pub teacher_name: String,
}
