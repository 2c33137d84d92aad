use std::collections::HashSet;

use uuid::Uuid;

use crate::models::{
    CardCountedData, RecordRef, TaTeam, TeacherWinnerData, TeamLevelData, TeamSummary,
    UncountedCard, UpdateInstruction, Winner,
};

/// Downstream batch-size limit for card updates.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// One instruction per teacher with a drawn winner: the winning student takes
/// the `currentTaWinner` slot and the teacher's existing winner rolls into
/// `previousTaWinner`. When several tickets for the same teacher win, the
/// first one drawn claims the slot.
pub fn teacher_winner_updates(
    winners: &[Winner],
    snapshot: &[TaTeam],
) -> Vec<UpdateInstruction<TeacherWinnerData>> {
    let mut claimed: HashSet<Uuid> = HashSet::new();
    winners
        .iter()
        .filter(|winner| claimed.insert(winner.teacher_id))
        .map(|winner| {
            let previous = snapshot
                .iter()
                .flat_map(|team| team.ta_teacher.iter())
                .find(|teacher| teacher.id == winner.teacher_id)
                .and_then(|teacher| teacher.current_ta_winner);
            UpdateInstruction {
                target: RecordRef { id: winner.teacher_id },
                data: TeacherWinnerData {
                    current_ta_winner: winner.student.id,
                    previous_ta_winner: previous,
                },
            }
        })
        .collect()
}

pub fn team_level_updates(summaries: &[TeamSummary]) -> Vec<UpdateInstruction<TeamLevelData>> {
    summaries
        .iter()
        .map(|summary| UpdateInstruction {
            target: RecordRef { id: summary.id },
            data: TeamLevelData {
                current_level: summary.current_ta_level,
                average_cards_per_student: summary.average_cards_per_student,
            },
        })
        .collect()
}

/// Marking an already-counted card counted again is a no-op downstream, so
/// these instructions are safe to retry.
pub fn card_counted_updates(cards: &[UncountedCard]) -> Vec<UpdateInstruction<CardCountedData>> {
    cards
        .iter()
        .map(|card| UpdateInstruction {
            target: RecordRef { id: card.id },
            data: CardCountedData { counted: true },
        })
        .collect()
}

/// Splits a batch into groups of at most `size` instructions.
pub fn chunk<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut chunks: Vec<Vec<T>> = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::new();
    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
