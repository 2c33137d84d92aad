use std::collections::HashSet;

use anyhow::bail;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::batch;
use crate::drawing::{self, DrawingConfig};
use crate::levels;
use crate::models::{
    CardCountedData, PersonalLevelUp, TaTeam, TeacherWinnerData, TeamLevelData, TeamSummary,
    UncountedCard, UpdateInstruction, Winner,
};

#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub drawing: DrawingConfig,
    pub chunk_size: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            drawing: DrawingConfig::default(),
            chunk_size: batch::DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Everything one collection run produces: human-facing summaries plus the
/// instruction batches the persistence layer executes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOutcome {
    pub team_summaries: Vec<TeamSummary>,
    pub level_ups: Vec<PersonalLevelUp>,
    pub winners: Vec<Winner>,
    pub team_goal: u32,
    pub team_updates: Vec<UpdateInstruction<TeamLevelData>>,
    pub winner_updates: Vec<UpdateInstruction<TeacherWinnerData>>,
    pub card_update_batches: Vec<Vec<UpdateInstruction<CardCountedData>>>,
}

/// Runs one collection event over an in-memory snapshot: team metrics, then
/// personal levels, then the drawing, then the goal, then the persistence
/// batches. The snapshot is never mutated; every result is a fresh value.
pub fn run_collection<R: Rng>(
    snapshot: &[TaTeam],
    uncounted_cards: &[UncountedCard],
    excluded_students: &HashSet<Uuid>,
    config: &CollectionConfig,
    rng: &mut R,
) -> anyhow::Result<CollectionOutcome> {
    if snapshot.is_empty() {
        bail!("cannot run a collection with zero TA teams; the school-wide goal would be undefined");
    }

    let team_summaries = levels::team_summaries(snapshot);
    let level_ups = levels::personal_level_ups(snapshot);

    let pool = drawing::ticket_pool(snapshot, excluded_students);
    let winners = drawing::draw_winners(pool, &config.drawing, rng);

    let Some(lowest) = levels::lowest_team_level(&team_summaries) else {
        bail!("no team levels available to derive a school-wide goal");
    };
    let team_goal = levels::new_team_goal(lowest);

    let team_updates = batch::team_level_updates(&team_summaries);
    let winner_updates = batch::teacher_winner_updates(&winners, snapshot);
    let card_update_batches = batch::chunk(
        batch::card_counted_updates(uncounted_cards),
        config.chunk_size,
    );

    Ok(CollectionOutcome {
        team_summaries,
        level_ups,
        winners,
        team_goal,
        team_updates,
        winner_updates,
        card_update_batches,
    })
}
