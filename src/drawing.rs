use std::collections::HashSet;

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::models::{TaTeam, Winner, WinnerStudent, WinnerTeacher};

pub const WEEKLY_WINNER_COUNT: usize = 10;
/// Winners from this many past collections are excluded from the pool.
pub const COLLECTIONS_WITHOUT_REPEAT_WINNERS: i64 = 3;

#[derive(Debug, Clone)]
pub struct DrawingConfig {
    pub winner_count: usize,
    /// Legacy behavior: one student can hold several winning tickets in a
    /// single draw. Set false to select each student at most once.
    pub allow_repeat_winner_within_draw: bool,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            winner_count: WEEKLY_WINNER_COUNT,
            allow_repeat_winner_within_draw: true,
        }
    }
}

/// One lottery ticket. A student holds one ticket per uncounted card, so the
/// pool weights each student by exactly their uncounted card count.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub student_id: Uuid,
    pub student_name: String,
    pub teacher_id: Uuid,
    pub teacher_name: String,
    pub team_id: Uuid,
}

/// Builds the weighted pool. Excluded students are filtered out here, before
/// any shuffle, so their tickets never reach the draw.
pub fn ticket_pool(teams: &[TaTeam], excluded: &HashSet<Uuid>) -> Vec<Ticket> {
    teams
        .iter()
        .flat_map(|team| {
            team.ta_teacher.iter().flat_map(move |teacher| {
                teacher.ta_students.iter().flat_map(move |student| {
                    let copies = if excluded.contains(&student.id) {
                        0
                    } else {
                        student.uncounted_cards as usize
                    };
                    std::iter::repeat(Ticket {
                        student_id: student.id,
                        student_name: student.name.clone(),
                        teacher_id: teacher.id,
                        teacher_name: teacher.name.clone(),
                        team_id: team.id,
                    })
                    .take(copies)
                })
            })
        })
        .collect()
}

/// Fisher-Yates shuffle over the pool, then take winners off the front. A
/// pool smaller than `winner_count` yields every remaining ticket.
pub fn draw_winners<R: Rng>(
    mut pool: Vec<Ticket>,
    config: &DrawingConfig,
    rng: &mut R,
) -> Vec<Winner> {
    pool.shuffle(rng);

    let mut winners = Vec::new();
    let mut already_drawn: HashSet<Uuid> = HashSet::new();
    for ticket in &pool {
        if winners.len() == config.winner_count {
            break;
        }
        if !config.allow_repeat_winner_within_draw && !already_drawn.insert(ticket.student_id) {
            continue;
        }
        winners.push(Winner {
            student: WinnerStudent {
                id: ticket.student_id,
                name: ticket.student_name.clone(),
                ta_teacher: WinnerTeacher {
                    name: ticket.teacher_name.clone(),
                },
            },
            teacher_id: ticket.teacher_id,
            team_id: ticket.team_id,
        });
    }
    winners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Student, TaTeacher};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn student(name: &str, uncounted: u32) -> Student {
        Student {
            id: Uuid::new_v4(),
            name: name.to_string(),
            individual_pbis_level: 0,
            uncounted_cards: uncounted,
            total_cards: uncounted,
        }
    }

    fn one_team(students: Vec<Student>) -> Vec<TaTeam> {
        vec![TaTeam {
            id: Uuid::new_v4(),
            team_name: "Gold".to_string(),
            average_cards_per_student: 0.0,
            current_level: 0,
            ta_teacher: vec![TaTeacher {
                id: Uuid::new_v4(),
                name: "Mr. Vance".to_string(),
                ta_students: students,
                current_ta_winner: None,
                previous_ta_winner: None,
            }],
        }]
    }

    #[test]
    fn ticket_weight_equals_uncounted_count() {
        let teams = one_team(vec![student("A", 3), student("B", 1), student("C", 0)]);
        let a_id = teams[0].ta_teacher[0].ta_students[0].id;
        let pool = ticket_pool(&teams, &HashSet::new());
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.iter().filter(|t| t.student_id == a_id).count(), 3);
    }

    #[test]
    fn short_pool_returns_every_ticket_and_never_the_cardless() {
        let teams = one_team(vec![student("A", 3), student("B", 1), student("C", 0)]);
        let c_id = teams[0].ta_teacher[0].ta_students[2].id;
        let pool = ticket_pool(&teams, &HashSet::new());
        let mut rng = StdRng::seed_from_u64(7);
        let winners = draw_winners(pool, &DrawingConfig::default(), &mut rng);
        assert_eq!(winners.len(), 4);
        assert!(winners.iter().all(|w| w.student.id != c_id));
    }

    #[test]
    fn exclusion_removes_tickets_before_the_draw() {
        let teams = one_team(vec![student("A", 5), student("B", 2)]);
        let a_id = teams[0].ta_teacher[0].ta_students[0].id;
        let excluded: HashSet<Uuid> = [a_id].into_iter().collect();
        let pool = ticket_pool(&teams, &excluded);
        assert_eq!(pool.len(), 2);
        assert!(pool.iter().all(|t| t.student_id != a_id));
    }

    #[test]
    fn repeat_winners_allowed_by_default() {
        let teams = one_team(vec![student("A", 6)]);
        let a_id = teams[0].ta_teacher[0].ta_students[0].id;
        let pool = ticket_pool(&teams, &HashSet::new());
        let mut rng = StdRng::seed_from_u64(11);
        let config = DrawingConfig {
            winner_count: 3,
            allow_repeat_winner_within_draw: true,
        };
        let winners = draw_winners(pool, &config, &mut rng);
        assert_eq!(winners.len(), 3);
        assert!(winners.iter().all(|w| w.student.id == a_id));
    }

    #[test]
    fn dedup_selects_each_student_at_most_once() {
        let teams = one_team(vec![student("A", 6), student("B", 4)]);
        let pool = ticket_pool(&teams, &HashSet::new());
        let config = DrawingConfig {
            winner_count: 10,
            allow_repeat_winner_within_draw: false,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let winners = draw_winners(pool, &config, &mut rng);
        assert_eq!(winners.len(), 2);
        let ids: HashSet<Uuid> = winners.iter().map(|w| w.student.id).collect();
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn empty_pool_draws_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let winners = draw_winners(Vec::new(), &DrawingConfig::default(), &mut rng);
        assert!(winners.is_empty());
    }

    #[test]
    fn seeded_draws_are_deterministic() {
        let teams = one_team(vec![student("A", 4), student("B", 4), student("C", 4)]);
        let config = DrawingConfig {
            winner_count: 2,
            allow_repeat_winner_within_draw: true,
        };
        let first = draw_winners(
            ticket_pool(&teams, &HashSet::new()),
            &config,
            &mut StdRng::seed_from_u64(42),
        );
        let second = draw_winners(
            ticket_pool(&teams, &HashSet::new()),
            &config,
            &mut StdRng::seed_from_u64(42),
        );
        let first_ids: Vec<Uuid> = first.iter().map(|w| w.student.id).collect();
        let second_ids: Vec<Uuid> = second.iter().map(|w| w.student.id).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn winners_carry_teacher_context() {
        let teams = one_team(vec![student("A", 1)]);
        let pool = ticket_pool(&teams, &HashSet::new());
        let mut rng = StdRng::seed_from_u64(5);
        let winners = draw_winners(pool, &DrawingConfig::default(), &mut rng);
        assert_eq!(winners[0].student.ta_teacher.name, "Mr. Vance");
        assert_eq!(winners[0].teacher_id, teams[0].ta_teacher[0].id);
    }
}
