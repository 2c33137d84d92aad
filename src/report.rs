use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{LatestCollection, TaTeam, UncountedCard};
use crate::totals;

/// Canonical card categories, in report order.
pub const CARD_CATEGORIES: &[&str] = &[
    "respect",
    "responsibility",
    "perseverance",
    "kindness",
    "safety",
];

pub fn build_report(
    as_of: NaiveDate,
    teams: &[TaTeam],
    uncounted: &[UncountedCard],
    latest: Option<&LatestCollection>,
) -> String {
    let category_totals = totals::tally_by(CARD_CATEGORIES, uncounted, |card| {
        card.category.as_deref()
    });

    let mut output = String::new();

    let _ = writeln!(output, "# PBIS Collection Report");
    let _ = writeln!(output, "Generated {as_of}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Card Category Mix");

    if uncounted.is_empty() {
        let _ = writeln!(output, "No uncounted cards this cycle.");
    } else {
        for total in &category_totals {
            let _ = writeln!(output, "- {}: {} cards", total.word, total.total);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Team Standings");

    if teams.is_empty() {
        let _ = writeln!(output, "No TA teams registered.");
    } else {
        let mut standings: Vec<&TaTeam> = teams.iter().collect();
        standings.sort_by(|a, b| {
            b.current_level
                .cmp(&a.current_level)
                .then_with(|| a.team_name.cmp(&b.team_name))
        });
        for team in standings {
            let students: usize = team.ta_teacher.iter().map(|t| t.ta_students.len()).sum();
            let uncounted: u32 = team
                .ta_teacher
                .iter()
                .flat_map(|t| t.ta_students.iter())
                .map(|s| s.uncounted_cards)
                .sum();
            let _ = writeln!(
                output,
                "- {}: level {} (avg {:.1} cards/student, {} students, {} uncounted)",
                team.team_name,
                team.current_level,
                team.average_cards_per_student,
                students,
                uncounted
            );
        }
    }

    let mut earners: Vec<(&str, u32)> = teams
        .iter()
        .flat_map(|team| team.ta_teacher.iter())
        .flat_map(|teacher| teacher.ta_students.iter())
        .filter(|student| student.uncounted_cards > 0)
        .map(|student| (student.name.as_str(), student.uncounted_cards))
        .collect();
    earners.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Card Earners");

    if earners.is_empty() {
        let _ = writeln!(output, "No cards earned this cycle.");
    } else {
        for (name, cards) in earners.iter().take(5) {
            let _ = writeln!(output, "- {name}: {cards} uncounted cards");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Collection");

    match latest {
        None => {
            let _ = writeln!(output, "No collection has run yet.");
        }
        Some(latest) => {
            let _ = writeln!(
                output,
                "Collected on {}; next school-wide goal: level {}.",
                latest.collected_on, latest.team_goal
            );
            for winner in &latest.winners {
                let _ = writeln!(
                    output,
                    "- {} ({})",
                    winner.student_name, winner.teacher_name
                );
            }
        }
    }

    output
}
