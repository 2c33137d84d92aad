use crate::models::{PersonalLevelUp, TaTeam, TeamSummary};

/// Cumulative average cards-per-student needed per team level.
pub const CARDS_PER_TA_LEVEL: f64 = 24.0;
/// Lifetime cards needed per personal level.
pub const CARDS_PER_PERSONAL_LEVEL: u32 = 75;
/// How far past the lowest team the school-wide goal sits.
pub const LEVELS_PER_SCHOOL_WIDE_LEVEL: u32 = 2;

pub fn team_summaries(teams: &[TaTeam]) -> Vec<TeamSummary> {
    teams.iter().map(summarize_team).collect()
}

fn summarize_team(team: &TaTeam) -> TeamSummary {
    let new_cards: u32 = team
        .ta_teacher
        .iter()
        .flat_map(|teacher| teacher.ta_students.iter())
        .map(|student| student.uncounted_cards)
        .sum();
    let number_of_students: usize = team
        .ta_teacher
        .iter()
        .map(|teacher| teacher.ta_students.len())
        .sum();

    // An empty team contributes nothing this run. Dividing by zero here would
    // poison the persisted cumulative average with NaN for every later run.
    let new_average = if number_of_students == 0 {
        0.0
    } else {
        f64::from(new_cards) / number_of_students as f64
    };

    let total_average = team.average_cards_per_student + new_average;
    let current_ta_level = (total_average / CARDS_PER_TA_LEVEL).floor() as u32;

    TeamSummary {
        id: team.id,
        name: team.team_name.clone(),
        average_cards_per_student: total_average,
        number_of_students,
        current_ta_level,
        is_new_level: current_ta_level > team.current_level,
    }
}

pub fn personal_level(total_cards: u32) -> u32 {
    total_cards / CARDS_PER_PERSONAL_LEVEL
}

/// Students whose lifetime total crossed a personal threshold this run.
/// Students already at their computed level are dropped from the output.
pub fn personal_level_ups(teams: &[TaTeam]) -> Vec<PersonalLevelUp> {
    teams
        .iter()
        .flat_map(|team| team.ta_teacher.iter())
        .flat_map(|teacher| teacher.ta_students.iter())
        .filter_map(|student| {
            let new_level = personal_level(student.total_cards);
            (new_level > student.individual_pbis_level).then(|| PersonalLevelUp {
                id: student.id,
                name: student.name.clone(),
                individual_pbis_level: new_level,
            })
        })
        .collect()
}

/// None when no teams exist; the caller must reject that case instead of
/// computing a goal.
pub fn lowest_team_level(summaries: &[TeamSummary]) -> Option<u32> {
    summaries.iter().map(|s| s.current_ta_level).min()
}

pub fn new_team_goal(lowest_level: u32) -> u32 {
    lowest_level + LEVELS_PER_SCHOOL_WIDE_LEVEL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Student, TaTeacher, TeamSummary};
    use uuid::Uuid;

    fn student(uncounted: u32, total: u32, level: u32) -> Student {
        Student {
            id: Uuid::new_v4(),
            name: "Riley Cho".to_string(),
            individual_pbis_level: level,
            uncounted_cards: uncounted,
            total_cards: total,
        }
    }

    fn team(students: Vec<Student>, average: f64, level: u32) -> TaTeam {
        TaTeam {
            id: Uuid::new_v4(),
            team_name: "Blue".to_string(),
            average_cards_per_student: average,
            current_level: level,
            ta_teacher: vec![TaTeacher {
                id: Uuid::new_v4(),
                name: "Ms. Okafor".to_string(),
                ta_students: students,
                current_ta_winner: None,
                previous_ta_winner: None,
            }],
        }
    }

    fn summary(level: u32) -> TeamSummary {
        TeamSummary {
            id: Uuid::new_v4(),
            name: "Blue".to_string(),
            average_cards_per_student: 0.0,
            number_of_students: 0,
            current_ta_level: level,
            is_new_level: false,
        }
    }

    #[test]
    fn personal_level_follows_flat_threshold() {
        assert_eq!(personal_level(10), 0);
        assert_eq!(personal_level(30), 0);
        assert_eq!(personal_level(74), 0);
        assert_eq!(personal_level(75), 1);
        assert_eq!(personal_level(80), 1);
        assert_eq!(personal_level(150), 2);
    }

    #[test]
    fn personal_level_is_monotonic() {
        let mut last = 0;
        for total in 0..500 {
            let level = personal_level(total);
            assert!(level >= last);
            last = level;
        }
    }

    #[test]
    fn level_ups_only_include_promoted_students() {
        let teams = vec![team(
            vec![student(0, 80, 0), student(0, 80, 1), student(0, 30, 0)],
            0.0,
            0,
        )];
        let ups = personal_level_ups(&teams);
        assert_eq!(ups.len(), 1);
        assert_eq!(ups[0].individual_pbis_level, 1);
    }

    #[test]
    fn team_average_accumulates_and_levels_up() {
        let students: Vec<Student> = (0..10).map(|_| student(24, 24, 0)).collect();
        let teams = vec![team(students, 0.0, 0)];
        let summaries = team_summaries(&teams);
        let s = &summaries[0];
        assert_eq!(s.number_of_students, 10);
        assert!((s.average_cards_per_student - 24.0).abs() < f64::EPSILON);
        assert_eq!(s.current_ta_level, 1);
        assert!(s.is_new_level);
    }

    #[test]
    fn prior_average_carries_into_the_new_total() {
        let teams = vec![team(vec![student(12, 12, 0), student(12, 12, 0)], 20.0, 1)];
        let summaries = team_summaries(&teams);
        assert!((summaries[0].average_cards_per_student - 32.0).abs() < f64::EPSILON);
        assert_eq!(summaries[0].current_ta_level, 1);
        assert!(!summaries[0].is_new_level);
    }

    #[test]
    fn empty_team_contributes_zero_not_nan() {
        let teams = vec![team(Vec::new(), 30.0, 1)];
        let summaries = team_summaries(&teams);
        assert!((summaries[0].average_cards_per_student - 30.0).abs() < f64::EPSILON);
        assert_eq!(summaries[0].number_of_students, 0);
        assert!(summaries[0].average_cards_per_student.is_finite());
    }

    #[test]
    fn goal_sits_two_levels_past_the_lowest_team() {
        let summaries = vec![summary(2), summary(5)];
        let lowest = lowest_team_level(&summaries);
        assert_eq!(lowest, Some(2));
        assert_eq!(new_team_goal(2), 4);
    }

    #[test]
    fn no_teams_means_no_goal() {
        assert_eq!(lowest_team_level(&[]), None);
    }
}
