//! Local counter derivation

use chrono::NaiveDate;
use quest_types::{Goal, LocalSnapshot, Task};
use std::collections::BTreeSet;

/// Derive the local counters from records
///
/// Pending records do not count. The streak is the run of consecutive
/// days with a completed task, ending today or yesterday.
#[must_use]
pub fn derive_snapshot(tasks: &[Task], goals: &[Goal], today: NaiveDate) -> LocalSnapshot {
    let tasks_completed = tasks.iter().filter(|t| t.completed).count() as u64;
    let weekly_goals = goals.iter().filter(|g| g.completed).count() as u64;

    let days: BTreeSet<NaiveDate> = tasks
        .iter()
        .filter(|t| t.completed)
        .filter_map(|t| t.completed_at)
        .map(|at| at.date_naive())
        .collect();

    LocalSnapshot {
        tasks_completed,
        streak: streak_ending(&days, today),
        weekly_goals,
    }
}

fn streak_ending(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u64 {
    let start = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    let mut cursor = Some(start);
    while let Some(day) = cursor.filter(|d| days.contains(d)) {
        streak += 1;
        cursor = day.pred_opt();
    }
    streak
}
