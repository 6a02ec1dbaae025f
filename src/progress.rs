//! Quest Progress
//!
//! Pure calculation of completion for a quest. Fetching the goals, tasks and
//! contributions it reads from happens upstream.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Goal, GoalTask, Quest, QuestContribution, QuestKind, QuestPeriod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestProgress {
    /// 0..=100
    pub percentage: u8,
    pub completed_count: u32,
    pub remaining_count: u32,
    pub total_count: u32,
    pub status: ProgressStatus,
}

impl QuestProgress {
    fn empty() -> Self {
        Self {
            percentage: 0,
            completed_count: 0,
            remaining_count: 0,
            total_count: 0,
            status: ProgressStatus::NotStarted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressInput {
    /// Finished vs total linked goals and tasks
    Linked { completed: u32, total: u32 },
    /// Count reached in the current period vs the target
    Quantitative { target: u32, current: u32 },
}

impl ProgressInput {
    /// Build the input for `quest` from whatever related records are loaded.
    ///
    /// Linked ids with no matching record count as not completed.
    pub fn for_quest(
        quest: &Quest,
        goals: &[Goal],
        tasks: &[GoalTask],
        contributions: &[QuestContribution],
        now: DateTime<Utc>,
    ) -> Self {
        match quest.kind {
            QuestKind::Linked => {
                let done_goals: HashSet<&str> = goals
                    .iter()
                    .filter(|g| g.is_completed())
                    .map(|g| g.id.as_str())
                    .collect();
                let done_tasks: HashSet<&str> = tasks
                    .iter()
                    .filter(|t| t.is_completed())
                    .map(|t| t.id.as_str())
                    .collect();

                let completed = quest
                    .linked_goal_ids
                    .iter()
                    .filter(|id| done_goals.contains(id.as_str()))
                    .chain(
                        quest
                            .linked_task_ids
                            .iter()
                            .filter(|id| done_tasks.contains(id.as_str())),
                    )
                    .count();
                let total = quest.linked_goal_ids.len() + quest.linked_task_ids.len();
                ProgressInput::Linked {
                    completed: saturating_u32(completed),
                    total: saturating_u32(total),
                }
            }
            QuestKind::Quantitative => {
                let current = match quest.period {
                    Some(period) => count_in_period(
                        contributions
                            .iter()
                            .filter(|c| c.quest_id == quest.id)
                            .map(|c| &c.created_at),
                        period,
                        now,
                    ),
                    None => 0,
                };
                ProgressInput::Quantitative {
                    target: quest.target_count.unwrap_or(0),
                    current,
                }
            }
        }
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Events inside the rolling window `(now - period, now]`
pub fn count_in_period<'a, I>(events: I, period: QuestPeriod, now: DateTime<Utc>) -> u32
where
    I: IntoIterator<Item = &'a DateTime<Utc>>,
{
    let start = now - TimeDelta::days(period.days());
    let count = events
        .into_iter()
        .filter(|at| **at > start && **at <= now)
        .count();
    saturating_u32(count)
}

/// A zero total yields 0% and `NotStarted`.
pub fn calculate_progress(input: &ProgressInput) -> QuestProgress {
    let (done, total) = match *input {
        ProgressInput::Linked { completed, total } => (completed, total),
        ProgressInput::Quantitative { target, current } => (current, target),
    };
    if total == 0 {
        return QuestProgress::empty();
    }

    let completed = done.min(total);
    let percentage = (u64::from(completed) * 100 / u64::from(total)).min(100) as u8;
    let status = if completed == 0 {
        ProgressStatus::NotStarted
    } else if completed >= total {
        ProgressStatus::Completed
    } else {
        ProgressStatus::InProgress
    };

    QuestProgress {
        percentage,
        completed_count: completed,
        remaining_count: total - completed,
        total_count: total,
        status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn quantitative(target: u32, current: u32) -> QuestProgress {
        calculate_progress(&ProgressInput::Quantitative { target, current })
    }

    #[test]
    fn test_quantitative_in_progress() {
        let p = quantitative(10, 3);
        assert_eq!(p.percentage, 30);
        assert_eq!(p.completed_count, 3);
        assert_eq!(p.remaining_count, 7);
        assert_eq!(p.total_count, 10);
        assert_eq!(p.status, ProgressStatus::InProgress);
    }

    #[test]
    fn test_quantitative_complete_and_not_started() {
        let done = quantitative(10, 10);
        assert_eq!(done.percentage, 100);
        assert_eq!(done.status, ProgressStatus::Completed);

        let fresh = quantitative(10, 0);
        assert_eq!(fresh.percentage, 0);
        assert_eq!(fresh.status, ProgressStatus::NotStarted);
    }

    #[test]
    fn test_zero_target_is_not_started() {
        assert_eq!(quantitative(0, 5), QuestProgress::empty());
        let linked = calculate_progress(&ProgressInput::Linked {
            completed: 0,
            total: 0,
        });
        assert_eq!(linked.status, ProgressStatus::NotStarted);
    }

    #[test]
    fn test_overshoot_is_clamped() {
        let p = quantitative(4, 9);
        assert_eq!(p.percentage, 100);
        assert_eq!(p.completed_count, 4);
        assert_eq!(p.remaining_count, 0);
    }

    #[test]
    fn test_percentage_rounds_down() {
        let p = calculate_progress(&ProgressInput::Linked {
            completed: 2,
            total: 3,
        });
        assert_eq!(p.percentage, 66);
    }

    #[test]
    fn test_serializes_snake_case_status() {
        let json = serde_json::to_value(quantitative(10, 3)).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert_eq!(json["remainingCount"], 7);
    }

    #[test]
    fn test_count_in_rolling_window() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let events = [
            now - TimeDelta::hours(1),
            now - TimeDelta::days(3),
            now - TimeDelta::days(8),
            now + TimeDelta::hours(1),
        ];
        assert_eq!(count_in_period(&events, QuestPeriod::Daily, now), 1);
        assert_eq!(count_in_period(&events, QuestPeriod::Weekly, now), 2);
        assert_eq!(count_in_period(&events, QuestPeriod::Monthly, now), 3);
    }

    #[test]
    fn test_linked_quest_from_records() {
        let quest: Quest = serde_json::from_value(serde_json::json!({
            "id": "q1",
            "title": "Spring cleaning",
            "kind": "linked",
            "linkedGoalIds": ["g1", "g2"],
            "linkedTaskIds": ["t1", "t-missing"],
        }))
        .unwrap();
        let goals: Vec<Goal> = serde_json::from_value(serde_json::json!([
            { "id": "g1", "title": "Garage", "status": "completed" },
            { "id": "g2", "title": "Attic", "status": "active" },
        ]))
        .unwrap();
        let tasks: Vec<GoalTask> = serde_json::from_value(serde_json::json!([
            { "id": "t1", "goalId": "g2", "title": "Boxes", "status": "completed" },
        ]))
        .unwrap();

        let input = ProgressInput::for_quest(&quest, &goals, &tasks, &[], Utc::now());
        assert_eq!(input, ProgressInput::Linked { completed: 2, total: 4 });
        assert_eq!(calculate_progress(&input).percentage, 50);
    }

    #[test]
    fn test_quantitative_quest_counts_own_contributions() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let quest: Quest = serde_json::from_value(serde_json::json!({
            "id": "q1",
            "title": "Push-ups",
            "kind": "quantitative",
            "targetCount": 5,
            "period": "weekly",
        }))
        .unwrap();
        let contributions: Vec<QuestContribution> = serde_json::from_value(serde_json::json!([
            { "id": "c1", "questId": "q1", "createdAt": "2024-05-09T08:00:00Z" },
            { "id": "c2", "questId": "q1", "createdAt": "2024-05-01T08:00:00Z" },
            { "id": "c3", "questId": "q2", "createdAt": "2024-05-09T09:00:00Z" },
        ]))
        .unwrap();

        let input = ProgressInput::for_quest(&quest, &[], &[], &contributions, now);
        assert_eq!(input, ProgressInput::Quantitative { target: 5, current: 1 });
    }
}
