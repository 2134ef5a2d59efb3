//! Read-only views computed from enrollment and progress rows: the phase-3
//! gate and the weekly study plan. Nothing here is persisted and nothing here
//! raises; every outcome is a `DerivationResult`.

use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    config::Phase3Policy,
    models::{
        DerivationResult, ModuleRef, Phase3Access, PlanEntry, PlanTask, TaskStatus, TaskType,
        WeekPhase, WeekPlan, WeeklyPlan,
    },
    repository::Repository,
};

const ACCESS_ERROR: &str = "Erreur lors de la vérification de l'accès";
const PLAN_ERROR: &str = "Erreur lors du chargement du plan d'étude";
const PHASE3_LOCKED: &str = "Terminez tous les chapitres de la phase 1 pour débloquer la phase 3";

/// compute_access
///
/// Phase-3 ("Pratiquer") gate. Under `Relaxed` every module counts as learned
/// and access is granted whatever the progress; progress is not even read.
/// `Strict` reads progress and lists the modules still to learn.
pub async fn compute_access(
    repo: &dyn Repository,
    policy: Phase3Policy,
    user_id: Uuid,
    course_id: Uuid,
) -> DerivationResult<Phase3Access> {
    let modules = match repo.get_course_modules(course_id).await {
        Ok(modules) => modules,
        Err(e) => {
            tracing::error!(%course_id, error = %e, "Failed to load course modules");
            return DerivationResult::fail(ACCESS_ERROR);
        }
    };
    let total_modules = modules.len();

    match policy {
        Phase3Policy::Relaxed => DerivationResult::ok(Phase3Access {
            can_access: true,
            learned_modules: total_modules,
            total_modules,
            unlearned_modules: Vec::new(),
            message: None,
        }),
        Phase3Policy::Strict => {
            let learned: HashSet<Uuid> = match repo.get_learned_module_ids(user_id, course_id).await {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    tracing::error!(%user_id, %course_id, error = %e, "Failed to load module progress");
                    return DerivationResult::fail(ACCESS_ERROR);
                }
            };

            let unlearned_modules: Vec<ModuleRef> = modules
                .into_iter()
                .filter(|module| !learned.contains(&module.id))
                .map(ModuleRef::from)
                .collect();
            let can_access = unlearned_modules.is_empty();

            DerivationResult::ok(Phase3Access {
                can_access,
                learned_modules: total_modules - unlearned_modules.len(),
                total_modules,
                unlearned_modules,
                message: (!can_access).then(|| PHASE3_LOCKED.to_string()),
            })
        }
    }
}

/// weekly_plan
///
/// Weekly view of the student's daily plan. Missing start or exam dates give
/// `WeeklyPlan::Unavailable`, which is a successful result.
pub async fn weekly_plan(
    repo: &dyn Repository,
    user_id: Uuid,
    course_id: Uuid,
) -> DerivationResult<WeeklyPlan> {
    let settings = match repo.get_plan_settings(user_id, course_id).await {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            tracing::error!(%user_id, %course_id, error = %e, "Failed to load plan settings");
            return DerivationResult::fail(PLAN_ERROR);
        }
    };

    let (Some(start), Some(exam)) = (settings.week1_start_date, settings.exam_date) else {
        let reason = match settings.exam_date {
            None => "Date d'examen non définie",
            Some(_) => "Plan d'étude non généré",
        };
        return DerivationResult::ok(WeeklyPlan::Unavailable {
            reason: reason.to_string(),
        });
    };

    match repo.get_plan_entries(user_id, course_id).await {
        Ok(entries) => DerivationResult::ok(build_weekly_plan(start, exam, &entries)),
        Err(e) => {
            tracing::error!(%user_id, %course_id, error = %e, "Failed to load plan entries");
            DerivationResult::fail(PLAN_ERROR)
        }
    }
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// 1-based week index of `date`: week 1 runs from `start` to the following
/// Sunday, later weeks are whole Monday-to-Sunday ISO weeks.
fn week_number(start: NaiveDate, date: NaiveDate) -> u32 {
    ((monday_of(date) - monday_of(start)).num_days() / 7 + 1) as u32
}

fn aggregate_status(entries: &[&PlanEntry]) -> TaskStatus {
    let completed = entries
        .iter()
        .filter(|entry| entry.status == TaskStatus::Completed)
        .count();

    if completed == entries.len() {
        TaskStatus::Completed
    } else if completed > 0 || entries.iter().any(|entry| entry.status == TaskStatus::InProgress) {
        TaskStatus::InProgress
    } else {
        TaskStatus::Pending
    }
}

fn describe(task_type: TaskType, module_title: Option<&str>) -> String {
    let verb = match task_type {
        TaskType::Learn => "Apprendre",
        TaskType::Review => "Réviser",
        TaskType::Practice => "Pratiquer",
    };
    match module_title {
        Some(title) => format!("{verb} : {title}"),
        None => verb.to_string(),
    }
}

fn build_tasks(entries: &[&PlanEntry]) -> Vec<PlanTask> {
    let mut groups: Vec<((TaskType, Option<Uuid>), Vec<&PlanEntry>)> = Vec::new();
    for &entry in entries {
        let key = (entry.task_type, entry.module_id);
        match groups.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, members)) => members.push(entry),
            None => groups.push((key, vec![entry])),
        }
    }

    groups
        .into_iter()
        .map(|((task_type, module_id), members)| {
            let first = members[0];
            PlanTask {
                task_type,
                description: describe(task_type, first.module_title.as_deref()),
                module_id,
                module_title: first.module_title.clone(),
                module_number: first.module_number,
                item_count: members.len(),
                status: aggregate_status(&members),
                entry_ids: members.iter().map(|entry| entry.id).collect(),
            }
        })
        .collect()
}

fn phase_of(tasks: &[PlanTask]) -> WeekPhase {
    let mut types = tasks.iter().map(|task| task.task_type);
    let Some(first) = types.next() else {
        return WeekPhase::Mixed;
    };
    if types.all(|other| other == first) {
        first.into()
    } else {
        WeekPhase::Mixed
    }
}

// Two years of weekly study; longer spans are treated as bad settings.
pub const MAX_PLAN_WEEKS: u32 = 104;

/// build_weekly_plan
///
/// Groups `entries` into weeks spanning `[start, exam]`. Entries outside that
/// range are ignored; an exam before the start gives no weeks. A span longer
/// than `MAX_PLAN_WEEKS` is reported as unavailable.
pub fn build_weekly_plan(start: NaiveDate, exam: NaiveDate, entries: &[PlanEntry]) -> WeeklyPlan {
    let week_count = if exam < start { 0 } else { week_number(start, exam) };
    if week_count > MAX_PLAN_WEEKS {
        return WeeklyPlan::Unavailable {
            reason: "Période du plan d'étude trop longue".to_string(),
        };
    }

    let mut buckets: Vec<Vec<&PlanEntry>> = vec![Vec::new(); week_count as usize];
    for entry in entries {
        if entry.date < start || entry.date > exam {
            continue;
        }
        buckets[(week_number(start, entry.date) - 1) as usize].push(entry);
    }

    let first_monday = monday_of(start);
    let weeks = buckets
        .iter()
        .enumerate()
        .map(|(index, members)| {
            let monday = first_monday + Duration::weeks(index as i64);
            let tasks = build_tasks(members);
            WeekPlan {
                week_number: index as u32 + 1,
                week_start_date: if index == 0 { start } else { monday },
                week_end_date: (monday + Duration::days(6)).min(exam),
                phase: phase_of(&tasks),
                estimated_blocks: members.iter().map(|entry| i64::from(entry.blocks)).sum(),
                completed_tasks: tasks
                    .iter()
                    .filter(|task| task.status == TaskStatus::Completed)
                    .count(),
                total_tasks: tasks.len(),
                tasks,
            }
        })
        .collect();

    WeeklyPlan::Available {
        week1_start_date: start,
        exam_date: exam,
        weeks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(date: NaiveDate, task_type: TaskType, status: TaskStatus, module: Option<u128>) -> PlanEntry {
        PlanEntry {
            id: Uuid::new_v4(),
            date,
            task_type,
            status,
            module_id: module.map(Uuid::from_u128),
            module_title: module.map(|n| format!("Module {n}")),
            module_number: module.map(|n| n as i32),
            blocks: 2,
        }
    }

    #[test]
    fn absurd_plan_span_is_unavailable() {
        let start = day(2026, 10, 14);
        let entries = vec![entry(day(2026, 10, 15), TaskType::Learn, TaskStatus::Pending, Some(1))];

        let plan = build_weekly_plan(start, day(9999, 12, 31), &entries);
        assert!(matches!(plan, WeeklyPlan::Unavailable { .. }));

        // Exactly the cap is still built.
        let last = start + Duration::weeks(i64::from(MAX_PLAN_WEEKS) - 1);
        match build_weekly_plan(start, last, &entries) {
            WeeklyPlan::Available { weeks, .. } => assert_eq!(weeks.len(), MAX_PLAN_WEEKS as usize),
            WeeklyPlan::Unavailable { reason } => panic!("unexpected: {reason}"),
        }
    }

    fn weeks(plan: WeeklyPlan) -> Vec<WeekPlan> {
        match plan {
            WeeklyPlan::Available { weeks, .. } => weeks,
            WeeklyPlan::Unavailable { .. } => panic!("expected an available plan"),
        }
    }

    #[test]
    fn first_week_is_short_and_ends_on_sunday() {
        // 2026-10-14 is a Wednesday; the exam is on the Tuesday two weeks later.
        let plan = weeks(build_weekly_plan(day(2026, 10, 14), day(2026, 10, 27), &[]));

        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].week_start_date, day(2026, 10, 14));
        assert_eq!(plan[0].week_end_date, day(2026, 10, 18));
        assert_eq!(plan[1].week_start_date, day(2026, 10, 19));
        assert_eq!(plan[1].week_end_date, day(2026, 10, 25));
        assert_eq!(plan[2].week_start_date, day(2026, 10, 26));
        assert_eq!(plan[2].week_end_date, day(2026, 10, 27));
        assert!(plan.iter().all(|week| week.phase == WeekPhase::Mixed && week.total_tasks == 0));
    }

    #[test]
    fn entries_are_grouped_by_week_type_and_module() {
        let start = day(2026, 10, 14);
        let entries = vec![
            entry(day(2026, 10, 14), TaskType::Learn, TaskStatus::Completed, Some(1)),
            entry(day(2026, 10, 15), TaskType::Learn, TaskStatus::Pending, Some(1)),
            entry(day(2026, 10, 16), TaskType::Learn, TaskStatus::Completed, Some(2)),
            entry(day(2026, 10, 20), TaskType::Review, TaskStatus::Pending, None),
            entry(day(2026, 10, 21), TaskType::Review, TaskStatus::InProgress, None),
        ];

        let plan = weeks(build_weekly_plan(start, day(2026, 11, 30), &entries));

        let first = &plan[0];
        assert_eq!(first.tasks.len(), 2);
        assert_eq!(first.tasks[0].item_count, 2);
        assert_eq!(first.tasks[0].status, TaskStatus::InProgress);
        assert_eq!(first.tasks[0].description, "Apprendre : Module 1");
        assert_eq!(first.tasks[1].status, TaskStatus::Completed);
        assert_eq!(first.phase, WeekPhase::Learn);
        assert_eq!(first.estimated_blocks, 6);
        assert_eq!((first.completed_tasks, first.total_tasks), (1, 2));

        let second = &plan[1];
        assert_eq!(second.tasks.len(), 1);
        assert_eq!(second.tasks[0].status, TaskStatus::InProgress);
        assert_eq!(second.phase, WeekPhase::Review);
    }

    #[test]
    fn mixed_week_phase() {
        let start = day(2026, 10, 19);
        let entries = vec![
            entry(start, TaskType::Learn, TaskStatus::Pending, Some(3)),
            entry(start, TaskType::Practice, TaskStatus::Pending, None),
        ];
        let plan = weeks(build_weekly_plan(start, day(2026, 10, 25), &entries));
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].phase, WeekPhase::Mixed);
        assert_eq!(plan[0].tasks[0].status, TaskStatus::Pending);
    }

    #[test]
    fn entries_outside_the_range_are_ignored() {
        let start = day(2026, 10, 19);
        let exam = day(2026, 10, 25);
        let entries = vec![
            entry(day(2026, 10, 18), TaskType::Learn, TaskStatus::Pending, Some(1)),
            entry(day(2026, 10, 26), TaskType::Learn, TaskStatus::Pending, Some(1)),
        ];
        let plan = weeks(build_weekly_plan(start, exam, &entries));
        assert_eq!(plan.len(), 1);
        assert!(plan[0].tasks.is_empty());
    }

    #[test]
    fn exam_before_start_yields_no_weeks() {
        let plan = weeks(build_weekly_plan(day(2026, 10, 19), day(2026, 10, 1), &[]));
        assert!(plan.is_empty());
    }

    #[test]
    fn plan_spanning_new_year() {
        // 2026-12-30 is a Wednesday; 2027-01-04 is a Monday.
        let plan = weeks(build_weekly_plan(day(2026, 12, 30), day(2027, 1, 10), &[]));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].week_end_date, day(2027, 1, 3));
        assert_eq!(plan[1].week_start_date, day(2027, 1, 4));
        assert_eq!(plan[1].week_end_date, day(2027, 1, 10));
    }
}
