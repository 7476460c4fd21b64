//! Join, filter, project and count stages for each report, evaluated over
//! collection snapshots in natural order.

use std::collections::HashSet;

use crate::config::DateWindow;
use crate::error::ReportError;
use crate::models::{
    Attendance, AttendanceStatus, Codekata, CompanyDrive, DriveStudents, Mentor, Role, Task, Topic,
    TopicTask, User, UserProblems,
};

/// Inner join of topics and tasks, one row per task dated inside `window`.
pub fn topics_and_tasks(topics: &[Topic], tasks: &[Task], window: DateWindow) -> Vec<TopicTask> {
    topics
        .iter()
        .flat_map(|topic| {
            tasks
                .iter()
                .filter(move |task| task.topic_id == topic.topic_id)
                .filter(move |task| window.contains(task.date))
                .map(move |task| TopicTask {
                    topic: topic.name.clone(),
                    task: task.task_description.clone(),
                })
        })
        .collect()
}

pub fn drives_in_window(drives: &[CompanyDrive], window: DateWindow) -> Vec<CompanyDrive> {
    drives
        .iter()
        .filter(|drive| window.contains(drive.date))
        .cloned()
        .collect()
}

/// Drives whose same-day attendance includes at least one student. The role
/// check only selects drives; every joined user's name is kept.
pub fn drives_with_students(
    drives: &[CompanyDrive],
    attendance: &[Attendance],
    users: &[User],
) -> Vec<DriveStudents> {
    let mut rows = Vec::new();

    for drive in drives {
        let attendee_ids: HashSet<i32> = attendance
            .iter()
            .filter(|record| record.date == drive.date)
            .map(|record| record.user_id)
            .collect();

        let joined: Vec<&User> = users
            .iter()
            .filter(|user| attendee_ids.contains(&user.user_id))
            .collect();

        if !joined.iter().any(|user| user.role == Role::Student) {
            continue;
        }

        rows.push(DriveStudents {
            company: drive.company_name.clone(),
            students: joined.iter().map(|user| user.name.clone()).collect(),
        });
    }

    rows
}

/// One row per codekata document; no summing across a user's documents.
pub fn problem_counts(codekata: &[Codekata], users: &[User]) -> Vec<UserProblems> {
    codekata
        .iter()
        .map(|entry| UserProblems {
            user: users
                .iter()
                .find(|user| user.user_id == entry.user_id)
                .map(|user| user.name.clone()),
            problem_count: entry.problem_count,
        })
        .collect()
}

pub fn mentors_above(mentors: &[Mentor], threshold: i32) -> Vec<Mentor> {
    mentors
        .iter()
        .filter(|mentor| mentor.mentee_count > threshold)
        .cloned()
        .collect()
}

/// Absent attendance records whose user has no task, or has any task dated
/// outside `window`. Errors with `EmptyResult` when nothing matches, the way
/// a count stage emits no group.
pub fn absent_unsubmitted(
    attendance: &[Attendance],
    tasks: &[Task],
    window: DateWindow,
) -> Result<u64, ReportError> {
    let matched = attendance
        .iter()
        .filter(|record| record.status == AttendanceStatus::Absent)
        .filter(|record| {
            let mut dates = tasks
                .iter()
                .filter(|task| task.user_id == record.user_id)
                .map(|task| task.date)
                .peekable();
            dates.peek().is_none() || dates.any(|date| date < window.start || date > window.end)
        })
        .count();

    count_stage("absent_unsubmitted", matched)
}

fn count_stage(report: &'static str, matched: usize) -> Result<u64, ReportError> {
    if matched == 0 {
        return Err(ReportError::EmptyResult { report });
    }
    Ok(matched as u64)
}
