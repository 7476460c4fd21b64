use std::fmt::Write;

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::{DateWindow, ReportConfig};
use crate::runner::{Outcome, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn render(report: &Report, config: &ReportConfig, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => build_text(report, config),
        OutputFormat::Json => build_json(report).to_string(),
    }
}

/// Six console sections in fixed order; the absent count is a bare number.
pub fn build_text(report: &Report, config: &ReportConfig) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "Topics and tasks {}:",
        window_label(config.topics_window)
    );
    section(&mut output, &report.topics_and_tasks, "No tasks in this window.", |out, rows| {
        for row in rows {
            let _ = writeln!(out, "- {}: {}", row.topic, row.task);
        }
    });

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Company drives {}:",
        window_label(config.drives_window)
    );
    section(&mut output, &report.drives_in_range, "No drives in this window.", |out, rows| {
        for drive in rows {
            let _ = writeln!(out, "- {} on {}", drive.company_name, drive.date);
        }
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "Company drives and students:");
    section(
        &mut output,
        &report.drives_with_students,
        "No drives attended by students.",
        |out, rows| {
            for row in rows {
                let _ = writeln!(out, "- {}: {}", row.company, row.students.join(", "));
            }
        },
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "User problems in Codekata:");
    section(&mut output, &report.problem_counts, "No Codekata activity.", |out, rows| {
        for row in rows {
            let _ = writeln!(
                out,
                "- {}: {} problems",
                row.user.as_deref().unwrap_or("(unknown user)"),
                row.problem_count
            );
        }
    });

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Mentors with more than {} mentees:",
        config.mentee_threshold
    );
    section(
        &mut output,
        &report.mentors_above_threshold,
        "No mentors above the threshold.",
        |out, rows| {
            for mentor in rows {
                let _ = writeln!(out, "- user {} ({} mentees)", mentor.user_id, mentor.mentee_count);
            }
        },
    );

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Number of absent users with unsubmitted tasks {}:",
        window_label(config.absence_window)
    );
    match &report.absent_unsubmitted {
        Ok(count) => {
            let _ = writeln!(output, "{count}");
        }
        Err(err) => {
            let _ = writeln!(output, "failed: {err}");
        }
    }

    output
}

fn section<T>(
    output: &mut String,
    outcome: &Outcome<Vec<T>>,
    empty: &str,
    rows: impl FnOnce(&mut String, &[T]),
) {
    match outcome {
        Ok(values) if values.is_empty() => {
            let _ = writeln!(output, "{empty}");
        }
        Ok(values) => rows(output, values),
        Err(err) => {
            let _ = writeln!(output, "failed: {err}");
        }
    }
}

fn window_label(window: DateWindow) -> String {
    format!("from {} to {}", window.start, window.end)
}

pub fn build_json(report: &Report) -> Value {
    json!({
        "topics_and_tasks": json_section(&report.topics_and_tasks),
        "drives_in_range": json_section(&report.drives_in_range),
        "drives_with_students": json_section(&report.drives_with_students),
        "problem_counts": json_section(&report.problem_counts),
        "mentors_above_threshold": json_section(&report.mentors_above_threshold),
        "absent_unsubmitted": json_section(&report.absent_unsubmitted),
    })
}

fn json_section<T: Serialize>(outcome: &Outcome<T>) -> Value {
    match outcome {
        Ok(value) => json!({ "status": "ok", "value": value }),
        Err(err) => json!({ "status": "error", "error": err.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::models::{DriveStudents, TopicTask, UserProblems};
    use crate::queries::fixtures::{drive, mentor};

    fn sample_report() -> Report {
        Report {
            topics_and_tasks: Ok(vec![TopicTask {
                topic: "Arrays".to_string(),
                task: "Two Sum".to_string(),
            }]),
            drives_in_range: Ok(vec![drive("Freshworks", "2020-10-16")]),
            drives_with_students: Ok(vec![DriveStudents {
                company: "Freshworks".to_string(),
                students: vec!["Avery Lee".to_string(), "Jules Moreno".to_string()],
            }]),
            problem_counts: Ok(vec![UserProblems {
                user: None,
                problem_count: 9,
            }]),
            mentors_above_threshold: Err(ReportError::query(
                "mentors",
                sqlx::Error::Protocol("boom".to_string()),
            )),
            absent_unsubmitted: Ok(0),
        }
    }

    #[test]
    fn text_sections_follow_fixed_order() {
        let text = build_text(&sample_report(), &ReportConfig::default());
        let headings = [
            "Topics and tasks from 2020-10-01 to 2020-10-31:",
            "Company drives from 2020-10-15 to 2020-10-31:",
            "Company drives and students:",
            "User problems in Codekata:",
            "Mentors with more than 15 mentees:",
            "Number of absent users with unsubmitted tasks",
        ];
        let positions: Vec<usize> = headings.iter().map(|h| text.find(h).unwrap()).collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

        assert!(text.contains("- Arrays: Two Sum"));
        assert!(text.contains("- Freshworks: Avery Lee, Jules Moreno"));
        assert!(text.contains("- (unknown user): 9 problems"));
        assert!(text.contains("failed: query against `mentors` failed"));
        assert!(text.trim_end().ends_with('0'));
    }

    #[test]
    fn empty_sections_are_labelled() {
        let mut report = sample_report();
        report.topics_and_tasks = Ok(Vec::new());
        report.mentors_above_threshold = Ok(vec![mentor(4, 18)]);
        let text = build_text(&report, &ReportConfig::default());
        assert!(text.contains("No tasks in this window."));
        assert!(text.contains("- user 4 (18 mentees)"));
    }

    #[test]
    fn json_marks_each_section_status() {
        let value = build_json(&sample_report());
        assert_eq!(value["topics_and_tasks"]["status"], "ok");
        assert_eq!(value["topics_and_tasks"]["value"][0]["task"], "Two Sum");
        assert_eq!(value["drives_in_range"]["value"][0]["company_name"], "Freshworks");
        assert_eq!(value["mentors_above_threshold"]["status"], "error");
        assert_eq!(value["absent_unsubmitted"]["value"], 0);
    }
}
