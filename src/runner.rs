use std::future::Future;

use tracing::{debug, info, instrument, warn};

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::models::{CompanyDrive, DriveStudents, Mentor, TopicTask, UserProblems};
use crate::queries;
use crate::store::{ConnectionProvider, DocumentStore};

pub type Outcome<T> = Result<T, ReportError>;

/// Results of one run, one field per report. A failed report keeps its error
/// without affecting the others.
#[derive(Debug)]
pub struct Report {
    pub topics_and_tasks: Outcome<Vec<TopicTask>>,
    pub drives_in_range: Outcome<Vec<CompanyDrive>>,
    pub drives_with_students: Outcome<Vec<DriveStudents>>,
    pub problem_counts: Outcome<Vec<UserProblems>>,
    pub mentors_above_threshold: Outcome<Vec<Mentor>>,
    pub absent_unsubmitted: Outcome<u64>,
}

impl Report {
    pub fn failures(&self) -> Vec<(&'static str, &ReportError)> {
        [
            ("topics_and_tasks", self.topics_and_tasks.as_ref().err()),
            ("drives_in_range", self.drives_in_range.as_ref().err()),
            ("drives_with_students", self.drives_with_students.as_ref().err()),
            ("problem_counts", self.problem_counts.as_ref().err()),
            ("mentors_above_threshold", self.mentors_above_threshold.as_ref().err()),
            ("absent_unsubmitted", self.absent_unsubmitted.as_ref().err()),
        ]
        .into_iter()
        .filter_map(|(name, err)| err.map(|err| (name, err)))
        .collect()
    }
}

/// Connects through `provider`, runs every report and closes the store on
/// every path out.
pub async fn run_scoped<P: ConnectionProvider>(
    provider: &P,
    config: &ReportConfig,
) -> Result<Report, ReportError> {
    let store = provider.connect().await?;
    let report = run_all(&store, config).await;
    store.close().await;
    report
}

#[instrument(skip_all)]
pub async fn run_all<S: DocumentStore>(store: &S, config: &ReportConfig) -> Result<Report, ReportError> {
    store.ping().await?;
    info!("running reports");

    let (
        topics_and_tasks,
        drives_in_range,
        drives_with_students,
        problem_counts,
        mentors_above_threshold,
        absent_unsubmitted,
    ) = tokio::join!(
        guarded(config, "topics_and_tasks", async {
            let (topics, tasks) = tokio::try_join!(store.topics(), store.tasks())?;
            Ok::<_, ReportError>(queries::topics_and_tasks(&topics, &tasks, config.topics_window))
        }),
        guarded(config, "drives_in_range", async {
            let drives = store.company_drives().await?;
            Ok::<_, ReportError>(queries::drives_in_window(&drives, config.drives_window))
        }),
        guarded(config, "drives_with_students", async {
            let (drives, attendance, users) =
                tokio::try_join!(store.company_drives(), store.attendance(), store.users())?;
            Ok::<_, ReportError>(queries::drives_with_students(&drives, &attendance, &users))
        }),
        guarded(config, "problem_counts", async {
            let (codekata, users) = tokio::try_join!(store.codekata(), store.users())?;
            Ok::<_, ReportError>(queries::problem_counts(&codekata, &users))
        }),
        guarded(config, "mentors_above_threshold", async {
            let mentors = store.mentors().await?;
            Ok::<_, ReportError>(queries::mentors_above(&mentors, config.mentee_threshold))
        }),
        guarded(config, "absent_unsubmitted", async {
            let (attendance, tasks) = tokio::try_join!(store.attendance(), store.tasks())?;
            match queries::absent_unsubmitted(&attendance, &tasks, config.absence_window) {
                Err(ReportError::EmptyResult { .. }) => Ok(0),
                other => other,
            }
        }),
    );

    let report = Report {
        topics_and_tasks,
        drives_in_range,
        drives_with_students,
        problem_counts,
        mentors_above_threshold,
        absent_unsubmitted,
    };
    info!(failed = report.failures().len(), "reports finished");
    Ok(report)
}

async fn guarded<T, F>(config: &ReportConfig, name: &'static str, report: F) -> Outcome<T>
where
    F: Future<Output = Outcome<T>>,
{
    let outcome = match config.query_timeout {
        Some(after) => tokio::time::timeout(after, report)
            .await
            .unwrap_or_else(|_| Err(ReportError::Timeout { report: name, after })),
        None => report.await,
    };

    match &outcome {
        Ok(_) => debug!(report = name, "report complete"),
        Err(err) => warn!(report = name, error = %err, "report failed"),
    }
    outcome
}
