use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::ReportError;
use crate::models::{
    Attendance, AttendanceStatus, Codekata, CompanyDrive, Mentor, Role, Task, Topic, User,
};
use crate::store::{ConnectionProvider, DocumentStore};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub struct PgProvider {
    database_url: String,
    max_connections: u32,
}

impl PgProvider {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
        }
    }
}

impl ConnectionProvider for PgProvider {
    type Store = PgStore;

    async fn connect(&self) -> Result<PgStore, ReportError> {
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.database_url)
            .await
            .map_err(ReportError::Connection)?;
        Ok(PgStore { pool })
    }
}

/// Collections backed by tables in the `zen_class` schema.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self, map))]
    async fn read<T>(
        &self,
        collection: &'static str,
        columns: &str,
        map: impl Fn(&PgRow) -> Result<T, sqlx::Error>,
    ) -> Result<Vec<T>, ReportError> {
        let query = format!("SELECT {columns} FROM zen_class.{collection} ORDER BY seq");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| ReportError::query(collection, err))?;
        debug!(rows = rows.len(), "collection fetched");

        rows.iter()
            .map(map)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ReportError::query(collection, err))
    }
}

impl DocumentStore for PgStore {
    async fn ping(&self) -> Result<(), ReportError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(ReportError::Connection)?;
        Ok(())
    }

    async fn topics(&self) -> Result<Vec<Topic>, ReportError> {
        self.read("topics", "id, topic_id, name", |row| {
            Ok(Topic {
                id: row.try_get("id")?,
                topic_id: row.try_get("topic_id")?,
                name: row.try_get("name")?,
            })
        })
        .await
    }

    async fn tasks(&self) -> Result<Vec<Task>, ReportError> {
        self.read(
            "tasks",
            "id, task_id, topic_id, user_id, date, task_description",
            |row| {
                Ok(Task {
                    id: row.try_get("id")?,
                    task_id: row.try_get("task_id")?,
                    topic_id: row.try_get("topic_id")?,
                    user_id: row.try_get("user_id")?,
                    date: row.try_get("date")?,
                    task_description: row.try_get("task_description")?,
                })
            },
        )
        .await
    }

    async fn company_drives(&self) -> Result<Vec<CompanyDrive>, ReportError> {
        self.read("company_drives", "id, company_name, date", |row| {
            Ok(CompanyDrive {
                id: row.try_get("id")?,
                company_name: row.try_get("company_name")?,
                date: row.try_get("date")?,
            })
        })
        .await
    }

    async fn attendance(&self) -> Result<Vec<Attendance>, ReportError> {
        self.read("attendance", "id, user_id, date, status", |row| {
            let status: String = row.try_get("status")?;
            Ok(Attendance {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                date: row.try_get("date")?,
                status: status
                    .parse::<AttendanceStatus>()
                    .map_err(|err| sqlx::Error::Decode(Box::new(err)))?,
            })
        })
        .await
    }

    async fn users(&self) -> Result<Vec<User>, ReportError> {
        self.read("users", "id, user_id, name, role", |row| {
            Ok(User {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                name: row.try_get("name")?,
                role: Role::from(row.try_get::<String, _>("role")?),
            })
        })
        .await
    }

    async fn codekata(&self) -> Result<Vec<Codekata>, ReportError> {
        self.read("codekata", "id, user_id, problem_count", |row| {
            Ok(Codekata {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                problem_count: row.try_get("problem_count")?,
            })
        })
        .await
    }

    async fn mentors(&self) -> Result<Vec<Mentor>, ReportError> {
        self.read("mentors", "id, user_id, mentee_count", |row| {
            Ok(Mentor {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                mentee_count: row.try_get("mentee_count")?,
            })
        })
        .await
    }

    async fn close(self) {
        self.pool.close().await;
        debug!("connection pool closed");
    }
}

/// A document that can be written into its collection table.
trait Insertable: DeserializeOwned {
    fn insert(&self) -> Query<'_, Postgres, PgArguments>;
}

impl Insertable for Topic {
    fn insert(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            "INSERT INTO zen_class.topics (id, topic_id, name) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(self.id)
        .bind(self.topic_id)
        .bind(&self.name)
    }
}

impl Insertable for Task {
    fn insert(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            r#"
            INSERT INTO zen_class.tasks (id, task_id, topic_id, user_id, date, task_description)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(self.id)
        .bind(self.task_id)
        .bind(self.topic_id)
        .bind(self.user_id)
        .bind(self.date)
        .bind(&self.task_description)
    }
}

impl Insertable for CompanyDrive {
    fn insert(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            "INSERT INTO zen_class.company_drives (id, company_name, date) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(self.id)
        .bind(&self.company_name)
        .bind(self.date)
    }
}

impl Insertable for Attendance {
    fn insert(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            "INSERT INTO zen_class.attendance (id, user_id, date, status) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(self.date)
        .bind(self.status.as_str())
    }
}

impl Insertable for User {
    fn insert(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            "INSERT INTO zen_class.users (id, user_id, name, role) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(&self.name)
        .bind(self.role.to_string())
    }
}

impl Insertable for Codekata {
    fn insert(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            "INSERT INTO zen_class.codekata (id, user_id, problem_count) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(self.problem_count)
    }
}

impl Insertable for Mentor {
    fn insert(&self) -> Query<'_, Postgres, PgArguments> {
        sqlx::query(
            "INSERT INTO zen_class.mentors (id, user_id, mentee_count) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(self.mentee_count)
    }
}

async fn insert_all<T: Insertable>(pool: &PgPool, docs: &[T]) -> anyhow::Result<usize> {
    let mut inserted = 0usize;
    for doc in docs {
        let result = doc.insert().execute(pool).await?;
        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }
    Ok(inserted)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Collection {
    Topics,
    Tasks,
    CompanyDrives,
    Attendance,
    Users,
    Codekata,
    Mentors,
}

pub async fn import_csv(
    pool: &PgPool,
    collection: Collection,
    csv_path: &Path,
) -> anyhow::Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    match collection {
        Collection::Topics => insert_all(pool, &read_rows::<Topic>(&mut reader)?).await,
        Collection::Tasks => insert_all(pool, &read_rows::<Task>(&mut reader)?).await,
        Collection::CompanyDrives => {
            insert_all(pool, &read_rows::<CompanyDrive>(&mut reader)?).await
        }
        Collection::Attendance => insert_all(pool, &read_rows::<Attendance>(&mut reader)?).await,
        Collection::Users => insert_all(pool, &read_rows::<User>(&mut reader)?).await,
        Collection::Codekata => insert_all(pool, &read_rows::<Codekata>(&mut reader)?).await,
        Collection::Mentors => insert_all(pool, &read_rows::<Mentor>(&mut reader)?).await,
    }
}

fn read_rows<T: DeserializeOwned>(
    reader: &mut csv::Reader<std::fs::File>,
) -> anyhow::Result<Vec<T>> {
    let mut rows = Vec::new();
    for (line, result) in reader.deserialize::<T>().enumerate() {
        rows.push(result.with_context(|| format!("invalid record {}", line + 1))?);
    }
    Ok(rows)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let data = SeedData::build()?;

    insert_all(pool, &data.users).await?;
    insert_all(pool, &data.topics).await?;
    insert_all(pool, &data.tasks).await?;
    insert_all(pool, &data.company_drives).await?;
    insert_all(pool, &data.attendance).await?;
    insert_all(pool, &data.codekata).await?;
    insert_all(pool, &data.mentors).await?;

    Ok(())
}

struct SeedData {
    users: Vec<User>,
    topics: Vec<Topic>,
    tasks: Vec<Task>,
    company_drives: Vec<CompanyDrive>,
    attendance: Vec<Attendance>,
    codekata: Vec<Codekata>,
    mentors: Vec<Mentor>,
}

impl SeedData {
    fn build() -> anyhow::Result<Self> {
        let date = |month: u32, day: u32| {
            NaiveDate::from_ymd_opt(2020, month, day).context("invalid date")
        };
        // Fixed ids keep reseeding idempotent.
        let id = |collection: u128, n: u128| Uuid::from_u128((collection << 64) | n);

        let users = [
            (1, "Avery Lee", Role::Student),
            (2, "Jules Moreno", Role::Student),
            (3, "Kiara Patel", Role::Student),
            (4, "Priya Raman", Role::Mentor),
            (5, "Diego Alvarez", Role::Mentor),
            (6, "Sam Okafor", Role::Student),
        ]
        .into_iter()
        .map(|(user_id, name, role)| User {
            id: id(1, user_id as u128),
            user_id,
            name: name.to_string(),
            role,
        })
        .collect();

        let topics = [(1, "Arrays"), (2, "Recursion"), (3, "Databases"), (4, "React")]
            .into_iter()
            .map(|(topic_id, name)| Topic {
                id: id(2, topic_id as u128),
                topic_id,
                name: name.to_string(),
            })
            .collect();

        let mut tasks = Vec::new();
        for (task_id, topic_id, user_id, (month, day), description) in [
            (1, 1, 1, (10, 2), "Two Sum"),
            (2, 1, 2, (10, 6), "Rotate Array"),
            (3, 2, 1, (10, 14), "Tower of Hanoi"),
            (4, 3, 3, (10, 21), "Normalize the library schema"),
            (5, 4, 6, (11, 3), "Build a todo app"),
            (6, 3, 2, (9, 28), "Write join queries"),
        ] {
            tasks.push(Task {
                id: id(3, task_id as u128),
                task_id,
                topic_id,
                user_id,
                date: date(month, day)?,
                task_description: description.to_string(),
            });
        }

        let mut company_drives = Vec::new();
        for (n, company_name, (month, day)) in [
            (1, "Zoho", (10, 10)),
            (2, "Freshworks", (10, 16)),
            (3, "Infosys", (10, 22)),
            (4, "TCS", (11, 2)),
        ] {
            company_drives.push(CompanyDrive {
                id: id(4, n),
                company_name: company_name.to_string(),
                date: date(month, day)?,
            });
        }

        let mut attendance = Vec::new();
        for (n, user_id, (month, day), status) in [
            (1, 5, (10, 10), AttendanceStatus::Present),
            (2, 1, (10, 16), AttendanceStatus::Present),
            (3, 2, (10, 16), AttendanceStatus::Absent),
            (4, 3, (10, 22), AttendanceStatus::Present),
            (5, 4, (10, 22), AttendanceStatus::Present),
            (6, 6, (10, 20), AttendanceStatus::Absent),
            (7, 3, (10, 27), AttendanceStatus::Absent),
        ] {
            attendance.push(Attendance {
                id: id(5, n),
                user_id,
                date: date(month, day)?,
                status,
            });
        }

        let codekata = [(1, 1, 120), (2, 2, 85), (3, 3, 143), (4, 1, 12), (5, 6, 40)]
            .into_iter()
            .map(|(n, user_id, problem_count)| Codekata {
                id: id(6, n),
                user_id,
                problem_count,
            })
            .collect();

        let mentors = [(1, 4, 18), (2, 5, 12)]
            .into_iter()
            .map(|(n, user_id, mentee_count)| Mentor {
                id: id(7, n),
                user_id,
                mentee_count,
            })
            .collect();

        Ok(Self {
            users,
            topics,
            tasks,
            company_drives,
            attendance,
            codekata,
            mentors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportConfig;
    use crate::queries;

    #[test]
    fn seed_ids_are_stable_and_unique() {
        let first = SeedData::build().unwrap();
        let second = SeedData::build().unwrap();
        assert_eq!(first.tasks, second.tasks);

        let mut ids: Vec<Uuid> = first
            .users
            .iter()
            .map(|doc| doc.id)
            .chain(first.topics.iter().map(|doc| doc.id))
            .chain(first.tasks.iter().map(|doc| doc.id))
            .chain(first.attendance.iter().map(|doc| doc.id))
            .collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn seed_data_exercises_every_report() {
        let data = SeedData::build().unwrap();
        let config = ReportConfig::default();

        let topics = queries::topics_and_tasks(&data.topics, &data.tasks, config.topics_window);
        assert_eq!(topics.len(), 4);

        let drives = queries::drives_in_window(&data.company_drives, config.drives_window);
        assert_eq!(drives.len(), 2);

        let with_students =
            queries::drives_with_students(&data.company_drives, &data.attendance, &data.users);
        let companies: Vec<&str> = with_students.iter().map(|row| row.company.as_str()).collect();
        assert_eq!(companies, vec!["Freshworks", "Infosys"]);

        let mentors = queries::mentors_above(&data.mentors, config.mentee_threshold);
        assert_eq!(mentors.len(), 1);

        let absent =
            queries::absent_unsubmitted(&data.attendance, &data.tasks, config.absence_window);
        assert_eq!(absent.unwrap(), 2);
    }

    #[test]
    fn csv_rows_deserialize_without_document_id() {
        let data = "user_id,date,status\n5,2020-10-20,absent\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let rows: Vec<Attendance> = reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Absent);
        assert_eq!(rows[0].date, "2020-10-20".parse::<NaiveDate>().unwrap());
        assert!(!rows[0].id.is_nil());
    }
}
