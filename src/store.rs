use crate::error::ReportError;
use crate::models::{Attendance, Codekata, CompanyDrive, Mentor, Task, Topic, User};

/// Read access to the programme collections, in natural order.
pub trait DocumentStore {
    async fn ping(&self) -> Result<(), ReportError>;

    async fn topics(&self) -> Result<Vec<Topic>, ReportError>;
    async fn tasks(&self) -> Result<Vec<Task>, ReportError>;
    async fn company_drives(&self) -> Result<Vec<CompanyDrive>, ReportError>;
    async fn attendance(&self) -> Result<Vec<Attendance>, ReportError>;
    async fn users(&self) -> Result<Vec<User>, ReportError>;
    async fn codekata(&self) -> Result<Vec<Codekata>, ReportError>;
    async fn mentors(&self) -> Result<Vec<Mentor>, ReportError>;

    async fn close(self);
}

/// Hands out an open store. Whoever connects is responsible for closing.
pub trait ConnectionProvider {
    type Store: DocumentStore;

    async fn connect(&self) -> Result<Self::Store, ReportError>;
}

#[cfg(test)]
pub(crate) mod memory {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    /// In-memory collections with injectable failures for runner tests.
    #[derive(Debug, Clone, Default)]
    pub struct MemoryStore {
        pub topics: Vec<Topic>,
        pub tasks: Vec<Task>,
        pub company_drives: Vec<CompanyDrive>,
        pub attendance: Vec<Attendance>,
        pub users: Vec<User>,
        pub codekata: Vec<Codekata>,
        pub mentors: Vec<Mentor>,
        pub failing: HashSet<&'static str>,
        pub slow: HashSet<&'static str>,
        pub unreachable: bool,
        pub closed: Arc<AtomicUsize>,
    }

    impl MemoryStore {
        async fn read<T: Clone>(&self, collection: &'static str, docs: &[T]) -> Result<Vec<T>, ReportError> {
            if self.slow.contains(collection) {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            if self.failing.contains(collection) {
                return Err(ReportError::query(
                    collection,
                    sqlx::Error::Protocol(format!("{collection} is unavailable")),
                ));
            }
            Ok(docs.to_vec())
        }
    }

    impl DocumentStore for MemoryStore {
        async fn ping(&self) -> Result<(), ReportError> {
            if self.unreachable {
                return Err(ReportError::Connection(sqlx::Error::PoolClosed));
            }
            Ok(())
        }

        async fn topics(&self) -> Result<Vec<Topic>, ReportError> {
            self.read("topics", &self.topics).await
        }

        async fn tasks(&self) -> Result<Vec<Task>, ReportError> {
            self.read("tasks", &self.tasks).await
        }

        async fn company_drives(&self) -> Result<Vec<CompanyDrive>, ReportError> {
            self.read("company_drives", &self.company_drives).await
        }

        async fn attendance(&self) -> Result<Vec<Attendance>, ReportError> {
            self.read("attendance", &self.attendance).await
        }

        async fn users(&self) -> Result<Vec<User>, ReportError> {
            self.read("users", &self.users).await
        }

        async fn codekata(&self) -> Result<Vec<Codekata>, ReportError> {
            self.read("codekata", &self.codekata).await
        }

        async fn mentors(&self) -> Result<Vec<Mentor>, ReportError> {
            self.read("mentors", &self.mentors).await
        }

        async fn close(self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Hands out clones of one store; `refuse` simulates a failed connect.
    #[derive(Debug, Default)]
    pub struct MemoryProvider {
        pub store: MemoryStore,
        pub refuse: bool,
    }

    impl ConnectionProvider for MemoryProvider {
        type Store = MemoryStore;

        async fn connect(&self) -> Result<MemoryStore, ReportError> {
            if self.refuse {
                return Err(ReportError::Connection(sqlx::Error::PoolTimedOut));
            }
            Ok(self.store.clone())
        }
    }
}
