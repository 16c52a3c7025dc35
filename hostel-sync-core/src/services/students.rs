use std::time::Duration;

use async_trait::async_trait;

use crate::cache::TtlCache;
use crate::feed::Fetch;
use crate::records::Student;
use crate::store::{RemoteStore, StoreError};

/// How long a roster lookup stays cached.
pub const STUDENT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Read-only view of the relational student roster.
///
/// The roster has no push channel, so live views poll it through
/// [`PollingFeed`](crate::feed::PollingFeed). Single-student lookups are
/// served from a TTL cache refreshed by every full fetch.
pub struct StudentDirectory {
    remote: RemoteStore,
    cache: TtlCache<String, Student>,
}

impl StudentDirectory {
    pub fn new(remote: RemoteStore) -> Self {
        Self::with_ttl(remote, STUDENT_CACHE_TTL)
    }

    pub fn with_ttl(remote: RemoteStore, ttl: Duration) -> Self {
        Self {
            remote,
            cache: TtlCache::new(ttl),
        }
    }

    pub async fn list(&self) -> Result<Vec<Student>, StoreError> {
        let students: Vec<Student> = self.remote.get_json("students").await?;
        for student in &students {
            self.cache.insert(student.id.clone(), student.clone());
        }
        tracing::debug!("Fetched {} students", students.len());
        Ok(students)
    }

    /// Looks up one student, fetching the roster on a cache miss.
    pub async fn student(&self, id: &str) -> Result<Option<Student>, StoreError> {
        if let Some(student) = self.cache.get(&id.to_string()) {
            return Ok(Some(student));
        }
        let students = self.list().await?;
        Ok(students.into_iter().find(|s| s.id == id))
    }

    pub fn invalidate(&self) {
        self.cache.clear();
    }
}

#[async_trait]
impl Fetch<Vec<Student>> for StudentDirectory {
    async fn fetch(&self) -> Result<Vec<Student>, StoreError> {
        self.list().await
    }
}
