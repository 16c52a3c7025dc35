//! Relational student roster.
//!
//! Rows live in the `students` table and are managed with the
//! `hostel-admin` CLI. Clients only ever read them through `GET /students`.

use chrono::Utc;
use hostel_sync_core::Student;
use sqlx::SqlitePool;

use super::storage::ServerStorageError;

#[derive(sqlx::FromRow)]
struct StudentRow {
    id: String,
    name: String,
    room: String,
    phone: String,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: row.id,
            name: row.name,
            room: row.room,
            phone: row.phone,
        }
    }
}

pub struct StudentRepository {
    pool: SqlitePool,
}

impl StudentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a student. Returns `false` if the id is already taken.
    pub async fn add(&self, student: &Student) -> Result<bool, ServerStorageError> {
        let result = sqlx::query(
            r#"
            INSERT INTO students (id, name, room, phone, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&student.id)
        .bind(&student.name)
        .bind(&student.room)
        .bind(&student.phone)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Student>, ServerStorageError> {
        let row: Option<StudentRow> =
            sqlx::query_as("SELECT id, name, room, phone FROM students WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Student::from))
    }

    pub async fn list(&self) -> Result<Vec<Student>, ServerStorageError> {
        let rows: Vec<StudentRow> =
            sqlx::query_as("SELECT id, name, room, phone FROM students ORDER BY name, id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Student::from).collect())
    }

    /// Removes a student. Returns `false` if there was no such student.
    pub async fn remove(&self, id: &str) -> Result<bool, ServerStorageError> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::storage::init_db;
    use tempfile::tempdir;

    fn student(id: &str, name: &str) -> Student {
        Student {
            id: id.to_string(),
            name: name.to_string(),
            room: "A-101".to_string(),
            phone: String::new(),
        }
    }

    #[tokio::test]
    async fn test_add_list_remove() {
        let temp_dir = tempdir().unwrap();
        let pool = init_db(&temp_dir.path().join("hostel.db")).await.unwrap();
        let repo = StudentRepository::new(pool);

        assert!(repo.add(&student("stu-2", "Vikram")).await.unwrap());
        assert!(repo.add(&student("stu-1", "Asha")).await.unwrap());

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Asha", "Vikram"]);

        assert!(repo.remove("stu-2").await.unwrap());
        assert!(!repo.remove("stu-2").await.unwrap());
        assert!(repo.get("stu-2").await.unwrap().is_none());
        assert_eq!(repo.get("stu-1").await.unwrap().unwrap().room, "A-101");
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let temp_dir = tempdir().unwrap();
        let pool = init_db(&temp_dir.path().join("hostel.db")).await.unwrap();
        let repo = StudentRepository::new(pool);

        assert!(repo.add(&student("stu-1", "Asha")).await.unwrap());
        assert!(!repo.add(&student("stu-1", "Someone Else")).await.unwrap());
        assert_eq!(repo.get("stu-1").await.unwrap().unwrap().name, "Asha");
    }
}
