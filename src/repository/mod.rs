use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, Row, ToSql, params};
use thiserror::Error;

use crate::models::{NewNote, Note};

/// Persistence-layer failures, pool and driver alike.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Pool(#[from] r2d2::Error),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// The updatable note columns. SET clauses are assembled from this
/// enumeration only; client-supplied keys never reach statement text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteField {
    Title,
    Description,
    Date,
}

impl NoteField {
    pub const ALL: [Self; 3] = [Self::Title, Self::Description, Self::Date];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Date => "date",
        }
    }
}

#[derive(Clone)]
pub struct Repository {
    pool: Pool<SqliteConnectionManager>,
}

impl Repository {
    pub fn new(db_path: &str) -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::new(manager)?;

        Ok(Self { pool })
    }

    /// Idempotent schema bootstrap, executed unconditionally at startup.
    /// An existing database is left untouched.
    pub fn init_schema(&self) -> Result<(), StorageError> {
        self.conn()?.execute(
            "CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT
            )",
            [],
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        Ok(self.pool.get()?)
    }

    pub fn list_notes_by_date(&self, date: &str) -> Result<Vec<Note>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, description, date, created_at, updated_at
             FROM notes WHERE date = ?1 ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map(params![date], note_from_row)?;

        let mut notes = Vec::new();
        for note in rows {
            notes.push(note?);
        }

        Ok(notes)
    }

    pub fn insert_note(&self, note: &NewNote) -> Result<(), StorageError> {
        self.conn()?.execute(
            "INSERT INTO notes (id, title, description, date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
            params![
                note.id,
                note.title,
                note.description,
                note.date,
                note.created_at
            ],
        )?;

        Ok(())
    }

    pub fn note_exists(&self, id: &str) -> Result<bool, StorageError> {
        let found = self
            .conn()?
            .query_row("SELECT id FROM notes WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;

        Ok(found.is_some())
    }

    /// Overwrites the supplied fields and stamps `updated_at`, all inside a
    /// single transaction on one pooled connection. Returns `None` when no
    /// row matches `id`.
    pub fn update_note(
        &self,
        id: &str,
        changes: &[(NoteField, Option<String>)],
        updated_at: &str,
    ) -> Result<Option<Note>, StorageError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let exists = tx
            .query_row("SELECT id FROM notes WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Ok(None);
        }

        let mut assignments: Vec<String> = Vec::new();
        let mut values: Vec<&dyn ToSql> = Vec::new();
        for (field, value) in changes {
            assignments.push(format!("{} = ?", field.key()));
            values.push(value);
        }
        assignments.push("updated_at = ?".to_string());
        values.push(&updated_at);
        values.push(&id);

        tx.execute(
            &format!("UPDATE notes SET {} WHERE id = ?", assignments.join(", ")),
            values.as_slice(),
        )?;

        let note = tx.query_row(
            "SELECT id, title, description, date, created_at, updated_at
             FROM notes WHERE id = ?1",
            params![id],
            note_from_row,
        )?;

        tx.commit()?;

        Ok(Some(note))
    }

    pub fn delete_note(&self, id: &str) -> Result<bool, StorageError> {
        let deleted = self
            .conn()?
            .execute("DELETE FROM notes WHERE id = ?1", params![id])?;

        Ok(deleted == 1)
    }
}

fn note_from_row(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        date: row.get("date")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.db");
        let repo = Repository::new(path.to_str().unwrap()).unwrap();
        repo.init_schema().unwrap();
        (dir, repo)
    }

    fn new_note(id: &str, date: &str, created_at: &str) -> NewNote {
        NewNote {
            id: id.to_string(),
            title: Some(format!("title-{id}")),
            description: Some(format!("desc-{id}")),
            date: Some(date.to_string()),
            created_at: created_at.to_string(),
        }
    }

    #[test]
    fn schema_bootstrap_is_idempotent() {
        let (_dir, repo) = test_repo();
        repo.init_schema().unwrap();
        repo.init_schema().unwrap();
    }

    #[test]
    fn list_filters_by_date_newest_first() {
        let (_dir, repo) = test_repo();
        repo.insert_note(&new_note("a", "2024-01-01", "2024-01-01T08:00:00.000000"))
            .unwrap();
        repo.insert_note(&new_note("b", "2024-01-01", "2024-01-01T09:00:00.000000"))
            .unwrap();
        repo.insert_note(&new_note("c", "2024-01-02", "2024-01-01T10:00:00.000000"))
            .unwrap();

        let notes = repo.list_notes_by_date("2024-01-01").unwrap();
        let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);

        assert!(repo.list_notes_by_date("2024-03-01").unwrap().is_empty());
    }

    #[test]
    fn insert_without_title_violates_constraint() {
        let (_dir, repo) = test_repo();
        let mut note = new_note("a", "2024-01-01", "2024-01-01T08:00:00.000000");
        note.title = None;

        assert!(matches!(
            repo.insert_note(&note),
            Err(StorageError::Sqlite(_))
        ));
    }

    #[test]
    fn insert_allows_null_description() {
        let (_dir, repo) = test_repo();
        let mut note = new_note("a", "2024-01-01", "2024-01-01T08:00:00.000000");
        note.description = None;
        repo.insert_note(&note).unwrap();

        let notes = repo.list_notes_by_date("2024-01-01").unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].description, None);
        assert_eq!(notes[0].updated_at, None);
    }

    #[test]
    fn update_overwrites_only_supplied_fields() {
        let (_dir, repo) = test_repo();
        repo.insert_note(&new_note("a", "2024-01-01", "2024-01-01T08:00:00.000000"))
            .unwrap();

        let updated = repo
            .update_note(
                "a",
                &[(NoteField::Title, Some("renamed".to_string()))],
                "2024-01-02T12:00:00.000000",
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.description.as_deref(), Some("desc-a"));
        assert_eq!(updated.date, "2024-01-01");
        assert_eq!(updated.created_at, "2024-01-01T08:00:00.000000");
        assert_eq!(
            updated.updated_at.as_deref(),
            Some("2024-01-02T12:00:00.000000")
        );
    }

    #[test]
    fn update_can_null_description() {
        let (_dir, repo) = test_repo();
        repo.insert_note(&new_note("a", "2024-01-01", "2024-01-01T08:00:00.000000"))
            .unwrap();

        let updated = repo
            .update_note(
                "a",
                &[(NoteField::Description, None)],
                "2024-01-02T12:00:00.000000",
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.description, None);
        assert_eq!(updated.title, "title-a");
    }

    #[test]
    fn update_unknown_id_returns_none() {
        let (_dir, repo) = test_repo();

        let result = repo
            .update_note(
                "missing",
                &[(NoteField::Title, Some("x".to_string()))],
                "2024-01-02T12:00:00.000000",
            )
            .unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn delete_reports_affected_row() {
        let (_dir, repo) = test_repo();
        repo.insert_note(&new_note("a", "2024-01-01", "2024-01-01T08:00:00.000000"))
            .unwrap();

        assert!(repo.delete_note("a").unwrap());
        assert!(!repo.delete_note("a").unwrap());
        assert!(repo.list_notes_by_date("2024-01-01").unwrap().is_empty());
    }
}
