use chrono::Local;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    dto::{DeleteNoteResponse, NoteResponse},
    error::ApiError,
    models::NewNote,
    repository::{NoteField, Repository},
};

/// Keys a creation payload must carry, in the order they are reported.
const REQUIRED_FIELDS: [&str; 3] = ["title", "description", "date"];

#[derive(Clone)]
pub struct NoteService {
    repo: Repository,
}

impl NoteService {
    pub const fn new(repo: Repository) -> Self {
        Self { repo }
    }

    pub fn list_notes(&self, date: Option<String>) -> Result<Vec<NoteResponse>, ApiError> {
        let date = date
            .filter(|date| !date.is_empty())
            .ok_or_else(|| ApiError::InvalidRequest("Date parameter is required".to_string()))?;

        let notes = self.repo.list_notes_by_date(&date)?;

        Ok(notes.into_iter().map(NoteResponse::from).collect())
    }

    /// Presence of all required keys is checked, not non-emptiness; a null
    /// value counts as present and NOT NULL columns surface through the
    /// storage layer.
    pub fn create_note(&self, payload: &Value) -> Result<NoteResponse, ApiError> {
        let data = payload
            .as_object()
            .filter(|data| REQUIRED_FIELDS.iter().all(|field| data.contains_key(*field)))
            .ok_or_else(|| {
                ApiError::InvalidRequest(format!(
                    "Missing required fields: {}",
                    REQUIRED_FIELDS.join(", ")
                ))
            })?;

        let note = NewNote {
            id: Uuid::new_v4().to_string(),
            title: text_value(&data["title"]),
            description: text_value(&data["description"]),
            date: text_value(&data["date"]),
            created_at: now_timestamp(),
        };

        self.repo.insert_note(&note)?;

        Ok(NoteResponse {
            id: note.id,
            title: note.title.unwrap_or_default(),
            description: note.description,
            date: note.date.unwrap_or_default(),
            created_at: note.created_at,
            updated_at: None,
        })
    }

    /// Unknown ids fail before the payload is inspected; unrecognized payload
    /// keys are silently ignored.
    pub fn update_note(&self, id: &str, payload: Option<&Value>) -> Result<NoteResponse, ApiError> {
        if !self.repo.note_exists(id)? {
            return Err(ApiError::NotFound);
        }

        let data = payload
            .and_then(Value::as_object)
            .filter(|data| !data.is_empty())
            .ok_or_else(|| ApiError::InvalidRequest("No data provided".to_string()))?;

        let changes: Vec<(NoteField, Option<String>)> = NoteField::ALL
            .into_iter()
            .filter_map(|field| data.get(field.key()).map(|value| (field, text_value(value))))
            .collect();
        if changes.is_empty() {
            return Err(ApiError::InvalidRequest(
                "No valid fields to update".to_string(),
            ));
        }

        let updated = self
            .repo
            .update_note(id, &changes, &now_timestamp())?
            .ok_or(ApiError::NotFound)?;

        Ok(NoteResponse::from(updated))
    }

    pub fn delete_note(&self, id: &str) -> Result<DeleteNoteResponse, ApiError> {
        if self.repo.delete_note(id)? {
            Ok(DeleteNoteResponse {
                success: true,
                message: "Note deleted".to_string(),
            })
        } else {
            Err(ApiError::NotFound)
        }
    }
}

/// Local-clock ISO-8601 timestamp with microsecond precision. Lexicographic
/// order matches creation order, which the date listing relies on.
fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
