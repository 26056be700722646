/// A persisted note row.
#[derive(Debug, Clone)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub date: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// Column values for a pending insert. `title` and `date` stay optional so
/// the table's NOT NULL constraints are enforced by the store itself.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub created_at: String,
}
