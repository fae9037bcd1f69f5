use serde::{Deserialize, Serialize};

/// Pipeline stage (a board column)
///
/// `id` is the persistence identity; `stage_id` is the stable external key
/// that leads reference and never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: i64,
    pub title: String,
    pub position: i64,
    pub stage_id: String,
    pub is_default: bool,
}

/// Bulk position update entry (`{id, position}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePosition {
    pub id: i64,
    pub position: i64,
}

impl From<&Stage> for StagePosition {
    fn from(stage: &Stage) -> Self {
        Self { id: stage.id, position: stage.position }
    }
}

/// Payload for creating a stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStage {
    pub title: String,
    pub is_default: bool,
}

/// Partial stage update; `None` fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUpdate {
    pub title: Option<String>,
    pub is_default: Option<bool>,
}

/// Derive a stage key from a title: lowercase, `[a-z0-9-]`, hyphen-separated
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut pending_hyphen = false;
    for c in title.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}
