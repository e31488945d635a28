use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SharedFile {
    pub id: i64,
    pub share_id: String,
    pub original_name: String,
    pub stored_name: String,
    pub file_size: i64,
    pub mime_type: String,
}

#[derive(Debug, Clone)]
pub struct NewSharedFile {
    pub share_id: String,
    pub original_name: String,
    pub stored_name: String,
    pub file_size: i64,
    pub mime_type: String,
}

/// Public view of a file, as listed on the share page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResponse {
    pub id: i64,
    pub name: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl From<SharedFile> for FileResponse {
    fn from(file: SharedFile) -> Self {
        Self {
            id: file.id,
            name: file.original_name,
            size: file.file_size,
            mime_type: file.mime_type,
        }
    }
}
