use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Largest file the backend accepts for a single upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Formats the upload route parses; anything else is refused server side.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "pdf"];

/// Parsed problem set as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub subject: Option<String>,
    pub topic: Option<String>,
    pub grade_level: Option<u32>,
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    #[serde(default)]
    pub parsed_problems: Vec<ParsedProblem>,
    // Naive timestamps from the backend are kept verbatim.
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedProblem {
    pub text: String,
    #[serde(default)]
    pub order: u32,
    #[serde(rename = "type")]
    pub problem_type: Option<String>,
}

impl Submission {
    pub fn problem(&self, index: usize) -> Option<&ParsedProblem> {
        self.parsed_problems.get(index)
    }
}

/// A file the user picked (or a rendered whiteboard) ready to be uploaded.
#[derive(Debug, Clone, Validate)]
pub struct FileUpload {
    #[validate(length(min = 1, message = "File name is missing"))]
    pub file_name: String,
    pub mime_type: String,
    #[validate(length(
        min = 1,
        max = 10485760,
        message = "File must be non-empty and no larger than 10MB"
    ))]
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn extension(&self) -> Option<String> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    pub fn has_allowed_extension(&self) -> bool {
        self.extension()
            .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .unwrap_or(false)
    }

    /// Guess a content type from the extension, for files read from disk.
    pub fn mime_for_extension(ext: &str) -> &'static str {
        match ext {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "pdf" => "application/pdf",
            _ => "application/octet-stream",
        }
    }
}
