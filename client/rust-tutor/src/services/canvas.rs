use async_trait::async_trait;

use crate::models::FileUpload;

pub const WHITEBOARD_FILE_STEM: &str = "whiteboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Background {
    Transparent,
    Opaque,
}

/// Rasterized PNG of the selected shapes.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub png: Vec<u8>,
}

impl RenderedImage {
    pub fn into_upload(self) -> FileUpload {
        FileUpload::new(format!("{}.png", WHITEBOARD_FILE_STEM), "image/png", self.png)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("{0}")]
    Render(String),
}

/// The two things the submission flow needs from a drawing surface.
#[async_trait]
pub trait DrawingCanvas: Send + Sync {
    /// Ids of every drawable element currently on the canvas.
    fn shape_ids(&self) -> Vec<String>;

    async fn render(
        &self,
        shape_ids: &[String],
        background: Background,
    ) -> Result<RenderedImage, CanvasError>;
}
