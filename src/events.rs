use serde::{Deserialize, Serialize};

/// One image in the gallery catalog. Order within the catalog is significant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub uri: String,
    pub alt_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

impl CatalogEntry {
    pub fn new(uri: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            alt_text: alt_text.into(),
            size_bytes: None,
        }
    }
}

/// Request for the loader to fetch and decode every unique URI in the batch.
#[derive(Debug, Clone)]
pub struct LoadTextures(pub Vec<String>);

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Clone)]
pub struct PreparedTexture {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

#[derive(Debug)]
pub enum TextureEvent {
    Loaded(PreparedTexture),
    Failed { uri: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    Backward,
    Forward,
}

/// Discrete user input, already normalized away from the windowing system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Scroll wheel, in pixels; positive scrolls forward (like DOM `deltaY`).
    Wheel { delta_y: f32 },
    /// Arrow key navigation.
    Key(KeyDirection),
    /// Vertical touch drag, in pixels; positive drags forward.
    TouchDrag { delta_y: f32 },
}
