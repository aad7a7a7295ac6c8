use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use std::path::Path;

use crate::{Assignment, PayloadError};

/// A file chosen by the user, already read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl PickedImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Something that can ask the user for an image.
/// `None` means the user backed out.
pub trait ImageSource {
    fn pick(&mut self) -> Option<PickedImage>;
}

impl<F> ImageSource for F
where
    F: FnMut() -> Option<PickedImage>,
{
    fn pick(&mut self) -> Option<PickedImage> {
        self()
    }
}

pub fn mime_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

impl Assignment {
    /// Encode a picked file as a `data:` URL titled with the file name.
    pub fn from_picked(picked: &PickedImage) -> Self {
        let url = format!(
            "data:{};base64,{}",
            mime_for_name(&picked.name),
            B64.encode(&picked.bytes)
        );
        Self::new(url, picked.name.clone())
    }

    /// Mime type declared in the data URL, if there is one.
    pub fn mime(&self) -> Option<&str> {
        let rest = self.image.strip_prefix("data:")?;
        let (meta, _) = rest.split_once(',')?;
        meta.split(';').next().filter(|m| !m.is_empty())
    }

    /// Raw bytes behind the data URL.
    pub fn payload_bytes(&self) -> Result<Vec<u8>, PayloadError> {
        let rest = self
            .image
            .strip_prefix("data:")
            .ok_or(PayloadError::NotDataUrl)?;
        let (meta, data) = rest.split_once(',').ok_or(PayloadError::NotDataUrl)?;
        if !meta.ends_with(";base64") {
            return Err(PayloadError::NotBase64);
        }
        Ok(B64.decode(data)?)
    }
}
