//! System clipboard access.

use std::borrow::Cow;

use image::RgbaImage;

use crate::error::{Result, ViewerError};

/// Write an RGBA image to the system clipboard.
pub fn copy_image(img: &RgbaImage) -> Result<()> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| ViewerError::Clipboard(e.to_string()))?;
    let data = arboard::ImageData {
        width: img.width() as usize,
        height: img.height() as usize,
        bytes: Cow::Borrowed(img.as_raw()),
    };
    clipboard
        .set_image(data)
        .map_err(|e| ViewerError::Clipboard(e.to_string()))?;
    log::info!("Copied {}x{} image to clipboard", img.width(), img.height());
    Ok(())
}
