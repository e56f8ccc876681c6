use anyhow::{Context, Result};

/// Read text from the system clipboard, normalising Windows line endings.
pub fn paste_text() -> Result<String> {
    let mut clipboard = arboard::Clipboard::new().context("open clipboard")?;
    let text = clipboard.get_text().context("read clipboard text")?;
    Ok(text.replace("\r\n", "\n"))
}
