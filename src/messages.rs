//! User-facing message texts.
//!
//! There is no process-wide translation function. A [`MessageCatalog`] is
//! loaded as part of the configuration (`[messages]` table) and passed to the
//! code that needs human-readable text: error rendering in the CLI and the
//! placeholder titles the splitter gives to synthesized chapters and scenes.
//!
//! Templates may contain a `{path}` placeholder which is replaced by the
//! file the error refers to.

use crate::error::YwError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessageCatalog {
    pub not_found: String,
    pub locked: String,
    pub cannot_process: String,
    pub cannot_overwrite: String,
    pub cannot_write: String,
    pub unsupported_format: String,
    /// Title of a scene created by the splitter when the parent has no title.
    pub new_scene: String,
    /// Title of a chapter created from an untitled chapter divider.
    pub new_chapter: String,
    /// Title of a part created from an untitled part divider.
    pub new_part: String,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            not_found: "File not found: \"{path}\".".into(),
            locked: "yWriter seems to be open. Please close first.".into(),
            cannot_process: "Can not process file: \"{path}\".".into(),
            cannot_overwrite: "Cannot overwrite file: \"{path}\".".into(),
            cannot_write: "Cannot write file: \"{path}\".".into(),
            unsupported_format: "File type is not supported: \"{path}\".".into(),
            new_scene: "New Scene".into(),
            new_chapter: "New Chapter".into(),
            new_part: "New Part".into(),
        }
    }
}

impl MessageCatalog {
    /// Render an error as a user-facing message.
    pub fn describe(&self, err: &YwError) -> String {
        let template = match err {
            YwError::NotFound(_) => &self.not_found,
            YwError::Locked(_) => &self.locked,
            YwError::Parse { .. } => &self.cannot_process,
            YwError::WriteProtected { .. } => &self.cannot_overwrite,
            YwError::Io { .. } => &self.cannot_write,
            YwError::UnsupportedFormat(_) => &self.unsupported_format,
        };
        template.replace("{path}", &err.path().display().to_string())
    }
}
