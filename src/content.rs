use crate::error::{Error, Result};
use serde::Serialize;
use std::{fs, path::Path};

const PLACEHOLDER_PARAGRAPH: &str = "Paragraphe de test pour la génération.";
const PLACEHOLDER_COUNT: usize = 20;

/// Document content shared by every generated document of a run.
///
/// The content model is deliberately flat: an ordered list of paragraphs.
/// Renderers decide how paragraphs are laid out on pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Content {
    paragraphs: Vec<String>,
}

impl Content {
    /// Creates content from explicit paragraphs, dropping blank ones.
    #[must_use]
    pub fn new<I, S>(paragraphs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paragraphs: paragraphs
                .into_iter()
                .map(Into::into)
                .filter(|p| !p.trim().is_empty())
                .collect(),
        }
    }

    /// Parses text where paragraphs are separated by a blank line.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let normalized = text.replace("\r\n", "\n");
        Self::new(normalized.split("\n\n").map(str::trim))
    }

    /// Reads paragraphs from a UTF-8 text file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(Self::from_text(&text))
    }

    /// Placeholder content used when no sample text is available.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(std::iter::repeat_n(PLACEHOLDER_PARAGRAPH, PLACEHOLDER_COUNT))
    }

    /// Returns the paragraphs in order.
    #[must_use]
    pub fn paragraphs(&self) -> &[String] {
        &self.paragraphs
    }

    /// Returns true if there are no paragraphs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}
