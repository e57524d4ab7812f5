use crate::{config::RenderOptions, content::Content, error::RenderError};

/// Capability boundary to a document rendering backend.
///
/// The pipeline never inspects rendered bytes; it only routes them to disk.
/// A renderer is shared by all workers, while each worker resolves and owns
/// its own [`Renderer::Template`], so expensive template setup happens once
/// per worker rather than once per document.
///
/// Implementations must be thread-safe.
pub trait Renderer: Send + Sync {
    /// Resolved, ready-to-use template owned by a single worker.
    type Template;

    /// Resolves a template identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownTemplate`] if `name` does not resolve.
    /// The pipeline treats this as fatal for the whole run.
    fn load_template(&self, name: &str) -> Result<Self::Template, RenderError>;

    /// Renders one document to encoded bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Render`] or [`RenderError::Encode`]. Either is
    /// recorded against the document and processing continues.
    fn render(
        &self,
        content: &Content,
        template: &Self::Template,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, RenderError>;

    /// File extension of rendered artifacts, without the leading dot.
    fn extension(&self) -> &str {
        "pdf"
    }
}

impl<R: Renderer + ?Sized> Renderer for &R {
    type Template = R::Template;

    fn load_template(&self, name: &str) -> Result<Self::Template, RenderError> {
        (**self).load_template(name)
    }

    fn render(
        &self,
        content: &Content,
        template: &Self::Template,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, RenderError> {
        (**self).render(content, template, options)
    }

    fn extension(&self) -> &str {
        (**self).extension()
    }
}
