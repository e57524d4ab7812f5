use crate::{
    config::RenderOptions,
    content::Content,
    error::{Error, RenderError, Result},
    render::Renderer,
};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tera::{Context, Tera, Value};

const MM_PER_INCH: f64 = 25.4;

static BUILTIN_TEMPLATES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("columns.html", include_str!("../templates/columns.html.tera")),
        ("letter.html", include_str!("../templates/letter.html.tera")),
        ("text_block.html", include_str!("../templates/text_block.html.tera")),
    ]
    .into_iter()
    .collect()
});

#[derive(Serialize)]
struct TemplateContext<'a> {
    paragraphs: &'a [String],
    paragraph_count: usize,
    options: &'a RenderOptions,
}

/// Template resolved by a worker: a private Tera instance holding one template.
pub struct LoadedTemplate {
    name: String,
    tera: Tera,
}

impl LoadedTemplate {
    /// Returns the template identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Built-in [`Renderer`] producing one HTML page per document.
///
/// Ships the `columns.html`, `letter.html` and `text_block.html` layouts.
/// Each worker gets its own Tera instance from [`Renderer::load_template`],
/// so no template state is shared between workers.
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    extra: HashMap<String, String>,
}

impl TemplateRenderer {
    /// Creates a renderer with the built-in templates only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an additional template source under `name`.
    ///
    /// The source is checked for syntax errors immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not parse.
    pub fn with_template(mut self, name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let source = source.into();

        let mut tera = Tera::default();
        Self::register_filters(&mut tera);
        tera.add_raw_template(&name, &source)
            .map_err(|e| Error::template(&name, e))?;

        self.extra.insert(name, source);
        Ok(self)
    }

    /// Lists every template name this renderer resolves.
    #[must_use]
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_TEMPLATES
            .keys()
            .map(|name| (*name).to_string())
            .chain(self.extra.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn source(&self, name: &str) -> Option<&str> {
        self.extra
            .get(name)
            .map(String::as_str)
            .or_else(|| BUILTIN_TEMPLATES.get(name).copied())
    }

    /// Registers custom Tera filters.
    fn register_filters(tera: &mut Tera) {
        tera.register_filter("mm_to_px", Self::mm_to_px_filter);
    }

    /// Converts millimetres to pixels at the `dpi` argument (default 96).
    fn mm_to_px_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let mm = value
            .as_f64()
            .ok_or_else(|| tera::Error::msg("mm_to_px expects a number"))?;
        let dpi = args.get("dpi").and_then(Value::as_f64).unwrap_or(96.0);

        let px = (mm / MM_PER_INCH * dpi).round();
        Ok(Value::from(px as i64))
    }
}

impl Renderer for TemplateRenderer {
    type Template = LoadedTemplate;

    fn load_template(&self, name: &str) -> std::result::Result<LoadedTemplate, RenderError> {
        let source = self
            .source(name)
            .ok_or_else(|| RenderError::UnknownTemplate(name.to_string()))?;

        let mut tera = Tera::default();
        Self::register_filters(&mut tera);
        tera.add_raw_template(name, source)
            .map_err(|e| RenderError::Render(e.to_string()))?;

        Ok(LoadedTemplate {
            name: name.to_string(),
            tera,
        })
    }

    fn render(
        &self,
        content: &Content,
        template: &LoadedTemplate,
        options: &RenderOptions,
    ) -> std::result::Result<Vec<u8>, RenderError> {
        let context = TemplateContext {
            paragraphs: content.paragraphs(),
            paragraph_count: content.paragraphs().len(),
            options,
        };

        let mut tera_context = Context::new();
        tera_context.insert("ctx", &context);

        let html = template
            .tera
            .render(&template.name, &tera_context)
            .map_err(|e| RenderError::Render(describe(&e)))?;

        if html.trim().is_empty() {
            return Err(RenderError::Encode(format!(
                "template '{}' produced an empty page",
                template.name
            )));
        }

        Ok(html.into_bytes())
    }

    fn extension(&self) -> &str {
        "html"
    }
}

/// Flattens a Tera error and its causes into one line.
fn describe(error: &tera::Error) -> String {
    use std::error::Error as _;

    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
