//! HTML rendering with templates compiled into the binary.

use tera::{Context, Tera};

use crate::error::Result;

/// Template sources, embedded at compile time.
const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("_macros.html", include_str!("../../templates/_macros.html")),
    ("home.html", include_str!("../../templates/home.html")),
    ("form.html", include_str!("../../templates/form.html")),
    ("dashboard.html", include_str!("../../templates/dashboard.html")),
    ("reports.html", include_str!("../../templates/reports.html")),
];

/// The page templates.
///
/// Output is HTML-escaped, so user-entered text can't inject markup.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    /// Parse the embedded templates.
    ///
    /// # Errors
    ///
    /// Returns an error if a template fails to parse.
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())?;
        tera.autoescape_on(vec![".html"]);
        Ok(Self { tera })
    }

    /// Render the named template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is unknown or rendering fails.
    pub fn render(&self, name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(name, context)?)
    }
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("names", &self.tera.get_template_names().collect::<Vec<_>>())
            .finish()
    }
}
