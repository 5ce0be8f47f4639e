//! Thin wrapper around [`tera`] for rendering configuration templates. The
//! engine is loaded once per run from a directory glob and shared by every
//! host's render.

use std::path::Path;

use tera::Tera;

pub use tera::Context;

pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Load every `*.tera` file under `dir`. Template names are the file
    /// names, e.g. `ibnsv1_access_intf.tera`.
    pub fn from_dir(dir: &Path) -> Result<Self, tera::Error> {
        let glob = format!("{}/**/*.tera", dir.display());
        Ok(Self {
            tera: Tera::new(&glob)?,
        })
    }

    /// Build an engine from in-memory templates.
    pub fn from_raw(templates: &[(&str, &str)]) -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates.to_vec())?;
        Ok(Self { tera })
    }

    pub fn render(&self, template: &str, context: &Context) -> Result<String, tera::Error> {
        self.tera.render(template, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_from_raw() {
        let engine = TemplateEngine::from_raw(&[(
            "greet.tera",
            "hello {{ name }}{% for v in vlans %} {{ v }}{% endfor %}",
        )])
        .unwrap();
        let mut context = Context::new();
        context.insert("name", "SW1");
        context.insert("vlans", &[10u16, 20]);
        assert_eq!("hello SW1 10 20", engine.render("greet.tera", &context).unwrap());
    }

    #[test]
    fn test_render_unknown_template_errors() {
        let engine = TemplateEngine::from_raw(&[]).unwrap();
        assert!(engine.render("nope.tera", &Context::new()).is_err());
    }
}
