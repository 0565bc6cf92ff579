use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;

pub const CONTENT_PLACEHOLDER: &str = "{{content}}";
pub const FOOTER_PLACEHOLDER: &str = "{{footer}}";
pub const FOOTER: &str = "Generated by recap from merge requests, tracked issues and local commits.";

const BUILTIN: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="margin:0;padding:24px;background:#ffffff;font-family:-apple-system,'Segoe UI',Helvetica,Arial,sans-serif;font-size:14px;line-height:1.5;color:#1f2328;">
<div style="max-width:860px;margin:0 auto;">
{{content}}
<hr style="border:none;border-top:1px solid #d0d7de;margin:24px 0 8px 0;">
<p style="color:#656d76;font-size:12px;margin:0;">{{footer}}</p>
</div>
</body>
</html>
"#;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("template `{name}` not found in {dir}")]
    NotFound { name: String, dir: String },
    #[error("cannot read template {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// An HTML document shell with `{{content}}` and `{{footer}}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    body: String,
}

impl Template {
    pub fn builtin() -> Self {
        Self {
            name: "builtin".into(),
            body: BUILTIN.into(),
        }
    }

    pub fn from_body(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Fill the slots. A template without a content slot gets the fragment
    /// appended so nothing is lost.
    pub fn apply(&self, html_fragment: &str) -> String {
        let mut doc = self.body.replace(FOOTER_PLACEHOLDER, FOOTER);
        if doc.contains(CONTENT_PLACEHOLDER) {
            doc = doc.replace(CONTENT_PLACEHOLDER, html_fragment);
        } else {
            tracing::warn!(template = %self.name, "template has no {{{{content}}}} slot");
            doc.push_str(html_fragment);
        }
        doc
    }
}

/// `*.html` files in `dir`, sorted by name. A missing directory is empty.
pub fn list_templates(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "html"))
        .collect();
    files.sort();
    files
}

/// Pick a template: `name` (with or without `.html`) when given, otherwise a
/// random one from `dir`. No directory or no files means the built-in one.
pub fn select_template(dir: Option<&Path>, name: Option<&str>) -> Result<Template, TemplateError> {
    select_template_with(dir, name, &mut rand::thread_rng())
}

pub fn select_template_with<R: Rng + ?Sized>(
    dir: Option<&Path>,
    name: Option<&str>,
    rng: &mut R,
) -> Result<Template, TemplateError> {
    let Some(dir) = dir else {
        return Ok(Template::builtin());
    };
    let files = list_templates(dir);
    if files.is_empty() {
        tracing::debug!(dir = %dir.display(), "no templates, using built-in");
        return Ok(Template::builtin());
    }

    let path = match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => {
            let wanted = name.strip_suffix(".html").unwrap_or(name);
            files
                .iter()
                .find(|p| p.file_stem().is_some_and(|s| s == wanted))
                .ok_or_else(|| TemplateError::NotFound {
                    name: name.to_string(),
                    dir: dir.display().to_string(),
                })?
        }
        // `files` is non-empty here
        None => files.choose(rng).unwrap_or(&files[0]),
    };

    let body = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::debug!(template = %name, "template selected");
    Ok(Template::from_body(name, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn dir_with(files: &[(&str, &str)]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std::fs::write(tmp.path().join(name), body).unwrap();
        }
        tmp
    }

    #[test]
    fn builtin_fills_both_slots() {
        let doc = Template::builtin().apply("<p>hi</p>");
        assert!(doc.contains("<p>hi</p>"));
        assert!(doc.contains(FOOTER));
        assert!(!doc.contains("{{"));
    }

    #[test]
    fn missing_or_empty_dir_falls_back() {
        assert_eq!(select_template(None, None).unwrap().name, "builtin");
        let tmp = dir_with(&[("notes.txt", "x")]);
        assert_eq!(select_template(Some(tmp.path()), None).unwrap().name, "builtin");
        let gone = tmp.path().join("nope");
        assert_eq!(select_template(Some(&gone), None).unwrap().name, "builtin");
    }

    #[test]
    fn named_template_is_used() {
        let tmp = dir_with(&[
            ("blue.html", "<b>{{content}}</b>{{footer}}"),
            ("green.html", "<i>{{content}}</i>"),
        ]);
        let t = select_template(Some(tmp.path()), Some("green.html")).unwrap();
        assert_eq!(t.name, "green");
        assert_eq!(t.apply("x"), "<i>x</i>");

        let err = select_template(Some(tmp.path()), Some("red")).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound { .. }));
    }

    #[test]
    fn random_choice_comes_from_the_directory() {
        let tmp = dir_with(&[("a.html", "{{content}}"), ("b.html", "{{content}}")]);
        let mut rng = StepRng::new(0, 0);
        let t = select_template_with(Some(tmp.path()), None, &mut rng).unwrap();
        assert!(t.name == "a" || t.name == "b");
    }

    #[test]
    fn template_without_content_slot_appends() {
        let t = Template::from_body("bare", "<header></header>");
        assert_eq!(t.apply("<p>x</p>"), "<header></header><p>x</p>");
    }
}
