use std::path::{Path, PathBuf};

use recap_render::{render_document, select_template};
use recap_store::{drafts, Draft, DraftStore, RecapPaths};

use crate::settings::Settings;

/// The draft at `path`, or the newest one.
pub fn load_draft(paths: &RecapPaths, path: Option<&Path>) -> anyhow::Result<Draft> {
    match path {
        Some(p) => drafts::load(p),
        None => DraftStore::new(paths)
            .latest()?
            .ok_or_else(|| anyhow::anyhow!("no drafts found. Run `recap draft` first.")),
    }
}

/// Draft rendered into the configured (or requested) template.
pub fn render_html(
    paths: &RecapPaths,
    settings: &Settings,
    draft: &Draft,
    template: Option<&str>,
) -> anyhow::Result<String> {
    let dir = settings.template_dir_or(&paths.templates_dir);
    let name = template.or(settings.template.as_deref());
    let template = select_template(Some(&dir), name)?;
    tracing::debug!(template = %template.name, draft = %draft.path.display(), "rendering");
    Ok(render_document(&draft.markdown, &template))
}

/// `recap preview`: write `preview.html` in the store root and open it.
pub fn execute(
    paths: &RecapPaths,
    settings: &Settings,
    draft: Option<&Path>,
    template: Option<&str>,
    no_open: bool,
) -> anyhow::Result<PathBuf> {
    let draft = load_draft(paths, draft)?;
    let html = render_html(paths, settings, &draft, template)?;
    recap_store::write_atomic(&paths.preview_html, html.as_bytes())?;
    println!(
        "Preview of {} written to {}",
        draft.path.display(),
        paths.preview_html.display()
    );
    if !no_open {
        if let Err(e) = open::that(&paths.preview_html) {
            eprintln!("could not open a browser: {e}");
        }
    }
    Ok(paths.preview_html.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_core::ActivityWindow;

    fn setup() -> (tempfile::TempDir, RecapPaths, Settings) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = RecapPaths::discover(tmp.path());
        let settings = Settings::from_sources(&serde_json::Map::new(), |_| None).unwrap();
        (tmp, paths, settings)
    }

    #[test]
    fn preview_renders_latest_draft() {
        let (_tmp, paths, settings) = setup();
        let w = ActivityWindow::parse("2026-02-16", "2026-02-20").unwrap();
        let md = format!("{}\n# Weekly Report\n\n- [x](https://e.com)\n", w.marker_comment());
        DraftStore::new(&paths).save(&w, &md).unwrap();

        let out = execute(&paths, &settings, None, None, true).unwrap();
        let html = std::fs::read_to_string(out).unwrap();
        assert!(html.contains("<h1>Weekly Report</h1>"));
        assert!(html.contains("target=\"_blank\""));
        assert!(html.contains(recap_render::template::FOOTER));
    }

    #[test]
    fn templates_dir_is_used() {
        let (_tmp, paths, settings) = setup();
        std::fs::create_dir_all(&paths.templates_dir).unwrap();
        std::fs::write(paths.templates_dir.join("mine.html"), "<main>{{content}}</main>").unwrap();
        let w = ActivityWindow::parse("2026-02-16", "2026-02-20").unwrap();
        DraftStore::new(&paths).save(&w, "hello\n").unwrap();

        let draft = load_draft(&paths, None).unwrap();
        let html = render_html(&paths, &settings, &draft, Some("mine")).unwrap();
        assert_eq!(html, "<main><p>hello</p>\n</main>");
    }

    #[test]
    fn no_drafts_is_an_error() {
        let (_tmp, paths, settings) = setup();
        let err = execute(&paths, &settings, None, None, true).unwrap_err();
        assert!(err.to_string().contains("recap draft"));
    }
}
