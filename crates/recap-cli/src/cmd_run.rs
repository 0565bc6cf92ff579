use std::io::Write;

use recap_render::Granularity;
use recap_store::{drafts, RecapPaths};

use crate::cmd_draft::WindowArgs;
use crate::settings::Settings;
use crate::{cmd_draft, cmd_preview, cmd_send};

pub struct RunParams<'a> {
    pub window: &'a WindowArgs,
    pub granularity: Option<Granularity>,
    pub template: Option<&'a str>,
    pub no_open: bool,
    pub yes: bool,
}

/// `recap run`: draft, preview, confirm, send.
pub fn execute(paths: &RecapPaths, settings: &Settings, params: RunParams<'_>) -> anyhow::Result<()> {
    // Catch mail problems before spending time on collection.
    settings.mail.validate()?;

    let draft_path = cmd_draft::execute(paths, settings, params.window, params.granularity)?;
    cmd_preview::execute(
        paths,
        settings,
        Some(&draft_path),
        params.template,
        params.no_open,
    )?;

    if !params.yes {
        eprint!(
            "\nSend {} to {}? Edit the draft first if needed. [y/N] ",
            draft_path.display(),
            settings.mail.to.join(", ")
        );
        std::io::stderr().flush()?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Not sent. The draft stays at {}.", draft_path.display());
            return Ok(());
        }
    }

    // Reload so edits made while the prompt was open are what gets sent.
    let draft = drafts::load(&draft_path)?;
    cmd_send::send_draft(paths, settings, &draft, params.template)?;
    Ok(())
}
