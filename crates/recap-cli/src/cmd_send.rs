use std::path::Path;

use recap_mail::{render_subject, send_report};
use recap_store::{Draft, RecapPaths};

use crate::cmd_preview::{load_draft, render_html};
use crate::settings::Settings;

/// Deliver an already loaded draft. Mail settings are checked before the
/// draft is rendered or a connection is made.
pub fn send_draft(
    paths: &RecapPaths,
    settings: &Settings,
    draft: &Draft,
    template: Option<&str>,
) -> anyhow::Result<String> {
    settings.mail.validate()?;

    let html = render_html(paths, settings, draft, template)?;
    let subject = render_subject(
        &settings.mail.subject_template,
        &settings.author(),
        &draft.window,
    );
    let message_id = tokio::runtime::Runtime::new()?.block_on(send_report(
        &settings.mail,
        &subject,
        &html,
        &paths.thread_json,
    ))?;

    println!("Sent \"{subject}\" to {}", settings.mail.to.join(", "));
    if settings.mail.thread {
        println!("  threaded as {message_id}");
    }
    Ok(message_id)
}

/// `recap send`
pub fn execute(
    paths: &RecapPaths,
    settings: &Settings,
    draft: Option<&Path>,
    template: Option<&str>,
) -> anyhow::Result<()> {
    let draft = load_draft(paths, draft)?;
    send_draft(paths, settings, &draft, template)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recap_core::ActivityWindow;
    use recap_mail::MailError;
    use recap_store::DraftStore;

    #[test]
    fn empty_recipient_list_fails_before_sending() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = RecapPaths::discover(tmp.path());
        let env = |name: &str| match name {
            "SMTP_HOST" => Some("127.0.0.1".to_string()),
            "SMTP_PORT" => Some("9".to_string()),
            "SMTP_USER" => Some("jdoe".to_string()),
            "SMTP_PASSWORD" => Some("secret".to_string()),
            "MAIL_FROM" => Some("jdoe@example.com".to_string()),
            "MAIL_TO" => Some("".to_string()),
            _ => None,
        };
        let settings = Settings::from_sources(&serde_json::Map::new(), env).unwrap();
        let w = ActivityWindow::parse("2026-02-16", "2026-02-20").unwrap();
        let saved = DraftStore::new(&paths).save(&w, "# report\n").unwrap();

        let err = execute(&paths, &settings, None, None).unwrap_err();
        let mail_err = err.downcast_ref::<MailError>().unwrap();
        assert!(mail_err.is_config());
        assert!(err.to_string().contains("MAIL_TO"));
        // the draft survives a failed send
        assert!(saved.exists());
        assert!(!paths.thread_json.exists());
    }
}
