use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

// Mail clients drop <style> blocks, so layout goes on each element.
const LIST_STYLE: &str = "margin:0 0 12px 0;padding-left:24px;";
const ITEM_STYLE: &str = "margin:4px 0;";
const TABLE_STYLE: &str = "border-collapse:collapse;margin:8px 0 16px 0;font-size:14px;";
const TH_STYLE: &str =
    "border:1px solid #d0d7de;padding:6px 10px;background:#f6f8fa;text-align:left;";
const TD_STYLE: &str = "border:1px solid #d0d7de;padding:6px 10px;vertical-align:top;";

/// CommonMark (with tables) to an HTML fragment that survives email clients.
///
/// Links open in a new tab without leaking the opener; lists and tables carry
/// inline styles.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Start(Tag::Link {
            dest_url, title, ..
        }) => Event::InlineHtml(CowStr::from(open_link(&dest_url, &title))),
        Event::End(TagEnd::Link) => Event::InlineHtml(CowStr::Borrowed("</a>")),
        Event::Start(Tag::List(None)) => {
            Event::Html(CowStr::from(format!("<ul style=\"{LIST_STYLE}\">\n")))
        }
        Event::Start(Tag::List(Some(start))) => {
            let start_attr = if start == 1 {
                String::new()
            } else {
                format!(" start=\"{start}\"")
            };
            Event::Html(CowStr::from(format!(
                "<ol{start_attr} style=\"{LIST_STYLE}\">\n"
            )))
        }
        Event::End(TagEnd::List(ordered)) => {
            Event::Html(CowStr::Borrowed(if ordered { "</ol>\n" } else { "</ul>\n" }))
        }
        Event::Start(Tag::Item) => Event::Html(CowStr::from(format!("<li style=\"{ITEM_STYLE}\">"))),
        Event::End(TagEnd::Item) => Event::Html(CowStr::Borrowed("</li>\n")),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 2);
    html::push_html(&mut out, events);
    style_tables(&out)
}

fn open_link(dest: &str, title: &str) -> String {
    let mut tag = format!("<a href=\"{}\"", escape_attr(dest));
    if !title.is_empty() {
        tag.push_str(&format!(" title=\"{}\"", escape_attr(title)));
    }
    tag.push_str(" target=\"_blank\" rel=\"noopener noreferrer\">");
    tag
}

/// Table tags come out of the writer bare; text content is escaped, so a
/// literal `<td>` can only be markup.
fn style_tables(html: &str) -> String {
    html.replace("<table>", &format!("<table style=\"{TABLE_STYLE}\">"))
        .replace("<th>", &format!("<th style=\"{TH_STYLE}\">"))
        .replace("<td>", &format!("<td style=\"{TD_STYLE}\">"))
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
