#![expect(clippy::inline_always)]

use std::fmt::Display;

use askama::Values;
use pulldown_cmark::{Event, Parser, html};

pub fn markdown<T: Display>(s: T, _: &dyn Values) -> askama::Result<String> {
    Ok(render_markdown(&s.to_string()))
}

/// Raw HTML in the source is emitted as text.
fn render_markdown(source: &str) -> String {
    let parser = Parser::new(source).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut output = String::new();

    html::push_html(&mut output, parser);

    output
}

#[cfg(test)]
mod tests {
    use super::render_markdown;

    #[test]
    fn raw_html_is_escaped() {
        let out = render_markdown("Hello <b>there</b> **world**");
        assert!(!out.contains("<b>"));
        assert!(out.contains("&lt;b&gt;"));
        assert!(out.contains("<strong>world</strong>"));
    }
}
