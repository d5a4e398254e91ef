use crate::app::{App, ReaderView, Screen, MAX_SCROLL};
use crate::reader::ReaderState;
use crate::theme::StyleMap;
use crate::ui::helpers::format_relative_time;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::status::spinner;

/// Render the reader screen: address bar on top, page below.
pub fn render(f: &mut Frame, app: &App, area: Rect) {
    let Screen::Reader(view) = &app.screen else {
        return;
    };
    if area.width < 3 || area.height < 6 {
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    render_address_bar(f, app, view, chunks[0]);

    let (title, lines) = page_lines(app, view);
    let paragraph = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("border"))
                .title(title),
        )
        .style(app.style("body"))
        .wrap(Wrap { trim: false })
        .scroll((view.scroll.min(MAX_SCROLL) as u16, 0));
    f.render_widget(paragraph, chunks[1]);
}

fn render_address_bar(f: &mut Frame, app: &App, view: &ReaderView, area: Rect) {
    let (text, style, border) = match &view.input {
        Some(input) => (format!("{input}_"), app.style("input_active"), "border_focused"),
        None => (view.address.clone(), app.style("input"), "border"),
    };
    let bar = Paragraph::new(text).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.style(border))
            .title(" Address "),
    );
    f.render_widget(bar, area);
}

/// Title and body for the page pane in the reader's current state.
fn page_lines(app: &App, view: &ReaderView) -> (&'static str, Vec<Line<'static>>) {
    match app.reader.state() {
        ReaderState::Idle => (
            " Live page ",
            vec![
                Line::from(Span::styled(view.address.clone(), app.style("link"))),
                Line::from(""),
                Line::from(Span::styled(
                    "Live pages open in your browser. Simplify to read the page here.",
                    app.style("metadata"),
                )),
            ],
        ),
        ReaderState::Fetching { request, .. } => (
            " Simplifying ",
            vec![
                Line::from(Span::styled(
                    format!("{} Simplifying {}", spinner(app), request.target_url()),
                    app.style("notice"),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Cancel to keep the live page.",
                    app.style("metadata"),
                )),
            ],
        ),
        ReaderState::Simplified { url, fields } => {
            let mut lines = Vec::new();
            let title = fields
                .title
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or("(untitled)");
            lines.push(Line::from(Span::styled(
                title.to_owned(),
                app.style("heading").add_modifier(Modifier::BOLD),
            )));

            let mut meta = Vec::new();
            if let Some(author) = fields.author.as_deref().filter(|a| !a.trim().is_empty()) {
                meta.push(author.to_owned());
            }
            let when = format_relative_time(fields.publish_time.as_deref());
            if !when.is_empty() {
                meta.push(when);
            }
            meta.push(url.clone());
            lines.push(Line::from(Span::styled(meta.join(" • "), app.style("metadata"))));
            lines.push(Line::from(""));

            match fields.content.as_deref().filter(|c| !c.trim().is_empty()) {
                Some(content) => lines.extend(render_markdown(content, &app.theme)),
                None => lines.push(Line::from(Span::styled(
                    "The page had no readable content.",
                    app.style("notice"),
                ))),
            }
            (" Simplified ", lines)
        }
    }
}

/// Convert markdown to styled ratatui Lines.
pub fn render_markdown(md: &str, styles: &StyleMap) -> Vec<Line<'static>> {
    let parser = Parser::new(md);
    let mut lines: Vec<Line<'static>> = Vec::with_capacity(md.lines().count());
    let mut current_spans: Vec<Span<'static>> = Vec::with_capacity(4);
    let mut in_code_block = false;
    let mut in_heading = false;
    let mut in_emphasis = false;
    let mut in_strong = false;
    let mut link: Option<String> = None;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                in_heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
                lines.push(Line::from(""));
                in_heading = false;
            }
            Event::End(TagEnd::Paragraph) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
                lines.push(Line::from(""));
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                lines.push(Line::from(""));
            }
            Event::Start(Tag::Emphasis) => in_emphasis = true,
            Event::End(TagEnd::Emphasis) => in_emphasis = false,
            Event::Start(Tag::Strong) => in_strong = true,
            Event::End(TagEnd::Strong) => in_strong = false,
            Event::Start(Tag::Link { dest_url, .. }) => {
                link = Some(dest_url.into_string());
            }
            Event::End(TagEnd::Link) => {
                if let Some(url) = link.take().filter(|u| !u.is_empty()) {
                    current_spans.push(Span::styled(format!(" <{url}>"), styles.resolve("metadata")));
                }
            }
            Event::Start(Tag::Image { dest_url, .. }) => {
                current_spans.push(Span::styled(
                    format!("[Image: {}]", dest_url),
                    styles.resolve("link"),
                ));
            }
            Event::Text(text) => {
                if in_code_block {
                    // Code blocks keep their line structure.
                    for line in text.lines() {
                        lines.push(Line::from(Span::styled(
                            line.to_owned(),
                            styles.resolve("code_block"),
                        )));
                    }
                    continue;
                }
                let style = if in_heading {
                    styles.resolve("heading")
                } else if link.is_some() {
                    styles.resolve("link")
                } else if in_strong {
                    styles.resolve("strong")
                } else if in_emphasis {
                    styles.resolve("emphasis")
                } else {
                    styles.resolve("body")
                };
                current_spans.push(Span::styled(text.into_string(), style));
            }
            Event::Code(code) => {
                current_spans.push(Span::styled(
                    format!("`{}`", code),
                    styles.resolve("inline_code"),
                ));
            }
            Event::SoftBreak => {
                current_spans.push(Span::raw(" "));
            }
            Event::HardBreak => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
            }
            Event::End(TagEnd::Item) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
            }
            Event::Start(Tag::Item) => {
                current_spans.push(Span::raw("• "));
            }
            _ => {}
        }
    }

    if !current_spans.is_empty() {
        lines.push(Line::from(current_spans));
    }

    // Drop the blank line the last block leaves behind.
    while lines
        .last()
        .is_some_and(|l| l.spans.iter().all(|s| s.content.is_empty()))
    {
        lines.pop();
    }

    lines
}
