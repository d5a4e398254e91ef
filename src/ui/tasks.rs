//! Task list, task articles and keyword report screens.

use crate::app::{App, Screen, TaskListState, MAX_SCROLL};
use crate::ui::helpers::format_relative_time;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use super::articles::article_lines;
use super::reader::render_markdown;
use super::render::screen_block;
use super::status::spinner;

pub fn render_list(f: &mut Frame, app: &App, area: Rect) {
    let Screen::TaskList(state) = &app.screen else {
        return;
    };

    let area = match &state.search_input {
        Some(input) => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(0)])
                .split(area);
            render_search_prompt(f, app, input, chunks[0]);
            chunks[1]
        }
        None => area,
    };

    let title = list_title(app, state);
    if state.tasks.is_empty() {
        let text = if state.loading {
            format!("{} Loading tasks...", spinner(app))
        } else {
            "No tasks".to_string()
        };
        f.render_widget(Paragraph::new(text).block(screen_block(app, title)), area);
        return;
    }

    let rows: Vec<Row> = state
        .tasks
        .iter()
        .map(|task| {
            Row::new(vec![
                Span::styled(task.task_id.to_string(), app.style("list_normal")),
                Span::styled(task.status.label().to_owned(), app.theme.task_status(&task.status)),
                Span::styled(
                    format_relative_time(task.created_at.as_deref()),
                    app.style("list_meta"),
                ),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(12),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(
        Row::new(vec!["Task", "Status", "Created"])
            .style(app.style("heading").add_modifier(Modifier::BOLD)),
    )
    .block(screen_block(app, title))
    .row_highlight_style(app.style("list_selected"))
    .highlight_symbol("> ");

    let mut table_state = TableState::default().with_selected(Some(state.selected));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn list_title(app: &App, state: &TaskListState) -> String {
    let mut title = format!(
        "{} (page {}/{})",
        state.kind.title(),
        state.page,
        state.page_count(app.per_page)
    );
    if !state.search.is_empty() {
        title.push_str(&format!(" matching \"{}\"", state.search));
    }
    title
}

/// One-line prompt shown above a list while a search is being typed.
pub(super) fn render_search_prompt(f: &mut Frame, app: &App, input: &str, area: Rect) {
    let prompt = Paragraph::new(format!("{input}_"))
        .style(app.style("input_active"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.style("border_focused"))
                .title(" Search "),
        );
    f.render_widget(prompt, area);
}

pub fn render_detail(f: &mut Frame, app: &App, area: Rect) {
    let Screen::TaskDetail(state) = &app.screen else {
        return;
    };

    let position = if state.articles.is_empty() {
        String::new()
    } else {
        format!(" ({}/{})", state.index + 1, state.articles.len())
    };
    let title = format!("{} {}{}", state.kind.title(), state.task_id, position);

    let lines = match state.current() {
        Some(article) => article_lines(app, article),
        None if state.loading => vec![Line::from(format!("{} Loading articles...", spinner(app)))],
        None => vec![Line::from(Span::styled(
            "This task produced no articles.",
            app.style("notice"),
        ))],
    };

    let paragraph = Paragraph::new(Text::from(lines))
        .block(screen_block(app, title))
        .style(app.style("body"))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll.min(MAX_SCROLL) as u16, 0));
    f.render_widget(paragraph, area);
}

pub fn render_report(f: &mut Frame, app: &App, area: Rect) {
    let Screen::Report(state) = &app.screen else {
        return;
    };

    let title = format!("Report for task {}", state.task_id);
    let lines = match &state.report {
        None => vec![Line::from(format!("{} Loading report...", spinner(app)))],
        Some(report) => {
            let mut lines = Vec::new();
            let heading = report
                .title
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or("(untitled report)");
            lines.push(Line::from(Span::styled(
                heading.to_owned(),
                app.style("heading").add_modifier(Modifier::BOLD),
            )));
            if let Some(keyword) = report.keyword.as_deref().filter(|k| !k.is_empty()) {
                lines.push(Line::from(Span::styled(
                    format!("Keyword: {keyword}"),
                    app.style("metadata"),
                )));
            }
            lines.push(Line::from(""));
            match report.content.as_deref().filter(|c| !c.trim().is_empty()) {
                Some(content) => lines.extend(render_markdown(content, &app.theme)),
                None => lines.push(Line::from(Span::styled(
                    "The report is empty.",
                    app.style("notice"),
                ))),
            }
            lines
        }
    };

    let paragraph = Paragraph::new(Text::from(lines))
        .block(screen_block(app, title))
        .style(app.style("body"))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll.min(MAX_SCROLL) as u16, 0));
    f.render_widget(paragraph, area);
}
