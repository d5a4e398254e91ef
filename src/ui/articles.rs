use crate::api::{Article, Category};
use crate::app::{App, ArticleListState, Screen, MAX_SCROLL};
use crate::ui::helpers::format_relative_time;
use crate::util::{display_width, truncate_to_width};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::render::screen_block;
use super::status::spinner;
use super::tasks::render_search_prompt;

/// Render the category article list
pub fn render_list(f: &mut Frame, app: &App, area: Rect) {
    let Screen::ArticleList(state) = &app.screen else {
        return;
    };

    let mut constraints = vec![Constraint::Length(3)];
    if state.search_input.is_some() {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Min(0));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    render_category_bar(f, app, state, chunks[0]);
    if let Some(input) = &state.search_input {
        render_search_prompt(f, app, input, chunks[1]);
    }
    let list_area = chunks[chunks.len() - 1];

    let mut title = format!("Articles (page {}, by {})", state.page, state.sort.label());
    if !state.search.is_empty() {
        title.push_str(&format!(" matching \"{}\"", state.search));
    }

    let items: Vec<ListItem> = if state.articles.is_empty() {
        let text = if state.loading {
            format!("{} Loading articles...", spinner(app))
        } else if state.categories.is_empty() {
            "No categories selected".to_string()
        } else {
            "No articles".to_string()
        };
        vec![ListItem::new(text)]
    } else {
        // Borders and highlight symbol.
        let width = list_area.width.saturating_sub(4) as usize;
        state
            .articles
            .iter()
            .map(|article| ListItem::new(article_row(app, article, width)))
            .collect()
    };

    let list = List::new(items)
        .block(screen_block(app, title))
        .highlight_style(app.style("list_selected"))
        .highlight_symbol("> ");

    let selected = (!state.articles.is_empty()).then_some(state.selected);
    let mut list_state = ListState::default().with_selected(selected);
    f.render_stateful_widget(list, list_area, &mut list_state);
}

fn render_category_bar(f: &mut Frame, app: &App, state: &ArticleListState, area: Rect) {
    let mut spans = Vec::with_capacity(Category::ALL.len() * 2);
    for (i, category) in Category::ALL.iter().enumerate() {
        let style = if state.categories.contains(category) {
            app.style("category_on")
        } else {
            app.style("category_off")
        };
        spans.push(Span::styled(format!("{} {}", i + 1, category.label()), style));
        spans.push(Span::raw(" "));
    }
    let bar = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.style("border"))
            .title(" Categories (0 all) "),
    );
    f.render_widget(bar, area);
}

/// `[Badge] Title ... time`, fitted to `width` columns.
fn article_row(app: &App, article: &Article, width: usize) -> Line<'static> {
    let badge = article
        .category
        .as_deref()
        .map(|raw| format!("[{}] ", Category::label_for(raw)))
        .unwrap_or_default();
    let time = format_relative_time(article.publish_time.as_deref());
    let time = if time.is_empty() { time } else { format!("  {time}") };

    let room = width.saturating_sub(display_width(&badge) + display_width(&time));
    let title = truncate_to_width(article.title(), room).into_owned();

    Line::from(vec![
        Span::styled(badge, app.style("category_badge")),
        Span::styled(title, app.style("list_normal")),
        Span::styled(time, app.style("list_meta")),
    ])
}

/// Full text of one article for the detail views.
pub(super) fn article_lines(app: &App, article: &Article) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        article.title().to_owned(),
        app.style("heading").add_modifier(Modifier::BOLD),
    ))];

    let mut meta = Vec::new();
    if let Some(author) = article.author.as_deref().filter(|a| !a.trim().is_empty()) {
        meta.push(author.to_owned());
    }
    let when = format_relative_time(article.publish_time.as_deref());
    if !when.is_empty() {
        meta.push(when);
    }
    if let Some(raw) = article.category.as_deref() {
        meta.push(Category::label_for(raw).to_owned());
    }
    if let Some(keyword) = article.keyword.as_deref().filter(|k| !k.is_empty()) {
        meta.push(format!("keyword: {keyword}"));
    }
    if !meta.is_empty() {
        lines.push(Line::from(Span::styled(meta.join(" • "), app.style("metadata"))));
    }
    if let Some(url) = article.source_url.as_deref().filter(|u| !u.is_empty()) {
        lines.push(Line::from(Span::styled(url.to_owned(), app.style("link"))));
    }
    lines.push(Line::from(""));

    if let Some(summary) = article.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(Line::from(Span::styled("Summary", app.style("strong"))));
        lines.extend(summary.lines().map(|l| Line::from(l.to_owned())));
        lines.push(Line::from(""));
    }

    match article.body() {
        Some(body) => lines.extend(body.lines().map(|l| Line::from(l.to_owned()))),
        None => lines.push(Line::from(Span::styled("No content.", app.style("notice")))),
    }
    lines
}

pub fn render_detail(f: &mut Frame, app: &App, area: Rect) {
    let Screen::ArticleDetail(state) = &app.screen else {
        return;
    };

    let paragraph = Paragraph::new(Text::from(article_lines(app, &state.article)))
        .block(screen_block(app, "Article"))
        .style(app.style("body"))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll.min(MAX_SCROLL) as u16, 0));
    f.render_widget(paragraph, area);
}
