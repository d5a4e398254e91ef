//! Login form and home menu.

use crate::app::{App, HomeItem, LoginField, LoginForm, LoginMode, Screen};
use crate::util::mask;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::render::screen_block;
use super::status::spinner;

const FORM_WIDTH: u16 = 50;

pub fn render_login(f: &mut Frame, app: &App, area: Rect) {
    let Screen::Login(form) = &app.screen else {
        return;
    };

    let width = FORM_WIDTH.min(area.width);
    let height = 11u16.min(area.height);
    let form_area = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    );

    let title = match form.mode {
        LoginMode::Login => "Log in",
        LoginMode::Register => "Register",
    };
    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(app.style("border_focused"))
        .title(format!(" {title} "));
    let inner = outer.inner(form_area);
    f.render_widget(outer, form_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(inner);

    let first_label = match form.mode {
        LoginMode::Login => "Account",
        LoginMode::Register => "Name",
    };
    render_field(f, app, form, LoginField::Account, first_label, form.account.clone(), rows[0]);
    render_field(
        f,
        app,
        form,
        LoginField::Password,
        "Password",
        mask(form.password()),
        rows[1],
    );

    let footer = if form.busy {
        Line::from(Span::styled(
            format!("{} Contacting server...", spinner(app)),
            app.style("notice"),
        ))
    } else {
        let other = match form.mode {
            LoginMode::Login => "register",
            LoginMode::Register => "log in",
        };
        Line::from(Span::styled(
            format!("Enter to submit, Ctrl+R to {other}"),
            app.style("metadata"),
        ))
    };
    f.render_widget(Paragraph::new(footer).alignment(Alignment::Center), rows[2]);
}

fn render_field(
    f: &mut Frame,
    app: &App,
    form: &LoginForm,
    field: LoginField,
    label: &str,
    value: String,
    area: Rect,
) {
    let focused = form.focus == field && !form.busy;
    let (text, style, border) = if focused {
        (format!("{value}_"), app.style("input_active"), "border_focused")
    } else {
        (value, app.style("input"), "border")
    };
    let widget = Paragraph::new(text).style(style).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.style(border))
            .title(format!(" {label} ")),
    );
    f.render_widget(widget, area);
}

pub fn render_home(f: &mut Frame, app: &App, area: Rect) {
    let Screen::Home { selected } = &app.screen else {
        return;
    };

    let items: Vec<ListItem> = HomeItem::ALL
        .iter()
        .map(|item| ListItem::new(format!("  {}", item.label())).style(app.style("list_normal")))
        .collect();

    let title = match &app.session {
        Some(user) => format!("Home: {}", user.display_name()),
        None => "Home".to_string(),
    };
    let list = List::new(items)
        .block(screen_block(app, title))
        .highlight_style(app.style("list_selected"))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(*selected));
    f.render_stateful_widget(list, area, &mut state);
}
