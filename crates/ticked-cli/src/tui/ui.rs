//! UI rendering

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use ticked_core::sync::SyncStatus;

use super::app::{App, AuthField, InputMode, Route};

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App) {
    match app.route {
        Route::Todos => draw_todos(frame, app),
        Route::SignIn | Route::SignUp => draw_auth(frame, app),
    }
}

// ==================== Todos screen ====================

fn draw_todos(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_input_line(frame, app, chunks[0]);
    draw_todo_list(frame, app, chunks[1]);
    draw_status_bar(frame, app, chunks[2]);
}

/// Draw the new-todo input line (top)
fn draw_input_line(frame: &mut Frame, app: &App, area: Rect) {
    let is_active = app.input_mode == InputMode::Insert;

    let border_style = if is_active {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let text = if is_active {
        format!("{}▌", app.input)
    } else if app.input.is_empty() {
        "Press i to type a new todo...".to_string()
    } else {
        app.input.clone()
    };

    let style = if is_active || !app.input.is_empty() {
        Style::default()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let input = Paragraph::new(text).style(style).block(
        Block::default()
            .title(" New todo ")
            .borders(Borders::ALL)
            .border_style(border_style),
    );

    frame.render_widget(input, area);
}

/// Draw the todo list (middle)
fn draw_todo_list(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .todos
        .iter()
        .map(|todo| {
            let editing = app
                .editing
                .as_ref()
                .filter(|draft| draft.id == todo.id);

            if let Some(draft) = editing {
                // Inline edit: show the draft instead of the stored title
                return ListItem::new(Line::from(vec![
                    Span::styled("edit ", Style::default().fg(Color::Yellow)),
                    Span::raw(format!("{}▌", draft.text)),
                ]));
            }

            let check = if todo.completed { "[x] " } else { "[ ] " };
            let title_style = if todo.completed {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::CROSSED_OUT)
            } else {
                Style::default()
            };

            ListItem::new(Line::from(vec![
                Span::raw(check),
                Span::styled(todo.title.clone(), title_style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().title(" Todos ").borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !app.todos.is_empty() {
        state.select(Some(app.selected));
    }

    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the status bar (bottom)
fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let sync = match app.sync_status {
        SyncStatus::Connected => Span::styled("✓ synced", Style::default().fg(Color::Green)),
        SyncStatus::Syncing => Span::styled("⟳ syncing", Style::default().fg(Color::Yellow)),
        SyncStatus::Error => Span::styled("⚠ sync error", Style::default().fg(Color::Red)),
        SyncStatus::Disconnected => Span::styled("· offline", Style::default().fg(Color::DarkGray)),
    };

    let help = match app.input_mode {
        InputMode::Normal => "i:new  space:toggle  e:edit  d:delete  L:logout  q:quit",
        InputMode::Insert => "enter:add  esc:back",
        InputMode::Edit => "enter:save  esc:cancel",
    };

    let middle = match &app.status_message {
        Some(message) => Span::styled(message.clone(), Style::default().fg(Color::Yellow)),
        None => Span::styled(help, Style::default().fg(Color::DarkGray)),
    };

    let line = Line::from(vec![sync, Span::raw("  "), middle]);
    frame.render_widget(Paragraph::new(line), area);
}

// ==================== Auth screens ====================

fn draw_auth(frame: &mut Frame, app: &App) {
    let title = match app.route {
        Route::SignIn => " Sign In ",
        _ => " Sign Up ",
    };

    let area = centered_rect(44, frame.area());

    let field_count = if app.route == Route::SignUp { 3 } else { 2 };
    let mut constraints = vec![Constraint::Length(2)];
    constraints.extend(std::iter::repeat(Constraint::Length(3)).take(field_count));
    constraints.push(Constraint::Length(2));
    constraints.push(Constraint::Min(0));

    let outer = Block::default().title(title).borders(Borders::ALL);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    let header = match app.route {
        Route::SignIn => "Sign in to your account",
        _ => "Create a new account",
    };
    frame.render_widget(
        Paragraph::new(header).alignment(Alignment::Center),
        chunks[0],
    );

    draw_auth_field(
        frame,
        chunks[1],
        "Username",
        &app.form.username,
        false,
        app.form.focus == AuthField::Username,
    );
    draw_auth_field(
        frame,
        chunks[2],
        "Password",
        &app.form.password,
        true,
        app.form.focus == AuthField::Password,
    );
    if app.route == Route::SignUp {
        draw_auth_field(
            frame,
            chunks[3],
            "Confirm password",
            &app.form.confirm,
            true,
            app.form.focus == AuthField::Confirm,
        );
    }

    let footer_area = chunks[field_count + 1];
    let footer = match &app.status_message {
        Some(message) => Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Yellow),
        )),
        None => {
            let hint = match app.route {
                Route::SignIn => "enter:sign in  tab:next field  ^n:create account  esc:quit",
                _ => "enter:sign up  tab:next field  ^n:back to sign in  esc:quit",
            };
            Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))
        }
    };
    frame.render_widget(
        Paragraph::new(footer).alignment(Alignment::Center),
        footer_area,
    );
}

fn draw_auth_field(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    value: &str,
    mask: bool,
    focused: bool,
) {
    let shown = if mask {
        "*".repeat(value.chars().count())
    } else {
        value.to_string()
    };

    let text = if focused {
        format!("{shown}▌")
    } else {
        shown
    };

    let border_style = if focused {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    let field = Paragraph::new(text).block(
        Block::default()
            .title(format!(" {label} "))
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    frame.render_widget(field, area);
}

/// A horizontally centered rect of the given width, vertically centered
fn centered_rect(width: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = 16.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}
