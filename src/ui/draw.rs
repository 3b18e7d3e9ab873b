use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render modals
use tui_widgets::popup::Popup;

use crate::config::{RgbColor, UiColors};
use crate::controller::NoticeKind;

use super::app::App;
use super::focus::Focus;
use super::form::FormField;

const FILTER_HELP: &str = "Type to filter  Enter: list  Esc: clear  Tab: next";
const FORM_HELP: &str = "Enter: add  Esc: list  Tab/Shift+Tab: switch field  F5: reload";
const LIST_HELP: &str = "j/k: move  x: delete  /: filter  a: add  F5: reload  q: quit";
const CONFIRM_HELP: &str = "Y/Enter: confirm  N/Esc: cancel";
const ALERT_HELP: &str = "Enter/Esc: dismiss";

pub fn render<B: Backend, S>(terminal: &mut Terminal<B>, app: &mut App<'_, S>) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame<S>(frame: &mut Frame<'_>, app: &mut App<'_, S>) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(0),
            Constraint::Length(2),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_filter(frame, layout[1], app);
    draw_form(frame, layout[2], app);
    draw_list(frame, layout[3], app);
    draw_notices(frame, layout[4], app);
    draw_footer(frame, layout[5], app);
    draw_confirm_modal(frame, size, app);
    draw_alert_modal(frame, size, app);
}

fn draw_header<S>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let colors = app.ui_colors();
    let line = Line::from(vec![
        Span::styled(
            "PHONEBOOK",
            label_style(colors).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(app.server_url().to_string(), label_style(colors)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_filter<S>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let colors = app.ui_colors();
    let active = app.focus == Focus::Filter && !has_modal(app);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(colors, active));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let label = "FILTER SHOWN WITH: ";
    let value = app.filter_input.value();
    let line = Line::from(vec![
        Span::styled(label, label_style(colors)),
        Span::styled(value.to_string(), value_style(colors, active)),
    ]);
    frame.render_widget(Paragraph::new(line), inner);

    if active {
        let x = inner
            .x
            .saturating_add(label.len() as u16)
            .saturating_add(app.filter_input.visual_cursor() as u16);
        frame.set_cursor_position((x.min(inner.right().saturating_sub(1)), inner.y));
    }
}

fn draw_form<S>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let colors = app.ui_colors();
    let active_field = if has_modal(app) {
        None
    } else {
        app.focus.form_field()
    };
    let title = Line::from(Span::styled("ADD A NEW", label_style(colors)));
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style(colors, active_field.is_some()));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let fields = [(FormField::Name, "NAME:   "), (FormField::Number, "NUMBER: ")];
    let lines: Vec<Line> = fields
        .iter()
        .map(|(field, label)| {
            let active = active_field == Some(*field);
            Line::from(vec![
                Span::styled(*label, label_style(colors)),
                Span::styled(
                    app.form.value(*field).to_string(),
                    value_style(colors, active),
                ),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);

    if let Some(field) = active_field {
        let row = match field {
            FormField::Name => 0,
            FormField::Number => 1,
        };
        if row < inner.height {
            let x = inner
                .x
                .saturating_add(fields[row as usize].1.len() as u16)
                .saturating_add(app.form.visual_cursor(field) as u16);
            frame.set_cursor_position((x.min(inner.right().saturating_sub(1)), inner.y + row));
        }
    }
}

fn draw_list<S>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let colors = app.ui_colors();
    let active = app.focus == Focus::List && !has_modal(app);
    let visible = app.book.visible();
    let total = app.book.contacts().len();

    let title = if app.book.filter().is_empty() {
        format!("{} ({})", Focus::List.title(), total)
    } else {
        format!("{} ({}/{})", Focus::List.title(), visible.len(), total)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(Line::from(Span::styled(title, label_style(colors))))
        .border_style(border_style(colors, active));

    let items: Vec<ListItem> = if visible.is_empty() {
        vec![ListItem::new(Line::from("No contacts"))]
    } else {
        visible
            .iter()
            .map(|contact| {
                ListItem::new(Line::from(vec![
                    Span::raw(contact.name.clone()),
                    Span::raw(" "),
                    Span::styled(contact.number.clone(), label_style(colors)),
                ]))
            })
            .collect()
    };

    let mut state = ListState::default();
    if !visible.is_empty() {
        state.select(Some(app.selected));
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(if active {
            selection_style(colors)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        });
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_notices<S>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let colors = app.ui_colors();
    let lines: Vec<Line> = NoticeKind::ALL
        .iter()
        .filter_map(|kind| app.book.notice(*kind))
        .map(|notice| {
            let fg = match notice.kind {
                NoticeKind::Info => colors.info_fg,
                NoticeKind::Error => colors.error_fg,
            };
            Line::from(Span::styled(
                notice.message.clone(),
                Style::default().fg(color(fg)).add_modifier(Modifier::BOLD),
            ))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_footer<S>(frame: &mut Frame<'_>, area: Rect, app: &App<'_, S>) {
    let message = if app.alert.is_some() {
        ALERT_HELP
    } else if app.pending_delete.is_some() {
        CONFIRM_HELP
    } else {
        match app.focus {
            Focus::Filter => FILTER_HELP,
            Focus::Name | Focus::Number => FORM_HELP,
            Focus::List => LIST_HELP,
        }
    };
    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    frame.render_widget(Paragraph::new(message).style(style), area);
}

fn draw_confirm_modal<S>(frame: &mut Frame<'_>, area: Rect, app: &mut App<'_, S>) {
    // an alert takes the popup slot while it is open
    if app.alert.is_some() {
        return;
    }
    let Some(contact) = app.pending_delete.as_ref() else {
        return;
    };

    let body = Text::from(vec![
        Line::from(format!("Delete {} ?", contact.name)),
        Line::from(""),
        Line::from(CONFIRM_HELP),
    ]);
    let colors = app.ui_colors().clone();
    let popup = Popup::new(body)
        .title(Line::from(Span::styled("DELETE", label_style(&colors))))
        .border_style(border_style(&colors, true));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn draw_alert_modal<S>(frame: &mut Frame<'_>, area: Rect, app: &mut App<'_, S>) {
    let Some(message) = app.alert.as_ref() else {
        return;
    };

    let body = Text::from(vec![
        Line::from(message.clone()),
        Line::from(""),
        Line::from(ALERT_HELP),
    ]);
    let colors = app.ui_colors().clone();
    let popup = Popup::new(body)
        .title(Line::from(Span::styled(
            "ALERT",
            Style::default().fg(color(colors.error_fg)),
        )))
        .border_style(Style::default().fg(color(colors.error_fg)));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);
}

fn has_modal<S>(app: &App<'_, S>) -> bool {
    app.alert.is_some() || app.pending_delete.is_some()
}

fn selection_style(colors: &UiColors) -> Style {
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn value_style(colors: &UiColors, active: bool) -> Style {
    if active {
        selection_style(colors)
    } else {
        Style::default()
    }
}

fn border_style(colors: &UiColors, active: bool) -> Style {
    let style = Style::default().fg(color(colors.border));
    if active {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

fn label_style(colors: &UiColors) -> Style {
    Style::default().fg(color(colors.label))
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}
