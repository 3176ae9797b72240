use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};
use pdfchat_core::ModelProvider;
use crate::app::{App, FocusPane, InputMode, Picker, SettingsSection};

const SETTINGS_WIDTH: u16 = 48;
const MAX_LISTED_FILES: usize = 8;

/// Wrap text to fit within a given width, returning multiple lines
/// Uses word boundaries for wrapping (doesn't break mid-word)
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if current_len == 0 {
            current_line = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current_line));
            current_line = word.to_string();
            current_len = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Wrap every paragraph of a multi-line string, keeping blank lines.
fn wrap_paragraphs(text: &str, width: usize) -> Vec<String> {
    text.lines()
        .flat_map(|line| wrap_text_to_width(line, width))
        .collect()
}

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    Line::from(spans)
}

/// Clamp a scroll offset so the last page stays filled.
fn clamp_scroll(scroll: u16, total_lines: usize, view_height: u16) -> u16 {
    let max = total_lines.saturating_sub(view_height as usize);
    (scroll as usize).min(max) as u16
}

fn border_style(focused: bool) -> Style {
    Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray })
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

fn dots(app: &App) -> String {
    ".".repeat(app.animation_frame as usize + 1)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, status_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let [settings_area, chat_area] = Layout::horizontal([
        Constraint::Length(SETTINGS_WIDTH),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_header(app, frame, header_area);
    render_settings(app, frame, settings_area);
    render_chat(app, frame, chat_area);
    render_status(app, frame, status_area);
    render_footer(app, frame, footer_area);

    if app.file_browser.is_some() {
        render_file_browser(app, frame, area);
    } else if let Some(picker) = app.picker {
        render_picker(app, picker, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Multi-PDF Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!(" {} ", app.client.base_url()),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_settings(app: &mut App, frame: &mut Frame, area: Rect) {
    let banner_height = if app.state.build.error.is_some() { 3 } else { 0 };

    let [form_area, gauge_area, banner_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(banner_height),
    ])
    .areas(area);

    let focused = app.focus == FocusPane::Settings;
    let label_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let config = &app.state.config;

    let items: Vec<ListItem> = SettingsSection::all()
        .iter()
        .map(|section| {
            let mut lines = Vec::new();
            match section {
                SettingsSection::Model => {
                    let provider = ModelProvider::for_model(&config.model);
                    lines.push(Line::from(Span::styled(section.label(), label_style)));
                    lines.push(Line::from(vec![
                        Span::raw(format!("  {} ", config.model)),
                        Span::styled(
                            format!("({})", provider.display_name()),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]));
                }
                SettingsSection::EmbeddingModel => {
                    lines.push(Line::from(Span::styled(section.label(), label_style)));
                    lines.push(Line::from(format!("  {}", config.embedding_model)));
                }
                SettingsSection::Files => {
                    let files = &app.state.files;
                    lines.push(Line::from(Span::styled(
                        format!("{} ({})", section.label(), files.len()),
                        label_style,
                    )));
                    if files.is_empty() {
                        lines.push(Line::from(Span::styled(
                            "  none selected",
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                    for file in files.iter().take(MAX_LISTED_FILES) {
                        lines.push(Line::from(format!("  - {}", file.name)));
                    }
                    if files.len() > MAX_LISTED_FILES {
                        lines.push(Line::from(Span::styled(
                            format!("  ... and {} more", files.len() - MAX_LISTED_FILES),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }
                SettingsSection::Build => {
                    let text = if app.is_building() {
                        format!("[ Building{} ]", dots(app))
                    } else {
                        "[ Build Index ]".to_string()
                    };
                    lines.push(Line::from(Span::styled(
                        text,
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    )));
                }
                numeric => {
                    let editing = app.input_mode == InputMode::Editing
                        && focused
                        && app.section == *numeric;
                    let value = if editing {
                        let byte_pos = app
                            .field_input
                            .char_indices()
                            .nth(app.field_cursor)
                            .map(|(i, _)| i)
                            .unwrap_or(app.field_input.len());
                        let (before, after) = app.field_input.split_at(byte_pos);
                        Line::from(vec![
                            Span::styled(format!("  {}", before), Style::default().fg(Color::Cyan)),
                            Span::styled("|", Style::default().fg(Color::Yellow)),
                            Span::styled(after.to_string(), Style::default().fg(Color::Cyan)),
                        ])
                    } else {
                        let current = numeric
                            .numeric_field()
                            .map(|f| f.current(config))
                            .unwrap_or_default();
                        Line::from(format!("  {}", current))
                    };
                    lines.push(Line::from(Span::styled(section.label(), label_style)));
                    lines.push(value);
                }
            }
            lines.push(Line::default());
            ListItem::new(lines)
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(focused))
        .title(" Settings ");

    let list = List::new(items)
        .block(block)
        .highlight_style(if focused {
            Style::default().bg(Color::Blue).fg(Color::White)
        } else {
            Style::default()
        })
        .highlight_symbol(if focused { "> " } else { "  " });

    let mut state = ListState::default().with_selected(Some(app.section.index()));
    frame.render_stateful_widget(list, form_area, &mut state);

    let progress = app.state.build.progress.min(100) as u16;
    let label = if app.is_building() {
        format!("Building index{}", dots(app))
    } else if app.state.build.ready && progress == 100 {
        "Index ready".to_string()
    } else {
        format!("{}%", progress)
    };

    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" Progress "))
        .gauge_style(Style::default().fg(Color::Green).bg(Color::Black))
        .percent(progress)
        .label(label);
    frame.render_widget(gauge, gauge_area);

    if let Some(error) = &app.state.build.error {
        let banner = Paragraph::new(error.as_str())
            .style(Style::default().fg(Color::Red))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(banner, banner_area);
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [question_area, answer_area, history_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Percentage(45),
        Constraint::Min(0),
    ])
    .areas(area);

    app.answer_area = Some(answer_area);
    app.history_area = Some(history_area);

    render_question(app, frame, question_area);
    render_answer(app, frame, answer_area);
    render_history(app, frame, history_area);
}

fn render_question(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Question;
    let editing = focused && app.input_mode == InputMode::Editing;
    let enabled = app.state.can_ask();

    let title = if app.is_querying() {
        format!(" Ask a Question (waiting{}) ", dots(app))
    } else {
        " Ask a Question ".to_string()
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if editing {
            Style::default().fg(Color::Yellow)
        } else {
            border_style(focused)
        })
        .title(title);

    if !enabled {
        let placeholder = Paragraph::new("Build the index to enable questions")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    // Horizontal scroll keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.question_cursor.min(app.state.question.chars().count());
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .state
        .question
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_answer(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Answer;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(focused))
        .title(" Answer ");

    let inner = block.inner(area);
    let width = inner.width as usize;

    let mut lines: Vec<Line> = Vec::new();
    if app.is_querying() {
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots(app)),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else if app.state.answer.is_empty() {
        lines.push(Line::from(Span::styled(
            "Answers appear here.",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        let is_error = app.state.answer_is_error;
        for line in wrap_paragraphs(&app.state.answer, width) {
            if is_error {
                lines.push(Line::from(Span::styled(line, Style::default().fg(Color::Red))));
            } else {
                lines.push(parse_markdown_line(&line));
            }
        }
    }

    if !app.state.sources.is_empty() && !app.is_querying() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "Sources:",
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )));
        for source in &app.state.sources {
            for line in wrap_text_to_width(&format!("- {}", source), width) {
                lines.push(Line::from(line));
            }
        }
    }

    app.answer_scroll = clamp_scroll(app.answer_scroll, lines.len(), inner.height);

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.answer_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_history(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::History;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(focused))
        .title(format!(" Chat History ({}) ", app.state.transcript.len()));

    let inner = block.inner(area);
    let width = inner.width.saturating_sub(3) as usize;

    if app.state.transcript.is_empty() {
        let placeholder = Paragraph::new("No questions asked yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let q_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let a_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let mut lines: Vec<Line> = Vec::new();
    for turn in &app.state.transcript {
        for (i, line) in wrap_paragraphs(&turn.question, width).into_iter().enumerate() {
            let prefix = if i == 0 { "Q: " } else { "   " };
            lines.push(Line::from(vec![Span::styled(prefix, q_style), Span::raw(line)]));
        }
        for (i, line) in wrap_paragraphs(&turn.answer, width).into_iter().enumerate() {
            let prefix = if i == 0 { "A: " } else { "   " };
            let mut spans = vec![Span::styled(prefix, a_style)];
            spans.extend(parse_markdown_line(&line).spans);
            lines.push(Line::from(spans));
        }
        lines.push(Line::default());
    }

    let bottom = lines.len().saturating_sub(inner.height as usize) as u16;
    app.history_scroll = if app.history_follow {
        bottom
    } else {
        clamp_scroll(app.history_scroll, lines.len(), inner.height)
    };

    let paragraph = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.history_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    let text = app.status_message.as_deref().unwrap_or("");
    let status = Paragraph::new(Span::styled(
        format!(" {}", text),
        Style::default().fg(Color::Gray),
    ));
    frame.render_widget(status, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let hints: Vec<Span> = if app.file_browser.is_some() {
        [
            hint("Enter", "open/toggle"),
            hint("Space", "mark"),
            hint("h", "parent"),
            hint("a", "accept"),
            hint("Esc", "cancel"),
        ]
        .concat()
    } else if app.picker.is_some() {
        [hint("j/k", "nav"), hint("Enter", "select"), hint("Esc", "cancel")].concat()
    } else {
        match (app.focus, app.input_mode) {
            (FocusPane::Settings, InputMode::Editing) | (FocusPane::Question, InputMode::Editing) => {
                let enter = if app.focus == FocusPane::Question { "ask" } else { "save" };
                [hint("Enter", enter), hint("Esc", "cancel")].concat()
            }
            (FocusPane::Settings, _) => [
                hint("j/k", "field"),
                hint("Enter", "edit"),
                hint("b", "build"),
                hint("Tab", "focus"),
                hint("q", "quit"),
            ]
            .concat(),
            (FocusPane::Question, _) => {
                [hint("Enter", "type"), hint("Tab", "focus"), hint("q", "quit")].concat()
            }
            _ => [
                hint("j/k", "scroll"),
                hint("Tab", "focus"),
                hint("q", "quit"),
            ]
            .concat(),
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_picker(app: &mut App, picker: Picker, frame: &mut Frame, area: Rect) {
    let items = picker.items();
    let popup_area = centered_popup(area, 64, items.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let current = match picker {
        Picker::Model => &app.state.config.model,
        Picker::EmbeddingModel => &app.state.config.embedding_model,
    };

    let list_items: Vec<ListItem> = items
        .iter()
        .map(|model| {
            let style = if *model == current.as_str() {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let text = match picker {
                Picker::Model => format!(
                    " {} ({}) ",
                    model,
                    ModelProvider::for_model(model).display_name()
                ),
                Picker::EmbeddingModel => format!(" {} ", model),
            };
            ListItem::new(text).style(style)
        })
        .collect();

    let list = List::new(list_items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(picker.title()),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.picker_state);
}

fn render_file_browser(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(browser) = app.file_browser.as_mut() else {
        return;
    };

    let popup_area = centered_popup(area, area.width * 7 / 10, area.height * 7 / 10);
    frame.render_widget(Clear, popup_area);

    let items: Vec<ListItem> = browser
        .entries
        .iter()
        .map(|entry| {
            if entry.is_dir {
                ListItem::new(format!("    {}/", entry.name))
                    .style(Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD))
            } else if browser.is_marked(&entry.path) {
                ListItem::new(format!("[x] {}", entry.name))
                    .style(Style::default().fg(Color::Green))
            } else {
                ListItem::new(format!("[ ] {}", entry.name))
            }
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", browser.dir.display()))
        .title_bottom(format!(" {} marked - a to accept ", browser.marked.len()));

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut browser.state);
}
