//! Screen rendering.
//!
//! All drawing is stateless: each function reads the [`App`] and paints one
//! screen. Focused elements get a marker and a highlight colour; editable
//! fields render a block cursor at the caret.

use super::app::App;
use super::state::{AnnotateForm, FormField, Screen, TextField};
use crate::guidelines;
use crate::models::QuestionVerdict;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

const FOCUS_COLOR: Color = Color::Yellow;
const ERROR_COLOR: Color = Color::Red;
const OK_COLOR: Color = Color::Green;

pub fn render(frame: &mut Frame, app: &App) {
    match app.screen {
        Screen::Password => render_password(frame, app),
        Screen::Login => render_login(frame, app),
        Screen::Calibration => render_calibration(frame, app),
        Screen::Annotate => render_annotate(frame, app),
        Screen::Finished => render_finished(frame, app),
    }
}

fn render_password(frame: &mut Frame, app: &App) {
    let area = centered_rect(60, 40, frame.area());

    let mut lines = vec![
        Line::from(""),
        Line::from("Please input the password to be granted access to the annotation tool."),
        Line::from(""),
        Line::from(vec![
            Span::styled("Password: ", Style::default().add_modifier(Modifier::BOLD)),
            masked_field_span(&app.password.input),
        ]),
        Line::from(""),
    ];

    if app.password.rejected {
        lines.push(Line::from(Span::styled(
            "That password is incorrect.",
            Style::default().fg(ERROR_COLOR),
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Enter to check · Ctrl+C to quit",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" QAnnotate Access ");
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: false }), area);
}

fn render_login(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(header_line("Login"), chunks[0]);

    let mut input_spans = vec![Span::styled(
        format!("Please enter your {} ID: ", app.platform),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    input_spans.extend(field_spans(&app.login.input, true));
    let input_line = Line::from(input_spans);
    let input_block = Block::default().borders(Borders::ALL);
    frame.render_widget(
        Paragraph::new(input_line).block(input_block),
        chunks[1],
    );

    let mut status_lines = Vec::new();
    if let Some(ref error) = app.login.error {
        status_lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(ERROR_COLOR),
        )));
    }
    if !app.login.known_users.is_empty() {
        status_lines.push(Line::from(Span::styled(
            format!("Existing profiles: {}", app.login.known_users.join(", ")),
            Style::default().fg(Color::DarkGray),
        )));
    }
    frame.render_widget(Paragraph::new(status_lines), chunks[2]);

    let purpose_block = Block::default()
        .borders(Borders::ALL)
        .title(" Purpose of this Tool ");
    frame.render_widget(
        Paragraph::new(guidelines::purpose_text())
            .block(purpose_block)
            .wrap(Wrap { trim: false }),
        chunks[3],
    );

    frame.render_widget(
        key_hints("Enter login · Ctrl+C quit"),
        chunks[4],
    );
}

fn render_calibration(frame: &mut Frame, app: &App) {
    let pages = guidelines::calibration_pages();
    let page = app.calibration.page.min(pages.len() - 1);
    let (title, text) = pages[page];

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.area());

    frame.render_widget(
        header_line(&format!("Instructions ({} / {})", page + 1, pages.len())),
        chunks[0],
    );

    frame.render_widget(
        Paragraph::new(
            "This tool will ask you to judge the quality, naturalness, and correctness of a \
             series of Question-Answer pairs, each associated with a short document. This step \
             demonstrates the kind of judgements we're looking for.",
        )
        .wrap(Wrap { trim: false }),
        chunks[1],
    );

    let body = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title));
    frame.render_widget(
        Paragraph::new(text)
            .block(body)
            .wrap(Wrap { trim: false })
            .scroll((app.calibration.scroll, 0)),
        chunks[2],
    );

    let next_label = if page + 1 == pages.len() {
        "Enter/→ start judgements"
    } else {
        "Enter/→ next page"
    };
    frame.render_widget(
        key_hints(&format!(
            "{} · ← previous · ↑/↓ scroll · Ctrl+D logout · Ctrl+C quit",
            next_label
        )),
        chunks[3],
    );
}

fn render_annotate(frame: &mut Frame, app: &App) {
    let Some(session) = app.session.as_ref() else {
        return;
    };
    let Some(record) = session.current() else {
        return;
    };
    let Some(form) = app.form.as_ref() else {
        return;
    };

    let judgement_lines = form_lines(form, record.question.as_str(), record.answer.as_str());
    let error_height = form.errors.len().min(4) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(judgement_lines.len() as u16 + 2),
            Constraint::Length(error_height),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let user = app.username.as_deref().unwrap_or("?");
    frame.render_widget(
        header_line(&format!(
            "Question-Answer Pair {} / {} · logged in as {:?}",
            session.position() + 1,
            session.total(),
            user
        )),
        chunks[0],
    );

    let document_block = Block::default()
        .borders(Borders::ALL)
        .title(" Document ");
    frame.render_widget(
        Paragraph::new(record.context.as_str())
            .block(document_block)
            .wrap(Wrap { trim: false })
            .scroll((app.context_scroll, 0)),
        chunks[1],
    );

    let form_block = Block::default().borders(Borders::ALL).title(" Judgement ");
    frame.render_widget(Paragraph::new(judgement_lines).block(form_block), chunks[2]);

    if error_height > 0 {
        let error_lines: Vec<Line> = form
            .errors
            .iter()
            .take(error_height as usize)
            .map(|e| Line::from(Span::styled(e.to_string(), Style::default().fg(ERROR_COLOR))))
            .collect();
        frame.render_widget(Paragraph::new(error_lines).wrap(Wrap { trim: false }), chunks[3]);
    }

    frame.render_widget(
        key_hints(
            "Tab/↑↓ move · Space toggle · Enter submit · PgUp/PgDn scroll document · \
             Ctrl+D logout · Ctrl+C quit",
        ),
        chunks[4],
    );
}

/// Build the judgement form body for the current record.
fn form_lines<'a>(
    form: &'a AnnotateForm,
    original_question: &'a str,
    original_answer: &'a str,
) -> Vec<Line<'a>> {
    let mut lines = Vec::new();

    lines.push(Line::from(vec![
        Span::styled("Question: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(original_question, Style::default().add_modifier(Modifier::ITALIC)),
    ]));

    let suitable = form.verdict == QuestionVerdict::Suitable;
    let verdict_focused = form.focus == FormField::Verdict;
    let verdict_label = match form.verdict {
        QuestionVerdict::Suitable => "The original question is answerable and relevant",
        QuestionVerdict::Unsuitable => "The original question cannot be answered or is irrelevant",
    };
    lines.push(choice_line(
        &format!("Verdict (←/→): {}", verdict_label),
        verdict_focused,
        if suitable { OK_COLOR } else { ERROR_COLOR },
    ));

    if suitable {
        lines.push(checkbox_line(
            "The original question reads naturally",
            form.question_natural,
            form.focus == FormField::QuestionNatural,
        ));
        lines.push(text_field_line(
            "Your question",
            &form.user_question,
            form.focus == FormField::UserQuestion,
            form.question_natural,
        ));
        lines.push(text_field_line(
            "Question note (optional)",
            &form.question_note,
            form.focus == FormField::QuestionNote,
            false,
        ));

        lines.push(Line::from(vec![
            Span::styled("Answer: ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(original_answer, Style::default().add_modifier(Modifier::ITALIC)),
        ]));
        lines.push(checkbox_line(
            "The original answer reads naturally",
            form.answer.natural,
            form.focus == FormField::AnswerNatural,
        ));
        lines.push(checkbox_line(
            "The original answer is adequate",
            form.answer.adequate,
            form.focus == FormField::AnswerAdequate,
        ));
        lines.push(checkbox_line(
            "The original answer is precise and correct",
            form.answer.precise,
            form.focus == FormField::AnswerPrecise,
        ));
        lines.push(text_field_line(
            "Your answer (document snippet)",
            &form.user_answer,
            form.focus == FormField::UserAnswer,
            form.answer.fully_endorsed(),
        ));
        lines.push(text_field_line(
            "Answer note (optional)",
            &form.answer_note,
            form.focus == FormField::AnswerNote,
            false,
        ));
    } else {
        lines.push(Line::from(Span::styled(
            "You have marked the question as unsuitable; naturalness and answer \
             judgements are not relevant.",
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(text_field_line(
            "Question note (optional)",
            &form.question_note,
            form.focus == FormField::QuestionNote,
            false,
        ));
    }

    let submit_focused = form.focus == FormField::Submit;
    let submit_style = if submit_focused {
        Style::default()
            .fg(Color::Black)
            .bg(FOCUS_COLOR)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    lines.push(Line::from(vec![
        focus_marker(submit_focused),
        Span::styled("[ Submit judgements ]", submit_style),
    ]));

    lines
}

fn render_finished(frame: &mut Frame, app: &App) {
    let area = centered_rect(70, 50, frame.area());

    let mut lines = vec![
        Line::from(Span::styled(
            "You have verified all of the data, thank you!",
            Style::default().fg(OK_COLOR).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    if app.completion_code.is_empty() {
        lines.push(Line::from(format!(
            "Please return to {} to officially complete the study.",
            app.platform
        )));
    } else {
        lines.push(Line::from(format!(
            "Please enter completion code {} on {} in order to officially complete the study.",
            app.completion_code, app.platform
        )));
        lines.push(Line::from(""));
        lines.push(Line::from(format!(
            "Please message us via {} if you have any problems with the code.",
            app.platform
        )));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "q to quit",
        Style::default().fg(Color::DarkGray),
    )));

    let block = Block::default().borders(Borders::ALL).title(" Complete ");
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false })
            .alignment(Alignment::Center),
        area,
    );
}

// ---- shared building blocks ----

fn header_line(text: &str) -> Paragraph<'static> {
    Paragraph::new(Line::from(Span::styled(
        format!("QAnnotate · {}", text),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )))
}

fn key_hints(text: &str) -> Paragraph<'static> {
    Paragraph::new(Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::DarkGray),
    )))
}

fn focus_marker(focused: bool) -> Span<'static> {
    if focused {
        Span::styled("▸ ", Style::default().fg(FOCUS_COLOR).add_modifier(Modifier::BOLD))
    } else {
        Span::raw("  ")
    }
}

fn checkbox_line(label: &str, checked: bool, focused: bool) -> Line<'static> {
    let mark = if checked { "[x] " } else { "[ ] " };
    let style = if focused {
        Style::default().fg(FOCUS_COLOR)
    } else {
        Style::default()
    };
    Line::from(vec![
        focus_marker(focused),
        Span::styled(format!("{}{}", mark, label), style),
    ])
}

fn choice_line(label: &str, focused: bool, color: Color) -> Line<'static> {
    let style = if focused {
        Style::default().fg(FOCUS_COLOR)
    } else {
        Style::default().fg(color)
    };
    Line::from(vec![focus_marker(focused), Span::styled(label.to_string(), style)])
}

fn text_field_line<'a>(
    label: &str,
    field: &'a TextField,
    focused: bool,
    locked: bool,
) -> Line<'a> {
    let mut spans = vec![
        focus_marker(focused && !locked),
        Span::styled(
            format!("{}: ", label),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    ];

    if locked {
        spans.push(Span::styled(
            field.value().to_string(),
            Style::default().fg(Color::DarkGray),
        ));
        spans.push(Span::styled(
            " (locked: no correction needed)",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ));
    } else {
        spans.extend(field_spans(field, focused));
    }

    Line::from(spans)
}

/// Render a field's text, with a block cursor at the caret when focused.
///
/// The caret sits on a char boundary by construction, so slicing is safe.
fn field_spans(field: &TextField, focused: bool) -> Vec<Span<'static>> {
    if !focused {
        return vec![Span::raw(field.value().to_string())];
    }

    let cursor_style = Style::default().fg(Color::Black).bg(FOCUS_COLOR);
    let value = field.value();
    let cursor = field.cursor();

    let before = &value[..cursor];
    let after = &value[cursor..];

    let mut spans = vec![Span::raw(before.to_string())];
    match after.chars().next() {
        Some(c) => {
            let len = c.len_utf8();
            spans.push(Span::styled(after[..len].to_string(), cursor_style));
            if len < after.len() {
                spans.push(Span::raw(after[len..].to_string()));
            }
        }
        None => spans.push(Span::styled(" ", cursor_style)),
    }
    spans
}

fn masked_field_span(field: &TextField) -> Span<'static> {
    let bullets: String = field.value().chars().map(|_| '•').collect();
    Span::raw(format!("{}█", bullets))
}

/// Centered sub-rectangle, sized as a percentage of the surrounding area.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
