use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::sample::{output_for_code, KeyOutput};
use crate::session::SessionState;
use crate::window::ActuationWindow;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let green_bold_style = Style::default().patch(bold_style).fg(Color::Green);
        let red_bold_style = Style::default().patch(bold_style).fg(Color::Red);
        let dim_bold_style = Style::default()
            .patch(bold_style)
            .add_modifier(Modifier::DIM);
        let underlined_dim_bold_style = Style::default()
            .patch(dim_bold_style)
            .add_modifier(Modifier::UNDERLINED);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        if !self.is_focused() && !self.session().is_complete() {
            let paused = Paragraph::new(Span::styled(
                "PAUSED - window unfocused, key presses are ignored",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD | Modifier::ITALIC),
            ))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
            paused.render(area, buf);
            return;
        }

        match self.session().state() {
            SessionState::Idle | SessionState::Active => {
                let session = self.session();
                let target: String = session.target().iter().collect();

                let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
                let mut prompt_occupied_lines =
                    ((target.width() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16;
                if target.width() <= max_chars_per_line as usize {
                    prompt_occupied_lines = 1;
                }

                let timer_lines = if session.seconds_remaining.is_some() {
                    2
                } else {
                    0
                };

                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .horizontal_margin(HORIZONTAL_MARGIN)
                    .constraints(
                        [
                            Constraint::Length(
                                ((area.height as f64 - prompt_occupied_lines as f64) / 2.0) as u16,
                            ),
                            Constraint::Length(timer_lines),
                            Constraint::Length(prompt_occupied_lines),
                            Constraint::Length(2),
                        ]
                        .as_ref(),
                    )
                    .split(area);

                let mut spans = session
                    .typed()
                    .iter()
                    .enumerate()
                    .map(|(idx, &c)| {
                        let expected = session.target().get(idx).copied();
                        if expected == Some(c) {
                            Span::styled(expected.unwrap_or(c).to_string(), green_bold_style)
                        } else {
                            let shown = match c {
                                ' ' => "·".to_owned(),
                                other => other.to_string(),
                            };
                            Span::styled(shown, red_bold_style)
                        }
                    })
                    .collect::<Vec<Span>>();

                if let Some(&c) = session.target().get(session.cursor()) {
                    spans.push(Span::styled(c.to_string(), underlined_dim_bold_style));
                }
                let rest: String = session
                    .target()
                    .iter()
                    .skip(session.cursor() + 1)
                    .collect();
                spans.push(Span::styled(rest, dim_bold_style));

                let prompt = Paragraph::new(Line::from(spans))
                    .alignment(if prompt_occupied_lines == 1 {
                        Alignment::Center
                    } else {
                        Alignment::Left
                    })
                    .wrap(Wrap { trim: true });
                prompt.render(chunks[2], buf);

                if let Some(remaining) = session.seconds_remaining {
                    let timer = Paragraph::new(Span::styled(
                        format!("{remaining:.1}"),
                        dim_bold_style,
                    ))
                    .alignment(Alignment::Center);
                    timer.render(chunks[1], buf);
                }

                let status = Paragraph::new(Span::styled(status_line(self), italic_style))
                    .alignment(Alignment::Center);
                status.render(chunks[3], buf);
            }
            SessionState::Complete => {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .horizontal_margin(HORIZONTAL_MARGIN)
                    .vertical_margin(VERTICAL_MARGIN)
                    .constraints(
                        [
                            Constraint::Min(1),
                            Constraint::Length(1),
                            Constraint::Length(1),
                            Constraint::Length(1),
                        ]
                        .as_ref(),
                    )
                    .split(area);

                let m = self.metrics();
                let stats = Paragraph::new(Span::styled(
                    format!(
                        "{} wpm   {} raw   {} cpm   {}% acc   score {}",
                        m.wpm, m.raw_wpm, m.cpm, m.accuracy, m.score
                    ),
                    bold_style,
                ))
                .alignment(Alignment::Center);
                stats.render(chunks[1], buf);

                let window = Paragraph::new(Span::styled(
                    format!("window: {}", describe_window(&self.effective_window())),
                    Style::default().fg(Color::Cyan).patch(italic_style),
                ))
                .alignment(Alignment::Center);
                window.render(chunks[2], buf);

                let legend = Paragraph::new(Span::styled(
                    "(<-) retry / (esc)ape",
                    italic_style,
                ));
                legend.render(chunks[3], buf);
            }
        }
    }
}

/// Window + live-pressure footer shown while typing.
fn status_line(app: &App) -> String {
    let window = describe_window(&app.effective_window());
    match app.most_pressed_key() {
        Some((code, value)) => {
            let key = match output_for_code(code) {
                Some(KeyOutput::Char(' ')) => "space".to_string(),
                Some(KeyOutput::Char(c)) => c.to_string(),
                Some(KeyOutput::Backspace) => "bksp".to_string(),
                None => format!("{code:#04x}"),
            };
            format!("{window}   {key} {}", pressure_bar(value))
        }
        None => window,
    }
}

fn describe_window(window: &ActuationWindow) -> String {
    match *window {
        ActuationWindow::Point { threshold } => format!("point {threshold:.2}"),
        ActuationWindow::Bracket { min, max } => format!("bracket {min:.2}..{max:.2}"),
    }
}

fn pressure_bar(value: f64) -> String {
    let filled = (value.clamp(0.0, 1.0) * 10.0).round() as usize;
    let mut bar: String = "▓".repeat(filled);
    bar.push_str(&"░".repeat(10 - filled));
    format!("{bar} {value:.2}")
}
