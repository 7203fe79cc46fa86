//! Terminal rendering: live camera view, verify hint, verification label.

use crate::app::App;
use faceid_core::VerificationStatus;
use faceid_hw::{Frame as CameraFrame, FrameSource};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Upper half block: foreground paints the top pixel, background the bottom one.
const HALF_BLOCK: char = '▀';

pub fn render<S: FrameSource>(frame: &mut Frame, app: &App<S>) {
    let [view_area, button_area, label_area] = Layout::vertical([
        Constraint::Min(3),
        Constraint::Length(3),
        Constraint::Length(3),
    ])
    .areas(frame.area());

    render_live_view(frame, app, view_area);
    render_button(frame, button_area);
    render_label(frame, app, label_area);
}

fn render_live_view<S: FrameSource>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title("Camera");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(err) = app.capture_error() {
        let paragraph = Paragraph::new(err.to_string())
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, inner);
        return;
    }

    match app.latest_frame() {
        Some(camera_frame) => frame.render_widget(FrameView::new(camera_frame), inner),
        None => {
            let paragraph = Paragraph::new("Waiting for camera...")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, inner);
        }
    }
}

fn render_button(frame: &mut Frame, area: Rect) {
    let hint = Line::from(vec![
        Span::styled(
            " Verify ",
            Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  [v/Enter]   quit [q/Esc]", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(hint)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_label<S: FrameSource>(frame: &mut Frame, app: &App<S>, area: Rect) {
    let status = app.status();
    let style = match status {
        VerificationStatus::Uninitiated => Style::default(),
        VerificationStatus::Verified => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        VerificationStatus::Unverified => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        VerificationStatus::Failed(_) => Style::default().fg(Color::Red),
    };

    let mut spans = vec![Span::styled(status.to_string(), style)];
    if let Some(result) = app.last_result() {
        spans.push(Span::styled(
            format!(
                "  ({}/{} matches, ratio {:.2})",
                result.detections, result.gallery_size, result.ratio
            ),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// Draws a camera frame with half-block cells, two pixel rows per cell,
/// scaled to fit the area with nearest-neighbour sampling and centred.
pub struct FrameView<'a> {
    frame: &'a CameraFrame,
}

impl<'a> FrameView<'a> {
    pub fn new(frame: &'a CameraFrame) -> Self {
        Self { frame }
    }

    /// Cell size of the drawn image inside `area`, preserving aspect ratio.
    fn fit(&self, area: Rect) -> (u16, u16) {
        let (fw, fh) = (self.frame.width as f32, self.frame.height as f32);
        if fw == 0.0 || fh == 0.0 || area.width == 0 || area.height == 0 {
            return (0, 0);
        }
        let scale = (area.width as f32 / fw).min(area.height as f32 * 2.0 / fh);
        // Epsilon absorbs f32 rounding when the frame fits exactly.
        let cols = ((fw * scale + 1e-3).floor() as u16).clamp(1, area.width);
        let rows = ((fh * scale / 2.0 + 1e-3).floor() as u16).clamp(1, area.height);
        (cols, rows)
    }
}

impl Widget for FrameView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (cols, rows) = self.fit(area);
        if cols == 0 || rows == 0 {
            return;
        }
        let left = area.x + (area.width - cols) / 2;
        let top = area.y + (area.height - rows) / 2;

        let sample = |cx: u16, py: u32| {
            let x = (cx as u32 * self.frame.width / cols as u32).min(self.frame.width - 1);
            let y = (py * self.frame.height / (rows as u32 * 2)).min(self.frame.height - 1);
            let [r, g, b] = self.frame.pixel(x, y);
            Color::Rgb(r, g, b)
        };

        for row in 0..rows {
            for col in 0..cols {
                let upper = sample(col, row as u32 * 2);
                let lower = sample(col, row as u32 * 2 + 1);
                if let Some(cell) = buf.cell_mut((left + col, top + row)) {
                    cell.set_char(HALF_BLOCK).set_fg(upper).set_bg(lower);
                }
            }
        }
    }
}
