// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based scanner
//!
//! Renders the camera preview to the terminal using Unicode half-block
//! characters for improved vertical resolution, next to the details of the
//! last scanned product.

use crate::backends::camera::types::{CameraFrame, PixelFormat};
use crate::config::Config;
use crate::errors::AppResult;
use crate::frame_processor::DecodedRecord;
use crate::pipelines::scan::{ScanPipeline, ScanStatus};
use crate::storage;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Paragraph, Widget, Wrap},
};
use std::io::{self, stdout};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

const HELP: &str = "[r] restart  [n] new scan  [s] snapshot  [q] quit";

/// Run the terminal scanner
pub fn run(config: &Config, image: Option<PathBuf>) -> AppResult<()> {
    let pipeline = crate::build_pipeline(config, image);

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, &pipeline, config);

    pipeline.stop();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    pipeline: &ScanPipeline,
    config: &Config,
) -> AppResult<()> {
    let mut message = match pipeline.start() {
        Ok(()) => HELP.to_string(),
        Err(e) => {
            error!(error = %e, "Failed to start scanner");
            format!("{}  |  {}", e, HELP)
        }
    };

    let poll = config.display_poll_interval();
    let mut frame_widget = FrameWidget::default();

    loop {
        if let Some(frame) = pipeline.latest_frame() {
            frame_widget.frame = Some(frame);
        }
        let record = pipeline.latest_record();
        let status = pipeline.status();
        let detail = pipeline
            .last_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| format!("{} frames", pipeline.frames_captured()));

        terminal.draw(|f| {
            let [main_area, status_area] =
                Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(f.area());
            let [camera_area, details_area] =
                Layout::horizontal([Constraint::Percentage(65), Constraint::Percentage(35)])
                    .areas(main_area);

            f.render_widget(&frame_widget, camera_area);
            f.render_widget(details_panel(record.as_deref()), details_area);
            f.render_widget(
                StatusBar {
                    status,
                    detail: &detail,
                    message: &message,
                },
                status_area,
            );
        })?;

        // Handle input with timeout for frame updates
        if !event::poll(poll)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char('r') => {
                message = match pipeline.restart() {
                    Ok(()) => format!("Restarted  |  {}", HELP),
                    Err(e) => {
                        error!(error = %e, "Restart failed");
                        format!("Restart failed: {}  |  {}", e, HELP)
                    }
                };
            }
            KeyCode::Char('n') => {
                pipeline.reset_detection();
                message = format!("Ready for a new code  |  {}", HELP);
            }
            KeyCode::Char('s') => {
                message = match pipeline.latest_frame() {
                    Some(frame) => match storage::save_snapshot(&frame) {
                        Ok(path) => {
                            info!(path = %path.display(), "Snapshot taken");
                            format!("Saved {}", path.display())
                        }
                        Err(e) => {
                            error!(error = %e, "Snapshot failed");
                            format!("Snapshot failed: {}", e)
                        }
                    },
                    None => "No frame to save yet".to_string(),
                };
            }
            _ => {}
        }
    }

    Ok(())
}

fn details_panel(record: Option<&DecodedRecord>) -> Paragraph<'static> {
    let block = Block::bordered().title(" Scanned Product Details ");

    let lines: Vec<Line> = match record {
        Some(record) => record
            .rows()
            .into_iter()
            .map(|(label, value)| {
                Line::from(vec![
                    Span::styled(
                        format!("{:<12}", format!("{}:", label)),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(value),
                ])
            })
            .collect(),
        None => vec![Line::styled(
            "Hold a product code in the green square",
            Style::default().fg(Color::DarkGray),
        )],
    };

    Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
}

/// Widget that renders a camera frame using half-block characters
#[derive(Default)]
struct FrameWidget {
    frame: Option<Arc<CameraFrame>>,
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = self.frame.as_deref().filter(|f| f.width > 0 && f.height > 0) else {
            // No frame yet - show placeholder
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        // Each terminal cell displays 2 vertical pixels
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let w = term_height * frame_aspect;
            (w as u16, area.height)
        } else {
            // Terminal is taller - fit to width
            let h = term_width / frame_aspect;
            (area.width, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height as f64 * 2.0);

        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) else {
                    continue;
                };
                cell.set_char('▀');
                cell.set_fg(sample_pixel(frame, src_x, src_y_top));
                cell.set_bg(sample_pixel(frame, src_x, src_y_bottom));
            }
        }
    }
}

fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let (r, g, b) = sample_pixel_rgb(frame, x, y);
    Color::Rgb(r, g, b)
}

/// Preview frames are RGBA; grey is drawn for anything else
fn sample_pixel_rgb(frame: &CameraFrame, x: u32, y: u32) -> (u8, u8, u8) {
    let x = x.min(frame.width - 1) as usize;
    let y = y.min(frame.height - 1) as usize;
    let data = frame.data_slice();
    let stride = frame.stride as usize;

    match frame.format {
        PixelFormat::RGBA => {
            let i = y * stride + x * 4;
            match data.get(i..i + 3) {
                Some(px) => (px[0], px[1], px[2]),
                None => (0, 0, 0),
            }
        }
        PixelFormat::Gray8 => {
            let v = data.get(y * stride + x).copied().unwrap_or(0);
            (v, v, v)
        }
        _ => (128, 128, 128),
    }
}

/// Status bar widget
struct StatusBar<'a> {
    status: ScanStatus,
    detail: &'a str,
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg = match self.status {
            ScanStatus::Detected => Color::Green,
            ScanStatus::Error => Color::Red,
            _ => Color::DarkGray,
        };

        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(bg);
            }
        }

        let text = format!("{}  |  {}  |  {}", self.status, self.detail, self.message);
        let text: String = text.chars().take(area.width as usize).collect();

        buf.set_string(
            area.x,
            area.y,
            text,
            Style::default().fg(Color::White).bg(bg),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_processor::Price;

    fn render_to_string(widget: impl Widget, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_frame_widget_placeholder() {
        let widget = FrameWidget::default();
        let text = render_to_string(&widget, 40, 5);
        assert!(text.contains("Waiting for camera..."));
    }

    #[test]
    fn test_frame_widget_draws_half_blocks() {
        let frame = CameraFrame::from_packed(4, 4, PixelFormat::RGBA, vec![255; 64]);
        let widget = FrameWidget {
            frame: Some(Arc::new(frame)),
        };
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        (&widget).render(area, &mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "▀");
        assert_eq!(buf[(0, 0)].fg, Color::Rgb(255, 255, 255));
    }

    #[test]
    fn test_details_panel_lists_rows() {
        let record = DecodedRecord {
            product_id: 7,
            name: "Widget".into(),
            category: "Tools".into(),
            price: Price::parse("9.99").unwrap(),
            description: None,
        };
        let text = render_to_string(details_panel(Some(&record)), 50, 8);
        assert!(text.contains("Scanned Product Details"));
        assert!(text.contains("Widget"));
        assert!(text.contains("$9.99"));
        assert!(!text.contains("Description"));
    }

    #[test]
    fn test_status_bar_truncates_on_char_boundary() {
        let bar = StatusBar {
            status: ScanStatus::Scanning,
            detail: "0 frames",
            message: HELP,
        };
        let text = render_to_string(bar, 3, 1);
        assert!(!text.is_empty());
    }
}
