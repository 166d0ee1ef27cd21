use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget, Wrap};

use crate::ui::layout::centered_rect;
use crate::ui::theme::Theme;

/// Confirm/alert overlay. Enter resolves true; Esc resolves false (only
/// offered when `offer_cancel` is set).
pub struct ModalView<'a> {
    message: &'a str,
    offer_cancel: bool,
    theme: &'a Theme,
}

impl<'a> ModalView<'a> {
    pub fn new(message: &'a str, offer_cancel: bool, theme: &'a Theme) -> Self {
        Self {
            message,
            offer_cancel,
            theme,
        }
    }
}

impl Widget for &ModalView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let popup = centered_rect(60, 30, area);

        Clear.render(popup, buf);

        let block = Block::bordered()
            .border_style(Style::default().fg(colors.accent()))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(popup);
        block.render(popup, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        let message = Paragraph::new(self.message)
            .style(Style::default().fg(colors.fg()))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        message.render(layout[0], buf);

        let hint = if self.offer_cancel {
            " [Enter] OK  [Esc] Cancel "
        } else {
            " [Enter] OK "
        };
        let footer = Paragraph::new(Line::from(Span::styled(
            hint,
            Style::default().fg(colors.dim()),
        )))
        .alignment(Alignment::Center);
        footer.render(layout[1], buf);
    }
}
