use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::ui::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardState {
    Idle,
    /// Just matched, shown emphasized until the next pick fires.
    Highlight,
    /// Wrong pick, shown emphasized until the shake deadline clears.
    Shake,
    /// Matched earlier; the slot stays but the card is gone.
    Cleared,
}

pub struct CardView {
    pub key: char,
    pub label: String,
    pub state: CardState,
}

/// The matching-mode board: one keyed card per question, laid out in
/// rows. Cleared cards keep their slot so the board doesn't reflow.
pub struct CardGrid<'a> {
    cards: &'a [CardView],
    theme: &'a Theme,
}

impl<'a> CardGrid<'a> {
    pub fn new(cards: &'a [CardView], theme: &'a Theme) -> Self {
        Self { cards, theme }
    }
}

const CARD_WIDTH: u16 = 18;
const CARD_HEIGHT: u16 = 4;

impl Widget for &CardGrid<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.cards.is_empty() || area.width < CARD_WIDTH {
            return;
        }

        let per_row = (area.width / CARD_WIDTH).max(1) as usize;
        let rows = self.cards.len().div_ceil(per_row);

        let row_constraints: Vec<Constraint> =
            (0..rows).map(|_| Constraint::Length(CARD_HEIGHT)).collect();
        let row_areas = Layout::default()
            .direction(Direction::Vertical)
            .constraints(row_constraints)
            .split(area);

        for (row_index, chunk) in self.cards.chunks(per_row).enumerate() {
            if row_index >= row_areas.len() {
                break;
            }
            let col_constraints: Vec<Constraint> = (0..per_row)
                .map(|_| Constraint::Length(CARD_WIDTH))
                .collect();
            let col_areas = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(col_constraints)
                .split(row_areas[row_index]);

            for (col_index, card) in chunk.iter().enumerate() {
                render_card(card, self.theme, col_areas[col_index], buf);
            }
        }
    }
}

fn render_card(card: &CardView, theme: &Theme, area: Rect, buf: &mut Buffer) {
    let colors = &theme.colors;

    if card.state == CardState::Cleared {
        return;
    }

    let (border, label_style) = match card.state {
        CardState::Highlight => (
            colors.success(),
            Style::default()
                .fg(colors.success())
                .add_modifier(Modifier::BOLD),
        ),
        CardState::Shake => (
            colors.error(),
            Style::default()
                .fg(colors.error())
                .add_modifier(Modifier::BOLD),
        ),
        _ => (colors.border(), Style::default().fg(colors.fg())),
    };

    let block = Block::bordered()
        .title(format!(" {} ", card.key))
        .title_style(Style::default().fg(colors.accent()))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(colors.bg()));
    let inner = block.inner(area);
    block.render(area, buf);

    let label = Paragraph::new(Line::from(Span::styled(card.label.as_str(), label_style)))
        .alignment(Alignment::Center);
    label.render(inner, buf);
}
