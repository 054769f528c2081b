// Heat gutter rendering.
// Maps palette entries to terminal colors and builds the per-line gutter span.

use ratatui::prelude::*;

use crate::blame::HeatRenderer;

const GUTTER_MARK: &str = "▐";

/// Parse `#rrggbb` into a terminal color.
pub fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

/// Gutter cell for a line in the given bucket; blank when undecorated.
pub fn heat_span(renderer: &HeatRenderer, bucket: Option<usize>) -> Span<'static> {
    match bucket.and_then(|b| renderer.color(b)).and_then(parse_hex_color) {
        Some(color) => Span::styled(GUTTER_MARK, Style::default().fg(color)),
        None => Span::raw(" "),
    }
}

/// One-row legend from newest to oldest.
pub fn legend(renderer: &HeatRenderer) -> Line<'static> {
    let mut spans = vec![Span::styled("new ", Style::default().fg(Color::DarkGray))];
    spans.extend((0..renderer.bucket_count()).map(|b| {
        let color = renderer
            .color(b)
            .and_then(parse_hex_color)
            .unwrap_or(Color::DarkGray);
        Span::styled("█", Style::default().fg(color))
    }));
    spans.push(Span::styled(" old", Style::default().fg(Color::DarkGray)));
    Line::from(spans)
}
