//! Banded probability gauge widget for Ratatui.
//!
//! Draws the 0–100 scale as a bar split into the policy's tier bands, a marker
//! at the assessed probability, and the band boundaries underneath.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::Widget,
};

use crate::domain::RiskTier;
use crate::policy::RiskPolicy;

/// Render-only gauge description; all values are computed by the caller.
pub struct RiskGauge<'a> {
    pub policy: &'a RiskPolicy,
    /// Assessed probability (0–100), if any.
    pub probability: Option<f64>,
}

pub fn tier_color(tier: RiskTier) -> Color {
    match tier {
        RiskTier::Low => Color::Green,
        RiskTier::Moderate => Color::Yellow,
        RiskTier::High => Color::LightRed,
        RiskTier::VeryHigh => Color::Red,
    }
}

/// Column (0-based, within `width`) at which a probability falls.
pub fn column_for(probability: f64, width: u16) -> u16 {
    if width == 0 {
        return 0;
    }
    let u = (probability / 100.0).clamp(0.0, 1.0);
    ((f64::from(width - 1)) * u).round() as u16
}

impl Widget for RiskGauge<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 10 || area.height < 3 {
            return;
        }

        let marker_y = area.y;
        let bar_y = area.y + 1;
        let axis_y = area.y + 2;

        let axis = Style::default().fg(Color::Gray);
        for tier in RiskTier::ALL {
            let (lo, hi) = self.policy.band(tier);
            let start = column_for(lo, area.width);
            let end = if tier == RiskTier::VeryHigh {
                area.width
            } else {
                column_for(hi, area.width)
            };
            for i in start..end {
                if let Some(cell) = buf.cell_mut((area.x + i, bar_y)) {
                    cell.set_char('█').set_fg(tier_color(tier));
                }
            }
            buf.set_string(area.x + start, axis_y, format!("{lo:.0}"), axis);
        }

        if let Some(p) = self.probability {
            let col = column_for(p, area.width);
            let style = Style::default()
                .fg(tier_color(self.policy.tier_for(p)))
                .add_modifier(Modifier::BOLD);
            buf.set_string(area.x + col, marker_y, "▼", style);
        }

        let end = "100";
        buf.set_string(area.x + area.width - end.len() as u16, axis_y, end, axis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_mapping_covers_the_bar() {
        assert_eq!(column_for(0.0, 101), 0);
        assert_eq!(column_for(100.0, 101), 100);
        assert_eq!(column_for(50.0, 101), 50);
        assert_eq!(column_for(250.0, 101), 100);
        assert_eq!(column_for(10.0, 0), 0);
    }

    #[test]
    fn renders_marker_and_bands() {
        let policy = RiskPolicy::default();
        let area = Rect::new(0, 0, 40, 3);
        let mut buf = Buffer::empty(area);
        RiskGauge {
            policy: &policy,
            probability: Some(50.0),
        }
        .render(area, &mut buf);

        let col = column_for(50.0, 40);
        assert_eq!(buf[(col, 0)].symbol(), "▼");
        assert_eq!(buf[(0, 1)].fg, Color::Green);
        assert_eq!(buf[(39, 1)].fg, Color::Red);
    }

    #[test]
    fn bands_follow_configured_thresholds() {
        let policy = RiskPolicy::new(crate::policy::TierThresholds::new(25.0, 50.0, 75.0).unwrap());
        let area = Rect::new(0, 0, 101, 3);
        let mut buf = Buffer::empty(area);
        RiskGauge {
            policy: &policy,
            probability: None,
        }
        .render(area, &mut buf);

        assert_eq!(buf[(24, 1)].fg, Color::Green);
        assert_eq!(buf[(25, 1)].fg, Color::Yellow);
        assert_eq!(buf[(50, 1)].fg, Color::LightRed);
        assert_eq!(buf[(75, 1)].fg, Color::Red);
        assert_eq!(buf[(100, 1)].fg, Color::Red);
        assert_eq!(buf[(25, 2)].symbol(), "2");
        assert_eq!(buf[(0, 0)].symbol(), " ");
    }
}
