//! Ratatui-based terminal dashboard.
//!
//! A form panel for the nine policy attributes on the left; the banded risk
//! gauge, tier, action and predicted output on the right; a customer insight
//! line underneath.

use std::io;
use std::time::Duration;

use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::pipeline::{AssessmentOutput, Engine};
use crate::cli::TuiArgs;
use crate::data::ApplicantSampler;
use crate::domain::{
    AGE_OF_CAR_RANGE, AGE_OF_POLICYHOLDER_RANGE, AreaCluster, FuelType, NcapRating,
    POLICY_TENURE_RANGE, POPULATION_DENSITY_RANGE, PolicyInput, Segment, VehicleMake,
};
use crate::error::RiskError;
use crate::features::DataQualitySnapshot;
use crate::report::{claim_text, customer_insight, format_probability};

mod gauge;

use gauge::{RiskGauge, tier_color};

const FIELD_COUNT: usize = 9;
const TENURE_STEP: f64 = 0.5;
const DENSITY_STEP: u32 = 500;

/// Start the dashboard with an already-loaded engine.
pub fn run(engine: Engine, args: TuiArgs) -> Result<(), RiskError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| RiskError::Terminal(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(engine, args.seed)?;
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, RiskError> {
        enable_raw_mode().map_err(|e| RiskError::Terminal(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(RiskError::Terminal(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    engine: Engine,
    input: PolicyInput,
    selected_field: usize,
    sampler: ApplicantSampler,
    last: Option<AssessmentOutput>,
    status: String,
}

impl App {
    fn new(engine: Engine, seed: u64) -> Result<Self, RiskError> {
        Ok(Self {
            engine,
            input: PolicyInput::default(),
            selected_field: 0,
            sampler: ApplicantSampler::new(seed)?,
            last: None,
            status: "Set policy inputs, then press Enter to assess.".to_string(),
        })
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), RiskError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| RiskError::Terminal(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| RiskError::Terminal(format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| RiskError::Terminal(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FIELD_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Enter | KeyCode::Char('a') => self.assess(),
            KeyCode::Char('r') => {
                self.input = self.sampler.next_input();
                self.assess();
            }
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i32) {
        adjust_input(&mut self.input, self.selected_field, delta);
        self.status = "Inputs changed. Press Enter to assess.".to_string();
    }

    fn assess(&mut self) {
        match self.engine.assess(&self.input) {
            Ok(output) => {
                let session = self.engine.counters().snapshot();
                let time = Local::now().format("%H:%M:%S").to_string();
                self.status = status_line(&time, &output, &session);
                self.last = Some(output);
            }
            Err(err) => {
                // No partial result on failure.
                self.last = None;
                self.status = format!("Assessment failed: {err}");
            }
        }
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(0),
                Constraint::Length(4),
                Constraint::Length(3),
            ])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_insight(frame, chunks[2]);
        self.draw_footer(frame, chunks[3]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let model = self.engine.model();
        let lines = vec![
            Line::from(vec![
                Span::styled("Insurance Risk Assessment Engine", Style::default().fg(Color::Cyan)),
                Span::raw(" | underwriting intelligence for claim risk"),
            ]),
            Line::from(Span::styled(
                format!(
                    "model: {} | columns: {} ({} categorical) | strict: {}",
                    model.name(),
                    model.expected_columns().len(),
                    model.categorical_columns().len(),
                    if self.engine.is_strict() { "on" } else { "off" },
                ),
                Style::default().fg(Color::Gray),
            )),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(38), Constraint::Min(0)])
            .split(area);

        self.draw_inputs(frame, chunks[0]);
        self.draw_results(frame, chunks[1]);
    }

    fn draw_inputs(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let items: Vec<ListItem> = field_lines(&self.input)
            .into_iter()
            .map(ListItem::new)
            .collect();

        let list = List::new(items)
            .block(Block::default().title("Policy Inputs").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_results(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Risk Assessment").borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(3), Constraint::Min(0)])
            .split(inner);

        let Some(output) = &self.last else {
            let msg = Paragraph::new("No assessment yet.")
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, rows[0]);
            frame.render_widget(
                RiskGauge {
                    policy: self.engine.policy(),
                    probability: None,
                },
                rows[1],
            );
            return;
        };

        let a = &output.assessment;
        let color = tier_color(a.tier);

        let title = Paragraph::new(Line::from(vec![
            Span::raw("Risk probability: "),
            Span::styled(
                format_probability(a.probability),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ]));
        frame.render_widget(title, rows[0]);

        frame.render_widget(
            RiskGauge {
                policy: self.engine.policy(),
                probability: Some(a.probability),
            },
            rows[1],
        );

        let claim_color = if a.predicted_claim == 1 { Color::LightRed } else { Color::Green };
        let lines = vec![
            Line::raw(""),
            Line::from(vec![
                Span::raw("Risk category:    "),
                Span::styled(
                    a.tier.display_name(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(vec![
                Span::raw("Business action:  "),
                Span::styled(a.action.as_str(), Style::default().add_modifier(Modifier::BOLD)),
            ]),
            Line::from(vec![
                Span::raw("Predicted output: "),
                Span::styled(
                    format!("is_claim = {}", a.predicted_claim),
                    Style::default().fg(claim_color).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!("  {}", claim_text(a.predicted_claim))),
            ]),
        ];
        frame.render_widget(Paragraph::new(Text::from(lines)), rows[2]);
    }

    fn draw_insight(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let p = Paragraph::new(customer_insight(&self.input))
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Live Customer Insights").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  Enter assess  r random applicant  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Footer text after a successful assessment: this request, then the session.
fn status_line(time: &str, output: &AssessmentOutput, session: &DataQualitySnapshot) -> String {
    format!(
        "Assessed at {time} | defaults applied: {} | ignored fields: {} | session: {} defaults over {} assessments",
        output.report.defaults.len(),
        output.report.dropped.len(),
        session.defaults(),
        session.alignments,
    )
}

/// One display line per form field, in selection order.
fn field_lines(input: &PolicyInput) -> [String; FIELD_COUNT] {
    [
        format!("Policy Tenure (yrs): {:.1}", input.policy_tenure),
        format!("Vehicle Age (yrs):   {}", input.age_of_car),
        format!("Policyholder Age:    {}", input.age_of_policyholder),
        format!("Area Cluster:        {}", input.area_cluster.code()),
        format!("Customer Segment:    {}", input.segment.code()),
        format!("Fuel Type:           {}", input.fuel_type.code()),
        format!("Population Density:  {}", input.population_density),
        format!("Vehicle Make:        {}", input.make.code()),
        format!("NCAP Rating:         {}", input.ncap_rating.stars()),
    ]
}

/// Step the selected field, staying within the input contract's ranges.
fn adjust_input(input: &mut PolicyInput, field: usize, delta: i32) {
    match field {
        0 => {
            let (lo, hi) = POLICY_TENURE_RANGE;
            input.policy_tenure = (input.policy_tenure + TENURE_STEP * f64::from(delta)).clamp(lo, hi);
        }
        1 => input.age_of_car = step_u32(input.age_of_car, delta, 1, AGE_OF_CAR_RANGE),
        2 => {
            input.age_of_policyholder =
                step_u32(input.age_of_policyholder, delta, 1, AGE_OF_POLICYHOLDER_RANGE)
        }
        3 => input.area_cluster = cycle(&AreaCluster::ALL, input.area_cluster, delta),
        4 => input.segment = cycle(&Segment::ALL, input.segment, delta),
        5 => input.fuel_type = cycle(&FuelType::ALL, input.fuel_type, delta),
        6 => {
            input.population_density =
                step_u32(input.population_density, delta, DENSITY_STEP, POPULATION_DENSITY_RANGE)
        }
        7 => input.make = cycle(&VehicleMake::ALL, input.make, delta),
        8 => input.ncap_rating = cycle(&NcapRating::ALL, input.ncap_rating, delta),
        _ => {}
    }
}

fn step_u32(value: u32, delta: i32, step: u32, (lo, hi): (u32, u32)) -> u32 {
    let next = if delta >= 0 {
        value.saturating_add(step)
    } else {
        value.saturating_sub(step)
    };
    next.clamp(lo, hi)
}

fn cycle<T: Copy + PartialEq>(options: &[T], current: T, delta: i32) -> T {
    let n = options.len();
    let idx = options.iter().position(|o| *o == current).unwrap_or(0);
    let next = if delta >= 0 { (idx + 1) % n } else { (idx + n - 1) % n };
    options[next]
}
