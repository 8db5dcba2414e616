use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, BorderType, Borders, Cell, Chart, Dataset, GraphType, List, ListItem,
        Paragraph, Row, Table,
    },
    Frame, Terminal,
};
use std::io;
use std::{time::Duration, time::Instant};

use clima::config::TemperatureUnit;
use clima::error::CoreError;
use clima::forecast::{self, DailyForecastEntry, RawSample};
use clima::snapshot::{CurrentConditions, Snapshot};
use clima::thermal::{self, ThermalResult};
use clima::units::direction::degree_to_compass;

const MISSING: &str = "--";
const TICK: Duration = Duration::from_millis(250);
const HELP: &str = " q quit  r refresh  u °C/°F  g chart  c calculator";
const FIELD_LABELS: [&str; 3] = ["Temperature (°C)", "Humidity (%)", "Wind (km/h)"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Dashboard,
    Calculator,
}

/// The feels-like form: temperature, humidity and wind as typed text
#[derive(Debug, Default)]
pub struct Calculator {
    fields: [String; 3],
    selected: usize,
    result: Option<Result<ThermalResult, CoreError>>,
}

impl Calculator {
    /// Seeds the form with live readings, keeping anything already typed
    fn prefill(&mut self, current: &CurrentConditions) {
        if self.fields.iter().any(|f| !f.is_empty()) {
            return;
        }
        self.fields[0] = format!("{:.1}", current.temperature_c);
        self.fields[1] = current.humidity_pct.map(|h| format!("{h:.0}")).unwrap_or_default();
        self.fields[2] = format!("{:.1}", current.wind.speed_kmh);
    }

    fn input(&mut self, c: char) {
        if c.is_ascii_digit() || matches!(c, '.' | ',' | '-') {
            self.fields[self.selected].push(c);
            self.result = None;
        }
    }

    fn backspace(&mut self) {
        self.fields[self.selected].pop();
        self.result = None;
    }

    fn next_field(&mut self) {
        self.selected = (self.selected + 1) % self.fields.len();
    }

    fn calculate(&mut self) {
        let result = thermal::parse_input(&self.fields[0], &self.fields[1], &self.fields[2])
            .and_then(|input| input.compute());
        tracing::debug!(?result, "calculator");
        self.result = Some(result);
    }

    /// Greys out fields that cannot change the result at this temperature
    fn field_relevant(&self, index: usize) -> bool {
        let Ok(input) = thermal::parse_input(&self.fields[0], "", "") else {
            return index == 0;
        };
        match index {
            1 => thermal::humidity_relevant(input.temperature_c),
            2 => thermal::wind_relevant(input.temperature_c),
            _ => true,
        }
    }
}

pub struct App {
    snapshot: Option<Snapshot>,
    status: Option<String>,
    units: TemperatureUnit,
    show_chart: bool,
    focus: Focus,
    calculator: Calculator,
}

impl App {
    pub fn new(units: TemperatureUnit) -> Self {
        Self {
            snapshot: None,
            status: None,
            units,
            show_chart: false,
            focus: Focus::Dashboard,
            calculator: Calculator::default(),
        }
    }

    pub fn units(&self) -> TemperatureUnit {
        self.units
    }

    fn update(&mut self, data: clima::Result<Snapshot>) {
        match data {
            Ok(snapshot) => {
                self.calculator.prefill(&snapshot.current);
                self.snapshot = Some(snapshot);
                self.status = None;
            }
            Err(err) => {
                tracing::error!("refresh failed: {err}");
                self.status = Some(err.user_message());
            }
        }
    }

    /// Returns `Some(true)` to quit, `Some(false)` to refresh now
    fn on_key(&mut self, key: KeyEvent) -> Option<bool> {
        if self.focus == Focus::Calculator {
            match key.code {
                KeyCode::Esc => self.focus = Focus::Dashboard,
                KeyCode::Tab | KeyCode::Down => self.calculator.next_field(),
                KeyCode::Enter => self.calculator.calculate(),
                KeyCode::Backspace => self.calculator.backspace(),
                KeyCode::Char(c) => self.calculator.input(c),
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(true),
            KeyCode::Char('r') => return Some(false),
            KeyCode::Char('u') => self.units = self.units.toggle(),
            KeyCode::Char('g') => self.show_chart = !self.show_chart,
            KeyCode::Char('c') => self.focus = Focus::Calculator,
            _ => {}
        }
        None
    }
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    refresh: Duration,
    mut get_data: impl FnMut() -> clima::Result<Snapshot>,
) -> io::Result<()> {
    app.update(get_data());
    let mut last_fetch = Instant::now();
    loop {
        terminal.draw(|f| ui(f, app))?;

        let mut refresh_now = false;
        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.on_key(key) {
                        Some(true) => return Ok(()),
                        Some(false) => refresh_now = true,
                        None => {}
                    }
                }
            }
        }

        let due = !refresh.is_zero() && last_fetch.elapsed() >= refresh;
        if refresh_now || due {
            last_fetch = Instant::now();
            app.update(get_data());
        }
    }
}

fn panel(title: &str, focused: bool) -> Block<'_> {
    let border = if focused { Color::Yellow } else { Color::Cyan };
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(format!(" {title} "), Style::default().fg(Color::Yellow)))
        .title_alignment(Alignment::Left)
        .border_style(Style::default().fg(border))
        .border_type(BorderType::Rounded)
}

fn value_row<'a>(label: &'a str, value: String) -> Row<'a> {
    Row::new(vec![
        Cell::from(format!(" {label}")),
        Cell::from(value).style(Style::default().fg(Color::Green)),
    ])
}

fn format_wind(speed_kmh: f64, direction_deg: f64, gust_kmh: Option<f64>) -> String {
    let mut text = format!(
        "{speed_kmh:.0} km/h {} ({direction_deg:.0}°)",
        degree_to_compass(direction_deg)
    );
    if let Some(gust) = gust_kmh {
        text.push_str(&format!(", gusts {gust:.0}"));
    }
    text
}

fn display_current_conditions<'a>(
    current: &CurrentConditions,
    today: Option<(f64, f64)>,
    units: TemperatureUnit,
) -> Table<'a> {
    let feels = match current.feels_like {
        Some(result) => format!(
            "{} ({})",
            units.format(result.apparent_temperature_c),
            result.model
        ),
        None => MISSING.to_string(),
    };
    let today = match today {
        Some((min, max)) => format!("{} / {}", units.format(min), units.format(max)),
        None => MISSING.to_string(),
    };
    let humid = current.humidity_pct.map_or(MISSING.to_string(), |h| format!("{h:.0}%"));
    let pressure = current.pressure_hpa.map_or(MISSING.to_string(), |p| format!("{p:.0} hPa"));
    let text = if current.condition.description.is_empty() {
        MISSING.to_string()
    } else {
        current.condition.description.clone()
    };

    let rows = vec![
        Row::new(vec![Cell::from("")]),
        value_row("Temperature", units.format(current.temperature_c)),
        value_row("Feels like", feels),
        value_row("Today", today),
        value_row(
            "Wind",
            format_wind(current.wind.speed_kmh, current.wind.direction_deg, current.wind.gust_kmh),
        ),
        value_row("Humidity", humid),
        value_row("Pressure", pressure),
        value_row("Conditions", text),
        value_row("Daylight", current.daylight.clone().unwrap_or_else(|| MISSING.to_string())),
    ];

    Table::new(rows, [Constraint::Length(13), Constraint::Min(20)])
        .block(panel("Current Conditions", false))
}

fn display_day(entry: &DailyForecastEntry, units: TemperatureUnit) -> Vec<Line<'static>> {
    vec![
        Line::from(""),
        Line::from(vec![
            Span::raw(" "),
            Span::styled(
                entry.date.format("%a %d/%m").to_string(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::raw(format!(" {:11}", "Min / Max")),
            Span::styled(
                format!("{} / {}", units.format(entry.temp_min), units.format(entry.temp_max)),
                Style::default().fg(Color::Green),
            ),
        ]),
        Line::from(vec![
            Span::raw(format!(" {:11}", "Conditions")),
            Span::styled(entry.condition.description.clone(), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::raw(format!(" {:11}", "Wind")),
            Span::styled(
                format_wind(
                    entry.wind_speed_max,
                    entry.wind_direction_at_max_speed,
                    entry.wind_gust_max,
                ),
                Style::default().fg(Color::Green),
            ),
        ]),
    ]
}

fn display_hourly<'a>(samples: &[RawSample], units: TemperatureUnit) -> Table<'a> {
    let rows: Vec<Row> = samples
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let style = if i == 0 {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Green)
            };
            Row::new(vec![
                Cell::from(format!(" {}", s.timestamp.format("%a %H:%M"))),
                Cell::from(units.format(s.temperature_c)).style(style),
                Cell::from(s.condition.description.clone()).style(style),
                Cell::from(format_wind(s.wind.speed_kmh, s.wind.direction_deg, None)).style(style),
            ])
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Length(11),
            Constraint::Length(10),
            Constraint::Min(14),
            Constraint::Length(20),
        ],
    )
    .block(panel("Next 24 Hours", false))
}

fn display_calculator(
    calculator: &Calculator,
    focused: bool,
    units: TemperatureUnit,
) -> Paragraph<'_> {
    let mut lines = vec![Line::from("")];
    for (i, label) in FIELD_LABELS.iter().enumerate() {
        let marker = if focused && i == calculator.selected { ">" } else { " " };
        let style = if calculator.field_relevant(i) {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let value = if calculator.fields[i].is_empty() {
            MISSING
        } else {
            calculator.fields[i].as_str()
        };
        lines.push(Line::from(vec![
            Span::raw(format!("{marker}{label:18}")),
            Span::styled(value.to_string(), style),
        ]));
    }

    lines.push(Line::from(""));
    match &calculator.result {
        Some(Ok(result)) => lines.push(Line::from(vec![
            Span::raw(" Feels like       "),
            Span::styled(
                units.format(result.apparent_temperature_c),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" ({})", result.model)),
        ])),
        Some(Err(err)) => lines.push(Line::from(Span::styled(
            format!(" {err}"),
            Style::default().fg(Color::Red),
        ))),
        None if focused => lines.push(Line::from(" Tab next field, Enter calculate, Esc back")),
        None => lines.push(Line::from(" Press c to edit")),
    }

    Paragraph::new(lines).block(panel("Feels-like Calculator", focused))
}

fn display_headline<'a>(app: &App) -> Paragraph<'a> {
    let (place, observed) = match &app.snapshot {
        Some(snapshot) => (
            snapshot.place.clone(),
            snapshot
                .current
                .observed_at
                .map(|t| t.format("%d-%m-%Y %H:%M").to_string())
                .unwrap_or_else(|| MISSING.to_string()),
        ),
        None => ("Loading...".to_string(), MISSING.to_string()),
    };
    let second = match &app.status {
        Some(status) => Line::from(Span::styled(
            format!(" {status}"),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(vec![
            Span::raw(format!(" {observed}")),
            Span::styled(HELP, Style::default().fg(Color::DarkGray)),
        ]),
    };

    Paragraph::new(vec![
        Line::from(vec![
            Span::raw(" "),
            Span::styled(place, Style::default().fg(Color::Yellow)),
        ]),
        second,
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .border_type(BorderType::Rounded),
    )
}

fn render_chart(
    f: &mut Frame,
    area: ratatui::layout::Rect,
    daily: &[DailyForecastEntry],
    units: TemperatureUnit,
) {
    let convert = |t: f64| match units {
        TemperatureUnit::Celsius => t,
        TemperatureUnit::Fahrenheit => clima::units::temperature::c2f(t),
    };
    let max_points: Vec<(f64, f64)> = daily
        .iter()
        .enumerate()
        .map(|(i, d)| (i as f64, convert(d.temp_max).round()))
        .collect();
    let min_points: Vec<(f64, f64)> = daily
        .iter()
        .enumerate()
        .map(|(i, d)| (i as f64, convert(d.temp_min).round()))
        .collect();
    let converted: Vec<DailyForecastEntry> = daily
        .iter()
        .map(|d| DailyForecastEntry {
            temp_min: convert(d.temp_min),
            temp_max: convert(d.temp_max),
            ..d.clone()
        })
        .collect();
    let bounds = forecast::chart_bounds(&converted).unwrap_or([0.0, 1.0]);
    let labels: Vec<String> = daily.iter().map(|d| d.date.format("%d/%m").to_string()).collect();

    let datasets = vec![
        Dataset::default()
            .name("Max")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(&max_points),
        Dataset::default()
            .name("Min")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Blue))
            .data(&min_points),
    ];
    let chart = Chart::new(datasets)
        .block(panel("Temperature Evolution", false))
        .x_axis(
            Axis::default()
                .bounds([0.0, (daily.len().max(2) - 1) as f64])
                .labels(labels),
        )
        .y_axis(
            Axis::default()
                .bounds(bounds)
                .labels([format!("{:.0}°", bounds[0]), format!("{:.0}°", bounds[1])]),
        );
    f.render_widget(chart, area);
}

fn ui(f: &mut Frame, app: &App) {
    let vert_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(f.area());

    f.render_widget(display_headline(app), vert_layout[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(vert_layout[1]);

    let lchunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(11), Constraint::Min(0)])
        .split(chunks[0]);

    let rchunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);

    let focused = app.focus == Focus::Calculator;
    f.render_widget(display_calculator(&app.calculator, focused, app.units), lchunks[1]);

    let Some(snapshot) = &app.snapshot else {
        f.render_widget(
            List::new(vec![ListItem::new(format!("\n  {MISSING}"))])
                .block(panel("Current Conditions", false)),
            lchunks[0],
        );
        return;
    };

    f.render_widget(
        display_current_conditions(&snapshot.current, snapshot.today_range, app.units),
        lchunks[0],
    );

    if app.show_chart && !snapshot.daily.is_empty() {
        render_chart(f, rchunks[0], &snapshot.daily, app.units);
    } else {
        let mut list_items = vec![];
        if snapshot.daily.is_empty() {
            list_items.push(ListItem::new(format!("\n  {MISSING}")));
        }
        for day in &snapshot.daily {
            list_items.push(ListItem::new(display_day(day, app.units)));
        }
        f.render_widget(List::new(list_items).block(panel("Forecast", false)), rchunks[0]);
    }

    f.render_widget(display_hourly(&snapshot.hourly, app.units), rchunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
    use clima::forecast::{Condition, Wind};
    use clima::thermal::Model;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn snapshot() -> Snapshot {
        let tz = FixedOffset::west_opt(3 * 3600).unwrap();
        let condition = Condition {
            description: "scattered clouds".to_string(),
            icon_id: "03d".to_string(),
        };
        let wind = Wind {
            speed_kmh: 18.0,
            gust_kmh: Some(30.0),
            direction_deg: 90.0,
        };
        let day = DailyForecastEntry {
            date: NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
            representative_timestamp: tz.with_ymd_and_hms(2024, 7, 2, 0, 0, 0).unwrap(),
            temp_min: 4.0,
            temp_max: 12.0,
            condition: condition.clone(),
            wind_speed_max: 22.0,
            wind_gust_max: None,
            wind_direction_at_max_speed: 180.0,
        };
        Snapshot {
            place: "Buenos Aires, AR".to_string(),
            current: CurrentConditions {
                temperature_c: 8.0,
                humidity_pct: Some(70.0),
                pressure_hpa: Some(1015.0),
                wind,
                condition: condition.clone(),
                observed_at: Some(tz.with_ymd_and_hms(2024, 7, 1, 15, 0, 0).unwrap()),
                daylight: Some("10h 2m".to_string()),
                feels_like: thermal::compute(8.0, Some(70.0), Some(18.0)).ok(),
            },
            today_range: Some((6.0, 11.0)),
            daily: vec![day],
            hourly: vec![RawSample {
                timestamp: tz.with_ymd_and_hms(2024, 7, 1, 18, 0, 0).unwrap(),
                temperature_c: 7.0,
                condition,
                wind,
            }],
            fetched_at: Utc::now(),
        }
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(140, 40)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content.iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_calculator_flow() {
        let mut app = App::new(TemperatureUnit::Celsius);
        assert_eq!(app.on_key(key(KeyCode::Char('c'))), None);
        assert_eq!(app.focus, Focus::Calculator);

        for c in "-5".chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
        app.on_key(key(KeyCode::Tab));
        app.on_key(key(KeyCode::Tab));
        for c in "20x".chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
        app.on_key(key(KeyCode::Enter));

        let result = app.calculator.result.clone().unwrap().unwrap();
        assert_eq!(result.model, Model::WindChill);
        assert_eq!(app.calculator.fields[2], "20");

        // 'q' types nothing while the calculator has focus
        assert_eq!(app.on_key(key(KeyCode::Char('q'))), None);
        app.on_key(key(KeyCode::Esc));
        assert_eq!(app.on_key(key(KeyCode::Char('q'))), Some(true));
    }

    #[test]
    fn test_calculator_reports_invalid_temperature() {
        let mut calculator = Calculator::default();
        calculator.calculate();
        assert!(matches!(calculator.result, Some(Err(CoreError::InvalidInput(_)))));
    }

    #[test]
    fn test_prefill_keeps_typed_values() {
        let snapshot = snapshot();
        let mut calculator = Calculator::default();
        calculator.prefill(&snapshot.current);
        assert_eq!(calculator.fields, ["8.0".to_string(), "70".to_string(), "18.0".to_string()]);

        calculator.fields[0] = "30".to_string();
        calculator.prefill(&snapshot.current);
        assert_eq!(calculator.fields[0], "30");
    }

    #[test]
    fn test_field_relevance_follows_temperature() {
        let mut calculator = Calculator::default();
        calculator.fields[0] = "5".to_string();
        assert!(!calculator.field_relevant(1));
        assert!(calculator.field_relevant(2));
        calculator.fields[0] = "30".to_string();
        assert!(calculator.field_relevant(1));
        assert!(!calculator.field_relevant(2));
    }

    #[test]
    fn test_dashboard_keys() {
        let mut app = App::new(TemperatureUnit::Celsius);
        assert_eq!(app.on_key(key(KeyCode::Char('r'))), Some(false));
        app.on_key(key(KeyCode::Char('u')));
        assert_eq!(app.units(), TemperatureUnit::Fahrenheit);
        app.on_key(key(KeyCode::Char('g')));
        assert!(app.show_chart);
    }

    #[test]
    fn test_failed_refresh_keeps_last_snapshot() {
        let mut app = App::new(TemperatureUnit::Celsius);
        app.update(Ok(snapshot()));
        app.update(Err(clima::ClimaError::not_found("Nowhere")));
        assert!(app.snapshot.is_some());
        assert!(app.status.as_deref().unwrap_or_default().contains("Nowhere"));
    }

    #[test]
    fn test_renders_panels() {
        let mut app = App::new(TemperatureUnit::Celsius);
        app.update(Ok(snapshot()));
        let screen = render(&app);
        assert!(screen.contains("Buenos Aires, AR"));
        assert!(screen.contains("Current Conditions"));
        assert!(screen.contains("Wind chill index"));
        assert!(screen.contains("Next 24 Hours"));
        assert!(screen.contains("scattered clouds"));

        app.show_chart = true;
        let screen = render(&app);
        assert!(screen.contains("Temperature Evolution"));
    }

    #[test]
    fn test_renders_without_data() {
        let app = App::new(TemperatureUnit::Celsius);
        let screen = render(&app);
        assert!(screen.contains("Loading..."));
        assert!(screen.contains("Feels-like Calculator"));
    }
}
