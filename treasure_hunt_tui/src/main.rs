use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::{SeedableRng, rngs::StdRng};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use treasure_hunt_core::{
    Marker, Position,
    analyzer::{Analyzer, AnalyzerConfig, DEFAULT_TRIALS, ScenarioSource},
    environment::{Environment, ScenarioConfig},
    layout::Layout as GridLayout,
    simulation::{DEFAULT_MAX_STEPS, Simulation, StepEvent, TrapRule},
    strategy::StrategyKind,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every strategy over many random trials and print the metrics
    Analyze {
        /// Trials per strategy
        #[arg(short, long, default_value_t = DEFAULT_TRIALS)]
        trials: usize,
        /// Only analyse these strategies (defaults to all)
        #[arg(short, long = "strategy", value_name = "NAME")]
        strategies: Vec<StrategyKind>,
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
    /// Watch one strategy play a single game; traps do not end it
    Play {
        /// Strategy to watch
        #[arg(short = 'S', long, default_value = "Votacao")]
        strategy: StrategyKind,
        /// Milliseconds between two moves
        #[arg(long, default_value_t = 250)]
        tick_ms: u64,
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
}

#[derive(Args, Debug)]
struct ScenarioArgs {
    /// Layout file to play on instead of random grids
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,
    /// Base seed for every random draw
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 8)]
    width: usize,
    #[arg(long, default_value_t = 8)]
    height: usize,
    /// Share of cells turned into obstacles
    #[arg(long, default_value_t = 0.15)]
    obstacles: f64,
    #[arg(long, default_value_t = 1)]
    chests: usize,
    /// Probability that a chest holds a trap
    #[arg(long, default_value_t = 0.5)]
    trap_probability: f64,
    /// Step ceiling per trial
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: usize,
}

impl ScenarioArgs {
    fn source(&self) -> Result<ScenarioSource> {
        match &self.map {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read map file {}", path.display()))?;
                let layout = GridLayout::parse(&text)
                    .with_context(|| format!("Failed to parse map file {}", path.display()))?;
                Ok(ScenarioSource::Layout {
                    layout,
                    trap_probability: self.trap_probability,
                })
            }
            None => Ok(ScenarioSource::Generated(ScenarioConfig {
                width: self.width,
                height: self.height,
                obstacle_ratio: self.obstacles,
                chests: self.chests,
                trap_probability: self.trap_probability,
            })),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("treasure_hunt=info,warn"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    match cli.command {
        Command::Analyze {
            trials,
            strategies,
            scenario,
        } => {
            let config = AnalyzerConfig {
                trials,
                max_steps: scenario.max_steps,
                seed: scenario.seed,
                source: scenario.source()?,
            };
            let analyzer = Analyzer::new(config);
            info!(seed = analyzer.base_seed(), "analysing strategies");

            let kinds = if strategies.is_empty() {
                StrategyKind::ALL.to_vec()
            } else {
                strategies
            };
            let report = analyzer.analyze(&kinds)?;
            print!("{report}");
        }
        Command::Play {
            strategy,
            tick_ms,
            scenario,
        } => {
            let seed = scenario.seed.unwrap_or_else(rand::random);
            info!(seed, %strategy, "starting game");
            let mut rng = StdRng::seed_from_u64(seed);
            let env = scenario.source()?.build(&mut rng)?;
            let simulation = Simulation::new(env, strategy.build(seed), scenario.max_steps)
                .with_trap_rule(TrapRule::KeepPlaying);

            let mut app = App::new(strategy, simulation);
            let mut terminal = setup_terminal()?;
            let result = run_app(&mut terminal, &mut app, Duration::from_millis(tick_ms));
            restore_terminal(&mut terminal)?;
            result?;

            if let Some(outcome) = app.simulation.outcome() {
                println!(
                    "{strategy}: {:?} after {} step(s)",
                    outcome.classify(),
                    outcome.steps
                );
            }
        }
    }

    Ok(())
}

struct App {
    strategy: StrategyKind,
    /// The trial being watched.
    simulation: Simulation,
    /// Most recent events, newest last.
    events: Vec<StepEvent>,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(strategy: StrategyKind, simulation: Simulation) -> Self {
        App {
            strategy,
            simulation,
            events: Vec::new(),
            should_quit: false,
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.simulation.is_finished() {
            return;
        }
        self.events.push(self.simulation.step());
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    // Step manually, ignoring the timer.
                    KeyCode::Char(' ') => app.tick(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(65),
            Constraint::Percentage(25),
            Constraint::Percentage(10),
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], app);
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new("Press 'q' or 'Esc' to quit, space to step.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn describe(event: &StepEvent) -> String {
    match event {
        StepEvent::Moved(p) => format!("moved to ({}, {})", p.x, p.y),
        StepEvent::Opened(p, marker) => format!("opened chest at ({}, {}): {:?}", p.x, p.y, marker),
        StepEvent::Stuck => "no move left".to_string(),
        StepEvent::OutOfSteps => "step limit reached".to_string(),
        StepEvent::Finished => "finished".to_string(),
    }
}

/// Renders the strategy, the step counter and the latest events.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let simulation = &app.simulation;
    let robot = simulation.scenario().robot_location();
    let result = match simulation.outcome() {
        Some(outcome) => format!("{:?}", outcome.classify()),
        None => "running".to_string(),
    };

    let mut items = vec![ListItem::from(Line::from(format!(
        "Strategy: {} Pos: ({}, {}) Steps: {} Result: {}",
        app.strategy,
        robot.x,
        robot.y,
        simulation.steps(),
        result
    )))];
    let visible = area.height.saturating_sub(3) as usize;
    items.extend(
        app.events
            .iter()
            .rev()
            .take(visible)
            .map(|event| ListItem::from(describe(event))),
    );

    let status_widget =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status_widget, area);
}

fn marker_span(marker: Marker) -> Span<'static> {
    match marker {
        Marker::Empty => Span::raw("."),
        Marker::Obstacle => Span::styled("#", Style::default().fg(Color::DarkGray)),
        Marker::Chest => Span::styled("?", Style::default().fg(Color::Yellow).bold()),
        Marker::Treasure => Span::styled("$", Style::default().fg(Color::Green).bold()),
        Marker::Trap => Span::styled("x", Style::default().fg(Color::Red).bold()),
    }
}

/// Renders the grid with the robot onto the frame.
fn render_map(frame: &mut Frame, area: Rect, app: &App) {
    let scenario = app.simulation.scenario();
    let (width, height) = scenario.scenario_size();
    let robot = scenario.robot_location();

    let lines: Vec<Line> = (0..height)
        .map(|y| {
            let spans: Vec<Span> = (0..width)
                .map(|x| {
                    let position = Position::new(x, y);
                    if position == robot {
                        Span::styled("@", Style::default().fg(Color::Cyan).bold())
                    } else {
                        marker_span(scenario.get(position).unwrap_or_default())
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Treasure Hunt").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}
