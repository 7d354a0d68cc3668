use anyhow::{Context, Result};
use clap::Parser;
use delivery_world_core::{
    ItemId, Position,
    agent::{Agent, PlanningAgent, run_episode},
    environment::Environment,
    layout::{Layout as WorldLayout, load_layout_from_string},
    model::{Goal, TransitionModel},
    score::{Episode, Score},
    search::{SearchConfig, Strategy},
    state::{Cell, State},
};
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

mod logging;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Map file to load. The built-in restaurant is used when omitted.
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Seed for destination placement and item order. Random when omitted.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Search strategy: astar, ucs or greedy.
    #[arg(long, default_value_t = Strategy::AStar)]
    strategy: Strategy,

    /// Terminal condition: complete, all-served, all-picked-up, first-pickup
    /// or any-served.
    #[arg(short, long, default_value_t = Goal::Complete)]
    goal: Goal,

    /// Give up a search after this many node expansions.
    #[arg(long, value_name = "N")]
    max_expansions: Option<u64>,

    /// Play this many episodes without the UI and print a summary.
    #[arg(short, long, value_name = "N")]
    runs: Option<usize>,

    /// Actions allowed per episode before it counts as failed.
    #[arg(long, default_value_t = 500)]
    max_steps: usize,

    /// Milliseconds between actions in the UI.
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,
}

impl Args {
    fn search_config(&self) -> SearchConfig {
        SearchConfig {
            strategy: self.strategy,
            max_expansions: self.max_expansions,
        }
    }
}

struct App {
    /// The live episode.
    environment: Environment,
    agent: PlanningAgent,
    score: Score,
    episode: Episode,
    max_steps: usize,
    /// Flag to control the main loop.
    should_quit: bool,
    /// Set once the episode is solved or the agent stops.
    game_over: bool,
}

impl App {
    fn new(environment: Environment, agent: PlanningAgent, max_steps: usize) -> Self {
        App {
            environment,
            agent,
            score: Score::new(),
            episode: Episode::default(),
            max_steps,
            should_quit: false,
            game_over: false,
        }
    }

    /// Plays one action of the plan.
    fn tick(&mut self) {
        if self.game_over {
            return;
        }
        let action = if self.environment.is_done() || self.episode.steps >= self.max_steps {
            None
        } else {
            self.agent.get_action(self.environment.state())
        };
        match action {
            Some(action) => {
                let step = self.environment.step(action);
                self.episode.steps += 1;
                self.episode.total_cost += u64::from(step.cost);
            }
            None => {
                self.episode.solved = self.environment.is_done();
                self.score.record(&self.episode);
                self.game_over = true;
                info!(
                    solved = self.episode.solved,
                    total_cost = self.episode.total_cost,
                    "episode finished"
                );
            }
        }
    }

    /// Starts a fresh episode, keeping the score.
    fn restart(&mut self) -> Result<()> {
        self.environment
            .reset()
            .context("Failed to spawn a new episode")?;
        self.agent.reset();
        self.episode = Episode::default();
        self.game_over = false;
        Ok(())
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();

    let layout = match &args.map {
        Some(map_file) => {
            let file_string = std::fs::read_to_string(map_file)
                .with_context(|| format!("Failed to read map file {}", map_file.display()))?;
            load_layout_from_string(&file_string)
                .with_context(|| format!("Failed to load layout from {}", map_file.display()))?
        }
        None => WorldLayout::restaurant(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    info!(seed, strategy = %args.strategy, goal = %args.goal, "starting");

    let environment =
        Environment::new(layout, args.goal, seed).context("Failed to spawn the first episode")?;
    let agent = PlanningAgent::new(TransitionModel::new(args.goal), args.search_config());

    if let Some(runs) = args.runs {
        return benchmark(environment, agent, runs, args.max_steps);
    }

    let mut terminal = setup_terminal().context("Failed to set up the terminal")?;
    let mut app = App::new(environment, agent, args.max_steps);
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
    restore_terminal(&mut terminal).context("Failed to restore the terminal")?;
    result
}

/// Plays `runs` episodes headless and prints the aggregate score.
fn benchmark(
    mut environment: Environment,
    mut agent: PlanningAgent,
    runs: usize,
    max_steps: usize,
) -> Result<()> {
    let mut score = Score::new();
    for run in 0..runs {
        if run > 0 {
            environment
                .reset()
                .with_context(|| format!("Failed to spawn episode {}", run + 1))?;
            agent.reset();
        }
        let episode = run_episode(&mut environment, &mut agent, max_steps);
        score.record(&episode);
    }

    let cost = |value: Option<u64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
    println!("Runs: {}", score.runs());
    println!("Solved: {}", score.wins());
    println!("Success rate: {:.2}%", score.success_rate());
    println!("Best cost: {}", cost(score.best_cost()));
    println!("Worst cost: {}", cost(score.worst_cost()));
    match score.average_cost() {
        Some(average) => println!("Average cost: {average:.2}"),
        None => println!("Average cost: -"),
    }
    Ok(())
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
                    KeyCode::Char('r') => app.restart()?,
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
            Constraint::Percentage(60), // Map
            Constraint::Percentage(30), // Status
            Constraint::Percentage(10), // Help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], app.environment.state());
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new("Press 'r' for a new episode, 'q' or 'Esc' to quit.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn item_color(item: ItemId) -> Color {
    match item {
        ItemId::One => Color::Cyan,
        ItemId::Two => Color::Magenta,
        ItemId::Three => Color::Blue,
    }
}

fn item_span(item: Option<ItemId>) -> Span<'static> {
    match item {
        Some(item) => Span::styled(
            item.tag().to_string(),
            Style::default().fg(item_color(item)).bold(),
        ),
        None => Span::raw("-"),
    }
}

/// Served destinations that show empty on the grid.
fn served_at(state: &State, position: Position) -> bool {
    ItemId::ALL.into_iter().any(|item| {
        state.is_served(item) && state.landmarks().destination(item) == Some(position)
    })
}

/// Renders the grid onto the frame.
fn render_map(frame: &mut Frame, area: Rect, state: &State) {
    let grid = state.grid();
    let mut lines: Vec<Line> = Vec::with_capacity(grid.height());

    for y in 0..grid.height() {
        let mut spans: Vec<Span> = Vec::with_capacity(grid.width() * 2);
        for x in 0..grid.width() {
            let position = Position::new(x, y);
            let span = match grid[position] {
                Cell::Agent => Span::styled("@", Style::default().fg(Color::Red).bold()),
                Cell::Obstacle => Span::styled("#", Style::default().fg(Color::DarkGray)),
                Cell::Source => Span::styled("S", Style::default().fg(Color::Yellow).bold()),
                Cell::Destination(item) => {
                    Span::styled(item.tag().to_string(), Style::default().fg(item_color(item)))
                }
                Cell::Empty if served_at(state, position) => {
                    Span::styled("*", Style::default().fg(Color::Green))
                }
                Cell::Empty => Span::raw("."),
            };
            spans.push(span);
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Delivery World").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

/// Renders carried item, queue, served flags, cost and search statistics.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let state = app.environment.state();

    let mut pending = vec![Span::raw("Pending: [")];
    for (i, item) in state.pending().iter().enumerate() {
        if i > 0 {
            pending.push(Span::raw(", "));
        }
        pending.push(item_span(Some(*item)));
    }
    pending.push(Span::raw("]"));

    let mut served = vec![Span::raw("Served:")];
    for item in ItemId::ALL {
        let (mark, color) = if state.is_served(item) {
            ("x", Color::Green)
        } else {
            ("-", Color::DarkGray)
        };
        served.push(Span::raw(format!(" {}:", item.tag())));
        served.push(Span::styled(mark, Style::default().fg(color)));
    }

    let outcome = if !app.game_over {
        Span::raw("running")
    } else if app.episode.solved {
        Span::styled("solved", Style::default().fg(Color::Green).bold())
    } else {
        Span::styled("stopped", Style::default().fg(Color::Red).bold())
    };

    let search = match app.agent.last_stats() {
        Some(stats) => format!(
            "Search: expanded {} generated {} reached {} frontier peak {}",
            stats.expanded, stats.generated, stats.reached, stats.frontier_high_water
        ),
        None => "Search: -".to_string(),
    };

    let items = vec![
        ListItem::from(Line::from(vec![Span::raw("Carrying: "), item_span(state.carrying())])),
        ListItem::from(Line::from(pending)),
        ListItem::from(Line::from(served)),
        ListItem::from(Line::from(vec![
            Span::raw(format!(
                "Cost: {}  Steps: {}  Goal: {}  ",
                app.environment.total_cost(),
                app.episode.steps,
                app.environment.model().goal()
            )),
            outcome,
        ])),
        ListItem::from(search),
        ListItem::from(format!(
            "Episodes: {}  Solved: {}  Best cost: {}",
            app.score.runs(),
            app.score.wins(),
            app.score
                .best_cost()
                .map_or_else(|| "-".to_string(), |cost| cost.to_string())
        )),
    ];

    let status_widget =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status_widget, area);
}
