//! Terminal browser for light strips on the local network
//!
//! Discovers devices (or loads them from `lanlight-settings.json`), then runs
//! sync modes against a synthetic test-pattern screen and sine-wave audio.
//! Logs go to stderr; run with `2>lanlight.log` to keep the screen clean.

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use lanlight_sync::{
    settings, DeviceDescriptor, DeviceLink, DiscoveryClient, EventReceiver, JsonFileStore, SessionController,
    SessionEvent, Settings, SettingsStore, SyncConfig, SyncModeKind, SyntheticBackend,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

const SETTINGS_FILE: &str = "lanlight-settings.json";

#[derive(PartialEq)]
enum AppState {
    Discovery,
    DeviceControl,
}

struct App {
    state: AppState,
    controller: SessionController,
    discovery: DiscoveryClient,
    store: Arc<JsonFileStore>,
    devices: Vec<DeviceDescriptor>,
    selected_index: usize,
    last_mode: SyncModeKind,
    status_message: String,
    status_rx: mpsc::UnboundedReceiver<String>,
    events: EventReceiver,
}

impl App {
    fn new(link: DeviceLink, config: SyncConfig) -> Self {
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let store = Arc::new(JsonFileStore::new(SETTINGS_FILE).with_defaults(config.device_defaults.clone()));
        let discovery = DiscoveryClient::new(config.link.clone()).with_defaults(config.device_defaults.clone());

        let controller = SessionController::new(link, Arc::new(SyntheticBackend::default()), config)
            .with_status(move |message: &str| {
                let _ = status_tx.send(message.to_string());
            })
            .with_settings_store(store.clone());
        let events = controller.subscribe_events();

        Self {
            state: AppState::Discovery,
            controller,
            discovery,
            store,
            devices: Vec::new(),
            selected_index: 0,
            last_mode: SyncModeKind::Monitor,
            status_message: "Discovering devices...".to_string(),
            status_rx,
            events,
        }
    }

    async fn load(&mut self) {
        let settings =
            settings::load_or_discover(self.store.as_ref(), &self.discovery, self.controller.link()).await;
        self.devices = settings.devices.clone();
        self.controller.set_devices(settings.devices);
        if let Err(e) = self.controller.load_devices() {
            self.status_message = format!("Error loading devices: {}", e);
            return;
        }
        self.selected_index = settings.selected_device.min(self.devices.len().saturating_sub(1));
        self.status_message = format!("Found {} device(s). Press Enter to control.", self.devices.len());
    }

    async fn rescan(&mut self) {
        self.status_message = "Scanning...".to_string();
        self.devices = self.discovery.discover(self.controller.link()).await;
        self.selected_index = 0;

        let settings = Settings::new(self.devices.clone(), self.controller.color_rotation());
        if let Err(e) = self.store.save(&settings) {
            self.status_message = format!("Failed to save settings: {}", e);
        } else {
            self.status_message = format!("Found {} device(s). Press Enter to control.", self.devices.len());
        }
        self.controller.set_devices(self.devices.clone());
    }

    fn select_next(&mut self) {
        if !self.devices.is_empty() {
            self.selected_index = (self.selected_index + 1) % self.devices.len();
        }
    }

    fn select_previous(&mut self) {
        if !self.devices.is_empty() {
            if self.selected_index == 0 {
                self.selected_index = self.devices.len() - 1;
            } else {
                self.selected_index -= 1;
            }
        }
    }

    fn open_selected(&mut self) {
        let Some(device) = self.devices.get(self.selected_index).cloned() else {
            self.status_message = "No devices to control".to_string();
            return;
        };
        self.controller.set_device(device);
        self.state = AppState::DeviceControl;
        self.status_message = "1-5 start a mode, s stop, +/- brightness, o rotate, Esc back, q quit".to_string();
    }

    async fn start_mode(&mut self, mode: SyncModeKind) {
        self.last_mode = mode;
        if let Err(e) = self.controller.start(mode, self.devices.clone()).await {
            self.status_message = format!("Failed to start {}: {}", mode.label(), e);
        }
    }

    fn adjust_brightness(&mut self, delta: f64) {
        let mode = self.controller.current_mode().unwrap_or(self.last_mode);
        let current = self
            .controller
            .brightness(mode)
            .or_else(|| self.controller.selected_device().map(|d| d.brightness))
            .unwrap_or(0.75);
        let value = (current + delta).clamp(0.0, 1.0);
        self.controller.set_brightness(mode, value);
        self.status_message = format!("{} brightness: {:.0}%", mode.label(), value * 100.0);
    }

    fn rotate(&mut self) {
        let rotation = self.controller.set_color_rotation(self.controller.color_rotation().next().degrees());
        self.status_message = format!("Color rotation: {}", rotation);
    }

    fn handle_updates(&mut self) {
        while let Ok(message) = self.status_rx.try_recv() {
            self.status_message = message;
        }
        while let Ok(Some(event)) = self.events.try_recv() {
            if let SessionEvent::Failed { mode, reason } = event {
                self.status_message = format!("{} failed: {}", mode.label(), reason);
            }
        }
    }

    fn go_back(&mut self) {
        self.state = AppState::Discovery;
        self.status_message = format!("Found {} device(s). Press Enter to control.", self.devices.len());
    }
}

fn ui(f: &mut Frame, app: &App) {
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(f.size());

    match app.state {
        AppState::Discovery => render_discovery(f, app, outer_chunks[0]),
        AppState::DeviceControl => {
            let inner_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(outer_chunks[0]);

            render_device_control(f, app, inner_chunks[0]);
            render_modes(f, app, inner_chunks[1]);
        }
    }

    render_status(f, app, outer_chunks[1]);
}

fn render_discovery(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Light Strips (j/k to select, Enter to control, r to rescan, q to quit) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if app.devices.is_empty() {
        let text = Paragraph::new("No devices found.\n\nPress r to scan the network again.")
            .block(block)
            .wrap(Wrap { trim: true });
        f.render_widget(text, area);
        return;
    }

    let items: Vec<ListItem> = app
        .devices
        .iter()
        .map(|device| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled("Model: ", Style::default().fg(Color::Yellow)),
                    Span::raw(device.model.clone()),
                ]),
                Line::from(vec![
                    Span::styled("Address: ", Style::default().fg(Color::Yellow)),
                    Span::raw(device.socket_addr().to_string()),
                ]),
                Line::from(vec![
                    Span::styled("LEDs: ", Style::default().fg(Color::Yellow)),
                    Span::raw(format!("{} ({})", device.led_count, device.position)),
                ]),
                Line::from(""),
            ])
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.selected_index));

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");

    f.render_stateful_widget(list, area, &mut state);
}

fn render_device_control(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Device (+/- brightness, o rotate, s stop, Esc back) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let Some(device) = app.controller.selected_device() else {
        let text = Paragraph::new("No device selected").block(block);
        f.render_widget(text, area);
        return;
    };

    let mode = app.controller.current_mode();
    let brightness_mode = mode.unwrap_or(app.last_mode);
    let brightness = app.controller.brightness(brightness_mode).unwrap_or(device.brightness);

    let lines = vec![
        Line::from(vec![
            Span::styled("Device: ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(device.to_string()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Sync: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                mode.map(|m| m.label()).unwrap_or("Stopped"),
                if mode.is_some() {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::Gray)
                },
            ),
        ]),
        Line::from(vec![
            Span::styled("Brightness: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                format!("{:.0}% ({})", brightness * 100.0, brightness_mode.label()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Rotation: ", Style::default().fg(Color::Yellow)),
            Span::styled(
                app.controller.color_rotation().to_string(),
                Style::default().fg(Color::Cyan),
            ),
        ]),
        Line::from(vec![
            Span::styled("Position: ", Style::default().fg(Color::Yellow)),
            Span::raw(device.position.to_string()),
        ]),
        Line::from(vec![
            Span::styled("LEDs: ", Style::default().fg(Color::Yellow)),
            Span::raw(device.led_count.to_string()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Devices in session: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.devices.len().to_string()),
        ]),
    ];

    let text = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(text, area);
}

fn render_modes(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Modes (1-5 to start) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let active = app.controller.current_mode();
    let lines: Vec<Line> = SyncModeKind::ALL
        .iter()
        .enumerate()
        .map(|(i, mode)| {
            let is_active = active == Some(*mode);
            let prefix = if is_active { "  ▶ " } else { "    " };
            Line::from(vec![
                Span::raw(format!("{}{} ", prefix, i + 1)),
                Span::styled(
                    mode.label(),
                    if is_active {
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    },
                ),
            ])
        })
        .collect();

    let text = Paragraph::new(lines).block(block);
    f.render_widget(text, area);
}

fn render_status(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Status ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let text = Paragraph::new(app.status_message.clone())
        .block(block)
        .wrap(Wrap { trim: true });

    f.render_widget(text, area);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(io::stderr)
        .init();

    let config = SyncConfig::default();
    let link = DeviceLink::bind(&config.link)?;
    let mut app = App::new(link, config);
    app.load().await;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    app.controller.stop().await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {}", err);
    }

    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.handle_updates();
        terminal.draw(|f| ui(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.state {
                    AppState::Discovery => match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
                        KeyCode::Char('k') | KeyCode::Up => app.select_previous(),
                        KeyCode::Char('r') => app.rescan().await,
                        KeyCode::Enter => app.open_selected(),
                        _ => {}
                    },
                    AppState::DeviceControl => match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Esc => app.go_back(),
                        KeyCode::Char(c @ '1'..='5') => {
                            let index = c as usize - '1' as usize;
                            app.start_mode(SyncModeKind::ALL[index]).await;
                        }
                        KeyCode::Char('s') => app.controller.stop().await,
                        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_brightness(0.05),
                        KeyCode::Char('-') | KeyCode::Char('_') => app.adjust_brightness(-0.05),
                        KeyCode::Char('o') => app.rotate(),
                        _ => {}
                    },
                }
            }
        }
    }
}
