use anyhow::Result;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use factory_map::app::{App, Focus};
use factory_map::config::{Cli, Settings};
use factory_map::filter::Dimension;
use factory_map::{data, dataset, logging, ui};
use ratatui::DefaultTerminal;
use std::time::Duration;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;
    logging::init(&cli.log_file)?;
    info!(data = %cli.data.display(), "starting");

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, &cli, settings);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Handle mouse events for panning, zooming and picking markers
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for cursor marker
    app.set_mouse_pos(mouse.column, mouse.row);

    // Overlays own the pointer; the wheel walks an open dropdown
    if app.map_blocked() {
        match mouse.kind {
            MouseEventKind::ScrollUp if app.alert.is_none() => app.move_filter_cursor(-1),
            MouseEventKind::ScrollDown if app.alert.is_none() => app.move_filter_cursor(1),
            MouseEventKind::Down(MouseButton::Left) => app.begin_press(mouse.column, mouse.row),
            _ => {}
        }
        return;
    }

    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click to pick, drag to pan
        MouseEventKind::Down(MouseButton::Left) => app.begin_press(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_press(mouse.column, mouse.row),
        _ => {}
    }
}

/// Keys while a dropdown list is open
fn handle_filter_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => app.move_filter_cursor(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_filter_cursor(1),
        KeyCode::PageUp => app.move_filter_cursor(-10),
        KeyCode::PageDown => app.move_filter_cursor(10),
        KeyCode::Home => app.filter_cursor_edge(false),
        KeyCode::End => app.filter_cursor_edge(true),
        KeyCode::Enter => app.choose_filter(),
        KeyCode::Esc => app.close_filter(),
        KeyCode::Char('1') => app.open_filter(Dimension::City),
        KeyCode::Char('2') => app.open_filter(Dimension::Main),
        KeyCode::Char('3') => app.open_filter(Dimension::Secondary),
        _ => {}
    }
}

/// Keys while the map has focus
fn handle_map_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => {
            if app.popup_open {
                app.close_popup();
            } else {
                app.quit();
            }
        }

        // Filters
        KeyCode::Char('1') => app.open_filter(Dimension::City),
        KeyCode::Char('2') => app.open_filter(Dimension::Main),
        KeyCode::Char('3') => app.open_filter(Dimension::Secondary),

        // Popup body scrolls while it is open
        KeyCode::Char('j') | KeyCode::PageDown if app.popup_open => app.scroll_popup(1),
        KeyCode::Char('k') | KeyCode::PageUp if app.popup_open => app.scroll_popup(-1),

        // Markers
        KeyCode::Tab | KeyCode::Char('n') => app.cycle_marker(true),
        KeyCode::BackTab | KeyCode::Char('N') => app.cycle_marker(false),
        KeyCode::Enter => app.toggle_popup(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Layer toggles
        KeyCode::Char('b') | KeyCode::Char('B') => app.map_renderer.toggle_borders(),
        KeyCode::Char('c') | KeyCode::Char('C') => app.map_renderer.toggle_coastlines(),
        KeyCode::Char('L') => app.map_renderer.toggle_labels(),

        // View
        KeyCode::Char('f') | KeyCode::Char('F') => app.refit(),
        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

        _ => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // The alert swallows everything until dismissed
    if app.alert.is_some() {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => app.dismiss_alert(),
            KeyCode::Char('q') => app.quit(),
            _ => {}
        }
        return;
    }

    match app.focus {
        Focus::Filter(_) => handle_filter_key(app, key),
        Focus::Map => handle_map_key(app, key),
    }
}

fn run(terminal: &mut DefaultTerminal, cli: &Cli, settings: Settings) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(size.width as usize, size.height as usize, settings.clone())?;

    data::load_basemap_or_fallback(&mut app.map_renderer, &cli.basemap);
    app.begin_load(dataset::spawn_load(cli.data.clone(), settings));

    // Main loop
    loop {
        app.poll_load();

        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(&mut app, key),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    info!("exiting");
    Ok(())
}
