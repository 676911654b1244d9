use std::io;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use hunter_core::job::Jobs;
use hunter_core::logger;
use hunter_core::map::MapBook;
use hunter_core::platform::{create_platform, hotkey, CachedVision, Hardware};
use hunter_core::session::Session;
use hunter_core::settings::Settings;
use hunter_core::timing::{Clock, SystemClock};
use hunter_core::types::Control;
use hunter_core::worker::{Shared, Worker};

fn main() -> Result<()> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let job_arg = {
        let args: Vec<String> = std::env::args().collect();
        args.iter().position(|a| a == "--job").and_then(|i| args.get(i + 1).cloned())
    };

    logger::init(&cwd.join("logs"));

    let settings_path = cwd.join("settings.json");
    let mut settings = Settings::load(&settings_path);

    let jobs = Jobs::open(&cwd.join("data").join("jobs.json"))?;
    if let Some(name) = job_arg {
        if !jobs.set_active(&name) {
            logger::warn(&format!("unknown job '{}', keeping '{}'", name, jobs.active_name()));
        }
    }
    let maps = MapBook::load(&cwd.join("data").join("maps.json")).unwrap_or_else(|e| {
        logger::warn(&format!("{:#}, starting with no maps", e));
        MapBook::default()
    });
    let map_names = maps.names();
    logger::info(&format!("job '{}', {} map(s)", jobs.active_name(), map_names.len()));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let platform = create_platform(clock.clone());
    let session = Session::new(platform.hardware(), jobs, clock.clone(), settings.tuning.clone());
    let vision = Box::new(CachedVision::new(
        platform.vision(),
        clock,
        settings.tuning.worker.detection_cache,
    ));

    let shared = Shared::new();
    let (log_tx, log_rx) = mpsc::channel::<String>();
    let (ctl_tx, ctl_rx) = mpsc::channel::<Control>();
    logger::set_tui_sender(log_tx);

    let worker = Worker::new(session.clone(), vision, maps, Arc::clone(&shared), ctl_rx);
    let worker_thread = thread::spawn(move || worker.run());

    let mut app = hunter_tui::App::new(
        Arc::clone(&shared),
        map_names,
        settings.last_map.as_deref(),
        log_rx,
        ctl_tx.clone(),
    );
    if settings.last_map.is_some() && app.selected_map() == settings.last_map.as_deref() {
        app.load_selected();
    }

    hotkey::start_hotkey_listener(Arc::clone(&shared.switches));

    let result = run_tui(&mut app);

    if app.loaded.is_some() {
        settings.last_map = app.loaded.clone();
    }
    // The worker owns the strategy; let it stop and release before we leave.
    shutdown(&ctl_tx, worker_thread, session.hw.as_ref(), &settings, &settings_path);

    result
}

/// Own the terminal while the UI runs. It is restored even when entering the
/// alternate screen or the event loop fails.
fn run_tui(app: &mut hunter_tui::App) -> Result<()> {
    enable_raw_mode()?;
    let result = draw_loop(app);
    let restored = restore_terminal();
    result.and(restored)
}

fn draw_loop(app: &mut hunter_tui::App) -> Result<()> {
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    hunter_tui::event::run(&mut terminal, app)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture, Show)?;
    Ok(())
}

/// Stop the worker, release every key and persist the settings.
fn shutdown(
    ctl_tx: &mpsc::Sender<Control>,
    worker: JoinHandle<()>,
    hw: &dyn Hardware,
    settings: &Settings,
    path: &Path,
) {
    ctl_tx.send(Control::Quit).ok();
    if worker.join().is_err() {
        logger::error("worker thread panicked");
    }
    hw.release_all();
    settings.save(path);
}
