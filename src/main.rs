use forgebench::app::command::{self, Command, Outcome};
use forgebench::app::{StdoutConsole, Workbench};
use forgebench::kernel::services::adapters::{ensure_settings_file, load_settings};
use forgebench::kernel::services::ports::ConsoleLevel;
use forgebench::kernel::Theme;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::Duration;

const TICK_INTERVAL: Duration = Duration::from_millis(20);

enum HostEvent {
    Line(String),
    EndOfInput,
    Signal,
}

fn main() -> io::Result<()> {
    let mut logging = forgebench::logging::init("forgebench.log");

    let mut args = std::env::args().skip(1);
    let root = match args.next() {
        Some(root) => PathBuf::from(root),
        None => std::env::current_dir()?,
    };
    let files: Vec<PathBuf> = args.map(PathBuf::from).collect();

    if let Err(e) = ensure_settings_file() {
        tracing::warn!(error = %e, "ensure_settings_file failed");
    }
    let settings = load_settings().unwrap_or_default();
    let console = StdoutConsole::new(Theme::for_mode(settings.dark_mode));
    let mut workbench =
        Workbench::new(&root, settings, Box::new(console)).map_err(io::Error::other)?;
    if let Some(rx) = logging.as_mut().and_then(|guard| guard.take_log_rx()) {
        workbench.set_log_receiver(rx);
    }

    for file in &files {
        if let Err(err) = workbench.open(file) {
            command::report_error(&mut workbench, "open", &err);
        }
    }
    if workbench.focused().is_some() {
        let _ = workbench.move_cursor_to_end();
    }

    let (tx, rx) = mpsc::channel();
    spawn_stdin_reader(tx.clone())?;
    if let Err(e) = spawn_signal_listener(tx) {
        tracing::warn!(error = %e, "signal handler not installed");
    }

    tracing::info!(root = %workbench.root().display(), "forgebench started");
    let mut input_closed = false;
    loop {
        match rx.recv_timeout(TICK_INTERVAL) {
            Ok(HostEvent::Line(line)) => {
                if handle_line(&mut workbench, &line) {
                    break;
                }
            }
            Ok(HostEvent::Signal) => {
                if !workbench.interrupt() {
                    break;
                }
            }
            Ok(HostEvent::EndOfInput) => input_closed = true,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => input_closed = true,
        }

        workbench.tick();

        if input_closed && !workbench.phase().is_active() {
            break;
        }
    }

    workbench.shutdown();
    Ok(())
}

/// Returns `true` when the session should end.
fn handle_line(workbench: &mut Workbench, line: &str) -> bool {
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(message) => {
            workbench.notify(ConsoleLevel::Warning, &message);
            return false;
        }
    };
    let name = command.name();
    match command::dispatch(workbench, command) {
        Ok(Outcome::Done) => false,
        Ok(Outcome::Print(lines)) => {
            for line in lines {
                println!("{line}");
            }
            false
        }
        Ok(Outcome::Quit) => true,
        Err(err) => {
            command::report_error(workbench, name, &err);
            false
        }
    }
}

fn spawn_stdin_reader(tx: Sender<HostEvent>) -> io::Result<()> {
    std::thread::Builder::new()
        .name("stdin".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.send(HostEvent::Line(line)).is_err() {
                    return;
                }
            }
            let _ = tx.send(HostEvent::EndOfInput);
        })?;
    Ok(())
}

#[cfg(unix)]
fn spawn_signal_listener(tx: Sender<HostEvent>) -> io::Result<()> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                tracing::info!(signal = sig, "signal received");
                if tx.send(HostEvent::Signal).is_err() {
                    return;
                }
            }
        })?;
    Ok(())
}

#[cfg(not(unix))]
fn spawn_signal_listener(_tx: Sender<HostEvent>) -> io::Result<()> {
    Ok(())
}
