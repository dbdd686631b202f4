//! scoreboard
//!
//! Text-mode live results board. Connects to the timing server, keeps the
//! results list paging on its own and redraws the visible window on stdout.
//! Navigation commands are read from stdin, one per line: `pgup`, `pgdn`,
//! `home`, `end`, `wheel <px>`, `scroll on|off`, `quit`.

use crossbeam_channel::{bounded, Receiver, TryRecvError};
use getopts::Options;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use canoe_scoreboard::client::logging::init_logging;
use canoe_scoreboard::client::{Config, ScoreboardApp};
use canoe_scoreboard::core::input::{NavKey, UserInput};
use canoe_scoreboard::core::timing::FormFactor;

/// ~20 Hz redraw loop
const FRAME_INTERVAL: Duration = Duration::from_millis(50);

enum Command {
    Input(UserInput),
    Scrolling(bool),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let head = words.next()?.to_lowercase();
    match head.as_str() {
        "q" | "quit" | "exit" => Some(Command::Quit),
        "wheel" => {
            let delta = words.next()?.parse::<f32>().ok()?;
            Some(Command::Input(UserInput::Wheel(delta)))
        }
        "scroll" => match words.next()? {
            "on" => Some(Command::Scrolling(true)),
            "off" => Some(Command::Scrolling(false)),
            _ => None,
        },
        name => NavKey::from_name(name).map(|key| Command::Input(key.into())),
    }
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = bounded::<String>(64);
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn main() -> ExitCode {
    let mut opts = Options::new();
    opts.optopt(
        "t",
        "type",
        "Display type: horizontal, vertical, ledwall or custom",
        "type",
    );
    opts.optopt("s", "server", "Timing server WebSocket URL", "url");
    opts.optopt(
        "c",
        "config",
        "Configuration file (default scoreboard.toml)",
        "path",
    );
    opts.optflag("", "disable-scroll", "Keep the results list static");
    opts.optflag("h", "help", "Show this help");

    let args: Vec<String> = env::args().collect();
    let usage = format!(
        "Usage: {} [-t type] [-s url] [-c config] [--disable-scroll]",
        args.first().map(String::as_str).unwrap_or("scoreboard")
    );

    macro_rules! die {
        ($($a:tt)*) => {{
            eprintln!("ERROR: {}", format!($($a)*));
            return ExitCode::FAILURE;
        }};
    }

    let matches = match opts.parse(args.iter().skip(1)) {
        Ok(m) => m,
        Err(f) => die!("{}\n{}", f, opts.usage(&usage)),
    };
    if matches.opt_present("h") {
        println!("{}", opts.usage(&usage));
        return ExitCode::SUCCESS;
    }

    let config_path = matches
        .opt_str("c")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(Config::CONFIG_FILENAME));
    let mut config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => die!("{}", e),
    };

    if let Some(kind) = matches.opt_str("t") {
        match kind.parse::<FormFactor>() {
            Ok(ff) => config.display.form_factor = ff,
            Err(e) => die!("{}\n{}", e, opts.usage(&usage)),
        }
    }
    if let Some(url) = matches.opt_str("s") {
        config.server.url = url;
    }
    if matches.opt_present("disable-scroll") {
        config.display.disable_scrolling = true;
    }
    if let Err(e) = config.validate() {
        die!("{}", e);
    }

    init_logging(config.logging.console, config.log_file_path());

    let mut app = ScoreboardApp::new(config);
    app.start();
    let commands = spawn_stdin_reader();

    let mut stdout = io::stdout();
    let mut redraw = true;
    loop {
        let now = Instant::now();
        redraw |= app.update(now);

        loop {
            let line = match commands.try_recv() {
                Ok(line) => line,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            match parse_command(&line) {
                Some(Command::Input(input)) => redraw |= app.handle_input(now, input),
                Some(Command::Scrolling(on)) => redraw |= app.set_disable_scrolling(now, !on),
                Some(Command::Quit) => return ExitCode::SUCCESS,
                None => eprintln!("Unknown command '{}'", line.trim()),
            }
        }

        if redraw {
            // Clear screen, cursor home
            let _ = write!(stdout, "\x1b[2J\x1b[H{}", app.render());
            let _ = stdout.flush();
            redraw = false;
        }

        thread::sleep(FRAME_INTERVAL);
    }
}
