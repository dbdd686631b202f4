// Logging configuration for the scoreboard

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

// Keep the guards alive for the lifetime of the program
static LOG_GUARD: OnceLock<Vec<WorkerGuard>> = OnceLock::new();

/// Initialize logging with optional console and file outputs.
///
/// Console output goes to stderr so it does not mix with the board on stdout.
/// Returns false if a global subscriber was already installed.
///
/// # Arguments
/// * `enable_console` - If true, logs will be written to stderr
/// * `log_file_path` - If Some, logs will be written to this file
pub fn init_logging(enable_console: bool, log_file_path: Option<PathBuf>) -> bool {
    let mut guards = Vec::new();

    // Filter: INFO by default, DEBUG for this crate
    let mut filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    if let Ok(directive) = "canoe_scoreboard=debug".parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    // Create file layer if path is provided
    let file_layer = log_file_path.and_then(|path| {
        let parent = path.parent()?;
        let file_name = path.file_name()?.to_str()?;

        let file_appender = tracing_appender::rolling::never(parent, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        guards.push(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false),
        )
    });

    // Create console layer if enabled
    let console_layer = if enable_console {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
        guards.push(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(false),
        )
    } else {
        None
    };

    // Build and set the subscriber
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .is_ok();

    // Store guards to keep logging alive
    let _ = LOG_GUARD.set(guards);
    installed
}
