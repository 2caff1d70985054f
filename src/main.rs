use std::fs::{self, File};
use std::io::{self, BufRead, IsTerminal};
use std::sync::{Arc, Mutex};
use std::{env, panic};

use conch::core::actor::Actor;
use conch::core::commands::builtin::EXIT_TOKEN;
use conch::core::commands::PluginRegistry;
use conch::core::config::{ConfigPaths, ShellConfig};
use conch::error::ShellError;
use conch::flags::Flags;
use conch::process::{forward_interrupts, CloseSignal};
use conch::shell::Shell;
use conch::terminal::tty::{LineConsole, RawModeGuard, TtyConsole, TtyKeys};
use conch::terminal::MemoryClipboard;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), ShellError> {
    let mut flags = Flags::new();
    let args: Vec<String> = env::args().skip(1).collect();
    flags.parse(&args)?;

    if flags.is_set("help") {
        flags.print_help();
        return Ok(());
    }

    if flags.is_set("version") {
        println!("conch {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let interactive = io::stdin().is_terminal();
    init_logging(&flags, interactive);
    panic::set_hook(Box::new(|info| error!(%info, "panic")));

    let mut config = ShellConfig::new();
    let paths = match flags.get_value("config") {
        Some(path) => ConfigPaths::explicit(path),
        None => ConfigPaths::new()?,
    };
    config.load(&paths)?;
    if flags.is_set("no-catch") {
        config.catch_errors = false;
    }
    if flags.is_set("auth") {
        config.require_auth = true;
    }

    let registry = PluginRegistry::with_builtins()?;
    info!(plugins = registry.len(), interactive, "starting conch");

    let close = CloseSignal::register()?;
    if interactive {
        run_interactive(&config, registry, &flags, close)
    } else {
        run_batch(&config, registry, close)
    }
}

fn run_interactive(
    config: &ShellConfig,
    registry: PluginRegistry,
    flags: &Flags,
    close: CloseSignal,
) -> Result<(), ShellError> {
    let _raw = RawModeGuard::enable()?;
    let mut shell = Shell::new(
        config,
        registry,
        Box::new(TtyConsole::new()),
        Box::new(MemoryClipboard::new()),
    );
    if !flags.is_set("quiet") {
        shell.enqueue("VER", Actor::system(), false)?;
    }
    shell.run(TtyKeys::new(close.flag()))
}

/// Piped stdin: each line is one command, then the exit token.
fn run_batch(
    config: &ShellConfig,
    registry: PluginRegistry,
    close: CloseSignal,
) -> Result<(), ShellError> {
    let mut shell = Shell::new(
        config,
        registry,
        Box::new(LineConsole::default()),
        Box::new(MemoryClipboard::new()),
    );
    forward_interrupts(Arc::clone(shell.state()))?;
    let _watcher = close.spawn_watcher(Arc::clone(shell.state()))?;

    let actor = shell.state().actor();
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        shell.enqueue(&line, actor.clone(), true)?;
        shell.run_pending();
        if !shell.is_alive() {
            return Ok(());
        }
    }

    shell.enqueue(EXIT_TOKEN, actor, false)?;
    shell.run_dispatcher();
    Ok(())
}

/// Logs go to `<cache dir>/conch/conch.log` so they never land on the
/// raw-mode screen; stderr is the fallback for piped sessions.
fn init_logging(flags: &Flags, interactive: bool) {
    let filter = if flags.is_set("debug") {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let log_file = dirs::cache_dir().and_then(|dir| {
        let dir = dir.join("conch");
        fs::create_dir_all(&dir).ok()?;
        File::options()
            .create(true)
            .append(true)
            .open(dir.join("conch.log"))
            .ok()
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false);
    let _ = match log_file {
        Some(file) => builder.with_writer(Mutex::new(file)).try_init(),
        None if !interactive => builder.with_writer(io::stderr).try_init(),
        None => builder.with_writer(io::sink).try_init(),
    };
}
