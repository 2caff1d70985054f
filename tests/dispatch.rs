use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use conch::core::actor::{Actor, StaticDirectory};
use conch::core::command::Command;
use conch::core::commands::{
    Cmdlet, OperationalState, Plugin, PluginContext, PluginDescriptor, PluginError,
    PluginRegistry,
};
use conch::core::config::ShellConfig;
use conch::core::rank::RankLevel;
use conch::error::{DispatchError, ShellError};
use conch::shell::{Outcome, Shell, ShellState};
use conch::terminal::{MemoryClipboard, MemoryConsole, ScriptedKeys};
use tempfile::NamedTempFile;

#[derive(Debug, Default)]
struct ListCommand;

impl Plugin for ListCommand {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("list", RankLevel::None)
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        _cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        let args = ctx.args;
        let line = format!(
            "listed all={} {}",
            args.has_switch("all"),
            args.positionals().join(",")
        );
        ctx.print(&line)?;
        Ok(OperationalState::Complete)
    }
}

#[derive(Debug, Default)]
struct AdminTool;

impl Plugin for AdminTool {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("admintool", RankLevel::SuperUser)
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        _cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        ctx.print("admin ran")?;
        Ok(OperationalState::Complete)
    }
}

#[derive(Debug, Default)]
struct Explode;

impl Plugin for Explode {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("explode", RankLevel::None)
    }

    fn execute(
        &mut self,
        _ctx: &mut PluginContext<'_>,
        _cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        panic!("boom")
    }
}

#[derive(Debug, Default)]
struct Quit;

impl Plugin for Quit {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("quit", RankLevel::None)
    }

    fn execute(
        &mut self,
        _ctx: &mut PluginContext<'_>,
        _cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        Err(PluginError::Abort)
    }
}

#[derive(Debug, Default)]
struct Answer;

impl Plugin for Answer {
    fn descriptor() -> PluginDescriptor {
        PluginDescriptor::builtin("answer", RankLevel::None)
    }

    fn execute(
        &mut self,
        ctx: &mut PluginContext<'_>,
        _cmd: &Command,
    ) -> Result<OperationalState, PluginError> {
        ctx.publish("42", Duration::from_secs(60), 1);
        Ok(OperationalState::Complete)
    }
}

fn registry() -> PluginRegistry {
    let mut registry = PluginRegistry::with_builtins().unwrap();
    registry.register_plugin::<ListCommand>().unwrap();
    registry.register_plugin::<AdminTool>().unwrap();
    registry.register_plugin::<Explode>().unwrap();
    registry.register_plugin::<Quit>().unwrap();
    registry.register_plugin::<Answer>().unwrap();
    registry
}

fn shell_with(config: &ShellConfig) -> (Shell, MemoryConsole) {
    let console = MemoryConsole::new();
    let shell = Shell::new(
        config,
        registry(),
        Box::new(console.clone()),
        Box::new(MemoryClipboard::new()),
    );
    (shell, console)
}

fn shell() -> (Shell, MemoryConsole) {
    shell_with(&ShellConfig::new())
}

fn basic_user() -> Actor {
    Actor::new("guest", RankLevel::BasicUser)
}

#[test]
fn test_help_runs_at_rank_none() {
    let (mut shell, console) = shell();
    shell
        .enqueue("HELP", Actor::new("nobody", RankLevel::None), true)
        .unwrap();

    let outcomes = shell.run_pending();
    assert!(matches!(
        &outcomes[..],
        [Outcome::Plugin { name, state: OperationalState::Complete, .. }] if name == "HELP"
    ));
    assert!(console.contains("PRINT"));
    assert_eq!(shell.error_level(), "");
}

#[test]
fn test_rank_too_low_is_rejected() {
    let (mut shell, console) = shell();
    shell.enqueue("ADMINTOOL", basic_user(), true).unwrap();

    let outcomes = shell.run_pending();
    assert!(matches!(
        &outcomes[..],
        [Outcome::Failed(DispatchError::Authorization {
            required: RankLevel::SuperUser,
            actual: RankLevel::BasicUser,
            ..
        })]
    ));
    assert_eq!(shell.error_level(), "3");
    assert!(!console.contains("admin ran"));

    let instance = shell.dispatcher().last_instance().unwrap();
    assert_eq!(instance.state(), OperationalState::None);
    assert_eq!(instance.errors().len(), 1);
    assert_eq!(shell.errors().len(), 1);
}

#[test]
fn test_alias_expands_once_ahead_of_waiting_work() {
    let (mut shell, console) = shell();
    shell
        .state()
        .aliases_mut()
        .define("ll", "\"LIST /all\"")
        .unwrap();
    shell.enqueue("ll extra", basic_user(), true).unwrap();
    shell.enqueue("PRINT after", basic_user(), true).unwrap();

    let outcomes = shell.run_pending();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0], Outcome::Expanded("LIST /all extra".into()));
    assert!(matches!(&outcomes[1], Outcome::Plugin { name, .. } if name == "LIST"));
    assert!(matches!(&outcomes[2], Outcome::Plugin { name, .. } if name == "PRINT"));

    let text = console.text();
    let listed = text.iter().position(|l| l == "listed all=true extra").unwrap();
    let after = text.iter().position(|l| l == "after").unwrap();
    assert!(listed < after);

    let queue = shell.state().queue();
    assert_eq!(queue.iter().filter(|c| c.text() == "LIST /all extra").count(), 1);
}

#[test]
fn test_alias_loop_detected() {
    let (mut shell, _) = shell();
    {
        let mut aliases = shell.state().aliases_mut();
        aliases.define("aa", "bb").unwrap();
        aliases.define("bb", "aa").unwrap();
    }
    shell.enqueue("aa", basic_user(), true).unwrap();

    let outcomes = shell.run_pending();
    assert_eq!(outcomes.len(), 3);
    match &outcomes[2] {
        Outcome::Failed(DispatchError::AliasLoop { alias, chain }) => {
            assert_eq!(alias, "aa");
            assert_eq!(chain, &["aa", "bb", "aa"]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(shell.error_level(), "2");
}

#[test]
fn test_cache_limit_evicts_oldest() {
    let mut config = ShellConfig::new();
    config.cache_limit = 5;
    let (mut shell, _) = shell_with(&config);
    for n in 0..7 {
        shell.enqueue(&format!("PRINT {n}"), basic_user(), true).unwrap();
    }

    {
        let queue = shell.state().queue();
        assert_eq!(queue.len(), 5);
        assert_eq!(queue.get(0).unwrap().text(), "PRINT 2");
        assert!(queue.pointer() <= queue.len());
    }
    assert_eq!(shell.run_pending().len(), 5);
}

#[test]
fn test_unresolved_command_does_not_stop_loop() {
    let (mut shell, console) = shell();
    shell.enqueue("ZZZZZ", basic_user(), true).unwrap();
    shell.enqueue("PRINT still here", basic_user(), true).unwrap();

    let outcomes = shell.run_pending();
    assert_eq!(
        outcomes[0],
        Outcome::Failed(DispatchError::Unresolved("ZZZZZ".into()))
    );
    assert!(matches!(&outcomes[1], Outcome::Plugin { name, .. } if name == "PRINT"));
    assert!(console.contains("unknown command: ZZZZZ"));
    assert!(console.contains("still here"));
    // the successful PRINT clears the level left by ZZZZZ
    assert_eq!(shell.error_level(), "");
    assert!(shell.is_alive());
}

#[test]
fn test_exit_token_discards_waiting_commands() {
    let (mut shell, console) = shell();
    shell.enqueue("BYE", basic_user(), true).unwrap();
    shell.enqueue("PRINT never", basic_user(), true).unwrap();

    let outcomes = shell.run_pending();
    assert_eq!(outcomes, vec![Outcome::Cmdlet(Cmdlet::Bye)]);
    assert!(!console.contains("never"));
    assert!(!shell.is_alive());
    assert!(matches!(
        shell.enqueue("PRINT late", basic_user(), true),
        Err(ShellError::Queue(_))
    ));
}

#[test]
fn test_panicking_plugin_is_contained() {
    let (mut shell, console) = shell();
    shell.enqueue("EXPLODE", basic_user(), true).unwrap();
    shell.enqueue("PRINT survived", basic_user(), true).unwrap();

    let outcomes = shell.run_pending();
    assert!(matches!(
        &outcomes[0],
        Outcome::Failed(DispatchError::PluginExecution {
            source: PluginError::Panicked(message),
            ..
        }) if message == "boom"
    ));
    assert_eq!(
        shell.dispatcher().last_instance().unwrap().state(),
        OperationalState::IncompleteWithErrors
    );
    assert!(console.contains("survived"));
}

#[test]
fn test_abort_stops_shell() {
    let (mut shell, console) = shell();
    shell.enqueue("QUIT", basic_user(), true).unwrap();
    shell.enqueue("PRINT never", basic_user(), true).unwrap();

    let outcomes = shell.run_pending();
    assert_eq!(
        outcomes,
        vec![Outcome::Failed(DispatchError::FatalAbort("QUIT".into()))]
    );
    assert_eq!(shell.error_level(), "5");
    assert!(!shell.is_alive());
    assert!(!console.contains("never"));
}

#[test]
fn test_interrupt_cancels_running_wait() {
    let (mut shell, _) = shell();
    shell.enqueue("WAIT 10000", basic_user(), true).unwrap();

    let state = Arc::clone(shell.state());
    let interrupter = thread::spawn(move || {
        while !state.interrupt() {
            thread::sleep(Duration::from_millis(5));
        }
    });

    let outcomes = shell.run_pending();
    interrupter.join().unwrap();
    assert!(matches!(
        &outcomes[..],
        [Outcome::Failed(DispatchError::PluginExecution {
            source: PluginError::Cancelled,
            ..
        })]
    ));
    assert_eq!(
        shell.dispatcher().last_instance().unwrap().state(),
        OperationalState::Cancelled
    );
    assert_eq!(shell.error_level(), "4");
    assert!(shell.is_alive());
}

#[test]
fn test_published_result_is_read_once() {
    let (mut shell, _) = shell();
    shell.enqueue("ANSWER", basic_user(), true).unwrap();

    let outcomes = shell.run_pending();
    let Outcome::Plugin { instance, .. } = outcomes[0] else {
        panic!("unexpected {:?}", outcomes[0]);
    };
    let results = shell.state().results();
    assert_eq!(results.read(instance).as_deref(), Some("42"));
    assert_eq!(results.read(instance), None);
}

#[test]
fn test_heartbeat_fires_between_commands() {
    let mut config = ShellConfig::new();
    config.heartbeat = Duration::from_millis(10);
    let (mut shell, _) = shell_with(&config);

    let beats = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&beats);
    shell.on_heartbeat(move |actor, snapshot| {
        assert!(!actor.name().is_empty());
        assert!(!snapshot.is_empty());
        seen.fetch_add(1, Ordering::SeqCst);
    });

    thread::sleep(Duration::from_millis(20));
    shell.enqueue("PRINT tick", basic_user(), true).unwrap();
    shell.run_pending();
    assert!(beats.load(Ordering::SeqCst) >= 1);
}

#[test]
fn test_interactive_run_until_close() {
    let (mut shell, console) = shell();
    let keys = ScriptedKeys::new(ScriptedKeys::line("PRINT hello"));

    shell.run(keys).unwrap();

    assert!(!shell.is_alive());
    assert!(console.contains("> PRINT hello"));
    assert!(console.text().iter().any(|line| line == "hello"));
}

#[test]
fn test_alias_payload_expanded_once() {
    let (mut shell, console) = shell();
    shell
        .state()
        .environment_mut()
        .set("SECRET", "leaked", &Actor::system())
        .unwrap();
    shell.state().aliases_mut().define("pp", "PRINT").unwrap();

    shell.enqueue("PRINT $$SECRET", basic_user(), true).unwrap();
    shell.enqueue("pp $$SECRET", basic_user(), true).unwrap();
    shell.enqueue("pp $SECRET", basic_user(), true).unwrap();
    shell.run_pending();

    let printed: Vec<String> = console
        .text()
        .into_iter()
        .filter(|line| line.contains("SECRET") || line == "leaked")
        .collect();
    assert_eq!(printed, vec!["$SECRET", "$SECRET", "leaked"]);
}

#[test]
fn test_source_with_bare_absolute_path() {
    let mut script = NamedTempFile::new().unwrap();
    writeln!(script, "PRINT from script").unwrap();
    let path = script.path().display().to_string();
    assert!(path.starts_with('/'));

    let (mut shell, console) = shell();
    shell.enqueue(&format!("SOURCE {path}"), basic_user(), true).unwrap();

    let outcomes = shell.run_pending();
    assert!(matches!(
        &outcomes[0],
        Outcome::Plugin { name, state: OperationalState::Complete, .. } if name == "SOURCE"
    ));
    assert!(console.text().iter().any(|line| line == "from script"));
}

#[test]
fn test_source_refuses_script_longer_than_queue() {
    let mut script = NamedTempFile::new().unwrap();
    for n in 0..30 {
        writeln!(script, "PRINT line{n}").unwrap();
    }
    let path = script.path().display().to_string();

    let (mut shell, console) = shell();
    shell.enqueue(&format!("SOURCE {path}"), basic_user(), true).unwrap();

    let outcomes = shell.run_pending();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        &outcomes[0],
        Outcome::Failed(DispatchError::PluginExecution {
            source: PluginError::Failed(_),
            ..
        })
    ));
    assert_eq!(shell.error_level(), "4");
    assert!(!console.contains("line0"));
}

#[test]
fn test_history_never_shows_login_secret() {
    let config = ShellConfig::new();
    let console = MemoryConsole::new();
    let directory = StaticDirectory::new().with_user("ada", "engine", RankLevel::Administrator);
    let state = ShellState::new(&config, Box::new(console.clone())).with_directory(Arc::new(directory));
    let mut shell = Shell::with_state(&config, registry(), state);
    shell.state().aliases_mut().define("lg", "LOGIN").unwrap();

    shell.enqueue("LOGIN ada engine", basic_user(), true).unwrap();
    shell.enqueue("lg ada engine", basic_user(), true).unwrap();
    shell.enqueue("PRINT visible", basic_user(), true).unwrap();
    shell.enqueue("HISTORY", basic_user(), true).unwrap();
    shell.run_pending();

    assert_eq!(shell.state().actor().name(), "ada");
    assert!(console.contains("PRINT visible"));
    assert!(!console.contains("engine"));
    assert!(shell.state().queue().iter().all(|cmd| !cmd.text().contains("engine")));
}
