use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use zzz::config::Context;
use zzz::external;
use zzz::requirements::SystemChecker;
use zzz::runner::{self, RunOptions};
use zzz::script::{DEFAULT_PROMPT, Script};
use zzz::transpile::Transpiler;
use zzz::Interpreter;

/// Environment variable holding the log filter.
const LOG_VAR: &str = "ZZZ_LOG";

#[derive(FromArgs, Debug)]
/// Run a zzz script. Arguments after the script path are passed to the script.
struct Args {
    #[argh(switch)]
    /// don't print the intro
    skip_intro: bool,
    #[argh(switch)]
    /// never clear the screen before running
    no_cls: bool,
    #[argh(switch)]
    /// print the transpiled source instead of running it
    emit: bool,
    #[argh(positional)]
    /// script file, or @name for ~/.zzz/scripts/name.zzz
    path: String,
}

/// Split launcher flags from the script's own arguments: everything after
/// the first positional (the script path) belongs to the script.
fn split_argv(argv: &[String]) -> (&[String], &[String]) {
    let at = argv
        .iter()
        .position(|arg| !arg.starts_with('-'))
        .map_or(argv.len(), |i| i + 1);
    argv.split_at(at)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn script_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string())
}

fn run(args: Args, script_args: Vec<String>) -> Result<i32> {
    let ctx = Context::from_env()?;
    let path = ctx.resolve_script(&args.path);
    debug!(path = %path.display(), "loading script");
    let source = runner::read_script(&path)?;

    let checker = SystemChecker::from_env(ctx.library_dirs()).with_env(ctx.env.clone());
    let mut transpiler = Transpiler::new(Box::new(checker));

    if args.emit {
        let lines: Vec<&str> = source.lines().collect();
        println!("{}", transpiler.compile_script(&lines)?.source);
        return Ok(0);
    }

    let script = Script::new(script_name(&path)).with_args(script_args);
    let mut interp = Interpreter::new(script)
        .with_env(ctx.env.clone())
        .with_interrupts();
    runner::load_source(&mut interp, &mut transpiler, &source, &ctx.library_dirs())?;

    let script = interp.script();
    if script.commands.is_empty() && script.events.is_empty() {
        return Ok(0);
    }
    if script.prompt == DEFAULT_PROMPT {
        if let Some(prompt) = &ctx.config.prompt {
            interp.script_mut().prompt = prompt.clone();
        }
    }
    let options = RunOptions {
        intro: !args.skip_intro && ctx.config.cli.intro,
        clear: !args.no_cls && ctx.config.cli.clear && external::stdout_is_tty(),
    };
    runner::run_script(&mut interp, options)
}

fn main() -> ExitCode {
    init_tracing();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let (launcher, script_args) = split_argv(&argv);
    let launcher: Vec<&str> = launcher.iter().map(String::as_str).collect();
    let args = match Args::from_args(&["zzz"], &launcher) {
        Ok(args) => args,
        Err(EarlyExit { output, status }) => {
            return match status {
                Ok(()) => {
                    println!("{output}");
                    ExitCode::SUCCESS
                }
                Err(()) => {
                    eprintln!("{output}");
                    ExitCode::FAILURE
                }
            };
        }
    };

    if let Err(err) = external::install_interrupt_handler() {
        warn!("{err:#}");
    }
    match run(args, script_args.to_vec()) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            eprintln!("zzz: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn script_arguments_are_not_launcher_flags() {
        let argv = owned(&["--skip-intro", "deploy.zzz", "push", "--force"]);
        let (launcher, rest) = split_argv(&argv);
        assert_eq!(launcher, owned(&["--skip-intro", "deploy.zzz"]));
        assert_eq!(rest, owned(&["push", "--force"]));
    }

    #[test]
    fn launcher_flags_parse() {
        let args = Args::from_args(&["zzz"], &["--emit", "@tool"]).unwrap();
        assert!(args.emit);
        assert_eq!(args.path, "@tool");
    }

    #[test]
    fn names_come_from_the_file_stem() {
        assert_eq!(script_name(Path::new("/a/deploy.zzz")), "deploy");
    }
}
