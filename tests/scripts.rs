use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use zzz::Interpreter;
use zzz::Script;
use zzz::console::Console;
use zzz::io_adapters::collected;
use zzz::requirements::AssumePresent;
use zzz::runner::{self, Interactive, RunOptions, ScriptedReader, cli};
use zzz::transpile::Transpiler;

const QUIET: RunOptions = RunOptions {
    intro: false,
    clear: false,
};

fn transpiler() -> Transpiler {
    Transpiler::new(Box::new(AssumePresent)).with_platform("linux")
}

fn load(source: &str, args: &[&str]) -> (Interpreter, Rc<RefCell<Vec<u8>>>) {
    let (console, out) = Console::capture();
    let script = Script::new("demo").with_args(args.iter().map(|a| a.to_string()).collect());
    let mut interp = Interpreter::new(script).with_console(console);
    runner::load_source(&mut interp, &mut transpiler(), source, &[]).unwrap();
    (interp, out)
}

const TOOL: &str = r#"#!platform=linux
// deploy helper
fn show(a, b=2, *rest):
    << a={a} b={b}
    <<< rest

fn double(n: int) -> print(n * 2)

on(show)
on('twice', double, short='Print a number doubled')
"#;

#[test]
fn cli_binds_positionals_options_and_rest() {
    let (mut interp, out) = load(TOOL, &["show", "x", "--b", "9", "y", "z"]);
    assert_eq!(cli::run(&mut interp, QUIET).unwrap(), 0);
    assert_eq!(collected(&out), "a=x b=9\n[\"y\", \"z\"]\n");
}

#[test]
fn cli_converts_declared_types() {
    let (mut interp, out) = load(TOOL, &["twice", "21"]);
    assert_eq!(cli::run(&mut interp, QUIET).unwrap(), 0);
    assert_eq!(collected(&out), "42\n");

    let (mut interp, _) = load(TOOL, &["twice", "abc"]);
    assert_eq!(cli::run(&mut interp, QUIET).unwrap(), cli::USAGE_ERROR);
}

#[test]
fn cli_help_lists_script_commands() {
    let (mut interp, out) = load(TOOL, &["--help"]);
    assert_eq!(cli::run(&mut interp, QUIET).unwrap(), 0);
    let text = collected(&out);
    assert!(text.contains("show"));
    assert!(text.contains("Print a number doubled"));
}

#[test]
fn interactive_session_runs_script_and_meta_commands() {
    let source = "\
add_option('mode', 'fast', choices=['fast', 'slow'])
fn current():
    <<< option('mode')
on(current)
";
    let (mut interp, out) = load(source, &[]);
    let reader = ScriptedReader::new([
        "current",
        "zset mode slow",
        "current",
        "zset mode warp",
        "exit",
    ]);
    Interactive::new(&mut interp, reader).run(QUIET).unwrap();
    let text = collected(&out);
    assert!(text.starts_with("fast\nUpdated: mode=slow\nslow\n"));
    assert!(text.contains("error:"));
    assert_eq!(interp.script().options.get("mode"), Ok(&zzz::Value::str("slow")));
}

#[test]
fn libraries_load_before_the_script() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("helpers.zzz"), "fn shout(s) -> upper(s)\n").unwrap();

    let (console, out) = Console::capture();
    let mut interp = Interpreter::new(Script::new("demo")).with_console(console);
    let source = "#!require=!helpers\n<<< shout('hey')";
    let compiled =
        runner::load_source(&mut interp, &mut transpiler(), source, &[dir.path().to_path_buf()])
            .unwrap();
    assert_eq!(compiled.options.libraries, ["helpers"]);
    assert_eq!(collected(&out), "HEY\n");
}

#[test]
fn missing_library_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut interp = Interpreter::new(Script::new("demo"));
    let err = runner::load_source(
        &mut interp,
        &mut transpiler(),
        "#!require=!nowhere\n",
        &[dir.path().to_path_buf()],
    )
    .unwrap_err();
    assert!(err.to_string().contains("nowhere"));
}

#[test]
fn runtime_errors_report_the_script_line() {
    let mut interp = Interpreter::new(Script::new("demo"));
    let err = runner::load_source(
        &mut interp,
        &mut transpiler(),
        "#!platform=linux\n>> x 1\n<<< x / 0",
        &[],
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("line 3"), "{err:#}");
}

#[test]
fn quotes_inside_interpolated_lines_survive() {
    let (_, out) = load("<< said \"hi\" {1 + 1}\n:say \"ok\"", &[]);
    assert_eq!(collected(&out), "said \"hi\" 2\n\"ok\"\n");
}
