use proptest::prelude::*;

use zzz::requirements::AssumePresent;
use zzz::transpile::line::transform;
use zzz::transpile::{MacroRegistry, Transpiler};

const DSL_PREFIXES: [&str; 12] = [
    "//", "<", ">>", "fn ", "?", "for ", "loop:", "$", ":", "/-/", "#!", "\t",
];

fn transpiler() -> Transpiler {
    Transpiler::new(Box::new(AssumePresent)).with_platform("linux")
}

fn plain_line() -> impl Strategy<Value = String> {
    ("[ ]{0,8}", "[A-Za-z_0-9(\"'\\[][ -~]{0,40}")
        .prop_map(|(indent, body)| format!("{indent}{body}"))
        .prop_filter("must not start with a DSL prefix", |line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !DSL_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        })
}

fn dsl_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6} [a-z0-9+]{1,10}".prop_map(|s| format!(">> {s}")),
        "[a-z ]{1,12}".prop_map(|s| format!("< {s}")),
        "[a-z{} ]{1,12}".prop_map(|s| format!("<< {s}")),
        "[a-z]{1,4} > [0-9]{1,2}".prop_map(|s| format!("? {s}")),
        ("[a-z]", 0..10i32, 0..10i32).prop_map(|(v, a, b)| format!("for {v} in {a}..{b}:")),
        Just("?:".to_string()),
        Just("loop:".to_string()),
        plain_line(),
    ]
}

proptest! {
    #[test]
    fn lines_without_prefix_are_unchanged(line in plain_line()) {
        prop_assert_eq!(transform(&line, &MacroRegistry::default()).unwrap(), line);
    }

    #[test]
    fn indentation_is_preserved(indent in "[ ]{0,12}", line in dsl_line()) {
        let input = format!("{indent}{}", line.trim_start());
        let out = transform(&input, &MacroRegistry::default()).unwrap();
        prop_assert!(out.starts_with(&indent));
        prop_assert!(!out[indent.len()..].starts_with(' '));
    }

    #[test]
    fn compile_is_pure(a in prop::collection::vec(dsl_line(), 0..12),
                       b in prop::collection::vec(dsl_line(), 0..12)) {
        let mut shared = transpiler();
        let first = shared.compile(&a).unwrap();
        shared.compile(&b).unwrap();
        let again = shared.compile(&a).unwrap();
        prop_assert_eq!(&first, &again);
        prop_assert_eq!(first, transpiler().compile(&a).unwrap());
    }

    #[test]
    fn one_output_line_per_input_line(lines in prop::collection::vec(dsl_line(), 1..20)) {
        let out = transpiler().compile(&lines).unwrap();
        prop_assert_eq!(out.split('\n').count(), lines.len());
    }

    #[test]
    fn precompile_false_is_verbatim(lines in prop::collection::vec(dsl_line(), 0..12)) {
        let mut input = vec!["#!precompile=False".to_string()];
        input.extend(lines.iter().cloned());
        let out = transpiler().compile(&input).unwrap();
        prop_assert_eq!(out, lines.join("\n"));
    }
}

#[test]
fn inclusive_range_runs_three_times() {
    use zzz::console::Console;
    use zzz::io_adapters::collected;
    use zzz::{Interpreter, Script};

    let source = transpiler()
        .compile(&["for i in 1..3:", "    <<< i"])
        .unwrap();
    let (console, out) = Console::capture();
    let mut interp = Interpreter::new(Script::new("t")).with_console(console);
    interp.run_source(&source, 0).unwrap();
    assert_eq!(collected(&out), "1\n2\n3\n");
}
