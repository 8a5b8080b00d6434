//! End-to-end tests for the instrumentation pipeline: source in,
//! instrumented source out.

use loopguard::config::{InstrumentConfig, OnBreak};
use loopguard::script::parse;
use loopguard::Instrumenter;

fn instrument(config: InstrumentConfig, source: &str) -> String {
    let mut instrumenter = Instrumenter::new(config).unwrap();
    instrumenter.run(source).unwrap()
}

#[test]
fn test_instruments_all_three_loop_kinds() {
    let source = "\
var n = 0;
while (n < 3) {
    n = n + 1;
}
do {
    n = n - 1;
} while (n > 0);
for (var i = 0; i < 3; i = i + 1) {
    n = n + i;
}
";
    let output = instrument(InstrumentConfig::default(), source);

    // One timer binding per loop, each with a distinct name
    assert!(output.contains("var _timer = now();"));
    assert!(output.contains("var _timer2 = now();"));
    assert!(output.contains("var _timer3 = now();"));
    assert_eq!(output.matches("if (now() - ").count(), 3);
    assert_eq!(output.matches("break;").count(), 3);

    // The output is valid source
    parse(&output).unwrap();
}

#[test]
fn test_guard_is_first_statement_of_loop_body() {
    let source = "while (busy()) {\n    spin();\n}";
    let output = instrument(InstrumentConfig::default(), source);

    assert!(
        output.contains("while (busy()) {\n    if (now() - _timer > 2000) {"),
        "guard not first in body:\n{}",
        output
    );
}

#[test]
fn test_bare_body_is_wrapped_into_block() {
    let output = instrument(InstrumentConfig::default(), "while (busy()) spin();");

    let expected = "\
var _timer = now();
while (busy()) {
    if (now() - _timer > 2000) {
        (() => {})(1, 1);
        break;
    }
    spin();
}
";
    assert_eq!(output, expected);
}

#[test]
fn test_custom_timeout_is_embedded_as_literal() {
    let config = InstrumentConfig::new(250, OnBreak::Noop).unwrap();
    let output = instrument(config, "while (a) b();");

    assert!(output.contains("> 250)"));
}

#[test]
fn test_message_is_escaped_in_rendered_source() {
    let config =
        InstrumentConfig::new(2000, OnBreak::Message("say \"stop\"".to_string())).unwrap();
    let output = instrument(config, "while (a) b();");

    assert!(
        output.contains("report(\"say \\\"stop\\\"\")"),
        "message not escaped:\n{}",
        output
    );
    parse(&output).unwrap();
}

#[test]
fn test_callable_callback_is_embedded_at_each_site() {
    let config = InstrumentConfig::new(
        2000,
        OnBreak::Callable("(line, col) => recorded.push([line, col])".to_string()),
    )
    .unwrap();
    let output = instrument(config, "while (a) b();\nwhile (c) d();");

    assert_eq!(
        output
            .matches("((line, col) => recorded.push([line, col]))")
            .count(),
        2
    );
    parse(&output).unwrap();
}

#[test]
fn test_named_function_callback_renders_as_expression() {
    let config = InstrumentConfig::new(
        2000,
        OnBreak::Callable("function notify(line, col) { report(line); }".to_string()),
    )
    .unwrap();
    let output = instrument(config, "while (a) b();");

    assert!(
        output.contains("(function notify(line, col) { report(line); })(1, 1);"),
        "function callback not embedded:\n{}",
        output
    );
    parse(&output).unwrap();
}

#[test]
fn test_loop_heads_are_untouched() {
    let source = "for (var i = 0; i < 10; i = i + 1) {\n    work(i);\n}";
    let output = instrument(InstrumentConfig::default(), source);

    assert!(output.contains("for (var i = 0; i < 10; i = i + 1) {"));
}

#[test]
fn test_instrumented_output_is_stable_under_reparse() {
    let source = "var n = 0;\nwhile (n < 3) {\n    n = n + 1;\n}";
    let output = instrument(InstrumentConfig::default(), source);

    let reparsed = parse(&output).unwrap();
    assert_eq!(loopguard::script::render(&reparsed), output);
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("input.script");
    let output_path = dir.path().join("output.script");

    std::fs::write(&input_path, "while (busy()) spin();").unwrap();

    let source = std::fs::read_to_string(&input_path).unwrap();
    let output = instrument(InstrumentConfig::default(), &source);
    std::fs::write(&output_path, &output).unwrap();

    let written = std::fs::read_to_string(&output_path).unwrap();
    parse(&written).unwrap();
    assert!(written.contains("var _timer = now();"));
}

#[test]
fn test_invalid_callback_fails_at_construction() {
    let config = InstrumentConfig::new(2000, OnBreak::Callable("var x = 1;".to_string())).unwrap();
    let err = Instrumenter::new(config).unwrap_err();
    assert!(err.to_string().contains("internal error"));
}
