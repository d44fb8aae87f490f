// tests/command_line.rs

mod common;
use crate::common::init_tracing;

use proptest::prelude::*;

use stagehand::cmdline::{
    Arg, ArgValue, CommandLine, CommandLineError, escape_argument, split_arguments,
};

#[test]
fn renders_flags_named_and_positional_in_order() {
    init_tracing();

    let invocation = CommandLine::new("tool")
        .flag("verbose")
        .named("count", 3)
        .named("ratio", 1.5)
        .positional("file.txt")
        .build()
        .unwrap();

    assert_eq!(invocation.executable, "tool");
    assert_eq!(
        invocation.arguments,
        r#"-verbose -count "3" -ratio "1.5" "file.txt""#
    );
    assert_eq!(
        invocation.to_string(),
        r#""tool" -verbose -count "3" -ratio "1.5" "file.txt""#
    );
}

#[test]
fn action_is_always_first_and_set_once() {
    let line = CommandLine::new("terraform")
        .flag("no-color")
        .action("apply")
        .unwrap();
    assert_eq!(line.args()[0], Arg::RawAction("apply".to_string()));
    assert_eq!(line.build().unwrap().arguments, "apply -no-color");

    let err = line.action("plan").unwrap_err();
    assert_eq!(err, CommandLineError::ActionAlreadySet("apply".to_string()));
}

#[test]
fn blank_named_argument_renders_as_positional() {
    let invocation = CommandLine::new("tool").named("  ", "value").build().unwrap();
    assert_eq!(invocation.arguments, r#""value""#);
}

#[test]
fn blank_flag_and_action_names_are_rejected() {
    assert_eq!(
        CommandLine::new("tool").action("  ").unwrap_err(),
        CommandLineError::BlankName("action")
    );
    assert_eq!(
        CommandLine::new("tool").flag("").positional("x").build().unwrap_err(),
        CommandLineError::BlankName("flag")
    );
    assert_eq!(
        CommandLine::library(|_| 0).flag(" ").build_library_call().unwrap_err(),
        CommandLineError::BlankName("flag")
    );
}

#[test]
fn missing_executable_is_rejected() {
    assert_eq!(
        CommandLine::new("  ").build().unwrap_err(),
        CommandLineError::MissingExecutable
    );
    assert_eq!(
        CommandLine::new("tool").build_library_call().unwrap_err(),
        CommandLineError::MissingEntryPoint
    );
}

#[test]
fn wrapped_runtime_moves_executable_into_arguments() {
    let invocation = CommandLine::new("Calamari.dll")
        .action("run-script")
        .unwrap()
        .positional("x")
        .use_wrapped_runtime()
        .build()
        .unwrap();

    assert_eq!(invocation.executable, "dotnet");
    assert_eq!(invocation.arguments, r#""Calamari.dll" run-script "x""#);

    let custom = CommandLine::new("tool.dll")
        .use_wrapped_runtime_named("mono")
        .build()
        .unwrap();
    assert_eq!(custom.executable, "mono");
    assert_eq!(custom.arguments, r#""tool.dll""#);
}

#[test]
fn library_call_passes_values_unescaped() {
    let line = CommandLine::library(|args: &[String]| args.len() as i32)
        .action("deploy")
        .unwrap()
        .named("package", r#"C:\pkgs\a "b".zip"#)
        .flag("force");

    let call = line.build_library_call().unwrap();
    assert_eq!(
        call.arguments,
        vec![
            "deploy".to_string(),
            r#"-package C:\pkgs\a "b".zip"#.to_string(),
            "-force".to_string(),
        ]
    );
    assert_eq!(call.invoke(), 3);

    assert_eq!(
        line.raw_args(),
        vec!["deploy", "-package", r#"C:\pkgs\a "b".zip"#, "-force"]
    );
}

#[test]
fn numbers_render_without_locale() {
    assert_eq!(ArgValue::from(1234567_i64).to_string(), "1234567");
    assert_eq!(ArgValue::from(0.25_f64).to_string(), "0.25");
}

#[test]
fn booleans_render_in_dotnet_casing() {
    assert_eq!(ArgValue::from(true).to_string(), "True");
    assert_eq!(ArgValue::from(false).to_string(), "False");

    let invocation = CommandLine::new("tool").named("enabled", true).build().unwrap();
    assert_eq!(invocation.arguments, r#"-enabled "True""#);
}

#[test]
fn escaping_doubles_backslashes_before_quotes_and_end() {
    assert_eq!(escape_argument(""), r#""""#);
    assert_eq!(escape_argument(r"C:\dir\"), r#""C:\dir\\""#);
    assert_eq!(escape_argument(r#"say "hi""#), r#""say \"hi\"""#);
    assert_eq!(escape_argument(r#"a\"b"#), r#""a\\\"b""#);
    assert_eq!(escape_argument(r"a\b"), r#""a\b""#);
}

#[test]
fn splitting_handles_unquoted_tokens() {
    assert_eq!(split_arguments(r#"apply  -x "two words""#), vec!["apply", "-x", "two words"]);
    assert_eq!(split_arguments(r#""" b"#), vec!["", "b"]);
    assert!(split_arguments("   ").is_empty());
}

proptest! {
    #[test]
    fn escaped_arguments_split_back_to_the_original(
        values in proptest::collection::vec(any::<String>(), 0..6)
    ) {
        let line = values
            .iter()
            .map(|v| escape_argument(v))
            .collect::<Vec<_>>()
            .join(" ");
        prop_assert_eq!(split_arguments(&line), values);
    }

    #[test]
    fn quotes_and_backslashes_survive(value in r#"[a\\" ]{0,16}"#) {
        let escaped = escape_argument(&value);
        prop_assert_eq!(split_arguments(&escaped), vec![value]);
    }
}
