use quoth::host::ScriptedHost;
use quoth::{Machine, Value};

fn boot(host: ScriptedHost) -> Machine {
    Machine::with_host(Box::new(host))
}

fn repl() -> Vec<Value> {
    vec![Value::Word("repl".to_owned())]
}

#[test]
fn session_prompts_and_traces_the_stack() {
    let host = ScriptedHost::new(["3 4 +", "drop"]);
    let transcript = host.transcript();

    let mut machine = boot(host);
    machine.load(repl());
    machine.run().unwrap();

    let seen = transcript.borrow();
    assert!(seen.starts_with("> "), "transcript was {:?}", *seen);
    assert!(seen.contains("7 ~> "), "transcript was {:?}", *seen);
}

#[test]
fn session_survives_bad_lines() {
    let host = ScriptedHost::new(["frobnicate", "1 1 +"]);
    let transcript = host.transcript();

    let mut machine = boot(host);
    machine.load(repl());
    machine.run().unwrap();

    let seen = transcript.borrow();
    assert!(
        seen.contains("can't understand frobnicate"),
        "transcript was {:?}",
        *seen
    );
    assert!(seen.contains("2 ~> "), "transcript was {:?}", *seen);
    assert_eq!(machine.view(), &[Value::Number(2.0)]);
}

#[test]
fn session_survives_parse_errors() {
    let host = ScriptedHost::new(["{ 1 2", "3"]);
    let transcript = host.transcript();

    let mut machine = boot(host);
    machine.load(repl());
    machine.run().unwrap();

    let seen = transcript.borrow();
    assert!(seen.contains("missing }"), "transcript was {:?}", *seen);
    assert!(seen.contains("3 ~> "), "transcript was {:?}", *seen);
}

#[test]
fn end_of_input_ends_the_session_quietly() {
    let host = ScriptedHost::new([]);
    let transcript = host.transcript();

    let mut machine = boot(host);
    machine.load(repl());
    machine.run().unwrap();

    assert_eq!(&*transcript.borrow(), "> ");
}

#[test]
fn bye_ends_the_session_mid_stream() {
    let host = ScriptedHost::new(["1 2", "bye", "3 3 +"]);
    let transcript = host.transcript();

    let mut machine = boot(host);
    machine.load(repl());
    machine.run().unwrap();

    assert_eq!(machine.view(), &[Value::Number(1.0), Value::Number(2.0)]);
    assert!(!transcript.borrow().contains("6"));
}

#[test]
fn interpret_reads_through_the_host() {
    let mut host = ScriptedHost::new([]);
    host.provide("demo.qt", "2 3 *");

    let mut machine = boot(host);
    machine.load(vec![
        Value::Str("demo.qt".to_owned()),
        Value::Word("interpret".to_owned()),
    ]);
    machine.run().unwrap();

    assert_eq!(machine.view(), &[Value::Number(6.0)]);
}

#[test]
fn missing_sources_are_catchable() {
    let host = ScriptedHost::new([]);
    let transcript = host.transcript();

    let mut machine = boot(host);
    machine.load(quoth::parse(r#"{ "nowhere.qt" interpret } { echo } try"#).unwrap());
    machine.run().unwrap();

    assert!(transcript.borrow().contains("error"));
    assert!(machine.view().is_empty());
}

#[test]
fn echo_renders_strings_bare() {
    let host = ScriptedHost::new([]);
    let transcript = host.transcript();

    let mut machine = boot(host);
    machine.load(quoth::parse(r#""plain" echo 42 echo { 1 2 } echo"#).unwrap());
    machine.run().unwrap();

    assert_eq!(&*transcript.borrow(), "plain\n42\n{ 1 2 }\n");
}

#[test]
fn inspect_reports_definitions_with_their_effects() {
    let host = ScriptedHost::new([]);
    let transcript = host.transcript();

    let mut machine = boot(host);
    machine.load(quoth::parse("quote swap inspect quote len inspect").unwrap());
    machine.run().unwrap();

    let seen = transcript.borrow();
    assert!(
        seen.contains("swap (1 -> 1) = { 1 roll }"),
        "transcript was {:?}",
        *seen
    );
    assert!(seen.contains("len (1 -> 1) = <BUILTIN>"), "transcript was {:?}", *seen);
}

#[test]
fn prompt_echoes_text_then_reads() {
    let host = ScriptedHost::new(["reply"]);
    let transcript = host.transcript();

    let mut machine = boot(host);
    machine.load(quoth::parse(r#""name? " prompt"#).unwrap());
    machine.run().unwrap();

    assert_eq!(&*transcript.borrow(), "name? ");
    assert_eq!(machine.view(), &[Value::Str("reply".to_owned())]);
}
