use std::process;

use quoth::{Machine, Value};

static USAGE: &str = "\
Usage: quoth [OPTIONS] [SCRIPT]

Run a quoth script, or start an interactive session when no script is given.

Options:
  -e, --eval <SRC>   evaluate <SRC> and exit
  -h, --help         show this message
";

fn main() {
    env_logger::init();

    if let Err(err) = cli() {
        eprintln!("quoth: {}", err);
        process::exit(1);
    }
}

fn cli() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = pico_args::Arguments::from_env();

    if args.contains(["-h", "--help"]) {
        print!("{}", USAGE);
        return Ok(());
    }

    let inline: Option<String> = args.opt_value_from_str(["-e", "--eval"])?;
    let script: Option<String> = args.opt_free_from_str()?;

    let program = match (inline, script) {
        (Some(source), _) => quoth::parse(&source)?,

        (None, Some(path)) => vec![
            Value::Str(path),
            Value::Word("interpret".to_owned()),
        ],

        (None, None) => vec![Value::Word("repl".to_owned())],
    };

    let mut machine = Machine::new();
    machine.load(program);
    machine.run()?;

    Ok(())
}
