fn main() {
    let mut machine = quoth::Machine::new();

    machine.load(vec![quoth::Value::Word("repl".to_owned())]);

    machine.run().unwrap_or_else(|err| {
        println!("{}", err);
    });
}
