use quoth::{parse, Machine, Value};

fn run_program(source: &str) -> Vec<Value> {
    let mut machine = Machine::new();
    machine.load(parse(source).unwrap());
    machine.run().unwrap();
    machine.view().to_vec()
}

macro_rules! sourcify {
    ( $dir:tt, $name:ident ) => {
        include_str!(concat!($dir, "/", stringify!($name), ".qt"))
    };
}

macro_rules! valid {
    ( $name:ident $(, $value:expr )* ) => {
        #[test]
        fn $name() {
            let result = run_program(sourcify!("valid", $name));
            let expected: &[Value] = &[ $( $value ),* ];
            assert_eq!(result, expected);
        }
    };
}

macro_rules! invalid {
    ( $name:ident ) => {
        #[test]
        #[should_panic]
        fn $name() {
            let _ = run_program(sourcify!("invalid", $name));
        }
    };
}

valid!(hello);
valid!(factorial, Value::Number(120.0));
valid!(countdown, Value::Number(0.0));
valid!(make_adder, Value::Number(8.0));
valid!(try_recover, Value::Str(String::from("recovered")));
valid!(collect, Value::Number(6.0));

invalid!(divide_by_zero);
invalid!(undefined_word);
invalid!(unbalanced);
