mod display;
pub mod host;
mod parser;

use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;
use log::{debug, info, trace};

use crate::host::{Host, StdHost};

pub use crate::parser::{parse, ParseErr, ParseErrKind, Program, Reader};

static PRELUDE: &str = include_str!("prelude.qt");

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Word(String),
    Number(f64),
    Str(String),
    Bool(bool),
    Quote(Rc<Vec<Value>>),
    Seq(VecDeque<Value>),
}

#[derive(Clone, Debug)]
pub enum EvalErr {
    StackUnderflow,
    CantUnderstand(String),
    DivideByZero,
    WrongType(Value, TypeName),
    BadParse(ParseErr),
    EmptySequence,
    TruncatedForm,
    Io(String),
}

#[derive(Copy, Clone, Debug)]
pub enum TypeName {
    Word,
    Number,
    Str,
    Bool,
    Quote,
    Seq,
    Index,
}

/// A quoth interpreter: dictionary, data stack, and pending-code work list.
/// Each machine is self-contained; any number can coexist in one process.
pub struct Machine {
    dict: IndexMap<String, Binding>,
    data: Vec<Value>,
    code: Vec<Value>,
    traps: Vec<Trap>,
    host: Box<dyn Host>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Builtin {
    Bye,
    Eval,
    Expand,
    If,
    Try,
    Untrap,
    Quote,
    Snapshot,
    Explode,
    AsSeq,
    Len,
    Append,
    Push,
    Pop,
    Shift,
    Unshift,
    Parse,
    Echo,
    Capture,
    Prompt,
    Load,
    Flatten,
    Lines,
    Pick,
    Roll,
    Drop,
    Clear,
    Strcat,
    Inspect,
    OpAdd,
    OpSub,
    OpMul,
    OpDiv,
    OpNeg,
    OpEql,
    OpLt,
    OpGt,
}

#[derive(Clone, Debug)]
enum Binding {
    Primitive(Builtin),
    User(Effect, Value),
}

#[derive(Copy, Clone, Debug)]
pub struct Effect {
    pub consumes: usize,
    pub produces: usize,
    pub exact: bool,
}

struct Trap {
    data_mark: usize,
    code_mark: usize,
    handler: Rc<Vec<Value>>,
}

enum Flow {
    Continue,
    Halt,
}

impl Machine {
    pub fn new() -> Self {
        Machine::with_host(Box::new(StdHost))
    }

    pub fn with_host(host: Box<dyn Host>) -> Self {
        let mut machine = Machine {
            dict: Builtin::default_bindings(),
            data: Vec::new(),
            code: Vec::new(),
            traps: Vec::new(),
            host,
        };

        machine.load(parse(PRELUDE).expect("prelude is well-formed"));
        machine.run().expect("prelude evaluates cleanly");
        info!("prelude loaded, {} words bound", machine.dict.len());

        machine
    }

    pub fn load<P>(&mut self, program: P)
    where
        P: IntoIterator<Item = Value>,
        P::IntoIter: DoubleEndedIterator,
    {
        self.code.extend(program.into_iter().rev());
    }

    pub fn view(&self) -> &[Value] {
        &self.data
    }

    pub fn run(&mut self) -> Result<(), EvalErr> {
        while let Some(value) = self.code.pop() {
            let name = match value {
                Value::Word(name) => name,

                literal => {
                    self.data.push(literal);
                    continue;
                }
            };

            let result = if self.pending_assign() {
                self.define(&name)
            } else {
                self.step(&name)
            };

            match result {
                Ok(Flow::Continue) => {}

                Ok(Flow::Halt) => {
                    self.code.clear();
                    self.traps.clear();
                    break;
                }

                Err(err) => self.unwind(&name, err)?,
            }
        }

        Ok(())
    }

    // The next code element is `=` when the word just popped is the
    // left-hand side of a definition form.
    fn pending_assign(&self) -> bool {
        matches!(self.code.last(), Some(Value::Word(next)) if next == "=")
    }

    fn define(&mut self, name: &str) -> Result<Flow, EvalErr> {
        self.code.pop();

        let value = self.code.pop().ok_or(EvalErr::TruncatedForm)?;

        let effect = match &value {
            Value::Quote(body) => self.infer_effect(body),
            _ => Effect::literal(),
        };

        debug!("defined {} {}", name, effect);
        self.dict.insert(name.to_owned(), Binding::User(effect, value));

        Ok(Flow::Continue)
    }

    fn step(&mut self, name: &str) -> Result<Flow, EvalErr> {
        trace!("eval {}", name);

        match self.lookup(name)? {
            Binding::Primitive(op) => self.builtin(op),

            Binding::User(effect, value) => {
                if self.data.len() < effect.consumes {
                    return Err(EvalErr::StackUnderflow);
                }

                match value {
                    Value::Quote(body) => self.splice(&body),
                    other => self.code.push(other),
                }

                Ok(Flow::Continue)
            }
        }
    }

    fn unwind(&mut self, name: &str, err: EvalErr) -> Result<(), EvalErr> {
        let trap = match self.traps.pop() {
            Some(trap) => trap,
            None => return Err(err),
        };

        debug!("{} failed, unwinding stack to depth {}", name, trap.data_mark);
        self.code.truncate(trap.code_mark);
        self.data.truncate(trap.data_mark);
        self.data.push(Value::Str(format!("{} error: {}", name, err)));
        self.splice(&trap.handler);

        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Binding, EvalErr> {
        self.dict.get(name).cloned().ok_or_else(|| {
            EvalErr::CantUnderstand(name.to_owned())
        })
    }

    fn splice(&mut self, body: &[Value]) {
        self.code.extend(body.iter().rev().cloned());
    }

    fn infer_effect(&self, body: &[Value]) -> Effect {
        let mut effect = Effect {
            consumes: 0,
            produces: 0,
            exact: true,
        };

        for value in body {
            match self.effect_of(value) {
                Some(next) => effect.merge(next),
                None => effect.exact = false,
            }

            if !effect.exact {
                break;
            }
        }

        effect
    }

    fn effect_of(&self, value: &Value) -> Option<Effect> {
        let name = match value {
            Value::Word(name) => name,
            _ => return Some(Effect::literal()),
        };

        self.dict.get(name).map(|binding| match binding {
            Binding::Primitive(op) => op.effect(),
            Binding::User(effect, _) => *effect,
        })
    }

    fn builtin(&mut self, op: Builtin) -> Result<Flow, EvalErr> {
        match op {
            Builtin::Bye => return Ok(Flow::Halt),

            Builtin::Eval => match self.pop()? {
                Value::Quote(body) => self.splice(&body),
                other => self.data.push(other),
            },

            Builtin::Expand => {
                let template = self.pop()?.as_quote()?;
                let pattern = self.pop()?.as_quote()?;

                let mut frame = IndexMap::new();

                for name in pattern.iter().rev() {
                    let name = match name {
                        Value::Word(name) => name.clone(),
                        other => {
                            return Err(EvalErr::WrongType(other.clone(), TypeName::Word));
                        }
                    };

                    let value = self.pop()?;
                    frame.insert(name, value);
                }

                let rewritten = template
                    .iter()
                    .map(|value| value.substitute(&frame))
                    .collect();

                self.data.push(Value::Quote(Rc::new(rewritten)));
            }

            Builtin::If => {
                let alternative = self.pop()?.as_quote()?;
                let consequent = self.pop()?.as_quote()?;
                let test = self.pop()?.as_bool()?;

                if test {
                    self.splice(&consequent);
                } else {
                    self.splice(&alternative);
                }
            }

            Builtin::Try => {
                let handler = self.pop()?.as_quote()?;
                let body = self.pop()?.as_quote()?;

                self.traps.push(Trap {
                    data_mark: self.data.len(),
                    code_mark: self.code.len(),
                    handler,
                });

                self.code.push(Value::Word("untrap".to_owned()));
                self.splice(&body);
            }

            Builtin::Untrap => {
                self.traps.pop();
            }

            Builtin::Quote => {
                let value = self.code.pop().ok_or(EvalErr::TruncatedForm)?;
                self.data.push(value);
            }

            Builtin::Snapshot => {
                let snapshot: VecDeque<Value> = self.data.iter().cloned().collect();
                self.data.push(Value::Seq(snapshot));
            }

            Builtin::Explode => match self.pop()? {
                Value::Seq(items) => self.data.extend(items),
                Value::Quote(body) => self.data.extend(body.iter().cloned()),
                other => return Err(EvalErr::WrongType(other, TypeName::Seq)),
            },

            Builtin::AsSeq => match self.pop()? {
                Value::Seq(items) => self.data.push(Value::Seq(items)),

                Value::Quote(body) => {
                    self.data.push(Value::Seq(body.iter().cloned().collect()));
                }

                other => return Err(EvalErr::WrongType(other, TypeName::Quote)),
            },

            Builtin::Len => {
                let len = match self.pop()? {
                    Value::Seq(items) => items.len(),
                    Value::Quote(body) => body.len(),
                    Value::Str(s) => s.chars().count(),
                    other => return Err(EvalErr::WrongType(other, TypeName::Seq)),
                };

                self.push(len as f64);
            }

            Builtin::Append => {
                let rhs = self.pop()?.as_seq()?;
                let mut lhs = self.pop()?.as_seq()?;
                lhs.extend(rhs);
                self.push(lhs);
            }

            Builtin::Push => {
                let value = self.pop()?;
                let mut seq = self.pop()?.as_seq()?;
                seq.push_back(value);
                self.push(seq);
            }

            Builtin::Pop => {
                let mut seq = self.pop()?.as_seq()?;
                let value = seq.pop_back().ok_or(EvalErr::EmptySequence)?;
                self.push(seq);
                self.data.push(value);
            }

            Builtin::Shift => {
                let mut seq = self.pop()?.as_seq()?;
                let value = seq.pop_front().ok_or(EvalErr::EmptySequence)?;
                self.push(seq);
                self.data.push(value);
            }

            Builtin::Unshift => {
                let value = self.pop()?;
                let mut seq = self.pop()?.as_seq()?;
                seq.push_front(value);
                self.push(seq);
            }

            Builtin::Parse => {
                let source = self.pop()?.as_str()?;
                let program = parse(&source)?;
                self.data.push(Value::Quote(Rc::new(program)));
            }

            Builtin::Echo => {
                let text = self.pop()?.into_text();
                self.write_line(&text)?;
            }

            Builtin::Capture => match self.host.read_line().map_err(EvalErr::from_io)? {
                Some(line) => self.push(line),
                None => return Ok(Flow::Halt),
            },

            Builtin::Prompt => {
                let text = self.pop()?.into_text();
                self.host.write(&text).map_err(EvalErr::from_io)?;
                return self.builtin(Builtin::Capture);
            }

            Builtin::Load => {
                let designator = self.pop()?.as_str()?;
                info!("loading {}", designator);

                let source = self
                    .host
                    .load_source(&designator)
                    .map_err(EvalErr::from_io)?;

                self.push(source);
            }

            Builtin::Flatten => {
                let sep = self.pop()?.as_str()?;

                let joined = match self.pop()? {
                    Value::Seq(items) => items.flatten(&sep),
                    Value::Quote(body) => body.flatten(&sep),
                    other => return Err(EvalErr::WrongType(other, TypeName::Seq)),
                };

                self.push(joined);
            }

            Builtin::Lines => {
                let text = self.pop()?.as_str()?;

                let lines: VecDeque<Value> = text
                    .lines()
                    .map(|line| Value::Str(line.to_owned()))
                    .collect();

                self.push(lines);
            }

            Builtin::Pick => {
                let depth = self.pop()?.as_index()?;
                let value = self.peek(depth)?.clone();
                self.data.push(value);
            }

            Builtin::Roll => {
                let depth = self.pop()?.as_index()?;

                let index = self
                    .data
                    .len()
                    .checked_sub(depth + 1)
                    .ok_or(EvalErr::StackUnderflow)?;

                let value = self.data.remove(index);
                self.data.push(value);
            }

            Builtin::Drop => {
                let _ = self.pop()?;
            }

            Builtin::Clear => {
                self.data.clear();
            }

            Builtin::Strcat => {
                let rhs = self.pop()?.into_text();
                let mut lhs = self.pop()?.into_text();
                lhs.push_str(&rhs);
                self.push(lhs);
            }

            Builtin::Inspect => {
                let name = self.pop()?.as_word()?;

                let report = match self.lookup(&name)? {
                    Binding::Primitive(op) => {
                        format!("{} {} = <BUILTIN>", name, op.effect())
                    }

                    Binding::User(effect, value) => {
                        format!("{} {} = {}", name, effect, value)
                    }
                };

                self.write_line(&report)?;
            }

            Builtin::OpAdd => self.num_binop(|x, y| Ok(x + y))?,

            Builtin::OpSub => self.num_binop(|x, y| Ok(x - y))?,

            Builtin::OpMul => self.num_binop(|x, y| Ok(x * y))?,

            Builtin::OpDiv => self.num_binop(|x, y| {
                if y == 0.0 {
                    Err(EvalErr::DivideByZero)
                } else {
                    Ok(x / y)
                }
            })?,

            Builtin::OpNeg => {
                let n = self.pop()?.as_number()?;
                self.push(-n);
            }

            Builtin::OpEql => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                self.push(lhs == rhs);
            }

            Builtin::OpLt => self.num_binop(|x, y| Ok(x < y))?,

            Builtin::OpGt => self.num_binop(|x, y| Ok(x > y))?,
        }

        Ok(Flow::Continue)
    }

    fn num_binop<R, F>(&mut self, op: F) -> Result<(), EvalErr>
    where
        R: Into<Value>,
        F: FnOnce(f64, f64) -> Result<R, EvalErr>,
    {
        let rhs = self.pop()?.as_number()?;
        let lhs = self.pop()?.as_number()?;
        self.push(op(lhs, rhs)?);
        Ok(())
    }

    fn write_line(&mut self, text: &str) -> Result<(), EvalErr> {
        self.host.write(text).map_err(EvalErr::from_io)?;
        self.host.write("\n").map_err(EvalErr::from_io)
    }

    fn peek(&self, depth: usize) -> Result<&Value, EvalErr> {
        self.data
            .len()
            .checked_sub(depth + 1)
            .and_then(|index| self.data.get(index))
            .ok_or(EvalErr::StackUnderflow)
    }

    fn push<T: Into<Value>>(&mut self, t: T) {
        self.data.push(t.into());
    }

    fn pop(&mut self) -> Result<Value, EvalErr> {
        self.data.pop().ok_or(EvalErr::StackUnderflow)
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<Vec<Value>> for Value {
    fn from(body: Vec<Value>) -> Self {
        Value::Quote(Rc::new(body))
    }
}

impl From<VecDeque<Value>> for Value {
    fn from(items: VecDeque<Value>) -> Self {
        Value::Seq(items)
    }
}

impl From<ParseErr> for EvalErr {
    fn from(err: ParseErr) -> Self {
        EvalErr::BadParse(err)
    }
}

impl EvalErr {
    fn from_io(err: std::io::Error) -> Self {
        EvalErr::Io(err.to_string())
    }
}

impl Value {
    fn as_word(self) -> Result<String, EvalErr> {
        match self {
            Value::Word(name) => Ok(name),
            val => Err(EvalErr::WrongType(val, TypeName::Word)),
        }
    }

    fn as_number(self) -> Result<f64, EvalErr> {
        match self {
            Value::Number(n) => Ok(n),
            val => Err(EvalErr::WrongType(val, TypeName::Number)),
        }
    }

    fn as_bool(self) -> Result<bool, EvalErr> {
        match self {
            Value::Bool(b) => Ok(b),
            val => Err(EvalErr::WrongType(val, TypeName::Bool)),
        }
    }

    fn as_quote(self) -> Result<Rc<Vec<Value>>, EvalErr> {
        match self {
            Value::Quote(body) => Ok(body),
            val => Err(EvalErr::WrongType(val, TypeName::Quote)),
        }
    }

    fn as_seq(self) -> Result<VecDeque<Value>, EvalErr> {
        match self {
            Value::Seq(items) => Ok(items),
            val => Err(EvalErr::WrongType(val, TypeName::Seq)),
        }
    }

    fn as_str(self) -> Result<String, EvalErr> {
        match self {
            Value::Str(s) => Ok(s),
            val => Err(EvalErr::WrongType(val, TypeName::Str)),
        }
    }

    // Stack depths and pick/roll operands: a non-negative integral number.
    fn as_index(self) -> Result<usize, EvalErr> {
        match self {
            Value::Number(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
            val => Err(EvalErr::WrongType(val, TypeName::Index)),
        }
    }

    fn into_text(self) -> String {
        match self {
            Value::Str(s) => s,
            other => format!("{}", other),
        }
    }

    fn substitute(&self, frame: &IndexMap<String, Value>) -> Value {
        match self {
            Value::Word(name) => match frame.get(name) {
                Some(value) => value.clone(),
                None => Value::Word(name.clone()),
            },

            Value::Quote(body) => Value::Quote(Rc::new({
                body.iter().map(|value| value.substitute(frame)).collect()
            })),

            other => other.clone(),
        }
    }
}

pub trait Flattenable {
    fn flatten(&self, sep: &str) -> String;
}

impl Flattenable for [Value] {
    fn flatten(&self, sep: &str) -> String {
        self.iter()
            .map(|value| format!("{}", value))
            .collect::<Vec<_>>()
            .join(sep)
    }
}

impl Flattenable for VecDeque<Value> {
    fn flatten(&self, sep: &str) -> String {
        self.iter()
            .map(|value| format!("{}", value))
            .collect::<Vec<_>>()
            .join(sep)
    }
}

impl From<Builtin> for Binding {
    fn from(op: Builtin) -> Self {
        Binding::Primitive(op)
    }
}

impl Effect {
    fn literal() -> Self {
        Effect {
            consumes: 0,
            produces: 1,
            exact: true,
        }
    }

    fn merge(&mut self, next: Effect) {
        if self.produces < next.consumes {
            self.consumes += next.consumes - self.produces;
            self.produces = 0;
        } else {
            self.produces -= next.consumes;
        }

        self.produces += next.produces;
        self.exact = self.exact && next.exact;
    }
}

impl Builtin {
    fn effect(self) -> Effect {
        let exact = |consumes, produces| Effect {
            consumes,
            produces,
            exact: true,
        };

        let inexact = |consumes| Effect {
            consumes,
            produces: 0,
            exact: false,
        };

        use Builtin::*;

        match self {
            Bye => inexact(0),
            Eval => inexact(1),
            Expand => inexact(2),
            If => inexact(3),
            Try => inexact(2),
            Untrap => exact(0, 0),
            Quote => inexact(0),
            Snapshot => exact(0, 1),
            Explode => inexact(1),
            AsSeq => exact(1, 1),
            Len => exact(1, 1),
            Append => exact(2, 1),
            Push => exact(2, 1),
            Pop => exact(1, 2),
            Shift => exact(1, 2),
            Unshift => exact(2, 1),
            Parse => exact(1, 1),
            Echo => exact(1, 0),
            Capture => exact(0, 1),
            Prompt => exact(1, 1),
            Load => exact(1, 1),
            Flatten => exact(2, 1),
            Lines => exact(1, 1),
            Pick => exact(2, 2),
            Roll => exact(2, 1),
            Drop => exact(1, 0),
            Clear => inexact(0),
            Strcat => exact(2, 1),
            Inspect => exact(1, 0),
            OpAdd => exact(2, 1),
            OpSub => exact(2, 1),
            OpMul => exact(2, 1),
            OpDiv => exact(2, 1),
            OpNeg => exact(1, 1),
            OpEql => exact(2, 1),
            OpLt => exact(2, 1),
            OpGt => exact(2, 1),
        }
    }
}

macro_rules! index_map {
    ( $( $k:expr => $v:expr ,)* ) => {{
        let mut _map = ::indexmap::IndexMap::new();
        $( _map.insert($k.into(), $v.into()); )*
        _map
    }};
}

impl Builtin {
    fn default_bindings() -> IndexMap<String, Binding> {
        use Builtin::*;

        index_map![
            "bye" => Bye,
            "eval" => Eval,
            "expand" => Expand,
            "if" => If,
            "try" => Try,
            "untrap" => Untrap,
            "quote" => Quote,
            "snapshot" => Snapshot,
            "explode" => Explode,
            "seq" => AsSeq,
            "len" => Len,
            "append" => Append,
            "push" => Push,
            "pop" => Pop,
            "shift" => Shift,
            "unshift" => Unshift,
            "parse" => Parse,
            "echo" => Echo,
            "capture" => Capture,
            "prompt" => Prompt,
            "load" => Load,
            "flatten" => Flatten,
            "lines" => Lines,
            "pick" => Pick,
            "roll" => Roll,
            "drop" => Drop,
            "clear" => Clear,
            "strcat" => Strcat,
            "inspect" => Inspect,
            "+" => OpAdd,
            "-" => OpSub,
            "*" => OpMul,
            "/" => OpDiv,
            "~" => OpNeg,
            "==" => OpEql,
            "<" => OpLt,
            ">" => OpGt,
        ]
    }
}
