use std::fmt;

use crate::parser::{ParseErr, ParseErrKind};
use crate::{Effect, EvalErr, Flattenable, TypeName, Value};

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }

            Value::Bool(b) => write!(f, "{}", b),

            Value::Str(s) => write!(f, "\"{}\"", escape(s)),

            Value::Word(w) => write!(f, "{}", w),

            Value::Quote(body) => {
                if body.is_empty() {
                    write!(f, "{{}}")
                } else {
                    write!(f, "{{ {} }}", body.flatten(" "))
                }
            }

            Value::Seq(items) => {
                if items.is_empty() {
                    write!(f, "{{}} seq")
                } else {
                    write!(f, "{{ {} }} seq", items.flatten(" "))
                }
            }
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());

    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            ch => out.push(ch),
        }
    }

    out
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (line {}, column {})", self.kind, self.line, self.column)
    }
}

impl fmt::Display for ParseErrKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            ParseErrKind::MissingOpenBrace => "missing {",
            ParseErrKind::MissingCloseBrace => "missing }",
            ParseErrKind::MissingEndQuote => "missing \"",
            ParseErrKind::BadEscape => "unknown escape",
        })
    }
}

impl fmt::Display for EvalErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EvalErr::StackUnderflow => write!(f, "stack underflow"),

            EvalErr::DivideByZero => write!(f, "divided by zero"),

            EvalErr::WrongType(value, typename) => {
                write!(f, "type of {} is not {}", value, typename)
            }

            EvalErr::CantUnderstand(name) => {
                write!(f, "can't understand {}", name)
            }

            EvalErr::BadParse(err) => {
                write!(f, "{}", err)
            }

            EvalErr::EmptySequence => {
                write!(f, "empty sequence")
            }

            EvalErr::TruncatedForm => {
                write!(f, "truncated code form")
            }

            EvalErr::Io(message) => {
                write!(f, "i/o failed: {}", message)
            }
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            TypeName::Word => "word",
            TypeName::Number => "number",
            TypeName::Str => "string",
            TypeName::Bool => "boolean",
            TypeName::Quote => "quotation",
            TypeName::Seq => "sequence",
            TypeName::Index => "index",
        })
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.exact {
            write!(f, "({} -> {})", self.consumes, self.produces)
        } else {
            write!(f, "({} -> ?)", self.consumes)
        }
    }
}

impl std::error::Error for ParseErr {}

impl std::error::Error for EvalErr {}
