use std::iter::Peekable;
use std::rc::Rc;
use std::str::Chars;

use crate::Value;

pub type Program = Vec<Value>;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParseErr {
    pub kind: ParseErrKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ParseErrKind {
    MissingOpenBrace,
    MissingCloseBrace,
    MissingEndQuote,
    BadEscape,
}

impl ParseErr {
    fn at((line, column): (usize, usize), kind: ParseErrKind) -> Self {
        ParseErr { kind, line, column }
    }
}

pub fn parse(input: &str) -> Result<Program, ParseErr> {
    let mut reader = Reader::new(input);
    let mut program = Vec::new();

    while let Some(form) = reader.read_form()? {
        program.push(form);
    }

    Ok(program)
}

pub struct Reader<'a> {
    stream: Peekable<Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str) -> Self {
        Reader {
            stream: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    pub fn read_form(&mut self) -> Result<Option<Value>, ParseErr> {
        let mut stack: Vec<((usize, usize), Vec<Value>)> = Vec::new();

        loop {
            let at = self.here();

            let ch = match self.bump() {
                Some(ch) => ch,
                None => break,
            };

            let value = match ch {
                '{' => {
                    stack.push((at, Vec::with_capacity(16)));
                    continue;
                }

                '}' => match stack.pop() {
                    Some((_, block)) => Value::Quote(Rc::new(block)),
                    None => return Err(ParseErr::at(at, ParseErrKind::MissingOpenBrace)),
                },

                '"' => self.read_str(at)?,

                '#' => {
                    self.skip_comment();
                    continue;
                }

                s if s.is_whitespace() => continue,

                w => self.read_word(w),
            };

            match stack.last_mut() {
                Some((_, block)) => block.push(value),
                None => return Ok(Some(value)),
            }
        }

        match stack.pop() {
            Some((open, _)) => Err(ParseErr::at(open, ParseErrKind::MissingCloseBrace)),
            None => Ok(None),
        }
    }

    fn read_str(&mut self, open: (usize, usize)) -> Result<Value, ParseErr> {
        let mut buf = String::new();

        loop {
            let at = self.here();

            match self.bump() {
                None => return Err(ParseErr::at(open, ParseErrKind::MissingEndQuote)),

                Some('"') => return Ok(Value::Str(buf)),

                Some('\\') => match self.bump() {
                    Some('\\') => buf.push('\\'),
                    Some('"') => buf.push('"'),
                    Some('n') => buf.push('\n'),
                    Some('t') => buf.push('\t'),
                    _ => return Err(ParseErr::at(at, ParseErrKind::BadEscape)),
                },

                Some(ch) => buf.push(ch),
            }
        }
    }

    fn read_word(&mut self, first: char) -> Value {
        let mut prev = first;
        let mut word = String::new();
        word.push(first);

        while let Some(&ch) = self.stream.peek() {
            if word_break(prev, ch) {
                break;
            }

            prev = ch;
            word.extend(self.bump());
        }

        match word.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => match parse_number(&word) {
                Some(n) => Value::Number(n),
                None => Value::Word(word),
            },
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.bump() {
            if ch == '\n' {
                break;
            }
        }
    }

    fn here(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.stream.next()?;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }
}

fn parse_number(word: &str) -> Option<f64> {
    let digits = word.strip_prefix(&['+', '-'][..]).unwrap_or(word);

    if digits.starts_with(|ch: char| ch.is_ascii_digit()) {
        word.parse().ok()
    } else {
        None
    }
}

fn word_break(a: char, b: char) -> bool {
    fn is_delim(ch: char) -> bool {
        matches!(ch, '{' | '}')
    }

    match (a, b) {
        (_, s) if s.is_whitespace() => true,
        (_, s) if is_delim(s) => true,
        ('=', '=') => false,
        ('=', _) => true,
        (_, '=') => true,
        _ => false,
    }
}
