//! The runtime's only window on the outside world. The evaluator calls
//! these three methods through `capture`/`prompt`/`echo`/`load`; everything
//! else is pure stack manipulation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::rc::Rc;

pub trait Host {
    /// One line of input, without its terminator. `None` means end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    fn write(&mut self, text: &str) -> io::Result<()>;

    fn load_source(&mut self, designator: &str) -> io::Result<String>;
}

pub struct StdHost;

impl Host for StdHost {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = String::new();

        if io::stdin().read_line(&mut buf)? == 0 {
            return Ok(None);
        }

        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }

        Ok(Some(buf))
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }

    fn load_source(&mut self, designator: &str) -> io::Result<String> {
        fs::read_to_string(designator)
    }
}

/// Canned input and named sources, with the transcript kept for assertions.
pub struct ScriptedHost {
    input: VecDeque<String>,
    sources: Vec<(String, String)>,
    transcript: Rc<RefCell<String>>,
}

impl ScriptedHost {
    pub fn new<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        ScriptedHost {
            input: lines.into_iter().map(str::to_owned).collect(),
            sources: Vec::new(),
            transcript: Rc::new(RefCell::new(String::new())),
        }
    }

    pub fn provide(&mut self, designator: &str, source: &str) {
        self.sources.push((designator.to_owned(), source.to_owned()));
    }

    pub fn transcript(&self) -> Rc<RefCell<String>> {
        Rc::clone(&self.transcript)
    }
}

impl Host for ScriptedHost {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.input.pop_front())
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        self.transcript.borrow_mut().push_str(text);
        Ok(())
    }

    fn load_source(&mut self, designator: &str) -> io::Result<String> {
        self.sources
            .iter()
            .find(|(name, _)| name == designator)
            .map(|(_, source)| source.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, designator.to_owned()))
    }
}
