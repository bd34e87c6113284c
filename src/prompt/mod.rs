//! Operator prompts.
//!
//! The pipeline never reads stdin directly. Every question goes through a
//! `Prompter`, so runs can be scripted in tests.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

pub trait Prompter {
    /// Ask for a line of input. `None` means input is closed.
    fn ask(&mut self, message: &str) -> Option<String>;

    /// Ask whether to continue despite a problem.
    fn confirm(&mut self, message: &str) -> bool;

    /// Ask whether to try again after invalid input.
    fn retry(&mut self, message: &str) -> bool;
}

/// Interpret a yes/no answer. Anything else is `None`.
pub fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Line-oriented prompter over any reader/writer pair.
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
}

impl ConsolePrompter<std::io::StdinLock<'static>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    fn yes_no(&mut self, message: &str, question: &str) -> bool {
        let _ = writeln!(self.output, "{message}");
        loop {
            let _ = write!(self.output, "{question} (y/n) ");
            let _ = self.output.flush();
            let Some(answer) = self.read_line() else {
                return false;
            };
            if let Some(decision) = parse_yes_no(&answer) {
                return decision;
            }
            let _ = writeln!(self.output, "Please answer y or n.");
        }
    }
}

impl<R: BufRead, W: Write> Prompter for ConsolePrompter<R, W> {
    fn ask(&mut self, message: &str) -> Option<String> {
        let _ = write!(self.output, "{message}: ");
        let _ = self.output.flush();
        self.read_line()
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.yes_no(message, "Continue anyways?")
    }

    fn retry(&mut self, message: &str) -> bool {
        self.yes_no(message, "Try again?")
    }
}

/// Replays queued answers. Running out of answers behaves like closed input.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    /// Every message shown, in order.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    pub fn remaining(&self) -> usize {
        self.answers.len()
    }

    fn next(&mut self, message: &str) -> Option<String> {
        self.transcript.push(message.to_string());
        self.answers.pop_front()
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, message: &str) -> Option<String> {
        self.next(message)
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.next(message)
            .and_then(|a| parse_yes_no(&a))
            .unwrap_or(false)
    }

    fn retry(&mut self, message: &str) -> bool {
        self.confirm(message)
    }
}
