use std::collections::BTreeMap;

use chrono::{DateTime, Local};

use super::actor::Actor;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unterminated {quote} quote starting at column {column}")]
    UnterminatedQuote { quote: char, column: usize },
    #[error("switch without a name at column {0}")]
    EmptySwitch(usize),
    #[error("unknown switch /{switch} for {command}")]
    UnknownSwitch { command: String, switch: String },
    #[error("{command} expects {expected}, got {got} argument(s)")]
    ArgumentCount {
        command: String,
        expected: String,
        got: usize,
    },
}

/// One instruction accepted from the keyboard or injected by the host.
#[derive(Debug, Clone)]
pub struct Command {
    text: String,
    created: DateTime<Local>,
    processed: bool,
    allow_cache: bool,
    actor: Actor,
    alias_chain: Vec<String>,
}

impl Command {
    pub fn new(text: impl Into<String>, actor: Actor) -> Self {
        Self {
            text: text.into().trim().to_string(),
            created: Local::now(),
            processed: false,
            allow_cache: true,
            actor,
            alias_chain: Vec::new(),
        }
    }

    pub fn uncached(mut self) -> Self {
        self.allow_cache = false;
        self
    }

    pub fn with_cache(mut self, allow_cache: bool) -> Self {
        self.allow_cache = allow_cache;
        self
    }

    /// A command produced by expanding the alias `name` found in `self`.
    pub fn expanded_from(&self, name: &str, text: impl Into<String>) -> Self {
        let mut alias_chain = self.alias_chain.clone();
        alias_chain.push(name.to_lowercase());
        Self {
            text: text.into().trim().to_string(),
            created: Local::now(),
            processed: false,
            allow_cache: self.allow_cache,
            actor: self.actor.clone(),
            alias_chain,
        }
    }

    /// Same command with its text rewritten (environment expansion).
    pub fn rewritten(&self, text: impl Into<String>) -> Self {
        let mut cmd = self.clone();
        cmd.text = text.into().trim().to_string();
        cmd
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// First whitespace-delimited token.
    pub fn verb(&self) -> &str {
        self.text.split_whitespace().next().unwrap_or("")
    }

    /// Everything after the verb, with leading whitespace removed.
    pub fn payload(&self) -> &str {
        let verb = self.verb();
        self.text[verb.len()..].trim_start()
    }

    pub fn is_verb(&self, name: &str) -> bool {
        self.verb().eq_ignore_ascii_case(name)
    }

    pub fn created(&self) -> DateTime<Local> {
        self.created
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }

    pub(crate) fn mark_processed(&mut self) {
        self.processed = true;
    }

    pub fn allow_cache(&self) -> bool {
        self.allow_cache
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn alias_chain(&self) -> &[String] {
        &self.alias_chain
    }

    pub fn args(&self) -> Result<ParsedArgs, ParseError> {
        if self.verb().is_empty() {
            return Err(ParseError::Empty);
        }
        ParsedArgs::parse(self.payload())
    }
}

/// Positional arguments and `/switch[:value]` switches of a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    positionals: Vec<String>,
    switches: BTreeMap<String, Option<String>>,
}

impl ParsedArgs {
    pub fn parse(payload: &str) -> Result<Self, ParseError> {
        let mut args = ParsedArgs::default();
        for token in tokenize(payload)? {
            if token.quoted || !token.text.starts_with('/') || token.text.len() == 1 {
                args.positionals.push(token.text);
                continue;
            }

            let body = &token.text[1..];
            let (name, value) = match body.split_once(':') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (body, None),
            };
            // `/tmp/x.conch` and `/.hidden` are paths, not switches
            if name.contains(['/', '.']) {
                args.positionals.push(token.text);
                continue;
            }
            if name.is_empty() {
                return Err(ParseError::EmptySwitch(token.column));
            }
            args.switches.insert(name.to_lowercase(), value);
        }
        Ok(args)
    }

    pub fn positionals(&self) -> &[String] {
        &self.positionals
    }

    pub fn positional(&self, index: usize) -> Option<&str> {
        self.positionals.get(index).map(String::as_str)
    }

    pub fn has_switch(&self, name: &str) -> bool {
        self.switches.contains_key(&name.to_lowercase())
    }

    pub fn switch_value(&self, name: &str) -> Option<&str> {
        self.switches
            .get(&name.to_lowercase())
            .and_then(|value| value.as_deref())
    }

    pub fn switch_names(&self) -> impl Iterator<Item = &str> {
        self.switches.keys().map(String::as_str)
    }
}

struct Token {
    text: String,
    quoted: bool,
    column: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut text = String::new();
        let mut quoted = false;
        while let Some(&(column, c)) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            match c {
                '"' | '\'' => {
                    quoted = true;
                    let mut closed = false;
                    while let Some((_, inner)) = chars.next() {
                        if inner == c {
                            closed = true;
                            break;
                        }
                        if inner == '\\' && c == '"' {
                            if let Some((_, escaped)) = chars.next() {
                                text.push(escaped);
                            }
                            continue;
                        }
                        text.push(inner);
                    }
                    if !closed {
                        return Err(ParseError::UnterminatedQuote { quote: c, column });
                    }
                }
                '\\' => {
                    if let Some((_, escaped)) = chars.next() {
                        text.push(escaped);
                    }
                }
                _ => text.push(c),
            }
        }
        tokens.push(Token {
            text,
            quoted,
            column: start,
        });
    }

    Ok(tokens)
}
