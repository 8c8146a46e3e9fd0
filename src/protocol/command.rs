//! Command definitions
//!
//! Represents commands from clients.

use bytes::Bytes;

/// Command verbs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Get,
    Set,
    Del,
    Ping,
    Quit,

    /// Anything else, kept verbatim for logging
    Unknown(String),
}

/// Accepted argument counts for a verb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl Verb {
    /// Match a verb token, ignoring ASCII case
    pub fn parse(token: &[u8]) -> Verb {
        const VERBS: [(&[u8], Verb); 5] = [
            (b"get", Verb::Get),
            (b"set", Verb::Set),
            (b"del", Verb::Del),
            (b"ping", Verb::Ping),
            (b"quit", Verb::Quit),
        ];

        VERBS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(token))
            .map(|(_, verb)| verb.clone())
            .unwrap_or_else(|| Verb::Unknown(String::from_utf8_lossy(token).into_owned()))
    }

    /// Canonical lowercase name
    pub fn as_str(&self) -> &str {
        match self {
            Verb::Get => "get",
            Verb::Set => "set",
            Verb::Del => "del",
            Verb::Ping => "ping",
            Verb::Quit => "quit",
            Verb::Unknown(token) => token,
        }
    }

    /// Argument count the verb accepts (`None` for unknown verbs)
    pub fn arity(&self) -> Option<Arity> {
        match self {
            Verb::Get => Some(Arity::Exact(1)),
            Verb::Set => Some(Arity::Exact(2)),
            Verb::Del => Some(Arity::AtLeast(1)),
            Verb::Ping | Verb::Quit => Some(Arity::Exact(0)),
            Verb::Unknown(_) => None,
        }
    }

    /// Whether executing this verb can mutate the store
    pub fn is_write(&self) -> bool {
        matches!(self, Verb::Set | Verb::Del)
    }

    /// Whether the session ends after replying
    pub fn is_terminal(&self) -> bool {
        matches!(self, Verb::Quit)
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: Verb,
    pub args: Vec<Bytes>,
}

impl Command {
    pub fn new(verb: Verb, args: Vec<Bytes>) -> Self {
        Self { verb, args }
    }

    /// `get <key>`
    pub fn get(key: impl Into<Bytes>) -> Self {
        Self::new(Verb::Get, vec![key.into()])
    }

    /// `set <key> <value>`
    pub fn set(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::new(Verb::Set, vec![key.into(), value.into()])
    }

    /// `del <key> [key ...]`
    pub fn del<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Bytes>,
    {
        Self::new(Verb::Del, keys.into_iter().map(Into::into).collect())
    }

    pub fn is_write(&self) -> bool {
        self.verb.is_write()
    }

    pub fn is_terminal(&self) -> bool {
        self.verb.is_terminal()
    }

    /// Canonical single-line form, without terminator: `verb arg1 arg2`
    pub fn to_line(&self) -> Vec<u8> {
        let len = self.verb.as_str().len() + self.args.iter().map(|a| a.len() + 1).sum::<usize>();
        let mut line = Vec::with_capacity(len);
        line.extend_from_slice(self.verb.as_str().as_bytes());
        for arg in &self.args {
            line.push(b' ');
            line.extend_from_slice(arg);
        }
        line
    }
}
