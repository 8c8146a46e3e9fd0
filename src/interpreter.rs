//! Command Interpreter
//!
//! Maps a parsed command to a store operation and a reply. Stateless per
//! command; the same dispatch serves live traffic and log replay.

use crate::error::{Result, VeroError};
use crate::protocol::{Command, Reply, Verb};
use crate::store::{Store, Value};

/// Check the verb is known and the argument count fits it
pub fn validate(command: &Command) -> Result<()> {
    let arity = command.verb.arity().ok_or(VeroError::UnknownCommand)?;
    if !arity.accepts(command.args.len()) {
        return Err(VeroError::Arity);
    }
    Ok(())
}

/// Execute a command against the store
///
/// Unknown verbs and wrong argument counts become error replies. The only
/// error returned is `StorageFull`, raised when a `set` cannot grow the table.
pub fn execute(store: &Store, command: &Command) -> Result<Reply> {
    if let Err(e) = validate(command) {
        return Ok(Reply::error(e.to_string()));
    }

    let reply = match &command.verb {
        Verb::Get => match store.get(&command.args[0]) {
            Some(Value::String(bytes)) => Reply::Bulk(bytes),
            None => Reply::Nil,
        },
        Verb::Set => {
            let key = command.args[0].to_vec();
            let value = Value::String(command.args[1].clone());
            store.set(key, value)?;
            Reply::Integer(1)
        }
        Verb::Del => {
            let removed = command
                .args
                .iter()
                .filter(|key| store.delete(key))
                .count();
            Reply::Integer(removed as i64)
        }
        Verb::Ping => Reply::bulk("PONG"),
        Verb::Quit => Reply::ok(),
        Verb::Unknown(_) => Reply::error(VeroError::UnknownCommand.to_string()),
    };

    Ok(reply)
}
