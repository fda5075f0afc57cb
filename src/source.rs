//! The upstream side: where raw attribute values of messages come from when
//! an attribute index has not seen a message yet.
//!
//! [`MessageSource`] is the boundary. [`MemorySource`] keeps everything in
//! process, [`SqliteSource`] reads the relational `Message` and `Participant`
//! tables.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::datatype::{id_number, Value};
use crate::error::Result;
use crate::index::{IdHasher, MessageId};

pub type BoutId = u64;

// ------------- Message -------------
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub number: MessageId,
    pub bout: BoutId,
    pub author: String,
    pub text: String,
    pub date: DateTime<Utc>,
}

impl Message {
    // `$number` is the candidate itself and never read from an index
    pub const ATTRIBUTES: [&'static str; 4] = ["bout", "author", "text", "date"];

    pub fn new(number: MessageId, bout: BoutId, author: &str, text: &str, date: DateTime<Utc>) -> Self {
        Self {
            number,
            bout,
            author: author.to_string(),
            text: text.to_string(),
            date,
        }
    }
    /// Attributes carried by the message itself.
    pub fn attribute(&self, name: &str) -> Result<Option<Value>> {
        let value = match name {
            "number" => id_number(self.number)?,
            "bout" => id_number(self.bout)?,
            "author" => Value::Text(self.author.clone()),
            "text" => Value::Text(self.text.clone()),
            "date" => Value::Time(self.date),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }
}

/// Newest first; messages posted at the same instant go by number, highest first.
pub fn sort_newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| b.date.cmp(&a.date).then(b.number.cmp(&a.number)));
}

// ------------- MessageSource -------------
pub trait MessageSource: Send + Sync {
    /// The raw value of one attribute of one message, `None` when unknown.
    /// Besides the message's own attributes, `participants` lists the
    /// identities taking part in the message's bout.
    fn attribute(&self, message: MessageId, name: &str) -> Result<Option<Value>>;
    /// All messages of a bout, newest first.
    fn messages(&self, bout: BoutId) -> Result<Vec<Message>>;
}

// ------------- MemorySource -------------
#[derive(Debug, Default)]
pub struct MemorySource {
    messages: RwLock<HashMap<MessageId, Message, IdHasher>>,
    participants: RwLock<HashMap<BoutId, Vec<String>, IdHasher>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn post(&self, message: Message) -> Result<()> {
        self.messages.write()?.insert(message.number, message);
        Ok(())
    }
    pub fn join(&self, bout: BoutId, identity: &str) -> Result<()> {
        let mut participants = self.participants.write()?;
        let dudes = participants.entry(bout).or_default();
        if !dudes.iter().any(|d| d == identity) {
            dudes.push(identity.to_string());
            dudes.sort();
        }
        Ok(())
    }
}

impl MessageSource for MemorySource {
    fn attribute(&self, message: MessageId, name: &str) -> Result<Option<Value>> {
        let messages = self.messages.read()?;
        let Some(found) = messages.get(&message) else {
            return Ok(None);
        };
        if name == "participants" {
            let participants = self.participants.read()?;
            let dudes = participants.get(&found.bout).cloned().unwrap_or_default();
            return Ok(Some(Value::List(dudes.into_iter().map(Value::Text).collect())));
        }
        found.attribute(name)
    }
    fn messages(&self, bout: BoutId) -> Result<Vec<Message>> {
        let mut found: Vec<Message> = self
            .messages
            .read()?
            .values()
            .filter(|m| m.bout == bout)
            .cloned()
            .collect();
        sort_newest_first(&mut found);
        Ok(found)
    }
}

// ------------- SqliteSource -------------
pub struct SqliteSource {
    connection: Mutex<Connection>,
}

impl SqliteSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }
    fn with_connection(connection: Connection) -> Result<Self> {
        connection.execute_batch(
            "
            create table if not exists Message (
                Message_Number integer not null,
                Bout_Number integer not null,
                Author text not null,
                Text text not null,
                Posted text not null,
                constraint referenceable_Message_Number primary key (
                    Message_Number
                )
            );
            create table if not exists Participant (
                Bout_Number integer not null,
                Identity text not null,
                constraint unique_Participant primary key (
                    Bout_Number,
                    Identity
                )
            );
            ",
        )?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }
    pub fn post(&self, message: &Message) -> Result<()> {
        self.connection.lock()?.execute(
            "
            insert or replace into Message (
                Message_Number,
                Bout_Number,
                Author,
                Text,
                Posted
            ) values (?, ?, ?, ?, ?)
            ",
            params![message.number, message.bout, message.author, message.text, message.date],
        )?;
        Ok(())
    }
    pub fn join(&self, bout: BoutId, identity: &str) -> Result<()> {
        self.connection.lock()?.execute(
            "
            insert or ignore into Participant (
                Bout_Number,
                Identity
            ) values (?, ?)
            ",
            params![bout, identity],
        )?;
        Ok(())
    }
}

impl MessageSource for SqliteSource {
    fn attribute(&self, message: MessageId, name: &str) -> Result<Option<Value>> {
        let connection = self.connection.lock()?;
        if name == "participants" {
            let known = connection
                .prepare_cached("select 1 from Message where Message_Number = ?")?
                .query_row(params![message], |_| Ok(()))
                .optional()?;
            if known.is_none() {
                return Ok(None);
            }
            let mut statement = connection.prepare_cached(
                "
                select p.Identity
                    from Participant p
                    join Message m
                    on m.Bout_Number = p.Bout_Number
                    where m.Message_Number = ?
                    order by p.Identity
                ",
            )?;
            let dudes = statement
                .query_map(params![message], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            return Ok(Some(Value::List(dudes.into_iter().map(Value::Text).collect())));
        }
        let column = match name {
            "number" => "Message_Number",
            "bout" => "Bout_Number",
            "author" => "Author",
            "text" => "Text",
            "date" => "Posted",
            _ => return Ok(None),
        };
        let sql = format!("select {} from Message where Message_Number = ?", column);
        let mut statement = connection.prepare_cached(&sql)?;
        let value = match name {
            "number" | "bout" => statement
                .query_row(params![message], |row| row.get::<_, i64>(0))
                .optional()?
                .map(Value::Number),
            "date" => statement
                .query_row(params![message], |row| row.get::<_, DateTime<Utc>>(0))
                .optional()?
                .map(Value::Time),
            _ => statement
                .query_row(params![message], |row| row.get::<_, String>(0))
                .optional()?
                .map(Value::Text),
        };
        Ok(value)
    }
    fn messages(&self, bout: BoutId) -> Result<Vec<Message>> {
        let connection = self.connection.lock()?;
        let mut statement = connection.prepare_cached(
            "
            select Message_Number, Bout_Number, Author, Text, Posted
                from Message
                where Bout_Number = ?
            ",
        )?;
        let mut found = statement
            .query_map(params![bout], |row| {
                Ok(Message {
                    number: row.get(0)?,
                    bout: row.get(1)?,
                    author: row.get(2)?,
                    text: row.get(3)?,
                    date: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<Message>>>()?;
        sort_newest_first(&mut found);
        Ok(found)
    }
}
