use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, warn};

use crate::literal::{format_hex, parse_byte};

use super::error::TableError;
use super::layout;
use super::parser::{CommandDescriptor, parse_descriptor};

/// Lookup key for a command: its name or its register address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommandKey {
    Name(String),
    Address(i8),
}

impl CommandKey {
    /// Interpret front-end text as a key.
    ///
    /// Text that parses as a byte numeral is an address, anything else is a
    /// command name.
    ///
    /// # Examples
    /// ```
    /// use pmbus_core::CommandKey;
    ///
    /// assert_eq!(CommandKey::parse("0x21"), CommandKey::Address(0x21));
    /// assert_eq!(CommandKey::parse("VOUT_COMMAND"), CommandKey::Name("VOUT_COMMAND".into()));
    /// ```
    pub fn parse(text: &str) -> Self {
        match parse_byte(text) {
            Ok(address) => CommandKey::Address(address),
            Err(_) => CommandKey::Name(text.to_string()),
        }
    }
}

impl fmt::Display for CommandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKey::Name(name) => write!(f, "{name}"),
            CommandKey::Address(address) => write!(f, "{}", format_hex(*address)),
        }
    }
}

impl From<&str> for CommandKey {
    fn from(value: &str) -> Self {
        CommandKey::Name(value.to_string())
    }
}

impl From<String> for CommandKey {
    fn from(value: String) -> Self {
        CommandKey::Name(value)
    }
}

impl From<i8> for CommandKey {
    fn from(value: i8) -> Self {
        CommandKey::Address(value)
    }
}

impl From<&CommandKey> for CommandKey {
    fn from(value: &CommandKey) -> Self {
        value.clone()
    }
}

/// What to do when two rows share a name or an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// The later row replaces the earlier one under the shared key.
    #[default]
    LastWins,
    /// Loading fails with `TableError::DuplicateKey`.
    Reject,
}

/// A key that a later row took over from an earlier one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedKey {
    pub key: CommandKey,
    /// 1-based line of the row that replaced the earlier entry.
    pub line: usize,
}

/// Command descriptors indexed by name and by register address.
///
/// The table is built once from text and is read-only afterwards.
///
/// # Examples
/// ```
/// use pmbus_core::CommandTable;
///
/// let text = "name,address,r,w,bytes,linear,exp,mant,expbits,signed\n\
///             VOUT_COMMAND,0x21,T,T,2,T,-3,11,5,F\n";
/// let table = CommandTable::parse(text, "inline").unwrap();
/// let by_name = table.get("VOUT_COMMAND").unwrap();
/// let by_address = table.get(0x21i8).unwrap();
/// assert!(std::ptr::eq(by_name, by_address));
/// ```
#[derive(Debug, Clone)]
pub struct CommandTable {
    origin: String,
    descriptors: Vec<CommandDescriptor>,
    by_name: HashMap<String, usize>,
    by_address: HashMap<i8, usize>,
    shadowed: Vec<ShadowedKey>,
}

impl CommandTable {
    /// Parse table text, letting later rows replace earlier duplicates.
    ///
    /// `origin` names the source in error messages (usually a file path).
    pub fn parse(text: &str, origin: &str) -> Result<Self, TableError> {
        Self::parse_with(text, origin, DuplicatePolicy::LastWins)
    }

    pub fn parse_with(
        text: &str,
        origin: &str,
        policy: DuplicatePolicy,
    ) -> Result<Self, TableError> {
        let mut table = CommandTable {
            origin: origin.to_string(),
            descriptors: Vec::new(),
            by_name: HashMap::new(),
            by_address: HashMap::new(),
            shadowed: Vec::new(),
        };

        for (index, line) in text.lines().enumerate().skip(layout::HEADER_LINES) {
            let line_no = index + 1;
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(layout::FIELD_SEPARATOR).collect();
            let descriptor = parse_descriptor(&fields).map_err(|source| TableError::Row {
                origin: table.origin.clone(),
                line: line_no,
                source,
            })?;
            table.insert(descriptor, line_no, policy)?;
        }

        debug!(
            origin = %table.origin,
            commands = table.len(),
            "command table loaded"
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(
        mut reader: R,
        origin: &str,
        policy: DuplicatePolicy,
    ) -> Result<Self, TableError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|source| TableError::Io {
                origin: origin.to_string(),
                source,
            })?;
        Self::parse_with(&text, origin, policy)
    }

    pub fn open(path: &Path) -> Result<Self, TableError> {
        Self::open_with(path, DuplicatePolicy::LastWins)
    }

    pub fn open_with(path: &Path, policy: DuplicatePolicy) -> Result<Self, TableError> {
        let origin = path.display().to_string();
        let file = File::open(path).map_err(|source| TableError::Io {
            origin: origin.clone(),
            source,
        })?;
        Self::from_reader(BufReader::new(file), &origin, policy)
    }

    /// Look up a command by name or address.
    pub fn get<K: Into<CommandKey>>(&self, key: K) -> Result<&CommandDescriptor, TableError> {
        let key = key.into();
        let index = match &key {
            CommandKey::Name(name) => self.by_name.get(name),
            CommandKey::Address(address) => self.by_address.get(address),
        };
        index
            .map(|&index| &self.descriptors[index])
            .ok_or_else(|| TableError::CommandNotFound {
                key,
                origin: self.origin.clone(),
            })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Keys whose earlier entries were replaced while loading.
    pub fn shadowed_keys(&self) -> &[ShadowedKey] {
        &self.shadowed
    }

    /// Number of distinct descriptors reachable through at least one key.
    pub fn len(&self) -> usize {
        self.reachable().len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Reachable descriptors ordered by register address.
    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> + '_ {
        self.reachable()
            .into_iter()
            .map(move |index| &self.descriptors[index])
    }

    fn reachable(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .by_name
            .values()
            .chain(self.by_address.values())
            .copied()
            .collect();
        indices.sort_unstable_by_key(|&index| (self.descriptors[index].register(), index));
        indices.dedup();
        indices
    }

    fn insert(
        &mut self,
        descriptor: CommandDescriptor,
        line: usize,
        policy: DuplicatePolicy,
    ) -> Result<(), TableError> {
        let index = self.descriptors.len();
        let keys = [
            CommandKey::Name(descriptor.name().to_string()),
            CommandKey::Address(descriptor.address()),
        ];

        for key in keys {
            let previous = match &key {
                CommandKey::Name(name) => self.by_name.get(name).copied(),
                CommandKey::Address(address) => self.by_address.get(address).copied(),
            };
            if previous.is_some() {
                if policy == DuplicatePolicy::Reject {
                    return Err(TableError::DuplicateKey {
                        origin: self.origin.clone(),
                        line,
                        key,
                    });
                }
                warn!(
                    origin = %self.origin,
                    line,
                    key = %key,
                    "duplicate command key; later row replaces earlier entry"
                );
                self.shadowed.push(ShadowedKey {
                    key: key.clone(),
                    line,
                });
            }
        }

        self.by_name.insert(descriptor.name().to_string(), index);
        self.by_address.insert(descriptor.address(), index);
        self.descriptors.push(descriptor);
        Ok(())
    }
}
