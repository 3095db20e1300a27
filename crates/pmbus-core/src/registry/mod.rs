//! Device types and the address-keyed device bus.
//!
//! A device type is a tag (`q48sc12050`, `other`, ...) that knows how to
//! obtain its command table. Types are registered explicitly in a
//! [`DeviceRegistry`]; nothing is discovered at runtime. Built-in types carry
//! an embedded table, the generic `other` type loads one from a path.

pub mod bus;
pub mod error;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::command::{CommandTable, DuplicatePolicy};

pub use bus::{Bus, check_device_address};
pub use error::RegistryError;

/// Highest 7-bit device address.
pub const MAX_DEVICE_ADDRESS: u8 = 0x7F;
/// Tag of the generic device type whose table comes from a file.
pub const GENERIC_DEVICE_TYPE: &str = "other";
/// Tag of the Q48SC12050 bus converter.
pub const Q48SC12050_DEVICE_TYPE: &str = "q48sc12050";

/// Built-in Q48SC12050 table.
///
/// Command codes are the standard PMBus assignments. The read/write flags,
/// byte counts and linear parameters are a working set chosen for this tool
/// and have not been checked against the device datasheet; load a table with
/// the `other` type when exact values matter.
const Q48SC12050_TABLE: &str = include_str!("../../tables/q48sc12050.csv");

/// Produces the command table of one device type.
///
/// Receives the type tag, the table path from the configuration (if any)
/// and the duplicate-key policy to load with.
pub type TableLoader =
    fn(&str, Option<&Path>, DuplicatePolicy) -> Result<CommandTable, RegistryError>;

#[derive(Debug, Clone)]
struct DeviceType {
    description: &'static str,
    loader: TableLoader,
}

/// Known device types, by tag.
///
/// # Examples
/// ```
/// use pmbus_core::DeviceRegistry;
///
/// let registry = DeviceRegistry::with_builtin();
/// let table = registry.load_table("q48sc12050", None).unwrap();
/// assert!(table.get("READ_VOUT").is_ok());
/// assert!(registry.load_table("q99", None).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    types: BTreeMap<String, DeviceType>,
    policy: DuplicatePolicy,
}

impl DeviceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            Q48SC12050_DEVICE_TYPE,
            "Q48SC12050 quarter-brick bus converter",
            load_q48sc12050,
        );
        registry.register(
            GENERIC_DEVICE_TYPE,
            "any PMBus device, command table from a file",
            load_from_path,
        );
        registry
    }

    /// Add or replace a device type.
    pub fn register(&mut self, tag: &str, description: &'static str, loader: TableLoader) {
        self.types.insert(
            tag.to_string(),
            DeviceType {
                description,
                loader,
            },
        );
    }

    /// Duplicate-key policy used by every table this registry loads.
    pub fn set_duplicate_policy(&mut self, policy: DuplicatePolicy) {
        self.policy = policy;
    }

    /// Registered tags with their descriptions, in tag order.
    pub fn types(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.types
            .iter()
            .map(|(tag, device_type)| (tag.as_str(), device_type.description))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    /// Load the command table for a device type.
    ///
    /// # Errors
    /// `UnknownType` for unregistered tags; otherwise whatever the type's
    /// loader reports (missing or unexpected path, table errors).
    pub fn load_table(
        &self,
        tag: &str,
        table_path: Option<&Path>,
    ) -> Result<CommandTable, RegistryError> {
        let device_type = self
            .types
            .get(tag)
            .ok_or_else(|| RegistryError::UnknownType {
                device_type: tag.to_string(),
                known: self.types.keys().cloned().collect::<Vec<_>>().join(", "),
            })?;
        debug!(device_type = tag, path = ?table_path, "loading command table");
        (device_type.loader)(tag, table_path, self.policy)
    }
}

fn load_q48sc12050(
    tag: &str,
    table_path: Option<&Path>,
    policy: DuplicatePolicy,
) -> Result<CommandTable, RegistryError> {
    if table_path.is_some() {
        return Err(RegistryError::UnexpectedTable {
            device_type: tag.to_string(),
        });
    }
    let origin = format!("built-in {tag} table");
    Ok(CommandTable::parse_with(Q48SC12050_TABLE, &origin, policy)?)
}

fn load_from_path(
    tag: &str,
    table_path: Option<&Path>,
    policy: DuplicatePolicy,
) -> Result<CommandTable, RegistryError> {
    let path = table_path.ok_or_else(|| RegistryError::MissingTable {
        device_type: tag.to_string(),
    })?;
    Ok(CommandTable::open_with(path, policy)?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{DeviceRegistry, RegistryError};
    use crate::command::{DataFormat, DuplicatePolicy, LinearFormat};

    #[test]
    fn builtin_table_is_complete() {
        let registry = DeviceRegistry::with_builtin();
        let table = registry.load_table("q48sc12050", None).unwrap();
        assert!(table.shadowed_keys().is_empty());
        assert_eq!(table.len(), 35);

        let vout = table.get("VOUT_COMMAND").unwrap();
        assert_eq!(vout.register(), 0x21);
        assert_eq!(
            vout.format(),
            DataFormat::Linear(LinearFormat {
                exponent: -9,
                mantissa_bits: 16,
                exponent_bits: 0,
                signed: false,
            })
        );
        let clear = table.get(0x03i8).unwrap();
        assert_eq!(clear.name(), "CLEAR_FAULTS");
        assert_eq!(clear.num_data_bytes(), 0);
    }

    #[test]
    fn builtin_table_loads_in_strict_mode() {
        let mut registry = DeviceRegistry::with_builtin();
        registry.set_duplicate_policy(DuplicatePolicy::Reject);
        assert!(registry.load_table("q48sc12050", None).is_ok());
    }

    #[test]
    fn unknown_type_lists_known_tags() {
        let registry = DeviceRegistry::with_builtin();
        let err = registry.load_table("q99", None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "q99 is not a valid device type; choose from other, q48sc12050"
        );
    }

    #[test]
    fn generic_type_needs_a_path() {
        let registry = DeviceRegistry::with_builtin();
        let err = registry.load_table("other", None).unwrap_err();
        assert!(matches!(err, RegistryError::MissingTable { .. }));
    }

    #[test]
    fn builtin_type_refuses_a_path() {
        let registry = DeviceRegistry::with_builtin();
        let err = registry
            .load_table("q48sc12050", Some(std::path::Path::new("x.csv")))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnexpectedTable { .. }));
    }

    #[test]
    fn generic_type_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "header").unwrap();
        writeln!(file, "MFR_MODE,0xD0,T,T,1,F,0,0,0,F").unwrap();
        drop(file);

        let registry = DeviceRegistry::with_builtin();
        let table = registry.load_table("other", Some(&path)).unwrap();
        assert_eq!(table.get("MFR_MODE").unwrap().register(), 0xD0);
        assert_eq!(table.origin(), path.display().to_string());
    }

    #[test]
    fn types_are_listed_in_tag_order() {
        let registry = DeviceRegistry::with_builtin();
        let tags: Vec<&str> = registry.types().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec!["other", "q48sc12050"]);
        assert!(registry.contains("other"));
        assert!(DeviceRegistry::new().types().next().is_none());
    }
}
