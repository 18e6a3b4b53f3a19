//! Catalog of the object identifiers a device understands.
//!
//! The protocol itself only moves opaque payloads between OIDs; everything
//! needed to interpret them lives here. The catalog content is data: a
//! typical build ingests a table of roughly 700 rows captured from the
//! vendor's app, supplied by the embedding application.

use std::collections::HashMap;

use thiserror::Error;

use crate::value::{DataType, Value};

/// Grouping tag for object identifiers.
///
/// Groups are not used by the protocol, they mirror the subsystem prefixes
/// of the dotted object names and exist to aid the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectGroup {
    Rb485,
    Energy,
    GridMon,
    Temperature,
    Battery,
    CsNeg,
    HwTest,
    GSync,
    Logger,
    Wifi,
    Adc,
    Net,
    AccConv,
    DcConv,
    Nsm,
    IoBoard,
    FlashRtc,
    PowerMng,
    BufVControl,
    Db,
    SwitchOnBoard,
    PRec,
    Modbus,
    BatMngStruct,
    IsoStruct,
    GridLt,
    CanBus,
    DisplayStruct,
    FlashParam,
    Fault,
    PrimSm,
    CsMap,
    LineMon,
    Others,
    BatteryPlaceholder,
}

/// Returned when a registry cannot be built from its entries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate object id {0:#010x}")]
    DuplicateId(u32),

    #[error("duplicate object name {0:?}")]
    DuplicateName(String),

    /// An enum request type must pair with an enum response type.
    #[error("object {0:#010x} maps an enum request to a non-enum response")]
    EnumResponseMismatch(u32),
}

/// Returned when a registry query comes up empty.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no object with id {0:#010x}")]
    UnknownId(u32),

    #[error("no object named {0:?}")]
    UnknownName(String),

    #[error("object {0:#010x} is not an enum")]
    NotAnEnum(u32),

    #[error("object {id:#010x} has no enum label for {value}")]
    UnknownEnumValue { id: u32, value: u8 },
}

/// Metadata for one object identifier.
///
/// `request_data_type` drives the encoding of payloads sent to the device,
/// `response_data_type` the decoding of its replies. They usually agree;
/// the notable exception is the logger group, where a query timestamp is
/// written and a whole table comes back.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectInfo {
    /// Unique 32-bit identifier used on the wire.
    pub object_id: u32,
    /// Ordinal of the entry in the vendor's catalog.
    pub index: u16,
    /// Unique dotted-path name, e.g. `battery.soc`.
    pub name: String,
    pub group: ObjectGroup,
    pub request_data_type: DataType,
    pub response_data_type: DataType,
    pub description: Option<String>,
    /// Unit symbol, e.g. `%` or `W`.
    pub unit: Option<String>,
    /// Labels for enum values, only meaningful for [`DataType::Enum`].
    pub enum_map: Option<Vec<(u8, String)>>,
    /// Default value served by a protocol simulator.
    pub sim_data: Option<Value>,
}

impl ObjectInfo {
    /// Creates an entry with equal request and response types and no
    /// optional metadata. The `with_*` methods fill in the rest.
    pub fn new(
        group: ObjectGroup,
        object_id: u32,
        index: u16,
        name: impl Into<String>,
        request_data_type: DataType,
    ) -> Self {
        Self {
            object_id,
            index,
            name: name.into(),
            group,
            request_data_type,
            response_data_type: request_data_type,
            description: None,
            unit: None,
            enum_map: None,
            sim_data: None,
        }
    }

    pub fn with_response_type(mut self, response_data_type: DataType) -> Self {
        self.response_data_type = response_data_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_enum_map(mut self, enum_map: Vec<(u8, String)>) -> Self {
        self.enum_map = Some(enum_map);
        self
    }

    pub fn with_sim_data(mut self, sim_data: Value) -> Self {
        self.sim_data = Some(sim_data);
        self
    }

    /// Looks up the textual label of an enum value.
    pub fn enum_label(&self, value: u8) -> Result<&str, LookupError> {
        if self.request_data_type != DataType::Enum {
            return Err(LookupError::NotAnEnum(self.object_id));
        }
        self.enum_map
            .as_ref()
            .and_then(|map| map.iter().find(|(v, _)| *v == value))
            .map(|(_, label)| label.as_str())
            .ok_or(LookupError::UnknownEnumValue {
                id: self.object_id,
                value,
            })
    }
}

/// Immutable index of [`ObjectInfo`] entries by id and by name.
///
/// Built once at startup and shared read-only for the process lifetime.
/// Lookups that miss return an error, never a placeholder entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    entries: Vec<ObjectInfo>,
    by_id: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
    name_max_len: usize,
}

impl Registry {
    /// Builds the registry, validating that ids and names are unique and
    /// that enum requests pair with enum responses.
    pub fn new(entries: Vec<ObjectInfo>) -> Result<Self, RegistryError> {
        let mut by_id = HashMap::with_capacity(entries.len());
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut name_max_len = 0;
        for (position, entry) in entries.iter().enumerate() {
            if entry.request_data_type == DataType::Enum
                && entry.response_data_type != DataType::Enum
            {
                return Err(RegistryError::EnumResponseMismatch(entry.object_id));
            }
            if by_id.insert(entry.object_id, position).is_some() {
                return Err(RegistryError::DuplicateId(entry.object_id));
            }
            if by_name.insert(entry.name.clone(), position).is_some() {
                return Err(RegistryError::DuplicateName(entry.name.clone()));
            }
            name_max_len = name_max_len.max(entry.name.len());
        }
        Ok(Self {
            entries,
            by_id,
            by_name,
            name_max_len,
        })
    }

    /// Looks an object up by its 32-bit identifier.
    pub fn by_id(&self, id: u32) -> Result<&ObjectInfo, LookupError> {
        self.by_id
            .get(&id)
            .map(|&position| &self.entries[position])
            .ok_or(LookupError::UnknownId(id))
    }

    /// Looks an object up by its dotted-path name.
    pub fn by_name(&self, name: &str) -> Result<&ObjectInfo, LookupError> {
        self.by_name
            .get(name)
            .map(|&position| &self.entries[position])
            .ok_or_else(|| LookupError::UnknownName(name.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ObjectInfo> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All names starting with `prefix`, sorted. An empty prefix returns
    /// every name; mainly useful for interactive completion.
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .iter()
            .map(|entry| entry.name.as_str())
            .filter(|name| name.starts_with(prefix))
            .collect();
        names.sort_unstable();
        names
    }

    /// Length of the longest name in the registry, for column alignment.
    pub fn name_max_len(&self) -> usize {
        self.name_max_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries() -> Vec<ObjectInfo> {
        vec![
            ObjectInfo::new(
                ObjectGroup::Battery,
                0x959930BF,
                545,
                "battery.soc",
                DataType::Float,
            )
            .with_description("SOC (State of charge)")
            .with_unit("%"),
            ObjectInfo::new(
                ObjectGroup::DisplayStruct,
                0x29BDA75F,
                147,
                "display_struct.brightness",
                DataType::Uint8,
            )
            .with_description("Display brightness, [0..255]"),
            ObjectInfo::new(
                ObjectGroup::Modbus,
                0x67AB9EA2,
                349,
                "modbus.radio_mode",
                DataType::Enum,
            )
            .with_enum_map(vec![(0, "Modbus slave".into()), (1, "Modbus master".into())]),
        ]
    }

    #[test]
    fn every_entry_is_reachable_by_both_keys() {
        let registry = Registry::new(entries()).unwrap();
        assert_eq!(registry.len(), 3);
        for entry in entries() {
            assert_eq!(registry.by_id(entry.object_id).unwrap().name, entry.name);
            assert_eq!(
                registry.by_name(&entry.name).unwrap().object_id,
                entry.object_id
            );
        }
    }

    #[test]
    fn misses_are_errors() {
        let registry = Registry::new(entries()).unwrap();
        assert_eq!(
            registry.by_id(0xDEADBEEF),
            Err(LookupError::UnknownId(0xDEADBEEF))
        );
        assert_eq!(
            registry.by_name("battery.bogus"),
            Err(LookupError::UnknownName("battery.bogus".into()))
        );
    }

    #[test]
    fn duplicate_ids_fail_the_build() {
        let mut dup = entries();
        dup.push(ObjectInfo::new(
            ObjectGroup::Battery,
            0x959930BF,
            546,
            "battery.soc_copy",
            DataType::Float,
        ));
        assert_eq!(
            Registry::new(dup),
            Err(RegistryError::DuplicateId(0x959930BF))
        );
    }

    #[test]
    fn duplicate_names_fail_the_build() {
        let mut dup = entries();
        dup.push(ObjectInfo::new(
            ObjectGroup::Battery,
            0x11111111,
            547,
            "battery.soc",
            DataType::Float,
        ));
        assert_eq!(
            Registry::new(dup),
            Err(RegistryError::DuplicateName("battery.soc".into()))
        );
    }

    #[test]
    fn enum_requests_need_enum_responses() {
        let bad = vec![ObjectInfo::new(
            ObjectGroup::Wifi,
            0x0BA16A10,
            40,
            "wifi.sockb_protocol",
            DataType::Enum,
        )
        .with_response_type(DataType::Uint8)];
        assert_eq!(
            Registry::new(bad),
            Err(RegistryError::EnumResponseMismatch(0x0BA16A10))
        );
    }

    #[test]
    fn enum_labels_resolve() {
        let registry = Registry::new(entries()).unwrap();
        let modbus = registry.by_name("modbus.radio_mode").unwrap();
        assert_eq!(modbus.enum_label(1), Ok("Modbus master"));
        assert_eq!(
            modbus.enum_label(9),
            Err(LookupError::UnknownEnumValue {
                id: 0x67AB9EA2,
                value: 9,
            })
        );
        let soc = registry.by_name("battery.soc").unwrap();
        assert_eq!(soc.enum_label(0), Err(LookupError::NotAnEnum(0x959930BF)));
    }

    #[test]
    fn prefix_completion_is_sorted() {
        let registry = Registry::new(entries()).unwrap();
        assert_eq!(registry.names_with_prefix("battery."), ["battery.soc"]);
        assert_eq!(
            registry.names_with_prefix(""),
            ["battery.soc", "display_struct.brightness", "modbus.radio_mode"]
        );
        assert!(registry.names_with_prefix("logger.").is_empty());
    }

    #[test]
    fn name_max_len_spans_all_entries() {
        let registry = Registry::new(entries()).unwrap();
        assert_eq!(registry.name_max_len(), "display_struct.brightness".len());
    }

    #[test]
    fn responses_decode_with_the_registered_type() {
        use crate::value::{decode_value, Value};

        let registry = Registry::new(entries()).unwrap();
        let info = registry.by_id(0x959930BF).unwrap();
        assert_eq!(info.response_data_type, DataType::Float);
        assert_eq!(
            decode_value(info.response_data_type, &[0x3E, 0x97, 0xB1, 0x91]),
            Ok(Value::Float(f32::from_bits(0x3E97B191)))
        );
    }
}
