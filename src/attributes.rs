//! Attribute maps handed to the storage primitive, and the merge primitives
//! used to assemble them.
//!
//! A key present in an [`AttributeMap`] always carries a value: absent
//! metadata is expressed by leaving the key out. [`drop_absent`] is the only
//! way optional values enter a map, so the invariant survives every merge.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::options::{ItemClass, UnknownVariant};

/// Wire value of the match-limit attribute that asks for a single item.
pub const MATCH_LIMIT_ONE: &str = "m_LimitOne";

macro_rules! attribute_keys {
    ($( $variant:ident => $raw:literal, )+) => {
        /// Names of the attributes the engine reads or writes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum AttributeKey {
            $( #[serde(rename = $raw)] $variant, )+
        }

        impl AttributeKey {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $raw,)+
                }
            }
        }

        impl FromStr for AttributeKey {
            type Err = UnknownVariant;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw {
                    $($raw => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant { kind: "attribute key", raw: raw.to_string() }),
                }
            }
        }
    };
}

attribute_keys! {
    Class => "class",
    Account => "acct",
    Service => "svce",
    Generic => "gena",
    Server => "srvr",
    Port => "port",
    Protocol => "ptcl",
    AuthenticationType => "atyp",
    SecurityDomain => "sdmn",
    Path => "path",
    Description => "desc",
    Comment => "icmt",
    Creator => "crtr",
    Label => "labl",
    Type => "type",
    IsInvisible => "invi",
    IsNegative => "nega",
    Accessible => "pdmn",
    AccessGroup => "agrp",
    ValueData => "v_Data",
    ReturnData => "r_Data",
    ReturnAttributes => "r_Attributes",
    MatchLimit => "m_Limit",
}

impl AttributeKey {
    /// Keys that steer a request rather than describe an item.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            Self::ReturnData | Self::ReturnAttributes | Self::MatchLimit
        )
    }

    /// Whether the key takes part in matching stored items against a query.
    pub fn is_matchable(self) -> bool {
        !self.is_control() && self != Self::ValueData
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Bool(bool),
    Data(Vec<u8>),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(d) => Some(d),
            _ => None,
        }
    }
}

impl Zeroize for AttributeValue {
    fn zeroize(&mut self) {
        match self {
            Self::String(s) => s.zeroize(),
            Self::Data(d) => d.zeroize(),
            Self::Integer(i) => i.zeroize(),
            Self::Bool(b) => b.zeroize(),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u16> for AttributeValue {
    fn from(value: u16) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(value: &[u8]) -> Self {
        Self::Data(value.to_vec())
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Data(value)
    }
}

pub type AttributeMap = BTreeMap<AttributeKey, AttributeValue>;

/// Overlay `overlay` onto `base`; keys from `overlay` win.
pub fn merge(mut base: AttributeMap, overlay: AttributeMap) -> AttributeMap {
    base.extend(overlay);
    base
}

/// Left fold of [`merge`] over `maps`, later maps winning on conflict.
pub fn merge_all(maps: impl IntoIterator<Item = AttributeMap>) -> AttributeMap {
    maps.into_iter().fold(AttributeMap::new(), merge)
}

/// Keep only the pairs whose value is present.
pub fn drop_absent(
    pairs: impl IntoIterator<Item = (AttributeKey, Option<AttributeValue>)>,
) -> AttributeMap {
    pairs
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
        .collect()
}

/// The item class named by the map's class attribute, if any.
pub fn class_of(attributes: &AttributeMap) -> Option<ItemClass> {
    attributes
        .get(&AttributeKey::Class)
        .and_then(AttributeValue::as_str)
        .and_then(|raw| raw.parse().ok())
}

/// Attributes that together identify a single stored item of `class`.
pub fn primary_keys(class: ItemClass) -> &'static [AttributeKey] {
    use AttributeKey::*;
    match class {
        ItemClass::GenericPassword => &[Account, Service, AccessGroup],
        ItemClass::InternetPassword => &[
            Account,
            Server,
            Port,
            Protocol,
            AuthenticationType,
            SecurityDomain,
            Path,
            AccessGroup,
        ],
        ItemClass::Certificate | ItemClass::Key | ItemClass::Identity => &[Label, AccessGroup],
    }
}

/// Attributes that must be present before a request of `class` is dispatched.
pub fn required_keys(class: ItemClass) -> &'static [AttributeKey] {
    use AttributeKey::*;
    match class {
        ItemClass::GenericPassword => &[Account, Service],
        ItemClass::InternetPassword => &[Account, Server, Port, Protocol, AuthenticationType],
        ItemClass::Certificate | ItemClass::Key | ItemClass::Identity => &[],
    }
}

/// Narrow `attributes` down to its class and primary-key attributes.
pub fn identity(attributes: &AttributeMap) -> AttributeMap {
    let Some(class) = class_of(attributes) else {
        return AttributeMap::new();
    };
    std::iter::once(AttributeKey::Class)
        .chain(primary_keys(class).iter().copied())
        .filter_map(|key| attributes.get(&key).map(|value| (key, value.clone())))
        .collect()
}

/// Reject a request whose class or required identity attributes are missing.
pub fn validate(attributes: &AttributeMap) -> Result<()> {
    let class = class_of(attributes).ok_or(Error::RequestMisconfigured("missing item class"))?;
    for key in required_keys(class) {
        match attributes.get(key) {
            None => return Err(Error::RequestMisconfigured("missing identity attribute")),
            Some(AttributeValue::String(s)) if s.is_empty() => {
                return Err(Error::RequestMisconfigured("empty identity attribute"));
            }
            Some(_) => {}
        }
    }
    Ok(())
}
