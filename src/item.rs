//! Typed views over raw items returned by a read.
//!
//! An item keeps the raw attribute map it was decoded from; every capability
//! accessor is a lookup into that map. Required identity attributes are
//! checked once in [`FromItem::from_item`], so the accessors never fail.

use crate::attributes::{AttributeKey, AttributeMap, AttributeValue};
use crate::capability::{
    AccountBased, CertificateStorable, Commentable, CreatorDesignatable, Describable,
    GenericPasswordStorable, InternetPasswordStorable, InvisibleAssignable, KeyStorable,
    Labellable, NegativeAssignable, SecureStorable, TypeDesignatable,
    generic_password_attributes, internet_password_attributes,
};
use crate::codec::Payload;
use crate::error::{Error, Result};
use crate::options::{Accessibility, AuthenticationType, InternetProtocol};
use crate::request::{Deleteable, Readable, Storable};

/// Decoding of a raw item handed back by the storage primitive.
pub trait FromItem: Sized {
    fn from_item(raw: AttributeMap, data: Option<Payload>) -> Result<Self>;
}

fn text(raw: &AttributeMap, key: AttributeKey) -> Option<&str> {
    raw.get(&key).and_then(AttributeValue::as_str)
}

fn code(raw: &AttributeMap, key: AttributeKey) -> Option<u32> {
    raw.get(&key)
        .and_then(AttributeValue::as_integer)
        .and_then(|i| u32::try_from(i).ok())
}

fn flag(raw: &AttributeMap, key: AttributeKey) -> Option<bool> {
    raw.get(&key).and_then(AttributeValue::as_bool)
}

fn require(present: bool, key: AttributeKey) -> Result<()> {
    if present {
        Ok(())
    } else {
        tracing::warn!(attribute = %key, "stored item lacks a required attribute");
        Err(Error::DecodeFailure)
    }
}

macro_rules! raw_capabilities {
    ($item:ty) => {
        impl $item {
            /// The attribute map exactly as the store returned it.
            pub fn raw(&self) -> &AttributeMap {
                &self.raw
            }

            /// The decoded payload; `None` when absent or undecodable.
            pub fn data(&self) -> Option<&Payload> {
                self.data.as_ref()
            }

            pub fn into_data(self) -> Option<Payload> {
                self.data
            }
        }

        impl SecureStorable for $item {
            fn accessible(&self) -> Option<Accessibility> {
                text(&self.raw, AttributeKey::Accessible).and_then(|raw| raw.parse().ok())
            }

            fn access_group(&self) -> Option<&str> {
                text(&self.raw, AttributeKey::AccessGroup)
            }
        }

        impl Labellable for $item {
            fn label(&self) -> Option<&str> {
                text(&self.raw, AttributeKey::Label)
            }
        }
    };
}

macro_rules! password_capabilities {
    ($item:ty) => {
        raw_capabilities!($item);

        impl AccountBased for $item {
            fn account(&self) -> &str {
                text(&self.raw, AttributeKey::Account).unwrap_or_default()
            }
        }

        impl Describable for $item {
            fn description(&self) -> Option<&str> {
                text(&self.raw, AttributeKey::Description)
            }
        }

        impl Commentable for $item {
            fn comment(&self) -> Option<&str> {
                text(&self.raw, AttributeKey::Comment)
            }
        }

        impl CreatorDesignatable for $item {
            fn creator(&self) -> Option<u32> {
                code(&self.raw, AttributeKey::Creator)
            }
        }

        impl TypeDesignatable for $item {
            fn item_type(&self) -> Option<u32> {
                code(&self.raw, AttributeKey::Type)
            }
        }

        impl InvisibleAssignable for $item {
            fn is_invisible(&self) -> Option<bool> {
                flag(&self.raw, AttributeKey::IsInvisible)
            }
        }

        impl NegativeAssignable for $item {
            fn is_negative(&self) -> Option<bool> {
                flag(&self.raw, AttributeKey::IsNegative)
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericPasswordItem {
    raw: AttributeMap,
    data: Option<Payload>,
}

password_capabilities!(GenericPasswordItem);

impl GenericPasswordStorable for GenericPasswordItem {
    fn service(&self) -> &str {
        text(&self.raw, AttributeKey::Service).unwrap_or_default()
    }

    fn generic(&self) -> Option<&[u8]> {
        self.raw
            .get(&AttributeKey::Generic)
            .and_then(AttributeValue::as_data)
    }
}

impl FromItem for GenericPasswordItem {
    fn from_item(raw: AttributeMap, data: Option<Payload>) -> Result<Self> {
        require(text(&raw, AttributeKey::Account).is_some(), AttributeKey::Account)?;
        require(text(&raw, AttributeKey::Service).is_some(), AttributeKey::Service)?;
        Ok(Self { raw, data })
    }
}

impl Storable for GenericPasswordItem {
    type Item = Self;

    fn base_attributes(&self) -> AttributeMap {
        generic_password_attributes(self)
    }
}

impl Readable for GenericPasswordItem {}
impl Deleteable for GenericPasswordItem {}

#[derive(Debug, Clone, PartialEq)]
pub struct InternetPasswordItem {
    raw: AttributeMap,
    data: Option<Payload>,
}

password_capabilities!(InternetPasswordItem);

impl InternetPasswordStorable for InternetPasswordItem {
    fn server(&self) -> &str {
        text(&self.raw, AttributeKey::Server).unwrap_or_default()
    }

    fn port(&self) -> u16 {
        self.raw
            .get(&AttributeKey::Port)
            .and_then(AttributeValue::as_integer)
            .and_then(|port| u16::try_from(port).ok())
            .unwrap_or_default()
    }

    fn internet_protocol(&self) -> InternetProtocol {
        text(&self.raw, AttributeKey::Protocol)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    fn authentication_type(&self) -> AuthenticationType {
        text(&self.raw, AttributeKey::AuthenticationType)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }

    fn security_domain(&self) -> Option<&str> {
        text(&self.raw, AttributeKey::SecurityDomain)
    }

    fn path(&self) -> Option<&str> {
        text(&self.raw, AttributeKey::Path)
    }
}

impl FromItem for InternetPasswordItem {
    fn from_item(raw: AttributeMap, data: Option<Payload>) -> Result<Self> {
        require(text(&raw, AttributeKey::Account).is_some(), AttributeKey::Account)?;
        require(text(&raw, AttributeKey::Server).is_some(), AttributeKey::Server)?;
        require(
            raw.get(&AttributeKey::Port)
                .and_then(AttributeValue::as_integer)
                .is_some_and(|port| u16::try_from(port).is_ok()),
            AttributeKey::Port,
        )?;
        require(
            text(&raw, AttributeKey::Protocol)
                .is_some_and(|p| p.parse::<InternetProtocol>().is_ok()),
            AttributeKey::Protocol,
        )?;
        require(
            text(&raw, AttributeKey::AuthenticationType)
                .is_some_and(|a| a.parse::<AuthenticationType>().is_ok()),
            AttributeKey::AuthenticationType,
        )?;
        Ok(Self { raw, data })
    }
}

impl Storable for InternetPasswordItem {
    type Item = Self;

    fn base_attributes(&self) -> AttributeMap {
        internet_password_attributes(self)
    }
}

impl Readable for InternetPasswordItem {}
impl Deleteable for InternetPasswordItem {}

/// Result of reading a certificate, key or identity; only the base
/// attributes are interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    raw: AttributeMap,
    data: Option<Payload>,
}

raw_capabilities!(RawItem);

impl CertificateStorable for RawItem {}
impl KeyStorable for RawItem {}

impl FromItem for RawItem {
    fn from_item(raw: AttributeMap, data: Option<Payload>) -> Result<Self> {
        Ok(Self { raw, data })
    }
}
