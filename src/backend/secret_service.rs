//! Freedesktop Secret Service backend (GNOME Keyring, KWallet, ...).
//!
//! Every attribute except the payload is stored as a type-tagged lookup
//! attribute on the item; the payload is the item's secret. Items are
//! scoped with `xdg:schema` so that a class-wide delete only touches ours.

use secret_service::EncryptionType;
use secret_service::blocking::{Collection, Item, SecretService};
use std::collections::HashMap;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::ItemStore;
use super::table::same_identity;
use crate::attributes::{AttributeKey, AttributeMap, AttributeValue};
use crate::error::{BackendError, Status};

const SCHEMA_KEY: &str = "xdg:schema";
const SCHEMA: &str = "org.keysafe.Item";
const CONTENT_TYPE: &str = "application/octet-stream";

pub struct SecretServiceBackend {
    service: SecretService<'static>,
}

impl std::fmt::Debug for SecretServiceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretServiceBackend").finish_non_exhaustive()
    }
}

impl SecretServiceBackend {
    pub fn new() -> Result<Self, BackendError> {
        let service = SecretService::connect(EncryptionType::Dh)
            .map_err(|e| BackendError::Connect(format!("Secret Service connect failed: {e}")))?;
        Ok(Self { service })
    }

    fn collection(&self) -> Result<Collection<'_>, Status> {
        self.service.get_default_collection().map_err(status_of)
    }
}

/// Borrowed lookup pairs plus the schema attribute, as the D-Bus API wants
/// them.
fn scoped(lookup: &[(String, String)]) -> HashMap<&str, &str> {
    let mut attributes: HashMap<&str, &str> = lookup
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .collect();
    attributes.insert(SCHEMA_KEY, SCHEMA);
    attributes
}

fn status_of(error: secret_service::Error) -> Status {
    match error {
        secret_service::Error::Locked | secret_service::Error::Prompt => {
            Status::INTERACTION_NOT_ALLOWED
        }
        secret_service::Error::NoResult => Status::ITEM_NOT_FOUND,
        other => {
            warn!(error = %other, "Secret Service request failed");
            Status::NOT_AVAILABLE
        }
    }
}

/// `s:` text, `i:` integer, `b:0|1` flag, `d:` hex-encoded bytes.
pub fn encode_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::String(s) => format!("s:{s}"),
        AttributeValue::Integer(i) => format!("i:{i}"),
        AttributeValue::Bool(b) => format!("b:{}", u8::from(*b)),
        AttributeValue::Data(d) => format!("d:{}", hex::encode(d)),
    }
}

pub fn decode_value(raw: &str) -> Option<AttributeValue> {
    let (tag, body) = raw.split_once(':')?;
    match tag {
        "s" => Some(AttributeValue::String(body.to_string())),
        "i" => body.parse().ok().map(AttributeValue::Integer),
        "b" => match body {
            "0" => Some(AttributeValue::Bool(false)),
            "1" => Some(AttributeValue::Bool(true)),
            _ => None,
        },
        "d" => hex::decode(body).ok().map(AttributeValue::Data),
        _ => None,
    }
}

/// Matchable attributes of `map`, except the payload, as lookup pairs.
fn lookup_attributes(map: &AttributeMap) -> Vec<(String, String)> {
    map.iter()
        .filter(|(key, _)| key.is_matchable() && **key != AttributeKey::ValueData)
        .map(|(key, value)| (key.as_str().to_string(), encode_value(value)))
        .collect()
}

fn decode_attributes(stored: &HashMap<String, String>) -> AttributeMap {
    stored
        .iter()
        .filter(|(key, _)| key.as_str() != SCHEMA_KEY)
        .filter_map(|(key, raw)| {
            let decoded = key
                .parse::<AttributeKey>()
                .ok()
                .zip(decode_value(raw));
            if decoded.is_none() {
                debug!(attribute = %key, "skipping foreign attribute");
            }
            decoded
        })
        .collect()
}

fn label_for(map: &AttributeMap) -> String {
    if let Some(label) = map.get(&AttributeKey::Label).and_then(AttributeValue::as_str) {
        return label.to_string();
    }
    let text = |key: AttributeKey| {
        map.get(&key)
            .and_then(AttributeValue::as_str)
            .unwrap_or_default()
    };
    let place = [AttributeKey::Service, AttributeKey::Server]
        .into_iter()
        .map(text)
        .find(|s| !s.is_empty())
        .unwrap_or_default();
    format!("{}@{place}", text(AttributeKey::Account))
}

fn holds_identity(stored: &[AttributeMap], candidate: &AttributeMap) -> bool {
    stored.iter().any(|item| same_identity(item, candidate))
}

fn create(collection: &Collection<'_>, item: &AttributeMap) -> Status {
    let lookup = lookup_attributes(item);
    let secret = item
        .get(&AttributeKey::ValueData)
        .and_then(AttributeValue::as_data)
        .unwrap_or_default();
    match collection.create_item(&label_for(item), scoped(&lookup), secret, false, CONTENT_TYPE) {
        Ok(_) => Status::SUCCESS,
        Err(e) => status_of(e),
    }
}

/// Fetch the full attribute map of `item`, payload included when `with_data`.
fn fetch(item: &Item<'_>, with_data: bool) -> Result<AttributeMap, Status> {
    let mut map = decode_attributes(&item.get_attributes().map_err(status_of)?);
    if with_data {
        let secret = Zeroizing::new(item.get_secret().map_err(status_of)?);
        map.insert(AttributeKey::ValueData, AttributeValue::Data(secret.to_vec()));
    }
    Ok(map)
}

impl ItemStore for SecretServiceBackend {
    fn insert(&mut self, attributes: &AttributeMap) -> Status {
        let Some(class) = attributes.get(&AttributeKey::Class) else {
            return Status::PARAM;
        };
        let collection = match self.collection() {
            Ok(collection) => collection,
            Err(status) => return status,
        };
        let lookup = lookup_attributes(&crate::attributes::identity(attributes));
        let candidates = match collection.search_items(scoped(&lookup)).map_err(status_of) {
            Ok(items) => items,
            Err(status) => return status,
        };
        // The search cannot express "attribute absent", so it may return
        // items that differ in an optional primary key.
        let mut stored = Vec::with_capacity(candidates.len());
        for item in &candidates {
            match fetch(item, false) {
                Ok(map) => stored.push(map),
                Err(status) => return status,
            }
        }
        if holds_identity(&stored, attributes) {
            debug!(class = ?class, "item with same identity exists");
            return Status::DUPLICATE_ITEM;
        }
        create(&collection, attributes)
    }

    fn query(&self, query: &AttributeMap) -> (Status, Option<AttributeMap>) {
        let collection = match self.collection() {
            Ok(collection) => collection,
            Err(status) => return (status, None),
        };
        let lookup = lookup_attributes(query);
        let items = match collection.search_items(scoped(&lookup)).map_err(status_of) {
            Ok(items) => items,
            Err(status) => return (status, None),
        };
        let Some(item) = items.first() else {
            return (Status::ITEM_NOT_FOUND, None);
        };
        let wants = |flag: AttributeKey| query.get(&flag).and_then(AttributeValue::as_bool) == Some(true);
        match fetch(item, wants(AttributeKey::ReturnData)) {
            Ok(mut map) => {
                if !wants(AttributeKey::ReturnAttributes) {
                    map.retain(|key, _| *key == AttributeKey::ValueData);
                }
                (Status::SUCCESS, Some(map))
            }
            Err(status) => (status, None),
        }
    }

    fn delete(&mut self, query: &AttributeMap) -> Status {
        let collection = match self.collection() {
            Ok(collection) => collection,
            Err(status) => return status,
        };
        let lookup = lookup_attributes(query);
        let items = match collection.search_items(scoped(&lookup)).map_err(status_of) {
            Ok(items) => items,
            Err(status) => return status,
        };
        if items.is_empty() {
            return Status::ITEM_NOT_FOUND;
        }
        for item in items {
            if let Err(e) = item.delete() {
                return status_of(e);
            }
        }
        Status::SUCCESS
    }

    fn update(&mut self, query: &AttributeMap, attributes: &AttributeMap) -> Status {
        let collection = match self.collection() {
            Ok(collection) => collection,
            Err(status) => return status,
        };
        let lookup = lookup_attributes(query);
        let items = match collection.search_items(scoped(&lookup)).map_err(status_of) {
            Ok(items) => items,
            Err(status) => return status,
        };
        if items.is_empty() {
            return Status::ITEM_NOT_FOUND;
        }
        for item in items {
            let mut merged = match fetch(&item, true) {
                Ok(map) => map,
                Err(status) => return status,
            };
            for (key, value) in attributes.iter().filter(|(key, _)| !key.is_control()) {
                merged.insert(*key, value.clone());
            }
            if let Err(e) = item.delete() {
                return status_of(e);
            }
            let status = create(&collection, &merged);
            if !status.is_success() {
                return status;
            }
        }
        Status::SUCCESS
    }
}
