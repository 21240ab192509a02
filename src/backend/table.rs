//! In-process item semantics shared by the memory and age backends.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::attributes::{AttributeKey, AttributeMap, AttributeValue, class_of, primary_keys};
use crate::error::Status;

/// A flat list of stored items, each a complete attribute map including its
/// payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemTable {
    items: Vec<AttributeMap>,
}

/// Every matchable attribute of `query` is present in `item` with an equal
/// value.
pub fn matches(item: &AttributeMap, query: &AttributeMap) -> bool {
    query
        .iter()
        .filter(|(key, _)| key.is_matchable())
        .all(|(key, value)| item.get(key) == Some(value))
}

/// Both maps name the same class and agree on every primary key, absent keys
/// included.
pub fn same_identity(a: &AttributeMap, b: &AttributeMap) -> bool {
    let Some(class) = class_of(a) else {
        return false;
    };
    class_of(b) == Some(class)
        && primary_keys(class)
            .iter()
            .all(|key| a.get(key) == b.get(key))
}

fn wants(query: &AttributeMap, flag: AttributeKey) -> bool {
    query.get(&flag).and_then(AttributeValue::as_bool) == Some(true)
}

impl ItemTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[AttributeMap] {
        &self.items
    }

    pub fn insert(&mut self, attributes: &AttributeMap) -> Status {
        if class_of(attributes).is_none() {
            return Status::PARAM;
        }
        if self.items.iter().any(|item| same_identity(item, attributes)) {
            return Status::DUPLICATE_ITEM;
        }
        let item = attributes
            .iter()
            .filter(|(key, _)| !key.is_control())
            .map(|(key, value)| (*key, value.clone()))
            .collect();
        self.items.push(item);
        Status::SUCCESS
    }

    pub fn query(&self, query: &AttributeMap) -> (Status, Option<AttributeMap>) {
        let Some(item) = self.items.iter().find(|item| matches(item, query)) else {
            return (Status::ITEM_NOT_FOUND, None);
        };
        let mut result = if wants(query, AttributeKey::ReturnAttributes) {
            item.clone()
        } else {
            item.iter()
                .filter(|(key, _)| **key == AttributeKey::ValueData)
                .map(|(key, value)| (*key, value.clone()))
                .collect()
        };
        if !wants(query, AttributeKey::ReturnData) {
            result.remove(&AttributeKey::ValueData);
        }
        (Status::SUCCESS, Some(result))
    }

    pub fn delete(&mut self, query: &AttributeMap) -> Status {
        let before = self.items.len();
        self.items.retain_mut(|item| {
            if matches(item, query) {
                item.values_mut().for_each(Zeroize::zeroize);
                false
            } else {
                true
            }
        });
        if self.items.len() == before {
            Status::ITEM_NOT_FOUND
        } else {
            Status::SUCCESS
        }
    }

    /// Attributes not named in `attributes` keep their stored values.
    pub fn update(&mut self, query: &AttributeMap, attributes: &AttributeMap) -> Status {
        let mut updated = false;
        for item in self.items.iter_mut().filter(|item| matches(item, query)) {
            for (key, value) in attributes.iter().filter(|(key, _)| !key.is_control()) {
                item.insert(*key, value.clone());
            }
            updated = true;
        }
        if updated {
            Status::SUCCESS
        } else {
            Status::ITEM_NOT_FOUND
        }
    }
}

impl Drop for ItemTable {
    fn drop(&mut self) {
        for item in &mut self.items {
            item.values_mut().for_each(Zeroize::zeroize);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(account: &str, comment: Option<&str>) -> AttributeMap {
        let mut map = AttributeMap::from([
            (AttributeKey::Class, AttributeValue::from("genp")),
            (AttributeKey::Account, AttributeValue::from(account)),
            (AttributeKey::Service, AttributeValue::from("svc")),
            (AttributeKey::ValueData, AttributeValue::Data(b"{}".to_vec())),
        ]);
        if let Some(comment) = comment {
            map.insert(AttributeKey::Comment, AttributeValue::from(comment));
        }
        map
    }

    #[test]
    fn duplicate_is_judged_on_primary_keys() {
        let mut table = ItemTable::new();
        assert_eq!(table.insert(&item("a", None)), Status::SUCCESS);
        assert_eq!(table.insert(&item("a", Some("other"))), Status::DUPLICATE_ITEM);
        assert_eq!(table.insert(&item("b", None)), Status::SUCCESS);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn access_group_is_part_of_identity() {
        let mut table = ItemTable::new();
        let mut grouped = item("a", None);
        grouped.insert(AttributeKey::AccessGroup, AttributeValue::from("g"));
        assert_eq!(table.insert(&grouped), Status::SUCCESS);
        assert!(!same_identity(&grouped, &item("a", None)));
        assert_eq!(table.insert(&item("a", None)), Status::SUCCESS);
        assert_eq!(table.insert(&grouped), Status::DUPLICATE_ITEM);
    }

    #[test]
    fn insert_without_class_is_rejected() {
        let mut table = ItemTable::new();
        let mut attributes = item("a", None);
        attributes.remove(&AttributeKey::Class);
        assert_eq!(table.insert(&attributes), Status::PARAM);
        assert!(table.is_empty());
    }

    #[test]
    fn query_projection_follows_return_flags() {
        let mut table = ItemTable::new();
        table.insert(&item("a", Some("c")));

        let mut query = AttributeMap::from([(AttributeKey::Account, AttributeValue::from("a"))]);
        let (status, result) = table.query(&query);
        assert_eq!(status, Status::SUCCESS);
        assert_eq!(result, Some(AttributeMap::new()));

        query.insert(AttributeKey::ReturnData, AttributeValue::Bool(true));
        query.insert(AttributeKey::ReturnAttributes, AttributeValue::Bool(true));
        let (_, result) = table.query(&query);
        assert_eq!(result, Some(item("a", Some("c"))));

        query.insert(AttributeKey::Comment, AttributeValue::from("nope"));
        assert_eq!(table.query(&query), (Status::ITEM_NOT_FOUND, None));
    }

    #[test]
    fn delete_by_class_removes_everything_of_that_class() {
        let mut table = ItemTable::new();
        table.insert(&item("a", None));
        table.insert(&item("b", None));
        let query = AttributeMap::from([(AttributeKey::Class, AttributeValue::from("genp"))]);
        assert_eq!(table.delete(&query), Status::SUCCESS);
        assert!(table.is_empty());
        assert_eq!(table.delete(&query), Status::ITEM_NOT_FOUND);
    }

    #[test]
    fn update_keeps_unnamed_attributes() {
        let mut table = ItemTable::new();
        table.insert(&item("a", Some("keep me")));
        let query = AttributeMap::from([(AttributeKey::Account, AttributeValue::from("a"))]);
        let changes = AttributeMap::from([(
            AttributeKey::ValueData,
            AttributeValue::Data(b"new".to_vec()),
        )]);
        assert_eq!(table.update(&query, &changes), Status::SUCCESS);
        let stored = &table.items()[0];
        assert_eq!(stored[&AttributeKey::Comment], AttributeValue::from("keep me"));
        assert_eq!(stored[&AttributeKey::ValueData], AttributeValue::Data(b"new".to_vec()));

        let missing = AttributeMap::from([(AttributeKey::Account, AttributeValue::from("z"))]);
        assert_eq!(table.update(&missing, &changes), Status::ITEM_NOT_FOUND);
    }
}
