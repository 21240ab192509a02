//! Request dispatch against a backend, and the account/service facade.

use tracing::{debug, warn};

use crate::attributes::{
    AttributeKey, AttributeMap, AttributeValue, class_of, identity, validate,
};
use crate::backend::ItemStore;
use crate::codec::{JsonCodec, Payload, PayloadCodec};
use crate::config::{Config, UpdateStrategy};
use crate::error::{Error, Result, check};
use crate::item::FromItem;
use crate::options::ItemClass;
use crate::record::GenericPassword;
use crate::request::{Createable, Deleteable, Readable};

/// Owns a backend, a payload codec and the configuration every request is
/// built against. Holds no other state.
#[derive(Debug)]
pub struct SecureStore<B, C = JsonCodec> {
    backend: B,
    codec: C,
    config: Config,
}

impl<B: ItemStore> SecureStore<B> {
    pub fn new(backend: B, config: Config) -> Self {
        Self::with_codec(backend, JsonCodec, config)
    }
}

impl<B: ItemStore, C: PayloadCodec> SecureStore<B, C> {
    pub fn with_codec(backend: B, codec: C, config: Config) -> Self {
        Self {
            backend,
            codec,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Add a new item. Fails with [`Error::DuplicateItem`] when an item with
    /// the same identity exists.
    pub fn create<R: Createable + ?Sized>(&mut self, record: &R) -> Result<()> {
        let attributes = record.create_attributes(&self.codec)?;
        self.insert(&attributes)
    }

    /// Read the item a record identifies. A missing item is `Ok(None)`.
    pub fn read<R: Readable + ?Sized>(&self, record: &R) -> Result<Option<R::Item>> {
        let query = record.read_attributes();
        validate(&query)?;
        debug!(
            class = ?class_of(&query),
            account = ?query.get(&AttributeKey::Account),
            "querying item"
        );
        let (status, raw) = self.backend.query(&query);
        match Error::from_status(status) {
            Some(Error::ItemNotFound) => return Ok(None),
            Some(error) => return Err(error),
            None => {}
        }
        let Some(raw) = raw else {
            return Ok(None);
        };
        let data = raw
            .get(&AttributeKey::ValueData)
            .and_then(AttributeValue::as_data)
            .and_then(|blob| self.codec.decode(blob));
        R::Item::from_item(raw, data).map(Some)
    }

    /// Remove the item a record identifies. Unlike a read, a missing item is
    /// reported as [`Error::ItemNotFound`].
    pub fn delete<R: Deleteable + ?Sized>(&mut self, record: &R) -> Result<()> {
        let query = record.delete_attributes();
        validate(&query)?;
        debug!(class = ?class_of(&query), "deleting item");
        check(self.backend.delete(&query))
    }

    /// Store the record's payload whether or not the item already exists,
    /// following the configured [`UpdateStrategy`].
    pub fn update<R: Createable + ?Sized>(&mut self, record: &R) -> Result<()> {
        let attributes = record.create_attributes(&self.codec)?;
        validate(&attributes)?;
        let query = identity(&attributes);
        match self.config.update_strategy {
            UpdateStrategy::Replace => {
                if let Some(error) = Error::from_status(self.backend.delete(&query)) {
                    debug!(%error, "ignoring delete failure before re-create");
                }
                self.insert(&attributes)
            }
            UpdateStrategy::InPlace => {
                let mut changes = attributes.clone();
                changes.remove(&AttributeKey::Class);
                match Error::from_status(self.backend.update(&query, &changes)) {
                    None => Ok(()),
                    Some(Error::ItemNotFound | Error::StoreNotAvailable) => {
                        debug!("nothing to update, creating instead");
                        self.insert(&attributes)
                    }
                    Some(error) => Err(error),
                }
            }
        }
    }

    /// Delete every item of every class. A class with nothing in it is not a
    /// failure; any other failure is reported once all classes were tried.
    pub fn clear(&mut self) -> Result<()> {
        let mut failed = false;
        for class in ItemClass::ALL {
            let query =
                AttributeMap::from([(AttributeKey::Class, AttributeValue::from(class.as_str()))]);
            match Error::from_status(self.backend.delete(&query)) {
                None | Some(Error::ItemNotFound) => {}
                Some(error) => {
                    warn!(class = %class, %error, "failed to clear item class");
                    failed = true;
                }
            }
        }
        if failed { Err(Error::UnableToClear) } else { Ok(()) }
    }

    fn insert(&mut self, attributes: &AttributeMap) -> Result<()> {
        validate(attributes)?;
        debug!(
            class = ?class_of(attributes),
            account = ?attributes.get(&AttributeKey::Account),
            "inserting item"
        );
        check(self.backend.insert(attributes))
    }

    fn facade_record(&self, account: &str, service: Option<&str>) -> GenericPassword {
        GenericPassword::new(account, service.unwrap_or(&self.config.default_service))
    }

    /// Save `data` for `account`; `service` defaults to the configured
    /// default service.
    pub fn save_data(&mut self, data: Payload, account: &str, service: Option<&str>) -> Result<()> {
        let record = self.facade_record(account, service).with_data(data);
        self.create(&record)
    }

    /// Load the payload stored for `account`.
    ///
    /// Every failure, not only a missing item, comes back as `None`. Use
    /// [`SecureStore::try_load_data`] to tell the two apart.
    pub fn load_data(&self, account: &str, service: Option<&str>) -> Option<Payload> {
        match self.try_load_data(account, service) {
            Ok(data) => data,
            Err(error) => {
                warn!(account, %error, "load failed, reporting no data");
                None
            }
        }
    }

    pub fn try_load_data(&self, account: &str, service: Option<&str>) -> Result<Option<Payload>> {
        let record = self.facade_record(account, service);
        Ok(self.read(&record)?.and_then(|item| item.into_data()))
    }

    pub fn update_data(&mut self, data: Payload, account: &str, service: Option<&str>) -> Result<()> {
        let record = self.facade_record(account, service).with_data(data);
        self.update(&record)
    }

    pub fn delete_data(&mut self, account: &str, service: Option<&str>) -> Result<()> {
        let record = self.facade_record(account, service);
        self.delete(&record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::error::Status;
    use crate::record::WithMetadata;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Records every request and answers with scripted statuses.
    #[derive(Default)]
    struct Spy {
        inserted: Vec<AttributeMap>,
        queried: std::cell::RefCell<Vec<AttributeMap>>,
        deleted: Vec<AttributeMap>,
        updated: Vec<(AttributeMap, AttributeMap)>,
        insert_status: Option<Status>,
        query_reply: Option<(Status, Option<AttributeMap>)>,
        delete_status: Option<Status>,
        update_status: Option<Status>,
    }

    impl ItemStore for Spy {
        fn insert(&mut self, attributes: &AttributeMap) -> Status {
            self.inserted.push(attributes.clone());
            self.insert_status.unwrap_or(Status::SUCCESS)
        }

        fn query(&self, query: &AttributeMap) -> (Status, Option<AttributeMap>) {
            self.queried.borrow_mut().push(query.clone());
            self.query_reply
                .clone()
                .unwrap_or((Status::ITEM_NOT_FOUND, None))
        }

        fn delete(&mut self, query: &AttributeMap) -> Status {
            self.deleted.push(query.clone());
            self.delete_status.unwrap_or(Status::SUCCESS)
        }

        fn update(&mut self, query: &AttributeMap, attributes: &AttributeMap) -> Status {
            self.updated.push((query.clone(), attributes.clone()));
            self.update_status.unwrap_or(Status::SUCCESS)
        }
    }

    fn payload(value: serde_json::Value) -> Payload {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Payload::new(),
        }
    }

    fn spy_store(spy: Spy, strategy: UpdateStrategy) -> SecureStore<Spy> {
        SecureStore::new(
            spy,
            Config::default()
                .with_default_service("default.svc")
                .with_update_strategy(strategy),
        )
    }

    #[test]
    fn create_hands_the_full_map_to_insert() {
        let mut store = spy_store(Spy::default(), UpdateStrategy::Replace);
        let record = GenericPassword::new("user1", "myService")
            .with_comment("c")
            .with_data(payload(json!({"key": "value"})));
        store.create(&record).unwrap();

        let sent = &store.backend().inserted[0];
        assert_eq!(sent[&AttributeKey::Class], AttributeValue::from("genp"));
        assert_eq!(sent[&AttributeKey::Account], AttributeValue::from("user1"));
        assert_eq!(sent[&AttributeKey::Service], AttributeValue::from("myService"));
        assert_eq!(sent[&AttributeKey::Comment], AttributeValue::from("c"));
        assert_eq!(
            sent[&AttributeKey::ValueData],
            AttributeValue::Data(br#"{"key":"value"}"#.to_vec())
        );
    }

    #[test]
    fn create_surfaces_translated_status() {
        let spy = Spy {
            insert_status: Some(Status::DUPLICATE_ITEM),
            ..Spy::default()
        };
        let mut store = spy_store(spy, UpdateStrategy::Replace);
        let record = GenericPassword::new("u", "s").with_data(Payload::new());
        assert_eq!(store.create(&record), Err(Error::DuplicateItem));
    }

    #[test]
    fn misconfigured_request_never_reaches_the_backend() {
        let mut store = spy_store(Spy::default(), UpdateStrategy::Replace);
        let record = GenericPassword::new("", "s").with_data(Payload::new());
        assert!(matches!(
            store.create(&record),
            Err(Error::RequestMisconfigured(_))
        ));
        assert!(store.backend().inserted.is_empty());
    }

    #[test]
    fn read_maps_not_found_to_none_and_other_errors_through() {
        let store = spy_store(Spy::default(), UpdateStrategy::Replace);
        let record = GenericPassword::new("u", "s");
        assert_eq!(store.read(&record), Ok(None));

        let queried = store.backend().queried.borrow();
        assert_eq!(queried[0][&AttributeKey::ReturnData], AttributeValue::Bool(true));
        drop(queried);

        let spy = Spy {
            query_reply: Some((Status::INTERACTION_NOT_ALLOWED, None)),
            ..Spy::default()
        };
        let store = spy_store(spy, UpdateStrategy::Replace);
        assert_eq!(store.read(&record), Err(Error::InteractionNotAllowed));
    }

    #[test]
    fn read_with_undecodable_payload_has_no_data() {
        let raw = AttributeMap::from([
            (AttributeKey::Account, AttributeValue::from("u")),
            (AttributeKey::Service, AttributeValue::from("s")),
            (AttributeKey::ValueData, AttributeValue::Data(b"\xff".to_vec())),
        ]);
        let spy = Spy {
            query_reply: Some((Status::SUCCESS, Some(raw))),
            ..Spy::default()
        };
        let store = spy_store(spy, UpdateStrategy::Replace);
        let item = store.read(&GenericPassword::new("u", "s")).unwrap().unwrap();
        assert!(item.data().is_none());
    }

    #[test]
    fn replace_update_ignores_delete_failure() {
        let spy = Spy {
            delete_status: Some(Status::ITEM_NOT_FOUND),
            ..Spy::default()
        };
        let mut store = spy_store(spy, UpdateStrategy::Replace);
        let record = GenericPassword::new("u", "s")
            .with_comment("new")
            .with_data(Payload::new());
        store.update(&record).unwrap();

        let backend = store.backend();
        assert_eq!(
            backend.deleted[0],
            AttributeMap::from([
                (AttributeKey::Class, AttributeValue::from("genp")),
                (AttributeKey::Account, AttributeValue::from("u")),
                (AttributeKey::Service, AttributeValue::from("s")),
            ])
        );
        assert_eq!(backend.inserted.len(), 1);
        assert!(backend.updated.is_empty());
    }

    #[test]
    fn in_place_update_strips_class_from_changes() {
        let mut store = spy_store(Spy::default(), UpdateStrategy::InPlace);
        let record = GenericPassword::new("u", "s").with_data(Payload::new());
        store.update(&record).unwrap();

        let (query, changes) = &store.backend().updated[0];
        assert_eq!(query[&AttributeKey::Class], AttributeValue::from("genp"));
        assert!(!changes.contains_key(&AttributeKey::Class));
        assert!(changes.contains_key(&AttributeKey::ValueData));
        assert!(store.backend().inserted.is_empty());
    }

    #[test]
    fn in_place_update_falls_back_to_create() {
        for status in [Status::ITEM_NOT_FOUND, Status::NOT_AVAILABLE] {
            let spy = Spy {
                update_status: Some(status),
                ..Spy::default()
            };
            let mut store = spy_store(spy, UpdateStrategy::InPlace);
            let record = GenericPassword::new("u", "s").with_data(Payload::new());
            store.update(&record).unwrap();
            assert_eq!(store.backend().inserted.len(), 1);
        }

        let spy = Spy {
            update_status: Some(Status::AUTH_FAILED),
            ..Spy::default()
        };
        let mut store = spy_store(spy, UpdateStrategy::InPlace);
        let record = GenericPassword::new("u", "s").with_data(Payload::new());
        assert_eq!(store.update(&record), Err(Error::AuthenticationFailed));
        assert!(store.backend().inserted.is_empty());
    }

    #[test]
    fn clear_tolerates_empty_classes() {
        let spy = Spy {
            delete_status: Some(Status::ITEM_NOT_FOUND),
            ..Spy::default()
        };
        let mut store = spy_store(spy, UpdateStrategy::Replace);
        assert_eq!(store.clear(), Ok(()));
        assert_eq!(store.backend().deleted.len(), ItemClass::ALL.len());

        let spy = Spy {
            delete_status: Some(Status::AUTH_FAILED),
            ..Spy::default()
        };
        let mut store = spy_store(spy, UpdateStrategy::Replace);
        assert_eq!(store.clear(), Err(Error::UnableToClear));
        assert_eq!(store.backend().deleted.len(), ItemClass::ALL.len());
    }

    #[test]
    fn facade_fills_in_the_default_service() {
        let mut store = spy_store(Spy::default(), UpdateStrategy::Replace);
        store.save_data(Payload::new(), "a", None).unwrap();
        assert_eq!(
            store.backend().inserted[0][&AttributeKey::Service],
            AttributeValue::from("default.svc")
        );
    }

    #[test]
    fn load_swallows_errors_but_try_load_does_not() {
        let spy = Spy {
            query_reply: Some((Status::AUTH_FAILED, None)),
            ..Spy::default()
        };
        let store = spy_store(spy, UpdateStrategy::Replace);
        assert_eq!(store.load_data("a", None), None);
        assert_eq!(store.try_load_data("a", None), Err(Error::AuthenticationFailed));
    }

    #[test]
    fn in_place_update_keeps_unspecified_metadata() {
        let config = Config::default().with_update_strategy(UpdateStrategy::InPlace);
        let mut store = SecureStore::new(MemoryBackend::new(), config);
        let original = GenericPassword::new("u", "s")
            .with_comment("kept")
            .with_data(payload(json!({"v": 1})));
        store.create(&original).unwrap();

        let replacement = GenericPassword::new("u", "s").with_data(payload(json!({"v": 2})));
        store.update(&replacement).unwrap();

        let item = store.read(&GenericPassword::new("u", "s")).unwrap().unwrap();
        assert_eq!(item.data(), Some(&payload(json!({"v": 2}))));
        assert_eq!(crate::capability::Commentable::comment(&item), Some("kept"));
    }

    #[test]
    fn replace_update_discards_previous_metadata() {
        let mut store = SecureStore::new(MemoryBackend::new(), Config::default());
        let original = GenericPassword::new("u", "s")
            .with_comment("dropped")
            .with_data(payload(json!({"v": 1})));
        store.create(&original).unwrap();

        let replacement = GenericPassword::new("u", "s").with_data(payload(json!({"v": 2})));
        store.update(&replacement).unwrap();

        let item = store.read(&GenericPassword::new("u", "s")).unwrap().unwrap();
        assert_eq!(crate::capability::Commentable::comment(&item), None);
        assert_eq!(item.into_data(), Some(payload(json!({"v": 2}))));
    }
}
