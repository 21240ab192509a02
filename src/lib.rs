//! Typed records over a secure item store.
//!
//! A record type declares what it stores by implementing capability traits
//! ([`AccountBased`], [`Commentable`], [`GenericPasswordStorable`], ...).
//! Its operation traits ([`Createable`], [`Readable`], [`Deleteable`]) turn it
//! into the attribute map of a request, and [`SecureStore`] dispatches that
//! map to an [`ItemStore`] backend and translates the returned status.
//!
//! ```
//! use keysafe::{Config, GenericPassword, MemoryBackend, Payload, SecureStore};
//!
//! let mut store = SecureStore::new(MemoryBackend::new(), Config::default());
//! let mut data = Payload::new();
//! data.insert("password".into(), "hunter2".into());
//!
//! store.create(&GenericPassword::new("user1", "myService").with_data(data.clone()))?;
//! let item = store.read(&GenericPassword::new("user1", "myService"))?;
//! assert_eq!(item.and_then(|item| item.into_data()), Some(data));
//! # Ok::<(), keysafe::Error>(())
//! ```

pub mod attributes;
pub mod backend;
pub mod capability;
pub mod codec;
pub mod config;
pub mod error;
pub mod item;
pub mod options;
pub mod record;
pub mod request;
pub mod store;

pub use attributes::{AttributeKey, AttributeMap, AttributeValue};
pub use backend::{ItemStore, MemoryBackend};
pub use capability::{
    AccountBased, CertificateStorable, Commentable, CreatorDesignatable, Describable,
    GenericPasswordStorable, InternetPasswordStorable, InvisibleAssignable, KeyStorable,
    Labellable, NegativeAssignable, SecureStorable, TypeDesignatable,
};
pub use codec::{JsonCodec, Payload, PayloadCodec};
pub use config::{Config, UpdateStrategy};
pub use error::{BackendError, Error, Result, Status};
pub use item::{FromItem, GenericPasswordItem, InternetPasswordItem, RawItem};
pub use options::{Accessibility, AuthenticationType, InternetProtocol, ItemClass};
pub use record::{GenericPassword, InternetPassword, Metadata, WithMetadata};
pub use request::{Createable, Deleteable, Readable, Storable};
pub use store::SecureStore;
