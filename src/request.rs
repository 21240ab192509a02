//! Operation capabilities: how a record turns into the attribute map of a
//! create, read or delete request.
//!
//! The maps are built entirely from the record's own values before anything
//! is handed to the backend; dispatch and status handling live in
//! [`SecureStore`].

use crate::attributes::{AttributeKey, AttributeMap, AttributeValue, MATCH_LIMIT_ONE, merge};
use crate::backend::ItemStore;
use crate::codec::{Payload, PayloadCodec};
use crate::error::{Error, Result};
use crate::item::FromItem;
use crate::store::SecureStore;

/// A record that knows its kind's base attribute map.
pub trait Storable {
    /// What a read of this record decodes into.
    type Item: FromItem;

    fn base_attributes(&self) -> AttributeMap;
}

pub trait Createable: Storable {
    fn data(&self) -> Option<&Payload>;

    /// Base map plus the encoded payload; the payload key is only ever set
    /// here.
    fn create_attributes<C: PayloadCodec + ?Sized>(&self, codec: &C) -> Result<AttributeMap> {
        let data = self
            .data()
            .ok_or(Error::RequestMisconfigured("no payload to store"))?;
        let blob = codec.encode(data)?;
        Ok(merge(
            self.base_attributes(),
            AttributeMap::from([(AttributeKey::ValueData, AttributeValue::Data(blob))]),
        ))
    }

    fn create_in<B: ItemStore, C: PayloadCodec>(&self, store: &mut SecureStore<B, C>) -> Result<()> {
        store.create(self)
    }

    fn update_in<B: ItemStore, C: PayloadCodec>(&self, store: &mut SecureStore<B, C>) -> Result<()> {
        store.update(self)
    }
}

pub trait Readable: Storable {
    fn read_attributes(&self) -> AttributeMap {
        merge(
            self.base_attributes(),
            AttributeMap::from([
                (AttributeKey::ReturnData, AttributeValue::Bool(true)),
                (AttributeKey::MatchLimit, AttributeValue::from(MATCH_LIMIT_ONE)),
                (AttributeKey::ReturnAttributes, AttributeValue::Bool(true)),
            ]),
        )
    }

    fn read_from<B: ItemStore, C: PayloadCodec>(
        &self,
        store: &SecureStore<B, C>,
    ) -> Result<Option<Self::Item>> {
        store.read(self)
    }
}

pub trait Deleteable: Storable {
    fn delete_attributes(&self) -> AttributeMap {
        self.base_attributes()
    }

    fn delete_from<B: ItemStore, C: PayloadCodec>(&self, store: &mut SecureStore<B, C>) -> Result<()> {
        store.delete(self)
    }
}
