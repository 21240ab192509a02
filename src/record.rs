//! Ready-made records for the two password kinds.
//!
//! These cover the common case; any caller type implementing the capability
//! traits works with the store just as well.

use crate::attributes::AttributeMap;
use crate::capability::{
    AccountBased, Commentable, CreatorDesignatable, Describable, GenericPasswordStorable,
    InternetPasswordStorable, InvisibleAssignable, Labellable, NegativeAssignable,
    SecureStorable, TypeDesignatable, generic_password_attributes, internet_password_attributes,
};
use crate::codec::Payload;
use crate::item::{GenericPasswordItem, InternetPasswordItem};
use crate::options::{Accessibility, AuthenticationType, InternetProtocol};
use crate::request::{Createable, Deleteable, Readable, Storable};

/// Optional attributes shared by every record kind. All default to absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub description: Option<String>,
    pub comment: Option<String>,
    pub creator: Option<u32>,
    pub label: Option<String>,
    pub item_type: Option<u32>,
    pub is_invisible: Option<bool>,
    pub is_negative: Option<bool>,
    pub accessible: Option<Accessibility>,
    pub access_group: Option<String>,
}

/// Builder methods for the fields in [`Metadata`].
pub trait WithMetadata: Sized {
    fn metadata_mut(&mut self) -> &mut Metadata;

    fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata_mut().description = Some(description.into());
        self
    }

    fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.metadata_mut().comment = Some(comment.into());
        self
    }

    fn with_creator(mut self, creator: u32) -> Self {
        self.metadata_mut().creator = Some(creator);
        self
    }

    fn with_label(mut self, label: impl Into<String>) -> Self {
        self.metadata_mut().label = Some(label.into());
        self
    }

    fn with_item_type(mut self, item_type: u32) -> Self {
        self.metadata_mut().item_type = Some(item_type);
        self
    }

    fn with_invisible(mut self, is_invisible: bool) -> Self {
        self.metadata_mut().is_invisible = Some(is_invisible);
        self
    }

    fn with_negative(mut self, is_negative: bool) -> Self {
        self.metadata_mut().is_negative = Some(is_negative);
        self
    }

    fn with_accessible(mut self, accessible: Accessibility) -> Self {
        self.metadata_mut().accessible = Some(accessible);
        self
    }

    fn with_access_group(mut self, access_group: impl Into<String>) -> Self {
        self.metadata_mut().access_group = Some(access_group.into());
        self
    }
}

macro_rules! metadata_capabilities {
    ($record:ty) => {
        impl WithMetadata for $record {
            fn metadata_mut(&mut self) -> &mut Metadata {
                &mut self.metadata
            }
        }

        impl SecureStorable for $record {
            fn accessible(&self) -> Option<Accessibility> {
                self.metadata.accessible
            }

            fn access_group(&self) -> Option<&str> {
                self.metadata.access_group.as_deref()
            }
        }

        impl AccountBased for $record {
            fn account(&self) -> &str {
                &self.account
            }
        }

        impl Describable for $record {
            fn description(&self) -> Option<&str> {
                self.metadata.description.as_deref()
            }
        }

        impl Commentable for $record {
            fn comment(&self) -> Option<&str> {
                self.metadata.comment.as_deref()
            }
        }

        impl CreatorDesignatable for $record {
            fn creator(&self) -> Option<u32> {
                self.metadata.creator
            }
        }

        impl Labellable for $record {
            fn label(&self) -> Option<&str> {
                self.metadata.label.as_deref()
            }
        }

        impl TypeDesignatable for $record {
            fn item_type(&self) -> Option<u32> {
                self.metadata.item_type
            }
        }

        impl InvisibleAssignable for $record {
            fn is_invisible(&self) -> Option<bool> {
                self.metadata.is_invisible
            }
        }

        impl NegativeAssignable for $record {
            fn is_negative(&self) -> Option<bool> {
                self.metadata.is_negative
            }
        }

        impl Createable for $record {
            fn data(&self) -> Option<&Payload> {
                self.data.as_ref()
            }
        }

        impl Readable for $record {}
        impl Deleteable for $record {}
    };
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericPassword {
    account: String,
    service: String,
    generic: Option<Vec<u8>>,
    metadata: Metadata,
    data: Option<Payload>,
}

impl GenericPassword {
    pub fn new(account: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            service: service.into(),
            ..Self::default()
        }
    }

    pub fn with_generic(mut self, generic: impl Into<Vec<u8>>) -> Self {
        self.generic = Some(generic.into());
        self
    }

    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

metadata_capabilities!(GenericPassword);

impl GenericPasswordStorable for GenericPassword {
    fn service(&self) -> &str {
        &self.service
    }

    fn generic(&self) -> Option<&[u8]> {
        self.generic.as_deref()
    }
}

impl Storable for GenericPassword {
    type Item = GenericPasswordItem;

    fn base_attributes(&self) -> AttributeMap {
        generic_password_attributes(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InternetPassword {
    account: String,
    server: String,
    port: u16,
    internet_protocol: InternetProtocol,
    authentication_type: AuthenticationType,
    security_domain: Option<String>,
    path: Option<String>,
    metadata: Metadata,
    data: Option<Payload>,
}

impl InternetPassword {
    /// Protocol defaults to HTTP and authentication type to the default
    /// scheme.
    pub fn new(account: impl Into<String>, server: impl Into<String>, port: u16) -> Self {
        Self {
            account: account.into(),
            server: server.into(),
            port,
            internet_protocol: InternetProtocol::default(),
            authentication_type: AuthenticationType::default(),
            security_domain: None,
            path: None,
            metadata: Metadata::default(),
            data: None,
        }
    }

    pub fn with_protocol(mut self, internet_protocol: InternetProtocol) -> Self {
        self.internet_protocol = internet_protocol;
        self
    }

    pub fn with_authentication_type(mut self, authentication_type: AuthenticationType) -> Self {
        self.authentication_type = authentication_type;
        self
    }

    pub fn with_security_domain(mut self, security_domain: impl Into<String>) -> Self {
        self.security_domain = Some(security_domain.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_data(mut self, data: Payload) -> Self {
        self.data = Some(data);
        self
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

metadata_capabilities!(InternetPassword);

impl InternetPasswordStorable for InternetPassword {
    fn server(&self) -> &str {
        &self.server
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn internet_protocol(&self) -> InternetProtocol {
        self.internet_protocol
    }

    fn authentication_type(&self) -> AuthenticationType {
        self.authentication_type
    }

    fn security_domain(&self) -> Option<&str> {
        self.security_domain.as_deref()
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl Storable for InternetPassword {
    type Item = InternetPasswordItem;

    fn base_attributes(&self) -> AttributeMap {
        internet_password_attributes(self)
    }
}
