//! Capability traits a record type composes to declare which attributes it
//! carries, and the functions that turn those declarations into attribute
//! maps.
//!
//! Every optional capability has an accessor defaulting to `None`; a type
//! only overrides the accessors it actually has a value for. Defaults:
//!
//! | capability            | accessor               | default   | key    |
//! |-----------------------|------------------------|-----------|--------|
//! | [`SecureStorable`]    | `accessible`           | absent    | `pdmn` |
//! | [`SecureStorable`]    | `access_group`         | absent    | `agrp` |
//! | [`AccountBased`]      | `account`              | required  | `acct` |
//! | [`Describable`]       | `description`          | absent    | `desc` |
//! | [`Commentable`]       | `comment`              | absent    | `icmt` |
//! | [`CreatorDesignatable`] | `creator`            | absent    | `crtr` |
//! | [`Labellable`]        | `label`                | absent    | `labl` |
//! | [`TypeDesignatable`]  | `item_type`            | absent    | `type` |
//! | [`InvisibleAssignable`] | `is_invisible`       | absent    | `invi` |
//! | [`NegativeAssignable`] | `is_negative`         | absent    | `nega` |
//!
//! Kind-specific fields (`service`, `server`, `port`, ...) live on
//! [`GenericPasswordStorable`] and [`InternetPasswordStorable`].

use crate::attributes::{AttributeKey, AttributeMap, AttributeValue, drop_absent, merge_all};
use crate::options::{Accessibility, AuthenticationType, InternetProtocol, ItemClass};

pub trait SecureStorable {
    fn accessible(&self) -> Option<Accessibility> {
        None
    }

    fn access_group(&self) -> Option<&str> {
        None
    }
}

pub trait AccountBased {
    /// The account the stored value belongs to.
    fn account(&self) -> &str;
}

pub trait Describable {
    fn description(&self) -> Option<&str> {
        None
    }
}

pub trait Commentable {
    fn comment(&self) -> Option<&str> {
        None
    }
}

pub trait CreatorDesignatable {
    /// Four-character creator code.
    fn creator(&self) -> Option<u32> {
        None
    }
}

pub trait Labellable {
    fn label(&self) -> Option<&str> {
        None
    }
}

pub trait TypeDesignatable {
    /// Four-character item type code.
    fn item_type(&self) -> Option<u32> {
        None
    }
}

pub trait InvisibleAssignable {
    fn is_invisible(&self) -> Option<bool> {
        None
    }
}

pub trait NegativeAssignable {
    fn is_negative(&self) -> Option<bool> {
        None
    }
}

/// A generic password: the common case of a secret keyed by account and
/// service.
pub trait GenericPasswordStorable:
    SecureStorable
    + AccountBased
    + Describable
    + Commentable
    + CreatorDesignatable
    + Labellable
    + TypeDesignatable
    + InvisibleAssignable
    + NegativeAssignable
{
    fn service(&self) -> &str;

    fn generic(&self) -> Option<&[u8]> {
        None
    }
}

/// An internet password, keyed by account, server, port, protocol and
/// authentication scheme.
pub trait InternetPasswordStorable:
    SecureStorable
    + AccountBased
    + Describable
    + Commentable
    + CreatorDesignatable
    + Labellable
    + TypeDesignatable
    + InvisibleAssignable
    + NegativeAssignable
{
    fn server(&self) -> &str;

    fn port(&self) -> u16;

    fn internet_protocol(&self) -> InternetProtocol {
        InternetProtocol::default()
    }

    fn authentication_type(&self) -> AuthenticationType {
        AuthenticationType::default()
    }

    fn security_domain(&self) -> Option<&str> {
        None
    }

    fn path(&self) -> Option<&str> {
        None
    }
}

pub trait CertificateStorable: SecureStorable {}

pub trait KeyStorable: SecureStorable {}

fn class_attributes(class: ItemClass) -> AttributeMap {
    AttributeMap::from([(AttributeKey::Class, AttributeValue::from(class.as_str()))])
}

pub fn secure_storable_attributes<T: SecureStorable + ?Sized>(record: &T) -> AttributeMap {
    drop_absent([
        (
            AttributeKey::AccessGroup,
            record.access_group().map(AttributeValue::from),
        ),
        (
            AttributeKey::Accessible,
            record.accessible().map(|a| AttributeValue::from(a.as_str())),
        ),
    ])
}

pub fn account_attributes<T: AccountBased + ?Sized>(record: &T) -> AttributeMap {
    AttributeMap::from([(AttributeKey::Account, AttributeValue::from(record.account()))])
}

pub fn describable_attributes<T: Describable + ?Sized>(record: &T) -> AttributeMap {
    drop_absent([(
        AttributeKey::Description,
        record.description().map(AttributeValue::from),
    )])
}

pub fn commentable_attributes<T: Commentable + ?Sized>(record: &T) -> AttributeMap {
    drop_absent([(AttributeKey::Comment, record.comment().map(AttributeValue::from))])
}

pub fn creator_attributes<T: CreatorDesignatable + ?Sized>(record: &T) -> AttributeMap {
    drop_absent([(AttributeKey::Creator, record.creator().map(AttributeValue::from))])
}

pub fn label_attributes<T: Labellable + ?Sized>(record: &T) -> AttributeMap {
    drop_absent([(AttributeKey::Label, record.label().map(AttributeValue::from))])
}

pub fn type_attributes<T: TypeDesignatable + ?Sized>(record: &T) -> AttributeMap {
    drop_absent([(AttributeKey::Type, record.item_type().map(AttributeValue::from))])
}

pub fn invisible_attributes<T: InvisibleAssignable + ?Sized>(record: &T) -> AttributeMap {
    drop_absent([(
        AttributeKey::IsInvisible,
        record.is_invisible().map(AttributeValue::from),
    )])
}

pub fn negative_attributes<T: NegativeAssignable + ?Sized>(record: &T) -> AttributeMap {
    drop_absent([(
        AttributeKey::IsNegative,
        record.is_negative().map(AttributeValue::from),
    )])
}

/// Base attribute map of a generic password: class, identity, then every
/// optional capability in a fixed order.
pub fn generic_password_attributes<T: GenericPasswordStorable + ?Sized>(
    record: &T,
) -> AttributeMap {
    merge_all([
        class_attributes(ItemClass::GenericPassword),
        account_attributes(record),
        drop_absent([
            (
                AttributeKey::Service,
                Some(AttributeValue::from(record.service())),
            ),
            (AttributeKey::Generic, record.generic().map(AttributeValue::from)),
        ]),
        secure_storable_attributes(record),
        describable_attributes(record),
        commentable_attributes(record),
        creator_attributes(record),
        label_attributes(record),
        type_attributes(record),
        invisible_attributes(record),
        negative_attributes(record),
    ])
}

pub fn internet_password_attributes<T: InternetPasswordStorable + ?Sized>(
    record: &T,
) -> AttributeMap {
    merge_all([
        class_attributes(ItemClass::InternetPassword),
        account_attributes(record),
        drop_absent([
            (
                AttributeKey::Server,
                Some(AttributeValue::from(record.server())),
            ),
            (AttributeKey::Port, Some(AttributeValue::from(record.port()))),
            (
                AttributeKey::Protocol,
                Some(AttributeValue::from(record.internet_protocol().as_str())),
            ),
            (
                AttributeKey::AuthenticationType,
                Some(AttributeValue::from(record.authentication_type().as_str())),
            ),
            (
                AttributeKey::SecurityDomain,
                record.security_domain().map(AttributeValue::from),
            ),
            (AttributeKey::Path, record.path().map(AttributeValue::from)),
        ]),
        secure_storable_attributes(record),
        describable_attributes(record),
        commentable_attributes(record),
        creator_attributes(record),
        label_attributes(record),
        type_attributes(record),
        invisible_attributes(record),
        negative_attributes(record),
    ])
}

pub fn certificate_attributes<T: CertificateStorable + ?Sized>(record: &T) -> AttributeMap {
    merge_all([
        class_attributes(ItemClass::Certificate),
        secure_storable_attributes(record),
    ])
}

pub fn key_attributes<T: KeyStorable + ?Sized>(record: &T) -> AttributeMap {
    merge_all([class_attributes(ItemClass::Key), secure_storable_attributes(record)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Bare;

    impl SecureStorable for Bare {}
    impl AccountBased for Bare {
        fn account(&self) -> &str {
            "myUser"
        }
    }
    impl Describable for Bare {}
    impl Commentable for Bare {}
    impl CreatorDesignatable for Bare {}
    impl Labellable for Bare {}
    impl TypeDesignatable for Bare {}
    impl InvisibleAssignable for Bare {}
    impl NegativeAssignable for Bare {}
    impl GenericPasswordStorable for Bare {
        fn service(&self) -> &str {
            "myService"
        }
    }
    impl InternetPasswordStorable for Bare {
        fn server(&self) -> &str {
            "example.org"
        }

        fn port(&self) -> u16 {
            8080
        }
    }

    struct Annotated;

    impl SecureStorable for Annotated {
        fn accessible(&self) -> Option<Accessibility> {
            Some(Accessibility::Always)
        }

        fn access_group(&self) -> Option<&str> {
            Some("myAccessGroup")
        }
    }
    impl Describable for Annotated {
        fn description(&self) -> Option<&str> {
            Some("myDescription")
        }
    }
    impl Commentable for Annotated {
        fn comment(&self) -> Option<&str> {
            Some("myComment")
        }
    }
    impl CreatorDesignatable for Annotated {
        fn creator(&self) -> Option<u32> {
            Some(5)
        }
    }
    impl TypeDesignatable for Annotated {
        fn item_type(&self) -> Option<u32> {
            Some(10)
        }
    }
    impl InvisibleAssignable for Annotated {
        fn is_invisible(&self) -> Option<bool> {
            Some(false)
        }
    }
    impl NegativeAssignable for Annotated {
        fn is_negative(&self) -> Option<bool> {
            Some(false)
        }
    }

    #[test]
    fn bare_generic_password_has_only_identity() {
        let attributes = generic_password_attributes(&Bare);
        assert_eq!(
            attributes,
            AttributeMap::from([
                (AttributeKey::Class, AttributeValue::from("genp")),
                (AttributeKey::Account, AttributeValue::from("myUser")),
                (AttributeKey::Service, AttributeValue::from("myService")),
            ])
        );
    }

    #[test]
    fn bare_internet_password_uses_protocol_defaults() {
        let attributes = internet_password_attributes(&Bare);
        assert_eq!(attributes[&AttributeKey::Class], AttributeValue::from("inet"));
        assert_eq!(attributes[&AttributeKey::Port], AttributeValue::Integer(8080));
        assert_eq!(attributes[&AttributeKey::Protocol], AttributeValue::from("http"));
        assert_eq!(
            attributes[&AttributeKey::AuthenticationType],
            AttributeValue::from("dflt")
        );
        assert!(!attributes.contains_key(&AttributeKey::Path));
        assert!(!attributes.contains_key(&AttributeKey::SecurityDomain));
    }

    #[test]
    fn optional_capabilities_contribute_their_keys() {
        let attributes = merge_all([
            secure_storable_attributes(&Annotated),
            describable_attributes(&Annotated),
            commentable_attributes(&Annotated),
            creator_attributes(&Annotated),
            type_attributes(&Annotated),
            invisible_attributes(&Annotated),
            negative_attributes(&Annotated),
        ]);
        assert_eq!(
            attributes,
            AttributeMap::from([
                (AttributeKey::AccessGroup, AttributeValue::from("myAccessGroup")),
                (AttributeKey::Accessible, AttributeValue::from("dk")),
                (AttributeKey::Description, AttributeValue::from("myDescription")),
                (AttributeKey::Comment, AttributeValue::from("myComment")),
                (AttributeKey::Creator, AttributeValue::Integer(5)),
                (AttributeKey::Type, AttributeValue::Integer(10)),
                (AttributeKey::IsInvisible, AttributeValue::Bool(false)),
                (AttributeKey::IsNegative, AttributeValue::Bool(false)),
            ])
        );
    }

    #[test]
    fn certificate_and_key_carry_only_class_and_base() {
        struct Cert;
        impl SecureStorable for Cert {
            fn access_group(&self) -> Option<&str> {
                Some("group")
            }
        }
        impl CertificateStorable for Cert {}
        impl KeyStorable for Cert {}

        let cert = certificate_attributes(&Cert);
        assert_eq!(cert.len(), 2);
        assert_eq!(cert[&AttributeKey::Class], AttributeValue::from("cert"));
        assert_eq!(key_attributes(&Cert)[&AttributeKey::Class], AttributeValue::from("keys"));
    }
}
