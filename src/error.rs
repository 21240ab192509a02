//! Status codes returned by the storage primitive and the error taxonomy
//! they translate into.

use std::fmt;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Raw status code reported by an [`ItemStore`](crate::backend::ItemStore).
///
/// The numbering follows the platform keychain's `OSStatus` values so that a
/// native backend can pass its codes through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    pub const SUCCESS: Self = Self(0);
    pub const UNIMPLEMENTED: Self = Self(-4);
    pub const PARAM: Self = Self(-50);
    pub const ALLOCATE: Self = Self(-108);
    pub const NOT_AVAILABLE: Self = Self(-25291);
    pub const AUTH_FAILED: Self = Self(-25293);
    pub const DUPLICATE_ITEM: Self = Self(-25299);
    pub const ITEM_NOT_FOUND: Self = Self(-25300);
    pub const INTERACTION_NOT_ALLOWED: Self = Self(-25308);
    pub const DECODE: Self = Self(-26275);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    pub fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors surfaced by store operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    #[error("failed to allocate memory")]
    AllocationFailure,

    #[error("authorization/authentication failed")]
    AuthenticationFailed,

    #[error("unable to decode the provided data")]
    DecodeFailure,

    #[error("the item already exists")]
    DuplicateItem,

    #[error("interaction with the secure store is not allowed")]
    InteractionNotAllowed,

    #[error("the item cannot be found")]
    ItemNotFound,

    #[error("the secure store is not available")]
    StoreNotAvailable,

    #[error("one or more parameters passed to the store were not valid")]
    InvalidParameter,

    #[error("function or operation not implemented")]
    Unimplemented,

    #[error("request is misconfigured: {0}")]
    RequestMisconfigured(&'static str),

    #[error("unable to clear the secure store")]
    UnableToClear,

    #[error("an undefined error occurred (status {status})")]
    Undefined { status: Status },
}

impl Error {
    /// Translate a primitive status into an error.
    ///
    /// Success yields `None`; any code outside the known set yields
    /// [`Error::Undefined`] so it is never mistaken for success.
    pub fn from_status(status: Status) -> Option<Self> {
        let error = match status {
            Status::SUCCESS => return None,
            Status::ALLOCATE => Self::AllocationFailure,
            Status::AUTH_FAILED => Self::AuthenticationFailed,
            Status::DECODE => Self::DecodeFailure,
            Status::DUPLICATE_ITEM => Self::DuplicateItem,
            Status::INTERACTION_NOT_ALLOWED => Self::InteractionNotAllowed,
            Status::ITEM_NOT_FOUND => Self::ItemNotFound,
            Status::NOT_AVAILABLE => Self::StoreNotAvailable,
            Status::PARAM => Self::InvalidParameter,
            Status::UNIMPLEMENTED => Self::Unimplemented,
            status => Self::Undefined { status },
        };
        Some(error)
    }
}

/// Turn a status into `Ok(())` or the translated error.
pub(crate) fn check(status: Status) -> Result<()> {
    match Error::from_status(status) {
        None => Ok(()),
        Some(error) => Err(error),
    }
}

/// Failures while opening a backend, before any request is dispatched.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed item file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("{0}")]
    Crypto(String),

    #[error("{0}")]
    Connect(String),

    #[error("{0}")]
    Config(String),
}

impl BackendError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_translate() {
        let table = [
            (Status::ALLOCATE, Error::AllocationFailure),
            (Status::AUTH_FAILED, Error::AuthenticationFailed),
            (Status::DECODE, Error::DecodeFailure),
            (Status::DUPLICATE_ITEM, Error::DuplicateItem),
            (Status::INTERACTION_NOT_ALLOWED, Error::InteractionNotAllowed),
            (Status::ITEM_NOT_FOUND, Error::ItemNotFound),
            (Status::NOT_AVAILABLE, Error::StoreNotAvailable),
            (Status::PARAM, Error::InvalidParameter),
            (Status::UNIMPLEMENTED, Error::Unimplemented),
        ];
        for (status, expected) in table {
            assert_eq!(Error::from_status(status), Some(expected), "status {status}");
        }
    }

    #[test]
    fn success_is_not_an_error() {
        assert_eq!(Error::from_status(Status::SUCCESS), None);
        assert!(check(Status::SUCCESS).is_ok());
    }

    #[test]
    fn unknown_code_is_undefined() {
        let status = Status(-99_999);
        assert_eq!(Error::from_status(status), Some(Error::Undefined { status }));
        assert_eq!(check(status), Err(Error::Undefined { status }));
    }
}
