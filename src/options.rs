//! Enumerated attribute values and their raw keychain representations.

use std::fmt;
use std::str::FromStr;

/// Raised when a raw attribute string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{raw}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub raw: String,
}

macro_rules! raw_enum {
    (
        $(#[$meta:meta])*
        $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident => $raw:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $raw,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                match raw {
                    $($raw => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, raw: raw.to_string() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

raw_enum! {
    /// Storage class of an item; selects which attribute set applies.
    ItemClass("item class") {
        GenericPassword => "genp",
        InternetPassword => "inet",
        Certificate => "cert",
        Key => "keys",
        Identity => "idnt",
    }
}

raw_enum! {
    /// When the stored item may be read.
    Accessibility("accessibility") {
        WhenUnlocked => "ak",
        AfterFirstUnlock => "ck",
        Always => "dk",
        WhenUnlockedThisDeviceOnly => "aku",
        AfterFirstUnlockThisDeviceOnly => "cku",
        AlwaysThisDeviceOnly => "dku",
        WhenPasscodeSetThisDeviceOnly => "akpu",
    }
}

raw_enum! {
    InternetProtocol("internet protocol") {
        Ftp => "ftp ",
        FtpAccount => "ftpa",
        Http => "http",
        Irc => "irc ",
        Nntp => "nntp",
        Pop3 => "pop3",
        Smtp => "smtp",
        Socks => "sox ",
        Imap => "imap",
        Ldap => "ldap",
        AppleTalk => "atlk",
        Afp => "afp ",
        Telnet => "teln",
        Ssh => "ssh ",
        Ftps => "ftps",
        Https => "htps",
        HttpProxy => "htpx",
        HttpsProxy => "htsx",
        FtpProxy => "ftpx",
        Smb => "smb ",
        Rtsp => "rtsp",
        RtspProxy => "rtsx",
        Daap => "daap",
        Eppc => "eppc",
        Ipp => "ipp ",
        Nntps => "ntps",
        Ldaps => "ldps",
        TelnetS => "tels",
        Imaps => "imps",
        Ircs => "ircs",
        Pop3s => "pops",
    }
}

raw_enum! {
    AuthenticationType("authentication type") {
        Ntlm => "ntlm",
        Msn => "msna",
        Dpa => "dpaa",
        Rpa => "rpaa",
        HttpBasic => "http",
        HttpDigest => "httd",
        HtmlForm => "form",
        Default => "dflt",
    }
}

impl Default for InternetProtocol {
    fn default() -> Self {
        Self::Http
    }
}

impl Default for AuthenticationType {
    fn default() -> Self {
        Self::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_parse_back() {
        for class in ItemClass::ALL {
            assert_eq!(class.as_str().parse::<ItemClass>(), Ok(*class));
        }
        for protocol in InternetProtocol::ALL {
            assert_eq!(protocol.as_str().parse::<InternetProtocol>(), Ok(*protocol));
        }
        assert_eq!(InternetProtocol::ALL.len(), 31);
    }

    #[test]
    fn unknown_raw_value_is_rejected() {
        let err = "zzzz".parse::<Accessibility>().unwrap_err();
        assert_eq!(err.kind, "accessibility");
        assert_eq!(err.to_string(), "unknown accessibility `zzzz`");
    }

    #[test]
    fn defaults() {
        assert_eq!(InternetProtocol::default(), InternetProtocol::Http);
        assert_eq!(AuthenticationType::default(), AuthenticationType::Default);
    }
}
