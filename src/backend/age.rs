//! File backend: the whole item table, age-encrypted, in `<dir>/items.age`.
//!
//! The directory defaults to `~/.config/keysafe`. Identities may be native
//! age identities or SSH keys (Ed25519, RSA). Without an explicit identity a
//! native one is generated at `<dir>/identity.txt` on first use.
//!
//! ssh-agent is not supported by the age crate; a passphrase-protected SSH
//! key is prompted for on every open.

use age::secrecy::ExposeSecret;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use zeroize::Zeroizing;

use super::{ItemStore, ItemTable};
use crate::attributes::AttributeMap;
use crate::error::{BackendError, Status};

const ITEMS_FILE: &str = "items.age";
const IDENTITY_FILE: &str = "identity.txt";
const RECIPIENT_FILE: &str = "recipient.txt";

/// Grant the current user exclusive access to `path` with `icacls`.
#[cfg(target_os = "windows")]
fn restrict_to_owner(path: &Path) -> Result<(), BackendError> {
    let username = std::env::var("USERNAME")
        .map_err(|_| BackendError::Config("USERNAME is not set".to_string()))?;
    let status = std::process::Command::new("icacls")
        .arg(path)
        .arg("/inheritance:r")
        .arg("/grant:r")
        .arg(format!("{username}:F"))
        .status()
        .map_err(|e| BackendError::io("running icacls", e))?;
    if !status.success() {
        return Err(BackendError::Config(format!(
            "icacls failed for {}",
            path.display()
        )));
    }
    Ok(())
}

pub struct AgeBackend {
    items_path: PathBuf,
    identity_path: PathBuf,
    recipient_path: PathBuf,
    table: ItemTable,
}

impl std::fmt::Debug for AgeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgeBackend")
            .field("items_path", &self.items_path)
            .field("identity_path", &self.identity_path)
            .field("items", &self.table.len())
            .finish()
    }
}

impl AgeBackend {
    /// `~/.config/keysafe` or the platform equivalent.
    pub fn default_dir() -> Result<PathBuf, BackendError> {
        dirs::config_dir()
            .map(|dir| dir.join("keysafe"))
            .ok_or_else(|| BackendError::Config("could not determine config directory".into()))
    }

    /// Open (creating if needed) the store under `dir`.
    ///
    /// An explicit `identity` must exist; it is never generated.
    pub fn open(dir: Option<PathBuf>, identity: Option<PathBuf>) -> Result<Self, BackendError> {
        let dir = match dir {
            Some(dir) => dir,
            None => Self::default_dir()?,
        };
        fs::create_dir_all(&dir).map_err(|e| BackendError::io("creating store directory", e))?;

        // Others must not be able to list the directory.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))
                .map_err(|e| BackendError::io("restricting store directory", e))?;
        }

        let generate = identity.is_none();
        let mut backend = Self {
            items_path: dir.join(ITEMS_FILE),
            identity_path: identity.unwrap_or_else(|| dir.join(IDENTITY_FILE)),
            recipient_path: dir.join(RECIPIENT_FILE),
            table: ItemTable::new(),
        };
        backend.ensure_identity(generate)?;
        backend.load()?;
        debug!(path = %backend.items_path.display(), items = backend.table.len(), "opened age store");
        Ok(backend)
    }

    pub fn items_path(&self) -> &Path {
        &self.items_path
    }

    pub fn identity_path(&self) -> &Path {
        &self.identity_path
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn ensure_identity(&self, generate: bool) -> Result<(), BackendError> {
        if self.identity_path.exists() {
            return Ok(());
        }
        if !generate {
            return Err(BackendError::Config(format!(
                "identity file not found: {path}\n\
                 For SSH keys:       ssh-keygen -t ed25519 -f {path}\n\
                 For age identities: age-keygen -o {path}",
                path = self.identity_path.display()
            )));
        }

        let identity = age::x25519::Identity::generate();
        let recipient = identity.to_public();

        // Created 0600 with O_EXCL so the key is never readable by others and
        // a planted symlink is not followed.
        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(&self.identity_path)
            .map_err(|e| BackendError::io("creating identity file", e))?;
        file.write_all(identity.to_string().expose_secret().as_bytes())
            .map_err(|e| BackendError::io("writing identity file", e))?;
        drop(file);

        #[cfg(target_os = "windows")]
        if let Err(e) = restrict_to_owner(&self.identity_path) {
            tracing::warn!(error = %e, "could not restrict identity file permissions");
        }

        fs::write(&self.recipient_path, recipient.to_string())
            .map_err(|e| BackendError::io("writing recipient file", e))?;
        info!(
            path = %self.identity_path.display(),
            public_key = %recipient,
            "generated age identity"
        );
        Ok(())
    }

    fn identities(&self) -> Result<Vec<Box<dyn age::Identity>>, BackendError> {
        let bytes = Zeroizing::new(
            fs::read(&self.identity_path).map_err(|e| BackendError::io("reading identity file", e))?,
        );

        if bytes.windows(10).any(|w| w == b"-----BEGIN") {
            let identity = age::ssh::Identity::from_buffer(bytes.as_slice(), None)
                .map_err(|e| BackendError::Crypto(format!("unreadable SSH key: {e}")))?;
            return Ok(vec![Box::new(identity)]);
        }

        let identities = age::IdentityFile::from_buffer(bytes.as_slice())
            .map_err(|e| BackendError::Crypto(format!("unreadable identity file: {e}")))?
            .into_identities()
            .map_err(|e| BackendError::Crypto(format!("unusable identity: {e}")))?;
        if identities.is_empty() {
            return Err(BackendError::Crypto("identity file holds no identities".into()));
        }
        Ok(identities)
    }

    fn recipient(&self) -> Result<Box<dyn age::Recipient + Send>, BackendError> {
        let text = Zeroizing::new(
            fs::read_to_string(&self.identity_path)
                .map_err(|e| BackendError::io("reading identity file", e))?,
        );
        if let Ok(identity) = text.trim().parse::<age::x25519::Identity>() {
            return Ok(Box::new(identity.to_public()));
        }
        if let Some(recipient) = ssh_recipient(&text) {
            return Ok(recipient);
        }

        let public = PathBuf::from(format!("{}.pub", self.identity_path.display()));
        if public.exists() {
            let text = fs::read_to_string(&public)
                .map_err(|e| BackendError::io("reading public key file", e))?;
            if let Some(recipient) = ssh_recipient(&text) {
                return Ok(recipient);
            }
        }
        Err(BackendError::Crypto(
            "could not determine a recipient from the identity file".into(),
        ))
    }

    fn load(&mut self) -> Result<(), BackendError> {
        let encrypted = match fs::read(&self.items_path) {
            Ok(encrypted) => encrypted,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(BackendError::io("reading item file", e)),
        };
        if encrypted.is_empty() {
            return Ok(());
        }

        let identities = self.identities()?;
        let decryptor = age::Decryptor::new(&encrypted[..])
            .map_err(|e| BackendError::Crypto(format!("malformed item file: {e}")))?;
        let mut reader = decryptor
            .decrypt(identities.iter().map(|i| i.as_ref()))
            .map_err(|e| BackendError::Crypto(format!("decryption failed: {e}")))?;
        let mut plaintext = Zeroizing::new(Vec::new());
        reader
            .read_to_end(&mut plaintext)
            .map_err(|e| BackendError::io("decrypting item file", e))?;

        self.table = serde_json::from_slice(&plaintext)?;
        Ok(())
    }

    fn save(&self) -> Result<(), BackendError> {
        let plaintext = Zeroizing::new(serde_json::to_vec(&self.table)?);

        let recipient = self.recipient()?;
        let encryptor = age::Encryptor::with_recipients(std::iter::once(
            recipient.as_ref() as &dyn age::Recipient
        ))
        .map_err(|e| BackendError::Crypto(format!("cannot encrypt: {e}")))?;
        let mut encrypted = Vec::new();
        let mut writer = encryptor
            .wrap_output(&mut encrypted)
            .map_err(|e| BackendError::io("encrypting item file", e))?;
        writer
            .write_all(&plaintext)
            .map_err(|e| BackendError::io("encrypting item file", e))?;
        writer
            .finish()
            .map_err(|e| BackendError::io("encrypting item file", e))?;

        // Same directory so the rename is atomic; tempfile creates it 0600.
        let parent = self
            .items_path
            .parent()
            .ok_or_else(|| BackendError::Config("item file has no parent directory".into()))?;
        let mut temp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| BackendError::io("creating temporary item file", e))?;
        temp.write_all(&encrypted)
            .and_then(|()| temp.flush())
            .map_err(|e| BackendError::io("writing temporary item file", e))?;
        temp.persist(&self.items_path)
            .map_err(|e| BackendError::io("replacing item file", e.error))?;
        Ok(())
    }

    /// Apply `change` and persist it. The in-memory table is rolled back when
    /// the file cannot be written, so memory never runs ahead of disk.
    fn commit(&mut self, change: impl FnOnce(&mut ItemTable) -> Status) -> Status {
        let previous = self.table.clone();
        let status = change(&mut self.table);
        if !status.is_success() {
            return status;
        }
        if let Err(e) = self.save() {
            error!(error = %e, path = %self.items_path.display(), "failed to persist items");
            self.table = previous;
            return Status::NOT_AVAILABLE;
        }
        status
    }
}

fn ssh_recipient(text: &str) -> Option<Box<dyn age::Recipient + Send>> {
    text.lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ssh-"))
        .find_map(|line| line.parse::<age::ssh::Recipient>().ok())
        .map(|recipient| Box::new(recipient) as Box<dyn age::Recipient + Send>)
}

impl ItemStore for AgeBackend {
    fn insert(&mut self, attributes: &AttributeMap) -> Status {
        self.commit(|table| table.insert(attributes))
    }

    fn query(&self, query: &AttributeMap) -> (Status, Option<AttributeMap>) {
        self.table.query(query)
    }

    fn delete(&mut self, query: &AttributeMap) -> Status {
        self.commit(|table| table.delete(query))
    }

    fn update(&mut self, query: &AttributeMap, attributes: &AttributeMap) -> Status {
        self.commit(|table| table.update(query, attributes))
    }
}
