use std::fmt;
use std::io::{BufRead, Write as _};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use fernet::Fernet;

use crate::cli::CredentialsInitArgs;

#[derive(Clone, PartialEq, Eq)]
pub struct SmtpCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SmtpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Somewhere SMTP credentials can be looked up.
///
/// `Ok(None)` means the source has no credentials; `Err` means it has some
/// but they could not be read.
pub trait CredentialSource {
    fn describe(&self) -> &'static str;
    fn load(&self) -> anyhow::Result<Option<SmtpCredentials>>;
}

/// Credentials given directly, usually `SMTP_USERNAME` / `SMTP_PASSWORD`.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentials {
    username: Option<String>,
    password: Option<String>,
}

impl EnvCredentials {
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }
}

impl CredentialSource for EnvCredentials {
    fn describe(&self) -> &'static str {
        "environment"
    }

    fn load(&self) -> anyhow::Result<Option<SmtpCredentials>> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Ok(Some(SmtpCredentials {
                    username: username.to_owned(),
                    password: password.to_owned(),
                }))
            }
            _ => Ok(None),
        }
    }
}

/// A Fernet token holding `username:password`, decrypted with a key file.
#[derive(Debug, Clone)]
pub struct EncryptedFileCredentials {
    credentials_file: PathBuf,
    key_file: PathBuf,
}

impl EncryptedFileCredentials {
    pub fn new(credentials_file: impl Into<PathBuf>, key_file: impl Into<PathBuf>) -> Self {
        Self {
            credentials_file: credentials_file.into(),
            key_file: key_file.into(),
        }
    }
}

impl CredentialSource for EncryptedFileCredentials {
    fn describe(&self) -> &'static str {
        "encrypted file"
    }

    fn load(&self) -> anyhow::Result<Option<SmtpCredentials>> {
        let token = match std::fs::read_to_string(&self.credentials_file) {
            Ok(token) => token,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("read credentials: {}", self.credentials_file.display())
                });
            }
        };

        let key = read_key(&self.key_file)?;
        let fernet = cipher(&key)?;
        let plain = fernet
            .decrypt(token.trim())
            .map_err(|_| anyhow::anyhow!("decrypt credentials: invalid token or wrong key"))?;
        let plain = String::from_utf8(plain).context("credentials are not valid UTF-8")?;

        let (username, password) = plain
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("credentials must have the form username:password"))?;
        Ok(Some(SmtpCredentials {
            username: username.to_owned(),
            password: password.to_owned(),
        }))
    }
}

/// Tries each source in order and returns the first credentials found.
pub struct ChainedCredentials {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl ChainedCredentials {
    pub fn new(sources: Vec<Box<dyn CredentialSource>>) -> Self {
        Self { sources }
    }
}

impl CredentialSource for ChainedCredentials {
    fn describe(&self) -> &'static str {
        "chained"
    }

    fn load(&self) -> anyhow::Result<Option<SmtpCredentials>> {
        for source in &self.sources {
            let loaded = source
                .load()
                .with_context(|| format!("load credentials from {}", source.describe()))?;
            if let Some(credentials) = loaded {
                tracing::info!(source = source.describe(), "smtp credentials loaded");
                return Ok(Some(credentials));
            }
        }
        Ok(None)
    }
}

/// Reads the key file, generating a new key when it does not exist yet.
pub fn init_key(key_file: &Path) -> anyhow::Result<String> {
    if key_file.exists() {
        return read_key(key_file);
    }

    if let Some(parent) = key_file.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create key dir: {}", parent.display()))?;
    }
    let key = Fernet::generate_key();
    std::fs::write(key_file, &key)
        .with_context(|| format!("write key file: {}", key_file.display()))?;
    tracing::info!(path = %key_file.display(), "generated new encryption key");
    Ok(key)
}

/// Encrypts `credentials` with `key` and writes the token to
/// `credentials_file`.
pub fn save_encrypted(
    credentials_file: &Path,
    key: &str,
    credentials: &SmtpCredentials,
) -> anyhow::Result<()> {
    if credentials.username.contains(':') {
        anyhow::bail!("username must not contain ':'");
    }

    let fernet = cipher(key)?;
    let token = fernet.encrypt(
        format!("{}:{}", credentials.username, credentials.password).as_bytes(),
    );

    if let Some(parent) = credentials_file.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create credentials dir: {}", parent.display()))?;
    }
    std::fs::write(credentials_file, token)
        .with_context(|| format!("write credentials: {}", credentials_file.display()))?;
    tracing::info!(path = %credentials_file.display(), "encrypted credentials saved");
    Ok(())
}

/// `credentials init`: asks for whatever was not passed as a flag and stores
/// the encrypted credentials.
pub fn init(args: &CredentialsInitArgs) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();

    let username = match args.username.as_deref() {
        Some(username) => username.to_owned(),
        None => prompt(&mut input, "SMTP username (email address): ")?,
    };
    if username.is_empty() {
        anyhow::bail!("username must not be empty");
    }

    let password = match args.password.as_deref() {
        Some(password) => password.to_owned(),
        None => {
            let password = prompt(&mut input, "SMTP password: ")?;
            let confirmation = prompt(&mut input, "Confirm password: ")?;
            if password != confirmation {
                anyhow::bail!("passwords do not match");
            }
            password
        }
    };
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }

    let key = init_key(Path::new(&args.key_file))?;
    save_encrypted(
        Path::new(&args.credentials_file),
        &key,
        &SmtpCredentials { username, password },
    )
}

fn prompt(input: &mut impl BufRead, label: &str) -> anyhow::Result<String> {
    let mut stderr = std::io::stderr();
    stderr.write_all(label.as_bytes()).context("write prompt")?;
    stderr.flush().context("flush prompt")?;

    let mut line = String::new();
    input.read_line(&mut line).context("read stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

fn read_key(key_file: &Path) -> anyhow::Result<String> {
    let key = std::fs::read_to_string(key_file)
        .with_context(|| format!("read key file: {}", key_file.display()))?;
    Ok(key.trim().to_owned())
}

fn cipher(key: &str) -> anyhow::Result<Fernet> {
    Fernet::new(key).ok_or_else(|| anyhow::anyhow!("invalid encryption key"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(username: &str, password: &str) -> SmtpCredentials {
        SmtpCredentials {
            username: username.to_owned(),
            password: password.to_owned(),
        }
    }

    #[test]
    fn env_credentials_need_both_values() -> anyhow::Result<()> {
        assert!(EnvCredentials::new(Some("user".into()), None).load()?.is_none());
        assert!(EnvCredentials::new(Some("user".into()), Some(String::new())).load()?.is_none());
        assert_eq!(
            EnvCredentials::new(Some("user".into()), Some("pw".into())).load()?,
            Some(creds("user", "pw"))
        );
        Ok(())
    }

    #[test]
    fn encrypted_file_round_trips_password_with_colon() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let key_file = temp.path().join("secret.key");
        let credentials_file = temp.path().join("config").join("smtp_credentials.enc");

        let key = init_key(&key_file)?;
        assert_eq!(init_key(&key_file)?, key);
        save_encrypted(&credentials_file, &key, &creds("mail@example.org", "p:w"))?;

        let loaded = EncryptedFileCredentials::new(&credentials_file, &key_file).load()?;
        assert_eq!(loaded, Some(creds("mail@example.org", "p:w")));
        Ok(())
    }

    #[test]
    fn missing_encrypted_file_is_not_found() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let source = EncryptedFileCredentials::new(
            temp.path().join("absent.enc"),
            temp.path().join("absent.key"),
        );
        assert!(source.load()?.is_none());
        Ok(())
    }

    #[test]
    fn wrong_key_is_an_error() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let credentials_file = temp.path().join("smtp.enc");
        save_encrypted(&credentials_file, &Fernet::generate_key(), &creds("u", "p"))?;
        let other_key = temp.path().join("other.key");
        init_key(&other_key)?;

        let result = EncryptedFileCredentials::new(&credentials_file, &other_key).load();
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn environment_takes_precedence() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let key_file = temp.path().join("secret.key");
        let credentials_file = temp.path().join("smtp.enc");
        let key = init_key(&key_file)?;
        save_encrypted(&credentials_file, &key, &creds("file-user", "file-pw"))?;

        let chained = ChainedCredentials::new(vec![
            Box::new(EnvCredentials::new(Some("env-user".into()), Some("env-pw".into()))),
            Box::new(EncryptedFileCredentials::new(&credentials_file, &key_file)),
        ]);
        assert_eq!(chained.load()?, Some(creds("env-user", "env-pw")));

        let fallback = ChainedCredentials::new(vec![
            Box::new(EnvCredentials::default()),
            Box::new(EncryptedFileCredentials::new(&credentials_file, &key_file)),
        ]);
        assert_eq!(fallback.load()?, Some(creds("file-user", "file-pw")));
        Ok(())
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", creds("user", "hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
