//! Key-pair persistence
//!
//! The run authenticates to every device with one ssh key pair. The pair is
//! read from disk when present and generated once (via `ssh-keygen`) when
//! not, so repeated runs reuse the same registered key.

use crate::error::{AppError, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// The ssh identity used for every remote session of a run
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// Path of the private key file handed to ssh/scp
    pub private_key_path: PathBuf,
    /// OpenSSH-format public key text
    pub public_key: String,
    /// Provider-side key id, present once registered for this run
    pub provider_id: Option<String>,
}

impl KeyPair {
    /// Load the key pair at `path`, generating and persisting a new one if
    /// none exists yet.
    pub async fn load_or_generate(path: &Path, comment: &str) -> Result<Self> {
        let public_path = public_key_path(path);

        if path.exists() {
            if !public_path.exists() {
                return Err(AppError::io(format!(
                    "found private key {} without its public half {}",
                    path.display(),
                    public_path.display()
                )));
            }
            return Self::load(path, &public_path).await;
        }

        generate(path, comment).await?;
        Self::load(path, &public_path).await
    }

    async fn load(path: &Path, public_path: &Path) -> Result<Self> {
        let public_key = tokio::fs::read_to_string(public_path)
            .await
            .map_err(|e| {
                AppError::io(format!("cannot read public key {}: {}", public_path.display(), e))
            })?
            .trim()
            .to_string();

        if public_key.is_empty() {
            return Err(AppError::io(format!(
                "public key file {} is empty",
                public_path.display()
            )));
        }

        Ok(Self {
            private_key_path: path.to_path_buf(),
            public_key,
            provider_id: None,
        })
    }
}

/// Path of the public half next to a private key file
pub fn public_key_path(private: &Path) -> PathBuf {
    let mut name = private
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".pub");
    private.with_file_name(name)
}

async fn generate(path: &Path, comment: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let output = Command::new("ssh-keygen")
        .arg("-q")
        .arg("-t")
        .arg("ed25519")
        .arg("-N")
        .arg("")
        .arg("-C")
        .arg(comment)
        .arg("-f")
        .arg(path)
        .output()
        .await
        .map_err(|e| AppError::io(format!("failed to run ssh-keygen: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::io(format!(
            "ssh-keygen failed for {}: {}",
            path.display(),
            stderr.trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_key_path_appends_pub() {
        assert_eq!(public_key_path(Path::new("keys")), Path::new("keys.pub"));
        assert_eq!(
            public_key_path(Path::new("/run/state/keys")),
            Path::new("/run/state/keys.pub")
        );
    }

    #[tokio::test]
    async fn test_existing_pair_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let private = dir.path().join("keys");
        tokio::fs::write(&private, "PRIVATE KEY MATERIAL").await.unwrap();
        tokio::fs::write(dir.path().join("keys.pub"), "ssh-ed25519 AAAA fleet@test\n")
            .await
            .unwrap();

        let pair = KeyPair::load_or_generate(&private, "fleet@test").await.unwrap();
        assert_eq!(pair.public_key, "ssh-ed25519 AAAA fleet@test");
        assert_eq!(pair.private_key_path, private);
        assert!(pair.provider_id.is_none());
    }

    #[tokio::test]
    async fn test_private_without_public_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let private = dir.path().join("keys");
        tokio::fs::write(&private, "PRIVATE KEY MATERIAL").await.unwrap();

        let err = KeyPair::load_or_generate(&private, "fleet@test").await.unwrap_err();
        assert_eq!(err.category(), "IO");
        assert!(err.to_string().contains("public half"));
    }

    #[tokio::test]
    async fn test_empty_public_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let private = dir.path().join("keys");
        tokio::fs::write(&private, "PRIVATE KEY MATERIAL").await.unwrap();
        tokio::fs::write(dir.path().join("keys.pub"), "\n").await.unwrap();

        let err = KeyPair::load_or_generate(&private, "fleet@test").await.unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[tokio::test]
    async fn test_missing_pair_is_generated() {
        // needs the openssh client tools; skip quietly where absent
        if std::process::Command::new("ssh-keygen")
            .arg("-?")
            .output()
            .is_err()
        {
            return;
        }

        let dir = tempfile::tempdir().unwrap();
        let private = dir.path().join("state").join("keys");

        let pair = KeyPair::load_or_generate(&private, "fleet@test").await.unwrap();
        assert!(private.exists());
        assert!(public_key_path(&private).exists());
        assert!(pair.public_key.starts_with("ssh-ed25519"));
        assert!(pair.public_key.contains("fleet@test"));
    }
}
