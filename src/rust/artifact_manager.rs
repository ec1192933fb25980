use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

pub const MODEL_FILE_NAME: &str = "model.onnx";
pub const LABELS_FILE_NAME: &str = "class_names.txt";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not downloaded: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("Download of {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Artifact verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// One remotely hosted artifact file.
#[derive(Debug, Clone, Default)]
pub struct RemoteFile {
    pub url: String,
    /// Lowercase hex SHA-256. Without it a cached copy is trusted as is.
    pub sha256: Option<String>,
}

/// Where to fetch the classifier and label files from.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSource {
    pub model: Option<RemoteFile>,
    pub labels: Option<RemoteFile>,
}

impl ArtifactSource {
    pub fn is_empty(&self) -> bool {
        self.model.is_none() && self.labels.is_none()
    }
}

/// Owns the local artifacts directory: the classifier model and its label file.
#[derive(Clone)]
pub struct ArtifactManager {
    artifacts_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ArtifactManager {
    /// Creates a new ArtifactManager with the default artifacts directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_artifacts_dir())
    }

    /// Returns the default artifacts directory path
    pub fn get_default_artifacts_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("LEAFSCAN_CACHE") {
            return PathBuf::from(path).join("artifacts");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("leafscan").join("artifacts");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("leafscan").join("artifacts");
        }

        // 4. If all else fails, use system temp directory (platform agnostic)
        env::temp_dir().join("leafscan").join("artifacts")
    }

    pub fn new<P: AsRef<Path>>(artifacts_dir: P) -> io::Result<Self> {
        let artifacts_dir = artifacts_dir.as_ref().to_path_buf();
        fs::create_dir_all(&artifacts_dir)?;
        Ok(Self {
            artifacts_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    pub fn get_model_path(&self) -> PathBuf {
        self.artifacts_dir.join(MODEL_FILE_NAME)
    }

    pub fn get_labels_path(&self) -> PathBuf {
        self.artifacts_dir.join(LABELS_FILE_NAME)
    }

    pub fn is_downloaded(&self) -> bool {
        let model_path = self.get_model_path();
        let labels_path = self.get_labels_path();
        log::debug!("Model path: {:?} (exists: {})", model_path, model_path.exists());
        log::debug!("Labels path: {:?} (exists: {})", labels_path, labels_path.exists());
        model_path.exists() && labels_path.exists()
    }

    /// Fails with `NotDownloaded` unless both artifact files are present.
    pub fn require_downloaded(&self) -> Result<(), ArtifactError> {
        for path in [self.get_model_path(), self.get_labels_path()] {
            if !path.exists() {
                return Err(ArtifactError::NotDownloaded(path.display().to_string()));
            }
        }
        Ok(())
    }

    /// Fetches every artifact in `source` that is missing or fails verification.
    ///
    /// If any file fails, the files written by this call are removed again.
    /// Cached files this call did not replace are left in place.
    pub async fn download(&self, source: &ArtifactSource) -> Result<(), ArtifactError> {
        let _lock = self.download_lock.lock().await;
        fs::create_dir_all(&self.artifacts_dir)?;

        let files = [
            (source.model.as_ref(), self.get_model_path(), "model"),
            (source.labels.as_ref(), self.get_labels_path(), "labels"),
        ];

        let mut written = Vec::new();
        for (remote, path, file_type) in files {
            let Some(remote) = remote else { continue };
            match self.ensure_file(remote, &path, file_type).await {
                Ok(true) => written.push(path),
                Ok(false) => {}
                Err(e) => {
                    log::error!("Failed to set up {} file: {}", file_type, e);
                    Self::remove_files(&written);
                    return Err(e);
                }
            }
        }

        log::info!("Artifacts ready in {:?}", self.artifacts_dir);
        Ok(())
    }

    /// Best-effort cleanup after a failed `download`.
    fn remove_files(paths: &[PathBuf]) {
        for path in paths {
            match fs::remove_file(path) {
                Ok(()) => log::info!("Removed partial download {:?}", path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Failed to remove partial download {:?}: {}", path, e),
            }
        }
    }

    /// Returns whether the file at `path` was (re)written.
    async fn ensure_file(
        &self,
        remote: &RemoteFile,
        path: &Path,
        file_type: &str,
    ) -> Result<bool, ArtifactError> {
        if path.exists() {
            match &remote.sha256 {
                None => {
                    log::info!("{} file exists at {:?}, no hash configured", file_type, path);
                    return Ok(false);
                }
                Some(hash) if self.verify_file(path, hash)? => {
                    log::info!("Existing {} file verified successfully", file_type);
                    return Ok(false);
                }
                Some(_) => log::warn!("{} file verification failed, redownloading", file_type),
            }
        } else {
            log::info!("{} file does not exist, downloading...", file_type);
        }

        self.download_and_verify_file(remote, path, file_type).await?;
        Ok(true)
    }

    /// Compares the SHA-256 of the file at `path` with `expected_hash`.
    pub fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ArtifactError> {
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::debug!("Verifying {:?}: calculated {}, expected {}", path, hash, expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    async fn download_and_verify_file(
        &self,
        remote: &RemoteFile,
        path: &Path,
        file_type: &str,
    ) -> Result<(), ArtifactError> {
        log::info!("Downloading {} file from {} to {:?}", file_type, remote.url, path);
        let response = reqwest::get(&remote.url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ArtifactError::HttpStatus {
                url: remote.url.clone(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        if let Some(expected_hash) = &remote.sha256 {
            let hash = sha256_hex(&bytes);
            if !hash.eq_ignore_ascii_case(expected_hash) {
                log::error!(
                    "{} hash mismatch: expected {}, got {}",
                    file_type,
                    expected_hash,
                    hash
                );
                return Err(ArtifactError::HashMismatch {
                    file_type: file_type.to_string(),
                    expected: expected_hash.clone(),
                    actual: hash,
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;

        // Verify after writing
        if let Some(expected_hash) = &remote.sha256 {
            if !self.verify_file(path, expected_hash)? {
                Self::remove_files(&[path.to_path_buf()]);
                return Err(ArtifactError::VerificationFailed);
            }
        }

        log::info!("{} file downloaded successfully", file_type);
        Ok(())
    }

    /// Deletes cached artifacts so the next `download` fetches fresh copies.
    pub fn remove_download(&self) -> Result<(), ArtifactError> {
        for path in [self.get_model_path(), self.get_labels_path()] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
