// src/utils/storage.rs

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use tokio::{fs, io::AsyncWriteExt};

/// Fallback content type when the extension is unknown.
const DEFAULT_AUDIO_TYPE: &str = "audio/mpeg";

/// Flat directory of uploaded assignment audio.
///
/// Files are stored as `<unix-millis>-<sanitized original name>` and the
/// database keeps only that bare file name.
#[derive(Debug, Clone)]
pub struct AudioStore {
    root: PathBuf,
}

/// An opened audio file ready to be streamed.
#[derive(Debug)]
pub struct StoredAudio {
    pub file: fs::File,
    pub size: u64,
    pub content_type: &'static str,
}

impl AudioStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Writes an upload to disk and returns the stored file name.
    pub async fn save(&self, original_name: &str, data: &[u8]) -> io::Result<String> {
        let base = sanitize_file_name(original_name);
        let stamp = chrono::Utc::now().timestamp_millis();

        // Same millisecond and same name: pick the next free suffix.
        for attempt in 0..16u32 {
            let stored = if attempt == 0 {
                format!("{}-{}", stamp, base)
            } else {
                format!("{}-{}-{}", stamp, attempt, base)
            };
            let path = self.root.join(&stored);

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(data).await?;
                    file.flush().await?;
                    tracing::info!("Stored audio upload as {} ({} bytes)", stored, data.len());
                    return Ok(stored);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("could not find a free file name for {}", base),
        ))
    }

    /// Best-effort removal, used to roll back an upload whose row failed to insert.
    pub async fn remove(&self, stored_name: &str) {
        if let Some(path) = self.resolve(stored_name) {
            if let Err(e) = fs::remove_file(&path).await {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }

    /// Maps a stored name to a path inside the store, rejecting anything that
    /// is not a single plain file name.
    pub fn resolve(&self, stored_name: &str) -> Option<PathBuf> {
        let mut components = Path::new(stored_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => Some(self.root.join(name)),
            _ => None,
        }
    }

    /// Opens a stored file. `Ok(None)` means it is not on disk.
    pub async fn open(&self, stored_name: &str) -> io::Result<Option<StoredAudio>> {
        let Some(path) = self.resolve(stored_name) else {
            return Ok(None);
        };

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some(StoredAudio {
            file,
            size: metadata.len(),
            content_type: content_type_for(stored_name),
        }))
    }
}

/// Content type from the file extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("opus") => "audio/opus",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => DEFAULT_AUDIO_TYPE,
    }
}

fn sanitize_file_name(name: &str) -> String {
    let last = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "audio".to_string()
    } else {
        cleaned.to_string()
    }
}
