//! VideoLibrary - on-disk store for downloaded Veo videos.
//!
//! Videos are keyed by a hash of the prompt and its generation settings, so
//! the same request always maps to the same file. A JSON sidecar keeps the
//! request details for listing.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use super::types::{AspectRatio, Resolution, VideoRequest};

const VIDEO_EXT: &str = "mp4";
const META_EXT: &str = "json";

/// Request details stored next to each video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryMetadata {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
}

impl From<&VideoRequest> for LibraryMetadata {
    fn from(request: &VideoRequest) -> Self {
        Self {
            prompt: request.prompt.clone(),
            aspect_ratio: request.aspect_ratio,
            resolution: request.resolution,
        }
    }
}

/// Information about a stored video.
#[derive(Debug, Clone)]
pub struct LibraryEntry {
    /// Request hash (32 hex chars)
    pub hash: String,
    /// Request details, if the sidecar is present and readable
    pub metadata: Option<LibraryMetadata>,
    pub size_bytes: u64,
    pub path: PathBuf,
}

/// Persistent store of generated videos.
pub struct VideoLibrary {
    dir: PathBuf,
}

impl VideoLibrary {
    /// Create a library rooted at `dir`. Does not create the directory.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Default location: `<data dir>/veo-director/videos`.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join("veo-director")
            .join("videos")
    }

    pub fn with_default_dir() -> Self {
        Self::new(Self::default_dir())
    }

    /// Create a library at `dir` and make sure the directory exists.
    pub fn new_initialized(dir: PathBuf) -> Result<Self, std::io::Error> {
        let library = Self::new(dir);
        library.ensure_dir_exists()?;
        Ok(library)
    }

    pub fn ensure_dir_exists(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic key for a request.
    ///
    /// Returns the first 16 bytes of SHA-256 over the settings and prompt,
    /// hex encoded.
    pub fn hash_request(request: &VideoRequest) -> String {
        let mut hasher = Sha256::new();
        hasher.update(request.aspect_ratio.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(request.resolution.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(request.prompt.as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..16])
    }

    fn video_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", hash, VIDEO_EXT))
    }

    fn meta_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", hash, META_EXT))
    }

    /// Where the video for `request` lives (whether or not it exists yet).
    pub fn path_for(&self, request: &VideoRequest) -> PathBuf {
        self.video_path(&Self::hash_request(request))
    }

    /// Stored video for `request`, if present.
    pub fn get(&self, request: &VideoRequest) -> Option<PathBuf> {
        let path = self.path_for(request);
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Copy a downloaded video into the library and write its metadata.
    pub fn store(&self, request: &VideoRequest, video_path: &Path) -> Result<PathBuf, std::io::Error> {
        self.ensure_dir_exists()?;
        let hash = Self::hash_request(request);
        let stored = self.video_path(&hash);
        if video_path != stored {
            std::fs::copy(video_path, &stored)?;
        }
        self.write_metadata(&hash, request)?;
        Ok(stored)
    }

    /// Record metadata for a video already written to `path_for(request)`.
    pub fn write_metadata(&self, hash: &str, request: &VideoRequest) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(&LibraryMetadata::from(request))
            .map_err(std::io::Error::other)?;
        std::fs::write(self.meta_path(hash), json)
    }

    pub fn metadata(&self, hash: &str) -> Option<LibraryMetadata> {
        let content = std::fs::read_to_string(self.meta_path(hash)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// All stored videos, sorted by hash.
    pub fn list_entries(&self) -> Result<Vec<LibraryEntry>, std::io::Error> {
        let mut entries = Vec::new();

        if !self.dir.exists() {
            return Ok(entries);
        }

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().and_then(|e| e.to_str()) != Some(VIDEO_EXT) {
                continue;
            }

            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            let hash = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_string();

            entries.push(LibraryEntry {
                metadata: self.metadata(&hash),
                hash,
                size_bytes: metadata.len(),
                path,
            });
        }

        entries.sort_by(|a, b| a.hash.cmp(&b.hash));

        Ok(entries)
    }

    pub fn total_size_bytes(&self) -> Result<u64, std::io::Error> {
        Ok(self.list_entries()?.iter().map(|e| e.size_bytes).sum())
    }

    /// Remove a stored video and its sidecar.
    /// Returns true if a video was removed.
    pub fn remove(&self, hash: &str) -> Result<bool, std::io::Error> {
        let video_path = self.video_path(hash);
        let mut removed = false;

        if video_path.exists() {
            std::fs::remove_file(&video_path)?;
            removed = true;
        }

        let _ = std::fs::remove_file(self.meta_path(hash));

        Ok(removed)
    }

    /// Remove every stored video and sidecar.
    /// Returns the number of videos removed.
    pub fn clear_all(&self) -> Result<usize, std::io::Error> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut count = 0;

        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some(VIDEO_EXT) => {
                    if std::fs::remove_file(&path).is_ok() {
                        count += 1;
                    }
                }
                Some(META_EXT) => {
                    let _ = std::fs::remove_file(&path);
                }
                _ => {}
            }
        }

        Ok(count)
    }

    /// Delete the oldest videos until the library fits in `max_size_mb`.
    pub fn cleanup_if_needed(&self, max_size_mb: u64) -> Result<(), std::io::Error> {
        let max_size_bytes = max_size_mb * 1024 * 1024;
        let entries = self.list_entries()?;
        let mut total: u64 = entries.iter().map(|e| e.size_bytes).sum();

        if total <= max_size_bytes {
            return Ok(());
        }

        let mut by_age: Vec<(std::time::SystemTime, LibraryEntry)> = entries
            .into_iter()
            .map(|e| {
                let modified = std::fs::metadata(&e.path)
                    .and_then(|m| m.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                (modified, e)
            })
            .collect();
        by_age.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, entry) in by_age {
            if total <= max_size_bytes {
                break;
            }
            if self.remove(&entry.hash)? {
                log::info!("Evicted {} from video library", entry.hash);
                total = total.saturating_sub(entry.size_bytes);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn request(prompt: &str) -> VideoRequest {
        VideoRequest::new(prompt, AspectRatio::Landscape, Resolution::Hd)
    }

    #[test]
    fn test_default_dir_path_structure() {
        let path = VideoLibrary::default_dir();
        assert!(path.ends_with(Path::new("veo-director").join("videos")));
        assert_eq!(
            path.parent().and_then(|p| p.file_name()),
            Some(std::ffi::OsStr::new("veo-director"))
        );
    }

    #[test]
    fn test_new_initialized_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("videos");
        let library = VideoLibrary::new_initialized(dir.clone()).unwrap();
        assert!(dir.is_dir());
        assert_eq!(library.dir(), dir);
    }

    #[test]
    fn test_hash_request_deterministic() {
        let a = VideoLibrary::hash_request(&request("a lighthouse at dusk"));
        let b = VideoLibrary::hash_request(&request("a lighthouse at dusk"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_request_depends_on_settings() {
        let landscape = request("same prompt");
        let portrait = VideoRequest::new("same prompt", AspectRatio::Portrait, Resolution::Hd);
        let full_hd = VideoRequest::new("same prompt", AspectRatio::Landscape, Resolution::FullHd);
        let h = VideoLibrary::hash_request(&landscape);
        assert_ne!(h, VideoLibrary::hash_request(&portrait));
        assert_ne!(h, VideoLibrary::hash_request(&full_hd));
    }

    #[test]
    fn test_get_returns_none_for_missing() {
        let temp = TempDir::new().unwrap();
        let library = VideoLibrary::new(temp.path().to_path_buf());
        assert!(library.get(&request("nothing here")).is_none());
    }

    #[test]
    fn test_store_and_get_with_metadata() {
        let temp = TempDir::new().unwrap();
        let library = VideoLibrary::new(temp.path().join("lib"));
        let src = temp.path().join("download.mp4");
        fs::write(&src, b"fake video").unwrap();

        let req = request("neon rain");
        let stored = library.store(&req, &src).unwrap();

        assert_eq!(library.get(&req), Some(stored.clone()));
        assert_eq!(fs::read(&stored).unwrap(), b"fake video");

        let hash = VideoLibrary::hash_request(&req);
        let meta = library.metadata(&hash).unwrap();
        assert_eq!(meta.prompt, "neon rain");
        assert_eq!(meta.aspect_ratio, AspectRatio::Landscape);
    }

    #[test]
    fn test_store_in_place_writes_metadata_only() {
        let temp = TempDir::new().unwrap();
        let library = VideoLibrary::new_initialized(temp.path().to_path_buf()).unwrap();
        let req = request("in place");
        let target = library.path_for(&req);
        fs::write(&target, b"bytes").unwrap();

        let stored = library.store(&req, &target).unwrap();
        assert_eq!(stored, target);
        assert!(library.metadata(&VideoLibrary::hash_request(&req)).is_some());
    }

    #[test]
    fn test_list_entries_ignores_other_files() {
        let temp = TempDir::new().unwrap();
        let library = VideoLibrary::new_initialized(temp.path().to_path_buf()).unwrap();
        let src = temp.path().join("src.bin");
        fs::write(&src, vec![0u8; 64]).unwrap();

        library.store(&request("one"), &src).unwrap();
        library.store(&request("two"), &src).unwrap();
        fs::write(temp.path().join("notes.txt"), b"ignore").unwrap();

        let entries = library.list_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.size_bytes == 64));
        assert!(entries.windows(2).all(|w| w[0].hash <= w[1].hash));
        assert_eq!(library.total_size_bytes().unwrap(), 128);
    }

    #[test]
    fn test_list_entries_nonexistent_dir() {
        let library = VideoLibrary::new(PathBuf::from("/nonexistent/veo-director-test"));
        assert!(library.list_entries().unwrap().is_empty());
        assert_eq!(library.clear_all().unwrap(), 0);
    }

    #[test]
    fn test_remove_existing_and_missing() {
        let temp = TempDir::new().unwrap();
        let library = VideoLibrary::new_initialized(temp.path().to_path_buf()).unwrap();
        let src = temp.path().join("src.bin");
        fs::write(&src, b"x").unwrap();
        let req = request("remove me");
        library.store(&req, &src).unwrap();
        let hash = VideoLibrary::hash_request(&req);

        assert!(library.remove(&hash).unwrap());
        assert!(library.get(&req).is_none());
        assert!(library.metadata(&hash).is_none());
        assert!(!library.remove(&hash).unwrap());
    }

    #[test]
    fn test_clear_all_removes_videos_and_sidecars() {
        let temp = TempDir::new().unwrap();
        let library = VideoLibrary::new_initialized(temp.path().join("lib")).unwrap();
        let src = temp.path().join("src.bin");
        fs::write(&src, b"x").unwrap();
        library.store(&request("a"), &src).unwrap();
        library.store(&request("b"), &src).unwrap();

        assert_eq!(library.clear_all().unwrap(), 2);
        assert_eq!(fs::read_dir(library.dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_cleanup_if_needed_evicts_oldest() {
        let temp = TempDir::new().unwrap();
        let library = VideoLibrary::new_initialized(temp.path().join("lib")).unwrap();
        let src = temp.path().join("src.bin");
        fs::write(&src, vec![0u8; 700 * 1024]).unwrap();

        let old = request("old");
        library.store(&old, &src).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        let new = request("new");
        library.store(&new, &src).unwrap();

        library.cleanup_if_needed(1).unwrap();

        assert!(library.get(&old).is_none());
        assert!(library.get(&new).is_some());
    }

    #[test]
    fn test_cleanup_under_limit_keeps_everything() {
        let temp = TempDir::new().unwrap();
        let library = VideoLibrary::new_initialized(temp.path().to_path_buf()).unwrap();
        let src = temp.path().join("src.bin");
        fs::write(&src, b"small").unwrap();
        library.store(&request("keep"), &src).unwrap();

        library.cleanup_if_needed(10).unwrap();
        assert_eq!(library.list_entries().unwrap().len(), 1);
    }
}
