//! Image storage seam: load a saved capture for scoring, or discard it.

use crate::types::ImageHandle;
use image::RgbImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("image not found: {0}")]
    NotFound(ImageHandle),
    #[error("failed to decode {handle}: {source}")]
    Decode {
        handle: ImageHandle,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to remove {handle}: {source}")]
    Remove {
        handle: ImageHandle,
        #[source]
        source: std::io::Error,
    },
    #[error("image store lock poisoned")]
    Poisoned,
}

pub trait ImageStore: Send + Sync {
    fn load(&self, handle: &ImageHandle) -> Result<RgbImage, StoreError>;

    fn discard(&self, handle: &ImageHandle) -> Result<(), StoreError>;
}

/// Handles are file paths relative to `root` (absolute paths pass through).
#[derive(Debug, Clone)]
pub struct DiskImageStore {
    root: PathBuf,
}

impl DiskImageStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, handle: &ImageHandle) -> PathBuf {
        self.root.join(handle.as_str())
    }
}

impl ImageStore for DiskImageStore {
    fn load(&self, handle: &ImageHandle) -> Result<RgbImage, StoreError> {
        let path = self.path_for(handle);
        if !path.exists() {
            return Err(StoreError::NotFound(handle.clone()));
        }
        let img = image::open(&path).map_err(|source| StoreError::Decode {
            handle: handle.clone(),
            source,
        })?;
        Ok(img.to_rgb8())
    }

    fn discard(&self, handle: &ImageHandle) -> Result<(), StoreError> {
        let path = self.path_for(handle);
        std::fs::remove_file(&path).map_err(|source| StoreError::Remove {
            handle: handle.clone(),
            source,
        })?;
        log::debug!("Discarded {:?}", path);
        Ok(())
    }
}

/// In-process store, shared between a simulated camera and the session.
#[derive(Debug, Clone, Default)]
pub struct MemoryImageStore {
    images: Arc<Mutex<HashMap<ImageHandle, RgbImage>>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: ImageHandle, image: RgbImage) -> Result<(), StoreError> {
        self.images
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .insert(handle, image);
        Ok(())
    }

    pub fn contains(&self, handle: &ImageHandle) -> bool {
        self.images
            .lock()
            .map(|g| g.contains_key(handle))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.images.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn handles(&self) -> Vec<ImageHandle> {
        let mut handles: Vec<ImageHandle> = self
            .images
            .lock()
            .map(|g| g.keys().cloned().collect())
            .unwrap_or_default();
        handles.sort_by(|a, b| a.0.cmp(&b.0));
        handles
    }
}

impl ImageStore for MemoryImageStore {
    fn load(&self, handle: &ImageHandle) -> Result<RgbImage, StoreError> {
        self.images
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .get(handle)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(handle.clone()))
    }

    fn discard(&self, handle: &ImageHandle) -> Result<(), StoreError> {
        self.images
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .remove(handle)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(handle.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryImageStore::new();
        let h = ImageHandle::new("p_Right_1.jpg");
        store.insert(h.clone(), RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))).unwrap();
        assert_eq!(store.load(&h).unwrap().dimensions(), (4, 4));
        store.discard(&h).unwrap();
        assert!(store.is_empty());
        assert!(matches!(store.load(&h), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_disk_store_load_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path());
        let h = ImageHandle::new("shot.png");
        RgbImage::from_pixel(8, 6, Rgb([10, 20, 30]))
            .save(store.path_for(&h))
            .unwrap();

        let img = store.load(&h).unwrap();
        assert_eq!(img.dimensions(), (8, 6));
        store.discard(&h).unwrap();
        assert!(!store.path_for(&h).exists());
        assert!(matches!(store.load(&h), Err(StoreError::NotFound(_))));
    }
}
