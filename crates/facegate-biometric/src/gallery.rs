//! Enrollment directory: one reference image per identity.
//!
//! The file stem is the identity (`db/bob.jpg` enrolls `bob`). Files are
//! written once at registration and only replaced by registering the same
//! name again.

use crate::engine::ReferenceImage;
use crate::error::{BiometricError, DataError, Result};
use facegate_core::Identity;
use facegate_core::constants::{REFERENCE_EXTENSIONS, REGISTRATION_EXTENSION};
use image::{ImageFormat, RgbImage};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Reference images stored in one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gallery {
    dir: PathBuf,
}

impl Gallery {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the reference for `identity` is registered.
    pub fn path_for(&self, identity: &Identity) -> PathBuf {
        self.dir
            .join(format!("{}.{}", identity.as_str(), REGISTRATION_EXTENSION))
    }

    /// Load every reference image, sorted by identity.
    ///
    /// Files that fail to decode are returned as corrupt entries. Files whose
    /// stem is not a valid identity are ignored. A missing directory is an
    /// empty gallery.
    ///
    /// # Errors
    /// Returns `BiometricError::Io` if the directory exists but cannot be
    /// listed.
    pub fn load(&self) -> Result<Vec<ReferenceImage>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Enrollment directory {} does not exist", self.dir.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut found: Vec<(Identity, PathBuf)> = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || !is_reference_file(&path) {
                continue;
            }

            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                debug!("Ignoring non UTF-8 file name {}", path.display());
                continue;
            };
            match Identity::new(stem) {
                Ok(identity) => found.push((identity, path)),
                Err(e) => debug!("Ignoring {}: {}", path.display(), e),
            }
        }
        found.sort();

        let references: Vec<ReferenceImage> = found
            .into_iter()
            .map(|(identity, path)| match image::open(&path) {
                Ok(image) => ReferenceImage::new(identity, image.to_rgb8()),
                Err(e) => {
                    warn!("Cannot decode {}: {}", path.display(), e);
                    ReferenceImage::corrupt(identity, DataError::new(&path, e.to_string()))
                }
            })
            .collect();

        debug!(
            "Loaded {} references from {}",
            references.len(),
            self.dir.display()
        );
        Ok(references)
    }

    /// Enroll `raster` under `name`, replacing any earlier registration.
    ///
    /// The name is validated before anything touches the disk. Earlier
    /// references for the same name are removed whatever their extension, so
    /// only the new raster answers to it.
    ///
    /// # Errors
    /// - `BiometricError::Validation` for an unusable name.
    /// - `BiometricError::EmptyImage` for a zero-sized raster.
    /// - `BiometricError::Io` / `BiometricError::Image` if writing fails.
    pub fn register(&self, name: &str, raster: &RgbImage) -> Result<Identity> {
        let identity = Identity::new(name)?;
        if raster.width() == 0 || raster.height() == 0 {
            return Err(BiometricError::EmptyImage);
        }

        fs::create_dir_all(&self.dir)?;
        self.remove_references(&identity)?;
        let path = self.path_for(&identity);
        raster.save_with_format(&path, ImageFormat::Jpeg)?;

        info!("Registered {} at {}", identity, path.display());
        Ok(identity)
    }

    fn remove_references(&self, identity: &Identity) -> Result<()> {
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let same_stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem == identity.as_str());
            if same_stem && path.is_file() && is_reference_file(&path) {
                debug!("Removing previous reference {}", path.display());
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

fn is_reference_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            REFERENCE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}
