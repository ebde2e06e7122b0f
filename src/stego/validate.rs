//! Carrier path validation and output naming.

use std::path::{Path, PathBuf};

use crate::error::{Result, StegoError};

/// Image extensions accepted as carriers.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Audio extensions accepted as carriers.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "wave"];

/// Suffix appended to the carrier stem for generated output names.
const OUTPUT_SUFFIX: &str = "_hidden";

/// Carrier family, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierKind {
    Image,
    Audio,
}

impl CarrierKind {
    /// Classifies a path by its (case-insensitive) extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = extension(path);
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Image)
        } else if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Audio)
        } else {
            Err(StegoError::Validation(format!(
                "unsupported carrier format: {}",
                path.display()
            )))
        }
    }

    /// Whether `path` has an extension this codec can write to.
    pub fn is_output_path(&self, path: &Path) -> bool {
        let ext = extension(path);
        match self {
            Self::Image => ext == self.output_extension(),
            Self::Audio => AUDIO_EXTENSIONS.contains(&ext.as_str()),
        }
    }

    /// Extension of the files this codec writes.
    pub fn output_extension(&self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Audio => "wav",
        }
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Checks that the carrier exists, is a regular file of the expected
/// family, and is no larger than `max_size` bytes when a limit is given.
pub fn validate_carrier(path: &Path, kind: CarrierKind, max_size: Option<u64>) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|_| {
        StegoError::Validation(format!("carrier does not exist: {}", path.display()))
    })?;

    if !metadata.is_file() {
        return Err(StegoError::Validation(format!(
            "carrier is not a file: {}",
            path.display()
        )));
    }

    if CarrierKind::from_path(path)? != kind {
        return Err(StegoError::Validation(format!(
            "{} is not a {:?} carrier",
            path.display(),
            kind
        )));
    }

    if let Some(limit) = max_size {
        if metadata.len() > limit {
            return Err(StegoError::Validation(format!(
                "carrier is {} bytes, limit is {}",
                metadata.len(),
                limit
            )));
        }
    }

    Ok(())
}

/// Returns `<dir>/<stem>_hidden.<ext>`, or `<stem>_hidden_<n>.<ext>` with the
/// first `n` that does not exist yet.
pub fn fresh_output_path(carrier: &Path, ext: &str) -> PathBuf {
    let dir = carrier.parent().unwrap_or_else(|| Path::new(""));
    let stem = carrier
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "carrier".to_string());

    let candidate = dir.join(format!("{stem}{OUTPUT_SUFFIX}.{ext}"));
    if !candidate.exists() {
        return candidate;
    }

    (1..)
        .map(|n| dir.join(format!("{stem}{OUTPUT_SUFFIX}_{n}.{ext}")))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

/// Rejects an output path that would overwrite the carrier itself.
pub fn ensure_distinct_output(carrier: &Path, output: &Path) -> Result<()> {
    let same = match (carrier.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => carrier == output,
    };
    if same {
        return Err(StegoError::Validation(format!(
            "output would overwrite the carrier: {}",
            output.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(CarrierKind::from_path(Path::new("a.PNG")).unwrap(), CarrierKind::Image);
        assert_eq!(CarrierKind::from_path(Path::new("a.jpeg")).unwrap(), CarrierKind::Image);
        assert_eq!(CarrierKind::from_path(Path::new("a.wav")).unwrap(), CarrierKind::Audio);
        assert_eq!(CarrierKind::from_path(Path::new("a.Wave")).unwrap(), CarrierKind::Audio);
        assert!(matches!(
            CarrierKind::from_path(Path::new("a.mp3")),
            Err(StegoError::Validation(_))
        ));
        assert!(CarrierKind::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_output_paths() {
        assert!(CarrierKind::Image.is_output_path(Path::new("out.PNG")));
        assert!(!CarrierKind::Image.is_output_path(Path::new("out.jpg")));
        assert!(CarrierKind::Audio.is_output_path(Path::new("out.wave")));
        assert!(!CarrierKind::Audio.is_output_path(Path::new("out.png")));
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_carrier(Path::new("/no/such/file.png"), CarrierKind::Image, None);
        assert!(matches!(result, Err(StegoError::Validation(_))));
    }

    #[test]
    fn test_validate_size_limit_and_kind() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, vec![0u8; 100]).unwrap();

        assert!(validate_carrier(&path, CarrierKind::Audio, Some(100)).is_ok());
        assert!(matches!(
            validate_carrier(&path, CarrierKind::Audio, Some(99)),
            Err(StegoError::Validation(_))
        ));
        assert!(matches!(
            validate_carrier(&path, CarrierKind::Image, None),
            Err(StegoError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_directory_rejected() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("folder.png");
        std::fs::create_dir(&sub).unwrap();

        assert!(validate_carrier(&sub, CarrierKind::Image, None).is_err());
    }

    #[test]
    fn test_fresh_output_path_never_collides() {
        let dir = tempdir().unwrap();
        let carrier = dir.path().join("photo.jpg");

        let first = fresh_output_path(&carrier, "png");
        assert_eq!(first, dir.path().join("photo_hidden.png"));

        std::fs::write(&first, b"x").unwrap();
        let second = fresh_output_path(&carrier, "png");
        assert_eq!(second, dir.path().join("photo_hidden_1.png"));
    }

    #[test]
    fn test_output_must_differ_from_carrier() {
        let dir = tempdir().unwrap();
        let carrier = dir.path().join("song.wav");
        std::fs::write(&carrier, b"x").unwrap();

        assert!(ensure_distinct_output(&carrier, &carrier).is_err());
        assert!(ensure_distinct_output(&carrier, &dir.path().join("other.wav")).is_ok());
    }
}
