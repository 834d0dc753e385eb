use crate::error::{RelsyncError, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Tar,
    TarGz,
    Zip,
}

impl ArchiveKind {
    /// Detect the archive type from a file name.
    pub fn detect(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".tar") {
            Some(Self::Tar)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

pub fn is_archive(name: &str) -> bool {
    ArchiveKind::detect(name).is_some()
}

/// Unpack `archive` into `dest`, dispatching on the file name.
pub fn extract(archive: &Path, dest: &Path) -> Result<()> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = ArchiveKind::detect(&name).ok_or_else(|| archive_err(archive, "not an archive"))?;
    std::fs::create_dir_all(dest)?;
    let file = File::open(archive)?;
    match kind {
        ArchiveKind::Tar => tar::Archive::new(file)
            .unpack(dest)
            .map_err(|e| archive_err(archive, e))?,
        ArchiveKind::TarGz => tar::Archive::new(GzDecoder::new(file))
            .unpack(dest)
            .map_err(|e| archive_err(archive, e))?,
        ArchiveKind::Zip => zip::ZipArchive::new(file)
            .and_then(|mut z| z.extract(dest))
            .map_err(|e| archive_err(archive, e))?,
    }
    Ok(())
}

fn archive_err(path: &Path, reason: impl std::fmt::Display) -> RelsyncError {
    RelsyncError::Archive {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
