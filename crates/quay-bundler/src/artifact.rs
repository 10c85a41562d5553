//! Build artifacts on disk.
//!
//! Layout for an outfile `dist/index.android.js`:
//!
//! - bundle: `dist/index.android.js`
//! - sourcemap: `dist/index.android.js.map`
//! - metafile: `dist/index.android.meta.json`
//! - compressed: `dist/index.android.js.gz`
//!
//! A missing file passed to [`compress_artifact`] is an error, while a missing
//! directory passed to [`clean_dir`] is not.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use tokio::fs;

use crate::engine::BuildResult;
use crate::error::ArtifactError;

pub const SOURCEMAP_SUFFIX: &str = ".map";
pub const METAFILE_EXTENSION: &str = "meta.json";
pub const COMPRESSED_SUFFIX: &str = ".gz";

type Result<T> = std::result::Result<T, ArtifactError>;

/// Path of the metafile written next to `outfile`.
pub fn metafile_path(outfile: &Path) -> PathBuf {
    outfile.with_extension(METAFILE_EXTENSION)
}

/// Write a result's bundle, and its sourcemap when there is one.
///
/// Returns the bundle path.
pub async fn write_bundle(result: &BuildResult) -> Result<PathBuf> {
    write_atomic(&result.outfile, &result.bundle).await?;

    if let Some(sourcemap) = &result.sourcemap {
        write_atomic(&with_suffix(&result.outfile, SOURCEMAP_SUFFIX), sourcemap).await?;
    }

    tracing::debug!(path = %result.outfile.display(), bytes = result.bundle.len(), "wrote bundle");
    Ok(result.outfile.clone())
}

/// Write the metafile for `outfile`. Returns `None` when there is nothing to write.
pub async fn write_metafile(outfile: &Path, metafile: Option<&Value>) -> Result<Option<PathBuf>> {
    let Some(metafile) = metafile else {
        return Ok(None);
    };

    let path = metafile_path(outfile);
    let content = serde_json::to_vec_pretty(metafile).map_err(|source| ArtifactError::Serialize {
        path: path.clone(),
        source,
    })?;
    write_atomic(&path, &content).await?;

    Ok(Some(path))
}

/// Gzip `path` at maximum compression into `<path>.gz`.
///
/// Fails with [`ArtifactError::Missing`] when `path` does not exist. A partial
/// output is removed if compression fails midway.
pub async fn compress_artifact(path: impl AsRef<Path>) -> Result<PathBuf> {
    let source = path.as_ref().to_path_buf();
    let target = with_suffix(&source, COMPRESSED_SUFFIX);

    let (source, target) = tokio::task::spawn_blocking(move || {
        gzip_file(&source, &target)?;
        Ok::<_, ArtifactError>((source, target))
    })
    .await
    .map_err(|err| ArtifactError::io(path.as_ref(), io::Error::other(err)))??;

    tracing::debug!(source = %source.display(), target = %target.display(), "compressed artifact");
    Ok(target)
}

/// Remove a directory tree. A directory that does not exist is already clean.
pub async fn clean_dir(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(ArtifactError::io(dir, err)),
    }
}

fn gzip_file(source: &Path, target: &Path) -> Result<()> {
    let input = match File::open(source) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ArtifactError::Missing {
                path: source.to_path_buf(),
            })
        }
        Err(err) => return Err(ArtifactError::io(source, err)),
    };

    let output = File::create(target).map_err(|err| ArtifactError::io(target, err))?;

    let result = (|| {
        let mut reader = BufReader::new(input);
        let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::best());
        io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.flush()
    })();

    result.map_err(|err| {
        let _ = std::fs::remove_file(target);
        ArtifactError::io(target, err)
    })
}

async fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|err| ArtifactError::io(parent, err))?;
    }

    let temp = with_suffix(path, ".tmp");
    if let Err(err) = fs::write(&temp, content).await {
        let _ = fs::remove_file(&temp).await;
        return Err(ArtifactError::io(&temp, err));
    }
    if let Err(err) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(ArtifactError::io(path, err));
    }

    Ok(())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metafile_replaces_the_extension() {
        assert_eq!(
            metafile_path(Path::new("dist/index.android.js")),
            PathBuf::from("dist/index.android.meta.json")
        );
    }

    #[test]
    fn suffixes_are_appended() {
        assert_eq!(
            with_suffix(Path::new("dist/index.ios.js"), COMPRESSED_SUFFIX),
            PathBuf::from("dist/index.ios.js.gz")
        );
    }
}
