//! Zip archives for directory downloads.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use lanyue_core::error::AppError;
use lanyue_core::result::AppResult;
use lanyue_core::types::VirtualPath;

use crate::vfs::Vfs;

/// One archive member: name inside the zip and its source on disk.
struct Member {
    name: String,
    source: PathBuf,
    is_dir: bool,
}

/// Write every entry below `dir` into a new zip file in `temp_dir` and
/// return its path. Member names are relative to `dir`. The caller owns
/// the file and deletes it once it has been served.
pub async fn zip_directory(vfs: &Vfs, dir: &VirtualPath, temp_dir: &Path) -> AppResult<PathBuf> {
    if !vfs.is_dir(dir).await? {
        return Err(AppError::path_not_found(dir));
    }
    let depth = dir.segments().len();
    let mut members = Vec::new();
    for entry in vfs.walk(dir).await? {
        let name = entry.path.segments()[depth..].join("/");
        members.push(Member {
            name,
            source: vfs.physical_path(&entry.path).await?,
            is_dir: entry.is_dir,
        });
    }

    tokio::fs::create_dir_all(temp_dir).await?;
    let stem = dir.file_name().unwrap_or("archive");
    let target = temp_dir.join(format!("{stem}__{}.zip", Uuid::now_v7().simple()));
    let output = target.clone();
    let count = members.len();

    tokio::task::spawn_blocking(move || write_archive(&output, members))
        .await
        .map_err(|e| AppError::internal(format!("Archive task failed: {e}")))??;

    info!(dir = %dir, archive = %target.display(), entries = count, "Created directory archive");
    Ok(target)
}

fn write_archive(target: &Path, members: Vec<Member>) -> AppResult<()> {
    let file = File::create(target)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(true);

    for member in members {
        if member.is_dir {
            writer.add_directory(format!("{}/", member.name), options).map_err(zip_error)?;
            continue;
        }
        writer.start_file(member.name.as_str(), options).map_err(zip_error)?;
        let mut source = File::open(&member.source)?;
        std::io::copy(&mut source, &mut writer)?;
    }

    let mut inner = writer.finish().map_err(zip_error)?;
    inner.flush()?;
    Ok(())
}

fn zip_error(e: zip::result::ZipError) -> AppError {
    AppError::internal(format!("Failed to write archive: {e}"))
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::sync::Arc;

    use lanyue_entity::storage::OrderField;

    use super::*;
    use crate::mount::{MountPoint, MountTable};
    use crate::providers::local::LocalBackend;

    #[tokio::test]
    async fn test_zip_directory_keeps_relative_names() {
        let data = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(data.path().join("photos/2024/empty")).unwrap();
        std::fs::write(data.path().join("photos/a.txt"), b"alpha").unwrap();
        std::fs::write(data.path().join("photos/2024/b.txt"), b"beta").unwrap();

        let table = MountTable::new();
        table
            .mount(MountPoint {
                name: "home".into(),
                backend: Arc::new(LocalBackend::new(data.path()).await.unwrap()),
                capacity: 1 << 20,
                order_field: OrderField::Name,
                reverse: false,
            })
            .await
            .unwrap();
        let vfs = Vfs::new(table);

        let dir = VirtualPath::parse("/home/photos").unwrap();
        let archive = zip_directory(&vfs, &dir, temp.path()).await.unwrap();
        assert!(archive.starts_with(temp.path()));

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut names: Vec<_> = zip.file_names().map(String::from).collect();
        names.sort();
        assert_eq!(names, vec!["2024/", "2024/b.txt", "2024/empty/", "a.txt"]);

        let mut content = String::new();
        zip.by_name("2024/b.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "beta");
    }
}
