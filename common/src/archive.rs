// Tar-gzip packing, validation and unpacking of dump directories

use crate::errors::ArchiveError;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tar::Archive;

/// Pack a directory into a gzip-compressed tar archive.
///
/// Entries are stored relative to the directory root so unpacking into an
/// empty directory reproduces the original layout.
pub fn pack_dir(source: &Path, dest: &Path) -> Result<(), ArchiveError> {
    if !source.is_dir() {
        return Err(ArchiveError::Io(format!(
            "source directory missing: {}",
            source.display()
        )));
    }

    let file = File::create(dest)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(".", source)?;

    let encoder = builder.into_inner()?;
    let mut writer = encoder.finish()?;
    writer.flush()?;
    Ok(())
}

/// Validate that a file is a readable gzip/tar stream with at least one
/// entry. The whole stream is consumed so truncated archives are caught.
pub fn validate(path: &Path) -> Result<(), ArchiveError> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = Archive::new(decoder);

    let mut entries = 0usize;
    for entry in archive
        .entries()
        .map_err(|e| ArchiveError::Corrupt(e.to_string()))?
    {
        entry.map_err(|e| ArchiveError::Corrupt(e.to_string()))?;
        entries += 1;
    }
    if entries == 0 {
        return Err(ArchiveError::Empty);
    }
    Ok(())
}

/// Unpack an archive into the destination directory
pub fn unpack(archive_path: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = Archive::new(decoder);
    archive
        .unpack(dest)
        .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;
    Ok(())
}

/// Base64-encoded MD5 digest of a file, the value S3 expects in Content-MD5
pub fn file_md5_base64(path: &Path) -> Result<String, ArchiveError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut context = md5::Context::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buf)?;
        if read == 0 {
            break;
        }
        context.consume(&buf[..read]);
    }
    Ok(B64.encode(context.compute().0))
}
