use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use serde::{Deserialize, Serialize};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{CodecError, CodecResult};

/// Reserved archive entry holding the manifest.
const MANIFEST_ENTRY: &str = "MANIFEST.json";

/// One file recorded in an artifact manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub path: String,
    pub size: u64,
    pub mime: String,
    /// BLAKE3-256 of the file contents, lowercase hex.
    pub content_hash: String,
}

/// Artifact manifest: name, version, file listing, dependencies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: String,
    pub version: String,
    pub files: Vec<ArtifactFile>,
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Builder for artifact payloads.
///
/// The encoded form is a ZIP archive whose first entry is the manifest;
/// each manifest file becomes a deflated entry keyed by its path.
pub struct ArtifactPayload {
    name: String,
    version: String,
    dependencies: Vec<String>,
    files: Vec<(ArtifactFile, Vec<u8>)>,
}

impl ArtifactPayload {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            dependencies: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Add a file; size and content hash are derived from the bytes.
    pub fn add_file(mut self, path: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        let path = path.into();
        let entry = ArtifactFile {
            size: data.len() as u64,
            content_hash: blake3::hash(&data).to_hex().to_string(),
            mime: mime.into(),
            path,
        };
        self.files.push((entry, data));
        self
    }

    /// Encode to the ZIP wire form.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let manifest = ArtifactManifest {
            name: self.name.clone(),
            version: self.version.clone(),
            files: self.files.iter().map(|(f, _)| f.clone()).collect(),
            dependencies: self.dependencies.clone(),
            metadata: BTreeMap::new(),
        };
        let manifest_json = serde_json::to_vec(&manifest)
            .map_err(|e| CodecError::Archive(e.to_string()))?;

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            let options: FileOptions =
                FileOptions::default().compression_method(CompressionMethod::Deflated);

            writer
                .start_file(MANIFEST_ENTRY, options)
                .map_err(|e| CodecError::Archive(e.to_string()))?;
            writer
                .write_all(&manifest_json)
                .map_err(|e| CodecError::Archive(e.to_string()))?;

            for (entry, data) in &self.files {
                writer
                    .start_file(&entry.path, options)
                    .map_err(|e| CodecError::Archive(e.to_string()))?;
                writer
                    .write_all(data)
                    .map_err(|e| CodecError::Archive(e.to_string()))?;
            }
            writer
                .finish()
                .map_err(|e| CodecError::Archive(e.to_string()))?;
        }
        Ok(cursor.into_inner())
    }
}

/// Read side of an artifact payload.
///
/// Opening reads only the central directory and the manifest entry; file
/// contents are decompressed lazily, one entry at a time.
#[derive(Debug)]
pub struct ArtifactReader {
    manifest: ArtifactManifest,
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl ArtifactReader {
    /// Open an encoded artifact and validate its manifest.
    pub fn open(data: &[u8]) -> CodecResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(data.to_vec()))
            .map_err(|e| CodecError::Archive(e.to_string()))?;

        let manifest: ArtifactManifest = {
            let mut entry = archive
                .by_name(MANIFEST_ENTRY)
                .map_err(|_| CodecError::MissingManifest)?;
            let mut buf = Vec::new();
            entry
                .read_to_end(&mut buf)
                .map_err(|e| CodecError::Archive(e.to_string()))?;
            serde_json::from_slice(&buf).map_err(|e| CodecError::Archive(e.to_string()))?
        };

        // Every manifest entry must exist in the archive; contents are not
        // decompressed here.
        for file in &manifest.files {
            if archive.by_name(&file.path).is_err() {
                return Err(CodecError::MissingEntry(file.path.clone()));
            }
        }

        Ok(Self { manifest, archive })
    }

    /// The validated manifest.
    pub fn manifest(&self) -> &ArtifactManifest {
        &self.manifest
    }

    /// Extract one file, verifying its recorded content hash.
    pub fn read_file(&mut self, path: &str) -> CodecResult<Vec<u8>> {
        let expected = self
            .manifest
            .files
            .iter()
            .find(|f| f.path == path)
            .ok_or_else(|| CodecError::MissingEntry(path.to_string()))?
            .content_hash
            .clone();

        let mut entry = self
            .archive
            .by_name(path)
            .map_err(|_| CodecError::MissingEntry(path.to_string()))?;
        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .map_err(|e| CodecError::Archive(e.to_string()))?;

        let actual = blake3::hash(&buf).to_hex().to_string();
        if actual != expected {
            return Err(CodecError::EntryHash {
                path: path.to_string(),
                expected,
                actual,
            });
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        ArtifactPayload::new("resnet-weights", "1.2.0")
            .with_dependency("numpy>=1.20")
            .add_file("weights.bin", "application/octet-stream", vec![7u8; 1024])
            .add_file("config.json", "application/json", br#"{"layers":50}"#.to_vec())
            .encode()
            .unwrap()
    }

    #[test]
    fn manifest_roundtrip() {
        let encoded = sample();
        let reader = ArtifactReader::open(&encoded).unwrap();
        let manifest = reader.manifest();
        assert_eq!(manifest.name, "resnet-weights");
        assert_eq!(manifest.version, "1.2.0");
        assert_eq!(manifest.dependencies, vec!["numpy>=1.20"]);
        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.files[0].path, "weights.bin");
        assert_eq!(manifest.files[0].size, 1024);
    }

    #[test]
    fn read_file_verifies_hash() {
        let encoded = sample();
        let mut reader = ArtifactReader::open(&encoded).unwrap();
        assert_eq!(reader.read_file("weights.bin").unwrap(), vec![7u8; 1024]);
        assert_eq!(reader.read_file("config.json").unwrap(), br#"{"layers":50}"#.to_vec());
    }

    #[test]
    fn missing_file_rejected() {
        let encoded = sample();
        let mut reader = ArtifactReader::open(&encoded).unwrap();
        assert!(matches!(
            reader.read_file("nope.txt").unwrap_err(),
            CodecError::MissingEntry(_)
        ));
    }

    #[test]
    fn garbage_is_not_an_archive() {
        assert!(matches!(
            ArtifactReader::open(b"definitely not a zip").unwrap_err(),
            CodecError::Archive(_)
        ));
    }

    #[test]
    fn archive_without_manifest_rejected() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            writer
                .start_file("data.bin", FileOptions::default())
                .unwrap();
            writer.write_all(b"some data").unwrap();
            writer.finish().unwrap();
        }
        assert!(matches!(
            ArtifactReader::open(&cursor.into_inner()).unwrap_err(),
            CodecError::MissingManifest
        ));
    }

    #[test]
    fn manifest_entry_missing_from_archive_rejected() {
        // Hand-build an archive whose manifest lists a file that is absent.
        let manifest = ArtifactManifest {
            name: "broken".into(),
            version: "0.1".into(),
            files: vec![ArtifactFile {
                path: "ghost.bin".into(),
                size: 4,
                mime: "application/octet-stream".into(),
                content_hash: blake3::hash(b"ghost").to_hex().to_string(),
            }],
            dependencies: vec![],
            metadata: BTreeMap::new(),
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut cursor);
            writer
                .start_file(MANIFEST_ENTRY, FileOptions::default())
                .unwrap();
            writer
                .write_all(&serde_json::to_vec(&manifest).unwrap())
                .unwrap();
            writer.finish().unwrap();
        }
        assert!(matches!(
            ArtifactReader::open(&cursor.into_inner()).unwrap_err(),
            CodecError::MissingEntry(_)
        ));
    }

    #[test]
    fn empty_artifact_is_valid() {
        let encoded = ArtifactPayload::new("empty", "0.0.1").encode().unwrap();
        let reader = ArtifactReader::open(&encoded).unwrap();
        assert!(reader.manifest().files.is_empty());
    }
}
