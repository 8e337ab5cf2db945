use sha2::{Digest, Sha256};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::SynthesisError;
use crate::model::ArtifactBundle;

/// One named text file inside an artifact archive
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveFile {
    pub path: String,
    pub content: String,
}

impl ArchiveFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Packs named text files into archive bytes
pub trait ArchivePacker: Send + Sync {
    fn pack(&self, files: &[ArchiveFile]) -> Result<Vec<u8>, SynthesisError>;
}

/// Deflate-compressed zip archives
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipPacker;

impl ArchivePacker for ZipPacker {
    fn pack(&self, files: &[ArchiveFile]) -> Result<Vec<u8>, SynthesisError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for file in files {
            writer.start_file(file.path.as_str(), options)?;
            writer.write_all(file.content.as_bytes())?;
        }

        Ok(writer.finish()?.into_inner())
    }
}

/// A packed archive ready for import
#[derive(Debug, Clone, PartialEq)]
pub struct PackagedArtifact {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// `<provider>-<name>-<version>.zip`
pub fn archive_name(provider: &str, bundle: &ArtifactBundle) -> String {
    format!("{}-{}-{}.zip", provider, bundle.api_name, bundle.api_version)
}

/// Render the bundle's documents as YAML files under `<name>-<version>/`.
///
/// The endpoint document is only included when the bundle carries one.
pub fn bundle_files(bundle: &ArtifactBundle) -> Result<Vec<ArchiveFile>, SynthesisError> {
    let root = bundle.root_dir();
    let mut files = vec![ArchiveFile::new(
        format!("{}/api.yaml", root),
        serde_yaml::to_string(&bundle.api).map_err(SynthesisError::yaml("api.yaml"))?,
    )];

    if let Some(endpoints) = &bundle.endpoints {
        files.push(ArchiveFile::new(
            format!("{}/endpoints.yaml", root),
            serde_yaml::to_string(endpoints).map_err(SynthesisError::yaml("endpoints.yaml"))?,
        ));
    }

    files.push(ArchiveFile::new(
        format!("{}/deployment_environments.yaml", root),
        serde_yaml::to_string(&bundle.deployment_environments)
            .map_err(SynthesisError::yaml("deployment_environments.yaml"))?,
    ));
    files.push(ArchiveFile::new(
        bundle.definition_path(),
        bundle.definition.clone(),
    ));

    Ok(files)
}

pub fn package(
    packer: &dyn ArchivePacker,
    provider: &str,
    bundle: &ArtifactBundle,
) -> Result<PackagedArtifact, SynthesisError> {
    let files = bundle_files(bundle)?;
    let bytes = packer.pack(&files)?;
    let name = archive_name(provider, bundle);

    log::debug!(
        "Packed {} files into {} ({} bytes, sha256 {})",
        files.len(),
        name,
        bytes.len(),
        hex::encode(Sha256::digest(&bytes))
    );

    Ok(PackagedArtifact { name, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlPlaneConfig;
    use crate::logic::synthesize::ArtifactSynthesizer;
    use crate::model::{ApiDescriptor, EndpointEntry, MultiEndpoints};
    use std::io::Read;

    fn api() -> ApiDescriptor {
        ApiDescriptor {
            api_uuid: "pets-uuid".to_string(),
            api_name: "pets".to_string(),
            api_version: "1.0".to_string(),
            base_path: "/pets/1.0".to_string(),
            prod_endpoint: "api.example.com".to_string(),
            ..Default::default()
        }
    }

    fn read_archive(bytes: &[u8]) -> zip::ZipArchive<Cursor<Vec<u8>>> {
        zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap()
    }

    #[test]
    fn test_zip_packer_round_trips_contents() {
        let files = vec![
            ArchiveFile::new("a/one.yaml", "one: 1\n"),
            ArchiveFile::new("a/Definitions/two.yaml", "two: 2\n"),
        ];
        let bytes = ZipPacker.pack(&files).unwrap();

        let mut archive = read_archive(&bytes);
        let mut content = String::new();
        archive
            .by_name("a/Definitions/two.yaml")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "two: 2\n");
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn test_layout_without_endpoint_document() {
        let control_plane = ControlPlaneConfig::default();
        let bundle = ArtifactSynthesizer::new(&control_plane).synthesize(&api()).unwrap();

        let packaged = package(&ZipPacker, "admin", &bundle).unwrap();
        assert_eq!(packaged.name, "admin-pets-1.0.zip");

        let archive = read_archive(&packaged.bytes);
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "pets-1.0/Definitions/swagger.yaml",
                "pets-1.0/api.yaml",
                "pets-1.0/deployment_environments.yaml",
            ]
        );
    }

    #[test]
    fn test_layout_with_endpoint_document() {
        let mut api = api();
        api.multi_endpoints = MultiEndpoints {
            protocol: "https".to_string(),
            prod_endpoints: vec![
                EndpointEntry { url: "p1".to_string(), ..Default::default() },
                EndpointEntry { url: "p2".to_string(), ..Default::default() },
            ],
            sand_endpoints: Vec::new(),
        };
        let control_plane = ControlPlaneConfig::default();
        let bundle = ArtifactSynthesizer::new(&control_plane).synthesize(&api).unwrap();

        let files = bundle_files(&bundle).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "pets-1.0/api.yaml",
                "pets-1.0/endpoints.yaml",
                "pets-1.0/deployment_environments.yaml",
                "pets-1.0/Definitions/swagger.yaml",
            ]
        );
        assert!(files[0].content.starts_with("type: api\nversion: v4.6.0\n"));
        assert!(files[1].content.contains("deploymentStage: PRODUCTION"));
    }
}
