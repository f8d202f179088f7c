use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::package::{BuildRequest, TARGET_FRAMEWORK};

/// 1x1 transparent PNG used for embedded icons.
const ICON_PNG: [u8; 68] = [
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0xb5, 0x1c, 0x0c,
    0x02, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0xda, 0x63, 0x64, 0x60, 0x00, 0x00,
    0x00, 0x06, 0x00, 0x02, 0x30, 0x81, 0xd0, 0x2f, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e, 0x44,
    0xae, 0x42, 0x60, 0x82,
];

const PLACEHOLDER_LIBRARY: &[u8] = b"placeholder library for end-to-end tests";

/// Produces package bytes for a build request.
pub trait PackageBuilder: Send + Sync {
    fn build(
        &self,
        request: &BuildRequest,
    ) -> crate::Result<Bytes>;
}

/// Writes a minimal `.nupkg`: a nuspec manifest, one placeholder library and
/// whatever files the variant's properties ask for.
#[derive(Debug, Clone)]
pub struct NupkgBuilder {
    authors: String,
}

impl Default for NupkgBuilder {
    fn default() -> Self {
        Self::new("gallery-e2e")
    }
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl NupkgBuilder {
    pub fn new(authors: impl Into<String>) -> Self {
        Self {
            authors: authors.into(),
        }
    }

    pub fn nuspec(
        &self,
        request: &BuildRequest,
    ) -> String {
        let icon = request
            .properties
            .icon_file
            .as_deref()
            .map(|icon| format!("\n    <icon>{}</icon>", escape_xml(icon)))
            .unwrap_or_default();

        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<package xmlns="http://schemas.microsoft.com/packaging/2013/05/nuspec.xsd">
  <metadata>
    <id>{id}</id>
    <version>{version}</version>
    <authors>{authors}</authors>
    <description>{description}</description>{icon}
  </metadata>
</package>
"#,
            id = escape_xml(&request.id),
            version = escape_xml(request.version.full()),
            authors = escape_xml(&self.authors),
            description = escape_xml(&request.properties.description),
        )
    }
}

impl PackageBuilder for NupkgBuilder {
    fn build(
        &self,
        request: &BuildRequest,
    ) -> crate::Result<Bytes> {
        if request.id.trim().is_empty() {
            return Err(crate::Error::Build {
                id: request.id.clone(),
                reason: "package id is empty".into(),
            });
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        zip.start_file(format!("{}.nuspec", request.id), options)?;
        zip.write_all(self.nuspec(request).as_bytes())?;

        zip.start_file(
            format!("lib/{TARGET_FRAMEWORK}/{}.dll", request.id),
            options,
        )?;
        zip.write_all(PLACEHOLDER_LIBRARY)?;

        for symbols in &request.properties.symbol_files {
            zip.start_file(symbols.as_str(), options)?;
            zip.write_all(PLACEHOLDER_LIBRARY)?;
        }

        if let Some(icon) = &request.properties.icon_file {
            zip.start_file(icon.as_str(), options)?;
            zip.write_all(&ICON_PNG)?;
        }

        let cursor = zip.finish()?;
        tracing::debug!(id = %request.id, version = %request.version, "built package");

        Ok(Bytes::from(cursor.into_inner()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::package::PackageType;

    fn entries(bytes: &Bytes) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        archive
            .file_names()
            .map(String::from)
            .collect()
    }

    #[test]
    fn base_package_contains_nuspec_and_library() {
        let request = BuildRequest::for_key("E2E.", PackageType::BasePackage).unwrap();
        let bytes = NupkgBuilder::default().build(&request).unwrap();

        let mut names = entries(&bytes);
        names.sort();
        assert_eq!(
            names,
            vec![
                "E2E.BasePackage.nuspec".to_string(),
                "lib/netstandard2.0/E2E.BasePackage.dll".to_string(),
            ]
        );
    }

    #[test]
    fn icon_and_symbols_are_packed() {
        let builder = NupkgBuilder::default();

        let icon = BuildRequest::for_key("E2E.", PackageType::EmbeddedIcon).unwrap();
        assert!(entries(&builder.build(&icon).unwrap()).contains(&"icon.png".to_string()));
        assert!(builder.nuspec(&icon).contains("<icon>icon.png</icon>"));

        let symbols = BuildRequest::for_key("E2E.", PackageType::Symbols).unwrap();
        assert!(
            entries(&builder.build(&symbols).unwrap())
                .contains(&"lib/netstandard2.0/E2E.Symbols.pdb".to_string())
        );
    }

    #[test]
    fn nuspec_keeps_full_version_and_escapes() {
        let mut request = BuildRequest::for_key("E2E.", PackageType::SemVer2StableMetadata).unwrap();
        request.properties.description = "a < b & c".into();

        let nuspec = NupkgBuilder::new("tests").nuspec(&request);
        assert!(nuspec.contains("<version>1.0.0+metadata</version>"));
        assert!(nuspec.contains("<description>a &lt; b &amp; c</description>"));
        assert!(!nuspec.contains("<icon>"));
    }

    #[test]
    fn every_markup_character_is_escaped() {
        assert_eq!(
            escape_xml(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&apos;&amp;&apos;&lt;/a&gt;"
        );
        assert_eq!(escape_xml("E2E.BasePackage"), "E2E.BasePackage");
    }

    #[test]
    fn empty_ids_are_rejected() {
        let mut request = BuildRequest::for_key("E2E.", PackageType::BasePackage).unwrap();
        request.id = " ".into();

        let err = NupkgBuilder::default()
            .build(&request)
            .unwrap_err();
        assert!(matches!(err, crate::Error::Build { .. }));
    }
}
