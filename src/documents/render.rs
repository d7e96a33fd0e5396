use std::io::{Cursor, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::DocumentGenerator;
use crate::error::{RegistryError, Result};
use crate::models::{Organization, Service};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELATIONSHIPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

/// One paragraph of the registration sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLine {
    pub text: String,
    pub heading: bool,
}

impl SheetLine {
    fn heading(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            heading: true,
        }
    }

    fn body(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            heading: false,
        }
    }
}

/// Renders a Word registration sheet and converts it with an external tool
pub struct DocxDocumentGenerator {
    converter: String,
    converter_args: Vec<String>,
    scratch_dir: PathBuf,
}

impl DocxDocumentGenerator {
    pub fn new(converter: impl Into<String>, converter_args: Vec<String>) -> Self {
        Self {
            converter: converter.into(),
            converter_args,
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn sheet(organization: &Organization, services: &[Service]) -> Vec<SheetLine> {
        let profile = &organization.profile;
        let mut lines = vec![
            SheetLine::heading("Organization Registration"),
            SheetLine::body(format!("Registration No: {}", organization.id)),
            SheetLine::body(format!("Institution: {}", profile.institution_name)),
            SheetLine::body(format!("Province: {}", profile.province)),
            SheetLine::body(format!("District: {}", profile.district)),
        ];
        if let Some(website) = &profile.website_url {
            lines.push(SheetLine::body(format!("Website: {website}")));
        }
        lines.extend([
            SheetLine::body(format!("Status: {}", organization.status)),
            SheetLine::heading("Contact"),
            SheetLine::body(format!("Name: {}", profile.contact.name)),
            SheetLine::body(format!("Designation: {}", profile.contact.designation)),
            SheetLine::body(format!("Email: {}", profile.contact.email)),
            SheetLine::body(format!("Phone: {}", profile.contact.contact_number)),
            SheetLine::heading(format!("Services ({})", services.len())),
        ]);

        for (index, service) in services.iter().enumerate() {
            let details = &service.details;
            lines.push(SheetLine::body(format!(
                "{}. {} [{}]",
                index + 1,
                details.service_name,
                details.category
            )));
            if !details.description.is_empty() {
                lines.push(SheetLine::body(details.description.clone()));
            }
            if !details.requirements.is_empty() {
                lines.push(SheetLine::body(format!("Requirements: {}", details.requirements)));
            }
        }

        lines
    }

    /// WordprocessingML body for the sheet
    pub fn document_xml(lines: &[SheetLine]) -> String {
        let paragraphs: String = lines
            .iter()
            .map(|line| {
                let style = if line.heading { "<w:rPr><w:b/></w:rPr>" } else { "" };
                format!(
                    "<w:p><w:r>{style}<w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
                    escape_xml(&line.text)
                )
            })
            .collect();

        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{paragraphs}</w:body></w:document>"
        )
    }

    fn package(document_xml: &str) -> zip::result::ZipResult<Vec<u8>> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        writer.start_file("[Content_Types].xml", options)?;
        writer.write_all(CONTENT_TYPES.as_bytes())?;
        writer.start_file("_rels/.rels", options)?;
        writer.write_all(PACKAGE_RELATIONSHIPS.as_bytes())?;
        writer.start_file("word/document.xml", options)?;
        writer.write_all(document_xml.as_bytes())?;

        Ok(writer.finish()?.into_inner())
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
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

#[async_trait]
impl DocumentGenerator for DocxDocumentGenerator {
    async fn render(&self, organization: &Organization, services: &[Service]) -> Result<Vec<u8>> {
        let xml = Self::document_xml(&Self::sheet(organization, services));
        Self::package(&xml)
            .map_err(|e| RegistryError::StorageUnavailable(format!("failed to build docx: {e}")))
    }

    async fn to_pdf(&self, document: Vec<u8>) -> Result<Vec<u8>> {
        let work_dir = self.scratch_dir.join(format!("org-registry-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&work_dir).await?;

        let source = work_dir.join("registration.docx");
        tokio::fs::write(&source, &document).await?;

        let output = Command::new(&self.converter)
            .args(&self.converter_args)
            .arg("--outdir")
            .arg(&work_dir)
            .arg(&source)
            .output()
            .await;

        let result = match output {
            Ok(output) if output.status.success() => {
                tokio::fs::read(work_dir.join("registration.pdf")).await.map_err(|e| {
                    RegistryError::StorageUnavailable(format!("converter produced no pdf: {e}"))
                })
            }
            Ok(output) => Err(RegistryError::StorageUnavailable(format!(
                "{} exited with {}: {}",
                self.converter,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Err(e) => Err(RegistryError::StorageUnavailable(format!(
                "failed to run {}: {e}",
                self.converter
            ))),
        };

        if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
            debug!("Failed to clean converter scratch dir {}: {}", work_dir.display(), e);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::models::fixtures::{profile, service};
    use crate::workflow::status::ReviewStatus;
    use chrono::Utc;

    fn organization() -> Organization {
        Organization {
            id: 3,
            profile: profile("Land & Deeds Registry"),
            status: ReviewStatus::Approved,
            owner_user_id: "u1".to_string(),
            docx_url: None,
            pdf_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn services() -> Vec<Service> {
        let now = Utc::now();
        vec![Service {
            id: 1,
            organization_id: 3,
            details: service("Deed search"),
            status: ReviewStatus::Approved,
            created_at: now,
            updated_at: now,
        }]
    }

    #[test]
    fn test_sheet_lists_services() {
        let lines = DocxDocumentGenerator::sheet(&organization(), &services());
        let texts: Vec<&str> = lines.iter().map(|line| line.text.as_str()).collect();

        assert!(texts.contains(&"Institution: Land & Deeds Registry"));
        assert!(texts.contains(&"Status: approved"));
        assert!(texts.contains(&"Services (1)"));
        assert!(texts.contains(&"1. Deed search [Licensing]"));
        assert!(lines[0].heading);
    }

    #[tokio::test]
    async fn test_render_produces_a_word_package() {
        let generator = DocxDocumentGenerator::new("soffice", Vec::new());
        let bytes = generator.render(&organization(), &services()).await.unwrap();
        assert_eq!(&bytes[..2], b"PK");

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, ["[Content_Types].xml", "_rels/.rels", "word/document.xml"]);

        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        assert!(xml.contains("Institution: Land &amp; Deeds Registry"));
        assert!(xml.contains("<w:b/></w:rPr><w:t xml:space=\"preserve\">Contact</w:t>"));
        assert!(!xml.contains("Land & Deeds"));
    }

    #[tokio::test]
    async fn test_missing_converter_is_storage_unavailable() {
        let generator = DocxDocumentGenerator::new("org-registry-no-such-converter", Vec::new());
        let err = generator.to_pdf(b"PK".to_vec()).await.unwrap_err();
        assert!(matches!(err, RegistryError::StorageUnavailable(_)));
    }
}
