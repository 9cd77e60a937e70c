use crate::{IngestError, InsightsPipeline, StoreReceipt};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// The index key for a file on disk: its bare file name.
pub fn file_key(path: &Path) -> Result<String, IngestError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))
}

pub fn is_pdf_name(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

#[derive(Debug)]
pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IngestionReport {
    pub stored: Vec<StoreReceipt>,
    pub skipped_files: Vec<SkippedPdf>,
}

pub async fn store_file(
    pipeline: &InsightsPipeline,
    path: &Path,
    key: Option<&str>,
) -> Result<StoreReceipt, crate::PipelineError> {
    let key = match key {
        Some(key) => key.to_string(),
        None => file_key(path)?,
    };
    let bytes = tokio::fs::read(path).await.map_err(IngestError::Io)?;
    pipeline.store_pdf(&key, &bytes).await
}

/// Stores every PDF under `folder`, one file at a time. A failing file is
/// recorded and the walk moves on to the next one.
pub async fn store_folder(
    pipeline: &InsightsPipeline,
    folder: &Path,
) -> Result<IngestionReport, IngestError> {
    let files = discover_pdf_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no pdf files found in {}",
            folder.display()
        )));
    }

    let mut report = IngestionReport::default();
    for path in files {
        match store_file(pipeline, &path, None).await {
            Ok(receipt) => report.stored.push(receipt),
            Err(error) => report.skipped_files.push(SkippedPdf {
                path,
                reason: error.to_string(),
            }),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::fixtures::pdf_with_pages;
    use crate::stores::InMemoryIndex;
    use crate::HashingEmbedder;
    use std::fs;
    use tempfile::tempdir;

    fn pipeline() -> InsightsPipeline {
        InsightsPipeline::new(
            Box::new(HashingEmbedder::new(32)),
            Box::new(InMemoryIndex::new(32)),
            2,
        )
    }

    #[test]
    fn discover_pdf_files_is_recursive() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("nested");
        fs::create_dir(&nested)?;
        fs::write(dir.path().join("a.pdf"), b"%PDF-1.4")?;
        fs::write(nested.join("B.PDF"), b"%PDF-1.4")?;
        fs::write(dir.path().join("notes.txt"), b"skip")?;

        let files = discover_pdf_files(dir.path());
        assert_eq!(files.len(), 2);
        Ok(())
    }

    #[test]
    fn checksum_is_reproducible() {
        assert_eq!(checksum(b"abc"), checksum(b"abc"));
        assert_eq!(
            checksum(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn file_key_is_bare_file_name() {
        let key = file_key(Path::new("/tmp/docs/policy.pdf")).unwrap();
        assert_eq!(key, "policy.pdf");
        assert!(file_key(Path::new("/")).is_err());
    }

    #[test]
    fn pdf_names_are_case_insensitive() {
        assert!(is_pdf_name("policy.PDF"));
        assert!(!is_pdf_name("policy.docx"));
        assert!(!is_pdf_name("pdf"));
    }

    #[tokio::test]
    async fn store_folder_requires_pdfs() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let result = store_folder(&pipeline(), dir.path()).await;
        assert!(matches!(result, Err(IngestError::InvalidArgument(_))));
        Ok(())
    }

    #[tokio::test]
    async fn store_folder_records_unreadable_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::write(dir.path().join("good.pdf"), pdf_with_pages(&[Some("Fund report")]))?;
        fs::write(dir.path().join("broken.pdf"), b"%PDF-1.4\n%broken")?;

        let report = store_folder(&pipeline(), dir.path()).await?;

        assert_eq!(report.stored.len(), 1);
        assert_eq!(report.stored[0].key, "good.pdf");
        assert_eq!(report.skipped_files.len(), 1);
        assert_eq!(
            report.skipped_files[0]
                .path
                .file_name()
                .and_then(|name| name.to_str()),
            Some("broken.pdf")
        );
        Ok(())
    }
}
