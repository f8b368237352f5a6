//! crates/quizforge_core/src/files.rs
//!
//! File intake: turns uploaded files into a uniform in-memory representation
//! and keeps the preview tokens the presentation layer displays in lockstep
//! with the file list. Image previews are revocable handles backed by a
//! per-session registry; document previews are plain tagged strings.

use crate::domain::DocumentPart;
use crate::ports::{PortError, PortResult};
use bytes::Bytes;
use std::collections::HashSet;
use uuid::Uuid;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Resolves a file's content type. The declared (intrinsic) type wins; when
/// it is absent the extension decides, and an unrecognized extension yields
/// the empty string so callers can reject the file before any remote call.
pub fn resolve_mime_type(file_name: &str, declared: Option<&str>) -> String {
    if let Some(declared) = declared {
        if !declared.is_empty() {
            return declared.to_string();
        }
    }

    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => MIME_PDF.to_string(),
        "docx" => MIME_DOCX.to_string(),
        "jpg" | "jpeg" => "image/jpeg".to_string(),
        "png" => "image/png".to_string(),
        "webp" => "image/webp".to_string(),
        _ => String::new(),
    }
}

/// A file the user selected, held in memory for the lifetime of the session.
#[derive(Debug, Clone)]
pub struct IngestedFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl IngestedFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// The display token for one ingested file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// A revocable handle to an image payload. Must be released through the
    /// registry exactly once, when its owning file goes away.
    Image(Uuid),
    /// A tagged string of the form `<kind>:<filename>`; nothing to release.
    Tagged(String),
}

impl Preview {
    /// The token string handed to the presentation layer.
    pub fn token(&self) -> String {
        match self {
            Preview::Image(id) => format!("image:{id}"),
            Preview::Tagged(tag) => tag.clone(),
        }
    }
}

/// Tracks the revocable image-preview handles that are currently live.
/// Releasing a handle twice, or one that was never allocated, is a bug in
/// the caller and is reported by the `false` return value.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    live: HashSet<Uuid>,
}

impl PreviewRegistry {
    pub fn allocate(&mut self) -> Uuid {
        let token = Uuid::new_v4();
        self.live.insert(token);
        token
    }

    pub fn release(&mut self, token: Uuid) -> bool {
        self.live.remove(&token)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

/// Owns a session's file list, its previews, and the preview registry.
/// Invariant: `files` and `previews` have equal length and are index-aligned.
#[derive(Debug, Default)]
pub struct FileStore {
    files: Vec<IngestedFile>,
    previews: Vec<Preview>,
    registry: PreviewRegistry,
}

impl FileStore {
    pub fn files(&self) -> &[IngestedFile] {
        &self.files
    }

    pub fn previews(&self) -> &[Preview] {
        &self.previews
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn registry(&self) -> &PreviewRegistry {
        &self.registry
    }

    /// Appends the incoming files, allocating a preview for each.
    pub fn add_files(&mut self, incoming: Vec<IngestedFile>) {
        for file in incoming {
            let preview = self.make_preview(&file);
            self.files.push(file);
            self.previews.push(preview);
        }
    }

    /// Replaces the whole file list. Old previews are released before the
    /// new ones are created.
    pub fn replace_files(&mut self, incoming: Vec<IngestedFile>) {
        self.clear();
        self.add_files(incoming);
    }

    /// Removes the file at `index`, releasing its preview. Out-of-range
    /// indices are ignored and reported as `None`.
    pub fn remove_file(&mut self, index: usize) -> Option<IngestedFile> {
        if index >= self.files.len() {
            return None;
        }
        let preview = self.previews.remove(index);
        self.release_preview(&preview);
        Some(self.files.remove(index))
    }

    /// Drops every file and releases every outstanding preview handle.
    pub fn clear(&mut self) {
        let previews = std::mem::take(&mut self.previews);
        for preview in &previews {
            self.release_preview(preview);
        }
        self.files.clear();
    }

    /// The names of files the table-of-contents extraction flow cannot
    /// accept: word-processor documents and files whose type could not be
    /// resolved.
    pub fn unsupported_for_extraction(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|file| file.mime_type.is_empty() || file.mime_type == MIME_DOCX)
            .map(|file| file.file_name.clone())
            .collect()
    }

    /// Encodes the file list into generation-service payloads.
    pub fn document_parts(&self) -> PortResult<Vec<DocumentPart>> {
        self.files
            .iter()
            .map(|file| {
                if file.mime_type.is_empty() {
                    return Err(PortError::ReadFailure(format!(
                        "could not determine the file type of '{}'",
                        file.file_name
                    )));
                }
                Ok(DocumentPart {
                    mime_type: file.mime_type.clone(),
                    data: file.data.clone(),
                })
            })
            .collect()
    }

    fn make_preview(&mut self, file: &IngestedFile) -> Preview {
        if file.mime_type.starts_with("image/") {
            Preview::Image(self.registry.allocate())
        } else if file.mime_type == MIME_DOCX {
            Preview::Tagged(format!("docx:{}", file.file_name))
        } else if file.mime_type == MIME_PDF {
            Preview::Tagged(format!("pdf:{}", file.file_name))
        } else {
            Preview::Tagged(format!("file:{}", file.file_name))
        }
    }

    fn release_preview(&mut self, preview: &Preview) {
        if let Preview::Image(token) = preview {
            let released = self.registry.release(*token);
            debug_assert!(released, "preview handle released twice or never allocated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: &str) -> IngestedFile {
        IngestedFile::new(name, mime, Bytes::from_static(b"payload"))
    }

    fn png(name: &str) -> IngestedFile {
        file(name, "image/png")
    }

    #[test]
    fn mime_resolution_prefers_declared_type() {
        assert_eq!(
            resolve_mime_type("scan.pdf", Some("application/pdf")),
            MIME_PDF
        );
        // A declared type wins even over a conflicting extension.
        assert_eq!(
            resolve_mime_type("photo.png", Some("image/jpeg")),
            "image/jpeg"
        );
    }

    #[test]
    fn mime_resolution_falls_back_to_extension() {
        assert_eq!(resolve_mime_type("notes.PDF", None), MIME_PDF);
        assert_eq!(resolve_mime_type("essay.docx", Some("")), MIME_DOCX);
        assert_eq!(resolve_mime_type("photo.jpeg", None), "image/jpeg");
        assert_eq!(resolve_mime_type("photo.jpg", None), "image/jpeg");
        assert_eq!(resolve_mime_type("img.webp", None), "image/webp");
    }

    #[test]
    fn mime_resolution_yields_empty_for_unknown() {
        assert_eq!(resolve_mime_type("archive.zip", None), "");
        assert_eq!(resolve_mime_type("no_extension", None), "");
    }

    #[test]
    fn add_then_remove_keeps_lists_aligned() {
        let mut store = FileStore::default();
        store.add_files(vec![png("a.png"), file("b.pdf", MIME_PDF), png("c.png")]);
        assert_eq!(store.len(), 3);
        assert_eq!(store.previews().len(), 3);
        assert_eq!(store.registry().live_count(), 2);

        let removed = store.remove_file(1).unwrap();
        assert_eq!(removed.file_name, "b.pdf");
        assert_eq!(store.len(), 2);
        assert_eq!(store.previews().len(), 2);
        assert_eq!(store.files()[1].file_name, "c.png");
        // The pdf preview had no revocable handle; both image handles live.
        assert_eq!(store.registry().live_count(), 2);

        store.remove_file(0);
        assert_eq!(store.registry().live_count(), 1);
    }

    #[test]
    fn remove_out_of_range_is_ignored() {
        let mut store = FileStore::default();
        store.add_files(vec![png("a.png")]);
        assert!(store.remove_file(5).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_releases_old_handles_before_allocating_new() {
        let mut store = FileStore::default();
        store.add_files(vec![png("a.png"), png("b.png")]);
        store.replace_files(vec![png("c.png")]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.registry().live_count(), 1);
        assert_eq!(store.files()[0].file_name, "c.png");
    }

    #[test]
    fn clear_releases_every_handle() {
        let mut store = FileStore::default();
        store.add_files(vec![png("a.png"), png("b.png"), file("c.pdf", MIME_PDF)]);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.previews().len(), 0);
        assert_eq!(store.registry().live_count(), 0);
    }

    #[test]
    fn preview_tokens_tag_document_kinds() {
        let mut store = FileStore::default();
        store.add_files(vec![
            file("c.pdf", MIME_PDF),
            file("d.docx", MIME_DOCX),
            png("e.png"),
        ]);
        assert_eq!(store.previews()[0].token(), "pdf:c.pdf");
        assert_eq!(store.previews()[1].token(), "docx:d.docx");
        assert!(store.previews()[2].token().starts_with("image:"));
    }

    #[test]
    fn unsupported_for_extraction_lists_docx_and_unknown() {
        let mut store = FileStore::default();
        store.add_files(vec![
            file("a.pdf", MIME_PDF),
            file("b.docx", MIME_DOCX),
            file("c.bin", ""),
        ]);
        assert_eq!(
            store.unsupported_for_extraction(),
            vec!["b.docx".to_string(), "c.bin".to_string()]
        );
    }

    #[test]
    fn document_parts_fail_on_unresolved_type() {
        let mut store = FileStore::default();
        store.add_files(vec![file("a.pdf", MIME_PDF), file("mystery", "")]);
        let err = store.document_parts().unwrap_err();
        assert!(matches!(err, PortError::ReadFailure(_)));
        assert!(err.to_string().contains("mystery"));
    }

    #[test]
    fn document_parts_carry_mime_and_payload() {
        let mut store = FileStore::default();
        store.add_files(vec![png("a.png")]);
        let parts = store.document_parts().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].mime_type, "image/png");
        assert_eq!(parts[0].data, Bytes::from_static(b"payload"));
    }
}
