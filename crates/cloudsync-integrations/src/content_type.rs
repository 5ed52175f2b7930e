//! Native Google document types and what they are served as.

/// Folder pseudo content type.
pub const GOOGLE_FOLDER: &str = "application/vnd.google-apps.folder";
pub const GOOGLE_SPREADSHEET: &str = "application/vnd.google-apps.spreadsheet";
pub const GOOGLE_PRESENTATION: &str = "application/vnd.google-apps.presentation";
pub const GOOGLE_DOCUMENT: &str = "application/vnd.google-apps.document";

/// Everything convertible is exported as PDF.
pub const EXPORT_CONTENT_TYPE: &str = "application/pdf";

/// Whether a native type has no byte content and must be exported.
pub fn is_convertible(content_type: &str) -> bool {
    matches!(
        content_type,
        GOOGLE_SPREADSHEET | GOOGLE_PRESENTATION | GOOGLE_DOCUMENT
    )
}

/// The content type a file is provided as on download.
pub fn provided_content_type(content_type: &str) -> &str {
    if is_convertible(content_type) {
        EXPORT_CONTENT_TYPE
    } else {
        content_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_documents_export_as_pdf() {
        for native in [GOOGLE_SPREADSHEET, GOOGLE_PRESENTATION, GOOGLE_DOCUMENT] {
            assert!(is_convertible(native));
            assert_eq!(provided_content_type(native), EXPORT_CONTENT_TYPE);
        }
    }

    #[test]
    fn test_other_types_unchanged() {
        for other in ["application/epub+zip", "application/pdf", "image/png", GOOGLE_FOLDER] {
            assert!(!is_convertible(other));
            assert_eq!(provided_content_type(other), other);
        }
    }
}
