//! Statement references scraped from the statements page.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ExtractionError;

/// Download links look like `/service/rest/statements/20170919/10594766/downloadPdf`.
static STATEMENT_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"/service/rest/statements/([^/\s"'<>]+)/([^/\s"'<>]+)/downloadPdf"#)
        .expect("valid regex")
});

/// One statement advertised on the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRef {
    /// Issue date as printed in the link, normally `YYYYMMDD`.
    pub date_token: String,
    pub opaque_hash: String,
    /// Site-relative path of the PDF.
    pub download_path: String,
}

impl StatementRef {
    pub fn new(date_token: impl Into<String>, opaque_hash: impl Into<String>) -> Self {
        let date_token = date_token.into();
        let opaque_hash = opaque_hash.into();
        let download_path =
            format!("/service/rest/statements/{date_token}/{opaque_hash}/downloadPdf");
        Self {
            date_token,
            opaque_hash,
            download_path,
        }
    }

    /// Attachment name for the downloaded document.
    pub fn file_name(&self) -> String {
        format!("statement-{}", self.date_token)
    }
}

/// A downloaded statement, ready to attach.
#[derive(Clone, PartialEq, Eq)]
pub struct StatementDocument {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl std::fmt::Debug for StatementDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatementDocument")
            .field("file_name", &self.file_name)
            .field("bytes", &self.content.len())
            .finish()
    }
}

/// Find every statement link in the page, in document order.
///
/// Repeated links (the same date and hash) are reported once, at their first
/// position. A page without any link is an extraction failure.
pub fn parse_statement_refs(body: &str) -> Result<Vec<StatementRef>, ExtractionError> {
    let mut seen = HashSet::new();
    let refs: Vec<StatementRef> = STATEMENT_LINK_RE
        .captures_iter(body)
        .filter_map(|caps| {
            let date = caps.get(1)?.as_str();
            let hash = caps.get(2)?.as_str();
            seen.insert((date.to_string(), hash.to_string()))
                .then(|| StatementRef::new(date, hash))
        })
        .collect();

    if refs.is_empty() {
        return Err(ExtractionError::NoStatements);
    }
    Ok(refs)
}
