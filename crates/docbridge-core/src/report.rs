//! End-of-run summaries.

use std::fmt;
use std::path::PathBuf;

/// A link degraded to plain text because its target is unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedLink {
    /// Identity of the page containing the link.
    pub page: String,
    /// The href as found in the body.
    pub token: String,
}

impl fmt::Display for UnresolvedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.page, self.token)
    }
}

/// A document or page that did not make it through a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIssue {
    /// Source path or page identity.
    pub source: String,
    pub reason: String,
}

impl fmt::Display for PageIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.reason)
    }
}

/// Summary of an import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Pages stored and relinked, by source path.
    pub processed: Vec<String>,
    /// Documents that could not be normalized or collided with another page.
    pub skipped: Vec<PageIssue>,
    /// Pages whose store writes failed.
    pub failed: Vec<PageIssue>,
    pub unresolved_links: Vec<UnresolvedLink>,
    pub pages_created: usize,
    pub pages_updated: usize,
    pub categories_created: usize,
    /// The run was rolled back.
    pub dry_run: bool,
}

impl ImportReport {
    /// True when every document was processed.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty() && self.unresolved_links.is_empty()
    }
}

/// Summary of an export run.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Written files.
    pub written: Vec<PathBuf>,
    /// Pages whose file could not be written.
    pub failed: Vec<PageIssue>,
    pub unresolved_links: Vec<UnresolvedLink>,
}

/// Summary of a clean or convert run over a directory.
#[derive(Debug, Default)]
pub struct ConvertReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PageIssue>,
}
