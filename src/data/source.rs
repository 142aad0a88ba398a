use std::path::{Path, PathBuf};

use crate::watch::SourceWatch;

/// The loaded script and the watch that belongs to it.
///
/// Owning the [`SourceWatch`] ties the lifetime of the change subscription
/// to the reference: replacing or dropping the `SourceRef` releases it.
pub struct SourceRef {
    path: PathBuf,
    watch: Option<SourceWatch>,
}

impl SourceRef {
    pub fn new(path: PathBuf, watch: Option<SourceWatch>) -> Self {
        Self { path, watch }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn watch(&self) -> Option<&SourceWatch> {
        self.watch.as_ref()
    }
}

impl std::fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRef")
            .field("path", &self.path)
            .field("watch", &self.watch.as_ref().map(|w| w.token()))
            .finish()
    }
}
