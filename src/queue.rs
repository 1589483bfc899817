//! The list of files waiting to be converted.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::job::absolute;
use crate::source::is_supported_format;

/// Ordered, de-duplicated list of source files.
///
/// Paths are stored in absolute form so the same file added twice through
/// different relative spellings is only queued once.
#[derive(Debug, Clone, Default)]
pub struct FileQueue {
    files: Vec<PathBuf>,
}

impl FileQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `path` if it has a supported extension and is not queued yet.
    /// Returns whether the queue changed.
    pub fn add(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        if !is_supported_format(path) {
            debug!(path = %path.display(), "Skipping unsupported file");
            return false;
        }

        let path = absolute(path);
        if self.files.contains(&path) {
            return false;
        }
        self.files.push(path);
        true
    }

    /// Queues every path, returning how many were actually added.
    pub fn extend<I, P>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        paths.into_iter().filter(|p| self.add(p)).count()
    }

    /// Removes the entry at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<PathBuf> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    /// Removes several entries at once. Indices refer to the queue as it was
    /// before the call; out-of-range and repeated indices are ignored.
    pub fn remove_many(&mut self, indices: &[usize]) -> usize {
        let before = self.files.len();
        let mut index = 0;
        self.files.retain(|_| {
            let keep = !indices.contains(&index);
            index += 1;
            keep
        });
        before - self.files.len()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    /// Copy of the queued paths, in order.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.files.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_unsupported_extensions() {
        let mut queue = FileQueue::new();
        assert!(queue.add("a.PNG"));
        assert!(queue.add("b.jpeg"));
        assert!(!queue.add("notes.txt"));
        assert!(!queue.add("already.webp"));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_deduplicates_by_absolute_path() {
        let mut queue = FileQueue::new();
        assert!(queue.add("a.png"));
        assert!(!queue.add("a.png"));
        let cwd = std::env::current_dir().unwrap();
        assert!(!queue.add(cwd.join("a.png")));
        assert_eq!(queue.len(), 1);
        assert!(queue.iter().all(Path::is_absolute));
    }

    #[test]
    fn test_extend_reports_added_count() {
        let mut queue = FileQueue::new();
        let added = queue.extend(["a.png", "b.gif", "a.png", "c.doc", "d.tif"]);
        assert_eq!(added, 3);
        let names: Vec<_> = queue
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.png", "b.gif", "d.tif"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut queue = FileQueue::new();
        queue.extend(["a.png", "b.png", "c.png", "d.png"]);

        assert!(queue.remove(9).is_none());
        assert!(queue.remove(0).unwrap().ends_with("a.png"));
        assert_eq!(queue.remove_many(&[0, 2, 2, 7]), 2);
        assert_eq!(queue.len(), 1);
        assert!(queue.snapshot()[0].ends_with("c.png"));

        queue.clear();
        assert!(queue.is_empty());
    }
}
