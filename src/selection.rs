//! Selection state: the ordered list of admitted files.
//!
//! [`Selection`] is the single owner of every [`FileRecord`]. There is one
//! list at a time (no undo history), it is kept in insertion order, and the
//! preview is always a borrowed view of the first record.

use crate::config::ClientConfig;
use crate::error::ImgConvertError;
use crate::intake::{self, Dimensions, FileRecord, RawFile, RecordId};
use tracing::{debug, info};

/// What the preview pane shows.
#[derive(Debug, Clone, Copy)]
pub enum Preview<'a> {
    /// Nothing selected; show the placeholder.
    Empty,
    /// The first remaining record.
    Record(&'a FileRecord),
}

impl Preview<'_> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Preview::Empty)
    }

    /// One-line caption: `name`, human size and dimensions when known.
    pub fn caption(&self) -> Option<String> {
        match self {
            Preview::Empty => None,
            Preview::Record(r) => {
                let mut s = format!(
                    "{} — {}",
                    r.display_name,
                    intake::format_file_size(r.byte_size)
                );
                if let Some(d) = r.dimensions {
                    s.push_str(&format!(" • {d}"));
                }
                Some(s)
            }
        }
    }
}

/// Ordered, owned list of selected files.
#[derive(Debug, Default)]
pub struct Selection {
    records: Vec<FileRecord>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `raw_files`, probe them, and append the admitted records.
    ///
    /// On a validation error nothing is appended. Returns the ids of the new
    /// records in submission order.
    pub async fn ingest(
        &mut self,
        raw_files: Vec<RawFile>,
        config: &ClientConfig,
    ) -> Result<Vec<RecordId>, ImgConvertError> {
        let records = intake::ingest_records(raw_files, config).await?;
        let ids: Vec<RecordId> = records.iter().map(|r| r.id).collect();
        self.records.extend(records);
        info!(
            "Selection now holds {} file(s) ({} added)",
            self.records.len(),
            ids.len()
        );
        if let Some(ref cb) = config.progress_callback {
            cb.on_intake_complete(ids.len(), self.records.len());
        }
        Ok(ids)
    }

    /// Remove the record with `id`. Returns it, or `None` if absent.
    pub fn remove(&mut self, id: RecordId) -> Option<FileRecord> {
        let pos = self.records.iter().position(|r| r.id == id)?;
        let removed = self.records.remove(pos);
        debug!("Removed '{}' (#{})", removed.display_name, id);
        Some(removed)
    }

    /// Empty the list after asking `confirm`.
    ///
    /// `confirm` receives the current count and is only called when the list
    /// is non-empty. Returns `true` if the list is now empty.
    pub fn clear(&mut self, confirm: impl FnOnce(usize) -> bool) -> bool {
        if self.records.is_empty() {
            return true;
        }
        if !confirm(self.records.len()) {
            debug!("Clear declined; keeping {} file(s)", self.records.len());
            return false;
        }
        info!("Cleared {} file(s)", self.records.len());
        self.records.clear();
        true
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Human count label, e.g. `"1 file"` / `"3 files"`.
    pub fn count_label(&self) -> String {
        let n = self.records.len();
        format!("{} file{}", n, if n == 1 { "" } else { "s" })
    }

    pub fn preview(&self) -> Preview<'_> {
        self.records
            .first()
            .map_or(Preview::Empty, Preview::Record)
    }

    /// Dimensions of the first record, the reference for aspect locking.
    pub fn reference_dimensions(&self) -> Option<Dimensions> {
        self.records.first().and_then(|r| r.dimensions)
    }

    pub fn get(&self, id: RecordId) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::default()
    }

    fn raw(name: &str) -> RawFile {
        RawFile::from_bytes(name, "image/png", b"not really a png".to_vec())
    }

    #[tokio::test]
    async fn ingest_appends_in_order() {
        let mut sel = Selection::new();
        let ids = sel
            .ingest(vec![raw("a.png"), raw("b.png"), raw("c.png")], &config())
            .await
            .unwrap();
        assert_eq!(sel.count(), 3);
        let names: Vec<_> = sel.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png", "c.png"]);
        assert_eq!(ids, sel.iter().map(|r| r.id).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn failed_ingest_leaves_selection_untouched() {
        let mut sel = Selection::new();
        sel.ingest(vec![raw("keep.png")], &config()).await.unwrap();

        let err = sel.ingest(vec![], &config()).await.unwrap_err();
        assert!(matches!(err, ImgConvertError::NoFiles));
        assert_eq!(sel.count(), 1);
    }

    #[tokio::test]
    async fn remove_updates_preview() {
        let mut sel = Selection::new();
        let ids = sel
            .ingest(vec![raw("first.png"), raw("second.png")], &config())
            .await
            .unwrap();

        match sel.preview() {
            Preview::Record(r) => assert_eq!(r.display_name, "first.png"),
            Preview::Empty => panic!("expected a preview"),
        }

        assert!(sel.remove(ids[0]).is_some());
        match sel.preview() {
            Preview::Record(r) => assert_eq!(r.display_name, "second.png"),
            Preview::Empty => panic!("expected a preview"),
        }

        assert!(sel.remove(ids[1]).is_some());
        assert!(sel.preview().is_empty());
        assert!(sel.preview().caption().is_none());
    }

    #[tokio::test]
    async fn remove_unknown_id_is_noop() {
        let mut sel = Selection::new();
        let ids = sel.ingest(vec![raw("a.png")], &config()).await.unwrap();
        sel.remove(ids[0]);
        assert!(sel.remove(ids[0]).is_none());
        assert_eq!(sel.count(), 0);
    }

    #[tokio::test]
    async fn clear_requires_confirmation() {
        let mut sel = Selection::new();
        sel.ingest(vec![raw("a.png"), raw("b.png")], &config())
            .await
            .unwrap();

        let mut asked_with = None;
        assert!(!sel.clear(|n| {
            asked_with = Some(n);
            false
        }));
        assert_eq!(asked_with, Some(2));
        assert_eq!(sel.count(), 2);

        assert!(sel.clear(|_| true));
        assert_eq!(sel.count(), 0);
        assert!(sel.preview().is_empty());
    }

    #[test]
    fn clear_on_empty_does_not_ask() {
        let mut sel = Selection::new();
        assert!(sel.clear(|_| panic!("must not ask when empty")));
    }

    #[test]
    fn count_label_pluralises() {
        let sel = Selection::new();
        assert_eq!(sel.count_label(), "0 files");
    }
}
