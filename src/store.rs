/// Tracklet store
///
/// Authoritative, serializable owner of all tracklet rows for one project.
/// Every mutation goes through the validated API here; frame sessions never
/// touch rows directly.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::Error;
use crate::tracklet::{self, Tracklet};

#[derive(Debug)]
pub struct TrackletStore {
    rows: Vec<Tracklet>,
    filepath: Option<PathBuf>,
    dirty: bool,
}

impl TrackletStore {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            filepath: None,
            dirty: false,
        }
    }

    /// Build a store from rows already in memory (tests, host-side imports).
    pub fn from_rows(rows: Vec<Tracklet>) -> Self {
        Self {
            rows,
            filepath: None,
            dirty: false,
        }
    }

    /// Load a tracklet CSV, replacing the in-memory table. On failure the
    /// previous rows are retained and the source file is untouched.
    pub fn load(&mut self, path: &Path) -> Result<usize, Error> {
        let rows = tracklet::read_file(path)?;
        if rows.is_empty() {
            warn!("No tracklets found in {}", path.display());
        }
        info!("Loaded {} tracklets from {}", rows.len(), path.display());
        self.rows = rows;
        self.filepath = Some(path.to_path_buf());
        self.dirty = false;
        Ok(self.rows.len())
    }

    /// Serialize the table back to CSV. Writes to `<target>.tmp` and renames
    /// over the target so a failed write never truncates the existing file.
    pub fn save(&mut self, path: Option<&Path>) -> Result<PathBuf, Error> {
        let target = match path.or(self.filepath.as_deref()) {
            Some(p) => p.to_path_buf(),
            None => return Err(Error::Io("no file path set for save".to_string())),
        };

        let content = tracklet::to_csv_string(&self.rows);
        let tmp = target.with_extension("csv.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| Error::Io(format!("failed to write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &target).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            Error::Io(format!("failed to replace {}: {}", target.display(), e))
        })?;

        info!("Saved {} tracklets to {}", self.rows.len(), target.display());
        self.filepath = Some(target.clone());
        self.dirty = false;
        Ok(target)
    }

    /// Append a row, rejecting a duplicate (filename, id) pair.
    pub fn add_row(&mut self, row: Tracklet) -> Result<(), Error> {
        if self.id_exists(&row.filename, row.id) {
            return Err(Error::DuplicateIdentity {
                filename: row.filename,
                id: row.id,
            });
        }
        debug!("Adding tracklet id {} to {}", row.id, row.filename);
        self.rows.push(row);
        self.dirty = true;
        Ok(())
    }

    /// Remove all rows in `filename` whose id is in `ids`. Removing nothing
    /// is not an error. Returns the number of rows removed.
    pub fn remove_rows(&mut self, filename: &str, ids: &[i64]) -> usize {
        let before = self.rows.len();
        self.rows
            .retain(|r| !(r.filename == filename && ids.contains(&r.id)));
        let removed = before - self.rows.len();
        if removed > 0 {
            debug!("Removed {} tracklet(s) from {}", removed, filename);
            self.dirty = true;
        }
        removed
    }

    /// Rewrite the id of the row(s) matching (filename, old_id). The new id
    /// must be free within that frame. Returns the number of rows changed.
    pub fn change_id(&mut self, filename: &str, old_id: i64, new_id: i64) -> Result<usize, Error> {
        if new_id == old_id {
            return Ok(0);
        }
        if self.id_exists(filename, new_id) {
            return Err(Error::DuplicateIdentity {
                filename: filename.to_string(),
                id: new_id,
            });
        }
        let mut changed = 0;
        for row in self
            .rows
            .iter_mut()
            .filter(|r| r.filename == filename && r.id == old_id)
        {
            row.id = new_id;
            changed += 1;
        }
        if changed > 0 {
            debug!("Changed id {} -> {} in {}", old_id, new_id, filename);
            self.dirty = true;
        }
        Ok(changed)
    }

    /// Bulk-rewrite box extents for one frame from canvas geometry: each
    /// entry pairs an id with the shape's current vertex list. Ids with no
    /// matching row are skipped. Returns the number of rows whose
    /// coordinates actually changed.
    pub fn update_coords(&mut self, filename: &str, shapes: &[(i64, Vec<(f32, f32)>)]) -> usize {
        let mut changed = 0;
        for (id, vertices) in shapes {
            if let Some(row) = self
                .rows
                .iter_mut()
                .find(|r| r.filename == filename && r.id == *id)
            {
                if row.set_extents_from_vertices(vertices) {
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            debug!("Updated coordinates of {} tracklet(s) in {}", changed, filename);
            self.dirty = true;
        }
        changed
    }

    /// Rows belonging to one frame, by exact basename match.
    pub fn rows_for_frame(&self, filename: &str) -> Vec<&Tracklet> {
        self.rows.iter().filter(|r| r.filename == filename).collect()
    }

    /// Distinct frame names currently present, sorted.
    pub fn unique_frame_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.rows.iter().map(|r| r.filename.as_str()).collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Ids of all rows whose filename contains `marker` (a timepoint
    /// filter substring).
    pub fn ids_matching(&self, marker: &str) -> BTreeSet<i64> {
        self.rows
            .iter()
            .filter(|r| r.filename.contains(marker))
            .map(|r| r.id)
            .collect()
    }

    /// Ids of all rows whose filename does not contain `marker`.
    pub fn ids_not_matching(&self, marker: &str) -> BTreeSet<i64> {
        self.rows
            .iter()
            .filter(|r| !r.filename.contains(marker))
            .map(|r| r.id)
            .collect()
    }

    pub fn id_exists(&self, filename: &str, id: i64) -> bool {
        self.rows.iter().any(|r| r.filename == filename && r.id == id)
    }

    pub fn rows(&self) -> &[Tracklet] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn filepath(&self) -> Option<&Path> {
        self.filepath.as_deref()
    }
}

impl Default for TrackletStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(filename: &str, id: i64) -> Tracklet {
        Tracklet {
            filename: filename.to_string(),
            xmin: 0.0,
            ymin: 0.0,
            xmax: 10.0,
            ymax: 10.0,
            id,
            score: 1.0,
            class: "spine".to_string(),
            width: 512,
            height: 512,
        }
    }

    #[test]
    fn test_add_rejects_duplicate_identity() {
        let mut store = TrackletStore::new();
        store.add_row(row("f1.png", 3)).unwrap();
        let err = store.add_row(row("f1.png", 3)).unwrap_err();
        assert_eq!(
            err,
            Error::DuplicateIdentity { filename: "f1.png".to_string(), id: 3 }
        );
        // same id in another frame is fine
        store.add_row(row("f2.png", 3)).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_change_id_validates_per_frame() {
        let mut store = TrackletStore::new();
        store.add_row(row("f1.png", 1)).unwrap();
        store.add_row(row("f1.png", 2)).unwrap();
        assert!(store.change_id("f1.png", 1, 2).is_err());
        assert_eq!(store.change_id("f1.png", 1, 9).unwrap(), 1);
        assert!(store.id_exists("f1.png", 9));
        assert!(!store.id_exists("f1.png", 1));
        // relabel to the current id is a no-op, not a collision
        assert_eq!(store.change_id("f1.png", 9, 9).unwrap(), 0);
    }

    #[test]
    fn test_update_coords_touches_only_geometry() {
        let mut store = TrackletStore::new();
        store.add_row(row("f1.png", 3)).unwrap();
        let shapes = vec![(3, vec![(4.0, 12.0), (30.0, 12.0), (30.0, 40.0), (4.0, 40.0)])];
        assert_eq!(store.update_coords("f1.png", &shapes), 1);
        let r = &store.rows_for_frame("f1.png")[0];
        assert_eq!((r.xmin, r.ymin, r.xmax, r.ymax), (4.0, 12.0, 30.0, 40.0));
        assert_eq!(r.score, 1.0);
        assert_eq!(r.class, "spine");
        assert_eq!((r.width, r.height), (512, 512));
        // identical geometry again changes nothing
        assert_eq!(store.update_coords("f1.png", &shapes), 0);
    }

    #[test]
    fn test_remove_rows() {
        let mut store = TrackletStore::new();
        store.add_row(row("f1.png", 3)).unwrap();
        store.add_row(row("f1.png", 4)).unwrap();
        assert_eq!(store.remove_rows("f1.png", &[3]), 1);
        assert_eq!(store.remove_rows("f1.png", &[99]), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unique_frame_names_and_id_sets() {
        let mut store = TrackletStore::new();
        store.add_row(row("a_tp1_layer001.png", 5)).unwrap();
        store.add_row(row("a_tp2_layer001.png", 5)).unwrap();
        store.add_row(row("a_tp1_layer002.png", 7)).unwrap();
        assert_eq!(
            store.unique_frame_names(),
            vec!["a_tp1_layer001.png", "a_tp1_layer002.png", "a_tp2_layer001.png"]
        );
        let tp1: Vec<i64> = store.ids_matching("_tp1_").into_iter().collect();
        let other: Vec<i64> = store.ids_not_matching("_tp1_").into_iter().collect();
        assert_eq!(tp1, vec![5, 7]);
        assert_eq!(other, vec![5]);
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut store = TrackletStore::new();
        store.add_row(row("f1.png", 3)).unwrap();
        store.add_row(row("f2.png", 0)).unwrap();

        let path = std::env::temp_dir().join(format!("trackcurator_store_{}.csv", std::process::id()));
        store.save(Some(&path)).unwrap();
        assert!(!store.is_dirty());

        let mut reloaded = TrackletStore::new();
        reloaded.load(&path).unwrap();
        assert_eq!(reloaded.rows(), store.rows());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_delete_then_save_removes_row() {
        let mut store = TrackletStore::new();
        store.add_row(row("f1.png", 3)).unwrap();
        store.remove_rows("f1.png", &[3]);

        let path = std::env::temp_dir().join(format!("trackcurator_del_{}.csv", std::process::id()));
        store.save(Some(&path)).unwrap();

        let mut reloaded = TrackletStore::new();
        reloaded.load(&path).unwrap();
        assert!(!reloaded.id_exists("f1.png", 3));
        assert!(reloaded.is_empty());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_failed_load_retains_previous_rows() {
        let mut store = TrackletStore::new();
        store.add_row(row("f1.png", 3)).unwrap();

        let path = std::env::temp_dir().join(format!("trackcurator_bad_{}.csv", std::process::id()));
        std::fs::write(&path, "not,a,tracklet,file\n1,2,3,4\n").unwrap();
        assert!(store.load(&path).is_err());
        assert_eq!(store.len(), 1);
        std::fs::remove_file(&path).ok();
    }
}
