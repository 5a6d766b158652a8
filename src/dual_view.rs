/// Dual viewer
///
/// Owns the tracklet store and the two frame sessions (one per timepoint
/// sequence), relays the cross-cutting toggles, and is the only place that
/// triggers persistence. Sessions read and write the store only through
/// the references handed to them here.
use std::path::{Path, PathBuf};

use log::info;

use crate::canvas::{CanvasEvent, SessionEffect};
use crate::config::CONFIG;
use crate::error::Error;
use crate::frame_index;
use crate::session::FrameSession;
use crate::store::TrackletStore;

/// Session effects tagged with the pane (0 or 1) they apply to.
pub type PaneEffects = Vec<(usize, SessionEffect)>;

#[derive(Debug)]
pub struct DualViewer {
    store: TrackletStore,
    sessions: [FrameSession; 2],
    sync_frames: bool,
    selection_mode: bool,
}

impl DualViewer {
    /// Build a viewer over the stacks referenced by the store's rows,
    /// partitioned into the two timepoint sequences.
    pub fn new(
        store: TrackletStore,
        img_dir: &Path,
        filter_t1: &str,
        filter_t2: &str,
    ) -> Result<Self, Error> {
        let stacks = frame_index::stack_names(&store.unique_frame_names());
        Self::with_stacks(store, img_dir, &stacks, filter_t1, filter_t2)
    }

    /// Build a viewer over an explicit stack-name list. This is the path
    /// for a table with no rows yet, where the stack names cannot be
    /// derived and are supplied by hand.
    pub fn with_stacks(
        store: TrackletStore,
        img_dir: &Path,
        stacks: &[String],
        filter_t1: &str,
        filter_t2: &str,
    ) -> Result<Self, Error> {
        let frames = frame_index::list_frames_for_stacks(img_dir, stacks)?;
        if frames.is_empty() {
            return Err(Error::EmptySequence);
        }
        let (frames_t1, frames_t2) = frame_index::partition_by_filter(&frames, filter_t1, filter_t2);
        info!(
            "Indexed {} frames across {} stack(s): {} in {}, {} in {}",
            frames.len(),
            stacks.len(),
            frames_t1.len(),
            filter_t1,
            frames_t2.len(),
            filter_t2
        );

        let sessions = [
            FrameSession::new(Some(filter_t1.to_string()), frames_t1)?,
            FrameSession::new(Some(filter_t2.to_string()), frames_t2)?,
        ];
        Ok(Self {
            store,
            sessions,
            sync_frames: CONFIG.sync_frames,
            selection_mode: false,
        })
    }

    pub fn store(&self) -> &TrackletStore {
        &self.store
    }

    pub fn session(&self, pane: usize) -> &FrameSession {
        &self.sessions[pane]
    }

    pub fn is_synchronized(&self) -> bool {
        self.sync_frames
    }

    /// Move one pane's frame cursor; with synchronization on, the other
    /// pane follows to the same index, clamped to its own range.
    pub fn set_frame(&mut self, pane: usize, frame: usize) -> PaneEffects {
        let mut effects = tag(pane, self.sessions[pane].set_frame(&mut self.store, frame));
        if self.sync_frames {
            let other = 1 - pane;
            let clamped = frame.min(self.sessions[other].frame_count() - 1);
            effects.extend(tag(other, self.sessions[other].set_frame(&mut self.store, clamped)));
        }
        effects
    }

    pub fn step_frame(&mut self, pane: usize, delta: isize) -> PaneEffects {
        let current = self.sessions[pane].frame_num() as isize;
        let last = self.sessions[pane].frame_count() as isize - 1;
        let frame = (current + delta).clamp(0, last) as usize;
        self.set_frame(pane, frame)
    }

    pub fn toggle_synchronize(&mut self, on: bool) {
        self.sync_frames = on;
    }

    /// Propagate selection mode to both panes' shape layers.
    pub fn toggle_selection_mode(&mut self, on: bool) -> PaneEffects {
        self.selection_mode = on;
        let mut effects = tag(0, self.sessions[0].set_selection_mode(on));
        effects.extend(tag(1, self.sessions[1].set_selection_mode(on)));
        effects
    }

    pub fn toggle_show_boxes(&mut self, pane: usize, on: bool) -> PaneEffects {
        tag(pane, self.sessions[pane].toggle_show_boxes(&mut self.store, on))
    }

    pub fn begin_add_shape(&mut self, pane: usize) -> PaneEffects {
        tag(pane, self.sessions[pane].begin_add_shape(&mut self.store))
    }

    pub fn handle_event(&mut self, pane: usize, event: CanvasEvent) -> Result<PaneEffects, Error> {
        Ok(tag(pane, self.sessions[pane].handle_event(&mut self.store, event)?))
    }

    pub fn delete_selected(&mut self, pane: usize) -> Result<PaneEffects, Error> {
        Ok(tag(pane, self.sessions[pane].delete_selected(&mut self.store)?))
    }

    pub fn relabel_selected(&mut self, pane: usize, new_id: i64) -> Result<PaneEffects, Error> {
        Ok(tag(pane, self.sessions[pane].relabel_selected(&mut self.store, new_id)?))
    }

    /// Flush both panes' pending edits, then persist the table.
    pub fn save_all(&mut self) -> Result<PathBuf, Error> {
        for session in &mut self.sessions {
            session.flush_pending_edits(&mut self.store);
        }
        self.store.save(None)
    }
}

/// Single-sequence variant: one session over the undivided frame list, no
/// timepoint partition, no synchronization, no cross-timepoint coloring.
pub struct SingleViewer {
    store: TrackletStore,
    session: FrameSession,
}

impl SingleViewer {
    pub fn new(store: TrackletStore, img_dir: &Path) -> Result<Self, Error> {
        let stacks = frame_index::stack_names(&store.unique_frame_names());
        Self::with_stacks(store, img_dir, &stacks)
    }

    pub fn with_stacks(store: TrackletStore, img_dir: &Path, stacks: &[String]) -> Result<Self, Error> {
        let frames = frame_index::list_frames_for_stacks(img_dir, stacks)?;
        if frames.is_empty() {
            return Err(Error::EmptySequence);
        }
        info!("Indexed {} frames across {} stack(s)", frames.len(), stacks.len());
        Ok(Self {
            store,
            session: FrameSession::new(None, frames)?,
        })
    }

    pub fn store(&self) -> &TrackletStore {
        &self.store
    }

    pub fn session(&self) -> &FrameSession {
        &self.session
    }

    pub fn set_frame(&mut self, frame: usize) -> Vec<SessionEffect> {
        self.session.set_frame(&mut self.store, frame)
    }

    pub fn step_frame(&mut self, delta: isize) -> Vec<SessionEffect> {
        self.session.step_frame(&mut self.store, delta)
    }

    pub fn toggle_show_boxes(&mut self, on: bool) -> Vec<SessionEffect> {
        self.session.toggle_show_boxes(&mut self.store, on)
    }

    pub fn toggle_selection_mode(&mut self, on: bool) -> Vec<SessionEffect> {
        self.session.set_selection_mode(on)
    }

    pub fn begin_add_shape(&mut self) -> Vec<SessionEffect> {
        self.session.begin_add_shape(&mut self.store)
    }

    pub fn handle_event(&mut self, event: CanvasEvent) -> Result<Vec<SessionEffect>, Error> {
        self.session.handle_event(&mut self.store, event)
    }

    pub fn delete_selected(&mut self) -> Result<Vec<SessionEffect>, Error> {
        self.session.delete_selected(&mut self.store)
    }

    pub fn relabel_selected(&mut self, new_id: i64) -> Result<Vec<SessionEffect>, Error> {
        self.session.relabel_selected(&mut self.store, new_id)
    }

    pub fn save(&mut self) -> Result<PathBuf, Error> {
        self.session.flush_pending_edits(&mut self.store);
        self.store.save(None)
    }
}

fn tag(pane: usize, effects: Vec<SessionEffect>) -> PaneEffects {
    effects.into_iter().map(|e| (pane, e)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracklet::Tracklet;

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

    /// Temp image dir with two frames in tp1 and three in tp2.
    fn frame_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("trackcurator_dv_{}_{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in [
            "a_tp1_layer001.png",
            "a_tp1_layer002.png",
            "a_tp2_layer001.png",
            "a_tp2_layer002.png",
            "a_tp2_layer003.png",
        ] {
            std::fs::write(dir.join(name), b"").unwrap();
        }
        dir
    }

    fn fixture(tag: &str) -> (DualViewer, std::path::PathBuf) {
        let store = TrackletStore::from_rows(vec![
            row("a_tp1_layer001.png", 5),
            row("a_tp2_layer001.png", 5),
        ]);
        let dir = frame_dir(tag);
        let viewer = DualViewer::new(store, &dir, "_tp1_", "_tp2_").unwrap();
        (viewer, dir)
    }

    #[test]
    fn test_partition_into_sessions() {
        let (viewer, dir) = fixture("partition");
        assert_eq!(viewer.session(0).frame_count(), 2);
        assert_eq!(viewer.session(1).frame_count(), 3);
        assert_eq!(viewer.session(0).timepoint(), Some("_tp1_"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let dir = std::env::temp_dir().join(format!("trackcurator_dv_empty_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let err = DualViewer::new(TrackletStore::new(), &dir, "_tp1_", "_tp2_").unwrap_err();
        assert_eq!(err, Error::EmptySequence);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_sync_clamps_follower_to_its_range() {
        let (mut viewer, dir) = fixture("clamp");
        viewer.toggle_synchronize(true);
        // pane 1 has 3 frames; pane 0 only 2 and must clamp to its last
        viewer.set_frame(1, 2);
        assert_eq!(viewer.session(1).frame_num(), 2);
        assert_eq!(viewer.session(0).frame_num(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unsynchronized_cursors_are_independent() {
        let (mut viewer, dir) = fixture("nosync");
        viewer.toggle_synchronize(false);
        viewer.set_frame(1, 2);
        assert_eq!(viewer.session(1).frame_num(), 2);
        assert_eq!(viewer.session(0).frame_num(), 0);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_selection_mode_reaches_both_panes() {
        let (mut viewer, dir) = fixture("selmode");
        viewer.toggle_show_boxes(0, true);
        viewer.toggle_show_boxes(1, true);
        let effects = viewer.toggle_selection_mode(true);
        assert!(effects.contains(&(0, SessionEffect::SetSelectionMode(true))));
        assert!(effects.contains(&(1, SessionEffect::SetSelectionMode(true))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_all_flushes_pending_edits() {
        let dir = frame_dir("save");
        let csv = dir.join("tracklets.csv");
        std::fs::write(
            &csv,
            "filename,xmin,ymin,xmax,ymax,id,score,class,width,height\n\
             a_tp1_layer001.png,0,0,10,10,5,1,spine,512,512\n\
             a_tp2_layer001.png,0,0,10,10,5,1,spine,512,512\n",
        )
        .unwrap();
        let mut store = TrackletStore::new();
        store.load(&csv).unwrap();
        let mut viewer = DualViewer::new(store, &dir, "_tp1_", "_tp2_").unwrap();

        viewer.toggle_show_boxes(0, true);
        viewer.toggle_selection_mode(true);
        let moved = vec![(4.0, 12.0), (30.0, 12.0), (30.0, 40.0), (4.0, 40.0)];
        viewer.handle_event(0, CanvasEvent::DragBegin { shape: 0 }).unwrap();
        viewer
            .handle_event(0, CanvasEvent::DragMove { shape: 0, vertices: moved })
            .unwrap();
        viewer.save_all().unwrap();

        let mut reloaded = TrackletStore::new();
        reloaded.load(&csv).unwrap();
        let r = &reloaded.rows_for_frame("a_tp1_layer001.png")[0];
        assert_eq!((r.xmin, r.ymin, r.xmax, r.ymax), (4.0, 12.0, 30.0, 40.0));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_single_viewer_spans_all_frames() {
        let store = TrackletStore::from_rows(vec![
            row("a_tp1_layer001.png", 5),
            row("a_tp2_layer001.png", 6),
        ]);
        let dir = frame_dir("single");
        let viewer = SingleViewer::new(store, &dir).unwrap();
        assert_eq!(viewer.session().frame_count(), 5);
        assert_eq!(viewer.session().timepoint(), None);
        std::fs::remove_dir_all(&dir).ok();
    }
}
