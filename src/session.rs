/// Frame session
///
/// Bridges one frame sequence and its slice of the tracklet table to the
/// rendering surface. Three representations are kept in step: the persisted
/// rows, the shapes on the canvas, and the gesture in progress. Canvas
/// geometry is written back to the store only at gesture end, and always
/// flushed before the shapes are discarded (frame switch, overlay toggle,
/// save) — dropping shapes without a flush would silently lose edits.
use log::{debug, warn};

use crate::canvas::{
    palette_color, CanvasEvent, DialogRequest, SessionEffect, ShapeSpec, UNMATCHED_COLOR,
};
use crate::config::{CONFIG, DEFAULT_SCORE};
use crate::error::Error;
use crate::identity;
use crate::store::TrackletStore;
use crate::tracklet::Tracklet;

/// One shape on the canvas, mirroring a committed row of the current frame.
#[derive(Debug, Clone)]
struct CanvasShape {
    id: i64,
    vertices: Vec<(f32, f32)>,
    selected: bool,
}

/// Gesture state machine driven by discrete begin/move/end messages from
/// the rendering surface.
#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    /// Add-shape mode armed; the next DrawBegin starts a rectangle.
    ArmedDraw,
    /// Rubber-band rectangle in progress. Nothing is committed yet; the
    /// host draws the provisional outline itself.
    Drawing { start: (f32, f32), current: (f32, f32) },
    /// An existing shape is mid-drag; moves are echoed to the canvas copy
    /// and written through at DragEnd.
    Dragging { shape: usize },
}

#[derive(Debug)]
pub struct FrameSession {
    /// Timepoint marker of this sequence, e.g. "_tp1_". None in
    /// single-view mode, which disables cross-timepoint coloring.
    timepoint: Option<String>,
    filenames: Vec<String>,
    frame_num: usize,
    show_boxes: bool,
    selection_mode: bool,
    shapes: Vec<CanvasShape>,
    gesture: Gesture,
    contrast_limits: (u32, u32),
    intensity_ceiling: u32,
}

impl FrameSession {
    pub fn new(timepoint: Option<String>, filenames: Vec<String>) -> Result<Self, Error> {
        if filenames.is_empty() {
            return Err(Error::EmptySequence);
        }
        Ok(Self {
            timepoint,
            filenames,
            frame_num: 0,
            show_boxes: false,
            selection_mode: false,
            shapes: Vec::new(),
            gesture: Gesture::Idle,
            contrast_limits: (0, u16::MAX as u32 + 1),
            intensity_ceiling: u16::MAX as u32 + 1,
        })
    }

    pub fn current_frame(&self) -> &str {
        &self.filenames[self.frame_num]
    }

    pub fn frame_num(&self) -> usize {
        self.frame_num
    }

    pub fn frame_count(&self) -> usize {
        self.filenames.len()
    }

    pub fn timepoint(&self) -> Option<&str> {
        self.timepoint.as_deref()
    }

    pub fn is_showing_boxes(&self) -> bool {
        self.show_boxes
    }

    pub fn contrast_limits(&self) -> (u32, u32) {
        self.contrast_limits
    }

    /// Host-computed intensity ceiling for the contrast slider range
    /// (see `image_source::contrast_ceiling`). Resets the limits to the
    /// full range.
    pub fn set_intensity_ceiling(&mut self, ceiling: u32) {
        self.intensity_ceiling = ceiling;
        self.contrast_limits = (0, ceiling);
    }

    pub fn set_contrast_limits(&mut self, limits: (u32, u32)) {
        let hi = limits.1.min(self.intensity_ceiling);
        self.contrast_limits = (limits.0.min(hi), hi);
    }

    /// Move the frame cursor. Pending edits are flushed before the shape
    /// list is rebuilt for the new frame. Calling with the current frame is
    /// a no-op.
    pub fn set_frame(&mut self, store: &mut TrackletStore, frame: usize) -> Vec<SessionEffect> {
        let frame = frame.min(self.filenames.len() - 1);
        if frame == self.frame_num {
            return Vec::new();
        }
        self.flush_pending_edits(store);
        self.gesture = Gesture::Idle;
        self.frame_num = frame;
        debug!(
            "Frame {}/{}: {}",
            frame + 1,
            self.filenames.len(),
            self.current_frame()
        );
        self.rebuild_shapes(store);

        let mut effects = vec![SessionEffect::SetImage {
            filename: self.current_frame().to_string(),
            contrast_limits: self.contrast_limits,
        }];
        effects.extend(self.redraw(store));
        effects
    }

    /// Step the cursor by `delta`, clamped to the sequence bounds.
    pub fn step_frame(&mut self, store: &mut TrackletStore, delta: isize) -> Vec<SessionEffect> {
        let last = self.filenames.len() as isize - 1;
        let frame = (self.frame_num as isize + delta).clamp(0, last) as usize;
        self.set_frame(store, frame)
    }

    /// Show or hide the box overlay. Hiding flushes pending edits before
    /// the shapes are discarded.
    pub fn toggle_show_boxes(&mut self, store: &mut TrackletStore, on: bool) -> Vec<SessionEffect> {
        if on == self.show_boxes {
            return Vec::new();
        }
        if on {
            self.show_boxes = true;
            self.rebuild_shapes(store);
            let mut effects = self.redraw(store);
            effects.push(SessionEffect::SetSelectionMode(self.selection_mode));
            effects
        } else {
            self.flush_pending_edits(store);
            self.gesture = Gesture::Idle;
            self.show_boxes = false;
            self.shapes.clear();
            vec![SessionEffect::ClearShapes]
        }
    }

    /// Flip the shape layer between select and pan-only handling.
    pub fn set_selection_mode(&mut self, on: bool) -> Vec<SessionEffect> {
        self.selection_mode = on;
        if !on && self.gesture != Gesture::Idle {
            self.gesture = Gesture::Idle;
        }
        if self.show_boxes {
            vec![SessionEffect::SetSelectionMode(on)]
        } else {
            Vec::new()
        }
    }

    /// Arm the add-shape gesture. The overlay and selection mode are
    /// switched on if needed. Calling while already armed disarms instead.
    pub fn begin_add_shape(&mut self, store: &mut TrackletStore) -> Vec<SessionEffect> {
        if matches!(self.gesture, Gesture::ArmedDraw | Gesture::Drawing { .. }) {
            self.gesture = Gesture::Idle;
            return Vec::new();
        }

        let mut effects = Vec::new();
        if !self.show_boxes {
            effects.extend(self.toggle_show_boxes(store, true));
        }
        if !self.selection_mode {
            effects.extend(self.set_selection_mode(true));
        }
        self.flush_pending_edits(store);
        self.gesture = Gesture::ArmedDraw;
        effects
    }

    /// Consume one message from the rendering surface.
    pub fn handle_event(
        &mut self,
        store: &mut TrackletStore,
        event: CanvasEvent,
    ) -> Result<Vec<SessionEffect>, Error> {
        match event {
            CanvasEvent::DragBegin { shape } => {
                if !self.show_boxes || !self.selection_mode {
                    return Ok(Vec::new());
                }
                if shape >= self.shapes.len() {
                    warn!("DragBegin for unknown shape {}", shape);
                    return Ok(Vec::new());
                }
                self.gesture = Gesture::Dragging { shape };
                self.select_only(shape);
                Ok(Vec::new())
            }
            CanvasEvent::DragMove { shape, vertices } => {
                if self.gesture == (Gesture::Dragging { shape }) {
                    // echo only; the store is written at DragEnd
                    self.shapes[shape].vertices = vertices;
                }
                Ok(Vec::new())
            }
            CanvasEvent::DragEnd { shape, vertices } => {
                if self.gesture != (Gesture::Dragging { shape }) {
                    return Ok(Vec::new());
                }
                self.gesture = Gesture::Idle;
                self.shapes[shape].vertices = vertices.clone();
                let id = self.shapes[shape].id;
                let frame = self.current_frame().to_string();
                store.update_coords(&frame, &[(id, vertices)]);
                Ok(self.redraw(store))
            }
            CanvasEvent::DrawBegin { pos } => {
                if self.gesture == Gesture::ArmedDraw {
                    self.gesture = Gesture::Drawing { start: pos, current: pos };
                }
                Ok(Vec::new())
            }
            CanvasEvent::DrawMove { pos } => {
                if let Gesture::Drawing { start, .. } = self.gesture {
                    self.gesture = Gesture::Drawing { start, current: pos };
                }
                Ok(Vec::new())
            }
            CanvasEvent::DrawEnd { pos } => self.finish_draw(store, pos),
            CanvasEvent::ShapesSelected { shapes } => {
                for (idx, shape) in self.shapes.iter_mut().enumerate() {
                    shape.selected = shapes.contains(&idx);
                }
                Ok(Vec::new())
            }
            CanvasEvent::Cancel => Ok(self.cancel(store)),
        }
    }

    /// Commit a finished draw gesture: synthesize a row with the next free
    /// id and hand the host an id prompt. A click without any movement
    /// commits nothing.
    fn finish_draw(
        &mut self,
        store: &mut TrackletStore,
        pos: (f32, f32),
    ) -> Result<Vec<SessionEffect>, Error> {
        let start = match self.gesture {
            Gesture::Drawing { start, .. } => start,
            _ => return Ok(Vec::new()),
        };
        self.gesture = Gesture::Idle;

        let (xmin, xmax) = (start.0.min(pos.0), start.0.max(pos.0));
        let (ymin, ymax) = (start.1.min(pos.1), start.1.max(pos.1));
        if xmin == xmax || ymin == ymax {
            debug!("Discarding degenerate draw gesture");
            return Ok(Vec::new());
        }

        let id = identity::next_id(store);
        let frame = self.current_frame().to_string();
        store.add_row(Tracklet {
            filename: frame,
            xmin,
            ymin,
            xmax,
            ymax,
            id,
            score: DEFAULT_SCORE,
            class: CONFIG.default_class.clone(),
            width: CONFIG.default_frame_size,
            height: CONFIG.default_frame_size,
        })?;

        self.shapes.push(CanvasShape {
            id,
            vertices: vec![(xmin, ymin), (xmax, ymin), (xmax, ymax), (xmin, ymax)],
            selected: false,
        });
        let new_idx = self.shapes.len() - 1;
        self.select_only(new_idx);

        let mut effects = self.redraw(store);
        effects.push(SessionEffect::Dialog(DialogRequest::PromptId {
            current: id,
            next_free: identity::next_id(store),
        }));
        Ok(effects)
    }

    /// Abort the gesture in progress without mutating the table. A
    /// cancelled drag reverts the canvas copy to the stored geometry.
    fn cancel(&mut self, store: &TrackletStore) -> Vec<SessionEffect> {
        match self.gesture {
            Gesture::Idle => Vec::new(),
            Gesture::ArmedDraw | Gesture::Drawing { .. } => {
                self.gesture = Gesture::Idle;
                Vec::new()
            }
            Gesture::Dragging { .. } => {
                self.gesture = Gesture::Idle;
                self.rebuild_shapes(store);
                self.redraw(store)
            }
        }
    }

    /// Delete the single selected shape and its row. Zero or multiple
    /// selections abort with a user-visible message.
    pub fn delete_selected(&mut self, store: &mut TrackletStore) -> Result<Vec<SessionEffect>, Error> {
        let id = self.single_selected_id()?;
        self.flush_pending_edits(store);
        let frame = self.current_frame().to_string();
        store.remove_rows(&frame, &[id]);
        self.rebuild_shapes(store);
        Ok(self.redraw(store))
    }

    /// Relabel the single selected shape. The new id must be free within
    /// the current frame; on collision nothing is mutated.
    pub fn relabel_selected(
        &mut self,
        store: &mut TrackletStore,
        new_id: i64,
    ) -> Result<Vec<SessionEffect>, Error> {
        let old_id = self.single_selected_id()?;
        if new_id == old_id {
            return Ok(Vec::new());
        }
        let frame = self.current_frame().to_string();
        if identity::is_taken(store, &frame, new_id) {
            return Err(Error::DuplicateIdentity { filename: frame, id: new_id });
        }
        self.flush_pending_edits(store);
        store.change_id(&frame, old_id, new_id)?;
        for shape in self.shapes.iter_mut().filter(|s| s.id == old_id) {
            shape.id = new_id;
        }
        Ok(self.redraw(store))
    }

    /// Write every displayed shape's extents through to the store. This is
    /// the synchronization point between what the user sees and what is
    /// persisted; it runs before frame switches, overlay hiding, and saves.
    /// Returns the number of rows whose coordinates changed, so a repeated
    /// flush with unchanged shapes is a no-op.
    pub fn flush_pending_edits(&mut self, store: &mut TrackletStore) -> usize {
        if self.shapes.is_empty() {
            return 0;
        }
        let frame = self.current_frame().to_string();
        let geometry: Vec<(i64, Vec<(f32, f32)>)> = self
            .shapes
            .iter()
            .map(|s| (s.id, s.vertices.clone()))
            .collect();
        store.update_coords(&frame, &geometry)
    }

    /// Build the draw list for the current frame. An id present in rows of
    /// both timepoint sequences keeps its palette color; a sequence-local
    /// id is flagged magenta. Single-view sessions color by palette alone.
    pub fn render_shapes(&self, store: &TrackletStore) -> Vec<ShapeSpec> {
        let matched = self.timepoint.as_deref().map(|tp| {
            let here = store.ids_matching(tp);
            let there = store.ids_not_matching(tp);
            here.intersection(&there).copied().collect::<std::collections::BTreeSet<i64>>()
        });

        self.shapes
            .iter()
            .map(|shape| {
                let color = match &matched {
                    Some(both) if !both.contains(&shape.id) => UNMATCHED_COLOR,
                    _ => palette_color(shape.id),
                };
                ShapeSpec {
                    vertices: shape.vertices.clone(),
                    color,
                    label: shape.id.to_string(),
                    selected: shape.selected,
                }
            })
            .collect()
    }

    fn redraw(&self, store: &TrackletStore) -> Vec<SessionEffect> {
        if self.show_boxes {
            vec![SessionEffect::DrawShapes(self.render_shapes(store))]
        } else {
            vec![SessionEffect::ClearShapes]
        }
    }

    fn rebuild_shapes(&mut self, store: &TrackletStore) {
        self.shapes = store
            .rows_for_frame(self.current_frame())
            .into_iter()
            .map(|row| CanvasShape {
                id: row.id,
                vertices: row.corners().to_vec(),
                selected: false,
            })
            .collect();
    }

    fn select_only(&mut self, idx: usize) {
        for (i, shape) in self.shapes.iter_mut().enumerate() {
            shape.selected = i == idx;
        }
    }

    fn single_selected_id(&self) -> Result<i64, Error> {
        let selected: Vec<&CanvasShape> = self.shapes.iter().filter(|s| s.selected).collect();
        match selected.as_slice() {
            [one] => Ok(one.id),
            [] => Err(Error::Selection("No shape selected".to_string())),
            _ => Err(Error::Selection("More than one shape selected".to_string())),
        }
    }
}
