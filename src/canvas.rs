/// Canvas interface types
///
/// The rendering surface is host-owned: the engine hands it shape lists and
/// image commands, and consumes the discrete begin/move/end messages its
/// gesture handling emits. Everything crossing that boundary is defined
/// here.

/// RGB color in 0..=1 channels, matching what shape layers take directly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Cycling palette keyed by id, so the same identity keeps its color across
/// frames and timepoints.
pub const IDENTITY_PALETTE: [Color; 20] = [
    Color::rgb(0.1216, 0.4667, 0.7059),
    Color::rgb(0.6824, 0.7804, 0.9098),
    Color::rgb(1.0000, 0.4980, 0.0549),
    Color::rgb(1.0000, 0.7333, 0.4706),
    Color::rgb(0.1725, 0.6275, 0.1725),
    Color::rgb(0.5961, 0.8745, 0.5412),
    Color::rgb(0.8392, 0.1529, 0.1569),
    Color::rgb(1.0000, 0.5961, 0.5882),
    Color::rgb(0.5804, 0.4039, 0.7412),
    Color::rgb(0.7725, 0.6902, 0.8353),
    Color::rgb(0.5490, 0.3373, 0.2941),
    Color::rgb(0.7686, 0.6118, 0.5804),
    Color::rgb(0.8902, 0.4667, 0.7608),
    Color::rgb(0.9686, 0.7137, 0.8235),
    Color::rgb(0.4980, 0.4980, 0.4980),
    Color::rgb(0.7804, 0.7804, 0.7804),
    Color::rgb(0.7373, 0.7412, 0.1333),
    Color::rgb(0.8588, 0.8588, 0.5529),
    Color::rgb(0.0902, 0.7451, 0.8118),
    Color::rgb(0.6196, 0.8549, 0.8980),
];

/// Magenta marks an id seen in only one of the two timepoint sequences.
pub const UNMATCHED_COLOR: Color = Color::rgb(1.0, 0.0, 1.0);

/// New shapes are drawn green until committed.
pub const PROVISIONAL_COLOR: Color = Color::rgb(0.0, 1.0, 0.0);

pub fn palette_color(id: i64) -> Color {
    IDENTITY_PALETTE[id.rem_euclid(IDENTITY_PALETTE.len() as i64) as usize]
}

/// One polygon for the rendering surface to draw. Vertices are (x, y)
/// pixel coordinates in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSpec {
    pub vertices: Vec<(f32, f32)>,
    pub color: Color,
    pub label: String,
    pub selected: bool,
}

/// User-interaction messages emitted by the rendering surface. Drag and
/// draw gestures arrive as begin/move/end triples; the engine defers store
/// writes until the end message.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    /// The user grabbed an existing shape (index into the drawn list).
    DragBegin { shape: usize },
    DragMove { shape: usize, vertices: Vec<(f32, f32)> },
    DragEnd { shape: usize, vertices: Vec<(f32, f32)> },
    /// The user pressed down while a draw gesture was armed.
    DrawBegin { pos: (f32, f32) },
    DrawMove { pos: (f32, f32) },
    DrawEnd { pos: (f32, f32) },
    /// Selection changed; indices into the drawn list.
    ShapesSelected { shapes: Vec<usize> },
    /// Escape: abort the gesture in progress without mutating the table.
    Cancel,
}

/// A request for the host's dialog surface.
#[derive(Debug, Clone, PartialEq)]
pub enum DialogRequest {
    /// Prompt for an integer id; `next_free` is shown as a hint.
    PromptId { current: i64, next_free: i64 },
}

/// Commands the engine hands back to the host after an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Swap the displayed image and republish its contrast limits.
    SetImage {
        filename: String,
        contrast_limits: (u32, u32),
    },
    /// Replace the shape overlay with this list.
    DrawShapes(Vec<ShapeSpec>),
    /// Remove the shape overlay entirely.
    ClearShapes,
    /// Flip the shape layer between select and pan-only handling.
    SetSelectionMode(bool),
    Dialog(DialogRequest),
}
