/// Frame enumeration and timepoint partitioning
///
/// Frames on disk follow the `<stack>_layer<index>.<ext>` convention. The
/// stack prefix names one imaged subject/region and embeds the timepoint
/// marker (e.g. `aidv890_date010203_tp1_stack7_sub11`); the layer index
/// orders frames within the stack.
use std::collections::BTreeSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Error;

const SUPPORTED_EXTENSIONS: [&str; 5] = ["png", "tif", "tiff", "bmp", "pgm"];

static FRAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<stack>.+)_layer(?P<layer>\d+)\.(?P<ext>[A-Za-z0-9]+)$")
        .expect("frame pattern is valid")
});

/// Structured key parsed once from a frame basename, so that all stack and
/// ordering decisions are exact matches instead of substring containment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameKey {
    pub stack: String,
    pub layer: u32,
}

impl FrameKey {
    pub fn parse(filename: &str) -> Option<FrameKey> {
        let caps = FRAME_PATTERN.captures(filename)?;
        let ext = caps["ext"].to_ascii_lowercase();
        if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
            return None;
        }
        Some(FrameKey {
            stack: caps["stack"].to_string(),
            layer: caps["layer"].parse().ok()?,
        })
    }
}

/// Distinct stack names referenced by a set of frame basenames. Names that
/// do not follow the frame convention are skipped.
pub fn stack_names(filenames: &[String]) -> Vec<String> {
    let stacks: BTreeSet<String> = filenames
        .iter()
        .filter_map(|f| FrameKey::parse(f))
        .map(|key| key.stack)
        .collect();
    stacks.into_iter().collect()
}

/// Enumerate frames on disk belonging to the given stacks, ordered by
/// natural sort so unpadded layer indices still come out numerically.
/// Returns basenames.
pub fn list_frames_for_stacks(img_dir: &Path, stacks: &[String]) -> Result<Vec<String>, Error> {
    let entries = std::fs::read_dir(img_dir)
        .map_err(|e| Error::Io(format!("failed to read {}: {}", img_dir.display(), e)))?;

    let mut frames: Vec<String> = Vec::new();
    for entry in entries.flatten() {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if let Some(key) = FrameKey::parse(&name) {
            if stacks.iter().any(|s| *s == key.stack) {
                frames.push(name);
            }
        }
    }

    alphanumeric_sort::sort_str_slice(&mut frames);
    Ok(frames)
}

/// Split a frame list into the two timepoint subsequences by substring
/// containment of the filter markers. A frame matching neither filter is
/// dropped; the caller keeps the filters disjoint by construction
/// (e.g. "_tp1_" vs "_tp2_").
pub fn partition_by_filter(
    frames: &[String],
    filter_a: &str,
    filter_b: &str,
) -> (Vec<String>, Vec<String>) {
    let a = frames.iter().filter(|f| f.contains(filter_a)).cloned().collect();
    let b = frames.iter().filter(|f| f.contains(filter_b)).cloned().collect();
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_key_parse() {
        let key = FrameKey::parse("aidv890_date010203_tp1_stack7_sub11_layer012.png").unwrap();
        assert_eq!(key.stack, "aidv890_date010203_tp1_stack7_sub11");
        assert_eq!(key.layer, 12);

        assert!(FrameKey::parse("notes.txt").is_none());
        assert!(FrameKey::parse("a_layer3.csv").is_none());
        assert!(FrameKey::parse("no_layer_suffix.png").is_none());
    }

    #[test]
    fn test_stack_names_exact() {
        let filenames = vec![
            "stack1_layer001.png".to_string(),
            "stack10_layer001.png".to_string(),
            "stack1_layer002.png".to_string(),
        ];
        // stack1 must not swallow stack10
        assert_eq!(stack_names(&filenames), vec!["stack1", "stack10"]);
    }

    #[test]
    fn test_partition_disjoint() {
        let frames = vec![
            "a_tp1_layer001.png".to_string(),
            "a_tp2_layer001.png".to_string(),
        ];
        let (t1, t2) = partition_by_filter(&frames, "_tp1_", "_tp2_");
        assert_eq!(t1, vec!["a_tp1_layer001.png"]);
        assert_eq!(t2, vec!["a_tp2_layer001.png"]);
    }

    #[test]
    fn test_partition_drops_unmatched() {
        let frames = vec![
            "a_tp1_layer001.png".to_string(),
            "a_tp3_layer001.png".to_string(),
        ];
        let (t1, t2) = partition_by_filter(&frames, "_tp1_", "_tp2_");
        assert_eq!(t1.len(), 1);
        assert!(t2.is_empty());
    }

    #[test]
    fn test_list_frames_sorted_naturally() {
        let dir = std::env::temp_dir().join(format!("trackcurator_frames_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        for name in ["s_tp1_layer10.png", "s_tp1_layer2.png", "s_tp1_layer1.png", "other.png"] {
            std::fs::write(dir.join(name), b"").unwrap();
        }

        let frames = list_frames_for_stacks(&dir, &["s_tp1".to_string()]).unwrap();
        assert_eq!(
            frames,
            vec!["s_tp1_layer1.png", "s_tp1_layer2.png", "s_tp1_layer10.png"]
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
