/// Identity allocation
///
/// Ids may be freely edited by the user, including gaps and re-used values,
/// so the next free id is recomputed from the table on every call rather
/// than cached.
use crate::store::TrackletStore;

/// The next id guaranteed unused anywhere in the table: max + 1, or 0 for
/// an empty table.
pub fn next_id(store: &TrackletStore) -> i64 {
    store
        .rows()
        .iter()
        .map(|r| r.id)
        .max()
        .map(|max| max + 1)
        .unwrap_or(0)
}

/// Whether `candidate` is already used by a row in `filename`. Gates
/// relabels and new-shape finalization.
pub fn is_taken(store: &TrackletStore, filename: &str, candidate: i64) -> bool {
    store.id_exists(filename, candidate)
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
            xmax: 1.0,
            ymax: 1.0,
            id,
            score: 1.0,
            class: "spine".to_string(),
            width: 512,
            height: 512,
        }
    }

    #[test]
    fn test_next_id_empty_table() {
        assert_eq!(next_id(&TrackletStore::new()), 0);
    }

    #[test]
    fn test_next_id_never_collides() {
        // user-introduced gaps and high values
        let store = TrackletStore::from_rows(vec![
            row("a_tp1_layer001.png", 0),
            row("a_tp1_layer001.png", 7),
            row("a_tp2_layer003.png", 420),
        ]);
        let id = next_id(&store);
        assert_eq!(id, 421);
        assert!(store.rows().iter().all(|r| r.id != id));
    }

    #[test]
    fn test_is_taken_scoped_to_frame() {
        let store = TrackletStore::from_rows(vec![row("a_tp1_layer001.png", 3)]);
        assert!(is_taken(&store, "a_tp1_layer001.png", 3));
        assert!(!is_taken(&store, "a_tp1_layer002.png", 3));
        assert!(!is_taken(&store, "a_tp1_layer001.png", 4));
    }
}
