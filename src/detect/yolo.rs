//! Decoding of YOLOv5-style detection output.
//!
//! Each output row is `[cx, cy, w, h, objectness, class scores...]` in input
//! pixel coordinates. A row counts as a person when its objectness and its
//! combined score are both strictly above the threshold and the person class
//! has the highest class score.

use super::result::PersonDetection;

/// Index of the person class in COCO-ordered models.
pub const PERSON_CLASS: usize = 0;

const BOX_FIELDS: usize = 5;

/// Collect person detections from a flat `[rows x columns]` output.
///
/// Non-maximum suppression is skipped: the pipeline only needs to know
/// whether the set is empty, and suppression never empties a non-empty set.
pub fn person_detections(
    output: &[f32],
    columns: usize,
    input_size: f32,
    threshold: f32,
) -> Vec<PersonDetection> {
    if columns <= BOX_FIELDS || input_size <= 0.0 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for row in output.chunks_exact(columns) {
        let objectness = row[4];
        if objectness <= threshold {
            continue;
        }
        let Some((class, score)) = best_class(&row[BOX_FIELDS..]) else {
            continue;
        };
        let confidence = score * objectness;
        if class != PERSON_CLASS || confidence.is_nan() || confidence <= threshold {
            continue;
        }
        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        out.push(PersonDetection {
            x: ((cx - w / 2.0) / input_size).clamp(0.0, 1.0),
            y: ((cy - h / 2.0) / input_size).clamp(0.0, 1.0),
            w: (w / input_size).clamp(0.0, 1.0),
            h: (h / input_size).clamp(0.0, 1.0),
            confidence,
        });
    }
    out
}

fn best_class(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (idx, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((idx, score)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLS: usize = 8; // box + objectness + 3 classes

    fn row(objectness: f32, classes: [f32; 3]) -> Vec<f32> {
        let mut r = vec![320.0, 320.0, 64.0, 128.0, objectness];
        r.extend_from_slice(&classes);
        r
    }

    #[test]
    fn confident_person_row_is_detected() {
        let output = row(0.9, [0.95, 0.1, 0.0]);
        let dets = person_detections(&output, COLS, 640.0, 0.5);
        assert_eq!(dets.len(), 1);
        let d = &dets[0];
        assert!((d.confidence - 0.855).abs() < 1e-5);
        assert!((d.x - 0.45).abs() < 1e-6);
        assert!((d.h - 0.2).abs() < 1e-6);
    }

    #[test]
    fn other_classes_are_ignored() {
        let output = row(0.9, [0.3, 0.9, 0.0]);
        assert!(person_detections(&output, COLS, 640.0, 0.5).is_empty());
    }

    #[test]
    fn combined_score_must_exceed_threshold() {
        // objectness passes, combined score 0.6 * 0.8 = 0.48 does not
        let output = row(0.6, [0.8, 0.0, 0.0]);
        assert!(person_detections(&output, COLS, 640.0, 0.5).is_empty());

        let output = row(0.5, [1.0, 0.0, 0.0]);
        assert!(person_detections(&output, COLS, 640.0, 0.5).is_empty());
    }

    #[test]
    fn multiple_rows_are_scanned() {
        let mut output = row(0.1, [0.9, 0.0, 0.0]);
        output.extend(row(0.99, [0.99, 0.0, 0.0]));
        output.extend(row(0.99, [0.0, 0.0, 0.99]));
        let dets = person_detections(&output, COLS, 640.0, 0.5);
        assert_eq!(dets.len(), 1);
    }

    #[test]
    fn malformed_layout_yields_nothing() {
        assert!(person_detections(&[0.0; 10], 5, 640.0, 0.5).is_empty());
        assert!(person_detections(&[], COLS, 640.0, 0.5).is_empty());
    }
}
