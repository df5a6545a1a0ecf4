use shelfscout::{Grid, Heatmap, OffsetField, ProbabilityMap, ShelfError};

#[test]
fn grid_rejects_zero_dimensions() {
    let err = Grid::<f32>::new(Vec::new(), 0, 3).err().unwrap();
    assert_eq!(
        err,
        ShelfError::InvalidDimensions {
            width: 0,
            height: 3,
        }
    );
    let err = Grid::filled(2, 0, false).err().unwrap();
    assert_eq!(
        err,
        ShelfError::InvalidDimensions {
            width: 2,
            height: 0,
        }
    );
}

#[test]
fn offsets_reject_short_planar_buffer() {
    let err = OffsetField::from_planar(&[0.0; 6], 2, 2).err().unwrap();
    assert_eq!(
        err,
        ShelfError::BufferLengthMismatch {
            expected: 8,
            got: 6,
        }
    );
}

#[test]
fn probability_map_accepts_bounds() {
    let map = ProbabilityMap::new(vec![0.0, 1.0], 2, 1).unwrap();
    assert_eq!(map.threshold(0.5).as_slice(), &[false, true]);
}

#[test]
fn probability_map_rejects_negative_values() {
    let err = ProbabilityMap::new(vec![0.2, -0.1], 1, 2).err().unwrap();
    assert_eq!(
        err,
        ShelfError::ValueOutOfRange {
            context: "probability map",
            index: 1,
            value: -0.1,
        }
    );
}

#[test]
fn heatmap_probabilities_apply_sigmoid() {
    let heatmap = Heatmap::new(vec![0.0, 100.0], 2, 1).unwrap();
    let probs = heatmap.probabilities();
    assert!((probs.as_slice()[0] - 0.5).abs() < 1e-7);
    assert!((probs.as_slice()[1] - 1.0).abs() < 1e-7);
}

#[test]
fn softmax_logits_produce_valid_probabilities() {
    // Three classes over a 2x2 grid.
    let logits: Vec<f32> = (0..12).map(|v| (v as f32 - 6.0) * 0.7).collect();
    let map = ProbabilityMap::from_class_logits(&logits, 3, 1, 2, 2).unwrap();
    assert!(map
        .grid()
        .as_slice()
        .iter()
        .all(|p| (0.0..=1.0).contains(p)));

    let err = ProbabilityMap::from_class_logits(&logits, 2, 1, 2, 2).err().unwrap();
    assert_eq!(
        err,
        ShelfError::BufferLengthMismatch {
            expected: 8,
            got: 12,
        }
    );
}

#[test]
fn errors_format_readably() {
    let err = ShelfError::InvalidParameter {
        name: "stride",
        reason: "must be > 0",
    };
    assert_eq!(err.to_string(), "invalid parameter `stride`: must be > 0");
}
