#![cfg(feature = "rayon")]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shelfscout::{
    Grid, Heatmap, ModelOutputs, OffsetField, PostProcessConfig, PostProcessor, ProbabilityMap,
};

fn random_outputs(seed: u64, width: usize, height: usize) -> ModelOutputs {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = width * height;
    let prob: Vec<f32> = (0..n).map(|_| rng.random_range(0.0..=1.0)).collect();
    let logits: Vec<f32> = (0..n).map(|_| rng.random_range(-4.0..3.0)).collect();
    let dy: Vec<f32> = (0..n).map(|_| rng.random_range(-3.0..3.0)).collect();
    let dx: Vec<f32> = (0..n).map(|_| rng.random_range(-3.0..3.0)).collect();
    ModelOutputs::new(
        ProbabilityMap::new(prob, width, height).unwrap(),
        Heatmap::new(logits, width, height).unwrap(),
        OffsetField::new(
            Grid::new(dy, width, height).unwrap(),
            Grid::new(dx, width, height).unwrap(),
        )
        .unwrap(),
    )
    .unwrap()
}

#[test]
fn parallel_matches_sequential() {
    for (seed, w, h) in [(1, 64, 48), (2, 17, 93), (3, 128, 1)] {
        let outputs = random_outputs(seed, w, h);
        let base = PostProcessConfig {
            instances: shelfscout::InstanceConfig {
                min_pixels: 3,
                ..Default::default()
            },
            ..PostProcessConfig::default()
        };
        let seq = PostProcessor::new(base.with_parallel(false))
            .unwrap()
            .process(&outputs)
            .unwrap();
        let par = PostProcessor::new(base.with_parallel(true))
            .unwrap()
            .process(&outputs)
            .unwrap();
        assert_eq!(seq, par);
    }
}
