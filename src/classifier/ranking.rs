use crate::classifier::labels::LabelSet;
use crate::models::Recognition;

/// Keep scores above `threshold`, best first, at most `max_results`.
/// Equal scores keep class index order so results are reproducible.
pub fn rank_scores(
    scores: &[f32],
    labels: &LabelSet,
    threshold: f32,
    max_results: usize,
) -> Vec<Recognition> {
    let mut candidates: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|&(_, score)| score > threshold)
        .collect();

    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    candidates.truncate(max_results);

    candidates
        .into_iter()
        .map(|(index, score)| Recognition {
            id: index.to_string(),
            label: labels.get(index).to_string(),
            confidence: score,
            location: None,
        })
        .collect()
}
