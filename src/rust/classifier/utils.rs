/// Index and value of the highest score.
///
/// Equal scores resolve to the lowest index, and `NaN` never wins. Returns
/// `None` for an empty slice or one holding nothing but `NaN`.
pub(crate) fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((i, score)),
        }
    }
    best
}
