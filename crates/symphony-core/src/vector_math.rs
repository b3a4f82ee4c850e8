//! Pure vector helpers used by the aggregation engine.

use symphony_types::{Dimension, EmotionalVector};

/// Component-wise arithmetic mean of `vectors`.
///
/// Returns `None` for an empty input so callers decide what an empty
/// field means.
pub fn mean<'a, I>(vectors: I) -> Option<EmotionalVector>
where
    I: IntoIterator<Item = &'a EmotionalVector>,
{
    let mut count: u32 = 0;
    let mut sum = EmotionalVector::ZERO;
    for v in vectors {
        sum = EmotionalVector::from_fn(|d| sum.get(d) + v.get(d));
        count = count.saturating_add(1);
    }
    if count == 0 {
        return None;
    }
    let n = f64::from(count);
    Some(EmotionalVector::from_fn(|d| sum.get(d) / n))
}

/// Cosine similarity of `a` and `b` restricted to `dimensions`.
///
/// A zero-magnitude operand has no direction; the similarity is `0.0`.
/// The result is clamped to `[-1, 1]` to absorb rounding.
pub fn cosine_similarity(a: &EmotionalVector, b: &EmotionalVector, dimensions: &[Dimension]) -> f64 {
    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for d in dimensions {
        let (x, y) = (a.get(*d), b.get(*d));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let magnitude = norm_a.sqrt() * norm_b.sqrt();
    if magnitude <= f64::EPSILON {
        return 0.0;
    }
    (dot / magnitude).clamp(-1.0, 1.0)
}
