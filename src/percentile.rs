use crate::model::{EvalResult, round_to};

pub const SINGLE_RESULT_PERCENTILE: f64 = 50.0;

// Stable ascending sort on weighted score; ties keep input order. The slice itself is not reordered.
pub fn annotate(results: &mut [EvalResult]) {
    match results.len() {
        0 => {}
        1 => results[0].percentile = SINGLE_RESULT_PERCENTILE,
        len => {
            let scores: Vec<f64> = results.iter().map(EvalResult::weighted_score).collect();
            let mut order: Vec<usize> = (0..len).collect();
            order.sort_by(|&left, &right| scores[left].total_cmp(&scores[right]));

            let last = (len - 1) as f64;
            for (rank, index) in order.into_iter().enumerate() {
                results[index].percentile = round_to(rank as f64 / last * 100.0, 1);
            }
        }
    }
}
