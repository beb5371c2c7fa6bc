//! Density-window matching.

use super::{FragmentTokens, StepMatch};
use crate::pipeline::config::MatcherConfig;
use crate::text::SentenceWords;

/// Find the window of consecutive fragments densest in sentence words.
///
/// A window of `density_window` fragments slides over the page in reading
/// order; its density is the fraction of significant sentence words present
/// in any of its fragments. The densest window at or above `min_density`
/// wins (earliest on ties). Only the fragments of that window that contain
/// a sentence word are returned.
pub fn find_dense_window<'a>(
    config: &MatcherConfig,
    words: &SentenceWords,
    fragments: &[FragmentTokens<'a>],
) -> Option<StepMatch<'a>> {
    let significant = &words.significant;
    if significant.is_empty() || fragments.is_empty() {
        return None;
    }

    let per_fragment: Vec<Vec<String>> = fragments.iter().map(|f| f.hits(significant)).collect();
    let window = config.density_window.clamp(1, fragments.len());

    let mut best: Option<(usize, f32)> = None;
    for start in 0..=(fragments.len() - window) {
        let mut present: Vec<&String> = Vec::new();
        for found in &per_fragment[start..start + window] {
            for word in found {
                if !present.contains(&word) {
                    present.push(word);
                }
            }
        }
        let density = present.len() as f32 / significant.len() as f32;
        log::trace!("Density window at {}: {:.2}", start, density);
        if best.map_or(true, |(_, d)| density > d) {
            best = Some((start, density));
        }
    }

    let (start, density) = best?;
    if density < config.min_density {
        return None;
    }

    let elements = (start..start + window)
        .filter(|&idx| !per_fragment[idx].is_empty())
        .map(|idx| (fragments[idx].fragment, per_fragment[idx].clone()))
        .collect();

    Some(StepMatch {
        elements,
        confidence: density,
    })
}
