//! Spatial clustering of independent word hits.

use super::{FragmentTokens, StepMatch};
use crate::geometry::euclidean_distance;
use crate::pipeline::config::MatcherConfig;
use crate::text::SentenceWords;

/// Cluster fragments containing sentence words by center distance.
///
/// Every fragment with at least one significant sentence word is a hit.
/// Hits whose centers lie within `cluster_distance` of any member of a
/// cluster join it (single linkage, grown breadth-first). The cluster
/// covering the most distinct sentence words wins if it covers at least
/// `min_cluster_coverage` of them; ties go to the cluster that starts
/// earlier in reading order.
pub fn find_cluster<'a>(
    config: &MatcherConfig,
    words: &SentenceWords,
    fragments: &[FragmentTokens<'a>],
) -> Option<StepMatch<'a>> {
    let significant = &words.significant;
    if significant.is_empty() {
        return None;
    }

    let hits: Vec<(&FragmentTokens<'a>, Vec<String>)> = fragments
        .iter()
        .filter_map(|f| {
            let found = f.hits(significant);
            (!found.is_empty()).then_some((f, found))
        })
        .collect();
    if hits.is_empty() {
        return None;
    }

    let mut best: Option<(Vec<usize>, usize)> = None;
    for cluster in cluster_by_distance(&hits, config.cluster_distance) {
        let mut covered: Vec<&String> = Vec::new();
        for &idx in &cluster {
            for word in &hits[idx].1 {
                if !covered.contains(&word) {
                    covered.push(word);
                }
            }
        }
        let count = covered.len();
        if best.as_ref().map_or(true, |(_, c)| count > *c) {
            best = Some((cluster, count));
        }
    }

    let (mut cluster, count) = best?;
    let coverage = count as f32 / significant.len() as f32;
    if coverage < config.min_cluster_coverage {
        log::trace!(
            "Best cluster covers {:.2} of the sentence; below {:.2}",
            coverage,
            config.min_cluster_coverage
        );
        return None;
    }

    cluster.sort_unstable();
    Some(StepMatch {
        elements: cluster
            .into_iter()
            .map(|idx| (hits[idx].0.fragment, hits[idx].1.clone()))
            .collect(),
        confidence: coverage,
    })
}

/// Group hit indices whose fragment centers are within `epsilon` of each other.
fn cluster_by_distance(hits: &[(&FragmentTokens<'_>, Vec<String>)], epsilon: f32) -> Vec<Vec<usize>> {
    let centers: Vec<_> = hits.iter().map(|(f, _)| f.fragment.center()).collect();
    let mut visited = vec![false; hits.len()];
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for i in 0..hits.len() {
        if visited[i] {
            continue;
        }

        let mut cluster = vec![i];
        visited[i] = true;

        let mut j = 0;
        while j < cluster.len() {
            let current = &centers[cluster[j]];
            for k in 0..hits.len() {
                if !visited[k] && euclidean_distance(current, &centers[k]) <= epsilon {
                    cluster.push(k);
                    visited[k] = true;
                }
            }
            j += 1;
        }

        clusters.push(cluster);
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::matcher::tokenize_fragments;
    use crate::model::TextFragment;

    fn frag(text: &str, x: f32, y: f32, order: usize) -> TextFragment {
        TextFragment::new(text, 1, Rect::new(x, y, 40.0, 12.0), order)
    }

    #[test]
    fn test_nearby_hits_form_one_cluster() {
        let fragments = vec![
            frag("smaller", 0.0, 0.0, 0),
            frag("curated", 45.0, 0.0, 1),
            frag("datasets", 90.0, 0.0, 2),
            frag("datasets", 500.0, 500.0, 3),
        ];
        let indexed = tokenize_fragments(&fragments);
        let words = SentenceWords::from_text("Datasets were smaller and curated.", None);
        let hit = find_cluster(&MatcherConfig::default(), &words, &indexed).unwrap();

        assert_eq!(hit.elements.len(), 3);
        assert_eq!(hit.confidence, 1.0);
        assert!(hit.elements.iter().all(|(f, _)| f.reading_order < 3));
    }

    #[test]
    fn test_low_coverage_rejected() {
        let fragments = vec![frag("alpha", 0.0, 0.0, 0), frag("zulu", 30.0, 0.0, 1)];
        let indexed = tokenize_fragments(&fragments);
        let words = SentenceWords::from_text("alpha bravo charlie delta echo", None);
        assert!(find_cluster(&MatcherConfig::default(), &words, &indexed).is_none());
    }

    #[test]
    fn test_cluster_by_distance_single_linkage() {
        let fragments = vec![
            frag("a1", 0.0, 0.0, 0),
            frag("a2", 45.0, 0.0, 1),
            frag("a3", 90.0, 0.0, 2),
            frag("b1", 400.0, 0.0, 3),
        ];
        let indexed = tokenize_fragments(&fragments);
        let hits: Vec<_> = indexed.iter().map(|f| (f, Vec::new())).collect();
        let clusters = cluster_by_distance(&hits, 50.0);
        assert_eq!(clusters, vec![vec![0, 1, 2], vec![3]]);
    }
}
