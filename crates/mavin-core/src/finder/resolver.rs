use crate::finder::matcher::MatchCandidate;

/// Order candidates by embedded timestamp, then full folder name.
pub fn sort_candidates(candidates: &mut [MatchCandidate]) {
    candidates.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Newest candidate. Folders holding at least one image outrank folder-only
/// matches; a missing half of the image pair does not affect ranking.
pub fn latest(candidates: &[MatchCandidate]) -> Option<&MatchCandidate> {
    let with_images = candidates
        .iter()
        .filter(|c| c.has_images())
        .max_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    with_images.or_else(|| {
        candidates
            .iter()
            .max_by(|a, b| a.sort_key().cmp(&b.sort_key()))
    })
}

/// With `latest_only`, at most the newest candidate; otherwise all of them
/// in ascending order.
pub fn resolve(mut candidates: Vec<MatchCandidate>, latest_only: bool) -> Vec<MatchCandidate> {
    if latest_only {
        return latest(&candidates).cloned().into_iter().collect();
    }
    sort_candidates(&mut candidates);
    candidates
}
