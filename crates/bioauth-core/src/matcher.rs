//! Nearest-neighbour matching of a query descriptor against enrolled identities.

use crate::types::{Descriptor, Identity, MatchResult};

/// Distance reported when there is nothing to compare against.
pub const EMPTY_GALLERY_DISTANCE: f32 = 1.0;

/// Default maximum Euclidean distance for a positive match.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// Strategy for comparing a query descriptor against a gallery of enrolled identities.
pub trait Matcher {
    fn compare(&self, query: &Descriptor, gallery: &[Identity], threshold: f32) -> MatchResult;
}

/// Linear-scan Euclidean matcher.
///
/// Visits every gallery entry. Ties on distance go to the earliest entry, so
/// gallery order (enrollment order) is the tie-break.
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(&self, query: &Descriptor, gallery: &[Identity], threshold: f32) -> MatchResult {
        let mut best_dist = f32::INFINITY;
        let mut best_idx: Option<usize> = None;

        for (i, identity) in gallery.iter().enumerate() {
            let dist = query.euclidean_distance(&identity.descriptor);
            // Strict comparison keeps the first of equal distances.
            if best_idx.is_none() || dist < best_dist {
                best_dist = dist;
                best_idx = Some(i);
            }
        }

        match best_idx {
            Some(idx) if best_dist <= threshold => MatchResult {
                matched_email: gallery[idx].email.clone(),
                distance: best_dist,
                is_match: true,
            },
            Some(_) => MatchResult::unknown(best_dist),
            None => MatchResult::unknown(EMPTY_GALLERY_DISTANCE),
        }
    }
}
