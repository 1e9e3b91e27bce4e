//! Rendition key resolution.
//!
//! Resolution runs in two phases:
//!
//! 1. **Exact**: a stored key whose token set equals the query wins outright.
//! 2. **Fallback**: every entry sharing the query's theme-element is scored
//!    by the query tokens it matches, tier by tier:
//!    device class (idiom, size classes, appearance, …), then scale, then
//!    state, then direction, then everything else. Ties go to the scale
//!    closest to the query without exceeding it, then to table order.
//!
//! A query without a theme-element, or whose element no entry shares,
//! resolves to nothing.

use std::cmp::Ordering;

use log::{debug, trace};

use super::index::AssetIndex;
use crate::car::types::attributes::AttributeId;
use crate::car::types::key::RenditionKey;
use crate::car::types::models::{IndexEntry, Resolution};

/// Matched-token counts per precedence tier, compared lexicographically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
struct MatchScore {
    device_class: u32,
    scale: u32,
    state: u32,
    direction: u32,
    other: u32,
}

impl MatchScore {
    fn of(query: &RenditionKey, candidate: &RenditionKey) -> Self {
        let mut score = Self::default();
        for token in query.tokens() {
            if token.identifier == AttributeId::Element || !candidate.contains(token) {
                continue;
            }
            match token.identifier {
                id if id.is_device_class() => score.device_class += 1,
                AttributeId::Scale => score.scale += 1,
                AttributeId::State => score.state += 1,
                AttributeId::Direction => score.direction += 1,
                _ => score.other += 1,
            }
        }
        score
    }
}

/// How far a candidate's scale sits from the query's; smaller is better.
///
/// Scales at or below the query rank before any scale above it.
fn scale_distance(query_scale: u16, candidate_scale: u16) -> (bool, u16) {
    if candidate_scale <= query_scale {
        (false, query_scale - candidate_scale)
    } else {
        (true, candidate_scale - query_scale)
    }
}

impl AssetIndex {
    /// Resolves `query` to the best stored rendition.
    pub fn resolve(&self, query: &RenditionKey) -> Option<Resolution> {
        self.resolve_matching(query, |_| true)
    }

    /// Resolves `query` among the entries `accept` allows.
    ///
    /// Uses the same two phases as [`resolve`](Self::resolve); an exact key
    /// that `accept` rejects falls through to the scored phase.
    pub fn resolve_matching<F>(&self, query: &RenditionKey, accept: F) -> Option<Resolution>
    where
        F: Fn(&IndexEntry) -> bool,
    {
        if let Some(&first) = self.exact.get(query) {
            let index = if accept(&self.entries[first]) {
                Some(first)
            } else {
                self.later_exact_accepted(first, query, &accept)
            };
            if let Some(index) = index {
                debug!("Exact match for {} at entry {}", query, index);
                return self.resolution(index, true);
            }
        }

        let element = query.theme_element()?;
        let candidates = self.by_element.get(&element)?;
        let query_scale = query.theme_scale().unwrap_or(0);

        let mut best: Option<(usize, MatchScore, (bool, u16))> = None;
        for &index in candidates {
            let entry = &self.entries[index];
            if !accept(entry) {
                continue;
            }
            let score = MatchScore::of(query, &entry.key);
            let distance = scale_distance(query_scale, entry.key.theme_scale().unwrap_or(0));
            trace!(
                "Candidate {} {} scored {:?}, scale distance {:?}",
                index,
                entry.key,
                score,
                distance
            );

            let better = match &best {
                None => true,
                Some((_, best_score, best_distance)) => match score.cmp(best_score) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    // Equal scores: strictly closer scale wins, otherwise keep the earlier entry.
                    Ordering::Equal => distance < *best_distance,
                },
            };
            if better {
                best = Some((index, score, distance));
            }
        }

        let (index, score, _) = best?;
        debug!("Fallback match for {} at entry {} ({:?})", query, index, score);
        self.resolution(index, false)
    }

    /// The exact map holds only the first entry per key set; this scans the
    /// rest of the table for a duplicate key that `accept` allows.
    fn later_exact_accepted<F>(
        &self,
        first: usize,
        query: &RenditionKey,
        accept: &F,
    ) -> Option<usize>
    where
        F: Fn(&IndexEntry) -> bool,
    {
        self.entries
            .iter()
            .enumerate()
            .skip(first + 1)
            .find(|(_, entry)| entry.key == *query && accept(entry))
            .map(|(i, _)| i)
    }

    fn resolution(&self, index: usize, exact: bool) -> Option<Resolution> {
        self.locator(index).map(|locator| Resolution { locator, exact })
    }
}
