//! Post-processing of the citations attached to an answer.
//!
//! The backend may cite the same chunk more than once and cites chunks from
//! several documents in one flat list. Before display the list goes through
//! a fixed pipeline:
//!
//! ```text
//! citations ─▶ dedup ─▶ filter (score band) ─▶ group by file ─▶ sort in group
//! ```
//!
//! All of it is in-memory work over a few dozen items.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::models::SourceCitation;

/// Number of leading characters of a citation's text that, together with
/// its chunk id, identify a duplicate.
pub const DEDUP_PREFIX_CHARS: usize = 100;

/// Ordering of citations inside a document group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Highest score first; unscored citations last.
    #[default]
    Relevance,
    /// Order the backend returned them in.
    Document,
    /// Position within the source document.
    Chunk,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relevance" => Ok(SortBy::Relevance),
            "document" => Ok(SortBy::Document),
            "chunk" => Ok(SortBy::Chunk),
            other => Err(format!(
                "unknown sort '{}': expected relevance, document or chunk",
                other
            )),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortBy::Relevance => "relevance",
            SortBy::Document => "document",
            SortBy::Chunk => "chunk",
        })
    }
}

/// Score band a citation must fall in to be shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RelevanceFilter {
    #[default]
    All,
    /// `>= 0.8`
    High,
    /// `0.6 <= s < 0.8`
    Medium,
    /// `< 0.6`
    Low,
}

impl RelevanceFilter {
    /// Unscored citations only pass [`RelevanceFilter::All`].
    pub fn matches(&self, score: Option<f64>) -> bool {
        match (self, score) {
            (RelevanceFilter::All, _) => true,
            (_, None) => false,
            (RelevanceFilter::High, Some(s)) => s >= 0.8,
            (RelevanceFilter::Medium, Some(s)) => (0.6..0.8).contains(&s),
            (RelevanceFilter::Low, Some(s)) => s < 0.6,
        }
    }
}

impl FromStr for RelevanceFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(RelevanceFilter::All),
            "high" => Ok(RelevanceFilter::High),
            "medium" => Ok(RelevanceFilter::Medium),
            "low" => Ok(RelevanceFilter::Low),
            other => Err(format!(
                "unknown filter '{}': expected all, high, medium or low",
                other
            )),
        }
    }
}

impl fmt::Display for RelevanceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelevanceFilter::All => "all",
            RelevanceFilter::High => "high",
            RelevanceFilter::Medium => "medium",
            RelevanceFilter::Low => "low",
        })
    }
}

/// Rank-based score estimate: `max(0.95 - 0.1 * rank, 0.5)`.
///
/// Not a retrieval score. Only used when `sources.ordinal_scores` is on, and
/// citations scored this way carry `score_estimated = true`.
pub fn ordinal_score(rank: usize) -> f64 {
    (0.95 - 0.1 * rank as f64).max(0.5)
}

/// Fill missing scores with [`ordinal_score`] of the citation's position.
/// Backend scores are left alone.
pub fn apply_ordinal_scores(sources: &mut [SourceCitation]) {
    for (rank, source) in sources.iter_mut().enumerate() {
        if source.relevance_score.is_none() {
            source.relevance_score = Some(ordinal_score(rank));
            source.score_estimated = true;
        }
    }
}

/// Descending by score, unscored last.
fn cmp_score_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn dedup_key(source: &SourceCitation) -> (String, String) {
    (
        source.chunk_id.clone(),
        source.content.chars().take(DEDUP_PREFIX_CHARS).collect(),
    )
}

/// Drop repeated citations, keeping the highest-scored copy of each.
///
/// The result is ordered by score (stable for ties).
pub fn dedup_sources(sources: &[SourceCitation]) -> Vec<SourceCitation> {
    let mut sorted = sources.to_vec();
    sorted.sort_by(|a, b| cmp_score_desc(a.relevance_score, b.relevance_score));

    let mut seen = HashSet::new();
    sorted
        .into_iter()
        .filter(|s| seen.insert(dedup_key(s)))
        .collect()
}

pub fn filter_sources(
    sources: Vec<SourceCitation>,
    filter: RelevanceFilter,
) -> Vec<SourceCitation> {
    sources
        .into_iter()
        .filter(|s| filter.matches(s.relevance_score))
        .collect()
}

/// Citations from one source document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceGroup {
    pub filename: String,
    pub sources: Vec<SourceCitation>,
}

impl SourceGroup {
    pub fn average_score(&self) -> Option<f64> {
        average_score(&self.sources)
    }
}

/// Group by display filename, in order of first appearance, and sort each
/// group by `sort`.
pub fn group_sources(sources: Vec<SourceCitation>, sort: SortBy) -> Vec<SourceGroup> {
    let mut groups: Vec<SourceGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for source in sources {
        let filename = source.display_filename().to_string();
        let slot = *index.entry(filename.clone()).or_insert_with(|| {
            groups.push(SourceGroup {
                filename,
                sources: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].sources.push(source);
    }

    for group in &mut groups {
        match sort {
            SortBy::Relevance => group
                .sources
                .sort_by(|a, b| cmp_score_desc(a.relevance_score, b.relevance_score)),
            SortBy::Chunk => group.sources.sort_by(|a, b| {
                match (a.metadata.chunk_index, b.metadata.chunk_index) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }),
            SortBy::Document => {}
        }
    }

    groups
}

/// Mean over scored citations; `None` when none are scored.
pub fn average_score(sources: &[SourceCitation]) -> Option<f64> {
    let scores: Vec<f64> = sources.iter().filter_map(|s| s.relevance_score).collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

pub fn relevance_label(score: f64) -> &'static str {
    if score >= 0.8 {
        "Highly Relevant"
    } else if score >= 0.6 {
        "Relevant"
    } else if score >= 0.4 {
        "Moderately Relevant"
    } else {
        "Low Relevance"
    }
}

/// The processed, display-ready citation list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceView {
    pub groups: Vec<SourceGroup>,
    /// Citations the backend returned.
    pub received: usize,
    pub duplicates_removed: usize,
    /// Unique citations hidden by the score filter.
    pub filtered_out: usize,
    pub average_score: Option<f64>,
}

impl SourceView {
    pub fn build(sources: &[SourceCitation], sort: SortBy, filter: RelevanceFilter) -> Self {
        let unique = dedup_sources(sources);
        let unique_count = unique.len();
        let shown = filter_sources(unique, filter);
        let average = average_score(&shown);
        let shown_count = shown.len();

        Self {
            groups: group_sources(shown, sort),
            received: sources.len(),
            duplicates_removed: sources.len() - unique_count,
            filtered_out: unique_count - shown_count,
            average_score: average,
        }
    }

    pub fn shown(&self) -> usize {
        self.groups.iter().map(|g| g.sources.len()).sum()
    }

    pub fn document_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
