//! # Filter & Aggregation Engine
//!
//! Pure functions over an in-memory idea snapshot. Nothing here performs
//! I/O or fails: unrecognized mood/status values stay uncounted, and an
//! empty input yields zeroed aggregates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Idea, Mood, Status};

/// Status dimension of the list view filter. `All` passes every idea.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Open,
    Completed,
    Discarded,
}

impl StatusFilter {
    /// Lenient parse for query-string values; anything malformed falls
    /// back to `All` so a stale link still renders the full list.
    pub fn parse(value: &str) -> StatusFilter {
        match value {
            "open" => StatusFilter::Open,
            "completed" => StatusFilter::Completed,
            "discarded" => StatusFilter::Discarded,
            _ => StatusFilter::All,
        }
    }

    fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Open => status == Status::Open,
            StatusFilter::Completed => status == Status::Completed,
            StatusFilter::Discarded => status == Status::Discarded,
        }
    }
}

/// Keeps ideas matching the status filter, and when `favorites_only` is
/// set, only favorites among those. Filters compose with AND; input order
/// is preserved. `(All, false)` is the identity.
pub fn filter_by_status_and_favorite(
    ideas: &[Idea],
    status: StatusFilter,
    favorites_only: bool,
) -> Vec<Idea> {
    ideas
        .iter()
        .filter(|idea| status.matches(idea.status))
        .filter(|idea| !favorites_only || idea.favorite)
        .cloned()
        .collect()
}

/// Keeps ideas whose mood equals `mood` exactly. Callers decide what an
/// unrecognized query value means; passing `Mood::Unknown` matches only
/// rows that themselves read back as foreign.
pub fn filter_by_mood(ideas: &[Idea], mood: Mood) -> Vec<Idea> {
    ideas.iter().filter(|idea| idea.mood == mood).cloned().collect()
}

/// Keeps ideas carrying at least one of the given tags (contains-any).
/// An empty tag list matches nothing; input order is preserved.
pub fn filter_by_tags(ideas: &[Idea], tags: &[String]) -> Vec<Idea> {
    ideas
        .iter()
        .filter(|idea| idea.tags.iter().any(|tag| tags.contains(tag)))
        .cloned()
        .collect()
}

/// Per-mood tallies for the dashboard bar chart. All four buckets exist
/// even when zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MoodCounts {
    pub happy: usize,
    pub playful: usize,
    pub dreamy: usize,
    pub wild: usize,
}

impl MoodCounts {
    /// Total across the four known buckets; foreign moods are not in it.
    pub fn total(&self) -> usize {
        self.happy + self.playful + self.dreamy + self.wild
    }
}

pub fn count_by_mood(ideas: &[Idea]) -> MoodCounts {
    let mut counts = MoodCounts::default();
    for idea in ideas {
        match idea.mood {
            Mood::Happy => counts.happy += 1,
            Mood::Playful => counts.playful += 1,
            Mood::Dreamy => counts.dreamy += 1,
            Mood::Wild => counts.wild += 1,
            // foreign value: uncounted, never a crash
            Mood::Unknown => {}
        }
    }
    counts
}

/// A tag with its usage count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Tag usage sorted count-descending, ties broken by first appearance
/// (the sort is stable over insertion order). Ideas without tags
/// contribute to no bucket.
pub fn count_by_tag(ideas: &[Idea]) -> Vec<TagCount> {
    let mut order: Vec<TagCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for idea in ideas {
        for tag in &idea.tags {
            match index.get(tag.as_str()) {
                Some(&at) => order[at].count += 1,
                None => {
                    index.insert(tag.as_str(), order.len());
                    order.push(TagCount { tag: tag.clone(), count: 1 });
                }
            }
        }
    }
    order.sort_by(|a, b| b.count.cmp(&a.count));
    order
}

/// Three-way status tally for the donut chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusBreakdown {
    pub open: usize,
    pub completed: usize,
    pub discarded: usize,
}

/// Display percentages derived from a [`StatusBreakdown`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct StatusPercentages {
    pub open: f64,
    pub completed: f64,
    pub discarded: f64,
}

impl StatusBreakdown {
    pub fn total(&self) -> usize {
        self.open + self.completed + self.discarded
    }

    /// `count / total * 100` per bucket; a zero total yields 0% for every
    /// bucket rather than dividing by zero.
    pub fn percentages(&self) -> StatusPercentages {
        let total = self.total();
        if total == 0 {
            return StatusPercentages::default();
        }
        let pct = |count: usize| count as f64 / total as f64 * 100.0;
        StatusPercentages {
            open: pct(self.open),
            completed: pct(self.completed),
            discarded: pct(self.discarded),
        }
    }
}

pub fn count_by_status(ideas: &[Idea]) -> StatusBreakdown {
    let mut counts = StatusBreakdown::default();
    for idea in ideas {
        match idea.status {
            Status::Open => counts.open += 1,
            Status::Completed => counts.completed += 1,
            Status::Discarded => counts.discarded += 1,
            Status::Unknown => {}
        }
    }
    counts
}
