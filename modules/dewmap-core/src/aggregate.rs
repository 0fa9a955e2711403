//! Derived statistics over the filtered set. Recomputed from scratch on every
//! change; nothing here is cached.

use std::collections::{HashMap, HashSet};

use dewmap_common::Find;
use serde::Serialize;

pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlavorCount {
    pub flavor: String,
    pub count: usize,
}

/// Sidebar numbers for one filtered set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub flavor_count: usize,
    pub latest: Vec<Find>,
    pub top_flavors: Vec<FlavorCount>,
}

impl Summary {
    pub fn of<T: AsRef<Find>>(finds: &[T]) -> Self {
        Self {
            total: finds.len(),
            flavor_count: flavor_count(finds),
            latest: latest_n(finds, DEFAULT_TOP_N),
            top_flavors: top_flavors(finds, DEFAULT_TOP_N),
        }
    }

    /// Most recent find overall, if any.
    pub fn newest(&self) -> Option<&Find> {
        self.latest.first()
    }
}

/// Number of distinct flavors present.
pub fn flavor_count<T: AsRef<Find>>(finds: &[T]) -> usize {
    finds
        .iter()
        .map(|f| f.as_ref().flavor.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Up to `k` finds, newest first. Equal timestamps keep their input order.
pub fn latest_n<T: AsRef<Find>>(finds: &[T], k: usize) -> Vec<Find> {
    let mut sorted: Vec<&Find> = finds.iter().map(|f| f.as_ref()).collect();
    // stable
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted.into_iter().take(k).cloned().collect()
}

/// Up to `k` flavors by occurrence, most frequent first. Ties keep the order
/// in which each flavor was first encountered.
pub fn top_flavors<T: AsRef<Find>>(finds: &[T], k: usize) -> Vec<FlavorCount> {
    let mut counts: Vec<FlavorCount> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();

    for find in finds {
        let flavor = find.as_ref().flavor.as_str();
        match slot.get(flavor) {
            Some(&i) => counts[i].count += 1,
            None => {
                slot.insert(flavor, counts.len());
                counts.push(FlavorCount {
                    flavor: flavor.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(k);
    counts
}
