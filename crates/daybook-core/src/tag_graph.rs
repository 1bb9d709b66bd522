//! Tag co-occurrence graph over day tag sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tags::normalize_tags;

/// Neighbour of a tag and how many days they share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEdge {
    /// Neighbouring tag.
    pub tag: String,
    /// Number of days both tags appear in.
    pub count: u32,
}

/// A tag with its neighbours, strongest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagNode {
    /// Tag name (lower-case).
    pub tag: String,
    /// Edges sorted by count descending, then tag ascending.
    pub related: Vec<TagEdge>,
}

/// Build the undirected co-occurrence graph from per-day tag sets.
///
/// Tags that never share a day with another tag produce no node.
#[must_use]
pub fn build_tag_graph<I, T, S>(days: I) -> Vec<TagNode>
where
    I: IntoIterator<Item = T>,
    T: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut adjacency: BTreeMap<String, BTreeMap<String, u32>> = BTreeMap::new();
    for day in days {
        let tags = normalize_tags(day);
        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                *adjacency.entry(a.clone()).or_default().entry(b.clone()).or_default() += 1;
                *adjacency.entry(b.clone()).or_default().entry(a.clone()).or_default() += 1;
            }
        }
    }

    adjacency
        .into_iter()
        .map(|(tag, neighbours)| {
            let mut related: Vec<TagEdge> = neighbours
                .into_iter()
                .map(|(tag, count)| TagEdge { tag, count })
                .collect();
            related.sort_by(|x, y| y.count.cmp(&x.count).then_with(|| x.tag.cmp(&y.tag)));
            TagNode { tag, related }
        })
        .collect()
}

/// Case-insensitive lookup of one node.
#[must_use]
pub fn find_node(graph: Vec<TagNode>, tag: &str) -> Option<TagNode> {
    let wanted = tag.trim().to_lowercase();
    graph.into_iter().find(|node| node.tag.to_lowercase() == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_shared_days_in_both_directions() {
        let graph = build_tag_graph([
            vec!["work", "home"],
            vec!["work", "home", "gym"],
            vec!["Work", "gym"],
            vec!["solo"],
        ]);
        let tags: Vec<_> = graph.iter().map(|node| node.tag.as_str()).collect();
        assert_eq!(tags, vec!["gym", "home", "work"]);

        let work = &graph[2];
        assert_eq!(
            work.related,
            vec![
                TagEdge { tag: "gym".into(), count: 2 },
                TagEdge { tag: "home".into(), count: 2 },
            ]
        );
        let home = &graph[1];
        assert_eq!(home.related[0], TagEdge { tag: "work".into(), count: 2 });
        assert_eq!(home.related[1], TagEdge { tag: "gym".into(), count: 1 });
    }

    #[test]
    fn duplicate_tags_in_a_day_count_once() {
        let graph = build_tag_graph([vec!["a", "A", "b"]]);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph[0].related, vec![TagEdge { tag: "b".into(), count: 1 }]);
    }

    #[test]
    fn find_node_ignores_case() {
        let graph = build_tag_graph([vec!["work", "home"]]);
        let node = find_node(graph.clone(), " WORK ").map(|node| node.tag);
        assert_eq!(node.as_deref(), Some("work"));
        assert!(find_node(graph, "gym").is_none());
    }
}
