use crate::models::ObjectionCount;
use std::collections::HashMap;

/// Trim and lower-case only; punctuation is significant.
pub fn normalize_objection(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Groups objections by their normalized text and orders the groups by
/// descending count. Equal counts keep first-seen order.
pub fn rank_objections<S: AsRef<str>>(objections: &[S]) -> Vec<ObjectionCount> {
    let mut ranked: Vec<ObjectionCount> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for raw in objections {
        let normalized = normalize_objection(raw.as_ref());
        if normalized.is_empty() {
            continue;
        }
        match positions.get(&normalized) {
            Some(&index) => ranked[index].count += 1,
            None => {
                positions.insert(normalized.clone(), ranked.len());
                ranked.push(ObjectionCount {
                    objection: normalized,
                    count: 1,
                });
            }
        }
    }

    ranked.sort_by(|left, right| right.count.cmp(&left.count));
    ranked
}

pub fn top_objections<S: AsRef<str>>(objections: &[S], limit: usize) -> Vec<ObjectionCount> {
    let mut ranked = rank_objections(objections);
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::{rank_objections, top_objections};

    #[test]
    fn punctuation_keeps_groups_apart() {
        let ranked = rank_objections(&["Price!", " price ", "too slow"]);
        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|entry| entry.count == 1));
        assert!(ranked.iter().any(|entry| entry.objection == "price!"));
        assert!(ranked.iter().any(|entry| entry.objection == "price"));
        assert!(ranked.iter().any(|entry| entry.objection == "too slow"));
    }

    #[test]
    fn case_and_whitespace_variants_merge() {
        let ranked = rank_objections(&["No budget", "timing", "  no BUDGET", "no budget "]);
        assert_eq!(ranked[0].objection, "no budget");
        assert_eq!(ranked[0].count, 3);
        assert_eq!(ranked[1].objection, "timing");
        assert_eq!(ranked[1].count, 1);
    }

    #[test]
    fn counts_are_non_increasing() {
        let ranked = rank_objections(&["a", "b", "b", "c", "c", "c", "a", "d"]);
        assert!(ranked.windows(2).all(|pair| pair[0].count >= pair[1].count));
        assert_eq!(ranked.iter().map(|entry| entry.count).sum::<u32>(), 8);
    }

    #[test]
    fn blank_entries_are_skipped() {
        let ranked = rank_objections(&["   ", "", "busy"]);
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn top_objections_truncates() {
        let top = top_objections(&["a", "a", "b", "c"], 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].objection, "a");
        assert_eq!(top[0].count, 2);
    }
}
