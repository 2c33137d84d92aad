use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub word: String,
    pub total: usize,
}

/// Counts how many records carry each label in `labels`. Output order follows
/// `labels`, not record order; labels nothing matches still appear with a
/// zero total. Records whose field is absent match no label.
pub fn tally_by<T, F>(labels: &[&str], records: &[T], field_of: F) -> Vec<CategoryTotal>
where
    F: Fn(&T) -> Option<&str>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        if let Some(value) = field_of(record) {
            *counts.entry(value).or_insert(0) += 1;
        }
    }

    labels
        .iter()
        .map(|label| CategoryTotal {
            word: (*label).to_string(),
            total: counts.get(label).copied().unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Entry {
        fruit: Option<&'static str>,
    }

    fn entry(fruit: &'static str) -> Entry {
        Entry { fruit: Some(fruit) }
    }

    #[test]
    fn counts_follow_label_order() {
        let entries = vec![
            entry("apple"),
            entry("banana"),
            entry("apple"),
            entry("orange"),
            entry("apple"),
        ];
        let totals = tally_by(&["apple", "banana", "orange"], &entries, |e| e.fruit);
        assert_eq!(
            totals,
            vec![
                CategoryTotal { word: "apple".to_string(), total: 3 },
                CategoryTotal { word: "banana".to_string(), total: 1 },
                CategoryTotal { word: "orange".to_string(), total: 1 },
            ]
        );
    }

    #[test]
    fn unmatched_labels_get_zero() {
        let entries = vec![entry("apple")];
        let totals = tally_by(&["pear", "apple"], &entries, |e| e.fruit);
        assert_eq!(totals[0].total, 0);
        assert_eq!(totals[1].total, 1);
        assert_eq!(totals[0].word, "pear");
    }

    #[test]
    fn missing_fields_match_nothing() {
        let entries = vec![Entry { fruit: None }, entry("apple"), Entry { fruit: None }];
        let totals = tally_by(&["apple"], &entries, |e| e.fruit);
        assert_eq!(totals[0].total, 1);
    }

    #[test]
    fn label_totals_sum_to_matching_records() {
        let entries = vec![entry("apple"), entry("kiwi"), entry("apple"), entry("banana")];
        let labels = ["apple", "banana"];
        let totals = tally_by(&labels, &entries, |e| e.fruit);
        let summed: usize = totals.iter().map(|t| t.total).sum();
        let matching = entries
            .iter()
            .filter(|e| e.fruit.map(|f| labels.contains(&f)).unwrap_or(false))
            .count();
        assert_eq!(summed, matching);
    }

    #[test]
    fn empty_inputs_yield_empty_or_zeroed_results() {
        let none: Vec<Entry> = Vec::new();
        assert!(tally_by(&[], &none, |e: &Entry| e.fruit).is_empty());
        let totals = tally_by(&["apple"], &none, |e: &Entry| e.fruit);
        assert_eq!(totals, vec![CategoryTotal { word: "apple".to_string(), total: 0 }]);
    }
}
