// Deduplication module for historical events
//
// Buckets events by year and drops restatements of the same fact. Two
// events are duplicates when their similarity keys match: the year plus the
// first characters of the punctuation-free content.

use lazy_static::lazy_static;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;
use strsim::normalized_levenshtein;
use tracing::{debug, info};

use crate::scaffold::{strip_year_prefix, EventRecord};

/// Group label for events without a year.
pub const OTHER_YEAR_KEY: &str = "Khác";

lazy_static! {
    static ref BARE_YEAR: Regex = Regex::new(r"\([0-9]+\)").expect("valid regex");
    static ref HAPPENED_IN: Regex = Regex::new(r"diễn ra năm [0-9]+").expect("valid regex");
    static ref PUNCTUATION: Regex = Regex::new(r"[^\p{L}\p{N}\s]").expect("valid regex");
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid regex");
}

/// Year bucket of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum YearKey {
    Year(String),
    Other,
}

impl YearKey {
    pub fn from_label(label: String) -> Self {
        if label == OTHER_YEAR_KEY {
            YearKey::Other
        } else {
            YearKey::Year(label)
        }
    }

    pub fn label(&self) -> &str {
        match self {
            YearKey::Year(label) => label,
            YearKey::Other => OTHER_YEAR_KEY,
        }
    }

    fn numeric(&self) -> Option<f64> {
        match self {
            YearKey::Year(label) => label.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            YearKey::Other => None,
        }
    }

    /// Display order: numeric years ascending, then other labels, then `Other`.
    pub fn display_cmp(&self, other: &YearKey) -> Ordering {
        match (self, other) {
            (YearKey::Other, YearKey::Other) => Ordering::Equal,
            (YearKey::Other, _) => Ordering::Greater,
            (_, YearKey::Other) => Ordering::Less,
            _ => match (self.numeric(), other.numeric()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

/// Deduplicated contents for one year, in encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct YearGroup {
    pub year: YearKey,
    pub contents: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    /// Groups in order of first appearance.
    pub groups: Vec<YearGroup>,
    pub duplicates: usize,
    pub short_keys: usize,
}

impl Grouping {
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|g| g.contents.is_empty())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.contents.len()).sum()
    }

    /// Groups in display order.
    pub fn sorted(&self) -> Vec<&YearGroup> {
        let mut groups: Vec<&YearGroup> = self.groups.iter().collect();
        groups.sort_by(|a, b| a.year.display_cmp(&b.year));
        groups
    }
}

/// Content reduced to letters, digits and single spaces, with year
/// annotations removed. Only used for comparison.
pub fn normalize_content(content: &str) -> String {
    let text = strip_year_prefix(content);
    let text = BARE_YEAR.replace_all(text, "");
    let text = HAPPENED_IN.replace_all(&text, "");
    let text = PUNCTUATION.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

pub fn similarity_key(year: &YearKey, normalized: &str, key_length: usize) -> String {
    let prefix: String = normalized.chars().take(key_length).collect();
    format!("{}_{}", year.label(), prefix)
}

/// Similarity ratio between two contents (0.0 - 1.0), compared after
/// normalization and lowercasing.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize_content(a).to_lowercase();
    let b = normalize_content(b).to_lowercase();

    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    normalized_levenshtein(&a, &b)
}

/// Group records by year, keeping the first record for each similarity key.
///
/// Records whose normalized content is shorter than `min_key_length`
/// characters are dropped before keying.
pub fn group_events(records: Vec<EventRecord>, key_length: usize, min_key_length: usize) -> Grouping {
    let mut grouping = Grouping::default();
    let mut group_index: HashMap<YearKey, usize> = HashMap::new();
    // key -> (group, position) of the record that claimed it
    let mut seen: HashMap<String, (usize, usize)> = HashMap::new();

    for record in records {
        let normalized = normalize_content(&record.content);
        if normalized.chars().count() < min_key_length {
            debug!(
                "Dropping short event in {}: '{}'",
                record.year.label(),
                record.content
            );
            grouping.short_keys += 1;
            continue;
        }

        let key = similarity_key(&record.year, &normalized, key_length);
        if let Some(&(g, i)) = seen.get(&key) {
            let kept = &grouping.groups[g].contents[i];
            debug!(
                "Duplicate detected: '{}' similar to '{}' (similarity: {:.2})",
                record.content,
                kept,
                similarity(&record.content, kept)
            );
            grouping.duplicates += 1;
            continue;
        }

        let g = *group_index.entry(record.year.clone()).or_insert_with(|| {
            grouping.groups.push(YearGroup {
                year: record.year.clone(),
                contents: Vec::new(),
            });
            grouping.groups.len() - 1
        });
        let contents = &mut grouping.groups[g].contents;
        seen.insert(key, (g, contents.len()));
        contents.push(record.content);
    }

    if grouping.duplicates > 0 {
        info!(
            "Deduplication: removed {} duplicate events across {} years",
            grouping.duplicates,
            grouping.groups.len()
        );
    }

    grouping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(year: &str, content: &str) -> EventRecord {
        EventRecord {
            year: YearKey::from_label(year.to_string()),
            content: content.to_string(),
        }
    }

    fn other(content: &str) -> EventRecord {
        EventRecord {
            year: YearKey::Other,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_normalize_strips_year_annotations() {
        assert_eq!(
            normalize_content("Năm 1911, Nguyễn Tất Thành ra đi tìm đường cứu nước (1911)."),
            "Nguyễn Tất Thành ra đi tìm đường cứu nước"
        );
        assert_eq!(
            normalize_content("Cách mạng tháng Tám diễn ra năm 1945 thành công!"),
            "Cách mạng tháng Tám thành công"
        );
    }

    #[test]
    fn test_normalize_keeps_case_and_letters() {
        assert_eq!(normalize_content("  Hồ   Quý Ly — lập nhà Hồ.  "), "Hồ Quý Ly lập nhà Hồ");
    }

    #[test]
    fn test_normalize_punctuation_only_is_empty() {
        assert_eq!(normalize_content("!!!"), "");
        assert_eq!(normalize_content("@#$%^&*()"), "");
        assert_eq!(normalize_content("😀🎉"), "");
    }

    #[test]
    fn test_similarity_key_counts_characters() {
        let key = similarity_key(
            &YearKey::Year("1945".to_string()),
            "Cách mạng tháng Tám thành công ở Hà Nội",
            30,
        );
        assert_eq!(key, "1945_Cách mạng tháng Tám thành công");
        assert_eq!(similarity_key(&YearKey::Other, "", 30), "Khác_");
    }

    #[test]
    fn test_similarity_exact_match() {
        assert!((similarity("Năm 1945, Độc lập.", "Độc lập") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_similarity_case_insensitive() {
        assert!((similarity("Nhà Trần", "nhà trần") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_similarity_different_strings() {
        let sim = similarity("Khởi nghĩa Yên Bái bùng nổ", "Thành lập Đảng Cộng sản Việt Nam");
        assert!(sim < 0.5);
    }

    #[test]
    fn test_group_keeps_first_duplicate() {
        let grouping = group_events(
            vec![
                record("1945", "Cách mạng tháng Tám thành công."),
                record("1945", "Năm 1945, Cách mạng tháng Tám thành công!"),
            ],
            30,
            0,
        );
        assert_eq!(grouping.duplicates, 1);
        assert_eq!(grouping.groups.len(), 1);
        assert_eq!(grouping.groups[0].contents, vec!["Cách mạng tháng Tám thành công."]);
    }

    #[test]
    fn test_group_same_content_different_years() {
        let grouping = group_events(
            vec![
                record("1945", "Important event occurred"),
                record("1946", "Important event occurred"),
            ],
            30,
            0,
        );
        assert_eq!(grouping.duplicates, 0);
        assert_eq!(grouping.len(), 2);
    }

    #[test]
    fn test_group_long_shared_prefix_collides() {
        let grouping = group_events(
            vec![
                record("1911", "Nguyễn Tất Thành ra đi tìm đường cứu nước. Rời bến Nhà Rồng."),
                record("1911", "Nguyễn Tất Thành ra đi tìm đường cứu nước, qua nhiều châu lục."),
            ],
            30,
            0,
        );
        assert_eq!(grouping.len(), 1);
    }

    #[test]
    fn test_group_preserves_encounter_order() {
        let grouping = group_events(
            vec![
                record("1930", "Khởi nghĩa Yên Bái bùng nổ."),
                other("Không rõ năm"),
                record("1930", "Thành lập Đảng Cộng sản Việt Nam."),
            ],
            30,
            0,
        );
        assert_eq!(grouping.groups.len(), 2);
        assert_eq!(
            grouping.groups[0].contents,
            vec!["Khởi nghĩa Yên Bái bùng nổ.", "Thành lập Đảng Cộng sản Việt Nam."]
        );
        assert_eq!(grouping.groups[1].year, YearKey::Other);
    }

    #[test]
    fn test_degenerate_keys_keep_first_record() {
        let grouping = group_events(vec![record("1945", "!!!"), record("1945", "???")], 30, 0);
        assert_eq!(grouping.groups[0].contents, vec!["!!!"]);
        assert_eq!(grouping.duplicates, 1);
    }

    #[test]
    fn test_min_key_length_drops_short_records() {
        let grouping = group_events(
            vec![record("1945", "!!!"), record("1945", "Độc lập")],
            30,
            5,
        );
        assert_eq!(grouping.short_keys, 1);
        assert_eq!(grouping.groups[0].contents, vec!["Độc lập"]);
    }

    #[test]
    fn test_sorted_groups() {
        let grouping = group_events(
            vec![
                other("Không rõ"),
                record("1945", "B"),
                record("938", "A"),
                record("-100", "C"),
            ],
            30,
            0,
        );
        let labels: Vec<&str> = grouping.sorted().into_iter().map(|g| g.year.label()).collect();
        assert_eq!(labels, vec!["-100", "938", "1945", "Khác"]);
    }

    #[test]
    fn test_display_cmp_non_numeric_labels() {
        let a = YearKey::Year("thế kỷ X".to_string());
        let b = YearKey::Year("1945.5".to_string());
        assert_eq!(a.display_cmp(&b), Ordering::Greater);
        assert_eq!(YearKey::Other.display_cmp(&a), Ordering::Greater);
        assert_eq!(YearKey::from_label("Khác".to_string()), YearKey::Other);
    }
}
