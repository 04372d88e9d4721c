//! Character-level similarity and the keyword vocabulary used by event matching.
//!
//! # Invariants
//! - `similarity` is symmetric and returns a value in `[0, 1]`.
//! - Raw characters are compared; no case folding or locale normalization.
//! - A `Vocabulary` is immutable once built.

use std::collections::HashMap;

/// Sequences at least this long drop over-represented characters from the
/// match index.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Normalized matching ratio `2 * M / (len(a) + len(b))` over characters.
///
/// `M` counts the characters covered by the longest matching blocks, found
/// recursively left and right of each longest block. Block matching depends
/// on argument order, so the lower of the two orders is returned.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    matching_ratio(&a, &b).min(matching_ratio(&b, &a))
}

fn matching_ratio(a: &[char], b: &[char]) -> f64 {
    let matched = BlockMatcher::new(a, b).matched_chars();
    2.0 * matched as f64 / (a.len() + b.len()) as f64
}

struct BlockMatcher<'s> {
    a: &'s [char],
    b: &'s [char],
    /// Positions of each character in `b`, ascending.
    b2j: HashMap<char, Vec<usize>>,
}

impl<'s> BlockMatcher<'s> {
    fn new(a: &'s [char], b: &'s [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &ch) in b.iter().enumerate() {
            b2j.entry(ch).or_default().push(j);
        }
        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }
        Self { a, b, b2j }
    }

    /// Total size of all matching blocks.
    fn matched_chars(&self) -> usize {
        let mut matched = 0;
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];
        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, size) = self.longest_match(alo, ahi, blo, bhi);
            if size == 0 {
                continue;
            }
            matched += size;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + size < ahi && j + size < bhi {
                pending.push((i + size, ahi, j + size, bhi));
            }
        }
        matched
    }

    /// Longest block `a[i..i+size] == b[j..j+size]` inside the given window.
    /// Ties go to the smallest `i`, then the smallest `j`.
    fn longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        // Length of the match ending at `b[j]` for the previous row of `a`.
        let mut run_at: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next_run_at = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let run = j
                        .checked_sub(1)
                        .and_then(|prev| run_at.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_run_at.insert(j, run);
                    if run > best_size {
                        best_i = i + 1 - run;
                        best_j = j + 1 - run;
                        best_size = run;
                    }
                }
            }
            run_at = next_run_at;
        }

        // Characters dropped from the index can still extend a block.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }
        (best_i, best_j, best_size)
    }
}

/// One named group of keywords, e.g. everything that means "a meal".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordCategory {
    pub name: String,
    pub keywords: Vec<String>,
}

impl KeywordCategory {
    pub fn new<I, S>(name: impl Into<String>, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }
}

/// Synonym table plus keyword categories.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vocabulary {
    categories: Vec<KeywordCategory>,
    /// `(variant, canonical)` pairs.
    synonyms: Vec<(String, String)>,
}

impl Vocabulary {
    pub fn new(categories: Vec<KeywordCategory>, synonyms: Vec<(String, String)>) -> Self {
        Self {
            categories,
            synonyms,
        }
    }

    /// Dining and meeting vocabulary for Chinese and English descriptions.
    pub fn builtin() -> Self {
        let categories = vec![
            KeywordCategory::new(
                "dining",
                [
                    "吃饭", "饭局", "聚餐", "晚饭", "午饭", "早饭", "宵夜", "请客", "dinner",
                    "lunch", "breakfast", "meal",
                ],
            ),
            KeywordCategory::new(
                "meeting",
                ["见面", "开会", "会议", "拜访", "聚会", "meeting", "meet"],
            ),
        ];
        let synonyms = [
            ("晚餐", "晚饭"),
            ("午餐", "午饭"),
            ("早餐", "早饭"),
            ("用餐", "吃饭"),
            ("碰面", "见面"),
            ("会面", "见面"),
            ("面谈", "见面"),
            ("约见", "见面"),
            ("碰头", "见面"),
        ]
        .into_iter()
        .map(|(variant, canonical)| (variant.to_string(), canonical.to_string()))
        .collect();
        Self::new(categories, synonyms)
    }

    pub fn categories(&self) -> &[KeywordCategory] {
        &self.categories
    }

    /// Names of every category the description belongs to, in table order.
    pub fn categories_of(&self, description: &str) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|category| self.belongs_to(description, category))
            .map(|category| category.name.as_str())
            .collect()
    }

    /// True when both descriptions fall into at least one common category.
    pub fn share_category(&self, a: &str, b: &str) -> bool {
        self.categories
            .iter()
            .any(|category| self.belongs_to(a, category) && self.belongs_to(b, category))
    }

    fn belongs_to(&self, description: &str, category: &KeywordCategory) -> bool {
        if category
            .keywords
            .iter()
            .any(|keyword| description.contains(keyword.as_str()))
        {
            return true;
        }
        self.synonyms.iter().any(|(variant, canonical)| {
            description.contains(variant.as_str())
                && category.keywords.iter().any(|keyword| keyword == canonical)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{similarity, KeywordCategory, Vocabulary};

    #[test]
    fn similarity_identity_and_empty_edges() {
        assert_eq!(similarity("和朋友吃饭", "和朋友吃饭"), 1.0);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("", "吃饭"), 0.0);
        assert_eq!(similarity("吃饭", ""), 0.0);
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        let pairs = [
            ("吃饭", "吃晚饭"),
            ("meeting with bob", "bob meeting"),
            ("abcdef", "fedcba"),
            ("和朋友吃晚饭", "吃饭"),
            ("和朋友去公园跑步", "去公园散步和朋友"),
        ];
        for (a, b) in pairs {
            let forward = similarity(a, b);
            let backward = similarity(b, a);
            assert!((forward - backward).abs() < 1e-9, "{a} vs {b}");
            assert!((0.0..=1.0).contains(&forward));
        }
    }

    #[test]
    fn similarity_counts_characters_not_bytes() {
        // 2 matched chars out of 2 + 3.
        let score = similarity("吃饭", "吃晚饭");
        assert!((score - 0.8).abs() < 1e-6, "score = {score}");
    }

    #[test]
    fn reordered_phrases_score_by_longest_blocks() {
        // Whichever three-character block is taken first cuts off the other.
        let a = "和朋友去公园跑步";
        let b = "去公园散步和朋友";
        assert!((similarity(a, b) - 0.375).abs() < 1e-9);
        assert!((similarity(b, a) - 0.375).abs() < 1e-9);

        // 6 of 13 characters fall inside matching blocks.
        let score = similarity("xabcyab", "abyxab");
        assert!((score - 6.0 / 13.0).abs() < 1e-9, "score = {score}");
        assert!(score < 0.5);
    }

    #[test]
    fn separated_blocks_both_count() {
        // 吃 and 饭 match as two blocks around 晚.
        assert!((similarity("吃饭", "和朋友吃晚饭") - 0.5).abs() < 1e-9);
        assert!((similarity("abcdef", "fedcba") - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn long_inputs_ignore_overly_common_characters() {
        let filler = "啊".repeat(149);
        let a = format!("啊{filler}x{filler}");
        let b = format!("x{filler}{filler}啊");
        assert_eq!(similarity(&a, &a), 1.0);
        // Only the block seeded by `x` is found once `啊` leaves the index.
        assert!((similarity(&a, &b) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn builtin_vocabulary_resolves_synonyms_to_categories() {
        let vocab = Vocabulary::builtin();
        assert_eq!(vocab.categories_of("一起吃晚餐"), vec!["dining"]);
        assert_eq!(vocab.categories_of("和老王碰头"), vec!["meeting"]);
        assert!(vocab.categories_of("去爬山").is_empty());
        assert!(vocab.share_category("吃饭", "吃晚饭"));
        assert!(!vocab.share_category("吃饭", "开会"));
    }

    #[test]
    fn custom_vocabulary_is_used_verbatim() {
        let vocab = Vocabulary::new(
            vec![KeywordCategory::new("sport", ["跑步"])],
            vec![("慢跑".to_string(), "跑步".to_string())],
        );
        assert!(vocab.share_category("晨间慢跑", "跑步五公里"));
        assert!(!vocab.share_category("吃饭", "晚饭"));
    }
}
