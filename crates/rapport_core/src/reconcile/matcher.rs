//! Duplicate detection between a candidate event and stored events.

use crate::model::record::{Event, EventDraft};
use crate::reconcile::similarity::{similarity, Vocabulary};

pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;

/// Finds the stored event a candidate most likely duplicates.
///
/// A stored event matches when its date string equals the candidate's and the
/// descriptions are either similar enough or share a keyword category.
#[derive(Debug, Clone)]
pub struct EventMatcher {
    vocabulary: Vocabulary,
    threshold: f64,
}

impl Default for EventMatcher {
    fn default() -> Self {
        Self::new(Vocabulary::builtin())
    }
}

impl EventMatcher {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self::with_threshold(vocabulary, DEFAULT_MATCH_THRESHOLD)
    }

    pub fn with_threshold(vocabulary: Vocabulary, threshold: f64) -> Self {
        Self {
            vocabulary,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the first matching event in the given order.
    pub fn find_duplicate<'a>(
        &self,
        existing: &'a [Event],
        candidate: &EventDraft,
    ) -> Option<&'a Event> {
        existing.iter().find(|event| self.is_duplicate(event, candidate))
    }

    pub fn is_duplicate(&self, event: &Event, candidate: &EventDraft) -> bool {
        if event.date != candidate.date {
            return false;
        }
        similarity(&event.description, &candidate.description) >= self.threshold
            || self
                .vocabulary
                .share_category(&event.description, &candidate.description)
    }
}

#[cfg(test)]
mod tests {
    use super::EventMatcher;
    use crate::model::record::{Event, EventDraft};
    use crate::reconcile::similarity::Vocabulary;
    use crate::model::Source;

    fn stored(id: i64, date: &str, description: &str) -> Event {
        Event {
            id,
            person_id: 1,
            date: date.to_string(),
            location: None,
            description: description.to_string(),
            source: Source::User,
            created_at: 0,
        }
    }

    #[test]
    fn different_dates_never_match() {
        let matcher = EventMatcher::default();
        let existing = vec![stored(1, "2026-02-20", "吃饭")];
        let candidate = EventDraft::new("2026-02-21", "吃饭");
        assert!(matcher.find_duplicate(&existing, &candidate).is_none());
    }

    #[test]
    fn dining_keywords_match_on_same_date() {
        let matcher = EventMatcher::default();
        let existing = vec![stored(1, "2026-02-20", "吃饭")];
        let candidate = EventDraft::new("2026-02-20", "吃晚饭");
        assert_eq!(
            matcher.find_duplicate(&existing, &candidate).map(|e| e.id),
            Some(1)
        );
    }

    #[test]
    fn unrelated_descriptions_on_same_date_do_not_match() {
        let matcher = EventMatcher::default();
        let existing = vec![stored(1, "2026-02-20", "去医院体检")];
        let candidate = EventDraft::new("2026-02-20", "搬新家");
        assert!(matcher.find_duplicate(&existing, &candidate).is_none());
    }

    #[test]
    fn first_match_in_storage_order_wins() {
        let matcher = EventMatcher::default();
        let existing = vec![
            stored(1, "2026-02-20", "开会"),
            stored(2, "2026-02-20", "午饭"),
            stored(3, "2026-02-20", "聚餐"),
        ];
        let candidate = EventDraft::new("2026-02-20", "一起吃饭");
        assert_eq!(
            matcher.find_duplicate(&existing, &candidate).map(|e| e.id),
            Some(2)
        );
    }

    #[test]
    fn reordered_phrase_on_same_date_is_not_a_duplicate() {
        let matcher = EventMatcher::default();
        let existing = vec![stored(1, "2026-02-20", "和朋友去公园跑步")];
        let candidate = EventDraft::new("2026-02-20", "去公园散步和朋友");
        assert!(matcher.find_duplicate(&existing, &candidate).is_none());

        let existing = vec![stored(1, "2026-02-20", "去公园散步和朋友")];
        let candidate = EventDraft::new("2026-02-20", "和朋友去公园跑步");
        assert!(matcher.find_duplicate(&existing, &candidate).is_none());
    }

    #[test]
    fn block_ratio_decides_without_vocabulary() {
        let matcher = EventMatcher::with_threshold(Vocabulary::default(), 0.5);
        // 6 / 13 in matching blocks, though 5 characters appear in order.
        let existing = vec![stored(1, "2026-02-20", "xabcyab")];
        let candidate = EventDraft::new("2026-02-20", "abyxab");
        assert!(matcher.find_duplicate(&existing, &candidate).is_none());

        // 吃 and 饭 are two blocks: exactly 0.5.
        let existing = vec![stored(2, "2026-02-20", "和朋友吃晚饭")];
        let candidate = EventDraft::new("2026-02-20", "吃饭");
        assert_eq!(
            matcher.find_duplicate(&existing, &candidate).map(|e| e.id),
            Some(2)
        );
    }

    #[test]
    fn threshold_is_inclusive() {
        let matcher = EventMatcher::with_threshold(Default::default(), 0.8);
        // similarity("吃饭", "吃晚饭") == 0.8
        let existing = vec![stored(1, "2026-02-20", "吃饭")];
        let candidate = EventDraft::new("2026-02-20", "吃晚饭");
        assert!(matcher.find_duplicate(&existing, &candidate).is_some());
    }
}
