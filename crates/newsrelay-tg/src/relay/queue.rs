use super::dedup::DedupeKey;
use crate::news::Article;
use std::collections::VecDeque;

/// Articles are held back while the rate limit isn't lifted only for a short
/// while, so only a handful of the freshest ones are kept.
pub(crate) const PENDING_QUEUE_CAPACITY: usize = 5;

#[derive(Debug, Clone)]
pub(crate) struct Pending {
    pub(crate) key: DedupeKey,
    pub(crate) article: Article,
    pub(crate) tag: String,
}

/// Bounded FIFO of articles waiting for a publishing token.
/// When full, the oldest article is evicted to make room for the new one.
#[derive(Debug)]
pub(crate) struct PendingQueue {
    items: VecDeque<Pending>,
    capacity: usize,
}

impl Default for PendingQueue {
    fn default() -> Self {
        Self::with_capacity(PENDING_QUEUE_CAPACITY)
    }
}

impl PendingQueue {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the evicted item if the queue was full
    pub(crate) fn push(&mut self, item: Pending) -> Option<Pending> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub(crate) fn pop_front(&mut self) -> Option<Pending> {
        self.items.pop_front()
    }

    pub(crate) fn front(&self) -> Option<&Pending> {
        self.items.front()
    }

    pub(crate) fn contains(&self, key: &DedupeKey) -> bool {
        self.items.iter().any(|item| item.key == *key)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(n: usize) -> Pending {
        let article = Article {
            url: format!("https://example.com/{n}").parse().unwrap(),
            title: format!("Article {n}"),
            description: None,
            content: None,
            image_url: None,
        };
        Pending {
            key: DedupeKey::of(&article),
            article,
            tag: "uk".to_owned(),
        }
    }

    fn titles(queue: &mut PendingQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.pop_front())
            .map(|item| item.article.title)
            .collect()
    }

    #[test]
    fn fifo_order() {
        let mut queue = PendingQueue::default();
        for n in 0..3 {
            assert!(queue.push(pending(n)).is_none());
        }
        assert_eq!(titles(&mut queue), ["Article 0", "Article 1", "Article 2"]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut queue = PendingQueue::default();

        for n in 0..PENDING_QUEUE_CAPACITY {
            assert!(queue.push(pending(n)).is_none());
        }
        assert_eq!(queue.len(), PENDING_QUEUE_CAPACITY);

        let evicted = queue.push(pending(5)).unwrap();
        assert_eq!(evicted.article.title, "Article 0");

        let evicted = queue.push(pending(6)).unwrap();
        assert_eq!(evicted.article.title, "Article 1");

        assert_eq!(queue.len(), PENDING_QUEUE_CAPACITY);
        assert!(!queue.contains(&pending(0).key));
        assert!(queue.contains(&pending(6).key));

        assert_eq!(
            titles(&mut queue),
            ["Article 2", "Article 3", "Article 4", "Article 5", "Article 6"]
        );
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut queue = PendingQueue::with_capacity(2);
        for n in 0..10 {
            queue.push(pending(n));
            assert!(queue.len() <= 2);
        }
    }
}
