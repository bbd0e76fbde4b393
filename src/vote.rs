// src/vote.rs
use tracing::{info, warn};

use crate::error::AppError;
use crate::models::{Poll, PollId};
use crate::store::PollStore;

/// Position of an option within its poll. Only constructible from a
/// non-negative integer; range against the poll is checked by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionIndex(usize);

impl OptionIndex {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Parses the raw form selector. Missing, negative or non-numeric input
    /// is `InvalidOptionIndex`.
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        raw.map(str::trim)
            .and_then(|s| s.parse::<usize>().ok())
            .map(Self)
            .ok_or(AppError::InvalidOptionIndex)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// Applies a single anonymous vote and returns the poll as it stands after it.
pub async fn cast_vote(
    store: &dyn PollStore,
    poll_id: PollId,
    index: OptionIndex,
) -> Result<Poll, AppError> {
    match store.increment_vote(poll_id, index).await {
        Ok(poll) => {
            info!(%poll_id, option = index.get(), "vote cast");
            Ok(poll)
        }
        Err(e) => {
            warn!(%poll_id, option = index.get(), error = %e, "vote rejected");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Entity;
    use crate::poll::{create_poll, get_poll, NewPoll};
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use uuid::Uuid;

    fn votes(poll: &Poll) -> Vec<u64> {
        poll.options.iter().map(|o| o.votes).collect()
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!(OptionIndex::parse(Some("2")).unwrap(), OptionIndex::new(2));
        assert_eq!(OptionIndex::parse(Some(" 0 ")).unwrap(), OptionIndex::new(0));
        for raw in [None, Some(""), Some("-1"), Some("abc"), Some("1.5"), Some("1e3")] {
            assert!(
                matches!(OptionIndex::parse(raw), Err(AppError::InvalidOptionIndex)),
                "raw {raw:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_vote_touches_only_target_option() {
        let store = MemoryStore::new();
        let id = create_poll(&store, NewPoll::from_form("Q", "a,b,c").unwrap())
            .await
            .unwrap();

        let poll = cast_vote(&store, id, OptionIndex::new(1)).await.unwrap();
        assert_eq!(votes(&poll), vec![0, 1, 0]);
        assert_eq!(votes(&get_poll(&store, id).await.unwrap()), vec![0, 1, 0]);
    }

    #[tokio::test]
    async fn test_color_example() {
        let store = MemoryStore::new();
        let id = create_poll(&store, NewPoll::from_form("Color?", "Red,Blue").unwrap())
            .await
            .unwrap();

        let poll = cast_vote(&store, id, OptionIndex::new(1)).await.unwrap();
        assert_eq!(poll.options[0].label, "Red");
        assert_eq!(votes(&poll), vec![0, 1]);

        let err = cast_vote(&store, id, OptionIndex::new(5)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidOptionIndex));
        assert_eq!(votes(&get_poll(&store, id).await.unwrap()), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_vote_on_unknown_poll() {
        let store = MemoryStore::new();
        let err = cast_vote(&store, Uuid::new_v4(), OptionIndex::new(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(Entity::Poll)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_votes_are_not_lost() {
        const K: u64 = 200;

        let store = Arc::new(MemoryStore::new());
        let id = create_poll(store.as_ref(), NewPoll::from_form("Q", "x,y").unwrap())
            .await
            .unwrap();

        let handles: Vec<_> = (0..K)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    cast_vote(store.as_ref(), id, OptionIndex::new(0)).await.unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let poll = get_poll(store.as_ref(), id).await.unwrap();
        assert_eq!(votes(&poll), vec![K, 0]);
    }
}
