use std::{
    pin::Pin,
    sync::{Mutex, PoisonError},
    task::{Context, Poll},
};

use futures::{Stream, StreamExt, stream::BoxStream};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::GameStateEntity;

/// Content table touched by a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentTable {
    Round,
    Question,
    Answer,
}

/// Kind of row-level mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Delete,
}

/// Notification that a content row changed. Consumers refetch the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ContentChange {
    pub table: ContentTable,
    pub kind: ChangeKind,
    pub id: Uuid,
}

/// One broadcast channel per watched resource.
///
/// State images carry the row version; an image older than the last one
/// published is dropped, so subscribers see row versions strictly increasing
/// even when racing writers finish out of order.
pub struct ChangeFeed {
    state: broadcast::Sender<GameStateEntity>,
    last_state_version: Mutex<Option<u64>>,
    content: broadcast::Sender<ContentChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (state, _) = broadcast::channel(capacity);
        let (content, _) = broadcast::channel(capacity);
        Self {
            state,
            last_state_version: Mutex::new(None),
            content,
        }
    }

    /// Publish a post-mutation image of the game state row. Returns `false`
    /// when the image is not newer than the last published one.
    pub fn publish_state(&self, image: GameStateEntity) -> bool {
        let mut last = self
            .last_state_version
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if last.is_some_and(|version| image.version <= version) {
            return false;
        }
        *last = Some(image.version);
        let _ = self.state.send(image);
        true
    }

    /// Forget the last published version. Used when a different store is
    /// installed, whose row versions restart.
    pub fn restart_state_order(&self) {
        *self
            .last_state_version
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Publish a content change notification.
    pub fn publish_content(&self, change: ContentChange) {
        let _ = self.content.send(change);
    }

    pub fn subscribe_state(&self) -> Subscription<GameStateEntity> {
        Subscription::new(self.state.subscribe())
    }

    pub fn subscribe_content(&self) -> Subscription<ContentChange> {
        Subscription::new(self.content.subscribe())
    }
}

/// Stream of feed items for one subscriber. Items missed because the
/// subscriber fell behind are skipped. Dropping the handle unsubscribes.
pub struct Subscription<T> {
    inner: BoxStream<'static, T>,
}

impl<T> Subscription<T>
where
    T: Clone + Send + 'static,
{
    fn new(receiver: broadcast::Receiver<T>) -> Self {
        let inner = BroadcastStream::new(receiver)
            .filter_map(|item| async move { item.ok() })
            .boxed();
        Self { inner }
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_images_arrive_in_publish_order() {
        let feed = ChangeFeed::new(8);
        let mut sub = feed.subscribe_state();

        for (version, score) in [(1, 10), (2, 20), (3, 30)] {
            let mut image = GameStateEntity::default();
            image.version = version;
            image.team_a_score = score;
            assert!(feed.publish_state(image));
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(sub.next().await.unwrap().team_a_score);
        }
        assert_eq!(seen, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn images_older_than_the_last_published_are_dropped() {
        let feed = ChangeFeed::new(8);
        let mut sub = feed.subscribe_state();

        let image = |version, score| {
            let mut image = GameStateEntity::default();
            image.version = version;
            image.team_a_score = score;
            image
        };
        assert!(feed.publish_state(image(5, 20)));
        assert!(!feed.publish_state(image(4, 10)));
        assert!(!feed.publish_state(image(5, 20)));
        assert!(feed.publish_state(image(6, 0)));

        assert_eq!(sub.next().await.unwrap().team_a_score, 20);
        assert_eq!(sub.next().await.unwrap().team_a_score, 0);

        feed.restart_state_order();
        assert!(feed.publish_state(image(1, 7)));
        assert_eq!(sub.next().await.unwrap().team_a_score, 7);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_to_newer_items() {
        let feed = ChangeFeed::new(2);
        let mut sub = feed.subscribe_content();

        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            feed.publish_content(ContentChange {
                table: ContentTable::Answer,
                kind: ChangeKind::Insert,
                id: *id,
            });
        }

        assert_eq!(sub.next().await.unwrap().id, ids[3]);
        assert_eq!(sub.next().await.unwrap().id, ids[4]);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let feed = ChangeFeed::new(0);
        feed.publish_state(GameStateEntity::default());
    }
}
