use tokio::sync::{Mutex, mpsc};

use crate::guild::Card;

/// FIFO of cards waiting to be posted to the debate feed channel.
///
/// Conclusions push here instead of posting directly; the scheduler drains it.
#[derive(Debug)]
pub struct NotificationFeed {
    sender: mpsc::UnboundedSender<Card>,
    receiver: Mutex<mpsc::UnboundedReceiver<Card>>,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }
}

impl NotificationFeed {
    /// Empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a card.
    pub fn push(&self, card: Card) {
        // The receiver lives as long as the feed, so the channel is never closed here.
        let _ = self.sender.send(card);
    }

    /// Take every queued card in arrival order.
    pub async fn drain(&self) -> Vec<Card> {
        let mut receiver = self.receiver.lock().await;
        let mut cards = Vec::with_capacity(receiver.len());
        while let Ok(card) = receiver.try_recv() {
            cards.push(card);
        }
        cards
    }

    /// Whether nothing is queued.
    pub async fn is_empty(&self) -> bool {
        self.receiver.lock().await.is_empty()
    }

    /// Drop everything still queued; returns how many cards were dropped.
    pub async fn clear(&self) -> usize {
        self.drain().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drains_in_arrival_order() {
        let feed = NotificationFeed::new();
        feed.push(Card::new("Rating Change", Card::SALMON));
        feed.push(Card::new("Voter Log", Card::SALMON));
        assert!(!feed.is_empty().await);

        let titles: Vec<_> = feed.drain().await.into_iter().map(|card| card.title).collect();
        assert_eq!(titles, ["Rating Change", "Voter Log"]);
        assert!(feed.is_empty().await);
    }

    #[tokio::test]
    async fn clear_drops_pending_cards() {
        let feed = NotificationFeed::new();
        feed.push(Card::new("stale", Card::SALMON));
        assert_eq!(feed.clear().await, 1);
        assert!(feed.drain().await.is_empty());
    }
}
