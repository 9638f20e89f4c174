use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serenity::model::prelude::{ChannelId, GuildId, WebhookId};
use tokio::sync::{Mutex, MutexGuard};

use crate::registrar::SubscriptionStore;
use crate::types::{FeedName, SubscriptionRecord};

#[derive(Clone)]
pub struct BotDb(Arc<Mutex<rusqlite::Connection>>);

impl BotDb {
    pub fn open(db_path: &str) -> anyhow::Result<Self> {
        let conn = rusqlite::Connection::open(db_path)
            .with_context(|| format!("Failed to open database {}", db_path))?;
        Ok(Self(Arc::new(Mutex::new(conn))))
    }

    async fn conn(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.0.lock().await
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        const INIT_SQL: &str = include_str!("./init.sql");
        let conn = self.conn().await;
        conn.execute_batch(INIT_SQL)
            .context("Failed to migrate database")?;

        Ok(())
    }

    /// Re-subscribing a feed into a channel replaces the stored webhook.
    pub async fn upsert_subscription(&self, sub: &SubscriptionRecord) -> anyhow::Result<()> {
        let conn = self.conn().await;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO subscriptions (feed, guild_id, channel_id, webhook_id, webhook_token)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (channel_id, feed) DO UPDATE SET
                guild_id = excluded.guild_id,
                webhook_id = excluded.webhook_id,
                webhook_token = excluded.webhook_token",
        )?;
        stmt.execute((
            sub.feed.as_str(),
            sub.guild_id.0,
            sub.channel_id.0,
            sub.webhook_id.0,
            sub.webhook_token.expose_secret().as_str(),
        ))?;
        Ok(())
    }

    pub async fn get_subscriptions(&self) -> anyhow::Result<Vec<SubscriptionRecord>> {
        let conn = self.conn().await;
        let mut stmt = conn.prepare_cached(
            "SELECT id, feed, guild_id, channel_id, webhook_id, webhook_token FROM subscriptions",
        )?;
        let rows = stmt.query(())?;
        read_subscriptions(rows)
    }

    pub async fn get_subscriptions_for_feed(
        &self,
        feed: &FeedName,
    ) -> anyhow::Result<Vec<SubscriptionRecord>> {
        let conn = self.conn().await;
        let mut stmt = conn.prepare_cached(
            "SELECT id, feed, guild_id, channel_id, webhook_id, webhook_token FROM subscriptions
            WHERE feed = ?",
        )?;
        let rows = stmt.query((feed.as_str(),))?;
        read_subscriptions(rows)
    }
}

fn read_subscriptions(mut rows: rusqlite::Rows<'_>) -> anyhow::Result<Vec<SubscriptionRecord>> {
    let mut subs = Vec::new();
    while let Some(row) = rows.next()? {
        let feed: String = row.get(1)?;
        let sub = SubscriptionRecord {
            id: Some(row.get(0)?),
            feed: FeedName::parse(&feed)
                .with_context(|| format!("Invalid feed name in database: {}", feed))?,
            guild_id: GuildId(row.get(2)?),
            channel_id: ChannelId(row.get(3)?),
            webhook_id: WebhookId(row.get(4)?),
            webhook_token: SecretString::new(row.get(5)?),
        };
        subs.push(sub);
    }
    Ok(subs)
}

#[async_trait]
impl SubscriptionStore for BotDb {
    async fn create(&self, record: &SubscriptionRecord) -> anyhow::Result<()> {
        self.upsert_subscription(record)
            .await
            .with_context(|| format!("Failed to store subscription for {}", record.feed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> BotDb {
        let db = BotDb::open(":memory:").unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn record(feed: &str, channel: u64, webhook: u64) -> SubscriptionRecord {
        SubscriptionRecord {
            id: None,
            feed: FeedName::parse(feed).unwrap(),
            guild_id: GuildId(10),
            channel_id: ChannelId(channel),
            webhook_id: WebhookId(webhook),
            webhook_token: SecretString::new(format!("token-{}", webhook)),
        }
    }

    #[tokio::test]
    async fn create_then_read_back() {
        let db = memory_db().await;
        db.create(&record("golang", 1, 100)).await.unwrap();

        let subs = db.get_subscriptions().await.unwrap();
        assert_eq!(subs.len(), 1);
        assert!(subs[0].id.is_some());
        assert_eq!(subs[0].feed.as_str(), "golang");
        assert_eq!(subs[0].channel_id, ChannelId(1));
        assert_eq!(subs[0].webhook_token.expose_secret(), "token-100");
    }

    #[tokio::test]
    async fn same_feed_and_channel_upserts() {
        let db = memory_db().await;
        db.create(&record("golang", 1, 100)).await.unwrap();
        db.create(&record("golang", 1, 200)).await.unwrap();

        let subs = db.get_subscriptions().await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].webhook_id, WebhookId(200));
    }

    #[tokio::test]
    async fn feed_lookup_filters_by_name() {
        let db = memory_db().await;
        db.create(&record("golang", 1, 100)).await.unwrap();
        db.create(&record("golang", 2, 101)).await.unwrap();
        db.create(&record("rust", 1, 102)).await.unwrap();

        let feed = FeedName::parse("golang").unwrap();
        let subs = db.get_subscriptions_for_feed(&feed).await.unwrap();
        assert_eq!(subs.len(), 2);
        assert!(subs.iter().all(|s| s.feed == feed));
    }
}
