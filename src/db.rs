use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{ChannelData, ManualOverrides};
use crate::slides::Slide;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Store one channel import. A user holds at most one record per platform;
/// re-importing the same platform replaces the prior record wholesale.
pub async fn upsert_channel(
    pool: &PgPool,
    user_id: &str,
    channel: &ChannelData,
) -> anyhow::Result<()> {
    let data = serde_json::to_value(channel).context("failed to serialize channel data")?;

    sqlx::query(
        r#"
        INSERT INTO ads_wrapped.channels (id, user_id, platform, currency, data, imported_at)
        VALUES ($1, $2, $3, $4, $5, now())
        ON CONFLICT (user_id, platform) DO UPDATE
        SET currency = EXCLUDED.currency, data = EXCLUDED.data, imported_at = now()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(channel.platform.tag())
    .bind(&channel.currency)
    .bind(data)
    .execute(pool)
    .await?;

    Ok(())
}

/// All of a user's imported channels, oldest import first so that ranking
/// tie-breaks stay stable across regenerations.
pub async fn fetch_channels(pool: &PgPool, user_id: &str) -> anyhow::Result<Vec<ChannelData>> {
    let rows = sqlx::query(
        "SELECT data FROM ads_wrapped.channels WHERE user_id = $1 ORDER BY imported_at, platform",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut channels = Vec::new();
    for row in rows {
        let data: serde_json::Value = row.get("data");
        let channel: ChannelData =
            serde_json::from_value(data).context("stored channel data is not readable")?;
        channels.push(channel);
    }

    Ok(latest_per_platform(channels))
}

/// A working set holds one record per platform; a later import replaces an
/// earlier one wholesale and takes its place at the end of the import
/// order. The unique constraint upholds this in storage; this keeps the
/// rule even if a storage row ever slipped past it.
fn latest_per_platform(channels: Vec<ChannelData>) -> Vec<ChannelData> {
    let mut kept: Vec<ChannelData> = Vec::new();
    for channel in channels {
        kept.retain(|c| c.platform != channel.platform);
        kept.push(channel);
    }
    kept
}

pub struct StoredWrap {
    pub share_code: String,
    pub title: String,
    pub slides: Vec<Slide>,
    pub created_at: DateTime<Utc>,
}

/// Persist a generated deck verbatim and hand back its share code. Stored
/// slides are never recomputed on retrieval.
pub async fn insert_wrap(
    pool: &PgPool,
    user_id: &str,
    title: &str,
    slides: &[Slide],
    overrides: &ManualOverrides,
) -> anyhow::Result<String> {
    let share_code: String = Uuid::new_v4().simple().to_string()[..8].to_string();
    let slides_json = serde_json::to_value(slides).context("failed to serialize slides")?;
    let overrides_json =
        serde_json::to_value(overrides).context("failed to serialize overrides")?;

    sqlx::query(
        r#"
        INSERT INTO ads_wrapped.wraps (id, user_id, share_code, title, slides, overrides, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&share_code)
    .bind(title)
    .bind(slides_json)
    .bind(overrides_json)
    .execute(pool)
    .await?;

    Ok(share_code)
}

pub async fn fetch_wrap(pool: &PgPool, share_code: &str) -> anyhow::Result<Option<StoredWrap>> {
    let row = sqlx::query(
        "SELECT share_code, title, slides, created_at FROM ads_wrapped.wraps WHERE share_code = $1",
    )
    .bind(share_code)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let slides: serde_json::Value = row.get("slides");
    Ok(Some(StoredWrap {
        share_code: row.get("share_code"),
        title: row.get("title"),
        slides: serde_json::from_value(slides).context("stored slides are not readable")?,
        created_at: row.get("created_at"),
    }))
}
