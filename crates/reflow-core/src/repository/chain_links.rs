use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{ChainLink, NewChainLinkData, MAX_CHAIN_DEPTH};
use crate::repository::SqliteRepository;

use super::ChainLinkRepository;

#[async_trait]
impl ChainLinkRepository for SqliteRepository {
    async fn create_link(&self, data: NewChainLinkData) -> Result<ChainLink, CoreError> {
        let mut tx = self.pool().begin().await?;

        let existing_parent: Option<(Uuid,)> =
            sqlx::query_as("SELECT parent_id FROM chain_links WHERE child_id = ?")
                .bind(data.child_id)
                .fetch_optional(&mut *tx)
                .await?;
        if existing_parent.is_some() {
            return Err(CoreError::DuplicateKey(format!(
                "series {} already has a chain parent",
                data.child_id
            )));
        }

        let rows: Vec<(Uuid, Uuid)> = sqlx::query_as("SELECT parent_id, child_id FROM chain_links")
            .fetch_all(&mut *tx)
            .await?;
        let parent_by_child: HashMap<Uuid, Uuid> = rows.into_iter().collect();

        // A link parent_id -> child_id=data.child_id would close a cycle if
        // `data.parent_id` is already a descendant of `data.child_id`.
        let mut depth_from_child = 0u32;
        let mut cursor = data.parent_id;
        loop {
            if cursor == data.child_id {
                return Err(CoreError::CycleDetected(format!(
                    "linking {} -> {} would create a cycle",
                    data.parent_id, data.child_id
                )));
            }
            match parent_by_child.get(&cursor) {
                Some(&next) => {
                    cursor = next;
                    depth_from_child += 1;
                    if depth_from_child > MAX_CHAIN_DEPTH {
                        return Err(CoreError::ChainDepthExceeded {
                            series: data.child_id.to_string(),
                            limit: MAX_CHAIN_DEPTH,
                        });
                    }
                }
                None => break,
            }
        }

        let link = ChainLink {
            parent_id: data.parent_id,
            child_id: data.child_id,
            distance_minutes: data.distance_minutes,
            early_wobble_minutes: data.early_wobble_minutes,
            late_wobble_minutes: data.late_wobble_minutes,
        };

        sqlx::query(
            "INSERT INTO chain_links (parent_id, child_id, distance_minutes, early_wobble_minutes, late_wobble_minutes) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(link.parent_id)
        .bind(link.child_id)
        .bind(link.distance_minutes)
        .bind(link.early_wobble_minutes)
        .bind(link.late_wobble_minutes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(link)
    }

    async fn remove_link(&self, child_id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM chain_links WHERE child_id = ?")
            .bind(child_id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(child_id.to_string()));
        }
        Ok(())
    }

    async fn list_links(&self) -> Result<Vec<ChainLink>, CoreError> {
        let links = sqlx::query_as(
            "SELECT parent_id, child_id, distance_minutes, early_wobble_minutes, late_wobble_minutes FROM chain_links ORDER BY child_id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(links)
    }
}
