use async_trait::async_trait;

use super::{BoardDirectory, Database};
use crate::error::Result;

#[async_trait]
impl BoardDirectory for Database {
    async fn board_exists(&self, board_id: i32) -> Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM boards WHERE id = $1)")
                .bind(board_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }
}
