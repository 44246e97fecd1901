//! Due date extension endpoints

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::{error::AppResult, models::extension::BorrowExtension};

use super::client::UpstreamClient;

#[derive(Clone)]
pub struct ExtensionsRepository {
    client: UpstreamClient,
}

impl ExtensionsRepository {
    pub fn new(client: UpstreamClient) -> Self {
        Self { client }
    }

    pub async fn get_by_id(&self, token: &str, extension_id: i64) -> AppResult<BorrowExtension> {
        self.client
            .get(token, &format!("borrow/extensions/{}/", extension_id), &[])
            .await
    }

    pub async fn create(
        &self,
        token: &str,
        borrow_id: i64,
        new_due_date: DateTime<Utc>,
    ) -> AppResult<BorrowExtension> {
        self.client
            .post(
                token,
                &format!("borrow/borrowings/{}/extensions/", borrow_id),
                &json!({ "new_due_date": new_due_date }),
            )
            .await
    }

    pub async fn decide(&self, token: &str, extension_id: i64, approve: bool) -> AppResult<()> {
        let verb = if approve { "approve" } else { "reject" };
        self.client
            .post_unit(
                token,
                &format!("borrow/extensions/{}/{}/", extension_id, verb),
                &json!({}),
            )
            .await
    }
}
