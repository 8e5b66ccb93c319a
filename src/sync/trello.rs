//! Board service client (Trello REST API)

use super::model::{ExternalAttachment, ExternalCard, ExternalList};
use crate::config::TrelloConfig;
use crate::error::Result;
use crate::http::{DownloadedFile, RateLimitedClient, RequestSpec};
use crate::utils::sanitize_file_name;

/// Read-only client for boards, lists and card attachments
///
/// Every request goes through the shared [`RateLimitedClient`].
#[derive(Clone)]
pub struct TrelloClient {
    http: RateLimitedClient,
    base_url: String,
    api_key: String,
}

impl TrelloClient {
    /// Create a client for the configured service
    pub fn new(http: RateLimitedClient, config: &TrelloConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    /// Lists of a board, in board order
    pub async fn lists(&self, token: &str, board_id: &str) -> Result<Vec<ExternalList>> {
        let spec = RequestSpec::get(format!("{}/1/boards/{{board}}/lists", self.base_url))
            .path_param("board", board_id)
            .query("key", &self.api_key)
            .query("token", token);

        let lists: Vec<ExternalList> = self.http.call_json(&spec).await?;
        tracing::debug!(board_id, lists = lists.len(), "fetched board lists");
        Ok(lists)
    }

    /// Cards of a list with their attachments, in list order
    pub async fn cards(&self, token: &str, list_id: &str) -> Result<Vec<ExternalCard>> {
        let spec = RequestSpec::get(format!("{}/1/lists/{{list}}/cards", self.base_url))
            .path_param("list", list_id)
            .query("attachments", "true")
            .query("key", &self.api_key)
            .query("token", token);

        let cards: Vec<ExternalCard> = self.http.call_json(&spec).await?;
        tracing::debug!(list_id, cards = cards.len(), "fetched list cards");
        Ok(cards)
    }

    /// Download an uploaded attachment
    ///
    /// Attachment downloads authenticate with an OAuth header rather than
    /// query parameters. The attachment's own name and MIME type are used
    /// when the response does not provide better ones.
    pub async fn download_attachment(
        &self,
        token: &str,
        attachment: &ExternalAttachment,
    ) -> Result<DownloadedFile> {
        let spec = RequestSpec::get(attachment.url.clone()).header(
            "Authorization",
            format!(
                "OAuth oauth_consumer_key=\"{}\", oauth_token=\"{}\"",
                self.api_key, token
            ),
        );

        let mut file = self.http.download(&spec).await?;

        if !attachment.name.trim().is_empty() {
            file.file_name = sanitize_file_name(&attachment.name);
        }
        if attachment.mime_type.is_some()
            && file
                .content_type
                .as_deref()
                .is_none_or(|ct| ct == "application/octet-stream")
        {
            file.content_type = attachment.mime_type.clone();
        }

        tracing::debug!(
            attachment_id = %attachment.id,
            file_name = %file.file_name,
            size = file.bytes.len(),
            "downloaded attachment"
        );
        Ok(file)
    }
}
