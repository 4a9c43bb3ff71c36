use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::BoardApi;
use crate::config::TrelloConfig;
use crate::error::ImportError;
use crate::model::board::{Label, Member, NamedEntry};
use crate::model::card::{CardRequest, CreatedCard};

pub struct TrelloClient {
    api_key: String,
    token: String,
    base_url: String,
    client: reqwest::Client,
    accept_any_success: bool,
}

impl TrelloClient {
    pub fn new(config: &TrelloConfig) -> Result<Self, ImportError> {
        let (api_key, token) = config.credentials()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ImportError::transport("build HTTP client", e))?;

        Ok(Self {
            api_key: api_key.to_string(),
            token: token.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            accept_any_success: config.accept_any_success,
        })
    }

    fn auth_params(&self) -> [(&str, &str); 2] {
        [("key", &self.api_key), ("token", &self.token)]
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn is_success(&self, status: StatusCode) -> bool {
        if self.accept_any_success {
            status.is_success()
        } else {
            status == StatusCode::OK
        }
    }

    /// Send a request and turn transport failures and non-success statuses
    /// into errors carrying `action`.
    async fn send(&self, action: &str, request: RequestBuilder) -> Result<Response, ImportError> {
        let resp = request
            .query(&self.auth_params())
            .send()
            .await
            .map_err(|e| ImportError::transport(action, e))?;

        let status = resp.status();
        debug!(%status, action, "trello response");
        if self.is_success(status) {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ImportError::api(action, status.as_u16(), body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        action: &str,
        request: RequestBuilder,
    ) -> Result<T, ImportError> {
        self.send(action, request)
            .await?
            .json()
            .await
            .map_err(|e| ImportError::transport(action, e))
    }
}

#[derive(Deserialize)]
struct TrelloLabel {
    id: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct TrelloMember {
    id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Card {
    id: String,
    short_url: Option<String>,
}

#[derive(Deserialize)]
struct Named {
    id: String,
    name: String,
}

impl From<Named> for NamedEntry {
    fn from(n: Named) -> Self {
        NamedEntry {
            id: n.id,
            name: n.name,
        }
    }
}

#[async_trait]
impl BoardApi for TrelloClient {
    fn name(&self) -> &str {
        "Trello"
    }

    async fn list_labels(&self, board_id: &str) -> Result<Vec<Label>, ImportError> {
        let labels: Vec<TrelloLabel> = self
            .send_json(
                "fetch labels",
                self.client
                    .get(self.url(&format!("/boards/{board_id}/labels")))
                    .query(&[("fields", "id,name"), ("limit", "1000")]),
            )
            .await?;

        Ok(labels
            .into_iter()
            .map(|l| Label {
                id: l.id,
                name: l.name.unwrap_or_default(),
            })
            .collect())
    }

    async fn list_members(&self, board_id: &str) -> Result<Vec<Member>, ImportError> {
        let members: Vec<TrelloMember> = self
            .send_json(
                "fetch members",
                self.client
                    .get(self.url(&format!("/boards/{board_id}/members")))
                    .query(&[("fields", "id,username,email")]),
            )
            .await?;

        Ok(members
            .into_iter()
            .map(|m| Member {
                id: m.id,
                username: m.username.unwrap_or_default(),
                email: m.email.filter(|e| !e.trim().is_empty()),
            })
            .collect())
    }

    async fn create_card(
        &self,
        list_id: &str,
        card: &CardRequest,
    ) -> Result<CreatedCard, ImportError> {
        let action = format!("create card '{}'", card.name);
        let created: Card = self
            .send_json(
                &action,
                self.client
                    .post(self.url("/cards"))
                    .query(&card.query_params(list_id)),
            )
            .await?;

        Ok(CreatedCard {
            id: created.id,
            url: created.short_url,
        })
    }

    async fn create_attachment(
        &self,
        card_id: &str,
        url: &str,
        name: &str,
    ) -> Result<(), ImportError> {
        let action = format!("attach URL to card '{name}'");
        self.send(
            &action,
            self.client
                .post(self.url(&format!("/cards/{card_id}/attachments")))
                .query(&[("url", url), ("name", name)]),
        )
        .await?;
        Ok(())
    }

    async fn list_boards(&self) -> Result<Vec<NamedEntry>, ImportError> {
        let boards: Vec<Named> = self
            .send_json(
                "list boards",
                self.client
                    .get(self.url("/members/me/boards"))
                    .query(&[("fields", "id,name")]),
            )
            .await?;
        Ok(boards.into_iter().map(NamedEntry::from).collect())
    }

    async fn list_lists(&self, board_id: &str) -> Result<Vec<NamedEntry>, ImportError> {
        let lists: Vec<Named> = self
            .send_json(
                &format!("list lists of board {board_id}"),
                self.client
                    .get(self.url(&format!("/boards/{board_id}/lists")))
                    .query(&[("fields", "id,name")]),
            )
            .await?;
        Ok(lists.into_iter().map(NamedEntry::from).collect())
    }
}
