use std::collections::HashMap;

use tracing::info;

use crate::error::ImportError;
use crate::model::board::{Label, Member};
use crate::providers::BoardApi;

/// Snapshot of a board's labels and members, keyed for case-insensitive
/// lookup. Taken once per run before any row is processed.
#[derive(Debug, Clone, Default)]
pub struct BoardMetadata {
    labels: HashMap<String, String>,
    emails: HashMap<String, String>,
    usernames: HashMap<String, String>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl BoardMetadata {
    pub async fn fetch(api: &dyn BoardApi, board_id: &str) -> Result<Self, ImportError> {
        let labels = api.list_labels(board_id).await?;
        let members = api.list_members(board_id).await?;
        let metadata = Self::from_parts(labels, members);
        info!(
            board_id,
            labels = metadata.labels.len(),
            members = metadata.usernames.len(),
            "fetched board metadata"
        );
        Ok(metadata)
    }

    pub fn from_parts(labels: Vec<Label>, members: Vec<Member>) -> Self {
        let labels = labels
            .into_iter()
            .filter(|l| !l.name.trim().is_empty())
            .map(|l| (normalize(&l.name), l.id))
            .collect();

        let mut emails = HashMap::new();
        let mut usernames = HashMap::new();
        for member in members {
            if let Some(email) = member.email.as_deref().map(normalize) {
                if !email.is_empty() {
                    emails.insert(email, member.id.clone());
                }
            }
            let username = normalize(&member.username);
            if !username.is_empty() {
                usernames.insert(username, member.id);
            }
        }

        Self {
            labels,
            emails,
            usernames,
        }
    }

    pub fn label_id(&self, name: &str) -> Option<&str> {
        self.labels.get(&normalize(name)).map(String::as_str)
    }

    /// Email first, then username.
    pub fn member_id(&self, token: &str) -> Option<&str> {
        let key = normalize(token);
        self.emails
            .get(&key)
            .or_else(|| self.usernames.get(&key))
            .map(String::as_str)
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn member_count(&self) -> usize {
        self.emails.len().max(self.usernames.len())
    }
}
