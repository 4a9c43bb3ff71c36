pub mod trello;

use async_trait::async_trait;

use crate::error::ImportError;
use crate::model::board::{Label, Member, NamedEntry};
use crate::model::card::{CardRequest, CreatedCard};

/// The remote board operations the importer and discovery commands rely on.
#[async_trait]
pub trait BoardApi: Send + Sync {
    fn name(&self) -> &str;
    async fn list_labels(&self, board_id: &str) -> Result<Vec<Label>, ImportError>;
    async fn list_members(&self, board_id: &str) -> Result<Vec<Member>, ImportError>;
    async fn create_card(
        &self,
        list_id: &str,
        card: &CardRequest,
    ) -> Result<CreatedCard, ImportError>;
    async fn create_attachment(
        &self,
        card_id: &str,
        url: &str,
        name: &str,
    ) -> Result<(), ImportError>;
    async fn list_boards(&self) -> Result<Vec<NamedEntry>, ImportError>;
    async fn list_lists(&self, board_id: &str) -> Result<Vec<NamedEntry>, ImportError>;
}
