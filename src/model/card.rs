use std::fmt;

use chrono::NaiveDate;

/// Where a new card lands in its list.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    Top,
    #[default]
    Bottom,
    Rank(f64),
}

impl Position {
    /// Normalize a raw spreadsheet value. Unrecognised values fall back to
    /// `Bottom` instead of rejecting the row.
    pub fn parse(raw: &str) -> Self {
        let value = raw.trim();
        match value.to_lowercase().as_str() {
            "top" => Position::Top,
            "bottom" => Position::Bottom,
            _ => match value.parse::<f64>() {
                Ok(rank) if rank.is_finite() => Position::Rank(rank),
                _ => Position::Bottom,
            },
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Top => write!(f, "top"),
            Position::Bottom => write!(f, "bottom"),
            Position::Rank(rank) => write!(f, "{rank}"),
        }
    }
}

/// A fully validated and resolved card, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRequest {
    /// Visible spreadsheet row the card came from.
    pub row: usize,
    pub name: String,
    pub description: String,
    pub position: Position,
    pub due: Option<NaiveDate>,
    pub label_ids: Vec<String>,
    pub member_ids: Vec<String>,
    pub attachment_url: Option<String>,
}

/// Time of day sent with every due date; the sheet only carries the date.
pub const DUE_TIME_OF_DAY: &str = "T12:00:00.000Z";

impl CardRequest {
    pub fn due_timestamp(&self) -> Option<String> {
        self.due
            .map(|date| format!("{}{DUE_TIME_OF_DAY}", date.format("%Y-%m-%d")))
    }

    /// Query parameters for the create-card call, credentials excluded.
    pub fn query_params(&self, list_id: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("idList", list_id.to_string()),
            ("name", self.name.clone()),
            ("desc", self.description.clone()),
            ("pos", self.position.to_string()),
        ];
        if let Some(due) = self.due_timestamp() {
            params.push(("due", due));
        }
        if !self.label_ids.is_empty() {
            params.push(("idLabels", self.label_ids.join(",")));
        }
        if !self.member_ids.is_empty() {
            params.push(("idMembers", self.member_ids.join(",")));
        }
        params
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCard {
    pub id: String,
    pub url: Option<String>,
}
