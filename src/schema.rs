use serde::Deserialize;

use crate::error::ImportError;

pub const TITLE: &str = "Nome do Cartão";
pub const TITLE_ALT: &str = "Título";
pub const DESCRIPTION: &str = "Descrição";
pub const DUE_DATE: &str = "Data de Entrega";
pub const POSITION: &str = "Posição";
pub const LABELS: &str = "Labels";
pub const MEMBERS: &str = "Membros";
pub const ATTACHMENT: &str = "URL Anexada";

/// The spreadsheet layouts the importer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVariant {
    /// Title, description, due date and position only.
    Minimal,
    /// Minimal plus a required Labels column.
    Extended,
    /// Labels, members and an optional attachment URL.
    #[default]
    Full,
}

impl SchemaVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaVariant::Minimal => "minimal",
            SchemaVariant::Extended => "extended",
            SchemaVariant::Full => "full",
        }
    }

    /// Whether a malformed row halts the run unless configured otherwise.
    pub fn strict_by_default(self) -> bool {
        !matches!(self, SchemaVariant::Minimal)
    }

    /// Whether an empty Labels/Membros cell is an error unless configured
    /// otherwise.
    pub fn requires_references_by_default(self) -> bool {
        matches!(self, SchemaVariant::Full)
    }
}

/// Which columns of a loaded sheet feed which card field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub title: &'static str,
    pub description: &'static str,
    pub due: Option<&'static str>,
    pub position: Option<&'static str>,
    pub labels: Option<&'static str>,
    pub members: Option<&'static str>,
    pub attachment: Option<&'static str>,
}

impl ColumnLayout {
    /// Check the sheet's header against the variant and pick the columns to
    /// read. Fails when any required column is absent.
    pub fn resolve(variant: SchemaVariant, found: &[String]) -> Result<Self, ImportError> {
        let has = |name: &str| found.iter().any(|c| c == name);
        let optional = |name: &'static str| has(name).then_some(name);

        let layout = match variant {
            SchemaVariant::Minimal => ColumnLayout {
                title: TITLE,
                description: DESCRIPTION,
                due: Some(DUE_DATE),
                position: Some(POSITION),
                labels: None,
                members: None,
                attachment: None,
            },
            SchemaVariant::Extended => ColumnLayout {
                title: TITLE,
                description: DESCRIPTION,
                due: Some(DUE_DATE),
                position: Some(POSITION),
                labels: Some(LABELS),
                members: None,
                attachment: None,
            },
            SchemaVariant::Full => ColumnLayout {
                title: if has(TITLE_ALT) { TITLE_ALT } else { TITLE },
                description: DESCRIPTION,
                due: optional(DUE_DATE),
                position: optional(POSITION),
                labels: Some(LABELS),
                members: Some(MEMBERS),
                attachment: optional(ATTACHMENT),
            },
        };

        let expected = layout.required_columns(variant);
        let missing: Vec<String> = expected
            .iter()
            .filter(|&&name| !has(name))
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ImportError::MissingColumns {
                missing,
                expected: expected.iter().map(|s| s.to_string()).collect(),
                found: found.to_vec(),
            });
        }

        Ok(layout)
    }

    fn required_columns(&self, variant: SchemaVariant) -> Vec<&'static str> {
        let mut required = vec![self.title, self.description];
        if variant != SchemaVariant::Full {
            required.extend(self.due);
            required.extend(self.position);
        }
        required.extend(self.labels);
        required.extend(self.members);
        required
    }

    /// Label or member resolution needs the board's metadata.
    pub fn needs_metadata(&self) -> bool {
        self.labels.is_some() || self.members.is_some()
    }
}
