use crate::error::RowError;
use crate::metadata::BoardMetadata;
use crate::model::card::{CardRequest, Position};
use crate::schema::ColumnLayout;
use crate::sheet::SheetRow;
use crate::util::date::parse_due_date;

/// How the importer reacts to a bad row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Any row problem halts the run.
    Strict,
    /// Malformed rows are skipped and unknown references dropped, with a
    /// warning each time.
    Lenient,
}

impl Strictness {
    pub fn from_flag(strict: bool) -> Self {
        if strict {
            Strictness::Strict
        } else {
            Strictness::Lenient
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvePolicy {
    pub strictness: Strictness,
    /// An empty Labels cell is an error rather than "no labels".
    pub require_labels: bool,
    /// An empty Membros cell is an error rather than "no members".
    pub require_members: bool,
}

/// A resolved row plus the warnings raised while resolving it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub request: CardRequest,
    pub warnings: Vec<String>,
}

pub fn resolve_row(
    row: &SheetRow,
    layout: &ColumnLayout,
    metadata: &BoardMetadata,
    policy: &ResolvePolicy,
) -> Result<Resolution, RowError> {
    let mut warnings = Vec::new();

    let name = row
        .get(layout.title)
        .ok_or(RowError::EmptyTitle)?
        .to_string();

    let description = row.get(layout.description).unwrap_or_default().to_string();

    let position = layout
        .position
        .and_then(|col| row.get(col))
        .map(Position::parse)
        .unwrap_or_default();

    let due = match layout.due.and_then(|col| row.get(col)) {
        Some(raw) => {
            Some(parse_due_date(raw).ok_or_else(|| RowError::InvalidDueDate(raw.to_string()))?)
        }
        None => None,
    };

    let label_ids = match layout.labels {
        Some(col) => resolve_tokens(
            row,
            col,
            policy.require_labels,
            policy.strictness,
            |token| metadata.label_id(token),
            RowError::UnresolvedLabel,
            &mut warnings,
        )?,
        None => Vec::new(),
    };

    let member_ids = match layout.members {
        Some(col) => resolve_tokens(
            row,
            col,
            policy.require_members,
            policy.strictness,
            |token| metadata.member_id(token),
            RowError::UnresolvedMember,
            &mut warnings,
        )?,
        None => Vec::new(),
    };

    let attachment_url = layout
        .attachment
        .and_then(|col| row.get(col))
        .map(str::to_string);

    Ok(Resolution {
        request: CardRequest {
            row: row.number,
            name,
            description,
            position,
            due,
            label_ids,
            member_ids,
            attachment_url,
        },
        warnings,
    })
}

/// Split a comma-separated cell and look every token up. In lenient mode an
/// unknown token becomes a warning instead of an error.
fn resolve_tokens<'m>(
    row: &SheetRow,
    column: &str,
    required: bool,
    strictness: Strictness,
    lookup: impl Fn(&str) -> Option<&'m str>,
    unresolved: fn(String) -> RowError,
    warnings: &mut Vec<String>,
) -> Result<Vec<String>, RowError> {
    let Some(raw) = row.get(column) else {
        return if required {
            Err(RowError::EmptyColumn(column.to_string()))
        } else {
            Ok(Vec::new())
        };
    };

    let mut ids: Vec<String> = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match lookup(token) {
            Some(id) => {
                if !ids.iter().any(|existing| existing == id) {
                    ids.push(id.to_string());
                }
            }
            None => {
                let err = unresolved(token.to_string());
                match strictness {
                    Strictness::Strict => return Err(err),
                    Strictness::Lenient => warnings.push(format!("{err}, ignored")),
                }
            }
        }
    }

    if ids.is_empty() && required && strictness == Strictness::Strict {
        return Err(RowError::EmptyColumn(column.to_string()));
    }

    Ok(ids)
}
