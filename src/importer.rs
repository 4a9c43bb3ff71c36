use std::path::Path;

use tracing::{info, warn};

use crate::error::ImportError;
use crate::metadata::BoardMetadata;
use crate::providers::BoardApi;
use crate::resolver::{resolve_row, ResolvePolicy, Strictness};
use crate::schema::{ColumnLayout, SchemaVariant};
use crate::sheet::read_sheet;

/// Everything one import run needs, resolved from config and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    /// Only needed when the schema resolves labels or members.
    pub board_id: Option<String>,
    pub list_id: String,
    pub schema: SchemaVariant,
    pub policy: ResolvePolicy,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows that passed validation and resolution.
    pub resolved: usize,
    pub created: usize,
    pub attachments: usize,
    pub skipped: usize,
}

pub struct Importer<'a> {
    api: &'a dyn BoardApi,
    settings: ImportSettings,
}

impl<'a> Importer<'a> {
    pub fn new(api: &'a dyn BoardApi, settings: ImportSettings) -> Self {
        Self { api, settings }
    }

    /// Run the import. The first fatal error stops the run; cards created
    /// for earlier rows stay on the board.
    pub async fn run(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        if !path.is_file() {
            return Err(ImportError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let sheet = read_sheet(path)?;
        println!(
            "Loaded {} row(s) from {}",
            sheet.rows.len(),
            path.display()
        );

        let layout = ColumnLayout::resolve(self.settings.schema, &sheet.columns)?;

        let metadata = if layout.needs_metadata() {
            let board_id = self.settings.board_id.as_deref().ok_or_else(|| {
                ImportError::Config(format!(
                    "schema '{}' resolves labels/members and needs a board id",
                    self.settings.schema.as_str()
                ))
            })?;
            println!("Fetching labels and members from {}...", self.api.name());
            let metadata = BoardMetadata::fetch(self.api, board_id).await?;
            println!(
                "Found {} label(s) and {} member(s)",
                metadata.label_count(),
                metadata.member_count()
            );
            metadata
        } else {
            BoardMetadata::default()
        };

        let mut summary = ImportSummary::default();
        let policy = &self.settings.policy;

        for row in &sheet.rows {
            let resolution = match resolve_row(row, &layout, &metadata, policy) {
                Ok(resolution) => resolution,
                Err(source) => match policy.strictness {
                    Strictness::Strict => {
                        return Err(ImportError::Row {
                            row: row.number,
                            source,
                        })
                    }
                    Strictness::Lenient => {
                        warn!(row = row.number, error = %source, "skipping row");
                        println!("Row {} skipped: {source}", row.number);
                        summary.skipped += 1;
                        continue;
                    }
                },
            };

            for warning in &resolution.warnings {
                warn!(row = row.number, "{warning}");
                println!("Row {}: {warning}", row.number);
            }

            let card = resolution.request;
            summary.resolved += 1;

            if self.settings.dry_run {
                println!(
                    "[dry-run] row {}: '{}' pos={} due={} labels=[{}] members=[{}]{}",
                    card.row,
                    card.name,
                    card.position,
                    card.due_timestamp().as_deref().unwrap_or("-"),
                    card.label_ids.join(","),
                    card.member_ids.join(","),
                    card.attachment_url
                        .as_deref()
                        .map(|u| format!(" attach={u}"))
                        .unwrap_or_default()
                );
                continue;
            }

            let created = self
                .api
                .create_card(&self.settings.list_id, &card)
                .await?;
            summary.created += 1;
            info!(row = card.row, card_id = %created.id, "card created");
            match &created.url {
                Some(url) => println!("Card '{}' created: {url}", card.name),
                None => println!("Card '{}' created", card.name),
            }

            if let Some(url) = &card.attachment_url {
                self.api
                    .create_attachment(&created.id, url, &card.name)
                    .await?;
                summary.attachments += 1;
                println!("  attached {url}");
            }
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::model::board::{Label, Member};
    use crate::providers::tests::{Call, MockBoard};

    const FULL_HEADER: &str = "Título,Descrição,Data de Entrega,Posição,Labels,Membros,URL Anexada";
    const MINIMAL_HEADER: &str = "Nome do Cartão,Descrição,Data de Entrega,Posição";

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn board() -> MockBoard {
        MockBoard::new()
            .with_labels(vec![
                Label {
                    id: "L1".into(),
                    name: "Bug".into(),
                },
                Label {
                    id: "L2".into(),
                    name: "Urgent".into(),
                },
            ])
            .with_members(vec![Member {
                id: "M1".into(),
                username: "alice".into(),
                email: Some("alice@x.com".into()),
            }])
    }

    fn settings(schema: SchemaVariant, strictness: Strictness, required: bool) -> ImportSettings {
        ImportSettings {
            board_id: Some("B1".into()),
            list_id: "LIST".into(),
            schema,
            policy: ResolvePolicy {
                strictness,
                require_labels: required,
                require_members: required,
            },
            dry_run: false,
        }
    }

    fn strict_full() -> ImportSettings {
        settings(SchemaVariant::Full, Strictness::Strict, true)
    }

    #[tokio::test]
    async fn full_import_creates_cards_in_order() {
        let file = csv_file(&[
            FULL_HEADER,
            "Fix bug,,2024-03-01,top,\"Bug, Urgent\",alice@x.com,",
            "Write docs,Explain setup,,,bug,ALICE,https://example.com/spec",
        ]);
        let api = board();

        let summary = Importer::new(&api, strict_full())
            .run(file.path())
            .await
            .unwrap();

        assert_eq!(
            summary,
            ImportSummary {
                resolved: 2,
                created: 2,
                attachments: 1,
                skipped: 0
            }
        );
        assert_eq!(
            api.call_names(),
            vec![
                "list_labels:B1",
                "list_members:B1",
                "create_card:Fix bug",
                "create_card:Write docs",
                "create_attachment:C2",
            ]
        );

        assert!(matches!(
            &api.calls()[2],
            Call::CreateCard { list_id, .. } if list_id == "LIST"
        ));

        let cards = api.created_cards();
        assert_eq!(cards[0].label_ids, vec!["L1", "L2"]);
        assert_eq!(cards[0].member_ids, vec!["M1"]);
        assert_eq!(
            cards[0].due_timestamp().as_deref(),
            Some("2024-03-01T12:00:00.000Z")
        );
        assert_eq!(cards[1].description, "Explain setup");

        let attach = api.calls().pop().unwrap();
        assert_eq!(
            attach,
            Call::CreateAttachment {
                card_id: "C2".into(),
                url: "https://example.com/spec".into(),
                name: "Write docs".into(),
            }
        );
    }

    #[tokio::test]
    async fn strict_unresolved_label_halts_before_card() {
        let file = csv_file(&[
            FULL_HEADER,
            "First,,,,Bug,alice,",
            "Fix bug,,2024-03-01,top,\"Bug, Missing\",alice@x.com,",
            "Never,,,,Bug,alice,",
        ]);
        let api = board();

        let err = Importer::new(&api, strict_full())
            .run(file.path())
            .await
            .unwrap_err();

        match err {
            ImportError::Row { row, source } => {
                assert_eq!(row, 3);
                assert_eq!(source, crate::error::RowError::UnresolvedLabel("Missing".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
        let created: Vec<String> = api.created_cards().into_iter().map(|c| c.name).collect();
        assert_eq!(created, vec!["First"]);
    }

    #[tokio::test]
    async fn lenient_creates_card_with_resolvable_labels() {
        let file = csv_file(&[
            FULL_HEADER,
            "Fix bug,,2024-03-01,top,\"Bug, Missing\",alice@x.com,",
        ]);
        let api = board();

        let summary = Importer::new(
            &api,
            settings(SchemaVariant::Full, Strictness::Lenient, false),
        )
        .run(file.path())
        .await
        .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(api.created_cards()[0].label_ids, vec!["L1"]);
    }

    #[tokio::test]
    async fn lenient_skips_rows_without_title() {
        let file = csv_file(&[
            MINIMAL_HEADER,
            ",orphan description,,",
            "Real card,desc,2024-05-02,bottom",
        ]);
        let api = MockBoard::new();

        let summary = Importer::new(
            &api,
            settings(SchemaVariant::Minimal, Strictness::Lenient, false),
        )
        .run(file.path())
        .await
        .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.created, 1);
        // Minimal layout never touches labels or members.
        assert_eq!(api.call_names(), vec!["create_card:Real card"]);
    }

    #[tokio::test]
    async fn strict_empty_title_halts() {
        let file = csv_file(&[MINIMAL_HEADER, ",orphan,,", "Later,,,"]);
        let api = MockBoard::new();

        let err = Importer::new(
            &api,
            settings(SchemaVariant::Minimal, Strictness::Strict, false),
        )
        .run(file.path())
        .await
        .unwrap_err();

        assert!(matches!(err, ImportError::Row { row: 2, .. }));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_path_fails_without_remote_calls() {
        let api = board();
        let err = Importer::new(&api, strict_full())
            .run(Path::new(""))
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::FileNotFound { .. }));
        assert!(err.to_string().contains("''"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_column_fails_without_remote_calls() {
        let file = csv_file(&["Título,Descrição,Labels", "x,y,Bug"]);
        let api = board();

        let err = Importer::new(&api, strict_full())
            .run(file.path())
            .await
            .unwrap_err();

        match err {
            ImportError::MissingColumns {
                missing, found, ..
            } => {
                assert_eq!(missing, vec!["Membros"]);
                assert_eq!(found, vec!["Título", "Descrição", "Labels"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn metadata_failure_stops_before_rows() {
        let file = csv_file(&[FULL_HEADER, "x,,,,Bug,alice,"]);
        let api = board().failing_on("list_members");

        let err = Importer::new(&api, strict_full())
            .run(file.path())
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Api { .. }));
        assert!(api.created_cards().is_empty());
    }

    #[tokio::test]
    async fn create_failure_halts_remaining_rows() {
        let file = csv_file(&[
            FULL_HEADER,
            "First,,,,Bug,alice,",
            "Second,,,,Bug,alice,",
            "Third,,,,Bug,alice,",
        ]);
        let api = board().failing_on("create_card:Second");

        let err = Importer::new(&api, strict_full())
            .run(file.path())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("Second"));
        let names = api.call_names();
        assert_eq!(names.last().map(String::as_str), Some("create_card:Second"));
        assert!(!names.iter().any(|n| n.contains("Third")));
    }

    #[tokio::test]
    async fn attachment_failure_is_fatal() {
        let file = csv_file(&[
            FULL_HEADER,
            "First,,,,Bug,alice,https://example.com",
            "Second,,,,Bug,alice,",
        ]);
        let api = board().failing_on("create_attachment");

        let err = Importer::new(&api, strict_full())
            .run(file.path())
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Api { .. }));
        assert_eq!(api.created_cards().len(), 1);
    }

    #[tokio::test]
    async fn dry_run_resolves_without_creating() {
        let file = csv_file(&[
            FULL_HEADER,
            "Fix bug,,2024-03-01,top,Bug,alice@x.com,https://example.com",
        ]);
        let api = board();
        let mut settings = strict_full();
        settings.dry_run = true;

        let summary = Importer::new(&api, settings)
            .run(file.path())
            .await
            .unwrap();

        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.created, 0);
        assert_eq!(api.call_names(), vec!["list_labels:B1", "list_members:B1"]);
    }

    #[tokio::test]
    async fn reference_schema_without_board_is_a_config_error() {
        let file = csv_file(&[FULL_HEADER, "x,,,,Bug,alice,"]);
        let api = board();
        let mut settings = strict_full();
        settings.board_id = None;

        let err = Importer::new(&api, settings)
            .run(file.path())
            .await
            .unwrap_err();

        assert!(matches!(err, ImportError::Config(_)));
        assert!(api.calls().is_empty());
    }
}
