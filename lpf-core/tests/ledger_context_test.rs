//! Integration tests for the local ledger backend
//!
//! These build a full LpfContext over a temporary data directory, so
//! configuration, migrations and DuckDB writes are all real.
//!
//! Run with: cargo test --test ledger_context_test -- --nocapture

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tempfile::TempDir;

use lpf_core::config::SETTINGS_FILE;
use lpf_core::ports::{NoticeLevel, RecordingNotifier, SilentNotifier};
use lpf_core::{ColumnMapping, LpfContext, TransactionKind, LEDGER_FILE};

const STATEMENT: &str = "Data,Descrição,Valor\n\
                         2024-05-01,Supermercado,\"-150,50\"\n\
                         2024-05-03,Salário,\"5.000,00\"\n\
                         2024-06-02,Cinema,\"-42,10\"\n";

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Upload, confirm detection, select everything and submit
fn import_statement(ctx: &LpfContext) -> lpf_core::ImportResult {
    let request = ctx
        .import_service
        .parse_csv(STATEMENT)
        .unwrap()
        .confirm_mapping(ColumnMapping::default())
        .unwrap()
        .into_request(None)
        .unwrap();
    ctx.import_service.submit(&request)
}

#[test]
fn test_fresh_directory_uses_seeded_local_ledger() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = LpfContext::new(temp_dir.path()).unwrap();

    assert!(ctx.ledger.is_some());
    assert_eq!(ctx.storage.name(), "local");
    assert!(temp_dir.path().join(LEDGER_FILE).exists());

    let categories = ctx.categories.list_categories().unwrap();
    assert_eq!(categories.len(), 11);
    assert!(categories.iter().all(|c| c.is_default));
}

#[test]
fn test_import_persists_to_ledger() {
    let temp_dir = TempDir::new().unwrap();
    let notifier = Arc::new(RecordingNotifier::new());
    let ctx = LpfContext::with_notifier(temp_dir.path(), notifier.clone()).unwrap();

    let result = import_statement(&ctx);
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.total_imported, 3);
    assert_eq!(
        notifier.notices(),
        vec![(
            NoticeLevel::Success,
            "3 transactions imported (1 incomes, 2 expenses)".to_string()
        )]
    );

    let ledger = ctx.ledger.as_ref().unwrap();
    let may = ledger.list_entries(Some((2024, 5))).unwrap();
    assert_eq!(may.len(), 2);
    assert_eq!(may[0].kind, TransactionKind::Income);
    assert_eq!(may[0].value, dec("5000"));
    assert_eq!(may[1].description, "Supermercado");
    assert_eq!(may[1].value, dec("150.50"));
    assert!(may[1].category_name.is_some());

    let totals = ledger.month_totals().unwrap();
    assert_eq!(totals.len(), 2);
    assert_eq!((totals[0].year, totals[0].month), (2024, 6));
    assert_eq!(totals[0].expenses, dec("42.10"));
    assert_eq!(totals[1].incomes, dec("5000"));
    assert_eq!(totals[1].expenses, dec("150.50"));
}

#[test]
fn test_ledger_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    {
        let ctx = LpfContext::new(temp_dir.path()).unwrap();
        import_statement(&ctx);
    }

    let ctx = LpfContext::new(temp_dir.path()).unwrap();
    assert_eq!(ctx.categories.list_categories().unwrap().len(), 11);
    assert_eq!(ctx.ledger.as_ref().unwrap().list_entries(None).unwrap().len(), 3);
}

#[test]
fn test_dry_run_leaves_ledger_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = LpfContext::new(temp_dir.path()).unwrap();

    let request = ctx
        .import_service
        .parse_csv(STATEMENT)
        .unwrap()
        .confirm_mapping(ColumnMapping::default())
        .unwrap()
        .into_request(None)
        .unwrap();

    let (service, storage) = ctx.dry_run_service(Arc::new(SilentNotifier));
    let result = service.submit(&request);

    assert_eq!(result.total_imported, 3);
    assert_eq!(storage.expenses().len(), 2);
    assert_eq!(storage.incomes().len(), 1);
    assert!(ctx.ledger.as_ref().unwrap().list_entries(None).unwrap().is_empty());
}

#[test]
fn test_added_category_is_used_for_import() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = LpfContext::new(temp_dir.path()).unwrap();
    let ledger = ctx.ledger.as_ref().unwrap();

    let category = ledger
        .add_category("Freelas", lpf_core::CategoryType::Income)
        .unwrap();
    assert!(ledger
        .add_category("freelas", lpf_core::CategoryType::Income)
        .is_err());

    let request = ctx
        .import_service
        .parse_csv(STATEMENT)
        .unwrap()
        .confirm_mapping(ColumnMapping::default())
        .unwrap()
        .into_request(Some(category.id.clone()))
        .unwrap();
    let result = ctx.import_service.submit(&request);
    assert!(result.success);

    let entries = ledger.list_entries(None).unwrap();
    let income = entries
        .iter()
        .find(|e| e.kind == TransactionKind::Income)
        .unwrap();
    assert_eq!(income.category_id, category.id);
    assert!(entries
        .iter()
        .filter(|e| e.kind == TransactionKind::Expense)
        .all(|e| e.category_id != category.id));
}

#[test]
fn test_api_backend_requires_url() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join(SETTINGS_FILE),
        r#"{"storage": {"backend": "api"}}"#,
    )
    .unwrap();

    let err = LpfContext::new(temp_dir.path()).err().unwrap();
    assert!(err.to_string().contains("apiUrl"));
    assert!(!temp_dir.path().join(LEDGER_FILE).exists());
}
