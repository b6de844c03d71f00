use super::*;
use mg_core::CoreError;
use mg_db::{DuckDbBackend, LedgerRow, MemoryBackend};
use std::fs;
use tempfile::{tempdir, TempDir};

const LEDGER: &str = "migrations";

fn write(dir: &Path, name: &str, up: &str, down: &str) {
    fs::write(
        dir.join(format!("{name}.sql")),
        format!("-- UP --\n{up}\n\n-- DOWN --\n{down}\n"),
    )
    .unwrap();
}

fn setup() -> (TempDir, Arc<MemoryBackend>, Migrator) {
    let dir = tempdir().unwrap();
    let db = Arc::new(MemoryBackend::new());
    let migrator = Migrator::new(MigrationDirectory::new(dir.path()), db.clone());
    (dir, db, migrator)
}

fn names(files: &[MigrationFile]) -> Vec<String> {
    files.iter().map(|f| f.name().to_string()).collect()
}

fn ledger(db: &MemoryBackend) -> Vec<(String, i64)> {
    db.ledger(LEDGER)
        .unwrap()
        .into_iter()
        .map(|LedgerRow { migration, batch }| (migration, batch))
        .collect()
}

#[test]
fn test_discover_filename_order() {
    let (dir, _db, migrator) = setup();
    write(dir.path(), "2024_01_01_000002_c", "SELECT 3", "");
    write(dir.path(), "2024_01_01_000000_a", "SELECT 1", "");
    write(dir.path(), "2024_01_01_000001_b", "SELECT 2", "");

    let forward = migrator.discover().unwrap();
    assert_eq!(
        names(&forward),
        vec![
            "2024_01_01_000000_a",
            "2024_01_01_000001_b",
            "2024_01_01_000002_c"
        ]
    );

    let mut reversed = forward.clone();
    reversed.reverse();
    assert_eq!(migrator.discover_reverse().unwrap(), reversed);
}

#[test]
fn test_discover_empty_directory() {
    let (_dir, _db, migrator) = setup();
    let err = migrator.discover().unwrap_err();
    assert!(matches!(err, MigrateError::NoMigrations { .. }));
    assert!(err.is_nothing_to_do());
}

#[test]
fn test_discover_missing_directory() {
    let dir = tempdir().unwrap();
    let migrator = Migrator::new(
        MigrationDirectory::new(dir.path().join("absent")),
        Arc::new(MemoryBackend::new()),
    );
    let err = migrator.discover().unwrap_err();
    assert!(matches!(
        err,
        MigrateError::Core(CoreError::IoWithPath { .. })
    ));
    assert!(!err.is_nothing_to_do());
}

#[tokio::test]
async fn test_migrate_with_mistyped_directory_fails() {
    let dir = tempdir().unwrap();
    let db = Arc::new(MemoryBackend::new());
    let migrator = Migrator::new(
        MigrationDirectory::new(dir.path().join("typo_migrations")),
        db.clone(),
    );

    let err = migrator.migrate().await.unwrap_err();
    assert!(!err.is_nothing_to_do());
    assert!(err.to_string().contains("typo_migrations"));
    assert!(db.executed().unwrap().is_empty());
}

#[tokio::test]
async fn test_migrate_empty_directory_creates_ledger() {
    let (_dir, db, migrator) = setup();
    let err = migrator.migrate().await.unwrap_err();
    assert!(matches!(err, MigrateError::NoMigrations { .. }));
    assert!(db.relation_exists(LEDGER).await.unwrap());
}

#[tokio::test]
async fn test_pending_is_directory_minus_ledger() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "SELECT 1", "");
    write(dir.path(), "2024_01_01_000001_b", "SELECT 2", "");
    write(dir.path(), "2024_01_01_000002_c", "SELECT 3", "");

    db.ensure_ledger_table(LEDGER).await.unwrap();
    db.insert_ledger_row(LEDGER, "2024_01_01_000001_b", 1)
        .await
        .unwrap();

    let pending = migrator.pending().await.unwrap();
    assert_eq!(
        names(&pending),
        vec!["2024_01_01_000000_a", "2024_01_01_000002_c"]
    );

    db.insert_ledger_row(LEDGER, "2024_01_01_000000_a", 1)
        .await
        .unwrap();
    db.insert_ledger_row(LEDGER, "2024_01_01_000002_c", 1)
        .await
        .unwrap();
    // Extra ledger names without files do not make anything pending
    db.insert_ledger_row(LEDGER, "2023_12_31_000000_old", 1)
        .await
        .unwrap();
    assert!(migrator.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_migrate_applies_in_order_under_one_batch() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000001_b", "CREATE TABLE b (id INT)", "DROP TABLE b");
    write(dir.path(), "2024_01_01_000000_a", "CREATE TABLE a (id INT)", "DROP TABLE a");

    let report = migrator.migrate().await.unwrap();

    assert_eq!(report.batch, 1);
    assert_eq!(
        report.applied,
        vec![
            MigrationName::new("2024_01_01_000000_a"),
            MigrationName::new("2024_01_01_000001_b")
        ]
    );
    assert_eq!(
        db.executed().unwrap(),
        vec!["CREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]
    );
    assert_eq!(
        ledger(&db),
        vec![
            ("2024_01_01_000000_a".to_string(), 1),
            ("2024_01_01_000001_b".to_string(), 1)
        ]
    );
}

#[tokio::test]
async fn test_migrate_twice_is_nothing_to_migrate() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "SELECT 1", "");
    migrator.migrate().await.unwrap();
    let before = ledger(&db);

    let err = migrator.migrate().await.unwrap_err();

    assert!(matches!(err, MigrateError::NothingToMigrate));
    assert!(err.is_nothing_to_do());
    assert_eq!(ledger(&db), before);
    assert_eq!(db.executed().unwrap().len(), 1);
}

#[tokio::test]
async fn test_batch_numbers_increase_per_migrate() {
    let (dir, _db, migrator) = setup();
    for (i, label) in ["a", "b", "c"].iter().enumerate() {
        write(
            dir.path(),
            &format!("2024_01_01_00000{i}_{label}"),
            "SELECT 1",
            "SELECT 1",
        );
        let report = migrator.migrate().await.unwrap();
        assert_eq!(report.batch, i as i64 + 1);
        assert_eq!(report.applied.len(), 1);
    }
    assert_eq!(migrator.ledger().current_batch().await.unwrap(), 3);
}

#[tokio::test]
async fn test_migrate_failure_stops_batch() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "CREATE TABLE a (id INT)", "");
    write(dir.path(), "2024_01_01_000001_b", "CREATE TABLE broken", "");
    write(dir.path(), "2024_01_01_000002_c", "CREATE TABLE c (id INT)", "");
    db.fail_when_contains("broken").unwrap();

    let err = migrator.migrate().await.unwrap_err();

    match &err {
        MigrateError::ExecutionFailed { migration, .. } => {
            assert_eq!(migration, "2024_01_01_000001_b")
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_nothing_to_do());
    assert_eq!(ledger(&db), vec![("2024_01_01_000000_a".to_string(), 1)]);
    assert_eq!(db.executed().unwrap(), vec!["CREATE TABLE a (id INT)"]);

    // Fixing the statement lets the next run pick up where this one stopped
    db.clear_failure().unwrap();
    let report = migrator.migrate().await.unwrap();
    assert_eq!(report.batch, 2);
    assert_eq!(
        report.applied,
        vec![
            MigrationName::new("2024_01_01_000001_b"),
            MigrationName::new("2024_01_01_000002_c")
        ]
    );
}

#[tokio::test]
async fn test_empty_up_statement_is_recorded_without_executing() {
    let (dir, db, migrator) = setup();
    fs::write(
        dir.path().join("2024_01_01_000000_blank.sql"),
        "-- UP --\n\n-- DOWN --",
    )
    .unwrap();

    let report = migrator.migrate().await.unwrap();

    assert_eq!(report.applied.len(), 1);
    assert!(db.executed().unwrap().is_empty());
    assert_eq!(ledger(&db), vec![("2024_01_01_000000_blank".to_string(), 1)]);
}

#[tokio::test]
async fn test_file_without_markers_is_treated_as_empty() {
    let (dir, db, migrator) = setup();
    fs::write(
        dir.path().join("2024_01_01_000000_raw.sql"),
        "CREATE TABLE raw (id INT);",
    )
    .unwrap();

    migrator.migrate().await.unwrap();

    assert!(db.executed().unwrap().is_empty());
    assert_eq!(ledger(&db).len(), 1);
    let status = migrator.status().await.unwrap();
    assert!(!status[0].well_formed);
}

#[tokio::test]
async fn test_rollback_empty_ledger_is_noop() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "SELECT 1", "SELECT 2");

    let report = migrator.rollback().await.unwrap();

    assert_eq!(report, RollbackReport::default());
    assert!(report.is_empty());
    assert!(db.executed().unwrap().is_empty());
}

#[tokio::test]
async fn test_rollback_removes_only_latest_batch() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "UP a", "DOWN a");
    write(dir.path(), "2024_01_01_000001_b", "UP b", "DOWN b");
    migrator.migrate().await.unwrap();
    write(dir.path(), "2024_01_02_000000_c", "UP c", "DOWN c");
    write(dir.path(), "2024_01_02_000001_d", "UP d", "DOWN d");
    migrator.migrate().await.unwrap();

    let report = migrator.rollback().await.unwrap();

    assert_eq!(report.batch, Some(2));
    assert_eq!(
        report.rolled_back,
        vec![
            MigrationName::new("2024_01_02_000001_d"),
            MigrationName::new("2024_01_02_000000_c")
        ]
    );
    let executed = db.executed().unwrap();
    assert_eq!(&executed[executed.len() - 2..], ["DOWN d", "DOWN c"]);
    assert_eq!(
        ledger(&db),
        vec![
            ("2024_01_01_000000_a".to_string(), 1),
            ("2024_01_01_000001_b".to_string(), 1)
        ]
    );
}

#[tokio::test]
async fn test_repeated_rollback_walks_batches_backward() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "UP a", "DOWN a");
    migrator.migrate().await.unwrap();
    write(dir.path(), "2024_01_02_000000_b", "UP b", "DOWN b");
    migrator.migrate().await.unwrap();

    assert_eq!(migrator.rollback().await.unwrap().batch, Some(2));
    assert_eq!(migrator.rollback().await.unwrap().batch, Some(1));
    assert_eq!(migrator.rollback().await.unwrap().batch, None);
    assert!(ledger(&db).is_empty());
}

#[tokio::test]
async fn test_rollback_failure_stops() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "UP a", "DOWN a");
    write(dir.path(), "2024_01_01_000001_b", "UP b", "DOWN broken b");
    write(dir.path(), "2024_01_01_000002_c", "UP c", "DOWN c");
    migrator.migrate().await.unwrap();
    db.fail_when_contains("broken").unwrap();

    let err = migrator.rollback().await.unwrap_err();

    assert!(matches!(err, MigrateError::ExecutionFailed { .. }));
    // c was reverted before b failed; a was never attempted
    assert_eq!(
        ledger(&db),
        vec![
            ("2024_01_01_000000_a".to_string(), 1),
            ("2024_01_01_000001_b".to_string(), 1)
        ]
    );
}

#[tokio::test]
async fn test_rollback_skips_entries_without_files() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "UP a", "DOWN a");
    write(dir.path(), "2024_01_01_000001_b", "UP b", "DOWN b");
    migrator.migrate().await.unwrap();
    fs::remove_file(dir.path().join("2024_01_01_000001_b.sql")).unwrap();

    let report = migrator.rollback().await.unwrap();

    assert_eq!(
        report.rolled_back,
        vec![MigrationName::new("2024_01_01_000000_a")]
    );
    assert_eq!(
        report.skipped,
        vec![MigrationName::new("2024_01_01_000001_b")]
    );
    assert_eq!(ledger(&db), vec![("2024_01_01_000001_b".to_string(), 1)]);
}

#[tokio::test]
async fn test_rollback_batch_without_files_reports_skipped() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "UP a", "DOWN a");
    migrator.migrate().await.unwrap();
    write(dir.path(), "2024_01_02_000000_b", "UP b", "DOWN b");
    migrator.migrate().await.unwrap();
    fs::remove_file(dir.path().join("2024_01_02_000000_b.sql")).unwrap();

    let report = migrator.rollback().await.unwrap();
    assert_eq!(report.batch, Some(2));
    assert!(report.is_empty());
    assert_eq!(report.skipped, vec![MigrationName::new("2024_01_02_000000_b")]);

    // The orphan keeps batch 2 current until its row is removed
    let again = migrator.rollback().await.unwrap();
    assert_eq!(again.batch, Some(2));

    migrator
        .ledger()
        .remove(&MigrationName::new("2024_01_02_000000_b"))
        .await
        .unwrap();
    let report = migrator.rollback().await.unwrap();
    assert_eq!(report.batch, Some(1));
    assert_eq!(report.rolled_back, vec![MigrationName::new("2024_01_01_000000_a")]);
    assert!(ledger(&db).is_empty());
}

#[tokio::test]
async fn test_ledger_read_failure_is_fatal() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "UP a", "DOWN a");
    db.ensure_ledger_table(LEDGER).await.unwrap();
    db.set_ledger_unavailable(true).unwrap();

    assert!(matches!(
        migrator.migrate().await.unwrap_err(),
        MigrateError::Ledger(_)
    ));
    assert!(matches!(
        migrator.rollback().await.unwrap_err(),
        MigrateError::Ledger(_)
    ));
    assert!(db.executed().unwrap().is_empty());
}

#[tokio::test]
async fn test_fresh_wipes_and_reapplies_as_batch_one() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "UP a", "DOWN a");
    migrator.migrate().await.unwrap();
    write(dir.path(), "2024_01_02_000000_b", "UP b", "DOWN b");
    migrator.migrate().await.unwrap();

    let report = migrator.fresh().await.unwrap();

    assert_eq!(db.wipe_count().unwrap(), 1);
    assert_eq!(report.batch, 1);
    assert_eq!(
        ledger(&db),
        vec![
            ("2024_01_01_000000_a".to_string(), 1),
            ("2024_01_02_000000_b".to_string(), 1)
        ]
    );
}

#[tokio::test]
async fn test_create_migration_sorts_after_existing() {
    let (dir, db, migrator) = setup();
    write(dir.path(), "2024_01_01_000000_a", "UP a", "DOWN a");
    write(dir.path(), "2024_01_01_000001_b", "UP b", "DOWN b");
    migrator.migrate().await.unwrap();

    let path = migrator.create_migration("c").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "-- UP --\n\n-- DOWN --");
    let c_name = path.file_stem().unwrap().to_string_lossy().to_string();

    let report = migrator.migrate().await.unwrap();
    assert_eq!(report.batch, 2);
    assert_eq!(report.applied, vec![MigrationName::new(c_name.clone())]);

    let rollback = migrator.rollback().await.unwrap();
    assert_eq!(rollback.rolled_back, vec![MigrationName::new(c_name)]);
    assert_eq!(
        ledger(&db),
        vec![
            ("2024_01_01_000000_a".to_string(), 1),
            ("2024_01_01_000001_b".to_string(), 1)
        ]
    );
}

#[tokio::test]
async fn test_create_migration_rejects_bad_name() {
    let (_dir, _db, migrator) = setup();
    let err = migrator.create_migration("../up").unwrap_err();
    assert!(matches!(err, MigrateError::Core(_)));
}

#[tokio::test]
async fn test_status() {
    let (dir, db, migrator) = setup();

    // No ledger table yet: everything pending, nothing created
    write(dir.path(), "2024_01_01_000000_a", "UP a", "DOWN a");
    let status = migrator.status().await.unwrap();
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].state, MigrationState::Pending);
    assert!(!db.relation_exists(LEDGER).await.unwrap());

    migrator.migrate().await.unwrap();
    write(dir.path(), "2024_01_02_000000_b", "UP b", "DOWN b");
    db.insert_ledger_row(LEDGER, "2023_06_01_000000_gone", 1)
        .await
        .unwrap();

    let status = migrator.status().await.unwrap();
    let view: Vec<(&str, MigrationState)> =
        status.iter().map(|s| (s.name.as_str(), s.state)).collect();
    assert_eq!(
        view,
        vec![
            ("2024_01_01_000000_a", MigrationState::Applied { batch: 1 }),
            ("2024_01_02_000000_b", MigrationState::Pending),
            ("2023_06_01_000000_gone", MigrationState::Missing { batch: 1 }),
        ]
    );
    assert!(status.iter().all(|s| s.well_formed));
}

#[tokio::test]
async fn test_custom_ledger_table() {
    let (dir, db, migrator) = setup();
    let migrator = migrator.with_ledger_table("schema_history");
    write(dir.path(), "2024_01_01_000000_a", "UP a", "DOWN a");

    migrator.migrate().await.unwrap();

    assert_eq!(db.ledger("schema_history").unwrap().len(), 1);
    assert!(db.ledger(LEDGER).unwrap().is_empty());
}

#[tokio::test]
async fn test_transactional_failure_leaves_ledger_clean() {
    let (dir, db, migrator) = setup();
    let migrator = migrator.with_transactional(true);
    write(dir.path(), "2024_01_01_000000_a", "UP a", "DOWN a");
    write(dir.path(), "2024_01_01_000001_b", "UP broken", "DOWN b");
    db.fail_when_contains("broken").unwrap();

    let err = migrator.migrate().await.unwrap_err();

    assert!(matches!(err, MigrateError::ExecutionFailed { .. }));
    assert_eq!(ledger(&db), vec![("2024_01_01_000000_a".to_string(), 1)]);
}

#[tokio::test]
async fn test_from_config() {
    let dir = tempdir().unwrap();
    let config = Config {
        migrations_path: "db/migrations".to_string(),
        ledger_table: "history".to_string(),
        transactional: true,
        ..Default::default()
    };

    let migrator = Migrator::from_config(&config, dir.path(), Arc::new(MemoryBackend::new()));

    assert_eq!(
        migrator.directory().path(),
        dir.path().join("db/migrations").as_path()
    );
    assert_eq!(migrator.ledger().table(), "history");
}

#[tokio::test]
async fn test_duckdb_round_trip() {
    let dir = tempdir().unwrap();
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let migrator = Migrator::new(MigrationDirectory::new(dir.path()), db.clone());
    write(
        dir.path(),
        "2024_01_01_000000_create_t",
        "CREATE TABLE t (id INT)",
        "DROP TABLE t",
    );

    migrator.migrate().await.unwrap();
    assert!(db.relation_exists("t").await.unwrap());

    migrator.rollback().await.unwrap();
    assert!(!db.relation_exists("t").await.unwrap());
    assert_eq!(migrator.ledger().current_batch().await.unwrap(), 0);
}

#[tokio::test]
async fn test_duckdb_transactional_rolls_back_statement() {
    let dir = tempdir().unwrap();
    let db = Arc::new(DuckDbBackend::in_memory().unwrap());
    let migrator =
        Migrator::new(MigrationDirectory::new(dir.path()), db.clone()).with_transactional(true);
    write(
        dir.path(),
        "2024_01_01_000000_half",
        "CREATE TABLE half (id INT);\nINSERT INTO nowhere VALUES (1);",
        "DROP TABLE half",
    );

    assert!(migrator.migrate().await.is_err());
    assert!(!db.relation_exists("half").await.unwrap());
    assert!(migrator.ledger().entries().await.unwrap().is_empty());
}
