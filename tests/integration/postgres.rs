use crate::helpers::harness::PgTestInstance;
use crate::helpers::project::{TestProject, staged};
use sqlstage::{MigrationOptions, Migrator, db::open_source};

/// Full up/refresh/down cycle against a real server. Skipped unless
/// DATABASE_URL points at PostgreSQL.
#[tokio::test]
async fn test_postgres_round_trip() {
    let Some(pg) = PgTestInstance::from_env() else {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL round trip");
        return;
    };
    let db = pg.create_test_database().await;

    let project = TestProject::new();
    project.migration(
        10,
        "create users",
        &staged(&[
            (
                "main",
                "CREATE TABLE users (id SERIAL PRIMARY KEY, name TEXT NOT NULL);\nCREATE INDEX users_name ON users (name);",
                "DROP TABLE users;",
            ),
            ("tenant", "CREATE SCHEMA tenant_a;", "DROP SCHEMA tenant_a;"),
        ]),
    );
    project.migration(
        20,
        "seed users",
        &staged(&[("main", "INSERT INTO users (name) VALUES ('ada');", "DELETE FROM users;")]),
    );

    let source = open_source(&db.url).await.expect("connect");
    let migrator = Migrator::builder(source)
        .root(&project.root)
        .ledger_table("schema_ledger")
        .build()
        .await
        .expect("build migrator");
    migrator.initialize().await.expect("initialize");
    // Second call finds the table in place
    migrator.initialize().await.expect("initialize again");

    let options = MigrationOptions::default();
    let up = migrator.up(&["main", "tenant"], &options).await.expect("up");
    assert_eq!(
        up.pairs(),
        vec![
            ("main", "create users"),
            ("main", "seed users"),
            ("tenant", "create users")
        ]
    );
    assert!(migrator.up(&["main"], &options).await.expect("up again").is_empty());

    let summary = migrator.summary().await.expect("summary");
    assert_eq!(summary.len(), 3);
    assert!(summary.iter().all(|row| row.created_at.is_some()));
    // Rows written by one call keep their write order
    assert_eq!(
        summary.for_stage("main").names(),
        vec!["create users", "seed users"]
    );
    assert_eq!(
        summary
            .group_by_stage()
            .iter()
            .map(|(stage, _)| *stage)
            .collect::<Vec<_>>(),
        vec!["main", "tenant"]
    );

    let refresh = migrator.refresh(&["main"], &options).await.expect("refresh");
    assert_eq!(refresh.len(), 4);

    migrator.down(&["main", "tenant"], &options).await.expect("down");
    assert!(migrator.summary().await.expect("summary").is_empty());

    db.cleanup().await;
}
