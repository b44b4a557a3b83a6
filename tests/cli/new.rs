use crate::helpers::cli::CliTestHelper;
use predicates::prelude::*;

#[test]
fn test_new_writes_scaffold_for_configured_stages() {
    let helper = CliTestHelper::new();
    helper.write_config("cli:\n  allow_new: true\n  stages: [main, tenant]\n");

    helper
        .command()
        .args(["new", "Create users"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created migration:"))
        .stdout(predicate::str::contains("create-users.sql"));

    let files = helper.list_migration_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("-create-users.sql"));

    let content =
        std::fs::read_to_string(helper.project_root.join("migrations").join(&files[0])).unwrap();
    assert_eq!(
        content,
        "-- { up: main }\n\n-- { down: main }\n\n-- { up: tenant }\n\n-- { down: tenant }\n\n"
    );
}

#[test]
fn test_new_with_stage_flag_and_subdirectory() {
    let helper = CliTestHelper::new();
    helper.write_config("cli:\n  allow_new: true\n");

    helper
        .command()
        .args(["new", "tenant/add settings", "--stage", "tenant"])
        .assert()
        .success();

    let files = helper.list_migration_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].starts_with("tenant/"));
    assert!(files[0].ends_with("-add-settings.sql"));
}

#[test]
fn test_new_defaults_to_main_stage() {
    let helper = CliTestHelper::new();
    helper.write_config("cli:\n  allow_new: true\n");

    helper.command().args(["new", "init"]).assert().success();

    let files = helper.list_migration_files();
    let content =
        std::fs::read_to_string(helper.project_root.join("migrations").join(&files[0])).unwrap();
    assert_eq!(content, "-- { up: main }\n\n-- { down: main }\n\n");
}

#[test]
fn test_new_is_refused_without_allow_new() {
    let helper = CliTestHelper::new();

    helper
        .command()
        .args(["new", "create users"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cli.allow_new"));

    assert!(helper.list_migration_files().is_empty());
}

#[test]
fn test_new_rejects_path_traversal() {
    let helper = CliTestHelper::new();
    helper.write_config("cli:\n  allow_new: true\n");

    helper
        .command()
        .args(["new", "../outside"])
        .assert()
        .failure();

    assert!(helper.list_migration_files().is_empty());
}
