//! End-to-end tests for the parse → diff → plan pipeline.
//!
//! Each scenario parses a "current" and a "desired" schema document, runs
//! the full pipeline, and verifies the exact statements that come out. A
//! final set of tests checks the cross-cutting contracts: plan idempotence,
//! ignore filtering, and drop-before-add ordering.

use schemasync_core::prelude::*;

fn plan_for(current_sql: &str, desired_sql: &str, options: &DiffOptions) -> Plan {
    let current = parse_schema(current_sql).expect("current schema parses");
    let desired = parse_schema(desired_sql).expect("desired schema parses");
    synchronize(&current, &desired, options)
}

#[test]
fn scenario_no_op() {
    let sql = "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(64) NOT NULL);";
    let plan = plan_for(sql, sql, &DiffOptions::new());
    assert!(plan.is_empty());
}

#[test]
fn scenario_no_op_across_formatting_differences() {
    let current = "CREATE TABLE `users` (\n  `id` int(11) NOT NULL,\n  `name` varchar(64) NOT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB;";
    let desired = "-- target schema\nSET NAMES utf8mb4;\ncreate table users (id INT not null, name varchar(64) NOT NULL, primary key (id)) engine=InnoDB;";
    let plan = plan_for(current, desired, &DiffOptions::new());
    assert!(plan.is_empty());
}

#[test]
fn scenario_add_table() {
    let plan = plan_for(
        "",
        "CREATE TABLE t (id INT NOT NULL AUTO_INCREMENT, PRIMARY KEY(id)) ENGINE=InnoDB;",
        &DiffOptions::new(),
    );
    assert_eq!(
        plan.statements,
        vec![
            "CREATE TABLE `t` (\n  `id` int(11) NOT NULL AUTO_INCREMENT,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB;"
        ]
    );
}

#[test]
fn scenario_add_column() {
    let current = "CREATE TABLE users (id INT NOT NULL, PRIMARY KEY (id));";
    let desired = "CREATE TABLE users (
        id INT NOT NULL,
        email VARCHAR(255) NOT NULL DEFAULT '',
        PRIMARY KEY (id)
    );";
    let plan = plan_for(current, desired, &DiffOptions::new());
    assert_eq!(
        plan.statements,
        vec!["ALTER TABLE `users` ADD COLUMN `email` varchar(255) NOT NULL DEFAULT '';"]
    );
}

#[test]
fn scenario_index_retype() {
    let current = "CREATE TABLE users (
        id INT NOT NULL,
        email VARCHAR(255) NOT NULL,
        PRIMARY KEY (id),
        KEY email (email)
    );";
    let desired = "CREATE TABLE users (
        id INT NOT NULL,
        email VARCHAR(255) NOT NULL,
        PRIMARY KEY (id),
        UNIQUE KEY email (email)
    );";
    let plan = plan_for(current, desired, &DiffOptions::new());
    assert_eq!(
        plan.statements,
        vec![
            "ALTER TABLE `users` DROP INDEX `email`;",
            "ALTER TABLE `users` ADD UNIQUE KEY `email` (`email`);",
        ]
    );
}

#[test]
fn scenario_foreign_key_action_change() {
    let current = "CREATE TABLE posts (
        id INT NOT NULL,
        user_id INT NOT NULL,
        PRIMARY KEY (id),
        CONSTRAINT fk_a FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE RESTRICT
    );";
    let desired = "CREATE TABLE posts (
        id INT NOT NULL,
        user_id INT NOT NULL,
        PRIMARY KEY (id),
        CONSTRAINT fk_a FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
    );";
    let plan = plan_for(current, desired, &DiffOptions::new());
    assert_eq!(
        plan.statements,
        vec![
            "ALTER TABLE `posts` DROP FOREIGN KEY `fk_a`;",
            "ALTER TABLE `posts` ADD CONSTRAINT `fk_a` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE;",
        ]
    );
}

#[test]
fn scenario_decimal_default() {
    let plan = plan_for(
        "",
        "CREATE TABLE ledger (amount DECIMAL(20,8) NOT NULL DEFAULT 0);",
        &DiffOptions::new(),
    );
    assert_eq!(plan.len(), 1);
    let statement = &plan.statements[0];
    assert!(statement.contains("`amount` decimal(20,8) NOT NULL DEFAULT 0"));
    assert!(!statement.contains("DEFAULT '0'"));
}

#[test]
fn plan_is_idempotent_once_applied() {
    // Applying the plan is simulated by handing the differ the desired
    // schema as the new current: the follow-up plan must be empty.
    let current = "CREATE TABLE users (id INT NOT NULL, PRIMARY KEY (id));";
    let desired = "CREATE TABLE users (
        id INT NOT NULL,
        email VARCHAR(255) NOT NULL DEFAULT '',
        PRIMARY KEY (id),
        UNIQUE KEY uq_email (email)
    );
    CREATE TABLE orgs (id INT NOT NULL, PRIMARY KEY (id));";

    let first = plan_for(current, desired, &DiffOptions::new());
    assert!(!first.is_empty());

    let second = plan_for(desired, desired, &DiffOptions::new());
    assert!(second.is_empty());
}

#[test]
fn ignored_column_never_referenced() {
    let current = "CREATE TABLE users (id INT NOT NULL, legacy TEXT, PRIMARY KEY (id));";
    let desired = "CREATE TABLE users (
        id INT NOT NULL,
        legacy VARCHAR(16) NOT NULL,
        email VARCHAR(255) NOT NULL,
        PRIMARY KEY (id)
    );
    CREATE TABLE audit (id INT NOT NULL, legacy TEXT, PRIMARY KEY (id));";

    let options = DiffOptions::new().ignore_column("legacy").with_drop_columns();
    let plan = plan_for(current, desired, &options);

    assert!(!plan.is_empty());
    for statement in plan.iter() {
        assert!(
            !statement.contains("legacy"),
            "plan references ignored column: {statement}"
        );
    }
}

#[test]
fn ignored_table_contributes_nothing() {
    let current = "CREATE TABLE users (id INT NOT NULL, PRIMARY KEY (id));";
    let desired = "CREATE TABLE users (id INT NOT NULL, extra INT, PRIMARY KEY (id));
                   CREATE TABLE cache (k VARCHAR(64) NOT NULL, PRIMARY KEY (k));";

    let options = DiffOptions::new().ignore_table("users").ignore_table("cache");
    let plan = plan_for(current, desired, &options);
    assert!(plan.is_empty());
}

#[test]
fn drops_precede_adds_within_every_alter() {
    let current = "CREATE TABLE t (
        a INT NOT NULL,
        b INT NOT NULL,
        PRIMARY KEY (a),
        KEY idx_b (b),
        CONSTRAINT fk_b FOREIGN KEY (b) REFERENCES other (id)
    );";
    let desired = "CREATE TABLE t (
        a INT NOT NULL,
        b INT NOT NULL,
        PRIMARY KEY (a, b),
        UNIQUE KEY idx_b (b),
        CONSTRAINT fk_b FOREIGN KEY (b) REFERENCES other (id) ON DELETE CASCADE
    );";

    let plan = plan_for(current, desired, &DiffOptions::new());
    let position = |needle: &str| {
        plan.iter()
            .position(|s| s.contains(needle))
            .unwrap_or_else(|| panic!("missing statement containing {needle}"))
    };

    assert!(position("DROP FOREIGN KEY `fk_b`") < position("ADD CONSTRAINT `fk_b`"));
    assert!(position("DROP INDEX `idx_b`") < position("ADD UNIQUE KEY `idx_b`"));
    assert!(position("DROP PRIMARY KEY") < position("ADD PRIMARY KEY"));
    assert!(position("DROP FOREIGN KEY `fk_b`") < position("DROP PRIMARY KEY"));
}

#[test]
fn primary_key_change_round_trips() {
    let current = "CREATE TABLE t (a INT NOT NULL, b INT NOT NULL, PRIMARY KEY (a));";
    let desired = "CREATE TABLE t (a INT NOT NULL, b INT NOT NULL, PRIMARY KEY (a, b));";

    let plan = plan_for(current, desired, &DiffOptions::new());
    assert_eq!(
        plan.statements,
        vec![
            "ALTER TABLE `t` DROP PRIMARY KEY;",
            "ALTER TABLE `t` ADD PRIMARY KEY (`a`,`b`);",
        ]
    );
}

#[test]
fn modify_column_type_and_nullability() {
    let current = "CREATE TABLE users (id INT NOT NULL, name VARCHAR(64), PRIMARY KEY (id));";
    let desired = "CREATE TABLE users (id INT NOT NULL, name VARCHAR(128) NOT NULL, PRIMARY KEY (id));";

    let plan = plan_for(current, desired, &DiffOptions::new());
    assert_eq!(
        plan.statements,
        vec!["ALTER TABLE `users` MODIFY COLUMN `name` varchar(128) NOT NULL;"]
    );
}

#[test]
fn dump_boilerplate_round_trip() {
    let dump = "
        -- MySQL dump 10.13  Distrib 5.7.44
        /*!40101 SET @saved_cs_client = @@character_set_client */;
        SET NAMES utf8mb4;
        DROP TABLE IF EXISTS `jobs`;
        CREATE TABLE `jobs` (
          `id` bigint(20) NOT NULL AUTO_INCREMENT,
          `queue` varchar(191) NOT NULL DEFAULT 'default',
          `payload` longtext NOT NULL,
          `attempts` tinyint(3) unsigned NOT NULL DEFAULT 0,
          PRIMARY KEY (`id`),
          KEY `jobs_queue_index` (`queue`)
        ) ENGINE=InnoDB AUTO_INCREMENT=88 DEFAULT CHARSET=utf8mb4;
    ";

    let schema = parse_schema(dump).expect("dump parses");
    let table = schema.get_table("jobs").expect("jobs table present");
    assert_eq!(table.columns.len(), 4);
    assert_eq!(
        table.get_column("attempts").unwrap().sql_type,
        "tinyint(3) unsigned"
    );

    // A dump is in sync with itself.
    let plan = plan_for(dump, dump, &DiffOptions::new());
    assert!(plan.is_empty());
}

#[test]
fn column_order_of_additions_follows_target() {
    let current = "CREATE TABLE t (id INT NOT NULL, PRIMARY KEY (id));";
    let desired = "CREATE TABLE t (
        id INT NOT NULL,
        zebra INT NOT NULL,
        alpha INT NOT NULL,
        PRIMARY KEY (id)
    );";

    let plan = plan_for(current, desired, &DiffOptions::new());
    assert_eq!(
        plan.statements,
        vec![
            "ALTER TABLE `t` ADD COLUMN `zebra` int(11) NOT NULL;",
            "ALTER TABLE `t` ADD COLUMN `alpha` int(11) NOT NULL;",
        ]
    );
}
