//! PostgreSQL integration tests
//!
//! These tests require a running PostgreSQL instance. They are ignored by default.
//! To run them:
//!
//! ```sh
//! # Set environment variables (optional, defaults shown)
//! export POSTGRES_HOST=localhost
//! export POSTGRES_USER=postgres
//! export POSTGRES_PASSWORD=postgres
//! export POSTGRES_DB=catalogi_test
//!
//! # Run the ignored tests
//! cargo test --features postgres --test postgres_integration -- --ignored
//! ```

#![cfg(feature = "postgres")]

use std::env;

use catalogi::prelude::*;
use postgres::{Client, NoTls};

fn get_test_client() -> Option<Client> {
    let host = env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
    let user = env::var("POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string());
    let password = env::var("POSTGRES_PASSWORD").unwrap_or_else(|_| "postgres".to_string());
    let dbname = env::var("POSTGRES_DB").unwrap_or_else(|_| "catalogi_test".to_string());

    let config = format!(
        "host={} user={} password={} dbname={}",
        host, user, password, dbname
    );

    Client::connect(&config, NoTls).ok()
}

fn cleanup(client: &mut Client) {
    let _ = client.batch_execute(
        "DROP TABLE IF EXISTS sources, software_external_datas, instances, \
         software_referents, software_users, softwares, users, agents, \
         schema_migrations CASCADE;
         DROP TYPE IF EXISTS external_data_origin_type;",
    );
}

fn public_tables(client: &mut Client) -> Vec<String> {
    client
        .query(
            "SELECT table_name::text FROM information_schema.tables
             WHERE table_schema = 'public' AND table_name != 'schema_migrations'
             ORDER BY table_name",
            &[],
        )
        .unwrap()
        .iter()
        .map(|row| row.get(0))
        .collect()
}

fn is_nullable(client: &mut Client, table: &str, column: &str) -> bool {
    let nullable: String = client
        .query_one(
            "SELECT is_nullable::text FROM information_schema.columns
             WHERE table_name = $1 AND column_name = $2",
            &[&table, &column],
        )
        .map(|row| row.get(0))
        .unwrap();
    nullable == "YES"
}

#[test]
#[ignore = "requires postgres connection"]
fn catalog_history_applies_and_reverses() {
    let Some(mut client) = get_test_client() else {
        eprintln!("Skipping test: no postgres connection");
        return;
    };
    cleanup(&mut client);

    let registry = catalogi::catalog::registry().unwrap();
    {
        let store = PostgresStore::new(&mut client).unwrap();
        let applied = Migrator::new(&registry, &Postgres, store)
            .apply_forward()
            .unwrap();
        assert_eq!(applied.len(), registry.len());
    }

    assert_eq!(
        public_tables(&mut client),
        vec![
            "instances",
            "software_external_datas",
            "software_referents",
            "software_users",
            "softwares",
            "sources",
            "users",
        ]
    );
    assert!(is_nullable(&mut client, "software_users", "version"));

    let seeded: i64 = client
        .query_one("SELECT COUNT(*) FROM sources", &[])
        .map(|row| row.get(0))
        .unwrap();
    assert_eq!(seeded, 1);

    {
        let store = PostgresStore::new(&mut client).unwrap();
        let reversed = Migrator::new(&registry, &Postgres, store)
            .apply_reverse(None)
            .unwrap();
        assert_eq!(reversed.len(), registry.len());
    }

    assert!(public_tables(&mut client).is_empty());
    cleanup(&mut client);
}

#[test]
#[ignore = "requires postgres connection"]
fn forward_is_idempotent() {
    let Some(mut client) = get_test_client() else {
        return;
    };
    cleanup(&mut client);

    let registry = catalogi::catalog::registry().unwrap();
    for expected in [registry.len(), 0] {
        let store = PostgresStore::new(&mut client).unwrap();
        let applied = Migrator::new(&registry, &Postgres, store)
            .apply_forward()
            .unwrap();
        assert_eq!(applied.len(), expected);
    }

    cleanup(&mut client);
}

#[test]
#[ignore = "requires postgres connection"]
fn failing_record_rolls_back_its_ddl() {
    let Some(mut client) = get_test_client() else {
        return;
    };
    cleanup(&mut client);

    let mut registry = MigrationRegistry::new();
    registry
        .register(
            Migration::new("0001_agents").operation(
                CreateTable::new("agents")
                    .add_column(Column::new("id", ColumnType::Serial).primary_key()),
            ),
        )
        .unwrap();
    registry
        .register(
            Migration::new("0002_broken")
                .operation(CreateTable::new("softwares").column("id", ColumnType::Integer))
                .operation(RunSql::new("SELECT * FROM missing_table")),
        )
        .unwrap();

    {
        let store = PostgresStore::new(&mut client).unwrap();
        let err = Migrator::new(&registry, &Postgres, store)
            .apply_forward()
            .unwrap_err();
        assert_eq!(err.failed_identifier(), Some("0002_broken"));
    }

    assert_eq!(public_tables(&mut client), vec!["agents"]);

    let mut store = PostgresStore::new(&mut client).unwrap();
    let entries = store.entries().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].identifier, "0001_agents");

    cleanup(&mut client);
}
