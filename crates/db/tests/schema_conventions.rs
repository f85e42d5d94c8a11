//! Schema convention checks for the migration-engine tables.

use sqlx::PgPool;

/// Entity tables key by bigint, lookup tables by smallint; nothing else.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_pk_types(pool: PgPool) {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, data_type FROM information_schema.columns \
         WHERE column_name = 'id' AND table_schema = 'public' \
           AND table_name != '_sqlx_migrations' \
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert!(!rows.is_empty());
    for (table, data_type) in &rows {
        let expected = if table == "migration_session_statuses" {
            "smallint"
        } else {
            "bigint"
        };
        assert_eq!(data_type, expected, "unexpected id type on {table}");
    }
}

/// Every table carries timestamptz created_at/updated_at, and no column
/// anywhere is VARCHAR (TEXT is the house type).
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_column_conventions(pool: PgPool) {
    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
           AND table_name != '_sqlx_migrations' \
         ORDER BY table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for (table,) in &tables {
        for col in ["created_at", "updated_at"] {
            let found: Option<(String,)> = sqlx::query_as(
                "SELECT data_type FROM information_schema.columns \
                 WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2",
            )
            .bind(table)
            .bind(col)
            .fetch_optional(&pool)
            .await
            .unwrap();
            let (data_type,) = found.unwrap_or_else(|| panic!("{table} is missing {col}"));
            assert_eq!(data_type, "timestamp with time zone", "{table}.{col}");
        }
    }

    let varchars: Vec<(String, String)> = sqlx::query_as(
        "SELECT table_name, column_name FROM information_schema.columns \
         WHERE table_schema = 'public' AND data_type = 'character varying' \
           AND table_name != '_sqlx_migrations'",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert!(varchars.is_empty(), "VARCHAR columns found: {varchars:?}");
}

/// Every FK column is indexed (the per-session cascade deletes depend
/// on it) and every constraint spells out its ON DELETE/ON UPDATE rule.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_fk_conventions(pool: PgPool) {
    let fk_columns: Vec<(String, String)> = sqlx::query_as(
        "SELECT DISTINCT tc.table_name, kcu.column_name \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
             ON tc.constraint_name = kcu.constraint_name \
             AND tc.table_schema = kcu.table_schema \
         WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = 'public' \
         ORDER BY tc.table_name, kcu.column_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();
    assert!(!fk_columns.is_empty());

    for (table, column) in &fk_columns {
        let has_index: (bool,) = sqlx::query_as(
            "SELECT EXISTS ( \
                SELECT 1 FROM pg_indexes \
                WHERE schemaname = 'public' AND tablename = $1 \
                  AND indexdef LIKE '%(' || $2 || ')%')",
        )
        .bind(table)
        .bind(column)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(has_index.0, "FK column {table}.{column} has no index");
    }

    let rules: Vec<(String, String, String)> = sqlx::query_as(
        "SELECT tc.table_name, rc.delete_rule, rc.update_rule \
         FROM information_schema.referential_constraints rc \
         JOIN information_schema.table_constraints tc \
             ON rc.constraint_name = tc.constraint_name \
             AND rc.constraint_schema = tc.table_schema \
         WHERE rc.constraint_schema = 'public' \
         ORDER BY tc.table_name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for (table, delete_rule, update_rule) in &rules {
        if table == "migration_sessions" {
            // The status FK must not cascade a lookup-row delete into
            // session deletes.
            assert_eq!(delete_rule, "RESTRICT", "{table} delete rule");
        } else {
            // Child rows disappear with their session.
            assert_eq!(delete_rule, "CASCADE", "{table} delete rule");
        }
        assert_eq!(update_rule, "CASCADE", "{table} update rule");
    }
}
