//! Gateway over a file-backed SQLite database: interleaved reads and writes,
//! join invalidation and persistence across reopen.

use std::sync::Arc;
use std::time::Duration;

use offshore_cache::QueryCache;
use offshore_models::{AnalysisWithManager, Country, Manager, Table};
use offshore_store::{Gateway, Query, SqliteBackend};
use serde_json::{json, Value};

fn open_gateway(path: &str) -> Gateway {
    let backend = SqliteBackend::open(path).unwrap();
    Gateway::new(
        Arc::new(backend),
        QueryCache::new(100, Duration::from_secs(300)),
        Duration::from_secs(300),
    )
}

async fn seed(gateway: &Gateway) -> (i64, i64) {
    let country: Country = gateway
        .insert(Table::Countries, &json!({"name": "Brasil", "flag_emoji": "🇧🇷"}))
        .await
        .unwrap();
    let manager: Manager = gateway
        .insert(Table::Managers, &json!({"name": "BlackRock"}))
        .await
        .unwrap();
    (country.id, manager.id)
}

fn macro_query(country_id: i64) -> Query {
    Query::table(Table::Analyses)
        .eq("kind", "Macro")
        .eq("country_id", country_id)
        .join(Table::Managers)
        .order_desc("publication_date")
        .order_asc("id")
}

#[tokio::test]
async fn interleaved_reads_always_see_completed_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("offshore.db");
    let gateway = open_gateway(path.to_str().unwrap());
    let (country_id, manager_id) = seed(&gateway).await;
    let query = macro_query(country_id);

    for i in 0..25 {
        let _: Value = gateway
            .insert(
                Table::Analyses,
                &json!({
                    "title": format!("Note {i}"),
                    "kind": "Macro",
                    "stance": "Neutral",
                    "publication_date": format!("2025-01-{:02}", i + 1),
                    "country_id": country_id,
                    "manager_id": manager_id,
                }),
            )
            .await
            .unwrap();

        let rows: Vec<AnalysisWithManager> = gateway.fetch(&query).await.unwrap();
        assert_eq!(rows.len(), i + 1);
        assert_eq!(rows[0].analysis.title, format!("Note {i}"));
    }
}

#[tokio::test]
async fn renaming_a_manager_refreshes_joined_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("offshore.db");
    let gateway = open_gateway(path.to_str().unwrap());
    let (country_id, manager_id) = seed(&gateway).await;

    let _: Value = gateway
        .insert(
            Table::Analyses,
            &json!({
                "title": "Brazil rates",
                "kind": "Macro",
                "publication_date": "2025-07-01",
                "country_id": country_id,
                "manager_id": manager_id,
            }),
        )
        .await
        .unwrap();

    let query = macro_query(country_id);
    let before: Vec<AnalysisWithManager> = gateway.fetch(&query).await.unwrap();
    assert_eq!(before[0].source(), "BlackRock");

    let _: Manager = gateway
        .update(Table::Managers, manager_id, &json!({"name": "BlackRock Investment Institute"}))
        .await
        .unwrap();

    let after: Vec<AnalysisWithManager> = gateway.fetch(&query).await.unwrap();
    assert_eq!(after[0].source(), "BlackRock Investment Institute");
}

#[tokio::test]
async fn rows_survive_reopening_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("offshore.db");
    let path = path.to_str().unwrap();

    {
        let gateway = open_gateway(path);
        seed(&gateway).await;
    }

    let reopened = open_gateway(path);
    let countries: Vec<Country> = reopened
        .fetch(&Query::table(Table::Countries))
        .await
        .unwrap();
    assert_eq!(countries.len(), 1);
    assert_eq!(countries[0].label(), "Brasil 🇧🇷");

    // Applying the schema again on open must not disturb existing rows.
    let managers: Vec<Manager> = reopened
        .fetch(&Query::table(Table::Managers))
        .await
        .unwrap();
    assert_eq!(managers[0].name, "BlackRock");
}
