use anyhow::{Context, Result};
use chrono::DateTime;
use dynamo_console::config::Settings;
use dynamo_console::projector::{project, Grid, KeySchema};
use dynamo_console::proxy::contract::{ScanInput, TableDescription, TableNameInput};
use dynamo_console::proxy::{ClientProvider, DataClient};
use dynamo_console::record::Record;
use tracing::info;

/// Describe, scan and project one page of `table`.
pub async fn scan_grid(
    client: &dyn DataClient,
    table: &str,
    limit: i32,
) -> Result<(TableDescription, Grid)> {
    let description = client
        .describe_table(TableNameInput {
            table_name: table.to_string(),
        })
        .await
        .with_context(|| format!("DescribeTable {table} failed"))?
        .table
        .unwrap_or_default();

    let schema = KeySchema::from_elements(description.key_elements());

    let page = client
        .scan(ScanInput {
            table_name: table.to_string(),
            limit: Some(limit),
            ..Default::default()
        })
        .await
        .with_context(|| format!("Scan {table} failed"))?;

    info!(table, count = page.count, scanned = page.scanned_count, "Scanned table");

    let records: Vec<Record> = page.items.iter().map(Record::from_item).collect();
    Ok((description, project(&schema, &records)))
}

fn summary(table: &str, description: &TableDescription, rows: usize) -> String {
    let status = description.table_status.as_deref().unwrap_or("UNKNOWN");
    let created = description
        .creation_date_time
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
        .map(|at| format!(", created {}", at.format("%Y-%m-%d %H:%M:%S UTC")))
        .unwrap_or_default();
    format!("{table} ({status}{created}), {rows} rows")
}

pub async fn execute(
    settings: Settings,
    table: String,
    limit: i32,
    region: Option<String>,
    json: bool,
) -> Result<()> {
    let clients = super::regional_clients(&settings.dynamodb).await;
    let client = clients.client(region.as_deref());

    let (description, grid) = scan_grid(client.as_ref(), &table, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&grid)?);
        return Ok(());
    }

    println!("{}", summary(&table, &description, grid.rows().len()));
    let headers = grid
        .columns()
        .iter()
        .map(|c| c.clone().unwrap_or_default());
    let mut out = super::new_table(headers);
    for row in grid.rows() {
        out.add_row(row.iter().map(ToString::to_string).collect::<Vec<_>>());
    }
    println!("{out}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let description = TableDescription {
            table_status: Some("ACTIVE".into()),
            creation_date_time: Some(0.0),
            ..Default::default()
        };

        assert_eq!(
            summary("events", &description, 3),
            "events (ACTIVE, created 1970-01-01 00:00:00 UTC), 3 rows"
        );
        assert_eq!(
            summary("events", &TableDescription::default(), 0),
            "events (UNKNOWN), 0 rows"
        );
    }
}
