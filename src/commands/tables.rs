use anyhow::{Context, Result};
use dynamo_console::config::Settings;
use dynamo_console::proxy::contract::ListTablesInput;
use dynamo_console::proxy::{ClientProvider, DataClient};

/// All table names, following `LastEvaluatedTableName` pages.
pub async fn list_all(client: &dyn DataClient) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut start = None;
    loop {
        let page = client
            .list_tables(ListTablesInput {
                exclusive_start_table_name: start,
                limit: None,
            })
            .await
            .context("ListTables failed")?;
        names.extend(page.table_names);
        match page.last_evaluated_table_name {
            Some(last) => start = Some(last),
            None => break,
        }
    }
    Ok(names)
}

pub async fn execute(settings: Settings, region: Option<String>) -> Result<()> {
    let clients = super::regional_clients(&settings.dynamodb).await;
    let client = clients.client(region.as_deref());

    let names = list_all(client.as_ref()).await?;
    if names.is_empty() {
        println!("No tables.");
        return Ok(());
    }

    let mut table = super::new_table(["Table"]);
    for name in names {
        table.add_row(vec![name]);
    }
    println!("{table}");
    Ok(())
}
