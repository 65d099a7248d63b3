pub mod profiles;
pub mod scan;
pub mod serve;
pub mod tables;

use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use dynamo_console::config::DynamoSettings;
use dynamo_console::proxy::RegionalClients;
use tracing::debug;

/// Builds the per-region client cache from the `dynamodb` settings.
pub async fn regional_clients(dynamo: &DynamoSettings) -> RegionalClients {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(dynamo.region.clone()));

    if let Some((id, secret)) = dynamo.static_credentials() {
        debug!("Using static credentials from configuration");
        loader = loader.credentials_provider(Credentials::new(
            id,
            secret,
            None,
            None,
            "dynamo-console",
        ));
    }

    let base = loader.load().await;
    RegionalClients::new(base, dynamo.region.clone(), dynamo.endpoint_url.clone())
        .with_allowed_regions(dynamo.allowed_regions.iter().cloned())
}

pub fn new_table<I, S>(headers: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .into_iter()
                .map(|h| Cell::new(h.as_ref()).fg(Color::Cyan).add_attribute(Attribute::Bold))
                .collect::<Vec<_>>(),
        );
    table
}
