//! Bitable (multi-dimensional table) and wiki endpoints.

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::error::{BookingError, Result};
use crate::lark::client::LarkClient;

/// Page size for record listings (platform maximum is 500, default 20).
const RECORD_PAGE_SIZE: u32 = 100;

/// Maximum records per batch create/delete call.
const BATCH_LIMIT: usize = 500;

/// A raw bitable row.
#[derive(Debug, Clone, Deserialize)]
pub struct TableRecord {
    pub record_id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct CreatedRecord {
    record: TableRecord,
}

#[derive(Debug, Deserialize)]
struct CreatedRecords {
    #[serde(default)]
    records: Vec<TableRecord>,
}

#[derive(Debug, Deserialize)]
struct WikiNodeData {
    node: WikiNode,
}

#[derive(Debug, Deserialize)]
struct WikiNode {
    obj_token: String,
    #[serde(default)]
    obj_type: String,
}

fn records_path(app_token: &str, table_id: &str) -> String {
    format!("/open-apis/bitable/v1/apps/{app_token}/tables/{table_id}/records")
}

impl LarkClient {
    /// Fetch every record of a table, optionally restricted to a view.
    pub async fn list_records(
        &self,
        app_token: &str,
        table_id: &str,
        view_id: Option<&str>,
    ) -> Result<Vec<TableRecord>> {
        let mut query = vec![("page_size", RECORD_PAGE_SIZE.to_string())];
        if let Some(view) = view_id {
            query.push(("view_id", view.to_owned()));
        }

        let records = self
            .get_all_pages(
                "list bitable records",
                &records_path(app_token, table_id),
                &query,
            )
            .await?;
        debug!("fetched {} records from table {table_id}", records.len());
        Ok(records)
    }

    /// Create one record.
    ///
    /// Each call sends a fresh `client_token`, so the platform treats it as a
    /// new request; duplicates are prevented by the completion-key filter.
    pub async fn create_record(
        &self,
        app_token: &str,
        table_id: &str,
        fields: Map<String, Value>,
    ) -> Result<TableRecord> {
        let client_token = uuid::Uuid::new_v4().to_string();
        let created: CreatedRecord = self
            .post(
                "create bitable record",
                &records_path(app_token, table_id),
                &[("client_token", client_token)],
                &json!({ "fields": fields }),
            )
            .await?;
        debug!(
            "created record {} in table {table_id}",
            created.record.record_id
        );
        Ok(created.record)
    }

    /// Create many records, in batches of at most 500. Returns the number created.
    pub async fn batch_create_records(
        &self,
        app_token: &str,
        table_id: &str,
        rows: Vec<Map<String, Value>>,
    ) -> Result<usize> {
        let path = format!("{}/batch_create", records_path(app_token, table_id));
        let mut created = 0;
        for chunk in rows.chunks(BATCH_LIMIT) {
            let records: Vec<Value> = chunk.iter().map(|f| json!({ "fields": f })).collect();
            let response: CreatedRecords = self
                .post(
                    "batch create bitable records",
                    &path,
                    &[("client_token", uuid::Uuid::new_v4().to_string())],
                    &json!({ "records": records }),
                )
                .await?;
            created += response.records.len();
        }
        Ok(created)
    }

    /// Delete records by id, in batches of at most 500.
    pub async fn batch_delete_records(
        &self,
        app_token: &str,
        table_id: &str,
        record_ids: &[String],
    ) -> Result<()> {
        let path = format!("{}/batch_delete", records_path(app_token, table_id));
        for chunk in record_ids.chunks(BATCH_LIMIT) {
            self.post_unit(
                "batch delete bitable records",
                &path,
                &[],
                &json!({ "records": chunk }),
            )
            .await?;
        }
        Ok(())
    }

    /// Delete every record of a table. Returns the number deleted.
    pub async fn clear_table(&self, app_token: &str, table_id: &str) -> Result<usize> {
        let ids: Vec<String> = self
            .list_records(app_token, table_id, None)
            .await?
            .into_iter()
            .map(|r| r.record_id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        self.batch_delete_records(app_token, table_id, &ids).await?;
        info!("cleared {} records from table {table_id}", ids.len());
        Ok(ids.len())
    }

    /// Resolve a wiki node token to the token of the bitable it wraps.
    pub async fn resolve_wiki_bitable(&self, node_token: &str) -> Result<String> {
        let data: WikiNodeData = self
            .get(
                "get wiki node",
                "/open-apis/wiki/v2/spaces/get_node",
                &[
                    ("token", node_token.to_owned()),
                    ("obj_type", "wiki".to_owned()),
                ],
            )
            .await?;

        if !data.node.obj_type.is_empty() && data.node.obj_type != "bitable" {
            return Err(BookingError::Config(format!(
                "wiki node {node_token} holds a {}, not a bitable",
                data.node.obj_type
            )));
        }
        Ok(data.node.obj_token)
    }
}
