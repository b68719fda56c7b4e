//! RemoteStore: graph store behind the Neo4j HTTP transactional API
//!
//! Each call posts one transaction to `{uri}/db/{database}/tx/commit`. Node
//! and relationship batches go up as a single `$rows` parameter consumed by
//! `UNWIND`, so a batch is one round-trip regardless of its size.

use crate::config::StoreConfig;
use crate::model::Properties;
use crate::store::{
    Command, EdgeMergeStats, GraphStore, MergeKey, NodeBatch, NodeMergeStats, NodeRow,
    RelationshipBatch, StoreError, StoreResult,
};
use indexmap::IndexMap;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Request body of the transactional endpoint
#[derive(Debug, Serialize)]
struct TxRequest {
    statements: Vec<Statement>,
}

#[derive(Debug, Serialize)]
struct Statement {
    statement: String,
    parameters: Value,
    #[serde(rename = "includeStats")]
    include_stats: bool,
}

impl Statement {
    fn new(statement: String, parameters: Value) -> Self {
        Self {
            statement,
            parameters,
            include_stats: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Default, Deserialize)]
struct StatementResult {
    #[serde(default)]
    data: Vec<RowData>,
    #[serde(default)]
    stats: QueryStats,
}

#[derive(Debug, Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct QueryStats {
    #[serde(default)]
    nodes_created: usize,
    #[serde(default)]
    relationships_created: usize,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl StatementResult {
    /// First column of the first row as a count
    fn count(&self) -> StoreResult<usize> {
        self.data
            .first()
            .and_then(|d| d.row.first())
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .ok_or_else(|| StoreError::UnexpectedResponse("expected a count row".to_string()))
    }
}

/// Graph store reached over HTTP
pub struct RemoteStore {
    endpoint: String,
    user: String,
    password: String,
    http_client: Client,
}

impl RemoteStore {
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: commit_endpoint(&config.uri, &config.database),
            user: config.user.clone(),
            password: config.password.clone(),
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run statements in one transaction
    fn commit(&self, statements: Vec<Statement>) -> StoreResult<Vec<StatementResult>> {
        let expected = statements.len();
        let response = self
            .http_client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .json(&TxRequest { statements })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: TxResponse = response.json()?;
        let results = into_results(body)?;
        if results.len() != expected {
            return Err(StoreError::UnexpectedResponse(format!(
                "sent {} statements, got {} results",
                expected,
                results.len()
            )));
        }
        Ok(results)
    }
}

impl GraphStore for RemoteStore {
    fn merge_nodes(&mut self, batch: &NodeBatch) -> StoreResult<NodeMergeStats> {
        let statements = node_statements(batch);
        debug!(
            "Merging {} {} nodes in {} statements",
            batch.rows.len(),
            batch.merge_key.label,
            statements.len()
        );
        let results = self.commit(statements)?;
        let created: usize = results.iter().map(|r| r.stats.nodes_created).sum();
        Ok(NodeMergeStats {
            created,
            matched: batch.rows.len().saturating_sub(created),
        })
    }

    fn merge_relationships(&mut self, batch: &RelationshipBatch) -> StoreResult<EdgeMergeStats> {
        let results = self.commit(vec![relationship_statement(batch)])?;
        let result = &results[0];
        let resolved = result.count()?;
        let created = result.stats.relationships_created;
        Ok(EdgeMergeStats {
            created,
            existing: resolved.saturating_sub(created),
            unresolved: batch.rows.len().saturating_sub(resolved),
        })
    }

    fn execute(&mut self, command: &Command) -> StoreResult<usize> {
        let results = self.commit(vec![command_statement(command)])?;
        match command {
            Command::CreateFulltextIndex { .. } => Ok(0),
            Command::SetProperties { .. } => results[0].count(),
        }
    }
}

fn commit_endpoint(uri: &str, database: &str) -> String {
    format!("{}/db/{}/tx/commit", uri.trim_end_matches('/'), database)
}

fn into_results(body: TxResponse) -> StoreResult<Vec<StatementResult>> {
    if let Some(err) = body.errors.into_iter().next() {
        return Err(StoreError::Database {
            code: err.code,
            message: err.message,
        });
    }
    Ok(body.results)
}

/// Quote a label, relationship type or property name
fn quote(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

fn merge_pattern(var: &str, key: &MergeKey, param: &str) -> String {
    format!(
        "({}:{} {{{}: {}}})",
        var,
        quote(&key.label),
        quote(&key.property),
        param
    )
}

/// One statement per distinct set of extra labels; labels cannot be
/// parameterized
fn node_statements(batch: &NodeBatch) -> Vec<Statement> {
    let mut groups: IndexMap<Vec<String>, Vec<&NodeRow>> = IndexMap::new();
    for row in &batch.rows {
        groups.entry(row.labels.clone()).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(labels, rows)| {
            let mut cypher = format!(
                "UNWIND $rows AS row MERGE {} SET n += row.props",
                merge_pattern("n", &batch.merge_key, "row.key")
            );
            for label in &labels {
                cypher.push_str(&format!(" SET n:{}", quote(label)));
            }
            let rows: Vec<Value> = rows
                .iter()
                .map(|row| json!({ "key": row.key, "props": row.properties }))
                .collect();
            Statement::new(cypher, json!({ "rows": rows }))
        })
        .collect()
}

fn relationship_statement(batch: &RelationshipBatch) -> Statement {
    let cypher = format!(
        "UNWIND $rows AS row MATCH {} MATCH {} MERGE (a)-[r:{}]->(b) RETURN count(r)",
        merge_pattern("a", &batch.start, "row.start"),
        merge_pattern("b", &batch.end, "row.end"),
        quote(&batch.rel_type)
    );
    Statement::new(cypher, json!({ "rows": batch.rows }))
}

fn command_statement(command: &Command) -> Statement {
    match command {
        Command::CreateFulltextIndex {
            name,
            labels,
            properties,
        } => Statement::new(
            "CALL db.index.fulltext.createNodeIndex($name, $labels, $properties)".to_string(),
            json!({ "name": name, "labels": labels, "properties": properties }),
        ),
        Command::SetProperties { key, rows } => {
            let cypher = format!(
                "UNWIND $rows AS row MATCH {} SET n += row.props RETURN count(n)",
                merge_pattern("n", key, "row.key")
            );
            let rows: Vec<Value> = rows
                .iter()
                .map(|(value, props): &(String, Properties)| {
                    json!({ "key": value, "props": props })
                })
                .collect();
            Statement::new(cypher, json!({ "rows": rows }))
        }
    }
}
