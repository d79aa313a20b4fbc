//! Replay command implementation.
//!
//! A script is a JSON array of steps, each naming one datastore operation:
//!
//! ```json
//! [
//!   {"op": "insert", "entity": {"key": {"path": [{"kind": "Item", "id": {"name": "a"}}]}}},
//!   {"op": "begin_transaction", "alias": "t1"},
//!   {"op": "put", "entity": {"key": {"path": [{"kind": "Item", "id": {"name": "b"}}]}}, "transaction": "t1"},
//!   {"op": "lookup", "keys": [{"path": [{"kind": "Item", "id": {"name": "a"}}]}], "transaction": "t1"},
//!   {"op": "commit", "transaction": "t1", "mutations": []}
//! ]
//! ```
//!
//! Transactions are referred to by script-local aliases, since their ids
//! are only known once the script runs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use stubdb_core::{
    BeginTransactionRequest, BeginTransactionResponse, CommitRequest, CommitResponse, CoreError,
    Datastore, Entity, Key, LookupRequest, LookupResponse, Mutation, Query, RollbackRequest,
    RunQueryRequest, RunQueryResponse, TransactionId, TransactionMode,
};
use thiserror::Error;
use tracing::{debug, info};

/// One scripted operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Seed a fixture entity at version 0.
    Insert {
        /// Entity to seed.
        entity: Entity,
    },
    /// Write an entity directly, or stage an upsert under a transaction.
    Put {
        /// Entity to write.
        entity: Entity,
        /// Version stored by a direct write; ignored when staging.
        #[serde(default)]
        version: i64,
        /// Transaction alias.
        #[serde(default)]
        transaction: Option<String>,
    },
    /// Remove a key directly, or stage a delete under a transaction.
    Delete {
        /// Key to remove.
        key: Key,
        /// Transaction alias.
        #[serde(default)]
        transaction: Option<String>,
    },
    /// Read keys.
    Lookup {
        /// Keys to read.
        keys: Vec<Key>,
        /// Transaction alias.
        #[serde(default)]
        transaction: Option<String>,
    },
    /// Commit a transaction and/or apply mutations.
    Commit {
        /// Transaction alias.
        #[serde(default)]
        transaction: Option<String>,
        /// Mutations applied after the staged ones.
        #[serde(default)]
        mutations: Vec<Mutation>,
    },
    /// Open a transaction and bind it to `alias`.
    BeginTransaction {
        /// Script-local name for the transaction.
        alias: String,
        /// Access mode.
        #[serde(default)]
        mode: TransactionMode,
    },
    /// Discard a transaction.
    Rollback {
        /// Transaction alias.
        transaction: String,
    },
    /// Run a query.
    RunQuery {
        /// The query.
        query: Query,
        /// Transaction alias.
        #[serde(default)]
        transaction: Option<String>,
    },
}

impl Step {
    /// Returns the operation name.
    pub fn op(&self) -> &'static str {
        match self {
            Step::Insert { .. } => "insert",
            Step::Put { .. } => "put",
            Step::Delete { .. } => "delete",
            Step::Lookup { .. } => "lookup",
            Step::Commit { .. } => "commit",
            Step::BeginTransaction { .. } => "begin_transaction",
            Step::Rollback { .. } => "rollback",
            Step::RunQuery { .. } => "run_query",
        }
    }
}

/// Response of one step.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum StepResponse {
    /// Fixture seeded.
    Inserted {},
    /// Write applied or staged.
    Written {},
    /// Lookup result.
    Lookup(LookupResponse),
    /// Commit result.
    Commit(CommitResponse),
    /// Transaction opened.
    Begin {
        /// Alias the transaction was bound to.
        alias: String,
        /// Id of the opened transaction.
        transaction: TransactionId,
    },
    /// Transaction discarded.
    RolledBack {},
    /// Query result.
    Query(RunQueryResponse),
}

impl StepResponse {
    fn summary(&self) -> String {
        match self {
            StepResponse::Inserted {} | StepResponse::Written {} => "ok".to_string(),
            StepResponse::Lookup(r) => {
                format!("found {}, missing {}", r.found.len(), r.missing.len())
            }
            StepResponse::Commit(r) => {
                let versions: Vec<String> = r
                    .mutation_results
                    .iter()
                    .map(|m| {
                        if m.conflict_detected {
                            format!("{}@{} (conflict)", m.key, m.version)
                        } else {
                            format!("{}@{}", m.key, m.version)
                        }
                    })
                    .collect();
                format!("{} result(s) [{}]", versions.len(), versions.join(", "))
            }
            StepResponse::Begin { alias, transaction } => format!("{alias} = {transaction}"),
            StepResponse::RolledBack {} => "ok".to_string(),
            StepResponse::Query(r) => {
                let keys: Vec<String> = r.batch.entities().map(|e| e.key.to_string()).collect();
                format!(
                    "{:?} x{} at seq {} [{}]",
                    r.batch.entity_result_type,
                    keys.len(),
                    r.batch.snapshot_version,
                    keys.join(", ")
                )
            }
        }
    }
}

/// Errors raised while replaying a step.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The datastore rejected the request.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The step names an alias no earlier step defined.
    #[error("unknown transaction alias: {0}")]
    UnknownAlias(String),

    /// A begin step reused an alias that is still bound.
    #[error("transaction alias already in use: {0}")]
    DuplicateAlias(String),
}

/// Replays steps against one datastore.
pub struct Replayer {
    ds: Datastore,
    aliases: HashMap<String, TransactionId>,
}

impl Replayer {
    /// Creates a replayer over a fresh datastore.
    pub fn new() -> Self {
        Self {
            ds: Datastore::new(),
            aliases: HashMap::new(),
        }
    }

    /// Returns the underlying datastore.
    pub fn datastore(&self) -> &Datastore {
        &self.ds
    }

    fn resolve(&self, alias: Option<&str>) -> Result<Option<TransactionId>, ReplayError> {
        alias
            .map(|a| {
                self.aliases
                    .get(a)
                    .copied()
                    .ok_or_else(|| ReplayError::UnknownAlias(a.to_string()))
            })
            .transpose()
    }

    /// Executes one step.
    pub fn step(&mut self, step: Step) -> Result<StepResponse, ReplayError> {
        match step {
            Step::Insert { entity } => {
                self.ds.insert_entity(entity)?;
                Ok(StepResponse::Inserted {})
            }
            Step::Put {
                entity,
                version,
                transaction,
            } => {
                let txn = self.resolve(transaction.as_deref())?;
                self.ds.put(entity, version, txn)?;
                Ok(StepResponse::Written {})
            }
            Step::Delete { key, transaction } => {
                let txn = self.resolve(transaction.as_deref())?;
                self.ds.delete(key, txn)?;
                Ok(StepResponse::Written {})
            }
            Step::Lookup { keys, transaction } => {
                let request = LookupRequest {
                    keys,
                    transaction: self.resolve(transaction.as_deref())?,
                };
                Ok(StepResponse::Lookup(self.ds.lookup(request)?))
            }
            Step::Commit {
                transaction,
                mutations,
            } => {
                let request = CommitRequest {
                    transaction: self.resolve(transaction.as_deref())?,
                    mutations,
                };
                // Commit consumes the transaction whatever the outcome.
                if let Some(alias) = &transaction {
                    self.aliases.remove(alias);
                }
                Ok(StepResponse::Commit(self.ds.commit(request)?))
            }
            Step::BeginTransaction { alias, mode } => {
                if self.aliases.contains_key(&alias) {
                    return Err(ReplayError::DuplicateAlias(alias));
                }
                let BeginTransactionResponse { transaction } = self
                    .ds
                    .begin_transaction(BeginTransactionRequest { mode })?;
                self.aliases.insert(alias.clone(), transaction);
                Ok(StepResponse::Begin { alias, transaction })
            }
            Step::Rollback { transaction } => {
                let id = self
                    .resolve(Some(transaction.as_str()))?
                    .ok_or_else(|| ReplayError::UnknownAlias(transaction.clone()))?;
                self.aliases.remove(&transaction);
                self.ds.rollback(RollbackRequest { transaction: id })?;
                Ok(StepResponse::RolledBack {})
            }
            Step::RunQuery { query, transaction } => {
                let request = RunQueryRequest {
                    query,
                    transaction: self.resolve(transaction.as_deref())?,
                };
                Ok(StepResponse::Query(self.ds.run_query(request)?))
            }
        }
    }
}

impl Default for Replayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one replayed step.
#[derive(Debug, Serialize)]
pub struct StepReport {
    /// 1-based position in the script.
    pub step: usize,
    /// Operation name.
    pub op: &'static str,
    /// Response, if the step succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<StepResponse>,
    /// Error message, if the step failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Replays `steps` in order, collecting one report per executed step.
pub fn replay(steps: Vec<Step>, stop_on_error: bool) -> Vec<StepReport> {
    let mut replayer = Replayer::new();
    let mut reports = Vec::with_capacity(steps.len());

    for (index, step) in steps.into_iter().enumerate() {
        let op = step.op();
        debug!(step = index + 1, op, "replaying step");
        let report = match replayer.step(step) {
            Ok(response) => StepReport {
                step: index + 1,
                op,
                response: Some(response),
                error: None,
            },
            Err(e) => StepReport {
                step: index + 1,
                op,
                response: None,
                error: Some(e.to_string()),
            },
        };
        let failed = report.error.is_some();
        reports.push(report);
        if failed && stop_on_error {
            break;
        }
    }

    info!(
        steps = reports.len(),
        records = replayer.datastore().len(),
        seq = replayer.datastore().sequence_id(None),
        "replay finished"
    );
    reports
}

/// Runs the replay command.
pub fn run(
    script: &Path,
    format: &str,
    stop_on_error: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(script)
        .map_err(|e| format!("Failed to read script {}: {e}", script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&text)?;
    info!("Replaying {} step(s) from {:?}", steps.len(), script);

    let reports = replay(steps, stop_on_error);

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        _ => {
            print_text_output(&reports);
        }
    }

    let failures = reports.iter().filter(|r| r.error.is_some()).count();
    if failures > 0 && stop_on_error {
        return Err(format!("{failures} step(s) failed").into());
    }
    Ok(())
}

fn print_text_output(reports: &[StepReport]) {
    for report in reports {
        match (&report.response, &report.error) {
            (Some(response), _) => {
                println!("#{:<3} {:<18} {}", report.step, report.op, response.summary());
            }
            (None, Some(error)) => {
                println!("#{:<3} {:<18} ERROR: {}", report.step, report.op, error);
            }
            (None, None) => {}
        }
    }
}
