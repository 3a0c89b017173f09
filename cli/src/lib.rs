//! Replay tool for the unspent ledger.
//!
//! Loads a YAML config and a YAML script of invocations, executes them in order
//! against an in-memory store, and reports receipts and query results.

use commonware_utils::hex;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, str::FromStr};
use thiserror::Error;
use tracing::{info, Level};
use unspent_execution::{execute_invocation, Caller, LedgerError, Memory, Store};
use unspent_types::{
    Address, IdentifierError, Instruction, Query, QueryResponse, Receipt, TxId,
    MAX_BATCH_TRANSFERS, NAMESPACE,
};

fn default_namespace() -> String {
    String::from_utf8_lossy(NAMESPACE).into_owned()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_batch_size() -> usize {
    MAX_BATCH_TRANSFERS
}

/// Replay configuration as read from YAML.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Addresses granted the administrative capability.
    #[serde(default)]
    pub admins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("namespace must not be empty")]
    EmptyNamespace,
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: usize },
    #[error("{field} must be <= {max} (got {value})")]
    ExceedsLimit {
        field: &'static str,
        value: usize,
        max: usize,
    },
    #[error("invalid admin address {value:?}")]
    InvalidAdmin {
        value: String,
        #[source]
        source: IdentifierError,
    },
}

#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    pub namespace: Vec<u8>,
    pub log_level: Level,
    pub json_logs: bool,
    pub max_batch_size: usize,
    pub admins: BTreeSet<Address>,
}

impl Config {
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::EmptyNamespace);
        }
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        if self.max_batch_size == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "max_batch_size",
                value: 0,
            });
        }
        if self.max_batch_size > MAX_BATCH_TRANSFERS {
            return Err(ConfigError::ExceedsLimit {
                field: "max_batch_size",
                value: self.max_batch_size,
                max: MAX_BATCH_TRANSFERS,
            });
        }
        let admins = self
            .admins
            .into_iter()
            .map(|value| {
                Address::new(value.clone())
                    .map_err(|source| ConfigError::InvalidAdmin { value, source })
            })
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(ValidatedConfig {
            namespace: self.namespace.into_bytes(),
            log_level,
            json_logs: self.json_logs,
            max_batch_size: self.max_batch_size,
            admins,
        })
    }
}

impl ValidatedConfig {
    /// Runtime identity of `address`; configured admins carry the admin capability.
    pub fn caller(&self, address: &Address) -> Caller {
        if self.admins.contains(address) {
            Caller::admin(address.clone())
        } else {
            Caller::user(address.clone())
        }
    }
}

/// One invocation submitted by `caller`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ScriptInvocation {
    pub caller: Address,
    pub instructions: Vec<Instruction>,
}

/// Invocations to replay followed by queries evaluated against the final state.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Script {
    #[serde(default)]
    pub invocations: Vec<ScriptInvocation>,
    #[serde(default)]
    pub queries: Vec<Query>,
}

impl Script {
    pub fn instruction_count(&self) -> usize {
        self.invocations
            .iter()
            .map(|invocation| invocation.instructions.len())
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Committed {
        receipts: Vec<Receipt>,
        digest: String,
    },
    Rejected {
        error: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InvocationReport {
    pub tx_id: String,
    pub caller: Address,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub invocations: Vec<InvocationReport>,
    pub queries: Vec<QueryResponse>,
}

/// Executes every invocation of `script` at its own height, then runs the queries.
///
/// A rejected invocation is recorded and leaves state untouched; replay continues
/// with the next one. Failing queries abort the replay.
pub async fn replay(config: &ValidatedConfig, script: &Script) -> Result<Report, LedgerError> {
    let mut state = Memory::default();
    let mut report = Report::default();

    for (height, invocation) in (1u64..).zip(&script.invocations) {
        let tx_id = TxId::new(height, 0);
        let caller = config.caller(&invocation.caller);
        let outcome = match execute_invocation(
            &mut state,
            &config.namespace,
            config.max_batch_size,
            tx_id,
            &caller,
            &invocation.instructions,
        )
        .await
        {
            Ok(result) => Outcome::Committed {
                receipts: result.receipts,
                digest: hex(result.digest.as_ref()),
            },
            Err(err) => Outcome::Rejected {
                error: err.to_string(),
            },
        };
        report.invocations.push(InvocationReport {
            tx_id: tx_id.to_string(),
            caller: invocation.caller.clone(),
            outcome,
        });
    }

    let store = Store::new(&state, &config.namespace);
    for query in &script.queries {
        report.queries.push(store.query(query).await?);
    }
    info!(
        invocations = report.invocations.len(),
        queries = report.queries.len(),
        records = state.len(),
        "replay complete"
    );
    Ok(report)
}
