//! Assembly of a complete AxiomV2 query.
//!
//! [AxiomV2QueryBuilder] collects subqueries, an optional compute query and a callback. Building
//! resolves every transaction reference against chain data, runs admission control over the whole
//! batch, encodes the data query and computes the payment. The result is cached until the next
//! mutation.
use axiom_codec::{
    encoder::native::get_query_hash_v2,
    types::native::{AnySubquery, AxiomV2Callback, AxiomV2ComputeQuery, AxiomV2DataQuery},
};
use ethers_core::types::{Bytes, H256, U256};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    admission::{AdmissionController, ConfigCategory, RecordShape},
    config::AxiomV2QueryConfig,
    error::{AdmissionError, FeeError, QueryError, ResolverError, SubqueryError},
    fee::{gwei_to_wei, parse_gwei, FeeCalculator, FeeData},
    resolver::ChainDataResolver,
    subquery::DataSubquery,
};

use self::fetch::{Fetcher, Prepared, RecordError};

mod fetch;
#[cfg(test)]
mod tests;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum QueryState {
    /// Nothing has been set yet.
    #[default]
    Empty,
    Assembling,
    /// A [BuiltQuery] is cached and reflects the current inputs.
    Built,
}

/// Payment parameters. Missing values take the configured defaults.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Hash, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    pub max_fee_per_gas: Option<U256>,
    pub callback_gas_limit: Option<u64>,
}

impl QueryOptions {
    /// Options with `maxFeePerGas` given in decimal gwei.
    pub fn from_gwei(
        max_fee_per_gas: Option<f64>,
        callback_gas_limit: Option<u64>,
    ) -> Result<Self, FeeError> {
        let max_fee_per_gas =
            max_fee_per_gas.map(|gwei| gwei_to_wei("maxFeePerGas", gwei)).transpose()?;
        Ok(Self { max_fee_per_gas, callback_gas_limit })
    }

    /// Like [Self::from_gwei], parsing `maxFeePerGas` from a string such as `"2.5"`.
    pub fn parse_gwei(
        max_fee_per_gas: Option<&str>,
        callback_gas_limit: Option<u64>,
    ) -> Result<Self, FeeError> {
        let max_fee_per_gas =
            max_fee_per_gas.map(|gwei| parse_gwei("maxFeePerGas", gwei)).transpose()?;
        Ok(Self { max_fee_per_gas, callback_gas_limit })
    }
}

/// Everything needed to submit a query onchain.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BuiltQuery {
    pub source_chain_id: u64,
    /// Encoded data query.
    pub data_query: Bytes,
    pub data_query_hash: H256,
    pub data_query_struct: AxiomV2DataQuery,
    pub query_schema: H256,
    pub query_hash: H256,
    pub compute_query: AxiomV2ComputeQuery,
    /// `result_len` is always set.
    pub callback: AxiomV2Callback,
    pub fee_data: FeeData,
    pub config_category: ConfigCategory,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub enum DiagnosticKind {
    NothingToBuild,
    InvalidSubquery,
    Unresolved,
    RecordTooLarge,
    CapacityExceeded,
    /// The record resolved but its value could not be read.
    FieldValue,
    /// A chain data request for the record did not answer in time.
    TimedOut,
    /// Validation was cancelled before chain data was checked.
    Interrupted,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Position of the offending subquery, `None` for problems of the whole query.
    pub index: Option<usize>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    fn new(index: Option<usize>, kind: DiagnosticKind, message: impl ToString) -> Self {
        Self { index, kind, message: message.to_string() }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Clone, Debug)]
pub struct AxiomV2QueryBuilder {
    config: AxiomV2QueryConfig,
    state: QueryState,
    subqueries: Vec<DataSubquery>,
    compute_query: Option<AxiomV2ComputeQuery>,
    callback: AxiomV2Callback,
    options: QueryOptions,
    built: Option<BuiltQuery>,
}

impl AxiomV2QueryBuilder {
    pub fn new(config: AxiomV2QueryConfig) -> Self {
        Self {
            config,
            state: QueryState::Empty,
            subqueries: vec![],
            compute_query: None,
            callback: AxiomV2Callback::default(),
            options: QueryOptions::default(),
            built: None,
        }
    }

    pub fn config(&self) -> &AxiomV2QueryConfig {
        &self.config
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn subqueries(&self) -> &[DataSubquery] {
        &self.subqueries
    }

    pub fn compute_query(&self) -> Option<&AxiomV2ComputeQuery> {
        self.compute_query.as_ref()
    }

    pub fn callback(&self) -> &AxiomV2Callback {
        &self.callback
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    /// The cached result of the last [Self::build], if nothing changed since.
    pub fn built(&self) -> Option<&BuiltQuery> {
        self.built.as_ref()
    }

    fn mutated(&mut self) {
        if self.built.take().is_some() {
            log::debug!("query inputs changed, discarding built query");
        }
        self.state = QueryState::Assembling;
    }

    /// Appends one subquery. Returns its position in the data query.
    pub fn append(&mut self, subquery: impl Into<DataSubquery>) -> Result<usize, SubqueryError> {
        let subquery = subquery.into();
        subquery.check()?;
        self.mutated();
        self.subqueries.push(subquery);
        Ok(self.subqueries.len() - 1)
    }

    /// Appends every subquery, or none of them if any is invalid.
    pub fn append_all<S: Into<DataSubquery>>(
        &mut self,
        subqueries: impl IntoIterator<Item = S>,
    ) -> Result<(), SubqueryError> {
        let subqueries = subqueries
            .into_iter()
            .map(|subquery| {
                let subquery = subquery.into();
                subquery.check().map(|_| subquery)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.mutated();
        self.subqueries.extend(subqueries);
        Ok(())
    }

    /// Replaces the whole data query.
    pub fn set_data_query<S: Into<DataSubquery>>(
        &mut self,
        subqueries: impl IntoIterator<Item = S>,
    ) -> Result<(), SubqueryError> {
        let subqueries = subqueries
            .into_iter()
            .map(|subquery| {
                let subquery = subquery.into();
                subquery.check().map(|_| subquery)
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.mutated();
        self.subqueries = subqueries;
        Ok(())
    }

    pub fn set_compute_query(&mut self, compute_query: AxiomV2ComputeQuery) -> Result<(), QueryError> {
        compute_query
            .check_consistent()
            .map_err(|err| QueryError::InvalidComputeQuery(err.to_string()))?;
        self.mutated();
        self.compute_query = Some(compute_query);
        Ok(())
    }

    pub fn set_callback(&mut self, callback: AxiomV2Callback) {
        self.mutated();
        self.callback = callback;
    }

    pub fn set_options(&mut self, options: QueryOptions) {
        self.mutated();
        self.options = options;
    }

    fn is_empty(&self) -> bool {
        self.subqueries.is_empty() && self.compute_query.as_ref().map_or(true, |c| c.is_empty())
    }

    fn fetcher<'a, R: ChainDataResolver + ?Sized>(
        &self,
        resolver: &'a R,
        cancel: &'a CancellationToken,
    ) -> Fetcher<'a, R> {
        Fetcher {
            resolver,
            cancel,
            timeout: self.config.request_timeout(),
            concurrency: self.config.max_concurrent_requests,
        }
    }

    /// Resolves, admits, encodes and prices the query.
    ///
    /// Admission sees every record that resolved before any error is returned; the error reported
    /// is the first one in append order, or the capacity of the final batch. On error, including
    /// cancellation and timeouts, the builder stays in [QueryState::Assembling] and can be built
    /// again.
    pub async fn build<R: ChainDataResolver + ?Sized>(
        &mut self,
        resolver: &R,
        cancel: &CancellationToken,
    ) -> Result<&BuiltQuery, QueryError> {
        if self.is_empty() {
            return Err(QueryError::NothingToBuild);
        }
        if self.state == QueryState::Built && self.built.is_some() {
            return self.built.as_ref().ok_or(QueryError::NothingToBuild);
        }
        if cancel.is_cancelled() {
            return Err(QueryError::Cancelled);
        }

        let prepared = self.fetcher(resolver, cancel).prepare_all(&self.subqueries, false).await?;
        let mut admission = AdmissionController::new(&self.config);
        let mut first_error: Option<QueryError> = None;
        let mut subqueries = Vec::with_capacity(prepared.len());
        for (index, Prepared { record, .. }) in prepared.into_iter().enumerate() {
            let (subquery, shape) = match record {
                Ok(record) => record,
                Err(err) => {
                    first_error.get_or_insert(record_error(index, err));
                    continue;
                }
            };
            match admission.admit(&shape) {
                Ok(size) => {
                    log::debug!("subquery {index} ({}) admitted as {size:?}", subquery.subquery_type())
                }
                Err(err @ AdmissionError::RecordTooLarge { .. }) => {
                    first_error.get_or_insert(err.into());
                }
                // the final state is checked once the whole batch is in
                Err(AdmissionError::CapacityExceeded { .. }) => {}
            }
            subqueries.push(subquery);
        }
        if let Some(err) = first_error {
            return Err(err);
        }
        let config_category = admission.finish()?;

        let built = self.encode(subqueries, config_category)?;
        log::info!(
            "built query {:?}: {} subqueries, config category {:?}, data query hash {:?}",
            built.query_hash,
            built.data_query_struct.subqueries.len(),
            built.config_category,
            built.data_query_hash
        );
        self.state = QueryState::Built;
        Ok(&*self.built.insert(built))
    }

    fn encode(
        &self,
        subqueries: Vec<AnySubquery>,
        config_category: ConfigCategory,
    ) -> Result<BuiltQuery, QueryError> {
        let source_chain_id = self.config.source_chain_id;
        let data_query_struct = AxiomV2DataQuery {
            source_chain_id,
            subqueries: subqueries.into_iter().map(Into::into).collect_vec(),
        };
        let data_query = data_query_struct.encode()?;
        // the encoding above already rejects more than u16::MAX subqueries
        let num_subqueries = data_query_struct.subqueries.len() as u16;
        // without a compute proof the results are the subquery results themselves
        let compute_query = match &self.compute_query {
            Some(compute_query) if compute_query.k != 0 => compute_query.clone(),
            _ => AxiomV2ComputeQuery::empty(num_subqueries),
        };
        let query_schema = compute_query.query_schema()?;
        let query_hash = get_query_hash_v2(source_chain_id, &data_query_struct, &compute_query)?;
        let callback = AxiomV2Callback {
            result_len: Some(self.callback.result_len.unwrap_or(num_subqueries)),
            ..self.callback.clone()
        };
        let fee_data = FeeCalculator::new(self.config.fee)
            .fee_data(self.options.max_fee_per_gas, self.options.callback_gas_limit)?;
        Ok(BuiltQuery {
            source_chain_id,
            data_query: data_query.into(),
            data_query_hash: data_query_struct.keccak(),
            data_query_struct,
            query_schema,
            query_hash,
            compute_query,
            callback,
            fee_data,
            config_category,
        })
    }

    /// Checks the pending query against chain data without building it.
    ///
    /// Every subquery is resolved and its value read, and admission control runs over the whole
    /// batch. All problems found are reported; nothing short-circuits except cancellation.
    pub async fn validate<R: ChainDataResolver + ?Sized>(
        &self,
        resolver: &R,
        cancel: &CancellationToken,
    ) -> ValidationReport {
        let mut diagnostics = vec![];
        if self.is_empty() {
            diagnostics.push(Diagnostic::new(
                None,
                DiagnosticKind::NothingToBuild,
                QueryError::NothingToBuild,
            ));
        }
        for (index, subquery) in self.subqueries.iter().enumerate() {
            if let Err(err) = subquery.check() {
                diagnostics.push(Diagnostic::new(Some(index), DiagnosticKind::InvalidSubquery, err));
            }
        }

        match self.fetcher(resolver, cancel).prepare_all(&self.subqueries, true).await {
            Ok(prepared) => {
                let mut admission = AdmissionController::new(&self.config);
                for (index, Prepared { record, value }) in prepared.into_iter().enumerate() {
                    let shape: RecordShape = match record {
                        Ok((_, shape)) => shape,
                        Err(RecordError::Subquery(err)) => {
                            diagnostics.push(Diagnostic::new(
                                Some(index),
                                DiagnosticKind::InvalidSubquery,
                                err,
                            ));
                            continue;
                        }
                        Err(RecordError::Resolve(err)) => {
                            let kind = match err {
                                ResolverError::Timeout(_) => DiagnosticKind::TimedOut,
                                _ => DiagnosticKind::Unresolved,
                            };
                            diagnostics.push(Diagnostic::new(Some(index), kind, err));
                            continue;
                        }
                    };
                    if let Some(Err(err)) = value {
                        let kind = match err {
                            ResolverError::Timeout(_) => DiagnosticKind::TimedOut,
                            _ => DiagnosticKind::FieldValue,
                        };
                        diagnostics.push(Diagnostic::new(Some(index), kind, err));
                    }
                    if let Err(err @ AdmissionError::RecordTooLarge { .. }) = admission.admit(&shape)
                    {
                        diagnostics.push(Diagnostic::new(
                            Some(index),
                            DiagnosticKind::RecordTooLarge,
                            err,
                        ));
                    }
                }
                if let Err(err) = admission.finish() {
                    diagnostics.push(Diagnostic::new(None, DiagnosticKind::CapacityExceeded, err));
                }
            }
            Err(cancelled) => diagnostics.push(Diagnostic::new(
                None,
                DiagnosticKind::Interrupted,
                QueryError::from(cancelled),
            )),
        }

        for diagnostic in &diagnostics {
            match diagnostic.index {
                Some(index) => log::warn!("subquery {index}: {}", diagnostic.message),
                None => log::warn!("{}", diagnostic.message),
            }
        }
        ValidationReport { is_valid: diagnostics.is_empty(), diagnostics }
    }
}

fn record_error(index: usize, err: RecordError) -> QueryError {
    match err {
        RecordError::Subquery(err) => err.into(),
        RecordError::Resolve(ResolverError::Timeout(timeout)) => QueryError::Timeout(timeout),
        RecordError::Resolve(source) => QueryError::Resolve { index, source },
    }
}
