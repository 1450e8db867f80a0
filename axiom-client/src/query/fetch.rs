use std::{future::Future, time::Duration};

use axiom_codec::types::native::{AnySubquery, TxPosition, TxRef};
use ethers_core::types::H256;
use futures::{stream, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::{
    admission::RecordShape,
    error::{QueryError, ResolverError, SubqueryError},
    resolver::ChainDataResolver,
    subquery::DataSubquery,
};

/// Stops a whole batch. Timeouts are per-record failures instead, see [ResolverError::Timeout].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cancelled;

impl From<Cancelled> for QueryError {
    fn from(_: Cancelled) -> Self {
        QueryError::Cancelled
    }
}

#[derive(Debug)]
pub(crate) enum RecordError {
    Subquery(SubqueryError),
    Resolve(ResolverError),
}

/// One record after resolution, with the chain data admission control needs.
#[derive(Debug)]
pub(crate) struct Prepared {
    pub record: Result<(AnySubquery, RecordShape), RecordError>,
    /// Present when field values were requested and the record resolved.
    pub value: Option<Result<H256, ResolverError>>,
}

impl Prepared {
    fn failed(err: RecordError) -> Self {
        Self { record: Err(err), value: None }
    }
}

/// Issues resolver calls for a batch, at most `concurrency` at a time. Every call is subject to
/// `timeout` and to `cancel`.
pub(crate) struct Fetcher<'a, R: ?Sized> {
    pub resolver: &'a R,
    pub cancel: &'a CancellationToken,
    pub timeout: Duration,
    pub concurrency: usize,
}

impl<'a, R: ChainDataResolver + ?Sized> Fetcher<'a, R> {
    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, ResolverError>>,
    ) -> Result<Result<T, ResolverError>, Cancelled> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Cancelled),
            res = tokio::time::timeout(self.timeout, request) => {
                Ok(res.unwrap_or(Err(ResolverError::Timeout(self.timeout))))
            }
        }
    }

    async fn prepare(
        &self,
        subquery: &DataSubquery,
        with_value: bool,
    ) -> Result<Prepared, Cancelled> {
        let subquery = match subquery.tx_ref() {
            Some(TxRef::Hash(tx_hash)) => {
                match self.call(self.resolver.resolve_tx_position(tx_hash)).await? {
                    Ok(position) => subquery.clone().resolve(position),
                    Err(err) => return Ok(Prepared::failed(RecordError::Resolve(err))),
                }
            }
            _ => subquery.clone(),
        };
        let any = match subquery.to_any() {
            Ok(any) => any,
            Err(err) => return Ok(Prepared::failed(RecordError::Subquery(err))),
        };
        let shape = match &any {
            AnySubquery::Transaction(tx) => {
                let position = TxPosition { block_number: tx.block_number, tx_idx: tx.tx_idx };
                match self.call(self.resolver.fetch_raw_transaction(position)).await? {
                    Ok(raw) => RecordShape::from(&raw),
                    Err(err) => return Ok(Prepared::failed(RecordError::Resolve(err))),
                }
            }
            AnySubquery::Receipt(receipt) => {
                let position =
                    TxPosition { block_number: receipt.block_number, tx_idx: receipt.tx_idx };
                match self.call(self.resolver.fetch_raw_receipt(position)).await? {
                    Ok(raw) => RecordShape::from(&raw),
                    Err(err) => return Ok(Prepared::failed(RecordError::Resolve(err))),
                }
            }
            other => RecordShape::Fixed(other.subquery_type()),
        };
        let value = if with_value {
            Some(self.call(self.resolver.fetch_field_value(&any)).await?)
        } else {
            None
        };
        Ok(Prepared { record: Ok((any, shape)), value })
    }

    /// Prepares every record concurrently. Results come back in the order of `subqueries`,
    /// whatever order the requests complete in. Only cancellation drops the batch.
    pub async fn prepare_all(
        &self,
        subqueries: &[DataSubquery],
        with_values: bool,
    ) -> Result<Vec<Prepared>, Cancelled> {
        stream::iter(subqueries.iter().map(|subquery| self.prepare(subquery, with_values)))
            .buffered(self.concurrency.max(1))
            .try_collect()
            .await
    }
}
