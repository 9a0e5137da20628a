use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{info, warn};

use super::{DatasetStore, InsertOutcome, RecordBatch};
use crate::domain::{EntityKind, OrganizationId};
use crate::errors::GenerationError;

/// One retry after the first failure.
pub const FLUSH_ATTEMPTS: u32 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub generated: usize,
    pub inserted: usize,
    pub skipped: usize,
}

/// Buffers generated rows per entity kind and writes them in bounded, dependency-ordered
/// batches.
pub struct BatchWriter<'a> {
    store: &'a dyn DatasetStore,
    organization: OrganizationId,
    batch_size: usize,
    pending: BTreeMap<EntityKind, RecordBatch>,
    counts: BTreeMap<EntityKind, KindCounts>,
}

impl<'a> BatchWriter<'a> {
    pub fn new(
        store: &'a dyn DatasetStore,
        organization: OrganizationId,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            organization,
            batch_size: batch_size.max(1),
            pending: BTreeMap::new(),
            counts: BTreeMap::new(),
        }
    }

    pub fn pending_len(&self, kind: EntityKind) -> usize {
        self.pending.get(&kind).map_or(0, RecordBatch::len)
    }

    pub fn counts(&self) -> &BTreeMap<EntityKind, KindCounts> {
        &self.counts
    }

    /// Buffers `rows`, flushing full batches of that kind as they form.
    pub async fn stage(&mut self, rows: impl Into<RecordBatch>) -> Result<(), GenerationError> {
        let rows = rows.into();
        let kind = rows.kind();
        self.counts.entry(kind).or_default().generated += rows.len();

        let buffer = self.pending.entry(kind).or_insert_with(|| RecordBatch::empty(kind));
        if buffer.append(rows).is_err() {
            return Err(GenerationError::Configuration(format!(
                "record batch kind mismatch for {kind}"
            )));
        }

        while self.pending_len(kind) >= self.batch_size {
            self.flush_upstream(kind).await?;
            let chunk = match self.pending.get_mut(&kind) {
                Some(buffer) => buffer.take_front(self.batch_size),
                None => break,
            };
            self.write(chunk).await?;
        }
        Ok(())
    }

    /// Writes everything buffered. Kinds are ordered so upstream kinds drain first.
    pub async fn flush(&mut self) -> Result<(), GenerationError> {
        let kinds = self.pending.keys().copied().collect::<Vec<_>>();
        for kind in kinds {
            self.drain(kind).await?;
        }
        Ok(())
    }

    /// Drops buffered rows of `kind` without writing them; returns how many were dropped.
    pub fn discard(&mut self, kind: EntityKind) -> usize {
        self.pending.remove(&kind).map_or(0, |batch| batch.len())
    }

    async fn flush_upstream(&mut self, kind: EntityKind) -> Result<(), GenerationError> {
        let mut closure = BTreeSet::new();
        let mut frontier = kind.upstream().to_vec();
        while let Some(upstream) = frontier.pop() {
            if closure.insert(upstream) {
                frontier.extend_from_slice(upstream.upstream());
            }
        }
        for upstream in closure {
            self.drain(upstream).await?;
        }
        Ok(())
    }

    async fn drain(&mut self, kind: EntityKind) -> Result<(), GenerationError> {
        while self.pending_len(kind) > 0 {
            let chunk = match self.pending.get_mut(&kind) {
                Some(buffer) => buffer.take_front(self.batch_size),
                None => break,
            };
            self.write(chunk).await?;
        }
        Ok(())
    }

    /// A failed chunk is retried once and then dropped along with the error.
    async fn write(&mut self, chunk: RecordBatch) -> Result<InsertOutcome, GenerationError> {
        let kind = chunk.kind();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.store.insert_batch(&self.organization, &chunk).await {
                Ok(outcome) => {
                    let counts = self.counts.entry(kind).or_default();
                    counts.inserted += outcome.inserted;
                    counts.skipped += outcome.skipped;
                    info!(
                        event_name = "dataset.batch.flushed",
                        organization = %self.organization,
                        kind = %kind,
                        rows = chunk.len(),
                        inserted = outcome.inserted,
                        skipped = outcome.skipped,
                        attempt,
                        "batch flushed"
                    );
                    return Ok(outcome);
                }
                Err(source) if attempt >= FLUSH_ATTEMPTS => {
                    self.pending.remove(&kind);
                    return Err(GenerationError::PersistenceBatch {
                        kind,
                        attempts: attempt,
                        source,
                    });
                }
                Err(source) => {
                    warn!(
                        event_name = "dataset.batch.retry",
                        organization = %self.organization,
                        kind = %kind,
                        rows = chunk.len(),
                        attempt,
                        error = %source,
                        "batch flush failed, retrying"
                    );
                }
            }
        }
    }
}
