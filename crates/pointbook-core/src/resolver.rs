//! Repurchase detection
//!
//! A sale is a repurchase when the customer already bought the same product
//! (or a grouped equivalent) before. Two sources are consulted: the durable
//! history store, and the rows already classified earlier in the current
//! batch. History is only written after a batch is accepted, so the in-batch
//! set is what keeps repeated lines of one spreadsheet from all counting as
//! first purchases.

use std::collections::HashMap;

use crate::db::Database;
use crate::error::Result;
use crate::grouping::{normalize, ProductGroupIndex};

/// Durable purchase lookup
pub trait PurchaseHistory {
    /// Whether `customer_id` has any stored purchase of one of `normalized_ids`
    fn has_prior_purchase(&self, customer_id: &str, normalized_ids: &[String]) -> Result<bool>;
}

impl PurchaseHistory for Database {
    fn has_prior_purchase(&self, customer_id: &str, normalized_ids: &[String]) -> Result<bool> {
        Database::has_prior_purchase(self, customer_id, normalized_ids)
    }
}

/// History source with no records, for classifying without a store
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl PurchaseHistory for NoHistory {
    fn has_prior_purchase(&self, _customer_id: &str, _normalized_ids: &[String]) -> Result<bool> {
        Ok(false)
    }
}

/// Identity of a sales line's transaction: the ticket number, or the full
/// date string when the export carries no ticket
pub fn transaction_identity(ticket_no: Option<&str>, date: &str) -> String {
    match ticket_no.map(str::trim).filter(|t| !t.is_empty()) {
        Some(ticket) => ticket.to_string(),
        None => date.trim().to_string(),
    }
}

/// Answers "has this customer bought this product before?" for one batch
pub struct RepurchaseResolver<'a> {
    history: &'a dyn PurchaseHistory,
    index: &'a ProductGroupIndex,
    /// (customer, normalized item) -> transaction identities seen this batch
    batch: HashMap<(String, String), Vec<String>>,
}

impl<'a> RepurchaseResolver<'a> {
    pub fn new(history: &'a dyn PurchaseHistory, index: &'a ProductGroupIndex) -> Self {
        Self {
            history,
            index,
            batch: HashMap::new(),
        }
    }

    /// Whether the sale repeats a prior purchase
    ///
    /// Missing customer or item ids never count as repurchases. In-batch
    /// rows only match when they belong to a different transaction, so the
    /// split lines of one receipt do not flag each other. Durable history
    /// matches regardless of date.
    pub fn is_repurchase(&self, customer_id: &str, item_id: &str, identity: &str) -> Result<bool> {
        let customer_id = customer_id.trim();
        if customer_id.is_empty() || normalize(item_id).is_empty() {
            return Ok(false);
        }

        let lookup = self.index.lookup(item_id);

        let in_batch = lookup.related_ids.iter().any(|id| {
            self.batch
                .get(&(customer_id.to_string(), id.clone()))
                .is_some_and(|seen| seen.iter().any(|other| other != identity))
        });
        if in_batch {
            return Ok(true);
        }

        let related: Vec<String> = lookup.related_ids.into_iter().collect();
        self.history.has_prior_purchase(customer_id, &related)
    }

    /// Make a classified sale visible to later rows of the batch
    pub fn record(&mut self, customer_id: &str, item_id: &str, identity: &str) {
        let customer_id = customer_id.trim();
        let normalized = normalize(item_id);
        if customer_id.is_empty() || normalized.is_empty() {
            return;
        }
        self.batch
            .entry((customer_id.to_string(), normalized))
            .or_default()
            .push(identity.to_string());
    }

    /// Number of distinct (customer, item) pairs seen this batch
    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }
}
