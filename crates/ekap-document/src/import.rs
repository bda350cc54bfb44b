use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::{EkapDocument, EkapItem};

/// Which item field a spreadsheet key column is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    /// `SiraNo`, the displayed sequence number.
    SequenceNo,
    /// `IsKalemiNo`, the work-item (poz) number.
    WorkItemNo,
}

impl MatchField {
    fn key<'a>(&self, item: &'a EkapItem) -> &'a str {
        match self {
            MatchField::SequenceNo => &item.sequence_no,
            MatchField::WorkItemNo => &item.work_item_no,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub item_index: usize,
    pub sequence_no: String,
    pub work_item_no: String,
    pub description: String,
    pub current_price: Decimal,
    pub new_price: Decimal,
    pub matched_by: MatchField,
    /// 1-based row number in the source grid (the header is row 1).
    pub row: usize,
}

/// Outcome of [`match_price_rows`]. Row numbers are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub updates: Vec<PriceUpdate>,
    pub unmatched_rows: Vec<usize>,
    pub invalid_price_rows: Vec<usize>,
    pub duplicate_key_rows: Vec<usize>,
}

/// Match spreadsheet rows against document items.
///
/// `rows` is a grid of cell text whose first row is a header. Rows with an empty key cell are
/// skipped. A key seen on an earlier matched row is reported as a duplicate before its price
/// is looked at; when several items share a key the first one wins. Prices go through
/// [`ekap_number::parse_price_cell`], so either locale convention is accepted.
pub fn match_price_rows<R: AsRef<[String]>>(
    rows: &[R],
    items: &[EkapItem],
    match_field: MatchField,
    key_col: usize,
    price_col: usize,
) -> MatchResult {
    let mut by_key: HashMap<&str, &EkapItem> = HashMap::with_capacity(items.len());
    for item in items {
        by_key.entry(match_field.key(item).trim()).or_insert(item);
    }

    let mut result = MatchResult::default();
    let mut matched_keys = HashSet::new();

    for (pos, row) in rows.iter().enumerate().skip(1) {
        let row_number = pos + 1;
        let cells = row.as_ref();
        let key = cells.get(key_col).map(|c| c.trim()).unwrap_or_default();
        if key.is_empty() {
            continue;
        }

        if matched_keys.contains(key) {
            result.duplicate_key_rows.push(row_number);
            continue;
        }

        let Some(new_price) = cells
            .get(price_col)
            .and_then(|c| ekap_number::parse_price_cell(c))
        else {
            result.invalid_price_rows.push(row_number);
            continue;
        };

        let Some(item) = by_key.get(key) else {
            result.unmatched_rows.push(row_number);
            continue;
        };

        matched_keys.insert(key);
        result.updates.push(PriceUpdate {
            item_index: item.index,
            sequence_no: item.sequence_no.clone(),
            work_item_no: item.work_item_no.clone(),
            description: item.description.clone(),
            current_price: item.price,
            new_price,
            matched_by: match_field,
            row: row_number,
        });
    }

    log::debug!(
        "matched {} price rows ({} unmatched, {} invalid, {} duplicate)",
        result.updates.len(),
        result.unmatched_rows.len(),
        result.invalid_price_rows.len(),
        result.duplicate_key_rows.len()
    );
    result
}

/// Apply every update in order, as repeated [`crate::mutate_item_price`] calls would.
pub fn apply_price_updates(document: &EkapDocument, updates: &[PriceUpdate]) -> EkapDocument {
    let mut next = document.clone();
    for update in updates {
        if !next.set_price_in_place(update.item_index, update.new_price) {
            log::debug!("no item with index {}; price update ignored", update.item_index);
        }
    }
    next.recompute_tender_total();
    next
}
