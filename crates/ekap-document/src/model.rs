use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether an item carried a pricing sub-node (`Teklif`) in the source markup.
///
/// Platforms export items nobody has bid on yet without one; serialization synthesizes the
/// sub-node for [`OfferShape::Unpriced`] items and edits it in place for
/// [`OfferShape::Priced`] ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferShape {
    Unpriced,
    Priced,
}

/// One `IhaleKalem` line of a bid file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EkapItem {
    /// 1-based position among item nodes. This is the identity used for edits.
    pub index: usize,
    /// `SiraNo` as displayed by the platform. Cosmetic; may repeat or skip.
    pub sequence_no: String,
    pub item_id: String,
    pub work_item_no: String,
    pub work_item_type: String,
    pub code: String,
    pub name: String,
    pub description: String,
    /// Quantity exactly as written in the source, reused when a pricing sub-node is synthesized.
    pub quantity_text: String,
    pub quantity: Decimal,
    pub unit: String,
    pub personnel_service: String,
    pub price: Decimal,
    /// Always `quantity * price`; never read from the source.
    pub total: Decimal,
    pub currency: String,
    pub product_code: String,
    pub product_name: String,
    pub shape: OfferShape,
}

impl EkapItem {
    pub(crate) fn recompute_total(&mut self) {
        self.total = line_total(self.quantity, self.price);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderInfo {
    pub year: String,
    pub number: String,
    pub title: String,
    pub deadline: String,
    /// Sum of all item totals, recomputed after every edit.
    pub total: Decimal,
    /// `IhaleTeklifToplamYazi` as found in the source. Not maintained.
    pub total_in_words: String,
}

impl TenderInfo {
    /// The tender registration number as printed by the platform (`2024/123456`).
    pub fn registration_number(&self) -> String {
        match (self.year.is_empty(), self.number.is_empty()) {
            (true, true) => String::new(),
            (false, true) => self.year.clone(),
            (true, false) => self.number.clone(),
            (false, false) => format!("{}/{}", self.year, self.number),
        }
    }
}

/// A parsed bid file.
///
/// Holds the original markup so serialization can rewrite it in place. Values are immutable
/// from the outside; edits go through [`mutate_item_price`] and produce a new document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EkapDocument {
    items: Vec<EkapItem>,
    tender: TenderInfo,
    markup: Arc<str>,
    side_markup: Option<Arc<str>>,
}

impl EkapDocument {
    pub(crate) fn new(
        items: Vec<EkapItem>,
        tender: TenderInfo,
        markup: String,
        side_markup: Option<String>,
    ) -> Self {
        let mut doc = Self {
            items,
            tender,
            markup: markup.into(),
            side_markup: side_markup.map(Into::into),
        };
        doc.recompute_tender_total();
        doc
    }

    pub fn items(&self) -> &[EkapItem] {
        &self.items
    }

    /// Look up an item by its 1-based [`EkapItem::index`].
    pub fn item(&self, index: usize) -> Option<&EkapItem> {
        self.items.iter().find(|item| item.index == index)
    }

    pub fn tender(&self) -> &TenderInfo {
        &self.tender
    }

    pub fn total(&self) -> Decimal {
        self.tender.total
    }

    /// The `teklifDosyasi.xml` markup this document was parsed from.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// The `dosyaBilgileri.xml` markup, if the container had one.
    pub fn side_markup(&self) -> Option<&str> {
        self.side_markup.as_deref()
    }

    /// Shorthand for [`mutate_item_price`].
    pub fn with_item_price(&self, item_index: usize, new_price: Decimal) -> Self {
        mutate_item_price(self, item_index, new_price)
    }

    /// Set `new_price` on the item at `item_index`. Returns `false` if there is none.
    pub(crate) fn set_price_in_place(&mut self, item_index: usize, new_price: Decimal) -> bool {
        match self.items.iter_mut().find(|item| item.index == item_index) {
            Some(item) => {
                item.price = new_price;
                item.recompute_total();
                true
            }
            None => false,
        }
    }

    pub(crate) fn recompute_tender_total(&mut self) {
        self.tender.total = self
            .items
            .iter()
            .fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.total));
    }
}

/// Return a copy of `document` with the price of item `item_index` replaced.
///
/// The item is found by its [`EkapItem::index`], not its position or `SiraNo`. Its total and
/// the tender total are recomputed. An unknown index returns the document unchanged.
pub fn mutate_item_price(
    document: &EkapDocument,
    item_index: usize,
    new_price: Decimal,
) -> EkapDocument {
    let mut next = document.clone();
    if next.set_price_in_place(item_index, new_price) {
        next.recompute_tender_total();
    } else {
        log::debug!("no item with index {item_index}; price update ignored");
    }
    next
}

pub(crate) fn line_total(quantity: Decimal, price: Decimal) -> Decimal {
    quantity.saturating_mul(price)
}
