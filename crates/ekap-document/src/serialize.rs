use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use rust_decimal::Decimal;

use crate::archive;
use crate::model::{EkapDocument, EkapItem, OfferShape};
use crate::parse::{is_element, parse_tree, UTF8_BOM};
use crate::schema;
use crate::EkapError;

/// Serialize `document` into an (unencrypted) container.
pub fn serialize(document: &EkapDocument) -> Result<Vec<u8>, EkapError> {
    let markup = serialize_markup(document)?;
    let bytes = archive::pack(&markup, document.side_markup())?;
    log::debug!(
        "packed container: {} bytes ({} bytes of markup, {} items)",
        bytes.len(),
        markup.len(),
        document.items().len()
    );
    Ok(bytes)
}

/// Rewrite the document's original markup with its current prices and totals.
///
/// Only these parts change:
/// - `Fiyat` / `KalemTeklifToplam` text inside each item's `Teklif`
/// - a synthesized `Teklif` for items that had none
/// - `KalemTeklifToplam` on each `IhaleKalemler` that directly holds items
/// - `KisimTeklifToplam` on the first `Kisim`, `IhaleTeklifToplam` on the first `Ihale`
///
/// Every other byte is copied through. Attributes that already hold the target value are left
/// as written.
pub fn serialize_markup(document: &EkapDocument) -> Result<String, EkapError> {
    let source = document.markup();
    let (bom, body) = match source.strip_prefix(UTF8_BOM) {
        Some(body) => (UTF8_BOM, body),
        None => ("", source),
    };

    let group_subtotals = group_subtotals(document)?;
    let mut rewrite = Rewrite {
        items: document.items(),
        group_subtotals,
        aggregate: ekap_number::format_money(document.total()),
        depth: 0,
        items_seen: 0,
        groups_seen: 0,
        tender_done: false,
        lot_done: false,
        item: None,
        skip_until: None,
    };

    let mut reader = Reader::from_reader(body.as_bytes());
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(body.len() + 256));
    writer.get_mut().extend_from_slice(bom.as_bytes());

    let mut buf = Vec::new();
    loop {
        let event = reader.read_event_into(&mut buf)?;
        if let Event::Eof = event {
            break;
        }
        rewrite.handle(event, &mut writer)?;
        buf.clear();
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

/// Per-group subtotal, in document order of `IhaleKalemler` nodes: the sum of the totals of the
/// items that are its direct children, or `None` for groups holding no items.
fn group_subtotals(document: &EkapDocument) -> Result<Vec<Option<Decimal>>, EkapError> {
    let tree = parse_tree(document.markup())?;
    let groups: Vec<_> = tree
        .descendants()
        .filter(|n| is_element(n, schema::ITEM_GROUP))
        .collect();
    let mut subtotals = vec![None; groups.len()];

    let items = tree.descendants().filter(|n| is_element(n, schema::ITEM));
    for (node, item) in items.zip(document.items()) {
        let Some(parent) = node.parent_element() else {
            continue;
        };
        if let Some(pos) = groups.iter().position(|g| g.id() == parent.id()) {
            let sum: &mut Option<Decimal> = &mut subtotals[pos];
            *sum = Some(sum.unwrap_or_default().saturating_add(item.total));
        }
    }
    Ok(subtotals)
}

struct ItemFrame<'a> {
    depth: usize,
    item: Option<&'a EkapItem>,
    saw_offer: bool,
    offer: Option<OfferFrame>,
}

struct OfferFrame {
    depth: usize,
    price_written: bool,
    total_written: bool,
}

struct Rewrite<'a> {
    items: &'a [EkapItem],
    group_subtotals: Vec<Option<Decimal>>,
    aggregate: String,
    depth: usize,
    items_seen: usize,
    groups_seen: usize,
    tender_done: bool,
    lot_done: bool,
    item: Option<ItemFrame<'a>>,
    /// Set while dropping the old content of a rewritten text element.
    skip_until: Option<usize>,
}

impl<'a> Rewrite<'a> {
    fn handle(&mut self, event: Event<'_>, writer: &mut Writer<Vec<u8>>) -> Result<(), EkapError> {
        if let Some(until) = self.skip_until {
            match event {
                Event::Start(_) => self.depth += 1,
                Event::End(e) => {
                    if self.depth == until {
                        self.skip_until = None;
                        writer.write_event(Event::End(e))?;
                    }
                    self.depth -= 1;
                }
                _ => {}
            }
            return Ok(());
        }

        match event {
            Event::Start(e) => {
                self.depth += 1;
                self.on_start(e, writer)
            }
            Event::Empty(e) => self.on_empty(e, writer),
            Event::End(e) => {
                self.on_end(writer)?;
                writer.write_event(Event::End(e))?;
                self.depth = self.depth.saturating_sub(1);
                Ok(())
            }
            other => {
                writer.write_event(other)?;
                Ok(())
            }
        }
    }

    fn on_start(
        &mut self,
        e: BytesStart<'_>,
        writer: &mut Writer<Vec<u8>>,
    ) -> Result<(), EkapError> {
        let local = e.local_name();
        let local = local.as_ref();

        if local == schema::ITEM.as_bytes() {
            let item = self.next_item();
            self.item = Some(ItemFrame {
                depth: self.depth,
                item,
                saw_offer: false,
                offer: None,
            });
            writer.write_event(Event::Start(e))?;
            return Ok(());
        }

        if local == schema::OFFER.as_bytes() {
            if let Some(frame) = self.item.as_mut().filter(|f| !f.saw_offer) {
                if frame.item.is_some_and(|item| item.shape != OfferShape::Priced) {
                    log::warn!("item was parsed without an offer but has one in the markup");
                }
                frame.saw_offer = true;
                frame.offer = Some(OfferFrame {
                    depth: self.depth,
                    price_written: false,
                    total_written: false,
                });
            }
            writer.write_event(Event::Start(e))?;
            return Ok(());
        }

        if let Some(value) = self.offer_value_for(local) {
            writer.write_event(Event::Start(e))?;
            writer.write_event(Event::Text(BytesText::new(&value)))?;
            self.skip_until = Some(self.depth);
            return Ok(());
        }

        match self.container_total_for(local) {
            Some((attr, value)) => {
                let patched = with_attribute(&e, attr, &value)?;
                writer.write_event(Event::Start(patched.unwrap_or(e)))?;
            }
            None => writer.write_event(Event::Start(e))?,
        }
        Ok(())
    }

    fn on_empty(
        &mut self,
        e: BytesStart<'_>,
        writer: &mut Writer<Vec<u8>>,
    ) -> Result<(), EkapError> {
        let local = e.local_name();
        let local = local.as_ref();

        if local == schema::ITEM.as_bytes() {
            match self.next_item() {
                Some(item) => {
                    let end = e.to_end().into_owned();
                    writer.write_event(Event::Start(e))?;
                    write_synthesized_offer(item, writer)?;
                    writer.write_event(Event::End(end))?;
                }
                None => writer.write_event(Event::Empty(e))?,
            }
            return Ok(());
        }

        if local == schema::OFFER.as_bytes() {
            if let Some(frame) = self.item.as_mut() {
                frame.saw_offer = true;
            }
            writer.write_event(Event::Empty(e))?;
            return Ok(());
        }

        // `<Fiyat/>` sits one level below the offer without opening a level of its own.
        self.depth += 1;
        let value = self.offer_value_for(local);
        self.depth -= 1;
        if let Some(value) = value {
            let end = e.to_end().into_owned();
            writer.write_event(Event::Start(e))?;
            writer.write_event(Event::Text(BytesText::new(&value)))?;
            writer.write_event(Event::End(end))?;
            return Ok(());
        }

        match self.container_total_for(local) {
            Some((attr, value)) => {
                let patched = with_attribute(&e, attr, &value)?;
                writer.write_event(Event::Empty(patched.unwrap_or(e)))?;
            }
            None => writer.write_event(Event::Empty(e))?,
        }
        Ok(())
    }

    /// Called before the end tag at `self.depth` is written.
    fn on_end(&mut self, writer: &mut Writer<Vec<u8>>) -> Result<(), EkapError> {
        let depth = self.depth;
        let Some(frame) = self.item.as_mut() else {
            return Ok(());
        };

        if frame.offer.as_ref().is_some_and(|o| o.depth == depth) {
            frame.offer = None;
            return Ok(());
        }

        if frame.depth == depth {
            if let Some(item) = frame.item.filter(|_| !frame.saw_offer) {
                write_synthesized_offer(item, writer)?;
            }
            self.item = None;
        }
        Ok(())
    }

    fn next_item(&mut self) -> Option<&'a EkapItem> {
        let item = self.items.get(self.items_seen);
        self.items_seen += 1;
        if item.is_none() {
            log::warn!("markup has more item nodes than the document; extra items left as-is");
        }
        item
    }

    /// New text for `Fiyat` / `KalemTeklifToplam` when the element at `self.depth` is a direct
    /// child of the current item's offer and has not been rewritten yet.
    fn offer_value_for(&mut self, local: &[u8]) -> Option<String> {
        let depth = self.depth;
        let frame = self.item.as_mut()?;
        let item = frame.item?;
        let offer = frame.offer.as_mut().filter(|o| o.depth + 1 == depth)?;

        if local == schema::OFFER_PRICE.as_bytes() && !offer.price_written {
            offer.price_written = true;
            Some(ekap_number::format_money(item.price))
        } else if local == schema::OFFER_TOTAL.as_bytes() && !offer.total_written {
            offer.total_written = true;
            Some(ekap_number::format_money(item.total))
        } else {
            None
        }
    }

    /// The total attribute to set on a tender, lot or item-group node.
    fn container_total_for(&mut self, local: &[u8]) -> Option<(&'static str, String)> {
        if local == schema::ITEM_GROUP.as_bytes() {
            let subtotal = self.group_subtotals.get(self.groups_seen).copied().flatten();
            self.groups_seen += 1;
            return subtotal.map(|v| (schema::ITEM_GROUP_TOTAL, ekap_number::format_money(v)));
        }
        if local == schema::LOT.as_bytes() && !self.lot_done {
            self.lot_done = true;
            return Some((schema::LOT_TOTAL, self.aggregate.clone()));
        }
        if local == schema::TENDER.as_bytes() && !self.tender_done {
            self.tender_done = true;
            return Some((schema::TENDER_TOTAL, self.aggregate.clone()));
        }
        None
    }
}

fn write_synthesized_offer(item: &EkapItem, writer: &mut Writer<Vec<u8>>) -> Result<(), EkapError> {
    if item.shape != OfferShape::Unpriced {
        log::warn!(
            "item {} was parsed with an offer but none was found in the markup",
            item.index
        );
    }

    writer.write_event(Event::Start(BytesStart::new(schema::OFFER)))?;
    for (name, value) in synthesized_offer_fields(item) {
        if value.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new(name)))?;
        } else {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            writer.write_event(Event::Text(BytesText::new(&value)))?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new(schema::OFFER)))?;
    Ok(())
}

/// Children of a synthesized `Teklif`, in the order the platform writes them.
fn synthesized_offer_fields(item: &EkapItem) -> [(&'static str, String); 17] {
    [
        ("TeklifId", item.index.to_string()),
        ("ManuelEkleme", "true".to_string()),
        (schema::OFFER_CURRENCY, item.currency.clone()),
        (schema::OFFER_PRODUCT_CODE, item.product_code.clone()),
        (schema::OFFER_PRODUCT_NAME, item.product_name.clone()),
        (schema::ITEM_QUANTITY, item.quantity_text.clone()),
        (schema::ITEM_UNIT, item.unit.clone()),
        (schema::OFFER_PRICE, ekap_number::format_money(item.price)),
        ("Aciklama", String::new()),
        ("IslemTanim", String::new()),
        ("KalemId", item.item_id.clone()),
        ("FirmaBayiTur", String::new()),
        ("FirmaBayiNo", String::new()),
        ("FirmaTicariAd", String::new()),
        (schema::OFFER_TOTAL, ekap_number::format_money(item.total)),
        (schema::ITEM_PERSONNEL_SERVICE, item.personnel_service.clone()),
        (schema::ITEM_WORK_ITEM_TYPE, item.work_item_type.clone()),
    ]
}

/// Copy of `e` with attribute `key` set to `value` (appended if absent), or `None` when it
/// already holds exactly that value.
fn with_attribute(
    e: &BytesStart<'_>,
    key: &str,
    value: &str,
) -> Result<Option<BytesStart<'static>>, EkapError> {
    let mut attrs = Vec::new();
    let mut found = false;
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            if attr.value.as_ref() == value.as_bytes() {
                return Ok(None);
            }
            found = true;
            attrs.push((attr.key.as_ref().to_vec(), value.as_bytes().to_vec()));
        } else {
            attrs.push((attr.key.as_ref().to_vec(), quote_safe(attr.value.as_ref())));
        }
    }
    if !found {
        attrs.push((key.as_bytes().to_vec(), value.as_bytes().to_vec()));
    }

    let mut patched = e.to_owned();
    patched.clear_attributes();
    for (k, v) in &attrs {
        patched.push_attribute((k.as_slice(), v.as_slice()));
    }
    Ok(Some(patched))
}

/// Raw attribute values are re-emitted inside double quotes; a value that was single-quoted in
/// the source may contain a bare `"`.
fn quote_safe(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    for &b in raw {
        if b == b'"' {
            out.extend_from_slice(b"&quot;");
        } else {
            out.push(b);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn patched(tag: &str, key: &str, value: &str) -> Option<String> {
        let e = BytesStart::from_content(tag, tag.find(' ').unwrap_or(tag.len()));
        with_attribute(&e, key, value)
            .unwrap()
            .map(|p| String::from_utf8(p.to_vec()).unwrap())
    }

    #[test]
    fn with_attribute_replaces_in_place_and_appends_when_missing() {
        assert_eq!(
            patched(
                r#"Ihale Ad="x" IhaleTeklifToplam="0,00" IKNYil="2024""#,
                "IhaleTeklifToplam",
                "5,00"
            )
            .as_deref(),
            Some(r#"Ihale Ad="x" IhaleTeklifToplam="5,00" IKNYil="2024""#)
        );
        assert_eq!(
            patched(r#"Kisim No="1""#, "KisimTeklifToplam", "5,00").as_deref(),
            Some(r#"Kisim No="1" KisimTeklifToplam="5,00""#)
        );
    }

    #[test]
    fn with_attribute_leaves_matching_value_alone() {
        assert_eq!(patched(r#"Kisim KisimTeklifToplam="5,00""#, "KisimTeklifToplam", "5,00"), None);
    }

    #[test]
    fn with_attribute_keeps_escapes_and_requotes() {
        assert_eq!(
            patched(r#"Ihale Ad='A &amp; "B"'"#, "IhaleTeklifToplam", "1,00").as_deref(),
            Some(r#"Ihale Ad="A &amp; &quot;B&quot;" IhaleTeklifToplam="1,00""#)
        );
    }
}
