use roxmltree::{Document, Node, ParsingOptions};

use crate::archive::UnpackedContainer;
use crate::model::{line_total, EkapDocument, EkapItem, OfferShape, TenderInfo};
use crate::schema;
use crate::EkapError;

pub(crate) const UTF8_BOM: &str = "\u{FEFF}";

/// Parse `teklifDosyasi.xml` markup into a document with no side-metadata entry.
pub fn parse_document(markup: &str) -> Result<EkapDocument, EkapError> {
    parse_markup(markup.to_string(), None)
}

/// Parse the markup of an unpacked container, keeping its side-metadata entry for the next save.
pub fn parse_container(container: UnpackedContainer) -> Result<EkapDocument, EkapError> {
    parse_markup(container.main_markup, container.side_markup)
}

fn parse_markup(markup: String, side_markup: Option<String>) -> Result<EkapDocument, EkapError> {
    let (tender, items) = {
        let doc = parse_tree(&markup)?;
        let root = doc.root();
        let tender = match root.descendants().find(|n| is_element(n, schema::TENDER)) {
            Some(node) => read_tender(node),
            None => {
                log::warn!("markup has no {} node; tender details are empty", schema::TENDER);
                TenderInfo::default()
            }
        };
        let items: Vec<EkapItem> = root
            .descendants()
            .filter(|n| is_element(n, schema::ITEM))
            .enumerate()
            .map(|(pos, node)| read_item(pos + 1, node))
            .collect();
        (tender, items)
    };

    log::debug!("parsed bid markup: {} items", items.len());
    Ok(EkapDocument::new(items, tender, markup, side_markup))
}

pub(crate) fn parse_tree(markup: &str) -> Result<Document<'_>, EkapError> {
    let text = markup.strip_prefix(UTF8_BOM).unwrap_or(markup);
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Ok(Document::parse_with_options(text, options)?)
}

pub(crate) fn is_element(node: &Node<'_, '_>, local_name: &str) -> bool {
    node.is_element() && node.tag_name().name() == local_name
}

fn read_tender(node: Node<'_, '_>) -> TenderInfo {
    let attr = |name: &str| node.attribute(name).unwrap_or_default().to_string();
    TenderInfo {
        year: attr(schema::TENDER_YEAR),
        number: attr(schema::TENDER_NUMBER),
        title: attr(schema::TENDER_TITLE),
        deadline: attr(schema::TENDER_DEADLINE),
        total: Default::default(),
        total_in_words: attr(schema::TENDER_TOTAL_IN_WORDS),
    }
}

fn read_item(index: usize, node: Node<'_, '_>) -> EkapItem {
    let attr = |name: &str| node.attribute(name).unwrap_or_default().to_string();
    let descendant_text = |name: &str| {
        node.descendants()
            .find(|n| is_element(n, name))
            .map(text_content)
            .unwrap_or_default()
    };

    let offer = node.descendants().find(|n| is_element(n, schema::OFFER));
    let offer_text = |name: &str| {
        offer
            .and_then(|o| o.children().find(|n| is_element(n, name)))
            .map(text_content)
            .unwrap_or_default()
    };

    let quantity_text = non_empty_or(attr(schema::ITEM_QUANTITY), "0");
    let quantity = ekap_number::parse(&quantity_text);
    let price = ekap_number::parse(&offer_text(schema::OFFER_PRICE));

    EkapItem {
        index,
        sequence_no: non_empty_or(attr(schema::ITEM_SEQUENCE_NO), &index.to_string()),
        item_id: attr(schema::ITEM_ID),
        work_item_no: descendant_text(schema::ITEM_WORK_ITEM_NO),
        work_item_type: descendant_text(schema::ITEM_WORK_ITEM_TYPE),
        code: attr(schema::ITEM_CODE),
        name: attr(schema::ITEM_NAME),
        description: attr(schema::ITEM_DESCRIPTION),
        quantity,
        quantity_text,
        unit: attr(schema::ITEM_UNIT),
        personnel_service: non_empty_or(attr(schema::ITEM_PERSONNEL_SERVICE), "0"),
        price,
        total: line_total(quantity, price),
        currency: non_empty_or(offer_text(schema::OFFER_CURRENCY), schema::DEFAULT_CURRENCY),
        product_code: offer_text(schema::OFFER_PRODUCT_CODE),
        product_name: offer_text(schema::OFFER_PRODUCT_NAME),
        shape: if offer.is_some() {
            OfferShape::Priced
        } else {
            OfferShape::Unpriced
        },
    }
}

fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rust_decimal_macros::dec;

    #[test]
    fn reads_prefixed_markup_by_local_name() {
        let markup = concat!(
            r#"<k:KIKEKAP xmlns:k="urn:kik"><k:Ihale IKNYil="2024" IKNSayi="42" Ad="Test">"#,
            r#"<k:IhaleKalem SiraNo="7" Adet="2"><k:Teklif><k:Fiyat>1.000,50</k:Fiyat></k:Teklif></k:IhaleKalem>"#,
            r#"</k:Ihale></k:KIKEKAP>"#,
        );
        let doc = parse_document(markup).unwrap();
        assert_eq!(doc.tender().registration_number(), "2024/42");
        let item = &doc.items()[0];
        assert_eq!(item.index, 1);
        assert_eq!(item.sequence_no, "7");
        assert_eq!(item.price, dec!(1000.50));
        assert_eq!(item.total, dec!(2001.00));
        assert_eq!(item.currency, "TRY");
        assert_eq!(item.shape, OfferShape::Priced);
    }

    #[test]
    fn missing_values_get_platform_defaults() {
        let doc = parse_document("<Ihale><IhaleKalem/></Ihale>").unwrap();
        let item = &doc.items()[0];
        assert_eq!(item.sequence_no, "1");
        assert_eq!(item.quantity_text, "0");
        assert_eq!(item.personnel_service, "0");
        assert_eq!(item.shape, OfferShape::Unpriced);
        assert_eq!(item.total, dec!(0));
    }

    #[test]
    fn tolerates_bom_and_doctype() {
        let markup = "\u{FEFF}<?xml version=\"1.0\"?><!DOCTYPE Ihale><Ihale IKNYil=\"2025\"/>";
        let doc = parse_document(markup).unwrap();
        assert_eq!(doc.tender().year, "2025");
        assert_eq!(doc.markup(), markup);
    }

    #[test]
    fn malformed_markup_is_a_format_error() {
        let err = parse_document("<Ihale><IhaleKalem></Ihale>").unwrap_err();
        assert!(matches!(err, EkapError::Markup(_)), "{err:?}");
        assert!(err.is_format_error());
    }
}
