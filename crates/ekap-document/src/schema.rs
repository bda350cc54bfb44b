//! Names used by the bid-file markup (`teklifDosyasi.xml`).
//!
//! Elements are matched by local name; prefixes are ignored.

pub const TENDER: &str = "Ihale";
pub const TENDER_YEAR: &str = "IKNYil";
pub const TENDER_NUMBER: &str = "IKNSayi";
pub const TENDER_TITLE: &str = "Ad";
pub const TENDER_DEADLINE: &str = "SonTeklifTarihSaat";
pub const TENDER_TOTAL: &str = "IhaleTeklifToplam";
pub const TENDER_TOTAL_IN_WORDS: &str = "IhaleTeklifToplamYazi";

pub const LOT: &str = "Kisim";
pub const LOT_TOTAL: &str = "KisimTeklifToplam";

pub const ITEM_GROUP: &str = "IhaleKalemler";
pub const ITEM_GROUP_TOTAL: &str = "KalemTeklifToplam";

pub const ITEM: &str = "IhaleKalem";
pub const ITEM_SEQUENCE_NO: &str = "SiraNo";
pub const ITEM_ID: &str = "Id";
pub const ITEM_CODE: &str = "Kod";
pub const ITEM_NAME: &str = "Ad";
pub const ITEM_DESCRIPTION: &str = "Aciklama";
pub const ITEM_QUANTITY: &str = "Adet";
pub const ITEM_UNIT: &str = "TicariSunumSekli";
pub const ITEM_PERSONNEL_SERVICE: &str = "PersonelHizmetAlimMi";
pub const ITEM_WORK_ITEM_NO: &str = "IsKalemiNo";
pub const ITEM_WORK_ITEM_TYPE: &str = "IsKalemiTuru";

pub const OFFER: &str = "Teklif";
pub const OFFER_PRICE: &str = "Fiyat";
pub const OFFER_TOTAL: &str = "KalemTeklifToplam";
pub const OFFER_CURRENCY: &str = "ParaBirimi";
pub const OFFER_PRODUCT_CODE: &str = "UrunKodu";
pub const OFFER_PRODUCT_NAME: &str = "UrunAd";

pub const DEFAULT_CURRENCY: &str = "TRY";
