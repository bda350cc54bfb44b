#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::ZipWriter;

pub const PASSWORD: &str = "ekap-2024";

/// Every item priced and every stored total already consistent, so a save must reproduce the
/// markup byte for byte.
pub const PRICED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<KIKEKAP xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" Surum="3">
  <!-- platform export -->
  <Ihale IKNYil="2024" IKNSayi="1234567" Ad="Kırtasiye Alımı" SonTeklifTarihSaat="2024-05-10T10:00:00" IhaleTeklifToplam="1.645,00" IhaleTeklifToplamYazi="BİNALTIYÜZKIRKBEŞ TRY">
    <Kisim No="1" KisimTeklifToplam="1.645,00">
      <IhaleKalemler KalemTeklifToplam="1.645,00">
        <IhaleKalem SiraNo="1" Id="9001" Kod="A1" Ad="Kağıt" Aciklama="A4 fotokopi kağıdı &amp; zarf" Adet="10" TicariSunumSekli="Paket" PersonelHizmetAlimMi="0">
          <IsKalemiNo>30197630</IsKalemiNo>
          <IsKalemiTuru>Mal</IsKalemiTuru>
          <Teklif>
            <TeklifId>1</TeklifId>
            <ParaBirimi>TRY</ParaBirimi>
            <UrunKodu>P-80</UrunKodu>
            <UrunAd>Kağıt 80 gr</UrunAd>
            <Fiyat>142,50</Fiyat>
            <KalemTeklifToplam>1.425,00</KalemTeklifToplam>
          </Teklif>
        </IhaleKalem>
        <IhaleKalem SiraNo="2" Id="9002" Kod="A2" Ad="Toner" Adet="4" TicariSunumSekli="Adet">
          <IsKalemiNo>30125110</IsKalemiNo>
          <Teklif><ParaBirimi>TRY</ParaBirimi><Fiyat>55,00</Fiyat><KalemTeklifToplam>220,00</KalemTeklifToplam></Teklif>
        </IhaleKalem>
      </IhaleKalemler>
    </Kisim>
  </Ihale>
</KIKEKAP>
"#;

/// A priced item with a wrong stored total, an unpriced item, an unpriced empty item in a
/// second group, repeated `SiraNo` values and no stored tender or lot totals.
pub const MIXED: &str = concat!(
    r#"<KIKEKAP><Ihale IKNYil="2025" IKNSayi="77" Ad="Yol Yapım" IhaleTeklifToplamYazi="">"#,
    r#"<Kisim No="1">"#,
    r#"<IhaleKalemler KalemTeklifToplam="999,00">"#,
    r#"<IhaleKalem SiraNo="5" Id="71" Adet="1.000" TicariSunumSekli="m3" PersonelHizmetAlimMi="1">"#,
    r#"<IsKalemiNo>KTB.15.150.1003</IsKalemiNo>"#,
    r#"<Teklif><ParaBirimi>TRY</ParaBirimi><Fiyat>12,5</Fiyat><KalemTeklifToplam>1,00</KalemTeklifToplam></Teklif>"#,
    r#"</IhaleKalem>"#,
    r#"<IhaleKalem SiraNo="5" Id="72" Adet="2,5" TicariSunumSekli="ton">"#,
    r#"<IsKalemiNo>KTB.15.150.1004</IsKalemiNo><IsKalemiTuru>Yapım</IsKalemiTuru>"#,
    r#"</IhaleKalem>"#,
    r#"</IhaleKalemler>"#,
    r#"<IhaleKalemler>"#,
    r#"<IhaleKalem SiraNo="1" Id="73" Adet="3" TicariSunumSekli="Adet"/>"#,
    r#"</IhaleKalemler>"#,
    r#"</Kisim></Ihale></KIKEKAP>"#,
);

pub const SIDE: &str = r#"<DosyaBilgileri Surum="2.1" Olusturan="EKAP"/>"#;

pub fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, body) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// An encrypted `.ekap` file as the platform would hand it out.
pub fn ekap_file(main: &str, side: Option<&str>) -> Vec<u8> {
    let mut entries = vec![(ekap_document::MAIN_ENTRY, main)];
    if let Some(side) = side {
        entries.push((ekap_document::SIDE_ENTRY, side));
    }
    ekap_crypto::encrypt(&build_zip(&entries), PASSWORD)
}
