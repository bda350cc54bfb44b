use std::io::{Cursor, Read, Seek, Write};

use zip::write::FileOptions;
use zip::ZipArchive;

use crate::EkapError;

/// The bid markup. Required.
pub const MAIN_ENTRY: &str = "teklifDosyasi.xml";
/// File metadata written by the platform. Optional on read, always written.
pub const SIDE_ENTRY: &str = "dosyaBilgileri.xml";
/// Written in place of [`SIDE_ENTRY`] when the source container had none.
pub const SIDE_PLACEHOLDER: &str = "<KIKEKAP />";

/// Maximum uncompressed size accepted for a single entry.
///
/// The declared size is checked first and the read itself is capped, so forged ZIP metadata
/// cannot make us inflate more than this.
pub const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// The two markup entries of a decrypted container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedContainer {
    pub main_markup: String,
    pub side_markup: Option<String>,
}

/// Open a decrypted container and extract its two markup entries.
pub fn unpack(bytes: &[u8]) -> Result<UnpackedContainer, EkapError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let main_markup =
        read_entry(&mut archive, MAIN_ENTRY)?.ok_or(EkapError::MissingEntry(MAIN_ENTRY))?;
    let side_markup = read_entry(&mut archive, SIDE_ENTRY)?;
    if side_markup.is_none() {
        log::warn!("container has no {SIDE_ENTRY}; a placeholder will be written on save");
    }

    Ok(UnpackedContainer {
        main_markup,
        side_markup,
    })
}

/// Build a container holding `main_markup` and `side_markup` (or [`SIDE_PLACEHOLDER`]).
///
/// Entry timestamps are pinned, so the same markup always produces the same bytes.
pub fn pack(main_markup: &str, side_markup: Option<&str>) -> Result<Vec<u8>, EkapError> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut buffer);
        let options = FileOptions::<()>::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());

        zip.start_file(MAIN_ENTRY, options)?;
        zip.write_all(main_markup.as_bytes())?;

        zip.start_file(SIDE_ENTRY, options)?;
        zip.write_all(side_markup.unwrap_or(SIDE_PLACEHOLDER).as_bytes())?;

        zip.finish()?;
    }
    Ok(buffer.into_inner())
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &'static str,
) -> Result<Option<String>, EkapError> {
    let Some(index) = find_entry(archive, name) else {
        return Ok(None);
    };
    let mut file = archive.by_index(index)?;

    let declared = file.size();
    if declared > MAX_ENTRY_BYTES {
        return Err(EkapError::EntryTooLarge {
            entry: name.to_string(),
            size: declared,
            max: MAX_ENTRY_BYTES,
        });
    }

    let mut buf = Vec::with_capacity(declared as usize);
    file.by_ref()
        .take(MAX_ENTRY_BYTES + 1)
        .read_to_end(&mut buf)?;
    if buf.len() as u64 > MAX_ENTRY_BYTES {
        return Err(EkapError::EntryTooLarge {
            entry: name.to_string(),
            size: buf.len() as u64,
            max: MAX_ENTRY_BYTES,
        });
    }

    Ok(Some(String::from_utf8(buf)?))
}

/// Locate an entry by name, preferring an exact match and otherwise tolerating a leading `/`,
/// Windows `\` separators and ASCII case differences.
fn find_entry<R: Read + Seek>(archive: &ZipArchive<R>, name: &str) -> Option<usize> {
    let mut fallback = None;
    for (index, entry) in archive.file_names().enumerate() {
        if entry == name {
            return archive.index_for_name(entry).or(Some(index));
        }
        if fallback.is_none() && entry_names_equivalent(entry, name) {
            fallback = archive.index_for_name(entry).or(Some(index));
        }
    }
    fallback
}

fn entry_names_equivalent(a: &str, b: &str) -> bool {
    fn normalized(s: &str) -> impl Iterator<Item = u8> + '_ {
        s.bytes()
            .skip_while(|b| matches!(b, b'/' | b'\\'))
            .map(|b| if b == b'\\' { b'/' } else { b.to_ascii_lowercase() })
    }
    normalized(a).eq(normalized(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    use zip::ZipWriter;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options =
            FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, bytes) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(bytes).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn unpacks_both_entries() {
        let bytes = build_zip(&[
            (MAIN_ENTRY, b"<KIKEKAP/>"),
            (SIDE_ENTRY, b"<Dosya Surum=\"1\"/>"),
        ]);
        let unpacked = unpack(&bytes).unwrap();
        assert_eq!(unpacked.main_markup, "<KIKEKAP/>");
        assert_eq!(unpacked.side_markup.as_deref(), Some("<Dosya Surum=\"1\"/>"));
    }

    #[test]
    fn side_entry_is_optional() {
        let bytes = build_zip(&[(MAIN_ENTRY, b"<KIKEKAP/>")]);
        assert_eq!(unpack(&bytes).unwrap().side_markup, None);
    }

    #[test]
    fn missing_main_entry_is_a_format_error() {
        let bytes = build_zip(&[(SIDE_ENTRY, b"<KIKEKAP/>")]);
        let err = unpack(&bytes).unwrap_err();
        assert!(matches!(err, EkapError::MissingEntry(MAIN_ENTRY)), "{err:?}");
        assert!(err.is_format_error());
    }

    #[test]
    fn not_a_zip_is_a_format_error() {
        let err = unpack(b"PK\x03\x04 definitely not a zip").unwrap_err();
        assert!(matches!(err, EkapError::Zip(_)), "{err:?}");
    }

    #[test]
    fn tolerates_producer_name_variants() {
        let bytes = build_zip(&[("/TeklifDosyasi.XML", b"<a/>")]);
        assert_eq!(unpack(&bytes).unwrap().main_markup, "<a/>");
    }

    #[test]
    fn prefers_exact_entry_over_equivalent() {
        let bytes = build_zip(&[("TEKLIFDOSYASI.XML", b"<variant/>"), (MAIN_ENTRY, b"<exact/>")]);
        assert_eq!(unpack(&bytes).unwrap().main_markup, "<exact/>");
    }

    #[test]
    fn rejects_non_utf8_markup() {
        let bytes = build_zip(&[(MAIN_ENTRY, &[0x3C, 0xFF, 0xFE, 0x3E])]);
        assert!(matches!(unpack(&bytes), Err(EkapError::Utf8(_))));
    }

    #[test]
    fn pack_writes_placeholder_and_is_deterministic() {
        let a = pack("<KIKEKAP/>", None).unwrap();
        let b = pack("<KIKEKAP/>", None).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with(b"PK\x03\x04"));

        let unpacked = unpack(&a).unwrap();
        assert_eq!(unpacked.side_markup.as_deref(), Some(SIDE_PLACEHOLDER));
    }
}
