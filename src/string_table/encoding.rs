use encoding_rs::Encoding;

use crate::language_utils::Language;

/// UTF-8 byte order mark
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Candidate codepages, tried in order after UTF-8 when no language is known.
/// Chinese tables come first since they are the bulk of the material.
pub static LEGACY_ENCODINGS: [&Encoding; 6] = [
    encoding_rs::GB18030,
    encoding_rs::BIG5,
    encoding_rs::SHIFT_JIS,
    encoding_rs::EUC_KR,
    encoding_rs::WINDOWS_1251,
    encoding_rs::WINDOWS_1252,
];

/// Result of decoding a raw table
#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
    pub bom: bool,
}

/// Codepages a table written in `language` is likely to use, most likely first
fn codepages_for(language: Language) -> Vec<&'static Encoding> {
    match language {
        Language::Chinese => vec![encoding_rs::GB18030, encoding_rs::BIG5],
        Language::Russian => vec![encoding_rs::WINDOWS_1251],
        Language::Korean => vec![encoding_rs::EUC_KR],
        Language::Japanese => vec![encoding_rs::SHIFT_JIS],
        Language::English | Language::Spanish | Language::Portuguese => vec![encoding_rs::WINDOWS_1252],
    }
}

/// Legacy codepages in the order they are tried for a table in `hint`
pub fn candidates(hint: Option<Language>) -> Vec<&'static Encoding> {
    let mut order: Vec<&'static Encoding> = hint.map(codepages_for).unwrap_or_default();
    for encoding in LEGACY_ENCODINGS {
        if !order.contains(&encoding) {
            order.push(encoding);
        }
    }
    order
}

/// Decode raw bytes with no idea of their language
pub fn decode(bytes: &[u8]) -> Decoded {
    decode_for(bytes, None)
}

/// Decode raw bytes with the first encoding that both decodes without errors
/// and encodes back to the identical bytes.
///
/// Codepages of `hint` are tried first. Most legacy pages accept almost any
/// byte sequence, so the order decides the result.
pub fn decode_for(bytes: &[u8], hint: Option<Language>) -> Decoded {
    if let Some(body) = bytes.strip_prefix(UTF8_BOM) {
        let (text, had_errors) = encoding_rs::UTF_8.decode_without_bom_handling(body);
        if !had_errors {
            return Decoded {
                text: text.into_owned(),
                encoding: encoding_rs::UTF_8,
                bom: true,
            };
        }
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Decoded {
            text: text.to_string(),
            encoding: encoding_rs::UTF_8,
            bom: false,
        };
    }

    for encoding in candidates(hint) {
        let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
        if had_errors {
            continue;
        }
        let (encoded, _, unmappable) = encoding.encode(&text);
        if !unmappable && encoded.as_ref() == bytes {
            log::debug!("String table decoded as {}", encoding.name());
            return Decoded {
                text: text.into_owned(),
                encoding,
                bom: false,
            };
        }
    }

    log::warn!("No codepage round-trips this string table, decoding as lossy UTF-8");
    Decoded {
        text: String::from_utf8_lossy(bytes).into_owned(),
        encoding: encoding_rs::UTF_8,
        bom: false,
    }
}

/// Encode text back into `encoding`, switching to UTF-8 when some character
/// has no representation in the legacy codepage.
pub fn encode(text: &str, encoding: &'static Encoding, bom: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + UTF8_BOM.len());

    if encoding == encoding_rs::UTF_8 {
        if bom {
            out.extend_from_slice(UTF8_BOM);
        }
        out.extend_from_slice(text.as_bytes());
        return out;
    }

    let (encoded, _, unmappable) = encoding.encode(text);
    if unmappable {
        log::warn!(
            "Translated text is not representable in {}, writing UTF-8",
            encoding.name()
        );
        out.extend_from_slice(text.as_bytes());
    } else {
        out.extend_from_slice(&encoded);
    }
    out
}
