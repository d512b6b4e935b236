use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// A page body decoded to UTF-8, with the encoding that was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPage {
    pub html: String,
    pub encoding: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("failed to decode bytes as {encoding}")]
    Malformed { encoding: String },
}

/// Decodes raw page bytes to UTF-8.
///
/// Tries, in order: a byte-order mark, the Content-Type charset, and
/// statistical detection over the whole body. A declared charset that does
/// not actually decode the bytes falls through to detection instead of
/// failing, since servers misdeclare charsets routinely.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedPage, DecodeError> {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(declared) = content_type.and_then(declared_charset) {
        if let Ok(page) = decode_with(bytes, declared) {
            return Ok(page);
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

/// The charset named by a Content-Type header, if encoding_rs knows it.
fn declared_charset(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|part| {
            let part = part.trim();
            let prefix = part.get(..8)?;
            if !prefix.eq_ignore_ascii_case("charset=") {
                return None;
            }
            let label = part[8..].trim_matches([' ', '"', '\''].as_ref());
            Encoding::for_label(label.as_bytes())
        })
        .next()
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> Result<DecodedPage, DecodeError> {
    let (text, actual, had_errors) = enc.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            encoding: actual.name().to_string(),
        });
    }
    Ok(DecodedPage {
        html: text.into_owned(),
        encoding: actual.name().to_string(),
    })
}
