use base64::{engine::general_purpose::STANDARD, Engine};

use crate::error::{MolscanError, Result};

pub const DATA_URI_PREFIX: &str = "data:";
pub const BASE64_ENCODING: &str = "base64";

/// A parsed `data:[<mediaType>][;<param>]...[;<encoding>],<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub media_type: Option<&'a str>,
    pub encoding: Option<&'a str>,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Split a data URI into its parts.
    ///
    /// The first `;` ends the media type, later `;` drop the buffered
    /// parameter (e.g. `charset=utf-8`), and the first `,` ends the encoding
    /// name. Everything after that comma is the payload.
    pub fn parse(value: &'a str) -> Result<Self> {
        let rest = value
            .strip_prefix(DATA_URI_PREFIX)
            .ok_or_else(|| MolscanError::UnknownEncoding("not a data URI".to_string()))?;

        let mut media_type = None;
        let mut start = 0;

        for (pos, ch) in rest.char_indices() {
            match ch {
                ';' => {
                    if media_type.is_none() {
                        media_type = Some(&rest[start..pos]);
                    }
                    start = pos + 1;
                }
                ',' => {
                    return Ok(Self {
                        media_type: media_type.filter(|m| !m.is_empty()),
                        encoding: Some(&rest[start..pos]).filter(|e| !e.is_empty()),
                        payload: &rest[pos + 1..],
                    });
                }
                _ => {}
            }
        }

        Ok(Self {
            media_type: media_type.filter(|m| !m.is_empty()),
            encoding: None,
            payload: "",
        })
    }

    pub fn is_base64(&self) -> bool {
        self.encoding
            .is_some_and(|e| e.eq_ignore_ascii_case(BASE64_ENCODING))
    }

    /// Decode the payload. Only base64 is supported.
    pub fn decode(&self) -> Result<Vec<u8>> {
        if !self.is_base64() {
            return Err(MolscanError::UnsupportedEncoding(
                self.encoding.unwrap_or("none").to_string(),
            ));
        }
        let compact: String = self
            .payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        Ok(STANDARD.decode(compact)?)
    }
}
