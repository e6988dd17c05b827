use crate::errors::DataReadingError;
use quick_xml::events::BytesStart;

pub(crate) fn get_attribute(e: &BytesStart, name: &str) -> Result<Option<String>, DataReadingError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| DataReadingError::Xml(quick_xml::Error::from(e)))?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = String::from_utf8_lossy(&attr.value).into_owned();
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Parses an attribute, unparseable values count as missing.
pub(crate) fn parse_attribute<T: std::str::FromStr>(
    e: &BytesStart,
    name: &str,
) -> Result<Option<T>, DataReadingError> {
    Ok(get_attribute(e, name)?.and_then(|v| v.trim().parse().ok()))
}
