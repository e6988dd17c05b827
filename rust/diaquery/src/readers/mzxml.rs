//! Streaming scan reader for mzXML files.
//!
//! mzXML nests MS2 `<scan>` elements inside their parent MS1 scan. Scans are
//! emitted in document order of their opening tags, so a parent always comes
//! before its children.

use std::collections::VecDeque;
use std::io::BufRead;

use quick_xml::events::{
    BytesStart,
    Event,
};
use quick_xml::Reader;

use super::binary::{
    ArrayEncoding,
    BinaryDecodeError,
    Compression,
    Endianness,
    Precision,
};
use super::xml::{
    get_attribute,
    parse_attribute,
};
use crate::errors::DataReadingError;
use crate::models::spectrum::ScanRecord;

/// Parses an `xs:duration` such as `PT1M30.5S` into seconds.
///
/// Bare numbers are accepted and taken as seconds.
pub(crate) fn parse_duration_seconds(value: &str) -> Option<f64> {
    let value = value.trim();
    if let Ok(v) = value.parse::<f64>() {
        return Some(v);
    }
    let rest = value.strip_prefix('P')?;
    let mut total = 0.0;
    let mut number = String::new();
    let mut in_time = false;
    let mut seen_component = false;
    for c in rest.chars() {
        match c {
            'T' => in_time = true,
            '0'..='9' | '.' => number.push(c),
            'D' | 'H' | 'M' | 'S' => {
                let v: f64 = number.parse().ok()?;
                number.clear();
                seen_component = true;
                total += match (c, in_time) {
                    ('D', false) => v * 86400.0,
                    ('H', true) => v * 3600.0,
                    ('M', true) => v * 60.0,
                    ('S', true) => v,
                    _ => return None,
                };
            }
            _ => return None,
        }
    }
    if !number.is_empty() || !seen_component {
        return None;
    }
    Some(total)
}

#[derive(Debug, Default)]
struct PartialScan {
    num: String,
    ms_level: Option<u8>,
    retention_time: Option<f64>,
    precursor_mz: Option<f64>,
    emitted: bool,
}

impl PartialScan {
    fn from_element(e: &BytesStart) -> Result<Self, DataReadingError> {
        let retention_time = get_attribute(e, "retentionTime")?
            .as_deref()
            .and_then(parse_duration_seconds);
        Ok(Self {
            num: get_attribute(e, "num")?.unwrap_or_default(),
            ms_level: parse_attribute(e, "msLevel")?,
            retention_time,
            precursor_mz: None,
            emitted: false,
        })
    }

    fn to_record(&self, peaks: Vec<(f64, f32)>) -> Result<ScanRecord, DataReadingError> {
        let context = || format!("mzXML scan '{}'", self.num);
        let ms_level = self.ms_level.ok_or_else(|| DataReadingError::MissingField {
            field: "msLevel",
            context: context(),
        })?;
        let retention_time = self
            .retention_time
            .ok_or_else(|| DataReadingError::MissingField {
                field: "retentionTime",
                context: context(),
            })?;
        let (mz_array, intensity_array) = peaks.into_iter().unzip();
        Ok(ScanRecord {
            ms_level,
            retention_time: retention_time as f32,
            precursor_mz: if ms_level >= 2 { self.precursor_mz } else { None },
            mz_array,
            intensity_array,
        })
    }
}

#[derive(Debug)]
struct PeaksContext {
    encoding: ArrayEncoding,
    base64_data: String,
}

impl PeaksContext {
    fn from_element(e: &BytesStart) -> Result<Self, DataReadingError> {
        let precision = match get_attribute(e, "precision")?.as_deref().map(str::trim) {
            None | Some("32") => Precision::Float32,
            Some("64") => Precision::Float64,
            Some(other) => {
                return Err(BinaryDecodeError::Unsupported(format!("precision {}", other)).into());
            }
        };
        let endianness = match get_attribute(e, "byteOrder")?.as_deref() {
            None | Some("network") | Some("big") => Endianness::Big,
            Some("little") => Endianness::Little,
            Some(other) => {
                return Err(BinaryDecodeError::Unsupported(format!("byte order {}", other)).into());
            }
        };
        let compression = match get_attribute(e, "compressionType")?.as_deref() {
            None | Some("none") => Compression::None,
            Some("zlib") => Compression::Zlib,
            Some(other) => {
                return Err(BinaryDecodeError::Unsupported(format!("compression {}", other)).into());
            }
        };
        // Older files use pairOrder instead of contentType
        let content = match get_attribute(e, "contentType")? {
            Some(c) => Some(c),
            None => get_attribute(e, "pairOrder")?,
        };
        match content.as_deref() {
            None | Some("m/z-int") => {}
            Some(other) => {
                return Err(BinaryDecodeError::Unsupported(format!("content type {}", other)).into());
            }
        }
        Ok(Self {
            encoding: ArrayEncoding {
                precision,
                compression,
                endianness,
            },
            base64_data: String::new(),
        })
    }

    fn decode_pairs(&self) -> Result<Vec<(f64, f32)>, BinaryDecodeError> {
        let values = self.encoding.decode(&self.base64_data)?;
        if values.len() % 2 != 0 {
            return Err(BinaryDecodeError::Unsupported(format!(
                "{} values cannot form m/z-intensity pairs",
                values.len()
            )));
        }
        Ok(values
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1] as f32))
            .collect())
    }
}

/// Pull parser that yields one [`ScanRecord`] per `<scan>` element,
/// flattening the MS1/MS2 nesting.
pub struct MzXMLScanReader<R: BufRead> {
    reader: Reader<R>,
    stack: Vec<PartialScan>,
    peaks: Option<PeaksContext>,
    in_precursor: bool,
    ready: VecDeque<ScanRecord>,
    finished: bool,
}

impl<R: BufRead> MzXMLScanReader<R> {
    pub fn new(reader: R) -> Self {
        let mut xml_reader = Reader::from_reader(reader);
        xml_reader.config_mut().trim_text(true);
        Self {
            reader: xml_reader,
            stack: Vec::new(),
            peaks: None,
            in_precursor: false,
            ready: VecDeque::new(),
            finished: false,
        }
    }

    /// Emits the innermost open scan if it has not been emitted yet.
    fn emit_top(&mut self, peaks: Vec<(f64, f32)>) -> Result<(), DataReadingError> {
        if let Some(top) = self.stack.last_mut() {
            if !top.emitted {
                let record = top.to_record(peaks)?;
                top.emitted = true;
                self.ready.push_back(record);
            }
        }
        Ok(())
    }

    pub fn next_scan(&mut self) -> Result<Option<ScanRecord>, DataReadingError> {
        let mut buf = Vec::new();
        while self.ready.is_empty() {
            let event = self.reader.read_event_into(&mut buf)?;
            match event {
                Event::Start(ref e) => match e.name().as_ref() {
                    b"scan" => {
                        // A parent without peaks is emitted before its children
                        self.emit_top(Vec::new())?;
                        self.stack.push(PartialScan::from_element(e)?);
                    }
                    b"precursorMz" => self.in_precursor = true,
                    b"peaks" => self.peaks = Some(PeaksContext::from_element(e)?),
                    _ => {}
                },
                Event::Empty(ref e) => match e.name().as_ref() {
                    b"scan" => {
                        self.emit_top(Vec::new())?;
                        self.stack.push(PartialScan::from_element(e)?);
                        self.emit_top(Vec::new())?;
                        self.stack.pop();
                    }
                    b"peaks" => {
                        PeaksContext::from_element(e)?;
                        self.emit_top(Vec::new())?;
                    }
                    _ => {}
                },
                Event::Text(ref t) => {
                    if self.in_precursor {
                        let text = t.unescape()?;
                        if let Some(top) = self.stack.last_mut() {
                            if top.precursor_mz.is_none() {
                                top.precursor_mz = text.trim().parse().ok();
                            }
                        }
                    } else if let Some(ctx) = self.peaks.as_mut() {
                        ctx.base64_data.push_str(&t.unescape()?);
                    }
                }
                Event::End(ref e) => match e.name().as_ref() {
                    b"precursorMz" => self.in_precursor = false,
                    b"peaks" => {
                        if let Some(ctx) = self.peaks.take() {
                            let pairs = ctx.decode_pairs()?;
                            self.emit_top(pairs)?;
                        }
                    }
                    b"scan" => {
                        self.emit_top(Vec::new())?;
                        self.stack.pop();
                    }
                    _ => {}
                },
                Event::Eof => {
                    if let Some(open) = self.stack.last() {
                        return Err(DataReadingError::MissingField {
                            field: "</scan>",
                            context: format!(
                                "mzXML scan '{}' (unexpected end of file)",
                                open.num
                            ),
                        });
                    }
                    return Ok(None);
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(self.ready.pop_front())
    }
}

impl<R: BufRead> Iterator for MzXMLScanReader<R> {
    type Item = Result<ScanRecord, DataReadingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_scan() {
            Ok(Some(scan)) => Some(Ok(scan)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
