//! mzML scans, read through `mzdata`.

use std::io::Read;

use mzdata::io::{
    MzMLParserError,
    MzMLReader,
};
use mzdata::prelude::*;
use mzdata::spectrum::{
    ArrayType,
    MultiLayerSpectrum,
};
use tracing::{
    debug,
    warn,
};

use super::binary::BinaryDecodeError;
use crate::errors::DataReadingError;
use crate::models::spectrum::ScanRecord;

fn spectrum_context(spectrum: &MultiLayerSpectrum) -> String {
    format!("mzML spectrum '{}'", spectrum.id())
}

fn array_error(e: impl std::fmt::Display) -> DataReadingError {
    BinaryDecodeError::Unsupported(e.to_string()).into()
}

/// Converts one decoded mzML spectrum into a scan record.
///
/// Binary arrays that carry data but are not tagged as m/z or intensity
/// (for example when their type is only given through a param group)
/// are an error, never an empty scan.
fn spectrum_to_scan(spectrum: &MultiLayerSpectrum) -> Result<ScanRecord, DataReadingError> {
    let ms_level = spectrum.ms_level();
    if ms_level == 0 {
        return Err(DataReadingError::MissingField {
            field: "ms level",
            context: spectrum_context(spectrum),
        });
    }
    let start_time = spectrum
        .acquisition()
        .scans
        .first()
        .map(|event| event.start_time)
        .ok_or_else(|| DataReadingError::MissingField {
            field: "scan start time",
            context: spectrum_context(spectrum),
        })?;

    let precursor_mz = if ms_level >= 2 {
        spectrum.precursor().and_then(|p| {
            let selected = p.ion().map(|ion| ion.mz).unwrap_or(0.0);
            let target = p.isolation_window.target as f64;
            if selected > 0.0 {
                Some(selected)
            } else if target > 0.0 {
                Some(target)
            } else {
                None
            }
        })
    } else {
        None
    };

    let (mz_array, intensity_array) = match spectrum.raw_arrays() {
        Some(arrays) if !arrays.is_empty() => {
            if !arrays.has_array(&ArrayType::MZArray)
                || !arrays.has_array(&ArrayType::IntensityArray)
            {
                return Err(DataReadingError::MissingField {
                    field: "m/z or intensity array",
                    context: spectrum_context(spectrum),
                });
            }
            let mzs = arrays.mzs().map_err(array_error)?.into_owned();
            let intensities = arrays.intensities().map_err(array_error)?.into_owned();
            (mzs, intensities)
        }
        _ => (Vec::new(), Vec::new()),
    };

    Ok(ScanRecord {
        ms_level,
        // mzdata reports scan start times in minutes
        retention_time: (start_time * 60.0) as f32,
        precursor_mz,
        mz_array,
        intensity_array,
    })
}

/// Yields one [`ScanRecord`] per `<spectrum>` element, in file order.
///
/// Parser and array decoding errors end the stream with an `Err`. A file
/// that ends before the declared number of spectra is also an error.
pub struct MzMLScanReader<R: Read> {
    reader: MzMLReader<R>,
    n_read: u64,
    finished: bool,
}

impl<R: Read> MzMLScanReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: MzMLReader::new(reader),
            n_read: 0,
            finished: false,
        }
    }

    pub fn next_scan(&mut self) -> Result<Option<ScanRecord>, DataReadingError> {
        let mut spectrum = MultiLayerSpectrum::default();
        match self.reader.read_into(&mut spectrum) {
            Ok(_) => {
                self.n_read += 1;
                spectrum_to_scan(&spectrum).map(Some)
            }
            Err(MzMLParserError::EOF) => match self.reader.spectrum_count_hint() {
                Some(expected) if self.n_read < expected => Err(DataReadingError::MissingField {
                    field: "</spectrum>",
                    context: format!(
                        "mzML spectrum list (read {} of {} spectra before the end of file)",
                        self.n_read, expected
                    ),
                }),
                _ => {
                    debug!("Read {} mzML spectra", self.n_read);
                    Ok(None)
                }
            },
            Err(e) => {
                warn!("mzML parsing stopped after {} spectra", self.n_read);
                Err(e.into())
            }
        }
    }
}

impl<R: Read> Iterator for MzMLScanReader<R> {
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
