use std::path::PathBuf;

use base64::prelude::*;
use byteorder::{
    BigEndian,
    ByteOrder,
    LittleEndian,
};
use diaquery::models::xic::extract_xic;
use diaquery::{
    ChromatogramBuilder,
    DataReadingError,
    DiaqueryError,
    MzTolerance,
    RawFormat,
    RawScanReader,
    SpectrumFilter,
    WindowTable,
};

/// (ms level, rt in seconds, precursor m/z)
type ScanSpec = (u8, f64, Option<f64>);

const PEAK_MZ: [f64; 3] = [450.0, 500.0, 785.4];
const PEAK_INTENSITY: [f32; 3] = [100.0, 300.0, 50.0];

fn mzml_arrays() -> (String, String) {
    let mut mz = vec![0u8; 8 * PEAK_MZ.len()];
    LittleEndian::write_f64_into(&PEAK_MZ, &mut mz);
    let mut int = vec![0u8; 4 * PEAK_INTENSITY.len()];
    LittleEndian::write_f32_into(&PEAK_INTENSITY, &mut int);
    (BASE64_STANDARD.encode(mz), BASE64_STANDARD.encode(int))
}

fn mzml_document(scans: &[ScanSpec]) -> String {
    let (mz, int) = mzml_arrays();
    let mut spectra = String::new();
    for (i, (level, rt, prec)) in scans.iter().enumerate() {
        let precursor = match prec {
            Some(p) => format!(
                r#"<precursorList count="1"><precursor><selectedIonList count="1"><selectedIon>
<cvParam cvRef="MS" accession="MS:1000744" name="selected ion m/z" value="{}"/>
</selectedIon></selectedIonList></precursor></precursorList>"#,
                p
            ),
            None => String::new(),
        };
        spectra.push_str(&format!(
            r#"<spectrum index="{i}" id="scan={i}" defaultArrayLength="3">
<cvParam cvRef="MS" accession="MS:1000511" name="ms level" value="{level}"/>
<scanList count="1"><scan>
<cvParam cvRef="MS" accession="MS:1000016" name="scan start time" value="{rt}" unitCvRef="UO" unitAccession="UO:0000010" unitName="second"/>
</scan></scanList>
{precursor}
<binaryDataArrayList count="2">
<binaryDataArray encodedLength="0">
<cvParam cvRef="MS" accession="MS:1000523" name="64-bit float" value=""/>
<cvParam cvRef="MS" accession="MS:1000576" name="no compression" value=""/>
<cvParam cvRef="MS" accession="MS:1000514" name="m/z array" value=""/>
<binary>{mz}</binary>
</binaryDataArray>
<binaryDataArray encodedLength="0">
<cvParam cvRef="MS" accession="MS:1000521" name="32-bit float" value=""/>
<cvParam cvRef="MS" accession="MS:1000576" name="no compression" value=""/>
<cvParam cvRef="MS" accession="MS:1000515" name="intensity array" value=""/>
<binary>{int}</binary>
</binaryDataArray>
</binaryDataArrayList>
</spectrum>
"#
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<indexedmzML xmlns="http://psi.hupo.org/ms/mzml">
<mzML version="1.1.0">
<cvList count="2">
<cv id="MS" fullName="Proteomics Standards Initiative Mass Spectrometry Ontology" URI="https://raw.githubusercontent.com/HUPO-PSI/psi-ms-CV/master/psi-ms.obo"/>
<cv id="UO" fullName="Unit Ontology" URI="https://raw.githubusercontent.com/bio-ontology-research-group/unit-ontology/master/unit.obo"/>
</cvList>
<run id="synthetic">
<spectrumList count="{}">
{}</spectrumList>
</run>
</mzML>
</indexedmzML>
"#,
        scans.len(),
        spectra
    )
}

fn mzxml_document(scans: &[ScanSpec]) -> String {
    let mut pairs = Vec::new();
    for (mz, int) in PEAK_MZ.iter().zip(PEAK_INTENSITY.iter()) {
        pairs.push(*mz as f32);
        pairs.push(*int);
    }
    let mut bytes = vec![0u8; 4 * pairs.len()];
    BigEndian::write_f32_into(&pairs, &mut bytes);
    let peaks = BASE64_STANDARD.encode(bytes);

    // MS2 scans are nested inside the preceding MS1 scan.
    let mut body = String::new();
    let mut open_ms1 = false;
    for (i, (level, rt, prec)) in scans.iter().enumerate() {
        let peaks_el = format!(
            r#"<peaks precision="32" byteOrder="network" contentType="m/z-int" compressionType="none">{}</peaks>"#,
            peaks
        );
        if *level == 1 {
            if open_ms1 {
                body.push_str("</scan>\n");
            }
            body.push_str(&format!(
                "<scan num=\"{}\" msLevel=\"1\" retentionTime=\"PT{}S\" peaksCount=\"3\">\n{}\n",
                i + 1,
                rt,
                peaks_el
            ));
            open_ms1 = true;
        } else {
            body.push_str(&format!(
                "<scan num=\"{}\" msLevel=\"{}\" retentionTime=\"PT{}S\" peaksCount=\"3\">\n<precursorMz>{}</precursorMz>\n{}\n</scan>\n",
                i + 1,
                level,
                rt,
                prec.unwrap_or_default(),
                peaks_el
            ));
        }
    }
    if open_ms1 {
        body.push_str("</scan>\n");
    }
    format!(
        r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<mzXML xmlns="http://sashimi.sourceforge.net/schema_revision/mzXML_3.2">
<msRun scanCount="{}">
{}</msRun>
</mzXML>
"#,
        scans.len(),
        body
    )
}

fn write_fixture(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("diaquery_raw_file_tests");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn builder() -> ChromatogramBuilder {
    let windows = WindowTable::try_new(&[(400.0, 410.0)]).unwrap();
    let filter = SpectrumFilter::try_new(100.0, 1000.0).unwrap();
    ChromatogramBuilder::new(windows, filter)
}

fn interleaved_cycles() -> Vec<ScanSpec> {
    [0.0, 10.0, 20.0, 30.0]
        .into_iter()
        .flat_map(|rt| [(1, rt, None), (2, rt, Some(405.0))])
        .collect()
}

#[test]
fn test_mzml_four_cycles_no_trim() {
    let path = write_fixture("four_cycles.mzML", &mzml_document(&interleaved_cycles()));
    let (chroms, stats) = builder().build_from_path(&path).unwrap();

    assert_eq!(chroms.ms1().rt_list(), &[0.0, 10.0, 20.0, 30.0]);
    assert_eq!(chroms.ms2()[0].chromatogram.rt_list(), &[0.0, 10.0, 20.0, 30.0]);
    assert_eq!(stats.leading_trims, 0);
    assert!(!stats.trailing_trim);
    assert_eq!(stats.ms1_scans, 4);
    assert_eq!(stats.ms2_scans, 4);
}

#[test]
fn test_mzml_leading_ms2_is_dropped() {
    let mut scans = vec![(2, 0.0, Some(405.0))];
    scans.extend(interleaved_cycles());
    let path = write_fixture("leading_ms2.mzML", &mzml_document(&scans));
    let (chroms, stats) = builder().build_from_path(&path).unwrap();

    assert_eq!(stats.leading_trims, 1);
    assert_eq!(chroms.ms1().num_cycles(), 4);
    assert_eq!(chroms.ms2()[0].chromatogram.num_cycles(), 4);
    assert_eq!(chroms.ms2()[0].chromatogram.rt_list(), &[0.0, 10.0, 20.0, 30.0]);
    assert!(chroms.is_aligned());
}

#[test]
fn test_mzxml_matches_mzml() {
    let scans = interleaved_cycles();
    let mzml = write_fixture("same.mzML", &mzml_document(&scans));
    let mzxml = write_fixture("same.mzXML", &mzxml_document(&scans));

    let (from_mzml, _) = builder().build_from_path(&mzml).unwrap();
    let (from_mzxml, _) = builder().build_from_path(&mzxml).unwrap();

    assert_eq!(from_mzml.ms1().rt_list(), from_mzxml.ms1().rt_list());
    let ms2_a = from_mzml.ms2_for_precursor(405.0).unwrap();
    let ms2_b = from_mzxml.ms2_for_precursor(405.0).unwrap();
    assert_eq!(ms2_a.chromatogram.rt_list(), ms2_b.chromatogram.rt_list());

    let tol = MzTolerance::Ppm(20.0);
    let xic_a = extract_xic(ms2_a.chromatogram.spectra(), 500.0, tol).unwrap();
    let xic_b = extract_xic(ms2_b.chromatogram.spectra(), 500.0, tol).unwrap();
    assert_eq!(xic_a, vec![300.0; 4]);
    assert_eq!(xic_a, xic_b);
}

#[test]
fn test_reader_yields_scans_in_order() {
    let scans = interleaved_cycles();
    let path = write_fixture("ordered.mzXML", &mzxml_document(&scans));
    let reader = RawScanReader::open(&path).unwrap();
    assert_eq!(reader.format(), RawFormat::MzXML);

    let read: Vec<_> = reader.collect::<Result<Vec<_>, _>>().unwrap();
    let levels: Vec<u8> = read.iter().map(|s| s.ms_level).collect();
    assert_eq!(levels, vec![1, 2, 1, 2, 1, 2, 1, 2]);
    assert!(read.iter().filter(|s| s.ms_level == 2).all(|s| s.precursor_mz == Some(405.0)));
}

#[test]
fn test_unsupported_extension_fails_before_reading() {
    let res = builder().build_from_path("/does/not/exist/run.raw");
    match res {
        Err(DiaqueryError::DataReadingError(DataReadingError::UnsupportedFormat {
            extension,
            ..
        })) => assert_eq!(extension.as_deref(), Some("raw")),
        other => panic!("Expected UnsupportedFormat, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_out_of_range_precursor_in_file() {
    let scans = vec![(1, 0.0, None), (2, 0.0, Some(900.0))];
    let path = write_fixture("out_of_range.mzML", &mzml_document(&scans));
    let res = builder().build_from_path(&path);
    assert!(matches!(
        res,
        Err(DiaqueryError::DataProcessingError(
            diaquery::DataProcessingError::OutOfRange { .. }
        ))
    ));
}
