//! End-to-end extraction tests over synthetic form layouts.
//!
//! The fixtures model the geometry of the real intake form: device labels in
//! the left column (~0.10), dosing labels mid-right (~0.45), the refill
//! column at the right edge (>= 0.70), one row band per product row.

use rxtract::models::{OcrDocument, SelectionMark, TableGrid, TextFragment};
use rxtract::pipeline::ExtractionWarning;
use rxtract::{extract_prescriptions, ExtractorConfig, PrescriptionExtractor};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fragment(text: &str, page: u32, top: f64, left: f64) -> TextFragment {
    TextFragment {
        text: text.to_string(),
        page,
        top,
        left,
        width: 0.15,
        height: 0.01,
    }
}

fn mark(id: &str, page: u32, top: f64, left: f64) -> SelectionMark {
    SelectionMark {
        id: id.to_string(),
        page,
        top,
        left,
        selected: true,
        confidence: None,
    }
}

fn table(rows: &[&[&str]]) -> TableGrid {
    TableGrid {
        rows: rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    }
}

/// One Adult 150mg row pair: Sensoready device label and Loading dosing label.
fn adult_150_loading_document() -> OcrDocument {
    OcrDocument {
        fragments: vec![
            fragment("Sensoready® Pen (1x150 mg/mL)", 1, 0.30, 0.10),
            fragment(
                "Loading Dose: Inject 150 mg subcutaneously on Weeks 0, 1, 2, 3",
                1,
                0.30,
                0.45,
            ),
        ],
        marks: vec![mark("dev-1", 1, 0.30, 0.08), mark("dose-1", 1, 0.30, 0.43)],
        tables: vec![],
    }
}

#[test]
fn adult_150_loading_round_trip() {
    init_tracing();
    let result = extract_prescriptions(&adult_150_loading_document()).unwrap();

    assert_eq!(result.prescriptions.len(), 1);
    assert_eq!(result.valid_count, 1);
    assert!(result.is_valid);

    let prescription = &result.prescriptions[0];
    assert_eq!(prescription.product.value.as_deref(), Some("COSENTYX 150mg"));
    assert!(prescription.form.value.as_deref().unwrap().contains("Sensoready"));
    assert_eq!(prescription.dose_type.value.as_deref(), Some("Loading"));
    assert_eq!(prescription.patient_type.value.as_deref(), Some("Adult"));
    assert_eq!(prescription.quantity.value.as_deref(), Some("4"));
    assert_eq!(prescription.refills.value.as_deref(), Some("0"));
    assert!(prescription
        .sig
        .value
        .as_deref()
        .unwrap()
        .contains("Weeks 0, 1, 2, 3"));
}

#[test]
fn empty_document_is_invalid_without_error() {
    let result = extract_prescriptions(&OcrDocument::default()).unwrap();
    assert!(result.prescriptions.is_empty());
    assert_eq!(result.valid_count, 0);
    assert!(!result.is_valid);
}

#[test]
fn unrelated_mark_contributes_nothing() {
    let mut document = adult_150_loading_document();
    document
        .fragments
        .push(fragment("Please mail the completed form", 1, 0.60, 0.10));
    document.marks.push(mark("stray", 1, 0.60, 0.08));

    let result = extract_prescriptions(&document).unwrap();
    assert_eq!(result.prescriptions.len(), 1);
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, ExtractionWarning::UnclassifiableMark { id, .. } if id == "stray")));
}

#[test]
fn two_devices_one_dosing_yields_two_prescriptions() {
    let document = OcrDocument {
        fragments: vec![
            fragment("Sensoready® Pen (1x150 mg/mL)", 1, 0.30, 0.10),
            fragment("Prefilled Syringe (1x150 mg/mL)", 1, 0.32, 0.10),
            fragment(
                "Loading Dose: Inject 150 mg subcutaneously on Weeks 0, 1, 2, 3",
                1,
                0.30,
                0.45,
            ),
        ],
        marks: vec![
            mark("dev-pen", 1, 0.30, 0.08),
            mark("dev-syr", 1, 0.32, 0.08),
            mark("dose-1", 1, 0.30, 0.43),
        ],
        tables: vec![],
    };

    let result = extract_prescriptions(&document).unwrap();
    assert_eq!(result.prescriptions.len(), 2);
    let forms: Vec<&str> = result
        .prescriptions
        .iter()
        .map(|p| p.form.value.as_deref().unwrap())
        .collect();
    assert!(forms.iter().any(|f| f.contains("Sensoready")));
    assert!(forms.iter().any(|f| f.contains("Syringe")));
}

#[test]
fn section_outputs_are_cartesian_products() {
    // Adult 150mg: 2 devices x 2 dosings. Adult 300mg: 1 device x 1 dosing.
    let document = OcrDocument {
        fragments: vec![
            fragment("Sensoready® Pen (1x150 mg/mL)", 1, 0.30, 0.10),
            fragment("Prefilled Syringe (1x150 mg/mL)", 1, 0.32, 0.10),
            fragment(
                "Loading Dose: Inject 150 mg subcutaneously on Weeks 0, 1, 2, 3",
                1,
                0.30,
                0.45,
            ),
            fragment(
                "Maintenance dose: Inject 150 mg subcutaneously on Week 4, then every 4 weeks thereafter",
                1,
                0.32,
                0.45,
            ),
            fragment("UnoReady® Pen (1x300 mg/2 mL)", 1, 0.45, 0.10),
            fragment(
                "Maintenance Increase: Inject 300 mg subcutaneously every 2 weeks",
                1,
                0.45,
                0.45,
            ),
        ],
        marks: vec![
            mark("d1", 1, 0.30, 0.08),
            mark("d2", 1, 0.32, 0.08),
            mark("s1", 1, 0.30, 0.43),
            mark("s2", 1, 0.32, 0.43),
            mark("d3", 1, 0.45, 0.08),
            mark("s3", 1, 0.45, 0.43),
        ],
        tables: vec![],
    };

    let result = extract_prescriptions(&document).unwrap();
    // 2 x 2 for Adult 150mg, 1 x 1 for Adult 300mg.
    assert_eq!(result.prescriptions.len(), 5);

    let adult_150: Vec<_> = result
        .prescriptions
        .iter()
        .filter(|p| p.dosage.value.as_deref() == Some("150mg"))
        .collect();
    let adult_300: Vec<_> = result
        .prescriptions
        .iter()
        .filter(|p| p.dosage.value.as_deref() == Some("300mg"))
        .collect();
    assert_eq!(adult_150.len(), 4);
    assert_eq!(adult_300.len(), 1);

    // UnoReady at 300mg holds the full dose: maintenance increase is 2 x 1.
    assert_eq!(adult_300[0].quantity.value.as_deref(), Some("2"));
}

#[test]
fn table_refills_attach_to_matching_section() {
    let document = OcrDocument {
        fragments: vec![
            fragment("Sensoready® Pen (1x150 mg/mL)", 1, 0.30, 0.10),
            fragment(
                "Maintenance dose: Inject 150 mg subcutaneously on Week 4, then every 4 weeks thereafter",
                1,
                0.30,
                0.45,
            ),
        ],
        marks: vec![mark("dev", 1, 0.30, 0.08), mark("dose", 1, 0.30, 0.43)],
        tables: vec![table(&[
            &["PRODUCT INFORMATION (ADULT)"],
            &[
                "COSENTYX® 150 mg",
                "Maintenance dose: Inject 150 mg subcutaneously on Week 4, then every 4 weeks thereafter",
                "12 refills, or 5 refills",
            ],
        ])],
    };

    let result = extract_prescriptions(&document).unwrap();
    assert_eq!(result.prescriptions.len(), 1);
    assert_eq!(result.prescriptions[0].refills.value.as_deref(), Some("12 or 5"));
}

#[test]
fn loading_refills_stay_zero_despite_table_and_handwriting() {
    let mut document = adult_150_loading_document();
    // Handwritten digit in the refill column of the same row.
    document.fragments.push(fragment("7", 1, 0.305, 0.85));
    document.tables.push(table(&[&[
        "COSENTYX® 150 mg",
        "Loading dose: Inject 150 mg subcutaneously on Weeks 0, 1, 2, 3",
        "12 refills, or 7 refills",
    ]]));

    let result = extract_prescriptions(&document).unwrap();
    assert_eq!(result.prescriptions.len(), 1);
    assert_eq!(result.prescriptions[0].refills.value.as_deref(), Some("0"));
}

#[test]
fn handwritten_refill_recovered_spatially() {
    let document = OcrDocument {
        fragments: vec![
            fragment("Sensoready® Pen (1x150 mg/mL)", 1, 0.30, 0.10),
            fragment(
                "Maintenance dose: Inject 150 mg subcutaneously on Week 4, then every 4 weeks thereafter",
                1,
                0.30,
                0.45,
            ),
            fragment("12", 1, 0.30, 0.80),
            fragment("3", 1, 0.305, 0.88),
        ],
        marks: vec![mark("dev", 1, 0.30, 0.08), mark("dose", 1, 0.30, 0.43)],
        tables: vec![],
    };

    let result = extract_prescriptions(&document).unwrap();
    assert_eq!(result.prescriptions[0].refills.value.as_deref(), Some("12 or 3"));
}

#[test]
fn strength_fixes_patient_class() {
    let document = OcrDocument {
        fragments: vec![
            // Pediatric 75mg row.
            fragment("COSENTYX® 75 mg Prefilled Syringe (1x75 mg/mL)", 1, 0.60, 0.10),
            fragment(
                "Loading Dose: Inject 75 mg subcutaneously on Weeks 0, 1, 2, 3",
                1,
                0.60,
                0.45,
            ),
            // Adult 300mg row.
            fragment("Sensoready® Pen (2x150 mg/mL)", 1, 0.45, 0.10),
            fragment(
                "Maintenance dose: Inject 300 mg subcutaneously on Week 4, then every 4 weeks thereafter",
                1,
                0.45,
                0.45,
            ),
        ],
        marks: vec![
            mark("ped-dev", 1, 0.60, 0.08),
            mark("ped-dose", 1, 0.60, 0.43),
            mark("ad-dev", 1, 0.45, 0.08),
            mark("ad-dose", 1, 0.45, 0.43),
        ],
        tables: vec![],
    };

    let result = extract_prescriptions(&document).unwrap();
    assert_eq!(result.prescriptions.len(), 2);
    for prescription in &result.prescriptions {
        match prescription.dosage.value.as_deref() {
            Some("75mg") => {
                assert_eq!(prescription.patient_type.value.as_deref(), Some("Pediatric"));
                assert_eq!(prescription.quantity.value.as_deref(), Some("4"));
            }
            Some("300mg") => {
                assert_eq!(prescription.patient_type.value.as_deref(), Some("Adult"));
                // Maintenance at 300mg from a two-unit pen.
                assert_eq!(prescription.quantity.value.as_deref(), Some("2"));
            }
            other => panic!("unexpected dosage {other:?}"),
        }
    }
}

#[test]
fn weight_band_routes_150_to_pediatric_section() {
    let document = OcrDocument {
        fragments: vec![
            fragment(
                "COSENTYX® 150 mg (wt ≥50 kg) Prefilled Syringe (1x150 mg/mL)",
                1,
                0.70,
                0.10,
            ),
            fragment(
                "Maintenance dose: Inject 150 mg subcutaneously on Week 4, then every 4 weeks thereafter",
                1,
                0.70,
                0.45,
            ),
        ],
        marks: vec![mark("dev", 1, 0.70, 0.08), mark("dose", 1, 0.70, 0.43)],
        tables: vec![],
    };

    let result = extract_prescriptions(&document).unwrap();
    assert_eq!(result.prescriptions.len(), 1);
    assert_eq!(
        result.prescriptions[0].patient_type.value.as_deref(),
        Some("Pediatric")
    );
}

#[test]
fn one_sided_section_synthesizes_nothing() {
    let document = OcrDocument {
        fragments: vec![fragment("Sensoready® Pen (1x150 mg/mL)", 1, 0.30, 0.10)],
        marks: vec![mark("dev", 1, 0.30, 0.08)],
        tables: vec![],
    };

    let result = extract_prescriptions(&document).unwrap();
    assert!(result.prescriptions.is_empty());
    assert!(!result.is_valid);
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, ExtractionWarning::OneSidedSection { devices: 1, dosings: 0, .. })));
}

#[test]
fn extraction_is_deterministic() {
    let document = adult_150_loading_document();
    let extractor = PrescriptionExtractor::new(ExtractorConfig::default());
    let first = extractor.extract(&document).unwrap();
    let second = extractor.extract(&document).unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn json_payload_round_trip() {
    let payload = serde_json::to_string(&adult_150_loading_document()).unwrap();
    let document = OcrDocument::from_json(&payload).unwrap();
    let result = extract_prescriptions(&document).unwrap();
    assert_eq!(result.prescriptions.len(), 1);
}

#[test]
fn widened_refill_band_is_configurable() {
    // The handwritten digit sits 0.05 below the printed row; the default
    // band misses it, a widened one picks it up.
    let mut fragments = vec![
        fragment("Sensoready® Pen (1x150 mg/mL)", 1, 0.30, 0.10),
        fragment(
            "Maintenance dose: Inject 150 mg subcutaneously on Week 4, then every 4 weeks thereafter",
            1,
            0.30,
            0.45,
        ),
    ];
    fragments.push(fragment("4", 1, 0.35, 0.85));
    let document = OcrDocument {
        fragments,
        marks: vec![mark("dev", 1, 0.30, 0.08), mark("dose", 1, 0.30, 0.43)],
        tables: vec![],
    };

    let strict = extract_prescriptions(&document).unwrap();
    assert_eq!(strict.prescriptions[0].refills.value.as_deref(), Some("12 or 0"));

    let widened = PrescriptionExtractor::new(ExtractorConfig {
        refill_band_tolerance: 0.06,
        ..ExtractorConfig::default()
    })
    .extract(&document)
    .unwrap();
    assert_eq!(widened.prescriptions[0].refills.value.as_deref(), Some("12 or 4"));
}
