//! Property-based tests
//!
//! Random content is created, rendered and read back; the result must
//! match what was created. Format tags must survive a trip through their
//! names.

use proptest::{prelude::*, test_runner::TestCaseError};

use crate::{
    create_barcode_from_text, read_barcodes, write_barcode_to_image, BarcodeFormat, CreatorOptions,
    ReaderOptions, WriterOptions,
};

/// Create, render and read `text` as `format`, returning the text read.
fn round_trip(format: BarcodeFormat, text: &str, options: &str) -> Result<String, TestCaseError> {
    let created = create_barcode_from_text(text, &CreatorOptions::new(format).with_options(options))
        .map_err(|e| TestCaseError::fail(format!("create {format} {text:?}: {e}")))?;
    let image = write_barcode_to_image(&created, &WriterOptions::default())
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
    let view = image.view().map_err(|e| TestCaseError::fail(e.to_string()))?;

    let opts = ReaderOptions::new()
        .with_formats(format.into())
        .with_try_rotate(false)
        .with_try_invert(false)
        .with_validate_optional_checksum(options.contains("checksum"));
    let found = read_barcodes(&view, &opts);
    prop_assert_eq!(found.len(), 1, "{} {:?}", format, text);
    let barcode = found.get(0).map_err(|e| TestCaseError::fail(e.to_string()))?;
    prop_assert_eq!(barcode.format(), format);
    prop_assert_eq!(barcode.bytes(), created.bytes());
    Ok(barcode.text())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_code128_roundtrip(text in "[ -~]{1,40}") {
        prop_assert_eq!(round_trip(BarcodeFormat::CODE128, &text, "")?, text);
    }

    /// Latin-1 text goes through FNC4.
    #[test]
    fn prop_code128_latin1_roundtrip(text in "[a-z\u{A0}-\u{FF}]{1,20}") {
        prop_assert_eq!(round_trip(BarcodeFormat::CODE128, &text, "")?, text);
    }

    #[test]
    fn prop_ean13_roundtrip(digits in "[0-9]{12}") {
        let text = round_trip(BarcodeFormat::EAN13, &digits, "")?;
        prop_assert!(text.starts_with(&digits));
        prop_assert_eq!(text.len(), 13);
    }

    #[test]
    fn prop_upce_roundtrip(digits in "[01][0-9]{6}") {
        let text = round_trip(BarcodeFormat::UPCE, &digits, "")?;
        prop_assert!(text.starts_with(&digits));
    }

    #[test]
    fn prop_code39_roundtrip(text in "[0-9A-Z \\-.$/]{1,20}", checksum in any::<bool>()) {
        let options = if checksum { "checksum" } else { "" };
        prop_assert_eq!(round_trip(BarcodeFormat::CODE39_STD, &text, options)?, text);
    }

    #[test]
    fn prop_itf_roundtrip(text in "([0-9]{2}){3,12}", wide in 2..=3) {
        let options = format!("wide={wide}");
        prop_assert_eq!(round_trip(BarcodeFormat::ITF, &text, &options)?, text);
    }

    #[test]
    fn prop_codabar_roundtrip(text in "[A-D][0-9\\-$:/.+]{1,16}[A-D]") {
        prop_assert_eq!(round_trip(BarcodeFormat::CODABAR, &text, "")?, text);
    }

    #[test]
    fn prop_format_name_roundtrip(index in 0usize..64) {
        let all = BarcodeFormat::list(BarcodeFormat::ALL);
        let format = all[index % all.len()];
        prop_assert_eq!(format.to_string().parse::<BarcodeFormat>().ok(), Some(format));
        let snake = format.to_string().to_lowercase().replace(' ', "_");
        prop_assert_eq!(snake.parse::<BarcodeFormat>().ok(), Some(format));
    }
}

#[test]
fn test_aggregates_list_only_elementary_formats() {
    for filter in [
        BarcodeFormat::ALL,
        BarcodeFormat::ALL_READABLE,
        BarcodeFormat::ALL_CREATABLE,
        BarcodeFormat::ALL_LINEAR,
        BarcodeFormat::ALL_MATRIX,
        BarcodeFormat::ALL_GS1,
        BarcodeFormat::ALL_RETAIL,
        BarcodeFormat::ALL_INDUSTRIAL,
    ] {
        let members = BarcodeFormat::list(filter);
        assert!(!members.is_empty(), "{filter}");
        assert!(members.iter().all(|f| f.is_elementary()), "{filter}");
    }
    assert!(BarcodeFormat::list(BarcodeFormat::ALL_LINEAR).iter().all(|f| f.is_linear()));
    assert!(BarcodeFormat::list(BarcodeFormat::ALL_MATRIX).iter().all(|f| f.is_matrix()));
    assert!(BarcodeFormat::list(BarcodeFormat::ALL_CREATABLE).iter().all(|f| f.is_readable()));
}
