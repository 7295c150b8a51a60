//! Integration tests for the create → render → read cycle
//!
//! Images are composed with the `image` crate the same way a host
//! application would hand us decoded PNGs.

use image::{imageops, GrayImage, Luma};
use zxbridge::{
    create_barcode_from_text, read_barcode, read_barcodes, write_barcode_to_image, BarcodeFormat,
    Binarizer, ContentType, CreatorOptions, EanAddOnSymbol, ErrorType, ImageView, ReaderOptions,
    TextMode, WriterOptions,
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn render(format: BarcodeFormat, text: &str) -> GrayImage {
    let barcode = create_barcode_from_text(text, &CreatorOptions::new(format)).expect("create");
    write_barcode_to_image(&barcode, &WriterOptions::default())
        .expect("render")
        .to_gray_image()
        .expect("gray image")
}

fn read_all(img: &GrayImage, opts: &ReaderOptions) -> Vec<(BarcodeFormat, String)> {
    let view = ImageView::try_from(img).expect("view");
    read_barcodes(&view, opts)
        .iter()
        .map(|b| (b.format(), b.text()))
        .collect()
}

/// Place `images` next to each other on a white canvas.
fn side_by_side(images: &[GrayImage]) -> GrayImage {
    let width = images.iter().map(|i| i.width()).sum::<u32>() + 40;
    let height = images.iter().map(|i| i.height()).max().unwrap_or(0) + 40;
    let mut canvas = GrayImage::from_pixel(width, height, Luma([255]));
    let mut x = 20;
    for img in images {
        imageops::overlay(&mut canvas, img, x as i64, 20);
        x += img.width();
    }
    canvas
}

#[test]
fn test_ean8_round_trip() {
    init();
    let img = render(BarcodeFormat::EAN8, "96385074");
    let view = ImageView::try_from(&img).unwrap();
    let found = read_barcodes(&view, &ReaderOptions::default());
    assert_eq!(found.len(), 1);
    let b = found.get(0).unwrap();
    assert!(b.is_valid());
    assert_eq!(b.text(), "96385074");
    assert_eq!(b.format(), BarcodeFormat::EAN8);
    assert_eq!(b.symbology(), BarcodeFormat::EAN_UPC);
    assert_eq!(b.content_type(), ContentType::Text);
    assert_eq!(b.symbology_identifier(), "]E4");
    assert!(b.line_count() >= 2);
}

#[test]
fn test_every_creatable_format() {
    init();
    let cases = [
        (BarcodeFormat::EAN13, "590123412345", "5901234123457"),
        (BarcodeFormat::UPCA, "03600029145", "036000291452"),
        (BarcodeFormat::UPCE, "0123456", "01234565"),
        (BarcodeFormat::CODE128, "Hello, World!", "Hello, World!"),
        (BarcodeFormat::CODE39_STD, "CODE 39", "CODE 39"),
        (BarcodeFormat::CODE39_EXT, "Code 39", "Code 39"),
        (BarcodeFormat::ITF, "12345678", "12345678"),
        (BarcodeFormat::CODABAR, "A40156B", "A40156B"),
    ];
    for (format, input, expected) in cases {
        let img = render(format, input);
        let found = read_all(&img, &ReaderOptions::default());
        assert_eq!(found, vec![(format, expected.to_string())], "{format}");
    }
}

#[test]
fn test_max_number_of_symbols() {
    init();
    let img = side_by_side(&[
        render(BarcodeFormat::EAN8, "96385074"),
        render(BarcodeFormat::CODE128, "ZXB-2"),
    ]);

    let one = ReaderOptions::default().with_max_number_of_symbols(1);
    assert_eq!(read_all(&img, &one).len(), 1);

    let all = ReaderOptions::default().with_max_number_of_symbols(255);
    let mut found = read_all(&img, &all);
    found.sort();
    assert_eq!(
        found,
        vec![
            (BarcodeFormat::CODE128, "ZXB-2".to_string()),
            (BarcodeFormat::EAN8, "96385074".to_string()),
        ]
    );
}

#[test]
fn test_format_filter() {
    init();
    let img = side_by_side(&[
        render(BarcodeFormat::EAN8, "96385074"),
        render(BarcodeFormat::CODE128, "ZXB-2"),
    ]);
    let opts = ReaderOptions::default().with_formats("Code128".parse().unwrap());
    assert_eq!(read_all(&img, &opts), vec![(BarcodeFormat::CODE128, "ZXB-2".to_string())]);
}

#[test]
fn test_blank_image_reads_nothing() {
    init();
    let img = GrayImage::from_pixel(120, 80, Luma([255]));
    assert!(read_all(&img, &ReaderOptions::default()).is_empty());
}

#[test]
fn test_return_errors_on_malformed_symbol() {
    init();
    // a Code 39 symbol whose last data character is not the check character
    let code39 = CreatorOptions::new(BarcodeFormat::CODE39_STD);
    let barcode = create_barcode_from_text("CODE39X", &code39).unwrap();
    let img = write_barcode_to_image(&barcode, &WriterOptions::default())
        .unwrap()
        .to_gray_image()
        .unwrap();
    let strict = ReaderOptions::default()
        .with_formats(BarcodeFormat::CODE39_STD.into())
        .with_validate_optional_checksum(true);

    assert!(read_all(&img, &strict).is_empty());

    let view = ImageView::try_from(&img).unwrap();
    let found = read_barcodes(&view, &strict.clone().with_return_errors(true));
    assert!(!found.is_empty());
    let b = found.get(0).unwrap();
    assert!(!b.is_valid());
    assert_eq!(b.error_type(), ErrorType::Checksum);
    assert!(!b.error().message().is_empty());
}

#[test]
fn test_rotated_images() {
    init();
    let img = render(BarcodeFormat::CODE128, "rotate me");
    let cases = [
        (imageops::rotate90(&img), 90),
        (imageops::rotate180(&img), 180),
        (imageops::rotate270(&img), 270),
    ];
    for (rotated, degrees) in cases {
        let view = ImageView::try_from(&rotated).unwrap();
        let b = read_barcode(&view, &ReaderOptions::default()).expect("rotated symbol");
        assert_eq!(b.text(), "rotate me");
        assert_eq!(b.orientation(), degrees);

        if degrees != 180 {
            let no_rotate = ReaderOptions::default().with_try_rotate(false);
            assert!(read_barcode(&view, &no_rotate).is_none());
        }
    }
}

#[test]
fn test_image_view_rotation_undoes_image_rotation() {
    init();
    let img = imageops::rotate90(&render(BarcodeFormat::EAN13, "590123412345"));
    let view = ImageView::try_from(&img).unwrap().rotated(270).unwrap();
    let opts = ReaderOptions::default().with_try_rotate(false);
    let b = read_barcode(&view, &opts).unwrap();
    assert_eq!(b.text(), "5901234123457");
    assert_eq!(b.orientation(), 0);
}

#[test]
fn test_ean_add_on() {
    init();
    let img = render(BarcodeFormat::EAN13, "978020137962 51995");

    let ignore = ReaderOptions::default();
    assert_eq!(read_all(&img, &ignore), vec![(BarcodeFormat::EAN13, "9780201379624".to_string())]);

    let read = ReaderOptions::default().with_ean_add_on_symbol(EanAddOnSymbol::Read);
    let view = ImageView::try_from(&img).unwrap();
    let b = read_barcode(&view, &read).unwrap();
    assert_eq!(b.text(), "9780201379624 51995");
    assert_eq!(b.extra_value("AddOn"), Some("51995"));

    let plain = render(BarcodeFormat::EAN13, "978020137962");
    let require = ReaderOptions::default().with_ean_add_on_symbol(EanAddOnSymbol::Require);
    assert!(read_all(&plain, &require).is_empty());
}

#[test]
fn test_gs1_code128() {
    init();
    let opts = CreatorOptions::new(BarcodeFormat::CODE128).with_options("gs1");
    let barcode = create_barcode_from_text("0109501101530003\u{1D}10AB", &opts).unwrap();
    let img = write_barcode_to_image(&barcode, &WriterOptions::default()).unwrap();
    let b = read_barcode(&img.view().unwrap(), &ReaderOptions::default()).unwrap();
    assert_eq!(b.content_type(), ContentType::GS1);
    assert_eq!(b.symbology_identifier(), "]C1");
    assert_eq!(b.text(), "(01)09501101530003(10)AB");
    assert_eq!(b.text_with(TextMode::Plain), "0109501101530003\u{1D}10AB");
}

#[test]
fn test_inverted_and_binarizers() {
    init();
    let mut img = render(BarcodeFormat::ITF, "00123456");
    imageops::invert(&mut img);
    let view = ImageView::try_from(&img).unwrap();
    let b = read_barcode(&view, &ReaderOptions::default()).unwrap();
    assert!(b.is_inverted());
    assert_eq!(b.text(), "00123456");

    let img = render(BarcodeFormat::ITF, "00123456");
    for binarizer in [
        Binarizer::LocalAverage,
        Binarizer::GlobalHistogram,
        Binarizer::FixedThreshold,
        Binarizer::BoolCast,
    ] {
        let opts = ReaderOptions::default().with_binarizer(binarizer);
        assert_eq!(read_all(&img, &opts).len(), 1, "{binarizer:?}");
    }
}

#[test]
fn test_large_image_position() {
    init();
    let ean8 = CreatorOptions::new(BarcodeFormat::EAN8);
    let barcode = create_barcode_from_text("96385074", &ean8).unwrap();
    let img = write_barcode_to_image(&barcode, &WriterOptions::default().with_scale(8)).unwrap();
    assert!(img.width() > 500);
    let b = read_barcode(&img.view().unwrap(), &ReaderOptions::default()).unwrap();
    assert_eq!(b.text(), "96385074");
    assert_eq!(b.position().top_left.x, 80);
    assert_eq!(b.position().bottom_right.y, img.height() as i32 - 1);
}
