//! Barcode reading
//!
//! The image is binarized once and scanned line by line. Every scan line is
//! decoded in both directions, so symbols rotated by 180 degrees are found
//! too; with `try_rotate` the columns are scanned as well. Detections of the
//! same symbol on neighbouring lines are merged into one result whose
//! `line_count` tells how many lines confirmed it.
//!
//! ```
//! use zxbridge::{read_barcodes, ImageFormat, ImageView, ReaderOptions};
//!
//! let blank = vec![0xFFu8; 64 * 64];
//! let view = ImageView::new(&blank, 64, 64, ImageFormat::LUM).unwrap();
//! assert!(read_barcodes(&view, &ReaderOptions::default()).is_empty());
//! ```

use std::borrow::Cow;

use log::{debug, trace};

use crate::{
    binarize::{BitImage, LumImage},
    decoders::{decode_row, DecodeContext, Decoded, Row},
    Barcode, Barcodes, ImageView, PointI, Position, ReaderOptions,
};

/// Images larger than this in either direction get a second, downscaled
/// pass when nothing was found.
const DOWNSCALE_THRESHOLD: usize = 500;
/// Scan lines tried without `try_harder`.
const MAX_LINES: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Rows,
    Columns,
}

/// One symbol followed across scan lines.
struct Track {
    decoded: Decoded,
    /// Reading direction in degrees: 0 and 180 along rows, 90 and 270 along
    /// columns.
    orientation: u16,
    /// Pixel range along the scan line, `end` exclusive.
    start: u32,
    end: u32,
    min_line: usize,
    max_line: usize,
    count: i32,
    required: i32,
}

impl Track {
    fn accepts(
        &self,
        d: &Decoded,
        orientation: u16,
        start: u32,
        end: u32,
        line: usize,
        gap: usize,
    ) -> bool {
        self.orientation == orientation
            && self.decoded.format == d.format
            && self.decoded.content == d.content
            && self.decoded.error.kind() == d.error.kind()
            && start < self.end
            && self.start < end
            && line + gap >= self.min_line
            && line <= self.max_line + gap
    }

    fn add(&mut self, start: u32, end: u32, line: usize) {
        self.start = self.start.min(start);
        self.end = self.end.max(end);
        self.min_line = self.min_line.min(line);
        self.max_line = self.max_line.max(line);
        self.count += 1;
    }

    /// Corners in image coordinates, starting at the top left of the symbol
    /// as it reads.
    fn position(&self) -> Position {
        let first = self.start as i32;
        let last = self.end as i32 - 1;
        let (lo, hi) = (self.min_line as i32, self.max_line as i32);
        let p = PointI::new;
        match self.orientation {
            0 => Position::new(p(first, lo), p(last, lo), p(last, hi), p(first, hi)),
            180 => Position::new(p(last, hi), p(first, hi), p(first, lo), p(last, lo)),
            90 => Position::new(p(hi, first), p(hi, last), p(lo, last), p(lo, first)),
            _ => Position::new(p(lo, last), p(lo, first), p(hi, first), p(hi, last)),
        }
    }
}

/// Lines to scan, middle first and then alternating above and below, plus
/// the distance between two of them.
fn scan_lines(height: usize, opts: &ReaderOptions) -> (Vec<usize>, usize) {
    let middle = height / 2;
    if opts.is_pure() {
        return (vec![middle], 1);
    }
    let step = (height >> if opts.try_harder() { 8 } else { 5 }).max(1);
    let max_lines = if opts.try_harder() { height } else { MAX_LINES };

    let mut lines = Vec::with_capacity(max_lines.min(height));
    for x in 0..max_lines {
        let distance = step * ((x + 1) / 2);
        let line = if x % 2 == 0 {
            middle.checked_add(distance).filter(|&l| l < height)
        } else {
            middle.checked_sub(distance)
        };
        match line {
            Some(l) => lines.push(l),
            None => break,
        }
    }
    (lines, step)
}

fn scan(bits: &BitImage, opts: &ReaderOptions) -> Vec<Track> {
    let ctx = DecodeContext::new(opts);
    let mut directions = vec![Direction::Rows];
    if opts.try_rotate() {
        directions.push(Direction::Columns);
    }

    let mut tracks: Vec<Track> = Vec::new();
    for direction in directions {
        let grid = match direction {
            Direction::Rows => Cow::Borrowed(bits),
            Direction::Columns => Cow::Owned(bits.transposed()),
        };
        let (forward, reversed) = match direction {
            Direction::Rows => (0, 180),
            Direction::Columns => (90, 270),
        };
        let (lines, step) = scan_lines(grid.height(), opts);
        let required = if opts.is_pure() {
            1
        } else {
            (opts.min_line_count() as usize).clamp(1, lines.len().max(1)) as i32
        };
        let gap = 2 * step;

        let mut add = |d: Decoded, orientation: u16, start: u32, end: u32, line: usize| {
            match tracks
                .iter_mut()
                .find(|t| t.accepts(&d, orientation, start, end, line, gap))
            {
                Some(track) => track.add(start, end, line),
                None => tracks.push(Track {
                    decoded: d,
                    orientation,
                    start,
                    end,
                    min_line: line,
                    max_line: line,
                    count: 1,
                    required,
                }),
            }
        };

        for &line in &lines {
            let pixels = grid.row(line);
            let n = pixels.len() as u32;

            let row = Row::from_bits(pixels.iter().copied());
            for d in decode_row(&row, &ctx) {
                let (start, end) = (row.start(d.begin), row.start(d.end));
                trace!("line {line} at {forward}: {:?} [{start}, {end})", d.format);
                add(d, forward, start, end, line);
            }

            let row = Row::from_bits(pixels.iter().rev().copied());
            for d in decode_row(&row, &ctx) {
                let (start, end) = (n - row.start(d.end), n - row.start(d.begin));
                trace!("line {line} at {reversed}: {:?} [{start}, {end})", d.format);
                add(d, reversed, start, end, line);
            }
        }
    }

    tracks.retain(|t| t.count >= t.required);
    tracks
}

fn collect(bits: &BitImage, opts: &ReaderOptions) -> Vec<Barcode> {
    scan(bits, opts)
        .into_iter()
        .map(|t| {
            let position = t.position();
            Barcode::from_decoded(t.decoded, position, t.count, opts.text_mode())
        })
        .filter(|b| opts.return_errors() || b.is_valid())
        .collect()
}

/// Find all barcodes in `image`.
///
/// Results are ordered by first detection and cut off at
/// `max_number_of_symbols` (0 meaning no limit). Nothing found is an empty
/// collection, not an error.
pub fn read_barcodes(image: &ImageView, opts: &ReaderOptions) -> Barcodes {
    let max = match opts.max_number_of_symbols() {
        0 => usize::MAX,
        n => n as usize,
    };
    let lum = LumImage::from_view(image);
    let bits = lum.binarize(opts.binarizer());

    let mut found = collect(&bits, opts);
    if opts.try_invert() && found.iter().filter(|b| b.is_valid()).count() < max {
        let inverted = collect(&bits.inverted(), opts);
        found.extend(inverted.into_iter().map(|mut b| {
            b.set_inverted(true);
            b
        }));
    }
    let large = lum.width().max(lum.height()) > DOWNSCALE_THRESHOLD;
    if opts.try_downscale() && found.is_empty() && large {
        debug!("nothing found at {}x{}, retrying downscaled", lum.width(), lum.height());
        let small = lum.downscaled().binarize(opts.binarizer());
        found = collect(&small, opts)
            .into_iter()
            .map(|mut b| {
                b.set_position(b.position().scaled(2));
                b
            })
            .collect();
    }

    found.truncate(max);
    debug!("found {} barcode(s) in {}x{} image", found.len(), lum.width(), lum.height());
    found.into_iter().collect()
}

/// First barcode [`read_barcodes`] would return.
pub fn read_barcode(image: &ImageView, opts: &ReaderOptions) -> Option<Barcode> {
    read_barcodes(image, &opts.clone().with_max_number_of_symbols(1))
        .into_iter()
        .next()
}
