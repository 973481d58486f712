//! End-to-end extraction runs.

use std::path::{Path, PathBuf};

use image::Rgba;

use wsi_patches::coords::CoordinateProvider;
use wsi_patches::extract::{Extractor, ExtractOptions, OutputNaming};
use wsi_patches::matching::SlideCoordinatePairing;
use wsi_patches::slide::LocalSlideSource;

use super::test_utils::{
    pattern_level, pattern_pixel, read_png, three_level_tiff, write_asap_xml, write_spot_csv,
    Annotation, MockSlide, MockSlideSource,
};

fn hotspot() -> CoordinateProvider {
    CoordinateProvider::XmlAnnotated {
        tag: "hotspot".into(),
    }
}

fn options(level: u32) -> ExtractOptions {
    ExtractOptions {
        level,
        overwrite: false,
        border_offset: false,
    }
}

fn pairing(
    naming: &OutputNaming,
    slide: &Path,
    coordinates: Option<&Path>,
) -> SlideCoordinatePairing {
    SlideCoordinatePairing {
        slide: slide.to_path_buf(),
        coordinates: coordinates.map(Path::to_path_buf),
        output_prefix: naming.prefix(slide),
    }
}

fn source_with(slides: &[&str]) -> MockSlideSource {
    slides.iter().fold(MockSlideSource::new(), |source, path| {
        source.with_slide(*path, MockSlide::patterned(512, 512, &[1.0, 4.0, 16.0]))
    })
}

#[test]
fn test_spot_export_from_tiff_file() {
    let dir = tempfile::tempdir().unwrap();
    let slide = dir.path().join("slide.tif");
    let csv = dir.path().join("slide.csv");
    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();
    three_level_tiff().write_to(&slide);
    write_spot_csv(&csv, &[("7", 100.0, 100.0, 10.0)]);

    let naming = OutputNaming::new(&out, 4);
    let extractor = Extractor::new(
        LocalSlideSource::new(),
        CoordinateProvider::CsvCircular,
        options(4),
    );
    let report = extractor.run(&[pairing(&naming, &slide, Some(&csv))]);

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.patches_written, 1);

    // Downsample 4 is level 1; the 20px square starts at level-1 (22, 22).
    let patch = read_png(&out.join("slide-level4-7.png"));
    assert_eq!(patch.dimensions(), (20, 20));
    assert_eq!(patch.get_pixel(0, 0).0, pattern_pixel(1, 22, 22));
    assert_eq!(patch.get_pixel(19, 19).0, pattern_pixel(1, 41, 41));
}

#[test]
fn test_whole_slide_export() {
    let dir = tempfile::tempdir().unwrap();
    let naming = OutputNaming::new(dir.path(), 16);
    let slide = PathBuf::from("/slides/whole.mrxs");

    let extractor = Extractor::new(
        source_with(&["/slides/whole.mrxs"]),
        CoordinateProvider::Unbounded,
        options(16),
    );
    let report = extractor.run(&[pairing(&naming, &slide, None)]);

    assert_eq!(report.patches_written, 1);
    let image = read_png(&dir.path().join("whole-level16.png"));
    assert_eq!(image.dimensions(), (32, 32));
    assert_eq!(image.get_pixel(31, 0).0, pattern_pixel(2, 31, 0));
}

#[test]
fn test_unmatched_level_falls_back_to_full_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let naming = OutputNaming::new(dir.path(), 8);
    let slide = PathBuf::from("/slides/whole.mrxs");

    let extractor = Extractor::new(
        source_with(&["/slides/whole.mrxs"]),
        CoordinateProvider::Unbounded,
        options(8),
    );
    let report = extractor.run(&[pairing(&naming, &slide, None)]);

    assert_eq!(report.failed(), 0);
    let image = read_png(&dir.path().join("whole-level8.png"));
    assert_eq!(image.dimensions(), (512, 512));
}

#[test]
fn test_level_zero_exports_full_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let naming = OutputNaming::new(dir.path(), 0);
    let slide = PathBuf::from("/slides/whole.mrxs");

    let extractor = Extractor::new(
        source_with(&["/slides/whole.mrxs"]),
        CoordinateProvider::Unbounded,
        options(0),
    );
    let report = extractor.run(&[pairing(&naming, &slide, None)]);

    assert_eq!(report.failed(), 0);
    let image = read_png(&dir.path().join("whole-level0.png"));
    assert_eq!(image.dimensions(), (512, 512));
}

#[test]
fn test_border_offset_matches_shifted_coordinates() {
    let dir = tempfile::tempdir().unwrap();
    let slide_path = PathBuf::from("/slides/bordered.svs");
    let source = MockSlideSource::new().with_slide(
        slide_path.clone(),
        MockSlide::patterned(512, 512, &[1.0, 4.0]).with_bounds_offset(30.0, 20.0),
    );

    let raw_xml = dir.path().join("raw.xml");
    let shifted_xml = dir.path().join("shifted.xml");
    write_asap_xml(
        &raw_xml,
        &[Annotation::Rect {
            group: "hotspot",
            x: 10.0,
            y: 10.0,
            width: 40.0,
            height: 40.0,
        }],
    );
    write_asap_xml(
        &shifted_xml,
        &[Annotation::Rect {
            group: "hotspot",
            x: 40.0,
            y: 30.0,
            width: 40.0,
            height: 40.0,
        }],
    );

    let with_offset = dir.path().join("with_offset");
    let without_offset = dir.path().join("without_offset");
    std::fs::create_dir(&with_offset).unwrap();
    std::fs::create_dir(&without_offset).unwrap();

    let naming = OutputNaming::new(&with_offset, 1);
    let adjusted = Extractor::new(
        source.clone(),
        hotspot(),
        ExtractOptions {
            border_offset: true,
            ..options(1)
        },
    );
    adjusted.run(&[pairing(&naming, &slide_path, Some(&raw_xml))]);

    let naming = OutputNaming::new(&without_offset, 1);
    let plain = Extractor::new(source, hotspot(), options(1));
    plain.run(&[pairing(&naming, &slide_path, Some(&shifted_xml))]);

    let a = read_png(&with_offset.join("bordered-level1-hotspot.png"));
    let b = read_png(&without_offset.join("bordered-level1-hotspot.png"));
    assert_eq!(a.dimensions(), (40, 40));
    assert_eq!(a, b);
    assert_eq!(a.get_pixel(0, 0).0, pattern_pixel(0, 40, 30));
}

#[test]
fn test_out_of_bounds_stops_pairing_not_batch() {
    let dir = tempfile::tempdir().unwrap();
    let first_csv = dir.path().join("first.csv");
    let second_csv = dir.path().join("second.csv");
    write_spot_csv(
        &first_csv,
        &[
            ("1", 20.0, 20.0, 5.0),
            ("2", 500.0, 500.0, 10.0),
            ("3", 40.0, 40.0, 5.0),
        ],
    );
    write_spot_csv(&second_csv, &[("1", 20.0, 20.0, 5.0)]);

    let naming = OutputNaming::new(dir.path(), 4);
    let first = PathBuf::from("/slides/first.mrxs");
    let second = PathBuf::from("/slides/second.mrxs");
    let extractor = Extractor::new(
        source_with(&["/slides/first.mrxs", "/slides/second.mrxs"]),
        CoordinateProvider::CsvCircular,
        options(4),
    );
    let report = extractor.run(&[
        pairing(&naming, &first, Some(&first_csv)),
        pairing(&naming, &second, Some(&second_csv)),
    ]);

    assert_eq!(report.pairings, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].slide, first);
    assert!(report.failures[0].error.contains("exceeds"));

    // Spot 1 was written before spot 2 failed; spot 3 never ran.
    assert!(dir.path().join("first-level4-1.png").exists());
    assert!(!dir.path().join("first-level4-3.png").exists());
    assert!(dir.path().join("second-level4-1.png").exists());
    // Counters only include pairings that completed.
    assert_eq!(report.patches_written, 1);
}

#[test]
fn test_dot_annotation_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let xml = dir.path().join("a.xml");
    write_asap_xml(
        &xml,
        &[
            Annotation::Dot {
                group: "hotspot",
                x: 50.0,
                y: 50.0,
            },
            Annotation::Rect {
                group: "hotspot",
                x: 0.0,
                y: 0.0,
                width: 16.0,
                height: 8.0,
            },
        ],
    );

    let naming = OutputNaming::new(dir.path(), 1);
    let slide = PathBuf::from("/slides/a.mrxs");
    let extractor = Extractor::new(source_with(&["/slides/a.mrxs"]), hotspot(), options(1));
    let report = extractor.run(&[pairing(&naming, &slide, Some(&xml))]);

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.patches_rejected, 1);
    assert_eq!(report.patches_written, 1);
    assert!(!dir.path().join("a-level1-hotspot-0.png").exists());
    let image = read_png(&dir.path().join("a-level1-hotspot-1.png"));
    assert_eq!(image.dimensions(), (16, 8));
}

#[test]
fn test_zero_radius_spot_does_not_stop_pairing() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("spots.csv");
    write_spot_csv(&csv, &[("1", 20.0, 20.0, 0.0), ("2", 40.0, 40.0, 5.0)]);

    let naming = OutputNaming::new(dir.path(), 4);
    let slide = PathBuf::from("/slides/s.mrxs");
    let extractor = Extractor::new(
        source_with(&["/slides/s.mrxs"]),
        CoordinateProvider::CsvCircular,
        options(4),
    );
    let report = extractor.run(&[pairing(&naming, &slide, Some(&csv))]);

    assert_eq!(report.failed(), 0);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.patches_rejected, 1);
    assert_eq!(report.patches_written, 1);
    assert!(!dir.path().join("s-level4-1.png").exists());
    let patch = read_png(&dir.path().join("s-level4-2.png"));
    assert_eq!(patch.dimensions(), (10, 10));
}

#[test]
fn test_existing_patch_is_skipped_unless_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("spots.csv");
    write_spot_csv(&csv, &[("1", 20.0, 20.0, 5.0), ("2", 60.0, 60.0, 5.0)]);

    let existing = dir.path().join("s-level1-1.png");
    std::fs::write(&existing, b"keep me").unwrap();

    let naming = OutputNaming::new(dir.path(), 1);
    let slide = PathBuf::from("/slides/s.mrxs");
    let pairings = [pairing(&naming, &slide, Some(&csv))];

    let extractor = Extractor::new(
        source_with(&["/slides/s.mrxs"]),
        CoordinateProvider::CsvCircular,
        options(1),
    );
    let report = extractor.run(&pairings);
    assert_eq!(report.patches_skipped, 1);
    assert_eq!(report.patches_written, 1);
    assert_eq!(std::fs::read(&existing).unwrap(), b"keep me");

    let extractor = Extractor::new(
        source_with(&["/slides/s.mrxs"]),
        CoordinateProvider::CsvCircular,
        ExtractOptions {
            overwrite: true,
            ..options(1)
        },
    );
    let report = extractor.run(&pairings);
    assert_eq!(report.patches_skipped, 0);
    assert_eq!(report.patches_written, 2);
    assert_eq!(read_png(&existing).dimensions(), (10, 10));
}

#[test]
fn test_missing_inputs_fail_the_pairing() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("spots.csv");
    write_spot_csv(&csv, &[("1", 20.0, 20.0, 5.0)]);

    let naming = OutputNaming::new(dir.path(), 1);
    let known = PathBuf::from("/slides/known.mrxs");
    let unknown = PathBuf::from("/slides/unknown.mrxs");
    let missing_csv = dir.path().join("missing.csv");

    let extractor = Extractor::new(
        source_with(&["/slides/known.mrxs"]),
        CoordinateProvider::CsvCircular,
        options(1),
    );
    let report = extractor.run(&[
        pairing(&naming, &known, Some(&missing_csv)),
        pairing(&naming, &unknown, Some(&csv)),
    ]);

    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed(), 2);
    for failure in &report.failures {
        assert!(failure.error.contains("does not exist"), "{}", failure.error);
    }
}

#[test]
fn test_unknown_tag_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let xml = dir.path().join("a.xml");
    write_asap_xml(
        &xml,
        &[Annotation::Rect {
            group: "tumor",
            x: 0.0,
            y: 0.0,
            width: 16.0,
            height: 16.0,
        }],
    );

    let out = dir.path().join("out");
    std::fs::create_dir(&out).unwrap();
    let naming = OutputNaming::new(&out, 1);
    let slide = PathBuf::from("/slides/a.mrxs");
    let extractor = Extractor::new(source_with(&["/slides/a.mrxs"]), hotspot(), options(1));
    let report = extractor.run(&[pairing(&naming, &slide, Some(&xml))]);

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.patches_written, 0);
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 0);
}

#[test]
fn test_pixels_outside_slide_become_white() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("edge.csv");
    // Square from x = -5 to 15: the first five columns are off the slide.
    write_spot_csv(&csv, &[("1", 5.0, 50.0, 10.0)]);

    let mut pixels = pattern_level(0, 64, 64);
    pixels.put_pixel(10, 45, Rgba([9, 9, 9, 0]));
    let slide = MockSlide::new().with_level(pixels, 1.0);
    let source = MockSlideSource::new().with_slide("/slides/edge.mrxs", slide);

    let naming = OutputNaming::new(dir.path(), 1);
    let path = PathBuf::from("/slides/edge.mrxs");
    let extractor = Extractor::new(source, CoordinateProvider::CsvCircular, options(1));
    extractor.run(&[pairing(&naming, &path, Some(&csv))]);

    let patch = read_png(&dir.path().join("edge-level1-1.png"));
    assert_eq!(patch.dimensions(), (20, 20));
    assert_eq!(patch.get_pixel(0, 0).0, [255, 255, 255]);
    assert_eq!(patch.get_pixel(4, 19).0, [255, 255, 255]);
    assert_eq!(patch.get_pixel(5, 0).0, pattern_pixel(0, 0, 40));
    // Transparent source pixel inside the slide
    assert_eq!(patch.get_pixel(15, 5).0, [255, 255, 255]);
    assert_eq!(patch.get_pixel(16, 5).0, pattern_pixel(0, 11, 45));
}

#[test]
fn test_empty_slide_level_list_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let source = MockSlideSource::new().with_slide("/slides/empty.mrxs", MockSlide::new());
    let naming = OutputNaming::new(dir.path(), 1);
    let path = PathBuf::from("/slides/empty.mrxs");

    let extractor = Extractor::new(source, CoordinateProvider::Unbounded, options(1));
    let report = extractor.run(&[pairing(&naming, &path, None)]);

    assert_eq!(report.failed(), 1);
    assert!(report.failures[0].error.contains("out of range"));
}
