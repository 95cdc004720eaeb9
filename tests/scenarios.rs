//! End-to-end scenarios over the public API.

use image::{Rgba, RgbaImage};

use favicraft::{
    AnimationKind, AnimationSpec, BlendMode, ColorOverlayConfig, ColorOverlaySettings, CropSpec,
    DisplaySize, EffectProfile, SeasonalTheme, SourceImage, TransformSpec, export, generate,
    render,
};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const YELLOW: [u8; 4] = [255, 255, 0, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

/// 1000x800, red outside the centered 600x600 square, four colored
/// quadrants inside it.
fn framed_source() -> SourceImage {
    let img = RgbaImage::from_fn(1000, 800, |x, y| {
        let inside = (200..800).contains(&x) && (100..700).contains(&y);
        let color = match (inside, x < 500, y < 400) {
            (false, _, _) => RED,
            (true, true, true) => BLUE,
            (true, false, true) => GREEN,
            (true, true, false) => YELLOW,
            (true, false, false) => WHITE,
        };
        Rgba(color)
    });
    SourceImage::from_raster(img)
}

fn centered_600() -> CropSpec {
    CropSpec::square(200.0, 100.0, 600.0)
}

#[test]
fn centered_crop_renders_center_region() {
    let source = framed_source();
    let favicon = render(
        &source,
        &centered_600(),
        &TransformSpec::identity(),
        DisplaySize::natural(1000, 800),
        &EffectProfile::new(),
        512,
    )
    .unwrap();

    let image = favicon.image();
    assert_eq!(image.dimensions(), (512, 512));

    assert_eq!(image.get_pixel(128, 128).0, BLUE);
    assert_eq!(image.get_pixel(384, 128).0, GREEN);
    assert_eq!(image.get_pixel(128, 384).0, YELLOW);
    assert_eq!(image.get_pixel(384, 384).0, WHITE);

    // Nothing from outside the crop, and no overlay artifacts.
    assert!(image.pixels().all(|p| p[3] == 255));
    assert!(image.pixels().all(|p| p.0 != RED));
}

#[test]
fn render_twice_is_byte_identical() {
    let source = framed_source();
    let effects = EffectProfile::new()
        .with_background_removal(true)
        .with_color_overlay(ColorOverlaySettings {
            enabled: true,
            color: "#123456".into(),
            opacity: 0.7,
            blend_mode: BlendMode::ColorDodge,
        })
        .with_seasonal(SeasonalTheme::Celebration);
    let transform = TransformSpec::new(1.3, 25.0, -40.0);
    let display = DisplaySize::new(500.0, 400.0);
    let crop = CropSpec::square(60.0, 20.0, 300.0);

    let a = render(&source, &crop, &transform, display, &effects, 128).unwrap();
    let b = render(&source, &crop, &transform, display, &effects, 128).unwrap();
    assert_eq!(a.to_png().unwrap(), b.to_png().unwrap());
}

#[test]
fn output_size_ignores_aspect_ratio() {
    let source = framed_source();
    for size in [16, 64, 200] {
        let favicon = render(
            &source,
            &CropSpec::square(0.0, 0.0, 800.0),
            &TransformSpec::new(0.5, 0.0, 0.0),
            DisplaySize::natural(1000, 800),
            &EffectProfile::new(),
            size,
        )
        .unwrap();
        assert_eq!(favicon.image().dimensions(), (size, size));
    }
}

#[test]
fn out_of_range_inputs_are_clamped() {
    assert_eq!(TransformSpec::new(10.0, 0.0, 0.0).scale(), 5.0);
    assert_eq!(TransformSpec::new(0.0, 0.0, 0.0).scale(), 0.1);

    let overlay = ColorOverlayConfig::new(palette::Srgb::<u8>::new(0, 0, 0), 1.5, BlendMode::Overlay);
    assert_eq!(overlay.opacity, 1.0);

    let profile: EffectProfile =
        EffectProfile::from_json(r#"{"colorOverlay":{"enabled":true,"opacity":1.5}}"#).unwrap();
    assert_eq!(profile.color_overlay.to_config().unwrap().opacity, 1.0);
}

#[test]
fn seasonal_overlays_are_stable_per_theme() {
    let source = framed_source();
    for theme in SeasonalTheme::ALL {
        let effects = EffectProfile::new().with_seasonal(theme);
        let render_once = || {
            render(
                &source,
                &centered_600(),
                &TransformSpec::identity(),
                DisplaySize::natural(1000, 800),
                &effects,
                64,
            )
            .unwrap()
        };
        assert_eq!(render_once(), render_once(), "theme {theme}");
    }
}

#[test]
fn halloween_export_prefixes_every_file() {
    let effects = EffectProfile::new().with_seasonal(SeasonalTheme::Halloween);
    let favicon = render(
        &framed_source(),
        &centered_600(),
        &TransformSpec::identity(),
        DisplaySize::natural(1000, 800),
        &effects,
        512,
    )
    .unwrap();

    let batch = export::export_static(&favicon, &effects.file_prefix());
    assert!(batch.is_complete());

    let names: Vec<_> = batch.filenames().collect();
    assert_eq!(
        names,
        vec![
            "halloween-favicon-16x16.png",
            "halloween-favicon-32x32.png",
            "halloween-favicon-48x48.png",
            "halloween-apple-touch-icon.png",
            "halloween-android-chrome-192x192.png",
            "halloween-android-chrome-512x512.png",
            "halloween-favicon.ico",
        ]
    );
}

#[test]
fn plain_export_has_no_prefix() {
    let favicon = render(
        &framed_source(),
        &centered_600(),
        &TransformSpec::identity(),
        DisplaySize::natural(1000, 800),
        &EffectProfile::new(),
        512,
    )
    .unwrap();

    let batch = export::export_static(&favicon, &EffectProfile::new().file_prefix());
    assert_eq!(batch.artifacts.len(), 7);
    assert!(batch.filenames().any(|f| f == "favicon.ico"));
    assert!(batch.filenames().all(|f| !f.starts_with('-')));
}

#[test]
fn pulse_and_rotate_documents() {
    let pulse = AnimationSpec::from_image_data(AnimationKind::Pulse, 2.0, "AAAA");
    let svg = generate(&pulse, 32).unwrap();
    assert!(svg.as_str().contains("scale(1)"));
    assert!(svg.as_str().contains("scale(1.1)"));
    assert!(svg.as_str().contains(" 2s "));

    let rotate = AnimationSpec::from_image_data(AnimationKind::Rotate, 1.0, "AAAA");
    let svg = generate(&rotate, 32).unwrap();
    assert!(svg.as_str().contains("rotate(0deg)"));
    assert!(svg.as_str().contains("rotate(360deg)"));
    assert!(svg.as_str().contains(" 1s "));
}

#[cfg(feature = "gallery")]
#[test]
fn missing_submission_reverts_optimistic_love() {
    use favicraft::{GalleryCard, NewSubmission, PersistenceError, SqliteStore, Submission, SubmissionStore};

    let store = SqliteStore::open_in_memory().unwrap();
    let real = store
        .insert(&NewSubmission::new("https://favicon.example", "me@favicon.example"))
        .unwrap();

    let ghost = Submission {
        id: real.id + 1000,
        ..real.clone()
    };
    let mut card = GalleryCard::new(ghost);
    let before = card.loves();

    let err = card.love(&store).unwrap_err();
    assert!(matches!(err, PersistenceError::NotFound { .. }));
    assert_eq!(card.loves(), before);
    assert!(!card.is_loved());

    // The real submission was untouched.
    assert_eq!(store.list().unwrap()[0].loves_count, 0);
}
