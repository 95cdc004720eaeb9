//! Browser binding for WASM environments.
//!
//! [`FaviconStudio`] wraps an [`EditorSession`] for a web frontend. Files
//! are returned to JavaScript as base64 payloads; triggering the actual
//! downloads (and staggering them) is left to the page.
//!
//! # Feature Flag
//!
//! Only available with the `tsify` feature enabled.
//!
//! # Example (JavaScript)
//!
//! ```javascript
//! import init, { FaviconStudio } from 'favicraft';
//!
//! await init();
//!
//! const studio = new FaviconStudio();
//! studio.loadImage(bytes, img.clientWidth, img.clientHeight);
//! studio.setEffects({ seasonal: 'snow' });
//! preview.src = studio.previewDataUrl();
//!
//! studio.choose('static');
//! studio.finish();
//! const { files, failures } = studio.exportFiles();
//! for (const file of files) { ... }
//! for (const skipped of failures) { showNotice(skipped.filename, skipped.error); }
//! ```

use std::fmt::Display;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::animation::AnimationKind;
use crate::export::{ExportBatch, html_snippet};
use crate::geometry::{CropSpec, DisplaySize, TransformSpec};
use crate::profile::EffectProfile;
use crate::session::{EditorSession, ExportChoice};
use crate::source::SourceImage;

fn js_error(err: impl Display) -> JsError {
    JsError::new(&err.to_string())
}

/// One exported file as handed to JavaScript.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedFile {
    filename: String,
    mime: &'static str,
    /// Base64 file contents.
    data: String,
}

/// A size that could not be produced, so the page can show a notice.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SkippedFile {
    filename: String,
    size: u32,
    error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportResult {
    files: Vec<ExportedFile>,
    failures: Vec<SkippedFile>,
}

impl From<ExportBatch> for ExportResult {
    fn from(batch: ExportBatch) -> Self {
        let files = batch
            .artifacts
            .into_iter()
            .map(|a| ExportedFile {
                mime: a.mime(),
                data: STANDARD.encode(&a.bytes),
                filename: a.filename,
            })
            .collect();
        let failures = batch
            .failures
            .into_iter()
            .map(|f| SkippedFile {
                error: f.error.to_string(),
                filename: f.filename,
                size: f.size,
            })
            .collect();
        Self { files, failures }
    }
}

// ============================================================================
// FaviconStudio
// ============================================================================

#[wasm_bindgen]
pub struct FaviconStudio {
    session: EditorSession,
}

impl Default for FaviconStudio {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl FaviconStudio {
    #[wasm_bindgen(constructor)]
    pub fn new() -> FaviconStudio {
        Self {
            session: EditorSession::new(),
        }
    }

    /// The current step: `upload`, `crop` or `results`.
    pub fn step(&self) -> String {
        self.session.step().name().to_string()
    }

    // ---- Upload ----

    /// Decodes the selected file and proposes a default crop.
    ///
    /// The display size is the on-screen size of the image element; pass
    /// nothing to use the natural size.
    #[wasm_bindgen(js_name = "loadImage")]
    pub fn load_image(
        &mut self,
        bytes: &[u8],
        display_width: Option<f32>,
        display_height: Option<f32>,
    ) -> Result<(), JsError> {
        let ticket = self.session.begin_decode().map_err(js_error)?;
        let display = display_width
            .zip(display_height)
            .map(|(w, h)| DisplaySize::new(w, h));
        self.session
            .complete_decode(ticket, SourceImage::decode(bytes.to_vec()), display)
            .map_err(js_error)?;
        Ok(())
    }

    // ---- Crop ----

    #[wasm_bindgen(js_name = "setCrop")]
    pub fn set_crop(&mut self, x: f32, y: f32, size: f32) -> Result<(), JsError> {
        self.session
            .set_crop(CropSpec::square(x, y, size))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = "dragCrop")]
    pub fn drag_crop(
        &mut self,
        start_x: f32,
        start_y: f32,
        x: f32,
        y: f32,
    ) -> Result<(), JsError> {
        self.session
            .drag_crop((start_x, start_y), (x, y))
            .map_err(js_error)
    }

    /// Returns `[x, y, size]` of the current crop, if an image is loaded.
    #[wasm_bindgen(js_name = "getCrop")]
    pub fn get_crop(&self) -> Option<Vec<f32>> {
        self.session.crop().map(|c| vec![c.x, c.y, c.width])
    }

    #[wasm_bindgen(js_name = "setTransform")]
    pub fn set_transform(&mut self, scale: f32, offset_x: f32, offset_y: f32) -> Result<(), JsError> {
        self.session
            .set_transform(TransformSpec::new(scale, offset_x, offset_y))
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = "resetTransform")]
    pub fn reset_transform(&mut self) -> Result<(), JsError> {
        self.session.reset_transform().map_err(js_error)
    }

    // ---- Effects ----

    /// Replaces the effect settings with an `EffectProfile` object.
    #[wasm_bindgen(js_name = "setEffects")]
    pub fn set_effects(&mut self, effects: JsValue) -> Result<(), JsError> {
        let profile: EffectProfile = serde_wasm_bindgen::from_value(effects).map_err(js_error)?;
        self.session.set_effects(profile).map_err(js_error)
    }

    #[wasm_bindgen(js_name = "getEffects")]
    pub fn get_effects(&self) -> Result<JsValue, JsError> {
        serde_wasm_bindgen::to_value(self.session.effects()).map_err(js_error)
    }

    #[wasm_bindgen(js_name = "setAnimation")]
    pub fn set_animation(&mut self, kind: &str, speed_seconds: f32) -> Result<(), JsError> {
        let kind: AnimationKind = kind.parse().map_err(js_error)?;
        self.session.set_animation(kind, speed_seconds);
        Ok(())
    }

    /// The live preview as a PNG data URL, or nothing while the crop is empty.
    #[wasm_bindgen(js_name = "previewDataUrl")]
    pub fn preview_data_url(&self) -> Result<Option<String>, JsError> {
        match self.session.preview().map_err(js_error)? {
            Some(favicon) => favicon.to_data_url().map(Some).map_err(js_error),
            None => Ok(None),
        }
    }

    // ---- Results ----

    /// Picks `static` or `animated` output.
    pub fn choose(&mut self, choice: &str) -> Result<(), JsError> {
        let choice = match choice {
            "static" => ExportChoice::Static,
            "animated" => ExportChoice::Animated,
            other => return Err(JsError::new(&format!("unknown output `{other}`"))),
        };
        self.session.choose(choice).map_err(js_error)
    }

    /// Renders the master favicon and returns it as a PNG data URL.
    pub fn finish(&mut self) -> Result<String, JsError> {
        let master = self.session.finish().map_err(js_error)?;
        master.to_data_url().map_err(js_error)
    }

    /// Every file for the chosen output as
    /// `{ files: [{ filename, mime, data }], failures: [{ filename, size, error }] }`.
    #[wasm_bindgen(js_name = "exportFiles")]
    pub fn export_files(&self) -> Result<JsValue, JsError> {
        let batch = self.session.export().map_err(js_error)?;
        serde_wasm_bindgen::to_value(&ExportResult::from(batch)).map_err(js_error)
    }

    /// The `<link>` tags for the exported set.
    #[wasm_bindgen(js_name = "htmlSnippet")]
    pub fn html_snippet(&self) -> String {
        html_snippet(&self.session.effects().file_prefix())
    }

    /// Discards everything and returns to the upload step.
    pub fn reset(&mut self) {
        self.session.reset();
    }
}
