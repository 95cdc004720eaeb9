//! The editing flow as an explicit state machine.
//!
//! ```text
//! Upload ──decode──▶ Crop ──choose──▶ Crop(choice) ──finish──▶ Results
//!    ▲                                                            │
//!    └───────────────────────────── reset ◀───────────────────────┘
//! ```
//!
//! Any step can reset back to `Upload`. Image decodes are tagged with a
//! generation number; a decode that completes after a newer one started, or
//! after a reset, is dropped.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::animation::{AnimationKind, AnimationSpec, DEFAULT_SPEED};
use crate::compositor::{Configurable, EXPORT_SIZE, FaviconCompositor, PREVIEW_SIZE, RenderedFavicon};
use crate::config::GeneratorConfig;
use crate::delivery::{DeliveryHandle, DownloadSink, StaggeredDelivery};
use crate::error::{FaviconError, Result};
use crate::export::{ExportBatch, export_animated, export_static};
use crate::geometry::{CropSpec, DisplaySize, TransformSpec};
use crate::profile::EffectProfile;
use crate::source::SourceImage;

/// Static icon set, or animated SVGs plus the static set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportChoice {
    Static,
    Animated,
}

/// Where the editor currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorStep {
    Upload,
    Crop { choice: Option<ExportChoice> },
    Results { choice: ExportChoice },
}

impl EditorStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Crop { .. } => "crop",
            Self::Results { .. } => "results",
        }
    }
}

impl fmt::Display for EditorStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies one decode request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeTicket {
    generation: u64,
}

/// Everything loaded once an image has been decoded.
struct Workspace {
    compositor: FaviconCompositor,
    display: DisplaySize,
    crop: CropSpec,
    transform: TransformSpec,
}

/// One user's editing session.
pub struct EditorSession {
    step: EditorStep,
    generation: u64,
    workspace: Option<Workspace>,
    effects: EffectProfile,
    animation_kind: AnimationKind,
    animation_speed: f32,
    master: Option<RenderedFavicon>,
    delivery: Option<DeliveryHandle>,
    preview_size: u32,
    export_size: u32,
    background_tolerance: f32,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    pub fn new() -> Self {
        Self {
            step: EditorStep::Upload,
            generation: 0,
            workspace: None,
            effects: EffectProfile::default(),
            animation_kind: AnimationKind::default(),
            animation_speed: DEFAULT_SPEED,
            master: None,
            delivery: None,
            preview_size: PREVIEW_SIZE,
            export_size: EXPORT_SIZE,
            background_tolerance: GeneratorConfig::default().background_tolerance,
        }
    }

    pub fn with_config(config: &GeneratorConfig) -> Self {
        Self {
            preview_size: config.preview_size,
            export_size: config.export_size,
            background_tolerance: config.background_tolerance,
            ..Self::new()
        }
    }

    pub fn step(&self) -> EditorStep {
        self.step
    }

    // ------------------------------------------------------------------------
    // Upload
    // ------------------------------------------------------------------------

    /// Starts a decode. Any decode started earlier becomes stale.
    pub fn begin_decode(&mut self) -> Result<DecodeTicket> {
        if matches!(self.step, EditorStep::Results { .. }) {
            return Err(self.invalid("load an image"));
        }
        self.generation += 1;
        debug!(generation = self.generation, "decode started");
        Ok(DecodeTicket {
            generation: self.generation,
        })
    }

    /// Accepts a finished decode.
    ///
    /// Returns `Ok(false)` if the ticket is stale or the session has already
    /// reached the results step. A decode error is
    /// returned as is and the session stays where it was. `display` is the
    /// on-screen size of the image; `None` means its natural size.
    pub fn complete_decode(
        &mut self,
        ticket: DecodeTicket,
        decoded: Result<SourceImage>,
        display: Option<DisplaySize>,
    ) -> Result<bool> {
        if ticket.generation != self.generation {
            warn!(
                ticket = ticket.generation,
                current = self.generation,
                "ignoring stale decode"
            );
            return Ok(false);
        }
        if let EditorStep::Results { .. } = self.step {
            warn!(generation = ticket.generation, "ignoring decode after finish");
            return Ok(false);
        }

        let source = decoded?;
        let (w, h) = source.natural_size();
        let display = display.unwrap_or(DisplaySize::natural(w, h));

        let mut compositor =
            FaviconCompositor::new(source).with_background_tolerance(self.background_tolerance);
        compositor.apply_profile(&self.effects)?;

        self.workspace = Some(Workspace {
            compositor,
            display,
            crop: CropSpec::centered_default(display),
            transform: TransformSpec::identity(),
        });
        self.master = None;
        self.step = EditorStep::Crop { choice: None };
        info!(width = w, height = h, "image loaded");
        Ok(true)
    }

    /// Decodes `bytes` and moves to the crop step.
    pub fn load(&mut self, bytes: impl Into<std::sync::Arc<[u8]>>) -> Result<()> {
        let ticket = self.begin_decode()?;
        self.complete_decode(ticket, SourceImage::decode(bytes), None)?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Crop
    // ------------------------------------------------------------------------

    pub fn crop(&self) -> Option<CropSpec> {
        self.workspace.as_ref().map(|ws| ws.crop)
    }

    pub fn transform(&self) -> Option<TransformSpec> {
        self.workspace.as_ref().map(|ws| ws.transform)
    }

    pub fn display(&self) -> Option<DisplaySize> {
        self.workspace.as_ref().map(|ws| ws.display)
    }

    pub fn effects(&self) -> &EffectProfile {
        &self.effects
    }

    /// Replaces the crop. Non-square input is squared to its shorter side.
    pub fn set_crop(&mut self, crop: CropSpec) -> Result<()> {
        let ws = self.crop_workspace("crop")?;
        ws.crop = CropSpec::square(crop.x, crop.y, crop.width.min(crop.height));
        Ok(())
    }

    /// Sets the crop from a drag gesture.
    pub fn drag_crop(&mut self, start: (f32, f32), current: (f32, f32)) -> Result<()> {
        let ws = self.crop_workspace("crop")?;
        ws.crop = CropSpec::from_drag(start, current);
        Ok(())
    }

    pub fn set_transform(&mut self, transform: TransformSpec) -> Result<()> {
        self.crop_workspace("transform")?.transform = transform;
        Ok(())
    }

    pub fn zoom_by(&mut self, delta: f32) -> Result<()> {
        self.crop_workspace("zoom")?.transform.zoom_by(delta);
        Ok(())
    }

    pub fn reset_transform(&mut self) -> Result<()> {
        self.crop_workspace("reset the transform")?.transform.reset();
        Ok(())
    }

    /// Replaces every effect setting.
    pub fn set_effects(&mut self, effects: EffectProfile) -> Result<()> {
        let ws = self.crop_workspace("change effects")?;
        ws.compositor.apply_profile(&effects)?;
        self.effects = effects;
        Ok(())
    }

    pub fn set_animation(&mut self, kind: AnimationKind, speed_seconds: f32) {
        self.animation_kind = kind;
        self.animation_speed = speed_seconds;
    }

    /// Renders the live preview. An empty crop renders nothing.
    pub fn preview(&self) -> Result<Option<RenderedFavicon>> {
        let EditorStep::Crop { .. } = self.step else {
            return Err(self.invalid("preview"));
        };
        let Some(ws) = self.workspace.as_ref() else {
            return Err(self.invalid("preview"));
        };
        if ws.crop.is_empty() {
            return Ok(None);
        }
        ws.compositor
            .render(&ws.crop, &ws.transform, ws.display, self.preview_size)
            .map(Some)
    }

    /// Picks static or animated output.
    pub fn choose(&mut self, choice: ExportChoice) -> Result<()> {
        match self.step {
            EditorStep::Crop { .. } => {
                self.step = EditorStep::Crop {
                    choice: Some(choice),
                };
                Ok(())
            }
            _ => Err(self.invalid("choose an output")),
        }
    }

    /// Renders the master image and moves to the results step.
    pub fn finish(&mut self) -> Result<&RenderedFavicon> {
        let EditorStep::Crop {
            choice: Some(choice),
        } = self.step
        else {
            return Err(self.invalid("finish"));
        };
        let Some(ws) = self.workspace.as_ref() else {
            return Err(self.invalid("finish"));
        };

        let master = ws
            .compositor
            .render(&ws.crop, &ws.transform, ws.display, self.export_size)?;
        // Decodes still in flight must not pull the session back to crop.
        self.generation += 1;
        self.step = EditorStep::Results { choice };
        info!(?choice, size = master.size(), "favicon rendered");
        Ok(self.master.insert(master))
    }

    // ------------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------------

    pub fn master(&self) -> Option<&RenderedFavicon> {
        self.master.as_ref()
    }

    /// The animation the results step would export.
    pub fn animation_spec(&self) -> Result<AnimationSpec> {
        let master = self.master.as_ref().ok_or_else(|| self.invalid("animate"))?;
        AnimationSpec::new(self.animation_kind, self.animation_speed, master)
    }

    /// Produces every file for the chosen output.
    ///
    /// The animated choice also includes the static set as a fallback for
    /// browsers without animated SVG favicons.
    pub fn export(&self) -> Result<ExportBatch> {
        let (EditorStep::Results { choice }, Some(master)) = (self.step, self.master.as_ref())
        else {
            return Err(self.invalid("export"));
        };

        let prefix = self.effects.file_prefix();
        let mut batch = export_static(master, &prefix);
        if choice == ExportChoice::Animated {
            match self.animation_spec() {
                Ok(spec) => batch.merge(export_animated(&spec, &prefix)),
                Err(err) => batch.fail_animated(&prefix, &err),
            }
        }
        Ok(batch)
    }

    /// Exports and starts delivering in the background. A delivery still
    /// running from an earlier call is cancelled first.
    pub fn deliver<S>(&mut self, delivery: StaggeredDelivery, sink: S) -> Result<ExportBatch>
    where
        S: DownloadSink + 'static,
    {
        let batch = self.export()?;
        if let Some(previous) = self.delivery.take() {
            previous.cancel();
        }
        self.delivery = Some(delivery.spawn(batch.artifacts.clone(), sink)?);
        Ok(batch)
    }

    /// Hands over the running delivery, e.g. to wait for it.
    pub fn take_delivery(&mut self) -> Option<DeliveryHandle> {
        self.delivery.take()
    }

    // ------------------------------------------------------------------------
    // Reset
    // ------------------------------------------------------------------------

    /// Discards everything and returns to the upload step.
    ///
    /// Pending deliveries are cancelled and in-flight decodes become stale.
    /// Returns the cancelled delivery handle, if any.
    pub fn reset(&mut self) -> Option<DeliveryHandle> {
        let delivery = self.delivery.take();
        if let Some(handle) = &delivery {
            handle.cancel();
        }

        self.generation += 1;
        self.step = EditorStep::Upload;
        self.workspace = None;
        self.master = None;
        self.effects = EffectProfile::default();
        self.animation_kind = AnimationKind::default();
        self.animation_speed = DEFAULT_SPEED;
        info!("session reset");
        delivery
    }

    fn crop_workspace(&mut self, action: &'static str) -> Result<&mut Workspace> {
        match (self.step, self.workspace.as_mut()) {
            (EditorStep::Crop { .. }, Some(ws)) => Ok(ws),
            (step, _) => Err(FaviconError::InvalidTransition {
                action,
                step: step.name(),
            }),
        }
    }

    fn invalid(&self, action: &'static str) -> FaviconError {
        FaviconError::InvalidTransition {
            action,
            step: self.step.name(),
        }
    }
}
