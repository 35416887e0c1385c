use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use skia_safe::{Canvas, Color};

use crate::color::{deserialize_color, serialize_color};
use crate::geometry::EdgeInsets;

/// Called with the live canvas right before the page content is drawn.
pub type PrepareHook = Arc<dyn Fn(&Canvas) + Send + Sync>;

/// Drop shadow in document units, so it looks the same at every render size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    #[serde(serialize_with = "serialize_color", deserialize_with = "deserialize_color")]
    pub color: Color,
    /// Positive y moves the shadow down.
    pub offset: (f64, f64),
    pub blur_radius: f64,
}

impl Shadow {
    pub fn new(color: Color, offset: (f64, f64), blur_radius: f64) -> Self {
        Self {
            color,
            offset,
            blur_radius,
        }
    }
}

/// Everything that changes how a page is rasterized, owned by one image.
#[derive(Clone, Default)]
pub struct RenderParams {
    /// Recolour every painted pixel, keeping only the content's alpha.
    pub tint_color: Option<Color>,
    /// Fill behind the content. `None` leaves the background transparent.
    pub background_color: Option<Color>,
    pub shadow: Option<Shadow>,
    pub insets: EdgeInsets,
    pub prepare_hook: Option<PrepareHook>,
}

impl fmt::Debug for RenderParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderParams")
            .field("tint_color", &self.tint_color)
            .field("background_color", &self.background_color)
            .field("shadow", &self.shadow)
            .field("insets", &self.insets)
            .field("prepare_hook", &self.prepare_hook.as_ref().map(|_| "Fn(&Canvas)"))
            .finish()
    }
}

impl RenderParams {
    /// Short summary of the active effects, for log lines.
    pub(crate) fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.tint_color.is_some() {
            parts.push("tint");
        }
        if self.background_color.is_some() {
            parts.push("background");
        }
        if self.shadow.is_some() {
            parts.push("shadow");
        }
        if self.insets != EdgeInsets::ZERO {
            parts.push("insets");
        }
        if self.prepare_hook.is_some() {
            parts.push("hook");
        }
        if parts.is_empty() {
            "plain".to_string()
        } else {
            parts.join("+")
        }
    }
}
