//! Render-argument binding.
//!
//! A controller calls [`ControllerContext::render`] with positional values. The
//! names those values are exposed under come from the action's registered
//! call-site table, keyed by the source line of the render call. Missing or
//! mismatched metadata never fails the request: the binding is left empty
//! and the anomaly is logged.
//!
//! ```
//! use keystone_core::{bind_render_args, ActionDescriptor, CallSite};
//! use serde_json::json;
//!
//! let show = ActionDescriptor::new("Show").render_site(12, ["user"]);
//! let bound = bind_render_args(&show, CallSite::Line(12), vec![json!(42)]);
//! assert_eq!(bound.get("user"), Some(&json!(42)));
//! ```

use std::panic::Location;

use http::StatusCode;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, trace};

use crate::context::ControllerContext;
use crate::descriptor::ActionDescriptor;
use crate::error::{KeystoneError, KeystoneResult};

/// Named values handed to the template renderer, in insertion order.
pub type RenderBindings = IndexMap<String, Value>;

/// Source position of a render call inside an action body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSite {
    /// The line the render call was written on.
    Line(u32),
    /// The position could not be determined.
    Unknown,
}

impl CallSite {
    /// Returns the position of the nearest caller not marked `#[track_caller]`.
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        Self::Line(Location::caller().line())
    }

    /// Returns the line, if known.
    #[must_use]
    pub const fn line(&self) -> Option<u32> {
        match self {
            Self::Line(line) => Some(*line),
            Self::Unknown => None,
        }
    }
}

impl From<Option<u32>> for CallSite {
    fn from(line: Option<u32>) -> Self {
        line.map_or(Self::Unknown, Self::Line)
    }
}

/// Pairs `values` with the names registered for `call_site` on `action`.
///
/// Returns an empty binding, after logging, when the call site is unknown,
/// unregistered, or registered with a different number of names.
pub fn bind_render_args(
    action: &ActionDescriptor,
    call_site: CallSite,
    values: Vec<Value>,
) -> RenderBindings {
    let Some(line) = call_site.line() else {
        error!(action = action.name(), "Failed to get caller information for render call");
        return RenderBindings::new();
    };

    let Some(names) = action.render_arg_names(line) else {
        error!(
            action = action.name(),
            line,
            "No render arg names found for render call"
        );
        return RenderBindings::new();
    };

    if names.len() != values.len() {
        error!(
            action = action.name(),
            line,
            expected = names.len(),
            supplied = values.len(),
            "Render arg names do not match the extra render args"
        );
        return RenderBindings::new();
    }

    trace!(action = action.name(), line, count = names.len(), "Bound render args");
    names.iter().cloned().zip(values).collect()
}

/// A template render request handed to the template collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderTemplate {
    /// Template path, e.g. "Users/Show.html".
    pub template_path: String,
    /// Every render arg published for this request.
    pub render_args: RenderBindings,
}

/// An error hand-off to the error template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPage {
    /// Response status at the time the page was rendered.
    #[serde(serialize_with = "serialize_status")]
    pub status: StatusCode,
    /// Short heading, e.g. "Not Found".
    pub title: String,
    /// Human-readable explanation.
    pub description: String,
    /// Every render arg published for this request.
    pub render_args: RenderBindings,
}

fn serialize_status<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u16(status.as_u16())
}

impl ControllerContext {
    /// Renders the template of the current action, naming `values` by call site.
    ///
    /// The template path is `<Controller>/<Action>.<format>`. Values whose
    /// names cannot be recovered are dropped; the render still proceeds.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoneError::Internal`] if no action is bound to this context.
    #[track_caller]
    pub fn render(&self, values: Vec<Value>) -> KeystoneResult<RenderTemplate> {
        self.render_at(CallSite::caller(), values)
    }

    /// Like [`Self::render`], with an explicit call site.
    ///
    /// # Errors
    ///
    /// Returns [`KeystoneError::Internal`] if no action is bound to this context.
    pub fn render_at(
        &self,
        call_site: CallSite,
        values: Vec<Value>,
    ) -> KeystoneResult<RenderTemplate> {
        let binding = self
            .action()
            .ok_or_else(|| KeystoneError::internal("render called with no action bound"))?;

        let bound = bind_render_args(binding.action(), call_site, values);
        self.merge_render_args(bound);

        let template_path = format!(
            "{}/{}.{}",
            binding.controller(),
            binding.action().name(),
            self.request().format
        );
        Ok(self.render_template(template_path))
    }

    /// Renders the given template with the current render args.
    pub fn render_template(&self, template_path: impl Into<String>) -> RenderTemplate {
        RenderTemplate {
            template_path: template_path.into(),
            render_args: self.render_args().clone(),
        }
    }

    /// Hands an error to the error template, keeping the current status.
    pub fn render_error(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> ErrorPage {
        ErrorPage {
            status: self.status(),
            title: title.into(),
            description: description.into(),
            render_args: self.render_args().clone(),
        }
    }

    /// Sets `404 Not Found` and renders `message` as an error page.
    pub fn not_found(&self, message: impl Into<String>) -> ErrorPage {
        self.fail_with(StatusCode::NOT_FOUND, "Not Found", message)
    }

    /// Sets `403 Forbidden` and renders `message` as an error page.
    pub fn forbidden(&self, message: impl Into<String>) -> ErrorPage {
        self.fail_with(StatusCode::FORBIDDEN, "Forbidden", message)
    }

    /// Sets `500 Internal Server Error` and renders `message` as an error page.
    pub fn internal_server_error(&self, message: impl Into<String>) -> ErrorPage {
        self.fail_with(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            message,
        )
    }

    /// Sets `501 Not Implemented` for an action that has no body yet.
    pub fn todo(&self) -> ErrorPage {
        self.fail_with(
            StatusCode::NOT_IMPLEMENTED,
            "TODO",
            "This action is not implemented",
        )
    }

    fn fail_with(
        &self,
        status: StatusCode,
        title: &str,
        description: impl Into<String>,
    ) -> ErrorPage {
        self.set_status(status);
        debug!(status = status.as_u16(), title, "Rendering error page");
        self.render_error(title, description)
    }
}
