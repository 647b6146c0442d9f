//! Request context types.
//!
//! The [`ControllerContext`] is the per-request state a controller reaches
//! through its embedded [`ContextSlot`](crate::ContextSlot). It is created
//! fresh for every request and shared by reference with every composition
//! path of the controller instance, so all mutable state sits behind locks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use http::{Method, StatusCode};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::descriptor::ActionDescriptor;
use crate::render::RenderBindings;

/// Shared handle to a request's context.
pub type ContextRef = Arc<ControllerContext>;

/// Session values, stored in a signed cookie by the framework boundary.
pub type Session = HashMap<String, String>;

/// A unique identifier for each request, using UUID v7.
///
/// # Example
///
/// ```
/// use keystone_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// The parts of the inbound request the dispatch core cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Negotiated response format, used as the template extension (e.g. "html").
    pub format: String,
    /// Locale selected for this request, if any.
    pub locale: Option<String>,
}

impl RequestInfo {
    /// Creates request info with the default `html` format.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            format: "html".to_string(),
            locale: None,
        }
    }

    /// Sets the response format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Sets the locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

impl Default for RequestInfo {
    fn default() -> Self {
        Self::new(Method::GET, "/")
    }
}

/// Flash values: `data` arrived with this request, `out` is sent with the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flash {
    /// Values read from the incoming flash cookie.
    pub data: HashMap<String, String>,
    /// Values to write to the outgoing flash cookie.
    pub out: HashMap<String, String>,
}

impl Flash {
    /// Sets an outgoing error message.
    pub fn error(&mut self, message: impl Into<String>) {
        self.out.insert("error".to_string(), message.into());
    }

    /// Sets an outgoing success message.
    pub fn success(&mut self, message: impl Into<String>) {
        self.out.insert("success".to_string(), message.into());
    }
}

/// Multi-valued request parameters (URL, query and form).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    values: HashMap<String, Vec<String>>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value for `name`.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// Returns the first value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns every value for `name`.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map_or(&[], Vec::as_slice)
    }

    /// Iterates over names and their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Returns the number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// The action a context is currently serving.
#[derive(Debug, Clone)]
pub struct ActionBinding {
    controller: String,
    action: Arc<ActionDescriptor>,
}

impl ActionBinding {
    /// Binds `action` on the controller displayed as `controller`.
    #[must_use]
    pub fn new(controller: impl Into<String>, action: Arc<ActionDescriptor>) -> Self {
        Self {
            controller: controller.into(),
            action,
        }
    }

    /// Returns the controller display name, e.g. "Users".
    #[must_use]
    pub fn controller(&self) -> &str {
        &self.controller
    }

    /// Returns the action descriptor.
    #[must_use]
    pub fn action(&self) -> &Arc<ActionDescriptor> {
        &self.action
    }

    /// Returns the fully qualified action name, e.g. "Users.Show".
    ///
    /// Both parts use the registered spelling, not the spelling of the
    /// request, so `users.SHOW` and `Users.show` log and render alike.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.controller, self.action.name())
    }
}

/// Per-request state injected into controllers.
///
/// # Example
///
/// ```
/// use keystone_core::{ControllerContext, RequestInfo};
/// use serde_json::json;
///
/// let ctx = ControllerContext::new(RequestInfo::default())
///     .with_render_arg("DevMode", json!(true))
///     .into_ref();
///
/// ctx.set_arg("user_id", json!(7));
/// assert_eq!(ctx.arg("user_id"), Some(json!(7)));
/// assert_eq!(ctx.render_arg("DevMode"), Some(json!(true)));
/// ```
#[derive(Debug)]
pub struct ControllerContext {
    request_id: RequestId,
    request: RequestInfo,
    started_at: Instant,
    status: Mutex<StatusCode>,
    session: RwLock<Session>,
    flash: RwLock<Flash>,
    params: RwLock<Params>,
    args: RwLock<HashMap<String, Value>>,
    render_args: RwLock<RenderBindings>,
    action: RwLock<Option<ActionBinding>>,
}

impl ControllerContext {
    /// Creates a context for `request` with a fresh request ID.
    #[must_use]
    pub fn new(request: RequestInfo) -> Self {
        Self {
            request_id: RequestId::new(),
            request,
            started_at: Instant::now(),
            status: Mutex::new(StatusCode::OK),
            session: RwLock::new(Session::new()),
            flash: RwLock::new(Flash::default()),
            params: RwLock::new(Params::new()),
            args: RwLock::new(HashMap::new()),
            render_args: RwLock::new(RenderBindings::new()),
            action: RwLock::new(None),
        }
    }

    /// Replaces the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = request_id;
        self
    }

    /// Sets the request parameters.
    #[must_use]
    pub fn with_params(self, params: Params) -> Self {
        *self.params.write() = params;
        self
    }

    /// Sets the decoded session.
    #[must_use]
    pub fn with_session(self, session: Session) -> Self {
        *self.session.write() = session;
        self
    }

    /// Sets the decoded flash.
    #[must_use]
    pub fn with_flash(self, flash: Flash) -> Self {
        *self.flash.write() = flash;
        self
    }

    /// Publishes a render arg before the action runs.
    #[must_use]
    pub fn with_render_arg(self, name: impl Into<String>, value: Value) -> Self {
        self.render_args.write().insert(name.into(), value);
        self
    }

    /// Wraps the context for sharing with a controller instance.
    #[must_use]
    pub fn into_ref(self) -> ContextRef {
        Arc::new(self)
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the request info.
    #[must_use]
    pub const fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// Returns the elapsed time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Returns the response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        *self.status.lock()
    }

    /// Sets the response status.
    pub fn set_status(&self, status: StatusCode) {
        *self.status.lock() = status;
    }

    /// Read access to the session.
    pub fn session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read()
    }

    /// Write access to the session.
    pub fn session_mut(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write()
    }

    /// Read access to the flash.
    pub fn flash(&self) -> RwLockReadGuard<'_, Flash> {
        self.flash.read()
    }

    /// Write access to the flash.
    pub fn flash_mut(&self) -> RwLockWriteGuard<'_, Flash> {
        self.flash.write()
    }

    /// Read access to the request parameters.
    pub fn params(&self) -> RwLockReadGuard<'_, Params> {
        self.params.read()
    }

    /// Write access to the request parameters.
    pub fn params_mut(&self) -> RwLockWriteGuard<'_, Params> {
        self.params.write()
    }

    /// Returns a scratch value.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<Value> {
        self.args.read().get(name).cloned()
    }

    /// Stores a scratch value for the rest of the request.
    pub fn set_arg(&self, name: impl Into<String>, value: Value) {
        self.args.write().insert(name.into(), value);
    }

    /// Returns a render arg.
    #[must_use]
    pub fn render_arg(&self, name: &str) -> Option<Value> {
        self.render_args.read().get(name).cloned()
    }

    /// Publishes a render arg.
    pub fn set_render_arg(&self, name: impl Into<String>, value: Value) {
        self.render_args.write().insert(name.into(), value);
    }

    /// Read access to all render args.
    pub fn render_args(&self) -> RwLockReadGuard<'_, RenderBindings> {
        self.render_args.read()
    }

    pub(crate) fn merge_render_args(&self, bindings: RenderBindings) {
        self.render_args.write().extend(bindings);
    }

    /// Copies every request param into the outgoing flash.
    ///
    /// Multiple values are joined with `,`.
    pub fn flash_params(&self) {
        let params = self.params.read();
        let mut flash = self.flash.write();
        for (name, values) in params.iter() {
            flash.out.insert(name.to_string(), values.join(","));
        }
    }

    /// Records the action this context is serving.
    pub fn bind_action(&self, binding: ActionBinding) {
        *self.action.write() = Some(binding);
    }

    /// Returns the action this context is serving.
    #[must_use]
    pub fn action(&self) -> Option<ActionBinding> {
        self.action.read().clone()
    }

    /// Returns the fully qualified action name, e.g. "Users.Show".
    #[must_use]
    pub fn action_name(&self) -> Option<String> {
        self.action.read().as_ref().map(ActionBinding::full_name)
    }
}
