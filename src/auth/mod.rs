use crate::chain::ChainError;
use crate::context::Context;
use crate::exception::HttpError;
use axum::http::StatusCode;
use std::sync::Arc;

/// The authenticated caller of a request.
///
/// The application's context builder is the conventional place to attach one
/// (validate the token, then `ctx.insert(CurrentUser { .. })`). The default
/// auth checks read it back from the request context.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub role: Option<String>,
}

pub type RoleResolver = Arc<dyn Fn(&Context) -> Option<String> + Send + Sync>;
pub type RoleChecker = Arc<dyn Fn(&Context, Option<&[String]>, Option<&str>) -> bool + Send + Sync>;

/// The error answered on a failed auth check.
#[derive(Clone)]
pub enum AuthFailure {
    /// A plain message, answered with status 401.
    Message(String),
    /// A full error value, answered as-is.
    Error(HttpError),
}

impl AuthFailure {
    fn into_error(self) -> ChainError {
        match self {
            Self::Message(message) => {
                Box::new(HttpError::with_status(message, StatusCode::UNAUTHORIZED))
            }
            Self::Error(error) => Box::new(error),
        }
    }
}

/// A reusable authorization policy, shareable across routes.
///
/// Override the hooks you need; the defaults read [`CurrentUser`] from the
/// request context. [`AuthExtension::spec`] turns a policy value into a ready
/// [`AuthSpec`]:
///
/// ```
/// use armature::{AuthExtension, AuthSpec};
/// use std::sync::Arc;
///
/// struct AdminOnly;
///
/// impl AuthExtension for AdminOnly {
///     fn roles(&self) -> Option<Vec<String>> {
///         Some(vec!["ADMIN".to_string()])
///     }
/// }
///
/// let admin_only: AuthSpec = Arc::new(AdminOnly).spec();
/// ```
pub trait AuthExtension: Send + Sync + 'static {
    fn roles(&self) -> Option<Vec<String>> {
        None
    }

    fn error(&self) -> Option<AuthFailure> {
        None
    }

    /// The caller's current role. Default: `CurrentUser::role`.
    fn resolve_role(&self, ctx: &Context) -> Option<String> {
        default_role_resolver(ctx)
    }

    /// Whether the caller may proceed. With roles, membership of the current
    /// role; without, presence of a [`CurrentUser`].
    fn check(&self, ctx: &Context, roles: Option<&[String]>, current_role: Option<&str>) -> bool {
        default_role_checker(ctx, roles, current_role)
    }

    fn spec(self: Arc<Self>) -> AuthSpec
    where
        Self: Sized,
    {
        AuthSpec::new().extends(self)
    }
}

pub(crate) fn default_role_resolver(ctx: &Context) -> Option<String> {
    ctx.get::<CurrentUser>().and_then(|user| user.role.clone())
}

pub(crate) fn default_role_checker(
    ctx: &Context,
    roles: Option<&[String]>,
    current_role: Option<&str>,
) -> bool {
    match roles {
        // no role list means authentication only
        None => ctx.get::<CurrentUser>().is_some(),
        Some(roles) => match current_role {
            None => false,
            Some(current) => roles.iter().any(|role| role == current),
        },
    }
}

/// Authentication/authorization requirements for one route.
///
/// Every field is optional. An inline value wins over the attached
/// [`AuthExtension`], which wins over the built-in default.
///
/// ```
/// use armature::AuthSpec;
///
/// let authenticated = AuthSpec::new();          // any logged-in caller
/// let admins = AuthSpec::role("ADMIN");         // role-based
/// ```
#[derive(Clone, Default)]
pub struct AuthSpec {
    roles: Option<Vec<String>>,
    error: Option<AuthFailure>,
    role_resolver: Option<RoleResolver>,
    role_checker: Option<RoleChecker>,
    extends: Option<Arc<dyn AuthExtension>>,
}

impl AuthSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require exactly one role.
    pub fn role(role: impl Into<String>) -> Self {
        Self::new().roles([role.into()])
    }

    pub fn roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error = Some(AuthFailure::Message(message.into()));
        self
    }

    pub fn error(mut self, error: HttpError) -> Self {
        self.error = Some(AuthFailure::Error(error));
        self
    }

    pub fn resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&Context) -> Option<String> + Send + Sync + 'static,
    {
        self.role_resolver = Some(Arc::new(resolver));
        self
    }

    pub fn checker<F>(mut self, checker: F) -> Self
    where
        F: Fn(&Context, Option<&[String]>, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.role_checker = Some(Arc::new(checker));
        self
    }

    pub fn extends(mut self, extension: Arc<dyn AuthExtension>) -> Self {
        self.extends = Some(extension);
        self
    }
}

/// The gate wrapping a protected handler. Runs before the route's middleware
/// chain; on failure the chain and handler never execute.
pub(crate) struct AuthGate {
    spec: AuthSpec,
}

impl AuthGate {
    pub(crate) fn new(spec: AuthSpec) -> Self {
        Self { spec }
    }

    pub(crate) fn check(&self, ctx: &Context) -> Result<(), ChainError> {
        let extension = self.spec.extends.as_deref();

        let roles = self
            .spec
            .roles
            .clone()
            .or_else(|| extension.and_then(|e| e.roles()));
        let failure = self
            .spec
            .error
            .clone()
            .or_else(|| extension.and_then(|e| e.error()))
            .unwrap_or_else(|| AuthFailure::Message("Invalid Permissions".to_string()));

        let current_role = match (&self.spec.role_resolver, extension) {
            (Some(resolver), _) => resolver(ctx),
            (None, Some(e)) => e.resolve_role(ctx),
            (None, None) => default_role_resolver(ctx),
        };

        let allowed = self.run_checker(ctx, roles.as_deref(), current_role.as_deref());
        if allowed {
            Ok(())
        } else {
            Err(failure.into_error())
        }
    }

    fn run_checker(
        &self,
        ctx: &Context,
        roles: Option<&[String]>,
        current_role: Option<&str>,
    ) -> bool {
        match (&self.spec.role_checker, self.spec.extends.as_deref()) {
            (Some(checker), _) => checker(ctx, roles, current_role),
            (None, Some(e)) => e.check(ctx, roles, current_role),
            (None, None) => default_role_checker(ctx, roles, current_role),
        }
    }
}
