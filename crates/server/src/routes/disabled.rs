//! Disabled user endpoints.
//!
//! The conventional account routes exist so that stale links and crawlers get
//! a sane answer, but none of them do anything: accounts cannot be edited,
//! reset, or deleted through this service. Everything redirects to the
//! landing page; the mutating ones log the attempt.

use axum::response::Redirect;

/// `/user/edit` - editing users is not supported.
pub async fn edit() -> Redirect {
    tracing::error!("user edit not supported");
    Redirect::to("/")
}

/// `/user/update` - updating users is not supported.
pub async fn update() -> Redirect {
    tracing::error!("user update not supported");
    Redirect::to("/")
}

/// `/user/destroy` - deleting users is not supported.
pub async fn destroy() -> Redirect {
    tracing::error!("user delete not supported");
    Redirect::to("/")
}

/// `/user/reset` - there are no passwords to reset.
pub async fn reset() -> Redirect {
    tracing::error!("password reset not supported");
    Redirect::to("/")
}

/// `/user/login` - there is no login.
pub async fn login() -> Redirect {
    Redirect::to("/")
}

/// `/user/loginfailed` - legacy auth-failure target, there is no login.
pub async fn loginfailed() -> Redirect {
    Redirect::to("/")
}

/// `/user/logout` - there is no session to end.
pub async fn logout() -> Redirect {
    Redirect::to("/")
}

/// `/user/process` - legacy form target, long gone.
pub async fn process() -> Redirect {
    Redirect::to("/")
}

/// `/user/index` - the user listing lives behind the diagnostics key.
pub async fn index() -> Redirect {
    Redirect::to("/")
}
