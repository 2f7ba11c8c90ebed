/// Router Module Index
///
/// Splits the HTTP surface by access level so the authentication layer is applied
/// per module rather than per handler.

/// Routes open to anonymous clients: liveness, sign-in, group metadata.
pub mod public;

/// Routes behind the `AuthUser` extractor middleware.
/// Menus are computed from the caller's primary role.
pub mod authenticated;

/// Routes restricted to regional administrators.
/// The role check happens inside the handlers.
pub mod admin;
