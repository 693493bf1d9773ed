/// Router Module Index
///
/// Routes are grouped by the gate that protects them; each group gets its
/// middleware layer in `create_router`.

/// Open to everyone, anonymous or logged in.
pub mod public;

/// Register and login pages, only for visitors who are not logged in.
pub mod guest;

/// Routes behind the login-required gate. Owner checks happen per handler.
pub mod authenticated;

/// Routes restricted to users with the `admin` role.
pub mod admin;
