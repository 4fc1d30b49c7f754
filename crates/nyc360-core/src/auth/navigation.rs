/// Route of the sign-in screen.
pub const SIGN_IN_PATH: &str = "/auth/login";

/// Navigation collaborator.
///
/// Invoked on logout and whenever an action that requires a signed-in user
/// is attempted anonymously.
pub trait Navigator: Send + Sync {
    fn go_to(&self, path: &str);
}

