pub mod admin;
pub mod auth;
pub mod public;
pub mod render;

// Internal "interpreter" for `Action`, kept apart so `mod.rs` stays small.
mod run;

use crate::cli::globals::GlobalArgs;

#[derive(Debug)]
pub enum Action {
    Login(auth::LoginArgs),
    Callback(auth::CallbackArgs),
    Logout(GlobalArgs),
    Whoami(GlobalArgs),
    AdminList(admin::ListArgs),
    AdminModerate(admin::ModerateArgs),
    AdminConsole(GlobalArgs),
    Gallery(GlobalArgs),
    Upload(public::UploadArgs),
}

impl Action {
    // Convenience wrapper so call sites can do `action.execute().await`.
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
