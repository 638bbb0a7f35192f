use crate::cli::actions::{admin, auth, public, Action};
use anyhow::Result;

/// Execute the provided action.
// This is the single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Login(args) => auth::login(args).await,
        Action::Callback(args) => auth::callback(args).await,
        Action::Logout(globals) => auth::logout(&globals),
        Action::Whoami(globals) => auth::whoami(&globals),
        Action::AdminList(args) => admin::list(args).await,
        Action::AdminModerate(args) => admin::moderate(args).await,
        Action::AdminConsole(globals) => admin::console(&globals).await,
        Action::Gallery(globals) => public::gallery(&globals).await,
        Action::Upload(args) => public::upload(args).await,
    }
}
