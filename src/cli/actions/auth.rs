use crate::{
    auth::{callback::CallbackListener, AuthState, Claims, Session, Storage},
    cli::globals::GlobalArgs,
};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct LoginArgs {
    pub globals: GlobalArgs,
    /// Capture the redirect on the loopback listener instead of asking for it.
    pub listen: bool,
    pub timeout: Duration,
}

#[derive(Debug)]
pub struct CallbackArgs {
    pub globals: GlobalArgs,
    pub redirect: Url,
}

/// One line describing the identity behind the session.
pub fn describe(claims: &Claims) -> String {
    if claims.is_empty() {
        return "unknown user".to_string();
    }

    let who = claims
        .email()
        .or_else(|| claims.subject())
        .unwrap_or("unknown user");

    if claims.is_admin() {
        format!("{who} (admin)")
    } else {
        who.to_string()
    }
}

/// # Errors
/// Returns an error if the listener cannot bind, the redirect never arrives or
/// the code exchange fails.
pub async fn login(args: LoginArgs) -> Result<()> {
    let mut flow = args.globals.auth_flow()?;

    if !args.listen {
        let url = flow.login()?;
        println!("Open this URL in your browser to sign in:\n\n  {url}\n");
        println!("Then run: imglab callback '<URL the browser was redirected to>'");
        return Ok(());
    }

    // Bind first, the browser may redirect as soon as the URL is opened.
    let listener = CallbackListener::bind(&flow.config().redirect_uri)
        .await
        .context("cannot listen on the redirect URI, retry with --no-listen")?;

    let url = flow.login()?;
    println!("Open this URL in your browser to sign in:\n\n  {url}\n");
    info!(addr = %listener.local_addr()?, "waiting for the sign-in redirect");

    let params = listener.wait(args.timeout).await?;
    flow.handle_callback(params).await?;

    println!("Signed in as {}", describe(&flow.session().current_claims()));

    Ok(())
}

/// # Errors
/// Returns an error if the redirect carries no code or the exchange fails.
pub async fn callback(args: CallbackArgs) -> Result<()> {
    let mut flow = args.globals.auth_flow()?;

    flow.handle_redirect(&args.redirect).await?;

    println!("Signed in as {}", describe(&flow.session().current_claims()));

    Ok(())
}

/// # Errors
/// Returns an error if the session file cannot be cleared.
pub fn logout(globals: &GlobalArgs) -> Result<()> {
    let mut flow = globals.auth_flow()?;
    let url = flow.logout()?;

    println!("Signed out. To end the identity provider session, open:\n\n  {url}");

    Ok(())
}

/// # Errors
/// Returns an error if the HTTP client cannot be built.
pub fn whoami(globals: &GlobalArgs) -> Result<()> {
    let flow = globals.auth_flow()?;
    println!("{}", status_line(flow.state(), flow.session()));
    Ok(())
}

fn status_line<S: Storage>(state: AuthState, session: &Session<S>) -> String {
    match state {
        AuthState::SignedIn => {
            debug!(expires_at_ms = session.expires_at_ms(), "session is valid");
            format!("Signed in as {}", describe(&session.current_claims()))
        }
        AuthState::AwaitingCallback => {
            "Signed out (a sign-in is in progress, finish it with `imglab callback`)".to_string()
        }
        AuthState::SignedOut => "Signed out".to_string(),
    }
}
