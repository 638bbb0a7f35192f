//! Command-line argument dispatch.
//!
//! Parses validated CLI arguments and maps them to the matching action,
//! resolving the shared endpoint configuration once for all subcommands.

use crate::cli::{
    actions::{admin, auth, public, Action},
    commands::{self, endpoints},
    globals::GlobalArgs,
};
use crate::moderation::{Category, ModerationAction};
use anyhow::{Context, Result};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let globals = GlobalArgs::new(endpoints::Options::parse(matches)?.into_config()?);

    match matches.subcommand() {
        Some((commands::CMD_LOGIN, sub_m)) => Ok(Action::Login(auth::LoginArgs {
            globals,
            listen: !sub_m.get_flag("no-listen"),
            timeout: Duration::from_secs(sub_m.get_one::<u64>("timeout").copied().unwrap_or(300)),
        })),
        Some((commands::CMD_CALLBACK, sub_m)) => {
            let raw = sub_m
                .get_one::<String>("url")
                .context("missing required argument: <url>")?;
            let redirect = Url::parse(raw.trim()).context("invalid redirect URL")?;
            Ok(Action::Callback(auth::CallbackArgs { globals, redirect }))
        }
        Some((commands::CMD_LOGOUT, _)) => Ok(Action::Logout(globals)),
        Some((commands::CMD_WHOAMI, _)) => Ok(Action::Whoami(globals)),
        Some((commands::CMD_ADMIN, sub_m)) => admin_handler(globals, sub_m),
        Some((commands::CMD_GALLERY, _)) => Ok(Action::Gallery(globals)),
        Some((commands::CMD_UPLOAD, sub_m)) => Ok(Action::Upload(public::UploadArgs {
            globals,
            path: sub_m
                .get_one::<PathBuf>("file")
                .cloned()
                .context("missing required argument: <file>")?,
            content_type: sub_m
                .get_one::<String>("content-type")
                .cloned()
                .filter(|v| !v.trim().is_empty()),
        })),
        _ => anyhow::bail!("no subcommand given, see --help"),
    }
}

fn admin_handler(globals: GlobalArgs, matches: &clap::ArgMatches) -> Result<Action> {
    let key = |sub_m: &clap::ArgMatches| -> Result<String> {
        sub_m
            .get_one::<String>("key")
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .context("missing required argument: <key>")
    };

    match matches.subcommand() {
        Some((commands::CMD_ADMIN_LIST, sub_m)) => {
            let category = sub_m
                .get_one::<String>("category")
                .map_or(Ok(Category::Pending), |c| c.parse::<Category>())?;
            Ok(Action::AdminList(admin::ListArgs {
                globals,
                category,
                filter: sub_m.get_one::<String>("filter").cloned().unwrap_or_default(),
            }))
        }
        Some((commands::CMD_ADMIN_APPROVE, sub_m)) => Ok(Action::AdminModerate(admin::ModerateArgs {
            globals,
            action: ModerationAction::Approve,
            key: key(sub_m)?,
        })),
        Some((commands::CMD_ADMIN_REJECT, sub_m)) => Ok(Action::AdminModerate(admin::ModerateArgs {
            globals,
            action: ModerationAction::Reject,
            key: key(sub_m)?,
        })),
        Some((commands::CMD_ADMIN_CONSOLE, _)) => Ok(Action::AdminConsole(globals)),
        _ => anyhow::bail!("no admin subcommand given, see `imglab admin --help`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV: [(&str, Option<&str>); 6] = [
        ("IMGLAB_API_URL", Some("https://api.example.com")),
        ("IMGLAB_AUTH_URL", Some("https://auth.example.com")),
        ("IMGLAB_CLIENT_ID", Some("client")),
        ("IMGLAB_REDIRECT_URI", None),
        ("IMGLAB_SCOPE", None),
        ("IMGLAB_STATE_DIR", Some("/tmp/imglab-test")),
    ];

    fn dispatch(args: &[&str]) -> Result<Action> {
        let matches = commands::new().try_get_matches_from(args.to_vec())?;
        handler(&matches)
    }

    #[test]
    fn test_login_action() {
        temp_env::with_vars(ENV, || {
            let action = dispatch(&["imglab", "login", "--no-listen"]).unwrap();
            match action {
                Action::Login(args) => {
                    assert!(!args.listen);
                    assert_eq!(args.timeout, Duration::from_secs(300));
                    assert_eq!(args.globals.config.client_id, "client");
                    assert_eq!(
                        args.globals.config.session_file(),
                        PathBuf::from("/tmp/imglab-test/session.json")
                    );
                }
                other => panic!("unexpected action: {other:?}"),
            }
        });
    }

    #[test]
    fn test_callback_requires_valid_url() {
        temp_env::with_vars(ENV, || {
            assert!(dispatch(&["imglab", "callback", "not a url"]).is_err());

            let action = dispatch(&["imglab", "callback", "http://127.0.0.1:5500/?code=abc"]).unwrap();
            assert!(matches!(action, Action::Callback(ref args) if args.redirect.query() == Some("code=abc")));
        });
    }

    #[test]
    fn test_missing_client_id() {
        temp_env::with_vars(ENV, || {
            temp_env::with_var("IMGLAB_CLIENT_ID", Some(""), || {
                let err = dispatch(&["imglab", "whoami"]).unwrap_err();
                assert!(err.to_string().contains("--client-id"));
            });
        });
    }

    #[test]
    fn test_admin_actions() {
        temp_env::with_vars(ENV, || {
            match dispatch(&["imglab", "admin", "list", "-c", "approved"]).unwrap() {
                Action::AdminList(args) => {
                    assert_eq!(args.category, Category::Approved);
                    assert!(args.filter.is_empty());
                }
                other => panic!("unexpected action: {other:?}"),
            }

            match dispatch(&["imglab", "admin", "reject", "pending/a.jpg"]).unwrap() {
                Action::AdminModerate(args) => {
                    assert_eq!(args.action, ModerationAction::Reject);
                    assert_eq!(args.key, "pending/a.jpg");
                }
                other => panic!("unexpected action: {other:?}"),
            }

            assert!(matches!(
                dispatch(&["imglab", "admin", "console"]).unwrap(),
                Action::AdminConsole(_)
            ));
        });
    }

    #[test]
    fn test_upload_action() {
        temp_env::with_vars(ENV, || {
            match dispatch(&["imglab", "upload", "me.webp"]).unwrap() {
                Action::Upload(args) => {
                    assert_eq!(args.path, PathBuf::from("me.webp"));
                    assert_eq!(args.content_type, None);
                }
                other => panic!("unexpected action: {other:?}"),
            }
        });
    }
}
