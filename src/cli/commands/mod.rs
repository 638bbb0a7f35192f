pub mod endpoints;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ArgAction, ColorChoice, Command,
};
use std::path::PathBuf;

pub const CMD_LOGIN: &str = "login";
pub const CMD_CALLBACK: &str = "callback";
pub const CMD_LOGOUT: &str = "logout";
pub const CMD_WHOAMI: &str = "whoami";
pub const CMD_ADMIN: &str = "admin";
pub const CMD_GALLERY: &str = "gallery";
pub const CMD_UPLOAD: &str = "upload";

pub const CMD_ADMIN_LIST: &str = "list";
pub const CMD_ADMIN_APPROVE: &str = "approve";
pub const CMD_ADMIN_REJECT: &str = "reject";
pub const CMD_ADMIN_CONSOLE: &str = "console";

fn login() -> Command {
    Command::new(CMD_LOGIN)
        .about("Sign in through the identity provider (Authorization Code + PKCE)")
        .arg(
            Arg::new("no-listen")
                .long("no-listen")
                .help("Only print the authorization URL; finish with `imglab callback <URL>`")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Seconds to wait for the redirect on the loopback listener")
                .default_value("300")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}

fn callback() -> Command {
    Command::new(CMD_CALLBACK)
        .about("Complete a login with the redirect URL the browser landed on")
        .arg(
            Arg::new("url")
                .help("Full redirect URL including the query string")
                .required(true),
        )
}

fn admin() -> Command {
    let key = || Arg::new("key").help("Object key under pending/").required(true);

    Command::new(CMD_ADMIN)
        .about("Moderation queue (requires membership in the admins group)")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_ADMIN_LIST)
                .about("List one moderation category")
                .arg(
                    Arg::new("category")
                        .short('c')
                        .long("category")
                        .help("pending, approved or rejected")
                        .default_value("pending")
                        .value_parser(["pending", "approved", "rejected"]),
                )
                .arg(
                    Arg::new("filter")
                        .short('f')
                        .long("filter")
                        .help("Case-insensitive substring match on the key"),
                ),
        )
        .subcommand(
            Command::new(CMD_ADMIN_APPROVE)
                .about("Approve a pending picture")
                .arg(key()),
        )
        .subcommand(
            Command::new(CMD_ADMIN_REJECT)
                .about("Reject a pending picture")
                .arg(key()),
        )
        .subcommand(Command::new(CMD_ADMIN_CONSOLE).about("Interactive moderation console"))
}

fn upload() -> Command {
    Command::new(CMD_UPLOAD)
        .about("Submit a picture for review (JPG, PNG or WEBP, up to 2 MB)")
        .arg(
            Arg::new("file")
                .help("Path of the picture")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("content-type")
                .long("content-type")
                .help("Override the media type guessed from the extension"),
        )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("imglab")
        .about("Photo submission and moderation client")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(login())
        .subcommand(callback())
        .subcommand(Command::new(CMD_LOGOUT).about("Forget the session and print the provider logout URL"))
        .subcommand(Command::new(CMD_WHOAMI).about("Show the signed-in identity"))
        .subcommand(admin())
        .subcommand(Command::new(CMD_GALLERY).about("List approved pictures"))
        .subcommand(upload());

    let command = endpoints::with_args(command);

    logging::with_args(command)
}
