//! Command-line surface
//!
//! ```text
//! adm authorize <clientId> <clientSecret> <username> <password>
//! adm request <method> [parameters]
//! adm <method> [parameters]          # same as `request`
//! ```
//!
//! Anything that isn't a known command word is treated as an API method
//! name, so `adm Company.GetReportSuites` works without `request`.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

/// Profile location used when neither `--profile` nor `ADM_PROFILE` is given.
pub const DEFAULT_PROFILE_PATH: &str = "config/profile.json";

/// Words routed to a subcommand rather than treated as an API method.
const COMMAND_WORDS: &[&str] = &["authorize", "request", "profile", "help"];

/// Options that consume the following argument as their value.
const VALUE_OPTIONS: &[&str] = &["--profile", "--timeout", "--token", "--client"];

/// Calls the Adobe Digital Marketing Suite APIs
#[derive(Parser, Debug)]
#[command(
    name = "adm",
    version,
    disable_version_flag = true,
    arg_required_else_help = true,
    after_help = "To get started, run\n\n\t$ adm authorize <clientId> <clientSecret> <username> <password>\n\nto retrieve a token. See developer.omniture.com for more information."
)]
pub struct Cli {
    /// Profile file holding connection defaults and stored tokens
    #[arg(long, global = true, env = "ADM_PROFILE", default_value = DEFAULT_PROFILE_PATH)]
    pub profile: PathBuf,

    /// Seconds to wait for the API before giving up
    #[arg(long, global = true, env = "ADM_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout: u64,

    /// Display the current version and exit
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Exchange a username and password for a token and store it as the default
    Authorize(AuthorizeArgs),

    /// Call an API method with the stored default token
    #[command(visible_alias = "profile")]
    Request(RequestArgs),
}

#[derive(Args, Debug)]
pub struct AuthorizeArgs {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

#[derive(Args, Debug)]
pub struct RequestArgs {
    /// API method, e.g. Company.GetReportSuites
    pub method: Option<String>,

    /// Query string (`a=1&b=2`) or `file://path` (.ini, .xml, .json, or query string)
    pub parameters: Option<String>,

    /// Use this token instead of the stored default
    #[arg(long, env = "ADM_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Use the token stored for this client id
    #[arg(long)]
    pub client: Option<String>,

    /// Send parameters as a JSON body instead of a form
    #[arg(long)]
    pub json: bool,
}

/// Insert `request` ahead of a leading word that isn't a command, so
/// `adm Company.GetReportSuites` dispatches like `adm request Company.GetReportSuites`.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args: Vec<OsString> = args.into_iter().collect();

    let mut index = 1;
    while index < args.len() {
        let arg = args[index].to_string_lossy();
        if VALUE_OPTIONS.contains(&arg.as_ref()) {
            index += 2;
            continue;
        }
        if arg.starts_with('-') {
            index += 1;
            continue;
        }
        if !COMMAND_WORDS.contains(&arg.as_ref()) {
            args.insert(index, OsString::from("request"));
        }
        break;
    }

    args
}
