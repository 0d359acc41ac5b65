//! Command-line parsing and login-shell detection.

use std::ffi::OsString;
use std::io::Write;

use clap::{ArgAction, Parser};

use crate::exit::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "ucrpsh",
    disable_help_flag = true,
    disable_version_flag = true,
    about = "Interactive shell for a remote UCRP command-line service"
)]
struct Args {
    /// Command strings are never executed; the flag exists so shells
    /// that try `-c` get a clear refusal instead of a usage error.
    #[arg(short = 'c', value_name = "COMMAND")]
    command_string: Option<String>,

    /// Server host.
    #[arg(short = 'h', value_name = "HOST")]
    host: Option<String>,

    /// Service name or port number.
    #[arg(short = 'p', value_name = "SERVICE")]
    service: Option<String>,

    #[arg(long, action = ArgAction::Help, help = "Print help")]
    help: Option<bool>,
}

/// A validated invocation of the shell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Host override; `localhost` when absent.
    pub host: Option<String>,
    /// Service override; the `ucrp` service when absent.
    pub service: Option<String>,
    /// Whether we were invoked as a login shell (`argv[0]` starting
    /// with `-`), which additionally routes Ctrl-Z to the server.
    pub login_shell: bool,
}

/// Parses `args` (including `argv[0]`) into an [`Invocation`].
///
/// Help text lands on `stdout`, rejections on `stderr`. `Err` carries
/// the status the process should exit with: `Ok` for `--help`, `Usage`
/// for rejected invocations.
pub(crate) fn parse<I, T, Out, Err>(
    args: I,
    stdout: &mut Out,
    stderr: &mut Err,
) -> Result<Invocation, ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    Out: Write,
    Err: Write,
{
    let argv: Vec<OsString> = args.into_iter().map(Into::into).collect();

    let login_shell = argv
        .first()
        .and_then(|arg0| arg0.to_str())
        .is_some_and(|arg0| arg0.len() > 1 && arg0.starts_with('-'));

    // A login invocation arrives as `-ucrpsh`; clap would read the
    // leading dash as a flag, so parse from a neutral program name.
    let mut parseable = argv;
    if login_shell {
        parseable[0] = OsString::from("ucrpsh");
    }

    let args = match Args::try_parse_from(parseable) {
        Ok(args) => args,
        Err(err) if err.kind() == clap::error::ErrorKind::DisplayHelp => {
            let _ = write!(stdout, "{}", err.render());
            return Err(ExitCode::Ok);
        }
        Err(err) => {
            let _ = write!(stderr, "{}", err.render());
            return Err(ExitCode::Usage);
        }
    };

    if args.command_string.is_some() {
        let _ = writeln!(stderr, "ucrpsh: access denied");
        return Err(ExitCode::Usage);
    }

    Ok(Invocation {
        host: args.host,
        service: args.service,
        login_shell,
    })
}
