#![deny(unsafe_code)]

use std::io::Write;
use std::{env, io, process::ExitCode};

fn main() -> ExitCode {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    run_with(env::args_os(), &mut stdout, &mut stderr).into()
}

fn run_with<I, Out, Err>(args: I, stdout: &mut Out, stderr: &mut Err) -> cli::ExitCode
where
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
    Out: Write,
    Err: Write,
{
    cli::run(args, stdout, stderr)
}

#[cfg(test)]
mod tests {
    use super::run_with;

    #[test]
    fn help_flag_reports_success() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(["ucrpsh", "--help"], &mut stdout, &mut stderr);
        assert_eq!(exit, cli::ExitCode::Ok);
        assert!(!stdout.is_empty(), "help output should not be empty");
        assert!(stderr.is_empty(), "help flag should not write to stderr");
    }

    #[test]
    fn command_strings_are_refused() {
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let exit = run_with(["ucrpsh", "-c", "reboot"], &mut stdout, &mut stderr);
        assert_eq!(exit, cli::ExitCode::Usage);
        assert!(
            String::from_utf8_lossy(&stderr).contains("access denied"),
            "got {:?}",
            String::from_utf8_lossy(&stderr)
        );
    }
}
