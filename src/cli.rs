use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, FromArgMatches, Parser};
use log::debug;
use thiserror::Error;

pub const USAGE: &str = "Usage: snapink [-c] [FILE]...\n\n\
                         Screen capture and annotation tool\n  \
                         -c      Start in capture mode\n";

#[derive(Debug, Parser)]
#[command(name = "snapink", about = "Screen capture and annotation tool")]
struct Args {
    /// Start in capture mode
    #[arg(short = 'c')]
    capture: bool,

    /// Images to open, one window each
    files: Vec<PathBuf>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read '{}'", .0.display())]
    Unreadable(PathBuf),
    #[error("{}", .0.kind())]
    Arguments(#[from] clap::Error),
}

/// Which windows to open at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchPlan {
    pub capture: bool,
    pub files: Vec<PathBuf>,
}

/// Reads the command line. Files before `-c` open as documents of their
/// own; `-c` adds a capture window and everything after it is ignored.
pub fn parse_plan<I, T>(args: I) -> Result<LaunchPlan, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = Args::command().try_get_matches_from(args)?;
    let args = Args::from_arg_matches(&matches)?;
    let cutoff = args
        .capture
        .then(|| matches.index_of("capture"))
        .flatten();
    let indices = matches.indices_of("files").into_iter().flatten();

    let mut files = Vec::new();
    for (path, index) in args.files.into_iter().zip(indices) {
        if cutoff.is_some_and(|c| index > c) {
            debug!("ignoring '{}' after -c", path.display());
            continue;
        }
        if !is_readable(&path) {
            return Err(CliError::Unreadable(path));
        }
        files.push(path);
    }
    Ok(LaunchPlan {
        capture: args.capture,
        files,
    })
}

fn is_readable(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(args: &[&str]) -> Result<LaunchPlan, CliError> {
        parse_plan(args.iter().copied())
    }

    #[test]
    fn no_arguments_means_one_empty_document() {
        assert_eq!(plan(&["snapink"]).unwrap(), LaunchPlan::default());
    }

    #[test]
    fn capture_flag() {
        let p = plan(&["snapink", "-c"]).unwrap();
        assert!(p.capture);
        assert!(p.files.is_empty());
    }

    #[test]
    fn readable_files_are_kept_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        std::fs::write(&a, b"x").unwrap();
        std::fs::write(&b, b"y").unwrap();
        let p = plan(&["snapink", b.to_str().unwrap(), a.to_str().unwrap()]).unwrap();
        assert_eq!(p.files, vec![b, a]);
    }

    #[test]
    fn unreadable_file_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        let err = plan(&["snapink", missing.to_str().unwrap()]).unwrap_err();
        assert!(matches!(err, CliError::Unreadable(p) if p == missing));

        // Directories are not images either.
        assert!(plan(&["snapink", dir.path().to_str().unwrap()]).is_err());
    }

    #[test]
    fn unknown_flag_is_a_usage_error() {
        let err = plan(&["snapink", "-x"]).unwrap_err();
        assert!(matches!(err, CliError::Arguments(e) if e.use_stderr()));
    }

    #[test]
    fn help_is_not_a_usage_error() {
        // clap prints the help itself and exits with success.
        let err = plan(&["snapink", "--help"]).unwrap_err();
        assert!(matches!(err, CliError::Arguments(e) if !e.use_stderr()));
    }

    #[test]
    fn arguments_after_capture_flag_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let before = dir.path().join("before.png");
        let after = dir.path().join("after.png");
        std::fs::write(&before, b"x").unwrap();
        std::fs::write(&after, b"y").unwrap();
        let missing = dir.path().join("missing.png");

        let p = plan(&[
            "snapink",
            before.to_str().unwrap(),
            "-c",
            after.to_str().unwrap(),
            missing.to_str().unwrap(),
        ])
        .unwrap();
        assert!(p.capture);
        assert_eq!(p.files, vec![before]);
    }
}
