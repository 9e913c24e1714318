use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Keep a markdown snapshot of your source tree up to date for AI assistants.",
    long_about = "autumn watches a directory and maintains markdown documents that aggregate \nthe contents of its source files, honouring .gitignore and .docignore. \nRun once with --once, or leave it running to rebuild on every change.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  autumn --once\n  autumn -p ~/src/app -e py,ts --split\n  autumn -o docs/CONTEXT.md --delay 500ms\n  autumn --project"
)]
pub struct Cli {
    #[arg(
        short = 'p',
        long,
        help = "Directory to watch (default: project config, $AUTUMN_PATH, or current dir).",
        value_name = "PATH",
        help_heading = "Project Setup"
    )]
    pub path: Option<PathBuf>,

    #[arg(
        long,
        help = "Write a default .autumn/project.autumn in the target directory and exit.",
        conflicts_with_all = ["once", "output", "extensions", "split"],
        help_heading = "Project Setup"
    )]
    pub project: bool,

    #[arg(
        short = 'o',
        long,
        help = "Output file. A bare name goes into .autumn/ when it exists (default: CODE_DOCUMENTATION.md).",
        value_name = "FILE",
        help_heading = "Output"
    )]
    pub output: Option<String>,

    #[arg(
        short = 'e',
        long,
        help = "Comma separated extensions to include, e.g. 'py,.ts,rs'.",
        value_name = "EXTS",
        help_heading = "Output"
    )]
    pub extensions: Option<String>,

    #[arg(
        long,
        help = "Write one document per extension (CODE_DOCUMENTATION_py.md, ...).",
        help_heading = "Output"
    )]
    pub split: bool,

    #[arg(
        long,
        help = "Run a single update and exit instead of watching.",
        help_heading = "Watch"
    )]
    pub once: bool,

    #[arg(
        long,
        help = "Quiet period before a rebuild, e.g. '300ms', '1s'.",
        value_name = "DURATION",
        help_heading = "Watch"
    )]
    pub delay: Option<String>,

    #[arg(
        long,
        help = "Longest a burst of changes may postpone a rebuild (default: 2s).",
        value_name = "DURATION",
        help_heading = "Watch"
    )]
    pub max_delay: Option<String>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_short_flags() {
        let cli = Cli::try_parse_from([
            "autumn", "-p", "/tmp/x", "-o", "DOC.md", "-e", "py,go", "--split", "--once", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.path, Some(PathBuf::from("/tmp/x")));
        assert_eq!(cli.output.as_deref(), Some("DOC.md"));
        assert_eq!(cli.extensions.as_deref(), Some("py,go"));
        assert!(cli.split && cli.once);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn project_conflicts_with_output_flags() {
        assert!(Cli::try_parse_from(["autumn", "--project", "--once"]).is_err());
        assert!(Cli::try_parse_from(["autumn", "--project", "-p", "."]).is_ok());
    }
}
