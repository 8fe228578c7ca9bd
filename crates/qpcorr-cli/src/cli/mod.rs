mod commands;
mod helpers;

use clap::Parser;
use qpcorr_core::domain::CorrError;

pub fn run_from_env() -> i32 {
    helpers::init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let diagnostic = error.as_corr_error();
            eprintln!("{}", diagnostic.diagnostic_line());
            diagnostic.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("qpcorr".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();

    match Cli::try_parse_from(&full_args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "qpcorr",
    version,
    about = "Quadrupole selection and field-error correction around interaction points"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Select the highest-beta quadrupoles on each side of the interaction points
    Select(commands::SelectArgs),
    /// Select quadrupoles and solve for their field errors in both planes
    Solve(commands::SolveArgs),
    /// List integrated quadrupole strengths from a sequence file
    Strengths(commands::StrengthsArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Select(args) => commands::run_select_command(args),
        CliCommand::Solve(args) => commands::run_solve_command(args),
        CliCommand::Strengths(args) => commands::run_strengths_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(CorrError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<CorrError> for CliError {
    fn from(error: CorrError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_corr_error(&self) -> CorrError {
        match self {
            Self::Usage(message) => {
                CorrError::input_validation("INPUT.CLI_USAGE", message.trim_end().to_string())
            }
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => CorrError::internal("INTERNAL.CLI", format!("{error:#}")),
        }
    }
}
