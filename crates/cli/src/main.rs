use std::process::ExitCode;

fn main() -> ExitCode {
    caseforge_cli::run()
}
