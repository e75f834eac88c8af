use std::process::ExitCode;

fn main() -> ExitCode {
    agencyvault_cli::run()
}
