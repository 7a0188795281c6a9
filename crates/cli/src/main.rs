use std::process::ExitCode;

fn main() -> ExitCode {
    quoteform_cli::run()
}
