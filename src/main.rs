use std::process::ExitCode;

fn main() -> ExitCode {
    match coe::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.to_exit_code() as u8)
        }
    }
}
