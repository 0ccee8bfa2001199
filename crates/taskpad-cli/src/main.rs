use std::process::ExitCode;

fn main() -> ExitCode {
    match taskpad_core::run(std::env::args_os().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("taskpad: {err:#}");
            ExitCode::FAILURE
        }
    }
}
