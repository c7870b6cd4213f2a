use std::process::ExitCode;

fn main() -> ExitCode {
    match leonardo_lib::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("leonardo: {err:#}");
            ExitCode::FAILURE
        }
    }
}
