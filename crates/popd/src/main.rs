use std::process::ExitCode;

fn main() -> ExitCode {
    popd::run_server()
}
