fn main() -> std::process::ExitCode {
    paddle_lib::run()
}
