fn main() -> std::process::ExitCode {
    snapbloom_lib::run()
}
