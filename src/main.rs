use flopcfr::cli;

fn main() {
    env_logger::init();
    cli::run();
}
