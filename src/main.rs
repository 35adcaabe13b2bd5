fn main() {
    ppms_pipeline::cli::run();
}
