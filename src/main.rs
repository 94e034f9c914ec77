fn main() {
    if let Err(err) = dfd_engine::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
