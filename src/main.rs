fn main() {
    if let Err(err) = cellcast::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
