fn main() {
    if let Err(err) = data_recon::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
