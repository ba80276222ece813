fn main() {
    if let Err(err) = pledge_badge::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
