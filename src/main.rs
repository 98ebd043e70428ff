fn main() {
    if let Err(e) = todopad::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
