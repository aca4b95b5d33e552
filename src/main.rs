fn main() {
    if let Err(err) = scanview::cli::run() {
        scanview::ui::eprintln_error(&err);
        std::process::exit(scanview::exit::exit_code(&err));
    }
}
