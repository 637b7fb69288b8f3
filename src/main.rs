fn main() {
    if let Err(err) = shadow_frame::run() {
        eprintln!("Application error: {err}");
    }
}
