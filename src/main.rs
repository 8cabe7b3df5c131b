use bugbridge::core::ResponseEnvelope;

fn main() {
    match bugbridge::cli::run() {
        Ok(status) => std::process::exit(status),
        Err(err) => {
            if let Ok(json) = ResponseEnvelope::from_error(&err).to_json(false) {
                println!("{json}");
            }
            bugbridge::ui::eprintln_error(&err);
            std::process::exit(bugbridge::errors::error_code(&err).exit_status());
        }
    }
}
