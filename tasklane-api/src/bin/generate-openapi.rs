//! Prints the OpenAPI document for the Tasklane REST surface.
//!
//! `cargo run -p tasklane-api --bin generate-openapi --features openapi > openapi.json`

use std::process::ExitCode;

use tasklane_api::ApiDoc;

fn main() -> ExitCode {
    match ApiDoc::to_json() {
        Ok(document) => {
            println!("{}", document);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("generate-openapi: {}", e);
            ExitCode::FAILURE
        }
    }
}
