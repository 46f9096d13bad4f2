//! Writes the relay's OpenAPI document.
//!
//! Usage: `openapi [OUTPUT]`. Writes to `openapi.json` when no path is given,
//! or to stdout when the path is `-`.

use anyhow::Context;
use mission_api::router::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> anyhow::Result<()> {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_OUTPUT.to_string());

    let document = ApiDoc::openapi()
        .to_pretty_json()
        .context("Failed to render the OpenAPI document")?;

    if output == "-" {
        println!("{}", document);
        return Ok(());
    }

    std::fs::write(&output, document).with_context(|| format!("Failed to write {}", output))?;
    eprintln!("Wrote OpenAPI document to {}", output);
    Ok(())
}
