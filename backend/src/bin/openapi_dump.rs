//! Print the OpenAPI document as JSON.

use std::io::{self, Write};

use loyalty_backend::ApiDoc;
use utoipa::OpenApi;

fn main() -> io::Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &ApiDoc::openapi()).map_err(io::Error::other)?;
    writeln!(out)
}
