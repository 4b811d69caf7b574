use rust_embed::RustEmbed;

/// Stylesheet and client script, compiled into the binary.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/assets"]
pub struct Assets;
