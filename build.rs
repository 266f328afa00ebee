use vergen::EmitBuilder;

// Emits build and git metadata for the startup log line.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    EmitBuilder::builder()
        .all_build()
        .all_git()
        .emit()?;
    Ok(())
}
