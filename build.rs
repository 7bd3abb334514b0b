//! Build script for auto-angler
//! Embeds the Windows manifest (DPI awareness, elevation) and the application icon

fn main() {
    #[cfg(windows)]
    {
        embed_windows_resources();
    }
}

#[cfg(windows)]
fn embed_windows_resources() {
    let mut res = winres::WindowsResource::new();

    // Per-monitor DPI awareness keeps capture and click coordinates in physical pixels
    res.set_manifest_file("auto-angler.manifest");

    if std::path::Path::new("icons/icon.ico").exists() {
        res.set_icon("icons/icon.ico");
    }

    if let Err(e) = res.compile() {
        eprintln!("Warning: Failed to compile Windows resources: {}", e);
    }
}
