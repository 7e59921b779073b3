fn main() {
    // Embed Windows metadata
    #[cfg(target_os = "windows")]
    {
        let mut res = winresource::WindowsResource::new();

        res.set("ProductName", "hwmon-link");
        res.set("FileDescription", "Hardware Monitor Serial Display Daemon");
        res.set("LegalCopyright", "hwmon-link contributors");

        if let Err(e) = res.compile() {
            eprintln!("Warning: Failed to set Windows resources: {}", e);
        }
    }
}
