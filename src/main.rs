fn main() {
    #[cfg(feature = "cli")]
    warcar::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("warcar: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
