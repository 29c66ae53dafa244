use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, name = "dnscache", about = "Caching DNS forwarder")]
pub struct Args {
    /// Trace every query and dump replies built from the cache
    #[arg(short('d'), long, default_value_t = false)]
    pub debug: bool,
    #[arg(short('c'), long, value_name = "PATH", default_value = "config.toml")]
    pub config: PathBuf,
    #[arg(long, value_name = "PATH", default_value = "dns_cache.json")]
    pub cache_path: PathBuf,
    /// Also write a detailed log to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["dnscache"]);
        assert!(!args.debug);
        assert_eq!(args.config, PathBuf::from("config.toml"));
        assert_eq!(args.cache_path, PathBuf::from("dns_cache.json"));
        assert!(args.log_file.is_none());
    }

    #[test]
    fn short_debug_flag() {
        let args = Args::parse_from(["dnscache", "-d", "-c", "/etc/dnscache.toml"]);
        assert!(args.debug);
        assert_eq!(args.config, PathBuf::from("/etc/dnscache.toml"));
    }
}
