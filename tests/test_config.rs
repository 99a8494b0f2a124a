use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use kiss_httpd::config::{
    Config, ConfigError, ConfigSource, DEFAULT_BACKLOG, DEFAULT_MAX_CONNECTIONS,
};

fn temp_path(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("kiss-httpd-{}-{}-{}", std::process::id(), n, name))
}

#[test]
fn test_config_defaults() {
    let cfg = Config::default();
    assert_eq!(cfg.backlog, DEFAULT_BACKLOG);
    assert_eq!(cfg.backlog, 10);
    assert_eq!(cfg.html_file, None);
    assert_eq!(cfg.max_connections, DEFAULT_MAX_CONNECTIONS);
}

#[test]
fn test_config_load_without_path_uses_defaults() {
    assert_eq!(Config::load(None).unwrap(), Config::default());
}

#[test]
fn test_config_bare_integer_file() {
    let path = temp_path("queue.conf");
    fs::write(&path, "25\n").unwrap();

    let cfg = Config::from_file(&path).unwrap();
    assert_eq!(cfg.backlog, 25);
    assert_eq!(cfg.html_file, None);

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_config_yaml_mapping() {
    let cfg = Config::parse(
        "backlog: 64\nhtml_file: /srv/www/index.html\nmax_connections: 8\n",
    )
    .unwrap();

    assert_eq!(cfg.backlog, 64);
    assert_eq!(cfg.html_file.as_deref(), Some(Path::new("/srv/www/index.html")));
    assert_eq!(cfg.max_connections, 8);
}

#[test]
fn test_config_partial_mapping_keeps_defaults() {
    let cfg = Config::parse("html_file: page.html\n").unwrap();
    assert_eq!(cfg.backlog, DEFAULT_BACKLOG);
    assert_eq!(cfg.max_connections, DEFAULT_MAX_CONNECTIONS);
}

#[test]
fn test_config_rejects_negative_backlog() {
    assert!(matches!(
        Config::parse("-3"),
        Err(ConfigError::InvalidBacklog(-3))
    ));
}

#[test]
fn test_config_rejects_zero_max_connections() {
    assert!(matches!(
        Config::parse("max_connections: 0"),
        Err(ConfigError::InvalidMaxConnections)
    ));
}

#[test]
fn test_config_rejects_unknown_keys() {
    assert!(matches!(
        Config::parse("port: 80"),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_config_rejects_garbage() {
    assert!(matches!(
        Config::parse("not a number"),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_config_missing_file() {
    let path = temp_path("missing.conf");
    let err = Config::from_file(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
    assert!(err.to_string().contains("missing.conf"));
}

#[test]
fn test_config_parse_error_names_file() {
    let path = temp_path("broken.conf");
    fs::write(&path, "backlog: [1, 2]\n").unwrap();

    let err = Config::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("broken.conf"));

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_config_source_overrides_html_file() {
    let path = temp_path("override.conf");
    fs::write(&path, "backlog: 5\nhtml_file: from-file.html\n").unwrap();

    let source = ConfigSource {
        path: Some(path.clone()),
        html_file: Some(PathBuf::from("from-cli.html")),
    };
    let cfg = source.load().unwrap();
    assert_eq!(cfg.backlog, 5);
    assert_eq!(cfg.html_file.as_deref(), Some(Path::new("from-cli.html")));

    fs::remove_file(&path).unwrap();
}
