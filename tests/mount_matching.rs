//! Host and mount resolution against the published model.

use site_routing::error::ResolutionError;

mod common;

#[test]
fn test_host_without_port_uses_any_port_tree() {
    let (_, cache) = common::cache();
    let hosts = cache.get_virtual_hosts().unwrap();

    let resolved = hosts.match_mount("localhost", "", "/news/2009").unwrap();
    assert!(!resolved.mount().is_preview());
    assert_eq!(resolved.port(), 0);
    assert_eq!(resolved.resolved_mount_path(), "");
    assert_eq!(resolved.remaining_path(), "/news/2009");
    assert_eq!(resolved.mount().content_path(), Some("/content/documents/demo"));
    assert_eq!(resolved.mount().locale(), Some("en_US"));
}

#[test]
fn test_explicit_port_selects_preview_tree() {
    let (_, cache) = common::cache();
    let hosts = cache.get_virtual_hosts().unwrap();

    assert!(hosts.match_mount("localhost:8081", "", "/").unwrap().mount().is_preview());
    assert!(!hosts.match_mount("localhost:8080", "", "/").unwrap().mount().is_preview());
}

#[test]
fn test_child_mount_consumes_segments() {
    let (_, cache) = common::cache();
    let hosts = cache.get_virtual_hosts().unwrap();

    let resolved = hosts.match_mount("localhost", "", "/api/v1/items").unwrap();
    assert_eq!(resolved.mount().name(), "api");
    assert_eq!(resolved.resolved_mount_path(), "/api");
    assert_eq!(resolved.remaining_path(), "/v1/items");
    assert!(matches!(
        resolved.match_site_map_item(resolved.remaining_path()),
        Err(ResolutionError::UnmappedMount(_))
    ));
}

#[test]
fn test_host_names_are_reassembled_from_labels() {
    let (_, cache) = common::cache();
    let hosts = cache.get_virtual_hosts().unwrap();

    let resolved = hosts.match_mount("INTRANET.org", "", "/").unwrap();
    assert_eq!(resolved.host_name(), "intranet.org");
    let site = resolved.mount().site().unwrap();
    assert_eq!(site.configuration_path(), common::INTRANET);

    assert!(hosts.virtual_host("org").is_none());
    assert!(matches!(
        hosts.match_mount("unknown.com", "", "/"),
        Err(ResolutionError::HostNotFound(_))
    ));
}

#[test]
fn test_exclusions_and_defaults() {
    let (_, cache) = common::cache();
    let hosts = cache.get_virtual_hosts().unwrap();

    assert!(hosts.is_excluded("/binaries/logo.png"));
    assert!(hosts.is_excluded("/favicon.ico"));
    assert!(!hosts.is_excluded("/news/2009"));
    assert_eq!(hosts.default_hostname(), Some("localhost"));
}

#[test]
fn test_channels_and_blueprints() {
    let (_, cache) = common::cache();
    let hosts = cache.get_virtual_hosts().unwrap();

    let channels = hosts.channels();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].name, "Demo");
    assert_eq!(channels[0].properties.get("hst:type").map(String::as_str), Some("website"));

    let blueprints = hosts.blueprints();
    assert_eq!(blueprints.len(), 1);
    assert_eq!(blueprints[0].description.as_deref(), Some("Company intranet"));
}

#[test]
fn test_deeper_mount_matches_past_a_mismatching_parent() {
    let tree = format!(
        "{}\n{}",
        common::FIXTURE,
        r#"
["hst:hst"."hst:hosts".dev.localhost."hst:root".a]
"hst:contextpath" = "/x"

["hst:hst"."hst:hosts".dev.localhost."hst:root".a.b]
"hst:contextpath" = "/y"
"#
    );
    let source = std::sync::Arc::new(site_routing::InMemorySource::from_toml_str(&tree).unwrap());
    let cache = site_routing::ModelCache::new(source);
    let hosts = cache.get_virtual_hosts().unwrap();

    let resolved = hosts.match_mount("localhost", "/y", "/a/b/news").unwrap();
    assert_eq!(resolved.resolved_mount_path(), "/a/b");
    assert_eq!(resolved.remaining_path(), "/news");

    let resolved = hosts.match_mount("localhost", "/x", "/a/b/news").unwrap();
    assert_eq!(resolved.resolved_mount_path(), "/a");
    assert_eq!(resolved.remaining_path(), "/b/news");

    let resolved = hosts.match_mount("localhost", "/z", "/a/b/news").unwrap();
    assert_eq!(resolved.resolved_mount_path(), "");
    assert_eq!(resolved.remaining_path(), "/a/b/news");
}

#[test]
fn test_removed_channel_and_blueprint_collections_read_empty() {
    let (source, cache) = common::cache();
    assert_eq!(cache.get_virtual_hosts().unwrap().channels().len(), 1);

    common::commit(&source, &cache, |t| {
        t.remove_node("/hst:hst/hst:channels")?;
        t.remove_node("/hst:hst/hst:blueprints")
    });
    let hosts = cache.get_virtual_hosts_fresh().unwrap();

    assert!(hosts.channels().is_empty());
    assert!(hosts.blueprints().is_empty());
    assert!(hosts.match_mount("localhost", "", "/").is_ok());
}
