//! Preview decoration of live mounts.

use std::sync::Arc;

use site_routing::routing::decorate_mount_as_preview;

mod common;

#[test]
fn test_decorated_mount_serves_preview_site() {
    let (_, cache) = common::cache();
    let hosts = cache.get_virtual_hosts().unwrap();
    let live = hosts.virtual_host("localhost").unwrap().root_mount(0).unwrap().clone();

    let preview = decorate_mount_as_preview(live.clone());
    assert!(preview.is_preview());
    assert!(!live.is_preview());
    assert_eq!(preview.mount_path(), live.mount_path());
    assert_eq!(preview.content_path(), live.content_path());
    assert!(preview.is_version_in_preview_header());

    assert_eq!(live.site().unwrap().configuration_path(), common::DEMO);
    assert_eq!(preview.site().unwrap().configuration_path(), common::DEMO_PREVIEW);
}

#[test]
fn test_children_are_decorated_once() {
    let (_, cache) = common::cache();
    let hosts = cache.get_virtual_hosts().unwrap();
    let live = hosts.virtual_host("localhost").unwrap().root_mount(0).unwrap().clone();
    let preview = decorate_mount_as_preview(live);

    let api = preview.child("api").unwrap();
    assert!(api.is_preview());
    assert!(!api.is_mapped());
    assert!(Arc::ptr_eq(&api, &preview.child("api").unwrap()));
    assert_eq!(preview.children().len(), 1);
}

#[test]
fn test_decorating_preview_is_identity() {
    let (_, cache) = common::cache();
    let hosts = cache.get_virtual_hosts().unwrap();
    let stored_preview = hosts.virtual_host("localhost").unwrap().root_mount(8081).unwrap().clone();
    assert!(stored_preview.is_preview());

    let again = decorate_mount_as_preview(stored_preview.clone());
    assert!(Arc::ptr_eq(&again, &stored_preview));
}

#[test]
fn test_preview_without_preview_root_uses_live_site() {
    let (_, cache) = common::cache();
    let hosts = cache.get_virtual_hosts().unwrap();
    let live = hosts.virtual_host("intranet.org").unwrap().root_mount(0).unwrap().clone();
    let preview = decorate_mount_as_preview(live.clone());

    let (a, b) = (live.site().unwrap(), preview.site().unwrap());
    assert!(Arc::ptr_eq(&a, &b));
}
