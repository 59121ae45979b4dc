//! Persisted layout of the hosts and configurations trees.
//!
//! The repository layer owns this layout; the engine only reads it. Node and
//! property names are collected here so every reader agrees on them.

/// Root of the whole site-configuration tree.
pub const HST_ROOT: &str = "/hst:hst";

// Top-level collections below the root.
pub const HOSTS: &str = "hst:hosts";
pub const CONFIGURATIONS: &str = "hst:configurations";
pub const SITES: &str = "hst:sites";
pub const CHANNELS: &str = "hst:channels";
pub const BLUEPRINTS: &str = "hst:blueprints";

/// Reserved configuration root contributed to every other root.
pub const DEFAULT_CONFIGURATION: &str = "hst:default";

// Sections of a configuration root.
pub const WORKSPACE: &str = "hst:workspace";
pub const PAGES: &str = "hst:pages";
pub const COMPONENTS: &str = "hst:components";
pub const TEMPLATES: &str = "hst:templates";
pub const CATALOG: &str = "hst:catalog";
pub const CONTAINERS: &str = "hst:containers";
pub const SITEMAP: &str = "hst:sitemap";
pub const SITEMAP_ITEM_HANDLERS: &str = "hst:sitemapitemhandlers";

// Node types.
pub const NT_VIRTUALHOST_GROUP: &str = "hst:virtualhostgroup";
pub const NT_VIRTUALHOST: &str = "hst:virtualhost";
pub const NT_PORTMOUNT: &str = "hst:portmount";
pub const NT_MOUNT: &str = "hst:mount";
pub const NT_COMPONENT: &str = "hst:component";
pub const NT_CONTAINER: &str = "hst:containercomponent";
pub const NT_CONTAINER_ITEM: &str = "hst:containeritemcomponent";
pub const NT_CONTAINER_REFERENCE: &str = "hst:containercomponentreference";
pub const NT_CONTAINER_FOLDER: &str = "hst:containercomponentfolder";
pub const NT_SITEMAP_ITEM: &str = "hst:sitemapitem";
pub const NT_SITEMAP_ITEM_HANDLER: &str = "hst:sitemapitemhandler";
pub const NT_TEMPLATE: &str = "hst:template";
pub const NT_CHANNEL: &str = "hst:channel";
pub const NT_BLUEPRINT: &str = "hst:blueprint";
pub const NT_UNSTRUCTURED: &str = "nt:unstructured";

// Generic properties.
pub const PRIMARY_TYPE: &str = "jcr:primaryType";
pub const IDENTIFIER: &str = "jcr:uuid";
pub const PARAMETER_NAMES: &str = "hst:parameternames";
pub const PARAMETER_VALUES: &str = "hst:parametervalues";

// Host and mount properties.
pub const ROOT_MOUNT: &str = "hst:root";
pub const DEFAULT_HOSTNAME: &str = "hst:defaulthostname";
pub const DEFAULT_CONTEXT_PATH: &str = "hst:defaultcontextpath";
pub const CONTEXT_PATH: &str = "hst:contextpath";
pub const MATCHING_IGNORED_PREFIX: &str = "hst:matchingignoredprefix";
pub const PREFIX_EXCLUSIONS: &str = "hst:prefixexclusions";
pub const SUFFIX_EXCLUSIONS: &str = "hst:suffixexclusions";
pub const SCHEME: &str = "hst:scheme";
pub const HOMEPAGE: &str = "hst:homepage";
pub const PAGE_NOT_FOUND: &str = "hst:pagenotfound";
pub const LOCALE: &str = "hst:locale";
pub const MOUNT_POINT: &str = "hst:mountpoint";
pub const IS_MAPPED: &str = "hst:ismapped";
pub const MOUNT_TYPE: &str = "hst:type";
pub const MOUNT_TYPE_PREVIEW: &str = "preview";
pub const VERSION_IN_PREVIEW_HEADER: &str = "hst:versioninpreviewheader";
pub const NAMED_PIPELINE: &str = "hst:namedpipeline";
pub const ALIAS: &str = "hst:alias";

// Site properties.
pub const CONTENT: &str = "hst:content";
pub const CONFIGURATION_PATH: &str = "hst:configurationpath";

/// Suffix of a preview configuration root next to its live root.
pub const PREVIEW_SUFFIX: &str = "-preview";

// Configuration root properties.
pub const INHERITS_FROM: &str = "hst:inheritsfrom";

// Component properties.
pub const REFERENCE_COMPONENT: &str = "hst:referencecomponent";
pub const COMPONENT_CLASS_NAME: &str = "hst:componentclassname";
pub const TEMPLATE: &str = "hst:template";
pub const RENDER_PATH: &str = "hst:renderpath";
pub const XTYPE: &str = "hst:xtype";
pub const LABEL: &str = "hst:label";

// Sitemap properties.
pub const RELATIVE_CONTENT_PATH: &str = "hst:relativecontentpath";
pub const COMPONENT_CONFIGURATION_ID: &str = "hst:componentconfigurationid";
pub const SITEMAP_ITEM_HANDLER_IDS: &str = "hst:sitemapitemhandlerids";
pub const SITEMAP_ITEM_HANDLER_TYPE: &str = "hst:sitemapitemhandlertype";

// Sitemap segment wildcards.
pub const WILDCARD: &str = "_default_";
pub const ANY: &str = "_any_";

// Channel and blueprint properties.
pub const NAME: &str = "hst:name";
pub const DESCRIPTION: &str = "hst:description";
