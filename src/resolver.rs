//! Import-string resolution (§4.7): turns the textual argument to
//! `@import(...)` into a canonical [`Uri`], or `None` if it cannot be
//! resolved with the information currently available.

use crate::config::{PackageEntry, StoreConfig};
use crate::uri::Uri;

/// Everything [`resolve_import`] needs about the importing handle's
/// context, gathered by the store under whatever locks it already holds.
pub struct ImportContext<'a> {
    pub handle_uri: &'a Uri,
    /// `builtin_uri` of the handle's resolved build file, if any.
    pub build_file_builtin: Option<&'a Uri>,
    /// The package list to search for non-"std"/"builtin" bare names: the
    /// associated build file's `packages`, or, if the handle is itself a
    /// build file, its own `deps_build_roots` reinterpreted as packages.
    pub packages: Option<&'a [PackageEntry]>,
}

pub fn resolve_import(s: &str, ctx: &ImportContext<'_>, store_config: &StoreConfig) -> Option<Uri> {
    if s == "std" {
        let lib_dir = store_config.zig_lib_dir.as_ref()?;
        return Uri::from_file_path(lib_dir.join("std").join("std.zig")).ok();
    }

    if s == "builtin" {
        if let Some(uri) = ctx.build_file_builtin {
            return Some(uri.clone());
        }
        let builtin = store_config.builtin_path.as_ref()?;
        return Uri::from_file_path(builtin).ok();
    }

    if !s.ends_with(".zig") {
        let packages = ctx.packages?;
        let entry = packages.iter().find(|p| p.name == s)?;
        return Uri::from_file_path(&entry.path).ok();
    }

    ctx.handle_uri.resolve_relative(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn store_config_with_lib(lib: &str) -> StoreConfig {
        let mut cfg = StoreConfig::new();
        cfg.zig_lib_dir = Some(PathBuf::from(lib));
        cfg
    }

    #[test]
    fn std_resolves_against_lib_dir() {
        let cfg = store_config_with_lib("/z/lib");
        let handle_uri = Uri::from_file_path("/p/a.zig").unwrap();
        let ctx = ImportContext { handle_uri: &handle_uri, build_file_builtin: None, packages: None };
        let resolved = resolve_import("std", &ctx, &cfg).unwrap();
        assert_eq!(resolved.to_file_path().unwrap(), PathBuf::from("/z/lib/std/std.zig"));
    }

    #[test]
    fn std_without_lib_dir_is_null() {
        let cfg = StoreConfig::new();
        let handle_uri = Uri::from_file_path("/p/a.zig").unwrap();
        let ctx = ImportContext { handle_uri: &handle_uri, build_file_builtin: None, packages: None };
        assert!(resolve_import("std", &ctx, &cfg).is_none());
    }

    #[test]
    fn package_name_resolves_from_package_list() {
        let cfg = StoreConfig::new();
        let handle_uri = Uri::from_file_path("/p/a.zig").unwrap();
        let packages =
            vec![PackageEntry { name: "foo".into(), path: PathBuf::from("/p/deps/foo/root.zig") }];
        let ctx = ImportContext { handle_uri: &handle_uri, build_file_builtin: None, packages: Some(&packages) };
        let resolved = resolve_import("foo", &ctx, &cfg).unwrap();
        assert_eq!(resolved.to_file_path().unwrap(), PathBuf::from("/p/deps/foo/root.zig"));
    }

    #[test]
    fn relative_path_resolves_against_handle_dir() {
        let cfg = StoreConfig::new();
        let handle_uri = Uri::from_file_path("/p/sub/a.zig").unwrap();
        let ctx = ImportContext { handle_uri: &handle_uri, build_file_builtin: None, packages: None };
        let resolved = resolve_import("../b.zig", &ctx, &cfg).unwrap();
        assert_eq!(resolved.to_file_path().unwrap(), PathBuf::from("/p/b.zig"));
    }
}
