//! Page categorization and page keys.
//!
//! A page key is `{Category}:{normalizedPath}`. Categorization runs on the
//! normalized path so that trailing-slash variants always share a key.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static CART_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/cart(?:/|$)").expect("static regex"));

/// Coarse storefront page category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageCategory {
    /// Storefront root.
    Home,
    /// Product detail page.
    Product,
    /// Collection listing.
    Collection,
    /// Cart page.
    Cart,
    /// Anything else.
    Other,
}

impl PageCategory {
    /// Categorize an already-normalized path. First match wins.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        if path == "/" {
            Self::Home
        } else if path.contains("/products/") {
            Self::Product
        } else if path.contains("/collections/") {
            Self::Collection
        } else if CART_PATH.is_match(path) {
            Self::Cart
        } else {
            Self::Other
        }
    }

    /// Display label used inside page keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Product => "Product",
            Self::Collection => "Collection",
            Self::Cart => "Cart",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for PageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strip trailing slashes; the root (and the empty path) becomes `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Grouping key for events and visible time of one logical page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageKey(String);

impl PageKey {
    /// Derive the key for a path. Pure function of the path.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        let normalized = normalize_path(path);
        let category = PageCategory::from_path(&normalized);
        Self(format!("{category}:{normalized}"))
    }

    /// Key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the page currently is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Full URL as the host reports it.
    pub href: String,

    /// Path component of `href`.
    pub path: String,
}

impl Location {
    /// Build a location from a full URL.
    ///
    /// Anything that does not parse as an absolute URL is taken as a bare
    /// path, with any query or fragment dropped.
    #[must_use]
    pub fn from_href(href: &str) -> Self {
        let path = match reqwest::Url::parse(href) {
            Ok(url) => url.path().to_string(),
            Err(_) => href
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        Self {
            href: href.to_string(),
            path,
        }
    }

    /// Page key of this location.
    #[must_use]
    pub fn page_key(&self) -> PageKey {
        PageKey::from_path(&self.path)
    }

    /// Category of this location.
    #[must_use]
    pub fn category(&self) -> PageCategory {
        PageCategory::from_path(&normalize_path(&self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn categorizes_storefront_paths() {
        assert_eq!(PageKey::from_path("/").as_str(), "Home:/");
        assert_eq!(
            PageKey::from_path("/products/shoe-1").as_str(),
            "Product:/products/shoe-1"
        );
        assert_eq!(
            PageKey::from_path("/collections/summer").as_str(),
            "Collection:/collections/summer"
        );
        assert_eq!(PageKey::from_path("/cart").as_str(), "Cart:/cart");
        assert_eq!(PageKey::from_path("/pages/about").as_str(), "Other:/pages/about");
    }

    #[test]
    fn trailing_slashes_normalize() {
        assert_eq!(
            PageKey::from_path("/products/x/"),
            PageKey::from_path("/products/x")
        );
        assert_eq!(PageKey::from_path("/cart/").as_str(), "Cart:/cart");
        assert_eq!(PageKey::from_path("///").as_str(), "Home:/");
        assert_eq!(PageKey::from_path("").as_str(), "Home:/");
    }

    #[test]
    fn product_inside_collection_is_product() {
        assert_eq!(
            PageKey::from_path("/collections/summer/products/hat").as_str(),
            "Product:/collections/summer/products/hat"
        );
    }

    #[test]
    fn cart_prefix_needs_boundary() {
        assert_eq!(PageCategory::from_path("/cartography"), PageCategory::Other);
        assert_eq!(PageCategory::from_path("/cart/change"), PageCategory::Cart);
    }

    #[test]
    fn location_from_absolute_url() {
        let location = Location::from_href("https://shop.example.com/products/shoe-1?variant=2#top");
        assert_eq!(location.path, "/products/shoe-1");
        assert_eq!(location.category(), PageCategory::Product);
    }

    #[test]
    fn location_from_bare_path() {
        let location = Location::from_href("/collections/all?page=2");
        assert_eq!(location.path, "/collections/all");
        assert_eq!(location.page_key().as_str(), "Collection:/collections/all");
    }

    proptest! {
        #[test]
        fn page_key_is_deterministic(path in "(/[a-z0-9-]{0,8}){0,4}/{0,3}") {
            prop_assert_eq!(PageKey::from_path(&path), PageKey::from_path(&path));
        }

        #[test]
        fn trailing_slash_never_changes_key(path in "(/[a-z0-9-]{1,8}){1,4}") {
            let slashed = format!("{path}/");
            prop_assert_eq!(PageKey::from_path(&path), PageKey::from_path(&slashed));
        }
    }
}
