//! `cartpulse page-key` command implementation.

use crate::core::Location;

/// Print the page key and category for a URL or path.
pub fn run(href: &str) {
    let location = Location::from_href(href);
    println!("{}\t{}", location.page_key(), location.category());
}
