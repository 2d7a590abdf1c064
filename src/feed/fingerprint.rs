use md5::{Digest, Md5};

/// Content identifier for an item, derived from its title text.
///
/// Titles are the only field guaranteed present across both RSS and
/// scraped HTML sources, so they serve as the dedup key: two items with
/// the same title collapse to one fingerprint. Within a single parse
/// pass the later item wins.
pub fn fingerprint(title: &str) -> String {
    let hash = Md5::digest(title.as_bytes());
    format!("{:x}", hash)
}
