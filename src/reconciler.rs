//! Post-generation repair of blocks against validated resources.
//!
//! A single pass over the block sequence: assign missing identifiers,
//! force link fields onto validated source URLs, and inject
//! representative images. No cross-block state; a block that cannot be
//! repaired is logged and left as the generator produced it.

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::types::article::Article;
use crate::types::document::{Block, ImagePool};

/// Marker identifying a placeholder link the model invented.
const PLACEHOLDER_DOMAIN: &str = "example.com";

/// Why a single block could not be repaired.
#[derive(Debug, Error)]
pub enum BlockRepairError {
    /// The block content is not a JSON object
    #[error("block content is {found}, expected an object")]
    ContentNotObject { found: &'static str },
}

/// Repair every block in place against the validated resource pool.
///
/// Blocks are processed independently; a failure on one block is
/// logged and does not stop the pass.
pub fn reconcile(
    blocks: &mut [Block],
    valid_sources: &[Article],
    valid_source_urls: &[String],
    image_pool: &ImagePool,
) {
    for (index, block) in blocks.iter_mut().enumerate() {
        if block.id.as_deref().map_or(true, str::is_empty) {
            block.id = Some((index + 1).to_string());
        }

        if let Err(e) = reconcile_block(index, block, valid_sources, valid_source_urls, image_pool)
        {
            warn!(
                block_index = index,
                block_kind = ?block.kind,
                error = %e,
                "block repair failed; leaving block as generated"
            );
        }
    }
}

/// Index-mod-count selection shared by link and image fallback.
///
/// Distributes a finite resource set evenly across any number of
/// blocks; `None` when the set is empty.
fn round_robin(count: usize, index: usize) -> Option<usize> {
    (count > 0).then(|| index % count)
}

fn reconcile_block(
    index: usize,
    block: &mut Block,
    valid_sources: &[Article],
    valid_source_urls: &[String],
    image_pool: &ImagePool,
) -> Result<(), BlockRepairError> {
    let content_type = json_type_name(&block.content);
    let content = block
        .content
        .as_object_mut()
        .ok_or_else(|| BlockRepairError::ContentNotObject {
            found: content_type,
        })?;

    // Link repair: `link` first, `url` as the fallback field
    let link = content
        .get("link")
        .and_then(Value::as_str)
        .or_else(|| content.get("url").and_then(Value::as_str))
        .unwrap_or("")
        .to_string();

    let current_source = if link_is_valid(&link, valid_source_urls) {
        // No match is fine; not every block has article affinity
        valid_sources.iter().find(|s| s.url == link)
    } else {
        match round_robin(valid_sources.len(), index) {
            Some(i) => {
                let source = &valid_sources[i];
                let replacement = Value::String(source.url.clone());
                let had_link = content.contains_key("link");
                if had_link {
                    content.insert("link".to_string(), replacement.clone());
                }
                if content.contains_key("url") {
                    content.insert("url".to_string(), replacement.clone());
                } else if !had_link {
                    content.insert("link".to_string(), replacement);
                }
                Some(source)
            }
            None => None,
        }
    };

    // Image repair: source imagery first, pool round-robin otherwise
    let source_image = current_source
        .and_then(|s| s.associated_images.first())
        .cloned();

    if let Some(image) = source_image {
        content.insert("image_url".to_string(), Value::String(image));
    } else {
        let existing = content
            .get("image_url")
            .and_then(Value::as_str)
            .unwrap_or("");
        if existing.is_empty() || !image_pool.contains(existing) {
            if let Some(i) = round_robin(image_pool.len(), index) {
                if let Some(image) = image_pool.get(i) {
                    content.insert("image_url".to_string(), Value::String(image.to_string()));
                }
            }
        }
    }

    Ok(())
}

/// A link is usable when it is non-empty, not a placeholder, and — if
/// any validated URLs exist at all — one of them.
///
/// With no validated URLs the membership check is disabled on purpose:
/// an otherwise plausible link survives rather than being blanked.
fn link_is_valid(link: &str, valid_source_urls: &[String]) -> bool {
    if link.is_empty() || link.contains(PLACEHOLDER_DOMAIN) {
        return false;
    }
    valid_source_urls.is_empty() || valid_source_urls.iter().any(|u| u == link)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::document::BlockKind;
    use serde_json::json;

    fn source(url: &str, images: &[&str]) -> Article {
        Article::new("Title", url, "content").with_images(images.iter().copied())
    }

    fn urls(sources: &[Article]) -> Vec<String> {
        sources.iter().map(|s| s.url.clone()).collect()
    }

    fn link_block(link: &str) -> Block {
        Block::new(BlockKind::MainStory, json!({ "link": link }))
    }

    #[test]
    fn test_assigns_missing_ids_keeps_existing() {
        let mut blocks = vec![
            link_block("https://s.com/1"),
            Block {
                id: Some("keep-me".to_string()),
                kind: BlockKind::Quote,
                content: json!({}),
            },
            Block {
                id: Some(String::new()),
                kind: BlockKind::Text,
                content: json!({}),
            },
        ];

        reconcile(&mut blocks, &[], &[], &ImagePool::new());

        assert_eq!(blocks[0].id.as_deref(), Some("1"));
        assert_eq!(blocks[1].id.as_deref(), Some("keep-me"));
        assert_eq!(blocks[2].id.as_deref(), Some("3"));
    }

    #[test]
    fn test_valid_link_left_untouched() {
        let sources = vec![source("https://s.com/1", &[]), source("https://s.com/2", &[])];
        let mut blocks = vec![link_block("https://s.com/2")];

        reconcile(&mut blocks, &sources, &urls(&sources), &ImagePool::new());

        assert_eq!(blocks[0].content_str("link"), Some("https://s.com/2"));
    }

    #[test]
    fn test_round_robin_coverage_over_sources() {
        let sources = vec![
            source("https://s.com/1", &[]),
            source("https://s.com/2", &[]),
            source("https://s.com/3", &[]),
        ];
        let mut blocks: Vec<Block> = (0..7).map(|_| link_block("")).collect();

        reconcile(&mut blocks, &sources, &urls(&sources), &ImagePool::new());

        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(
                block.content_str("link"),
                Some(sources[i % 3].url.as_str()),
                "block {}",
                i
            );
        }
    }

    #[test]
    fn test_placeholder_links_are_replaced() {
        let sources = vec![source("https://s.com/1", &[])];
        let mut blocks = vec![
            link_block("http://example.com/fake"),
            Block::new(BlockKind::ToolSpotlight, json!({ "url": "https://example.com" })),
        ];

        reconcile(&mut blocks, &sources, &urls(&sources), &ImagePool::new());

        assert_eq!(blocks[0].content_str("link"), Some("https://s.com/1"));
        assert_eq!(blocks[1].content_str("url"), Some("https://s.com/1"));
        let rendered = serde_json::to_string(&blocks).unwrap();
        assert!(!rendered.contains("example.com"));
    }

    #[test]
    fn test_unknown_link_replaced_when_valid_urls_exist() {
        let sources = vec![source("https://s.com/1", &[])];
        let mut blocks = vec![link_block("https://elsewhere.com/post")];

        reconcile(&mut blocks, &sources, &urls(&sources), &ImagePool::new());

        assert_eq!(blocks[0].content_str("link"), Some("https://s.com/1"));
    }

    #[test]
    fn test_membership_check_disabled_when_no_valid_urls() {
        let mut blocks = vec![link_block("https://elsewhere.com/post")];

        reconcile(&mut blocks, &[], &[], &ImagePool::new());

        // No validated URLs: a plausible link survives untouched
        assert_eq!(
            blocks[0].content_str("link"),
            Some("https://elsewhere.com/post")
        );
    }

    #[test]
    fn test_block_without_link_field_gets_one() {
        let sources = vec![source("https://s.com/1", &[])];
        let mut blocks = vec![Block::new(BlockKind::DeepDive, json!({ "title": "t" }))];

        reconcile(&mut blocks, &sources, &urls(&sources), &ImagePool::new());

        assert_eq!(blocks[0].content_str("link"), Some("https://s.com/1"));
    }

    #[test]
    fn test_source_image_takes_precedence_over_pool() {
        let sources = vec![source("https://s.com/1", &["https://s.com/hero.jpg"])];
        let pool: ImagePool = ["https://pool.com/p.jpg"].into_iter().collect();
        let mut blocks = vec![Block::new(
            BlockKind::MainStory,
            json!({ "link": "https://s.com/1", "image_url": "https://pool.com/p.jpg" }),
        )];

        reconcile(&mut blocks, &sources, &urls(&sources), &pool);

        assert_eq!(
            blocks[0].content_str("image_url"),
            Some("https://s.com/hero.jpg")
        );
    }

    #[test]
    fn test_pool_round_robin_for_invalid_images() {
        let pool: ImagePool = ["https://p.com/a.jpg", "https://p.com/b.jpg"]
            .into_iter()
            .collect();
        let mut blocks = vec![
            Block::new(BlockKind::MainStory, json!({ "image_url": "" })),
            Block::new(BlockKind::MainStory, json!({ "image_url": "https://rogue.com/x.jpg" })),
            Block::new(BlockKind::MainStory, json!({})),
        ];

        reconcile(&mut blocks, &[], &[], &pool);

        assert_eq!(blocks[0].content_str("image_url"), Some("https://p.com/a.jpg"));
        assert_eq!(blocks[1].content_str("image_url"), Some("https://p.com/b.jpg"));
        assert_eq!(blocks[2].content_str("image_url"), Some("https://p.com/a.jpg"));
    }

    #[test]
    fn test_pool_member_image_kept() {
        let pool: ImagePool = ["https://p.com/a.jpg", "https://p.com/b.jpg"]
            .into_iter()
            .collect();
        let mut blocks = vec![Block::new(
            BlockKind::MainStory,
            json!({ "image_url": "https://p.com/b.jpg" }),
        )];

        reconcile(&mut blocks, &[], &[], &pool);

        assert_eq!(blocks[0].content_str("image_url"), Some("https://p.com/b.jpg"));
    }

    #[test]
    fn test_empty_pool_leaves_image_alone() {
        let mut blocks = vec![Block::new(
            BlockKind::MainStory,
            json!({ "image_url": "https://rogue.com/x.jpg" }),
        )];

        reconcile(&mut blocks, &[], &[], &ImagePool::new());

        assert_eq!(
            blocks[0].content_str("image_url"),
            Some("https://rogue.com/x.jpg")
        );
    }

    #[test]
    fn test_malformed_block_does_not_stop_the_pass() {
        let sources = vec![source("https://s.com/1", &[])];
        let mut blocks: Vec<Block> = (0..5).map(|_| link_block("")).collect();
        blocks[2].content = json!("not an object");

        reconcile(&mut blocks, &sources, &urls(&sources), &ImagePool::new());

        for (i, block) in blocks.iter().enumerate() {
            // Ids are assigned even for the malformed block
            assert_eq!(block.id.as_deref(), Some((i + 1).to_string().as_str()));
            if i != 2 {
                assert_eq!(block.content_str("link"), Some("https://s.com/1"));
            }
        }
        assert_eq!(blocks[2].content, json!("not an object"));
    }
}
